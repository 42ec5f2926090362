use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::AppConfig;
use crate::error::ServiceError;
use crate::poller::{
    poll_and_store, BatchReport, BatchRunner, CliFallback, PollReport, Poller, SnmpwalkRunner,
};
use crate::snmp::UdpConnector;
use crate::store::{DeviceRepository, ResultWriter};
use crate::telemetry::PollResult;

/// Собирает оркестратор из конфигурации: UDP сессии и, если включён, snmpwalk
pub fn build_poller(config: &AppConfig) -> Poller {
    let policy = config.request_policy();
    let connector = UdpConnector {
        open_timeout: policy.timeout,
    };
    let poller = Poller::new(Arc::new(connector), policy)
        .with_max_walk_entries(config.settings.connection.max_walk_entries);

    if !config.settings.fallback.enabled {
        return poller;
    }

    let runner = SnmpwalkRunner {
        binary: config.get_snmpwalk_binary(),
        timeout: config.fallback_timeout(),
    };
    poller.with_fallback(CliFallback::new(
        Arc::new(runner),
        config.settings.fallback.version,
    ))
}

/// Точка входа для слоя запросов: обновить один принтер или все
pub struct PrinterService {
    repository: Arc<dyn DeviceRepository>,
    writer: Arc<dyn ResultWriter>,
    poller: Arc<Poller>,
    max_concurrency: usize,
}

impl PrinterService {
    pub fn new(
        repository: Arc<dyn DeviceRepository>,
        writer: Arc<dyn ResultWriter>,
        poller: Arc<Poller>,
        max_concurrency: usize,
    ) -> Self {
        Self {
            repository,
            writer,
            poller,
            max_concurrency,
        }
    }

    pub async fn refresh_one(&self, device_id: &str) -> Result<PollResult, ServiceError> {
        let device = self
            .repository
            .device(device_id)
            .await
            .ok_or_else(|| ServiceError::NotFound(device_id.to_string()))?;

        poll_and_store(&self.poller, self.writer.as_ref(), &device).await
    }

    /// Как `refresh_one`, но с историей попыток; неудачный опрос не ошибка
    pub async fn inspect_one(&self, device_id: &str) -> Result<PollReport, ServiceError> {
        let device = self
            .repository
            .device(device_id)
            .await
            .ok_or_else(|| ServiceError::NotFound(device_id.to_string()))?;

        let report = self.poller.poll_detailed(&device).await;
        if let Ok(result) = &report.outcome {
            self.writer.store(&device.id, result).await?;
        }
        Ok(report)
    }

    pub async fn refresh_all(&self) -> BatchReport {
        self.refresh_all_with(CancellationToken::new()).await
    }

    /// Пакетный опрос всех включённых принтеров с возможностью отмены
    pub async fn refresh_all_with(&self, cancel: CancellationToken) -> BatchReport {
        let devices = self.repository.enabled_devices().await;
        info!(devices = devices.len(), "обновление всех принтеров");

        BatchRunner::new(
            Arc::clone(&self.poller),
            Arc::clone(&self.writer),
            self.max_concurrency,
        )
        .run(devices, cancel)
        .await
    }
}
