use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::orchestrator::Poller;
use crate::error::ServiceError;
use crate::store::ResultWriter;
use crate::telemetry::{Device, PollResult};

/// Больше одновременных сессий не открываем, чтобы не заливать сеть
pub const MAX_CONCURRENCY: usize = 16;

pub const CANCELLED: &str = "cancelled";

/// Итог по одному принтеру в пакете
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchEntry {
    pub device_id: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchEntry {
    fn success(device_id: &str) -> Self {
        Self {
            device_id: device_id.to_string(),
            ok: true,
            error: None,
        }
    }

    fn failure(device_id: &str, error: impl ToString) -> Self {
        Self {
            device_id: device_id.to_string(),
            ok: false,
            error: Some(error.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub success: bool,
    pub results: Vec<BatchEntry>,
}

impl BatchReport {
    pub fn failures(&self) -> impl Iterator<Item = &BatchEntry> {
        self.results.iter().filter(|e| !e.ok)
    }
}

/// Опрос и запись результата одного принтера
pub async fn poll_and_store(
    poller: &Poller,
    writer: &dyn ResultWriter,
    device: &Device,
) -> Result<PollResult, ServiceError> {
    let result = poller.poll(device).await?;
    writer.store(&device.id, &result).await?;
    Ok(result)
}

/// Сколько опросов держать одновременно
pub fn concurrency_limit(devices: usize, configured: usize) -> usize {
    devices.min(configured.clamp(1, MAX_CONCURRENCY)).max(1)
}

/// Пакетный опрос: ошибка одного принтера не останавливает остальные
pub struct BatchRunner {
    poller: Arc<Poller>,
    writer: Arc<dyn ResultWriter>,
    max_concurrency: usize,
}

impl BatchRunner {
    pub fn new(poller: Arc<Poller>, writer: Arc<dyn ResultWriter>, max_concurrency: usize) -> Self {
        Self {
            poller,
            writer,
            max_concurrency,
        }
    }

    /// После отмены новые опросы не запускаются, начатые доживают до конца
    pub async fn run(&self, devices: Vec<Device>, cancel: CancellationToken) -> BatchReport {
        let limit = concurrency_limit(devices.len(), self.max_concurrency);
        let semaphore = Arc::new(Semaphore::new(limit));
        let ids: Vec<String> = devices.iter().map(|d| d.id.clone()).collect();
        let mut entries: Vec<Option<BatchEntry>> = vec![None; devices.len()];
        let mut tasks = JoinSet::new();

        info!(devices = devices.len(), limit, "пакетный опрос");

        for (slot, device) in devices.into_iter().enumerate() {
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                permit = semaphore.clone().acquire_owned() => permit.ok(),
            };
            let Some(permit) = permit else {
                entries[slot] = Some(BatchEntry::failure(&device.id, CANCELLED));
                continue;
            };

            let poller = Arc::clone(&self.poller);
            let writer = Arc::clone(&self.writer);
            tasks.spawn(async move {
                let _permit = permit;
                let entry = match poll_and_store(&poller, writer.as_ref(), &device).await {
                    Ok(_) => BatchEntry::success(&device.id),
                    Err(e) => {
                        warn!(device = %device.id, error = %e, "опрос принтера не удался");
                        BatchEntry::failure(&device.id, e)
                    }
                };
                (slot, entry)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((slot, entry)) => entries[slot] = Some(entry),
                Err(e) => warn!(error = %e, "задача опроса упала"),
            }
        }

        let results: Vec<BatchEntry> = entries
            .into_iter()
            .zip(ids)
            .map(|(entry, id)| {
                entry.unwrap_or_else(|| BatchEntry::failure(&id, "задача опроса прервана"))
            })
            .collect();
        let success = results.iter().all(|e| e.ok);

        info!(
            total = results.len(),
            failed = results.iter().filter(|e| !e.ok).count(),
            "пакетный опрос завершён"
        );

        BatchReport { success, results }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snmp::session::testing::{printer_agent, FakeNetwork};
    use crate::snmp::{RequestPolicy, SnmpVersion};
    use crate::store::MemoryStore;
    use crate::telemetry::DeviceKind;

    fn device(id: &str, host: &str) -> Device {
        Device {
            id: id.into(),
            name: id.to_uppercase(),
            location: None,
            floor: None,
            notes: None,
            address: host.into(),
            port: 161,
            community: "public".into(),
            kind: DeviceKind::Monochrome,
            enabled: true,
        }
    }

    fn toner() -> crate::snmp::session::testing::FakeAgent {
        printer_agent(&[(1, "Black Toner", 50, 100)])
    }

    fn runner(network: FakeNetwork, store: Arc<MemoryStore>) -> BatchRunner {
        let poller = Poller::new(Arc::new(network), RequestPolicy::default());
        BatchRunner::new(Arc::new(poller), store, 8)
    }

    #[tokio::test]
    async fn one_timeout_does_not_stop_the_batch() {
        let devices = vec![
            device("p1", "192.0.2.1"),
            device("p2", "192.0.2.2"),
            device("p3", "192.0.2.3"),
        ];
        let network = FakeNetwork::default()
            .agent("192.0.2.1", "public", SnmpVersion::V2c, toner())
            .agent("192.0.2.3", "public", SnmpVersion::V2c, toner());
        let store = Arc::new(MemoryStore::from_devices(devices.clone()));

        let report = runner(network, store.clone())
            .run(devices, CancellationToken::new())
            .await;

        assert!(!report.success);
        assert_eq!(report.results.len(), 3);
        let failed: Vec<_> = report.failures().map(|e| e.device_id.as_str()).collect();
        assert_eq!(failed, vec!["p2"]);
        assert!(report.results[1].error.as_deref().unwrap().contains("таймаут"));
        assert!(report.results[0].ok && report.results[2].ok);

        assert!(store.record("p1").await.unwrap().telemetry.is_some());
        assert!(store.record("p2").await.unwrap().telemetry.is_none());
    }

    #[tokio::test]
    async fn cancelled_batch_launches_nothing() {
        let devices = vec![device("p1", "192.0.2.1"), device("p2", "192.0.2.2")];
        let network = FakeNetwork::default().agent("192.0.2.1", "public", SnmpVersion::V2c, toner());
        let store = Arc::new(MemoryStore::from_devices(devices.clone()));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let report = runner(network.clone(), store).run(devices, cancel).await;

        assert!(!report.success);
        assert!(report
            .results
            .iter()
            .all(|e| e.error.as_deref() == Some(CANCELLED)));
        assert!(network.opened().is_empty());
    }

    #[tokio::test]
    async fn store_failure_is_reported_per_device() {
        let devices = vec![device("p1", "192.0.2.1")];
        let network = FakeNetwork::default().agent("192.0.2.1", "public", SnmpVersion::V2c, toner());
        let store = Arc::new(MemoryStore::default());

        let report = runner(network, store).run(devices, CancellationToken::new()).await;
        assert!(!report.success);
        assert!(report.results[0].error.as_deref().unwrap().contains("p1"));
    }

    #[tokio::test]
    async fn empty_batch_is_successful() {
        let store = Arc::new(MemoryStore::default());
        let report = runner(FakeNetwork::default(), store)
            .run(Vec::new(), CancellationToken::new())
            .await;
        assert!(report.success);
        assert!(report.results.is_empty());
    }

    #[test]
    fn limit_is_bounded() {
        assert_eq!(concurrency_limit(3, 8), 3);
        assert_eq!(concurrency_limit(100, 8), 8);
        assert_eq!(concurrency_limit(100, 64), MAX_CONCURRENCY);
        assert_eq!(concurrency_limit(5, 0), 1);
        assert_eq!(concurrency_limit(0, 8), 1);
    }
}
