use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::telemetry::{ColorLevels, Device, PollResult};

/// Последняя телеметрия принтера
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Telemetry {
    pub last_check: DateTime<Utc>,
    pub last_ok: bool,
    pub last_message: String,
    pub levels: ColorLevels,
    pub last_errors: Vec<String>,
    pub last_connected: Option<bool>,
    pub last_woke: Option<bool>,
}

/// Принтер вместе с тем, что о нём известно после опросов
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrinterRecord {
    #[serde(flatten)]
    pub device: Device,
    pub serial_number: Option<String>,
    pub telemetry: Option<Telemetry>,
}

impl PrinterRecord {
    pub fn new(device: Device) -> Self {
        Self {
            device,
            serial_number: None,
            telemetry: None,
        }
    }

    /// Перезаписывает телеметрию; серийник только если он пришёл
    fn apply(&mut self, result: &PollResult, at: DateTime<Utc>) {
        if let Some(serial) = &result.serial_number {
            self.serial_number = Some(serial.clone());
        }
        self.telemetry = Some(Telemetry {
            last_check: at,
            last_ok: result.ok,
            last_message: result.message.clone(),
            levels: result.levels,
            last_errors: result.errors.clone(),
            last_connected: result.connected,
            last_woke: result.woke,
        });
    }
}

/// Чтение конфигурации принтеров
#[async_trait]
pub trait DeviceRepository: Send + Sync {
    async fn device(&self, id: &str) -> Option<Device>;

    async fn enabled_devices(&self) -> Vec<Device>;
}

/// Запись результата опроса в карточку принтера
#[async_trait]
pub trait ResultWriter: Send + Sync {
    async fn store(&self, device_id: &str, result: &PollResult) -> Result<(), StoreError>;
}

/// Хранилище в памяти. Запись и чтение одной карточки атомарны за счёт RwLock.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<BTreeMap<String, PrinterRecord>>,
}

impl MemoryStore {
    pub fn from_devices(devices: impl IntoIterator<Item = Device>) -> Self {
        let records = devices
            .into_iter()
            .map(|device| (device.id.clone(), PrinterRecord::new(device)))
            .collect();
        Self {
            records: RwLock::new(records),
        }
    }

    pub async fn record(&self, id: &str) -> Option<PrinterRecord> {
        self.records.read().await.get(id).cloned()
    }

    /// Все карточки, упорядоченные по имени
    pub async fn records(&self) -> Vec<PrinterRecord> {
        let mut records: Vec<_> = self.records.read().await.values().cloned().collect();
        records.sort_by(|a, b| a.device.name.cmp(&b.device.name));
        records
    }
}

#[async_trait]
impl DeviceRepository for MemoryStore {
    async fn device(&self, id: &str) -> Option<Device> {
        self.records.read().await.get(id).map(|r| r.device.clone())
    }

    async fn enabled_devices(&self) -> Vec<Device> {
        self.records()
            .await
            .into_iter()
            .filter(|r| r.device.enabled)
            .map(|r| r.device)
            .collect()
    }
}

#[async_trait]
impl ResultWriter for MemoryStore {
    async fn store(&self, device_id: &str, result: &PollResult) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(device_id)
            .ok_or_else(|| StoreError::UnknownDevice(device_id.to_string()))?;
        record.apply(result, Utc::now());
        Ok(())
    }
}
