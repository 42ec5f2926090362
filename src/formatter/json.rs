use serde::{Deserialize, Serialize};

use crate::poller::{Attempt, AttemptOutcome, AttemptPath, BatchReport, PollReport};
use crate::store::PrinterRecord;
use crate::telemetry::{ColorLevels, DataSource, DeviceKind, PollResult};

/// Карточка принтера для клиента
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrinterJson {
    pub id: String,
    pub name: String,
    pub location: Option<String>,
    pub floor: Option<String>,
    pub notes: Option<String>,
    pub address: String,
    pub port: u16,
    pub kind: DeviceKind,
    pub enabled: bool,
    pub serial_number: Option<String>,
    pub last_check: Option<String>,
    pub last_ok: Option<bool>,
    pub last_message: String,
    pub last_errors: Vec<String>,
    pub last_connected: Option<bool>,
    pub last_woke: Option<bool>,
    pub toner: ColorLevels,
}

/// Итог одного опроса
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollResultJson {
    pub device_id: String,
    pub timestamp: String,
    pub status: String, // "ok" | "warning" | "error"
    pub ok: bool,
    pub message: String,
    pub via: String,
    pub toner: ColorLevels,
    pub errors: Vec<String>,
    pub serial_number: Option<String>,
    pub connected: Option<bool>,
    pub woke: Option<bool>,
    pub attempts: Vec<AttemptJson>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptJson {
    pub community: String,
    pub path: String,
    pub outcome: String,
}

/// Сводка пакетного опроса
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSummaryJson {
    pub timestamp: String,
    pub total: usize,
    pub failed: usize,
    pub report: BatchReport,
}

/// JSON форматтер для карточек и результатов опроса
pub struct JsonFormatter;

impl JsonFormatter {
    pub fn format_printer(record: &PrinterRecord) -> PrinterJson {
        let device = &record.device;
        let telemetry = record.telemetry.as_ref();

        PrinterJson {
            id: device.id.clone(),
            name: device.name.clone(),
            location: device.location.clone(),
            floor: device.floor.clone(),
            notes: device.notes.clone(),
            address: device.address.clone(),
            port: device.port,
            kind: device.kind,
            enabled: device.enabled,
            serial_number: record.serial_number.clone(),
            last_check: telemetry.map(|t| t.last_check.to_rfc3339()),
            last_ok: telemetry.map(|t| t.last_ok),
            last_message: telemetry.map(|t| t.last_message.clone()).unwrap_or_default(),
            last_errors: telemetry.map(|t| t.last_errors.clone()).unwrap_or_default(),
            last_connected: telemetry.and_then(|t| t.last_connected),
            last_woke: telemetry.and_then(|t| t.last_woke),
            toner: telemetry.map(|t| t.levels).unwrap_or_default(),
        }
    }

    pub fn format_poll(device_id: &str, result: &PollResult) -> PollResultJson {
        let status = match (result.ok, result.errors.is_empty()) {
            (true, _) => "ok",
            (false, true) => "warning",
            (false, false) => "error",
        };

        PollResultJson {
            device_id: device_id.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            status: status.to_string(),
            ok: result.ok,
            message: result.message.clone(),
            via: Self::describe_source(&result.source),
            toner: result.levels,
            errors: result.errors.clone(),
            serial_number: result.serial_number.clone(),
            connected: result.connected,
            woke: result.woke,
            attempts: Vec::new(),
        }
    }

    /// Результат вместе с историей попыток; `None`, если опрос провалился
    pub fn format_report(report: &PollReport) -> Option<PollResultJson> {
        let result = report.outcome.as_ref().ok()?;
        let mut json = Self::format_poll(&report.device_id, result);
        json.attempts = report.attempts.iter().map(Self::format_attempt).collect();
        Some(json)
    }

    pub fn format_batch(report: &BatchReport) -> BatchSummaryJson {
        BatchSummaryJson {
            timestamp: chrono::Utc::now().to_rfc3339(),
            total: report.results.len(),
            failed: report.failures().count(),
            report: report.clone(),
        }
    }

    fn format_attempt(attempt: &Attempt) -> AttemptJson {
        let path = match attempt.path {
            AttemptPath::Snmp(version) => format!("snmp {}", version),
            AttemptPath::Cli => "snmpwalk".to_string(),
        };
        let outcome = match &attempt.outcome {
            AttemptOutcome::Collected => "collected".to_string(),
            AttemptOutcome::NoData => "no data".to_string(),
            AttemptOutcome::Failed(e) => e.to_string(),
        };

        AttemptJson {
            community: attempt.community.clone(),
            path,
            outcome,
        }
    }

    fn describe_source(source: &DataSource) -> String {
        match source {
            DataSource::Snmp { version, .. } => format!("snmp {}", version),
            DataSource::CliFallback { .. } => "snmpwalk".to_string(),
        }
    }

    /// Сериализует в JSON строку
    pub fn to_json_string<T: Serialize>(value: &T) -> anyhow::Result<String> {
        serde_json::to_string_pretty(value)
            .map_err(|e| anyhow::anyhow!("Ошибка сериализации в JSON: {}", e))
    }
}
