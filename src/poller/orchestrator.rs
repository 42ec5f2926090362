use std::sync::Arc;

use tracing::{debug, info, warn};

use super::cli_fallback::CliFallback;
use crate::error::{PollingError, SnmpError};
use crate::snmp::{
    known, walk, Connector, IndexedValues, ObjectId, RequestPolicy, Session, SnmpVersion,
    DEFAULT_MAX_WALK_ENTRIES,
};
use crate::telemetry::decoder::{assign_channels, decode_error_bitmask, summarize};
use crate::telemetry::{DataSource, Device, PollResult, SupplyReading};

/// Community, которую пробуем после настроенной
pub const DEFAULT_COMMUNITY: &str = "public";

/// v2c умеет больше, v1 понимают все
pub const VERSION_ORDER: [SnmpVersion; 2] = [SnmpVersion::V2c, SnmpVersion::V1];

/// Кандидаты community: настроенная, затем "public" (без повторов)
pub fn community_candidates(configured: &str) -> Vec<String> {
    let mut candidates = Vec::with_capacity(2);
    let configured = configured.trim();
    if !configured.is_empty() {
        candidates.push(configured.to_string());
    }
    if !candidates.iter().any(|c| c == DEFAULT_COMMUNITY) {
        candidates.push(DEFAULT_COMMUNITY.to_string());
    }
    candidates
}

/// Этапы опроса одного устройства
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStage {
    NotStarted,
    Negotiating,
    Collecting,
    ExhaustedStructured,
    CliFallback,
    Decoded,
    Failed,
}

/// Чем закончилась попытка
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// Обходы прошли, пара выбрана
    Collected,
    /// SNMP ошибка, переходим к следующей паре
    Failed(SnmpError),
    /// Утилита ничего не вернула
    NoData,
}

/// Способ, которым делалась попытка
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptPath {
    Snmp(SnmpVersion),
    Cli,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    pub community: String,
    pub path: AttemptPath,
    pub outcome: AttemptOutcome,
}

/// Полная история опроса: этапы, попытки и итог
#[derive(Debug)]
pub struct PollReport {
    pub device_id: String,
    pub stages: Vec<PollStage>,
    pub attempts: Vec<Attempt>,
    pub outcome: Result<PollResult, PollingError>,
}

impl PollReport {
    fn new(device_id: &str) -> Self {
        Self {
            device_id: device_id.to_string(),
            stages: vec![PollStage::NotStarted],
            attempts: Vec::new(),
            outcome: Err(PollingError {
                device: device_id.to_string(),
                last: None,
            }),
        }
    }

    fn enter(&mut self, stage: PollStage) {
        if self.stages.last() != Some(&stage) {
            self.stages.push(stage);
        }
    }

    pub fn stage(&self) -> PollStage {
        self.stages.last().copied().unwrap_or(PollStage::NotStarted)
    }

    pub fn into_result(self) -> Result<PollResult, PollingError> {
        self.outcome
    }
}

/// Сырые данные, снятые по одной паре (community, версия)
#[derive(Debug, Default)]
struct Collected {
    woke: bool,
    serial_number: Option<String>,
    supplies: Vec<SupplyReading>,
    errors: Vec<String>,
}

/// Оркестратор опроса одного принтера
pub struct Poller {
    connector: Arc<dyn Connector>,
    fallback: Option<CliFallback>,
    policy: RequestPolicy,
    max_walk_entries: usize,
}

impl Poller {
    pub fn new(connector: Arc<dyn Connector>, policy: RequestPolicy) -> Self {
        Self {
            connector,
            fallback: None,
            policy,
            max_walk_entries: DEFAULT_MAX_WALK_ENTRIES,
        }
    }

    pub fn with_fallback(mut self, fallback: CliFallback) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn with_max_walk_entries(mut self, max: usize) -> Self {
        self.max_walk_entries = max.max(1);
        self
    }

    pub async fn poll(&self, device: &Device) -> Result<PollResult, PollingError> {
        self.poll_detailed(device).await.into_result()
    }

    /// Перебор пар, затем запасной путь через утилиту
    pub async fn poll_detailed(&self, device: &Device) -> PollReport {
        let mut report = PollReport::new(&device.id);
        let target = device.target();
        let communities = community_candidates(&device.community);
        let mut last_error: Option<SnmpError> = None;

        report.enter(PollStage::Negotiating);
        for community in &communities {
            for version in VERSION_ORDER {
                match self.try_pair(device, community, version, &mut report).await {
                    Ok(collected) => {
                        report.attempts.push(Attempt {
                            community: community.clone(),
                            path: AttemptPath::Snmp(version),
                            outcome: AttemptOutcome::Collected,
                        });
                        let result = decode(device, collected, community, version);
                        info!(
                            device = %device.id, %target, community = %community, %version,
                            ok = result.ok, message = %result.message,
                            "принтер опрошен"
                        );
                        report.enter(PollStage::Decoded);
                        report.outcome = Ok(result);
                        return report;
                    }
                    Err(e) => {
                        debug!(device = %device.id, %target, community = %community, %version, error = %e, "пара не подошла");
                        report.attempts.push(Attempt {
                            community: community.clone(),
                            path: AttemptPath::Snmp(version),
                            outcome: AttemptOutcome::Failed(e.clone()),
                        });
                        report.enter(PollStage::Negotiating);
                        last_error = Some(e);
                    }
                }
            }
        }
        report.enter(PollStage::ExhaustedStructured);

        if let Some(fallback) = &self.fallback {
            report.enter(PollStage::CliFallback);
            for community in &communities {
                match fallback.poll(device, community).await {
                    Some(result) => {
                        report.attempts.push(Attempt {
                            community: community.clone(),
                            path: AttemptPath::Cli,
                            outcome: AttemptOutcome::Collected,
                        });
                        info!(device = %device.id, %target, community = %community, ok = result.ok, "данные получены через snmpwalk");
                        report.enter(PollStage::Decoded);
                        report.outcome = Ok(result);
                        return report;
                    }
                    None => report.attempts.push(Attempt {
                        community: community.clone(),
                        path: AttemptPath::Cli,
                        outcome: AttemptOutcome::NoData,
                    }),
                }
            }
        }

        warn!(device = %device.id, %target, last_error = ?last_error, "принтер не ответил ни одним способом");
        report.enter(PollStage::Failed);
        report.outcome = Err(PollingError {
            device: format!("{} ({})", device.id, target),
            last: last_error,
        });
        report
    }

    async fn try_pair(
        &self,
        device: &Device,
        community: &str,
        version: SnmpVersion,
        report: &mut PollReport,
    ) -> Result<Collected, SnmpError> {
        let mut session = Session::open(
            self.connector.as_ref(),
            &device.target(),
            community,
            version,
            self.policy,
        )
        .await?;

        report.enter(PollStage::Collecting);
        self.collect(&mut session).await
    }

    async fn collect(&self, session: &mut Session) -> Result<Collected, SnmpError> {
        let woke = session.identify().await;

        let serial_number = match session.get(&ObjectId::new(known::SERIAL_NUMBER)).await {
            Ok(vb) if !vb.value.is_exception() => {
                vb.value.as_text().filter(|serial| !serial.is_empty())
            }
            Ok(_) => None,
            Err(e) => {
                debug!(error = %e, "серийный номер недоступен");
                None
            }
        };

        let descriptions = walk(session, &ObjectId::new(known::SUPPLY_DESCRIPTION), self.max_walk_entries).await?;
        let levels = walk(session, &ObjectId::new(known::SUPPLY_LEVEL), self.max_walk_entries).await?;
        let maximums = walk(session, &ObjectId::new(known::SUPPLY_MAXIMUM), self.max_walk_entries).await?;

        let errors = match session.get(&ObjectId::new(known::ERROR_STATE)).await {
            Ok(vb) => decode_error_bitmask(&vb.value)
                .into_iter()
                .map(str::to_string)
                .collect(),
            Err(e) => {
                debug!(error = %e, "hrPrinterDetectedErrorState недоступен");
                Vec::new()
            }
        };

        Ok(Collected {
            woke,
            serial_number,
            supplies: build_supplies(&descriptions, &levels, &maximums),
            errors,
        })
    }
}

/// Расходники по индексам таблицы уровней
fn build_supplies(
    descriptions: &IndexedValues,
    levels: &IndexedValues,
    maximums: &IndexedValues,
) -> Vec<SupplyReading> {
    levels
        .iter()
        .map(|(index, level)| SupplyReading {
            index: *index,
            description: descriptions
                .get(index)
                .and_then(|d| d.as_text())
                .unwrap_or_default(),
            level: level.as_i64(),
            maximum: maximums.get(index).and_then(|m| m.as_i64()),
        })
        .collect()
}

fn decode(device: &Device, collected: Collected, community: &str, version: SnmpVersion) -> PollResult {
    let levels = assign_channels(&collected.supplies, device.kind);
    let found = !collected.supplies.is_empty();
    let (ok, message) = summarize(&collected.errors, found);

    PollResult {
        levels,
        errors: collected.errors,
        serial_number: collected.serial_number,
        connected: Some(collected.woke || found),
        woke: Some(collected.woke),
        ok,
        message,
        source: DataSource::Snmp {
            community: community.to_string(),
            version,
        },
    }
}
