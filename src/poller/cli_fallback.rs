use std::collections::BTreeMap;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::snmp::{known, ObjectId, SnmpVersion, Target};
use crate::telemetry::decoder::assign_channels;
use crate::telemetry::{DataSource, Device, PollResult, SupplyReading};

/// Внешняя утилита обхода (snmpwalk из net-snmp)
#[async_trait]
pub trait CliRunner: Send + Sync {
    /// stdout утилиты или `None`, если она не отработала
    async fn walk(
        &self,
        version: SnmpVersion,
        community: &str,
        target: &Target,
        oid: &ObjectId,
    ) -> Option<String>;
}

/// Запуск `snmpwalk` дочерним процессом
#[derive(Debug, Clone)]
pub struct SnmpwalkRunner {
    pub binary: String,
    pub timeout: Duration,
}

impl Default for SnmpwalkRunner {
    fn default() -> Self {
        Self {
            binary: "snmpwalk".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

#[async_trait]
impl CliRunner for SnmpwalkRunner {
    async fn walk(
        &self,
        version: SnmpVersion,
        community: &str,
        target: &Target,
        oid: &ObjectId,
    ) -> Option<String> {
        let mut command = Command::new(&self.binary);
        command
            .arg(format!("-v{}", version.cli_flag()))
            .arg("-c")
            .arg(community)
            .arg(target.to_string())
            .arg(oid.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match timeout(self.timeout, command.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                warn!(binary = %self.binary, error = %e, "не удалось запустить утилиту");
                return None;
            }
            Err(_) => {
                debug!(%target, %oid, "snmpwalk не уложился в таймаут");
                return None;
            }
        };

        // 1 snmpwalk возвращает, когда часть OID не найдена
        match output.status.code() {
            Some(0) | Some(1) => Some(String::from_utf8_lossy(&output.stdout).into_owned()),
            code => {
                debug!(%target, %oid, ?code, "snmpwalk завершился с ошибкой");
                None
            }
        }
    }
}

/// Разбирает строки вида `iso.3.6.1....6.1.1 = STRING: "Black Toner"`
pub fn parse_walk_output(stdout: &str) -> BTreeMap<u32, String> {
    let mut values = BTreeMap::new();

    for line in stdout.lines() {
        let Some((left, right)) = line.split_once('=') else {
            continue;
        };
        let Some(oid_part) = left.split_whitespace().last() else {
            continue;
        };
        let Some(index) = oid_part
            .rsplit('.')
            .next()
            .and_then(|last| last.parse::<u32>().ok())
        else {
            continue;
        };
        // "No Such Object available..." без типа значением не считаем
        let Some((_, value)) = right.split_once(':') else {
            continue;
        };

        let value = value.trim();
        let value = value
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .unwrap_or(value);
        values.insert(index, value.to_string());
    }

    values
}

fn parse_integers(raw: &BTreeMap<u32, String>) -> BTreeMap<u32, i64> {
    raw.iter()
        .filter_map(|(index, text)| {
            // "INTEGER: 4500" или "Gauge32: 12 percent"
            let number = text.split_whitespace().next()?;
            number.parse::<i64>().ok().map(|v| (*index, v))
        })
        .collect()
}

/// Четыре поддерева, снятых утилитой
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CliSnapshot {
    pub descriptions: BTreeMap<u32, String>,
    pub levels: BTreeMap<u32, String>,
    pub maximums: BTreeMap<u32, String>,
    pub serials: BTreeMap<u32, String>,
}

impl CliSnapshot {
    pub fn is_empty(&self) -> bool {
        self.descriptions.is_empty()
            && self.levels.is_empty()
            && self.maximums.is_empty()
            && self.serials.is_empty()
    }

    /// Расходники по индексам уровней, как и в SNMP пути
    pub fn supplies(&self) -> Vec<SupplyReading> {
        let levels = parse_integers(&self.levels);
        let maximums = parse_integers(&self.maximums);

        levels
            .iter()
            .map(|(index, level)| SupplyReading {
                index: *index,
                description: self.descriptions.get(index).cloned().unwrap_or_default(),
                level: Some(*level),
                maximum: maximums.get(index).copied(),
            })
            .collect()
    }
}

pub const FALLBACK_OK_MESSAGE: &str = "OK (snmpwalk fallback)";
pub const FALLBACK_EMPTY_MESSAGE: &str = "No se encontraron consumibles via snmpwalk.";

/// Запасной путь через внешнюю утилиту
#[derive(Clone)]
pub struct CliFallback {
    runner: Arc<dyn CliRunner>,
    version: SnmpVersion,
}

impl CliFallback {
    pub fn new(runner: Arc<dyn CliRunner>, version: SnmpVersion) -> Self {
        Self { runner, version }
    }

    async fn walk_map(&self, target: &Target, community: &str, prefix: &[u64]) -> BTreeMap<u32, String> {
        let oid = ObjectId::new(prefix);
        self.runner
            .walk(self.version, community, target, &oid)
            .await
            .map(|stdout| parse_walk_output(&stdout))
            .unwrap_or_default()
    }

    pub async fn snapshot(&self, target: &Target, community: &str) -> CliSnapshot {
        CliSnapshot {
            descriptions: self.walk_map(target, community, known::SUPPLY_DESCRIPTION).await,
            levels: self.walk_map(target, community, known::SUPPLY_LEVEL).await,
            maximums: self.walk_map(target, community, known::SUPPLY_MAXIMUM).await,
            serials: self.walk_map(target, community, known::SERIAL_NUMBER).await,
        }
    }

    /// `None`, если утилита ничего не вернула ни по одному поддереву
    pub async fn poll(&self, device: &Device, community: &str) -> Option<PollResult> {
        let target = device.target();
        let snapshot = self.snapshot(&target, community).await;
        if snapshot.is_empty() {
            debug!(%target, community, "snmpwalk ничего не вернул");
            return None;
        }

        let supplies = snapshot.supplies();
        let found = !supplies.is_empty();
        let levels = assign_channels(&supplies, device.kind);

        Some(PollResult {
            levels,
            errors: Vec::new(),
            serial_number: snapshot
                .serials
                .values()
                .map(|s| s.trim().to_string())
                .find(|s| !s.is_empty()),
            connected: Some(found),
            woke: Some(found),
            ok: found,
            message: if found {
                FALLBACK_OK_MESSAGE.to_string()
            } else {
                FALLBACK_EMPTY_MESSAGE.to_string()
            },
            source: DataSource::CliFallback {
                community: community.to_string(),
            },
        })
    }
}
