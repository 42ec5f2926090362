use serde::{Deserialize, Serialize};

use crate::snmp::SnmpVersion;

/// Базовые настройки приложения
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Настройки подключения
    pub connection: ConnectionSettings,
    /// Запасной путь через snmpwalk
    pub fallback: FallbackSettings,
    /// Пакетный опрос
    pub batch: BatchSettings,
    /// HTTP сервер
    pub server: ServerSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionSettings {
    /// Таймаут одного SNMP запроса (секунды)
    pub timeout: u64,
    /// Количество повторов при отсутствии ответа
    pub retries: u32,
    /// Предел строк в одном обходе
    pub max_walk_entries: usize,
    /// Community для принтеров без своей
    pub community: String,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            timeout: 3,
            retries: 1,
            max_walk_entries: 512,
            community: "public".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackSettings {
    pub enabled: bool,
    /// Путь к snmpwalk
    pub binary: String,
    /// Таймаут процесса (секунды)
    pub timeout: u64,
    pub version: SnmpVersion,
}

impl Default for FallbackSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            binary: "snmpwalk".to_string(),
            timeout: 10,
            version: SnmpVersion::V1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchSettings {
    /// Одновременных опросов (не больше 16)
    pub max_concurrency: usize,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self { max_concurrency: 8 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
        }
    }
}
