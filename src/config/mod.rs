use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

pub mod inventory;
pub mod settings;

pub use inventory::Inventory;
pub use settings::Settings;

use crate::snmp::RequestPolicy;

/// Путь к конфигурации по умолчанию
pub const DEFAULT_CONFIG_PATH: &str = "./printers.yaml";

/// Главная конфигурация приложения
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Базовые настройки
    #[serde(default)]
    pub settings: Settings,
    /// Принтеры
    #[serde(flatten)]
    pub inventory: Inventory,
}

impl AppConfig {
    /// Загружает конфигурацию из YAML файла
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .context(format!("Не удалось прочитать файл: {}", path.display()))?;

        let mut config: AppConfig =
            serde_yml::from_str(&content).context("Не удалось распарсить YAML")?;

        config.inventory.validate()?;
        let community = config.get_default_community();
        config.inventory.fill_communities(&community);

        Ok(config)
    }

    /// Путь из PRINTER_CONFIG или по умолчанию
    pub fn resolve_path(cli_path: Option<&Path>) -> String {
        match cli_path {
            Some(path) => path.display().to_string(),
            None => env::var("PRINTER_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string()),
        }
    }

    /// Получает timeout из переменной окружения или из настроек
    pub fn get_timeout(&self) -> u64 {
        env_parse("SNMP_TIMEOUT").unwrap_or(self.settings.connection.timeout)
    }

    pub fn get_retries(&self) -> u32 {
        env_parse("SNMP_RETRIES").unwrap_or(self.settings.connection.retries)
    }

    /// Community для принтеров, у которых своя не задана
    pub fn get_default_community(&self) -> String {
        env::var("SNMP_COMMUNITY").unwrap_or_else(|_| self.settings.connection.community.clone())
    }

    pub fn get_snmpwalk_binary(&self) -> String {
        env::var("SNMPWALK_BIN").unwrap_or_else(|_| self.settings.fallback.binary.clone())
    }

    pub fn get_concurrency(&self) -> usize {
        env_parse("POLL_CONCURRENCY").unwrap_or(self.settings.batch.max_concurrency)
    }

    pub fn get_bind(&self) -> String {
        env::var("HTTP_BIND").unwrap_or_else(|_| self.settings.server.bind.clone())
    }

    pub fn request_policy(&self) -> RequestPolicy {
        RequestPolicy {
            timeout: Duration::from_secs(self.get_timeout().max(1)),
            retries: self.get_retries(),
        }
    }

    pub fn fallback_timeout(&self) -> Duration {
        Duration::from_secs(self.settings.fallback.timeout.max(1))
    }

    pub fn debug_config(&self) {
        tracing::info!(
            printers = self.inventory.printers.len(),
            timeout = self.get_timeout(),
            retries = self.get_retries(),
            concurrency = self.get_concurrency(),
            fallback = self.settings.fallback.enabled,
            "конфигурация загружена"
        );
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.parse().ok())
}
