use serde::{Deserialize, Serialize};

use crate::snmp::{SnmpVersion, Target};

/// Цветной или монохромный принтер
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceKind {
    #[serde(rename = "color", alias = "COLOR")]
    Color,
    #[serde(rename = "monochrome", alias = "B/N", alias = "bw")]
    Monochrome,
}

impl Default for DeviceKind {
    fn default() -> Self {
        DeviceKind::Monochrome
    }
}

fn default_port() -> u16 {
    161
}

fn default_community() -> String {
    "public".to_string()
}

fn default_enabled() -> bool {
    true
}

/// Принтер из инвентаря
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub location: Option<String>,
    /// Этаж
    #[serde(default)]
    pub floor: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    pub address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_community")]
    pub community: String,
    #[serde(default)]
    pub kind: DeviceKind,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl Device {
    pub fn target(&self) -> Target {
        Target::new(self.address.clone(), self.port)
    }
}

/// Канал тонера
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Black,
    Cyan,
    Magenta,
    Yellow,
}

/// Один расходник, найденный при обходе. Живёт только во время опроса.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupplyReading {
    pub index: u32,
    pub description: String,
    pub level: Option<i64>,
    pub maximum: Option<i64>,
}

/// Проценты по четырём каналам
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ColorLevels {
    pub black: Option<f64>,
    pub cyan: Option<f64>,
    pub magenta: Option<f64>,
    pub yellow: Option<f64>,
}

impl ColorLevels {
    fn slot(&mut self, channel: Channel) -> &mut Option<f64> {
        match channel {
            Channel::Black => &mut self.black,
            Channel::Cyan => &mut self.cyan,
            Channel::Magenta => &mut self.magenta,
            Channel::Yellow => &mut self.yellow,
        }
    }

    /// Записывает значение, только если канал ещё пуст (первое значение побеждает)
    pub fn fill(&mut self, channel: Channel, percent: Option<f64>) {
        let slot = self.slot(channel);
        if slot.is_none() {
            *slot = percent;
        }
    }
}

/// Каким путём получены данные
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "via", rename_all = "snake_case")]
pub enum DataSource {
    Snmp {
        community: String,
        version: SnmpVersion,
    },
    CliFallback {
        community: String,
    },
}

/// Нормализованный итог одного опроса
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollResult {
    pub levels: ColorLevels,
    pub errors: Vec<String>,
    pub serial_number: Option<String>,
    pub connected: Option<bool>,
    pub woke: Option<bool>,
    pub ok: bool,
    pub message: String,
    pub source: DataSource,
}
