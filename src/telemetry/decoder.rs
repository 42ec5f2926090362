//! Чистые функции разбора ответов принтера. Ничего не бросают:
//! мусор на входе даёт пустой список или `None`.

use super::types::{Channel, ColorLevels, DeviceKind, SupplyReading};
use crate::snmp::SnmpValue;

/// Биты hrPrinterDetectedErrorState, от младшего к старшему
pub const ERROR_BITS: [&str; 10] = [
    "Poco papel",
    "Sin papel",
    "Atasco de papel",
    "Offline",
    "Requiere servicio",
    "Bandeja de entrada ausente",
    "Bandeja de salida ausente",
    "Toner bajo",
    "Toner agotado",
    "Bandeja de salida casi llena",
];

/// Ключевые слова в описании расходника, проверяются по порядку
const COLOR_KEYWORDS: [(Channel, &[&str]); 4] = [
    (Channel::Black, &["black", "negro", "bk"]),
    (Channel::Cyan, &["cyan"]),
    (Channel::Magenta, &["magenta"]),
    (Channel::Yellow, &["yellow", "amar"]),
];

/// Позиционная раскладка для цветных принтеров, когда описание ничего не говорит
const POSITIONAL_CHANNELS: [(u32, Channel); 4] = [
    (1, Channel::Black),
    (2, Channel::Cyan),
    (3, Channel::Magenta),
    (4, Channel::Yellow),
];

pub const NO_SUPPLIES_MESSAGE: &str = "No se encontraron datos de consumibles.";

/// Битовая маска → список состояний по возрастанию бита
pub fn decode_error_bits(raw: &[u8]) -> Vec<&'static str> {
    // u128 хватает на 16 октетов, длиннее маска не бывает
    if raw.len() > 16 {
        return Vec::new();
    }
    let value = raw
        .iter()
        .fold(0u128, |acc, byte| (acc << 8) | u128::from(*byte));
    labels_for(value)
}

/// То же для значения, пришедшего по SNMP (строка октетов или целое)
pub fn decode_error_bitmask(raw: &SnmpValue) -> Vec<&'static str> {
    match raw {
        SnmpValue::OctetString(bytes) => decode_error_bits(bytes),
        SnmpValue::Integer(v) if *v >= 0 => labels_for(*v as u128),
        SnmpValue::Unsigned(v) => labels_for(u128::from(*v)),
        _ => Vec::new(),
    }
}

fn labels_for(value: u128) -> Vec<&'static str> {
    ERROR_BITS
        .iter()
        .enumerate()
        .filter(|(bit, _)| value & (1u128 << bit) != 0)
        .map(|(_, label)| *label)
        .collect()
}

/// Процент заполнения с одной цифрой после запятой
pub fn percentage(level: Option<i64>, maximum: Option<i64>) -> Option<f64> {
    let (level, maximum) = (level?, maximum?);
    // отрицательные уровни в Printer-MIB означают "неизвестно"
    if maximum <= 0 || level < 0 {
        return None;
    }
    let raw = (level as f64 / maximum as f64 * 100.0).clamp(0.0, 100.0);
    // половины к чётному: 0.25 -> 0.2
    Some((raw * 10.0).round_ties_even() / 10.0)
}

/// Угадывает канал по описанию расходника
pub fn guess_color(description: &str) -> Option<Channel> {
    let desc = description.to_lowercase();
    COLOR_KEYWORDS
        .iter()
        .find(|(_, words)| words.iter().any(|w| desc.contains(w)))
        .map(|(channel, _)| *channel)
}

fn positional_channel(index: u32) -> Option<Channel> {
    POSITIONAL_CHANNELS
        .iter()
        .find(|(i, _)| *i == index)
        .map(|(_, channel)| *channel)
}

/// Раскладывает расходники по каналам.
///
/// Описание важнее позиции; позиция используется только для цветных.
/// У монохромного единственный расходник считается чёрным.
pub fn assign_channels(supplies: &[SupplyReading], kind: DeviceKind) -> ColorLevels {
    let mut levels = ColorLevels::default();

    for supply in supplies {
        let channel = guess_color(&supply.description).or_else(|| match kind {
            DeviceKind::Color => positional_channel(supply.index),
            DeviceKind::Monochrome => None,
        });
        let Some(channel) = channel else {
            continue;
        };
        levels.fill(channel, percentage(supply.level, supply.maximum));
    }

    if kind == DeviceKind::Monochrome && levels.black.is_none() {
        if let Some(first) = supplies.first() {
            levels.black = percentage(first.level, first.maximum);
        }
    }

    levels
}

/// Итоговое сообщение и флаг ok
pub fn summarize(errors: &[String], supplies_found: bool) -> (bool, String) {
    let ok = errors.is_empty() && supplies_found;
    let message = if !errors.is_empty() {
        errors.join(", ")
    } else if !supplies_found {
        NO_SUPPLIES_MESSAGE.to_string()
    } else {
        "OK".to_string()
    };
    (ok, message)
}
