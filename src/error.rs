use thiserror::Error;

/// Ошибки отдельного SNMP запроса.
///
/// Ловятся оркестратором и переключают его на следующую пару
/// (community, версия); наружу не выходят.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SnmpError {
    /// Сокет не открылся, адрес не разрешился или ICMP отказ
    #[error("устройство недоступно: {0}")]
    Unreachable(String),

    /// Ни одна попытка не получила ответа
    #[error("таймаут SNMP запроса после {attempts} попыток")]
    Timeout { attempts: u32 },

    /// Ненулевой error-status или битый ответ
    #[error("ошибка протокола SNMP: {0}")]
    Protocol(String),
}

/// Терминальная ошибка опроса одного устройства.
#[derive(Debug, Clone, Error)]
#[error("не удалось получить SNMP данные с {device}: {}", last_error_text(.last))]
pub struct PollingError {
    pub device: String,
    /// Последняя ошибка, замеченная при переборе
    pub last: Option<SnmpError>,
}

fn last_error_text(last: &Option<SnmpError>) -> String {
    match last {
        Some(e) => e.to_string(),
        None => "нет данных".to_string(),
    }
}

/// Ошибки записи результата в хранилище
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("неизвестный принтер '{0}'")]
    UnknownDevice(String),
}

/// Ошибки слоя запуска опросов (refresh).
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("принтер '{0}' не найден")]
    NotFound(String),

    #[error(transparent)]
    Polling(#[from] PollingError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
