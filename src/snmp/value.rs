use super::oid::ObjectId;

/// Значение varbind, скопированное из ответа агента.
#[derive(Debug, Clone, PartialEq)]
pub enum SnmpValue {
    Integer(i64),
    OctetString(Vec<u8>),
    /// Counter32 / Gauge32 / TimeTicks / Counter64
    Unsigned(u64),
    ObjectId(ObjectId),
    Null,
    /// noSuchObject / noSuchInstance / endOfMibView
    NoSuchObject,
    NoSuchInstance,
    EndOfMibView,
    /// Типы, которые опрос не использует
    Other(String),
}

impl SnmpValue {
    /// Исключения v2c, которые не являются данными
    pub fn is_exception(&self) -> bool {
        matches!(
            self,
            SnmpValue::NoSuchObject | SnmpValue::NoSuchInstance | SnmpValue::EndOfMibView
        )
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SnmpValue::Integer(v) => Some(*v),
            SnmpValue::Unsigned(v) => i64::try_from(*v).ok(),
            SnmpValue::OctetString(bytes) => std::str::from_utf8(bytes).ok()?.trim().parse().ok(),
            _ => None,
        }
    }

    /// Текстовое представление (описания расходников, серийник)
    pub fn as_text(&self) -> Option<String> {
        match self {
            SnmpValue::OctetString(bytes) => {
                let text = String::from_utf8_lossy(bytes);
                Some(text.trim_end_matches('\0').trim().to_string())
            }
            SnmpValue::Integer(v) => Some(v.to_string()),
            SnmpValue::Unsigned(v) => Some(v.to_string()),
            SnmpValue::ObjectId(oid) => Some(oid.to_string()),
            _ => None,
        }
    }
}

impl From<&snmp2::Value<'_>> for SnmpValue {
    fn from(value: &snmp2::Value<'_>) -> Self {
        use snmp2::Value;

        match value {
            Value::Integer(v) => SnmpValue::Integer(*v),
            Value::OctetString(bytes) => SnmpValue::OctetString(bytes.to_vec()),
            Value::Counter32(v) | Value::Unsigned32(v) | Value::Timeticks(v) => {
                SnmpValue::Unsigned(u64::from(*v))
            }
            Value::Counter64(v) => SnmpValue::Unsigned(*v),
            Value::ObjectIdentifier(oid) => match oid.to_string().parse() {
                Ok(oid) => SnmpValue::ObjectId(oid),
                Err(_) => SnmpValue::Other(oid.to_string()),
            },
            Value::Null => SnmpValue::Null,
            Value::NoSuchObject => SnmpValue::NoSuchObject,
            Value::NoSuchInstance => SnmpValue::NoSuchInstance,
            Value::EndOfMibView => SnmpValue::EndOfMibView,
            other => SnmpValue::Other(format!("{:?}", other)),
        }
    }
}

/// Пара OID → значение
#[derive(Debug, Clone, PartialEq)]
pub struct VarBind {
    pub oid: ObjectId,
    pub value: SnmpValue,
}

impl VarBind {
    pub fn new(oid: ObjectId, value: SnmpValue) -> Self {
        Self { oid, value }
    }
}
