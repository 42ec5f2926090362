use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result};

/// Владеющий OID без привязки к буферу сессии.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId(Vec<u64>);

impl ObjectId {
    pub fn new(parts: &[u64]) -> Self {
        Self(parts.to_vec())
    }

    pub fn parts(&self) -> &[u64] {
        &self.0
    }

    /// Лежит ли OID внутри поддерева `prefix` (сам prefix не считается)
    pub fn is_under(&self, prefix: &ObjectId) -> bool {
        self.0.len() > prefix.0.len() && self.0.starts_with(&prefix.0)
    }

    /// Последний компонент, по нему ключуются строки таблиц
    pub fn last_index(&self) -> Option<u32> {
        self.0.last().and_then(|&v| u32::try_from(v).ok())
    }

    pub fn child(&self, sub: u64) -> Self {
        let mut parts = self.0.clone();
        parts.push(sub);
        Self(parts)
    }

    /// Конвертация в OID из snmp2
    pub fn to_snmp2(&self) -> Result<snmp2::Oid<'static>> {
        snmp2::Oid::from(&self.0)
            .map_err(|e| anyhow::anyhow!("Не удалось создать Oid из '{}': {:?}", self, e))
    }
}

impl FromStr for ObjectId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        // net-snmp пишет "iso.3.6.1...", первый компонент iso == 1
        let trimmed = s.trim().trim_start_matches('.');
        let trimmed = match trimmed.strip_prefix("iso") {
            Some(rest) => format!("1{}", rest),
            None => trimmed.to_string(),
        };

        let parts: Result<Vec<u64>, _> = trimmed
            .split('.')
            .filter(|p| !p.is_empty())
            .map(|p| p.parse::<u64>())
            .collect();

        let parts = parts.context(format!("Невалидный OID: {}", s))?;
        if parts.is_empty() {
            anyhow::bail!("Пустой OID: '{}'", s);
        }
        Ok(Self(parts))
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for part in &self.0 {
            if !first {
                f.write_str(".")?;
            }
            write!(f, "{}", part)?;
            first = false;
        }
        Ok(())
    }
}

/// Парсит OID из строки (ошибка если строка не OID)
pub fn parse_oid(s: &str) -> Result<ObjectId> {
    s.parse()
}

/// Известные объекты Printer-MIB / Host-Resources-MIB
pub mod known {
    /// sysDescr.0
    pub const SYS_DESCR: &[u64] = &[1, 3, 6, 1, 2, 1, 1, 1, 0];
    /// prtMarkerSuppliesDescription.1
    pub const SUPPLY_DESCRIPTION: &[u64] = &[1, 3, 6, 1, 2, 1, 43, 11, 1, 1, 6, 1];
    /// prtMarkerSuppliesMaxCapacity.1
    pub const SUPPLY_MAXIMUM: &[u64] = &[1, 3, 6, 1, 2, 1, 43, 11, 1, 1, 8, 1];
    /// prtMarkerSuppliesLevel.1
    pub const SUPPLY_LEVEL: &[u64] = &[1, 3, 6, 1, 2, 1, 43, 11, 1, 1, 9, 1];
    /// prtGeneralSerialNumber.1
    pub const SERIAL_NUMBER: &[u64] = &[1, 3, 6, 1, 2, 1, 43, 5, 1, 1, 17, 1];
    /// hrPrinterDetectedErrorState.1
    pub const ERROR_STATE: &[u64] = &[1, 3, 6, 1, 2, 1, 25, 3, 5, 1, 2, 1];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_and_net_snmp_forms() {
        let a = parse_oid("1.3.6.1.2.1.43.11.1.1.6.1.2").unwrap();
        let b = parse_oid("iso.3.6.1.2.1.43.11.1.1.6.1.2").unwrap();
        let c = parse_oid(".1.3.6.1.2.1.43.11.1.1.6.1.2").unwrap();
        assert_eq!(a, b);
        assert_eq!(a, c);
        assert_eq!(a.last_index(), Some(2));
        assert_eq!(a.to_string(), "1.3.6.1.2.1.43.11.1.1.6.1.2");
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_oid("").is_err());
        assert!(parse_oid("1.3.x.6").is_err());
        assert!(parse_oid("SNMPv2-MIB::sysDescr.0").is_err());
    }

    #[test]
    fn subtree_membership() {
        let prefix = ObjectId::new(known::SUPPLY_LEVEL);
        assert!(prefix.child(1).is_under(&prefix));
        assert!(!prefix.is_under(&prefix));
        assert!(!ObjectId::new(known::SUPPLY_MAXIMUM).child(1).is_under(&prefix));
    }
}
