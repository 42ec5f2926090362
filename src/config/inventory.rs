use std::collections::HashSet;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::telemetry::Device;

/// Список принтеров из конфигурации
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Inventory {
    #[serde(default)]
    pub printers: Vec<Device>,
}

impl Inventory {
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for printer in &self.printers {
            if printer.id.trim().is_empty() {
                anyhow::bail!("Принтер '{}' без id", printer.name);
            }
            if printer.address.trim().is_empty() {
                anyhow::bail!("У принтера '{}' не указан адрес", printer.id);
            }
            if !seen.insert(printer.id.as_str()) {
                anyhow::bail!("Повторяющийся id принтера: '{}'", printer.id);
            }
        }
        Ok(())
    }

    /// Пустая community заменяется общей по умолчанию
    pub fn fill_communities(&mut self, default_community: &str) {
        for printer in &mut self.printers {
            if printer.community.trim().is_empty() {
                printer.community = default_community.to_string();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::DeviceKind;

    fn parse(yaml: &str) -> Inventory {
        serde_yml::from_str(yaml).unwrap()
    }

    #[test]
    fn legacy_kinds_and_defaults() {
        let inventory = parse(
            r#"
printers:
  - id: rrhh
    name: RRHH
    address: 10.10.1.20
    kind: "B/N"
  - id: direccion
    name: Dirección
    address: 10.10.1.21
    port: 1161
    floor: "2"
    notes: Toner compatible
    community: secreto
    kind: COLOR
    enabled: false
"#,
        );
        inventory.validate().unwrap();

        let first = &inventory.printers[0];
        assert_eq!(first.kind, DeviceKind::Monochrome);
        assert_eq!(first.port, 161);
        assert_eq!(first.community, "public");
        assert!(first.enabled);

        let second = &inventory.printers[1];
        assert_eq!(second.kind, DeviceKind::Color);
        assert_eq!(second.port, 1161);
        assert_eq!(second.floor.as_deref(), Some("2"));
        assert_eq!(second.notes.as_deref(), Some("Toner compatible"));
        assert_eq!(first.floor, None);
        assert!(!second.enabled);
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let inventory = parse(
            r#"
printers:
  - { id: a, name: A, address: 10.0.0.1 }
  - { id: a, name: B, address: 10.0.0.2 }
"#,
        );
        assert!(inventory.validate().is_err());
    }

    #[test]
    fn blank_community_gets_default() {
        let mut inventory = parse(
            r#"
printers:
  - { id: a, name: A, address: 10.0.0.1, community: "" }
  - { id: b, name: B, address: 10.0.0.2, community: mine }
"#,
        );
        inventory.fill_communities("campus");
        assert_eq!(inventory.printers[0].community, "campus");
        assert_eq!(inventory.printers[1].community, "mine");
    }
}
