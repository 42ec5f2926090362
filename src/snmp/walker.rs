use std::collections::BTreeMap;

use tracing::trace;

use super::oid::ObjectId;
use super::session::Session;
use super::value::SnmpValue;
use crate::error::SnmpError;

/// Предел строк в одной таблице; больше принтер не отдаёт
pub const DEFAULT_MAX_WALK_ENTRIES: usize = 512;

/// Результат walk: последний компонент OID → значение
pub type IndexedValues = BTreeMap<u32, SnmpValue>;

/// Обход поддерева через GETNEXT.
///
/// Всё или ничего: при ошибке посреди обхода собранное выбрасывается,
/// неполные таблицы дают неверные проценты.
pub async fn walk(
    session: &mut Session,
    prefix: &ObjectId,
    max_entries: usize,
) -> Result<IndexedValues, SnmpError> {
    let mut results = IndexedValues::new();
    let mut current = prefix.clone();

    loop {
        let vb = session.get_next(&current).await?;

        if vb.value.is_exception() || !vb.oid.is_under(prefix) {
            break;
        }

        // агент обязан возвращать строго возрастающие OID, иначе зациклимся
        if vb.oid <= current {
            return Err(SnmpError::Protocol(format!(
                "OID не возрастает: {} после {}",
                vb.oid, current
            )));
        }

        if results.len() >= max_entries {
            return Err(SnmpError::Protocol(format!(
                "поддерево {} длиннее {} строк",
                prefix, max_entries
            )));
        }

        trace!(oid = %vb.oid, value = ?vb.value, "walk");

        if let Some(index) = vb.oid.last_index() {
            results.insert(index, vb.value);
        }
        current = vb.oid;
    }

    Ok(results)
}
