//! Access table: which codes light which pin.
//!
//! The table file maps pin names to the codes that select them:
//!
//! ```json
//! { "A1": ["4006381333931", "4006381333948"], "B2": ["5901234123457"] }
//! ```
//!
//! Entries keep document order. When a code is listed under several pins the
//! first one in the file wins, so the order must survive parsing.

use chrono::Utc;
use ptl_core::{Error, Result};
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::info;

/// One pin and the codes that select it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableEntry {
    pub pin: String,
    pub codes: Vec<String>,
}

/// Ordered pin-to-codes mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessTable {
    entries: Vec<TableEntry>,
}

impl AccessTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a pin with its codes.
    pub fn with_pin<I, S>(mut self, pin: impl Into<String>, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entries.push(TableEntry {
            pin: pin.into(),
            codes: codes.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Entries in document order.
    pub fn entries(&self) -> &[TableEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for AccessTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for entry in &self.entries {
            map.serialize_entry(&entry.pin, &entry.codes)?;
        }
        map.end()
    }
}

struct TableVisitor;

impl<'de> Visitor<'de> for TableVisitor {
    type Value = AccessTable;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an object mapping pin names to arrays of codes")
    }

    fn visit_map<A>(self, mut access: A) -> std::result::Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((pin, codes)) = access.next_entry::<String, Vec<String>>()? {
            entries.push(TableEntry { pin, codes });
        }
        Ok(AccessTable { entries })
    }
}

impl<'de> Deserialize<'de> for AccessTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_map(TableVisitor)
    }
}

#[derive(Debug, Default)]
struct TableSlot {
    table: Arc<AccessTable>,
    last_read: i64,
}

/// Holder of the current table snapshot.
///
/// Readers take an `Arc` snapshot and keep using it even if a reload swaps in
/// a new table meanwhile.
#[derive(Debug, Clone, Default)]
pub struct TableStore {
    inner: Arc<RwLock<TableSlot>>,
}

impl TableStore {
    pub fn new(table: AccessTable) -> Self {
        let store = Self::default();
        store.replace(table);
        store
    }

    /// Read a table file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let store = Self::default();
        store.reload(path)?;
        Ok(store)
    }

    /// Re-read the table file and swap it in.
    ///
    /// On failure the previous table stays active.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn reload(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        let table = AccessTable::from_json(&text)?;
        info!(path = %path.display(), pins = table.len(), "Access table loaded");
        self.replace(table);
        Ok(())
    }

    pub fn replace(&self, table: AccessTable) {
        let mut slot = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        slot.table = Arc::new(table);
        slot.last_read = Utc::now().timestamp();
    }

    pub fn snapshot(&self) -> Arc<AccessTable> {
        Arc::clone(&self.inner.read().unwrap_or_else(PoisonError::into_inner).table)
    }

    /// Unix time of the last successful load, in seconds; zero if never loaded.
    pub fn last_read(&self) -> i64 {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .last_read
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_keeps_document_order() {
        let table = AccessTable::from_json(r#"{"Z9": ["1"], "A1": ["2", "3"], "M5": []}"#).unwrap();

        let pins: Vec<&str> = table.entries().iter().map(|e| e.pin.as_str()).collect();
        assert_eq!(pins, vec!["Z9", "A1", "M5"]);
        assert_eq!(table.entries()[1].codes, vec!["2", "3"]);
    }

    #[test]
    fn test_serialize_keeps_order() {
        let table = AccessTable::new().with_pin("B", ["1"]).with_pin("A", ["2"]);
        assert_eq!(serde_json::to_string(&table).unwrap(), r#"{"B":["1"],"A":["2"]}"#);
    }

    #[test]
    fn test_rejects_non_object() {
        assert!(AccessTable::from_json(r#"["A1"]"#).is_err());
        assert!(AccessTable::from_json(r#"{"A1": "123"}"#).is_err());
    }

    #[test]
    fn test_reload_swaps_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table.json");
        std::fs::write(&path, r#"{"A1": ["111"]}"#).unwrap();

        let store = TableStore::load(&path).unwrap();
        let before = store.snapshot();
        assert!(store.last_read() > 0);

        std::fs::write(&path, r#"{"A1": ["111"], "A2": ["222"]}"#).unwrap();
        store.reload(&path).unwrap();

        assert_eq!(before.len(), 1);
        assert_eq!(store.snapshot().len(), 2);
    }

    #[test]
    fn test_failed_reload_keeps_previous_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table.json");
        std::fs::write(&path, r#"{"A1": ["111"]}"#).unwrap();
        let store = TableStore::load(&path).unwrap();

        std::fs::write(&path, "not json").unwrap();
        assert!(store.reload(&path).is_err());
        assert_eq!(store.snapshot().len(), 1);
    }

    #[test]
    fn test_empty_store_never_read() {
        let store = TableStore::default();
        assert!(store.snapshot().is_empty());
        assert_eq!(store.last_read(), 0);
    }
}
