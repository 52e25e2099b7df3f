//! Change history of a record.
//!
//! Each committed write of a record becomes one [`HistoryEntry`], in the
//! ledger's commit order (oldest first). Stored values are embedded verbatim
//! as JSON; values that are not JSON (deletion markers, foreign writes) are
//! rendered as `null` or as a JSON string so the output is always well formed.
//!
//! Rendered shape:
//!
//! ```json
//! [{"TxId":"…","Value":{…},"Timestamp":"2024-05-01T10:00:00Z","IsDelete":"false"}]
//! ```

use birthreg_ledger::{KeyModification, LedgerStub};
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use tracing::debug;

use crate::cursor::ScopedCursor;
use crate::error::{RegistryError, RegistryResult};
use crate::keys::KeyDeriver;

/// One committed modification of a record.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(rename = "TxId")]
    pub tx_id: String,
    #[serde(rename = "Value")]
    pub value: Box<RawValue>,
    /// RFC 3339, UTC, whole seconds.
    #[serde(rename = "Timestamp")]
    pub timestamp: String,
    #[serde(rename = "IsDelete", with = "bool_text")]
    pub is_delete: bool,
}

impl PartialEq for HistoryEntry {
    fn eq(&self, other: &Self) -> bool {
        self.tx_id == other.tx_id
            && self.value.get() == other.value.get()
            && self.timestamp == other.timestamp
            && self.is_delete == other.is_delete
    }
}

impl HistoryEntry {
    fn from_modification(modification: KeyModification) -> RegistryResult<Self> {
        let timestamp = modification
            .timestamp
            .to_rfc3339()
            .map_err(|e| RegistryError::Decoding(e.to_string()))?;
        Ok(Self {
            value: render_value(modification.value)?,
            tx_id: modification.tx_id,
            timestamp,
            is_delete: modification.is_delete,
        })
    }
}

/// Reads a record's history from the ledger.
pub struct HistoryReconstructor<'a> {
    stub: &'a dyn LedgerStub,
    keys: KeyDeriver<'a>,
}

impl<'a> HistoryReconstructor<'a> {
    pub fn new(stub: &'a dyn LedgerStub, namespace: &'a str) -> Self {
        Self {
            stub,
            keys: KeyDeriver::new(namespace),
        }
    }

    /// Every committed modification of the record, oldest first.
    pub fn history(&self, record_id: &str) -> RegistryResult<Vec<HistoryEntry>> {
        let key = self.keys.derive(self.stub, record_id)?;
        let cursor = ScopedCursor::new(
            self.stub
                .get_history_for_key(&key)
                .map_err(RegistryError::StoreRead)?,
        );
        let entries = cursor.try_collect(RegistryError::StoreRead, HistoryEntry::from_modification)?;
        debug!(record_id, entries = entries.len(), "history reconstructed");
        Ok(entries)
    }

    /// The history rendered as a single JSON array.
    pub fn history_json(&self, record_id: &str) -> RegistryResult<String> {
        render_history(&self.history(record_id)?)
    }
}

/// Serialize entries as a JSON array.
pub fn render_history(entries: &[HistoryEntry]) -> RegistryResult<String> {
    serde_json::to_string(entries).map_err(|e| RegistryError::Encoding(e.to_string()))
}

fn render_value(bytes: Vec<u8>) -> RegistryResult<Box<RawValue>> {
    if bytes.is_empty() {
        return to_raw(&serde_json::Value::Null);
    }
    let text = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => return to_raw(&String::from_utf8_lossy(e.as_bytes())),
    };
    if serde_json::from_str::<&RawValue>(&text).is_ok() {
        return RawValue::from_string(text).map_err(|e| RegistryError::Encoding(e.to_string()));
    }
    // Not JSON: embed as a string.
    to_raw(&text)
}

fn to_raw<T: Serialize + ?Sized>(value: &T) -> RegistryResult<Box<RawValue>> {
    serde_json::value::to_raw_value(value).map_err(|e| RegistryError::Encoding(e.to_string()))
}

mod bool_text {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(if *value { "true" } else { "false" })
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}
