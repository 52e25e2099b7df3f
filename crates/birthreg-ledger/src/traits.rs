use birthreg_types::LedgerTimestamp;
use serde::{Deserialize, Serialize};

use crate::error::LedgerResult;
use crate::keys;

/// One committed change to a key, as reported by the ledger's history index.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyModification {
    pub tx_id: String,
    /// Raw bytes written by the transaction. Empty for deletions.
    pub value: Vec<u8>,
    pub timestamp: LedgerTimestamp,
    pub is_delete: bool,
}

/// A key/value pair matched by a rich query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryResult {
    pub key: String,
    pub value: Vec<u8>,
}

/// A named event published when its transaction commits.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChaincodeEvent {
    pub tx_id: String,
    pub name: String,
    pub payload: Vec<u8>,
}

/// Forward-only cursor over ledger results.
///
/// Cursors hold ledger-side resources. Callers must either call
/// [`close`](LedgerIterator::close) or drop the cursor on every exit path;
/// implementations release their resources on drop as well.
pub trait LedgerIterator<T>: Iterator<Item = LedgerResult<T>> + Send {
    /// Release the cursor. Further calls to `next` return `None`.
    fn close(&mut self) -> LedgerResult<()>;
}

pub type HistoryIterator = Box<dyn LedgerIterator<KeyModification>>;
pub type StateQueryIterator = Box<dyn LedgerIterator<QueryResult>>;

/// Transaction-scoped view of the ledger service.
///
/// An instance is handed to every contract operation. Writes and events are
/// buffered against the transaction and only become visible once the host
/// commits it; reads always see committed state.
pub trait LedgerStub: Send + Sync {
    /// Identifier of the enclosing transaction.
    fn tx_id(&self) -> &str;

    /// Membership identity of the organization that submitted the transaction.
    fn client_msp_id(&self) -> LedgerResult<String>;

    /// Build a namespaced composite key.
    fn create_composite_key(&self, object_type: &str, attributes: &[&str]) -> LedgerResult<String> {
        keys::create_composite_key(object_type, attributes)
    }

    /// Read the committed value at `key`. `Ok(None)` means no value.
    fn get_state(&self, key: &str) -> LedgerResult<Option<Vec<u8>>>;

    /// Unconditionally write `value` at `key`.
    fn put_state(&self, key: &str, value: &[u8]) -> LedgerResult<()>;

    /// Remove the value at `key`. History keeps a deletion marker.
    fn delete_state(&self, key: &str) -> LedgerResult<()>;

    /// All committed modifications of `key`, oldest first.
    fn get_history_for_key(&self, key: &str) -> LedgerResult<HistoryIterator>;

    /// Run a rich query (JSON selector document) against committed state.
    fn get_query_result(&self, query: &str) -> LedgerResult<StateQueryIterator>;

    /// Attach an event to the transaction. Only the last event set survives.
    fn set_event(&self, name: &str, payload: &[u8]) -> LedgerResult<()>;
}
