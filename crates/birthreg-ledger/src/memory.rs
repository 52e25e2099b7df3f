use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use birthreg_types::LedgerTimestamp;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::error::{LedgerError, LedgerResult};
use crate::selector::Selector;
use crate::traits::{
    ChaincodeEvent, HistoryIterator, KeyModification, LedgerIterator, LedgerStub, QueryResult,
    StateQueryIterator,
};

/// Capacity of the committed-event broadcast channel.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// In-memory ledger for tests, local tooling, and embedding.
///
/// Holds committed world state, a per-key modification history, and the log
/// of committed events. Work happens inside [`MemoryTransaction`]s obtained
/// from [`begin`](InMemoryLedger::begin); nothing a transaction does is
/// visible until it commits.
pub struct InMemoryLedger {
    inner: RwLock<LedgerSnapshot>,
    events: broadcast::Sender<ChaincodeEvent>,
    open_cursors: Arc<AtomicUsize>,
    pending_write_failure: Mutex<Option<String>>,
}

/// Serializable image of everything the ledger has committed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    /// Number of committed blocks. Every committing transaction gets one.
    pub height: u64,
    pub state: BTreeMap<String, VersionedValue>,
    pub history: BTreeMap<String, Vec<KeyModification>>,
    pub events: Vec<ChaincodeEvent>,
}

/// A committed value and the block height that wrote it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionedValue {
    pub value: Vec<u8>,
    pub version: u64,
}

/// Outcome of a successful commit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitReceipt {
    pub tx_id: String,
    pub height: u64,
    pub writes: usize,
    pub event: Option<String>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::from_snapshot(LedgerSnapshot::default())
    }

    /// Restore a ledger from a previously taken snapshot.
    pub fn from_snapshot(snapshot: LedgerSnapshot) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: RwLock::new(snapshot),
            events,
            open_cursors: Arc::new(AtomicUsize::new(0)),
            pending_write_failure: Mutex::new(None),
        }
    }

    /// Copy of all committed data.
    pub fn snapshot(&self) -> LedgerSnapshot {
        self.inner.read().expect("ledger lock poisoned").clone()
    }

    /// Start a transaction submitted by the given organization.
    pub fn begin(&self, msp_id: impl Into<String>) -> MemoryTransaction<'_> {
        MemoryTransaction::new(self, Some(msp_id.into()))
    }

    /// Start a transaction whose submitter identity cannot be resolved.
    pub fn begin_anonymous(&self) -> MemoryTransaction<'_> {
        MemoryTransaction::new(self, None)
    }

    /// Receive every event published by a commit from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<ChaincodeEvent> {
        self.events.subscribe()
    }

    /// All committed events, oldest first.
    pub fn events(&self) -> Vec<ChaincodeEvent> {
        self.inner.read().expect("ledger lock poisoned").events.clone()
    }

    /// Committed value at `key`, bypassing any transaction.
    pub fn committed_value(&self, key: &str) -> Option<Vec<u8>> {
        let inner = self.inner.read().expect("ledger lock poisoned");
        inner.state.get(key).map(|v| v.value.clone())
    }

    /// Number of committed blocks.
    pub fn height(&self) -> u64 {
        self.inner.read().expect("ledger lock poisoned").height
    }

    /// Cursors handed out and not yet closed or dropped.
    pub fn open_cursors(&self) -> usize {
        self.open_cursors.load(Ordering::SeqCst)
    }

    /// Make the next `put_state` on any transaction fail with `reason`.
    pub fn fail_next_write(&self, reason: impl Into<String>) {
        *self
            .pending_write_failure
            .lock()
            .expect("fault lock poisoned") = Some(reason.into());
    }

    fn take_write_failure(&self) -> Option<String> {
        self.pending_write_failure
            .lock()
            .expect("fault lock poisoned")
            .take()
    }

    fn cursor<T: Send + 'static>(&self, items: Vec<T>) -> VecCursor<T> {
        VecCursor::new(items, Arc::clone(&self.open_cursors))
    }

    fn commit(&self, tx: &MemoryTransaction<'_>, rwset: RwSet) -> LedgerResult<CommitReceipt> {
        let mut inner = self.inner.write().expect("ledger lock poisoned");

        for (key, read_version) in &rwset.reads {
            let current = inner.state.get(key).map(|v| v.version);
            if current != *read_version {
                warn!(tx_id = %tx.tx_id, key = %key.escape_debug(), "stale read set; rejecting commit");
                return Err(LedgerError::MvccReadConflict { key: key.clone() });
            }
        }

        if rwset.writes.is_empty() && rwset.event.is_none() {
            return Ok(CommitReceipt {
                tx_id: tx.tx_id.clone(),
                height: inner.height,
                writes: 0,
                event: None,
            });
        }

        inner.height += 1;
        let height = inner.height;
        let writes = rwset.writes.len();
        for (key, write) in rwset.writes {
            let (value, is_delete) = match write {
                Some(value) => {
                    inner.state.insert(
                        key.clone(),
                        VersionedValue {
                            value: value.clone(),
                            version: height,
                        },
                    );
                    (value, false)
                }
                None => {
                    inner.state.remove(&key);
                    (Vec::new(), true)
                }
            };
            inner.history.entry(key).or_default().push(KeyModification {
                tx_id: tx.tx_id.clone(),
                value,
                timestamp: tx.timestamp,
                is_delete,
            });
        }

        let event_name = rwset.event.as_ref().map(|e| e.name.clone());
        if let Some(event) = rwset.event {
            inner.events.push(event.clone());
            // No subscribers is not an error; the event stays in the log.
            let _ = self.events.send(event);
        }

        debug!(tx_id = %tx.tx_id, height, writes, "transaction committed");
        Ok(CommitReceipt {
            tx_id: tx.tx_id.clone(),
            height,
            writes,
            event: event_name,
        })
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read().expect("ledger lock poisoned");
        f.debug_struct("InMemoryLedger")
            .field("height", &inner.height)
            .field("keys", &inner.state.len())
            .field("events", &inner.events.len())
            .finish()
    }
}

#[derive(Default)]
struct RwSet {
    /// Version observed for each key read; `None` means the key was absent.
    reads: BTreeMap<String, Option<u64>>,
    /// Buffered writes; `None` is a delete.
    writes: BTreeMap<String, Option<Vec<u8>>>,
    event: Option<ChaincodeEvent>,
}

/// A single transaction against an [`InMemoryLedger`].
///
/// Implements [`LedgerStub`]. Reads are validated optimistically at
/// [`commit`](MemoryTransaction::commit); dropping the transaction without
/// committing discards its writes and event.
pub struct MemoryTransaction<'a> {
    ledger: &'a InMemoryLedger,
    tx_id: String,
    msp_id: Option<String>,
    timestamp: LedgerTimestamp,
    rwset: Mutex<RwSet>,
}

impl<'a> MemoryTransaction<'a> {
    fn new(ledger: &'a InMemoryLedger, msp_id: Option<String>) -> Self {
        Self {
            ledger,
            tx_id: uuid::Uuid::now_v7().simple().to_string(),
            msp_id,
            timestamp: LedgerTimestamp::now(),
            rwset: Mutex::new(RwSet::default()),
        }
    }

    /// Override the commit timestamp recorded in history.
    pub fn with_timestamp(mut self, timestamp: LedgerTimestamp) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn timestamp(&self) -> LedgerTimestamp {
        self.timestamp
    }

    /// Validate the read set and apply buffered writes atomically.
    pub fn commit(self) -> LedgerResult<CommitReceipt> {
        let rwset = std::mem::take(&mut *self.rwset.lock().expect("rwset lock poisoned"));
        self.ledger.commit(&self, rwset)
    }

    fn rwset(&self) -> std::sync::MutexGuard<'_, RwSet> {
        self.rwset.lock().expect("rwset lock poisoned")
    }
}

impl LedgerStub for MemoryTransaction<'_> {
    fn tx_id(&self) -> &str {
        &self.tx_id
    }

    fn client_msp_id(&self) -> LedgerResult<String> {
        self.msp_id
            .clone()
            .ok_or_else(|| LedgerError::IdentityUnavailable("transaction has no creator".into()))
    }

    fn get_state(&self, key: &str) -> LedgerResult<Option<Vec<u8>>> {
        if key.is_empty() {
            return Err(LedgerError::InvalidKey("key must not be empty".into()));
        }
        let inner = self.ledger.inner.read().expect("ledger lock poisoned");
        let entry = inner.state.get(key);
        self.rwset()
            .reads
            .entry(key.to_string())
            .or_insert(entry.map(|v| v.version));
        Ok(entry.map(|v| v.value.clone()))
    }

    fn put_state(&self, key: &str, value: &[u8]) -> LedgerResult<()> {
        if key.is_empty() {
            return Err(LedgerError::InvalidKey("key must not be empty".into()));
        }
        if let Some(reason) = self.ledger.take_write_failure() {
            return Err(LedgerError::WriteRejected(reason));
        }
        self.rwset()
            .writes
            .insert(key.to_string(), Some(value.to_vec()));
        Ok(())
    }

    fn delete_state(&self, key: &str) -> LedgerResult<()> {
        if key.is_empty() {
            return Err(LedgerError::InvalidKey("key must not be empty".into()));
        }
        self.rwset().writes.insert(key.to_string(), None);
        Ok(())
    }

    fn get_history_for_key(&self, key: &str) -> LedgerResult<HistoryIterator> {
        if key.is_empty() {
            return Err(LedgerError::InvalidKey("key must not be empty".into()));
        }
        let inner = self.ledger.inner.read().expect("ledger lock poisoned");
        let entries = inner.history.get(key).cloned().unwrap_or_default();
        Ok(Box::new(self.ledger.cursor(entries)))
    }

    fn get_query_result(&self, query: &str) -> LedgerResult<StateQueryIterator> {
        let selector = Selector::parse(query)?;
        let inner = self.ledger.inner.read().expect("ledger lock poisoned");
        let mut hits: Vec<(&String, serde_json::Value, &Vec<u8>)> = inner
            .state
            .iter()
            .filter_map(|(key, entry)| {
                let doc: serde_json::Value = serde_json::from_slice(&entry.value).ok()?;
                selector
                    .matches(&doc)
                    .then_some((key, doc, &entry.value))
            })
            .collect();
        // Stable: equal sort keys keep key order.
        hits.sort_by(|a, b| selector.compare(&a.1, &b.1));
        let matched = hits
            .into_iter()
            .skip(selector.skip())
            .take(selector.limit().unwrap_or(usize::MAX))
            .map(|(key, doc, value)| {
                let value = if selector.projects() {
                    serde_json::to_vec(&selector.project(&doc))
                        .map_err(|e| LedgerError::Serialization(e.to_string()))?
                } else {
                    value.clone()
                };
                Ok(QueryResult {
                    key: key.clone(),
                    value,
                })
            })
            .collect::<LedgerResult<Vec<_>>>()?;
        debug!(matched = matched.len(), "rich query evaluated");
        Ok(Box::new(self.ledger.cursor(matched)))
    }

    fn set_event(&self, name: &str, payload: &[u8]) -> LedgerResult<()> {
        if name.is_empty() {
            return Err(LedgerError::EmptyEventName);
        }
        self.rwset().event = Some(ChaincodeEvent {
            tx_id: self.tx_id.clone(),
            name: name.to_string(),
            payload: payload.to_vec(),
        });
        Ok(())
    }
}

/// Cursor over results materialized when the cursor was opened.
struct VecCursor<T> {
    items: std::vec::IntoIter<T>,
    open: Option<Arc<AtomicUsize>>,
}

impl<T> VecCursor<T> {
    fn new(items: Vec<T>, open_cursors: Arc<AtomicUsize>) -> Self {
        open_cursors.fetch_add(1, Ordering::SeqCst);
        Self {
            items: items.into_iter(),
            open: Some(open_cursors),
        }
    }

    fn release(&mut self) {
        if let Some(counter) = self.open.take() {
            counter.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

impl<T> Iterator for VecCursor<T> {
    type Item = LedgerResult<T>;

    fn next(&mut self) -> Option<Self::Item> {
        self.open.as_ref()?;
        self.items.next().map(Ok)
    }
}

impl<T: Send> LedgerIterator<T> for VecCursor<T> {
    fn close(&mut self) -> LedgerResult<()> {
        self.release();
        Ok(())
    }
}

impl<T> Drop for VecCursor<T> {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::create_composite_key;

    fn key(id: &str) -> String {
        create_composite_key("BirthRecord", &[id]).unwrap()
    }

    fn commit_put(ledger: &InMemoryLedger, key: &str, value: &[u8]) -> CommitReceipt {
        let tx = ledger.begin("Org1MSP");
        tx.put_state(key, value).unwrap();
        tx.commit().unwrap()
    }

    // -----------------------------------------------------------------------
    // State
    // -----------------------------------------------------------------------

    #[test]
    fn writes_are_invisible_until_commit() {
        let ledger = InMemoryLedger::new();
        let k = key("R1");
        let tx = ledger.begin("Org1MSP");
        tx.put_state(&k, b"{}").unwrap();
        assert_eq!(tx.get_state(&k).unwrap(), None);
        assert_eq!(ledger.committed_value(&k), None);

        tx.commit().unwrap();
        assert_eq!(ledger.committed_value(&k), Some(b"{}".to_vec()));
    }

    #[test]
    fn dropped_transaction_leaves_no_trace() {
        let ledger = InMemoryLedger::new();
        {
            let tx = ledger.begin("Org1MSP");
            tx.put_state(&key("R1"), b"{}").unwrap();
            tx.set_event("Created", b"{}").unwrap();
        }
        assert_eq!(ledger.height(), 0);
        assert!(ledger.events().is_empty());
    }

    #[test]
    fn put_overwrites_unconditionally() {
        let ledger = InMemoryLedger::new();
        let k = key("R1");
        commit_put(&ledger, &k, b"1");
        commit_put(&ledger, &k, b"2");
        assert_eq!(ledger.committed_value(&k), Some(b"2".to_vec()));
    }

    #[test]
    fn empty_keys_are_rejected() {
        let ledger = InMemoryLedger::new();
        let tx = ledger.begin("Org1MSP");
        assert!(matches!(tx.get_state(""), Err(LedgerError::InvalidKey(_))));
        assert!(matches!(tx.put_state("", b"x"), Err(LedgerError::InvalidKey(_))));
        assert!(matches!(tx.delete_state(""), Err(LedgerError::InvalidKey(_))));
    }

    #[test]
    fn injected_write_failure_fires_once() {
        let ledger = InMemoryLedger::new();
        ledger.fail_next_write("disk full");
        let tx = ledger.begin("Org1MSP");
        assert_eq!(
            tx.put_state("k", b"v"),
            Err(LedgerError::WriteRejected("disk full".into()))
        );
        assert!(tx.put_state("k", b"v").is_ok());
    }

    // -----------------------------------------------------------------------
    // Identity
    // -----------------------------------------------------------------------

    #[test]
    fn identity_resolution() {
        let ledger = InMemoryLedger::new();
        assert_eq!(ledger.begin("Org2MSP").client_msp_id().unwrap(), "Org2MSP");
        assert!(matches!(
            ledger.begin_anonymous().client_msp_id(),
            Err(LedgerError::IdentityUnavailable(_))
        ));
    }

    #[test]
    fn transaction_ids_are_unique() {
        let ledger = InMemoryLedger::new();
        let a = ledger.begin("Org1MSP");
        let b = ledger.begin("Org1MSP");
        assert_ne!(a.tx_id(), b.tx_id());
        assert_eq!(a.tx_id().len(), 32);
    }

    // -----------------------------------------------------------------------
    // MVCC
    // -----------------------------------------------------------------------

    #[test]
    fn stale_read_fails_commit() {
        let ledger = InMemoryLedger::new();
        let k = key("R1");
        commit_put(&ledger, &k, b"v1");

        let first = ledger.begin("Org1MSP");
        let second = ledger.begin("Org2MSP");
        first.get_state(&k).unwrap();
        second.get_state(&k).unwrap();
        first.put_state(&k, b"v2").unwrap();
        second.put_state(&k, b"v3").unwrap();

        first.commit().unwrap();
        let err = second.commit().unwrap_err();
        assert_eq!(err, LedgerError::MvccReadConflict { key: k.clone() });
        assert!(err.is_retryable());
        assert_eq!(ledger.committed_value(&k), Some(b"v2".to_vec()));
    }

    #[test]
    fn phantom_create_conflicts_with_absent_read() {
        let ledger = InMemoryLedger::new();
        let k = key("R1");
        let reader = ledger.begin("Org1MSP");
        assert_eq!(reader.get_state(&k).unwrap(), None);
        reader.put_state(&k, b"mine").unwrap();

        commit_put(&ledger, &k, b"theirs");
        assert!(reader.commit().is_err());
    }

    #[test]
    fn blind_writes_do_not_conflict() {
        let ledger = InMemoryLedger::new();
        let k = key("R1");
        let a = ledger.begin("Org1MSP");
        let b = ledger.begin("Org1MSP");
        a.put_state(&k, b"a").unwrap();
        b.put_state(&k, b"b").unwrap();
        a.commit().unwrap();
        b.commit().unwrap();
        assert_eq!(ledger.committed_value(&k), Some(b"b".to_vec()));
    }

    #[test]
    fn read_only_commit_does_not_advance_height() {
        let ledger = InMemoryLedger::new();
        let tx = ledger.begin("Org1MSP");
        tx.get_state("k").unwrap();
        let receipt = tx.commit().unwrap();
        assert_eq!(receipt.height, 0);
        assert_eq!(receipt.writes, 0);
    }

    // -----------------------------------------------------------------------
    // History
    // -----------------------------------------------------------------------

    #[test]
    fn history_is_oldest_first_with_tx_ids() {
        let ledger = InMemoryLedger::new();
        let k = key("R1");
        let r1 = commit_put(&ledger, &k, b"one");
        let r2 = commit_put(&ledger, &k, b"two");

        let tx = ledger.begin("Org1MSP");
        let entries: Vec<KeyModification> = tx
            .get_history_for_key(&k)
            .unwrap()
            .collect::<LedgerResult<_>>()
            .unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].tx_id, r1.tx_id);
        assert_eq!(entries[0].value, b"one");
        assert_eq!(entries[1].tx_id, r2.tx_id);
        assert_eq!(entries[1].value, b"two");
        assert!(entries.iter().all(|e| !e.is_delete));
    }

    #[test]
    fn delete_leaves_marker_in_history() {
        let ledger = InMemoryLedger::new();
        let k = key("R1");
        commit_put(&ledger, &k, b"one");
        let tx = ledger.begin("Org1MSP");
        tx.delete_state(&k).unwrap();
        tx.commit().unwrap();

        assert_eq!(ledger.committed_value(&k), None);
        let tx = ledger.begin("Org1MSP");
        let entries: Vec<_> = tx.get_history_for_key(&k).unwrap().collect();
        assert_eq!(entries.len(), 2);
        let last = entries[1].as_ref().unwrap();
        assert!(last.is_delete);
        assert!(last.value.is_empty());
    }

    #[test]
    fn history_records_transaction_timestamp() {
        let ledger = InMemoryLedger::new();
        let ts = LedgerTimestamp::new(1_714_557_600, 0);
        let tx = ledger.begin("Org1MSP").with_timestamp(ts);
        tx.put_state("k", b"v").unwrap();
        tx.commit().unwrap();

        let tx = ledger.begin("Org1MSP");
        let entry = tx.get_history_for_key("k").unwrap().next().unwrap().unwrap();
        assert_eq!(entry.timestamp, ts);
    }

    // -----------------------------------------------------------------------
    // Cursors
    // -----------------------------------------------------------------------

    #[test]
    fn cursors_are_released_on_close_and_drop() {
        let ledger = InMemoryLedger::new();
        commit_put(&ledger, "k", b"v");
        let tx = ledger.begin("Org1MSP");

        let mut closed = tx.get_history_for_key("k").unwrap();
        let dropped = tx.get_history_for_key("k").unwrap();
        assert_eq!(ledger.open_cursors(), 2);

        closed.close().unwrap();
        assert_eq!(ledger.open_cursors(), 1);
        assert!(closed.next().is_none());
        drop(closed);
        assert_eq!(ledger.open_cursors(), 1);

        drop(dropped);
        assert_eq!(ledger.open_cursors(), 0);
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    #[test]
    fn query_matches_json_values_in_key_order() {
        let ledger = InMemoryLedger::new();
        commit_put(&ledger, &key("R2"), br#"{"recordID":"R2","contact":{"city":"Lagos"}}"#);
        commit_put(&ledger, &key("R1"), br#"{"recordID":"R1","contact":{"city":"Lagos"}}"#);
        commit_put(&ledger, &key("R3"), br#"{"recordID":"R3","contact":{"city":"Abuja"}}"#);
        commit_put(&ledger, "raw", b"not json");

        let tx = ledger.begin("Org1MSP");
        let keys: Vec<String> = tx
            .get_query_result(r#"{"selector":{"contact.city":"Lagos"}}"#)
            .unwrap()
            .map(|r| r.unwrap().key)
            .collect();
        assert_eq!(keys, vec![key("R1"), key("R2")]);
    }

    #[test]
    fn query_limit_and_skip() {
        let ledger = InMemoryLedger::new();
        for id in ["A", "B", "C", "D"] {
            commit_put(&ledger, &key(id), br#"{"kind":"x"}"#);
        }
        let tx = ledger.begin("Org1MSP");
        let keys: Vec<String> = tx
            .get_query_result(r#"{"selector":{"kind":"x"},"skip":1,"limit":2}"#)
            .unwrap()
            .map(|r| r.unwrap().key)
            .collect();
        assert_eq!(keys, vec![key("B"), key("C")]);
    }

    #[test]
    fn query_sorts_before_skip_and_limit() {
        let ledger = InMemoryLedger::new();
        for (id, last) in [("A", "Zed"), ("B", "Amy"), ("C", "Moe"), ("D", "Bo")] {
            let value = format!(r#"{{"child":{{"lastName":"{last}"}}}}"#);
            commit_put(&ledger, &key(id), value.as_bytes());
        }
        let tx = ledger.begin("Org1MSP");
        let keys: Vec<String> = tx
            .get_query_result(
                r#"{"selector":{},"sort":[{"child.lastName":"asc"}],"skip":1,"limit":2}"#,
            )
            .unwrap()
            .map(|r| r.unwrap().key)
            .collect();
        assert_eq!(keys, vec![key("D"), key("C")]);
    }

    #[test]
    fn query_fields_project_values() {
        let ledger = InMemoryLedger::new();
        commit_put(&ledger, &key("R1"), br#"{"recordID":"R1","child":{"firstName":"Alex","lastName":"Ode"}}"#);
        let tx = ledger.begin("Org1MSP");
        let values: Vec<Vec<u8>> = tx
            .get_query_result(r#"{"selector":{},"fields":["recordID","child.lastName"]}"#)
            .unwrap()
            .map(|r| r.unwrap().value)
            .collect();
        let projected: serde_json::Value = serde_json::from_slice(&values[0]).unwrap();
        assert_eq!(
            projected,
            serde_json::json!({"recordID": "R1", "child": {"lastName": "Ode"}})
        );
    }

    #[test]
    fn unsupported_query_key_is_rejected() {
        let ledger = InMemoryLedger::new();
        let tx = ledger.begin("Org1MSP");
        assert!(matches!(
            tx.get_query_result(r#"{"selector":{},"bookmark":"g1"}"#),
            Err(LedgerError::InvalidQuery(_))
        ));
    }

    #[test]
    fn malformed_query_is_rejected_without_cursor() {
        let ledger = InMemoryLedger::new();
        let tx = ledger.begin("Org1MSP");
        assert!(matches!(
            tx.get_query_result("{"),
            Err(LedgerError::InvalidQuery(_))
        ));
        assert_eq!(ledger.open_cursors(), 0);
    }

    // -----------------------------------------------------------------------
    // Events and snapshots
    // -----------------------------------------------------------------------

    #[test]
    fn last_event_wins_and_is_broadcast_on_commit() {
        let ledger = InMemoryLedger::new();
        let mut rx = ledger.subscribe();
        let tx = ledger.begin("Org1MSP");
        tx.set_event("First", b"1").unwrap();
        tx.set_event("Second", b"2").unwrap();
        assert!(rx.try_recv().is_err());

        let tx_id = tx.tx_id().to_string();
        let receipt = tx.commit().unwrap();
        assert_eq!(receipt.event.as_deref(), Some("Second"));

        let event = rx.try_recv().unwrap();
        assert_eq!(event.name, "Second");
        assert_eq!(event.payload, b"2");
        assert_eq!(event.tx_id, tx_id);
        assert_eq!(ledger.events(), vec![event]);
    }

    #[test]
    fn empty_event_name_is_rejected() {
        let ledger = InMemoryLedger::new();
        let tx = ledger.begin("Org1MSP");
        assert_eq!(tx.set_event("", b"x"), Err(LedgerError::EmptyEventName));
    }

    #[test]
    fn snapshot_restores_state_history_and_events() {
        let ledger = InMemoryLedger::new();
        let tx = ledger.begin("Org1MSP");
        tx.put_state("k", b"v").unwrap();
        tx.set_event("E", b"p").unwrap();
        tx.commit().unwrap();

        let json = serde_json::to_string(&ledger.snapshot()).unwrap();
        let restored = InMemoryLedger::from_snapshot(serde_json::from_str(&json).unwrap());
        assert_eq!(restored.snapshot(), ledger.snapshot());
        assert_eq!(restored.committed_value("k"), Some(b"v".to_vec()));
        assert_eq!(restored.height(), 1);
    }
}
