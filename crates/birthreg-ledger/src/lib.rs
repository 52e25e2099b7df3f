//! Ledger service boundary for the birth registry.
//!
//! The registry never talks to a storage engine directly. Everything it needs
//! from the ledger (world state, per-key history, rich queries, client
//! identity, events) goes through the [`LedgerStub`] trait, one instance of
//! which represents a single in-flight transaction.
//!
//! This crate provides:
//! - [`LedgerStub`] / [`LedgerIterator`] trait boundaries
//! - Composite key encoding shared by every backend ([`keys`])
//! - [`InMemoryLedger`], a reference ledger with MVCC commit validation,
//!   per-key history, a JSON selector query engine, and event fan-out
//!
//! # Design Rules
//!
//! 1. Reads observe committed state only; writes are buffered until commit.
//! 2. History entries are append-only and never rewritten.
//! 3. A transaction whose read set went stale fails to commit and may be
//!    retried from scratch.
//! 4. Iterators are scoped resources: close them, or drop them.

pub mod error;
pub mod keys;
pub mod memory;
pub mod selector;
pub mod traits;

pub use error::{LedgerError, LedgerResult};
pub use keys::{create_composite_key, split_composite_key};
pub use memory::{CommitReceipt, InMemoryLedger, LedgerSnapshot, MemoryTransaction};
pub use selector::Selector;
pub use traits::{
    ChaincodeEvent, HistoryIterator, KeyModification, LedgerIterator, LedgerStub, QueryResult,
    StateQueryIterator,
};
