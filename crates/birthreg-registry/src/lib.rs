//! Birth record management on a versioned ledger.
//!
//! This crate is the record-management core. It derives stable record keys,
//! enforces the record schema and medical-only update semantics, renders a
//! record's change history, and runs attribute queries. Storage, ordering,
//! and commit atomicity belong to the ledger behind [`LedgerStub`].
//!
//! # Operations
//!
//! [`BirthRecordContract`] exposes the named operations a host transport
//! invokes:
//!
//! - `CreateBirthRecord(recordJSON) -> txID`
//! - `ReadBirthRecord(recordID) -> BirthRecord`
//! - `UpdateMedicalInfo(recordID, medicalJSON) -> txID`
//! - `GetHistoryForRecord(recordID) -> JSON array`
//! - `QueryRecordsByAttribute(queryString) -> [BirthRecord]`
//!
//! # Concurrency
//!
//! The core owns no locks. `UpdateMedicalInfo` is a read-modify-write whose
//! correctness depends on the ledger rejecting commits with a stale read set;
//! such rejections are safe to retry from scratch.
//!
//! # Logging
//!
//! Operations emit `tracing` events and never install a subscriber. Hosts
//! choose the subscriber, globally or scoped with
//! `tracing::subscriber::with_default`.

pub mod clock;
pub mod config;
pub mod contract;
mod cursor;
pub mod error;
pub mod history;
pub mod keys;
pub mod query;
pub mod store;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::RegistryConfig;
pub use contract::{BirthRecordContract, OPERATIONS};
pub use error::{ErrorKind, RegistryError, RegistryResult};
pub use history::{HistoryEntry, HistoryReconstructor};
pub use keys::KeyDeriver;
pub use query::QueryExecutor;
pub use store::RecordStore;

pub use birthreg_ledger::LedgerStub;
pub use birthreg_types::{BirthRecord, ChildInfo, ContactInfo, MedicalInfo, ParentInfo};
