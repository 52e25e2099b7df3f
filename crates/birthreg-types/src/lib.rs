//! Foundation types for the birth registry.
//!
//! Every other `birthreg-*` crate depends on this one. It owns the shape of a
//! stored birth registration and the textual codec used to put it on a ledger.
//!
//! # Key Types
//!
//! - [`BirthRecord`]: the root entity, keyed by its `recordID`
//! - [`ChildInfo`], [`ParentInfo`], [`ContactInfo`], [`MedicalInfo`]: record sections
//! - [`LedgerTimestamp`]: seconds/nanos commit timestamp with RFC 3339 rendering
//!
//! # Codec
//!
//! Records are stored as field-named JSON. Missing fields decode to their
//! defaults and unknown fields are carried along in `extra`, so records
//! written by older or newer schema revisions stay readable and survive a
//! rewrite intact.

pub mod codec;
pub mod error;
pub mod record;
pub mod timestamp;

pub use codec::{decode, encode};
pub use error::{CodecError, CodecResult};
pub use record::{BirthRecord, ChildInfo, ContactInfo, Extra, MedicalInfo, ParentInfo};
pub use timestamp::LedgerTimestamp;
