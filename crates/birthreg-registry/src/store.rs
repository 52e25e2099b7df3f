use birthreg_ledger::LedgerStub;
use birthreg_types::{BirthRecord, MedicalInfo};
use tracing::{debug, info};

use crate::clock::Clock;
use crate::config::RegistryConfig;
use crate::error::{RegistryError, RegistryResult};
use crate::keys::KeyDeriver;

/// Create, read, and medical-update operations over one transaction.
///
/// A failed operation returns before buffering any write, or after a write
/// the host will discard together with the failed transaction.
pub struct RecordStore<'a> {
    stub: &'a dyn LedgerStub,
    config: &'a RegistryConfig,
    clock: &'a dyn Clock,
    keys: KeyDeriver<'a>,
}

impl<'a> RecordStore<'a> {
    pub fn new(stub: &'a dyn LedgerStub, config: &'a RegistryConfig, clock: &'a dyn Clock) -> Self {
        Self {
            stub,
            config,
            clock,
            keys: KeyDeriver::new(&config.namespace),
        }
    }

    /// Register a new birth record from its JSON form.
    ///
    /// `createdBy` and `createdAt` are stamped from the submitting identity
    /// and the clock. Unless `reject_duplicate_create` is set, an existing
    /// record with the same id is replaced.
    pub fn create(&self, raw: &[u8]) -> RegistryResult<String> {
        if raw.is_empty() {
            return Err(RegistryError::EmptyInput);
        }
        let mut record =
            BirthRecord::decode(raw).map_err(|e| RegistryError::MalformedInput(e.to_string()))?;
        if record.record_id.is_empty() {
            return Err(RegistryError::MalformedInput("recordID must not be empty".into()));
        }

        let msp_id = self
            .stub
            .client_msp_id()
            .map_err(|e| RegistryError::IdentityResolution(e.to_string()))?;
        record.stamp_provenance(msp_id, self.clock.now_unix());

        let key = self.keys.derive(self.stub, &record.record_id)?;
        if self.config.reject_duplicate_create
            && self
                .stub
                .get_state(&key)
                .map_err(RegistryError::StoreRead)?
                .is_some()
        {
            return Err(RegistryError::AlreadyExists {
                record_id: record.record_id,
            });
        }

        let bytes = record
            .encode()
            .map_err(|e| RegistryError::Encoding(e.to_string()))?;
        self.stub
            .put_state(&key, &bytes)
            .map_err(RegistryError::StoreWrite)?;
        self.stub
            .set_event(&self.config.create_event, &bytes)
            .map_err(RegistryError::StoreWrite)?;

        info!(
            record_id = %record.record_id,
            created_by = %record.created_by,
            tx_id = %self.stub.tx_id(),
            "birth record created"
        );
        Ok(self.stub.tx_id().to_string())
    }

    pub fn read(&self, record_id: &str) -> RegistryResult<BirthRecord> {
        let key = self.keys.derive(self.stub, record_id)?;
        let bytes = self
            .stub
            .get_state(&key)
            .map_err(RegistryError::StoreRead)?
            .ok_or_else(|| RegistryError::NotFound {
                record_id: record_id.to_string(),
            })?;
        let record =
            BirthRecord::decode(&bytes).map_err(|e| RegistryError::Decoding(e.to_string()))?;
        debug!(record_id, "birth record read");
        Ok(record)
    }

    /// Replace the medical section of an existing record.
    ///
    /// Every other field is carried over unchanged. There is no in-core
    /// compare-and-swap: a concurrent writer to the same record makes the
    /// ledger reject this transaction's stale read at commit time.
    pub fn update_medical_info(&self, record_id: &str, raw_medical: &[u8]) -> RegistryResult<String> {
        let mut record = self.read(record_id)?;
        let medical = MedicalInfo::decode(raw_medical)
            .map_err(|e| RegistryError::MalformedInput(format!("invalid medical JSON: {e}")))?;
        record.replace_medical(medical);

        let key = self.keys.derive(self.stub, record_id)?;
        let bytes = record
            .encode()
            .map_err(|e| RegistryError::Encoding(e.to_string()))?;
        self.stub
            .put_state(&key, &bytes)
            .map_err(RegistryError::StoreWrite)?;
        if let Some(event) = &self.config.update_event {
            self.stub
                .set_event(event, &bytes)
                .map_err(RegistryError::StoreWrite)?;
        }

        info!(record_id, tx_id = %self.stub.tx_id(), "medical info updated");
        Ok(self.stub.tx_id().to_string())
    }
}
