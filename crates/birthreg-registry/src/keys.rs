use birthreg_ledger::{LedgerError, LedgerStub};

use crate::error::{RegistryError, RegistryResult};

/// Derives the ledger key of a record from its id.
///
/// The key is a composite of the configured namespace and the record id, so
/// it is a pure function of the id and distinct ids never share a key.
#[derive(Clone, Copy, Debug)]
pub struct KeyDeriver<'a> {
    namespace: &'a str,
}

impl<'a> KeyDeriver<'a> {
    pub fn new(namespace: &'a str) -> Self {
        Self { namespace }
    }

    pub fn namespace(&self) -> &str {
        self.namespace
    }

    pub fn derive(&self, stub: &dyn LedgerStub, record_id: &str) -> RegistryResult<String> {
        if record_id.is_empty() {
            return Err(RegistryError::MissingRecordId);
        }
        stub.create_composite_key(self.namespace, &[record_id])
            .map_err(|e| match e {
                LedgerError::InvalidCompositeKey { .. } => RegistryError::InvalidKey(e.to_string()),
                other => RegistryError::StoreRead(other),
            })
    }
}
