use std::sync::Arc;

use birthreg_ledger::LedgerStub;
use birthreg_types::BirthRecord;
use tracing::{info_span, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::RegistryConfig;
use crate::error::{RegistryError, RegistryResult};
use crate::history::HistoryReconstructor;
use crate::query::QueryExecutor;
use crate::store::RecordStore;

/// Names of the operations a host may invoke, with their argument counts.
pub const OPERATIONS: [(&str, usize); 5] = [
    ("CreateBirthRecord", 1),
    ("ReadBirthRecord", 1),
    ("UpdateMedicalInfo", 2),
    ("GetHistoryForRecord", 1),
    ("QueryRecordsByAttribute", 1),
];

/// Prefix hosts may put in front of an operation name to address this
/// contract explicitly.
const CONTRACT_PREFIX: &str = "SmartContract:";

/// The birth record contract: the stable set of named operations a host
/// transport calls, each against the transaction it is running.
#[derive(Clone)]
pub struct BirthRecordContract {
    config: RegistryConfig,
    clock: Arc<dyn Clock>,
}

impl BirthRecordContract {
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            config,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the clock that stamps `createdAt`.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    fn store<'a>(&'a self, stub: &'a dyn LedgerStub) -> RecordStore<'a> {
        RecordStore::new(stub, &self.config, self.clock.as_ref())
    }

    pub fn create_birth_record(&self, stub: &dyn LedgerStub, record_json: &str) -> RegistryResult<String> {
        let _span = info_span!("CreateBirthRecord", tx_id = %stub.tx_id()).entered();
        self.store(stub).create(record_json.as_bytes())
    }

    pub fn read_birth_record(&self, stub: &dyn LedgerStub, record_id: &str) -> RegistryResult<BirthRecord> {
        let _span = info_span!("ReadBirthRecord", tx_id = %stub.tx_id()).entered();
        self.store(stub).read(record_id)
    }

    pub fn update_medical_info(
        &self,
        stub: &dyn LedgerStub,
        record_id: &str,
        medical_json: &str,
    ) -> RegistryResult<String> {
        let _span = info_span!("UpdateMedicalInfo", tx_id = %stub.tx_id()).entered();
        self.store(stub)
            .update_medical_info(record_id, medical_json.as_bytes())
    }

    /// The record's change history as a JSON array string.
    pub fn get_history_for_record(&self, stub: &dyn LedgerStub, record_id: &str) -> RegistryResult<String> {
        let _span = info_span!("GetHistoryForRecord", tx_id = %stub.tx_id()).entered();
        HistoryReconstructor::new(stub, &self.config.namespace).history_json(record_id)
    }

    pub fn query_records_by_attribute(
        &self,
        stub: &dyn LedgerStub,
        query: &str,
    ) -> RegistryResult<Vec<BirthRecord>> {
        let _span = info_span!("QueryRecordsByAttribute", tx_id = %stub.tx_id()).entered();
        QueryExecutor::new(stub).query(query)
    }

    /// Dispatch an operation by name and return its response payload.
    ///
    /// Transaction ids come back as plain UTF-8, records and record lists as
    /// JSON, and history as its JSON array.
    pub fn invoke(&self, stub: &dyn LedgerStub, function: &str, args: &[&str]) -> RegistryResult<Vec<u8>> {
        let name = function.strip_prefix(CONTRACT_PREFIX).unwrap_or(function);
        let expected = OPERATIONS
            .iter()
            .find(|(op, _)| *op == name)
            .map(|(_, arity)| *arity)
            .ok_or_else(|| RegistryError::UnknownFunction(function.to_string()))?;
        if args.len() != expected {
            return Err(RegistryError::Arity {
                function: name.to_string(),
                expected,
                actual: args.len(),
            });
        }

        let result = match name {
            "CreateBirthRecord" => self.create_birth_record(stub, args[0]).map(String::into_bytes),
            "ReadBirthRecord" => self
                .read_birth_record(stub, args[0])
                .and_then(|record| encode_response(&record)),
            "UpdateMedicalInfo" => self
                .update_medical_info(stub, args[0], args[1])
                .map(String::into_bytes),
            "GetHistoryForRecord" => self
                .get_history_for_record(stub, args[0])
                .map(String::into_bytes),
            "QueryRecordsByAttribute" => self
                .query_records_by_attribute(stub, args[0])
                .and_then(|records| encode_response(&records)),
            _ => Err(RegistryError::UnknownFunction(function.to_string())),
        };
        if let Err(e) = &result {
            warn!(function = name, error = %e, "operation failed");
        }
        result
    }
}

impl Default for BirthRecordContract {
    fn default() -> Self {
        Self::new(RegistryConfig::default())
    }
}

impl std::fmt::Debug for BirthRecordContract {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BirthRecordContract")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn encode_response<T: serde::Serialize + ?Sized>(value: &T) -> RegistryResult<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| RegistryError::Encoding(e.to_string()))
}

#[cfg(test)]
mod tests {
    use birthreg_ledger::InMemoryLedger;

    use super::*;
    use crate::clock::FixedClock;

    fn contract() -> BirthRecordContract {
        BirthRecordContract::default().with_clock(Arc::new(FixedClock(1_000)))
    }

    #[test]
    fn invoke_create_then_read() {
        let ledger = InMemoryLedger::new();
        let contract = contract();

        let tx = ledger.begin("Org1MSP");
        let tx_id = contract
            .invoke(&tx, "CreateBirthRecord", &[r#"{"recordID":"R1","child":{"firstName":"Alex"}}"#])
            .unwrap();
        assert_eq!(tx_id, tx.tx_id().as_bytes());
        tx.commit().unwrap();

        let tx = ledger.begin("Org1MSP");
        let body = contract.invoke(&tx, "ReadBirthRecord", &["R1"]).unwrap();
        let record = BirthRecord::decode(&body).unwrap();
        assert_eq!(record.child.first_name, "Alex");
        assert_eq!(record.created_at, 1_000);
    }

    #[test]
    fn invoke_accepts_contract_prefix() {
        let ledger = InMemoryLedger::new();
        let tx = ledger.begin("Org1MSP");
        let body = contract()
            .invoke(&tx, "SmartContract:QueryRecordsByAttribute", &[r#"{"selector":{}}"#])
            .unwrap();
        assert_eq!(body, b"[]");
    }

    #[test]
    fn invoke_rejects_unknown_function() {
        let ledger = InMemoryLedger::new();
        let tx = ledger.begin("Org1MSP");
        assert_eq!(
            contract().invoke(&tx, "DeleteBirthRecord", &["R1"]),
            Err(RegistryError::UnknownFunction("DeleteBirthRecord".into()))
        );
    }

    #[test]
    fn invoke_checks_arity() {
        let ledger = InMemoryLedger::new();
        let tx = ledger.begin("Org1MSP");
        assert_eq!(
            contract().invoke(&tx, "UpdateMedicalInfo", &["R1"]),
            Err(RegistryError::Arity {
                function: "UpdateMedicalInfo".into(),
                expected: 2,
                actual: 1,
            })
        );
    }

    #[test]
    fn history_is_returned_as_json_array() {
        let ledger = InMemoryLedger::new();
        let contract = contract();
        let tx = ledger.begin("Org1MSP");
        contract
            .create_birth_record(&tx, r#"{"recordID":"R1"}"#)
            .unwrap();
        tx.commit().unwrap();

        let tx = ledger.begin("Org1MSP");
        let body = contract.invoke(&tx, "GetHistoryForRecord", &["R1"]).unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed.as_array().map(Vec::len), Some(1));
        assert_eq!(parsed[0]["Value"]["recordID"], "R1");
    }
}
