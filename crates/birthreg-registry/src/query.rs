use birthreg_ledger::{LedgerStub, QueryResult};
use birthreg_types::BirthRecord;
use tracing::debug;

use crate::cursor::ScopedCursor;
use crate::error::{RegistryError, RegistryResult};

/// Runs attribute queries against the ledger's query engine.
///
/// The filter expression is passed through untouched; syntax errors are
/// whatever the ledger reports.
pub struct QueryExecutor<'a> {
    stub: &'a dyn LedgerStub,
}

impl<'a> QueryExecutor<'a> {
    pub fn new(stub: &'a dyn LedgerStub) -> Self {
        Self { stub }
    }

    /// Every matching record. No match is an empty result, not an error; a
    /// single undecodable match fails the whole query.
    pub fn query(&self, filter: &str) -> RegistryResult<Vec<BirthRecord>> {
        let cursor = ScopedCursor::new(
            self.stub
                .get_query_result(filter)
                .map_err(RegistryError::Query)?,
        );
        let records = cursor.try_collect(RegistryError::Query, |QueryResult { key, value }| {
            BirthRecord::decode(&value).map_err(|e| {
                RegistryError::Decoding(format!("value at {}: {e}", key.escape_debug()))
            })
        })?;
        debug!(matched = records.len(), "records queried");
        Ok(records)
    }
}
