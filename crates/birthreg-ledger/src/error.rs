/// Errors produced by ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("invalid composite key component {component:?}: {reason}")]
    InvalidCompositeKey { component: String, reason: String },

    #[error("invalid state key: {0}")]
    InvalidKey(String),

    #[error("write rejected: {0}")]
    WriteRejected(String),

    #[error("read failed: {0}")]
    ReadFailed(String),

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("client identity unavailable: {0}")]
    IdentityUnavailable(String),

    #[error("MVCC read conflict on key {key:?}")]
    MvccReadConflict { key: String },

    #[error("event name must not be empty")]
    EmptyEventName,

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl LedgerError {
    /// Whether resubmitting the same transaction may succeed.
    ///
    /// Read-set conflicts are the only failure caused by a concurrent writer;
    /// everything else is deterministic for the same input.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::MvccReadConflict { .. })
    }
}

/// Result alias for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_conflicts_are_retryable() {
        assert!(LedgerError::MvccReadConflict { key: "k".into() }.is_retryable());
        assert!(!LedgerError::WriteRejected("disk".into()).is_retryable());
        assert!(!LedgerError::InvalidQuery("bad".into()).is_retryable());
    }
}
