use birthreg_ledger::LedgerError;
use thiserror::Error;

/// Errors surfaced by registry operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("must provide birth record data")]
    EmptyInput,

    #[error("invalid input JSON: {0}")]
    MalformedInput(String),

    #[error("recordID must be specified")]
    MissingRecordId,

    #[error("invalid record key: {0}")]
    InvalidKey(String),

    #[error("birth record {record_id} does not exist")]
    NotFound { record_id: String },

    #[error("birth record {record_id} already exists")]
    AlreadyExists { record_id: String },

    #[error("failed to encode record: {0}")]
    Encoding(String),

    #[error("failed to decode stored record: {0}")]
    Decoding(String),

    #[error("failed to resolve client identity: {0}")]
    IdentityResolution(String),

    #[error("failed to write to ledger: {0}")]
    StoreWrite(LedgerError),

    #[error("failed to read from ledger: {0}")]
    StoreRead(LedgerError),

    #[error("query failed: {0}")]
    Query(LedgerError),

    #[error("unknown function: {0}")]
    UnknownFunction(String),

    #[error("{function} expects {expected} argument(s), got {actual}")]
    Arity {
        function: String,
        expected: usize,
        actual: usize,
    },

    #[error("configuration error: {0}")]
    Config(String),
}

/// Coarse classification of a [`RegistryError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Empty or malformed caller input.
    Input,
    /// No record at the derived key.
    NotFound,
    /// A record already exists and duplicate creation is disabled.
    Conflict,
    Encoding,
    Decoding,
    /// Provenance lookup failed.
    Identity,
    StoreWrite,
    StoreRead,
    /// The ledger rejected a filter expression.
    Query,
    Config,
}

impl RegistryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyInput
            | Self::MalformedInput(_)
            | Self::MissingRecordId
            | Self::InvalidKey(_)
            | Self::UnknownFunction(_)
            | Self::Arity { .. } => ErrorKind::Input,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::AlreadyExists { .. } => ErrorKind::Conflict,
            Self::Encoding(_) => ErrorKind::Encoding,
            Self::Decoding(_) => ErrorKind::Decoding,
            Self::IdentityResolution(_) => ErrorKind::Identity,
            Self::StoreWrite(_) => ErrorKind::StoreWrite,
            Self::StoreRead(_) => ErrorKind::StoreRead,
            Self::Query(_) => ErrorKind::Query,
            Self::Config(_) => ErrorKind::Config,
        }
    }

    pub fn is_input_error(&self) -> bool {
        self.kind() == ErrorKind::Input
    }

    /// Whether the ledger reported a transient failure worth resubmitting.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::StoreWrite(e) | Self::StoreRead(e) | Self::Query(e) => e.is_retryable(),
            _ => false,
        }
    }
}

/// Result alias for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;
