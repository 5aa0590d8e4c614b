//! Error types for identifier allocation.

/// Result type alias for seqid operations.
pub type Result<T> = std::result::Result<T, SeqIdError>;

/// Main error type for seqid.
///
/// A conflicting insert is not an error: stores report it as
/// [`InsertOutcome::AlreadyExists`](crate::types::InsertOutcome) and the
/// allocator absorbs it.
#[derive(Debug, thiserror::Error)]
pub enum SeqIdError {
    /// The persistence layer could not be reached
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Retry budget exhausted under sustained contention
    #[error("Allocation failed in namespace {namespace} after {attempts} attempts")]
    AllocationFailed { namespace: String, attempts: u32 },

    /// Text that is not a `<namespace>-<sequence>` identifier
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped anyhow errors for compatibility
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SeqIdError {
    /// Create a new store unavailable error
    pub fn store_unavailable(msg: impl Into<String>) -> Self {
        Self::StoreUnavailable(msg.into())
    }

    /// Create a new allocation failed error
    pub fn allocation_failed(namespace: impl Into<String>, attempts: u32) -> Self {
        Self::AllocationFailed {
            namespace: namespace.into(),
            attempts,
        }
    }

    /// Create a new invalid identifier error
    pub fn invalid_identifier(msg: impl Into<String>) -> Self {
        Self::InvalidIdentifier(msg.into())
    }

    /// Create a new config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Check if this is a store unavailable error
    pub fn is_store_unavailable(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_))
    }

    /// Check if this is an allocation failed error
    pub fn is_allocation_failed(&self) -> bool {
        matches!(self, Self::AllocationFailed { .. })
    }

    /// Whether the caller may retry the whole operation later
    pub fn is_retryable(&self) -> bool {
        self.is_store_unavailable() || self.is_allocation_failed()
    }
}
