//! Core types and abstractions for sequenced, namespaced identifiers.
//!
//! This crate provides the namespace deriver, the identifier value type, the
//! [`IdentifierStore`] capability and the [`SequencedAllocator`] that issues
//! `<namespace>-<sequence>` keys such as `EP-3` on top of any store with an
//! atomic conditional insert.

pub mod allocator;
pub mod config;
pub mod error;
pub mod id;
pub mod namespace;
pub mod traits;
pub mod types;

pub use allocator::{RetryPolicy, SequencedAllocator};
pub use config::{AllocatorConfig, DatabaseConfig, GeneralConfig, SeqIdConfig, StoreMode};
pub use error::{Result, SeqIdError};
pub use id::Identifier;
pub use namespace::{derive_namespace, Namespace, FALLBACK_NAMESPACE};
pub use traits::IdentifierStore;
pub use types::*;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::allocator::{RetryPolicy, SequencedAllocator};
    pub use crate::config::SeqIdConfig;
    pub use crate::error::{Result, SeqIdError};
    pub use crate::id::Identifier;
    pub use crate::namespace::{derive_namespace, Namespace};
    pub use crate::traits::IdentifierStore;
    pub use crate::types::*;
}
