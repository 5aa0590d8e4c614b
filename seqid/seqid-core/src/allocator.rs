//! Sequenced identifier allocation.
//!
//! The next sequence number of a namespace is recomputed from a live count on
//! every attempt; there is no stored counter. Two callers that compute the
//! same candidate race on the store's conditional insert, the loser re-lists
//! and tries the following number. Uniqueness therefore rests entirely on the
//! atomicity of [`IdentifierStore::try_insert`].

use crate::error::{Result, SeqIdError};
use crate::id::Identifier;
use crate::namespace::{derive_namespace, Namespace};
use crate::traits::IdentifierStore;
use crate::types::{AllocationRecord, InsertOutcome, RequestContext};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Retry policy for conflicting inserts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first one
    pub max_attempts: u32,
    /// Initial backoff duration
    pub initial_backoff: Duration,
    /// Maximum backoff duration
    pub max_backoff: Duration,
    /// Backoff multiplier
    pub multiplier: f64,
}

impl RetryPolicy {
    /// Policy that retries immediately
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            multiplier: 1.0,
        }
    }

    /// Backoff delay after the given failed attempt (1-based).
    ///
    /// Always within `[0, max_backoff]`, whatever the multiplier.
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let delay = self.initial_backoff.as_secs_f64()
            * self.multiplier.powi(attempt.saturating_sub(1) as i32);

        let capped = delay.min(self.max_backoff.as_secs_f64()).max(0.0);
        Duration::try_from_secs_f64(capped).unwrap_or(Duration::ZERO)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_millis(250),
            multiplier: 2.0,
        }
    }
}

/// Issues `<namespace>-<sequence>` identifiers on top of an [`IdentifierStore`].
pub struct SequencedAllocator<S: IdentifierStore + ?Sized> {
    store: Arc<S>,
    retry_policy: RetryPolicy,
}

impl<S: IdentifierStore + ?Sized> Clone for SequencedAllocator<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            retry_policy: self.retry_policy.clone(),
        }
    }
}

impl<S: IdentifierStore + ?Sized> SequencedAllocator<S> {
    /// Create an allocator with the default retry policy
    pub fn new(store: Arc<S>) -> Self {
        Self::with_retry_policy(store, RetryPolicy::default())
    }

    /// Create an allocator with a custom retry policy
    pub fn with_retry_policy(store: Arc<S>, retry_policy: RetryPolicy) -> Self {
        Self {
            store,
            retry_policy,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    /// Allocate the next identifier in the namespace derived from `display_name`.
    ///
    /// Every call issues a new identifier; calling twice with the same input
    /// yields two distinct keys.
    ///
    /// # Errors
    ///
    /// - [`SeqIdError::StoreUnavailable`] as soon as any store call fails,
    ///   without retrying
    /// - [`SeqIdError::AllocationFailed`] when every attempt lost its race
    pub async fn allocate(&self, display_name: &str, owner: RequestContext) -> Result<Identifier> {
        let namespace = derive_namespace(display_name);
        self.allocate_in(&namespace, owner).await
    }

    /// Allocate the next identifier in an explicit namespace
    pub async fn allocate_in(
        &self,
        namespace: &Namespace,
        owner: RequestContext,
    ) -> Result<Identifier> {
        let max_attempts = self.retry_policy.max_attempts.max(1);
        let record = AllocationRecord::new(owner);

        for attempt in 1..=max_attempts {
            let candidate = self.next_candidate(namespace).await?;

            debug!(
                "Attempt {}/{}: trying {} for request {}",
                attempt, max_attempts, candidate, record.owner.request_id
            );

            match self.store.try_insert(&candidate, &record).await? {
                InsertOutcome::Inserted => {
                    info!("Allocated {} for owner {}", candidate, record.owner.owner);
                    return Ok(candidate);
                }
                InsertOutcome::AlreadyExists => {
                    warn!(
                        "Identifier {} was claimed concurrently (attempt {}/{})",
                        candidate, attempt, max_attempts
                    );
                    if attempt < max_attempts {
                        let delay = self.retry_policy.calculate_delay(attempt);
                        if !delay.is_zero() {
                            tokio::time::sleep(delay).await;
                        }
                    }
                }
            }
        }

        warn!(
            "Giving up on namespace {} after {} attempts",
            namespace, max_attempts
        );
        Err(SeqIdError::allocation_failed(namespace.as_str(), max_attempts))
    }

    /// The identifier the next allocation for `display_name` would try first.
    ///
    /// Nothing is written or reserved.
    pub async fn preview(&self, display_name: &str) -> Result<Identifier> {
        self.next_candidate(&derive_namespace(display_name)).await
    }

    async fn next_candidate(&self, namespace: &Namespace) -> Result<Identifier> {
        let existing = self.store.list_identifiers(namespace).await?;
        Ok(Identifier::after_count(namespace.clone(), existing.len()))
    }
}
