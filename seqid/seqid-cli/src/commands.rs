//! CLI command implementations.
//!
//! Each command opens a [`Session`] over the configured store, runs one
//! operation and renders the result in the requested [`OutputFormat`].

use crate::output::{self, format_timestamp, OutputFormat, TableBuilder};
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use seqid_core::config::{SeqIdConfig, StoreMode};
use seqid_core::prelude::*;
use seqid_storage::open_store;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

// ============================================================================
// Session
// ============================================================================

/// An allocator bound to the store described by a configuration.
pub struct Session {
    allocator: SequencedAllocator<dyn IdentifierStore>,
    mode: StoreMode,
}

impl Session {
    /// Connect to the configured store
    pub async fn open(config: &SeqIdConfig) -> Result<Self> {
        let store = open_store(&config.database)
            .await
            .context("Failed to open identifier store")?;
        info!("Opened {} identifier store", config.database.mode);

        Ok(Self::with_store(
            store,
            config.allocator.retry_policy(),
            config.database.mode,
        ))
    }

    /// Wrap an already opened store
    pub fn with_store(
        store: Arc<dyn IdentifierStore>,
        retry_policy: RetryPolicy,
        mode: StoreMode,
    ) -> Self {
        Self {
            allocator: SequencedAllocator::with_retry_policy(store, retry_policy),
            mode,
        }
    }

    pub fn mode(&self) -> StoreMode {
        self.mode
    }

    pub async fn allocate(
        &self,
        project: &str,
        owner: &str,
        entity: Option<String>,
    ) -> Result<Identifier> {
        let mut context = RequestContext::new(owner);
        if let Some(entity) = entity {
            context = context.with_entity(entity);
        }
        Ok(self.allocator.allocate(project, context).await?)
    }

    pub async fn next(&self, project: &str) -> Result<Identifier> {
        Ok(self.allocator.preview(project).await?)
    }

    pub async fn show(&self, identifier: &str) -> Result<AllocationView> {
        let identifier = Identifier::parse(identifier)?;
        match self.allocator.store().get_allocation(&identifier).await? {
            Some(allocation) => Ok(AllocationView::from(allocation)),
            None => bail!("No allocation found for {}", identifier),
        }
    }

    pub async fn list(&self, project: &str) -> Result<(Namespace, Vec<AllocationView>)> {
        let namespace = derive_namespace(project);
        let allocations = self.allocator.store().list_allocations(&namespace).await?;
        Ok((
            namespace,
            allocations.into_iter().map(AllocationView::from).collect(),
        ))
    }
}

/// Flattened allocation for display
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AllocationView {
    pub identifier: String,
    pub namespace: String,
    pub sequence: u64,
    pub owner: String,
    pub entity: Option<String>,
    pub request_id: String,
    pub allocated_at: DateTime<Utc>,
}

impl From<StoredAllocation> for AllocationView {
    fn from(allocation: StoredAllocation) -> Self {
        Self {
            identifier: allocation.identifier.to_string(),
            namespace: allocation.namespace.to_string(),
            sequence: allocation.sequence,
            owner: allocation.record.owner.owner,
            entity: allocation.record.owner.entity,
            request_id: allocation.record.owner.request_id.to_string(),
            allocated_at: allocation.record.allocated_at,
        }
    }
}

// ============================================================================
// Identifier Commands
// ============================================================================

/// JSON shape of a derived namespace
pub fn namespace_json(name: &str, namespace: &Namespace) -> serde_json::Value {
    serde_json::json!({
        "name": name,
        "namespace": namespace,
        "fallback": namespace.is_fallback(),
    })
}

/// JSON shape of an identifier
pub fn identifier_json(identifier: &Identifier) -> serde_json::Value {
    serde_json::json!({
        "identifier": identifier,
        "namespace": identifier.namespace(),
        "sequence": identifier.sequence(),
    })
}

/// Print the namespace derived from a project name
pub fn namespace(name: &str, format: OutputFormat) -> Result<()> {
    let namespace = derive_namespace(name);

    if format.is_json() {
        output::json(&namespace_json(name, &namespace))
    } else {
        println!("{}", namespace);
        if namespace.is_fallback() {
            output::warning("Name has no words, using the fallback namespace");
        }
        Ok(())
    }
}

/// Allocate the next identifier for a project
pub async fn allocate(
    config: &SeqIdConfig,
    project: &str,
    owner: &str,
    entity: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let session = Session::open(config).await?;
    if session.mode() == StoreMode::Memory {
        output::warning("Using the in-memory store, this allocation is not persisted");
    }

    let identifier = session.allocate(project, owner, entity).await?;

    if format.is_json() {
        output::json(&identifier_json(&identifier))
    } else {
        output::success(format!("Allocated {}", identifier));
        Ok(())
    }
}

/// Preview the identifier the next allocation would try first
pub async fn next(config: &SeqIdConfig, project: &str, format: OutputFormat) -> Result<()> {
    let session = Session::open(config).await?;
    let candidate = session.next(project).await?;

    if format.is_json() {
        output::json(&serde_json::json!({ "next": identifier_json(&candidate) }))
    } else {
        println!("{}", candidate);
        Ok(())
    }
}

/// Show a stored allocation
pub async fn show(config: &SeqIdConfig, identifier: &str, format: OutputFormat) -> Result<()> {
    let session = Session::open(config).await?;
    let view = session.show(identifier).await?;

    if format.is_json() {
        return output::json(&view);
    }

    output::header(&view.identifier);
    output::kv("Namespace", &view.namespace);
    output::kv("Sequence", view.sequence);
    output::kv("Owner", &view.owner);
    output::kv("Entity", view.entity.as_deref().unwrap_or("-"));
    output::kv("Request", &view.request_id);
    output::kv("Allocated", format_timestamp(view.allocated_at));
    Ok(())
}

/// List the allocations in a project's namespace
pub async fn list(config: &SeqIdConfig, project: &str, format: OutputFormat) -> Result<()> {
    let session = Session::open(config).await?;
    let (namespace, views) = session.list(project).await?;

    if format.is_json() {
        return output::json(&views);
    }

    if views.is_empty() {
        output::info(format!("No identifiers allocated in {}", namespace));
        return Ok(());
    }

    output::header(format!("Namespace {} ({} allocated)", namespace, views.len()));
    views
        .iter()
        .fold(
            TableBuilder::new().header(vec!["Identifier", "Owner", "Entity", "Allocated"]),
            |table, view| {
                table.row(vec![
                    view.identifier.clone(),
                    view.owner.clone(),
                    view.entity.clone().unwrap_or_else(|| "-".to_string()),
                    format_timestamp(view.allocated_at),
                ])
            },
        )
        .print();
    Ok(())
}

// ============================================================================
// Config Commands
// ============================================================================

/// Copy of `config` safe to print
pub fn redacted(config: &SeqIdConfig) -> SeqIdConfig {
    let mut config = config.clone();
    if config.database.password.is_some() {
        config.database.password = Some("********".to_string());
    }
    config
}

/// Print the effective configuration
pub fn config_show(config: &SeqIdConfig, format: OutputFormat) -> Result<()> {
    let config = redacted(config);

    if format.is_json() {
        return output::json(&config);
    }

    output::header("General");
    output::kv("log_level", &config.general.log_level);

    output::header("Database");
    output::kv("mode", config.database.mode);
    if let Some(path) = &config.database.path {
        output::kv("path", path.display());
    }
    if let Some(endpoint) = &config.database.endpoint {
        output::kv("endpoint", endpoint);
    }
    output::kv("namespace", &config.database.namespace);
    output::kv("database", &config.database.database);
    if let Some(username) = &config.database.username {
        output::kv("username", username);
    }
    if let Some(password) = &config.database.password {
        output::kv("password", password);
    }

    output::header("Allocator");
    output::kv("max_attempts", config.allocator.max_attempts);
    output::kv("initial_backoff_ms", config.allocator.initial_backoff_ms);
    output::kv("max_backoff_ms", config.allocator.max_backoff_ms);
    output::kv("multiplier", config.allocator.multiplier);
    Ok(())
}

/// Write the default configuration to `path`
pub async fn config_init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "Configuration already exists at {} (use --force to overwrite)",
            path.display()
        );
    }

    SeqIdConfig::default()
        .save_to_path(path)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;

    output::success(format!("Wrote default configuration to {}", path.display()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use seqid_storage::InMemoryIdentifierStore;

    fn session() -> Session {
        Session::with_store(
            Arc::new(InMemoryIdentifierStore::new()),
            RetryPolicy::immediate(3),
            StoreMode::Memory,
        )
    }

    #[tokio::test]
    async fn test_session_allocate_and_show() {
        let session = session();

        let first = session
            .allocate("Exam Portal", "user-1", Some("projects/42".to_string()))
            .await
            .unwrap();
        assert_eq!(first.to_string(), "EP-1");

        let view = session.show("EP-1").await.unwrap();
        assert_eq!(view.sequence, 1);
        assert_eq!(view.owner, "user-1");
        assert_eq!(view.entity.as_deref(), Some("projects/42"));
    }

    #[tokio::test]
    async fn test_session_next_tracks_allocations() {
        let session = session();
        assert_eq!(session.next("Exam Portal").await.unwrap().to_string(), "EP-1");

        session.allocate("Exam Portal", "user-1", None).await.unwrap();
        assert_eq!(session.next("Exam Portal").await.unwrap().to_string(), "EP-2");
    }

    #[tokio::test]
    async fn test_session_show_errors() {
        let session = session();

        let missing = session.show("EP-7").await.unwrap_err();
        assert!(missing.to_string().contains("No allocation found for EP-7"));

        let malformed = session.show("EP7").await.unwrap_err();
        let cause = malformed.downcast_ref::<SeqIdError>().unwrap();
        assert!(matches!(cause, SeqIdError::InvalidIdentifier(_)));
    }

    #[tokio::test]
    async fn test_session_list_is_ordered() {
        let session = session();
        for owner in ["a", "b", "c"] {
            session.allocate("Human Resources", owner, None).await.unwrap();
        }
        session.allocate("Exam Portal", "d", None).await.unwrap();

        let (namespace, views) = session.list("Human Resources").await.unwrap();
        assert_eq!(namespace.as_str(), "HR");
        let ids: Vec<&str> = views.iter().map(|v| v.identifier.as_str()).collect();
        assert_eq!(ids, vec!["HR-1", "HR-2", "HR-3"]);
    }

    #[tokio::test]
    async fn test_identifier_json() {
        let session = session();
        session.allocate("Exam Portal", "user-1", None).await.unwrap();
        let second = session.allocate("Exam Portal", "user-2", None).await.unwrap();

        let json = identifier_json(&second);
        assert_eq!(json["identifier"], "EP-2");
        assert_eq!(json["namespace"], "EP");
        assert_eq!(json["sequence"], 2);
    }

    #[test]
    fn test_namespace_json() {
        let json = namespace_json("Exam Portal", &derive_namespace("Exam Portal"));
        assert_eq!(json["name"], "Exam Portal");
        assert_eq!(json["namespace"], "EP");
        assert_eq!(json["fallback"], false);

        let json = namespace_json("  ", &derive_namespace("  "));
        assert_eq!(json["namespace"], "XX");
        assert_eq!(json["fallback"], true);
    }

    #[tokio::test]
    async fn test_allocation_view_json() {
        let session = session();
        session
            .allocate("Human Resources", "uid-9", Some("tickets/7".to_string()))
            .await
            .unwrap();

        let view = session.show("HR-1").await.unwrap();
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["identifier"], "HR-1");
        assert_eq!(json["namespace"], "HR");
        assert_eq!(json["sequence"], 1);
        assert_eq!(json["owner"], "uid-9");
        assert_eq!(json["entity"], "tickets/7");
    }

    #[test]
    fn test_redacted_hides_password() {
        let mut config = SeqIdConfig::default();
        assert_eq!(redacted(&config).database.password, None);

        config.database.password = Some("hunter2".to_string());
        let shown = redacted(&config);
        assert_eq!(shown.database.password.as_deref(), Some("********"));
        assert_eq!(config.database.password.as_deref(), Some("hunter2"));
    }
}
