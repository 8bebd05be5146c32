//! Single-slot persistence of the [`GraphAggregate`].
//!
//! Every save fully replaces the previous snapshot, and a reader never sees a
//! half-written one. `load` reports an absent snapshot as
//! `AggregateNotFound` and an unreadable one as `MalformedAggregate`.

mod json_file;
mod sqlite;

pub use json_file::JsonFileStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

use crate::aggregate::GraphAggregate;
use crate::config::StoreBackend;
use crate::error::{Result, SchemascopeError};

#[async_trait]
pub trait AggregateStore: Send + Sync {
    /// Replace the stored snapshot.
    async fn save(&self, aggregate: &GraphAggregate) -> Result<()>;

    /// Read the stored snapshot back.
    async fn load(&self) -> Result<GraphAggregate>;
}

/// Build the configured backend.
pub fn open_store(backend: StoreBackend, path: &Path) -> Arc<dyn AggregateStore> {
    match backend {
        StoreBackend::Json => Arc::new(JsonFileStore::new(path)),
        StoreBackend::Sqlite => Arc::new(SqliteStore::new(path)),
    }
}

/// Decode a serialized snapshot, mapping failures to `MalformedAggregate`.
fn decode(body: &str) -> Result<GraphAggregate> {
    serde_json::from_str(body).map_err(|e| SchemascopeError::MalformedAggregate(e.to_string()))
}

/// Encode a snapshot. Output is deterministic for equal aggregates.
fn encode(aggregate: &GraphAggregate) -> Result<String> {
    Ok(serde_json::to_string_pretty(aggregate)?)
}
