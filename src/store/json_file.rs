use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tempfile::NamedTempFile;
use tokio::task;

use crate::aggregate::GraphAggregate;
use crate::error::{Result, SchemascopeError};
use crate::store::{decode, encode, AggregateStore};

/// Snapshot kept as one pretty-printed JSON document.
///
/// Writes go to a temporary file next to the target and are renamed over it,
/// so the document on disk is always complete.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl AggregateStore for JsonFileStore {
    async fn save(&self, aggregate: &GraphAggregate) -> Result<()> {
        let body = encode(aggregate)?;
        let path = self.path.clone();

        task::spawn_blocking(move || write_atomically(&path, body.as_bytes()))
            .await
            .map_err(join_error)??;

        log::info!("Aggregate written to {}", self.path.display());
        Ok(())
    }

    async fn load(&self) -> Result<GraphAggregate> {
        let path = self.path.clone();
        let body = task::spawn_blocking(move || std::fs::read_to_string(&path))
            .await
            .map_err(join_error)?;

        match body {
            Ok(body) => decode(&body),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(SchemascopeError::AggregateNotFound),
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                Err(SchemascopeError::MalformedAggregate(e.to_string()))
            }
            Err(e) => Err(SchemascopeError::Io(e)),
        }
    }
}

fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)?;

    let mut tmp = NamedTempFile::new_in(&dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| SchemascopeError::Io(e.error))?;
    Ok(())
}

fn join_error(e: task::JoinError) -> SchemascopeError {
    SchemascopeError::Io(std::io::Error::new(
        std::io::ErrorKind::Other,
        format!("Snapshot task failed: {}", e),
    ))
}
