use std::path::Path;

use async_trait::async_trait;
use rusqlite::{params, ErrorCode, OptionalExtension};

use crate::aggregate::GraphAggregate;
use crate::db::Db;
use crate::error::{Result, SchemascopeError};
use crate::store::{decode, encode, AggregateStore};

/// Snapshot kept as a single row in a SQLite database.
pub struct SqliteStore {
    db: Db,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self { db: Db::new(path) }
    }
}

#[async_trait]
impl AggregateStore for SqliteStore {
    async fn save(&self, aggregate: &GraphAggregate) -> Result<()> {
        let body = encode(aggregate)?;
        let saved_at = chrono::Utc::now().to_rfc3339();

        self.db
            .with_connection(move |conn| {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT OR REPLACE INTO aggregate_snapshot (id, body, saved_at) VALUES (1, ?1, ?2)",
                    params![body, saved_at],
                )?;
                tx.commit()?;
                Ok(())
            })
            .await?;

        log::info!("Aggregate snapshot replaced");
        Ok(())
    }

    async fn load(&self) -> Result<GraphAggregate> {
        let body: Option<String> = self
            .db
            .with_connection(|conn| {
                Ok(conn
                    .query_row("SELECT body FROM aggregate_snapshot WHERE id = 1", [], |row| row.get(0))
                    .optional()?)
            })
            .await
            .map_err(corrupt_as_malformed)?;

        match body {
            Some(body) => decode(&body),
            None => Err(SchemascopeError::AggregateNotFound),
        }
    }
}

/// A file that is not (or no longer) a SQLite database holds no usable snapshot.
fn corrupt_as_malformed(e: SchemascopeError) -> SchemascopeError {
    match e {
        SchemascopeError::Database(rusqlite::Error::SqliteFailure(err, msg))
            if matches!(err.code, ErrorCode::NotADatabase | ErrorCode::DatabaseCorrupt) =>
        {
            SchemascopeError::MalformedAggregate(msg.unwrap_or_else(|| err.to_string()))
        }
        other => other,
    }
}
