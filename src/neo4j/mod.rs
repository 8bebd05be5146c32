//! Graph store access: connection credentials, the session seam, and the
//! Neo4j HTTP implementation behind it.
//!
//! The schema fetcher and graph sampler only see [`GraphSession`], a Cypher
//! runner scoped to one fetch cycle. Sessions must be closed by whoever opened
//! them, on every exit path.

mod http_client;
#[cfg(test)]
pub mod memory;

pub use http_client::{http_base_url, Neo4jHttpConnector};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// One result row, columns in statement order.
pub type Row = Vec<Value>;

/// Credentials for one fetch cycle. Missing fields fall back to configured defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DbCredentials {
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
    #[serde(default)]
    pub database: Option<String>,
}

impl DbCredentials {
    /// Fill every unset field from `defaults`.
    pub fn or(&self, defaults: &DbCredentials) -> DbCredentials {
        DbCredentials {
            uri: self.uri.clone().or_else(|| defaults.uri.clone()),
            user: self.user.clone().or_else(|| defaults.user.clone()),
            password: self.password.clone().or_else(|| defaults.password.clone()),
            database: self.database.clone().or_else(|| defaults.database.clone()),
        }
    }
}

/// Opens sessions against a graph store.
#[async_trait]
pub trait GraphConnector: Send + Sync {
    /// Open a read session. Unreachable stores and rejected credentials are
    /// reported as `SchemascopeError::Connection`.
    async fn connect(&self, credentials: &DbCredentials) -> Result<Box<dyn GraphSession>>;
}

/// A read session against the graph store.
#[async_trait]
pub trait GraphSession: Send {
    /// Run one Cypher statement and return all of its rows.
    async fn run(&mut self, statement: &str, parameters: Value) -> Result<Vec<Row>>;

    /// Release the session. Calling it twice is a no-op.
    async fn close(&mut self) -> Result<()>;
}
