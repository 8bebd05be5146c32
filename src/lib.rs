pub mod config;
pub mod error;
pub mod db;
pub mod neo4j;
pub mod schema;
pub mod sample;
pub mod aggregate;
pub mod store;
pub mod service;
pub mod http;

pub use config::Config;
pub use error::{SchemascopeError, Result};
pub use aggregate::{GraphAggregate, LabelAggregate, RelationshipPattern};
pub use service::{LabelInfo, SchemaService};
