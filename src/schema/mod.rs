//! Schema introspection: property type inference and the schema fetch.

mod fetch;
pub mod types;

pub use fetch::{fetch_schema, SCHEMA_QUERY, SCHEMA_SAMPLE_SIZE};
pub use types::{infer, PropertyType, PropertyValue};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Property key → inferred type
pub type PropertyTypes = BTreeMap<String, PropertyType>;

/// Schema as reported by the store's visualization procedure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSchema {
    /// Individual labels in the order the store listed them, without repeats.
    pub node_labels: Vec<String>,
    /// Label key (labels joined by `:`) → property types
    pub node_properties: BTreeMap<String, PropertyTypes>,
    /// Relationship type → property types
    pub relationship_properties: BTreeMap<String, PropertyTypes>,
}

impl GraphSchema {
    pub fn is_empty(&self) -> bool {
        self.node_labels.is_empty() && self.relationship_properties.is_empty()
    }
}
