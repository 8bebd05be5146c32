//! Bounded graph sampling: each node with its outgoing relationships.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{Result, SchemascopeError};
use crate::neo4j::{GraphSession, Row};
use crate::schema::{GraphSchema, PropertyValue};

/// Fixed ceiling on sampled records. Not configurable per request.
pub const SAMPLE_LIMIT: usize = 10;

/// Restricts the sample to nodes carrying one of `$labels`.
const LABEL_SCOPE: &str = "WHERE any(label IN labels(n) WHERE label IN $labels) ";

/// The sample statement. Nodes are limited before their relationships are
/// collected, so the store never aggregates more than `$limit` nodes.
fn sample_statement(scoped: bool) -> String {
    format!(
        "MATCH (n) {}\
WITH n LIMIT $limit \
OPTIONAL MATCH (n)-[r]->(m) \
WITH n, collect(r) AS relationships_data \
RETURN labels(n) AS labels, \
       keys(n) AS prop_keys, \
       [key IN keys(n) | n[key]] AS prop_values, \
       [rel IN relationships_data | {{type: type(rel), start_node_labels: labels(startNode(rel)), end_node_labels: labels(endNode(rel))}}] AS relationships",
        if scoped { LABEL_SCOPE } else { "" }
    )
}

/// An outgoing relationship as seen from a sampled node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipDescriptor {
    #[serde(rename = "type")]
    pub rel_type: String,
    #[serde(default)]
    pub start_node_labels: Vec<String>,
    #[serde(default)]
    pub end_node_labels: Vec<String>,
}

/// One sampled node.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub labels: Vec<String>,
    pub properties: Vec<(String, PropertyValue)>,
    pub relationships: Vec<RelationshipDescriptor>,
}

impl RawRecord {
    /// Decode a `labels, prop_keys, prop_values, relationships` row.
    ///
    /// Null or missing columns become empty collections.
    pub fn from_row(row: Row) -> Result<Self> {
        let mut cols = row.into_iter();
        let labels = cols.next().unwrap_or(Value::Null);
        let keys = cols.next().unwrap_or(Value::Null);
        let values = cols.next().unwrap_or(Value::Null);
        let rels = cols.next().unwrap_or(Value::Null);

        let labels: Vec<Option<String>> = decode_column(labels, "labels")?;
        let keys: Vec<String> = decode_column(keys, "prop_keys")?;
        let values: Vec<Value> = decode_column(values, "prop_values")?;
        let rels: Vec<Option<RelationshipDescriptor>> = decode_column(rels, "relationships")?;

        if keys.len() != values.len() {
            log::warn!(
                "Sampled node has {} property keys but {} values; extra entries ignored",
                keys.len(),
                values.len()
            );
        }

        Ok(Self {
            labels: labels.into_iter().flatten().collect(),
            properties: keys
                .into_iter()
                .zip(values.iter().map(PropertyValue::from_json))
                .collect(),
            relationships: rels.into_iter().flatten().collect(),
        })
    }
}

fn decode_column<T: serde::de::DeserializeOwned>(value: Value, column: &str) -> Result<Vec<T>> {
    if value.is_null() {
        return Ok(Vec::new());
    }
    serde_json::from_value(value)
        .map_err(|e| SchemascopeError::Parse(format!("Unexpected sample {} column: {}", column, e)))
}

/// Sample up to [`SAMPLE_LIMIT`] nodes, each with a single outward hop.
///
/// When the schema knows labels, the sample is restricted to nodes carrying
/// at least one of them.
pub async fn sample_graph(session: &mut dyn GraphSession, schema: &GraphSchema) -> Result<Vec<RawRecord>> {
    let (statement, parameters) = if schema.node_labels.is_empty() {
        (sample_statement(false), json!({ "limit": SAMPLE_LIMIT }))
    } else {
        (
            sample_statement(true),
            json!({ "limit": SAMPLE_LIMIT, "labels": schema.node_labels }),
        )
    };

    log::info!("Fetching nodes and relationships (limit {})", SAMPLE_LIMIT);
    let rows = session.run(&statement, parameters).await?;

    if rows.len() > SAMPLE_LIMIT {
        log::debug!("Store returned {} rows, truncating to {}", rows.len(), SAMPLE_LIMIT);
    }

    let records = rows
        .into_iter()
        .take(SAMPLE_LIMIT)
        .map(RawRecord::from_row)
        .collect::<Result<Vec<_>>>()?;

    log::info!("Sampled {} nodes", records.len());
    Ok(records)
}
