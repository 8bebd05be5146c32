//! Schema fetch over `db.schema.visualization()`.
//!
//! The visualization only yields virtual nodes and relationships whose keys
//! are schema metadata (`name`, `indexes`, `constraints`). Property keys and a
//! representative value per key are read from up to [`SCHEMA_SAMPLE_SIZE`]
//! stored entities of each label group and relationship type.

use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{Result, SchemascopeError};
use crate::neo4j::GraphSession;
use crate::schema::{infer, GraphSchema, PropertyTypes, PropertyValue};

/// Stored entities read per label group or relationship type.
pub const SCHEMA_SAMPLE_SIZE: usize = 100;

/// Label groups and relationship types from the visualization, each with
/// `{propertyKey, propertyValue}` pairs taken from stored data.
///
/// Every subquery ends in an ungrouped `collect`, so groups without stored
/// entities still produce a row (with no properties).
pub const SCHEMA_QUERY: &str = "\
CALL db.schema.visualization() YIELD nodes, relationships \
CALL { \
  WITH nodes \
  UNWIND nodes AS v \
  CALL { \
    WITH v \
    MATCH (x) WHERE all(l IN labels(v) WHERE l IN labels(x)) \
    WITH x LIMIT $per_type \
    UNWIND keys(x) AS k \
    WITH k, head(collect(x[k])) AS value \
    RETURN collect({propertyKey: k, propertyValue: value}) AS properties \
  } \
  RETURN collect({labels: labels(v), properties: properties}) AS node_groups \
} \
CALL { \
  WITH relationships \
  UNWIND relationships AS v \
  CALL { \
    WITH v \
    MATCH ()-[x]->() WHERE type(x) = type(v) \
    WITH x LIMIT $per_type \
    UNWIND keys(x) AS k \
    WITH k, head(collect(x[k])) AS value \
    RETURN collect({propertyKey: k, propertyValue: value}) AS properties \
  } \
  RETURN collect({type: type(v), properties: properties}) AS rel_groups \
} \
RETURN node_groups AS nodes, rel_groups AS relationships";

#[derive(Debug, Deserialize)]
struct NodeLabelGroup {
    #[serde(default)]
    labels: Vec<Option<String>>,
    #[serde(default)]
    properties: Vec<PropertySample>,
}

#[derive(Debug, Deserialize)]
struct RelationshipTypeGroup {
    #[serde(rename = "type")]
    rel_type: Option<String>,
    #[serde(default)]
    properties: Vec<PropertySample>,
}

#[derive(Debug, Deserialize)]
struct PropertySample {
    #[serde(rename = "propertyKey")]
    key: String,
    #[serde(rename = "propertyValue", default)]
    value: Value,
}

/// Fetch the store's schema and type each property from its sample value.
///
/// An empty store (no row, or empty groups) yields an empty schema.
pub async fn fetch_schema(session: &mut dyn GraphSession) -> Result<GraphSchema> {
    log::info!("Fetching schema information");
    let rows = session
        .run(SCHEMA_QUERY, json!({ "per_type": SCHEMA_SAMPLE_SIZE }))
        .await?;

    let row = match rows.into_iter().next() {
        Some(row) => row,
        None => {
            log::warn!("Schema visualization query returned no records");
            return Ok(GraphSchema::default());
        }
    };

    let schema = schema_from_row(row)?;
    if schema.is_empty() {
        log::warn!("Schema visualization returned an empty graph");
    } else {
        log::info!(
            "Fetched schema: {} labels, {} relationship types",
            schema.node_labels.len(),
            schema.relationship_properties.len()
        );
    }
    Ok(schema)
}

fn schema_from_row(mut row: Vec<Value>) -> Result<GraphSchema> {
    let rels = if row.len() > 1 { row.swap_remove(1) } else { Value::Null };
    let nodes = row.into_iter().next().unwrap_or(Value::Null);

    let nodes: Vec<NodeLabelGroup> = decode_groups(nodes, "nodes")?;
    let rels: Vec<RelationshipTypeGroup> = decode_groups(rels, "relationships")?;

    let mut schema = GraphSchema::default();

    for group in nodes {
        let labels: Vec<String> = group.labels.into_iter().flatten().collect();
        if labels.is_empty() {
            continue;
        }
        for label in &labels {
            if !schema.node_labels.contains(label) {
                schema.node_labels.push(label.clone());
            }
        }
        schema
            .node_properties
            .insert(labels.join(":"), type_properties(group.properties));
    }

    for group in rels {
        if let Some(rel_type) = group.rel_type {
            schema
                .relationship_properties
                .insert(rel_type, type_properties(group.properties));
        }
    }

    Ok(schema)
}

fn decode_groups<T: serde::de::DeserializeOwned>(value: Value, column: &str) -> Result<Vec<T>> {
    if value.is_null() {
        return Ok(Vec::new());
    }
    serde_json::from_value(value)
        .map_err(|e| SchemascopeError::Parse(format!("Unexpected schema {} column: {}", column, e)))
}

fn type_properties(samples: Vec<PropertySample>) -> PropertyTypes {
    samples
        .into_iter()
        .map(|p| (p.key, infer(&PropertyValue::from_json(&p.value))))
        .collect()
}
