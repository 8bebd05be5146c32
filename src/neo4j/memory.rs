//! In-memory graph store used by tests.
//!
//! Answers the schema and sample statements issued by this crate. The schema
//! answer is either canned rows or derived from the stored nodes the way the
//! schema statement reads them; the sample answer honours `$labels` and
//! `$limit`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::{Result, SchemascopeError};
use crate::neo4j::{DbCredentials, GraphConnector, GraphSession, Row};

#[derive(Default)]
pub struct InMemoryGraph {
    /// Canned rows answered to the schema statement; when empty the answer
    /// is derived from `schema_labels` and the stored nodes
    pub schema_rows: Vec<Row>,
    /// Labels the store's schema knows, in store order
    pub schema_labels: Vec<String>,
    /// Rows answered to the sample statement, one per node
    pub node_rows: Vec<Row>,
    pub refuse_connections: bool,
    pub fail_sample: bool,
    pub opened: Arc<AtomicUsize>,
    pub closed: Arc<AtomicUsize>,
    pub statements: Arc<Mutex<Vec<(String, Value)>>>,
}

impl InMemoryGraph {
    /// Store whose schema lists each label as its own group.
    pub fn with_labels(labels: &[&str]) -> Self {
        Self {
            schema_labels: labels.iter().map(|l| l.to_string()).collect(),
            ..Default::default()
        }
    }

    /// Add a sampled node row: labels, property map, `(type, start, end)` relationships.
    pub fn node(mut self, labels: &[&str], props: Value, rels: &[(&str, &[&str], &[&str])]) -> Self {
        let keys: Vec<Value> = props
            .as_object()
            .map(|m| m.keys().map(|k| json!(k)).collect())
            .unwrap_or_default();
        let values: Vec<Value> = props
            .as_object()
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default();
        let rels: Vec<Value> = rels
            .iter()
            .map(|(t, s, e)| json!({"type": t, "start_node_labels": s, "end_node_labels": e}))
            .collect();
        self.node_rows
            .push(vec![json!(labels), Value::Array(keys), Value::Array(values), Value::Array(rels)]);
        self
    }
}

#[async_trait]
impl GraphConnector for InMemoryGraph {
    async fn connect(&self, _credentials: &DbCredentials) -> Result<Box<dyn GraphSession>> {
        if self.refuse_connections {
            return Err(SchemascopeError::Connection("connection refused".to_string()));
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(InMemorySession {
            schema_rows: if self.schema_rows.is_empty() {
                derive_schema_rows(&self.schema_labels, &self.node_rows)
            } else {
                self.schema_rows.clone()
            },
            node_rows: self.node_rows.clone(),
            fail_sample: self.fail_sample,
            closed: Arc::clone(&self.closed),
            statements: Arc::clone(&self.statements),
            is_closed: false,
        }))
    }
}

/// One row: a group per schema label carrying the first stored value of each
/// key seen on nodes with that label, and one group per relationship type.
fn derive_schema_rows(labels: &[String], node_rows: &[Row]) -> Vec<Row> {
    if labels.is_empty() {
        return Vec::new();
    }

    let has_label = |row: &Row, label: &str| {
        row[0]
            .as_array()
            .map_or(false, |ls| ls.iter().any(|l| l.as_str() == Some(label)))
    };

    let groups: Vec<Value> = labels
        .iter()
        .map(|label| {
            let mut seen: Vec<&str> = Vec::new();
            let mut properties = Vec::new();
            for row in node_rows.iter().filter(|row| has_label(*row, label.as_str())) {
                let keys = row[1].as_array().map(Vec::as_slice).unwrap_or(&[]);
                let values = row[2].as_array().map(Vec::as_slice).unwrap_or(&[]);
                for (key, value) in keys.iter().zip(values) {
                    let Some(key) = key.as_str() else { continue };
                    if seen.contains(&key) {
                        continue;
                    }
                    seen.push(key);
                    properties.push(json!({"propertyKey": key, "propertyValue": value}));
                }
            }
            json!({"labels": [label], "properties": properties})
        })
        .collect();

    let mut rel_types: Vec<&str> = Vec::new();
    for row in node_rows {
        for rel in row[3].as_array().into_iter().flatten() {
            if let Some(t) = rel["type"].as_str() {
                if !rel_types.contains(&t) {
                    rel_types.push(t);
                }
            }
        }
    }
    let rel_groups: Vec<Value> = rel_types
        .iter()
        .map(|t| json!({"type": t, "properties": []}))
        .collect();

    vec![vec![Value::Array(groups), Value::Array(rel_groups)]]
}

struct InMemorySession {
    schema_rows: Vec<Row>,
    node_rows: Vec<Row>,
    fail_sample: bool,
    closed: Arc<AtomicUsize>,
    statements: Arc<Mutex<Vec<(String, Value)>>>,
    is_closed: bool,
}

#[async_trait]
impl GraphSession for InMemorySession {
    async fn run(&mut self, statement: &str, parameters: Value) -> Result<Vec<Row>> {
        self.statements
            .lock()
            .unwrap()
            .push((statement.to_string(), parameters.clone()));

        if statement.contains("db.schema.visualization") {
            return Ok(self.schema_rows.clone());
        }

        if self.fail_sample {
            return Err(SchemascopeError::Query("sample failed".to_string()));
        }

        let scope: Vec<String> = parameters["labels"]
            .as_array()
            .map(|a| a.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
            .unwrap_or_default();
        let limit = parameters["limit"].as_u64().unwrap_or(u64::MAX) as usize;

        Ok(self
            .node_rows
            .iter()
            .filter(|row| {
                scope.is_empty()
                    || row[0]
                        .as_array()
                        .map(|ls| ls.iter().any(|l| l.as_str().map_or(false, |l| scope.iter().any(|s| s == l))))
                        .unwrap_or(false)
            })
            .take(limit)
            .cloned()
            .collect())
    }

    async fn close(&mut self) -> Result<()> {
        if !self.is_closed {
            self.is_closed = true;
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}
