//! The caller-facing operations: refresh the aggregate, read label info.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::aggregate::{aggregate, relationship_statements, AggregateOptions, GraphAggregate};
use crate::error::Result;
use crate::neo4j::{DbCredentials, GraphConnector, GraphSession};
use crate::sample::{sample_graph, RawRecord};
use crate::schema::{fetch_schema, GraphSchema, PropertyTypes};
use crate::store::AggregateStore;

/// One entry of a label-info answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelInfo {
    pub label: String,
    pub properties: PropertyTypes,
    pub relationship_statements: Vec<String>,
}

/// Holds the graph store connector and the snapshot store.
///
/// Each fetch opens its own session; the snapshot store is the only state
/// shared between concurrent requests.
pub struct SchemaService {
    connector: Arc<dyn GraphConnector>,
    store: Arc<dyn AggregateStore>,
    options: AggregateOptions,
}

impl SchemaService {
    pub fn new(
        connector: Arc<dyn GraphConnector>,
        store: Arc<dyn AggregateStore>,
        options: AggregateOptions,
    ) -> Self {
        Self {
            connector,
            store,
            options,
        }
    }

    /// Fetch schema and sample, fold them into an aggregate and persist it.
    pub async fn refresh_aggregate(&self, credentials: &DbCredentials) -> Result<GraphAggregate> {
        log::info!("Refreshing graph aggregate");

        let mut session = self.connector.connect(credentials).await?;
        let fetched = fetch_schema_and_sample(session.as_mut()).await;
        close_session(session.as_mut()).await;
        let (schema, records) = fetched?;

        let aggregate = aggregate(&schema, records, self.options);
        self.store.save(&aggregate).await?;

        log::info!(
            "Aggregate refreshed: {} labels",
            aggregate.node_labels.len()
        );
        Ok(aggregate)
    }

    /// Schema only, without sampling or persisting.
    pub async fn describe_schema(&self, credentials: &DbCredentials) -> Result<GraphSchema> {
        let mut session = self.connector.connect(credentials).await?;
        let schema = fetch_schema(session.as_mut()).await;
        close_session(session.as_mut()).await;
        schema
    }

    /// Properties and relationship statements for the requested labels.
    ///
    /// Labels missing from the snapshot are left out. Statements only cover
    /// relationships between requested labels.
    pub async fn get_label_info(&self, labels: &[String]) -> Result<Vec<LabelInfo>> {
        let snapshot = self.store.load().await?;

        let mut seen: Vec<&str> = Vec::with_capacity(labels.len());
        let mut infos = Vec::new();
        for label in labels {
            if seen.contains(&label.as_str()) {
                continue;
            }
            seen.push(label);

            let Some(info) = snapshot.label_info.get(label) else {
                log::debug!("Label {} not in aggregate, skipping", label);
                continue;
            };

            infos.push(LabelInfo {
                label: label.clone(),
                properties: info.properties.clone(),
                relationship_statements: relationship_statements(labels, &info.relationships),
            });
        }

        Ok(infos)
    }
}

async fn fetch_schema_and_sample(session: &mut dyn GraphSession) -> Result<(GraphSchema, Vec<RawRecord>)> {
    let schema = fetch_schema(session).await?;
    let records = sample_graph(session, &schema).await?;
    Ok((schema, records))
}

/// Release a session. A failed release does not override the cycle's own outcome.
async fn close_session(session: &mut dyn GraphSession) {
    match session.close().await {
        Ok(()) => log::info!("Closed graph store session"),
        Err(e) => log::warn!("Failed to close graph store session: {}", e),
    }
}
