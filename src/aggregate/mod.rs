//! Label-keyed aggregate of the schema and the sampled graph.
//!
//! Folds sampled node records into one [`LabelAggregate`] per label:
//! property keys with their inferred types (last observation wins per key)
//! and the relationship patterns seen leaving nodes with that label.

mod statements;

pub use statements::{format_pattern, relationship_statements};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::sample::{RawRecord, RelationshipDescriptor};
use crate::schema::{infer, GraphSchema, PropertyTypes};

/// An edge shape: type plus endpoint label sets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelationshipPattern {
    #[serde(rename = "type")]
    pub rel_type: String,
    #[serde(default)]
    pub start_node_labels: Vec<String>,
    #[serde(default)]
    pub end_node_labels: Vec<String>,
}

impl From<RelationshipDescriptor> for RelationshipPattern {
    fn from(rel: RelationshipDescriptor) -> Self {
        Self {
            rel_type: rel.rel_type,
            start_node_labels: rel.start_node_labels,
            end_node_labels: rel.end_node_labels,
        }
    }
}

/// What was observed for one label.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabelAggregate {
    #[serde(default)]
    pub properties: PropertyTypes,
    #[serde(default)]
    pub relationships: Vec<RelationshipPattern>,
}

/// The persisted unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphAggregate {
    pub node_labels: Vec<String>,
    pub label_info: BTreeMap<String, LabelAggregate>,
}

/// Merge policy knobs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregateOptions {
    /// Keep only the first of identical (type, start labels, end labels) patterns per label.
    pub dedup_relationships: bool,
}

/// Fold sampled records into a label-keyed aggregate.
///
/// Every schema label appears, even with no live instances. Labels first
/// seen in the sample are appended after the schema's, in first-seen order.
pub fn aggregate(schema: &GraphSchema, records: Vec<RawRecord>, options: AggregateOptions) -> GraphAggregate {
    let mut node_labels = schema.node_labels.clone();
    let mut label_info: BTreeMap<String, LabelAggregate> = schema
        .node_labels
        .iter()
        .map(|label| (label.clone(), LabelAggregate::default()))
        .collect();

    for record in records {
        let properties: PropertyTypes = record
            .properties
            .iter()
            .map(|(key, value)| (key.clone(), infer(value)))
            .collect();
        let patterns: Vec<RelationshipPattern> =
            record.relationships.into_iter().map(RelationshipPattern::from).collect();

        for label in record.labels {
            if !label_info.contains_key(&label) {
                log::debug!("Label {} seen in sample but not in schema", label);
                node_labels.push(label.clone());
            }
            let entry = label_info.entry(label).or_default();

            entry
                .properties
                .extend(properties.iter().map(|(k, t)| (k.clone(), *t)));

            for pattern in &patterns {
                if options.dedup_relationships && entry.relationships.contains(pattern) {
                    continue;
                }
                entry.relationships.push(pattern.clone());
            }
        }
    }

    GraphAggregate {
        node_labels,
        label_info,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{PropertyType, PropertyValue};

    fn schema(labels: &[&str]) -> GraphSchema {
        GraphSchema {
            node_labels: labels.iter().map(|l| l.to_string()).collect(),
            ..Default::default()
        }
    }

    fn record(labels: &[&str], props: &[(&str, PropertyValue)], rels: &[(&str, &str, &str)]) -> RawRecord {
        RawRecord {
            labels: labels.iter().map(|l| l.to_string()).collect(),
            properties: props.iter().map(|(k, v)| (k.to_string(), v.clone())).collect(),
            relationships: rels
                .iter()
                .map(|(t, s, e)| RelationshipDescriptor {
                    rel_type: t.to_string(),
                    start_node_labels: vec![s.to_string()],
                    end_node_labels: vec![e.to_string()],
                })
                .collect(),
        }
    }

    #[test]
    fn test_empty_sample_keeps_schema_labels() {
        let agg = aggregate(&schema(&["Person", "Company"]), Vec::new(), AggregateOptions::default());
        assert_eq!(agg.node_labels, vec!["Person", "Company"]);
        assert_eq!(agg.label_info.len(), 2);
        assert!(agg.label_info.values().all(|info| *info == LabelAggregate::default()));
    }

    #[test]
    fn test_people_working_at_companies() {
        let records = vec![
            record(&["Person"], &[("name", PropertyValue::Str("Alice".into()))], &[("WORKS_AT", "Person", "Company")]),
            record(&["Person"], &[("name", PropertyValue::Str("Bob".into()))], &[]),
        ];
        let agg = aggregate(&schema(&["Person", "Company"]), records, AggregateOptions::default());

        let person = &agg.label_info["Person"];
        assert_eq!(person.properties.len(), 1);
        assert_eq!(person.properties["name"], PropertyType::String);
        assert_eq!(
            person.relationships,
            vec![RelationshipPattern {
                rel_type: "WORKS_AT".into(),
                start_node_labels: vec!["Person".into()],
                end_node_labels: vec!["Company".into()],
            }]
        );
        assert!(agg.label_info["Company"].properties.is_empty());
    }

    #[test]
    fn test_last_observation_wins_per_key() {
        let records = vec![
            record(&["Thing"], &[("size", PropertyValue::Int(1)), ("tag", PropertyValue::Str("a".into()))], &[]),
            record(&["Thing"], &[("size", PropertyValue::Float(1.5))], &[]),
        ];
        let agg = aggregate(&schema(&["Thing"]), records, AggregateOptions::default());

        let props = &agg.label_info["Thing"].properties;
        assert_eq!(props["size"], PropertyType::Float);
        assert_eq!(props["tag"], PropertyType::String);
    }

    #[test]
    fn test_relationships_accumulate_without_dedup() {
        let records = vec![
            record(&["Person"], &[], &[("KNOWS", "Person", "Person")]),
            record(&["Person"], &[], &[("KNOWS", "Person", "Person")]),
        ];
        let agg = aggregate(&schema(&["Person"]), records.clone(), AggregateOptions::default());
        assert_eq!(agg.label_info["Person"].relationships.len(), 2);

        let agg = aggregate(
            &schema(&["Person"]),
            records,
            AggregateOptions { dedup_relationships: true },
        );
        assert_eq!(agg.label_info["Person"].relationships.len(), 1);
    }

    #[test]
    fn test_multi_label_node_feeds_every_label() {
        let records = vec![record(
            &["Person", "Employee"],
            &[("id", PropertyValue::Int(7))],
            &[("WORKS_AT", "Person", "Company")],
        )];
        let agg = aggregate(&schema(&["Person", "Employee", "Company"]), records, AggregateOptions::default());

        for label in ["Person", "Employee"] {
            assert_eq!(agg.label_info[label].properties["id"], PropertyType::Int);
            assert_eq!(agg.label_info[label].relationships.len(), 1);
        }
    }

    #[test]
    fn test_unknown_label_appended_after_schema_order() {
        let records = vec![record(&["Ghost"], &[("seen", PropertyValue::Bool(true))], &[])];
        let agg = aggregate(&schema(&["Zebra", "Apple"]), records, AggregateOptions::default());

        assert_eq!(agg.node_labels, vec!["Zebra", "Apple", "Ghost"]);
        assert_eq!(agg.label_info["Ghost"].properties["seen"], PropertyType::Boolean);
    }

    #[test]
    fn test_persisted_shape() {
        let records = vec![record(&["Person"], &[("name", PropertyValue::Str("A".into()))], &[("WORKS_AT", "Person", "Company")])];
        let agg = aggregate(&schema(&["Person"]), records, AggregateOptions::default());

        let json = serde_json::to_value(&agg).unwrap();
        assert_eq!(json["node_labels"], serde_json::json!(["Person"]));
        assert_eq!(json["label_info"]["Person"]["properties"]["name"], "string");
        assert_eq!(json["label_info"]["Person"]["relationships"][0]["type"], "WORKS_AT");
        assert_eq!(
            json["label_info"]["Person"]["relationships"][0]["start_node_labels"],
            serde_json::json!(["Person"])
        );
    }
}
