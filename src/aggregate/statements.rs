//! Readable `(A)-[:REL]->(B)` statements for relationship patterns.

use super::RelationshipPattern;

/// Render one pattern, endpoint labels joined by `:`.
pub fn format_pattern(pattern: &RelationshipPattern) -> String {
    format!(
        "({})-[:{}]->({})",
        pattern.start_node_labels.join(":"),
        pattern.rel_type,
        pattern.end_node_labels.join(":")
    )
}

/// Statements for the patterns whose two endpoints each carry at least one requested label.
///
/// Input order is kept and duplicates are not collapsed.
pub fn relationship_statements<S: AsRef<str>>(requested: &[S], patterns: &[RelationshipPattern]) -> Vec<String> {
    let is_requested = |label: &String| requested.iter().any(|r| r.as_ref() == label);

    patterns
        .iter()
        .filter(|p| p.start_node_labels.iter().any(is_requested) && p.end_node_labels.iter().any(is_requested))
        .map(format_pattern)
        .collect()
}
