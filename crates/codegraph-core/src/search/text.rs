//! Text sent to the embedding model.

use crate::docstrings::DocstringSections;

/// Characters kept by [`preprocess_text`] besides letters, digits and spaces.
const MEANINGFUL: &[char] = &['@', '_', '.', ':', '#'];

/// Lowercase, collapse whitespace and drop ASCII punctuation except
/// `@ _ . : #`.
pub fn preprocess_text(text: &str) -> String {
    let lowered = text.to_lowercase();
    let stripped: String = collapse(&lowered)
        .chars()
        .filter(|c| !c.is_ascii_punctuation() || MEANINGFUL.contains(c))
        .collect();
    collapse(&stripped)
}

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Embedding text for a node with parsed docstring data.
pub fn node_text(name: &str, node_type: &str, doc: &DocstringSections) -> String {
    let mut text = format!("Node: {} (Type: {})\n", name, node_type);
    text.push_str(&format!("Summary: {}\n", doc.summary));

    if !doc.parameters.is_empty() {
        text.push_str("Parameters:\n");
        for (param, desc) in &doc.parameters {
            text.push_str(&format!("  - {}: {}\n", param, desc));
        }
    }

    for (label, value) in [
        ("Returns", &doc.returns),
        ("Raises", &doc.raises),
        ("Note", &doc.note),
        ("Example", &doc.example),
    ] {
        if !value.is_empty() {
            text.push_str(&format!("{}: {}\n", label, value));
        }
    }

    text
}

/// Embedding text for an edge.
pub fn edge_text(source: &str, target: &str, relation: &str) -> String {
    format!("Edge: {} -> {} (Relation: {})", source, target, relation)
}
