use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::vault::{AiTagsField, Document};

use super::{Link, Node};

pub const TAG_MARKER: char = '#';

static QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""([^"]+)"|'([^']+)'"#).expect("valid regex"));

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TagFieldError {
    #[error("ai-tags value is neither a JSON array nor a list of quoted strings: {0:?}")]
    Malformed(String),
}

/// Canonical tag node id (`#` + lowercase tag), or `None` for strings that cannot be tags.
pub fn normalize_tag(raw: &str) -> Option<String> {
    let tag = raw.trim().trim_start_matches(TAG_MARKER).trim();
    if tag.is_empty() || tag.chars().any(char::is_whitespace) {
        return None;
    }
    Some(format!("{TAG_MARKER}{}", tag.to_lowercase()))
}

fn parse_ai_tags_text(text: &str) -> Result<Vec<String>, TagFieldError> {
    if let Ok(tags) = serde_json::from_str::<Vec<String>>(text) {
        return Ok(tags);
    }

    let quoted = QUOTED
        .captures_iter(text)
        .filter_map(|captures| captures.get(1).or_else(|| captures.get(2)))
        .map(|found| found.as_str().to_owned())
        .collect::<Vec<_>>();
    if quoted.is_empty() {
        Err(TagFieldError::Malformed(text.to_owned()))
    } else {
        Ok(quoted)
    }
}

/// Raw AI tags for a document; a malformed field contributes none.
pub fn ai_tags(field: Option<&AiTagsField>) -> Vec<String> {
    match field {
        None => Vec::new(),
        Some(AiTagsField::List(tags)) => tags.clone(),
        Some(AiTagsField::Text(text)) => parse_ai_tags_text(text).unwrap_or_else(|error| {
            tracing::debug!(%error, "ignoring ai-tags field");
            Vec::new()
        }),
    }
}

/// Normalized tag ids referenced by `document`, first occurrence order, no duplicates.
pub fn document_tag_ids(document: &Document) -> Vec<String> {
    let mut seen = HashSet::new();
    document
        .tags
        .iter()
        .cloned()
        .chain(ai_tags(document.ai_tags.as_ref()))
        .filter_map(|raw| normalize_tag(&raw))
        .filter(|tag| seen.insert(tag.clone()))
        .collect()
}

/// One tag node per distinct tag, sorted by id, plus one membership link per document/tag pair.
pub fn tag_nodes_and_links(documents: &[Document]) -> (Vec<Node>, Vec<Link>) {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut links = Vec::new();
    let mut seen_documents = HashSet::new();

    for document in documents {
        if !seen_documents.insert(document.id.as_str()) {
            continue;
        }
        for tag_id in document_tag_ids(document) {
            *counts.entry(tag_id.clone()).or_default() += 1;
            links.push(Link::tag_membership(&document.id, &tag_id));
        }
    }

    let nodes = counts
        .into_iter()
        .map(|(tag_id, count)| Node::tag(tag_id, count))
        .collect();
    (nodes, links)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_adds_marker_and_lowercases() {
        assert_eq!(normalize_tag("  Rust "), Some("#rust".to_owned()));
        assert_eq!(normalize_tag("#Graph/Layout"), Some("#graph/layout".to_owned()));
        assert_eq!(normalize_tag("##"), None);
        assert_eq!(normalize_tag("two words"), None);
    }

    #[test]
    fn ai_tags_accept_list_and_json_text() {
        let list = AiTagsField::List(vec!["a".to_owned(), "b".to_owned()]);
        assert_eq!(ai_tags(Some(&list)), vec!["a", "b"]);

        let json = AiTagsField::Text(r#"["physics", "layout"]"#.to_owned());
        assert_eq!(ai_tags(Some(&json)), vec!["physics", "layout"]);
    }

    #[test]
    fn broken_json_falls_back_to_quoted_substrings() {
        let text = AiTagsField::Text(r#"["physics", 'layout', unquoted"#.to_owned());
        assert_eq!(ai_tags(Some(&text)), vec!["physics", "layout"]);
    }

    #[test]
    fn unterminated_text_without_quotes_yields_nothing() {
        let text = "not json [unterminated";
        assert_eq!(
            parse_ai_tags_text(text),
            Err(TagFieldError::Malformed(text.to_owned()))
        );
        assert!(ai_tags(Some(&AiTagsField::Text(text.to_owned()))).is_empty());
    }

    #[test]
    fn document_tags_merge_sources_without_duplicates() {
        let document = Document::new("n.md")
            .with_tags(["Rust", "#graphs"])
            .with_ai_tags(AiTagsField::Text(r#"["rust", "embeddings"]"#.to_owned()));

        assert_eq!(
            document_tag_ids(&document),
            vec!["#rust", "#graphs", "#embeddings"]
        );
    }

    #[test]
    fn tag_nodes_count_referencing_documents() {
        let documents = vec![
            Document::new("a.md").with_tags(["x", "y"]),
            Document::new("b.md").with_tags(["x"]),
        ];

        let (nodes, links) = tag_nodes_and_links(&documents);
        let counts = nodes
            .iter()
            .map(|node| (node.id.as_str(), node.tag_connection_count))
            .collect::<Vec<_>>();

        assert_eq!(counts, vec![("#x", 2), ("#y", 1)]);
        assert_eq!(links.len(), 3);
        assert!(links.iter().all(|link| link.target.starts_with(TAG_MARKER)));
    }
}
