use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;

use crate::settings::Settings;
use crate::vault::{Document, display_name_for};

use super::similarity::{cosine_similarity, thickness_from_similarity};
use super::{Link, Node, NodeKind};

/// Maps reference text from a note to a document id in the current node set.
pub struct ReferenceResolver<'a> {
    ids: HashSet<&'a str>,
    by_lowercase_id: HashMap<String, &'a str>,
    by_stem: HashMap<String, &'a str>,
}

impl<'a> ReferenceResolver<'a> {
    /// `ids` must be iterated in a stable order; the first id wins stem collisions.
    pub fn new(ids: impl IntoIterator<Item = &'a str>) -> Self {
        let mut resolver = Self {
            ids: HashSet::new(),
            by_lowercase_id: HashMap::new(),
            by_stem: HashMap::new(),
        };

        for id in ids {
            resolver.ids.insert(id);
            resolver.by_lowercase_id.entry(id.to_lowercase()).or_insert(id);
            resolver
                .by_stem
                .entry(display_name_for(id).to_lowercase())
                .or_insert(id);
        }
        resolver
    }

    fn exact(&self, candidate: &str) -> Option<&'a str> {
        if let Some(&id) = self.ids.get(candidate) {
            return Some(id);
        }
        self.by_lowercase_id.get(&candidate.to_lowercase()).copied()
    }

    pub fn resolve(&self, source_id: &str, reference: &str) -> Option<&'a str> {
        let reference = reference.trim().trim_start_matches("./");
        if reference.is_empty() {
            return None;
        }

        let with_extension = if reference.ends_with(".md") {
            None
        } else {
            Some(format!("{reference}.md"))
        };

        let mut candidates = vec![reference.to_owned()];
        candidates.extend(with_extension.clone());
        if let Some((folder, _)) = source_id.rsplit_once('/') {
            for candidate in std::iter::once(reference).chain(with_extension.as_deref()) {
                if let Some(joined) = join_relative(folder, candidate) {
                    candidates.push(joined);
                }
            }
        }

        for candidate in &candidates {
            if let Some(id) = self.exact(candidate) {
                return Some(id);
            }
        }

        if reference.contains('/') {
            return None;
        }
        self.by_stem.get(&display_name_for(reference).to_lowercase()).copied()
    }
}

fn join_relative(folder: &str, reference: &str) -> Option<String> {
    let mut parts = folder.split('/').filter(|part| !part.is_empty()).collect::<Vec<_>>();
    for part in reference.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            other => parts.push(other),
        }
    }
    Some(parts.join("/"))
}

fn dedup_by_id(links: &mut Vec<Link>) {
    let mut seen = HashSet::new();
    links.retain(|link| seen.insert(link.id.clone()));
}

pub fn explicit_reference_links(
    documents: &[Document],
    nodes: &IndexMap<String, Node>,
    settings: &Settings,
) -> Vec<Link> {
    let resolver = ReferenceResolver::new(
        nodes
            .values()
            .filter(|node| node.kind == NodeKind::Document)
            .map(|node| node.id.as_str()),
    );

    let mut links = Vec::new();
    for document in documents {
        if !nodes.contains_key(&document.id) {
            continue;
        }

        for reference in &document.outbound_references {
            let Some(target) = resolver.resolve(&document.id, reference) else {
                tracing::debug!(source = %document.id, %reference, "unresolved reference");
                continue;
            };
            if target == document.id {
                continue;
            }
            links.push(Link::explicit_reference(
                &document.id,
                target,
                settings.default_link_thickness,
            ));
        }
    }

    dedup_by_id(&mut links);
    links
}

/// Scores every unordered pair of embedded documents; documents without an
/// embedding take no part in pairing.
pub fn semantic_similarity_links(nodes: &IndexMap<String, Node>, settings: &Settings) -> Vec<Link> {
    let embedded = nodes
        .values()
        .filter(|node| node.kind == NodeKind::Document)
        .filter_map(|node| node.embedding.as_deref().map(|vector| (node.id.as_str(), vector)))
        .collect::<Vec<_>>();

    let threshold = settings.similarity_threshold;
    let mut links = Vec::new();
    let mut mismatches = 0usize;

    for (i, &(left_id, left)) in embedded.iter().enumerate() {
        for &(right_id, right) in &embedded[i + 1..] {
            let similarity = match cosine_similarity(left, right) {
                Ok(similarity) => similarity,
                Err(error) => {
                    mismatches += 1;
                    tracing::debug!(%left_id, %right_id, %error, "skipping pair");
                    continue;
                }
            };

            if !similarity.is_finite() || similarity < threshold {
                continue;
            }

            let thickness = thickness_from_similarity(
                similarity,
                threshold,
                settings.min_link_thickness,
                settings.max_link_thickness,
            );
            links.push(Link::semantic_similarity(
                left_id,
                right_id,
                similarity.clamp(0.0, 1.0),
                thickness,
            ));
        }
    }

    if mismatches > 0 {
        tracing::warn!(mismatches, "embedding pairs skipped for dimension mismatch");
    }
    links
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::LinkKind;

    fn node_map(nodes: Vec<Node>) -> IndexMap<String, Node> {
        nodes.into_iter().map(|node| (node.id.clone(), node)).collect()
    }

    #[test]
    fn resolver_tries_paths_then_stems() {
        let resolver = ReferenceResolver::new(["notes/Alpha.md", "notes/sub/beta.md", "gamma.md"]);

        assert_eq!(resolver.resolve("x.md", "gamma.md"), Some("gamma.md"));
        assert_eq!(resolver.resolve("x.md", "notes/Alpha"), Some("notes/Alpha.md"));
        assert_eq!(resolver.resolve("notes/x.md", "sub/beta.md"), Some("notes/sub/beta.md"));
        assert_eq!(resolver.resolve("notes/sub/x.md", "../Alpha.md"), Some("notes/Alpha.md"));
        assert_eq!(resolver.resolve("x.md", "alpha"), Some("notes/Alpha.md"));
        assert_eq!(resolver.resolve("x.md", "missing"), None);
        assert_eq!(resolver.resolve("x.md", "other/beta"), None);
    }

    #[test]
    fn explicit_links_skip_unresolved_and_self_references() {
        let documents = vec![
            Document::new("a.md").with_references(["b", "missing", "a", "b.md"]),
            Document::new("b.md"),
        ];
        let nodes = node_map(vec![
            Node::document("a.md", "a", None),
            Node::document("b.md", "b", None),
        ]);

        let links = explicit_reference_links(&documents, &nodes, &Settings::default());
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].source, "a.md");
        assert_eq!(links[0].target, "b.md");
        assert_eq!(links[0].kind, LinkKind::ExplicitReference);
        assert_eq!(links[0].thickness, Some(Settings::default().default_link_thickness));
    }

    #[test]
    fn threshold_boundary_is_inclusive() {
        let nodes = node_map(vec![
            Node::document("a.md", "a", Some(vec![1.0, 0.0])),
            Node::document("b.md", "b", Some(vec![1.0, 1.0])),
        ]);
        let similarity = cosine_similarity(&[1.0, 0.0], &[1.0, 1.0]).unwrap();

        let at = Settings {
            similarity_threshold: similarity,
            ..Settings::default()
        };
        let links = semantic_similarity_links(&nodes, &at);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].thickness, Some(at.min_link_thickness));

        let above = Settings {
            similarity_threshold: similarity + f32::EPSILON,
            ..Settings::default()
        };
        assert!(semantic_similarity_links(&nodes, &above).is_empty());
    }

    #[test]
    fn mismatched_dimensions_skip_only_that_pair() {
        let nodes = node_map(vec![
            Node::document("a.md", "a", Some(vec![1.0, 0.0])),
            Node::document("b.md", "b", Some(vec![1.0, 0.0, 0.0])),
            Node::document("c.md", "c", Some(vec![1.0, 0.1])),
        ]);
        let settings = Settings {
            similarity_threshold: 0.5,
            ..Settings::default()
        };

        let links = semantic_similarity_links(&nodes, &settings);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].id, Link::semantic_similarity("c.md", "a.md", 1.0, 1.0).id);
    }

    #[test]
    fn non_finite_similarity_never_links() {
        let nodes = node_map(vec![
            Node::document("a.md", "a", Some(vec![f32::NAN, 1.0])),
            Node::document("b.md", "b", Some(vec![1.0, 1.0])),
            Node::document("c.md", "c", Some(vec![1.0, 1.0])),
        ]);
        let settings = Settings {
            use_embedding_linking: true,
            similarity_threshold: 0.0,
            ..Settings::default()
        };

        let links = semantic_similarity_links(&nodes, &settings);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].id, Link::semantic_similarity("b.md", "c.md", 1.0, 1.0).id);
        assert!(links.iter().all(|link| link.similarity.is_some_and(f32::is_finite)));
    }
}
