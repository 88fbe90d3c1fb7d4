//! Graph model: nodes, links, and the snapshot handed to the simulation.
//!
//! Links reference nodes by id only. Anything that needs an endpoint resolves
//! it through the snapshot's id index at the point of use.

mod links;
mod similarity;
mod tags;

use std::collections::HashSet;
#[cfg(test)]
use std::collections::BTreeSet;

use eframe::egui::Vec2;
use indexmap::IndexMap;

use crate::embed::EmbeddingCache;
use crate::settings::Settings;
use crate::vault::Document;

pub use self::links::{explicit_reference_links, semantic_similarity_links};
pub use self::tags::tag_nodes_and_links;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Document,
    Tag,
}

#[derive(Clone, Debug)]
pub struct Node {
    pub id: String,
    pub display_name: String,
    pub kind: NodeKind,
    pub position: Vec2,
    pub velocity: Vec2,
    /// While set, the simulation holds the node here instead of integrating it.
    pub pinned: Option<Vec2>,
    pub embedding: Option<Vec<f32>>,
    pub visible: bool,
    pub tag_connection_count: usize,
}

impl Node {
    pub fn document(
        id: impl Into<String>,
        display_name: impl Into<String>,
        embedding: Option<Vec<f32>>,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            kind: NodeKind::Document,
            position: Vec2::ZERO,
            velocity: Vec2::ZERO,
            pinned: None,
            embedding,
            visible: true,
            tag_connection_count: 0,
        }
    }

    pub fn tag(id: impl Into<String>, connection_count: usize) -> Self {
        let id = id.into();
        Self {
            display_name: id.clone(),
            id,
            kind: NodeKind::Tag,
            position: Vec2::ZERO,
            velocity: Vec2::ZERO,
            pinned: None,
            embedding: None,
            visible: true,
            tag_connection_count: connection_count,
        }
    }

    /// Drawn and hit-tested radius; tags grow with the number of documents using them.
    pub fn radius(&self, node_size: f32) -> f32 {
        match self.kind {
            NodeKind::Document => node_size,
            NodeKind::Tag => {
                node_size * (1.0 + (self.tag_connection_count as f32).ln_1p() * 0.35).min(2.5)
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LinkKind {
    ExplicitReference,
    SemanticSimilarity,
    TagMembership,
}

impl LinkKind {
    fn id_prefix(self) -> &'static str {
        match self {
            Self::ExplicitReference => "ref",
            Self::SemanticSimilarity => "sim",
            Self::TagMembership => "tag",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::ExplicitReference => "Reference",
            Self::SemanticSimilarity => "Semantic similarity",
            Self::TagMembership => "Tag",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Link {
    pub id: String,
    pub source: String,
    pub target: String,
    pub kind: LinkKind,
    pub similarity: Option<f32>,
    pub thickness: Option<f32>,
}

impl Link {
    pub fn explicit_reference(source: &str, target: &str, thickness: f32) -> Self {
        let kind = LinkKind::ExplicitReference;
        Self {
            id: format!("{}:{source}->{target}", kind.id_prefix()),
            source: source.to_owned(),
            target: target.to_owned(),
            kind,
            similarity: None,
            thickness: Some(thickness),
        }
    }

    /// Endpoints are stored in id order so either argument order yields the same link.
    pub fn semantic_similarity(a: &str, b: &str, similarity: f32, thickness: f32) -> Self {
        let (source, target) = if a <= b { (a, b) } else { (b, a) };
        let kind = LinkKind::SemanticSimilarity;
        Self {
            id: format!("{}:{source}<->{target}", kind.id_prefix()),
            source: source.to_owned(),
            target: target.to_owned(),
            kind,
            similarity: Some(similarity),
            thickness: Some(thickness),
        }
    }

    pub fn tag_membership(document_id: &str, tag_id: &str) -> Self {
        let kind = LinkKind::TagMembership;
        Self {
            id: format!("{}:{document_id}->{tag_id}", kind.id_prefix()),
            source: document_id.to_owned(),
            target: tag_id.to_owned(),
            kind,
            similarity: None,
            thickness: None,
        }
    }

    /// Per-link override, then the link's own thickness, then the global default.
    pub fn effective_thickness(&self, settings: &Settings) -> f32 {
        settings
            .link_thickness_overrides
            .get(&self.id)
            .copied()
            .or(self.thickness)
            .unwrap_or(settings.default_link_thickness)
    }
}

#[derive(Clone, Debug, Default)]
pub struct GraphSnapshot {
    nodes: IndexMap<String, Node>,
    links: Vec<Link>,
    revision: u64,
}

impl GraphSnapshot {
    /// Duplicate node ids keep the first node, duplicate link ids the first link.
    pub fn new(
        nodes: impl IntoIterator<Item = Node>,
        links: impl IntoIterator<Item = Link>,
        revision: u64,
    ) -> Self {
        let mut node_map = IndexMap::new();
        for node in nodes {
            if node_map.contains_key(&node.id) {
                tracing::debug!(id = %node.id, "dropping duplicate node");
                continue;
            }
            node_map.insert(node.id.clone(), node);
        }

        let mut seen = HashSet::new();
        let links = links
            .into_iter()
            .filter(|link| seen.insert(link.id.clone()))
            .collect();

        Self {
            nodes: node_map,
            links,
            revision,
        }
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub(crate) fn nodes_mut(&mut self) -> impl Iterator<Item = &mut Node> {
        self.nodes.values_mut()
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub(crate) fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.nodes.get_index_of(id)
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn link(&self, id: &str) -> Option<&Link> {
        self.links.iter().find(|link| link.id == id)
    }

    /// Node indices of both endpoints, or `None` when either is missing.
    pub fn link_endpoints(&self, link: &Link) -> Option<(usize, usize)> {
        Some((self.index_of(&link.source)?, self.index_of(&link.target)?))
    }

    pub fn link_visible(&self, link: &Link) -> bool {
        match (self.node(&link.source), self.node(&link.target)) {
            (Some(source), Some(target)) => source.visible && target.visible,
            _ => false,
        }
    }

    pub fn degree(&self, id: &str) -> usize {
        self.links
            .iter()
            .filter(|link| link.source == id || link.target == id)
            .count()
    }

    /// Flags nodes visible or hidden; nothing is removed.
    pub fn apply_visibility(&mut self, mut predicate: impl FnMut(&Node) -> bool) {
        for node in self.nodes.values_mut() {
            node.visible = predicate(node);
        }
    }

    #[cfg(test)]
    pub fn node_ids(&self) -> BTreeSet<String> {
        self.nodes.keys().cloned().collect()
    }

    #[cfg(test)]
    pub fn link_ids(&self) -> BTreeSet<String> {
        self.links.iter().map(|link| link.id.clone()).collect()
    }
}

/// Builds snapshots from the document collection and cached embeddings.
pub struct GraphModel<C> {
    cache: C,
    revision: u64,
}

impl<C: EmbeddingCache> GraphModel<C> {
    pub fn new(cache: C) -> Self {
        Self { cache, revision: 0 }
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut C {
        &mut self.cache
    }

    pub fn rebuild(&mut self, documents: &[Document], settings: &Settings) -> GraphSnapshot {
        self.revision = self.revision.wrapping_add(1);

        let mut nodes: IndexMap<String, Node> = IndexMap::with_capacity(documents.len());
        for document in documents {
            if nodes.contains_key(&document.id) {
                tracing::debug!(id = %document.id, "skipping duplicate document");
                continue;
            }
            let embedding = self.cache.get_cached_embedding(&document.id);
            nodes.insert(
                document.id.clone(),
                Node::document(&document.id, &document.display_name, embedding),
            );
        }

        let mut links = if settings.use_embedding_linking {
            semantic_similarity_links(&nodes, settings)
        } else {
            explicit_reference_links(documents, &nodes, settings)
        };

        if settings.show_tags {
            let (tag_nodes, tag_links) = tag_nodes_and_links(documents);
            for tag in tag_nodes {
                if nodes.contains_key(&tag.id) {
                    tracing::warn!(id = %tag.id, "tag collides with a document id; skipped");
                    continue;
                }
                nodes.insert(tag.id.clone(), tag);
            }
            links.extend(tag_links.into_iter().filter(|link| {
                nodes
                    .get(&link.target)
                    .is_some_and(|node| node.kind == NodeKind::Tag)
            }));
        }

        tracing::info!(
            revision = self.revision,
            nodes = nodes.len(),
            links = links.len(),
            semantic = settings.use_embedding_linking,
            tags = settings.show_tags,
            "rebuilt graph"
        );
        GraphSnapshot::new(nodes.into_values(), links, self.revision)
    }
}
