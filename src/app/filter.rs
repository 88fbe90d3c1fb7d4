use std::collections::HashSet;

use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

use crate::graph::GraphSnapshot;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(in crate::app) enum FilterMode {
    #[default]
    All,
    OrphansOnly,
    HideOrphans,
}

impl FilterMode {
    pub(in crate::app) const ALL: [Self; 3] = [Self::All, Self::OrphansOnly, Self::HideOrphans];

    pub(in crate::app) fn label(self) -> &'static str {
        match self {
            Self::All => "All",
            Self::OrphansOnly => "Orphans only",
            Self::HideOrphans => "Hide orphans",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(in crate::app) struct VisibilityFilter {
    pub(in crate::app) query: String,
    pub(in crate::app) mode: FilterMode,
}

fn fuzzy_matches(matcher: &SkimMatcherV2, text: &str, query: &str) -> bool {
    matcher.fuzzy_match(text, query).is_some()
        || matcher
            .fuzzy_match(&text.to_lowercase(), &query.to_lowercase())
            .is_some()
}

impl VisibilityFilter {
    pub(in crate::app) fn is_active(&self) -> bool {
        !self.query.trim().is_empty() || self.mode != FilterMode::All
    }

    /// Flags every node in `snapshot`; returns how many stay visible.
    pub(in crate::app) fn apply(&self, snapshot: &mut GraphSnapshot) -> usize {
        let connected = snapshot
            .links()
            .iter()
            .filter(|link| snapshot.link_endpoints(link).is_some())
            .flat_map(|link| [link.source.clone(), link.target.clone()])
            .collect::<HashSet<_>>();

        let matcher = SkimMatcherV2::default();
        let query = self.query.trim();
        let mut visible = 0usize;

        snapshot.apply_visibility(|node| {
            let is_orphan = !connected.contains(&node.id);
            let mode_allows = match self.mode {
                FilterMode::All => true,
                FilterMode::OrphansOnly => is_orphan,
                FilterMode::HideOrphans => !is_orphan,
            };
            let shown = mode_allows
                && (query.is_empty() || fuzzy_matches(&matcher, &node.display_name, query));
            visible += usize::from(shown);
            shown
        });
        visible
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Link, Node};

    fn snapshot() -> GraphSnapshot {
        GraphSnapshot::new(
            [
                Node::document("alpha.md", "Alpha", None),
                Node::document("beta.md", "Beta", None),
                Node::document("lonely.md", "Lonely", None),
            ],
            [
                Link::explicit_reference("alpha.md", "beta.md", 1.0),
                Link::explicit_reference("lonely.md", "gone.md", 1.0),
            ],
            1,
        )
    }

    fn visible_ids(snapshot: &GraphSnapshot) -> Vec<&str> {
        snapshot
            .nodes()
            .filter(|node| node.visible)
            .map(|node| node.id.as_str())
            .collect()
    }

    #[test]
    fn orphan_modes_ignore_dangling_links() {
        let mut graph = snapshot();

        let orphans = VisibilityFilter {
            mode: FilterMode::OrphansOnly,
            ..VisibilityFilter::default()
        };
        assert_eq!(orphans.apply(&mut graph), 1);
        assert_eq!(visible_ids(&graph), vec!["lonely.md"]);

        let connected = VisibilityFilter {
            mode: FilterMode::HideOrphans,
            ..VisibilityFilter::default()
        };
        assert_eq!(connected.apply(&mut graph), 2);
        assert_eq!(visible_ids(&graph), vec!["alpha.md", "beta.md"]);
    }

    #[test]
    fn query_matches_display_names_fuzzily() {
        let mut graph = snapshot();
        let filter = VisibilityFilter {
            query: "alp".to_owned(),
            ..VisibilityFilter::default()
        };

        assert_eq!(filter.apply(&mut graph), 1);
        assert_eq!(visible_ids(&graph), vec!["alpha.md"]);

        assert_eq!(VisibilityFilter::default().apply(&mut graph), 3);
        assert!(!VisibilityFilter::default().is_active());
    }
}
