use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub node_size: f32,
    pub link_distance: f32,
    pub repulsion_force: f32,
    pub center_force: f32,
    pub default_link_thickness: f32,
    pub min_link_thickness: f32,
    pub max_link_thickness: f32,
    pub similarity_threshold: f32,
    pub use_embedding_linking: bool,
    pub show_tags: bool,
    pub link_thickness_overrides: BTreeMap<String, f32>,
    /// Keep a dragged node fixed where it was dropped.
    pub pin_on_release: bool,
    /// Node pairs farther apart than this do not repel. `None` means unbounded.
    pub repulsion_cutoff: Option<f32>,
    pub embedding: EmbeddingSettings,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EmbeddingSettings {
    pub api_base_url: String,
    pub model: String,
    pub api_key_env: String,
    /// Remote vector store. Blank means vectors are only cached locally.
    #[serde(deserialize_with = "null_as_empty")]
    pub store_url: String,
    pub request_delay_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            node_size: 6.0,
            link_distance: 100.0,
            repulsion_force: 300.0,
            center_force: 0.1,
            default_link_thickness: 1.5,
            min_link_thickness: 0.5,
            max_link_thickness: 5.0,
            similarity_threshold: 0.75,
            use_embedding_linking: false,
            show_tags: false,
            link_thickness_overrides: BTreeMap::new(),
            pin_on_release: true,
            repulsion_cutoff: Some(800.0),
            embedding: EmbeddingSettings::default(),
        }
    }
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.openai.com/v1".to_owned(),
            model: "text-embedding-3-small".to_owned(),
            api_key_env: "OPENAI_API_KEY".to_owned(),
            store_url: String::new(),
            request_delay_ms: 1000,
        }
    }
}

impl EmbeddingSettings {
    pub fn remote_store_url(&self) -> Option<&str> {
        Some(self.store_url.trim()).filter(|url| !url.is_empty())
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Option::unwrap_or_default)
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings from {}", path.display()))?;
        let settings: Self = serde_json::from_str(&raw)
            .with_context(|| format!("invalid settings JSON in {}", path.display()))?;
        Ok(settings.sanitized())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let raw = serde_json::to_string_pretty(self).context("failed to encode settings")?;
        fs::write(path, raw)
            .with_context(|| format!("failed to write settings to {}", path.display()))
    }

    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();

        self.node_size = positive_or(self.node_size, defaults.node_size);
        self.link_distance = positive_or(self.link_distance, defaults.link_distance);
        self.repulsion_force = non_negative_or(self.repulsion_force, defaults.repulsion_force);
        self.center_force = non_negative_or(self.center_force, defaults.center_force);
        self.default_link_thickness =
            positive_or(self.default_link_thickness, defaults.default_link_thickness);
        self.min_link_thickness =
            positive_or(self.min_link_thickness, defaults.min_link_thickness);
        self.max_link_thickness =
            positive_or(self.max_link_thickness, defaults.max_link_thickness);
        if self.min_link_thickness > self.max_link_thickness {
            std::mem::swap(&mut self.min_link_thickness, &mut self.max_link_thickness);
        }
        self.similarity_threshold = if self.similarity_threshold.is_finite() {
            self.similarity_threshold.clamp(0.0, 1.0)
        } else {
            defaults.similarity_threshold
        };
        self.repulsion_cutoff = self
            .repulsion_cutoff
            .filter(|cutoff| cutoff.is_finite() && *cutoff > 0.0);
        self.link_thickness_overrides
            .retain(|_, thickness| thickness.is_finite() && *thickness > 0.0);
        self
    }

    /// True when `other` would derive a different link set from the same documents.
    pub fn link_derivation_differs(&self, other: &Self) -> bool {
        self.use_embedding_linking != other.use_embedding_linking
            || self.similarity_threshold != other.similarity_threshold
            || self.show_tags != other.show_tags
            || (self.use_embedding_linking
                && (self.min_link_thickness != other.min_link_thickness
                    || self.max_link_thickness != other.max_link_thickness))
            || (!self.use_embedding_linking
                && self.default_link_thickness != other.default_link_thickness)
    }

    pub fn forces_differ(&self, other: &Self) -> bool {
        self.node_size != other.node_size
            || self.link_distance != other.link_distance
            || self.repulsion_force != other.repulsion_force
            || self.center_force != other.center_force
            || self.repulsion_cutoff != other.repulsion_cutoff
    }
}

fn positive_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        fallback
    }
}

fn non_negative_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() && value >= 0.0 {
        value
    } else {
        fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load(&dir.path().join("settings.json")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn save_then_load_preserves_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let mut settings = Settings {
            use_embedding_linking: true,
            similarity_threshold: 0.6,
            ..Settings::default()
        };
        settings
            .link_thickness_overrides
            .insert("ref:a.md->b.md".to_owned(), 3.0);
        settings.save(&path).unwrap();

        assert_eq!(Settings::load(&path).unwrap(), settings);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "showTags": true, "nodeSize": 9.0 }"#).unwrap();

        let settings = Settings::load(&path).unwrap();
        assert!(settings.show_tags);
        assert_eq!(settings.node_size, 9.0);
        assert_eq!(settings.link_distance, Settings::default().link_distance);
        assert_eq!(settings.embedding.request_delay_ms, 1000);
    }

    #[test]
    fn blank_store_url_means_local_only() {
        let mut embedding = EmbeddingSettings::default();
        assert_eq!(embedding.remote_store_url(), None);

        embedding.store_url = "   ".to_owned();
        assert_eq!(embedding.remote_store_url(), None);

        embedding.store_url = " https://store.example/vectors ".to_owned();
        assert_eq!(
            embedding.remote_store_url(),
            Some("https://store.example/vectors")
        );
    }

    #[test]
    fn typed_store_url_survives_save_and_null_loads_as_blank() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let mut settings = Settings::default();
        for ch in "http://s".chars() {
            settings.embedding.store_url.push(ch);
        }
        settings.save(&path).unwrap();
        assert_eq!(
            Settings::load(&path).unwrap().embedding.store_url,
            "http://s"
        );

        fs::write(&path, r#"{ "embedding": { "storeUrl": null } }"#).unwrap();
        let loaded = Settings::load(&path).unwrap();
        assert_eq!(loaded.embedding.store_url, "");
        assert_eq!(loaded.embedding.remote_store_url(), None);
    }

    #[test]
    fn sanitize_clamps_out_of_range_values() {
        let settings = Settings {
            similarity_threshold: 1.7,
            min_link_thickness: 8.0,
            max_link_thickness: 2.0,
            node_size: -1.0,
            repulsion_cutoff: Some(0.0),
            ..Settings::default()
        }
        .sanitized();

        assert_eq!(settings.similarity_threshold, 1.0);
        assert_eq!(settings.min_link_thickness, 2.0);
        assert_eq!(settings.max_link_thickness, 8.0);
        assert_eq!(settings.node_size, 6.0);
        assert_eq!(settings.repulsion_cutoff, None);
    }

    #[test]
    fn link_derivation_changes_are_detected() {
        let base = Settings::default();
        let tags = Settings {
            show_tags: true,
            ..Settings::default()
        };
        let forces = Settings {
            repulsion_force: 50.0,
            ..Settings::default()
        };

        assert!(base.link_derivation_differs(&tags));
        assert!(!base.link_derivation_differs(&forces));
        assert!(base.forces_differ(&forces));
    }
}
