mod collect;
mod parse;

use anyhow::Result;

pub use collect::MarkdownVault;

/// Frontmatter key holding tags produced by an external tagging model.
pub const AI_TAGS_FIELD: &str = "ai-tags";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AiTagsField {
    List(Vec<String>),
    Text(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Document {
    pub id: String,
    pub display_name: String,
    pub tags: Vec<String>,
    pub outbound_references: Vec<String>,
    pub ai_tags: Option<AiTagsField>,
}

impl Document {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        let display_name = display_name_for(&id);
        Self {
            id,
            display_name,
            tags: Vec::new(),
            outbound_references: Vec::new(),
            ai_tags: None,
        }
    }

    #[cfg(test)]
    pub fn with_references<I, S>(mut self, references: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.outbound_references = references.into_iter().map(Into::into).collect();
        self
    }

    #[cfg(test)]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    #[cfg(test)]
    pub fn with_ai_tags(mut self, field: AiTagsField) -> Self {
        self.ai_tags = Some(field);
        self
    }
}

pub trait DocumentSource {
    fn list_documents(&self) -> Result<Vec<Document>>;

    /// Body text used as embedding input.
    fn document_text(&self, id: &str) -> Result<String>;
}

/// File stem of a `/`-separated document id.
pub fn display_name_for(id: &str) -> String {
    let file = id.rsplit('/').next().unwrap_or(id);
    file.strip_suffix(".md").unwrap_or(file).to_owned()
}
