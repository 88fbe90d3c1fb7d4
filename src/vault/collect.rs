use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};

use super::parse::{
    frontmatter_ai_tags, frontmatter_tags, inline_tags, outbound_references, split_frontmatter,
    strip_code_blocks,
};
use super::{Document, DocumentSource};

/// A directory of Markdown notes; every `*.md` file outside dot-directories is a document.
#[derive(Clone, Debug)]
pub struct MarkdownVault {
    root: PathBuf,
}

impl MarkdownVault {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, id: &str) -> Result<PathBuf> {
        if id.split('/').any(|part| part == ".." || part.is_empty()) {
            return Err(anyhow!("document id {id:?} escapes the vault"));
        }
        Ok(self.root.join(id))
    }
}

fn collect_markdown_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    let entries =
        fs::read_dir(dir).with_context(|| format!("failed to read directory {}", dir.display()))?;

    for entry in entries {
        let entry = entry.with_context(|| format!("failed to list {}", dir.display()))?;
        let name = entry.file_name();
        if name.to_string_lossy().starts_with('.') {
            continue;
        }

        let path = entry.path();
        let file_type = entry
            .file_type()
            .with_context(|| format!("failed to stat {}", path.display()))?;
        if file_type.is_dir() {
            collect_markdown_files(&path, files)?;
        } else if path.extension().is_some_and(|ext| ext == "md") {
            files.push(path);
        }
    }

    Ok(())
}

fn relative_id(root: &Path, path: &Path) -> Result<String> {
    let relative = path
        .strip_prefix(root)
        .with_context(|| format!("{} is outside the vault", path.display()))?;
    Ok(relative
        .components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/"))
}

pub(super) fn parse_document(id: String, content: &str) -> Document {
    let note = split_frontmatter(content);
    let body = strip_code_blocks(note.body);

    let mut tags = note
        .frontmatter
        .as_ref()
        .map(frontmatter_tags)
        .unwrap_or_default();
    tags.extend(inline_tags(&body));

    let ai_tags = note.frontmatter.as_ref().and_then(frontmatter_ai_tags);

    Document {
        tags,
        outbound_references: outbound_references(&body),
        ai_tags,
        ..Document::new(id)
    }
}

impl DocumentSource for MarkdownVault {
    fn list_documents(&self) -> Result<Vec<Document>> {
        let mut files = Vec::new();
        collect_markdown_files(&self.root, &mut files)?;

        let mut documents = Vec::with_capacity(files.len());
        for path in files {
            let id = relative_id(&self.root, &path)?;
            let bytes =
                fs::read(&path).with_context(|| format!("failed to read {}", path.display()))?;
            let content = String::from_utf8_lossy(&bytes);
            documents.push(parse_document(id, &content));
        }

        documents.sort_by(|a, b| a.id.cmp(&b.id));
        tracing::info!(
            root = %self.root.display(),
            documents = documents.len(),
            "scanned vault"
        );
        Ok(documents)
    }

    fn document_text(&self, id: &str) -> Result<String> {
        let path = self.path_for(id)?;
        let bytes = fs::read(&path).with_context(|| format!("failed to read {}", path.display()))?;
        let content = String::from_utf8_lossy(&bytes);
        Ok(split_frontmatter(&content).body.trim().to_owned())
    }
}
