use std::sync::LazyLock;

use regex::Regex;
use serde_yaml::Value;

use super::{AI_TAGS_FIELD, AiTagsField};

static WIKILINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[\[([^\[\]|#^]+)(?:[#^][^\[\]|]*)?(?:\|[^\[\]]*)?\]\]").expect("valid regex")
});

static MARKDOWN_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[[^\]]*\]\(<?([^)\s>]+?\.md)(?:#[^)\s>]*)?>?\)").expect("valid regex")
});

static INLINE_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[\s(,])#([\p{L}\p{N}_][\p{L}\p{N}_/\-]*)").expect("valid regex")
});

pub(super) struct ParsedNote<'a> {
    pub(super) frontmatter: Option<Value>,
    pub(super) body: &'a str,
}

pub(super) fn split_frontmatter(content: &str) -> ParsedNote<'_> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let Some(rest) = content
        .strip_prefix("---\n")
        .or_else(|| content.strip_prefix("---\r\n"))
    else {
        return ParsedNote {
            frontmatter: None,
            body: content,
        };
    };

    let mut offset = 0usize;
    for line in rest.split_inclusive('\n') {
        let trimmed = line.trim_end_matches(['\r', '\n']);
        if trimmed == "---" || trimmed == "..." {
            let yaml = &rest[..offset];
            let body = &rest[offset + line.len()..];
            let frontmatter = match serde_yaml::from_str::<Value>(yaml) {
                Ok(value) => Some(value),
                Err(error) => {
                    tracing::debug!(%error, "ignoring unparsable frontmatter");
                    None
                }
            };
            return ParsedNote { frontmatter, body };
        }
        offset += line.len();
    }

    ParsedNote {
        frontmatter: None,
        body: content,
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

pub(super) fn frontmatter_tags(frontmatter: &Value) -> Vec<String> {
    let Some(value) = frontmatter.get("tags").or_else(|| frontmatter.get("tag")) else {
        return Vec::new();
    };

    match value {
        Value::Sequence(items) => items.iter().filter_map(scalar_to_string).collect(),
        Value::String(text) => text
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|part| !part.is_empty())
            .map(str::to_owned)
            .collect(),
        _ => Vec::new(),
    }
}

pub(super) fn frontmatter_ai_tags(frontmatter: &Value) -> Option<AiTagsField> {
    match frontmatter.get(AI_TAGS_FIELD)? {
        Value::Sequence(items) => Some(AiTagsField::List(
            items.iter().filter_map(scalar_to_string).collect(),
        )),
        Value::String(text) => Some(AiTagsField::Text(text.clone())),
        Value::Null => None,
        other => {
            tracing::debug!(?other, "ignoring ai-tags field of unsupported type");
            None
        }
    }
}

/// Drops fenced code blocks so their contents do not yield links or tags.
pub(super) fn strip_code_blocks(body: &str) -> String {
    let mut output = String::with_capacity(body.len());
    let mut in_fence = false;
    for line in body.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_fence = !in_fence;
            continue;
        }
        if !in_fence {
            output.push_str(line);
            output.push('\n');
        }
    }
    output
}

pub(super) fn outbound_references(body: &str) -> Vec<String> {
    let mut references = Vec::new();
    for captures in WIKILINK.captures_iter(body) {
        let target = captures[1].trim();
        if !target.is_empty() {
            references.push(target.to_owned());
        }
    }

    for captures in MARKDOWN_LINK.captures_iter(body) {
        let target = &captures[1];
        if target.contains("://") {
            continue;
        }
        references.push(target.replace("%20", " "));
    }

    let mut seen = std::collections::HashSet::new();
    references.retain(|reference| seen.insert(reference.clone()));
    references
}

pub(super) fn inline_tags(body: &str) -> Vec<String> {
    INLINE_TAG
        .captures_iter(body)
        .map(|captures| captures[1].to_owned())
        .filter(|tag| !tag.chars().all(|c| c.is_ascii_digit()))
        .collect()
}
