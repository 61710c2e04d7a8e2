//! Parsing of the labeled draft format emitted by the content backend.
//!
//! Generation backends return prose, so the drafting role asks for labeled
//! fields:
//!
//! ```text
//! TITLE: Getting Started with Tokio
//!
//! TAGS: rust, async, tokio
//!
//! DESCRIPTION: A practical tour of the Tokio runtime.
//!
//! BODY:
//! ## Introduction
//! ...
//! ```
//!
//! Parsing is a recoverable boundary: [`DraftFields::complete`] fails when a
//! field is missing, and [`DraftFields::or_defaults`] fills gaps instead.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use super::transcript::DraftPayload;

/// Upper bound on tags accepted by the publishing API.
pub const MAX_TAGS: usize = 4;
/// Upper bound on the summary length (characters).
pub const MAX_SUMMARY_CHARS: usize = 140;

static LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*[*#]*[ \t]*(TITLE|TAGS|DESCRIPTION|BODY)[ \t]*:[*]*[ \t]*(.*)$")
        .expect("label regex is valid")
});

/// A required label was not found in the generated text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftParseError {
    pub missing: Vec<&'static str>,
}

impl fmt::Display for DraftParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "draft is missing {}", self.missing.join(", "))
    }
}

impl std::error::Error for DraftParseError {}

/// Raw labeled fields, each optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DraftFields {
    pub title: Option<String>,
    pub tags: Option<String>,
    pub description: Option<String>,
    pub body: Option<String>,
}

/// Extract labeled fields from `text`.
///
/// Single-line labels take the rest of their line. `BODY:` takes everything
/// after the label, including text on the label line itself. The first
/// occurrence of each label wins; labels after `BODY:` are body content.
pub fn parse_fields(text: &str) -> DraftFields {
    let mut fields = DraftFields::default();
    for caps in LABEL_RE.captures_iter(text) {
        let (Some(label), Some(rest)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        let value = rest.as_str().trim();
        match label.as_str() {
            "TITLE" if fields.title.is_none() => fields.title = non_empty(value),
            "TAGS" if fields.tags.is_none() => fields.tags = non_empty(value),
            "DESCRIPTION" if fields.description.is_none() => {
                fields.description = non_empty(value);
            }
            "BODY" => {
                let mut body = value.to_string();
                let after = text[rest.end()..].trim_start_matches(['\r', '\n']);
                if !after.trim().is_empty() {
                    if !body.is_empty() {
                        body.push('\n');
                    }
                    body.push_str(after.trim_end());
                }
                fields.body = non_empty(&body);
                break;
            }
            _ => {}
        }
    }
    fields
}

impl DraftFields {
    /// Build a draft only if every field is present.
    pub fn complete(&self) -> Result<DraftPayload, DraftParseError> {
        let mut missing = Vec::new();
        if self.title.is_none() {
            missing.push("TITLE");
        }
        if self.tags.is_none() {
            missing.push("TAGS");
        }
        if self.description.is_none() {
            missing.push("DESCRIPTION");
        }
        if self.body.is_none() {
            missing.push("BODY");
        }
        if !missing.is_empty() {
            return Err(DraftParseError { missing });
        }
        Ok(DraftPayload {
            title: self.title.clone().unwrap_or_default(),
            tags: normalize_tags(self.tags.as_deref().unwrap_or_default()),
            summary: truncate_summary(self.description.as_deref().unwrap_or_default()),
            body: self.body.clone().unwrap_or_default(),
        })
    }

    /// Build a draft, filling missing fields from `raw`, `topic` and `default_tags`.
    ///
    /// - body: the parsed body, else the generated text without label lines
    /// - title: the parsed title, else the first markdown heading, else the topic
    /// - tags: the parsed tags, else `default_tags`
    /// - summary: the parsed description, else the first prose paragraph
    pub fn or_defaults(&self, raw: &str, topic: &str, default_tags: &[String]) -> DraftPayload {
        let body = self.body.clone().unwrap_or_else(|| strip_labels(raw));
        let title = self
            .title
            .clone()
            .or_else(|| first_heading(&body))
            .unwrap_or_else(|| topic.trim().to_string());
        let mut tags = self
            .tags
            .as_deref()
            .map(normalize_tags)
            .unwrap_or_default();
        if tags.is_empty() {
            tags = normalize_tags(&default_tags.join(","));
        }
        let summary = self
            .description
            .clone()
            .or_else(|| first_paragraph(&body))
            .unwrap_or_else(|| title.clone());
        DraftPayload {
            title,
            tags,
            summary: truncate_summary(&summary),
            body,
        }
    }
}

/// Split a comma-separated tag list into API-safe tags.
///
/// Tags are trimmed, lowercased, stripped of whitespace and leading `#`,
/// de-duplicated, and capped at [`MAX_TAGS`].
pub fn normalize_tags(raw: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for tag in raw.split(',') {
        let tag: String = tag
            .trim()
            .trim_start_matches('#')
            .chars()
            .filter(|c| !c.is_whitespace())
            .flat_map(char::to_lowercase)
            .collect();
        if tag.is_empty() || tags.contains(&tag) {
            continue;
        }
        tags.push(tag);
        if tags.len() == MAX_TAGS {
            break;
        }
    }
    tags
}

/// Cap a summary at [`MAX_SUMMARY_CHARS`] characters.
pub fn truncate_summary(summary: &str) -> String {
    summary.trim().chars().take(MAX_SUMMARY_CHARS).collect()
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Drop label lines and the blank lines that follow them.
fn strip_labels(raw: &str) -> String {
    let mut kept: Vec<&str> = Vec::new();
    let mut after_label = true;
    for line in raw.lines() {
        if LABEL_RE.is_match(line) {
            after_label = true;
            continue;
        }
        if after_label && line.trim().is_empty() {
            continue;
        }
        after_label = false;
        kept.push(line);
    }
    let body = kept.join("\n");
    match body.trim() {
        "" => raw.trim().to_string(),
        body => body.to_string(),
    }
}

fn first_heading(body: &str) -> Option<String> {
    body.lines()
        .map(str::trim)
        .find(|line| line.starts_with('#'))
        .map(|line| line.trim_start_matches('#').trim().to_string())
        .filter(|heading| !heading.is_empty())
}

fn first_paragraph(body: &str) -> Option<String> {
    body.split("\n\n")
        .map(str::trim)
        .find(|para| !para.is_empty() && !para.starts_with('#') && !para.starts_with("```"))
        .map(|para| para.split_whitespace().collect::<Vec<_>>().join(" "))
}
