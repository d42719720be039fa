use common::ExtractionConfig;
use feed_rs::model::Entry;
use serde::Serialize;
use tracing::debug;

/// Appended to content cut at `max_content_chars`
pub const ELLIPSIS: &str = "...";

/// The fields of a feed entry the extractor looks at.
#[derive(Debug, Clone, Default)]
pub struct RawEntry {
    pub title: Option<String>,
    pub link: Option<String>,
    pub published: Option<String>,
    /// Full body (Atom `content`, RSS `content:encoded`)
    pub content: Option<String>,
    /// Atom `summary` / RSS `description`
    pub summary: Option<String>,
    /// Media RSS description
    pub description: Option<String>,
}

impl From<&Entry> for RawEntry {
    fn from(entry: &Entry) -> Self {
        Self {
            title: entry.title.as_ref().map(|t| t.content.clone()),
            link: entry.links.first().map(|l| l.href.clone()),
            published: entry.published.or(entry.updated).map(|d| d.to_rfc3339()),
            content: entry.content.as_ref().and_then(|c| c.body.clone()),
            summary: entry.summary.as_ref().map(|s| s.content.clone()),
            description: entry
                .media
                .iter()
                .find_map(|m| m.description.as_ref().map(|d| d.content.clone())),
        }
    }
}

/// One feed entry after extraction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Article {
    pub title: String,
    pub url: String,
    pub published: String,
    pub source: String,
    pub content: String,
}

/// Why an entry did not become an article
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    MissingTitle,
    MissingLink,
    TooShort { chars: usize },
}

/// Build an article from a raw entry, or say why it was dropped.
pub fn extract_article(
    raw: &RawEntry,
    source: &str,
    config: &ExtractionConfig,
) -> Result<Article, Rejection> {
    let title = raw
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(Rejection::MissingTitle)?;

    let url = raw
        .link
        .as_deref()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .ok_or(Rejection::MissingLink)?;

    let content = normalize_markup(select_content(raw));
    let chars = content.chars().count();
    if config.min_content_filter && chars < config.min_content_chars {
        debug!("dropping '{}': {} chars of content", title, chars);
        return Err(Rejection::TooShort { chars });
    }

    Ok(Article {
        title: title.to_string(),
        url: url.to_string(),
        published: raw.published.clone().unwrap_or_default(),
        source: source.to_string(),
        content: truncate_content(content, config.max_content_chars),
    })
}

/// First non-blank of content, summary, description.
pub fn select_content(raw: &RawEntry) -> &str {
    [&raw.content, &raw.summary, &raw.description]
        .into_iter()
        .filter_map(|field| field.as_deref())
        .find(|text| !text.trim().is_empty())
        .unwrap_or("")
}

/// Turn paragraph and line-break tags into newlines. Other markup is left as is.
pub fn normalize_markup(html: &str) -> String {
    html.replace("<p>", "")
        .replace("</p>", "\n")
        .replace("<br>", "\n")
        .replace("<br/>", "\n")
        .replace("<br />", "\n")
}

/// Cut to `max_chars` characters plus [`ELLIPSIS`] when longer.
pub fn truncate_content(content: String, max_chars: usize) -> String {
    match content.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}{}", &content[..idx], ELLIPSIS),
        None => content,
    }
}
