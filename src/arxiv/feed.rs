//! Atom feed parsing for arXiv query responses.

use chrono::{DateTime, NaiveDate};
use tracing::debug;

use super::RetrievalError;
use super::types::{Document, NO_DOI};

/// Parse an arXiv Atom feed into documents, in feed order.
///
/// A feed without entries yields an empty list. Entries without an `id` are skipped.
/// arXiv reports malformed queries as a single entry whose id points at `/api/errors`;
/// that is returned as [`RetrievalError::Feed`].
pub fn parse_feed(xml: &str) -> Result<Vec<Document>, RetrievalError> {
    let mut documents = Vec::new();

    for entry in element_bodies(xml, "entry") {
        let Some(link) = tag_text(entry, "id") else {
            debug!("skipping feed entry without id");
            continue;
        };

        if link.contains("/api/errors") {
            let message = tag_text(entry, "summary").unwrap_or_else(|| link.clone());
            return Err(RetrievalError::Feed(normalize_whitespace(&message)));
        }

        let authors = element_bodies(entry, "author")
            .into_iter()
            .filter_map(|author| tag_text(author, "name"))
            .map(|name| normalize_whitespace(&name))
            .filter(|name| !name.is_empty())
            .collect::<Vec<_>>()
            .join(", ");

        let doi = tag_text(entry, "doi")
            .or_else(|| tag_text(entry, "arxiv:doi"))
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| NO_DOI.to_string());

        documents.push(Document {
            title: normalize_whitespace(&tag_text(entry, "title").unwrap_or_default()),
            authors,
            summary: normalize_whitespace(&tag_text(entry, "summary").unwrap_or_default()),
            link,
            published: format_published(&tag_text(entry, "published").unwrap_or_default()),
            doi,
        });
    }

    Ok(documents)
}

/// Render an ISO-8601 timestamp as `M/D/YYYY`. Unparseable input is returned unchanged.
pub fn format_published(raw: &str) -> String {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.format("%-m/%-d/%Y").to_string();
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.format("%-m/%-d/%Y").to_string();
    }
    raw.to_string()
}

/// Inner text of every `<tag>...</tag>` element, in order. Self-closing elements yield `""`.
fn element_bodies<'a>(xml: &'a str, tag: &str) -> Vec<&'a str> {
    let mut bodies = Vec::new();
    let mut from = 0;
    let close = format!("</{tag}>");

    while let Some(open) = find_open_tag(xml, tag, from) {
        if open.self_closing {
            bodies.push("");
            from = open.content_start;
            continue;
        }
        let Some(end) = xml[open.content_start..].find(&close) else {
            break;
        };
        let content_end = open.content_start + end;
        bodies.push(&xml[open.content_start..content_end]);
        from = content_end + close.len();
    }

    bodies
}

/// Decoded, trimmed text of the first `<tag>` element.
fn tag_text(xml: &str, tag: &str) -> Option<String> {
    element_bodies(xml, tag)
        .into_iter()
        .next()
        .map(|body| decode_entities(body.trim()))
}

struct OpenTag {
    content_start: usize,
    self_closing: bool,
}

/// Locate `<tag>` or `<tag attr=...>` at or after `from`, rejecting longer names
/// that share the prefix (`<id` must not match `<identifier>`).
fn find_open_tag(xml: &str, tag: &str, from: usize) -> Option<OpenTag> {
    let needle = format!("<{tag}");
    let mut search = from;

    while let Some(pos) = xml[search..].find(&needle) {
        let start = search + pos;
        let after = start + needle.len();
        match xml[after..].chars().next() {
            Some('>') | Some('/') => {}
            Some(c) if c.is_whitespace() => {}
            _ => {
                search = after;
                continue;
            }
        }
        let gt = after + xml[after..].find('>')?;
        return Some(OpenTag {
            content_start: gt + 1,
            self_closing: xml[..gt].ends_with('/'),
        });
    }

    None
}

fn decode_entities(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let decoded = tail
            .find(';')
            .filter(|&semi| semi <= 10)
            .and_then(|semi| decode_entity(&tail[1..semi]).map(|c| (c, semi)));
        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &tail[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let code = if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                name.strip_prefix('#')?.parse().ok()?
            };
            char::from_u32(code)
        }
    }
}

fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
