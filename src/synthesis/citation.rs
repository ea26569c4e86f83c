//! Inline citation markers (`[1]`, `[2, 3]`) in generated text.
//!
//! Text is split into paragraphs on blank lines and each paragraph into a sequence of
//! plain-text and citation segments. Rendering is separate from parsing: the same
//! [`CitedText`] renders to plain text with normalized markers or to HTML with
//! `<sup class="citation">` wrappers. Already-wrapped markers parse back to the same
//! citation, so wrapping twice never nests.

use serde::Serialize;
use serde::ser::{SerializeStruct, Serializer};

const SUP_OPEN: &str = r#"<sup class="citation">"#;
const SUP_CLOSE: &str = "</sup>";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Segment {
    Text(String),
    /// 1-based document indices, in the order they were written.
    Citation(Vec<usize>),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Paragraph {
    pub segments: Vec<Segment>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CitedText {
    pub paragraphs: Vec<Paragraph>,
}

/// Serialized with the rendered `html` next to the structured paragraphs.
impl Serialize for CitedText {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("CitedText", 2)?;
        state.serialize_field("paragraphs", &self.paragraphs)?;
        state.serialize_field("html", &self.to_html())?;
        state.end()
    }
}

impl CitedText {
    pub fn parse(raw: &str) -> Self {
        let paragraphs = split_paragraphs(raw)
            .into_iter()
            .map(|p| Paragraph {
                segments: segment(&p),
            })
            .collect();
        Self { paragraphs }
    }

    /// A single paragraph with no citations.
    pub fn plain(text: &str) -> Self {
        Self {
            paragraphs: vec![Paragraph {
                segments: vec![Segment::Text(text.to_string())],
            }],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.paragraphs.is_empty()
    }

    /// Every cited index, in reading order, with repeats.
    pub fn cited_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.paragraphs
            .iter()
            .flat_map(|p| &p.segments)
            .filter_map(|s| match s {
                Segment::Citation(indices) => Some(indices.iter().copied()),
                Segment::Text(_) => None,
            })
            .flatten()
    }

    /// Paragraphs separated by blank lines, citations written as `[1,2]`.
    pub fn to_plain(&self) -> String {
        self.render(|out, segments| {
            for s in segments {
                match s {
                    Segment::Text(t) => out.push_str(t),
                    Segment::Citation(indices) => out.push_str(&bracket(indices)),
                }
            }
        }, "\n\n")
    }

    /// `<p>` per paragraph, citations wrapped in `<sup class="citation">`.
    pub fn to_html(&self) -> String {
        self.render(|out, segments| {
            out.push_str("<p>");
            for s in segments {
                match s {
                    Segment::Text(t) => out.push_str(t),
                    Segment::Citation(indices) => {
                        out.push_str(SUP_OPEN);
                        out.push_str(&bracket(indices));
                        out.push_str(SUP_CLOSE);
                    }
                }
            }
            out.push_str("</p>");
        }, "")
    }

    fn render(&self, mut paragraph: impl FnMut(&mut String, &[Segment]), separator: &str) -> String {
        let mut out = String::new();
        for (i, p) in self.paragraphs.iter().enumerate() {
            if i > 0 {
                out.push_str(separator);
            }
            paragraph(&mut out, &p.segments);
        }
        out
    }
}

pub fn segment(text: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut buf = String::new();
    let mut i = 0;

    while i < text.len() {
        let rest = &text[i..];

        let found = if let Some(inner) = rest.strip_prefix(SUP_OPEN) {
            parse_bracket(inner).and_then(|(indices, used)| {
                inner[used..]
                    .starts_with(SUP_CLOSE)
                    .then_some((indices, SUP_OPEN.len() + used + SUP_CLOSE.len()))
            })
        } else if rest.starts_with('[') {
            parse_bracket(rest)
        } else {
            None
        };

        if let Some((indices, used)) = found {
            if !buf.is_empty() {
                segments.push(Segment::Text(std::mem::take(&mut buf)));
            }
            segments.push(Segment::Citation(indices));
            i += used;
            continue;
        }

        let Some(c) = rest.chars().next() else {
            break;
        };
        buf.push(c);
        i += c.len_utf8();
    }

    if !buf.is_empty() {
        segments.push(Segment::Text(buf));
    }
    segments
}

/// Parse `[d+(,\s*d+)*]` at the start of `s`. Returns the indices and bytes consumed.
/// An index too large for `usize` fails the parse, so the whole bracket stays plain text.
fn parse_bracket(s: &str) -> Option<(Vec<usize>, usize)> {
    let bytes = s.as_bytes();
    if bytes.first() != Some(&b'[') {
        return None;
    }

    let mut indices = Vec::new();
    let mut pos = 1;
    loop {
        let digits = bytes[pos..].iter().take_while(|b| b.is_ascii_digit()).count();
        if digits == 0 {
            return None;
        }
        indices.push(s[pos..pos + digits].parse().ok()?);
        pos += digits;

        match bytes.get(pos)? {
            b']' => return Some((indices, pos + 1)),
            b',' => {
                pos += 1;
                let ws = s[pos..]
                    .char_indices()
                    .find(|(_, c)| !c.is_whitespace())
                    .map_or(s.len() - pos, |(off, _)| off);
                pos += ws;
            }
            _ => return None,
        }
    }
}

fn bracket(indices: &[usize]) -> String {
    let list: Vec<String> = indices.iter().map(ToString::to_string).collect();
    format!("[{}]", list.join(","))
}

fn split_paragraphs(raw: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in raw.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                paragraphs.push(current.join("\n").trim().to_string());
                current.clear();
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        paragraphs.push(current.join("\n").trim().to_string());
    }

    paragraphs
}
