use serde::Serialize;

pub const NO_DOI: &str = "No DOI available";

/// One normalized search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Document {
    pub title: String,
    /// Author names joined with `", "`, in feed order.
    pub authors: String,
    /// The abstract.
    pub summary: String,
    /// The entry `id`; unique per document.
    pub link: String,
    /// Publication date as `M/D/YYYY`, or the raw value if it is not ISO-8601.
    pub published: String,
    pub doi: String,
}

/// The subset of a [`Document`] shown next to an inline citation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CitationSource {
    pub title: String,
    pub authors: String,
    pub published: String,
}

impl From<&Document> for CitationSource {
    fn from(doc: &Document) -> Self {
        Self {
            title: doc.title.clone(),
            authors: doc.authors.clone(),
            published: doc.published.clone(),
        }
    }
}
