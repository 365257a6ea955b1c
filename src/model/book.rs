//! Book records and embedding coordinates.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Stable book identifier (an ISBN or catalog volume id).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookId(pub String);

impl BookId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BookId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for BookId {
    fn from(s: &str) -> Self {
        BookId(s.to_string())
    }
}

impl From<String> for BookId {
    fn from(s: String) -> Self {
        BookId(s)
    }
}

/// A book as supplied by the metadata collaborators.
///
/// Records are replaced wholesale on re-fetch; nothing in this crate edits
/// individual fields of a stored book except enrichment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub id: BookId,
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub cover: Option<String>,
    /// Hierarchical classification codes, most books carry one.
    #[serde(default)]
    pub classification_codes: SmallVec<[String; 2]>,
    /// Subject / category labels.
    #[serde(default)]
    pub categories: Vec<String>,
}

impl Book {
    pub fn new(id: impl Into<BookId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            authors: Vec::new(),
            description: None,
            cover: None,
            classification_codes: SmallVec::new(),
            categories: Vec::new(),
        }
    }

    pub fn with_authors(mut self, authors: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.authors = authors.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_cover(mut self, cover: impl Into<String>) -> Self {
        self.cover = Some(cover.into());
        self
    }

    pub fn with_classification(mut self, code: impl Into<String>) -> Self {
        self.classification_codes.push(code.into());
        self
    }

    pub fn with_categories(mut self, categories: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.categories = categories.into_iter().map(Into::into).collect();
        self
    }

    /// Text fed to the vectorizer: title, authors, then description.
    pub fn text(&self) -> String {
        format!(
            "{} {} {}",
            self.title,
            self.authors.join(" "),
            self.description.as_deref().unwrap_or(""),
        )
    }
}

/// A 2D embedding coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub const ORIGIN: Point2 = Point2 { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance.
    pub fn distance(&self, other: &Point2) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}
