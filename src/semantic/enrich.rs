//! Metadata enrichment seam.
//!
//! A [`MetadataSource`] fills in description text and categories that the
//! stored record lacks (an online catalog in production). Enrichment is
//! best effort: a failing lookup is logged and the book keeps the text it
//! already has, the batch carries on.

use async_trait::async_trait;
use hashbrown::HashMap;

use crate::model::{Book, BookId};
use crate::{Error, Result};

/// Extra metadata for one book.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Enrichment {
    pub description: Option<String>,
    pub categories: Vec<String>,
}

impl Enrichment {
    /// Merge into `book`: a non-empty description replaces the stored one,
    /// and non-empty categories replace the stored categories.
    pub fn apply(self, book: &mut Book) {
        if let Some(desc) = self.description.filter(|d| !d.trim().is_empty()) {
            book.description = Some(desc);
        }
        if !self.categories.is_empty() {
            book.categories = self.categories;
        }
    }
}

#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// Look up a book. `Ok(None)` means the source knows nothing about it.
    async fn fetch(&self, book: &Book) -> Result<Option<Enrichment>>;
}

/// Fixed in-memory source, for tests and offline use.
#[derive(Debug, Clone, Default)]
pub struct StaticMetadata {
    entries: HashMap<BookId, std::result::Result<Enrichment, String>>,
}

impl StaticMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, id: impl Into<BookId>, enrichment: Enrichment) -> Self {
        self.entries.insert(id.into(), Ok(enrichment));
        self
    }

    /// Make lookups for `id` fail with `message`.
    pub fn with_failure(mut self, id: impl Into<BookId>, message: impl Into<String>) -> Self {
        self.entries.insert(id.into(), Err(message.into()));
        self
    }
}

#[async_trait]
impl MetadataSource for StaticMetadata {
    async fn fetch(&self, book: &Book) -> Result<Option<Enrichment>> {
        match self.entries.get(&book.id) {
            None => Ok(None),
            Some(Ok(e)) => Ok(Some(e.clone())),
            Some(Err(message)) => Err(Error::Enrichment {
                book_id: book.id.clone(),
                message: message.clone(),
            }),
        }
    }
}

/// Lookup results for a batch of books.
///
/// Deltas are kept apart from the records they were fetched for, so a
/// caller can merge them into whatever is stored at write time.
#[derive(Debug, Clone, Default)]
pub struct EnrichmentBatch {
    pub deltas: HashMap<BookId, Enrichment>,
    /// Books whose lookup failed.
    pub degraded: Vec<BookId>,
}

impl EnrichmentBatch {
    pub fn delta(&self, id: &BookId) -> Option<&Enrichment> {
        self.deltas.get(id)
    }

    pub fn is_degraded(&self, id: &BookId) -> bool {
        self.degraded.contains(id)
    }

    /// Merge the delta for `book`, if any. Returns true if the record changed.
    pub fn merge_into(&self, book: &mut Book) -> bool {
        match self.deltas.get(&book.id) {
            Some(delta) => {
                let before = book.clone();
                delta.clone().apply(book);
                *book != before
            }
            None => false,
        }
    }
}

/// Look up every book. Failures are logged and recorded, never fatal.
pub async fn fetch_enrichments(source: &dyn MetadataSource, books: &[Book]) -> EnrichmentBatch {
    let mut batch = EnrichmentBatch::default();
    for book in books {
        match source.fetch(book).await {
            Ok(Some(enrichment)) => {
                batch.deltas.insert(book.id.clone(), enrichment);
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(book_id = %book.id, error = %e, "enrichment failed, using stored text");
                batch.degraded.push(book.id.clone());
            }
        }
    }
    batch
}
