//! # Semantic Graph Engine
//!
//! Turns book text and categories into a 2D embedding and a sparse graph.
//!
//! ```text
//! title + authors + description
//!   → TF-IDF rows            (vectorizer)
//!   → 1 - cosine, clipped    (distance)
//!   → 2D points via SMACOF   (reducer)
//!   → mutual-KNN edges       (edges, Euclidean over the 2D points)
//!   + shared-category edges  (edges, independent of geometry)
//! ```
//!
//! Fewer than two books never reach the vectorizer: one book is placed at
//! the origin, none gives an empty graph.

pub mod distance;
pub mod edges;
pub mod enrich;
pub mod reducer;
pub mod stopwords;
pub mod vectorizer;

use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::GraphConfig;
use crate::model::{Book, BookId, GraphNode, KnowledgeGraph, Point2};
use crate::{Error, Result};

pub use distance::DistanceMatrix;
pub use enrich::{fetch_enrichments, Enrichment, EnrichmentBatch, MetadataSource, StaticMetadata};
pub use reducer::Mds;
pub use stopwords::{dominant_language, Language};
pub use vectorizer::{SparseVector, TfIdfMatrix, TfIdfVectorizer};

/// Minimum number of books the embedding pipeline is defined for.
pub const MIN_GRAPH_BOOKS: usize = 2;

pub struct GraphEngine {
    config: GraphConfig,
    /// Last result, keyed by a fingerprint of the input books.
    cache: Mutex<Option<(u64, Arc<KnowledgeGraph>)>>,
}

impl GraphEngine {
    pub fn new(config: GraphConfig) -> Self {
        Self { config, cache: Mutex::new(None) }
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Steps 1-3: vectorize, measure cosine distance, reduce to 2D.
    pub fn embed(&self, books: &[Book]) -> Vec<Point2> {
        if books.len() < MIN_GRAPH_BOOKS {
            return vec![Point2::ORIGIN; books.len()];
        }

        let mut language = dominant_language(books.iter().filter_map(|b| b.description.as_deref()));
        let texts: Vec<String> = books.iter().map(Book::text).collect();
        if language == Language::Other {
            language = dominant_language(texts.iter().map(String::as_str));
        }

        let matrix = TfIdfVectorizer::new(self.config.max_features, language.stop_words()).fit_transform(&texts);
        tracing::debug!(
            books = books.len(),
            features = matrix.n_features(),
            ?language,
            "vectorized book text"
        );
        let dist = DistanceMatrix::cosine(&matrix.rows);
        Mds::from_config(&self.config).fit(&dist)
    }

    /// Full pipeline. Results are cached per input set when enabled.
    pub fn build(&self, books: &[Book]) -> KnowledgeGraph {
        let key = fingerprint(books);
        if self.config.cache {
            if let Some((cached_key, graph)) = self.cache.lock().as_ref() {
                if *cached_key == key {
                    tracing::debug!(books = books.len(), "knowledge graph cache hit");
                    return graph.as_ref().clone();
                }
            }
        }

        let points = self.embed(books);
        let placed: Vec<(&Book, Point2)> = books.iter().zip(points).collect();
        let graph = self.assemble(&placed);

        if self.config.cache {
            *self.cache.lock() = Some((key, Arc::new(graph.clone())));
        }
        graph
    }

    /// Like [`build`](Self::build) but reports fewer than two books as an error.
    pub fn build_strict(&self, books: &[Book]) -> Result<KnowledgeGraph> {
        if books.len() < MIN_GRAPH_BOOKS {
            return Err(Error::DegenerateInput { required: MIN_GRAPH_BOOKS, got: books.len() });
        }
        Ok(self.build(books))
    }

    /// Step 5: nodes and both edge families from already-embedded books.
    pub fn assemble(&self, placed: &[(&Book, Point2)]) -> KnowledgeGraph {
        let nodes: Vec<GraphNode> = placed
            .iter()
            .map(|(book, p)| GraphNode {
                id: book.id.clone(),
                x: p.x,
                y: p.y,
                categories: book.categories.clone(),
                title: book.title.clone(),
                authors: book.authors.clone(),
                cover: book.cover.clone(),
            })
            .collect();

        let ids: Vec<&BookId> = placed.iter().map(|(b, _)| &b.id).collect();
        let points: Vec<Point2> = placed.iter().map(|(_, p)| *p).collect();
        let books: Vec<&Book> = placed.iter().map(|(b, _)| *b).collect();

        let dist = DistanceMatrix::euclidean(&points);
        let mut edges = edges::similarity_edges(&ids, &dist, self.config.k, self.config.epsilon);
        edges.extend(edges::shared_category_edges(&books, self.config.shared_category_weight));

        KnowledgeGraph { nodes, edges }
    }

    pub fn invalidate(&self) {
        *self.cache.lock() = None;
    }
}

impl Default for GraphEngine {
    fn default() -> Self {
        Self::new(GraphConfig::default())
    }
}

fn fingerprint(books: &[Book]) -> u64 {
    let mut hasher = DefaultHasher::new();
    books.len().hash(&mut hasher);
    for book in books {
        book.id.hash(&mut hasher);
        book.title.hash(&mut hasher);
        book.authors.hash(&mut hasher);
        book.description.hash(&mut hasher);
        book.categories.hash(&mut hasher);
        book.cover.hash(&mut hasher);
    }
    hasher.finish()
}
