//! # bookshelf-graph: Virtual Bookshelf and Knowledge Graph Engine
//!
//! Places a personal book collection on a grid of shelves and derives a
//! semantic relationship graph between the books, so a front end can draw
//! both a bookshelf view and a knowledge-graph view.
//!
//! ## Design Principles
//!
//! 1. **Trait-first**: `ShelfStore` is the contract between the engines and storage
//! 2. **Pure engines**: layout planning and graph building are plain functions over data
//! 3. **One writer**: every layout mutation runs inside a single `ReadWrite` transaction
//! 4. **Derived data is rebuilt, never patched**: the adjacency chain is recomputed on every change
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bookshelf_graph::{Book, Bookshelf};
//!
//! # async fn example() -> bookshelf_graph::Result<()> {
//! let shelf = Bookshelf::open_memory().await?;
//!
//! shelf.add_book(Book::new("9784101010014", "Kokoro").with_classification("913.6")).await?;
//! shelf.add_book(Book::new("9784003101018", "Botchan").with_classification("913.6")).await?;
//!
//! // Regroup everything by classification, 8 books per shelf.
//! let slots = shelf.rebuild_layout(8).await?;
//! let graph = shelf.rebuild_graph(None).await?.graph;
//! println!("{} slots, {} edges", slots.len(), graph.edges.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Engines
//!
//! | Engine          | Module      | Output                                  |
//! |-----------------|-------------|-----------------------------------------|
//! | Grouper         | `classify`  | ordered groups by classification code   |
//! | Layout          | `layout`    | shelf slots, adjacency chain, resizes   |
//! | Semantic graph  | `semantic`  | 2D embedding, similarity/category edges |

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod classify;
pub mod config;
pub mod layout;
pub mod semantic;
pub mod storage;
pub mod tx;
pub mod export;

use parking_lot::Mutex;
use rand::SeedableRng;
use rand::rngs::StdRng;

// ============================================================================
// Re-exports
// ============================================================================

pub use model::{
    Book, BookId, Point2,
    ShelfSlot, ShelfDesign, ChainLink, ShelfView, ShelfCell,
    GraphNode, GraphEdge, EdgeKind, KnowledgeGraph,
};
pub use classify::{ClassificationTree, Grouper, GroupKey, BookGroup};
pub use config::{EngineConfig, LayoutConfig, GraphConfig, PlacementPolicy};
pub use semantic::{GraphEngine, MetadataSource, Enrichment, EnrichmentBatch, StaticMetadata};
pub use storage::{ShelfStore, MemoryStore};
pub use tx::{Transaction, TxMode, TxId};

// ============================================================================
// Top-level Bookshelf handle
// ============================================================================

/// The primary entry point. A `Bookshelf` wraps a store and runs the layout
/// and graph engines against it.
pub struct Bookshelf<S: ShelfStore> {
    store: S,
    config: EngineConfig,
    grouper: Grouper,
    graph: GraphEngine,
    /// Present only under `PlacementPolicy::Random`.
    rng: Mutex<Option<StdRng>>,
}

/// Outcome of [`Bookshelf::shelve_from_hand`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HandReport {
    /// New slots, in request order.
    pub shelved: Vec<ShelfSlot>,
    /// Books left in the hand because their lookup failed.
    pub skipped: Vec<BookId>,
}

/// Graph plus the books whose enrichment failed while building it.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphReport {
    pub graph: KnowledgeGraph,
    pub degraded: Vec<BookId>,
}

impl<S: ShelfStore> Bookshelf<S> {
    /// Create a Bookshelf over `store`, validating `config`.
    pub fn with_store(store: S, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let rng = match config.layout.placement {
            PlacementPolicy::FirstFit => None,
            PlacementPolicy::Random { seed: Some(seed) } => Some(StdRng::seed_from_u64(seed)),
            PlacementPolicy::Random { seed: None } => Some(StdRng::from_os_rng()),
        };
        Ok(Self {
            store,
            grouper: Grouper::new().by_category(config.layout.group_by_category),
            graph: GraphEngine::new(config.graph.clone()),
            config,
            rng: Mutex::new(rng),
        })
    }

    /// Group against a known classification scheme instead of the codes
    /// found on the books.
    pub fn with_classification(mut self, tree: ClassificationTree) -> Self {
        self.grouper = self.grouper.with_tree(tree);
        self
    }

    /// Access the underlying store (for advanced use).
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn graph_engine(&self) -> &GraphEngine {
        &self.graph
    }

    // ========================================================================
    // Internal helpers
    // ========================================================================

    /// Stored design, created with defaults the first time it is needed.
    async fn design_in(&self, tx: &mut S::Tx) -> Result<ShelfDesign> {
        if let Some(design) = self.store.load_design(tx).await? {
            return Ok(design);
        }
        let design = ShelfDesign::new(self.config.layout.default_books_per_shelf, 1);
        tracing::debug!(?design, "no shelf design yet, creating default");
        self.store.save_design(tx, design).await?;
        Ok(design)
    }

    /// Recompute the adjacency chain from the current slots.
    async fn relink(&self, tx: &mut S::Tx) -> Result<()> {
        let slots = self.store.all_slots(tx).await?;
        self.store.replace_chain(tx, layout::adjacency_chain(&slots)).await
    }

    async fn place_in(&self, tx: &mut S::Tx, id: &BookId) -> Result<ShelfSlot> {
        if self.store.get_book(tx, id).await?.is_none() {
            return Err(Error::NotFound(format!("book {id}")));
        }
        if let Some(existing) = self.store.slot_of(tx, id).await? {
            return Ok(existing);
        }

        let mut design = self.design_in(tx).await?;
        let before = design;
        let slots = self.store.all_slots(tx).await?;
        let slot = {
            let mut rng = self.rng.lock();
            layout::place_incremental(&mut design, &slots, id, rng.as_mut())
        };

        if design != before {
            self.store.save_design(tx, design).await?;
        }
        self.store.put_slot(tx, slot.clone()).await?;
        self.relink(tx).await?;
        tracing::debug!(book_id = %id, row = slot.row, col = slot.col, "placed book");
        Ok(slot)
    }

    async fn rebuild_in(&self, tx: &mut S::Tx, books_per_shelf: Option<usize>) -> Result<Vec<ShelfSlot>> {
        let mut design = self.design_in(tx).await?;
        if let Some(n) = books_per_shelf {
            design.books_per_shelf = n;
        }

        let books = self.store.all_books(tx).await?;
        let groups = self.grouper.group(&books);
        let slots = layout::plan_full_layout(&groups, design.books_per_shelf)?;
        if !slots.is_empty() {
            design.total_shelves = layout::required_shelves(&slots);
        }

        self.store.replace_slots(tx, slots.clone()).await?;
        self.store.save_design(tx, design).await?;
        self.relink(tx).await?;
        tracing::info!(
            books = slots.len(),
            groups = groups.len(),
            books_per_shelf = design.books_per_shelf,
            total_shelves = design.total_shelves,
            "rebuilt shelf layout"
        );
        Ok(slots)
    }

    // ========================================================================
    // Books
    // ========================================================================

    /// Store a book record and give it a shelf slot.
    #[tracing::instrument(skip(self, book), fields(book_id = %book.id))]
    pub async fn add_book(&self, book: Book) -> Result<ShelfSlot> {
        let mut tx = self.store.begin_tx(TxMode::ReadWrite).await?;
        let id = book.id.clone();
        self.store.put_book(&mut tx, book).await?;
        let slot = self.place_in(&mut tx, &id).await?;
        self.store.commit_tx(tx).await?;
        Ok(slot)
    }

    /// Remove a book, its slot and its embedding. Returns true if it existed.
    #[tracing::instrument(skip(self))]
    pub async fn remove_book(&self, id: &BookId) -> Result<bool> {
        let mut tx = self.store.begin_tx(TxMode::ReadWrite).await?;
        let existed = self.store.delete_book(&mut tx, id).await?;
        let had_slot = self.store.delete_slot(&mut tx, id).await?;
        if had_slot {
            self.relink(&mut tx).await?;
        }
        self.store.commit_tx(tx).await?;
        Ok(existed || had_slot)
    }

    pub async fn book(&self, id: &BookId) -> Result<Option<Book>> {
        let tx = self.store.begin_tx(TxMode::ReadOnly).await?;
        self.store.get_book(&tx, id).await
    }

    pub async fn books(&self) -> Result<Vec<Book>> {
        let tx = self.store.begin_tx(TxMode::ReadOnly).await?;
        self.store.all_books(&tx).await
    }

    // ========================================================================
    // Hand
    // ========================================================================

    /// Stage a book without shelving it. Returns false if a book with the
    /// same id is already staged; the staged copy is kept as it is.
    #[tracing::instrument(skip(self, book), fields(book_id = %book.id))]
    pub async fn add_to_hand(&self, book: Book) -> Result<bool> {
        let mut tx = self.store.begin_tx(TxMode::ReadWrite).await?;
        if self.store.get_hand(&tx, &book.id).await?.is_some() {
            return Ok(false);
        }
        self.store.put_hand(&mut tx, book).await?;
        self.store.commit_tx(tx).await?;
        Ok(true)
    }

    /// Staged books, oldest first.
    pub async fn hand(&self) -> Result<Vec<Book>> {
        let tx = self.store.begin_tx(TxMode::ReadOnly).await?;
        self.store.all_hand(&tx).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn remove_from_hand(&self, id: &BookId) -> Result<()> {
        let mut tx = self.store.begin_tx(TxMode::ReadWrite).await?;
        if !self.store.delete_hand(&mut tx, id).await? {
            return Err(Error::NotFound(format!("book {id} in hand")));
        }
        self.store.commit_tx(tx).await
    }

    /// Move staged books onto the shelf.
    ///
    /// Each book is looked up in `source` first. A book whose lookup fails
    /// stays in the hand and is reported as skipped; the others are stored,
    /// leave the hand and get a slot by incremental placement. Every id must
    /// be staged when the call starts, otherwise nothing happens and
    /// `NotFound` is returned. All moves commit together.
    #[tracing::instrument(skip(self, source))]
    pub async fn shelve_from_hand(
        &self,
        ids: &[BookId],
        source: Option<&dyn MetadataSource>,
    ) -> Result<HandReport> {
        let mut staged: Vec<Book> = Vec::with_capacity(ids.len());
        {
            let tx = self.store.begin_tx(TxMode::ReadOnly).await?;
            for id in ids {
                if staged.iter().any(|b| &b.id == id) {
                    continue;
                }
                match self.store.get_hand(&tx, id).await? {
                    Some(book) => staged.push(book),
                    None => return Err(Error::NotFound(format!("book {id} in hand"))),
                }
            }
        }

        let batch = match source {
            Some(source) => semantic::fetch_enrichments(source, &staged).await,
            None => EnrichmentBatch::default(),
        };

        let mut report = HandReport::default();
        let mut tx = self.store.begin_tx(TxMode::ReadWrite).await?;
        for book in &staged {
            if batch.is_degraded(&book.id) {
                report.skipped.push(book.id.clone());
                continue;
            }
            // Removed from the hand by someone else since the lookup.
            let Some(mut fresh) = self.store.get_hand(&tx, &book.id).await? else {
                report.skipped.push(book.id.clone());
                continue;
            };
            batch.merge_into(&mut fresh);
            let id = fresh.id.clone();
            self.store.delete_hand(&mut tx, &id).await?;
            self.store.put_book(&mut tx, fresh).await?;
            report.shelved.push(self.place_in(&mut tx, &id).await?);
        }
        self.store.commit_tx(tx).await?;

        tracing::info!(
            shelved = report.shelved.len(),
            skipped = report.skipped.len(),
            "shelved books from hand"
        );
        Ok(report)
    }

    // ========================================================================
    // Layout
    // ========================================================================

    /// Current design. Before anything was placed this is the default design,
    /// which is not persisted until the first mutation.
    pub async fn design(&self) -> Result<ShelfDesign> {
        let tx = self.store.begin_tx(TxMode::ReadOnly).await?;
        Ok(self
            .store
            .load_design(&tx)
            .await?
            .unwrap_or(ShelfDesign::new(self.config.layout.default_books_per_shelf, 1)))
    }

    pub async fn slots(&self) -> Result<Vec<ShelfSlot>> {
        let tx = self.store.begin_tx(TxMode::ReadOnly).await?;
        self.store.all_slots(&tx).await
    }

    /// The stored adjacency chain.
    pub async fn adjacency_chain(&self) -> Result<Vec<ChainLink>> {
        let tx = self.store.begin_tx(TxMode::ReadOnly).await?;
        self.store.chain(&tx).await
    }

    /// Discard all slots and lay every book out again by classification
    /// group with `books_per_shelf` columns. All or nothing.
    #[tracing::instrument(skip(self))]
    pub async fn rebuild_layout(&self, books_per_shelf: usize) -> Result<Vec<ShelfSlot>> {
        if books_per_shelf == 0 {
            return Err(Error::InvalidConfig("books_per_shelf must be at least 1".into()));
        }
        let mut tx = self.store.begin_tx(TxMode::ReadWrite).await?;
        let slots = self.rebuild_in(&mut tx, Some(books_per_shelf)).await?;
        self.store.commit_tx(tx).await?;
        Ok(slots)
    }

    /// Full rebuild keeping the current column bound.
    #[tracing::instrument(skip(self))]
    pub async fn rebuild(&self) -> Result<Vec<ShelfSlot>> {
        let mut tx = self.store.begin_tx(TxMode::ReadWrite).await?;
        let slots = self.rebuild_in(&mut tx, None).await?;
        self.store.commit_tx(tx).await?;
        Ok(slots)
    }

    /// Give an already stored book a slot without disturbing the others.
    #[tracing::instrument(skip(self))]
    pub async fn place_incremental(&self, id: &BookId) -> Result<ShelfSlot> {
        let mut tx = self.store.begin_tx(TxMode::ReadWrite).await?;
        let slot = self.place_in(&mut tx, id).await?;
        self.store.commit_tx(tx).await?;
        Ok(slot)
    }

    /// Shelve every unshelved book that has an embedding, near the cell its
    /// embedding coordinate maps to.
    #[tracing::instrument(skip(self))]
    pub async fn place_by_embedding(&self) -> Result<Vec<ShelfSlot>> {
        let mut tx = self.store.begin_tx(TxMode::ReadWrite).await?;
        let mut design = self.design_in(&mut tx).await?;
        let slots = self.store.all_slots(&tx).await?;

        let mut batch = Vec::new();
        for (id, point) in self.store.all_embeddings(&tx).await? {
            if self.store.get_book(&tx, &id).await?.is_some() {
                batch.push((id, point));
            }
        }

        let placed = layout::place_by_embedding(&mut design, &slots, &batch)?;
        for slot in &placed {
            self.store.put_slot(&mut tx, slot.clone()).await?;
        }
        self.store.save_design(&mut tx, design).await?;
        self.relink(&mut tx).await?;
        self.store.commit_tx(tx).await?;
        tracing::debug!(placed = placed.len(), "placed books by embedding");
        Ok(placed)
    }

    /// Append one empty shelf. Returns the new shelf count.
    #[tracing::instrument(skip(self))]
    pub async fn add_shelf(&self) -> Result<usize> {
        self.resize_shelves(1).await
    }

    /// Remove the last shelf. Fails if it holds books or is the only one.
    #[tracing::instrument(skip(self))]
    pub async fn remove_shelf(&self) -> Result<usize> {
        self.resize_shelves(-1).await
    }

    /// Add (`delta > 0`) or remove (`delta < 0`) shelves one at a time.
    /// If any removal is refused, nothing changes.
    #[tracing::instrument(skip(self))]
    pub async fn resize_shelves(&self, delta: isize) -> Result<usize> {
        let mut tx = self.store.begin_tx(TxMode::ReadWrite).await?;
        let mut design = self.design_in(&mut tx).await?;
        let slots = self.store.all_slots(&tx).await?;

        if delta > 0 {
            layout::add_shelves(&mut design, delta.unsigned_abs())?;
        } else {
            // Stops at the first refusal, at the latest once one shelf is left.
            for _ in 0..delta.unsigned_abs() {
                layout::remove_shelf(&mut design, &slots)?;
            }
        }

        self.store.save_design(&mut tx, design).await?;
        self.store.commit_tx(tx).await?;
        tracing::info!(delta, total_shelves = design.total_shelves, "resized shelves");
        Ok(design.total_shelves)
    }

    /// Change the column bound. Every column assignment is invalidated, so
    /// this always runs a full rebuild.
    #[tracing::instrument(skip(self))]
    pub async fn change_books_per_shelf(&self, books_per_shelf: usize) -> Result<Vec<ShelfSlot>> {
        self.rebuild_layout(books_per_shelf).await
    }

    /// Slots joined with their book records, ordered by (row, col).
    pub async fn shelf_view(&self) -> Result<ShelfView> {
        let tx = self.store.begin_tx(TxMode::ReadOnly).await?;
        let design = self
            .store
            .load_design(&tx)
            .await?
            .unwrap_or(ShelfDesign::new(self.config.layout.default_books_per_shelf, 1));

        let mut cells = Vec::new();
        for slot in self.store.all_slots(&tx).await? {
            if let Some(book) = self.store.get_book(&tx, &slot.book_id).await? {
                cells.push(ShelfCell { row: slot.row, col: slot.col, book });
            }
        }
        Ok(ShelfView { rows: design.total_shelves, cols: design.books_per_shelf, cells })
    }

    // ========================================================================
    // Semantic graph
    // ========================================================================

    /// Build a graph for an arbitrary set of books. Nothing is stored.
    pub fn build_graph(&self, books: &[Book]) -> KnowledgeGraph {
        self.graph.build(books)
    }

    /// Like [`build_graph`](Self::build_graph) but fewer than two books is an error.
    pub fn build_graph_strict(&self, books: &[Book]) -> Result<KnowledgeGraph> {
        self.graph.build_strict(books)
    }

    /// Enrich the stored books, recompute the embedding and graph, and store
    /// the embedding plus any enrichment.
    ///
    /// Lookups run before the write transaction opens. Their results are
    /// merged into the records as stored at write time, so edits made while
    /// lookups were in flight survive. A failed lookup only degrades that
    /// book; it is listed in the report.
    #[tracing::instrument(skip(self, source))]
    pub async fn rebuild_graph(&self, source: Option<&dyn MetadataSource>) -> Result<GraphReport> {
        let mut books = self.books().await?;
        let batch = match source {
            Some(source) => semantic::fetch_enrichments(source, &books).await,
            None => EnrichmentBatch::default(),
        };
        for book in books.iter_mut() {
            batch.merge_into(book);
        }

        let graph = self.graph.build(&books);

        let mut tx = self.store.begin_tx(TxMode::ReadWrite).await?;
        let mut enriched = 0;
        for node in &graph.nodes {
            let Some(mut record) = self.store.get_book(&tx, &node.id).await? else {
                continue;
            };
            self.store.set_embedding(&mut tx, &node.id, Point2::new(node.x, node.y)).await?;
            if batch.merge_into(&mut record) {
                self.store.put_book(&mut tx, record).await?;
                enriched += 1;
            }
        }
        self.store.commit_tx(tx).await?;

        tracing::info!(
            nodes = graph.nodes.len(),
            edges = graph.edges.len(),
            enriched,
            degraded = batch.degraded.len(),
            "rebuilt knowledge graph"
        );
        Ok(GraphReport { graph, degraded: batch.degraded })
    }

    /// Graph over the stored embeddings, without recomputing them. Books that
    /// have no embedding yet are left out.
    pub async fn knowledge_graph(&self) -> Result<KnowledgeGraph> {
        let tx = self.store.begin_tx(TxMode::ReadOnly).await?;
        let mut placed = Vec::new();
        for book in self.store.all_books(&tx).await? {
            if let Some(point) = self.store.embedding(&tx, &book.id).await? {
                placed.push((book, point));
            }
        }
        let refs: Vec<(&Book, Point2)> = placed.iter().map(|(b, p)| (b, *p)).collect();
        Ok(self.graph.assemble(&refs))
    }
}

/// In-memory bookshelf for testing and embedding.
impl Bookshelf<MemoryStore> {
    pub async fn open_memory() -> Result<Self> {
        Self::with_store(MemoryStore::new(), EngineConfig::default())
    }
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Shelf {row} is not empty: {occupied} book(s) still on it")]
    ShelfNotEmpty { row: usize, occupied: usize },

    #[error("Cannot remove the last remaining shelf")]
    MinimumShelvesReached,

    #[error("Degenerate input: need at least {required} books, got {got}")]
    DegenerateInput { required: usize, got: usize },

    #[error("Placement exhausted after {probes} probes on a grid of {capacity} cells")]
    PlacementExhausted { probes: usize, capacity: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Enrichment failed for {book_id}: {message}")]
    Enrichment { book_id: BookId, message: String },

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Transaction error: {0}")]
    TxError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
