//! End-to-end tests for the semantic graph: embedding, edges, enrichment
//! and embedding-driven placement.

use async_trait::async_trait;
use bookshelf_graph::{
    Book, BookId, Bookshelf, EdgeKind, Enrichment, Error, GraphEngine, MemoryStore,
    MetadataSource, ShelfStore, StaticMetadata, TxMode,
};
use pretty_assertions::assert_eq;

/// Source that saves a new edition of `r1` through the shared store while
/// the lookup is in flight, then answers with `delta` for `r1`.
struct EditingSource {
    store: MemoryStore,
    delta: Option<Enrichment>,
}

#[async_trait]
impl MetadataSource for EditingSource {
    async fn fetch(&self, book: &Book) -> bookshelf_graph::Result<Option<Enrichment>> {
        if book.id.as_str() != "r1" {
            return Ok(None);
        }
        let mut tx = self.store.begin_tx(TxMode::ReadWrite).await?;
        let edition = Book::new("r1", "Rust in Action (2nd edition)")
            .with_description("Systems programming with Rust")
            .with_classification("007.64");
        self.store.put_book(&mut tx, edition).await?;
        self.store.commit_tx(tx).await?;
        Ok(self.delta.clone())
    }
}

fn catalog() -> Vec<Book> {
    vec![
        Book::new("r1", "Rust in Action")
            .with_authors(["Tim McNamara"])
            .with_description("Systems programming with Rust, memory safety and concurrency")
            .with_categories(["Programming"]),
        Book::new("r2", "Programming Rust")
            .with_authors(["Jim Blandy"])
            .with_description("Fast, safe systems programming in Rust with ownership")
            .with_categories(["Programming"]),
        Book::new("r3", "Rust Atomics and Locks")
            .with_authors(["Mara Bos"])
            .with_description("Low-level concurrency in Rust with atomics and locks")
            .with_categories(["Programming"]),
        Book::new("g1", "The Hobbit")
            .with_authors(["J. R. R. Tolkien"])
            .with_description("A hobbit travels with dwarves to reclaim a dragon's treasure")
            .with_categories(["Fantasy"]),
        Book::new("g2", "The Fellowship of the Ring")
            .with_authors(["J. R. R. Tolkien"])
            .with_description("A hobbit carries a ring of power toward a distant mountain")
            .with_categories(["Fantasy"]),
    ]
}

async fn stocked() -> Bookshelf<MemoryStore> {
    let shelf = Bookshelf::open_memory().await.unwrap();
    for book in catalog() {
        shelf.add_book(book).await.unwrap();
    }
    shelf
}

// ============================================================================
// 1. Pure graph building
// ============================================================================

#[test]
fn test_small_inputs() {
    let engine = GraphEngine::default();

    let empty = engine.build(&[]);
    assert!(empty.is_empty());
    assert!(empty.edges.is_empty());

    let one = engine.build(&catalog()[..1]);
    assert_eq!(one.nodes.len(), 1);
    assert_eq!((one.nodes[0].x, one.nodes[0].y), (0.0, 0.0));
    assert!(one.edges.is_empty());

    let err = engine.build_strict(&catalog()[..1]).unwrap_err();
    assert!(matches!(err, Error::DegenerateInput { required: 2, got: 1 }));
}

#[test]
fn test_graph_shape() {
    let graph = GraphEngine::default().build(&catalog());

    assert_eq!(graph.nodes.len(), 5);
    assert!(graph.nodes.iter().all(|n| n.x.is_finite() && n.y.is_finite()));

    // Programming: 3 books → 3 pairs; Fantasy: 2 books → 1 pair.
    let shared: Vec<_> = graph.edges_of_kind(EdgeKind::SharedCategory).collect();
    assert_eq!(shared.len(), 4);
    assert!(shared.iter().all(|e| e.weight == 0.5));
    assert_eq!(
        shared.iter().filter(|e| e.label.as_deref() == Some("Programming")).count(),
        3
    );

    let similar: Vec<_> = graph.edges_of_kind(EdgeKind::Similarity).collect();
    assert!(!similar.is_empty());
    for edge in &similar {
        assert!(edge.weight > 0.0);
        assert_ne!(edge.source, edge.target);
    }
    for (i, a) in similar.iter().enumerate() {
        for b in &similar[i + 1..] {
            assert!(!a.connects(&b.source, &b.target), "duplicate similarity edge");
        }
    }
}

#[test]
fn test_embedding_is_deterministic() {
    let a = GraphEngine::default().build(&catalog());
    let b = GraphEngine::default().build(&catalog());
    assert_eq!(a, b);
}

// ============================================================================
// 2. Stored graph with enrichment
// ============================================================================

#[tokio::test]
async fn test_rebuild_graph_degrades_failed_lookups() {
    let shelf = stocked().await;
    let source: &dyn MetadataSource = &StaticMetadata::new()
        .with_failure("g1", "lookup timed out")
        .with_entry(
            "g2",
            Enrichment { description: None, categories: vec!["Fantasy".into(), "Classics".into()] },
        );

    let report = shelf.rebuild_graph(Some(source)).await.unwrap();

    assert_eq!(report.degraded, vec![BookId::from("g1")]);
    assert_eq!(report.graph.nodes.len(), 5);

    let g2 = shelf.book(&BookId::from("g2")).await.unwrap().unwrap();
    assert_eq!(g2.categories, vec!["Fantasy", "Classics"]);
    let g1 = shelf.book(&BookId::from("g1")).await.unwrap().unwrap();
    assert_eq!(g1.categories, vec!["Fantasy"]);
}

#[tokio::test]
async fn test_rebuild_graph_keeps_edits_made_during_lookup() {
    let shelf = stocked().await;
    let source = EditingSource { store: shelf.store().clone(), delta: None };

    shelf.rebuild_graph(Some(&source)).await.unwrap();

    let r1 = shelf.book(&BookId::from("r1")).await.unwrap().unwrap();
    assert_eq!(r1.title, "Rust in Action (2nd edition)");
    assert_eq!(r1.classification_codes.to_vec(), vec!["007.64".to_string()]);
    // Untouched books keep their records too.
    let r2 = shelf.book(&BookId::from("r2")).await.unwrap().unwrap();
    assert_eq!(r2, catalog()[1]);
}

#[tokio::test]
async fn test_rebuild_graph_merges_delta_into_fresh_record() {
    let shelf = stocked().await;
    let source = EditingSource {
        store: shelf.store().clone(),
        delta: Some(Enrichment { description: None, categories: vec!["Systems".into()] }),
    };

    shelf.rebuild_graph(Some(&source)).await.unwrap();

    let r1 = shelf.book(&BookId::from("r1")).await.unwrap().unwrap();
    assert_eq!(r1.title, "Rust in Action (2nd edition)");
    assert_eq!(r1.description.as_deref(), Some("Systems programming with Rust"));
    assert_eq!(r1.categories, vec!["Systems"]);
}

#[tokio::test]
async fn test_knowledge_graph_uses_stored_embedding() {
    let shelf = stocked().await;
    assert!(shelf.knowledge_graph().await.unwrap().is_empty());

    let report = shelf.rebuild_graph(None).await.unwrap();
    let stored = shelf.knowledge_graph().await.unwrap();

    assert_eq!(stored.nodes.len(), report.graph.nodes.len());
    for node in &report.graph.nodes {
        let again = stored.node(&node.id).unwrap();
        assert_eq!((again.x, again.y), (node.x, node.y));
    }
    assert_eq!(stored.edges.len(), report.graph.edges.len());
}

#[tokio::test]
async fn test_removed_book_leaves_graph() {
    let shelf = stocked().await;
    shelf.rebuild_graph(None).await.unwrap();

    shelf.remove_book(&BookId::from("r3")).await.unwrap();

    let graph = shelf.knowledge_graph().await.unwrap();
    assert_eq!(graph.nodes.len(), 4);
    assert!(graph.node(&BookId::from("r3")).is_none());
    assert!(graph.edges.iter().all(|e| e.source.as_str() != "r3" && e.target.as_str() != "r3"));
}

// ============================================================================
// 3. Placement by embedding
// ============================================================================

#[tokio::test]
async fn test_place_by_embedding_shelves_unplaced_books() {
    let shelf = Bookshelf::open_memory().await.unwrap();
    let store = shelf.store();
    let mut tx = store.begin_tx(TxMode::ReadWrite).await.unwrap();
    for book in catalog() {
        store.put_book(&mut tx, book).await.unwrap();
    }
    store.commit_tx(tx).await.unwrap();
    assert!(shelf.slots().await.unwrap().is_empty());

    shelf.rebuild_graph(None).await.unwrap();
    let placed = shelf.place_by_embedding().await.unwrap();

    assert_eq!(placed.len(), 5);
    let slots = shelf.slots().await.unwrap();
    assert_eq!(slots.len(), 5);
    let mut cells: Vec<_> = slots.iter().map(|s| (s.row, s.col)).collect();
    cells.dedup();
    assert_eq!(cells.len(), 5);
    let design = shelf.design().await.unwrap();
    assert!(slots.iter().all(|s| s.row < design.total_shelves && s.col < design.books_per_shelf));
    assert_eq!(shelf.adjacency_chain().await.unwrap().len(), 4);

    // Everyone is shelved now.
    assert!(shelf.place_by_embedding().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_graph_json_shape() {
    let shelf = stocked().await;
    let graph = shelf.rebuild_graph(None).await.unwrap().graph;
    let json: serde_json::Value = serde_json::from_str(&graph.to_json().unwrap()).unwrap();
    assert_eq!(json["nodes"].as_array().unwrap().len(), 5);
    assert!(json["edges"][0]["kind"].is_string());
}
