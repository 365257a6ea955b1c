//! End-to-end tests for the hand: books staged before they are shelved.

use bookshelf_graph::{
    Book, BookId, Bookshelf, Enrichment, Error, MemoryStore, MetadataSource, StaticMetadata,
};
use pretty_assertions::assert_eq;

async fn holding(ids: &[&str]) -> Bookshelf<MemoryStore> {
    let shelf = Bookshelf::open_memory().await.unwrap();
    for id in ids {
        assert!(shelf.add_to_hand(Book::new(*id, format!("Title {id}"))).await.unwrap());
    }
    shelf
}

fn ids(books: &[Book]) -> Vec<String> {
    books.iter().map(|b| b.id.to_string()).collect()
}

// ============================================================================
// 1. Staging
// ============================================================================

#[tokio::test]
async fn test_add_to_hand_deduplicates_by_id() {
    let shelf = holding(&["b", "a"]).await;

    assert!(!shelf.add_to_hand(Book::new("b", "Another title")).await.unwrap());

    let hand = shelf.hand().await.unwrap();
    assert_eq!(ids(&hand), vec!["b", "a"]);
    assert_eq!(hand[0].title, "Title b");
    // Staged books are not on the shelf.
    assert!(shelf.books().await.unwrap().is_empty());
    assert!(shelf.slots().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_remove_from_hand() {
    let shelf = holding(&["a", "b"]).await;

    shelf.remove_from_hand(&BookId::from("a")).await.unwrap();
    assert_eq!(ids(&shelf.hand().await.unwrap()), vec!["b"]);

    let err = shelf.remove_from_hand(&BookId::from("a")).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

// ============================================================================
// 2. Shelving
// ============================================================================

#[tokio::test]
async fn test_shelve_from_hand_places_incrementally() {
    let shelf = holding(&["a", "b", "c"]).await;

    let report = shelf
        .shelve_from_hand(&[BookId::from("a"), BookId::from("c")], None)
        .await
        .unwrap();

    let placed: Vec<(String, usize, usize)> = report
        .shelved
        .iter()
        .map(|s| (s.book_id.to_string(), s.row, s.col))
        .collect();
    assert_eq!(placed, vec![("a".to_string(), 0, 0), ("c".to_string(), 0, 1)]);
    assert!(report.skipped.is_empty());
    assert_eq!(ids(&shelf.hand().await.unwrap()), vec!["b"]);
    assert_eq!(ids(&shelf.books().await.unwrap()), vec!["a", "c"]);
    assert_eq!(shelf.adjacency_chain().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_shelve_from_hand_skips_failed_lookups() {
    let shelf = holding(&["a", "b"]).await;
    let source: &dyn MetadataSource = &StaticMetadata::new()
        .with_failure("a", "catalog unavailable")
        .with_entry(
            "b",
            Enrichment { description: Some("A long walk".into()), categories: vec!["Travel".into()] },
        );

    let report = shelf
        .shelve_from_hand(&[BookId::from("a"), BookId::from("b")], Some(source))
        .await
        .unwrap();

    assert_eq!(report.skipped, vec![BookId::from("a")]);
    assert_eq!(report.shelved.len(), 1);
    assert_eq!(ids(&shelf.hand().await.unwrap()), vec!["a"]);

    let b = shelf.book(&BookId::from("b")).await.unwrap().unwrap();
    assert_eq!(b.description.as_deref(), Some("A long walk"));
    assert_eq!(b.categories, vec!["Travel"]);
}

#[tokio::test]
async fn test_shelve_unknown_id_changes_nothing() {
    let shelf = holding(&["a"]).await;

    let err = shelf
        .shelve_from_hand(&[BookId::from("a"), BookId::from("ghost")], None)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::NotFound(_)));
    assert_eq!(ids(&shelf.hand().await.unwrap()), vec!["a"]);
    assert!(shelf.slots().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_shelve_repeated_id_once() {
    let shelf = holding(&["a"]).await;

    let report = shelf
        .shelve_from_hand(&[BookId::from("a"), BookId::from("a")], None)
        .await
        .unwrap();

    assert_eq!(report.shelved.len(), 1);
    assert!(shelf.hand().await.unwrap().is_empty());
}
