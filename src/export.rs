//! Cypher DUMP export: serialize a shelf as Cypher statements.
//!
//! Produces a script that recreates the collection in any Cypher-compatible
//! graph database: books with their shelf position and embedding, the
//! classification hierarchy, and the per-shelf reading chain.
//!
//! ```text
//! (:Book)-[:CLASSIFIED_AS]->(:Classification)-[:BROADER]->(:Classification)
//! (:Book)-[:HAS_CONCEPT]->(:Concept)
//! (:Book)-[:SHELF_NEXT {row}]->(:Book)
//! ```

use std::io::Write;

use crate::classify::ClassificationTree;
use crate::storage::ShelfStore;
use crate::tx::TxMode;
use crate::{Bookshelf, Result};

/// Export the stored shelf as a Cypher DUMP script.
pub async fn export_cypher_dump<S: ShelfStore>(
    bookshelf: &Bookshelf<S>,
    writer: &mut dyn Write,
) -> Result<()> {
    let store = bookshelf.store();
    let tx = store.begin_tx(TxMode::ReadOnly).await?;

    let books = store.all_books(&tx).await?;
    let chain = store.chain(&tx).await?;

    writeln!(writer, "// bookshelf-graph Cypher DUMP")?;
    writeln!(writer, "// Generated: {}", chrono::Utc::now().to_rfc3339())?;
    writeln!(writer, "// Books: {}", books.len())?;
    writeln!(writer, "// Shelf links: {}", chain.len())?;
    writeln!(writer)?;

    for book in &books {
        let mut props = vec![
            ("id", quote(book.id.as_str())),
            ("title", quote(&book.title)),
        ];
        if !book.authors.is_empty() {
            props.push(("authors", list(&book.authors)));
        }
        if let Some(description) = &book.description {
            props.push(("description", quote(description)));
        }
        if let Some(cover) = &book.cover {
            props.push(("cover", quote(cover)));
        }
        if let Some(slot) = store.slot_of(&tx, &book.id).await? {
            props.push(("row", slot.row.to_string()));
            props.push(("col", slot.col.to_string()));
        }
        if let Some(point) = store.embedding(&tx, &book.id).await? {
            props.push(("x", float(point.x)));
            props.push(("y", float(point.y)));
        }
        writeln!(writer, "CREATE (:Book {{{}}});", format_properties(&props))?;
    }

    writeln!(writer)?;
    writeln!(writer, "// Classification")?;

    let tree = ClassificationTree::from_books(&books);
    for (code, _) in tree.entries() {
        writeln!(writer, "MERGE (:Classification {{code: {}}});", quote(code))?;
    }
    for (code, parent) in tree.entries() {
        if let Some(parent) = parent {
            writeln!(
                writer,
                "MATCH (a:Classification {{code: {}}}), (b:Classification {{code: {}}}) CREATE (a)-[:BROADER]->(b);",
                quote(code),
                quote(parent),
            )?;
        }
    }
    for book in &books {
        for code in &book.classification_codes {
            let Some(code) = tree.resolve(code) else { continue };
            writeln!(
                writer,
                "MATCH (b:Book {{id: {}}}), (c:Classification {{code: {}}}) CREATE (b)-[:CLASSIFIED_AS]->(c);",
                quote(book.id.as_str()),
                quote(code),
            )?;
        }
    }

    writeln!(writer)?;
    writeln!(writer, "// Concepts")?;

    for book in &books {
        for category in &book.categories {
            writeln!(
                writer,
                "MERGE (c:Concept {{name: {}}}) WITH c MATCH (b:Book {{id: {}}}) CREATE (b)-[:HAS_CONCEPT]->(c);",
                quote(category),
                quote(book.id.as_str()),
            )?;
        }
    }

    writeln!(writer)?;
    writeln!(writer, "// Shelf chain")?;

    for link in &chain {
        writeln!(
            writer,
            "MATCH (a:Book {{id: {}}}), (b:Book {{id: {}}}) CREATE (a)-[:SHELF_NEXT {{row: {}}}]->(b);",
            quote(link.from.as_str()),
            quote(link.to.as_str()),
            link.row,
        )?;
    }

    store.commit_tx(tx).await?;
    Ok(())
}

/// Format key/literal pairs as a Cypher property string (key: value, ...).
fn format_properties(props: &[(&str, String)]) -> String {
    props
        .iter()
        .map(|(key, value)| format!("{}: {}", key, value))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Single-quoted Cypher string literal.
fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'"))
}

fn list(items: &[String]) -> String {
    let inner: Vec<String> = items.iter().map(|s| quote(s)).collect();
    format!("[{}]", inner.join(", "))
}

fn float(f: f64) -> String {
    if f.is_finite() { format!("{:?}", f) } else { "null".to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Book;

    #[test]
    fn test_quote_escapes() {
        assert_eq!(quote("hello"), "'hello'");
        assert_eq!(quote("O'Brien"), "'O\\'Brien'");
        assert_eq!(quote("a\\b"), "'a\\\\b'");
    }

    #[test]
    fn test_format_properties() {
        let props = vec![("title", quote("Kokoro")), ("row", 3.to_string())];
        assert_eq!(format_properties(&props), "title: 'Kokoro', row: 3");
        assert_eq!(list(&["A".into(), "B".into()]), "['A', 'B']");
        assert_eq!(float(1.0), "1.0");
        assert_eq!(float(f64::NAN), "null");
    }

    #[tokio::test]
    async fn test_dump_contains_every_part() {
        let shelf = Bookshelf::open_memory().await.unwrap();
        shelf
            .add_book(Book::new("a", "Kokoro").with_classification("913.6").with_categories(["Fiction"]))
            .await
            .unwrap();
        shelf.add_book(Book::new("b", "Botchan").with_classification("913.6")).await.unwrap();

        let mut out = Vec::new();
        export_cypher_dump(&shelf, &mut out).await.unwrap();
        let script = String::from_utf8(out).unwrap();

        assert!(script.contains("CREATE (:Book {id: 'a', title: 'Kokoro', row: 0, col: 0});"));
        assert!(script.contains("MERGE (:Classification {code: '913.6'});"));
        assert!(script.contains("CREATE (a)-[:BROADER]->(b);"));
        assert_eq!(script.matches("CLASSIFIED_AS").count(), 2);
        assert_eq!(script.matches("HAS_CONCEPT").count(), 1);
        assert!(script.contains("[:SHELF_NEXT {row: 0}]"));
    }
}
