//! # Bookshelf Model
//!
//! Plain data shared by the layout engine, the semantic graph engine and
//! the store: books, shelf slots, the shelf design, the adjacency chain and
//! the graph DTOs handed to a front end.
//!
//! Design rule: this module is pure data. No I/O, no state, no async.

pub mod book;
pub mod shelf;
pub mod graph;

pub use book::{Book, BookId, Point2};
pub use shelf::{ChainLink, ShelfCell, ShelfDesign, ShelfSlot, ShelfView};
pub use graph::{EdgeKind, GraphEdge, GraphNode, KnowledgeGraph};
