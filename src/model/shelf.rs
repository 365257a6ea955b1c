//! Shelf grid types.

use serde::{Deserialize, Serialize};
use super::{Book, BookId};

/// Default column bound for a freshly created design.
pub const DEFAULT_BOOKS_PER_SHELF: usize = 10;

/// One occupied cell of the shelf grid.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShelfSlot {
    pub book_id: BookId,
    pub row: usize,
    pub col: usize,
}

impl ShelfSlot {
    pub fn new(book_id: impl Into<BookId>, row: usize, col: usize) -> Self {
        Self { book_id: book_id.into(), row, col }
    }

    pub fn position(&self) -> (usize, usize) {
        (self.row, self.col)
    }
}

/// Shelf dimensions: `total_shelves` rows of `books_per_shelf` columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShelfDesign {
    pub books_per_shelf: usize,
    pub total_shelves: usize,
}

impl Default for ShelfDesign {
    fn default() -> Self {
        Self { books_per_shelf: DEFAULT_BOOKS_PER_SHELF, total_shelves: 1 }
    }
}

impl ShelfDesign {
    pub fn new(books_per_shelf: usize, total_shelves: usize) -> Self {
        Self { books_per_shelf, total_shelves }
    }

    /// Number of cells in the grid.
    pub fn capacity(&self) -> usize {
        self.books_per_shelf * self.total_shelves
    }

    pub fn contains(&self, row: usize, col: usize) -> bool {
        row < self.total_shelves && col < self.books_per_shelf
    }
}

/// Directed link between neighbouring books on one shelf row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChainLink {
    pub from: BookId,
    pub to: BookId,
    pub row: usize,
}

/// A book joined with its slot, for rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShelfCell {
    pub row: usize,
    pub col: usize,
    pub book: Book,
}

/// The whole shelf as a front end draws it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShelfView {
    pub rows: usize,
    pub cols: usize,
    pub cells: Vec<ShelfCell>,
}
