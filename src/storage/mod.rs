//! # Shelf Store Trait
//!
//! The contract between the engines and whatever persists shelf state.
//! Books, the hand (books staged but not yet shelved), slots, the shelf
//! design, the adjacency chain and per-book embeddings all live behind it.
//!
//! ## Implementations
//!
//! | Store         | Module   | Description                                  |
//! |---------------|----------|----------------------------------------------|
//! | `MemoryStore` | `memory` | In-memory, staged transactions, for embedding |
//!
//! ## Transaction rules
//!
//! - At most one `ReadWrite` transaction is open at a time; `begin_tx`
//!   waits for the current writer to finish. This is the exclusive scope
//!   every layout mutation runs in.
//! - Writes become visible on `commit_tx`. `rollback_tx` discards them.
//! - Mutating through a `ReadOnly` transaction fails with `Error::TxError`.

pub mod memory;

use async_trait::async_trait;

use crate::model::*;
use crate::tx::{Transaction, TxMode};
use crate::Result;

pub use memory::MemoryStore;

// ============================================================================
// ShelfStore Trait
// ============================================================================

#[async_trait]
pub trait ShelfStore: Send + Sync + 'static {
    /// The transaction type for this store.
    type Tx: Transaction;

    // ========================================================================
    // Transactions
    // ========================================================================

    async fn begin_tx(&self, mode: TxMode) -> Result<Self::Tx>;

    async fn commit_tx(&self, tx: Self::Tx) -> Result<()>;

    async fn rollback_tx(&self, tx: Self::Tx) -> Result<()>;

    // ========================================================================
    // Books
    // ========================================================================

    /// Insert or replace a book record.
    async fn put_book(&self, tx: &mut Self::Tx, book: Book) -> Result<()>;

    async fn get_book(&self, tx: &Self::Tx, id: &BookId) -> Result<Option<Book>>;

    /// Delete a record together with its embedding. Returns true if it existed.
    /// The slot is left alone; callers remove it explicitly.
    async fn delete_book(&self, tx: &mut Self::Tx, id: &BookId) -> Result<bool>;

    /// All records, ordered by id.
    async fn all_books(&self, tx: &Self::Tx) -> Result<Vec<Book>>;

    // ========================================================================
    // Hand
    // ========================================================================

    /// Insert or replace a staged book. New entries go to the end.
    async fn put_hand(&self, tx: &mut Self::Tx, book: Book) -> Result<()>;

    async fn get_hand(&self, tx: &Self::Tx, id: &BookId) -> Result<Option<Book>>;

    async fn delete_hand(&self, tx: &mut Self::Tx, id: &BookId) -> Result<bool>;

    /// Staged books in the order they were added.
    async fn all_hand(&self, tx: &Self::Tx) -> Result<Vec<Book>>;

    // ========================================================================
    // Shelf design
    // ========================================================================

    /// The stored design, or None if none was ever saved.
    async fn load_design(&self, tx: &Self::Tx) -> Result<Option<ShelfDesign>>;

    async fn save_design(&self, tx: &mut Self::Tx, design: ShelfDesign) -> Result<()>;

    // ========================================================================
    // Slots
    // ========================================================================

    /// All slots, ordered by (row, col).
    async fn all_slots(&self, tx: &Self::Tx) -> Result<Vec<ShelfSlot>>;

    async fn slot_of(&self, tx: &Self::Tx, id: &BookId) -> Result<Option<ShelfSlot>>;

    /// Insert or move a book's slot.
    ///
    /// Fails with `ConstraintViolation` if another book holds the cell.
    async fn put_slot(&self, tx: &mut Self::Tx, slot: ShelfSlot) -> Result<()>;

    async fn delete_slot(&self, tx: &mut Self::Tx, id: &BookId) -> Result<bool>;

    /// Remove every slot. Returns how many there were.
    async fn clear_slots(&self, tx: &mut Self::Tx) -> Result<usize>;

    /// Replace the whole slot set.
    ///
    /// Default: clear, then put each slot in turn.
    async fn replace_slots(&self, tx: &mut Self::Tx, slots: Vec<ShelfSlot>) -> Result<()> {
        self.clear_slots(tx).await?;
        for slot in slots {
            self.put_slot(tx, slot).await?;
        }
        Ok(())
    }

    // ========================================================================
    // Adjacency chain
    // ========================================================================

    /// Drop the stored chain and store `links` in its place.
    async fn replace_chain(&self, tx: &mut Self::Tx, links: Vec<ChainLink>) -> Result<()>;

    async fn chain(&self, tx: &Self::Tx) -> Result<Vec<ChainLink>>;

    // ========================================================================
    // Embeddings
    // ========================================================================

    async fn set_embedding(&self, tx: &mut Self::Tx, id: &BookId, point: Point2) -> Result<()>;

    async fn embedding(&self, tx: &Self::Tx, id: &BookId) -> Result<Option<Point2>>;

    /// All embeddings, ordered by book id.
    async fn all_embeddings(&self, tx: &Self::Tx) -> Result<Vec<(BookId, Point2)>>;

    // ========================================================================
    // Introspection
    // ========================================================================

    async fn book_count(&self, tx: &Self::Tx) -> Result<u64> {
        Ok(self.all_books(tx).await?.len() as u64)
    }

    async fn slot_count(&self, tx: &Self::Tx) -> Result<u64> {
        Ok(self.all_slots(tx).await?.len() as u64)
    }
}
