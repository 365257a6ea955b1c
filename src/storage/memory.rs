//! In-memory shelf store.
//!
//! This is the reference implementation of `ShelfStore`. State is a set of
//! HashMaps behind one RwLock.
//!
//! ## Transactions
//!
//! - Every transaction works on its own copy of the state taken at
//!   `begin_tx`. Reads see that copy plus the transaction's own writes.
//! - `ReadWrite` transactions hold the writer gate (an owned async mutex)
//!   until commit or rollback, so writers are serialised and never lose
//!   each other's updates.
//! - `commit_tx` publishes the copy; `rollback_tx` and drop discard it.
//!
//! Copying the whole state per transaction is fine for a personal library;
//! it is not meant for large catalogs.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use hashbrown::HashMap;
use parking_lot::RwLock;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::model::*;
use crate::tx::{Transaction, TxId, TxMode};
use crate::{Error, Result};
use super::ShelfStore;

// ============================================================================
// State
// ============================================================================

#[derive(Debug, Clone, Default)]
struct ShelfState {
    books: HashMap<BookId, Book>,
    /// Staged books, oldest first.
    hand: Vec<Book>,
    design: Option<ShelfDesign>,
    slots: HashMap<BookId, ShelfSlot>,
    /// (row, col) → occupant, kept in step with `slots`
    cells: HashMap<(usize, usize), BookId>,
    chain: Vec<ChainLink>,
    embeddings: HashMap<BookId, Point2>,
}

// ============================================================================
// MemoryStore
// ============================================================================

/// In-memory shelf storage. Cloning shares the underlying state.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<MemoryInner>,
}

struct MemoryInner {
    state: RwLock<ShelfState>,
    writer: Arc<Mutex<()>>,
    next_tx_id: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MemoryInner {
                state: RwLock::new(ShelfState::default()),
                writer: Arc::new(Mutex::new(())),
                next_tx_id: AtomicU64::new(1),
            }),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// MemoryTx
// ============================================================================

/// Staged transaction over a private copy of the store state.
pub struct MemoryTx {
    id: TxId,
    mode: TxMode,
    state: ShelfState,
    _writer: Option<OwnedMutexGuard<()>>,
}

impl Transaction for MemoryTx {
    fn mode(&self) -> TxMode { self.mode }
    fn id(&self) -> TxId { self.id }
}

impl MemoryTx {
    fn writable(&mut self) -> Result<&mut ShelfState> {
        match self.mode {
            TxMode::ReadWrite => Ok(&mut self.state),
            TxMode::ReadOnly => Err(Error::TxError(format!("{} is read-only", self.id))),
        }
    }
}

// ============================================================================
// ShelfStore impl
// ============================================================================

#[async_trait]
impl ShelfStore for MemoryStore {
    type Tx = MemoryTx;

    async fn begin_tx(&self, mode: TxMode) -> Result<MemoryTx> {
        let writer = match mode {
            TxMode::ReadWrite => Some(self.inner.writer.clone().lock_owned().await),
            TxMode::ReadOnly => None,
        };
        let id = TxId(self.inner.next_tx_id.fetch_add(1, Ordering::Relaxed));
        let state = self.inner.state.read().clone();
        Ok(MemoryTx { id, mode, state, _writer: writer })
    }

    async fn commit_tx(&self, tx: MemoryTx) -> Result<()> {
        if tx.mode == TxMode::ReadWrite {
            *self.inner.state.write() = tx.state;
        }
        Ok(())
    }

    async fn rollback_tx(&self, _tx: MemoryTx) -> Result<()> {
        Ok(())
    }

    // ========================================================================
    // Books
    // ========================================================================

    async fn put_book(&self, tx: &mut MemoryTx, book: Book) -> Result<()> {
        tx.writable()?.books.insert(book.id.clone(), book);
        Ok(())
    }

    async fn get_book(&self, tx: &MemoryTx, id: &BookId) -> Result<Option<Book>> {
        Ok(tx.state.books.get(id).cloned())
    }

    async fn delete_book(&self, tx: &mut MemoryTx, id: &BookId) -> Result<bool> {
        let state = tx.writable()?;
        state.embeddings.remove(id);
        Ok(state.books.remove(id).is_some())
    }

    async fn all_books(&self, tx: &MemoryTx) -> Result<Vec<Book>> {
        let mut books: Vec<Book> = tx.state.books.values().cloned().collect();
        books.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(books)
    }

    // ========================================================================
    // Hand
    // ========================================================================

    async fn put_hand(&self, tx: &mut MemoryTx, book: Book) -> Result<()> {
        let hand = &mut tx.writable()?.hand;
        match hand.iter_mut().find(|b| b.id == book.id) {
            Some(existing) => *existing = book,
            None => hand.push(book),
        }
        Ok(())
    }

    async fn get_hand(&self, tx: &MemoryTx, id: &BookId) -> Result<Option<Book>> {
        Ok(tx.state.hand.iter().find(|b| &b.id == id).cloned())
    }

    async fn delete_hand(&self, tx: &mut MemoryTx, id: &BookId) -> Result<bool> {
        let hand = &mut tx.writable()?.hand;
        let before = hand.len();
        hand.retain(|b| &b.id != id);
        Ok(hand.len() != before)
    }

    async fn all_hand(&self, tx: &MemoryTx) -> Result<Vec<Book>> {
        Ok(tx.state.hand.clone())
    }

    // ========================================================================
    // Shelf design
    // ========================================================================

    async fn load_design(&self, tx: &MemoryTx) -> Result<Option<ShelfDesign>> {
        Ok(tx.state.design)
    }

    async fn save_design(&self, tx: &mut MemoryTx, design: ShelfDesign) -> Result<()> {
        tx.writable()?.design = Some(design);
        Ok(())
    }

    // ========================================================================
    // Slots
    // ========================================================================

    async fn all_slots(&self, tx: &MemoryTx) -> Result<Vec<ShelfSlot>> {
        let mut slots: Vec<ShelfSlot> = tx.state.slots.values().cloned().collect();
        slots.sort_by_key(ShelfSlot::position);
        Ok(slots)
    }

    async fn slot_of(&self, tx: &MemoryTx, id: &BookId) -> Result<Option<ShelfSlot>> {
        Ok(tx.state.slots.get(id).cloned())
    }

    async fn put_slot(&self, tx: &mut MemoryTx, slot: ShelfSlot) -> Result<()> {
        let state = tx.writable()?;
        if let Some(occupant) = state.cells.get(&slot.position()) {
            if occupant != &slot.book_id {
                return Err(Error::ConstraintViolation(format!(
                    "cell ({}, {}) already holds {occupant}, cannot place {}",
                    slot.row, slot.col, slot.book_id,
                )));
            }
        }
        if let Some(previous) = state.slots.get(&slot.book_id) {
            state.cells.remove(&previous.position());
        }
        state.cells.insert(slot.position(), slot.book_id.clone());
        state.slots.insert(slot.book_id.clone(), slot);
        Ok(())
    }

    async fn delete_slot(&self, tx: &mut MemoryTx, id: &BookId) -> Result<bool> {
        let state = tx.writable()?;
        match state.slots.remove(id) {
            Some(slot) => {
                state.cells.remove(&slot.position());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn clear_slots(&self, tx: &mut MemoryTx) -> Result<usize> {
        let state = tx.writable()?;
        let n = state.slots.len();
        state.slots.clear();
        state.cells.clear();
        Ok(n)
    }

    // ========================================================================
    // Adjacency chain
    // ========================================================================

    async fn replace_chain(&self, tx: &mut MemoryTx, links: Vec<ChainLink>) -> Result<()> {
        tx.writable()?.chain = links;
        Ok(())
    }

    async fn chain(&self, tx: &MemoryTx) -> Result<Vec<ChainLink>> {
        Ok(tx.state.chain.clone())
    }

    // ========================================================================
    // Embeddings
    // ========================================================================

    async fn set_embedding(&self, tx: &mut MemoryTx, id: &BookId, point: Point2) -> Result<()> {
        tx.writable()?.embeddings.insert(id.clone(), point);
        Ok(())
    }

    async fn embedding(&self, tx: &MemoryTx, id: &BookId) -> Result<Option<Point2>> {
        Ok(tx.state.embeddings.get(id).copied())
    }

    async fn all_embeddings(&self, tx: &MemoryTx) -> Result<Vec<(BookId, Point2)>> {
        let mut out: Vec<(BookId, Point2)> = tx.state.embeddings.iter().map(|(k, v)| (k.clone(), *v)).collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(out)
    }

    async fn book_count(&self, tx: &MemoryTx) -> Result<u64> {
        Ok(tx.state.books.len() as u64)
    }

    async fn slot_count(&self, tx: &MemoryTx) -> Result<u64> {
        Ok(tx.state.slots.len() as u64)
    }
}

// ============================================================================
// Tests
// ============================================================================
