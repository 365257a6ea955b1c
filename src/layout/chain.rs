//! Adjacency chain: `from -> to` links between neighbouring books on a row.
//!
//! The chain is derived data. It is recomputed from the full slot set on
//! every layout mutation and stored by replacing the previous chain whole.

use std::collections::BTreeMap;

use crate::model::{ChainLink, ShelfSlot};

/// Link each book to the next one on its row, rows in ascending order.
pub fn adjacency_chain(slots: &[ShelfSlot]) -> Vec<ChainLink> {
    let mut rows: BTreeMap<usize, Vec<&ShelfSlot>> = BTreeMap::new();
    for slot in slots {
        rows.entry(slot.row).or_default().push(slot);
    }

    let mut links = Vec::with_capacity(slots.len());
    for (row, mut books) in rows {
        books.sort_by(|a, b| a.col.cmp(&b.col).then_with(|| a.book_id.cmp(&b.book_id)));
        links.extend(books.windows(2).map(|pair| ChainLink {
            from: pair[0].book_id.clone(),
            to: pair[1].book_id.clone(),
            row,
        }));
    }
    links
}
