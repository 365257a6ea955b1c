//! # Shelf Layout Engine
//!
//! Pure placement logic over a [`ShelfDesign`] and the current slot set.
//! Nothing here touches a store; [`crate::Bookshelf`] loads state inside a
//! `ReadWrite` transaction, calls into this module, and writes the result
//! back together with a freshly rebuilt adjacency chain.
//!
//! | Operation            | Function                       | Destructive |
//! |----------------------|--------------------------------|-------------|
//! | Full rebuild         | [`plan_full_layout`]           | yes         |
//! | Incremental          | [`place_incremental`]          | no          |
//! | Embedding batch      | [`probe::place_by_embedding`]  | no          |
//! | Adjacency chain      | [`chain::adjacency_chain`]     | derived     |
//! | Resize               | [`add_shelves`], [`remove_shelf`] | design only |

pub mod chain;
pub mod probe;

use hashbrown::HashSet;
use rand::Rng;
use rand::seq::IndexedRandom;

use crate::classify::BookGroup;
use crate::model::{BookId, ShelfDesign, ShelfSlot};
use crate::{Error, Result};

pub use chain::adjacency_chain;
pub use probe::{place_by_embedding, ring_search, Occupancy};

// ============================================================================
// Full rebuild
// ============================================================================

/// Assign every grouped book a slot, scanning groups and members in order.
///
/// Columns fill left to right and wrap at `books_per_shelf`. A group that
/// does not fit in what is left of a partly used row starts on the next row;
/// a group wider than a whole shelf wraps within itself. Ids already placed
/// by an earlier group are skipped.
pub fn plan_full_layout(groups: &[BookGroup], books_per_shelf: usize) -> Result<Vec<ShelfSlot>> {
    if books_per_shelf == 0 {
        return Err(Error::InvalidConfig("books_per_shelf must be at least 1".into()));
    }

    let mut slots = Vec::new();
    let mut seen: HashSet<&BookId> = HashSet::new();
    let mut row = 0;
    let mut col = 0;

    for group in groups {
        let members: Vec<&BookId> = group
            .books
            .iter()
            .map(|b| &b.id)
            .filter(|id| !seen.contains(*id))
            .collect();
        if members.is_empty() {
            continue;
        }

        let remaining = books_per_shelf - col;
        if members.len() > remaining && col > 0 {
            row += 1;
            col = 0;
        }

        for id in members {
            if col >= books_per_shelf {
                row += 1;
                col = 0;
            }
            slots.push(ShelfSlot { book_id: id.clone(), row, col });
            seen.insert(id);
            col += 1;
        }
    }

    Ok(slots)
}

/// Shelf count a rebuilt layout needs: last used row + 1, at least one.
pub fn required_shelves(slots: &[ShelfSlot]) -> usize {
    slots.iter().map(|s| s.row + 1).max().unwrap_or(1)
}

// ============================================================================
// Incremental placement
// ============================================================================

/// Unoccupied cells inside the design, in row-major order.
pub fn free_cells(design: &ShelfDesign, slots: &[ShelfSlot]) -> Vec<(usize, usize)> {
    let used: HashSet<(usize, usize)> = slots.iter().map(ShelfSlot::position).collect();
    (0..design.total_shelves)
        .flat_map(|row| (0..design.books_per_shelf).map(move |col| (row, col)))
        .filter(|cell| !used.contains(cell))
        .collect()
}

/// Place one book into a free cell without moving anyone else.
///
/// With `rng` the cell is drawn uniformly from the free cells, otherwise the
/// first free cell in row-major order is used. When the grid is full a new
/// shelf is appended and the book goes to its first column. A book that
/// already has a slot keeps it.
pub fn place_incremental<R: Rng + ?Sized>(
    design: &mut ShelfDesign,
    slots: &[ShelfSlot],
    book_id: &BookId,
    rng: Option<&mut R>,
) -> ShelfSlot {
    if let Some(existing) = slots.iter().find(|s| &s.book_id == book_id) {
        return existing.clone();
    }
    if design.total_shelves == 0 {
        design.total_shelves = 1;
    }

    let free = free_cells(design, slots);
    let picked = match rng {
        Some(rng) => free.choose(rng).copied(),
        None => free.first().copied(),
    };

    let (row, col) = match picked {
        Some(cell) => cell,
        None => {
            let row = design.total_shelves;
            design.total_shelves += 1;
            tracing::debug!(total_shelves = design.total_shelves, "shelf full, appended a shelf");
            (row, 0)
        }
    };

    ShelfSlot { book_id: book_id.clone(), row, col }
}

// ============================================================================
// Resize
// ============================================================================

/// Append `count` empty shelves. Returns the new shelf count.
pub fn add_shelves(design: &mut ShelfDesign, count: usize) -> Result<usize> {
    design.total_shelves = design
        .total_shelves
        .checked_add(count)
        .ok_or_else(|| Error::InvalidConfig(format!("cannot add {count} shelves to {}", design.total_shelves)))?;
    Ok(design.total_shelves)
}

/// Drop the last shelf if it is empty and not the only one.
pub fn remove_shelf(design: &mut ShelfDesign, slots: &[ShelfSlot]) -> Result<usize> {
    if design.total_shelves <= 1 {
        return Err(Error::MinimumShelvesReached);
    }
    let last = design.total_shelves - 1;
    let occupied = slots.iter().filter(|s| s.row >= last).count();
    if occupied > 0 {
        return Err(Error::ShelfNotEmpty { row: last, occupied });
    }
    design.total_shelves = last;
    Ok(design.total_shelves)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{BookGroup, GroupKey};
    use crate::model::Book;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn group(key: &str, ids: &[&str]) -> BookGroup {
        BookGroup {
            key: GroupKey::Code(key.into()),
            books: ids.iter().map(|id| Book::new(*id, *id)).collect(),
        }
    }

    fn positions(slots: &[ShelfSlot]) -> Vec<(&str, usize, usize)> {
        slots.iter().map(|s| (s.book_id.as_str(), s.row, s.col)).collect()
    }

    #[test]
    fn test_group_that_fits_packs_into_row() {
        let groups = vec![group("1", &["a", "b"]), group("2", &["c", "d"])];
        let slots = plan_full_layout(&groups, 5).unwrap();
        assert_eq!(
            positions(&slots),
            vec![("a", 0, 0), ("b", 0, 1), ("c", 0, 2), ("d", 0, 3)],
        );
    }

    #[test]
    fn test_group_that_does_not_fit_starts_new_row() {
        let groups = vec![group("1", &["a", "b", "c"]), group("2", &["d", "e", "f"])];
        let slots = plan_full_layout(&groups, 4).unwrap();
        assert_eq!(
            positions(&slots),
            vec![("a", 0, 0), ("b", 0, 1), ("c", 0, 2), ("d", 1, 0), ("e", 1, 1), ("f", 1, 2)],
        );
        assert_eq!(required_shelves(&slots), 2);
    }

    #[test]
    fn test_oversized_group_wraps_within_itself() {
        let groups = vec![group("1", &["a", "b", "c", "d", "e"])];
        let slots = plan_full_layout(&groups, 2).unwrap();
        assert_eq!(
            positions(&slots),
            vec![("a", 0, 0), ("b", 0, 1), ("c", 1, 0), ("d", 1, 1), ("e", 2, 0)],
        );
    }

    #[test]
    fn test_oversized_group_after_partial_row_starts_fresh() {
        let groups = vec![group("1", &["a"]), group("2", &["b", "c", "d"])];
        let slots = plan_full_layout(&groups, 2).unwrap();
        assert_eq!(
            positions(&slots),
            vec![("a", 0, 0), ("b", 1, 0), ("c", 1, 1), ("d", 2, 0)],
        );
    }

    #[test]
    fn test_zero_books_per_shelf_rejected() {
        assert!(matches!(plan_full_layout(&[], 0), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_incremental_fills_free_column() {
        let mut design = ShelfDesign::new(10, 1);
        let slots = vec![ShelfSlot::new("A", 0, 9)];
        let slot = place_incremental::<StdRng>(&mut design, &slots, &"B".into(), None);
        assert_eq!(slot.position(), (0, 0));
        assert_eq!(design.total_shelves, 1);
    }

    #[test]
    fn test_incremental_grows_when_full() {
        let mut design = ShelfDesign::new(2, 1);
        let slots = vec![ShelfSlot::new("A", 0, 0), ShelfSlot::new("B", 0, 1)];
        let slot = place_incremental::<StdRng>(&mut design, &slots, &"C".into(), None);
        assert_eq!(slot.position(), (1, 0));
        assert_eq!(design.total_shelves, 2);
    }

    #[test]
    fn test_incremental_random_picks_free_cell() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut design = ShelfDesign::new(3, 2);
        let slots = vec![ShelfSlot::new("A", 0, 0), ShelfSlot::new("B", 1, 2)];
        for _ in 0..20 {
            let slot = place_incremental(&mut design, &slots, &"C".into(), Some(&mut rng));
            assert!(!slots.iter().any(|s| s.position() == slot.position()));
            assert!(design.contains(slot.row, slot.col));
        }
        assert_eq!(design.total_shelves, 2);
    }

    #[test]
    fn test_incremental_keeps_existing_slot() {
        let mut design = ShelfDesign::new(4, 1);
        let slots = vec![ShelfSlot::new("A", 0, 3)];
        let slot = place_incremental::<StdRng>(&mut design, &slots, &"A".into(), None);
        assert_eq!(slot.position(), (0, 3));
    }

    #[test]
    fn test_incremental_zero_shelves_treated_as_one() {
        let mut design = ShelfDesign::new(4, 0);
        let slot = place_incremental::<StdRng>(&mut design, &[], &"A".into(), None);
        assert_eq!(slot.position(), (0, 0));
        assert_eq!(design.total_shelves, 1);
    }

    #[test]
    fn test_remove_shelf_rules() {
        let mut design = ShelfDesign::new(4, 1);
        assert!(matches!(remove_shelf(&mut design, &[]), Err(Error::MinimumShelvesReached)));

        let mut design = ShelfDesign::new(4, 3);
        let slots = vec![ShelfSlot::new("A", 2, 1)];
        assert!(matches!(
            remove_shelf(&mut design, &slots),
            Err(Error::ShelfNotEmpty { row: 2, occupied: 1 })
        ));
        assert_eq!(remove_shelf(&mut design, &[]).unwrap(), 2);
        assert_eq!(add_shelves(&mut design, 1).unwrap(), 3);
    }

    #[test]
    fn test_add_shelves_overflow_leaves_design() {
        let mut design = ShelfDesign::new(4, usize::MAX - 1);
        assert_eq!(add_shelves(&mut design, 1).unwrap(), usize::MAX);
        assert!(matches!(add_shelves(&mut design, 1), Err(Error::InvalidConfig(_))));
        assert_eq!(design.total_shelves, usize::MAX);
    }
}
