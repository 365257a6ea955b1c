//! Collision-resolving placement.
//!
//! Each book gets a provisional cell from its normalised embedding
//! coordinate (`x` picks the column, `y` the shelf). If that cell is taken
//! the search walks outward in Chebyshev rings, the centre first, then every
//! cell at distance 1, then 2, and so on, until a free cell turns up.
//!
//! ```text
//!   2 2 2 2 2
//!   2 1 1 1 2
//!   2 1 0 1 2
//!   2 1 1 1 2
//!   2 2 2 2 2
//! ```
//!
//! The grid is finite, so a search visits at most `rows * cols` cells. More
//! probes than that is a broken invariant and fails with
//! [`Error::PlacementExhausted`] instead of looping.

use hashbrown::HashSet;

use crate::model::{BookId, Point2, ShelfDesign, ShelfSlot};
use crate::{Error, Result};

/// Occupied cells of a bounded grid.
#[derive(Debug, Clone)]
pub struct Occupancy {
    rows: usize,
    cols: usize,
    taken: HashSet<(usize, usize)>,
}

impl Occupancy {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols, taken: HashSet::new() }
    }

    pub fn from_slots(design: &ShelfDesign, slots: &[ShelfSlot]) -> Self {
        let mut occ = Self::new(design.total_shelves, design.books_per_shelf);
        for slot in slots {
            occ.occupy(slot.row, slot.col);
        }
        occ
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn capacity(&self) -> usize {
        self.rows * self.cols
    }

    pub fn is_taken(&self, row: usize, col: usize) -> bool {
        self.taken.contains(&(row, col))
    }

    /// Mark a cell. Returns false if it was already taken.
    pub fn occupy(&mut self, row: usize, col: usize) -> bool {
        self.taken.insert((row, col))
    }

    /// Free in-bounds cells.
    pub fn free(&self) -> usize {
        let inside = self.taken.iter().filter(|(r, c)| *r < self.rows && *c < self.cols).count();
        self.capacity() - inside
    }

    /// Append empty rows.
    pub fn grow(&mut self, extra_rows: usize) {
        self.rows += extra_rows;
    }
}

/// Cells at Chebyshev distance exactly `radius` from `(row, col)`, in
/// row-major order, clipped to the grid.
fn ring(row: usize, col: usize, radius: usize, rows: usize, cols: usize) -> impl Iterator<Item = (usize, usize)> {
    let r = radius as isize;
    let (row, col) = (row as isize, col as isize);
    (-r..=r).flat_map(move |dr| {
        (-r..=r).filter_map(move |dc| {
            if dr.abs().max(dc.abs()) != r {
                return None;
            }
            let (nr, nc) = (row + dr, col + dc);
            if nr < 0 || nc < 0 || nr >= rows as isize || nc >= cols as isize {
                return None;
            }
            Some((nr as usize, nc as usize))
        })
    })
}

/// Nearest free cell to `start`, searching outward ring by ring.
pub fn ring_search(occupancy: &Occupancy, start: (usize, usize)) -> Result<(usize, usize)> {
    let (rows, cols) = (occupancy.rows, occupancy.cols);
    let capacity = rows * cols;
    if capacity == 0 {
        return Err(Error::PlacementExhausted { probes: 0, capacity });
    }
    let row = start.0.min(rows - 1);
    let col = start.1.min(cols - 1);

    let mut probes = 0;
    for radius in 0..rows.max(cols) {
        for (r, c) in ring(row, col, radius, rows, cols) {
            probes += 1;
            if probes > capacity {
                return Err(Error::PlacementExhausted { probes, capacity });
            }
            if !occupancy.is_taken(r, c) {
                return Ok((r, c));
            }
        }
    }
    Err(Error::PlacementExhausted { probes, capacity })
}

/// Min/max of a batch of points, used to normalise them onto the grid.
#[derive(Debug, Clone, Copy)]
struct Bounds {
    min: Point2,
    max: Point2,
}

impl Bounds {
    fn of<'a>(points: impl Iterator<Item = &'a Point2>) -> Option<Self> {
        let mut bounds: Option<Bounds> = None;
        for p in points.filter(|p| p.x.is_finite() && p.y.is_finite()) {
            let b = bounds.get_or_insert(Bounds { min: *p, max: *p });
            b.min.x = b.min.x.min(p.x);
            b.min.y = b.min.y.min(p.y);
            b.max.x = b.max.x.max(p.x);
            b.max.y = b.max.y.max(p.y);
        }
        bounds
    }

    fn normalise(span_min: f64, span_max: f64, v: f64) -> f64 {
        let span = span_max - span_min;
        if !v.is_finite() || span <= f64::EPSILON {
            0.5
        } else {
            ((v - span_min) / span).clamp(0.0, 1.0)
        }
    }

    fn cell(&self, p: &Point2, rows: usize, cols: usize) -> (usize, usize) {
        let ny = Self::normalise(self.min.y, self.max.y, p.y);
        let nx = Self::normalise(self.min.x, self.max.x, p.x);
        let row = (ny * (rows.saturating_sub(1)) as f64).round() as usize;
        let col = (nx * (cols.saturating_sub(1)) as f64).round() as usize;
        (row, col)
    }
}

/// Place a batch of books by embedding coordinate around the existing slots.
///
/// Books that already hold a slot, and repeated ids, are skipped. If the
/// grid has fewer free cells than the batch needs, whole shelves are
/// appended first. Returns the new slots in batch order.
pub fn place_by_embedding(
    design: &mut ShelfDesign,
    slots: &[ShelfSlot],
    batch: &[(BookId, Point2)],
) -> Result<Vec<ShelfSlot>> {
    if design.books_per_shelf == 0 {
        return Err(Error::InvalidConfig("books_per_shelf must be at least 1".into()));
    }
    if design.total_shelves == 0 {
        design.total_shelves = 1;
    }

    let mut placed: HashSet<&BookId> = slots.iter().map(|s| &s.book_id).collect();
    let mut pending: Vec<&(BookId, Point2)> = Vec::new();
    for entry in batch {
        if placed.insert(&entry.0) {
            pending.push(entry);
        }
    }
    if pending.is_empty() {
        return Ok(Vec::new());
    }

    let mut occupancy = Occupancy::from_slots(design, slots);
    let free = occupancy.free();
    if pending.len() > free {
        let cols = design.books_per_shelf;
        let extra = (pending.len() - free).div_ceil(cols);
        occupancy.grow(extra);
        design.total_shelves += extra;
        tracing::debug!(extra, total_shelves = design.total_shelves, "grew shelves for embedding batch");
    }

    let bounds = Bounds::of(pending.iter().copied().map(|(_, p)| p));
    let mut out = Vec::with_capacity(pending.len());
    for (id, point) in pending {
        let start = match &bounds {
            Some(b) => b.cell(point, occupancy.rows(), occupancy.cols()),
            None => (0, 0),
        };
        let (row, col) = ring_search(&occupancy, start)?;
        occupancy.occupy(row, col);
        out.push(ShelfSlot { book_id: id.clone(), row, col });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_order_center_first() {
        let cells: Vec<_> = ring(1, 1, 0, 3, 3).collect();
        assert_eq!(cells, vec![(1, 1)]);
        let cells: Vec<_> = ring(1, 1, 1, 3, 3).collect();
        assert_eq!(cells.len(), 8);
        assert_eq!(cells[0], (0, 0));
    }

    #[test]
    fn test_ring_clipped_at_corner() {
        let cells: Vec<_> = ring(0, 0, 1, 3, 3).collect();
        assert_eq!(cells, vec![(0, 1), (1, 0), (1, 1)]);
    }

    #[test]
    fn test_ring_search_free_start() {
        let occ = Occupancy::new(3, 3);
        assert_eq!(ring_search(&occ, (1, 1)).unwrap(), (1, 1));
    }

    #[test]
    fn test_ring_search_finds_nearest_ring() {
        let mut occ = Occupancy::new(5, 5);
        occ.occupy(2, 2);
        let (r, c) = ring_search(&occ, (2, 2)).unwrap();
        assert_eq!((r as isize - 2).abs().max((c as isize - 2).abs()), 1);
    }

    #[test]
    fn test_ring_search_reaches_far_corner() {
        let mut occ = Occupancy::new(3, 4);
        for r in 0..3 {
            for c in 0..4 {
                if (r, c) != (2, 3) {
                    occ.occupy(r, c);
                }
            }
        }
        assert_eq!(ring_search(&occ, (0, 0)).unwrap(), (2, 3));
    }

    #[test]
    fn test_ring_search_full_grid_fails_fast() {
        let mut occ = Occupancy::new(2, 2);
        for r in 0..2 {
            for c in 0..2 {
                occ.occupy(r, c);
            }
        }
        assert!(matches!(
            ring_search(&occ, (0, 0)),
            Err(Error::PlacementExhausted { capacity: 4, .. })
        ));
    }

    #[test]
    fn test_embedding_batch_resolves_collisions() {
        let mut design = ShelfDesign::new(3, 1);
        let batch: Vec<(BookId, Point2)> = vec![
            ("a".into(), Point2::new(0.0, 0.0)),
            ("b".into(), Point2::new(0.0, 0.0)),
            ("c".into(), Point2::new(1.0, 1.0)),
        ];
        let slots = place_by_embedding(&mut design, &[], &batch).unwrap();
        assert_eq!(slots.len(), 3);
        let cells: HashSet<_> = slots.iter().map(ShelfSlot::position).collect();
        assert_eq!(cells.len(), 3);
        assert_eq!(slots[0].position(), (0, 0));
        assert_eq!(slots[2].position(), (0, 2));
        assert_eq!(design.total_shelves, 1);
    }

    #[test]
    fn test_embedding_batch_grows_grid() {
        let mut design = ShelfDesign::new(2, 1);
        let existing = vec![ShelfSlot::new("x", 0, 0)];
        let batch: Vec<(BookId, Point2)> = (0..4)
            .map(|i| (BookId(format!("b{i}")), Point2::new(i as f64, 0.0)))
            .collect();
        let slots = place_by_embedding(&mut design, &existing, &batch).unwrap();
        assert_eq!(slots.len(), 4);
        assert_eq!(design.total_shelves, 3);
        for s in &slots {
            assert!(design.contains(s.row, s.col));
            assert_ne!(s.position(), (0, 0));
        }
    }

    #[test]
    fn test_embedding_batch_skips_placed_books() {
        let mut design = ShelfDesign::new(4, 1);
        let existing = vec![ShelfSlot::new("a", 0, 0)];
        let batch = vec![(BookId::from("a"), Point2::ORIGIN), (BookId::from("a"), Point2::ORIGIN)];
        assert!(place_by_embedding(&mut design, &existing, &batch).unwrap().is_empty());
    }
}
