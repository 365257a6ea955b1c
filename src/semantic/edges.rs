//! Edge builders for the knowledge graph.
//!
//! - **Similarity**: mutual k-nearest neighbours. `i` and `j` are joined only
//!   when each lists the other among its `k` closest points, which keeps a
//!   single central book from collecting edges to everything around it.
//!   Weight is `1 / (distance + epsilon)`.
//! - **Shared category**: every pair of books listing the same category,
//!   with a fixed weight and the category as label.

use std::collections::BTreeMap;

use hashbrown::HashSet;
use smallvec::SmallVec;

use crate::model::{Book, BookId, EdgeKind, GraphEdge};
use super::distance::DistanceMatrix;

type Neighbours = SmallVec<[usize; 4]>;

/// The `k` nearest other rows of each row, nearest first, ties by index.
pub fn nearest_neighbours(dist: &DistanceMatrix, k: usize) -> Vec<Neighbours> {
    let n = dist.len();
    (0..n)
        .map(|i| {
            let mut others: Vec<(f64, usize)> = (0..n).filter(|&j| j != i).map(|j| (dist.get(i, j), j)).collect();
            others.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
            others.into_iter().take(k).map(|(_, j)| j).collect()
        })
        .collect()
}

/// Unordered mutual-KNN pairs `(i, j, distance)`, each emitted once, with
/// `i` the row whose neighbour list produced the pair first.
pub fn mutual_knn_pairs(dist: &DistanceMatrix, k: usize) -> Vec<(usize, usize, f64)> {
    let neighbours = nearest_neighbours(dist, k);
    let mut seen: HashSet<(usize, usize)> = HashSet::new();
    let mut pairs = Vec::new();
    for (i, js) in neighbours.iter().enumerate() {
        for &j in js {
            if !neighbours[j].contains(&i) {
                continue;
            }
            if seen.insert((i.min(j), i.max(j))) {
                pairs.push((i, j, dist.get(i, j)));
            }
        }
    }
    pairs
}

/// Similarity edges between `ids`, positioned by `dist`.
pub fn similarity_edges(ids: &[&BookId], dist: &DistanceMatrix, k: usize, epsilon: f64) -> Vec<GraphEdge> {
    mutual_knn_pairs(dist, k)
        .into_iter()
        .map(|(i, j, d)| GraphEdge {
            source: ids[i].clone(),
            target: ids[j].clone(),
            weight: 1.0 / (d + epsilon),
            kind: EdgeKind::Similarity,
            label: None,
        })
        .collect()
}

/// Shared-category edges, categories in lexicographic order, pairs in book order.
pub fn shared_category_edges(books: &[&Book], weight: f64) -> Vec<GraphEdge> {
    let mut by_category: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (idx, book) in books.iter().enumerate() {
        let mut own: HashSet<&str> = HashSet::new();
        for cat in book.categories.iter().map(|c| c.trim()).filter(|c| !c.is_empty()) {
            if own.insert(cat) {
                by_category.entry(cat).or_default().push(idx);
            }
        }
    }

    let mut edges = Vec::new();
    for (category, members) in by_category {
        for (a, &i) in members.iter().enumerate() {
            for &j in &members[a + 1..] {
                edges.push(GraphEdge {
                    source: books[i].id.clone(),
                    target: books[j].id.clone(),
                    weight,
                    kind: EdgeKind::SharedCategory,
                    label: Some(category.to_string()),
                });
            }
        }
    }
    edges
}
