//! Dense symmetric distance matrices.

use crate::model::Point2;
use super::vectorizer::SparseVector;

#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix {
    n: usize,
    data: Vec<f64>,
}

impl DistanceMatrix {
    pub fn zeros(n: usize) -> Self {
        Self { n, data: vec![0.0; n * n] }
    }

    /// Build from a full row-major `n x n` table.
    pub fn from_rows(rows: &[Vec<f64>]) -> Self {
        let n = rows.len();
        let mut m = Self::zeros(n);
        for (i, row) in rows.iter().enumerate() {
            for (j, &d) in row.iter().enumerate().take(n) {
                m.data[i * n + j] = d;
            }
        }
        m
    }

    /// `1 - cosine` between TF-IDF rows, clipped to `[0, 1]`.
    pub fn cosine(rows: &[SparseVector]) -> Self {
        let n = rows.len();
        let mut m = Self::zeros(n);
        for i in 0..n {
            for j in (i + 1)..n {
                let d = (1.0 - rows[i].cosine(&rows[j])).clamp(0.0, 1.0);
                m.set(i, j, d);
            }
        }
        m
    }

    /// Euclidean distances between 2D points.
    pub fn euclidean(points: &[Point2]) -> Self {
        let n = points.len();
        let mut m = Self::zeros(n);
        for i in 0..n {
            for j in (i + 1)..n {
                m.set(i, j, points[i].distance(&points[j]));
            }
        }
        m
    }

    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[i * self.n + j]
    }

    /// Set both `(i, j)` and `(j, i)`.
    pub fn set(&mut self, i: usize, j: usize, d: f64) {
        self.data[i * self.n + j] = d;
        self.data[j * self.n + i] = d;
    }
}
