//! Metric multidimensional scaling (SMACOF).
//!
//! Projects an `n x n` distance matrix to `n` points in the plane so that
//! Euclidean distances approximate the input. Each of `n_init` runs starts
//! from uniform random coordinates drawn from one seeded generator; the run
//! with the lowest raw stress wins. A run stops after `max_iter` Guttman
//! transforms or once the normalised stress improves by less than
//! `tolerance`.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::GraphConfig;
use crate::model::Point2;
use super::distance::DistanceMatrix;

/// Smallest distance used as a divisor in the Guttman transform.
const MIN_DISTANCE: f64 = 1e-5;

#[derive(Debug, Clone)]
pub struct Mds {
    pub n_init: usize,
    pub max_iter: usize,
    pub tolerance: f64,
    pub seed: u64,
}

impl Default for Mds {
    fn default() -> Self {
        Self::from_config(&GraphConfig::default())
    }
}

/// Coordinates plus the raw stress they reached.
#[derive(Debug, Clone)]
pub struct MdsFit {
    pub points: Vec<Point2>,
    pub stress: f64,
    pub iterations: usize,
}

impl Mds {
    pub fn from_config(config: &GraphConfig) -> Self {
        Self {
            n_init: config.n_init.max(1),
            max_iter: config.max_iter.max(1),
            tolerance: config.tolerance,
            seed: config.seed,
        }
    }

    /// 2D coordinates for every row of `dissimilarities`.
    ///
    /// No rows gives no points; a single row sits at the origin.
    pub fn fit(&self, dissimilarities: &DistanceMatrix) -> Vec<Point2> {
        match dissimilarities.len() {
            0 => Vec::new(),
            1 => vec![Point2::ORIGIN],
            _ => self.fit_detailed(dissimilarities).points,
        }
    }

    pub fn fit_detailed(&self, dissimilarities: &DistanceMatrix) -> MdsFit {
        let n = dissimilarities.len();
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut best: Option<MdsFit> = None;

        for _ in 0..self.n_init {
            let init: Vec<Point2> = (0..n)
                .map(|_| Point2::new(rng.random::<f64>(), rng.random::<f64>()))
                .collect();
            let fit = self.smacof(dissimilarities, init);
            if best.as_ref().is_none_or(|b| fit.stress < b.stress) {
                best = Some(fit);
            }
        }

        best.unwrap_or(MdsFit { points: vec![Point2::ORIGIN; n], stress: 0.0, iterations: 0 })
    }

    fn smacof(&self, delta: &DistanceMatrix, mut x: Vec<Point2>) -> MdsFit {
        let n = x.len();
        let mut old_stress: Option<f64> = None;
        let mut stress = 0.0;
        let mut iterations = 0;

        for _ in 0..self.max_iter {
            iterations += 1;
            let dis = DistanceMatrix::euclidean(&x);

            stress = 0.0;
            for i in 0..n {
                for j in (i + 1)..n {
                    let diff = dis.get(i, j) - delta.get(i, j);
                    stress += diff * diff;
                }
            }

            // Guttman transform: X <- B(X) X / n
            let mut next = vec![Point2::ORIGIN; n];
            for i in 0..n {
                let mut row_sum = 0.0;
                let (mut bx, mut by) = (0.0, 0.0);
                for j in 0..n {
                    if i == j {
                        continue;
                    }
                    let ratio = delta.get(i, j) / dis.get(i, j).max(MIN_DISTANCE);
                    row_sum += ratio;
                    bx -= ratio * x[j].x;
                    by -= ratio * x[j].y;
                }
                next[i].x = (bx + row_sum * x[i].x) / n as f64;
                next[i].y = (by + row_sum * x[i].y) / n as f64;
            }
            x = next;

            let scale: f64 = x.iter().map(|p| (p.x * p.x + p.y * p.y).sqrt()).sum();
            if scale <= 0.0 {
                break;
            }
            let normalised = stress / scale;
            if let Some(old) = old_stress {
                if old - normalised < self.tolerance {
                    break;
                }
            }
            old_stress = Some(normalised);
        }

        MdsFit { points: x, stress, iterations }
    }
}
