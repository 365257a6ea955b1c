//! Engine configuration.
//!
//! Every field has a default, so a partial JSON document is enough:
//!
//! ```rust
//! use bookshelf_graph::EngineConfig;
//!
//! let config = EngineConfig::from_json_str(r#"{"graph": {"k": 5}}"#).unwrap();
//! assert_eq!(config.graph.k, 5);
//! assert_eq!(config.layout.default_books_per_shelf, 10);
//! ```

use serde::{Deserialize, Serialize};

use crate::model::shelf::DEFAULT_BOOKS_PER_SHELF;
use crate::{Error, Result};

// ============================================================================
// Layout
// ============================================================================

/// How incremental placement chooses among free cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum PlacementPolicy {
    /// First free cell in row-major order.
    #[default]
    FirstFit,
    /// Uniformly random free cell. `None` seeds from the OS.
    Random { seed: Option<u64> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Column bound used when the design is created lazily.
    pub default_books_per_shelf: usize,
    pub placement: PlacementPolicy,
    /// Fall back to the first category label for books without a code.
    pub group_by_category: bool,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            default_books_per_shelf: DEFAULT_BOOKS_PER_SHELF,
            placement: PlacementPolicy::default(),
            group_by_category: true,
        }
    }
}

// ============================================================================
// Semantic graph
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Neighbours considered per node for mutual-KNN edges.
    pub k: usize,
    /// Added to distances before inverting them into weights.
    pub epsilon: f64,
    /// Vocabulary cap for TF-IDF.
    pub max_features: usize,
    pub shared_category_weight: f64,
    /// Seed for the MDS random starts.
    pub seed: u64,
    /// Number of SMACOF restarts; the lowest-stress one wins.
    pub n_init: usize,
    pub max_iter: usize,
    /// Relative stress improvement below which SMACOF stops.
    pub tolerance: f64,
    pub cache: bool,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            k: 3,
            epsilon: 1e-6,
            max_features: 5000,
            shared_category_weight: 0.5,
            seed: 42,
            n_init: 4,
            max_iter: 300,
            tolerance: 1e-3,
            cache: true,
        }
    }
}

// ============================================================================
// Engine
// ============================================================================

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub layout: LayoutConfig,
    pub graph: GraphConfig,
}

impl EngineConfig {
    /// Parse and validate a JSON configuration document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.layout.default_books_per_shelf == 0 {
            return Err(Error::InvalidConfig("default_books_per_shelf must be at least 1".into()));
        }
        let g = &self.graph;
        if g.k == 0 {
            return Err(Error::InvalidConfig("k must be at least 1".into()));
        }
        if g.max_features == 0 {
            return Err(Error::InvalidConfig("max_features must be at least 1".into()));
        }
        if !(g.epsilon > 0.0) {
            return Err(Error::InvalidConfig(format!("epsilon must be positive, got {}", g.epsilon)));
        }
        if g.n_init == 0 || g.max_iter == 0 {
            return Err(Error::InvalidConfig("n_init and max_iter must be at least 1".into()));
        }
        Ok(())
    }
}
