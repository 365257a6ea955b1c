//! Knowledge graph DTOs.

use serde::{Deserialize, Serialize};
use super::BookId;

/// A book positioned in the 2D embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: BookId,
    pub x: f64,
    pub y: f64,
    pub categories: Vec<String>,
    pub title: String,
    pub authors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover: Option<String>,
}

/// Why two books are connected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// Mutual nearest neighbours in the embedding.
    Similarity,
    /// Both books list the same category.
    SharedCategory,
}

/// Weighted undirected edge, stored with an arbitrary but stable orientation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: BookId,
    pub target: BookId,
    pub weight: f64,
    pub kind: EdgeKind,
    /// The shared category for `SharedCategory` edges.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl GraphEdge {
    /// True if this edge joins `a` and `b` in either orientation.
    pub fn connects(&self, a: &BookId, b: &BookId) -> bool {
        (&self.source == a && &self.target == b) || (&self.source == b && &self.target == a)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct KnowledgeGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl KnowledgeGraph {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: &BookId) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| &n.id == id)
    }

    pub fn edges_of_kind(&self, kind: EdgeKind) -> impl Iterator<Item = &GraphEdge> {
        self.edges.iter().filter(move |e| e.kind == kind)
    }

    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
