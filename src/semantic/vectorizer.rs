//! TF-IDF text vectorizer.
//!
//! Tokens are lowercase alphanumeric runs of two or more characters with stop
//! words removed. The vocabulary keeps the `max_features` most frequent terms
//! across the corpus (ties broken by the term itself) and is indexed in
//! lexicographic order, so identical input always yields identical output.
//!
//! Weights are raw term counts times smoothed idf,
//! `ln((1 + n) / (1 + df)) + 1`, and every row is L2-normalised.

use hashbrown::{HashMap, HashSet};

// ============================================================================
// Sparse rows
// ============================================================================

/// Sparse row vector with strictly increasing indices.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SparseVector {
    pub indices: Vec<usize>,
    pub values: Vec<f64>,
}

impl SparseVector {
    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    pub fn norm(&self) -> f64 {
        self.values.iter().map(|v| v * v).sum::<f64>().sqrt()
    }

    pub fn dot(&self, other: &SparseVector) -> f64 {
        let (mut i, mut j, mut acc) = (0, 0, 0.0);
        while i < self.indices.len() && j < other.indices.len() {
            match self.indices[i].cmp(&other.indices[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    acc += self.values[i] * other.values[j];
                    i += 1;
                    j += 1;
                }
            }
        }
        acc
    }

    /// Cosine similarity; zero when either side is empty.
    pub fn cosine(&self, other: &SparseVector) -> f64 {
        let denom = self.norm() * other.norm();
        if denom == 0.0 { 0.0 } else { self.dot(other) / denom }
    }
}

/// Output of [`TfIdfVectorizer::fit_transform`]: one row per document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TfIdfMatrix {
    pub vocabulary: Vec<String>,
    pub idf: Vec<f64>,
    pub rows: Vec<SparseVector>,
}

impl TfIdfMatrix {
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_features(&self) -> usize {
        self.vocabulary.len()
    }
}

// ============================================================================
// Vectorizer
// ============================================================================

/// Split text into lowercase tokens, dropping short tokens and stop words.
pub fn tokenize(text: &str, stop_words: &HashSet<&str>) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() >= 2)
        .map(str::to_lowercase)
        .filter(|t| !stop_words.contains(t.as_str()))
        .collect()
}

#[derive(Debug, Clone)]
pub struct TfIdfVectorizer {
    max_features: usize,
    stop_words: HashSet<&'static str>,
}

impl TfIdfVectorizer {
    pub fn new(max_features: usize, stop_words: HashSet<&'static str>) -> Self {
        Self { max_features, stop_words }
    }

    /// Learn the vocabulary from `docs` and weight each of them.
    pub fn fit_transform<S: AsRef<str>>(&self, docs: &[S]) -> TfIdfMatrix {
        let counts: Vec<HashMap<String, usize>> = docs
            .iter()
            .map(|d| {
                let mut tf: HashMap<String, usize> = HashMap::new();
                for token in tokenize(d.as_ref(), &self.stop_words) {
                    *tf.entry(token).or_default() += 1;
                }
                tf
            })
            .collect();

        // corpus frequency and document frequency per term
        let mut corpus: HashMap<&str, (usize, usize)> = HashMap::new();
        for tf in &counts {
            for (term, &n) in tf {
                let entry = corpus.entry(term.as_str()).or_default();
                entry.0 += n;
                entry.1 += 1;
            }
        }

        let mut ranked: Vec<(&str, usize, usize)> = corpus.into_iter().map(|(t, (cf, df))| (t, cf, df)).collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked.truncate(self.max_features);
        ranked.sort_by(|a, b| a.0.cmp(b.0));

        let n_docs = docs.len() as f64;
        let index: HashMap<&str, usize> = ranked.iter().enumerate().map(|(i, (t, _, _))| (*t, i)).collect();
        let idf: Vec<f64> = ranked
            .iter()
            .map(|(_, _, df)| ((1.0 + n_docs) / (1.0 + *df as f64)).ln() + 1.0)
            .collect();

        let rows = counts
            .iter()
            .map(|tf| {
                let mut entries: Vec<(usize, f64)> = tf
                    .iter()
                    .filter_map(|(term, &n)| index.get(term.as_str()).map(|&i| (i, n as f64 * idf[i])))
                    .collect();
                entries.sort_by_key(|(i, _)| *i);
                let norm = entries.iter().map(|(_, v)| v * v).sum::<f64>().sqrt();
                let (indices, values) = entries
                    .into_iter()
                    .map(|(i, v)| (i, if norm > 0.0 { v / norm } else { v }))
                    .unzip();
                SparseVector { indices, values }
            })
            .collect();

        TfIdfMatrix {
            vocabulary: ranked.iter().map(|(t, _, _)| t.to_string()).collect(),
            idf,
            rows,
        }
    }
}
