//! # Classification Grouper
//!
//! Partitions books into shelf groups keyed by their most specific
//! classification code, so that related books end up side by side.
//!
//! Codes are hierarchical: `"913.6"` is narrower than `"913"`, which is
//! narrower than `"91"` and `"9"`. The hierarchy is kept as an explicit
//! parent-pointer table ([`ClassificationTree`]); a code the table does not
//! know resolves to its nearest registered ancestor.
//!
//! | Book has                        | Group key                 |
//! |---------------------------------|---------------------------|
//! | a code resolving in the tree    | `GroupKey::Code`          |
//! | no code, a category label       | `GroupKey::Category`      |
//! | neither                         | `GroupKey::Unclassified`  |
//!
//! Output order is stable: groups sorted by key (codes, then categories,
//! then the unclassified bucket), members sorted by title then id.

use std::collections::BTreeMap;

use hashbrown::{HashMap, HashSet};
use serde::{Deserialize, Serialize};

use crate::model::{Book, BookId};

/// Display name of the fallback bucket.
pub const UNCLASSIFIED: &str = "unclassified";

// ============================================================================
// Group keys
// ============================================================================

/// Key a shelf group is sorted and labelled by.
///
/// Variant order matters: derived `Ord` puts every code before every
/// category, and the unclassified bucket last.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GroupKey {
    Code(String),
    Category(String),
    Unclassified,
}

impl GroupKey {
    pub fn label(&self) -> &str {
        match self {
            GroupKey::Code(c) => c,
            GroupKey::Category(c) => c,
            GroupKey::Unclassified => UNCLASSIFIED,
        }
    }
}

impl std::fmt::Display for GroupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// Code hierarchy
// ============================================================================

/// Parent of a classification code: drop the last significant character.
///
/// `"913.6" -> "913"`, `"913" -> "91"`, `"9" -> None`.
pub fn parent_code(code: &str) -> Option<&str> {
    let trimmed = code.trim().trim_end_matches('.');
    let (last, _) = trimmed.char_indices().next_back()?;
    if last == 0 {
        return None;
    }
    let parent = trimmed[..last].trim_end_matches('.');
    if parent.is_empty() { None } else { Some(parent) }
}

/// Hierarchy level of a code: `"9"` is 1, `"913"` is 3, `"913.6"` is 4.
pub fn code_depth(code: &str) -> usize {
    code.trim().chars().filter(|c| *c != '.').count()
}

/// Parent-pointer table over classification codes.
#[derive(Debug, Clone, Default)]
pub struct ClassificationTree {
    /// code → parent code (None for top-level codes)
    parents: HashMap<String, Option<String>>,
}

impl ClassificationTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a tree holding every code of every book, plus their ancestors.
    pub fn from_books(books: &[Book]) -> Self {
        let mut tree = Self::new();
        for book in books {
            for code in &book.classification_codes {
                tree.insert(code);
            }
        }
        tree
    }

    /// Register a code and all of its ancestors.
    pub fn insert(&mut self, code: &str) {
        let mut current = code.trim().trim_end_matches('.');
        while !current.is_empty() && !self.parents.contains_key(current) {
            let parent = parent_code(current);
            self.parents.insert(current.to_string(), parent.map(str::to_string));
            match parent {
                Some(p) => current = p,
                None => break,
            }
        }
    }

    pub fn contains(&self, code: &str) -> bool {
        self.parents.contains_key(code.trim().trim_end_matches('.'))
    }

    pub fn parent(&self, code: &str) -> Option<&str> {
        self.parents.get(code.trim().trim_end_matches('.'))?.as_deref()
    }

    pub fn len(&self) -> usize {
        self.parents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }

    /// Nearest registered code at or above `code`.
    pub fn resolve<'a>(&'a self, code: &str) -> Option<&'a str> {
        let mut current = Some(code.trim().trim_end_matches('.'));
        while let Some(c) = current {
            if let Some((key, _)) = self.parents.get_key_value(c) {
                return Some(key.as_str());
            }
            current = parent_code(c);
        }
        None
    }

    /// Every registered code with its parent, sorted by code.
    pub fn entries(&self) -> Vec<(&str, Option<&str>)> {
        let mut out: Vec<(&str, Option<&str>)> = self
            .parents
            .iter()
            .map(|(code, parent)| (code.as_str(), parent.as_deref()))
            .collect();
        out.sort_unstable();
        out
    }

    /// `code` followed by its registered ancestors, narrowest first.
    pub fn lineage<'a>(&'a self, code: &str) -> Vec<&'a str> {
        let mut out = Vec::new();
        let mut current = self.resolve(code);
        while let Some(c) = current {
            out.push(c);
            current = self.parent(c).and_then(|p| self.parents.get_key_value(p)).map(|(k, _)| k.as_str());
        }
        out
    }
}

// ============================================================================
// Grouper
// ============================================================================

/// One shelf group: a key plus its members in shelf order.
#[derive(Debug, Clone, PartialEq)]
pub struct BookGroup {
    pub key: GroupKey,
    pub books: Vec<Book>,
}

impl BookGroup {
    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }
}

/// Groups books for shelf adjacency.
#[derive(Debug, Clone)]
pub struct Grouper {
    tree: Option<ClassificationTree>,
    by_category: bool,
}

impl Default for Grouper {
    fn default() -> Self {
        Self { tree: None, by_category: true }
    }
}

impl Grouper {
    /// Grouper that derives the code hierarchy from the books themselves.
    pub fn new() -> Self {
        Self::default()
    }

    /// Grouper bound to a known classification scheme.
    pub fn with_tree(mut self, tree: ClassificationTree) -> Self {
        self.tree = Some(tree);
        self
    }

    pub fn by_category(mut self, enabled: bool) -> Self {
        self.by_category = enabled;
        self
    }

    /// Partition `books` into ordered groups. Duplicate ids keep the first record.
    pub fn group(&self, books: &[Book]) -> Vec<BookGroup> {
        let derived;
        let tree = match &self.tree {
            Some(t) => t,
            None => {
                derived = ClassificationTree::from_books(books);
                &derived
            }
        };

        let mut seen: HashSet<&BookId> = HashSet::new();
        let mut groups: BTreeMap<GroupKey, Vec<Book>> = BTreeMap::new();
        for book in books {
            if !seen.insert(&book.id) {
                continue;
            }
            let key = self.key_for(tree, book);
            groups.entry(key).or_default().push(book.clone());
        }

        groups
            .into_iter()
            .map(|(key, mut books)| {
                books.sort_by(|a, b| a.title.cmp(&b.title).then_with(|| a.id.cmp(&b.id)));
                BookGroup { key, books }
            })
            .collect()
    }

    fn key_for(&self, tree: &ClassificationTree, book: &Book) -> GroupKey {
        let best = book
            .classification_codes
            .iter()
            .filter_map(|code| tree.resolve(code))
            .min_by(|a, b| code_depth(b).cmp(&code_depth(a)).then_with(|| a.cmp(b)));
        if let Some(code) = best {
            return GroupKey::Code(code.to_string());
        }
        if self.by_category {
            if let Some(cat) = book.categories.iter().map(|c| c.trim()).find(|c| !c.is_empty()) {
                return GroupKey::Category(cat.to_string());
            }
        }
        GroupKey::Unclassified
    }
}
