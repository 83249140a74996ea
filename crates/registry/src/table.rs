//! Nested, string-keyed lookup tables of handlers.

use indexmap::IndexMap;
use indexmap::map::Iter;

/// One entry of a [`LookupTable`]: either a handler or a nested table.
#[derive(Debug, Clone, PartialEq)]
pub enum LookupNode<T> {
    Leaf(T),
    Branch(LookupTable<T>),
}

impl<T> LookupNode<T> {
    pub fn as_leaf(&self) -> Option<&T> {
        match self {
            LookupNode::Leaf(value) => Some(value),
            LookupNode::Branch(_) => None,
        }
    }

    pub fn as_branch(&self) -> Option<&LookupTable<T>> {
        match self {
            LookupNode::Leaf(_) => None,
            LookupNode::Branch(table) => Some(table),
        }
    }
}

/// A tree of handlers addressed by sequences of keys.
///
/// Keys are presented to users in insertion order. The tree is built by value,
/// so it cannot contain cycles.
#[derive(Debug, Clone, PartialEq)]
pub struct LookupTable<T> {
    entries: IndexMap<String, LookupNode<T>>,
}

impl<T> Default for LookupTable<T> {
    fn default() -> Self {
        Self { entries: IndexMap::new() }
    }
}

impl<T> LookupTable<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insertion of a handler.
    pub fn with_leaf(mut self, key: impl Into<String>, value: T) -> Self {
        self.insert(key, LookupNode::Leaf(value));
        self
    }

    /// Builder-style insertion of a nested table.
    pub fn with_branch(mut self, key: impl Into<String>, table: LookupTable<T>) -> Self {
        self.insert(key, LookupNode::Branch(table));
        self
    }

    /// Inserts `node` under `key`, returning the node it replaced. A replaced
    /// key keeps its original position.
    pub fn insert(&mut self, key: impl Into<String>, node: LookupNode<T>) -> Option<LookupNode<T>> {
        self.entries.insert(key.into(), node)
    }

    pub fn get(&self, key: &str) -> Option<&LookupNode<T>> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> Iter<'_, String, LookupNode<T>> {
        self.entries.iter()
    }

    /// Copies every top-level entry of `other` into this table. Entries with
    /// the same key are replaced wholesale; nested tables are not merged.
    pub fn merge_top_level(&mut self, other: LookupTable<T>) {
        self.entries.extend(other.entries);
    }
}

impl<'a, T> IntoIterator for &'a LookupTable<T> {
    type Item = (&'a String, &'a LookupNode<T>);
    type IntoIter = Iter<'a, String, LookupNode<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
