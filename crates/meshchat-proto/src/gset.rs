//! Insertion-ordered grow-only set used for replicated user and channel names.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::hash::Hash;

/// A grow-only set that remembers the order elements were first seen.
///
/// Membership checks go through a hash set; listing walks the ordered
/// sequence. Merging is a union by value equality, so re-applying the same
/// elements is a no-op and merging sets in any order yields the same
/// membership.
///
/// # Example
///
/// ```rust
/// use meshchat_proto::gset::OrderedSet;
///
/// let mut local: OrderedSet<String> = OrderedSet::new();
/// local.insert("alice".to_string());
///
/// let added = local.merge(["bob".to_string(), "alice".to_string()]);
/// assert_eq!(added, 1);
/// assert_eq!(local.to_vec(), vec!["alice", "bob"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<T>", into = "Vec<T>")]
#[serde(bound(
    serialize = "T: Serialize + Clone + Eq + Hash",
    deserialize = "T: Deserialize<'de> + Clone + Eq + Hash"
))]
pub struct OrderedSet<T>
where
    T: Clone + Eq + Hash,
{
    order: Vec<T>,
    index: HashSet<T>,
}

impl<T> Default for OrderedSet<T>
where
    T: Clone + Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> OrderedSet<T>
where
    T: Clone + Eq + Hash,
{
    /// Creates a new empty set.
    #[must_use]
    pub fn new() -> Self {
        Self {
            order: Vec::new(),
            index: HashSet::new(),
        }
    }

    /// Inserts an element at the end of the listing order.
    ///
    /// Returns `true` if the element was not already present.
    pub fn insert(&mut self, value: T) -> bool {
        if self.index.contains(&value) {
            return false;
        }
        self.index.insert(value.clone());
        self.order.push(value);
        true
    }

    /// Returns `true` if the set contains the given value.
    pub fn contains(&self, value: &T) -> bool {
        self.index.contains(value)
    }

    /// Returns the number of elements in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns `true` if the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Iterates in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.order.iter()
    }

    /// Copies the elements out in first-seen order.
    #[must_use]
    pub fn to_vec(&self) -> Vec<T> {
        self.order.clone()
    }

    /// Unions `items` into this set, appending unseen values in the order given.
    ///
    /// Returns how many elements were added.
    pub fn merge<I>(&mut self, items: I) -> usize
    where
        I: IntoIterator<Item = T>,
    {
        items
            .into_iter()
            .filter(|item| self.insert(item.clone()))
            .count()
    }
}

impl<T> FromIterator<T> for OrderedSet<T>
where
    T: Clone + Eq + Hash,
{
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = Self::new();
        set.merge(iter);
        set
    }
}

impl<T> From<Vec<T>> for OrderedSet<T>
where
    T: Clone + Eq + Hash,
{
    fn from(items: Vec<T>) -> Self {
        items.into_iter().collect()
    }
}

impl<T> From<OrderedSet<T>> for Vec<T>
where
    T: Clone + Eq + Hash,
{
    fn from(set: OrderedSet<T>) -> Self {
        set.order
    }
}
