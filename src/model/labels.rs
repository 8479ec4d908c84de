//! Unordered label sets used as stream identity
//!
//! Members are kept sorted by key then value with duplicates removed, so two sets built
//! from the same labels in any order compare equal. The combination hash is computed once
//! at construction since sets are hashed on every grouped event.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use super::label::Label;

#[derive(Debug, Clone, Default)]
pub struct LabelSet {
    labels: Vec<Label>,
    hash: u64,
}

impl LabelSet {
    pub fn new(labels: impl IntoIterator<Item = Label>) -> Self {
        let mut labels: Vec<Label> = labels.into_iter().collect();
        labels.sort();
        labels.dedup();

        // Commutative fold: the result does not depend on member order.
        let hash = labels.iter().fold(0u64, |acc, label| {
            let mut hasher = DefaultHasher::new();
            label.hash(&mut hasher);
            acc.wrapping_add(hasher.finish())
        });

        Self { labels, hash }
    }

    /// The set with no labels
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn contains(&self, label: &Label) -> bool {
        self.labels.binary_search(label).is_ok()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Label> {
        self.labels.iter()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl PartialEq for LabelSet {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash && self.labels == other.labels
    }
}

impl Eq for LabelSet {}

impl Hash for LabelSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

impl FromIterator<Label> for LabelSet {
    fn from_iter<I: IntoIterator<Item = Label>>(iter: I) -> Self {
        Self::new(iter)
    }
}

impl<'a> IntoIterator for &'a LabelSet {
    type Item = &'a Label;
    type IntoIter = std::slice::Iter<'a, Label>;

    fn into_iter(self) -> Self::IntoIter {
        self.labels.iter()
    }
}
