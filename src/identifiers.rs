use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// Identifier of an account or a list.
pub type AccountId = i64;

/// An ordered set of unique 64-bit identifiers.
///
/// Backed by a sorted vector: membership is a binary search. Live caches share it behind an
/// `Arc` and replace it wholesale, so a reader always holds a complete set.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<i64>", into = "Vec<i64>")]
pub struct IdentifierSet(Vec<i64>);

impl IdentifierSet {
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    #[inline]
    pub fn contains(&self, id: i64) -> bool {
        self.0.binary_search(&id).is_ok()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn first(&self) -> Option<i64> {
        self.0.first().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = i64> + '_ {
        self.0.iter().copied()
    }

    pub fn union(&self, other: &IdentifierSet) -> IdentifierSet {
        self.iter().merge(other.iter()).dedup().collect_vec().into()
    }
}

impl From<Vec<i64>> for IdentifierSet {
    fn from(mut values: Vec<i64>) -> Self {
        values.sort_unstable();
        values.dedup();
        Self(values)
    }
}

impl From<IdentifierSet> for Vec<i64> {
    fn from(set: IdentifierSet) -> Self {
        set.0
    }
}

impl FromIterator<i64> for IdentifierSet {
    fn from_iter<I: IntoIterator<Item = i64>>(iter: I) -> Self {
        Self(iter.into_iter().sorted_unstable().dedup().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_and_deduplicate_on_creation() {
        let set: IdentifierSet = vec![30, 10, 20, 10, 30].into();

        assert_eq!(vec![10, 20, 30], set.iter().collect_vec());
        assert_eq!(3, set.len());
    }

    #[test]
    fn can_test_membership() {
        let set: IdentifierSet = [10, 20, 30].into_iter().collect();

        assert!(set.contains(20));
        assert!(!set.contains(99));
    }

    #[test]
    fn empty_set_contains_nothing() {
        let set = IdentifierSet::new();

        assert!(set.is_empty());
        assert!(!set.contains(0));
        assert_eq!(None, set.first());
    }

    #[test]
    fn can_union_overlapping_sets() {
        let left: IdentifierSet = vec![1, 3, 5].into();
        let right: IdentifierSet = vec![2, 3, 6].into();

        assert_eq!(vec![1, 2, 3, 5, 6], left.union(&right).iter().collect_vec());
    }

    #[test]
    fn deserialize_from_an_unsorted_list() {
        let set: IdentifierSet = serde_json::from_str("[3, 1, 2, 1]").unwrap();

        assert_eq!(vec![1, 2, 3], set.iter().collect_vec());
    }
}
