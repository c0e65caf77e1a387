use std::cmp::Ordering;

use rust_decimal::Decimal;

/// Total order over a ranking key.
pub trait SortKey {
    fn compare(&self, other: &Self) -> Ordering;
}

impl SortKey for f64 {
    fn compare(&self, other: &Self) -> Ordering {
        self.total_cmp(other)
    }
}

impl SortKey for Decimal {
    fn compare(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }
}

/// Entities in descending key order. Equal keys keep their input order.
#[derive(Clone, Debug, PartialEq)]
pub struct Ranking<T> {
    ordered: Vec<T>,
}

impl<T: Clone> Ranking<T> {
    /// Ranks a copy of `items`; the input slice is left untouched.
    pub fn rank_by<K, F>(items: &[T], key: F) -> Self
    where
        K: SortKey,
        F: Fn(&T) -> K,
    {
        let mut ordered = items.to_vec();
        // sort_by is stable, which is what keeps ties in aggregation order
        ordered.sort_by(|left, right| key(right).compare(&key(left)));
        Self { ordered }
    }

    pub fn top(&self, n: usize) -> Vec<T> {
        self.ordered.iter().take(n).cloned().collect()
    }

    /// Last `n` entities, still in descending order.
    pub fn bottom(&self, n: usize) -> Vec<T> {
        let start = self.ordered.len().saturating_sub(n);
        self.ordered[start..].to_vec()
    }
}

impl<T> Ranking<T> {
    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.ordered
    }

    pub fn into_vec(self) -> Vec<T> {
        self.ordered
    }
}
