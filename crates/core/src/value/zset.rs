//! Sorted set values: members ordered ascending by score, ties broken by
//! member bytes lexicographically.

use crate::error::{Error, Result};
use std::collections::BTreeSet;
use std::collections::HashMap;

const STRUCT_OVERHEAD: usize = 32;
const ELEMENT_OVERHEAD: usize = 24;

/// Total order over scores, used only to keep the rank-ordered index. NaN is
/// rejected before a score ever reaches this wrapper.
#[derive(Debug, Clone, Copy, PartialEq)]
struct OrderedScore(f64);

impl Eq for OrderedScore {}

impl PartialOrd for OrderedScore {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrderedScore {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.total_cmp(&other.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ZSetVal {
    scores: HashMap<Vec<u8>, f64>,
    /// Rank order: (score, member) ascending, ties broken by member bytes.
    ranked: BTreeSet<(OrderedScore, Vec<u8>)>,
}

impl ZSetVal {
    pub fn new() -> Self {
        ZSetVal {
            scores: HashMap::new(),
            ranked: BTreeSet::new(),
        }
    }

    pub fn size(&self) -> usize {
        STRUCT_OVERHEAD
            + self
                .scores
                .keys()
                .map(|m| m.len() + ELEMENT_OVERHEAD)
                .sum::<usize>()
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    fn check_score(score: f64) -> Result<()> {
        if score.is_nan() {
            Err(Error::NotANumber)
        } else {
            Ok(())
        }
    }

    /// Set (replacing any existing score for) `member`. Returns whether the
    /// member was newly added.
    pub fn insert(&mut self, member: Vec<u8>, score: f64) -> Result<bool> {
        Self::check_score(score)?;
        match self.scores.insert(member.clone(), score) {
            Some(old) => {
                self.ranked.remove(&(OrderedScore(old), member.clone()));
                self.ranked.insert((OrderedScore(score), member));
                Ok(false)
            }
            None => {
                self.ranked.insert((OrderedScore(score), member));
                Ok(true)
            }
        }
    }

    pub fn score(&self, member: &[u8]) -> Option<f64> {
        self.scores.get(member).copied()
    }

    /// `ZINCRBY`: returns the new score. Fails without mutation if the
    /// result would be NaN (e.g. `+inf + -inf`).
    pub fn incr_by(&mut self, member: Vec<u8>, delta: f64) -> Result<f64> {
        let current = self.scores.get(&member).copied().unwrap_or(0.0);
        let next = current + delta;
        Self::check_score(next)?;
        self.insert(member, next)?;
        Ok(next)
    }

    /// Remove zero or more members, returning the number actually removed.
    pub fn remove(&mut self, members: &[Vec<u8>]) -> usize {
        let mut removed = 0;
        for member in members {
            if let Some(score) = self.scores.remove(member) {
                self.ranked.remove(&(OrderedScore(score), member.clone()));
                removed += 1;
            }
        }
        removed
    }

    /// Ascending rank order: `(member, score)`.
    pub fn iter_by_rank(&self) -> impl Iterator<Item = (&Vec<u8>, f64)> {
        self.ranked.iter().map(|(s, m)| (m, s.0))
    }

    /// 0-based ascending rank, or `None` if the member is absent.
    pub fn rank(&self, member: &[u8]) -> Option<usize> {
        let score = self.scores.get(member)?;
        self.ranked
            .iter()
            .position(|(s, m)| s.0 == *score && m == member)
    }

    /// 0-based descending rank, or `None` if the member is absent.
    pub fn rev_rank(&self, member: &[u8]) -> Option<usize> {
        let rank = self.rank(member)?;
        Some(self.ranked.len() - 1 - rank)
    }

    /// Inclusive rank range, ascending order. Negative indices count from
    /// the end, as with list ranges.
    pub fn range_by_rank(&self, start: i64, stop: i64) -> Vec<(Vec<u8>, f64)> {
        let len = self.ranked.len() as i64;
        if len == 0 {
            return Vec::new();
        }
        let norm = |i: i64| -> i64 {
            if i < 0 {
                (len + i).max(0)
            } else {
                i
            }
        };
        let start = norm(start).max(0);
        let stop = norm(stop).min(len - 1);
        if start > stop || start >= len {
            return Vec::new();
        }
        self.ranked
            .iter()
            .skip(start as usize)
            .take((stop - start + 1) as usize)
            .map(|(s, m)| (m.clone(), s.0))
            .collect()
    }

    /// Inclusive rank range, descending order (highest score first).
    pub fn rev_range_by_rank(&self, start: i64, stop: i64) -> Vec<(Vec<u8>, f64)> {
        let len = self.ranked.len();
        if len == 0 {
            return Vec::new();
        }
        let norm = |i: i64| -> i64 {
            let len = len as i64;
            if i < 0 {
                (len + i).max(0)
            } else {
                i
            }
        };
        let start = norm(start).max(0) as usize;
        let stop_n = norm(stop).min(len as i64 - 1);
        if start as i64 > stop_n {
            return Vec::new();
        }
        let stop_n = stop_n as usize;
        self.ranked
            .iter()
            .rev()
            .skip(start)
            .take(stop_n - start + 1)
            .map(|(s, m)| (m.clone(), s.0))
            .collect()
    }

    /// Inclusive score range, ascending order.
    pub fn range_by_score(&self, min: f64, max: f64) -> Vec<(Vec<u8>, f64)> {
        self.ranked
            .iter()
            .filter(|(s, _)| s.0 >= min && s.0 <= max)
            .map(|(s, m)| (m.clone(), s.0))
            .collect()
    }
}

impl Default for ZSetVal {
    fn default() -> Self {
        Self::new()
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// `range_by_rank(0, -1)` must always come back sorted ascending by
        /// (score, member-bytes), for any insertion order and any finite
        /// scores — the invariant a ranked-range query depends on.
        #[test]
        fn range_by_rank_full_is_always_sorted_ascending(
            pairs in proptest::collection::vec(
                (proptest::collection::vec(any::<u8>(), 1..8), -1e6f64..1e6f64),
                0..40,
            )
        ) {
            let mut z = ZSetVal::new();
            for (member, score) in pairs {
                z.insert(member, score).unwrap();
            }
            let full = z.range_by_rank(0, -1);
            for window in full.windows(2) {
                let (m0, s0) = &window[0];
                let (m1, s1) = &window[1];
                prop_assert!((s0, m0) <= (s1, m1));
            }
            prop_assert_eq!(full.len(), z.len());
        }
    }
}
