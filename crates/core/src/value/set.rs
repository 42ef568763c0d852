//! Set values: an unordered collection of unique byte strings.

use std::collections::HashSet;

const STRUCT_OVERHEAD: usize = 32;
const ELEMENT_OVERHEAD: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetVal(HashSet<Vec<u8>>);

impl SetVal {
    pub fn new() -> Self {
        SetVal(HashSet::new())
    }

    pub fn size(&self) -> usize {
        STRUCT_OVERHEAD
            + self
                .0
                .iter()
                .map(|m| m.len() + ELEMENT_OVERHEAD)
                .sum::<usize>()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Vec<u8>> {
        self.0.iter()
    }

    /// Insert `member`, returning whether it was newly added.
    pub fn insert(&mut self, member: Vec<u8>) -> bool {
        self.0.insert(member)
    }

    /// Add zero or more members, returning the number newly added.
    pub fn add_multi(&mut self, members: &[Vec<u8>]) -> usize {
        members.iter().filter(|m| self.0.insert((*m).clone())).count()
    }

    /// Remove zero or more members, returning the number actually removed.
    pub fn remove_multi(&mut self, members: &[Vec<u8>]) -> usize {
        members.iter().filter(|m| self.0.remove(*m)).count()
    }

    pub fn is_member(&self, member: &[u8]) -> bool {
        self.0.contains(member)
    }

    pub fn members(&self) -> Vec<Vec<u8>> {
        self.0.iter().cloned().collect()
    }

    /// Remove and return an arbitrary member.
    pub fn random_pop(&mut self) -> Option<Vec<u8>> {
        let member = self.0.iter().next().cloned()?;
        self.0.remove(&member);
        Some(member)
    }

    pub fn diff(&self, others: &[&SetVal]) -> Vec<Vec<u8>> {
        self.0
            .iter()
            .filter(|m| !others.iter().any(|o| o.is_member(m)))
            .cloned()
            .collect()
    }

    pub fn inter(&self, others: &[&SetVal]) -> Vec<Vec<u8>> {
        self.0
            .iter()
            .filter(|m| others.iter().all(|o| o.is_member(m)))
            .cloned()
            .collect()
    }

    pub fn union(&self, others: &[&SetVal]) -> Vec<Vec<u8>> {
        let mut out: HashSet<Vec<u8>> = self.0.clone();
        for o in others {
            out.extend(o.0.iter().cloned());
        }
        out.into_iter().collect()
    }
}

impl Default for SetVal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_of(items: &[&str]) -> SetVal {
        let mut s = SetVal::new();
        for i in items {
            s.insert(i.as_bytes().to_vec());
        }
        s
    }

    #[test]
    fn add_multi_counts_only_new_members() {
        let mut s = set_of(&["a"]);
        let added = s.add_multi(&[b"a".to_vec(), b"b".to_vec()]);
        assert_eq!(added, 1);
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn diff_excludes_members_present_in_others() {
        let a = set_of(&["a", "b", "c"]);
        let b = set_of(&["b"]);
        let mut diff = a.diff(&[&b]);
        diff.sort();
        assert_eq!(diff, vec![b"a".to_vec(), b"c".to_vec()]);
    }

    #[test]
    fn inter_keeps_only_common_members() {
        let a = set_of(&["a", "b", "c"]);
        let b = set_of(&["b", "c", "d"]);
        let mut inter = a.inter(&[&b]);
        inter.sort();
        assert_eq!(inter, vec![b"b".to_vec(), b"c".to_vec()]);
    }

    #[test]
    fn union_merges_without_duplicates() {
        let a = set_of(&["a", "b"]);
        let b = set_of(&["b", "c"]);
        let mut union = a.union(&[&b]);
        union.sort();
        assert_eq!(union, vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]);
    }

    #[test]
    fn random_pop_removes_the_returned_member() {
        let mut s = set_of(&["only"]);
        let popped = s.random_pop().unwrap();
        assert_eq!(popped, b"only");
        assert!(s.is_empty());
    }
}
