//! Hash values: a mapping from field to value, both byte strings.

use crate::error::{Error, Result};
use std::collections::HashMap;

const STRUCT_OVERHEAD: usize = 32;
const ENTRY_OVERHEAD: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashVal(HashMap<Vec<u8>, Vec<u8>>);

impl HashVal {
    pub fn new() -> Self {
        HashVal(HashMap::new())
    }

    pub fn size(&self) -> usize {
        STRUCT_OVERHEAD
            + self
                .0
                .iter()
                .map(|(f, v)| f.len() + v.len() + ENTRY_OVERHEAD)
                .sum::<usize>()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &[u8]) -> Option<&Vec<u8>> {
        self.0.get(field)
    }

    pub fn exists(&self, field: &[u8]) -> bool {
        self.0.contains_key(field)
    }

    /// Returns whether `field` was newly created (true) or overwritten
    /// (false).
    pub fn set(&mut self, field: Vec<u8>, value: Vec<u8>) -> bool {
        self.0.insert(field, value).is_none()
    }

    /// `HSETNX`: set only if the field does not already exist. Returns
    /// whether the set happened.
    pub fn set_nx(&mut self, field: Vec<u8>, value: Vec<u8>) -> bool {
        if self.0.contains_key(&field) {
            false
        } else {
            self.0.insert(field, value);
            true
        }
    }

    /// Remove zero or more fields, returning the number actually removed.
    pub fn del(&mut self, fields: &[Vec<u8>]) -> usize {
        fields.iter().filter(|f| self.0.remove(*f).is_some()).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Vec<u8>, &Vec<u8>)> {
        self.0.iter()
    }

    fn parse_i64(bytes: &[u8]) -> Result<i64> {
        std::str::from_utf8(bytes)
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .ok_or(Error::NotANumber)
    }

    fn parse_f64(bytes: &[u8]) -> Result<f64> {
        std::str::from_utf8(bytes)
            .ok()
            .and_then(|s| s.parse::<f64>().ok())
            .filter(|f| f.is_finite())
            .ok_or(Error::NotANumber)
    }

    /// `HINCRBY`: integer increment, creating the field at `delta` if
    /// missing. Fails without mutation if the current value isn't numeric
    /// or the addition overflows.
    pub fn incr_by(&mut self, field: Vec<u8>, delta: i64) -> Result<i64> {
        let current = match self.0.get(&field) {
            Some(v) => Self::parse_i64(v)?,
            None => 0,
        };
        let next = current.checked_add(delta).ok_or(Error::NotANumber)?;
        self.0.insert(field, next.to_string().into_bytes());
        Ok(next)
    }

    /// `HINCRBYFLOAT`: float increment, creating the field at `delta` if
    /// missing.
    pub fn incr_by_float(&mut self, field: Vec<u8>, delta: f64) -> Result<f64> {
        let current = match self.0.get(&field) {
            Some(v) => Self::parse_f64(v)?,
            None => 0.0,
        };
        let next = current + delta;
        if !next.is_finite() {
            return Err(Error::NotANumber);
        }
        self.0.insert(field, format!("{next}").into_bytes());
        Ok(next)
    }
}

impl Default for HashVal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_reports_whether_field_was_new() {
        let mut h = HashVal::new();
        assert!(h.set(b"f".to_vec(), b"1".to_vec()));
        assert!(!h.set(b"f".to_vec(), b"2".to_vec()));
        assert_eq!(h.get(b"f"), Some(&b"2".to_vec()));
    }

    #[test]
    fn setnx_refuses_existing_field() {
        let mut h = HashVal::new();
        assert!(h.set_nx(b"f".to_vec(), b"1".to_vec()));
        assert!(!h.set_nx(b"f".to_vec(), b"2".to_vec()));
        assert_eq!(h.get(b"f"), Some(&b"1".to_vec()));
    }

    #[test]
    fn del_counts_only_existing_fields() {
        let mut h = HashVal::new();
        h.set(b"f1".to_vec(), b"v1".to_vec());
        assert_eq!(h.del(&[b"f1".to_vec(), b"f3".to_vec()]), 1);
        assert_eq!(h.len(), 0);
    }

    #[test]
    fn incr_by_creates_missing_field() {
        let mut h = HashVal::new();
        assert_eq!(h.incr_by(b"counter".to_vec(), 5).unwrap(), 5);
    }

    #[test]
    fn incr_by_on_non_numeric_fails() {
        let mut h = HashVal::new();
        h.set(b"f".to_vec(), b"abc".to_vec());
        assert!(matches!(h.incr_by(b"f".to_vec(), 1), Err(Error::NotANumber)));
    }
}
