//! String values: a byte sequence with integer/float increment helpers.

use crate::error::{Error, Result};

/// Engine-visible overhead charged per value in [`ValueData::size`]
/// estimates, on top of the element bytes themselves.
const STRUCT_OVERHEAD: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringVal(pub Vec<u8>);

impl StringVal {
    pub fn new(bytes: Vec<u8>) -> Self {
        StringVal(bytes)
    }

    pub fn size(&self) -> usize {
        STRUCT_OVERHEAD + self.0.len()
    }

    pub fn get(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Append `suffix`, returning the new total length.
    pub fn append(&mut self, suffix: &[u8]) -> usize {
        self.0.extend_from_slice(suffix);
        self.0.len()
    }

    fn parse_i64(&self) -> Result<i64> {
        std::str::from_utf8(&self.0)
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .ok_or(Error::NotANumber)
    }

    fn parse_f64(&self) -> Result<f64> {
        std::str::from_utf8(&self.0)
            .ok()
            .and_then(|s| s.parse::<f64>().ok())
            .filter(|f| f.is_finite())
            .ok_or(Error::NotANumber)
    }

    /// Integer increment by `delta`, signed 64-bit arithmetic. Overflow or a
    /// non-integer current value yields `NotANumber` without modifying the
    /// value.
    pub fn incr_by(&mut self, delta: i64) -> Result<i64> {
        let current = if self.0.is_empty() { 0 } else { self.parse_i64()? };
        let next = current.checked_add(delta).ok_or(Error::NotANumber)?;
        self.0 = next.to_string().into_bytes();
        Ok(next)
    }

    /// Float increment by `delta`. Stores the shortest exact decimal so the
    /// textual form round-trips. A non-finite result yields `NotANumber`
    /// without modifying the value.
    pub fn incr_by_float(&mut self, delta: f64) -> Result<f64> {
        let current = if self.0.is_empty() { 0.0 } else { self.parse_f64()? };
        let next = current + delta;
        if !next.is_finite() {
            return Err(Error::NotANumber);
        }
        self.0 = format_float(next).into_bytes();
        Ok(next)
    }
}

/// Shortest round-tripping decimal, trimming a trailing `.0` the way Redis
/// renders integral float results.
fn format_float(f: f64) -> String {
    let s = format!("{f}");
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incr_by_creates_missing_value_at_delta() {
        let mut v = StringVal::new(Vec::new());
        assert_eq!(v.incr_by(1).unwrap(), 1);
        assert_eq!(v.get(), b"1");
    }

    #[test]
    fn incr_by_on_non_numeric_fails_without_mutation() {
        let mut v = StringVal::new(b"not-a-number".to_vec());
        let before = v.get().to_vec();
        assert!(matches!(v.incr_by(1), Err(Error::NotANumber)));
        assert_eq!(v.get(), &before[..]);
    }

    #[test]
    fn incr_by_overflow_is_not_a_number() {
        let mut v = StringVal::new(i64::MAX.to_string().into_bytes());
        assert!(matches!(v.incr_by(1), Err(Error::NotANumber)));
    }

    #[test]
    fn incr_by_float_round_trips_shortest_decimal() {
        let mut v = StringVal::new(b"10.5".to_vec());
        let result = v.incr_by_float(0.1).unwrap();
        assert!((result - 10.6).abs() < 1e-9);
    }

    #[test]
    fn append_returns_new_length() {
        let mut v = StringVal::new(b"hello".to_vec());
        assert_eq!(v.append(b" world"), 11);
        assert_eq!(v.get(), b"hello world");
    }
}
