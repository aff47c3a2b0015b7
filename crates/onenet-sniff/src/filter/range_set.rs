//! Sorted, disjoint, non-adjacent sets of inclusive `u64` ranges.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RangeError {
    #[error("value {value} is outside 0..={max}")]
    OutOfDomain { value: u64, max: u64 },
    #[error("range {lo}-{hi} is inverted")]
    Inverted { lo: u64, hi: u64 },
}

/// Accepted values of one filter field.
///
/// An empty set accepts everything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RangeSet {
    max: u64,
    ranges: Vec<(u64, u64)>,
}

impl RangeSet {
    /// Empty set over the domain `0..=max`.
    pub fn new(max: u64) -> Self {
        Self {
            max,
            ranges: Vec::new(),
        }
    }

    pub fn max(&self) -> u64 {
        self.max
    }

    pub fn ranges(&self) -> &[(u64, u64)] {
        &self.ranges
    }

    pub fn is_wildcard(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn clear(&mut self) {
        self.ranges.clear();
    }

    fn check(&self, lo: u64, hi: u64) -> Result<(), RangeError> {
        if lo > hi {
            return Err(RangeError::Inverted { lo, hi });
        }
        if hi > self.max {
            return Err(RangeError::OutOfDomain {
                value: hi,
                max: self.max,
            });
        }
        Ok(())
    }

    pub fn accept_value(&mut self, value: u64) -> Result<(), RangeError> {
        self.accept_range(value, value)
    }

    /// Adds `[lo, hi]`, merging with overlapping or adjacent ranges.
    pub fn accept_range(&mut self, lo: u64, hi: u64) -> Result<(), RangeError> {
        self.check(lo, hi)?;
        let (mut lo, mut hi) = (lo, hi);
        let mut merged = Vec::with_capacity(self.ranges.len() + 1);
        let mut placed = false;
        for &(a, b) in &self.ranges {
            if b.saturating_add(1) < lo {
                merged.push((a, b));
            } else if hi.saturating_add(1) < a {
                if !placed {
                    merged.push((lo, hi));
                    placed = true;
                }
                merged.push((a, b));
            } else {
                lo = lo.min(a);
                hi = hi.max(b);
            }
        }
        if !placed {
            merged.push((lo, hi));
        }
        self.ranges = merged;
        Ok(())
    }

    pub fn reject_value(&mut self, value: u64) -> Result<(), RangeError> {
        self.reject_range(value, value)
    }

    /// Removes `[lo, hi]`, splitting any straddling range.
    ///
    /// Rejecting from the wildcard set starts from the full domain. A reject
    /// that would leave nothing behind keeps "everything except `[lo, hi]`"
    /// unless it spans the full domain, which restores the wildcard.
    pub fn reject_range(&mut self, lo: u64, hi: u64) -> Result<(), RangeError> {
        self.check(lo, hi)?;
        if self.ranges.is_empty() {
            self.ranges.push((0, self.max));
        }
        let mut kept = Vec::with_capacity(self.ranges.len() + 1);
        for &(a, b) in &self.ranges {
            if b < lo || a > hi {
                kept.push((a, b));
                continue;
            }
            if a < lo {
                kept.push((a, lo - 1));
            }
            if b > hi {
                kept.push((hi + 1, b));
            }
        }
        if kept.is_empty() && !(lo == 0 && hi == self.max) {
            if lo > 0 {
                kept.push((0, lo - 1));
            }
            if hi < self.max {
                kept.push((hi + 1, self.max));
            }
        }
        self.ranges = kept;
        Ok(())
    }

    /// True for the wildcard set or when `value` lies in a stored range.
    pub fn contains(&self, value: u64) -> bool {
        if self.ranges.is_empty() {
            return true;
        }
        let idx = self.ranges.partition_point(|&(_, hi)| hi < value);
        self.ranges
            .get(idx)
            .is_some_and(|&(lo, hi)| lo <= value && value <= hi)
    }
}

impl fmt::Display for RangeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ranges.is_empty() {
            return f.write_str("any");
        }
        for (i, (lo, hi)) in self.ranges.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            if lo == hi {
                write!(f, "0x{lo:X}")?;
            } else {
                write!(f, "0x{lo:X}-0x{hi:X}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accept_merges_overlapping_and_adjacent_ranges() {
        let mut set = RangeSet::new(0xFFF);
        set.accept_range(10, 20).unwrap();
        set.accept_range(30, 40).unwrap();
        set.accept_value(21).unwrap();
        assert_eq!(set.ranges(), &[(10, 21), (30, 40)]);
        set.accept_range(22, 29).unwrap();
        assert_eq!(set.ranges(), &[(10, 40)]);
        set.accept_value(5).unwrap();
        assert_eq!(set.ranges(), &[(5, 5), (10, 40)]);
    }

    #[test]
    fn membership_after_accept_and_reject() {
        let mut set = RangeSet::new(0xFF);
        set.accept_range(10, 20).unwrap();
        assert!((10..=20).all(|v| set.contains(v)));
        assert!(!set.contains(9));
        assert!(!set.contains(21));

        set.reject_value(15).unwrap();
        assert!(!set.contains(15));
        assert!((10..=14).all(|v| set.contains(v)));
        assert!((16..=20).all(|v| set.contains(v)));
        assert_eq!(set.ranges(), &[(10, 14), (16, 20)]);
    }

    #[test]
    fn reject_on_wildcard_starts_from_full_domain() {
        let mut set = RangeSet::new(7);
        set.reject_range(2, 3).unwrap();
        assert_eq!(set.ranges(), &[(0, 1), (4, 7)]);
    }

    #[test]
    fn rejecting_the_last_range_keeps_its_complement() {
        let mut set = RangeSet::new(0xFF);
        set.accept_value(0x10).unwrap();
        set.reject_value(0x10).unwrap();
        assert_eq!(set.ranges(), &[(0, 0x0F), (0x11, 0xFF)]);
        assert!(!set.contains(0x10));
    }

    #[test]
    fn rejecting_the_full_domain_restores_wildcard() {
        let mut set = RangeSet::new(7);
        set.accept_range(1, 2).unwrap();
        set.reject_range(0, 7).unwrap();
        assert!(set.is_wildcard());
        assert!(set.contains(5));
    }

    #[test]
    fn single_point_range_differs_from_empty() {
        let mut set = RangeSet::new(0xFF);
        set.accept_value(3).unwrap();
        assert!(!set.is_wildcard());
        assert!(set.contains(3));
        assert!(!set.contains(4));
    }

    #[test]
    fn domain_and_order_are_checked() {
        let mut set = RangeSet::new(7);
        assert_eq!(set.accept_value(8), Err(RangeError::OutOfDomain { value: 8, max: 7 }));
        assert_eq!(set.reject_range(5, 2), Err(RangeError::Inverted { lo: 5, hi: 2 }));
        assert!(set.is_wildcard());
    }

    #[test]
    fn full_u64_domain_does_not_overflow() {
        let mut set = RangeSet::new(u64::MAX);
        set.accept_range(u64::MAX - 1, u64::MAX).unwrap();
        set.accept_value(0).unwrap();
        assert_eq!(set.ranges(), &[(0, 0), (u64::MAX - 1, u64::MAX)]);
        set.reject_value(u64::MAX).unwrap();
        assert_eq!(set.ranges(), &[(0, 0), (u64::MAX - 1, u64::MAX - 1)]);
        assert_eq!(set.to_string(), format!("0x0, 0x{:X}", u64::MAX - 1));
    }
}
