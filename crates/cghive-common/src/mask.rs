//! CPU / NUMA node mask handling in the kernel's list format.
//!
//! `cpuset.cpus` and `cpuset.mems` print masks as comma-separated ranges
//! (`0-3,7`). The setters need to parse the active mask, intersect it with
//! a request, and print the result back in the same format.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A mask string that could not be parsed.
#[derive(Debug, Error)]
#[error("invalid mask {input:?}")]
pub struct MaskParseError {
    /// The rejected input.
    pub input: String,
}

/// A set of CPU or NUMA node indices.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuMask(BTreeSet<u32>);

impl CpuMask {
    /// An empty mask.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeSet::new())
    }

    /// Whether no bit is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether the given index is set.
    #[must_use]
    pub fn contains(&self, bit: u32) -> bool {
        self.0.contains(&bit)
    }

    /// The intersection of two masks.
    #[must_use]
    pub fn intersect(&self, other: &Self) -> Self {
        Self(self.0.intersection(&other.0).copied().collect())
    }

    /// Whether every bit of `self` is also set in `other`.
    #[must_use]
    pub fn is_subset(&self, other: &Self) -> bool {
        self.0.is_subset(&other.0)
    }
}

impl FromIterator<u32> for CpuMask {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl FromStr for CpuMask {
    type Err = MaskParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || MaskParseError { input: s.into() };
        let mut bits = BTreeSet::new();
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Ok(Self(bits));
        }
        for part in trimmed.split(',') {
            match part.split_once('-') {
                Some((lo, hi)) => {
                    let lo: u32 = lo.trim().parse().map_err(|_| err())?;
                    let hi: u32 = hi.trim().parse().map_err(|_| err())?;
                    if lo > hi {
                        return Err(err());
                    }
                    bits.extend(lo..=hi);
                }
                None => {
                    let _ = bits.insert(part.trim().parse().map_err(|_| err())?);
                }
            }
        }
        Ok(Self(bits))
    }
}

impl fmt::Display for CpuMask {
    /// Prints the mask back in compact range notation.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        let mut iter = self.0.iter().copied().peekable();
        while let Some(start) = iter.next() {
            let mut end = start;
            while iter.peek() == Some(&(end + 1)) {
                end = iter.next().unwrap_or(end);
            }
            if !first {
                f.write_str(",")?;
            }
            first = false;
            if start == end {
                write!(f, "{start}")?;
            } else {
                write!(f, "{start}-{end}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_values_and_ranges() {
        let mask: CpuMask = "0-3,7".parse().expect("parse");
        assert!(mask.contains(0) && mask.contains(3) && mask.contains(7));
        assert!(!mask.contains(4));
    }

    #[test]
    fn empty_string_is_empty_mask() {
        let mask: CpuMask = "".parse().expect("parse");
        assert!(mask.is_empty());
    }

    #[test]
    fn rejects_garbage_and_inverted_ranges() {
        assert!("cpus".parse::<CpuMask>().is_err());
        assert!("5-2".parse::<CpuMask>().is_err());
    }

    #[test]
    fn display_compacts_ranges() {
        let mask: CpuMask = [0, 1, 2, 3, 7].into_iter().collect();
        assert_eq!(mask.to_string(), "0-3,7");
        let single: CpuMask = [5].into_iter().collect();
        assert_eq!(single.to_string(), "5");
    }

    #[test]
    fn intersection_narrows_to_common_bits() {
        let active: CpuMask = [0, 1, 2, 3].into_iter().collect();
        let requested: CpuMask = [1, 2, 5].into_iter().collect();
        let both = requested.intersect(&active);
        assert_eq!(both.to_string(), "1-2");
        assert!(!requested.is_subset(&active));
    }
}
