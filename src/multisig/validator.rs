//! Group configuration rules
//!
//! Applied when a group is created and again on every owner or threshold
//! change. All broken rules are reported together.

use crate::core::Address;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Minimum owners in a group
pub const MIN_OWNERS: usize = 2;

/// Maximum owners in a group
pub const MAX_OWNERS: usize = 11;

/// A single broken configuration rule
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Violation {
    /// Fewer than [`MIN_OWNERS`] owners
    TooFewOwners { count: usize },
    /// More than [`MAX_OWNERS`] owners
    TooManyOwners { count: usize },
    /// Threshold of zero
    ZeroThreshold,
    /// Threshold larger than the owner count
    ThresholdExceedsOwners { threshold: u8, owners: usize },
    /// Owner listed more than once
    DuplicateOwner(Address),
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::TooFewOwners { count } => {
                write!(f, "need at least {} owners, got {}", MIN_OWNERS, count)
            }
            Violation::TooManyOwners { count } => {
                write!(f, "at most {} owners allowed, got {}", MAX_OWNERS, count)
            }
            Violation::ZeroThreshold => write!(f, "threshold must be at least 1"),
            Violation::ThresholdExceedsOwners { threshold, owners } => {
                write!(f, "threshold {} exceeds owner count {}", threshold, owners)
            }
            Violation::DuplicateOwner(owner) => write!(f, "duplicate owner {}", owner),
        }
    }
}

/// Every rule a configuration broke
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationErrors(Vec<Violation>);

impl ValidationErrors {
    pub fn violations(&self) -> &[Violation] {
        &self.0
    }

    pub fn contains(&self, violation: &Violation) -> bool {
        self.0.contains(violation)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rules: Vec<String> = self.0.iter().map(|v| v.to_string()).collect();
        f.write_str(&rules.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

/// List every rule broken by `(owners, threshold)`
pub fn violations(owners: &[Address], threshold: u8) -> Vec<Violation> {
    let mut found = Vec::new();

    if owners.len() < MIN_OWNERS {
        found.push(Violation::TooFewOwners {
            count: owners.len(),
        });
    }
    if owners.len() > MAX_OWNERS {
        found.push(Violation::TooManyOwners {
            count: owners.len(),
        });
    }

    if threshold == 0 {
        found.push(Violation::ZeroThreshold);
    } else if threshold as usize > owners.len() {
        found.push(Violation::ThresholdExceedsOwners {
            threshold,
            owners: owners.len(),
        });
    }

    // Report each duplicated owner once, in first-seen order
    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    for owner in owners {
        if !seen.insert(*owner) && reported.insert(*owner) {
            found.push(Violation::DuplicateOwner(*owner));
        }
    }

    found
}

/// Check `(owners, threshold)` against every rule
pub fn validate(owners: &[Address], threshold: u8) -> Result<(), ValidationErrors> {
    let found = violations(owners, threshold);
    if found.is_empty() {
        Ok(())
    } else {
        Err(ValidationErrors(found))
    }
}
