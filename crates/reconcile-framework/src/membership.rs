//! # Set Reconciler
//!
//! Set-valued attributes (team usernames, ...) are reconciled with add/remove calls
//! instead of a full replace. [`diff`] computes the minimal [`MembershipDelta`]
//! between what the user declared and what the API reported:
//!
//! ```rust
//! use reconcile_framework::membership::{diff, MemberSet};
//!
//! let desired = MemberSet::from_iter(["alice", "bob"]);
//! let observed = MemberSet::from_iter(["bob", "carol"]);
//! let delta = diff(&desired, &observed);
//!
//! assert_eq!(delta.to_add, MemberSet::from_iter(["alice"]));
//! assert_eq!(delta.to_remove, MemberSet::from_iter(["carol"]));
//! ```
//!
//! Insertion order is never meaningful. A side of the delta that is empty must not
//! produce a remote call; the controller checks `to_add` and `to_remove` separately
//! and skips the call for an empty side.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// An unordered set of member names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberSet(BTreeSet<String>);

impl MemberSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, member: &str) -> bool {
        self.0.contains(member)
    }

    /// Members of `self` that are not in `other`.
    pub fn difference(&self, other: &MemberSet) -> MemberSet {
        Self(self.0.difference(&other.0).cloned().collect())
    }

    pub fn union(&self, other: &MemberSet) -> MemberSet {
        Self(self.0.union(&other.0).cloned().collect())
    }

    pub fn is_subset(&self, other: &MemberSet) -> bool {
        self.0.is_subset(&other.0)
    }

    pub fn is_disjoint(&self, other: &MemberSet) -> bool {
        self.0.is_disjoint(&other.0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for MemberSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl Extend<String> for MemberSet {
    fn extend<I: IntoIterator<Item = String>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

impl IntoIterator for MemberSet {
    type Item = String;
    type IntoIter = std::collections::btree_set::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Members to add and remove to turn the observed set into the desired one.
///
/// Invariants: `to_add ∩ observed = ∅`, `to_remove ⊆ observed`, `to_add ∩ to_remove = ∅`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MembershipDelta {
    pub to_add: MemberSet,
    pub to_remove: MemberSet,
}

impl MembershipDelta {
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

/// Computes `to_add = desired − observed` and `to_remove = observed − desired`.
pub fn diff(desired: &MemberSet, observed: &MemberSet) -> MembershipDelta {
    MembershipDelta {
        to_add: desired.difference(observed),
        to_remove: observed.difference(desired),
    }
}
