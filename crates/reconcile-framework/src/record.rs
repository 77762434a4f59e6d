//! # Records
//!
//! Flat attribute records exchanged between the configuration layer, the drivers and
//! the API client.
//!
//! - [`DesiredRecord`]: what the user declared. Immutable for one reconciliation call.
//! - [`RemoteRecord`]: what the API reported, keyed by a [`ResourceHandle`]. Never
//!   mutated in place; every read produces a fresh one.
//! - [`Attributes`]: the ordered attribute map both records share. Driver options
//!   and wire payloads use the same shape.

use crate::membership::MemberSet;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Opaque remote identifier. The sole key for Read/Update/Delete.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceHandle(String);

impl ResourceHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ResourceHandle {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ResourceHandle {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A typed attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttrValue {
    String(String),
    Bool(bool),
    Set(MemberSet),
    Blocks(Vec<Attributes>),
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::String(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::String(value)
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        AttrValue::Bool(value)
    }
}

impl From<MemberSet> for AttrValue {
    fn from(value: MemberSet) -> Self {
        AttrValue::Set(value)
    }
}

impl From<Vec<Attributes>> for AttrValue {
    fn from(value: Vec<Attributes>) -> Self {
        AttrValue::Blocks(value)
    }
}

/// Ordered mapping of attribute name to value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes(BTreeMap<String, AttrValue>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<AttrValue>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        match self.0.get(name) {
            Some(AttrValue::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.0.get(name) {
            Some(AttrValue::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn get_set(&self, name: &str) -> Option<&MemberSet> {
        match self.0.get(name) {
            Some(AttrValue::Set(set)) => Some(set),
            _ => None,
        }
    }

    pub fn get_blocks(&self, name: &str) -> Option<&[Attributes]> {
        match self.0.get(name) {
            Some(AttrValue::Blocks(blocks)) => Some(blocks),
            _ => None,
        }
    }

    /// Copies `name` from `source` when present there.
    pub fn copy_from(&mut self, source: &Attributes, name: &str) {
        if let Some(value) = source.get(name) {
            self.0.insert(name.to_string(), value.clone());
        }
    }

    /// Adds every attribute of `other` that is not already present.
    pub fn merge_missing(&mut self, other: &Attributes) {
        for (name, value) in &other.0 {
            self.0.entry(name.clone()).or_insert_with(|| value.clone());
        }
    }

    /// Names whose value in `self` differs from `previous`.
    ///
    /// An attribute present only in `previous` counts as changed (it was cleared).
    pub fn changed_from(&self, previous: &Attributes) -> BTreeSet<String> {
        let mut changed: BTreeSet<String> = self
            .0
            .iter()
            .filter(|(name, value)| previous.get(name) != Some(*value))
            .map(|(name, _)| name.clone())
            .collect();
        changed.extend(
            previous
                .0
                .keys()
                .filter(|name| !self.0.contains_key(*name))
                .cloned(),
        );
        changed
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &AttrValue)> {
        self.0.iter()
    }
}

impl<K: Into<String>, V: Into<AttrValue>> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// The declared configuration for one resource instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesiredRecord {
    pub kind: String,
    pub attributes: Attributes,
}

impl DesiredRecord {
    pub fn new(kind: impl Into<String>, attributes: Attributes) -> Self {
        Self {
            kind: kind.into(),
            attributes,
        }
    }
}

/// The last observed remote state of one resource instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteRecord {
    pub kind: String,
    pub handle: ResourceHandle,
    pub attributes: Attributes,
}

impl RemoteRecord {
    pub fn new(kind: impl Into<String>, handle: ResourceHandle, attributes: Attributes) -> Self {
        Self {
            kind: kind.into(),
            handle,
            attributes,
        }
    }
}
