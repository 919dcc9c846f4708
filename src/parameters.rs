//! Parameter sets and the pure parts of parameter reconciliation.
//!
//! The functions here do no I/O: [`diff`] decides which parameters must be
//! reset or written, and [`effective_parameters`] decides which of a group's
//! parameters are worth showing to the user. The remote side lives in
//! [`crate::reconcile`].

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::client::{ParameterNameValue, RemoteParameter};

/// Prefix of the service-owned group holding a family's default values.
pub const DEFAULT_GROUP_PREFIX: &str = "default.";

/// Maps a family to the name of the group that holds its defaults.
pub type DefaultsNaming = fn(&str) -> String;

/// Name of the service-owned parameter group holding the defaults for `family`.
///
/// The service has no API for family defaults; the `default.<family>` naming,
/// with underscores turned into hyphens, is observed behavior only.
pub fn default_parameter_group_name(family: &str) -> String {
    format!("{}{}", DEFAULT_GROUP_PREFIX, family.replace('_', "-"))
}

/// Anything with a name and a value that can be reconciled as a set.
pub trait NameValue {
    /// The key the set is unique on.
    fn name(&self) -> &str;
    /// The value compared between old and new.
    fn value(&self) -> &str;
}

/// A declared parameter of a parameter group.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Parameter {
    /// Parameter name.
    pub name: String,
    /// Parameter value.
    pub value: String,
}

impl Parameter {
    /// Create a parameter.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl NameValue for Parameter {
    fn name(&self) -> &str {
        &self.name
    }

    fn value(&self) -> &str {
        &self.value
    }
}

impl From<Parameter> for ParameterNameValue {
    fn from(p: Parameter) -> Self {
        ParameterNameValue {
            name: p.name,
            value: p.value,
        }
    }
}

/// Result of comparing an old and a new parameter set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Changes<T> {
    /// Entries present before and gone now, to be reset to their defaults.
    pub reset: Vec<T>,
    /// Entries that are new or whose value changed.
    pub apply: Vec<T>,
}

impl<T> Changes<T> {
    /// Whether there is nothing to do.
    pub fn is_empty(&self) -> bool {
        self.reset.is_empty() && self.apply.is_empty()
    }
}

impl<T> Default for Changes<T> {
    fn default() -> Self {
        Self {
            reset: Vec::new(),
            apply: Vec::new(),
        }
    }
}

/// Changes between two declared parameter sets.
pub type ParameterChanges = Changes<Parameter>;

/// Compare an old and a new set keyed by name.
///
/// Duplicate names within one input keep the last entry. Both outputs are
/// sorted by name and never share a name.
pub fn diff<T>(old: &[T], new: &[T]) -> Changes<T>
where
    T: NameValue + Clone,
{
    let old_by_name: BTreeMap<&str, &T> = old.iter().map(|p| (p.name(), p)).collect();
    let new_by_name: BTreeMap<&str, &T> = new.iter().map(|p| (p.name(), p)).collect();

    let reset = old_by_name
        .iter()
        .filter(|(name, _)| !new_by_name.contains_key(*name))
        .map(|(_, p)| (*p).clone())
        .collect();

    let apply = new_by_name
        .iter()
        .filter(|(name, p)| match old_by_name.get(*name) {
            Some(old) => old.value() != p.value(),
            None => true,
        })
        .map(|(_, p)| (*p).clone())
        .collect();

    Changes { reset, apply }
}

/// Select the parameters of a group worth surfacing.
///
/// A parameter is kept when its value differs from the family default (a
/// missing default counts as the empty string) or when its name is in
/// `declared`. Parameters without a value are dropped. Names are lowercased
/// and the result is sorted by name.
pub fn effective_parameters(
    defaults: &[RemoteParameter],
    current: Vec<RemoteParameter>,
    declared: &BTreeSet<String>,
) -> Vec<Parameter> {
    let default_by_name: BTreeMap<String, &str> = defaults
        .iter()
        .map(|p| (p.name.to_lowercase(), p.value.as_deref().unwrap_or_default()))
        .collect();

    let mut result: Vec<Parameter> = current
        .into_iter()
        .filter_map(|p| {
            let value = p.value?;
            let name = p.name.to_lowercase();
            let default = default_by_name.get(&name).copied().unwrap_or_default();

            if value != default || declared.contains(&name) {
                Some(Parameter { name, value })
            } else {
                None
            }
        })
        .collect();

    result.sort();
    result
}

/// The declared set with lowercased names, matching how names read back.
pub fn normalize_names(parameters: &[Parameter]) -> Vec<Parameter> {
    parameters
        .iter()
        .map(|p| Parameter::new(p.name.to_lowercase(), p.value.clone()))
        .collect()
}

/// The lowercased names of a declared parameter set.
pub fn declared_names(parameters: &[Parameter]) -> BTreeSet<String> {
    parameters.iter().map(|p| p.name.to_lowercase()).collect()
}
