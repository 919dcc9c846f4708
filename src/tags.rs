//! Tag handling shared by the lifecycle operations.
//!
//! Tags flow through three layers: the user's `tags`, the provider's
//! `default_tags`, and what the service actually reports. System tags (keys
//! starting with `aws:`) belong to the service and are never managed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::client::MemoryDbApi;
use crate::error::ApiError;

/// A tag map. Ordered so state output is stable.
pub type Tags = BTreeMap<String, String>;

/// Prefix reserved for service-managed tags.
pub const SYSTEM_TAG_PREFIX: &str = "aws:";

/// Tag keys the provider should never surface or manage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IgnoreTagsConfig {
    /// Exact keys to ignore.
    #[serde(default)]
    pub keys: Vec<String>,
    /// Key prefixes to ignore.
    #[serde(default)]
    pub key_prefixes: Vec<String>,
}

impl IgnoreTagsConfig {
    /// Whether `key` matches an ignored key or prefix.
    pub fn is_ignored(&self, key: &str) -> bool {
        self.keys.iter().any(|k| k == key)
            || self.key_prefixes.iter().any(|p| key.starts_with(p.as_str()))
    }
}

/// Whether the key is a service-managed tag.
pub fn is_system_tag(key: &str) -> bool {
    key.starts_with(SYSTEM_TAG_PREFIX)
}

/// Merge resource tags over the provider defaults. Resource tags win.
pub fn merge_default_tags(defaults: &Tags, tags: &Tags) -> Tags {
    let mut merged = defaults.clone();
    merged.extend(tags.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
}

/// Drop system tags and anything matched by the ignore configuration.
pub fn filter_ignored(tags: Tags, ignore: &IgnoreTagsConfig) -> Tags {
    tags.into_iter()
        .filter(|(k, _)| !is_system_tag(k) && !ignore.is_ignored(k))
        .collect()
}

/// Remove entries that are exactly the provider default, leaving the tags the
/// user must have declared on the resource.
pub fn remove_default_tags(tags: &Tags, defaults: &Tags) -> Tags {
    tags.iter()
        .filter(|(k, v)| defaults.get(*k) != Some(*v))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// The remote calls needed to move a resource's tags from `old` to `new`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagChanges {
    /// Keys to untag.
    pub remove: Vec<String>,
    /// Keys to add or overwrite.
    pub set: Tags,
}

impl TagChanges {
    /// Whether no call is needed.
    pub fn is_empty(&self) -> bool {
        self.remove.is_empty() && self.set.is_empty()
    }
}

/// Compute tag changes, skipping system tags on both sides.
pub fn diff_tags(old: &Tags, new: &Tags) -> TagChanges {
    let remove = old
        .keys()
        .filter(|k| !is_system_tag(k) && !new.contains_key(*k))
        .cloned()
        .collect();

    let set = new
        .iter()
        .filter(|(k, v)| !is_system_tag(k) && old.get(*k) != Some(*v))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    TagChanges { remove, set }
}

/// Apply the difference between `old` and `new` to the resource at `arn`.
///
/// Removals are issued before additions.
pub async fn update_tags<C>(client: &C, arn: &str, old: &Tags, new: &Tags) -> Result<(), ApiError>
where
    C: MemoryDbApi + ?Sized,
{
    let changes = diff_tags(old, new);

    if !changes.remove.is_empty() {
        debug!(arn, keys = ?changes.remove, "Removing tags");
        client.untag_resource(arn, changes.remove).await?;
    }

    if !changes.set.is_empty() {
        debug!(arn, count = changes.set.len(), "Updating tags");
        client.tag_resource(arn, changes.set).await?;
    }

    Ok(())
}
