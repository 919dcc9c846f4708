//! Resource name generation.
//!
//! When neither `name` nor `name_prefix` is configured the group gets a
//! generated name. Generated names carry a fixed-width unique suffix so the
//! prefix can be recovered on read and import.

use std::sync::atomic::{AtomicU32, Ordering};

use chrono::{Timelike, Utc};

/// Prefix used when the user gives neither a name nor a prefix.
pub const UNIQUE_ID_PREFIX: &str = "hemmer-";

/// Length of the suffix appended by [`prefixed_unique_id`].
pub const UNIQUE_ID_SUFFIX_LENGTH: usize = TIMESTAMP_LENGTH + COUNTER_LENGTH;

const TIMESTAMP_LENGTH: usize = 18;
const COUNTER_LENGTH: usize = 8;

static COUNTER: AtomicU32 = AtomicU32::new(0);

/// `prefix` followed by a timestamp and a process-wide counter.
///
/// The suffix is lowercase digits and hex, so it is a valid name tail.
pub fn prefixed_unique_id(prefix: &str) -> String {
    let now = Utc::now();
    let counter = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!(
        "{}{}{:04}{:08x}",
        prefix,
        now.format("%Y%m%d%H%M%S"),
        now.nanosecond() % 1_000_000_000 / 100_000,
        counter
    )
}

/// Pick the group name from the configured `name` and `name_prefix`.
pub fn resolve_name(name: Option<&str>, name_prefix: Option<&str>) -> String {
    match (name, name_prefix) {
        (Some(name), _) if !name.is_empty() => name.to_string(),
        (_, Some(prefix)) if !prefix.is_empty() => prefixed_unique_id(prefix),
        _ => prefixed_unique_id(UNIQUE_ID_PREFIX),
    }
}

/// Recover the prefix from a name built by [`prefixed_unique_id`].
///
/// Returns `None` for names without a well-formed suffix or with an empty prefix.
pub fn name_prefix_from_name(name: &str) -> Option<String> {
    if name.len() <= UNIQUE_ID_SUFFIX_LENGTH || !name.is_ascii() {
        return None;
    }

    let (prefix, suffix) = name.split_at(name.len() - UNIQUE_ID_SUFFIX_LENGTH);
    let (timestamp, counter) = suffix.split_at(TIMESTAMP_LENGTH);

    let well_formed = timestamp.bytes().all(|b| b.is_ascii_digit())
        && counter
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));

    well_formed.then(|| prefix.to_string())
}
