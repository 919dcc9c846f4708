//! Configuration validation.
//!
//! Checks run before planning and report every problem at once as
//! [`Diagnostic`]s rather than stopping at the first one.
//!
//! # Example
//!
//! ```
//! use hemmer_provider_memorydb::config::ParameterGroupConfig;
//! use hemmer_provider_memorydb::validation::validate_parameter_group_config;
//!
//! let config = ParameterGroupConfig::new("memorydb_redis6").with_name("My--Group");
//! let diagnostics = validate_parameter_group_config(&config);
//! assert_eq!(diagnostics.len(), 1);
//! assert_eq!(diagnostics[0].attribute, Some("name".to_string()));
//! ```

use std::collections::HashSet;

use crate::config::{ParameterGroupConfig, ProviderConfig};
use crate::naming::UNIQUE_ID_SUFFIX_LENGTH;
use crate::schema::Diagnostic;
use crate::tags::is_system_tag;

/// Longest allowed group name.
pub const MAX_NAME_LENGTH: usize = 255;

/// Longest allowed name prefix, leaving room for the generated suffix.
pub const MAX_NAME_PREFIX_LENGTH: usize = MAX_NAME_LENGTH - UNIQUE_ID_SUFFIX_LENGTH;

fn check_name_characters(value: &str, max_len: usize) -> Result<(), String> {
    if value.is_empty() || value.len() > max_len {
        return Err(format!("must be between 1 and {} characters", max_len));
    }
    if !value
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
    {
        return Err("only lowercase alphanumeric characters and hyphens allowed".to_string());
    }
    if value.starts_with('-') {
        return Err("may not begin with a hyphen".to_string());
    }
    if value.contains("--") {
        return Err("may not contain two consecutive hyphens".to_string());
    }
    Ok(())
}

/// Check a parameter group name.
pub fn validate_name(name: &str) -> Result<(), String> {
    check_name_characters(name, MAX_NAME_LENGTH)?;
    if name.ends_with('-') {
        return Err("may not end with a hyphen".to_string());
    }
    Ok(())
}

/// Check a name prefix. Unlike a full name it may end with a hyphen.
pub fn validate_name_prefix(prefix: &str) -> Result<(), String> {
    check_name_characters(prefix, MAX_NAME_PREFIX_LENGTH)
}

/// Check a user-managed tag key.
pub fn validate_tag_key(key: &str) -> Result<(), String> {
    if key.is_empty() {
        return Err("tag keys may not be empty".to_string());
    }
    if is_system_tag(key) {
        return Err(format!("tag keys may not begin with {:?}", crate::tags::SYSTEM_TAG_PREFIX));
    }
    Ok(())
}

/// Validate a parameter group configuration.
///
/// An empty result means the configuration is acceptable.
pub fn validate_parameter_group_config(config: &ParameterGroupConfig) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    if config.family.trim().is_empty() {
        diagnostics.push(
            Diagnostic::error("Missing required attribute")
                .with_detail("family must be set")
                .with_attribute("family"),
        );
    }

    if config.name.is_some() && config.name_prefix.is_some() {
        diagnostics.push(
            Diagnostic::error("Conflicting attributes")
                .with_detail("name and name_prefix cannot both be set")
                .with_attribute("name_prefix"),
        );
    }

    if let Some(name) = &config.name {
        if let Err(detail) = validate_name(name) {
            diagnostics.push(
                Diagnostic::error("Invalid name")
                    .with_detail(detail)
                    .with_attribute("name"),
            );
        }
    }

    if let Some(prefix) = &config.name_prefix {
        if let Err(detail) = validate_name_prefix(prefix) {
            diagnostics.push(
                Diagnostic::error("Invalid name_prefix")
                    .with_detail(detail)
                    .with_attribute("name_prefix"),
            );
        }
    }

    let mut seen = HashSet::new();
    for (i, parameter) in config.parameter.iter().enumerate() {
        let path = format!("parameter.{}", i);
        if parameter.name.is_empty() {
            diagnostics.push(
                Diagnostic::error("Missing parameter name").with_attribute(format!("{}.name", path)),
            );
        } else if !seen.insert(parameter.name.to_lowercase()) {
            diagnostics.push(
                Diagnostic::error("Duplicate parameter")
                    .with_detail(format!("parameter {:?} is declared more than once", parameter.name))
                    .with_attribute(format!("{}.name", path)),
            );
        }
        if parameter.value.is_empty() {
            diagnostics.push(
                Diagnostic::error("Missing parameter value")
                    .with_attribute(format!("{}.value", path)),
            );
        }
    }

    for key in config.tags.keys() {
        if let Err(detail) = validate_tag_key(key) {
            diagnostics.push(
                Diagnostic::error("Invalid tag key")
                    .with_detail(detail)
                    .with_attribute(format!("tags.{}", key)),
            );
        }
    }

    diagnostics
}

/// Validate the provider configuration.
pub fn validate_provider_config(config: &ProviderConfig) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    for key in config.default_tags.keys() {
        if let Err(detail) = validate_tag_key(key) {
            diagnostics.push(
                Diagnostic::error("Invalid default tag key")
                    .with_detail(detail)
                    .with_attribute(format!("default_tags.{}", key)),
            );
        }
    }

    let ignore = &config.ignore_tags;
    let empty_key = ignore.keys.iter().any(String::is_empty);
    let empty_prefix = ignore.key_prefixes.iter().any(String::is_empty);
    if empty_key || empty_prefix {
        diagnostics.push(
            Diagnostic::error("Invalid ignore_tags")
                .with_detail("ignored keys and key prefixes may not be empty")
                .with_attribute("ignore_tags"),
        );
    }

    diagnostics
}

/// Validate a configuration, returning `Ok` or every error diagnostic.
pub fn validate_result(config: &ParameterGroupConfig) -> Result<(), Vec<Diagnostic>> {
    let errors: Vec<_> = validate_parameter_group_config(config)
        .into_iter()
        .filter(Diagnostic::is_error)
        .collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
