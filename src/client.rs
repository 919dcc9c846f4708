//! The remote MemoryDB API consumed by the provider.
//!
//! The provider never talks to the network directly. Everything goes through
//! [`MemoryDbApi`], which a real SDK binding (or [`crate::testing::FakeMemoryDb`]
//! in tests) implements.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::tags::Tags;

/// A parameter group as described by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterGroup {
    /// Unique group name.
    pub name: String,
    /// Engine family, e.g. `memorydb_redis6`.
    pub family: String,
    /// Free-form description.
    pub description: String,
    /// Amazon Resource Name of the group.
    pub arn: String,
}

/// A parameter as returned by `DescribeParameters`.
///
/// The service may omit the value, so it is optional here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteParameter {
    /// Parameter name, in whatever case the service returned.
    pub name: String,
    /// Current value, if the service reported one.
    pub value: Option<String>,
}

impl RemoteParameter {
    /// Create a parameter with a value.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
        }
    }

    /// Create a parameter that has no reported value.
    pub fn without_value(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
        }
    }
}

/// A name/value pair sent to `UpdateParameterGroup`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterNameValue {
    /// Parameter name.
    pub name: String,
    /// New value.
    pub value: String,
}

/// Input for `CreateParameterGroup`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateParameterGroupInput {
    /// Group name.
    pub name: String,
    /// Engine family.
    pub family: String,
    /// Description.
    pub description: String,
    /// Tags applied at creation.
    pub tags: Tags,
}

/// One page of `DescribeParameters` output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DescribeParametersOutput {
    /// Parameters on this page.
    pub parameters: Vec<RemoteParameter>,
    /// Token for the next page, `None` on the last page.
    pub next_token: Option<String>,
}

/// Operations of the MemoryDB API used by the parameter group resource.
#[async_trait]
pub trait MemoryDbApi: Send + Sync + 'static {
    /// Create a parameter group.
    async fn create_parameter_group(
        &self,
        input: CreateParameterGroupInput,
    ) -> Result<ParameterGroup, ApiError>;

    /// Describe a single parameter group. Missing groups yield
    /// a `ParameterGroupNotFoundFault`.
    async fn describe_parameter_group(&self, name: &str) -> Result<ParameterGroup, ApiError>;

    /// Describe one page of the parameters of a group.
    async fn describe_parameters(
        &self,
        name: &str,
        next_token: Option<String>,
    ) -> Result<DescribeParametersOutput, ApiError>;

    /// Set explicit parameter values.
    async fn update_parameter_group(
        &self,
        name: &str,
        parameters: Vec<ParameterNameValue>,
    ) -> Result<(), ApiError>;

    /// Reset the named parameters to their family defaults.
    async fn reset_parameter_group(
        &self,
        name: &str,
        parameter_names: Vec<String>,
    ) -> Result<(), ApiError>;

    /// Delete a parameter group.
    async fn delete_parameter_group(&self, name: &str) -> Result<(), ApiError>;

    /// List the tags on a resource.
    async fn list_tags(&self, arn: &str) -> Result<Tags, ApiError>;

    /// Add or overwrite tags on a resource.
    async fn tag_resource(&self, arn: &str, tags: Tags) -> Result<(), ApiError>;

    /// Remove tags from a resource.
    async fn untag_resource(&self, arn: &str, keys: Vec<String>) -> Result<(), ApiError>;
}

/// Fetch every parameter of a group, following pagination tokens.
pub async fn describe_all_parameters<C>(
    client: &C,
    name: &str,
) -> Result<Vec<RemoteParameter>, ApiError>
where
    C: MemoryDbApi + ?Sized,
{
    let mut parameters = Vec::new();
    let mut next_token = None;

    loop {
        let page = client.describe_parameters(name, next_token).await?;
        parameters.extend(page.parameters);

        match page.next_token {
            Some(token) if !token.is_empty() => next_token = Some(token),
            _ => break,
        }
    }

    Ok(parameters)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeMemoryDb;

    #[tokio::test]
    async fn test_describe_all_parameters_drains_pages() {
        let fake = FakeMemoryDb::new().with_page_size(2);
        fake.insert_group(
            "paged",
            "memorydb_redis6",
            (0..5).map(|i| RemoteParameter::new(format!("p{}", i), i.to_string())),
        );

        let parameters = describe_all_parameters(&fake, "paged").await.unwrap();
        assert_eq!(parameters.len(), 5);
        assert_eq!(fake.calls_named("describe_parameters"), 3);
    }

    #[tokio::test]
    async fn test_describe_all_parameters_missing_group() {
        let fake = FakeMemoryDb::new();
        let err = describe_all_parameters(&fake, "nope").await.unwrap_err();
        assert!(err.is_not_found());
    }
}
