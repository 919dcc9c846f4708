//! Testing utilities for the provider.
//!
//! [`FakeMemoryDb`] is an in-memory stand-in for the MemoryDB API with call
//! recording and fault injection. [`ProviderTester`] drives a
//! [`ProviderService`] through plan/apply lifecycles without a host.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use hemmer_provider_memorydb::testing::{FakeMemoryDb, ProviderTester};
//! use hemmer_provider_memorydb::MemoryDbProvider;
//! use serde_json::json;
//!
//! #[tokio::test]
//! async fn test_create_group() {
//!     let fake = Arc::new(FakeMemoryDb::new());
//!     let tester = ProviderTester::new(MemoryDbProvider::new(fake.clone()));
//!     tester.configure(json!({})).await.unwrap();
//!
//!     let state = tester
//!         .lifecycle_create("aws_memorydb_parameter_group", json!({
//!             "name": "sessions",
//!             "family": "memorydb_redis6"
//!         }))
//!         .await
//!         .unwrap();
//!
//!     assert_eq!(state["id"], "sessions");
//! }
//! ```

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde_json::Value;

use crate::client::{
    CreateParameterGroupInput, DescribeParametersOutput, MemoryDbApi, ParameterGroup,
    ParameterNameValue, RemoteParameter,
};
use crate::error::{ApiError, ProviderError, PARAMETER_GROUP_ALREADY_EXISTS};
use crate::parameters::default_parameter_group_name;
use crate::provider::ProviderService;
use crate::schema::{Diagnostic, DiagnosticSeverity, ProviderSchema};
use crate::tags::Tags;
use crate::types::{ImportedResource, PlanResult};

// =========================================================================
// Fake MemoryDB API
// =========================================================================

/// Page size used by `DescribeParameters` unless overridden.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// A call received by [`FakeMemoryDb`], with the arguments that matter.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakeCall {
    CreateParameterGroup { name: String },
    DescribeParameterGroup { name: String },
    DescribeParameters { name: String, next_token: Option<String> },
    UpdateParameterGroup { name: String, parameters: Vec<ParameterNameValue> },
    ResetParameterGroup { name: String, parameter_names: Vec<String> },
    DeleteParameterGroup { name: String },
    ListTags { arn: String },
    TagResource { arn: String, tags: Tags },
    UntagResource { arn: String, keys: Vec<String> },
}

impl FakeCall {
    /// The snake_case operation name, as used by [`FakeMemoryDb::fail_next`].
    pub fn operation(&self) -> &'static str {
        match self {
            Self::CreateParameterGroup { .. } => "create_parameter_group",
            Self::DescribeParameterGroup { .. } => "describe_parameter_group",
            Self::DescribeParameters { .. } => "describe_parameters",
            Self::UpdateParameterGroup { .. } => "update_parameter_group",
            Self::ResetParameterGroup { .. } => "reset_parameter_group",
            Self::DeleteParameterGroup { .. } => "delete_parameter_group",
            Self::ListTags { .. } => "list_tags",
            Self::TagResource { .. } => "tag_resource",
            Self::UntagResource { .. } => "untag_resource",
        }
    }

    /// Whether the call changes remote state.
    pub fn is_mutation(&self) -> bool {
        !matches!(
            self,
            Self::DescribeParameterGroup { .. } | Self::DescribeParameters { .. } | Self::ListTags { .. }
        )
    }
}

#[derive(Debug, Clone)]
struct FakeGroup {
    family: String,
    description: String,
    arn: String,
    parameters: BTreeMap<String, Option<String>>,
}

impl FakeGroup {
    fn describe(&self, name: &str) -> ParameterGroup {
        ParameterGroup {
            name: name.to_string(),
            family: self.family.clone(),
            description: self.description.clone(),
            arn: self.arn.clone(),
        }
    }

    fn key_for(&self, name: &str) -> Option<String> {
        self.parameters
            .keys()
            .find(|k| k.eq_ignore_ascii_case(name))
            .cloned()
    }

    fn set(&mut self, name: &str, value: Option<String>) {
        let key = self.key_for(name).unwrap_or_else(|| name.to_string());
        self.parameters.insert(key, value);
    }

    fn get(&self, name: &str) -> Option<&Option<String>> {
        self.key_for(name).and_then(|k| self.parameters.get(&k))
    }
}

#[derive(Debug, Default)]
struct FakeState {
    groups: BTreeMap<String, FakeGroup>,
    tags: BTreeMap<String, Tags>,
    calls: Vec<FakeCall>,
    queued_faults: HashMap<String, VecDeque<ApiError>>,
    scheduled_faults: Vec<(String, usize, ApiError)>,
}

impl FakeState {
    fn seeded_parameters(&self, family: &str) -> BTreeMap<String, Option<String>> {
        self.groups
            .get(&default_parameter_group_name(family))
            .map(|g| g.parameters.clone())
            .unwrap_or_default()
    }

    fn group(&self, name: &str) -> Result<&FakeGroup, ApiError> {
        self.groups.get(name).ok_or_else(|| ApiError::not_found(name))
    }

    fn group_mut(&mut self, name: &str) -> Result<&mut FakeGroup, ApiError> {
        self.groups.get_mut(name).ok_or_else(|| ApiError::not_found(name))
    }
}

/// Amazon Resource Name the fake assigns to a group.
pub fn fake_arn(name: &str) -> String {
    format!("arn:aws:memorydb:us-east-1:000000000000:parametergroup/{}", name)
}

/// An in-memory MemoryDB API.
///
/// New groups start out with the parameters of their family's defaults group,
/// when one has been registered with [`FakeMemoryDb::with_family_defaults`].
/// Parameter names are matched case-insensitively but stored in the case
/// they were first written in.
#[derive(Debug)]
pub struct FakeMemoryDb {
    state: Mutex<FakeState>,
    page_size: usize,
}

impl Default for FakeMemoryDb {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeMemoryDb {
    /// An empty fake.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState::default()),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Return at most `page_size` parameters per `DescribeParameters` page.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Register the defaults group for `family`.
    pub fn with_family_defaults(
        self,
        family: &str,
        defaults: impl IntoIterator<Item = RemoteParameter>,
    ) -> Self {
        self.insert_group(&default_parameter_group_name(family), family, defaults);
        self
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a group directly, without recording a call.
    pub fn insert_group(
        &self,
        name: &str,
        family: &str,
        parameters: impl IntoIterator<Item = RemoteParameter>,
    ) {
        let mut state = self.state();
        let mut group = FakeGroup {
            family: family.to_string(),
            description: String::new(),
            arn: fake_arn(name),
            parameters: state.seeded_parameters(family),
        };
        for p in parameters {
            group.set(&p.name, p.value);
        }
        state.tags.insert(group.arn.clone(), Tags::new());
        state.groups.insert(name.to_string(), group);
    }

    /// Remove a group behind the provider's back.
    pub fn remove_group(&self, name: &str) {
        let mut state = self.state();
        if let Some(group) = state.groups.remove(name) {
            state.tags.remove(&group.arn);
        }
    }

    /// Whether the group exists.
    pub fn has_group(&self, name: &str) -> bool {
        self.state().groups.contains_key(name)
    }

    /// Set a parameter directly, without recording a call.
    pub fn set_parameter(&self, group: &str, name: &str, value: &str) {
        if let Some(group) = self.state().groups.get_mut(group) {
            group.set(name, Some(value.to_string()));
        }
    }

    /// The current value of a parameter.
    pub fn parameter_value(&self, group: &str, name: &str) -> Option<String> {
        self.state()
            .groups
            .get(group)
            .and_then(|g| g.get(name).cloned())
            .flatten()
    }

    /// Set a tag directly, without recording a call.
    pub fn set_tag(&self, arn: &str, key: &str, value: &str) {
        self.state()
            .tags
            .entry(arn.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
    }

    /// The tags currently stored for `arn`.
    pub fn tags(&self, arn: &str) -> Tags {
        self.state().tags.get(arn).cloned().unwrap_or_default()
    }

    /// Fail the next call of `operation` with `error`. Faults queue up.
    pub fn fail_next(&self, operation: &str, error: ApiError) {
        self.state()
            .queued_faults
            .entry(operation.to_string())
            .or_default()
            .push_back(error);
    }

    /// Fail the `nth` call of `operation`, counting from 1.
    pub fn fail_nth(&self, operation: &str, nth: usize, error: ApiError) {
        self.state()
            .scheduled_faults
            .push((operation.to_string(), nth, error));
    }

    /// Every call received so far.
    pub fn calls(&self) -> Vec<FakeCall> {
        self.state().calls.clone()
    }

    /// How many calls of `operation` were received.
    pub fn calls_named(&self, operation: &str) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|c| c.operation() == operation)
            .count()
    }

    /// Forget recorded calls.
    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    fn record(&self, call: FakeCall) -> Result<(), ApiError> {
        let mut state = self.state();
        let operation = call.operation();
        state.calls.push(call);
        let count = state
            .calls
            .iter()
            .filter(|c| c.operation() == operation)
            .count();

        if let Some(pos) = state
            .scheduled_faults
            .iter()
            .position(|(op, nth, _)| op == operation && *nth == count)
        {
            return Err(state.scheduled_faults.remove(pos).2);
        }
        match state
            .queued_faults
            .get_mut(operation)
            .and_then(VecDeque::pop_front)
        {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl MemoryDbApi for FakeMemoryDb {
    async fn create_parameter_group(
        &self,
        input: CreateParameterGroupInput,
    ) -> Result<ParameterGroup, ApiError> {
        self.record(FakeCall::CreateParameterGroup {
            name: input.name.clone(),
        })?;

        let mut state = self.state();
        if state.groups.contains_key(&input.name) {
            return Err(ApiError::new(
                PARAMETER_GROUP_ALREADY_EXISTS,
                format!("Parameter group {} already exists", input.name),
            ));
        }
        let group = FakeGroup {
            parameters: state.seeded_parameters(&input.family),
            family: input.family,
            description: input.description,
            arn: fake_arn(&input.name),
        };
        let described = group.describe(&input.name);
        state.tags.insert(group.arn.clone(), input.tags);
        state.groups.insert(input.name, group);
        Ok(described)
    }

    async fn describe_parameter_group(&self, name: &str) -> Result<ParameterGroup, ApiError> {
        self.record(FakeCall::DescribeParameterGroup {
            name: name.to_string(),
        })?;
        self.state().group(name).map(|g| g.describe(name))
    }

    async fn describe_parameters(
        &self,
        name: &str,
        next_token: Option<String>,
    ) -> Result<DescribeParametersOutput, ApiError> {
        self.record(FakeCall::DescribeParameters {
            name: name.to_string(),
            next_token: next_token.clone(),
        })?;

        let start = match next_token {
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| ApiError::new("InvalidParameterValueException", "invalid next token"))?,
            None => 0,
        };

        let state = self.state();
        let group = state.group(name)?;
        let end = (start + self.page_size).min(group.parameters.len());
        let parameters = group
            .parameters
            .iter()
            .skip(start)
            .take(self.page_size)
            .map(|(name, value)| RemoteParameter {
                name: name.clone(),
                value: value.clone(),
            })
            .collect();

        Ok(DescribeParametersOutput {
            parameters,
            next_token: (end < group.parameters.len()).then(|| end.to_string()),
        })
    }

    async fn update_parameter_group(
        &self,
        name: &str,
        parameters: Vec<ParameterNameValue>,
    ) -> Result<(), ApiError> {
        self.record(FakeCall::UpdateParameterGroup {
            name: name.to_string(),
            parameters: parameters.clone(),
        })?;

        let mut state = self.state();
        let group = state.group_mut(name)?;
        for p in parameters {
            group.set(&p.name, Some(p.value));
        }
        Ok(())
    }

    async fn reset_parameter_group(
        &self,
        name: &str,
        parameter_names: Vec<String>,
    ) -> Result<(), ApiError> {
        self.record(FakeCall::ResetParameterGroup {
            name: name.to_string(),
            parameter_names: parameter_names.clone(),
        })?;

        let mut state = self.state();
        let family = state.group(name)?.family.clone();
        let defaults = FakeGroup {
            family: family.clone(),
            description: String::new(),
            arn: String::new(),
            parameters: state.seeded_parameters(&family),
        };
        let group = state.group_mut(name)?;
        for parameter in parameter_names {
            match defaults.get(&parameter) {
                Some(value) => group.set(&parameter, value.clone()),
                None => {
                    if let Some(key) = group.key_for(&parameter) {
                        group.parameters.remove(&key);
                    }
                },
            }
        }
        Ok(())
    }

    async fn delete_parameter_group(&self, name: &str) -> Result<(), ApiError> {
        self.record(FakeCall::DeleteParameterGroup {
            name: name.to_string(),
        })?;

        let mut state = self.state();
        let group = state
            .groups
            .remove(name)
            .ok_or_else(|| ApiError::not_found(name))?;
        state.tags.remove(&group.arn);
        Ok(())
    }

    async fn list_tags(&self, arn: &str) -> Result<Tags, ApiError> {
        self.record(FakeCall::ListTags {
            arn: arn.to_string(),
        })?;
        self.state()
            .tags
            .get(arn)
            .cloned()
            .ok_or_else(|| ApiError::new("InvalidARNFault", format!("No resource with ARN {}", arn)))
    }

    async fn tag_resource(&self, arn: &str, tags: Tags) -> Result<(), ApiError> {
        self.record(FakeCall::TagResource {
            arn: arn.to_string(),
            tags: tags.clone(),
        })?;
        self.state()
            .tags
            .get_mut(arn)
            .ok_or_else(|| ApiError::new("InvalidARNFault", format!("No resource with ARN {}", arn)))?
            .extend(tags);
        Ok(())
    }

    async fn untag_resource(&self, arn: &str, keys: Vec<String>) -> Result<(), ApiError> {
        self.record(FakeCall::UntagResource {
            arn: arn.to_string(),
            keys: keys.clone(),
        })?;
        let mut state = self.state();
        let tags = state
            .tags
            .get_mut(arn)
            .ok_or_else(|| ApiError::new("InvalidARNFault", format!("No resource with ARN {}", arn)))?;
        for key in keys {
            tags.remove(&key);
        }
        Ok(())
    }
}

// =========================================================================
// Provider Tester
// =========================================================================

/// A test harness for [`ProviderService`] implementations.
///
/// Wraps a provider and offers the host's call sequences as single methods.
pub struct ProviderTester<P: ProviderService> {
    provider: P,
}

impl<P: ProviderService> ProviderTester<P> {
    /// Create a new tester for the given provider.
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Get a reference to the underlying provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Get the provider's schema.
    pub fn schema(&self) -> ProviderSchema {
        self.provider.schema()
    }

    /// Get the list of resource type names.
    pub fn resource_types(&self) -> Vec<String> {
        self.provider.metadata().resources
    }

    /// Validate provider configuration.
    ///
    /// Returns `Err` with the error diagnostics if there are any.
    pub async fn validate_provider_config(&self, config: Value) -> Result<(), TestError> {
        let diagnostics = self.provider.validate_provider_config(config).await?;
        check_diagnostics(diagnostics)
    }

    /// Configure the provider.
    pub async fn configure(&self, config: Value) -> Result<(), TestError> {
        let diagnostics = self.provider.configure(config).await?;
        check_diagnostics(diagnostics)
    }

    /// Stop the provider.
    pub async fn stop(&self) -> Result<(), ProviderError> {
        self.provider.stop().await
    }

    /// Validate a resource configuration.
    pub async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<(), TestError> {
        let diagnostics = self
            .provider
            .validate_resource_config(resource_type, config)
            .await?;
        check_diagnostics(diagnostics)
    }

    /// Plan a resource creation (no prior state).
    pub async fn plan_create(
        &self,
        resource_type: &str,
        proposed_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, None, proposed_state.clone(), proposed_state)
            .await
    }

    /// Plan a resource update.
    pub async fn plan_update(
        &self,
        resource_type: &str,
        prior_state: Value,
        proposed_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(
                resource_type,
                Some(prior_state),
                proposed_state.clone(),
                proposed_state,
            )
            .await
    }

    /// Plan a resource deletion.
    pub async fn plan_delete(
        &self,
        resource_type: &str,
        prior_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, Some(prior_state), Value::Null, Value::Null)
            .await
    }

    /// Create a new resource.
    pub async fn create(
        &self,
        resource_type: &str,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider.create(resource_type, planned_state).await
    }

    /// Read the current state of a resource.
    pub async fn read(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider.read(resource_type, current_state).await
    }

    /// Update an existing resource.
    pub async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider
            .update(resource_type, prior_state, planned_state)
            .await
    }

    /// Delete a resource.
    pub async fn delete(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<(), ProviderError> {
        self.provider.delete(resource_type, current_state).await
    }

    /// Import an existing resource.
    pub async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        self.provider.import_resource(resource_type, id).await
    }

    // =========================================================================
    // Lifecycle Helpers
    // =========================================================================

    /// Plan, create, then read. Returns the state after read.
    pub async fn lifecycle_create(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Value, ProviderError> {
        let plan_result = self.plan_create(resource_type, config).await?;
        let created_state = self
            .create(resource_type, plan_result.planned_state)
            .await?;
        self.read(resource_type, created_state).await
    }

    /// Plan, update, then read. Returns the state after read.
    pub async fn lifecycle_update(
        &self,
        resource_type: &str,
        prior_state: Value,
        proposed_state: Value,
    ) -> Result<Value, ProviderError> {
        let plan_result = self
            .plan_update(resource_type, prior_state.clone(), proposed_state)
            .await?;
        let updated_state = self
            .update(resource_type, prior_state, plan_result.planned_state)
            .await?;
        self.read(resource_type, updated_state).await
    }

    /// Plan a destroy, then delete.
    pub async fn lifecycle_delete(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<(), ProviderError> {
        self.plan_delete(resource_type, current_state.clone())
            .await?;
        self.delete(resource_type, current_state).await
    }

    /// Create, update and delete in sequence.
    ///
    /// Returns the state after the update.
    pub async fn lifecycle_crud(
        &self,
        resource_type: &str,
        initial_config: Value,
        updated_config: Value,
    ) -> Result<Value, ProviderError> {
        let created_state = self.lifecycle_create(resource_type, initial_config).await?;
        let updated_state = self
            .lifecycle_update(resource_type, created_state, updated_config)
            .await?;
        self.lifecycle_delete(resource_type, updated_state.clone())
            .await?;
        Ok(updated_state)
    }
}

/// Error type for test operations that may fail with diagnostics.
#[derive(Debug)]
pub enum TestError {
    /// The operation failed with diagnostics.
    Diagnostics(Vec<Diagnostic>),
    /// The operation failed with a provider error.
    Provider(ProviderError),
}

impl std::fmt::Display for TestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestError::Diagnostics(diags) => {
                writeln!(f, "Operation failed with {} diagnostic(s):", diags.len())?;
                for diag in diags {
                    write!(f, "  [{:?}] {}", diag.severity, diag.summary)?;
                    if let Some(detail) = &diag.detail {
                        write!(f, ": {}", detail)?;
                    }
                    if let Some(attr) = &diag.attribute {
                        write!(f, " (at {})", attr)?;
                    }
                    writeln!(f)?;
                }
                Ok(())
            },
            TestError::Provider(e) => write!(f, "Provider error: {}", e),
        }
    }
}

impl std::error::Error for TestError {}

impl From<ProviderError> for TestError {
    fn from(e: ProviderError) -> Self {
        TestError::Provider(e)
    }
}

fn check_diagnostics(diagnostics: Vec<Diagnostic>) -> Result<(), TestError> {
    let errors: Vec<_> = diagnostics
        .into_iter()
        .filter(|d| matches!(d.severity, DiagnosticSeverity::Error))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(TestError::Diagnostics(errors))
    }
}

// =========================================================================
// Assertion Helpers
// =========================================================================

/// Assert that a plan result indicates the resource will be created.
///
/// # Panics
///
/// Panics if the plan has no changes or requires replacement.
pub fn assert_plan_creates(plan: &PlanResult) {
    assert!(
        !plan.changes.is_empty(),
        "Expected plan to have changes for create, but got no changes"
    );
    assert!(
        !plan.requires_replace,
        "Expected plan to create, not replace"
    );
}

/// Assert that a plan result indicates no changes.
///
/// # Panics
///
/// Panics if the plan has any changes.
pub fn assert_plan_no_changes(plan: &PlanResult) {
    assert!(
        plan.changes.is_empty(),
        "Expected no changes, but got {} change(s): {:?}",
        plan.changes.len(),
        plan.changes.iter().map(|c| &c.path).collect::<Vec<_>>()
    );
}

/// Assert that a plan requires resource replacement.
pub fn assert_plan_replaces(plan: &PlanResult) {
    assert!(
        plan.requires_replace,
        "Expected plan to require replacement, but it does not"
    );
}

/// Assert that a plan does not require resource replacement.
pub fn assert_plan_updates_in_place(plan: &PlanResult) {
    assert!(
        !plan.requires_replace,
        "Expected plan to update in place, but it requires replacement"
    );
}

/// Assert that a plan has a change for a specific attribute path.
///
/// # Panics
///
/// Panics if the plan does not have a change for the given path.
pub fn assert_plan_changes_attribute(plan: &PlanResult, path: &str) {
    assert!(
        plan.changes_attribute(path),
        "Expected plan to change attribute '{}', but it was not changed. Changed attributes: {:?}",
        path,
        plan.changes.iter().map(|c| &c.path).collect::<Vec<_>>()
    );
}

/// Assert that a plan leaves an attribute alone.
pub fn assert_plan_does_not_change_attribute(plan: &PlanResult, path: &str) {
    assert!(
        !plan.changes_attribute(path),
        "Expected plan to not change attribute '{}', but it was changed",
        path
    );
}

/// Assert that diagnostics contain an error with the given summary substring.
///
/// # Panics
///
/// Panics if no error diagnostic contains the given substring.
pub fn assert_error_contains(diagnostics: &[Diagnostic], substring: &str) {
    let has_matching_error = diagnostics
        .iter()
        .any(|d| d.is_error() && d.summary.contains(substring));

    assert!(
        has_matching_error,
        "Expected an error containing '{}', but no matching error found. Errors: {:?}",
        substring,
        diagnostics
            .iter()
            .filter(|d| d.is_error())
            .map(|d| &d.summary)
            .collect::<Vec<_>>()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PARAMETER_GROUP_NOT_FOUND;
    use crate::types::AttributeChange;
    use serde_json::json;

    fn input(name: &str) -> CreateParameterGroupInput {
        CreateParameterGroupInput {
            name: name.to_string(),
            family: "memorydb_redis6".to_string(),
            description: "test".to_string(),
            tags: Tags::new(),
        }
    }

    #[tokio::test]
    async fn test_fake_seeds_family_defaults() {
        let fake = FakeMemoryDb::new().with_family_defaults(
            "memorydb_redis6",
            [RemoteParameter::new("timeout", "0")],
        );

        fake.create_parameter_group(input("g")).await.unwrap();
        assert_eq!(fake.parameter_value("g", "timeout"), Some("0".to_string()));

        let err = fake.create_parameter_group(input("g")).await.unwrap_err();
        assert_eq!(err.code, PARAMETER_GROUP_ALREADY_EXISTS);
    }

    #[tokio::test]
    async fn test_fake_reset_restores_default_or_removes() {
        let fake = FakeMemoryDb::new().with_family_defaults(
            "memorydb_redis6",
            [RemoteParameter::new("timeout", "0")],
        );
        fake.insert_group("g", "memorydb_redis6", [RemoteParameter::new("custom", "1")]);
        fake.set_parameter("g", "TIMEOUT", "30");

        fake.reset_parameter_group("g", vec!["timeout".to_string(), "custom".to_string()])
            .await
            .unwrap();

        assert_eq!(fake.parameter_value("g", "timeout"), Some("0".to_string()));
        assert_eq!(fake.parameter_value("g", "custom"), None);
    }

    #[tokio::test]
    async fn test_fake_fault_injection() {
        let fake = FakeMemoryDb::new();
        fake.insert_group("g", "memorydb_redis6", []);
        fake.fail_next("describe_parameter_group", ApiError::new("Throttling", "slow down"));
        fake.fail_nth("describe_parameter_group", 3, ApiError::not_found("g"));

        assert_eq!(
            fake.describe_parameter_group("g").await.unwrap_err().code,
            "Throttling"
        );
        assert!(fake.describe_parameter_group("g").await.is_ok());
        assert_eq!(
            fake.describe_parameter_group("g").await.unwrap_err().code,
            PARAMETER_GROUP_NOT_FOUND
        );
        assert!(fake.describe_parameter_group("g").await.is_ok());
        assert_eq!(fake.calls_named("describe_parameter_group"), 4);
    }

    #[tokio::test]
    async fn test_fake_tags_follow_group() {
        let fake = FakeMemoryDb::new();
        let mut create = input("g");
        create.tags.insert("env".to_string(), "dev".to_string());
        let group = fake.create_parameter_group(create).await.unwrap();

        assert_eq!(fake.list_tags(&group.arn).await.unwrap().len(), 1);
        fake.untag_resource(&group.arn, vec!["env".to_string()])
            .await
            .unwrap();
        assert!(fake.tags(&group.arn).is_empty());

        fake.delete_parameter_group("g").await.unwrap();
        assert!(fake.list_tags(&group.arn).await.is_err());
    }

    #[test]
    fn test_fake_call_classification() {
        let read = FakeCall::ListTags { arn: "a".to_string() };
        let write = FakeCall::DeleteParameterGroup { name: "g".to_string() };
        assert!(!read.is_mutation());
        assert!(write.is_mutation());
        assert_eq!(write.operation(), "delete_parameter_group");
    }

    #[test]
    fn test_plan_assertions() {
        let plan = PlanResult::with_changes(
            json!({}),
            vec![AttributeChange::added("family", json!("memorydb_redis6"))],
            false,
        );
        assert_plan_creates(&plan);
        assert_plan_changes_attribute(&plan, "family");
        assert_plan_does_not_change_attribute(&plan, "tags");
        assert_plan_updates_in_place(&plan);
    }

    #[test]
    #[should_panic(expected = "Expected no changes")]
    fn test_assert_plan_no_changes_fails() {
        let plan = PlanResult::with_changes(
            json!({}),
            vec![AttributeChange::modified("family", json!("a"), json!("b"))],
            true,
        );
        assert_plan_no_changes(&plan);
    }

    #[test]
    fn test_assert_error_contains() {
        let diagnostics = vec![Diagnostic::error("Invalid name")];
        assert_error_contains(&diagnostics, "Invalid");
    }

    #[test]
    fn test_test_error_display() {
        let err = TestError::Diagnostics(vec![
            Diagnostic::error("First error").with_attribute("name"),
            Diagnostic::error("Second error").with_detail("More info"),
        ]);

        let display = format!("{}", err);
        assert!(display.contains("First error"));
        assert!(display.contains("Second error"));
        assert!(display.contains("name"));
        assert!(display.contains("More info"));
    }
}
