//! The provider surface the host talks to.
//!
//! [`ProviderService`] is the host-facing contract: JSON values in, JSON
//! values and diagnostics out. [`MemoryDbProvider`] implements it for the
//! `aws_memorydb_parameter_group` resource on top of any [`MemoryDbApi`].
//!
//! Everything arriving here is untyped. Each operation checks the resource
//! type, decodes and validates its input, then hands off to
//! [`ParameterGroupResource`].

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, error, info, instrument};

use crate::client::MemoryDbApi;
use crate::config::{ParameterGroupConfig, ParameterGroupState, ProviderConfig};
use crate::error::ProviderError;
use crate::resource::{ParameterGroupResource, RESOURCE_TYPE};
use crate::retry::RetryPolicy;
use crate::schema::{
    Attribute, AttributeFlags, AttributeType, Block, Diagnostic, NestedBlock, ProviderSchema,
    Schema,
};
use crate::types::{ImportedResource, PlanResult, ProviderMetadata};
use crate::validation::{
    validate_parameter_group_config, validate_provider_config, validate_result,
};

/// Trait that provider implementations must implement.
///
/// # Example
///
/// ```ignore
/// use hemmer_provider_memorydb::{ProviderService, ProviderError, PlanResult, ProviderSchema};
///
/// struct MyProvider;
///
/// #[async_trait::async_trait]
/// impl ProviderService for MyProvider {
///     fn schema(&self) -> ProviderSchema {
///         ProviderSchema::new()
///     }
///
///     // ... implement the remaining operations
/// }
/// ```
#[async_trait::async_trait]
pub trait ProviderService: Send + Sync + 'static {
    // =========================================================================
    // Schema & Metadata
    // =========================================================================

    /// Return the provider's schema including all resources.
    fn schema(&self) -> ProviderSchema;

    /// Return provider metadata. By default, this is derived from the schema.
    fn metadata(&self) -> ProviderMetadata {
        let mut resources: Vec<String> = self.schema().resources.keys().cloned().collect();
        resources.sort();
        ProviderMetadata { resources }
    }

    // =========================================================================
    // Provider Lifecycle
    // =========================================================================

    /// Validate the provider configuration before configuring.
    async fn validate_provider_config(
        &self,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let _ = config;
        Ok(vec![])
    }

    /// Configure the provider. Returns diagnostics (errors and warnings).
    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError>;

    /// Stop the provider gracefully.
    async fn stop(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    // =========================================================================
    // Resource Operations
    // =========================================================================

    /// Validate a resource's configuration before planning.
    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let _ = (resource_type, config);
        Ok(vec![])
    }

    /// Plan changes for a resource. A null `proposed_state` plans a destroy.
    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        config: Value,
    ) -> Result<PlanResult, ProviderError>;

    /// Create a new resource.
    ///
    /// When the resource exists but a later step failed, the error carries
    /// its state; see [`ProviderError::partial_state`].
    async fn create(&self, resource_type: &str, planned_state: Value)
        -> Result<Value, ProviderError>;

    /// Read the current state of a resource. Null means it no longer exists.
    async fn read(&self, resource_type: &str, current_state: Value)
        -> Result<Value, ProviderError>;

    /// Update an existing resource.
    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError>;

    /// Delete a resource.
    async fn delete(&self, resource_type: &str, current_state: Value)
        -> Result<(), ProviderError>;

    /// Import existing infrastructure into management.
    async fn import_resource(
        &self,
        resource_type: &str,
        _id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        Err(ProviderError::UnknownResource(format!(
            "{} (import not supported)",
            resource_type
        )))
    }
}

/// Schema of the provider configuration block.
pub fn provider_config_schema() -> Schema {
    let strings = || AttributeType::list(AttributeType::String);

    Schema::v0()
        .with_attribute(
            "region",
            Attribute::optional_string().with_description("Region the MemoryDB client talks to"),
        )
        .with_attribute(
            "default_tags",
            Attribute::new(AttributeType::map(AttributeType::String), AttributeFlags::optional())
                .with_description("Tags applied to every resource"),
        )
        .with_block(
            "ignore_tags",
            NestedBlock::single(
                Block::new()
                    .with_attribute("keys", Attribute::new(strings(), AttributeFlags::optional()))
                    .with_attribute(
                        "key_prefixes",
                        Attribute::new(strings(), AttributeFlags::optional()),
                    ),
            ),
        )
}

/// The MemoryDB provider.
///
/// Holds the API client and, once `configure` has run, the provider
/// configuration. Resource operations before `configure` fail.
pub struct MemoryDbProvider<C: ?Sized> {
    client: Arc<C>,
    config: RwLock<Option<ProviderConfig>>,
    retry: RetryPolicy,
}

impl<C: MemoryDbApi + ?Sized> MemoryDbProvider<C> {
    /// Create an unconfigured provider around `client`.
    pub fn new(client: Arc<C>) -> Self {
        Self {
            client,
            config: RwLock::new(None),
            retry: RetryPolicy::default(),
        }
    }

    /// Override the retry budget for parameter resets.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn resource(&self, resource_type: &str) -> Result<ParameterGroupResource<C>, ProviderError> {
        check_resource_type(resource_type)?;
        let config = self.config.read().await.clone().ok_or_else(|| {
            ProviderError::FailedPrecondition("provider is not configured".to_string())
        })?;
        Ok(ParameterGroupResource::new(self.client.clone(), config).with_retry_policy(self.retry))
    }
}

fn check_resource_type(resource_type: &str) -> Result<(), ProviderError> {
    if resource_type == RESOURCE_TYPE {
        Ok(())
    } else {
        Err(ProviderError::UnknownResource(resource_type.to_string()))
    }
}

fn decode_provider_config(value: Value) -> Result<ProviderConfig, ProviderError> {
    match value {
        Value::Null => Ok(ProviderConfig::default()),
        value => serde_json::from_value(value)
            .map_err(|e| ProviderError::Configuration(e.to_string())),
    }
}

fn decode_config(value: Value) -> Result<ParameterGroupConfig, ProviderError> {
    let config = ParameterGroupConfig::from_value(value)?;
    validate_result(&config).map_err(|errors| {
        let messages: Vec<String> = errors.iter().map(describe_diagnostic).collect();
        ProviderError::Validation(messages.join("; "))
    })?;
    Ok(config)
}

fn describe_diagnostic(d: &Diagnostic) -> String {
    match (&d.attribute, &d.detail) {
        (Some(attr), Some(detail)) => format!("{}: {} ({})", attr, d.summary, detail),
        (Some(attr), None) => format!("{}: {}", attr, d.summary),
        (None, Some(detail)) => format!("{} ({})", d.summary, detail),
        (None, None) => d.summary.clone(),
    }
}

fn decode_state(value: Value) -> Result<Option<ParameterGroupState>, ProviderError> {
    match value {
        Value::Null => Ok(None),
        value => Ok(Some(ParameterGroupState::from_value(value)?)),
    }
}

#[async_trait::async_trait]
impl<C: MemoryDbApi + ?Sized> ProviderService for MemoryDbProvider<C> {
    fn schema(&self) -> ProviderSchema {
        ProviderSchema::new()
            .with_provider_config(provider_config_schema())
            .with_resource(RESOURCE_TYPE, ParameterGroupResource::<C>::schema())
    }

    #[instrument(skip(self, config))]
    async fn validate_provider_config(
        &self,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let config = decode_provider_config(config)?;
        Ok(validate_provider_config(&config))
    }

    #[instrument(skip(self, config))]
    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        debug!("Configure called");
        let config = decode_provider_config(config)?;

        let diagnostics = validate_provider_config(&config);
        if diagnostics.iter().any(Diagnostic::is_error) {
            error!(errors = diagnostics.len(), "Configure rejected");
            return Ok(diagnostics);
        }

        info!(
            region = config.region.as_deref().unwrap_or("default"),
            default_tags = config.default_tags.len(),
            "Provider configured"
        );
        *self.config.write().await = Some(config);
        Ok(diagnostics)
    }

    #[instrument(skip(self))]
    async fn stop(&self) -> Result<(), ProviderError> {
        info!("Provider stopping");
        Ok(())
    }

    #[instrument(skip(self, config))]
    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        check_resource_type(resource_type)?;
        let config = ParameterGroupConfig::from_value(config)?;
        Ok(validate_parameter_group_config(&config))
    }

    #[instrument(skip(self, prior_state, proposed_state, _config))]
    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        _config: Value,
    ) -> Result<PlanResult, ProviderError> {
        let resource = self.resource(resource_type).await?;
        let prior = match prior_state {
            Some(value) => decode_state(value)?,
            None => None,
        };
        let proposed = match proposed_state {
            Value::Null => None,
            value => Some(decode_config(value)?),
        };

        let plan = resource.plan(prior.as_ref(), proposed.as_ref())?;
        debug!(
            changes = plan.changes.len(),
            requires_replace = plan.requires_replace,
            "Plan completed"
        );
        Ok(plan)
    }

    #[instrument(skip(self, planned_state))]
    async fn create(&self, resource_type: &str, planned_state: Value) -> Result<Value, ProviderError> {
        info!(resource_type, "Create called");
        let resource = self.resource(resource_type).await?;
        let config = decode_config(planned_state)?;

        match resource.create(&config).await {
            Ok(state) => Ok(state.to_value()?),
            Err(e) => {
                error!(
                    resource_type,
                    error = %e,
                    created = e.partial_state().is_some(),
                    "Create failed"
                );
                Err(e)
            },
        }
    }

    #[instrument(skip(self, current_state))]
    async fn read(&self, resource_type: &str, current_state: Value) -> Result<Value, ProviderError> {
        debug!(resource_type, "Read called");
        let resource = self.resource(resource_type).await?;
        let Some(state) = decode_state(current_state)? else {
            return Ok(Value::Null);
        };

        match resource.read(&state.id, &state.parameter, false).await {
            Ok(Some(state)) => Ok(state.to_value()?),
            Ok(None) => Ok(Value::Null),
            Err(e) => {
                error!(resource_type, id = %state.id, error = %e, "Read failed");
                Err(e)
            },
        }
    }

    #[instrument(skip(self, prior_state, planned_state))]
    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        info!(resource_type, "Update called");
        let resource = self.resource(resource_type).await?;
        let prior = decode_state(prior_state)?.ok_or_else(|| {
            ProviderError::Validation("update requires a prior state".to_string())
        })?;
        let planned = decode_config(planned_state)?;

        match resource.update(&prior, &planned).await {
            Ok(state) => Ok(state.to_value()?),
            Err(e) => {
                error!(resource_type, id = %prior.id, error = %e, "Update failed");
                Err(e)
            },
        }
    }

    #[instrument(skip(self, current_state))]
    async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError> {
        info!(resource_type, "Delete called");
        let resource = self.resource(resource_type).await?;
        let Some(state) = decode_state(current_state)? else {
            return Ok(());
        };

        resource.delete(&state.id).await.inspect_err(|e| {
            error!(resource_type, id = %state.id, error = %e, "Delete failed");
        })
    }

    #[instrument(skip(self))]
    async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        info!(resource_type, id, "Import called");
        let resource = self.resource(resource_type).await?;
        let state = resource.import(id).await?;
        Ok(vec![ImportedResource::new(resource_type, state.to_value()?)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::RemoteParameter;
    use crate::error::ApiError;
    use crate::testing::{
        assert_error_contains, assert_plan_changes_attribute, assert_plan_creates,
        assert_plan_no_changes, assert_plan_replaces, assert_plan_updates_in_place, FakeMemoryDb,
        ProviderTester, TestError,
    };
    use serde_json::json;

    const FAMILY: &str = "memorydb_redis6";

    fn tester() -> (Arc<FakeMemoryDb>, ProviderTester<MemoryDbProvider<FakeMemoryDb>>) {
        let fake = Arc::new(FakeMemoryDb::new().with_family_defaults(
            FAMILY,
            [
                RemoteParameter::new("maxmemory-policy", "noeviction"),
                RemoteParameter::new("timeout", "0"),
            ],
        ));
        let tester = ProviderTester::new(MemoryDbProvider::new(fake.clone()));
        (fake, tester)
    }

    async fn configured() -> (Arc<FakeMemoryDb>, ProviderTester<MemoryDbProvider<FakeMemoryDb>>) {
        let (fake, tester) = tester();
        tester.configure(json!({})).await.unwrap();
        (fake, tester)
    }

    #[test]
    fn test_schema_and_metadata() {
        let (_, tester) = tester();
        let schema = tester.schema();
        let resource = &schema.resources[RESOURCE_TYPE];

        assert!(resource.attribute("family").unwrap().force_new);
        assert!(resource.attribute("arn").unwrap().flags.computed);
        assert!(resource.block.blocks.contains_key("parameter"));
        assert!(schema.provider.block.blocks.contains_key("ignore_tags"));
        assert_eq!(tester.resource_types(), vec![RESOURCE_TYPE.to_string()]);
    }

    #[tokio::test]
    async fn test_operations_require_configure() {
        let (_, tester) = tester();
        let err = tester
            .create(RESOURCE_TYPE, json!({"family": FAMILY}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::FailedPrecondition(_)));
    }

    #[tokio::test]
    async fn test_configure_rejects_invalid_config() {
        let (_, tester) = tester();
        let result = tester
            .configure(json!({"default_tags": {"aws:team": "x"}}))
            .await;
        match result {
            Err(TestError::Diagnostics(diags)) => assert_error_contains(&diags, "default tag"),
            other => panic!("expected diagnostics, got {:?}", other),
        }

        // A rejected configuration is not stored.
        let err = tester.read(RESOURCE_TYPE, json!({"id": "g"})).await.unwrap_err();
        assert!(matches!(err, ProviderError::FailedPrecondition(_)));
    }

    #[tokio::test]
    async fn test_unknown_resource_type() {
        let (_, tester) = configured().await;
        let err = tester
            .plan_create("aws_memorydb_cluster", json!({"family": FAMILY}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::UnknownResource(_)));
        assert_eq!(err.to_string(), "Unknown resource type: aws_memorydb_cluster");
    }

    #[tokio::test]
    async fn test_configure_rejects_malformed_config() {
        let (_, tester) = tester();
        let err = tester
            .provider()
            .configure(json!({"default_tags": ["not", "a", "map"]}))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_validate_resource_config() {
        let (_, tester) = configured().await;
        assert!(tester
            .validate_resource_config(RESOURCE_TYPE, json!({"family": FAMILY, "name": "ok"}))
            .await
            .is_ok());

        let result = tester
            .validate_resource_config(RESOURCE_TYPE, json!({"family": FAMILY, "name": "Bad--Name"}))
            .await;
        assert!(matches!(result, Err(TestError::Diagnostics(_))));
    }

    #[tokio::test]
    async fn test_plan_rejects_invalid_config() {
        let (_, tester) = configured().await;
        let err = tester
            .plan_create(
                RESOURCE_TYPE,
                json!({"family": FAMILY, "name": "a", "name_prefix": "b-"}),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Validation(_)));
        assert!(err.to_string().contains("name_prefix"));
    }

    #[tokio::test]
    async fn test_plan_reports_every_validation_error() {
        let (_, tester) = configured().await;
        let config = json!({
            "family": FAMILY,
            "name": "a",
            "name_prefix": "b-",
            "parameter": [
                {"name": "timeout", "value": "1"},
                {"name": "Timeout", "value": "2"}
            ]
        });
        let expected = validate_result(&ParameterGroupConfig::from_value(config.clone()).unwrap())
            .unwrap_err()
            .len();
        assert!(expected >= 2);

        let err = tester.plan_create(RESOURCE_TYPE, config).await.unwrap_err();
        match err {
            ProviderError::Validation(message) => {
                assert_eq!(message.split("; ").count(), expected)
            },
            other => panic!("expected a validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_create_failure_after_group_exists_returns_state() {
        let (fake, tester) = configured().await;
        fake.fail_next("update_parameter_group", ApiError::new("InvalidParameterValue", "bad"));
        let config = json!({
            "name": "sessions",
            "family": FAMILY,
            "parameter": [{"name": "timeout", "value": "60"}]
        });

        let err = tester.create(RESOURCE_TYPE, config.clone()).await.unwrap_err();
        let partial = err.partial_state().cloned().unwrap();
        assert_eq!(partial.id, "sessions");
        assert!(fake.has_group("sessions"));

        let status: tonic::Status = err.into();
        assert_eq!(status.code(), tonic::Code::Unknown);

        let state = tester
            .update(RESOURCE_TYPE, partial.to_value().unwrap(), config)
            .await
            .unwrap();
        assert_eq!(state["parameter"], json!([{"name": "timeout", "value": "60"}]));
        assert_eq!(fake.calls_named("create_parameter_group"), 1);
    }

    #[tokio::test]
    async fn test_lifecycle_crud() {
        let (fake, tester) = configured().await;

        let initial = json!({
            "name": "sessions",
            "family": FAMILY,
            "parameter": [
                {"name": "maxmemory-policy", "value": "allkeys-lru"},
                {"name": "timeout", "value": "60"}
            ]
        });
        let updated = json!({
            "name": "sessions",
            "family": FAMILY,
            "parameter": [{"name": "timeout", "value": "120"}],
            "tags": {"env": "prod"}
        });

        let state = tester
            .lifecycle_crud(RESOURCE_TYPE, initial, updated)
            .await
            .unwrap();

        assert_eq!(state["id"], "sessions");
        assert_eq!(state["parameter"], json!([{"name": "timeout", "value": "120"}]));
        assert_eq!(state["tags"]["env"], "prod");
        assert!(!fake.has_group("sessions"));
    }

    #[tokio::test]
    async fn test_plan_lifecycle() {
        let (_, tester) = configured().await;
        let config = json!({
            "name": "g",
            "family": FAMILY,
            "parameter": [{"name": "timeout", "value": "60"}]
        });

        let plan = tester.plan_create(RESOURCE_TYPE, config.clone()).await.unwrap();
        assert_plan_creates(&plan);
        let state = tester
            .create(RESOURCE_TYPE, plan.planned_state)
            .await
            .unwrap();

        let plan = tester
            .plan_update(RESOURCE_TYPE, state.clone(), config)
            .await
            .unwrap();
        assert_plan_no_changes(&plan);

        let plan = tester
            .plan_update(
                RESOURCE_TYPE,
                state.clone(),
                json!({"name": "g", "family": FAMILY, "parameter": [{"name": "timeout", "value": "90"}]}),
            )
            .await
            .unwrap();
        assert_plan_changes_attribute(&plan, "parameter");
        assert_plan_updates_in_place(&plan);

        let plan = tester
            .plan_update(
                RESOURCE_TYPE,
                state,
                json!({"name": "g", "family": FAMILY, "description": "new"}),
            )
            .await
            .unwrap();
        assert_plan_changes_attribute(&plan, "description");
        assert_plan_replaces(&plan);
    }

    #[tokio::test]
    async fn test_read_missing_returns_null() {
        let (fake, tester) = configured().await;
        let state = tester
            .lifecycle_create(RESOURCE_TYPE, json!({"name": "g", "family": FAMILY}))
            .await
            .unwrap();

        fake.remove_group("g");
        let read = tester.read(RESOURCE_TYPE, state).await.unwrap();
        assert!(read.is_null());
    }

    #[tokio::test]
    async fn test_read_surfaces_api_errors() {
        let (fake, tester) = configured().await;
        fake.insert_group("g", FAMILY, []);
        fake.fail_next("describe_parameter_group", ApiError::new("AccessDenied", "no"));

        let err = tester.read(RESOURCE_TYPE, json!({"id": "g"})).await.unwrap_err();
        let status: tonic::Status = err.into();
        assert_eq!(status.code(), tonic::Code::Unknown);
    }

    #[tokio::test]
    async fn test_import() {
        let (fake, tester) = configured().await;
        fake.insert_group("existing", FAMILY, [RemoteParameter::new("timeout", "15")]);

        let imported = tester.import_resource(RESOURCE_TYPE, "existing").await.unwrap();
        assert_eq!(imported.len(), 1);
        assert_eq!(imported[0].resource_type, RESOURCE_TYPE);
        assert_eq!(imported[0].state["family"], FAMILY);
        assert_eq!(
            imported[0].state["parameter"],
            json!([{"name": "timeout", "value": "15"}])
        );

        let err = tester.import_resource(RESOURCE_TYPE, "missing").await.unwrap_err();
        let status: tonic::Status = err.into();
        assert_eq!(status.code(), tonic::Code::NotFound);
    }

    #[tokio::test]
    async fn test_default_tags_flow_into_tags_all() {
        let (_, tester) = tester();
        tester
            .configure(json!({"default_tags": {"team": "platform"}}))
            .await
            .unwrap();

        let state = tester
            .lifecycle_create(
                RESOURCE_TYPE,
                json!({"name": "g", "family": FAMILY, "tags": {"env": "dev"}}),
            )
            .await
            .unwrap();

        assert_eq!(state["tags"], json!({"env": "dev"}));
        assert_eq!(state["tags_all"], json!({"env": "dev", "team": "platform"}));
    }

    #[tokio::test]
    async fn test_delete_missing_is_ok() {
        let (_, tester) = configured().await;
        tester
            .delete(RESOURCE_TYPE, json!({"id": "never-existed"}))
            .await
            .unwrap();
    }
}
