//! The `aws_memorydb_parameter_group` resource.
//!
//! [`ParameterGroupResource`] ties the pieces together: naming on create,
//! parameter reconciliation on create and update, tag handling, and the
//! read-back that produces state. Each operation runs its remote calls in
//! sequence and returns once the group has been read back.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::client::{CreateParameterGroupInput, MemoryDbApi};
use crate::config::{
    ParameterGroupConfig, ParameterGroupState, ProviderConfig, DEFAULT_DESCRIPTION,
};
use crate::error::ProviderError;
use crate::naming::{name_prefix_from_name, resolve_name};
use crate::parameters::{
    declared_names, default_parameter_group_name, diff, normalize_names, DefaultsNaming, Parameter,
};
use crate::reconcile::{apply_parameter_changes, list_effective_parameters};
use crate::retry::RetryPolicy;
use crate::schema::{Attribute, AttributeFlags, AttributeType, Block, NestedBlock, Schema};
use crate::tags::{filter_ignored, merge_default_tags, remove_default_tags, update_tags, Tags};
use crate::types::{AttributeChange, PlanResult};

/// Resource type name served by this crate.
pub const RESOURCE_TYPE: &str = "aws_memorydb_parameter_group";

/// Lifecycle operations for one MemoryDB parameter group.
///
/// Built per operation from the shared client handle and a snapshot of the
/// provider configuration.
pub struct ParameterGroupResource<C: ?Sized> {
    client: Arc<C>,
    config: ProviderConfig,
    retry: RetryPolicy,
    defaults_naming: DefaultsNaming,
}

impl<C: MemoryDbApi + ?Sized> ParameterGroupResource<C> {
    /// Create the resource handler.
    pub fn new(client: Arc<C>, config: ProviderConfig) -> Self {
        Self {
            client,
            config,
            retry: RetryPolicy::default(),
            defaults_naming: default_parameter_group_name,
        }
    }

    /// Override the retry budget used when resetting parameters.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Override how a family maps to its defaults group.
    pub fn with_defaults_naming(mut self, naming: DefaultsNaming) -> Self {
        self.defaults_naming = naming;
        self
    }

    /// The resource schema.
    pub fn schema() -> Schema {
        let string_map = || AttributeType::map(AttributeType::String);

        Schema::v0()
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("arn", Attribute::computed_string())
            .with_attribute(
                "description",
                Attribute::optional_string()
                    .with_force_new()
                    .with_default(json!(DEFAULT_DESCRIPTION)),
            )
            .with_attribute(
                "family",
                Attribute::required_string()
                    .with_description("Engine family the group belongs to")
                    .with_force_new(),
            )
            .with_attribute(
                "name",
                Attribute::optional_computed_string()
                    .with_force_new()
                    .with_conflict("name_prefix"),
            )
            .with_attribute(
                "name_prefix",
                Attribute::optional_computed_string()
                    .with_force_new()
                    .with_conflict("name"),
            )
            .with_attribute(
                "tags",
                Attribute::new(string_map(), AttributeFlags::optional()),
            )
            .with_attribute(
                "tags_all",
                Attribute::new(string_map(), AttributeFlags::computed()),
            )
            .with_block(
                "parameter",
                NestedBlock::set(
                    Block::new()
                        .with_attribute("name", Attribute::required_string())
                        .with_attribute("value", Attribute::required_string()),
                ),
            )
    }

    /// Create the group, apply its declared parameters and read it back.
    ///
    /// Once the group exists, any later failure is returned as
    /// [`ProviderError::PartialCreate`] carrying the created group's state,
    /// with no parameters recorded.
    pub async fn create(
        &self,
        config: &ParameterGroupConfig,
    ) -> Result<ParameterGroupState, ProviderError> {
        let name = resolve_name(config.name.as_deref(), config.name_prefix.as_deref());
        let tags_all = merge_default_tags(&self.config.default_tags, &config.tags);

        debug!(id = %name, family = %config.family, "Creating MemoryDB Parameter Group");
        let group = self
            .client
            .create_parameter_group(CreateParameterGroupInput {
                name: name.clone(),
                family: config.family.clone(),
                description: config.description.clone(),
                tags: tags_all.clone(),
            })
            .await
            .map_err(|e| ProviderError::api("creating", &name, e))?;
        info!(id = %group.name, arn = %group.arn, "MemoryDB Parameter Group created");

        let declared = normalize_names(&config.parameter);
        let configured = async {
            apply_parameter_changes(&*self.client, &name, diff(&[], &declared), &self.retry)
                .await?;
            self.read(&name, &declared, true).await?.ok_or_else(|| {
                ProviderError::NotFound(format!("MemoryDB Parameter Group ({})", name))
            })
        }
        .await;

        configured.map_err(|e| {
            warn!(id = %name, error = %e, "MemoryDB Parameter Group created but not configured");
            let tags_all = filter_ignored(tags_all, &self.config.ignore_tags);
            let state = ParameterGroupState {
                id: name.clone(),
                arn: group.arn,
                name_prefix: name_prefix_from_name(&group.name),
                name: group.name,
                family: group.family,
                description: group.description,
                parameter: Vec::new(),
                tags: remove_default_tags(&tags_all, &self.config.default_tags),
                tags_all,
            };
            ProviderError::partial_create(state, e)
        })
    }

    /// Read the group.
    ///
    /// `declared` is the user's parameter set; those parameters are reported
    /// even when they hold the family default. Returns `Ok(None)` when the
    /// group is gone, unless it was `fresh`ly created in this operation, in
    /// which case a missing group is an error.
    pub async fn read(
        &self,
        id: &str,
        declared: &[Parameter],
        fresh: bool,
    ) -> Result<Option<ParameterGroupState>, ProviderError> {
        let group = match self.client.describe_parameter_group(id).await {
            Ok(group) => group,
            Err(e) if e.is_not_found() && !fresh => {
                warn!(id, "MemoryDB Parameter Group not found, removing from state");
                return Ok(None);
            },
            Err(e) => return Err(ProviderError::api("reading", id, e)),
        };

        let parameter = list_effective_parameters(
            &*self.client,
            &group.family,
            id,
            &declared_names(declared),
            self.defaults_naming,
        )
        .await?;

        let remote_tags = self
            .client
            .list_tags(&group.arn)
            .await
            .map_err(|e| ProviderError::api("listing tags for", id, e))?;
        let tags_all = filter_ignored(remote_tags, &self.config.ignore_tags);
        let tags = remove_default_tags(&tags_all, &self.config.default_tags);

        debug!(id, parameters = parameter.len(), tags = tags_all.len(), "Read MemoryDB Parameter Group");

        Ok(Some(ParameterGroupState {
            id: id.to_string(),
            arn: group.arn,
            name_prefix: name_prefix_from_name(&group.name),
            name: group.name,
            family: group.family,
            description: group.description,
            parameter,
            tags,
            tags_all,
        }))
    }

    /// Move the group from `prior` to the `planned` configuration.
    ///
    /// Only parameters and tags change in place; everything else forces
    /// replacement and never reaches here.
    pub async fn update(
        &self,
        prior: &ParameterGroupState,
        planned: &ParameterGroupConfig,
    ) -> Result<ParameterGroupState, ProviderError> {
        let id = prior.id.as_str();
        let declared = normalize_names(&planned.parameter);

        let changes = diff(&prior.parameter, &declared);
        apply_parameter_changes(&*self.client, id, changes, &self.retry).await?;

        let tags_all = merge_default_tags(&self.config.default_tags, &planned.tags);
        if tags_all != prior.tags_all {
            update_tags(&*self.client, &prior.arn, &prior.tags_all, &tags_all)
                .await
                .map_err(|e| ProviderError::api("updating tags for", id, e))?;
        }

        self.read(id, &declared, false)
            .await?
            .ok_or_else(|| ProviderError::NotFound(format!("MemoryDB Parameter Group ({})", id)))
    }

    /// Delete the group. A group that is already gone counts as deleted.
    pub async fn delete(&self, id: &str) -> Result<(), ProviderError> {
        debug!(id, "Deleting MemoryDB Parameter Group");
        match self.client.delete_parameter_group(id).await {
            Ok(()) => {
                info!(id, "MemoryDB Parameter Group deleted");
                Ok(())
            },
            Err(e) if e.is_not_found() => {
                debug!(id, "MemoryDB Parameter Group already absent");
                Ok(())
            },
            Err(e) => Err(ProviderError::api("deleting", id, e)),
        }
    }

    /// Adopt an existing group by name.
    pub async fn import(&self, id: &str) -> Result<ParameterGroupState, ProviderError> {
        self.read(id, &[], false)
            .await?
            .ok_or_else(|| ProviderError::NotFound(format!("MemoryDB Parameter Group ({})", id)))
    }

    /// Compute the changes between `prior` state and the `proposed` config.
    ///
    /// `None` for `prior` plans a create; `None` for `proposed` plans a destroy.
    pub fn plan(
        &self,
        prior: Option<&ParameterGroupState>,
        proposed: Option<&ParameterGroupConfig>,
    ) -> Result<PlanResult, ProviderError> {
        match (prior, proposed) {
            (None, None) => Ok(PlanResult::no_change(Value::Null)),
            (None, Some(config)) => self.plan_create(config),
            (Some(prior), None) => plan_destroy(prior),
            (Some(prior), Some(config)) => self.plan_update(prior, config),
        }
    }

    fn planned_value(
        &self,
        config: &ParameterGroupConfig,
        tags_all: &Tags,
    ) -> Result<Value, ProviderError> {
        let mut planned = serde_json::to_value(config)?;
        if let Value::Object(map) = &mut planned {
            map.insert("tags_all".to_string(), serde_json::to_value(tags_all)?);
        }
        Ok(planned)
    }

    fn plan_create(&self, config: &ParameterGroupConfig) -> Result<PlanResult, ProviderError> {
        let tags_all = merge_default_tags(&self.config.default_tags, &config.tags);
        let declared = normalize_names(&config.parameter);

        let mut changes = vec![
            AttributeChange::added("family", json!(config.family)),
            AttributeChange::added("description", json!(config.description)),
        ];
        if let Some(name) = &config.name {
            changes.push(AttributeChange::added("name", json!(name)));
        }
        if let Some(prefix) = &config.name_prefix {
            changes.push(AttributeChange::added("name_prefix", json!(prefix)));
        }
        if !declared.is_empty() {
            changes.push(AttributeChange::added("parameter", serde_json::to_value(&declared)?));
        }
        if !config.tags.is_empty() {
            changes.push(AttributeChange::added("tags", serde_json::to_value(&config.tags)?));
        }
        if !tags_all.is_empty() {
            changes.push(AttributeChange::added("tags_all", serde_json::to_value(&tags_all)?));
        }

        Ok(PlanResult::with_changes(
            self.planned_value(config, &tags_all)?,
            changes,
            false,
        ))
    }

    fn plan_update(
        &self,
        prior: &ParameterGroupState,
        config: &ParameterGroupConfig,
    ) -> Result<PlanResult, ProviderError> {
        let mut changes = Vec::new();

        if config.description != prior.description {
            changes.push(AttributeChange::modified(
                "description",
                json!(prior.description),
                json!(config.description),
            ));
        }
        if config.family != prior.family {
            changes.push(AttributeChange::modified(
                "family",
                json!(prior.family),
                json!(config.family),
            ));
        }
        if let Some(name) = config.name.as_ref().filter(|n| **n != prior.name) {
            changes.push(AttributeChange::modified("name", json!(prior.name), json!(name)));
        }
        if let Some(prefix) = config
            .name_prefix
            .as_ref()
            .filter(|p| prior.name_prefix.as_ref() != Some(*p))
        {
            changes.push(AttributeChange::modified(
                "name_prefix",
                json!(prior.name_prefix),
                json!(prefix),
            ));
        }

        let mut declared = normalize_names(&config.parameter);
        if !diff(&prior.parameter, &declared).is_empty() {
            declared.sort();
            changes.push(AttributeChange::modified(
                "parameter",
                serde_json::to_value(&prior.parameter)?,
                serde_json::to_value(&declared)?,
            ));
        }

        if config.tags != prior.tags {
            changes.push(AttributeChange::modified(
                "tags",
                serde_json::to_value(&prior.tags)?,
                serde_json::to_value(&config.tags)?,
            ));
        }
        let tags_all = merge_default_tags(&self.config.default_tags, &config.tags);
        if tags_all != prior.tags_all {
            changes.push(AttributeChange::modified(
                "tags_all",
                serde_json::to_value(&prior.tags_all)?,
                serde_json::to_value(&tags_all)?,
            ));
        }

        let schema = Self::schema();
        let requires_replace = changes.iter().any(|c| {
            schema
                .attribute(&c.path)
                .map(|a| a.force_new)
                .unwrap_or(false)
        });

        let mut planned = self.planned_value(config, &tags_all)?;
        if !requires_replace {
            if let Value::Object(map) = &mut planned {
                map.insert("id".to_string(), json!(prior.id));
                map.insert("arn".to_string(), json!(prior.arn));
                if config.name.is_none() && config.name_prefix.is_none() {
                    map.insert("name".to_string(), json!(prior.name));
                }
            }
        }

        Ok(PlanResult::with_changes(planned, changes, requires_replace))
    }
}

fn plan_destroy(prior: &ParameterGroupState) -> Result<PlanResult, ProviderError> {
    let mut changes = vec![
        AttributeChange::removed("id", json!(prior.id)),
        AttributeChange::removed("arn", json!(prior.arn)),
        AttributeChange::removed("name", json!(prior.name)),
    ];
    if let Some(prefix) = &prior.name_prefix {
        changes.push(AttributeChange::removed("name_prefix", json!(prefix)));
    }
    changes.extend([
        AttributeChange::removed("family", json!(prior.family)),
        AttributeChange::removed("description", json!(prior.description)),
        AttributeChange::removed("parameter", serde_json::to_value(&prior.parameter)?),
        AttributeChange::removed("tags", serde_json::to_value(&prior.tags)?),
        AttributeChange::removed("tags_all", serde_json::to_value(&prior.tags_all)?),
    ]);
    Ok(PlanResult::with_changes(Value::Null, changes, false))
}
