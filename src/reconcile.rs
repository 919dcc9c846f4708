//! Pushing parameter changes to the service and reading back the effective set.
//!
//! The service accepts at most [`MAX_PARAMETERS_PER_REQUEST`] parameters per
//! call and has no multi-call transaction, so a failure in a later batch leaves
//! earlier batches applied.

use std::collections::BTreeSet;
use std::future::Future;

use tracing::{debug, info};

use crate::client::{describe_all_parameters, MemoryDbApi, ParameterNameValue};
use crate::error::{ApiError, ProviderError};
use crate::parameters::{effective_parameters, DefaultsNaming, Parameter, ParameterChanges};
use crate::retry::{Attempt, RetryPolicy};

/// Most parameters a single reset or update call may carry.
pub const MAX_PARAMETERS_PER_REQUEST: usize = 20;

/// Call `send` once per consecutive chunk of at most `batch_size` items.
///
/// Stops at the first error. Returns the number of calls made.
pub async fn for_each_batch<T, E, F, Fut>(
    items: Vec<T>,
    batch_size: usize,
    mut send: F,
) -> Result<usize, E>
where
    F: FnMut(Vec<T>) -> Fut,
    Fut: Future<Output = Result<(), E>>,
{
    let batch_size = batch_size.max(1);
    let mut remaining = items;
    let mut calls = 0;

    while !remaining.is_empty() {
        let rest = remaining.split_off(remaining.len().min(batch_size));
        send(remaining).await?;
        calls += 1;
        remaining = rest;
    }

    Ok(calls)
}

/// Reset `names` to their family defaults, in batches.
///
/// Each batch is retried while the group reports pending changes.
pub async fn reset_parameters<C>(
    client: &C,
    group: &str,
    names: Vec<String>,
    retry: &RetryPolicy,
) -> Result<(), ApiError>
where
    C: MemoryDbApi + ?Sized,
{
    let calls = for_each_batch(names, MAX_PARAMETERS_PER_REQUEST, move |batch| async move {
        retry
            .run(move || {
                let batch = batch.clone();
                async move {
                    client
                        .reset_parameter_group(group, batch)
                        .await
                        .map_err(|err| {
                            if err.is_pending_changes() {
                                Attempt::Retry(err)
                            } else {
                                Attempt::Abort(err)
                            }
                        })
                }
            })
            .await
    })
    .await?;

    debug!(group, calls, "Reset parameters to defaults");
    Ok(())
}

/// Write explicit parameter values, in batches. Not retried.
pub async fn update_parameters<C>(
    client: &C,
    group: &str,
    parameters: Vec<ParameterNameValue>,
) -> Result<(), ApiError>
where
    C: MemoryDbApi + ?Sized,
{
    let calls = for_each_batch(parameters, MAX_PARAMETERS_PER_REQUEST, move |batch| {
        client.update_parameter_group(group, batch)
    })
    .await?;

    debug!(group, calls, "Updated parameters");
    Ok(())
}

/// Apply a parameter diff: resets first, then updates.
pub async fn apply_parameter_changes<C>(
    client: &C,
    group: &str,
    changes: ParameterChanges,
    retry: &RetryPolicy,
) -> Result<(), ProviderError>
where
    C: MemoryDbApi + ?Sized,
{
    if changes.is_empty() {
        return Ok(());
    }

    info!(
        id = group,
        reset = changes.reset.len(),
        apply = changes.apply.len(),
        "Updating MemoryDB Parameter Group parameters"
    );
    debug!(id = group, to_remove = ?changes.reset, to_apply = ?changes.apply, "Parameter changes");

    let names = changes.reset.into_iter().map(|p| p.name).collect();
    reset_parameters(client, group, names, retry)
        .await
        .map_err(|e| ProviderError::api("resetting parameters to defaults of", group, e))?;

    let values = changes.apply.into_iter().map(ParameterNameValue::from).collect();
    update_parameters(client, group, values)
        .await
        .map_err(|e| ProviderError::api("modifying parameters of", group, e))?;

    Ok(())
}

/// List the parameters of `group` that differ from the defaults of `family`
/// or are named in `declared`.
pub async fn list_effective_parameters<C>(
    client: &C,
    family: &str,
    group: &str,
    declared: &BTreeSet<String>,
    naming: DefaultsNaming,
) -> Result<Vec<Parameter>, ProviderError>
where
    C: MemoryDbApi + ?Sized,
{
    let defaults_group = naming(family);

    let defaults = describe_all_parameters(client, &defaults_group)
        .await
        .map_err(|e| {
            ProviderError::api(
                format!("listing defaults for family {} of", defaults_group),
                group,
                e,
            )
        })?;

    let current = describe_all_parameters(client, group)
        .await
        .map_err(|e| ProviderError::api("listing parameters for", group, e))?;

    Ok(effective_parameters(&defaults, current, declared))
}
