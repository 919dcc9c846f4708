//! Hemmer provider for MemoryDB parameter groups.
//!
//! This crate implements the `aws_memorydb_parameter_group` resource: a named,
//! family-scoped set of engine configuration parameters. The provider keeps
//! the declared parameters of a group in sync with the service, resetting
//! parameters that are no longer declared and writing changed values, and
//! reports back only the parameters that matter.
//!
//! # Overview
//!
//! - [`parameters`]: the pure differencer and effective-state filter
//! - [`reconcile`]: batched reset/update calls and the effective-state lister
//! - [`resource`]: create, read, update, delete, import and plan
//! - [`provider`]: the host-facing [`ProviderService`] and [`MemoryDbProvider`]
//! - [`client`]: the [`MemoryDbApi`] trait the provider consumes
//! - [`testing`]: an in-memory [`MemoryDbApi`] and a lifecycle test harness
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use hemmer_provider_memorydb::{init_logging, MemoryDbProvider, ProviderService};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     init_logging();
//!
//!     let provider = MemoryDbProvider::new(Arc::new(my_sdk_client()));
//!     provider.configure(json!({"region": "us-east-1"})).await?;
//!
//!     let plan = provider
//!         .plan(
//!             "aws_memorydb_parameter_group",
//!             None,
//!             json!({"name": "sessions", "family": "memorydb_redis6"}),
//!             json!({}),
//!         )
//!         .await?;
//!     provider
//!         .create("aws_memorydb_parameter_group", plan.planned_state)
//!         .await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod naming;
pub mod parameters;
pub mod provider;
pub mod reconcile;
pub mod resource;
pub mod retry;
pub mod schema;
pub mod tags;
pub mod testing;
pub mod types;
pub mod validation;

// Re-export main types at crate root
pub use client::MemoryDbApi;
pub use config::{ParameterGroupConfig, ParameterGroupState, ProviderConfig};
pub use error::{ApiError, ProviderError};
pub use logging::{init_logging, init_logging_with_default, try_init_logging};
pub use parameters::{diff, effective_parameters, Parameter, ParameterChanges};
pub use provider::{MemoryDbProvider, ProviderService};
pub use resource::{ParameterGroupResource, RESOURCE_TYPE};
pub use retry::RetryPolicy;
pub use schema::ProviderSchema;
pub use types::{AttributeChange, ImportedResource, PlanResult, ProviderMetadata};
pub use validation::validate_result;

// Re-export async_trait for convenience
pub use async_trait::async_trait;

// Re-export commonly used external types
pub use serde_json;
pub use tonic;
pub use tracing;
