//! Error types for the MemoryDB provider.

use thiserror::Error;

use crate::config::ParameterGroupState;

/// Error code returned when the named parameter group does not exist.
pub const PARAMETER_GROUP_NOT_FOUND: &str = "ParameterGroupNotFoundFault";

/// Error code returned when the group is in a state that blocks modification.
pub const INVALID_PARAMETER_GROUP_STATE: &str = "InvalidParameterGroupStateFault";

/// Error code returned when creating a group whose name is taken.
pub const PARAMETER_GROUP_ALREADY_EXISTS: &str = "ParameterGroupAlreadyExistsFault";

const PENDING_CHANGES_MESSAGE: &str = " has pending changes";

/// A failure reported by the remote MemoryDB API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {message}")]
pub struct ApiError {
    /// The service error code (e.g. `ParameterGroupNotFoundFault`).
    pub code: String,
    /// The human-readable message from the service.
    pub message: String,
}

impl ApiError {
    /// Create a new API error.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Convenience constructor for a missing parameter group.
    pub fn not_found(name: &str) -> Self {
        Self::new(
            PARAMETER_GROUP_NOT_FOUND,
            format!("Parameter group {} not found", name),
        )
    }

    /// Convenience constructor for the transient "pending changes" conflict.
    pub fn pending_changes(name: &str) -> Self {
        Self::new(
            INVALID_PARAMETER_GROUP_STATE,
            format!("Parameter group {}{}", name, PENDING_CHANGES_MESSAGE),
        )
    }

    /// Whether the error means the parameter group does not exist.
    pub fn is_not_found(&self) -> bool {
        self.code == PARAMETER_GROUP_NOT_FOUND
    }

    /// Whether the error is the transient conflict raised while an earlier
    /// modification of the group is still propagating.
    pub fn is_pending_changes(&self) -> bool {
        self.code == INVALID_PARAMETER_GROUP_STATE && self.message.contains(PENDING_CHANGES_MESSAGE)
    }
}

/// Errors that can occur while managing a parameter group.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The requested resource was not found.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// A validation error occurred.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A configuration error occurred.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The requested resource type is unknown.
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Operation failed due to current provider state (precondition not met).
    #[error("Failed precondition: {0}")]
    FailedPrecondition(String),

    /// A remote API call failed.
    #[error("error {operation} MemoryDB Parameter Group ({id}): {source}")]
    Api {
        /// What the provider was doing, e.g. "creating".
        operation: String,
        /// The parameter group name.
        id: String,
        /// The underlying service error.
        #[source]
        source: ApiError,
    },

    /// The group was created but a later step of the create failed.
    ///
    /// `state` describes the group that now exists remotely.
    #[error("{source}")]
    PartialCreate {
        /// State of the created group.
        state: Box<ParameterGroupState>,
        /// The failure that interrupted the create.
        #[source]
        source: Box<ProviderError>,
    },
}

impl ProviderError {
    /// Wrap a remote failure with the operation and resource it belongs to.
    pub fn api(operation: impl Into<String>, id: impl Into<String>, source: ApiError) -> Self {
        Self::Api {
            operation: operation.into(),
            id: id.into(),
            source,
        }
    }

    /// Attach the state of an already created group to a create failure.
    pub fn partial_create(state: ParameterGroupState, source: ProviderError) -> Self {
        Self::PartialCreate {
            state: Box::new(state),
            source: Box::new(source),
        }
    }

    /// The state of a group left behind by a failed create.
    pub fn partial_state(&self) -> Option<&ParameterGroupState> {
        match self {
            Self::PartialCreate { state, .. } => Some(state.as_ref()),
            _ => None,
        }
    }

    /// Get the error message as a string.
    pub fn message(&self) -> &str {
        match self {
            Self::NotFound(msg) => msg,
            Self::Validation(msg) => msg,
            Self::Configuration(msg) => msg,
            Self::UnknownResource(msg) => msg,
            Self::Serialization(_err) => "serialization error (see Debug output)",
            Self::FailedPrecondition(msg) => msg,
            Self::Api { source, .. } => &source.message,
            Self::PartialCreate { source, .. } => source.message(),
        }
    }

    /// The remote error behind this failure, if any.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Self::Api { source, .. } => Some(source),
            Self::PartialCreate { source, .. } => source.api_error(),
            _ => None,
        }
    }
}

impl From<ProviderError> for tonic::Status {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::NotFound(msg) => tonic::Status::not_found(msg),
            ProviderError::Validation(msg) => tonic::Status::invalid_argument(msg),
            ProviderError::Configuration(msg) => tonic::Status::failed_precondition(msg),
            ProviderError::UnknownResource(msg) => tonic::Status::not_found(msg),
            ProviderError::Serialization(err) => {
                tonic::Status::invalid_argument(format!("Serialization error: {}", err))
            },
            ProviderError::FailedPrecondition(msg) => tonic::Status::failed_precondition(msg),
            ProviderError::PartialCreate { source, .. } => (*source).into(),
            err @ ProviderError::Api { .. } => {
                let message = err.to_string();
                match err.api_error().map(|e| e.code.as_str()) {
                    Some(PARAMETER_GROUP_NOT_FOUND) => tonic::Status::not_found(message),
                    Some(INVALID_PARAMETER_GROUP_STATE) => {
                        tonic::Status::failed_precondition(message)
                    },
                    Some(PARAMETER_GROUP_ALREADY_EXISTS) => tonic::Status::already_exists(message),
                    _ => tonic::Status::unknown(message),
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_classification() {
        let err = ApiError::not_found("my-group");
        assert!(err.is_not_found());
        assert!(!err.is_pending_changes());

        let err = ApiError::pending_changes("my-group");
        assert!(err.is_pending_changes());
        assert!(!err.is_not_found());

        // Same code without the pending-changes message is a different fault.
        let err = ApiError::new(INVALID_PARAMETER_GROUP_STATE, "group is in use");
        assert!(!err.is_pending_changes());
    }

    #[test]
    fn test_error_display() {
        let err = ProviderError::NotFound("my-group".to_string());
        assert_eq!(format!("{}", err), "Resource not found: my-group");

        let err = ProviderError::api(
            "deleting",
            "my-group",
            ApiError::new("AccessDenied", "not allowed"),
        );
        assert_eq!(
            format!("{}", err),
            "error deleting MemoryDB Parameter Group (my-group): AccessDenied: not allowed"
        );
        assert_eq!(err.message(), "not allowed");
    }

    #[test]
    fn test_error_to_status() {
        let err = ProviderError::Validation("test".to_string());
        let status: tonic::Status = err.into();
        assert_eq!(status.code(), tonic::Code::InvalidArgument);

        let err = ProviderError::FailedPrecondition("not configured".to_string());
        let status: tonic::Status = err.into();
        assert_eq!(status.code(), tonic::Code::FailedPrecondition);

        let err = ProviderError::api("reading", "g", ApiError::not_found("g"));
        let status: tonic::Status = err.into();
        assert_eq!(status.code(), tonic::Code::NotFound);

        let err = ProviderError::api("resetting", "g", ApiError::pending_changes("g"));
        let status: tonic::Status = err.into();
        assert_eq!(status.code(), tonic::Code::FailedPrecondition);

        let err = ProviderError::api(
            "creating",
            "g",
            ApiError::new(PARAMETER_GROUP_ALREADY_EXISTS, "exists"),
        );
        let status: tonic::Status = err.into();
        assert_eq!(status.code(), tonic::Code::AlreadyExists);

        let err = ProviderError::api("creating", "g", ApiError::new("Throttling", "slow down"));
        let status: tonic::Status = err.into();
        assert_eq!(status.code(), tonic::Code::Unknown);
    }

    #[test]
    fn test_partial_create_delegates_to_source() {
        let state = ParameterGroupState {
            id: "g".to_string(),
            name: "g".to_string(),
            ..Default::default()
        };
        let err = ProviderError::partial_create(
            state,
            ProviderError::api("resetting", "g", ApiError::pending_changes("g")),
        );

        assert_eq!(err.partial_state().map(|s| s.id.as_str()), Some("g"));
        assert!(err.api_error().is_some_and(ApiError::is_pending_changes));
        assert_eq!(
            err.to_string(),
            "error resetting MemoryDB Parameter Group (g): \
             InvalidParameterGroupStateFault: Parameter group g has pending changes"
        );

        let status: tonic::Status = err.into();
        assert_eq!(status.code(), tonic::Code::FailedPrecondition);
    }
}
