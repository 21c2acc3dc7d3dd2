//! Typed errors for the resource pipeline
//!
//! Every stage of an operation fails with a [`PipelineError`]. The variant
//! fixes the HTTP status and the machine-readable error code; the `Display`
//! output is the human-readable message written to the logs and used as the
//! envelope message when no underlying cause is available.
//!
//! # Status mapping
//!
//! | Stage                                   | Status |
//! |-----------------------------------------|--------|
//! | authenticate                            | 401    |
//! | authorize                               | 403    |
//! | bind / validate / project / filter bind | 400    |
//! | fetch, remove, query (not found)        | 400    |
//! | hook                                    | 400    |
//! | save                                    | 500    |
//! | encode response                         | 500    |
//! | unsupported operation                   | 400    |
//!
//! Read-path failures keep the 400 status for compatibility with existing
//! clients but carry their own `RESOURCE_NOT_FOUND` code so callers can tell
//! them apart from malformed input.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use super::envelope::Envelope;
use super::hooks::HookPoint;
use super::operation::Operation;

/// Error produced by a failing pipeline stage
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Authenticator denied the request or failed
    #[error("authentication failed")]
    AuthenticationFailed { cause: Option<anyhow::Error> },

    /// Authorizer denied the request or failed
    #[error("authorization failed")]
    AuthorizationFailed { cause: Option<anyhow::Error> },

    /// Payload could not be decoded into the form
    #[error("failed to bind form")]
    BindFailed { cause: anyhow::Error },

    /// Form failed its declared constraints or its refinement
    #[error("failed to validate form")]
    ValidationFailed { cause: anyhow::Error },

    /// Form could not be projected onto the model
    #[error("failed to bind form data")]
    ProjectionFailed { cause: anyhow::Error },

    /// Resource lookup, listing or removal failed
    #[error("cannot find any {resource}")]
    NotFound {
        resource: String,
        cause: anyhow::Error,
    },

    /// Query string could not be decoded into the filter
    #[error("cannot bind {resource} filter")]
    FilterBindFailed {
        resource: String,
        cause: anyhow::Error,
    },

    /// A lifecycle hook returned an error
    #[error("cannot use function {point}")]
    HookFailed { point: HookPoint, cause: anyhow::Error },

    /// Persisting the model failed (`action` is "add" or "edit")
    #[error("cannot {action} {resource}")]
    SaveFailed {
        action: &'static str,
        resource: String,
        cause: anyhow::Error,
    },

    /// The model could not be serialized into the response
    #[error("cannot encode {resource}")]
    EncodeFailed {
        resource: String,
        cause: anyhow::Error,
    },

    /// Operation kind not accepted by the entry point it was sent to
    #[error("unsupported operation {operation}")]
    UnsupportedOperation { operation: Operation },
}

impl PipelineError {
    /// Wrap a hook error, recording the lifecycle point as context
    pub fn hook(point: HookPoint, cause: anyhow::Error) -> Self {
        PipelineError::HookFailed {
            point,
            cause: cause.context(format!("cannot use function {}", point)),
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            PipelineError::AuthenticationFailed { .. } => StatusCode::UNAUTHORIZED,
            PipelineError::AuthorizationFailed { .. } => StatusCode::FORBIDDEN,
            PipelineError::BindFailed { .. }
            | PipelineError::ValidationFailed { .. }
            | PipelineError::ProjectionFailed { .. }
            | PipelineError::NotFound { .. }
            | PipelineError::FilterBindFailed { .. }
            | PipelineError::HookFailed { .. }
            | PipelineError::UnsupportedOperation { .. } => StatusCode::BAD_REQUEST,
            PipelineError::SaveFailed { .. } | PipelineError::EncodeFailed { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            PipelineError::AuthenticationFailed { .. } => "AUTHENTICATION_FAILED",
            PipelineError::AuthorizationFailed { .. } => "AUTHORIZATION_FAILED",
            PipelineError::BindFailed { .. } => "BIND_FAILED",
            PipelineError::ValidationFailed { .. } => "VALIDATION_FAILED",
            PipelineError::ProjectionFailed { .. } => "PROJECTION_FAILED",
            PipelineError::NotFound { .. } => "RESOURCE_NOT_FOUND",
            PipelineError::FilterBindFailed { .. } => "FILTER_BIND_FAILED",
            PipelineError::HookFailed { .. } => "HOOK_FAILED",
            PipelineError::SaveFailed { .. } => "PERSISTENCE_FAILED",
            PipelineError::EncodeFailed { .. } => "ENCODE_FAILED",
            PipelineError::UnsupportedOperation { .. } => "UNSUPPORTED_OPERATION",
        }
    }

    /// The underlying collaborator error, if any
    pub fn cause(&self) -> Option<&anyhow::Error> {
        match self {
            PipelineError::AuthenticationFailed { cause }
            | PipelineError::AuthorizationFailed { cause } => cause.as_ref(),
            PipelineError::BindFailed { cause }
            | PipelineError::ValidationFailed { cause }
            | PipelineError::ProjectionFailed { cause }
            | PipelineError::NotFound { cause, .. }
            | PipelineError::FilterBindFailed { cause, .. }
            | PipelineError::HookFailed { cause, .. }
            | PipelineError::SaveFailed { cause, .. }
            | PipelineError::EncodeFailed { cause, .. } => Some(cause),
            PipelineError::UnsupportedOperation { .. } => None,
        }
    }

    /// Build the error envelope for this error (logs it)
    pub fn to_envelope(&self) -> Envelope {
        Envelope::error(self.status_code(), self.cause(), self.to_string())
    }
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        self.to_envelope().into_response()
    }
}
