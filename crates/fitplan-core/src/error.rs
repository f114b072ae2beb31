//! Error taxonomy for plan operations.
//!
//! Every stage converts its own failures into one [`PlanError`] variant so
//! the transport layer can map them onto a response without inspecting
//! lower-level error types.

use thiserror::Error;

/// Failure of a single plan operation.
#[derive(Debug, Error)]
pub enum PlanError {
    /// The caller sent something missing, malformed or out of range.
    #[error("{0}")]
    InvalidInput(String),

    /// A field was present but could not be converted to the expected type.
    #[error("Invalid input data: {field}: {reason}")]
    TypeConversion { field: &'static str, reason: String },

    /// The generation provider failed.
    #[error("AI service error: {0}")]
    Provider(#[from] ProviderError),

    /// The generation provider answered with something that is not a JSON
    /// object.
    #[error("AI response is not valid JSON")]
    Parse(#[from] ParseError),

    /// The document store failed.
    #[error("Database error: {0:#}")]
    Store(anyhow::Error),

    /// No document matched.
    #[error("{0}")]
    NotFound(String),
}

impl PlanError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// `true` for failures caused by the request rather than by a collaborator.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput(_) | Self::TypeConversion { .. } | Self::NotFound(_)
        )
    }
}

/// Failure reported by a [`crate::PlanGenerator`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("failed to reach provider: {0}")]
    Transport(String),

    #[error("authentication rejected: {0}")]
    Unauthorized(String),

    #[error("rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("malformed provider response: {0}")]
    MalformedResponse(String),

    #[error("provider returned an empty completion")]
    EmptyCompletion,
}

/// Model output that could not be parsed as a JSON object.
#[derive(Debug, Clone, Error)]
#[error("model output is not a JSON object: {reason}")]
pub struct ParseError {
    /// What the JSON parser (or the shape check) rejected.
    pub reason: String,
    /// First 200 characters of the raw model output.
    pub excerpt: String,
    /// The raw model output, untouched.
    pub raw: String,
}
