//! Error types for the Iron.io provider.

use thiserror::Error;

/// Errors that can occur while managing Iron.io resources.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The Iron.io API answered with a non-success status.
    #[error("API error: {status} {body}")]
    Api {
        /// HTTP status code returned by the API.
        status: u16,
        /// Raw response body, as returned by the API.
        body: String,
    },

    /// The request could not be sent or its response could not be received.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The API accepted a delete request but did not confirm it.
    #[error("Delete failed: {0}")]
    DeleteFailed(String),

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
}

impl ProviderError {
    /// Returns true if the remote entity does not exist.
    ///
    /// Only a structured `404` from the API counts; the text of the error is
    /// never inspected.
    ///
    /// # Examples
    ///
    /// ```
    /// use hemmer_provider_ironio::ProviderError;
    ///
    /// let err = ProviderError::Api { status: 404, body: String::new() };
    /// assert!(err.is_not_found());
    ///
    /// let err = ProviderError::Api { status: 500, body: "404 in body".to_string() };
    /// assert!(!err.is_not_found());
    /// ```
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Api { status: 404, .. })
    }

    /// The HTTP status attached to this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Http(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Get the error message as a string.
    pub fn message(&self) -> &str {
        match self {
            Self::Api { body, .. } => body,
            Self::Http(_err) => "http error (see Debug output)",
            Self::Serialization(_err) => "serialization error (see Debug output)",
            Self::DeleteFailed(msg) => msg,
            Self::NotFound(msg) => msg,
            Self::Validation(msg) => msg,
            Self::Configuration(msg) => msg,
            Self::UnknownResource(msg) => msg,
        }
    }
}
