use thiserror::Error;

/// Unified error type for the convoy library
#[derive(Debug, Error)]
pub enum ConvoyError {
    /// A tag that does not follow the `{request}:{index}` convention
    #[error("Malformed tag '{tag}'")]
    MalformedTag { tag: String },

    /// Command arguments rejected by a handler's schema
    #[error("Invalid arguments for '{prefix}': {message}")]
    Validation { prefix: String, message: String },

    /// Transport-level dispatch failure
    #[error("Dispatch failed: {message}")]
    Dispatch {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl ConvoyError {
    /// Create a malformed tag error
    pub fn malformed_tag<S: Into<String>>(tag: S) -> Self {
        Self::MalformedTag { tag: tag.into() }
    }

    /// Create a validation error
    pub fn validation<P: Into<String>, M: Into<String>>(prefix: P, message: M) -> Self {
        Self::Validation {
            prefix: prefix.into(),
            message: message.into(),
        }
    }

    /// Create a dispatch error
    pub fn dispatch<S: Into<String>>(message: S) -> Self {
        Self::Dispatch {
            message: message.into(),
            source: None,
        }
    }

    /// Create a dispatch error with source
    pub fn dispatch_with_source<S, E>(message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Dispatch {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

/// Result type alias using the unified error
pub type Result<T> = std::result::Result<T, ConvoyError>;
