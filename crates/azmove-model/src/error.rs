//! Model-level error types

use crate::resource_id::ResourceIdError;

/// Errors raised while building model values from provider payloads or options
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// Payload has no usable `id`
    #[error("resource payload has no 'id' field")]
    MissingId,

    /// Identifier could not be parsed
    #[error(transparent)]
    ResourceId(#[from] ResourceIdError),

    /// Payload does not match the expected shape
    #[error("malformed {what} payload: {source}")]
    Payload {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// Disk blob URI is not `https://{account}.{host}/{container}/.../{blob}`
    #[error("'{0}' is not a valid blob uri")]
    InvalidBlobUri(String),

    /// A required option is absent or empty
    #[error("missing required option '--{0}'")]
    MissingRequiredOption(&'static str),

    /// An option value is not acceptable
    #[error("'{value}' is not a valid value for option '--{name}'")]
    InvalidOptionValue { name: &'static str, value: String },

    /// Source and destination point at the same cloud
    #[error("destination environment cannot be same as source environment")]
    SameEnvironment,
}

impl ModelError {
    /// Whether this is a bad-input error detectable before any network call
    #[inline]
    #[must_use]
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            Self::MissingRequiredOption(_) | Self::InvalidOptionValue { .. } | Self::SameEnvironment
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn option_messages() {
        assert_eq!(
            ModelError::MissingRequiredOption("srcSubId").to_string(),
            "missing required option '--srcSubId'"
        );
        assert_eq!(
            ModelError::InvalidOptionValue {
                name: "destEnv",
                value: "mars".into()
            }
            .to_string(),
            "'mars' is not a valid value for option '--destEnv'"
        );
    }

    #[test]
    fn invalid_input_classification() {
        assert!(ModelError::SameEnvironment.is_invalid_input());
        assert!(!ModelError::MissingId.is_invalid_input());
    }
}
