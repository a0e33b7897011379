//! Extension traits for error handling

use super::types::{Error, Result};

/// Prefix an error's message with what was being attempted
pub trait ResultExt<T> {
    /// Add a lazily built context message, keeping the error's variant
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<Error>,
{
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.into().in_context(f()))
    }
}

impl Error {
    /// Attach `context` to the message-bearing variants; others pass through
    fn in_context(self, context: String) -> Self {
        match self {
            Error::Configuration { message } => Error::Configuration {
                message: format!("{context}: {message}"),
            },
            Error::Load { message, source } => Error::Load {
                message: format!("{context}: {message}"),
                source,
            },
            Error::Json { message, source } => Error::Json {
                message: format!("{context}: {message}"),
                source,
            },
            Error::FileSystem { operation, source } => Error::FileSystem {
                operation: format!("{context}: {operation}"),
                source,
            },
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_errors_keep_their_variant() {
        let parsed: std::result::Result<u32, serde_json::Error> = serde_json::from_str("nope");
        let err = parsed
            .with_context(|| "invalid config file app.json".to_string())
            .unwrap_err();

        match err {
            Error::Json { message, .. } => {
                assert!(message.starts_with("invalid config file app.json: "));
            }
            other => panic!("expected a JSON error, got {other:?}"),
        }
    }

    #[test]
    fn test_structural_errors_pass_through() {
        let failed: Result<()> = Err(Error::invalid_shard(4));
        let err = failed.with_context(|| "ignored".to_string()).unwrap_err();
        assert!(matches!(err, Error::InvalidShard { index: 4 }));
    }

    #[test]
    fn test_configuration_message_is_prefixed() {
        let failed: Result<()> = Err(Error::configuration("bad read mode"));
        let err = failed.with_context(|| "loading".to_string()).unwrap_err();
        assert_eq!(err.to_string(), "configuration error: loading: bad read mode");
    }
}
