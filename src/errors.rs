//! Error handling for the Apex log extractor
//!
//! Every failure the extractor can hit is one variant of [`ExtractorError`].
//! The variant decides both how the failure is reported and which process
//! exit code the binary returns.

use thiserror::Error;

/// Main error type for the extractor
#[derive(Error, Debug)]
pub enum ExtractorError {
    #[error("Usage error: {message}")]
    Usage { message: String },

    #[error("Unsupported platform: {platform}")]
    UnsupportedPlatform { platform: String },

    #[error("Authentication failed: {message}")]
    Auth { message: String },

    #[error("Remote call failed: {operation} - {message}")]
    Remote { operation: String, message: String },

    #[error("Unable to create DebugLevel {name}: {response}")]
    DebugLevelCreate { name: String, response: String },

    #[error("Unable to set up TraceFlag for {username}: {response}")]
    TraceFlagSubmit { username: String, response: String },

    #[error("No log content returned for ApexLog {id}")]
    EmptyLogBody { id: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("I/O operation failed: {operation}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization failed: {context}")]
    Serialization {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Network operation failed: {operation}")]
    Network {
        operation: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("External command `{command}` failed: {message}")]
    Process { command: String, message: String },

    #[error("Archive operation failed: {operation}")]
    Archive {
        operation: String,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("CSV operation failed: {operation}")]
    Csv {
        operation: String,
        #[source]
        source: csv::Error,
    },
}

/// Result alias used throughout the crate
pub type ExtractorResult<T> = Result<T, ExtractorError>;

/// Process exit codes, one per failure class.
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const USAGE: i32 = 1;
    pub const UNSUPPORTED_PLATFORM: i32 = 2;
    pub const AUTH_FAILURE: i32 = 3;
    pub const REMOTE_FAILURE: i32 = 4;
    pub const LOCAL_FAILURE: i32 = 5;
}

impl ExtractorError {
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
        }
    }

    pub fn unsupported_platform(platform: impl Into<String>) -> Self {
        Self::UnsupportedPlatform {
            platform: platform.into(),
        }
    }

    /// Create an authentication error
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    /// Create a remote call error
    pub fn remote(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Remote {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an I/O error
    pub fn io(operation: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    pub fn serialization(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Serialization {
            context: context.into(),
            source,
        }
    }

    /// Create a network error
    pub fn network(operation: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            operation: operation.into(),
            source,
        }
    }

    pub fn process(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Process {
            command: command.into(),
            message: message.into(),
        }
    }

    pub fn archive(operation: impl Into<String>, source: zip::result::ZipError) -> Self {
        Self::Archive {
            operation: operation.into(),
            source,
        }
    }

    pub fn csv(operation: impl Into<String>, source: csv::Error) -> Self {
        Self::Csv {
            operation: operation.into(),
            source,
        }
    }

    /// Exit code the binary reports for this failure
    pub fn exit_code(&self) -> i32 {
        match self {
            ExtractorError::Usage { .. } | ExtractorError::Config { .. } => exit_codes::USAGE,
            ExtractorError::UnsupportedPlatform { .. } => exit_codes::UNSUPPORTED_PLATFORM,
            ExtractorError::Auth { .. } => exit_codes::AUTH_FAILURE,
            ExtractorError::Remote { .. }
            | ExtractorError::DebugLevelCreate { .. }
            | ExtractorError::TraceFlagSubmit { .. }
            | ExtractorError::EmptyLogBody { .. }
            | ExtractorError::Network { .. }
            | ExtractorError::Serialization { .. } => exit_codes::REMOTE_FAILURE,
            ExtractorError::Io { .. }
            | ExtractorError::Process { .. }
            | ExtractorError::Archive { .. }
            | ExtractorError::Csv { .. } => exit_codes::LOCAL_FAILURE,
        }
    }
}

/// Convert from serde_json errors
impl From<serde_json::Error> for ExtractorError {
    fn from(err: serde_json::Error) -> Self {
        ExtractorError::serialization("json_operation", err)
    }
}

/// Convert from std::io errors
impl From<std::io::Error> for ExtractorError {
    fn from(err: std::io::Error) -> Self {
        ExtractorError::io("io_operation", err)
    }
}

/// Convert from reqwest errors
impl From<reqwest::Error> for ExtractorError {
    fn from(err: reqwest::Error) -> Self {
        ExtractorError::network("http_request", err)
    }
}

impl From<csv::Error> for ExtractorError {
    fn from(err: csv::Error) -> Self {
        ExtractorError::csv("csv_write", err)
    }
}

impl From<zip::result::ZipError> for ExtractorError {
    fn from(err: zip::result::ZipError) -> Self {
        ExtractorError::archive("zip_write", err)
    }
}

impl From<figment::Error> for ExtractorError {
    fn from(err: figment::Error) -> Self {
        ExtractorError::config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let auth_err = ExtractorError::auth("no result found in response");
        assert!(auth_err.to_string().contains("Authentication failed"));

        let empty = ExtractorError::EmptyLogBody {
            id: "07L000000000001".into(),
        };
        assert!(empty.to_string().contains("07L000000000001"));
    }

    #[test]
    fn test_error_chaining() {
        use std::error::Error;

        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let err = ExtractorError::io("writing log file", io_err);

        assert!(err.source().is_some());
        assert!(err.to_string().contains("I/O operation failed"));
    }

    #[test]
    fn exit_codes_follow_failure_class() {
        assert_eq!(ExtractorError::usage("x").exit_code(), 1);
        assert_eq!(ExtractorError::unsupported_platform("windows").exit_code(), 2);
        assert_eq!(ExtractorError::auth("x").exit_code(), 3);
        assert_eq!(ExtractorError::remote("query", "x").exit_code(), 4);
        assert_eq!(
            ExtractorError::TraceFlagSubmit {
                username: "u".into(),
                response: "{}".into()
            }
            .exit_code(),
            4
        );
        assert_eq!(ExtractorError::process("sfdx", "x").exit_code(), 5);
    }
}
