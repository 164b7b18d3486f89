//! Error types for the out-of-band management client
//!
//! Provides structured error types for the routing facade, the backend
//! protocol clients and the RAID provisioning engine.

use std::fmt;
use thiserror::Error;

/// A single per-controller failure collected by a multi-controller operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerFailure {
    /// Controller model (or storage configuration id when the model is unknown)
    pub controller: String,
    /// Error message reported for that controller
    pub message: String,
}

impl fmt::Display for ControllerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "('{}', '{}')", self.controller, self.message)
    }
}

/// Unified error type for the client
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Transport Errors
    // =========================================================================
    #[error("Unable to connect to {address}: {reason}")]
    Connection { address: String, reason: String },

    // =========================================================================
    // BMC Errors
    // =========================================================================
    #[error("{message}{}", .context.as_ref().map(|c| format!(" ({})", c)).unwrap_or_default())]
    Operation {
        message: String,
        context: Option<String>,
    },

    #[error("Command '{operation}' is not supported by the {protocol} protocol on this server")]
    CommandNotSupported { operation: String, protocol: String },

    #[error("{0}")]
    LogicalDriveNotFound(String),

    #[error("The storage controller failed to {operation} the raid configuration in one or more controllers with Error: [{}]", format_failures(.failures))]
    ControllerFailures {
        operation: String,
        failures: Vec<ControllerFailure>,
    },

    // =========================================================================
    // Caller Errors
    // =========================================================================
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Operation not supported: {operation}")]
    NotSupported { operation: String },

    // =========================================================================
    // Configuration and Parse Errors
    // =========================================================================
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    // =========================================================================
    // IO Errors
    // =========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn format_failures(failures: &[ControllerFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl Error {
    /// Operational error without extra context
    pub fn operation(message: impl Into<String>) -> Self {
        Error::Operation {
            message: message.into(),
            context: None,
        }
    }

    /// Operational error with context
    pub fn operation_with_context(message: impl Into<String>, context: impl Into<String>) -> Self {
        Error::Operation {
            message: message.into(),
            context: Some(context.into()),
        }
    }

    /// Facade-level routing failure
    pub fn not_supported(operation: impl Into<String>) -> Self {
        Error::NotSupported {
            operation: operation.into(),
        }
    }

    /// Check if this error is transient (the caller may retry)
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Connection { .. })
    }

    /// Check if the BMC understood but refused the request
    pub fn is_operational(&self) -> bool {
        matches!(
            self,
            Error::Operation { .. }
                | Error::ControllerFailures { .. }
                | Error::LogicalDriveNotFound(_)
        )
    }

    /// Whether a failed legacy-protocol probe means the legacy protocol is
    /// switched off on this BMC
    pub fn indicates_legacy_unavailable(&self) -> bool {
        matches!(
            self,
            Error::Connection { .. } | Error::Operation { .. } | Error::CommandNotSupported { .. }
        )
    }
}

/// Result type alias for the client
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_transient() {
        let err = Error::Connection {
            address: "10.0.0.1".into(),
            reason: "timed out".into(),
        };
        assert!(err.is_transient());
        assert!(!err.is_operational());

        let err = Error::InvalidInput("bad".into());
        assert!(!err.is_transient());
        assert!(!err.indicates_legacy_unavailable());
    }

    #[test]
    fn test_operation_display_with_context() {
        let err = Error::operation("The BMC rejected the request");
        assert_eq!(err.to_string(), "The BMC rejected the request");

        let err = Error::operation_with_context("The BMC rejected the request", "set_host_power");
        assert_eq!(
            err.to_string(),
            "The BMC rejected the request (set_host_power)"
        );
    }

    #[test]
    fn test_controller_failures_display() {
        let err = Error::ControllerFailures {
            operation: "create".into(),
            failures: vec![
                ControllerFailure {
                    controller: "CtrlA".into(),
                    message: "boom".into(),
                },
                ControllerFailure {
                    controller: "CtrlB".into(),
                    message: "bang".into(),
                },
            ],
        };
        let text = err.to_string();
        assert!(text.contains("failed to create the raid configuration"));
        assert!(text.contains("('CtrlA', 'boom'), ('CtrlB', 'bang')"));
        assert!(err.is_operational());
    }

    #[test]
    fn test_legacy_unavailable_classification() {
        assert!(Error::operation("RIBCL disabled").indicates_legacy_unavailable());
        assert!(Error::CommandNotSupported {
            operation: "get_product_name".into(),
            protocol: "legacy".into(),
        }
        .indicates_legacy_unavailable());
        assert!(!Error::not_supported("get_product_name").indicates_legacy_unavailable());
        assert!(!Error::LogicalDriveNotFound("none".into()).indicates_legacy_unavailable());
    }
}
