//! Unified application error types for mumo.
//!
//! All crates map their internal errors into [`AppError`] for consistent
//! propagation through the ? operator. Errors raised inside an actor's
//! message function travel back to a blocking caller as an `AppError`,
//! which is why the type is cheaply cloneable.

use std::fmt;
use thiserror::Error;

/// Top-level error kind categorization used across the entire application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// A named module has no discoverable configuration file.
    ModuleConfigNotFound,
    /// The module's code could not be located or imported.
    ModuleImportFailed,
    /// The module constructor failed.
    ModuleInitFailed,
    /// An event was delivered to a handler that does not handle its category.
    HandlerNotFound,
    /// A blocking call did not receive its reply within the deadline.
    Timeout,
    /// The reply channel of a blocking call was dropped without a reply.
    MailboxClosed,
    /// A message function panicked on the actor thread.
    Panicked,
    /// The voice server transport reported an error.
    Transport,
    /// A configuration error occurred.
    Configuration,
    /// The requested resource was not found.
    NotFound,
    /// A conflict occurred (duplicate name, already registered, etc.).
    Conflict,
    /// An internal error occurred.
    Internal,
}

impl ErrorKind {
    /// Whether this kind is one of the three module loading failures.
    pub fn is_module_load_failure(&self) -> bool {
        matches!(
            self,
            Self::ModuleConfigNotFound | Self::ModuleImportFailed | Self::ModuleInitFailed
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ModuleConfigNotFound => write!(f, "MODULE_CONFIG_NOT_FOUND"),
            Self::ModuleImportFailed => write!(f, "MODULE_IMPORT_FAILED"),
            Self::ModuleInitFailed => write!(f, "MODULE_INIT_FAILED"),
            Self::HandlerNotFound => write!(f, "HANDLER_NOT_FOUND"),
            Self::Timeout => write!(f, "TIMEOUT"),
            Self::MailboxClosed => write!(f, "MAILBOX_CLOSED"),
            Self::Panicked => write!(f, "PANICKED"),
            Self::Transport => write!(f, "TRANSPORT"),
            Self::Configuration => write!(f, "CONFIGURATION"),
            Self::NotFound => write!(f, "NOT_FOUND"),
            Self::Conflict => write!(f, "CONFLICT"),
            Self::Internal => write!(f, "INTERNAL"),
        }
    }
}

/// The unified application error used throughout mumo.
///
/// All crate-specific errors are mapped into `AppError` using `From` impls
/// or explicit `.map_err()` calls.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    /// The category of error.
    pub kind: ErrorKind,
    /// A human-readable error message.
    pub message: String,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new application error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Create a new application error with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a module-config-not-found error.
    pub fn module_config_not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ModuleConfigNotFound, message)
    }

    /// Create a module-import-failed error.
    pub fn module_import_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ModuleImportFailed, message)
    }

    /// Create a module-init-failed error.
    pub fn module_init_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ModuleInitFailed, message)
    }

    /// Create a handler-not-found error.
    pub fn handler_not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::HandlerNotFound, message)
    }

    /// Create a timeout error.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }

    /// Create a mailbox-closed error.
    pub fn mailbox_closed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MailboxClosed, message)
    }

    /// Create a panicked error.
    pub fn panicked(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Panicked, message)
    }

    /// Create a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transport, message)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Create a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Create a conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            source: None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("JSON serialization error: {err}"),
            err,
        )
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source(ErrorKind::Internal, format!("I/O error: {err}"), err)
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}
