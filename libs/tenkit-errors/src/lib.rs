//! Unified error taxonomy for the tenkit data access layer.
//!
//! Every fallible operation in the workspace returns [`Error`]: a business
//! error code plus a human-readable message and an optional cause chain.
//! The code set is closed and aligned with gRPC status semantics so that
//! transport layers can map errors without inspecting messages.
//!
//! # Example
//!
//! ```rust
//! use tenkit_errors::{Error, ErrorCode};
//!
//! fn lookup(id: u64) -> Result<(), Error> {
//!     Err(Error::not_found(format!("record {id} does not exist")))
//! }
//!
//! let err = lookup(42).unwrap_err();
//! assert_eq!(err.code(), ErrorCode::NotFound);
//! assert!(err.is_not_found());
//! ```

use std::fmt;

/// Business error codes.
///
/// The numeric values are stable and shared with the other services of the
/// platform; do not reorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ErrorCode {
    Unknown = 1000,
    InvalidArgument = 1001,
    NotFound = 1002,
    AlreadyExists = 1003,
    PermissionDenied = 1004,
    Unauthenticated = 1005,
    Internal = 1006,
    Unavailable = 1007,
    Timeout = 1008,
    Canceled = 1009,
}

impl ErrorCode {
    /// Stable wire value of this code.
    #[must_use]
    pub fn as_u16(self) -> u16 {
        self as u16
    }

    /// Snake-case name, used in log output.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::Unknown => "unknown",
            ErrorCode::InvalidArgument => "invalid_argument",
            ErrorCode::NotFound => "not_found",
            ErrorCode::AlreadyExists => "already_exists",
            ErrorCode::PermissionDenied => "permission_denied",
            ErrorCode::Unauthenticated => "unauthenticated",
            ErrorCode::Internal => "internal",
            ErrorCode::Unavailable => "unavailable",
            ErrorCode::Timeout => "timeout",
            ErrorCode::Canceled => "canceled",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A structured business error: code, message and optional cause.
///
/// The cause chain is reachable through [`std::error::Error::source`], so
/// `anyhow`-style downcasting and chain printing work as usual.
#[derive(Debug, thiserror::Error)]
#[error("[{code}] {message}")]
pub struct Error {
    code: ErrorCode,
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl Error {
    /// Create an error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Wrap an underlying error with a code and message.
    pub fn wrap(
        code: ErrorCode,
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// The business error code.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// The human-readable message, without the code prefix.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.code == ErrorCode::NotFound
    }

    #[must_use]
    pub fn is_canceled(&self) -> bool {
        self.code == ErrorCode::Canceled
    }

    // Shorthand constructors for the common codes.

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidArgument, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn already_exists(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::AlreadyExists, message)
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::PermissionDenied, message)
    }

    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthenticated, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unavailable, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Timeout, message)
    }

    pub fn canceled(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Canceled, message)
    }
}

/// Extract the code from any error, walking the source chain until a
/// [`Error`] is found. Non-business errors report [`ErrorCode::Unknown`].
#[must_use]
pub fn code_of(err: &(dyn std::error::Error + 'static)) -> ErrorCode {
    let mut cur: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(e) = cur {
        if let Some(biz) = e.downcast_ref::<Error>() {
            return biz.code();
        }
        cur = e.source();
    }
    ErrorCode::Unknown
}

/// Library-local result type.
pub type Result<T, E = Error> = std::result::Result<T, E>;
