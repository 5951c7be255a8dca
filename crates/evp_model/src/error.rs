// Copyright (C) Microsoft Corporation. All rights reserved.

//! Error types and return-code conventions for the provider model.
//!
//! Failures come in three tiers:
//!
//! * contract violations (illegal call sequences or arguments) and capacity
//!   violations (an output buffer that cannot hold what the call may write)
//!   abort the call with a [`ModelError`];
//! * operational failures of the unmodeled engine are ordinary outcomes and
//!   are reported through [`ReturnCode`] using the C convention of `1` for
//!   success, `0` for failure and negative values for "not supported".

use std::ffi::c_int;
use std::fmt;
use std::panic::Location;

/// Error raised when a call breaks the contract of the modeled API.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// Precondition of an operation does not hold
    #[error("Contract violated in {op}: {reason}")]
    ContractViolation {
        /// Operation whose precondition failed
        op: &'static str,
        /// Human readable description of the broken precondition
        reason: String,
    },

    /// Output buffer is smaller than what the operation may write
    #[error("Capacity violated in {op}: requires {required} bytes, buffer holds {available}")]
    CapacityViolation {
        /// Operation that would have overflowed
        op: &'static str,
        /// Bytes the operation may write
        required: usize,
        /// Bytes the caller declared
        available: usize,
    },

    /// Allocation failed
    #[error("Allocating data structure failed")]
    AllocationFailed,

    /// Digest NID not in the registry
    #[error("Digest with nid {0} not supported")]
    HashNotSupported(i32),

    /// Configuration is not usable
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Log file could not be opened
    #[error("Could not open log file: {0}")]
    LogFileError(String),
}

impl ModelError {
    /// Returns true for a contract violation.
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, ModelError::ContractViolation { .. })
    }

    /// Returns true for a capacity violation.
    pub fn is_capacity_violation(&self) -> bool {
        matches!(self, ModelError::CapacityViolation { .. })
    }
}

impl From<ModelError> for i32 {
    fn from(value: ModelError) -> Self {
        match value {
            ModelError::HashNotSupported(_) => ReturnCode::NOT_SUPPORTED.get(),
            _ => ReturnCode::FAIL.get(),
        }
    }
}

/// Result type used across the model.
pub type ModelResult<T> = Result<T, ModelError>;

/// Integer result of a modeled call.
///
/// `1` is success, `0` is generic failure, negative values mean the
/// operation is not supported by the algorithm or mode. Callers that only
/// test for non-zero treat "not supported" as success, which is exactly the
/// kind of client bug the model is meant to expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReturnCode(i32);

impl ReturnCode {
    /// Operation succeeded
    pub const SUCCESS: ReturnCode = ReturnCode(1);
    /// Generic failure
    pub const FAIL: ReturnCode = ReturnCode(0);
    /// Operational error
    pub const ERROR: ReturnCode = ReturnCode(-1);
    /// Operation not supported by the algorithm or mode
    pub const NOT_SUPPORTED: ReturnCode = ReturnCode(-2);

    /// Wraps a raw C return value.
    pub const fn new(code: i32) -> Self {
        ReturnCode(code)
    }

    /// Raw C return value.
    pub const fn get(self) -> i32 {
        self.0
    }

    /// Exactly `1`.
    pub const fn is_success(self) -> bool {
        self.0 == 1
    }

    /// Negative codes.
    pub const fn is_unsupported(self) -> bool {
        self.0 < 0
    }
}

impl From<bool> for ReturnCode {
    fn from(success: bool) -> Self {
        if success {
            ReturnCode::SUCCESS
        } else {
            ReturnCode::FAIL
        }
    }
}

impl From<ReturnCode> for c_int {
    fn from(code: ReturnCode) -> c_int {
        code.0 as c_int
    }
}

impl fmt::Display for ReturnCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Convert a ModelResult into a C 1/0 success/fail result
pub fn convert_result_int<T>(result: ModelResult<T>) -> c_int {
    match result {
        Ok(_) => ReturnCode::SUCCESS.into(),
        Err(e) => {
            tracing::warn!("convert_result_int: {e}");
            i32::from(e) as c_int
        }
    }
}

/// Name of a tracing level as printed in log lines.
pub const fn level_to_string(level: tracing::Level) -> &'static str {
    match level {
        ::tracing::Level::TRACE => "TRACE",
        ::tracing::Level::DEBUG => "DEBUG",
        ::tracing::Level::INFO => "INFO",
        ::tracing::Level::WARN => "WARN",
        ::tracing::Level::ERROR => "ERROR",
    }
}

#[doc(hidden)]
pub fn model_do_log(level: tracing::Level, file: &str, line: u32, log_string: &str) {
    match level {
        ::tracing::Level::TRACE => tracing::trace!("{file}:{line}: {log_string}"),
        ::tracing::Level::DEBUG => tracing::debug!("{file}:{line}: {log_string}"),
        ::tracing::Level::INFO => tracing::info!("{file}:{line}: {log_string}"),
        ::tracing::Level::WARN => tracing::warn!("{file}:{line}: {log_string}"),
        ::tracing::Level::ERROR => tracing::error!("{file}:{line}: {log_string}"),
    }
}

/// Log `$error` together with a formatted message at `$level`, tagged with
/// the call site.
#[macro_export]
macro_rules! model_log {
    ($error:expr, $level:expr, $($arg:tt)*) => {
        let level = $crate::error::level_to_string($level);
        let log_string = format!("[{level}] {}: {}", $error, format!($($arg)*));
        $crate::error::model_do_log($level, file!(), line!(), &log_string);
    };
}

/// Like [`model_log!`] for messages without an associated error.
#[macro_export]
macro_rules! model_log_noerror {
    ($level:expr, $($arg:tt)*) => {
        let level = $crate::error::level_to_string($level);
        let log_string = format!("[{level}] {}", format!($($arg)*));
        $crate::error::model_do_log($level, file!(), line!(), &log_string);
    };
}

/// Builds and logs a contract violation at the caller's location.
#[track_caller]
pub(crate) fn contract_violation(op: &'static str, reason: impl Into<String>) -> ModelError {
    let error = ModelError::ContractViolation {
        op,
        reason: reason.into(),
    };
    let location = Location::caller();
    model_do_log(
        tracing::Level::ERROR,
        location.file(),
        location.line(),
        &format!("[ERROR] {error}"),
    );
    error
}

/// Fails with a contract violation unless `cond` holds.
#[track_caller]
pub(crate) fn require(cond: bool, op: &'static str, reason: &str) -> ModelResult<()> {
    if cond {
        Ok(())
    } else {
        Err(contract_violation(op, reason))
    }
}

/// Fails with a capacity violation unless `available >= required`.
#[track_caller]
pub(crate) fn require_capacity(
    op: &'static str,
    required: usize,
    available: usize,
) -> ModelResult<()> {
    if available >= required {
        return Ok(());
    }

    let error = ModelError::CapacityViolation {
        op,
        required,
        available,
    };
    let location = Location::caller();
    model_do_log(
        tracing::Level::ERROR,
        location.file(),
        location.line(),
        &format!("[ERROR] {error}"),
    );
    Err(error)
}
