//! UCT error types and status handling.
//!
//! This module converts raw `ucs_status_t` codes returned by libuct into
//! Rust's Result type, and describes the failures of the dynamic loader.

use std::fmt;
use thiserror::Error;

/// UCS status codes matching the UCX C API.
///
/// These values correspond to `ucs_status_t` in `ucs/type/status.h`.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UcsStatus {
    Ok = 0,
    InProgress = 1,
    NoMessage = -1,
    NoResource = -2,
    IoError = -3,
    NoMemory = -4,
    InvalidParam = -5,
    Unreachable = -6,
    InvalidAddr = -7,
    NotImplemented = -8,
    MessageTruncated = -9,
    NoProgress = -10,
    BufferTooSmall = -11,
    NoElem = -12,
    SomeConnectsFailed = -13,
    NoDevice = -14,
    Busy = -15,
    Canceled = -16,
    ShmemSegment = -17,
    AlreadyExists = -18,
    OutOfRange = -19,
    TimedOut = -20,
    ExceedsLimit = -21,
    Unsupported = -22,
    Rejected = -23,
    NotConnected = -24,
    ConnectionReset = -25,
    /// Any code not listed above.
    Unknown = i32::MIN,
}

impl UcsStatus {
    /// Creates a UcsStatus from a raw `ucs_status_t` value.
    pub fn from_raw(status: i32) -> Self {
        match status {
            0 => UcsStatus::Ok,
            1 => UcsStatus::InProgress,
            -1 => UcsStatus::NoMessage,
            -2 => UcsStatus::NoResource,
            -3 => UcsStatus::IoError,
            -4 => UcsStatus::NoMemory,
            -5 => UcsStatus::InvalidParam,
            -6 => UcsStatus::Unreachable,
            -7 => UcsStatus::InvalidAddr,
            -8 => UcsStatus::NotImplemented,
            -9 => UcsStatus::MessageTruncated,
            -10 => UcsStatus::NoProgress,
            -11 => UcsStatus::BufferTooSmall,
            -12 => UcsStatus::NoElem,
            -13 => UcsStatus::SomeConnectsFailed,
            -14 => UcsStatus::NoDevice,
            -15 => UcsStatus::Busy,
            -16 => UcsStatus::Canceled,
            -17 => UcsStatus::ShmemSegment,
            -18 => UcsStatus::AlreadyExists,
            -19 => UcsStatus::OutOfRange,
            -20 => UcsStatus::TimedOut,
            -21 => UcsStatus::ExceedsLimit,
            -22 => UcsStatus::Unsupported,
            -23 => UcsStatus::Rejected,
            -24 => UcsStatus::NotConnected,
            -25 => UcsStatus::ConnectionReset,
            _ => UcsStatus::Unknown,
        }
    }

    /// Returns true if the status indicates success.
    pub fn is_ok(&self) -> bool {
        *self == UcsStatus::Ok
    }

    /// Converts to a Result, attributing a failure to `operation`.
    pub fn into_result(self, operation: &'static str) -> UctResult<()> {
        if self.is_ok() {
            Ok(())
        } else {
            Err(UctError::Status {
                operation,
                status: self,
            })
        }
    }
}

impl fmt::Display for UcsStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UcsStatus::Ok => "UCS_OK",
            UcsStatus::InProgress => "UCS_INPROGRESS",
            UcsStatus::NoMessage => "UCS_ERR_NO_MESSAGE",
            UcsStatus::NoResource => "UCS_ERR_NO_RESOURCE",
            UcsStatus::IoError => "UCS_ERR_IO_ERROR",
            UcsStatus::NoMemory => "UCS_ERR_NO_MEMORY",
            UcsStatus::InvalidParam => "UCS_ERR_INVALID_PARAM",
            UcsStatus::Unreachable => "UCS_ERR_UNREACHABLE",
            UcsStatus::InvalidAddr => "UCS_ERR_INVALID_ADDR",
            UcsStatus::NotImplemented => "UCS_ERR_NOT_IMPLEMENTED",
            UcsStatus::MessageTruncated => "UCS_ERR_MESSAGE_TRUNCATED",
            UcsStatus::NoProgress => "UCS_ERR_NO_PROGRESS",
            UcsStatus::BufferTooSmall => "UCS_ERR_BUFFER_TOO_SMALL",
            UcsStatus::NoElem => "UCS_ERR_NO_ELEM",
            UcsStatus::SomeConnectsFailed => "UCS_ERR_SOME_CONNECTS_FAILED",
            UcsStatus::NoDevice => "UCS_ERR_NO_DEVICE",
            UcsStatus::Busy => "UCS_ERR_BUSY",
            UcsStatus::Canceled => "UCS_ERR_CANCELED",
            UcsStatus::ShmemSegment => "UCS_ERR_SHMEM_SEGMENT",
            UcsStatus::AlreadyExists => "UCS_ERR_ALREADY_EXISTS",
            UcsStatus::OutOfRange => "UCS_ERR_OUT_OF_RANGE",
            UcsStatus::TimedOut => "UCS_ERR_TIMED_OUT",
            UcsStatus::ExceedsLimit => "UCS_ERR_EXCEEDS_LIMIT",
            UcsStatus::Unsupported => "UCS_ERR_UNSUPPORTED",
            UcsStatus::Rejected => "UCS_ERR_REJECTED",
            UcsStatus::NotConnected => "UCS_ERR_NOT_CONNECTED",
            UcsStatus::ConnectionReset => "UCS_ERR_CONNECTION_RESET",
            UcsStatus::Unknown => "UCS_ERR_UNKNOWN",
        };
        write!(f, "{}", s)
    }
}

/// Error type for UCT operations.
#[derive(Debug, Clone, Error)]
pub enum UctError {
    /// The transport library could not be located or loaded.
    #[error("failed to open {library}: {message}")]
    Open { library: String, message: String },

    /// A required symbol is missing from the loaded library.
    #[error("failed to resolve symbol {symbol}: {message}")]
    Symbol {
        symbol: &'static str,
        message: String,
    },

    /// A libuct call returned an error status.
    #[error("{operation} failed: {status}")]
    Status {
        operation: &'static str,
        status: UcsStatus,
    },

    /// The library handle was used after it was closed.
    #[error("UCT library handle is closed")]
    Closed,

    /// A name could not be passed across the C boundary.
    #[error("invalid string {value:?}: {message}")]
    InvalidString { value: String, message: String },

    /// The library could not be unloaded.
    #[error("failed to close {library}: {message}")]
    Close { library: String, message: String },
}

impl UctError {
    /// Creates an open error for `library`.
    pub fn open(library: impl Into<String>, message: impl fmt::Display) -> Self {
        UctError::Open {
            library: library.into(),
            message: message.to_string(),
        }
    }

    /// Creates a symbol resolution error.
    pub fn symbol(symbol: &'static str, message: impl fmt::Display) -> Self {
        UctError::Symbol {
            symbol,
            message: message.to_string(),
        }
    }

    /// Creates a status error for a failed libuct call.
    pub fn status(operation: &'static str, status: UcsStatus) -> Self {
        UctError::Status { operation, status }
    }

    /// Returns the underlying UCS status if this is a Status error.
    pub fn ucs_status(&self) -> Option<UcsStatus> {
        match self {
            UctError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns true if the library itself is unusable, as opposed to a
    /// single branch of the resource hierarchy.
    pub fn is_library_unavailable(&self) -> bool {
        matches!(
            self,
            UctError::Open { .. } | UctError::Symbol { .. } | UctError::Closed
        )
    }
}

/// Result type for UCT operations.
pub type UctResult<T> = Result<T, UctError>;

/// Extension trait for converting raw status codes.
pub trait UcsStatusExt {
    /// Converts a raw status code to a Result.
    fn to_result(self, operation: &'static str) -> UctResult<()>;
}

impl UcsStatusExt for i32 {
    fn to_result(self, operation: &'static str) -> UctResult<()> {
        UcsStatus::from_raw(self).into_result(operation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_from_raw() {
        assert_eq!(UcsStatus::from_raw(0), UcsStatus::Ok);
        assert_eq!(UcsStatus::from_raw(-14), UcsStatus::NoDevice);
        assert_eq!(UcsStatus::from_raw(-999), UcsStatus::Unknown);
    }

    #[test]
    fn test_status_display() {
        assert_eq!(UcsStatus::NoDevice.to_string(), "UCS_ERR_NO_DEVICE");
        assert_eq!(UcsStatus::Ok.to_string(), "UCS_OK");
    }

    #[test]
    fn test_raw_status_to_result() {
        assert!(0_i32.to_result("uct_md_open").is_ok());

        let err = (-4_i32).to_result("uct_md_open").unwrap_err();
        assert_eq!(err.ucs_status(), Some(UcsStatus::NoMemory));
        assert_eq!(err.to_string(), "uct_md_open failed: UCS_ERR_NO_MEMORY");
    }

    #[test]
    fn test_in_progress_is_error() {
        assert!(1_i32.to_result("uct_query_components").is_err());
    }

    #[test]
    fn test_library_unavailable() {
        assert!(UctError::open("libuct.so", "not found").is_library_unavailable());
        assert!(UctError::Closed.is_library_unavailable());
        assert!(!UctError::status("uct_md_open", UcsStatus::Busy).is_library_unavailable());
    }
}
