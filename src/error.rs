//! Error types for the cls-mempool crate.

use std::fmt;
use std::io;

/// Result type alias using the cls-mempool error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when working with CPU-local memory pools.
#[derive(Debug)]
#[non_exhaustive]
pub enum Error {
    /// Malformed pool attributes, or a length that cannot be satisfied
    /// by any pool (`EINVAL`).
    InvalidArgument {
        /// Description of what was invalid.
        message: &'static str,
    },

    /// No registry slot was free, the memory provider failed to map
    /// memory, or a pool's slots are exhausted (`ENOMEM`).
    OutOfResources {
        /// What ran out.
        message: &'static str,
    },

    /// `pool_destroy` was called on an index that is not live (`ENOENT`).
    NotFound,

    /// A pool set already has a pool registered for this size class (`EBUSY`).
    Busy,

    /// The requested operation has no support on this platform (`ENOSYS`).
    NotSupported {
        /// Description of the missing facility.
        message: &'static str,
    },

    /// A memory-provider or NUMA-placement callback failed; the wrapped
    /// `io::Error` carries the errno reported by the callback.
    Provider(io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidArgument { message } => {
                write!(f, "invalid argument: {message}")
            }
            Error::OutOfResources { message } => {
                write!(f, "out of resources: {message}")
            }
            Error::NotFound => write!(f, "no such pool"),
            Error::Busy => write!(f, "pool set already has an entry for this size class"),
            Error::NotSupported { message } => write!(f, "not supported: {message}"),
            Error::Provider(err) => write!(f, "memory provider error: {err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Provider(err) => Some(err),
            _ => None,
        }
    }
}

impl Error {
    /// Creates an `InvalidArgument` error.
    #[inline]
    pub fn invalid_argument(message: &'static str) -> Self {
        Error::InvalidArgument { message }
    }

    /// Creates an `OutOfResources` error.
    #[inline]
    pub fn out_of_resources(message: &'static str) -> Self {
        Error::OutOfResources { message }
    }

    /// Creates a `NotSupported` error.
    #[inline]
    pub fn not_supported(message: &'static str) -> Self {
        Error::NotSupported { message }
    }

    /// Wraps the current `errno` as a `Provider` error.
    pub fn from_errno() -> Self {
        Error::Provider(io::Error::last_os_error())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = Error::OutOfResources {
            message: "pool exhausted",
        };
        assert!(err.to_string().contains("pool exhausted"));

        let err = Error::InvalidArgument {
            message: "item_size must be a power of two",
        };
        assert!(err.to_string().contains("power of two"));
    }

    #[test]
    fn error_helpers() {
        let err = Error::invalid_argument("bad stride");
        assert!(matches!(err, Error::InvalidArgument { .. }));

        let err = Error::not_supported("numa");
        assert!(matches!(err, Error::NotSupported { .. }));
    }

    #[test]
    fn provider_error_has_source() {
        use std::error::Error as _;
        let err = Error::Provider(io::Error::new(io::ErrorKind::Other, "mmap failed"));
        assert!(err.source().is_some());
    }
}
