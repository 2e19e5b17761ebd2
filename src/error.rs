//! Endpoint error kinds.
//!
//! Every failure of a write or read call is reported as one of these kinds.
//! Failures are local to the call that produced them; the service stays
//! available and the caller is expected to retry.

use axerrno::AxError;

/// Linux errno values reported by the endpoints.
pub mod errno {
    pub const ESRCH: i32 = 3;
    pub const EFAULT: i32 = 14;
    pub const EACCES: i32 = 13;
    pub const EBUSY: i32 = 16;
    pub const EINVAL: i32 = 22;
    pub const EFBIG: i32 = 27;
    pub const ENODATA: i32 = 61;
    pub const ESTALE: i32 = 116;
}

/// Error kinds surfaced by the introspection endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Unparsable or zero identifier, or a path that does not resolve.
    InvalidArgument,
    /// The identifier does not name a live process.
    NotFound,
    /// The slot still holds a deposit that has not been read.
    Busy,
    /// Read issued before any successful write.
    DataUnavailable,
    /// The caller's read buffer is below the record ceiling.
    BufferTooSmall,
    /// The payload could not be copied to or from the caller.
    TransportFault,
    /// The cached resource changed or disappeared since it was resolved.
    Stale,
    /// The caller may not open the endpoint.
    PermissionDenied,
}

impl Error {
    /// Negative errno returned to user space for this error.
    pub fn errno(&self) -> i32 {
        -match self {
            Self::InvalidArgument => errno::EINVAL,
            Self::NotFound => errno::ESRCH,
            Self::Busy => errno::EBUSY,
            Self::DataUnavailable => errno::ENODATA,
            Self::BufferTooSmall => errno::EFBIG,
            Self::TransportFault => errno::EFAULT,
            Self::Stale => errno::ESTALE,
            Self::PermissionDenied => errno::EACCES,
        }
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidArgument => write!(f, "Invalid argument"),
            Self::NotFound => write!(f, "Process not found"),
            Self::Busy => write!(f, "Previous resolution not yet consumed"),
            Self::DataUnavailable => write!(f, "No resource fetched"),
            Self::BufferTooSmall => write!(f, "Buffer size too small"),
            Self::TransportFault => write!(f, "Error copying data to or from user"),
            Self::Stale => write!(f, "Resolved resource is stale"),
            Self::PermissionDenied => write!(f, "Permission denied"),
        }
    }
}

impl core::error::Error for Error {}

impl From<Error> for AxError {
    fn from(err: Error) -> Self {
        match err {
            Error::InvalidArgument | Error::BufferTooSmall => AxError::InvalidInput,
            Error::NotFound => AxError::NotFound,
            Error::Busy => AxError::ResourceBusy,
            Error::DataUnavailable => AxError::BadState,
            Error::TransportFault => AxError::BadAddress,
            Error::Stale => AxError::InvalidData,
            Error::PermissionDenied => AxError::PermissionDenied,
        }
    }
}

/// Result type for endpoint operations.
pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errno_values() {
        assert_eq!(Error::InvalidArgument.errno(), -22);
        assert_eq!(Error::NotFound.errno(), -3);
        assert_eq!(Error::Busy.errno(), -16);
        assert_eq!(Error::DataUnavailable.errno(), -61);
        assert_eq!(Error::BufferTooSmall.errno(), -27);
        assert_eq!(Error::TransportFault.errno(), -14);
    }

    #[test]
    fn test_axerror_conversion() {
        assert!(matches!(AxError::from(Error::Busy), AxError::ResourceBusy));
        assert!(matches!(AxError::from(Error::NotFound), AxError::NotFound));
    }
}
