//! Error types for the sstfuzz engine services.

use std::fmt;

/// The error type returned by the table writer, reader and filesystem.
#[derive(Debug)]
pub enum Error {
    /// I/O error
    Io(std::io::Error),

    /// Serialization/deserialization error
    Serialization(String),

    /// On-disk data does not match its checksum or expected layout
    Corruption(String),

    /// The caller violated an API precondition
    InvalidArgument(String),

    /// The operation is not supported by this build
    NotSupported(String),
}

impl Error {
    /// Returns true for errors reporting damaged on-disk data.
    pub fn is_corruption(&self) -> bool {
        matches!(self, Error::Corruption(_))
    }

    /// Returns true for errors reporting a violated API precondition.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Error::InvalidArgument(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "IO error: {}", e),
            Error::Serialization(msg) => write!(f, "Serialization error: {}", msg),
            Error::Corruption(msg) => write!(f, "Corruption: {}", msg),
            Error::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            Error::NotSupported(msg) => write!(f, "Not supported: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

/// A specialized `Result` type for sstfuzz engine operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_prefixes() {
        let err = Error::InvalidArgument("end key comes before start key".into());
        assert_eq!(
            err.to_string(),
            "Invalid argument: end key comes before start key"
        );
        assert!(err.is_invalid_argument());
        assert!(!err.is_corruption());

        let err = Error::Corruption("block checksum mismatch".into());
        assert_eq!(err.to_string(), "Corruption: block checksum mismatch");
        assert!(err.is_corruption());
    }

    #[test]
    fn test_io_error_source() {
        use std::error::Error as _;

        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.source().is_some());
    }
}
