//! Centralized error types for the nalu workspace.

use thiserror::Error;

/// Top-level error enum. Variants map to subsystems.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum NaluError {
    #[error("Asset error: {0}")]
    Asset(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Bitstream error: {0}")]
    Bitstream(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type NaluResult<T> = Result<T, NaluError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_convert() {
        fn open() -> NaluResult<()> {
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"))?;
            Ok(())
        }
        let err = open().unwrap_err();
        assert!(matches!(err, NaluError::Io(_)));
        assert_eq!(err.to_string(), "I/O error: gone");
    }
}
