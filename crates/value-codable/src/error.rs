use keyed_archive::IntegrityFault;
use thiserror::Error;

/// Failure of a top-level decode.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("archive integrity fault: {0}")]
    Integrity(#[from] IntegrityFault),
}

impl DecodeError {
    pub fn fault(&self) -> &IntegrityFault {
        match self {
            DecodeError::Integrity(fault) => fault,
        }
    }
}
