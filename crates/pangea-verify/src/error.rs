use std::io;

#[derive(Debug, thiserror::Error)]
pub enum VerificationError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("stream could not be rewound: expected offset {expected}, found {actual}")]
    Rewind { expected: u64, actual: u64 },
}

pub type Result<T> = std::result::Result<T, VerificationError>;
