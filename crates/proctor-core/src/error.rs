use thiserror::Error;

/// Recoverable and fatal error conditions the engine can surface.
///
/// Per the error handling design: recoverable errors are always logged,
/// never turned into `Violation`s (violations are reserved for
/// observations about the examinee, not engine faults).
#[derive(Debug, Error)]
pub enum ProctorError {
    #[error("proctor: frame decode failed - {0}")]
    FrameDecode(String),

    #[error("proctor: detector fault ({substream}) - {message}")]
    DetectorFault { substream: &'static str, message: String },

    #[error("proctor: session not found for connection {0}")]
    SessionNotFound(String),

    #[error("proctor: session already exists for connection {0}")]
    SessionAlreadyExists(String),

    #[error("proctor: protocol violation - {0}")]
    ProtocolViolation(String),

    #[error("proctor: storage error - {0}")]
    Storage(String),

    #[error("proctor: invalid configuration - {0}")]
    InvalidConfig(String),

    #[error("proctor: io error - {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ProctorError>;
