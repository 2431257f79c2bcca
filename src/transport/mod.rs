mod buffer;
mod file;

pub use buffer::BufferTransport;
pub use file::FileTransport;

use std::path::PathBuf;
use thiserror::Error;

use crate::codec::CodecError;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("The specified file does not exist: {0}")]
    NotFound(PathBuf),
    #[error("Failed to access {0}: {1}")]
    Io(PathBuf, std::io::Error),
    #[error(transparent)]
    Codec(#[from] CodecError),
}

impl TransportError {
    pub(crate) fn from_io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => TransportError::NotFound(path.into()),
            _ => TransportError::Io(path.into(), err),
        }
    }

    /// Failure category, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            TransportError::NotFound(_) => "NotFoundError",
            TransportError::Io(..) | TransportError::Codec(CodecError::Io(_)) => "IOError",
            TransportError::Codec(CodecError::Encoding(_)) => "EncodingError",
            TransportError::Codec(CodecError::Decoding(_)) => "DecodingError",
        }
    }
}
