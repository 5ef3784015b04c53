use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by the text I/O pipeline.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Reading the raw bytes of the location failed.
    #[error("failed to read {}: {source}", path.display())]
    ReadingFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The charset converter rejected the input.
    #[error("failed to convert {charset} text: {message}")]
    ConvertingFailed {
        charset: &'static str,
        message: String,
    },
    /// The bytes are not valid UTF-8. Recoverable by loading with repair enabled.
    #[error("text is not valid UTF-8 after byte {valid_up_to}")]
    EncodingNotValid { valid_up_to: usize },
    /// The charset has no available converter.
    #[error("unsupported character encoding {charset}")]
    UnsupportedEncoding { charset: String },
    /// Querying file metadata after a load, or before a save, failed.
    #[error("failed to query status of {}: {source}", path.display())]
    FileStatusFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The file changed on disk since it was last read.
    #[error("{} was modified on disk since it was last read", path.display())]
    Conflict { path: PathBuf },
    /// Writing the temporary file, the backup or the final rename failed.
    #[error("failed to write {}: {source}", path.display())]
    WritingFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The document has never been given a location.
    #[error("document has no location to save to")]
    MissingLocation,
}

impl CodecError {
    /// Errors for which the caller can offer a specific remedy
    /// (repair and continue, or force the overwrite).
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CodecError::EncodingNotValid { .. } | CodecError::Conflict { .. }
        )
    }

    /// Errors that picking another encoding may resolve.
    pub fn is_encoding_problem(&self) -> bool {
        matches!(
            self,
            CodecError::EncodingNotValid { .. }
                | CodecError::ConvertingFailed { .. }
                | CodecError::UnsupportedEncoding { .. }
        )
    }
}

pub type CodecResult<T> = Result<T, CodecError>;
