use std::io;
use std::path::PathBuf;

/// Errors surfaced by the codec.
///
/// Grammar and validation failures are fatal to the instance that produced
/// them: the [`Reader`](crate::Reader) or [`Writer`](crate::Writer) stores
/// the error and replays it on every subsequent call.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A malformed token, a grammar violation, or invalid header fields.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// The source ended in the middle of the archive.
    #[error("unexpected end of archive")]
    UnexpectedEof,

    /// Data follows the closing parenthesis of the root node.
    #[error("trailing data after end of archive")]
    TrailingData,

    /// More bytes were written to a file than its header declared,
    /// or the current entry is not a regular file.
    #[error("write too long")]
    WriteTooLong,

    /// An entry is not ordered strictly after its predecessor.
    #[error("{path:?} is not ordered after {prev:?}")]
    OutOfOrder { path: String, prev: String },

    /// The filesystem entry is neither a regular file, a directory,
    /// nor a symlink.
    #[error("unknown type {1:?} for file {0}")]
    UnknownFileType(PathBuf, std::fs::FileType),

    /// A regular file size with the high bit set.
    #[error("file too large ({0} bytes)")]
    UnsupportedSize(u64),

    /// An error from the underlying source or sink.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidData(msg.into())
    }

    /// Whether this error came from the underlying source or sink
    /// rather than from the archive data itself.
    pub fn is_io(&self) -> bool {
        matches!(self, Error::Io(_))
    }
}

// `io::Error` is not `Clone`, so the wrapped variant clones by
// reconstruction. The replayed copy preserves the kind and message.
impl Clone for Error {
    fn clone(&self) -> Self {
        match self {
            Error::InvalidData(msg) => Error::InvalidData(msg.clone()),
            Error::UnexpectedEof => Error::UnexpectedEof,
            Error::TrailingData => Error::TrailingData,
            Error::WriteTooLong => Error::WriteTooLong,
            Error::OutOfOrder { path, prev } => Error::OutOfOrder {
                path: path.clone(),
                prev: prev.clone(),
            },
            Error::UnknownFileType(path, ft) => Error::UnknownFileType(path.clone(), *ft),
            Error::UnsupportedSize(n) => Error::UnsupportedSize(*n),
            Error::Io(e) => Error::Io(io::Error::new(e.kind(), e.to_string())),
        }
    }
}

impl From<Error> for io::Error {
    fn from(e: Error) -> io::Error {
        match e {
            Error::Io(inner) => inner,
            Error::UnexpectedEof => io::Error::new(io::ErrorKind::UnexpectedEof, e.to_string()),
            Error::WriteTooLong => io::Error::new(io::ErrorKind::WriteZero, e.to_string()),
            _ => io::Error::new(io::ErrorKind::InvalidData, e.to_string()),
        }
    }
}
