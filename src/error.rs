//! Error types shared by the ICO codec and the executable icon extractor.

use std::path::PathBuf;
use thiserror::Error;

/// Result type used throughout this crate.
pub type Result<T> = std::result::Result<T, IconError>;

/// Errors that can occur while encoding, decoding or extracting icons.
#[derive(Error, Debug)]
pub enum IconError {
    /// A header or signature did not match the expected ICO/group layout.
    #[error("Invalid icon data: {0}")]
    Format(String),

    /// The icon directory declares zero entries.
    #[error("Icon directory contains no entries")]
    EmptyContainer,

    /// A read while walking the PE resource tree fell outside its bounds.
    #[error(
        "Corrupt resource table: read of {len} bytes at offset {offset:#x} \
         exceeds bound {bound:#x}"
    )]
    CorruptResourceTable {
        /// Offset of the attempted read.
        offset: u64,
        /// Length of the attempted read.
        len: u64,
        /// Size of the region the read was checked against.
        bound: u64,
    },

    /// A requested width/height is not present in the icon directory.
    #[error("No {width}x{height} image in icon directory")]
    MissingResolution {
        /// Requested width, in pixels.
        width: u32,
        /// Requested height, in pixels.
        height: u32,
    },

    /// A group-icon frame references an image resource that does not exist
    /// in any language.
    #[error("Icon group {group} references missing icon resource {icon_id}")]
    UnresolvedFrame {
        /// Display form of the group identifier.
        group: String,
        /// The RT_ICON identifier that could not be resolved.
        icon_id: u16,
    },

    /// A declared size exceeds the addressable buffer or a representable
    /// integer.
    #[error("Size error: {0}")]
    Size(String),

    /// The operation observed a cancellation request.
    #[error("Operation cancelled")]
    Cancelled,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Image decoding or resampling error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// An error tied to a specific file.
    #[error("{}: {source}", path.display())]
    Path {
        /// The file being processed.
        path: PathBuf,
        /// The underlying failure.
        #[source]
        source: Box<IconError>,
    },
}

impl IconError {
    /// Attaches a file path to this error.  Cancellation is passed through
    /// unwrapped so callers can keep matching on it directly.
    pub fn with_path(self, path: impl Into<PathBuf>) -> IconError {
        match self {
            IconError::Cancelled => IconError::Cancelled,
            IconError::Path { .. } => self,
            other => {
                IconError::Path { path: path.into(), source: Box::new(other) }
            }
        }
    }

    /// Returns true if this error (or the error it wraps) is a cancellation.
    pub fn is_cancelled(&self) -> bool {
        match self {
            IconError::Cancelled => true,
            IconError::Path { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }
}

impl From<png::EncodingError> for IconError {
    fn from(error: png::EncodingError) -> IconError {
        match error {
            png::EncodingError::IoError(error) => IconError::Io(error),
            other => IconError::Format(format!("PNG encoding failed: {}", other)),
        }
    }
}

impl From<png::DecodingError> for IconError {
    fn from(error: png::DecodingError) -> IconError {
        match error {
            png::DecodingError::IoError(error) => IconError::Io(error),
            other => IconError::Format(format!("Malformed PNG data: {}", other)),
        }
    }
}
