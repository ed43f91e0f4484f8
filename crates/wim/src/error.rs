use thiserror::Error;

use wim_compress::WimCompressError;
use wim_meta::{PathError, WimMetaError};

/// Top-level error type of the engine.
#[derive(Error, Debug)]
pub enum WimError {
    #[error("Out of memory")]
    OutOfMemory,
    #[error("Metadata error: {0}")]
    Metadata(#[from] WimMetaError),
    #[error("Compression error: {0}")]
    Compression(#[from] WimCompressError),
    #[error("Path error: {0}")]
    Path(#[from] PathError),
    #[error("IO Error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Operation cancelled")]
    Cancelled,
}
