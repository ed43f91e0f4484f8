use thiserror::Error;

/// Errors specific to the wim-meta crate.
///
/// Only unrecoverable conditions surface here. Anomalies the parser can
/// recover from (duplicate siblings, unnamed dentries, and so on) are
/// logged as warnings and the offending dentry is skipped.
#[derive(Error, Debug)]
pub enum WimMetaError {
    /// The metadata resource byte buffer is not a valid dentry tree.
    #[error("The WIM metadata resource is invalid: {0}")]
    InvalidMetadataResource(&'static str),
    /// A name could not be converted between UTF-16 and the native string
    /// type.
    #[error("String encoding conversion failed")]
    Encoding(#[from] std::string::FromUtf16Error),
    /// Record-level serialisation failure during emission.
    #[error("Binrw Error: {0}")]
    BinRw(#[from] binrw::Error),
    /// The caller's cancel check fired.
    #[error("Operation cancelled")]
    Cancelled,
}

/// Path resolution failures, discriminated errno-style so callers can tell
/// a missing component from a file used as a directory.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathError {
    #[error("No such file or directory")]
    NotFound,
    #[error("Not a directory")]
    NotADirectory,
}

/// Returned by `link` when the parent already has a child with the exact
/// (case-sensitive) name; the rejected dentry is handed back to the caller.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("A sibling with the same name already exists")]
pub struct DuplicateName;
