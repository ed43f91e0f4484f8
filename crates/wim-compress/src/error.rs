use thiserror::Error;

/// Errors specific to the wim-compress crate.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum WimCompressError {
    /// The codeword lengths do not describe a valid (complete or empty)
    /// canonical prefix code.
    #[error("Codeword lengths do not form a valid prefix code")]
    InvalidPrefixCode,
}
