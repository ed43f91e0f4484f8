//! Common Windows data types shared across the `wim-rs` workspace.
//!
//! WIM metadata is a thin wrapper around NTFS metadata, so most of the
//! types here are the on-disk Windows primitives: [`FileTime`] timestamps,
//! UTF-16LE counted strings, the file attribute bitmask, reparse tags and
//! SHA-1 content hashes.

pub mod attributes;
pub mod binrw_util;
pub mod hash;
pub mod reparse;

pub use attributes::FileAttributes;
pub use binrw_util::prelude::*;
pub use hash::Sha1Hash;
pub use reparse::ReparseTag;
