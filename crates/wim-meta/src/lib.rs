//! The metadata-resource codec and in-memory directory tree.
//!
//! A WIM image's directory tree is stored as one "metadata resource": a
//! compressed blob that decompresses to a flat run of directory-entry
//! (dentry) records. This crate decodes that buffer into a tree of
//! dentries and inodes ([`parse`]), maintains the tree with its dual
//! case-sensitive/case-insensitive per-directory indexes ([`tree`]), and
//! encodes a tree back into the canonical on-disk byte layout ([`emit`]).
//! Compression of the resource itself is the caller's concern.

pub mod case;
pub mod dentry;
pub mod emit;
pub mod error;
pub mod inode;
pub mod parse;
pub mod records;
pub mod streams;
pub mod tree;

pub use case::{CaseSensitivity, default_ignore_case, init_default_ignore_case};
pub use dentry::Dentry;
pub use emit::write_dentry_tree;
pub use error::{DuplicateName, PathError, WimMetaError};
pub use inode::Inode;
pub use parse::read_dentry_tree;
pub use streams::{StreamDescriptor, StreamType};
pub use tree::{DentryId, DentryTree, InodeId};
