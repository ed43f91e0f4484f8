//! A pure-Rust engine for the WIM (Windows Imaging) archive format.
//!
//! A WIM archive stores one or more independent directory trees
//! ("images") over a shared content-addressed, deduplicated blob store.
//! This crate ties the workspace together: the metadata codec and dentry
//! tree live in [`wim_meta`], the shared compression-codec utilities in
//! [`wim_compress`], and the common Windows data types in [`wim_dtyp`].
//! On top of those it provides the [`Image`] handle, the collaborator
//! seams ([`providers`]) and the Windows metadata harvester
//! ([`windows`]).
//!
//! The archive container itself (header, blob lookup table, XML document,
//! integrity table) is outside this engine; front-ends supply it through
//! the provider traits.

pub mod error;
pub mod image;
pub mod providers;
pub mod windows;

pub use error::WimError;
pub use image::Image;
pub use providers::{
    BlobProvider, HiveResult, HiveStatus, MetadataResourceProvider, RegistryHive,
    RegistryHiveParser, XmlPropertySink,
};
pub use windows::set_windows_specific_info;

pub use wim_compress::{
    DecodeTableEntry, WimCompressError, build_decode_table, lzms, make_canonical_code,
};
pub use wim_dtyp::{FileAttributes, ReparseTag, Sha1Hash, SizedWideString};
pub use wim_meta::{
    CaseSensitivity, DentryId, DentryTree, DuplicateName, Inode, InodeId, PathError,
    StreamDescriptor, StreamType, WimMetaError, read_dentry_tree, write_dentry_tree,
};

/// Process-wide initialisation options.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LibraryOptions {
    /// Override the platform default for whether name lookups ignore
    /// case. `None` keeps the platform convention (ignore case on
    /// Windows, honour it elsewhere).
    pub ignore_case: Option<bool>,
}

/// Initialise process-wide library state.
///
/// Only the first effective call fixes the case policy; later calls and
/// racing lookups observe the published value.
pub fn init(options: &LibraryOptions) {
    if let Some(ignore_case) = options.ignore_case {
        wim_meta::init_default_ignore_case(ignore_case);
    }
}
