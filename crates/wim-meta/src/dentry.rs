//! Dentries: named links from a directory to an inode.

use wim_dtyp::SizedWideString;

use crate::tree::{DentryId, InodeId};

/// One node of the in-memory tree.
///
/// A dentry owns its names and its place in the parent's indexes; file
/// contents and attributes live on the inode it links to. The root dentry
/// has an empty name and is its own parent; an unlinked dentry keeps its
/// names but also reverts to being its own parent.
#[derive(Debug)]
pub struct Dentry {
    /// Long name. Empty only for the root (and stripped-to-empty roots).
    pub name: SizedWideString,
    /// Optional 8.3 short name.
    pub short_name: SizedWideString,
    pub(crate) parent: DentryId,
    pub(crate) inode: InodeId,
    /// Non-representative members of this dentry's case-insensitive
    /// equivalence class. Only meaningful on the representative (the
    /// member present in the CI index).
    pub(crate) ci_class: Vec<DentryId>,
    pub(crate) in_ci_index: bool,
    /// Offset of this directory's child list within the metadata
    /// resource, filled in by the emission layout pass.
    pub(crate) subdir_offset: u64,
    pub(crate) cached_path: Option<String>,
}

impl Dentry {
    pub(crate) fn new(name: SizedWideString, short_name: SizedWideString, inode: InodeId, self_id: DentryId) -> Self {
        Self {
            name,
            short_name,
            parent: self_id,
            inode,
            ci_class: Vec::new(),
            in_ci_index: false,
            subdir_offset: 0,
            cached_path: None,
        }
    }

    pub fn parent(&self) -> DentryId {
        self.parent
    }

    pub fn inode_id(&self) -> InodeId {
        self.inode
    }

    /// Dentries that share this dentry's case-insensitive name, beyond
    /// itself. Empty unless this dentry is the representative of a
    /// colliding class.
    pub fn ci_collisions(&self) -> &[DentryId] {
        &self.ci_class
    }

    /// Subdir offset computed by the last emission layout pass.
    pub fn subdir_offset(&self) -> u64 {
        self.subdir_offset
    }
}
