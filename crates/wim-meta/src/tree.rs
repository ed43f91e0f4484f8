//! The in-memory dentry tree.
//!
//! Dentries and inodes live in arenas owned by the tree and refer to each
//! other through typed ids; the parent owns its children through the two
//! per-directory ordered indexes on the directory inode. All structural
//! mutation goes through [`DentryTree`] so the indexes, the
//! case-insensitive collision classes and the cached paths stay
//! consistent.

use wim_dtyp::SizedWideString;

use crate::case::{CaseSensitivity, upcase_name};
use crate::dentry::Dentry;
use crate::error::{DuplicateName, PathError, WimMetaError};
use crate::inode::Inode;

/// Handle to a dentry in a [`DentryTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DentryId(pub(crate) u32);

/// Handle to an inode in a [`DentryTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InodeId(pub(crate) u32);

#[derive(Debug, Default)]
pub struct DentryTree {
    dentries: Vec<Option<Dentry>>,
    inodes: Vec<Option<Inode>>,
    root: Option<DentryId>,
}

impl DentryTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root(&self) -> Option<DentryId> {
        self.root
    }

    /// Install `id` as the root. The root is its own parent.
    pub fn set_root(&mut self, id: DentryId) {
        self.dentry_mut(id).parent = id;
        self.root = Some(id);
    }

    pub fn dentry(&self, id: DentryId) -> &Dentry {
        self.dentries[id.0 as usize]
            .as_ref()
            .expect("stale DentryId")
    }

    pub fn dentry_mut(&mut self, id: DentryId) -> &mut Dentry {
        self.dentries[id.0 as usize]
            .as_mut()
            .expect("stale DentryId")
    }

    pub fn inode(&self, id: InodeId) -> &Inode {
        self.inodes[id.0 as usize].as_ref().expect("stale InodeId")
    }

    pub fn inode_mut(&mut self, id: InodeId) -> &mut Inode {
        self.inodes[id.0 as usize].as_mut().expect("stale InodeId")
    }

    /// The inode a dentry links to.
    pub fn inode_of(&self, id: DentryId) -> &Inode {
        self.inode(self.dentry(id).inode)
    }

    pub fn is_directory(&self, id: DentryId) -> bool {
        self.inode_of(id).is_directory()
    }

    pub fn new_inode(&mut self, inode: Inode) -> InodeId {
        let id = InodeId(self.inodes.len() as u32);
        self.inodes.push(Some(inode));
        id
    }

    /// Create an unlinked dentry referring to `inode`, bumping its link
    /// count.
    pub fn new_dentry(
        &mut self,
        name: SizedWideString,
        short_name: SizedWideString,
        inode: InodeId,
    ) -> DentryId {
        let id = DentryId(self.dentries.len() as u32);
        self.inode_mut(inode).nlink += 1;
        self.dentries
            .push(Some(Dentry::new(name, short_name, inode, id)));
        id
    }

    /// Children of a directory in case-sensitive name order.
    pub fn children(&self, dir: DentryId) -> impl Iterator<Item = DentryId> + '_ {
        self.inode_of(dir).children_cs.values().copied()
    }

    /// Link `child` under `parent`.
    ///
    /// Fails with [`DuplicateName`] if a sibling with the exact name
    /// exists; the child is left unlinked and is returned to the caller's
    /// ownership. A case-insensitive collision is not an error: the child
    /// is threaded onto the representative's collision class and stays
    /// out of the CI index.
    pub fn link(&mut self, parent: DentryId, child: DentryId) -> Result<(), DuplicateName> {
        debug_assert!(self.is_directory(parent), "link target must be a directory");
        let name_units: Vec<u16> = self.dentry(child).name.as_units().to_vec();
        let parent_inode = self.dentry(parent).inode;

        if self.inode(parent_inode).children_cs.contains_key(&name_units) {
            return Err(DuplicateName);
        }
        self.inode_mut(parent_inode)
            .children_cs
            .insert(name_units.clone(), child);

        let ci_key = upcase_name(&name_units);
        match self.inode(parent_inode).children_ci.get(&ci_key).copied() {
            None => {
                self.inode_mut(parent_inode).children_ci.insert(ci_key, child);
                self.dentry_mut(child).in_ci_index = true;
            }
            Some(representative) => {
                self.dentry_mut(representative).ci_class.push(child);
                self.dentry_mut(child).in_ci_index = false;
            }
        }

        self.dentry_mut(child).parent = parent;
        self.invalidate_paths(child);
        Ok(())
    }

    /// Remove `child` from its parent's indexes and collision class. The
    /// dentry keeps its names and reverts to being its own parent. If the
    /// child was the CI representative of a colliding class, the next
    /// member is promoted into the CI index.
    pub fn unlink(&mut self, child: DentryId) {
        if self.root == Some(child) {
            self.root = None;
            self.invalidate_paths(child);
            return;
        }
        let parent = self.dentry(child).parent;
        if parent == child {
            return; // already unlinked
        }
        let name_units: Vec<u16> = self.dentry(child).name.as_units().to_vec();
        let parent_inode = self.dentry(parent).inode;

        self.inode_mut(parent_inode).children_cs.remove(&name_units);

        let ci_key = upcase_name(&name_units);
        if self.dentry(child).in_ci_index {
            self.inode_mut(parent_inode).children_ci.remove(&ci_key);
            let mut class = std::mem::take(&mut self.dentry_mut(child).ci_class);
            if !class.is_empty() {
                let promoted = class.remove(0);
                self.dentry_mut(promoted).ci_class = class;
                self.dentry_mut(promoted).in_ci_index = true;
                self.inode_mut(parent_inode)
                    .children_ci
                    .insert(ci_key, promoted);
            }
            self.dentry_mut(child).in_ci_index = false;
        } else if let Some(representative) =
            self.inode(parent_inode).children_ci.get(&ci_key).copied()
        {
            self.dentry_mut(representative)
                .ci_class
                .retain(|&member| member != child);
        }

        self.dentry_mut(child).parent = child;
        self.invalidate_paths(child);
    }

    /// Free an unlinked dentry, dropping its inode when the last link is
    /// gone.
    pub fn free_dentry(&mut self, id: DentryId) {
        debug_assert_eq!(self.dentry(id).parent, id, "dentry must be unlinked");
        let inode = self.dentry(id).inode;
        self.dentries[id.0 as usize] = None;
        let remaining = {
            let inode = self.inode_mut(inode);
            inode.nlink -= 1;
            inode.nlink
        };
        if remaining == 0 {
            self.inodes[inode.0 as usize] = None;
        }
    }

    /// Unlink and free `id` and everything below it, children first.
    pub fn remove_subtree(&mut self, id: DentryId) {
        let children: Vec<DentryId> = if self.is_directory(id) {
            self.children(id).collect()
        } else {
            Vec::new()
        };
        for child in children {
            self.remove_subtree(child);
        }
        self.unlink(id);
        self.free_dentry(id);
    }

    /// Look up a child of `dir` by name.
    ///
    /// Case-insensitive lookups with several case-colliding candidates
    /// prefer an exact match; failing that, the representative is
    /// returned with a warning, matching what an application would get
    /// from the underlying format (the choice among collisions is
    /// arbitrary but stable for a given insertion order).
    pub fn lookup_child(
        &self,
        dir: DentryId,
        name: &[u16],
        case: CaseSensitivity,
    ) -> Option<DentryId> {
        let inode = self.inode_of(dir);
        if !case.ignores_case() {
            return inode.children_cs.get(name).copied();
        }
        let representative = *inode.children_ci.get(&upcase_name(name))?;
        let rep_dentry = self.dentry(representative);
        if rep_dentry.ci_class.is_empty() || rep_dentry.name.as_units() == name {
            return Some(representative);
        }
        for &member in &rep_dentry.ci_class {
            if self.dentry(member).name.as_units() == name {
                return Some(member);
            }
        }
        log::warn!(
            "Case-insensitive lookup of \"{}\" matched {} names; returning \"{}\"",
            String::from_utf16_lossy(name),
            rep_dentry.ci_class.len() + 1,
            rep_dentry.name,
        );
        Some(representative)
    }

    /// Resolve a `/`- or `\`-separated path from the root.
    ///
    /// Leading and repeated separators are ignored; the empty path is the
    /// root. A trailing separator requires the final component to be a
    /// directory.
    pub fn resolve_path(&self, path: &str, case: CaseSensitivity) -> Result<DentryId, PathError> {
        let mut current = self.root.ok_or(PathError::NotFound)?;
        for component in path.split(['/', '\\']).filter(|c| !c.is_empty()) {
            if !self.is_directory(current) {
                return Err(PathError::NotADirectory);
            }
            let units: Vec<u16> = component.encode_utf16().collect();
            current = self
                .lookup_child(current, &units, case)
                .ok_or(PathError::NotFound)?;
        }
        if path.ends_with(['/', '\\']) && !self.is_directory(current) {
            return Err(PathError::NotADirectory);
        }
        Ok(current)
    }

    /// Visit `id` and its subtree, parents before children, children in
    /// case-sensitive name order.
    pub fn for_each_pre_order<F: FnMut(DentryId)>(&self, id: DentryId, f: &mut F) {
        f(id);
        if self.is_directory(id) {
            let children: Vec<DentryId> = self.children(id).collect();
            for child in children {
                self.for_each_pre_order(child, f);
            }
        }
    }

    /// Visit `id` and its subtree, children before parents.
    pub fn for_each_post_order<F: FnMut(DentryId)>(&self, id: DentryId, f: &mut F) {
        if self.is_directory(id) {
            let children: Vec<DentryId> = self.children(id).collect();
            for child in children {
                self.for_each_post_order(child, f);
            }
        }
        f(id);
    }

    /// Full path of a dentry from the root, `/`-separated. Cached until
    /// the dentry or an ancestor is re-linked.
    pub fn full_path(&mut self, id: DentryId) -> Result<String, WimMetaError> {
        if let Some(path) = &self.dentry(id).cached_path {
            return Ok(path.clone());
        }
        let mut components: Vec<String> = Vec::new();
        let mut current = id;
        loop {
            let dentry = self.dentry(current);
            if dentry.parent == current {
                break;
            }
            components.push(String::try_from(&dentry.name)?);
            current = dentry.parent;
        }
        components.reverse();
        let path = format!("/{}", components.join("/"));
        self.dentry_mut(id).cached_path = Some(path.clone());
        Ok(path)
    }

    fn invalidate_paths(&mut self, id: DentryId) {
        self.dentry_mut(id).cached_path = None;
        if self.is_directory(id) {
            let children: Vec<DentryId> = self.children(id).collect();
            for child in children {
                self.invalidate_paths(child);
            }
        }
    }
}
