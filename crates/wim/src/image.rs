//! An image handle: one directory tree inside an archive.

use wim_meta::DentryTree;
use wim_meta::parse::CancelCheck;

use crate::WimError;
use crate::providers::MetadataResourceProvider;

/// One image of an archive, bound to its in-memory dentry tree.
///
/// An image handle is owned by one thread at a time; all tree mutation and
/// metadata I/O for the image goes through it. Independent handles may be
/// used concurrently from different threads.
#[derive(Debug)]
pub struct Image {
    pub image_id: u32,
    pub tree: DentryTree,
}

impl Image {
    /// Load an image's tree from its metadata resource. `root_offset` is
    /// the root dentry offset recorded in the image header.
    pub fn load(
        provider: &dyn MetadataResourceProvider,
        image_id: u32,
        root_offset: u64,
        cancel: Option<&CancelCheck<'_>>,
    ) -> Result<Self, WimError> {
        let bytes = provider.read(image_id)?;
        let tree = wim_meta::read_dentry_tree(&bytes, root_offset, cancel)?;
        log::debug!("Loaded metadata for image {image_id} ({} bytes)", bytes.len());
        Ok(Self { image_id, tree })
    }

    /// Serialise the tree and hand it back to the provider, placing the
    /// root at `root_offset` within the resource.
    pub fn store(
        &mut self,
        provider: &mut dyn MetadataResourceProvider,
        root_offset: u64,
    ) -> Result<(), WimError> {
        let bytes = wim_meta::write_dentry_tree(&mut self.tree, root_offset)?;
        provider.write(self.image_id, &bytes)?;
        log::debug!("Stored metadata for image {} ({} bytes)", self.image_id, bytes.len());
        Ok(())
    }
}
