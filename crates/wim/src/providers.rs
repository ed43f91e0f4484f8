//! Seams to the engine's external collaborators.
//!
//! The engine never touches the archive file directly: metadata resources
//! arrive and leave as decompressed buffers, file contents come from a
//! content-addressed blob store, the image XML document is written through
//! a property sink, and registry hives are consumed through a narrow query
//! surface. Front-ends (CLI, mounters, extractors) supply the
//! implementations.

use std::io::Read;

use wim_dtyp::Sha1Hash;

use crate::WimError;

/// Supplies and accepts uncompressed metadata-resource buffers. The
/// provider owns compression, chunking and placement within the archive.
pub trait MetadataResourceProvider {
    /// The decompressed metadata resource of an image.
    fn read(&self, image_id: u32) -> std::io::Result<Vec<u8>>;
    /// Store a rebuilt metadata resource for an image.
    fn write(&mut self, image_id: u32, bytes: &[u8]) -> std::io::Result<()>;
}

/// Content-addressed access to file data.
pub trait BlobProvider {
    fn blob_size(&self, hash: &Sha1Hash) -> std::io::Result<u64>;
    fn open_blob(&self, hash: &Sha1Hash) -> std::io::Result<Box<dyn Read + '_>>;
}

/// Write access to an image's XML properties.
///
/// `path` nests elements with `/`; `NAME[k]` addresses the k-th (1-based)
/// sibling of that name. Only allocation failure is an error.
pub trait XmlPropertySink {
    fn set(&mut self, path: &str, value: &str) -> Result<(), WimError>;
}

/// Status tag of a registry-hive query. Everything except
/// [`HiveStatus::OutOfMemory`] is recoverable for the engine's purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HiveStatus {
    OutOfMemory,
    NotFound,
    Invalid,
    Unsupported,
}

pub type HiveResult<T> = Result<T, HiveStatus>;

/// Query surface over one parsed registry hive. Keys are `\`-separated
/// paths below the hive root.
pub trait RegistryHive {
    fn get_string(&self, key: &str, value: &str) -> HiveResult<String>;
    fn get_number(&self, key: &str, value: &str) -> HiveResult<u64>;
    /// Subkey names of `key`, in hive order.
    fn list_subkeys(&self, key: &str) -> HiveResult<Vec<String>>;
}

/// Validates hive bytes and opens a query handle over them.
pub trait RegistryHiveParser {
    fn open<'a>(&'a self, bytes: &'a [u8]) -> HiveResult<Box<dyn RegistryHive + 'a>>;
}
