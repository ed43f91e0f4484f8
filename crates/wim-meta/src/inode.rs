//! Inodes: the file identities dentries link to.

use std::collections::BTreeMap;

use wim_dtyp::{FileAttributes, ReparseTag, Sha1Hash, SizedWideString, binrw_util::prelude::*};

use crate::streams::{StreamDescriptor, StreamType};
use crate::tree::DentryId;

/// A file identity, shared by all hard links to the file.
///
/// Directory inodes also own the two ordered child indexes: one keyed by
/// the exact UTF-16 name, one keyed by the upcased name with exactly one
/// representative per case-insensitive equivalence class.
#[derive(Debug, Default)]
pub struct Inode {
    pub attributes: FileAttributes,
    /// Index into the image's security descriptor table; -1 for none.
    pub security_id: i32,
    pub creation_time: FileTime,
    pub last_access_time: FileTime,
    pub last_write_time: FileTime,
    /// Hard-link group id. Zero means the inode has no hard-link identity
    /// (always the case for reparse points).
    pub ino: u64,
    pub streams: Vec<StreamDescriptor>,
    /// Opaque tagged metadata items carried through parse and emit.
    pub extra: Vec<u8>,
    pub reparse_tag: ReparseTag,
    pub not_rpfixed: u16,
    pub(crate) nlink: u32,
    /// Children by exact name (directories only).
    pub(crate) children_cs: BTreeMap<Vec<u16>, DentryId>,
    /// Representative child per upcased name (directories only).
    pub(crate) children_ci: BTreeMap<Vec<u16>, DentryId>,
    pub(crate) next_stream_id: u32,
}

impl Inode {
    /// New inode with the given attributes, no security descriptor and no
    /// streams.
    pub fn new(attributes: FileAttributes) -> Self {
        Self {
            attributes,
            security_id: -1,
            ..Default::default()
        }
    }

    pub fn is_directory(&self) -> bool {
        self.attributes.directory()
    }

    /// Number of dentries referring to this inode.
    pub fn link_count(&self) -> u32 {
        self.nlink
    }

    pub fn child_count(&self) -> usize {
        self.children_cs.len()
    }

    /// Append a stream, assigning it the next inode-unique stream id.
    pub fn add_stream(
        &mut self,
        stream_type: StreamType,
        name: SizedWideString,
        hash: Sha1Hash,
    ) -> &mut StreamDescriptor {
        self.next_stream_id += 1;
        self.streams.push(StreamDescriptor {
            stream_id: self.next_stream_id,
            stream_type,
            name,
            hash,
        });
        self.streams.last_mut().unwrap()
    }

    /// The unnamed data stream, if any.
    pub fn unnamed_data_stream(&self) -> Option<&StreamDescriptor> {
        self.streams
            .iter()
            .find(|s| s.stream_type == StreamType::Data && !s.is_named())
    }

    pub fn reparse_stream(&self) -> Option<&StreamDescriptor> {
        self.streams
            .iter()
            .find(|s| s.stream_type == StreamType::ReparsePoint)
    }

    pub fn efsrpc_stream(&self) -> Option<&StreamDescriptor> {
        self.streams
            .iter()
            .find(|s| s.stream_type == StreamType::EfsrpcRawData)
    }

    /// Named data streams, in insertion order.
    pub fn named_data_streams(&self) -> impl Iterator<Item = &StreamDescriptor> {
        self.streams
            .iter()
            .filter(|s| s.stream_type == StreamType::Data && s.is_named())
    }
}
