//! Inode stream table and stream-type assignment.
//!
//! Each inode carries one or more streams: the unnamed data stream, named
//! alternate data streams, the reparse-point stream, or a raw EFSRPC blob
//! for encrypted files. On disk the streams arrive as bare (name, hash)
//! pairs; their types are reconstructed heuristically once all of an
//! inode's streams have been read.

use wim_dtyp::{FileAttributes, Sha1Hash, SizedWideString};

/// What a stream's contents mean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamType {
    /// Not yet classified.
    #[default]
    Unknown,
    /// File data: the unnamed stream or a named alternate data stream.
    Data,
    /// Reparse-point data.
    ReparsePoint,
    /// Raw encrypted data returned by the EFSRPC "backup" interface.
    EfsrpcRawData,
}

/// One stream attached to an inode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamDescriptor {
    /// Inode-unique id, stable for the lifetime of the inode.
    pub stream_id: u32,
    pub stream_type: StreamType,
    /// Empty for the unnamed stream.
    pub name: SizedWideString,
    /// SHA-1 of the contents; zero means no contents.
    pub hash: Sha1Hash,
}

impl StreamDescriptor {
    pub fn is_named(&self) -> bool {
        !self.name.is_empty()
    }
}

/// Classify an inode's streams after reading them from disk.
///
/// Slot 0 holds the dentry record's default hash under the empty name;
/// later slots are the extra stream entries in on-disk order.
///
/// Encrypted inodes are special: their only meaningful stream is the raw
/// EFSRPC blob, carried as the first unnamed stream with contents, and
/// they never have a reparse stream. For everything else: named streams
/// are data, the first unnamed stream with contents becomes the reparse
/// stream (reparse-point inodes only) or the unnamed data stream, and if
/// only empty unnamed streams were seen one of them is promoted to be the
/// (empty) unnamed data stream.
pub fn assign_stream_types(streams: &mut [StreamDescriptor], attributes: FileAttributes) {
    if attributes.encrypted() {
        if let Some(stream) = streams
            .iter_mut()
            .find(|s| !s.is_named() && !s.hash.is_zero())
        {
            stream.stream_type = StreamType::EfsrpcRawData;
        }
        return;
    }

    let mut have_reparse = false;
    let mut have_unnamed_data = false;
    let mut zero_hash_fallback: Option<usize> = None;
    for idx in 0..streams.len() {
        if streams[idx].is_named() {
            streams[idx].stream_type = StreamType::Data;
        } else if !streams[idx].hash.is_zero() {
            if attributes.reparse_point() && !have_reparse {
                streams[idx].stream_type = StreamType::ReparsePoint;
                have_reparse = true;
            } else if !have_unnamed_data {
                streams[idx].stream_type = StreamType::Data;
                have_unnamed_data = true;
            }
        } else if zero_hash_fallback.is_none() {
            zero_hash_fallback = Some(idx);
        }
    }
    if !have_unnamed_data {
        if let Some(idx) = zero_hash_fallback {
            streams[idx].stream_type = StreamType::Data;
        }
    }
}
