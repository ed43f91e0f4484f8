//! Decoding a metadata resource into a dentry tree.
//!
//! The input is the decompressed metadata-resource byte buffer; the root
//! dentry sits at a caller-supplied offset taken from the image header.
//! Structural damage (truncated or overlapping records, odd name lengths,
//! directory cycles) is fatal; anomalies confined to a single dentry
//! (missing or reserved names, duplicate siblings, children under a
//! non-directory) are logged and the dentry is skipped so the rest of the
//! image stays usable.

use std::collections::HashMap;

use binrw::BinRead;
use binrw::io::Cursor;

use wim_dtyp::{ReparseTag, Sha1Hash, SizedWideString};

use crate::error::WimMetaError;
use crate::inode::Inode;
use crate::records::{
    DENTRY_FIXED_LEN, DentryHeader, DentryIdentity, STREAM_ENTRY_FIXED_LEN, StreamEntryHeader,
    align8,
};
use crate::streams::{StreamType, assign_stream_types};
use crate::tree::{DentryId, DentryTree, InodeId};

/// Caller-supplied cancellation check, polled once per dentry.
pub type CancelCheck<'a> = dyn Fn() -> bool + 'a;

/// Read the dentry tree rooted at `root_offset` out of a decompressed
/// metadata resource.
///
/// An all-but-empty resource (terminator at the root offset) yields a
/// tree with no root.
pub fn read_dentry_tree(
    buf: &[u8],
    root_offset: u64,
    cancel: Option<&CancelCheck<'_>>,
) -> Result<DentryTree, WimMetaError> {
    Parser {
        buf,
        tree: DentryTree::new(),
        cancel,
        link_groups: HashMap::new(),
    }
    .run(root_offset)
}

fn invalid(reason: &'static str) -> WimMetaError {
    WimMetaError::InvalidMetadataResource(reason)
}

/// A dentry record pulled off disk, before it joins the tree.
struct RawDentry {
    header: DentryHeader,
    long_name: SizedWideString,
    short_name: SizedWideString,
    extra: Vec<u8>,
    streams: Vec<(SizedWideString, Sha1Hash)>,
    /// Aligned bytes consumed, including trailing stream entries.
    total_len: u64,
}

struct Parser<'a, 'c> {
    buf: &'a [u8],
    tree: DentryTree,
    cancel: Option<&'c CancelCheck<'c>>,
    /// Hard-link group id -> inode, for rebuilding link groups.
    link_groups: HashMap<u64, InodeId>,
}

impl Parser<'_, '_> {
    fn run(mut self, root_offset: u64) -> Result<DentryTree, WimMetaError> {
        let Some(mut raw) = self.read_record(root_offset)? else {
            return Ok(self.tree);
        };
        if !raw.header.attributes.directory() {
            return Err(invalid("root dentry is not a directory"));
        }
        if !raw.long_name.is_empty() {
            log::warn!("The root dentry has a name (\"{}\"); stripping it", raw.long_name);
            raw.long_name = SizedWideString::default();
        }
        let subdir_offset = raw.header.subdir_offset;
        let root = self.materialize(raw);
        self.tree.set_root(root);
        if subdir_offset != 0 {
            let mut ancestors = vec![subdir_offset];
            self.read_children(root, subdir_offset, &mut ancestors)?;
        }
        Ok(self.tree)
    }

    fn read_children(
        &mut self,
        parent: DentryId,
        offset: u64,
        ancestors: &mut Vec<u64>,
    ) -> Result<(), WimMetaError> {
        let mut cur = offset;
        loop {
            if let Some(cancel) = self.cancel {
                if cancel() {
                    return Err(WimMetaError::Cancelled);
                }
            }
            let Some(raw) = self.read_record(cur)? else {
                return Ok(());
            };
            cur += raw.total_len;

            if raw.long_name.is_empty() {
                log::warn!("Ignoring unnamed dentry");
                continue;
            }
            if raw.long_name == "." || raw.long_name == ".." {
                log::warn!("Ignoring dentry named \"{}\"", raw.long_name);
                continue;
            }

            let subdir_offset = if raw.header.attributes.directory() {
                raw.header.subdir_offset
            } else {
                if raw.header.subdir_offset != 0 {
                    log::warn!(
                        "Ignoring children claimed by non-directory \"{}\"",
                        raw.long_name
                    );
                }
                0
            };

            let child = self.materialize(raw);
            if self.tree.link(parent, child).is_err() {
                log::warn!(
                    "Ignoring dentry \"{}\" duplicating an earlier sibling",
                    self.tree.dentry(child).name
                );
                self.tree.free_dentry(child);
                continue;
            }

            if subdir_offset != 0 {
                if ancestors.contains(&subdir_offset) {
                    return Err(invalid("directory cycle in dentry tree"));
                }
                ancestors.push(subdir_offset);
                self.read_children(child, subdir_offset, ancestors)?;
                ancestors.pop();
            }
        }
    }

    /// Read one dentry record and its trailing stream entries. `None`
    /// means the sibling list terminated here.
    fn read_record(&self, offset: u64) -> Result<Option<RawDentry>, WimMetaError> {
        let buf_len = self.buf.len() as u64;
        let length_end = offset
            .checked_add(8)
            .filter(|&end| end <= buf_len)
            .ok_or(invalid("dentry length field overruns the resource"))?;
        let length = u64::from_le_bytes(
            self.buf[offset as usize..length_end as usize]
                .try_into()
                .unwrap(),
        );
        if length <= 8 {
            return Ok(None);
        }
        if length < DENTRY_FIXED_LEN {
            return Err(invalid("dentry record length below the fixed header"));
        }
        let record_end = offset
            .checked_add(align8(length))
            .filter(|&end| end <= buf_len)
            .ok_or(invalid("dentry record overruns the resource"))?;

        let record = &self.buf[offset as usize..(offset + length) as usize];
        let mut cursor = Cursor::new(&record[8..]);
        let header = DentryHeader::read_le(&mut cursor)
            .map_err(|_| invalid("unreadable dentry header"))?;

        if header.long_name_nbytes % 2 != 0 || header.short_name_nbytes % 2 != 0 {
            return Err(invalid("dentry name length is odd"));
        }
        let long = u64::from(header.long_name_nbytes);
        let short = u64::from(header.short_name_nbytes);
        let names_end = DENTRY_FIXED_LEN
            + if long > 0 { long + 2 } else { 0 }
            + if short > 0 { short + 2 } else { 0 };
        if length < names_end {
            return Err(invalid("dentry record too small for its names"));
        }

        let mut cursor = Cursor::new(record);
        cursor.set_position(DENTRY_FIXED_LEN);
        let long_name = read_name(&mut cursor, long)?;
        let short_name = read_name(&mut cursor, short)?;

        // Anything between the aligned end of the names and the stated
        // record length is tagged metadata, carried opaquely.
        let extra_start = align8(names_end).min(length);
        let extra = record[extra_start as usize..].to_vec();

        let mut streams = Vec::with_capacity(usize::from(header.num_extra_streams));
        let mut stream_offset = record_end;
        for _ in 0..header.num_extra_streams {
            let (name, hash, consumed) = self.read_stream_entry(stream_offset)?;
            streams.push((name, hash));
            stream_offset += consumed;
        }

        Ok(Some(RawDentry {
            header,
            long_name,
            short_name,
            extra,
            streams,
            total_len: stream_offset - offset,
        }))
    }

    fn read_stream_entry(
        &self,
        offset: u64,
    ) -> Result<(SizedWideString, Sha1Hash, u64), WimMetaError> {
        let buf_len = self.buf.len() as u64;
        let length_end = offset
            .checked_add(8)
            .filter(|&end| end <= buf_len)
            .ok_or(invalid("stream entry overruns the resource"))?;
        let length = u64::from_le_bytes(
            self.buf[offset as usize..length_end as usize]
                .try_into()
                .unwrap(),
        );
        if length < STREAM_ENTRY_FIXED_LEN {
            return Err(invalid("stream entry length below the fixed header"));
        }
        offset
            .checked_add(align8(length))
            .filter(|&end| end <= buf_len)
            .ok_or(invalid("stream entry overruns the resource"))?;

        let record = &self.buf[offset as usize..(offset + length) as usize];
        let mut cursor = Cursor::new(&record[8..]);
        let header = StreamEntryHeader::read_le(&mut cursor)
            .map_err(|_| invalid("unreadable stream entry header"))?;
        if header.name_nbytes % 2 != 0 {
            return Err(invalid("stream name length is odd"));
        }
        let name_len = u64::from(header.name_nbytes);
        let needed =
            STREAM_ENTRY_FIXED_LEN + if name_len > 0 { name_len + 2 } else { 0 };
        if length < needed {
            return Err(invalid("stream entry too small for its name"));
        }
        let mut cursor = Cursor::new(record);
        cursor.set_position(STREAM_ENTRY_FIXED_LEN);
        let name = read_name(&mut cursor, name_len)?;
        Ok((name, header.hash, align8(length)))
    }

    /// Turn a raw record into an inode and an unlinked dentry. Hard-link
    /// groups are rebuilt here: non-directory, non-reparse dentries with
    /// the same nonzero group id share one inode, keeping the metadata of
    /// the first record seen.
    fn materialize(&mut self, raw: RawDentry) -> DentryId {
        let header = raw.header;
        let (ino, reparse_tag, not_rpfixed) = match header.identity {
            DentryIdentity::Reparse {
                reparse_tag,
                not_rpfixed,
            } => (0, reparse_tag, not_rpfixed),
            DentryIdentity::HardLink { hard_link_group_id } => {
                (hard_link_group_id, ReparseTag::default(), 0)
            }
        };

        let shareable = ino != 0
            && !header.attributes.directory()
            && !header.attributes.reparse_point();
        if shareable {
            if let Some(&existing) = self.link_groups.get(&ino) {
                return self.tree.new_dentry(raw.long_name, raw.short_name, existing);
            }
        }

        let mut inode = Inode {
            attributes: header.attributes,
            security_id: header.security_id,
            creation_time: header.creation_time,
            last_access_time: header.last_access_time,
            last_write_time: header.last_write_time,
            ino,
            extra: raw.extra,
            reparse_tag,
            not_rpfixed,
            ..Default::default()
        };
        inode.add_stream(
            StreamType::Unknown,
            SizedWideString::default(),
            header.default_hash,
        );
        for (name, hash) in raw.streams {
            inode.add_stream(StreamType::Unknown, name, hash);
        }
        assign_stream_types(&mut inode.streams, header.attributes);

        let inode_id = self.tree.new_inode(inode);
        if shareable {
            self.link_groups.insert(ino, inode_id);
        }
        self.tree.new_dentry(raw.long_name, raw.short_name, inode_id)
    }
}

fn read_name(
    cursor: &mut Cursor<&[u8]>,
    nbytes: u64,
) -> Result<SizedWideString, WimMetaError> {
    let name = SizedWideString::read_le_args(cursor, (nbytes,))
        .map_err(|_| invalid("unreadable name"))?;
    if nbytes > 0 {
        // Skip the NUL terminator; its value is not validated.
        cursor.set_position(cursor.position() + 2);
    }
    Ok(name)
}
