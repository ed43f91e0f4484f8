//! Encoding a dentry tree back into metadata-resource bytes.
//!
//! Emission is two-phase: a layout pass walks the tree computing every
//! directory's subdir offset, then the write pass produces the records in
//! the canonical order: the root record and its terminator first, then
//! each directory's children as a terminated run at the directory's
//! subdir offset, depth first.

use binrw::io::Cursor;
use binrw::{BinWrite, Endian};

use wim_dtyp::{Sha1Hash, SizedWideString, binrw_util::prelude::*};

use crate::error::WimMetaError;
use crate::inode::Inode;
use crate::records::{
    DENTRY_FIXED_LEN, DentryHeader, DentryIdentity, STREAM_ENTRY_FIXED_LEN, StreamEntryHeader,
    align8,
};
use crate::tree::{DentryId, DentryTree};

/// Serialise the tree so that its first byte lands at `root_offset`
/// within the metadata resource. Subdir offsets are resource-absolute,
/// so the caller must place the returned bytes at that offset.
///
/// An empty tree (no root) produces a single 8-byte terminator.
pub fn write_dentry_tree(
    tree: &mut DentryTree,
    root_offset: u64,
) -> Result<Vec<u8>, WimMetaError> {
    let mut out = Cursor::new(Vec::new());
    let Some(root) = tree.root() else {
        0u64.write_le(&mut out)?;
        return Ok(out.into_inner());
    };

    // Layout pass: the root's children start right after its record and
    // terminator.
    let mut next_offset = root_offset + dentry_total_len(tree, root) + 8;
    calculate_subdir_offsets(tree, root, &mut next_offset);

    // Write pass.
    write_dentry(tree, root, &mut out)?;
    0u64.write_le(&mut out)?;
    write_children(tree, root, root_offset, &mut out)?;
    Ok(out.into_inner())
}

/// Assign `dir` its subdir offset and advance the running offset past its
/// child records, then recurse into child directories in the same order
/// the write pass uses.
fn calculate_subdir_offsets(tree: &mut DentryTree, dir: DentryId, next_offset: &mut u64) {
    tree.dentry_mut(dir).subdir_offset = *next_offset;
    let children: Vec<DentryId> = tree.children(dir).collect();
    for &child in &children {
        *next_offset += dentry_total_len(tree, child);
    }
    *next_offset += 8;
    for &child in &children {
        if tree.is_directory(child) {
            calculate_subdir_offsets(tree, child, next_offset);
        } else {
            tree.dentry_mut(child).subdir_offset = 0;
        }
    }
}

fn write_children(
    tree: &DentryTree,
    dir: DentryId,
    root_offset: u64,
    out: &mut Cursor<Vec<u8>>,
) -> Result<(), WimMetaError> {
    debug_assert_eq!(
        root_offset + out.position(),
        tree.dentry(dir).subdir_offset(),
        "layout and write passes disagree"
    );
    let children: Vec<DentryId> = tree.children(dir).collect();
    for &child in &children {
        write_dentry(tree, child, out)?;
    }
    0u64.write_le(out)?;
    for &child in &children {
        if tree.is_directory(child) {
            write_children(tree, child, root_offset, out)?;
        }
    }
    Ok(())
}

/// The stream layout a dentry record will use: the default-hash field
/// plus any extra stream entries as (name, hash) pairs.
///
/// Extra entries are needed when there is a reparse stream or at least
/// one named data stream; they then appear as the reparse stream first,
/// the unnamed data stream always (even when empty), and the named data
/// streams in input order. Encrypted inodes never get extra entries: the
/// default hash carries the raw EFSRPC stream.
fn plan_streams(inode: &Inode) -> (Sha1Hash, Vec<(SizedWideString, Sha1Hash)>) {
    if inode.attributes.encrypted() {
        let hash = inode.efsrpc_stream().map(|s| s.hash).unwrap_or_default();
        return (hash, Vec::new());
    }
    let reparse = inode.reparse_stream();
    let unnamed_hash = inode
        .unnamed_data_stream()
        .map(|s| s.hash)
        .unwrap_or_default();
    let named: Vec<_> = inode.named_data_streams().collect();
    if reparse.is_none() && named.is_empty() {
        return (unnamed_hash, Vec::new());
    }
    let mut entries = Vec::with_capacity(2 + named.len());
    if let Some(reparse) = reparse {
        entries.push((SizedWideString::default(), reparse.hash));
    }
    entries.push((SizedWideString::default(), unnamed_hash));
    for stream in named {
        entries.push((stream.name.clone(), stream.hash));
    }
    (Sha1Hash::ZERO, entries)
}

fn name_field_len(nbytes: u64) -> u64 {
    if nbytes > 0 { nbytes + 2 } else { 0 }
}

/// On-disk length of the dentry record alone (no stream entries).
fn dentry_record_len(tree: &DentryTree, id: DentryId) -> u64 {
    let dentry = tree.dentry(id);
    let mut len = DENTRY_FIXED_LEN
        + name_field_len(dentry.name.size())
        + name_field_len(dentry.short_name.size());
    let extra = &tree.inode_of(id).extra;
    if !extra.is_empty() {
        len = align8(len) + extra.len() as u64;
    }
    align8(len)
}

fn stream_entry_len(name: &SizedWideString) -> u64 {
    align8(STREAM_ENTRY_FIXED_LEN + name_field_len(name.size()))
}

/// Total on-disk length of a dentry record including its stream entries.
fn dentry_total_len(tree: &DentryTree, id: DentryId) -> u64 {
    let (_, entries) = plan_streams(tree.inode_of(id));
    dentry_record_len(tree, id)
        + entries
            .iter()
            .map(|(name, _)| stream_entry_len(name))
            .sum::<u64>()
}

fn pad_to_8(out: &mut Cursor<Vec<u8>>, record_start: u64) -> Result<(), WimMetaError> {
    let written = out.position() - record_start;
    for _ in written..align8(written) {
        0u8.write_le(out)?;
    }
    Ok(())
}

fn write_name(out: &mut Cursor<Vec<u8>>, name: &SizedWideString) -> Result<(), WimMetaError> {
    if !name.is_empty() {
        name.write_le(out)?;
        0u16.write_le(out)?;
    }
    Ok(())
}

fn write_dentry(
    tree: &DentryTree,
    id: DentryId,
    out: &mut Cursor<Vec<u8>>,
) -> Result<(), WimMetaError> {
    let dentry = tree.dentry(id);
    let inode = tree.inode_of(id);
    let (default_hash, entries) = plan_streams(inode);

    let identity = if inode.attributes.reparse_point() {
        DentryIdentity::Reparse {
            reparse_tag: inode.reparse_tag,
            not_rpfixed: inode.not_rpfixed,
        }
    } else {
        DentryIdentity::HardLink {
            hard_link_group_id: inode.ino,
        }
    };

    let record_start = out.position();
    let length_marker = PosMarker::<u64>::default();
    length_marker.write_le(out)?;
    let header = DentryHeader {
        attributes: inode.attributes,
        security_id: inode.security_id,
        subdir_offset: dentry.subdir_offset(),
        creation_time: inode.creation_time,
        last_access_time: inode.last_access_time,
        last_write_time: inode.last_write_time,
        default_hash,
        identity,
        num_extra_streams: entries.len() as u16,
        short_name_nbytes: dentry.short_name.size() as u16,
        long_name_nbytes: dentry.name.size() as u16,
    };
    header.write_le(out)?;
    write_name(out, &dentry.name)?;
    write_name(out, &dentry.short_name)?;
    if !inode.extra.is_empty() {
        pad_to_8(out, record_start)?;
        inode.extra.write_le(out)?;
    }
    pad_to_8(out, record_start)?;
    length_marker.write_size(out, Endian::Little)?;

    for (name, hash) in &entries {
        write_stream_entry(out, name, *hash)?;
    }
    Ok(())
}

fn write_stream_entry(
    out: &mut Cursor<Vec<u8>>,
    name: &SizedWideString,
    hash: Sha1Hash,
) -> Result<(), WimMetaError> {
    let entry_start = out.position();
    let length_marker = PosMarker::<u64>::default();
    length_marker.write_le(out)?;
    let header = StreamEntryHeader {
        hash,
        name_nbytes: name.size() as u16,
    };
    header.write_le(out)?;
    write_name(out, name)?;
    pad_to_8(out, entry_start)?;
    length_marker.write_size(out, Endian::Little)?;
    Ok(())
}
