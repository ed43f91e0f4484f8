//! On-disk record layouts of the metadata resource.
//!
//! A decompressed metadata resource is a stream of 8-byte-aligned records:
//! one dentry record per directory entry, each optionally followed by
//! extra stream entry records. Everything is little-endian. The variable
//! tails (names, padding, tagged items) are framed by the parse/emit
//! layers; the structs here cover the fixed headers.

use binrw::prelude::*;
use wim_dtyp::{FileAttributes, ReparseTag, Sha1Hash, binrw_util::prelude::*};

/// Bytes in a dentry record up to and including the name length fields.
pub const DENTRY_FIXED_LEN: u64 = 102;

/// Bytes in a stream entry record up to and including the name length.
pub const STREAM_ENTRY_FIXED_LEN: u64 = 38;

/// Round a record length up to the 8-byte alignment all records keep.
pub const fn align8(len: u64) -> u64 {
    (len + 7) & !7
}

/// The 12 bytes at offset 84 hold either reparse-point data or the
/// hard-link group id, selected by the reparse attribute bit. When the bit
/// is set, only the reparse view is meaningful; stray hard-link ids seen
/// in the wild under the reparse bit are ignored.
#[binrw::binrw]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[brw(little)]
#[br(import(reparse: bool))]
pub enum DentryIdentity {
    #[br(pre_assert(reparse))]
    Reparse {
        #[bw(calc = 0)]
        _unused: u32,
        reparse_tag: ReparseTag,
        #[bw(calc = 0)]
        _reserved: u16,
        /// Nonzero when the reparse target was not fixed up to an
        /// image-relative form at capture time.
        not_rpfixed: u16,
    },
    #[br(pre_assert(!reparse))]
    HardLink {
        #[bw(calc = 0)]
        _unused: u32,
        /// Hard-link group id; dentries sharing a nonzero id refer to one
        /// inode. Zero means no hard-link identity.
        hard_link_group_id: u64,
    },
}

/// Fixed header of a dentry record, after the leading 8-byte length.
///
/// The length is framing and is handled by the parse/emit layers (a
/// length of zero terminates a sibling list, and emission back-patches it
/// once the variable tail is written). Following this header on disk: the
/// long name (NUL-terminated if present), the short name (likewise),
/// padding to 8, the tagged-item blob, padding to 8. The record length
/// spans all of that, including the final padding.
#[binrw::binrw]
#[derive(Debug, PartialEq, Eq)]
#[brw(little)]
pub struct DentryHeader {
    pub attributes: FileAttributes,
    pub security_id: i32,
    pub subdir_offset: u64,
    #[bw(calc = 0)]
    _unused1: u64,
    #[bw(calc = 0)]
    _unused2: u64,
    pub creation_time: FileTime,
    pub last_access_time: FileTime,
    pub last_write_time: FileTime,
    /// SHA-1 of the default stream, or zero when extra stream entries
    /// carry the hashes instead.
    pub default_hash: Sha1Hash,
    #[br(args(attributes.reparse_point()))]
    pub identity: DentryIdentity,
    pub num_extra_streams: u16,
    /// Short (8.3) name length in bytes, no NUL.
    pub short_name_nbytes: u16,
    /// Long name length in bytes, no NUL.
    pub long_name_nbytes: u16,
}

/// Fixed header of an extra stream entry record, after the leading
/// 8-byte length.
///
/// Followed on disk by the stream name (NUL-terminated if present) and
/// padding to 8. The entry length spans the whole entry.
#[binrw::binrw]
#[derive(Debug, PartialEq, Eq)]
#[brw(little)]
pub struct StreamEntryHeader {
    #[bw(calc = 0)]
    _unused: u64,
    pub hash: Sha1Hash,
    pub name_nbytes: u16,
}

#[cfg(test)]
mod tests {
    use super::*;
    use binrw::io::Cursor;

    #[test]
    fn test_align8() {
        assert_eq!(align8(0), 0);
        assert_eq!(align8(1), 8);
        assert_eq!(align8(8), 8);
        assert_eq!(align8(102), 104);
    }

    #[test]
    fn test_dentry_header_size() {
        let header = DentryHeader {
            attributes: FileAttributes::new().with_normal(true),
            security_id: -1,
            subdir_offset: 0,
            creation_time: FileTime::from(1u64),
            last_access_time: FileTime::from(2u64),
            last_write_time: FileTime::from(3u64),
            default_hash: Sha1Hash::ZERO,
            identity: DentryIdentity::HardLink {
                hard_link_group_id: 0,
            },
            num_extra_streams: 0,
            short_name_nbytes: 0,
            long_name_nbytes: 2,
        };
        let mut writer = Cursor::new(Vec::new());
        header.write_le(&mut writer).unwrap();
        // The leading 8-byte length field is framing, not part of the
        // struct.
        assert_eq!(writer.into_inner().len() as u64, DENTRY_FIXED_LEN - 8);
    }

    #[test]
    fn test_identity_follows_attribute_bit() {
        // Same 12 bytes, read through both views.
        let bytes: Vec<u8> = [
            0u32.to_le_bytes().as_slice(),
            0xA000_000Cu32.to_le_bytes().as_slice(),
            0u16.to_le_bytes().as_slice(),
            1u16.to_le_bytes().as_slice(),
        ]
        .concat();

        let reparse = DentryIdentity::read_le_args(&mut Cursor::new(&bytes), (true,)).unwrap();
        assert_eq!(
            reparse,
            DentryIdentity::Reparse {
                reparse_tag: ReparseTag::SYMLINK,
                not_rpfixed: 1,
            }
        );

        let hard_link = DentryIdentity::read_le_args(&mut Cursor::new(&bytes), (false,)).unwrap();
        assert_eq!(
            hard_link,
            DentryIdentity::HardLink {
                hard_link_group_id: 0x0001_0000_A000_000C,
            }
        );
    }

    wim_tests::test_binrw_round_trip! {
        StreamEntryHeader {
            hash: Sha1Hash([0x11; 20]),
            name_nbytes: 6,
        }: [
            // reserved
            0, 0, 0, 0, 0, 0, 0, 0,
            // hash
            0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11,
            0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11,
            // name length
            6, 0,
        ]
    }

    #[test]
    fn test_stream_entry_header_size() {
        let header = StreamEntryHeader {
            hash: Sha1Hash::ZERO,
            name_nbytes: 0,
        };
        let mut writer = Cursor::new(Vec::new());
        header.write_le(&mut writer).unwrap();
        assert_eq!(writer.into_inner().len() as u64, STREAM_ENTRY_FIXED_LEN - 8);
    }
}
