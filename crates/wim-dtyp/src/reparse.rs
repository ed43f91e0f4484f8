//! Reparse point tags, [MS-FSCC] 2.1.2.1.
//!
//! A reparse-point dentry stores its tag in place of the hard-link group
//! id. The tag value encodes ownership bits in its top nibble.

use binrw::prelude::*;
use std::fmt;

#[derive(BinRead, BinWrite, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct ReparseTag(pub u32);

impl ReparseTag {
    pub const MOUNT_POINT: ReparseTag = ReparseTag(0xA000_0003);
    pub const HSM: ReparseTag = ReparseTag(0xC000_0004);
    pub const SIS: ReparseTag = ReparseTag(0x8000_0007);
    pub const DFS: ReparseTag = ReparseTag(0x8000_000A);
    pub const SYMLINK: ReparseTag = ReparseTag(0xA000_000C);
    pub const DFSR: ReparseTag = ReparseTag(0x8000_0012);
    pub const DEDUP: ReparseTag = ReparseTag(0x8000_0013);
    pub const WOF: ReparseTag = ReparseTag(0x8000_0017);

    /// Tag is defined by Microsoft (bit 31).
    pub fn is_microsoft(&self) -> bool {
        self.0 & 0x8000_0000 != 0
    }

    /// Surrogate bit: the file represents another named entity (links).
    pub fn is_name_surrogate(&self) -> bool {
        self.0 & 0x2000_0000 != 0
    }

    pub fn is_link(&self) -> bool {
        *self == Self::SYMLINK || *self == Self::MOUNT_POINT
    }
}

impl From<u32> for ReparseTag {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl fmt::Debug for ReparseTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ReparseTag({:#010x})", self.0)
    }
}
