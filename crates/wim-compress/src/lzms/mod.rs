//! State shared between the LZMS compressor and decompressor.
//!
//! LZMS is the "recovery" codec of WIM archives. Both directions of the
//! codec need the position/length slot partitioning ([`slots`]), the x86
//! machine-code preprocessing filter ([`x86`]) and the recent-offset LRU
//! queues ([`lru`]).

pub mod lru;
pub mod slots;
pub mod x86;

pub use lru::{DeltaLruQueue, DeltaPair, LzLruQueue};
pub use slots::{find_slot, length_slot_bases, position_slot_bases};
pub use x86::{X86_LAST_TARGET_USAGES_LEN, x86_filter};
