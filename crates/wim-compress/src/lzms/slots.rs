//! Position and length slot-base tables.
//!
//! LZMS entropy-codes match offsets and lengths as (slot, extra bits)
//! pairs. The slot partitioning is fixed by the format and is expanded at
//! runtime from two run-length-encoded delta tables: each run of `k`
//! entries advances the base by the current delta `k` times, then the
//! delta doubles. The tables are process-wide, built once and then read
//! without synchronisation.

use std::sync::OnceLock;

/// Number of position slots.
pub const NUM_POSITION_SLOTS: usize = 66;

/// Number of length slots.
pub const NUM_LENGTH_SLOTS: usize = 54;

/// Sentinel above the last real position slot base.
const POSITION_SLOT_TOP: u32 = 0x7fff_ffff;

/// Sentinel above the last real length slot base.
const LENGTH_SLOT_TOP: u32 = 0x4001_08ab;

/// Run lengths for the position-slot delta expansion. Entry `i` spans a
/// delta of `1 << i`.
const POSITION_SLOT_DELTA_RUN_LENS: [u8; 29] = [
    4, 4, 4, 4, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2,
];

/// Run lengths for the length-slot delta expansion.
const LENGTH_SLOT_DELTA_RUN_LENS: [u8; 9] = [27, 9, 6, 4, 3, 2, 1, 1, 1];

fn decode_delta_rle_slot_bases<const N: usize>(
    delta_run_lens: &[u8],
    top: u32,
) -> [u32; N] {
    let mut bases = [0u32; N];
    let mut delta = 1u32;
    let mut base = 0u32;
    let mut slot = 0usize;
    for &run_len in delta_run_lens {
        for _ in 0..run_len {
            base += delta;
            bases[slot] = base;
            slot += 1;
        }
        delta <<= 1;
    }
    debug_assert_eq!(slot, N - 1);
    bases[slot] = top;
    bases
}

/// The position slot-base table, including the sentinel top entry.
pub fn position_slot_bases() -> &'static [u32; NUM_POSITION_SLOTS + 1] {
    static TABLE: OnceLock<[u32; NUM_POSITION_SLOTS + 1]> = OnceLock::new();
    TABLE.get_or_init(|| {
        decode_delta_rle_slot_bases(&POSITION_SLOT_DELTA_RUN_LENS, POSITION_SLOT_TOP)
    })
}

/// The length slot-base table, including the sentinel top entry.
pub fn length_slot_bases() -> &'static [u32; NUM_LENGTH_SLOTS + 1] {
    static TABLE: OnceLock<[u32; NUM_LENGTH_SLOTS + 1]> = OnceLock::new();
    TABLE.get_or_init(|| {
        decode_delta_rle_slot_bases(&LENGTH_SLOT_DELTA_RUN_LENS, LENGTH_SLOT_TOP)
    })
}

/// Largest slot `s` with `bases[s] <= value`.
///
/// `value` must lie below the sentinel top entry. The walk is linear; the
/// tables are small enough that this is not worth a binary search on the
/// decode path, and results would be identical.
pub fn find_slot(value: u32, bases: &[u32]) -> usize {
    let mut slot = 0;
    while bases[slot + 1] <= value {
        slot += 1;
    }
    slot
}
