//! Decode-table construction (decoder side).
//!
//! Builds a fast lookup table for a canonical prefix code given only the
//! codeword lengths. The table has a root region indexed by the next
//! `root_bits` of input; codewords no longer than `root_bits` occupy
//! replicated direct entries, longer ones go through subtable pointer
//! entries into subtables appended past the root region.

use crate::WimCompressError;
use crate::canonical::MAX_CODEWORD_LEN;

/// One 16-bit decode-table entry.
///
/// Layout: bits 15..4 hold the symbol (direct entry) or the absolute start
/// index of a subtable (pointer entry); bits 3..0 hold the number of input
/// bits the entry consumes. For a direct entry in the root region that is
/// the full codeword length; in a subtable it is the codeword length minus
/// `root_bits`; for a pointer entry it is the subtable's index width.
///
/// The 12/4 split requires `root_bits <= 12` and total table sizes below
/// 4096 entries, which holds for every WIM codec alphabet.
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
#[repr(transparent)]
pub struct DecodeTableEntry(pub u16);

impl DecodeTableEntry {
    pub const EMPTY: DecodeTableEntry = DecodeTableEntry(0);

    const BITS_SHIFT: u32 = 4;
    const BITS_MASK: u16 = 0xF;

    pub const fn new(value: u16, nbits: u32) -> Self {
        DecodeTableEntry((value << Self::BITS_SHIFT) | (nbits as u16 & Self::BITS_MASK))
    }

    /// Symbol of a direct entry, or subtable start of a pointer entry.
    pub const fn value(self) -> u16 {
        self.0 >> Self::BITS_SHIFT
    }

    /// Input bits consumed: codeword length for direct entries (remaining
    /// length in a subtable), index width for pointer entries.
    pub const fn nbits(self) -> u32 {
        (self.0 & Self::BITS_MASK) as u32
    }
}

/// Build the decode table for the code described by `lens`.
///
/// `table` is a caller-owned scratch buffer reused across blocks; it is
/// cleared and filled completely. On success, every root index maps a
/// `root_bits`-wide chunk of input either to a direct entry or to a
/// subtable pointer whose subtable is itself fully initialised.
///
/// The lengths must describe a complete canonical prefix code, or an empty
/// one (no symbol used), in which case the whole table is zero-filled so
/// that any lookup yields symbol 0 with length 0.
pub fn build_decode_table(
    lens: &[u8],
    root_bits: u32,
    max_codeword_len: u32,
    table: &mut Vec<DecodeTableEntry>,
) -> Result<(), WimCompressError> {
    let num_syms = lens.len();
    assert!(num_syms <= 1 << 12);
    assert!(root_bits >= 1 && root_bits <= 12);
    assert!(max_codeword_len as usize <= MAX_CODEWORD_LEN);
    assert!(root_bits <= max_codeword_len);
    // Subtable entries store the remaining length in the 4-bit field.
    assert!(max_codeword_len - root_bits <= 15);

    let mut len_counts = [0u32; MAX_CODEWORD_LEN + 1];
    for &len in lens {
        if len as u32 > max_codeword_len {
            return Err(WimCompressError::InvalidPrefixCode);
        }
        len_counts[len as usize] += 1;
    }

    // Kraft accounting: walking lengths from short to long, each level
    // doubles the unassigned codespace and each codeword claims one unit.
    // Going negative means the code is over-subscribed; ending positive
    // means it is incomplete (unless no symbol is used at all).
    let mut remainder = 1i64;
    for len in 1..=max_codeword_len {
        remainder = 2 * remainder - i64::from(len_counts[len as usize]);
        if remainder < 0 {
            return Err(WimCompressError::InvalidPrefixCode);
        }
    }
    if remainder != 0 {
        if remainder != 1i64 << max_codeword_len {
            return Err(WimCompressError::InvalidPrefixCode);
        }
        // Empty code: zero-fill so lookups produce (symbol 0, length 0).
        table.clear();
        table.resize(1 << root_bits, DecodeTableEntry::EMPTY);
        return Ok(());
    }

    // Sort the used symbols primarily by codeword length, secondarily by
    // symbol value, via a counting sort over the lengths.
    let mut offsets = [0u32; MAX_CODEWORD_LEN + 1];
    for len in 1..max_codeword_len as usize {
        offsets[len + 1] = offsets[len] + len_counts[len];
    }
    let mut sorted_syms = vec![0u16; offsets[max_codeword_len as usize] as usize
        + len_counts[max_codeword_len as usize] as usize];
    for (sym, &len) in lens.iter().enumerate() {
        if len > 0 {
            sorted_syms[offsets[len as usize] as usize] = sym as u16;
            offsets[len as usize] += 1;
        }
    }

    table.clear();
    table.resize(1 << root_bits, DecodeTableEntry::EMPTY);

    // Root region: a codeword of length len <= root_bits owns all root
    // indexes sharing its len-bit prefix, i.e. 2^(root_bits - len)
    // consecutive entries in canonical order.
    let mut sym_idx = 0usize;
    let mut entry_idx = 0usize;
    let mut cur_len = 1u32;
    while cur_len <= root_bits {
        for _ in 0..len_counts[cur_len as usize] {
            let entry = DecodeTableEntry::new(sorted_syms[sym_idx], cur_len);
            sym_idx += 1;
            let fill = 1usize << (root_bits - cur_len);
            table[entry_idx..entry_idx + fill].fill(entry);
            entry_idx += fill;
        }
        cur_len += 1;
    }
    if sym_idx == sorted_syms.len() {
        return Ok(());
    }

    // Subtables. Track the canonical codeword of the current symbol; each
    // distinct root_bits-wide prefix opens a new subtable sized to the
    // codewords that fall under it.
    let mut len_counts = len_counts; // consumed from here on
    while len_counts[cur_len as usize] == 0 {
        cur_len += 1;
    }
    let mut codeword = (entry_idx as u32) << (cur_len - root_bits);
    let mut prev_prefix = u32::MAX;
    let mut subtable_start = 0usize;
    let mut subtable_bits = 0u32;
    while sym_idx < sorted_syms.len() {
        let prefix = codeword >> (cur_len - root_bits);
        if prefix != prev_prefix {
            prev_prefix = prefix;
            subtable_start = table.len();

            // Size the subtable: begin with one entry per codeword of the
            // current length; while codewords of that length cannot fill
            // it, widen to bring in longer codewords.
            subtable_bits = cur_len - root_bits;
            let mut remainder =
                (1i64 << subtable_bits) - i64::from(len_counts[cur_len as usize]);
            while remainder > 0 {
                subtable_bits += 1;
                remainder =
                    2 * remainder - i64::from(len_counts[(root_bits + subtable_bits) as usize]);
            }
            table.resize(subtable_start + (1 << subtable_bits), DecodeTableEntry::EMPTY);
            table[prefix as usize] = DecodeTableEntry::new(subtable_start as u16, subtable_bits);
        }

        // Fill this symbol's share of the subtable.
        let sub_len = cur_len - root_bits;
        let fill = 1usize << (subtable_bits - sub_len);
        let sub_index = ((codeword & ((1 << sub_len) - 1)) << (subtable_bits - sub_len)) as usize;
        let entry = DecodeTableEntry::new(sorted_syms[sym_idx], sub_len);
        sym_idx += 1;
        let base = subtable_start + sub_index;
        table[base..base + fill].fill(entry);

        // Advance to the next canonical codeword.
        len_counts[cur_len as usize] -= 1;
        codeword += 1;
        if len_counts[cur_len as usize] == 0 && sym_idx < sorted_syms.len() {
            let mut next_len = cur_len + 1;
            while len_counts[next_len as usize] == 0 {
                next_len += 1;
            }
            codeword <<= next_len - cur_len;
            cur_len = next_len;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::make_canonical_code;

    fn build(lens: &[u8], root_bits: u32, max_len: u32) -> Vec<DecodeTableEntry> {
        let mut table = Vec::new();
        build_decode_table(lens, root_bits, max_len, &mut table).unwrap();
        table
    }

    #[test]
    fn test_trivial_code() {
        // lens = [1,1], root_bits = 1: entry 0 -> (sym 0, len 1),
        // entry 1 -> (sym 1, len 1).
        let table = build(&[1, 1], 1, 1);
        assert_eq!(table.len(), 2);
        assert_eq!((table[0].value(), table[0].nbits()), (0, 1));
        assert_eq!((table[1].value(), table[1].nbits()), (1, 1));
    }

    #[test]
    fn test_empty_code_zero_filled() {
        let mut table = Vec::new();
        build_decode_table(&[0, 0, 0, 0], 3, 6, &mut table).unwrap();
        assert_eq!(table.len(), 8);
        assert!(table.iter().all(|e| e.0 == 0));
        assert_eq!((table[5].value(), table[5].nbits()), (0, 0));
    }

    #[test]
    fn test_replicated_root_leaves() {
        // lens [1,2,3,3]: codewords 0, 10, 110, 111.
        let table = build(&[1, 2, 3, 3], 3, 3);
        assert_eq!(table.len(), 8);
        // Symbol 0 (len 1) owns indexes 0..4.
        for idx in 0..4 {
            assert_eq!((table[idx].value(), table[idx].nbits()), (0, 1));
        }
        for idx in 4..6 {
            assert_eq!((table[idx].value(), table[idx].nbits()), (1, 2));
        }
        assert_eq!((table[6].value(), table[6].nbits()), (2, 3));
        assert_eq!((table[7].value(), table[7].nbits()), (3, 3));
    }

    #[test]
    fn test_oversubscribed_rejected() {
        let mut table = Vec::new();
        assert_eq!(
            build_decode_table(&[1, 1, 2], 2, 2, &mut table),
            Err(WimCompressError::InvalidPrefixCode)
        );
    }

    #[test]
    fn test_incomplete_rejected() {
        let mut table = Vec::new();
        assert_eq!(
            build_decode_table(&[2, 2, 2], 2, 2, &mut table),
            Err(WimCompressError::InvalidPrefixCode)
        );
    }

    #[test]
    fn test_subtable_construction() {
        // Root of 2 bits with codeword lengths up to 4: lens
        // [1, 2, 3, 4, 4] -> codewords 0, 10, 110, 1110, 1111. Prefix 11
        // needs a subtable covering lengths 3 and 4.
        let table = build(&[1, 2, 3, 4, 4], 2, 4);
        // Root: idx 0,1 -> sym0; idx 2 -> sym1; idx 3 -> pointer.
        assert_eq!((table[0].value(), table[0].nbits()), (0, 1));
        assert_eq!((table[1].value(), table[1].nbits()), (0, 1));
        assert_eq!((table[2].value(), table[2].nbits()), (1, 2));
        let ptr = table[3];
        assert_eq!(ptr.value() as usize, 4, "subtable starts after root");
        assert_eq!(ptr.nbits(), 2, "lengths 3..4 need 2 extra bits");
        assert_eq!(table.len(), 8);
        // Subtable: 110x -> sym2 (1 extra bit), 1110 -> sym3, 1111 -> sym4.
        assert_eq!((table[4].value(), table[4].nbits()), (2, 1));
        assert_eq!((table[5].value(), table[5].nbits()), (2, 1));
        assert_eq!((table[6].value(), table[6].nbits()), (3, 2));
        assert_eq!((table[7].value(), table[7].nbits()), (4, 2));
    }

    #[test]
    fn test_round_trip_with_canonical_code() {
        // Property: build a canonical code from frequencies, then a decode
        // table with root_bits = max_len; every max_len-wide bitstring
        // prefixed by a symbol's codeword must decode to that symbol with
        // its length.
        let freq_sets: &[&[u32]] = &[
            &[1, 1, 2, 5],
            &[3, 3, 3, 3],
            &[1, 2, 4, 8, 16, 32],
            &[9, 1, 1, 1, 1, 1, 1, 1, 7, 2],
        ];
        for freqs in freq_sets {
            let max_len = 10u32;
            let mut lens = vec![0u8; freqs.len()];
            let mut codewords = vec![0u32; freqs.len()];
            make_canonical_code(freqs, max_len as usize, &mut lens, &mut codewords);

            let table = build(&lens, max_len, max_len);
            for sym in 0..freqs.len() {
                let len = lens[sym] as u32;
                if len == 0 {
                    continue;
                }
                let prefix = codewords[sym] << (max_len - len);
                for tail in 0..(1u32 << (max_len - len)) {
                    let bits = prefix | tail;
                    let entry = table[bits as usize];
                    assert_eq!(entry.value(), sym as u16, "freqs {freqs:?} sym {sym}");
                    assert_eq!(entry.nbits(), len, "freqs {freqs:?} sym {sym}");
                }
            }
        }
    }

    #[test]
    fn test_round_trip_through_subtables() {
        // Same property as above, but with a small root so that long
        // codewords go through subtables.
        let freqs: &[u32] = &[40, 30, 20, 10, 5, 3, 2, 1, 1, 1, 1, 1];
        let max_len = 9u32;
        let root_bits = 4u32;
        let mut lens = vec![0u8; freqs.len()];
        let mut codewords = vec![0u32; freqs.len()];
        make_canonical_code(freqs, max_len as usize, &mut lens, &mut codewords);

        let table = build(&lens, root_bits, max_len);
        for sym in 0..freqs.len() {
            let len = lens[sym] as u32;
            let prefix = codewords[sym] << (max_len - len);
            for tail in 0..(1u32 << (max_len - len)) {
                let bits = prefix | tail;
                let root_entry = table[(bits >> (max_len - root_bits)) as usize];
                let (decoded, consumed) = if len <= root_bits {
                    (root_entry.value(), root_entry.nbits())
                } else {
                    let sub_bits = root_entry.nbits();
                    let sub_index = (bits >> (max_len - root_bits - sub_bits))
                        & ((1 << sub_bits) - 1);
                    let sub = table[root_entry.value() as usize + sub_index as usize];
                    (sub.value(), root_bits + sub.nbits())
                };
                assert_eq!(decoded, sym as u16, "sym {sym} bits {bits:b}");
                assert_eq!(consumed, len, "sym {sym}");
            }
        }
    }

    #[test]
    fn test_rebuild_lens_from_table_matches() {
        // Canonical-code round trip: lens -> decode table -> read back each
        // symbol's length from its codeword path -> same lens.
        let freqs: &[u32] = &[7, 1, 3, 3, 9, 2];
        let max_len = 8u32;
        let mut lens = vec![0u8; freqs.len()];
        let mut codewords = vec![0u32; freqs.len()];
        make_canonical_code(freqs, max_len as usize, &mut lens, &mut codewords);

        let table = build(&lens, max_len, max_len);
        let mut rebuilt = vec![0u8; freqs.len()];
        for sym in 0..freqs.len() {
            if lens[sym] == 0 {
                continue;
            }
            let bits = codewords[sym] << (max_len - lens[sym] as u32);
            let entry = table[bits as usize];
            rebuilt[entry.value() as usize] = entry.nbits() as u8;
        }
        assert_eq!(rebuilt, lens);
    }
}
