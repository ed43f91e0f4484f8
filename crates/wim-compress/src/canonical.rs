//! Canonical prefix-code construction (encoder side).
//!
//! Builds a length-limited canonical Huffman code from symbol frequencies.
//! The resulting code is canonical: among codewords, a longer one never
//! lexicographically precedes a shorter one, and same-length codewords are
//! ordered by symbol value. Only the codeword lengths therefore need to be
//! transmitted; the decoder rebuilds the identical codewords.

/// Largest alphabet any WIM codec uses (LZX main code).
pub const MAX_ALPHABET_SIZE: usize = 1024;

/// Longest codeword length any WIM codec accepts.
pub const MAX_CODEWORD_LEN: usize = 23;

/// Build a canonical prefix code for the given symbol frequencies.
///
/// `lens[sym]` receives the codeword length for each symbol (0 for symbols
/// with zero frequency, which get no codeword), and `codewords[sym]` the
/// right-justified codeword bits. All lengths are at most
/// `max_codeword_len`.
///
/// The length-limiting policy is deliberately simple: when the Huffman tree
/// would produce a codeword deeper than the limit, the leaf is reassigned to
/// the deepest length that still has space. This is suboptimal in general
/// but adequate for the small alphabets the WIM codecs use.
pub fn make_canonical_code(
    freqs: &[u32],
    max_codeword_len: usize,
    lens: &mut [u8],
    codewords: &mut [u32],
) {
    let num_syms = freqs.len();
    assert!((2..=MAX_ALPHABET_SIZE).contains(&num_syms));
    assert!((1..=MAX_CODEWORD_LEN).contains(&max_codeword_len));
    assert!(num_syms as u64 <= 1u64 << max_codeword_len, "alphabet cannot fit the length limit");
    assert_eq!(lens.len(), num_syms);
    assert_eq!(codewords.len(), num_syms);

    // Sort the used symbols primarily by frequency, secondarily by symbol
    // value. Unused symbols get length 0 up front.
    let mut sorted: Vec<(u32, u16)> = Vec::with_capacity(num_syms);
    for (sym, &freq) in freqs.iter().enumerate() {
        if freq == 0 {
            lens[sym] = 0;
        } else {
            sorted.push((freq, sym as u16));
        }
    }
    sorted.sort_unstable();

    match sorted.len() {
        0 => {
            codewords.fill(0);
            return;
        }
        1 => {
            // A one-symbol code would have a zero-length codeword; emit a
            // two-codeword code instead so the output stays canonical.
            let sym = sorted[0].1 as usize;
            let other = if sym == 0 { 1 } else { 0 };
            let (lo, hi) = if sym < other { (sym, other) } else { (other, sym) };
            lens[lo] = 1;
            codewords[lo] = 0;
            lens[hi] = 1;
            codewords[hi] = 1;
            return;
        }
        _ => {}
    }

    let n = sorted.len();

    // Build a stripped-down Huffman tree: only the internal nodes, each
    // recording the slot of its parent. Candidates are drawn from two
    // monotonically nondecreasing streams (unmerged leaves and
    // already-built internal nodes); on equal weight the leaf is taken
    // first, which matches the tie-break adaptive LZMS expects.
    let mut weights: Vec<u64> = Vec::with_capacity(n - 1);
    let mut nodes: Vec<u32> = vec![0; n - 1];
    let mut i = 0usize; // next unmerged leaf
    let mut b = 0usize; // next unmerged internal node
    for e in 0..n - 1 {
        let mut weight = 0u64;
        for _ in 0..2 {
            if i < n && (b == weights.len() || u64::from(sorted[i].0) <= weights[b]) {
                weight += u64::from(sorted[i].0);
                i += 1;
            } else {
                weight += weights[b];
                nodes[b] = e as u32;
                b += 1;
            }
        }
        weights.push(weight);
    }

    // Walk the internal nodes from the root down (reverse creation order),
    // overwriting each node's parent slot with its depth. Start from the
    // assumption that the root's two children are leaves (two codewords of
    // length 1); every internal node encountered trades one leaf at its
    // depth for two at the next.
    let root = n - 2;
    let mut len_counts = [0u32; MAX_CODEWORD_LEN + 2];
    len_counts[1] = 2;
    nodes[root] = 0;
    for node in (0..root).rev() {
        let parent = nodes[node] as usize;
        let true_depth = nodes[parent] + 1;
        nodes[node] = true_depth;

        let mut depth = true_depth as usize;
        if depth >= max_codeword_len {
            depth = max_codeword_len;
            loop {
                depth -= 1;
                if len_counts[depth] != 0 {
                    break;
                }
            }
        }
        len_counts[depth] -= 1;
        len_counts[depth + 1] += 2;
    }

    // Hand out lengths in decreasing order: the longest codewords go to the
    // lowest-frequency symbols.
    let mut idx = 0usize;
    for len in (1..=max_codeword_len).rev() {
        for _ in 0..len_counts[len] {
            lens[sorted[idx].1 as usize] = len as u8;
            idx += 1;
        }
    }

    // Generate the codewords: seed each length with its lexicographically
    // first codeword, then assign in symbol order.
    let mut next_codewords = [0u32; MAX_CODEWORD_LEN + 1];
    for len in 2..=max_codeword_len {
        next_codewords[len] = (next_codewords[len - 1] + len_counts[len - 1]) << 1;
    }
    for sym in 0..num_syms {
        let len = lens[sym] as usize;
        if len == 0 {
            codewords[sym] = 0;
        } else {
            codewords[sym] = next_codewords[len];
            next_codewords[len] += 1;
        }
    }
}
