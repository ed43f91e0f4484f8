//! Recent-offset LRU queues.
//!
//! LZMS lets a match reuse one of the most recent offsets instead of
//! coding the offset explicitly. Queue updates lag one decode step behind:
//! the offset produced by a step is staged in `upcoming`, moves to `prev`
//! at the end of that step, and only enters the queue proper at the end of
//! the step after. Both directions of the codec keep a queue per worker,
//! so the types here are plain values with no shared state.

/// Number of reusable LZ match offsets.
pub const NUM_LZ_REPS: usize = 3;

/// Number of reusable delta-match pairs.
pub const NUM_DELTA_REPS: usize = 3;

/// Queue of recent LZ match offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LzLruQueue {
    pub recent: [u32; NUM_LZ_REPS + 1],
    prev: u32,
    upcoming: u32,
}

impl Default for LzLruQueue {
    fn default() -> Self {
        let mut recent = [0u32; NUM_LZ_REPS + 1];
        for (i, slot) in recent.iter_mut().enumerate() {
            *slot = i as u32 + 1;
        }
        Self {
            recent,
            prev: 0,
            upcoming: 0,
        }
    }
}

impl LzLruQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage the offset produced by the current step.
    pub fn report_offset(&mut self, offset: u32) {
        self.upcoming = offset;
    }

    /// End-of-step update: the offset staged two steps ago enters the
    /// queue front, everything else shifts down one, the oldest drops off.
    pub fn advance(&mut self) {
        if self.prev != 0 {
            for i in (1..self.recent.len()).rev() {
                self.recent[i] = self.recent[i - 1];
            }
            self.recent[0] = self.prev;
        }
        self.prev = self.upcoming;
        self.upcoming = 0;
    }
}

/// An (offset, power) pair for delta matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeltaPair {
    pub offset: u32,
    pub power: u32,
}

impl DeltaPair {
    pub fn new(offset: u32, power: u32) -> Self {
        Self { offset, power }
    }

    fn is_zero(&self) -> bool {
        self.offset == 0 && self.power == 0
    }
}

/// Queue of recent delta-match (offset, power) pairs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeltaLruQueue {
    pub recent: [DeltaPair; NUM_DELTA_REPS + 1],
    prev: DeltaPair,
    upcoming: DeltaPair,
}

impl Default for DeltaLruQueue {
    fn default() -> Self {
        let mut recent = [DeltaPair::default(); NUM_DELTA_REPS + 1];
        for (i, slot) in recent.iter_mut().enumerate() {
            slot.offset = i as u32 + 1;
        }
        Self {
            recent,
            prev: DeltaPair::default(),
            upcoming: DeltaPair::default(),
        }
    }
}

impl DeltaLruQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report_pair(&mut self, pair: DeltaPair) {
        self.upcoming = pair;
    }

    pub fn advance(&mut self) {
        if !self.prev.is_zero() {
            for i in (1..self.recent.len()).rev() {
                self.recent[i] = self.recent[i - 1];
            }
            self.recent[0] = self.prev;
        }
        self.prev = self.upcoming;
        self.upcoming = DeltaPair::default();
    }
}
