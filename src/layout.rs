//! Fixed layout of a Phase-2 tracker FED buffer.
//!
//! The packing conventions below follow the readout hardware wiring. They are
//! validated against reference buffers (see `fixtures/`), not derived.

use crate::cursor::{BitOrder, Packing, WordOrder};

/// Front-ends served by one FED.
pub const FRONTENDS_PER_FED: usize = 16;
/// CBC chips hosted by one front-end.
pub const CBCS_PER_FRONTEND: usize = 16;
/// Channels per FED, one per (front-end, chip) pair.
pub const CHANNELS_PER_FED: usize = FRONTENDS_PER_FED * CBCS_PER_FRONTEND;
/// Strips read out by one CBC chip.
pub const STRIPS_PER_CBC: usize = 254;

/// Bytes in one buffer word.
pub const WORD_LEN: usize = 8;
/// Bytes in the fixed part of the tracker header (two words).
pub const FIXED_HEADER_LEN: usize = 2 * WORD_LEN;

/// Header words, CBC status bytes and cluster counts.
pub const HEADER: Packing = Packing {
    words: WordOrder::LittleEndian64,
    bits: BitOrder::Msb0,
};

/// Strip bits and cluster records.
pub const PAYLOAD: Packing = Packing {
    words: WordOrder::Bytes,
    bits: BitOrder::Lsb0,
};

/// Width of one CBC status entry.
pub const CBC_STATUS_BITS: u32 = 8;
/// Width of one entry of the sparsified cluster-count table.
pub const CLUSTER_COUNT_BITS: u32 = 16;
/// Width of the first-strip field of a cluster record.
pub const CLUSTER_STRIP_BITS: u32 = 8;
/// Width of the `width - 1` field of a cluster record.
pub const CLUSTER_WIDTH_BITS: u32 = 3;
/// Width of one cluster record.
pub const CLUSTER_BITS: usize = (CLUSTER_STRIP_BITS + CLUSTER_WIDTH_BITS) as usize;

/// Round a byte length up to a whole number of words.
pub const fn padded_to_word(len: usize) -> usize {
    len.div_ceil(WORD_LEN) * WORD_LEN
}

/// Index of the channel read by `chip` on `frontend`.
pub const fn channel_index(frontend: usize, chip: usize) -> usize {
    frontend * CBCS_PER_FRONTEND + chip
}
