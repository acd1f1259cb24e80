//! Decoding of the tracker header.
//!
//! The header opens with two fixed words (format word and GLIB status word),
//! followed by one status byte per chip of every present front-end, padded to
//! a whole word. Its length therefore depends on the front-end mask and chip
//! count, and payload data must be located through
//! [`TrackerHeader::byte_len`].

use tartan_bitfield::bitfield;
use thiserror::Error;
use tinyvec::ArrayVec;
use zerocopy::{FromBytes, byteorder::little_endian::U64};

use crate::{
    cursor::BitCursor,
    layout::{self, CBCS_PER_FRONTEND, CHANNELS_PER_FED, FIXED_HEADER_LEN, FRONTENDS_PER_FED},
};

/// An error decoding a tracker header.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum HeaderError {
    /// Buffer cannot hold the fixed header words.
    #[error("Buffer of {0} bytes is shorter than the fixed header.")]
    TooShort(usize),
    /// Chip count exceeds the chips a front-end can host.
    #[error("Declared {0} chips per front-end, at most 16 are possible.")]
    TooManyChips(u8),
    /// Unknown readout mode.
    #[error("Unknown readout mode ({0}).")]
    UnknownReadoutMode(u8),
    /// CBC status region extends past the end of the buffer.
    #[error("Status of {chips} chips needs {needed} header bytes, but the buffer holds {available}.")]
    StatusOverrun {
        chips: usize,
        needed: usize,
        available: usize,
    },
}

/// Encoding of the channel payloads.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadoutMode {
    /// One bit per strip.
    Unsparsified = 0,
    /// A list of clusters per chip.
    Sparsified = 1,
}

impl ReadoutMode {
    fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0 => Some(Self::Unsparsified),
            1 => Some(Self::Sparsified),
            _ => None,
        }
    }

    /// Bits taken by one sample (a strip or a cluster).
    pub const fn sample_bits(self) -> usize {
        match self {
            Self::Unsparsified => 1,
            Self::Sparsified => layout::CLUSTER_BITS,
        }
    }
}

/// Amount of diagnostic information sent by the front-ends.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DebugMode {
    Summary = 0,
    FullDebug = 1,
    CbcError = 2,
}

/// A decoded tracker header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrackerHeader {
    data_format_version: u8,
    debug_mode: u8,
    event_type: u8,
    readout_mode: ReadoutMode,
    glib_status_code: u64,
    frontend_status: u16,
    chips_per_frontend: u8,
    cbc_status: ArrayVec<[u8; CHANNELS_PER_FED]>,
}

/// Decode the tracker header at the start of a buffer.
///
/// Returns the header and its length in bytes, which is the offset of the
/// first payload byte.
pub fn decode_header(data: &[u8]) -> Result<(TrackerHeader, usize), HeaderError> {
    #[repr(C)]
    #[derive(FromBytes)]
    struct FixedWords {
        format: U64,
        glib_status: U64,
    }

    bitfield! {
        struct FormatWord(u64) {
            [0..16] frontend_status: u16,
            [47..52] chips_per_frontend: u8,
            [52..54] readout_mode: u8,
            [54..58] event_type: u8,
            [58..60] debug_mode: u8,
            [60..64] data_format_version: u8,
        }
    }

    let Some(fixed) = data.first_chunk::<FIXED_HEADER_LEN>() else {
        return Err(HeaderError::TooShort(data.len()));
    };

    let FixedWords {
        format,
        glib_status,
    } = zerocopy::transmute!(*fixed);

    let word = FormatWord(format.get());

    let chips_per_frontend = word.chips_per_frontend();
    if usize::from(chips_per_frontend) > CBCS_PER_FRONTEND {
        Err(HeaderError::TooManyChips(chips_per_frontend))?;
    }

    let readout_mode = ReadoutMode::from_bits(word.readout_mode())
        .ok_or(HeaderError::UnknownReadoutMode(word.readout_mode()))?;

    let frontend_status = word.frontend_status();
    let chips = frontend_status.count_ones() as usize * usize::from(chips_per_frontend);
    let len = FIXED_HEADER_LEN + layout::padded_to_word(chips);

    let overrun = HeaderError::StatusOverrun {
        chips,
        needed: len,
        available: data.len(),
    };

    if len > data.len() {
        Err(overrun)?;
    }

    let mut cursor = BitCursor::new(data);
    cursor.skip_bytes(FIXED_HEADER_LEN).map_err(|_| overrun)?;

    let mut cbc_status = ArrayVec::new();
    for _frontend in descending_frontends(frontend_status) {
        for _chip in (0..chips_per_frontend).rev() {
            let status = cursor
                .read_bits(layout::CBC_STATUS_BITS, layout::HEADER)
                .map_err(|_| overrun)?;
            cbc_status.push(status as u8);
        }
    }

    let header = TrackerHeader {
        data_format_version: word.data_format_version(),
        debug_mode: word.debug_mode(),
        event_type: word.event_type(),
        readout_mode,
        glib_status_code: glib_status.get(),
        frontend_status,
        chips_per_frontend,
        cbc_status,
    };

    log::debug!(
        "Decoded tracker header: version {:#x}, {:?} readout, front-ends {:#06x}, {} chips, {} bytes.",
        header.data_format_version,
        header.readout_mode,
        header.frontend_status,
        chips,
        len,
    );

    Ok((header, len))
}

/// Present front-ends, highest index first.
fn descending_frontends(mask: u16) -> impl Iterator<Item = usize> + Clone {
    (0..FRONTENDS_PER_FED)
        .rev()
        .filter(move |fe| (mask >> fe) & 1 == 1)
}

impl TrackerHeader {
    pub fn data_format_version(&self) -> u8 {
        self.data_format_version
    }

    pub fn debug_mode(&self) -> u8 {
        self.debug_mode
    }

    /// The debug mode, if it is one of the known values.
    pub fn debug(&self) -> Option<DebugMode> {
        match self.debug_mode {
            0 => Some(DebugMode::Summary),
            1 => Some(DebugMode::FullDebug),
            2 => Some(DebugMode::CbcError),
            _ => None,
        }
    }

    pub fn event_type(&self) -> u8 {
        self.event_type
    }

    pub fn readout_mode(&self) -> u8 {
        self.readout_mode as u8
    }

    pub fn readout(&self) -> ReadoutMode {
        self.readout_mode
    }

    pub fn glib_status_code(&self) -> u64 {
        self.glib_status_code
    }

    /// Front-end presence flags; bit `i` is set when front-end `i` sent data.
    pub fn frontend_status(&self) -> u16 {
        self.frontend_status
    }

    /// Whether front-end `frontend` sent data. Out-of-range indices are absent.
    pub fn frontend_present(&self, frontend: usize) -> bool {
        frontend < FRONTENDS_PER_FED && (self.frontend_status >> frontend) & 1 == 1
    }

    pub fn number_of_frontends(&self) -> usize {
        self.frontend_status.count_ones() as usize
    }

    /// Present front-ends in canonical (descending) order.
    pub fn frontends(&self) -> impl Iterator<Item = usize> + Clone {
        descending_frontends(self.frontend_status)
    }

    pub fn chips_per_frontend(&self) -> usize {
        usize::from(self.chips_per_frontend)
    }

    /// Number of chips that reported a status byte.
    pub fn number_of_cbc(&self) -> usize {
        self.cbc_status.len()
    }

    /// Chip status bytes, ordered by descending front-end and then
    /// descending chip.
    pub fn cbc_status(&self) -> &[u8] {
        &self.cbc_status
    }

    /// Status byte of one chip, if its front-end is present and it is within
    /// the declared chip count.
    pub fn cbc_status_of(&self, frontend: usize, chip: usize) -> Option<u8> {
        let chips = self.chips_per_frontend();
        if !self.frontend_present(frontend) || chip >= chips {
            return None;
        }

        let preceding = self.frontends().take_while(|fe| *fe > frontend).count();
        self.cbc_status
            .get(preceding * chips + (chips - 1 - chip))
            .copied()
    }

    /// Length of the header in bytes, including status padding.
    pub fn byte_len(&self) -> usize {
        FIXED_HEADER_LEN + layout::padded_to_word(self.cbc_status.len())
    }
}
