//! CMS common DAQ framing around a tracker fragment.
//!
//! Fragments read from the central DAQ carry one header word before and one
//! trailer word after the tracker data. Both are 64-bit little-endian words.

use tartan_bitfield::bitfield;
use thiserror::Error;

use crate::layout::WORD_LEN;

const BEGIN_OF_EVENT: u8 = 0x5;
const END_OF_EVENT: u8 = 0xA;

/// An error removing DAQ framing from a fragment.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum FragmentError {
    /// Fragment cannot hold a header and a trailer word.
    #[error("Fragment of {0} bytes cannot hold a DAQ header and trailer.")]
    TooShort(usize),
    /// Incorrect begin-of-event marker.
    #[error("Incorrect DAQ header marker ({0:#x}).")]
    HeaderMarker(u8),
    /// Incorrect end-of-event marker.
    #[error("Incorrect DAQ trailer marker ({0:#x}).")]
    TrailerMarker(u8),
    /// Trailer length disagrees with the fragment size.
    #[error("Trailer declares {declared} bytes, but the fragment holds {found}.")]
    LengthMismatch { declared: usize, found: usize },
}

/// The CMS common FED header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DaqHeader {
    pub event_type: u8,
    pub lv1_id: u32,
    pub bunch_crossing: u16,
    pub source_id: u16,
    pub version: u8,
    /// Further header words follow.
    pub more_headers: bool,
}

/// The CMS common FED trailer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DaqTrailer {
    /// Fragment length in words, including header and trailer.
    pub length: u32,
    pub crc: u16,
    pub event_status: u8,
    pub tts: u8,
    /// Further trailer words precede this one.
    pub more_trailers: bool,
}

bitfield! {
    struct HeaderWord(u64) {
        [3] more_headers,
        [4..8] version: u8,
        [8..20] source_id: u16,
        [20..32] bunch_crossing: u16,
        [32..56] lv1_id: u32,
        [56..60] event_type: u8,
        [60..64] marker: u8,
    }
}

bitfield! {
    struct TrailerWord(u64) {
        [3] more_trailers,
        [4..8] tts: u8,
        [8..12] event_status: u8,
        [16..32] crc: u16,
        [32..56] length: u32,
        [60..64] marker: u8,
    }
}

/// Split a fragment into its DAQ header, the tracker data, and its DAQ
/// trailer.
pub fn split_fragment(data: &[u8]) -> Result<(DaqHeader, &[u8], DaqTrailer), FragmentError> {
    let too_short = FragmentError::TooShort(data.len());
    let (first, rest) = data.split_first_chunk::<WORD_LEN>().ok_or(too_short)?;
    let (inner, last) = rest.split_last_chunk::<WORD_LEN>().ok_or(too_short)?;

    let word = HeaderWord(u64::from_le_bytes(*first));
    if word.marker() != BEGIN_OF_EVENT {
        Err(FragmentError::HeaderMarker(word.marker()))?;
    }

    let header = DaqHeader {
        event_type: word.event_type(),
        lv1_id: word.lv1_id(),
        bunch_crossing: word.bunch_crossing(),
        source_id: word.source_id(),
        version: word.version(),
        more_headers: word.more_headers(),
    };

    let word = TrailerWord(u64::from_le_bytes(*last));
    if word.marker() != END_OF_EVENT {
        Err(FragmentError::TrailerMarker(word.marker()))?;
    }

    let trailer = DaqTrailer {
        length: word.length(),
        crc: word.crc(),
        event_status: word.event_status(),
        tts: word.tts(),
        more_trailers: word.more_trailers(),
    };

    let declared = trailer.length as usize * WORD_LEN;
    if declared != data.len() {
        Err(FragmentError::LengthMismatch {
            declared,
            found: data.len(),
        })?;
    }

    Ok((header, inner, trailer))
}
