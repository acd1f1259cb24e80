//! A decoded FED buffer.

use core::cell::OnceCell;

use thiserror::Error;

use crate::{
    channel::{Channel, ChannelTable, ChannelTableError, channel_descriptors},
    cursor::OutOfRange,
    daq::{DaqHeader, DaqTrailer, FragmentError, split_fragment},
    header::{HeaderError, TrackerHeader, decode_header},
    layout::CHANNELS_PER_FED,
};

/// Errors occurring while decoding a buffer.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// A read passed the end of the buffer. Also the conversion target for
    /// callers reading fields with their own [`BitCursor`](crate::cursor::BitCursor).
    #[error("Read out of range: {0}")]
    OutOfRange(#[from] OutOfRange),
    /// Header sizes are inconsistent with the buffer.
    #[error("Malformed tracker header: {0}")]
    MalformedHeader(#[from] HeaderError),
    /// Channel lengths are inconsistent with the buffer.
    #[error("Malformed channel table: {0}")]
    MalformedChannelTable(#[from] ChannelTableError),
    /// Requested channel is outside the front-end and chip grid.
    #[error("Channel index {0} is outside the 16 x 16 front-end and chip grid.")]
    Index(usize),
    /// DAQ framing is malformed.
    #[error("Malformed DAQ fragment: {0}")]
    MalformedFragment(#[from] FragmentError),
}

/// A view of one FED buffer.
///
/// The header is decoded on construction. Channel boundaries are located on
/// the first channel request and kept for later requests, including a
/// failure to locate them.
#[derive(Debug)]
pub struct FedBuffer<'a> {
    data: &'a [u8],
    size: usize,
    header: TrackerHeader,
    header_len: usize,
    framing: Option<(DaqHeader, DaqTrailer)>,
    channels: OnceCell<Result<ChannelTable, ChannelTableError>>,
}

impl<'a> FedBuffer<'a> {
    /// Decode a buffer holding tracker data only.
    pub fn new(data: &'a [u8]) -> Result<Self, Error> {
        let (header, header_len) = decode_header(data)?;

        Ok(Self {
            data,
            size: data.len(),
            header,
            header_len,
            framing: None,
            channels: OnceCell::new(),
        })
    }

    /// Decode a buffer wrapped in CMS common DAQ framing.
    pub fn from_fragment(data: &'a [u8]) -> Result<Self, Error> {
        let (daq_header, inner, daq_trailer) = split_fragment(data)?;

        Ok(Self {
            size: data.len(),
            framing: Some((daq_header, daq_trailer)),
            ..Self::new(inner)?
        })
    }

    /// Size of the buffer as supplied, framing included.
    pub fn buffer_size(&self) -> usize {
        self.size
    }

    pub fn tracker_header(&self) -> &TrackerHeader {
        &self.header
    }

    /// Length of the tracker header in bytes.
    pub fn header_len(&self) -> usize {
        self.header_len
    }

    pub fn daq_header(&self) -> Option<&DaqHeader> {
        self.framing.as_ref().map(|(h, _)| h)
    }

    pub fn daq_trailer(&self) -> Option<&DaqTrailer> {
        self.framing.as_ref().map(|(_, t)| t)
    }

    /// Descriptors of every channel, located on first use.
    pub fn channel_table(&self) -> Result<&ChannelTable, Error> {
        self.channels
            .get_or_init(|| channel_descriptors(self.data, &self.header))
            .as_ref()
            .map_err(|e| Error::from(*e))
    }

    /// The channel at `index`, which is `frontend * 16 + chip`.
    pub fn channel(&self, index: usize) -> Result<Channel<'a>, Error> {
        if index >= CHANNELS_PER_FED {
            Err(Error::Index(index))?;
        }

        let descriptor = self.channel_table()?[index];
        Ok(Channel::new(self.data, descriptor, self.header.readout())?)
    }

    /// Every channel, in index order.
    pub fn channels(&self) -> Result<impl Iterator<Item = Channel<'a>> + use<'a>, Error> {
        let table = self.channel_table()?;
        let mode = self.header.readout();

        let mut channels = [Channel::empty(mode); CHANNELS_PER_FED];
        for (channel, descriptor) in channels.iter_mut().zip(table) {
            *channel = Channel::new(self.data, *descriptor, mode)?;
        }

        Ok(channels.into_iter())
    }
}
