//! Location of channel payloads within a buffer.
//!
//! Every (front-end, chip) pair owns one channel, indexed by
//! [`layout::channel_index`]. The table always spans the full grid; channels
//! of absent front-ends, and of chips beyond the declared chip count, are
//! empty.

use either::Either::{self, Left, Right};
use thiserror::Error;

use crate::{
    cursor::{BitCursor, OutOfRange},
    header::{ReadoutMode, TrackerHeader},
    layout::{self, CHANNELS_PER_FED, FRONTENDS_PER_FED, STRIPS_PER_CBC},
    unpack::{ClusterChannelUnpacker, RawChannelUnpacker},
};

/// An error locating channel payloads.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum ChannelTableError {
    /// The cluster-count table ends before the count of a listed channel.
    #[error("Cluster-count table ends before channel {channel}.")]
    TruncatedCountTable { channel: usize },
    /// Cumulative channel lengths exceed the buffer.
    #[error("Channel {channel} needs {needed} payload bits, but only {available} remain.")]
    PayloadOverrun {
        channel: usize,
        needed: usize,
        available: usize,
    },
}

/// Position and length of one channel payload.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChannelDescriptor {
    /// First payload bit, counted from the start of the buffer.
    pub offset: usize,
    /// Number of samples: strips when unsparsified, clusters when sparsified.
    pub length: u16,
}

/// Descriptors for every channel of a FED, by channel index.
pub type ChannelTable = [ChannelDescriptor; CHANNELS_PER_FED];

/// Locate every channel payload described by a header.
///
/// No partial table is produced: a single inconsistent length fails the whole
/// buffer.
pub fn channel_descriptors(
    data: &[u8],
    header: &TrackerHeader,
) -> Result<ChannelTable, ChannelTableError> {
    let mut table = [ChannelDescriptor::default(); CHANNELS_PER_FED];
    let mut cursor = BitCursor::new(data);

    let mode = header.readout();
    let listed = listed_channels(header);

    cursor
        .skip_bytes(header.byte_len())
        .map_err(|e| ChannelTableError::PayloadOverrun {
            channel: 0,
            needed: e.requested,
            available: e.remaining,
        })?;

    match mode {
        ReadoutMode::Unsparsified => {
            for channel in listed.clone() {
                table[channel].length = STRIPS_PER_CBC as u16;
            }
        }
        ReadoutMode::Sparsified => {
            let mut last = 0;
            for channel in listed.clone() {
                let count = cursor
                    .read_bits(layout::CLUSTER_COUNT_BITS, layout::HEADER)
                    .map_err(|_| ChannelTableError::TruncatedCountTable { channel })?;
                table[channel].length = count as u16;
                last = channel;
            }

            // The table is padded to a whole word.
            cursor
                .align_to(8 * layout::WORD_LEN)
                .map_err(|_| ChannelTableError::TruncatedCountTable { channel: last })?;
        }
    }

    let start = cursor.position();

    for channel in listed {
        let descriptor = &mut table[channel];
        let needed = usize::from(descriptor.length) * mode.sample_bits();

        descriptor.offset = cursor.position();
        cursor
            .skip_bits(needed)
            .map_err(|e| ChannelTableError::PayloadOverrun {
                channel,
                needed,
                available: e.remaining,
            })?;
    }

    log::trace!(
        "Located {} channels in {} payload bits.",
        listed_channels(header).count(),
        cursor.position() - start,
    );

    Ok(table)
}

/// Channels expected in the payload, in payload order.
fn listed_channels(header: &TrackerHeader) -> impl Iterator<Item = usize> + Clone + use<> {
    let chips = header.chips_per_frontend();
    let mask = header.frontend_status();

    (0..FRONTENDS_PER_FED)
        .filter(move |fe| (mask >> fe) & 1 == 1)
        .flat_map(move |fe| (0..chips).map(move |chip| layout::channel_index(fe, chip)))
}

/// One channel payload within a buffer.
#[derive(Clone, Copy, Debug)]
pub struct Channel<'a> {
    cursor: BitCursor<'a>,
    descriptor: ChannelDescriptor,
    mode: ReadoutMode,
}

impl<'a> Channel<'a> {
    /// Bind a descriptor to its buffer, failing if the payload it describes
    /// does not fit.
    pub(crate) fn new(
        data: &'a [u8],
        descriptor: ChannelDescriptor,
        mode: ReadoutMode,
    ) -> Result<Self, OutOfRange> {
        let len = usize::from(descriptor.length) * mode.sample_bits();

        Ok(Self {
            cursor: BitCursor::window(data, descriptor.offset, len)?,
            descriptor,
            mode,
        })
    }

    /// A zero-length channel, used to fill a table before binding it.
    pub(crate) fn empty(mode: ReadoutMode) -> Self {
        Self {
            cursor: BitCursor::new(&[]),
            descriptor: ChannelDescriptor::default(),
            mode,
        }
    }

    pub fn descriptor(&self) -> ChannelDescriptor {
        self.descriptor
    }

    /// Number of samples in the channel.
    pub fn length(&self) -> usize {
        usize::from(self.descriptor.length)
    }

    pub fn is_empty(&self) -> bool {
        self.descriptor.length == 0
    }

    pub fn readout(&self) -> ReadoutMode {
        self.mode
    }

    /// Number of payload bits in the channel.
    pub fn bit_len(&self) -> usize {
        self.length() * self.mode.sample_bits()
    }

    /// Cursor over exactly the bits of this channel.
    pub(crate) fn cursor(&self) -> BitCursor<'a> {
        self.cursor
    }

    /// Begin unpacking the channel with the unpacker matching its readout
    /// mode.
    pub fn unpack(&self) -> Either<RawChannelUnpacker<'a>, ClusterChannelUnpacker<'a>> {
        match self.mode {
            ReadoutMode::Unsparsified => Left(RawChannelUnpacker::start(self.cursor)),
            ReadoutMode::Sparsified => Right(ClusterChannelUnpacker::start(self.cursor)),
        }
    }
}
