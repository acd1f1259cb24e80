//! Single-pass unpackers over one channel payload.
//!
//! An unpacker is either ready, holding a decoded sample, or exhausted. It
//! starts ready unless the channel is empty, and becomes exhausted once its
//! position reaches the declared channel length. Nothing returns an exhausted
//! unpacker to the ready state; to read a channel again, build a new one.
//!
//! Both unpackers are also iterators, which is the more convenient interface
//! when the position within the channel is not needed.

use core::ops::Range;

use either::Either::{Left, Right};

use crate::{
    channel::Channel,
    cursor::BitCursor,
    header::ReadoutMode,
    layout::{self, STRIPS_PER_CBC},
};

/// Unpacker yielding the on/off state of each strip of an unsparsified
/// channel.
#[derive(Clone, Debug)]
pub struct RawChannelUnpacker<'a> {
    cursor: BitCursor<'a>,
    strip: usize,
    current: Option<bool>,
}

impl<'a> RawChannelUnpacker<'a> {
    /// Begin unpacking an unsparsified channel. Returns `None` for a
    /// sparsified channel, whose payload holds clusters rather than strips.
    pub fn new(channel: &Channel<'a>) -> Option<Self> {
        (channel.readout() == ReadoutMode::Unsparsified).then(|| Self::start(channel.cursor()))
    }

    pub(crate) fn start(mut cursor: BitCursor<'a>) -> Self {
        let current = Self::take(&mut cursor);

        Self {
            cursor,
            strip: 0,
            current,
        }
    }

    fn take(cursor: &mut BitCursor<'_>) -> Option<bool> {
        cursor.read_bits(1, layout::PAYLOAD).ok().map(|b| b != 0)
    }

    /// Whether a strip is available.
    pub fn has_data(&self) -> bool {
        self.current.is_some()
    }

    /// Move to the next strip. Does nothing once exhausted.
    pub fn advance(&mut self) {
        if self.current.is_some() {
            self.current = Self::take(&mut self.cursor);
            self.strip += 1;
        }
    }

    /// Whether the current strip is on.
    ///
    /// Must only be called while [`has_data`](Self::has_data) holds; an
    /// exhausted unpacker reports every strip off.
    pub fn strip_on(&self) -> bool {
        debug_assert!(self.has_data(), "strip_on called on an exhausted unpacker");
        self.current == Some(true)
    }

    /// Index of the current strip within the chip.
    pub fn strip(&self) -> usize {
        self.strip
    }
}

impl Iterator for RawChannelUnpacker<'_> {
    type Item = bool;

    fn next(&mut self) -> Option<bool> {
        let on = self.current?;
        self.advance();
        Some(on)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.cursor.remaining_bits() + usize::from(self.current.is_some());
        (n, Some(n))
    }
}

impl ExactSizeIterator for RawChannelUnpacker<'_> {}

/// A run of adjacent strips that are on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cluster {
    /// First strip of the run.
    pub first_strip: u8,
    /// Number of strips in the run, from 1 to 8.
    pub width: u8,
}

impl Cluster {
    /// Strips covered by the cluster, clipped to the strips of a chip.
    pub fn strips(&self) -> Range<usize> {
        let start = usize::from(self.first_strip).min(STRIPS_PER_CBC);
        let end = (start + usize::from(self.width)).min(STRIPS_PER_CBC);
        start..end
    }
}

/// Unpacker yielding the clusters of a sparsified channel.
#[derive(Clone, Debug)]
pub struct ClusterChannelUnpacker<'a> {
    cursor: BitCursor<'a>,
    current: Option<Cluster>,
}

impl<'a> ClusterChannelUnpacker<'a> {
    /// Begin unpacking a sparsified channel. Returns `None` for an
    /// unsparsified channel.
    pub fn new(channel: &Channel<'a>) -> Option<Self> {
        (channel.readout() == ReadoutMode::Sparsified).then(|| Self::start(channel.cursor()))
    }

    pub(crate) fn start(mut cursor: BitCursor<'a>) -> Self {
        let current = Self::take(&mut cursor);

        Self { cursor, current }
    }

    fn take(cursor: &mut BitCursor<'_>) -> Option<Cluster> {
        let first_strip = cursor
            .read_bits(layout::CLUSTER_STRIP_BITS, layout::PAYLOAD)
            .ok()?;
        let width = cursor
            .read_bits(layout::CLUSTER_WIDTH_BITS, layout::PAYLOAD)
            .ok()?;

        Some(Cluster {
            first_strip: first_strip as u8,
            width: width as u8 + 1,
        })
    }

    /// Whether a cluster is available.
    pub fn has_data(&self) -> bool {
        self.current.is_some()
    }

    /// Move to the next cluster. Does nothing once exhausted.
    pub fn advance(&mut self) {
        if self.current.is_some() {
            self.current = Self::take(&mut self.cursor);
        }
    }

    /// The current cluster, or `None` once exhausted.
    pub fn cluster(&self) -> Option<Cluster> {
        self.current
    }
}

impl Iterator for ClusterChannelUnpacker<'_> {
    type Item = Cluster;

    fn next(&mut self) -> Option<Cluster> {
        let cluster = self.current?;
        self.advance();
        Some(cluster)
    }
}

/// Expand a channel into an on/off map of the strips of its chip.
///
/// Unsparsified strips are copied; sparsified clusters switch on the strips
/// they cover.
pub fn strip_map(channel: &Channel) -> [bool; STRIPS_PER_CBC] {
    let mut map = [false; STRIPS_PER_CBC];

    match channel.unpack() {
        Left(strips) => {
            for (slot, on) in map.iter_mut().zip(strips) {
                *slot = on;
            }
        }
        Right(clusters) => {
            for cluster in clusters {
                map[cluster.strips()].fill(true);
            }
        }
    }

    map
}
