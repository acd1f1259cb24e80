//! Decoding every tracker buffer of an event.
//!
//! The central DAQ delivers one buffer per FED id. Only ids within the
//! configured tracker range are decoded; a failure to decode one buffer is
//! logged and reported for that buffer alone.

use core::ops::RangeInclusive;

use crate::buffer::{Error, FedBuffer};

/// Number of FED ids known to the central DAQ.
pub const CMS_FED_ID_MAX: usize = 1024;
/// Lowest FED id assigned to the tracker.
pub const FED_ID_MIN: u16 = 50;
/// Highest FED id assigned to the tracker.
pub const FED_ID_MAX: u16 = 489;

/// Options for decoding a batch of buffers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// FED ids to decode; others are skipped.
    pub fed_ids: RangeInclusive<u16>,
    /// Whether buffers carry CMS common DAQ framing.
    pub daq_framing: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fed_ids: FED_ID_MIN..=FED_ID_MAX,
            daq_framing: false,
        }
    }
}

/// Decode a batch of `(fed_id, buffer)` pairs.
///
/// Empty buffers and ids outside the configured range are skipped. Every
/// other buffer yields its own result, in input order.
pub fn decode_all<'a, I>(
    config: &Config,
    buffers: I,
) -> impl Iterator<Item = (u16, Result<FedBuffer<'a>, Error>)> + use<'a, I>
where
    I: IntoIterator<Item = (u16, &'a [u8])>,
{
    let fed_ids = config.fed_ids.clone();
    let daq_framing = config.daq_framing;

    buffers
        .into_iter()
        .filter(move |(id, data)| {
            let wanted = !data.is_empty() && fed_ids.contains(id);
            if !wanted && !data.is_empty() {
                log::trace!("Skipping FED {id} outside the tracker range.");
            }
            wanted
        })
        .map(move |(id, data)| {
            let buffer = if daq_framing {
                FedBuffer::from_fragment(data)
            } else {
                FedBuffer::new(data)
            };

            if let Err(err) = &buffer {
                log::warn!("Failed to decode FED {id} ({} bytes): {err}", data.len());
            }

            (id, buffer)
        })
}

#[cfg(feature = "std")]
pub use owned::{FedRawDataCollection, UnknownFedId};

#[cfg(feature = "std")]
mod owned {
    //! _Requires Cargo feature `std`._

    use std::vec::Vec;

    use thiserror::Error;

    use super::{CMS_FED_ID_MAX, Config, decode_all};
    use crate::buffer::{Error, FedBuffer};

    extern crate std;

    /// A FED id outside the ids known to the central DAQ.
    #[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
    #[error("FED id {0} is outside the collection.")]
    pub struct UnknownFedId(pub u16);

    /// Buffers of one event, indexed by FED id.
    ///
    /// _Requires Cargo feature `std`._
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub struct FedRawDataCollection {
        data: Vec<Vec<u8>>,
    }

    impl Default for FedRawDataCollection {
        fn default() -> Self {
            Self {
                data: std::vec![Vec::new(); CMS_FED_ID_MAX],
            }
        }
    }

    impl FedRawDataCollection {
        pub fn new() -> Self {
            Self::default()
        }

        /// The buffer of a FED, empty if none was stored or the id is unknown.
        pub fn fed_data(&self, id: u16) -> &[u8] {
            self.data
                .get(usize::from(id))
                .map(Vec::as_slice)
                .unwrap_or_default()
        }

        /// Store the buffer of a FED, returning the one it replaces.
        pub fn insert(&mut self, id: u16, data: Vec<u8>) -> Result<Vec<u8>, UnknownFedId> {
            let slot = self
                .data
                .get_mut(usize::from(id))
                .ok_or(UnknownFedId(id))?;
            Ok(std::mem::replace(slot, data))
        }

        /// Non-empty buffers with their FED ids, in id order.
        pub fn iter(&self) -> impl Iterator<Item = (u16, &[u8])> {
            self.data
                .iter()
                .enumerate()
                .filter(|(_, d)| !d.is_empty())
                .map(|(id, d)| (id as u16, d.as_slice()))
        }

        /// Decode every buffer selected by `config`.
        pub fn decode<'a>(
            &'a self,
            config: &Config,
        ) -> impl Iterator<Item = (u16, Result<FedBuffer<'a>, Error>)> + use<'a> {
            decode_all(config, self.iter())
        }
    }
}
