#![no_std]

//! A decoder for CMS Phase-2 tracker Front-End Driver (FED) raw data buffers.
//!
//! A FED buffer opens with a tracker header (format fields, a front-end
//! presence mask and one status byte per readout chip), followed by the
//! payload of up to 256 channels, one per (front-end, CBC chip) pair.
//!
//! Most users should begin with [`FedBuffer`], which decodes the header,
//! locates channel payloads on request, and hands out [`channel::Channel`]
//! views that unpack into strips or clusters. The lower layers ([`cursor`],
//! [`header`], [`channel`], [`unpack`]) are public for applications needing
//! finer control. Decoding borrows the buffer and never allocates.
//!
//! ```
//! let buffer = phase2_fed::FedBuffer::new(&data)?;
//! for channel in buffer.channels()?.filter(|c| !c.is_empty()) {
//!     if let either::Left(strips) = channel.unpack() {
//!         let hits = strips.filter(|on| *on).count();
//!     }
//! }
//! ```
//!
//! ## Cargo Features
//!
//! The following crate feature flags are available:
//!
//! - `std`: enable the owning [`collection::FedRawDataCollection`] (default).

pub mod buffer;
pub mod channel;
pub mod collection;
pub mod cursor;
pub mod daq;
pub mod dump;
pub mod header;
pub mod layout;
pub mod unpack;

pub use buffer::{Error, FedBuffer};
