//! Human-readable listing of a decoded buffer.

use core::fmt;

use crate::{
    buffer::FedBuffer,
    layout::{CBCS_PER_FRONTEND, FRONTENDS_PER_FED, channel_index},
    unpack::strip_map,
};

const RULE: &str = " -------------------------------------------- ";

/// Listing of a buffer's header fields and non-empty channels.
///
/// Header fields are printed in hexadecimal. Each non-empty channel, in
/// front-end then chip order, gets a heading line and a line with one `1`
/// (on) or `_` (off) per strip of its chip.
pub struct Dump<'b, 'a> {
    fed_id: u16,
    buffer: &'b FedBuffer<'a>,
}

impl<'b, 'a> Dump<'b, 'a> {
    pub fn new(fed_id: u16, buffer: &'b FedBuffer<'a>) -> Self {
        Self { fed_id, buffer }
    }
}

impl fmt::Display for Dump<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let header = self.buffer.tracker_header();

        writeln!(f, "{RULE}")?;
        writeln!(f, " buffer size : {}", self.buffer.buffer_size())?;
        writeln!(f, " fed id      : {}", self.fed_id)?;
        writeln!(f, "{RULE}")?;
        writeln!(f, " Version  : {:02x}", header.data_format_version())?;
        writeln!(f, " Mode     : {:02x}", header.debug_mode())?;
        writeln!(f, " Type     : {:02x}", header.event_type())?;
        writeln!(f, " Readout  : {:02x}", header.readout_mode())?;
        writeln!(f, " Status   : {:016x}", header.glib_status_code())?;
        writeln!(f, " FE stat  : {:016b}", header.frontend_status())?;
        writeln!(f, " Nr CBC   : {:x}", header.number_of_cbc())?;

        write!(f, " CBC stat :")?;
        for status in header.cbc_status() {
            write!(f, " {status:02x}")?;
        }
        writeln!(f)?;
        writeln!(f, "{RULE}")?;

        if let Err(err) = self.buffer.channel_table() {
            return writeln!(f, " {err}");
        }

        for frontend in 0..FRONTENDS_PER_FED {
            for chip in 0..CBCS_PER_FRONTEND {
                let Ok(channel) = self.buffer.channel(channel_index(frontend, chip)) else {
                    continue;
                };
                if channel.is_empty() {
                    continue;
                }

                writeln!(
                    f,
                    " reading channel : {chip} on FE {frontend} with length : {}",
                    channel.length()
                )?;
                for on in strip_map(&channel) {
                    f.write_str(if on { "1" } else { "_" })?;
                }
                writeln!(f)?;
            }
        }

        Ok(())
    }
}
