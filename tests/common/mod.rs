#![allow(dead_code)]

//! Builders for tracker buffers.

/// Fields of the tracker header.
#[derive(Clone, Copy, Debug, Default)]
pub struct Header {
    pub version: u8,
    pub debug_mode: u8,
    pub event_type: u8,
    pub readout_mode: u8,
    pub chips: u8,
    pub frontends: u16,
    pub glib_status: u64,
}

impl Header {
    pub fn format_word(&self) -> u64 {
        (self.version as u64) << 60
            | (self.debug_mode as u64) << 58
            | (self.event_type as u64) << 54
            | (self.readout_mode as u64) << 52
            | (self.chips as u64) << 47
            | self.frontends as u64
    }

    /// Number of status bytes the header declares.
    pub fn status_len(&self) -> usize {
        self.frontends.count_ones() as usize * self.chips as usize
    }

    /// Encode the header with the given status bytes, in canonical order.
    pub fn encode(&self, status: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&self.format_word().to_le_bytes());
        out.extend_from_slice(&self.glib_status.to_le_bytes());
        out.extend(header_region(status));
        out
    }

    /// Encode the header with distinct status bytes (counting up from 0x80).
    pub fn encode_default(&self) -> Vec<u8> {
        let status: Vec<u8> = (0..self.status_len()).map(|i| 0x80 ^ i as u8).collect();
        self.encode(&status)
    }
}

/// Lay out bytes as a sequence of little-endian words read most significant
/// byte first, zero-padding the last word.
pub fn header_region(bytes: &[u8]) -> Vec<u8> {
    bytes
        .chunks(8)
        .flat_map(|chunk| {
            let mut word = [0; 8];
            word[..chunk.len()].copy_from_slice(chunk);
            u64::from_be_bytes(word).to_le_bytes()
        })
        .collect()
}

/// Encode a sparsified cluster-count table.
pub fn count_table(counts: &[u16]) -> Vec<u8> {
    let bytes: Vec<u8> = counts.iter().flat_map(|c| c.to_be_bytes()).collect();
    header_region(&bytes)
}

/// Bit writer for channel payloads (least significant bit first).
#[derive(Debug, Default)]
pub struct Payload {
    bytes: Vec<u8>,
    bits: usize,
}

impl Payload {
    pub fn push_bit(&mut self, on: bool) {
        if self.bits % 8 == 0 {
            self.bytes.push(0);
        }
        if on {
            *self.bytes.last_mut().unwrap() |= 1 << (self.bits % 8);
        }
        self.bits += 1;
    }

    pub fn push_bits(&mut self, value: u64, n: u32) {
        for i in 0..n {
            self.push_bit((value >> i) & 1 == 1);
        }
    }

    pub fn push_strips(&mut self, strips: &[bool]) {
        for on in strips {
            self.push_bit(*on);
        }
    }

    pub fn push_cluster(&mut self, first_strip: u8, width: u8) {
        self.push_bits(first_strip as u64, 8);
        self.push_bits(width as u64 - 1, 3);
    }

    pub fn len_bits(&self) -> usize {
        self.bits
    }

    /// The payload bytes, zero-padded to a whole word.
    pub fn into_bytes(mut self) -> Vec<u8> {
        self.bytes.resize(self.bytes.len().div_ceil(8) * 8, 0);
        self.bytes
    }
}

/// A deterministic strip pattern for a chip.
pub fn pattern(seed: usize) -> Vec<bool> {
    (0..254).map(|n| (n * 7 + seed * 3) % 11 < 2).collect()
}

/// Render strips as `1` and `_` characters.
pub fn render(strips: impl IntoIterator<Item = bool>) -> String {
    strips
        .into_iter()
        .map(|on| if on { '1' } else { '_' })
        .collect()
}

/// Listed channel indices for a header, in payload order.
pub fn listed(header: &Header) -> Vec<usize> {
    (0..16)
        .filter(|fe| (header.frontends >> fe) & 1 == 1)
        .flat_map(|fe| (0..header.chips as usize).map(move |chip| fe * 16 + chip))
        .collect()
}

/// An unsparsified buffer whose listed channels carry `pattern(index)`.
pub fn unsparsified(header: &Header) -> Vec<u8> {
    let header = Header {
        readout_mode: 0,
        ..*header
    };

    let mut payload = Payload::default();
    for channel in listed(&header) {
        payload.push_strips(&pattern(channel));
    }

    let mut out = header.encode_default();
    out.extend(payload.into_bytes());
    out
}

/// A sparsified buffer with the given clusters per listed channel.
pub fn sparsified(header: &Header, clusters: &[&[(u8, u8)]]) -> Vec<u8> {
    let header = Header {
        readout_mode: 1,
        ..*header
    };
    assert_eq!(listed(&header).len(), clusters.len());

    let counts: Vec<u16> = clusters.iter().map(|c| c.len() as u16).collect();

    let mut payload = Payload::default();
    for channel in clusters {
        for (first_strip, width) in channel.iter() {
            payload.push_cluster(*first_strip, *width);
        }
    }

    let mut out = header.encode_default();
    out.extend(count_table(&counts));
    out.extend(payload.into_bytes());
    out
}
