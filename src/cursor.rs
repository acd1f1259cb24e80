//! Bounds-checked access to a byte buffer at bit granularity.
//!
//! Every read names the [`Packing`] convention of the field group it belongs
//! to. Conventions are fixed by the hardware and listed in [`crate::layout`];
//! they are never inferred from the data.

use thiserror::Error;

/// A read or skip would pass the end of the buffer.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[error("Requested {requested} bits at bit {position} with only {remaining} remaining.")]
pub struct OutOfRange {
    /// Cursor position, in bits from the start of the buffer.
    pub position: usize,
    /// Number of bits requested.
    pub requested: usize,
    /// Number of bits left before the end.
    pub remaining: usize,
}

/// Order in which buffer bytes are consumed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WordOrder {
    /// Bytes are consumed in buffer order.
    Bytes,
    /// The buffer is a sequence of little-endian 64-bit words, each consumed
    /// from its most significant byte.
    LittleEndian64,
}

impl WordOrder {
    /// Map a logical byte index onto its index in the buffer.
    const fn physical(self, logical: usize) -> usize {
        match self {
            Self::Bytes => logical,
            Self::LittleEndian64 => logical ^ 7,
        }
    }
}

/// Order in which bits are consumed within a byte.
///
/// With [`BitOrder::Msb0`] the first bit read lands in the most significant
/// position of the result; with [`BitOrder::Lsb0`] it lands in the least.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BitOrder {
    Msb0,
    Lsb0,
}

/// The packing convention of one field group.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Packing {
    pub words: WordOrder,
    pub bits: BitOrder,
}

/// A forward cursor over a window of a byte buffer.
///
/// Positions are absolute bit indices into the buffer, so a cursor over a
/// channel window reports the same positions as one over the whole buffer.
#[derive(Clone, Copy, Debug)]
pub struct BitCursor<'a> {
    data: &'a [u8],
    position: usize,
    end: usize,
}

impl<'a> BitCursor<'a> {
    /// Create a cursor at the start of a buffer.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            position: 0,
            end: data.len() * 8,
        }
    }

    /// Create a cursor at a byte offset and a bit offset within that byte.
    pub fn at(data: &'a [u8], byte_offset: usize, bit_offset: u8) -> Result<Self, OutOfRange> {
        let mut cursor = Self::new(data);
        cursor.skip_bytes(byte_offset)?;
        cursor.skip_bits(usize::from(bit_offset))?;
        Ok(cursor)
    }

    /// Create a cursor restricted to `len` bits starting at bit `start`.
    pub fn window(data: &'a [u8], start: usize, len: usize) -> Result<Self, OutOfRange> {
        let total = data.len() * 8;

        match start.checked_add(len) {
            Some(end) if end <= total => Ok(Self {
                data,
                position: start,
                end,
            }),
            _ => Err(OutOfRange {
                position: start,
                requested: len,
                remaining: total.saturating_sub(start),
            }),
        }
    }

    /// Current position, in bits from the start of the buffer.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Number of bits left before the end of the window.
    pub fn remaining_bits(&self) -> usize {
        self.end - self.position
    }

    /// Read `n` bits, advancing the cursor.
    ///
    /// # Panics
    ///
    /// Panics if `n` exceeds 64.
    pub fn read_bits(&mut self, n: u32, packing: Packing) -> Result<u64, OutOfRange> {
        let value = self.peek_bits(n, packing)?;
        self.position += n as usize;
        Ok(value)
    }

    /// Read `n` bits without advancing the cursor.
    ///
    /// # Panics
    ///
    /// Panics if `n` exceeds 64.
    pub fn peek_bits(&self, n: u32, packing: Packing) -> Result<u64, OutOfRange> {
        assert!(n <= 64, "cannot read {n} bits into a u64");
        self.check(n as usize)?;

        let mut value = 0u64;
        let mut position = self.position;
        let mut filled = 0;

        while filled < n {
            let offset = (position % 8) as u32;
            let take = (8 - offset).min(n - filled);
            let byte = u64::from(self.byte(position / 8, packing.words, n)?);
            let mask = (1 << take) - 1;

            value = match packing.bits {
                BitOrder::Msb0 => (value << take) | ((byte >> (8 - offset - take)) & mask),
                BitOrder::Lsb0 => value | (((byte >> offset) & mask) << filled),
            };

            filled += take;
            position += take as usize;
        }

        Ok(value)
    }

    /// Advance the cursor by `n` bits.
    pub fn skip_bits(&mut self, n: usize) -> Result<(), OutOfRange> {
        self.check(n)?;
        self.position += n;
        Ok(())
    }

    /// Advance the cursor by `n` bytes.
    pub fn skip_bytes(&mut self, n: usize) -> Result<(), OutOfRange> {
        let bits = n.checked_mul(8).ok_or(OutOfRange {
            position: self.position,
            requested: usize::MAX,
            remaining: self.remaining_bits(),
        })?;
        self.skip_bits(bits)
    }

    /// Advance the cursor to the next multiple of `bits` (measured from the
    /// start of the buffer), if it is not already on one. Aligning to 0 bits
    /// leaves the cursor in place.
    pub fn align_to(&mut self, bits: usize) -> Result<(), OutOfRange> {
        match self.position.checked_rem(bits) {
            None | Some(0) => Ok(()),
            Some(r) => self.skip_bits(bits - r),
        }
    }

    fn check(&self, n: usize) -> Result<(), OutOfRange> {
        if n > self.remaining_bits() {
            Err(OutOfRange {
                position: self.position,
                requested: n,
                remaining: self.remaining_bits(),
            })?;
        }
        Ok(())
    }

    fn byte(&self, logical: usize, words: WordOrder, n: u32) -> Result<u8, OutOfRange> {
        // A trailing partial word has no byte at its swapped index.
        self.data
            .get(words.physical(logical))
            .copied()
            .ok_or(OutOfRange {
                position: self.position,
                requested: n as usize,
                remaining: self.remaining_bits(),
            })
    }
}
