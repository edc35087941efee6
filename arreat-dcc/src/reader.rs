//! Bit-level reader for DCC bitstreams.
//!
//! DCC packs fields LSB-first within each byte, and a direction's five
//! sub-bitstreams are independent windows over one backing buffer, so the
//! reader carries an explicit (start, end) window in bits. Reads never
//! panic on overrun: they return 0, pin the cursor, and latch a failure
//! flag that callers check through [`BitReader::good`].

/// The fixed table translating a 4-bit width code into a field bit-width.
pub(crate) const BITS_WIDTH_TABLE: [u32; 16] = [
    0, 1, 2, 4, 6, 8, 10, 12, 14, 16, 20, 24, 26, 28, 30, 32,
];

#[derive(Debug, Clone)]
pub(crate) struct BitReader<'a> {
    /// The underlying data, shared between all windows of one direction.
    data: &'a [u8],
    /// Window start, in bits over `data`.
    start: usize,
    /// Window end (exclusive), in bits over `data`.
    end: usize,
    /// The cursor position, in bits over `data`.
    cur_pos: usize,
    /// Latched when a read, skip or seek ran past the window.
    failed: bool,
}

impl<'a> BitReader<'a> {
    #[inline(always)]
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            start: 0,
            end: data.len() * 8,
            cur_pos: 0,
            failed: false,
        }
    }

    /// A sub-window over the same backing buffer, in absolute bit
    /// positions. Returns `None` if the requested range leaves this
    /// reader's own window.
    pub(crate) fn window(&self, start: usize, len: usize) -> Option<Self> {
        let end = start.checked_add(len)?;
        if start < self.start || end > self.end {
            return None;
        }

        let mut window = Self {
            data: self.data,
            start,
            end,
            cur_pos: self.cur_pos,
            failed: false,
        };
        window.seek(start);

        Some(window)
    }

    /// Read an unsigned value of up to 32 bits, LSB-first.
    pub(crate) fn read_unsigned(&mut self, width: u32) -> u32 {
        debug_assert!(width <= 32);

        if width == 0 {
            return 0;
        }
        if self.cur_pos + width as usize > self.end {
            return self.fail();
        }

        let mut value = 0_u32;
        let mut done = 0_u32;

        while done < width {
            let byte = self.data[self.cur_pos >> 3] as u32;
            let bit_offset = (self.cur_pos & 7) as u32;

            let available = 8 - bit_offset;
            let take = available.min(width - done);

            let bits = (byte >> bit_offset) & ((1 << take) - 1);
            value |= bits << done;

            self.cur_pos += take as usize;
            done += take;
        }

        value
    }

    /// Read a sign-extended value of up to 32 bits.
    ///
    /// A width of 0 always yields 0 and consumes nothing.
    pub(crate) fn read_signed(&mut self, width: u32) -> i32 {
        if width == 0 {
            return 0;
        }

        let raw = self.read_unsigned(width);
        if width == 32 {
            return raw as i32;
        }

        let sign = 1_u32 << (width - 1);
        if raw & sign != 0 {
            (raw | !(sign | (sign - 1))) as i32
        } else {
            raw as i32
        }
    }

    #[inline(always)]
    pub(crate) fn read_bool(&mut self) -> bool {
        self.read_unsigned(1) != 0
    }

    /// Read an unsigned field whose width is chosen by a 4-bit width code.
    #[inline(always)]
    pub(crate) fn read_coded_unsigned(&mut self, code: u8) -> u32 {
        UNSIGNED_READERS[(code & 0xF) as usize](self)
    }

    /// Read a signed field whose width is chosen by a 4-bit width code.
    #[inline(always)]
    pub(crate) fn read_coded_signed(&mut self, code: u8) -> i32 {
        SIGNED_READERS[(code & 0xF) as usize](self)
    }

    /// Advance to the next byte boundary of the backing buffer.
    pub(crate) fn align(&mut self) {
        let bit_pos = self.cur_pos & 7;

        if bit_pos != 0 {
            self.skip(8 - bit_pos);
        }
    }

    pub(crate) fn skip(&mut self, bits: usize) {
        if self.cur_pos + bits > self.end {
            self.fail();
        } else {
            self.cur_pos += bits;
        }
    }

    /// The cursor position, in bits over the backing buffer.
    #[inline(always)]
    pub(crate) fn tell(&self) -> usize {
        self.cur_pos
    }

    pub(crate) fn seek(&mut self, pos: usize) {
        if pos < self.start || pos > self.end {
            self.fail();
        } else {
            self.cur_pos = pos;
        }
    }

    /// Whether all reads so far stayed within the window.
    #[inline(always)]
    pub(crate) fn good(&self) -> bool {
        !self.failed
    }

    /// Bits left in the window.
    #[inline(always)]
    pub(crate) fn remaining(&self) -> usize {
        self.end - self.cur_pos
    }

    /// Window end (exclusive), in bits over the backing buffer.
    #[inline(always)]
    pub(crate) fn end(&self) -> usize {
        self.end
    }

    #[inline(always)]
    fn fail(&mut self) -> u32 {
        self.failed = true;
        self.cur_pos = self.end;
        0
    }
}

fn unsigned_reader<const WIDTH: u32>(reader: &mut BitReader<'_>) -> u32 {
    reader.read_unsigned(WIDTH)
}

fn signed_reader<const WIDTH: u32>(reader: &mut BitReader<'_>) -> i32 {
    reader.read_signed(WIDTH)
}

type UnsignedReaderFn = for<'a, 'b> fn(&'a mut BitReader<'b>) -> u32;
type SignedReaderFn = for<'a, 'b> fn(&'a mut BitReader<'b>) -> i32;

// One monomorphized reader per width-table entry, indexed by the 4-bit
// width code. This runs once per frame-header field, so dispatch is a
// single indexed call rather than a 16-way branch.
const UNSIGNED_READERS: [UnsignedReaderFn; 16] = [
    unsigned_reader::<{ BITS_WIDTH_TABLE[0] }>,
    unsigned_reader::<{ BITS_WIDTH_TABLE[1] }>,
    unsigned_reader::<{ BITS_WIDTH_TABLE[2] }>,
    unsigned_reader::<{ BITS_WIDTH_TABLE[3] }>,
    unsigned_reader::<{ BITS_WIDTH_TABLE[4] }>,
    unsigned_reader::<{ BITS_WIDTH_TABLE[5] }>,
    unsigned_reader::<{ BITS_WIDTH_TABLE[6] }>,
    unsigned_reader::<{ BITS_WIDTH_TABLE[7] }>,
    unsigned_reader::<{ BITS_WIDTH_TABLE[8] }>,
    unsigned_reader::<{ BITS_WIDTH_TABLE[9] }>,
    unsigned_reader::<{ BITS_WIDTH_TABLE[10] }>,
    unsigned_reader::<{ BITS_WIDTH_TABLE[11] }>,
    unsigned_reader::<{ BITS_WIDTH_TABLE[12] }>,
    unsigned_reader::<{ BITS_WIDTH_TABLE[13] }>,
    unsigned_reader::<{ BITS_WIDTH_TABLE[14] }>,
    unsigned_reader::<{ BITS_WIDTH_TABLE[15] }>,
];

const SIGNED_READERS: [SignedReaderFn; 16] = [
    signed_reader::<{ BITS_WIDTH_TABLE[0] }>,
    signed_reader::<{ BITS_WIDTH_TABLE[1] }>,
    signed_reader::<{ BITS_WIDTH_TABLE[2] }>,
    signed_reader::<{ BITS_WIDTH_TABLE[3] }>,
    signed_reader::<{ BITS_WIDTH_TABLE[4] }>,
    signed_reader::<{ BITS_WIDTH_TABLE[5] }>,
    signed_reader::<{ BITS_WIDTH_TABLE[6] }>,
    signed_reader::<{ BITS_WIDTH_TABLE[7] }>,
    signed_reader::<{ BITS_WIDTH_TABLE[8] }>,
    signed_reader::<{ BITS_WIDTH_TABLE[9] }>,
    signed_reader::<{ BITS_WIDTH_TABLE[10] }>,
    signed_reader::<{ BITS_WIDTH_TABLE[11] }>,
    signed_reader::<{ BITS_WIDTH_TABLE[12] }>,
    signed_reader::<{ BITS_WIDTH_TABLE[13] }>,
    signed_reader::<{ BITS_WIDTH_TABLE[14] }>,
    signed_reader::<{ BITS_WIDTH_TABLE[15] }>,
];
