//! Per-direction parsing and decoding.
//!
//! A direction's byte range starts with a bit-packed header whose seven
//! width codes choose the bit-width of every frame-header field, followed
//! by the frame headers, the optional-data region, up to four 20-bit
//! sub-bitstream sizes, a 256-bit pixel-value presence bitmap, and five
//! contiguous sub-bitstreams that the cell decoder consumes.

use log::{debug, warn};

use crate::cell::{Canvas, CellDecoder};
use crate::error::{BoundsError, FormatError, Result, bail};
use crate::frame::{DecodedFrame, assemble_frame};
use crate::reader::BitReader;

/// Sanity bound on frame width and height.
const FRAME_DIMENSION_BOUND: u32 = 1 << 23;

/// Bound on the shared canvas area in pixels. Frame offsets are full
/// 32-bit values, so two small frames at opposite corners can otherwise
/// declare a union canvas that no allocator should be asked for.
const MAX_CANVAS_AREA: usize = 1 << 26;

/// An axis-aligned bounding box in a direction's shared coordinate space.
///
/// Lower bounds are inclusive, upper bounds exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Extents {
    pub x_lower: i32,
    pub x_upper: i32,
    pub y_lower: i32,
    pub y_upper: i32,
}

impl Extents {
    /// Width of the box in pixels.
    pub fn width(&self) -> u32 {
        (self.x_upper as i64 - self.x_lower as i64) as u32
    }

    /// Height of the box in pixels.
    pub fn height(&self) -> u32 {
        (self.y_upper as i64 - self.y_lower as i64) as u32
    }

    fn union(&mut self, other: &Self) {
        self.x_lower = self.x_lower.min(other.x_lower);
        self.x_upper = self.x_upper.max(other.x_upper);
        self.y_lower = self.y_lower.min(other.y_lower);
        self.y_upper = self.y_upper.max(other.y_upper);
    }
}

/// The bit-packed header at the start of a direction.
///
/// The `*_bits` fields are 4-bit width *codes*, resolved through the fixed
/// 16-entry width table for every frame header in the direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectionHeader {
    /// Declared size of the direction's coded output.
    pub outsize_coded: u32,
    /// Whether pixel codes go through the two-stream color encoding.
    pub compress_color_encoding: bool,
    /// Whether unchanged cells are flagged in a dedicated bitstream.
    pub compress_equal_cells: bool,
    pub variable0_bits: u8,
    pub width_bits: u8,
    pub height_bits: u8,
    pub xoffset_bits: u8,
    pub yoffset_bits: u8,
    pub optional_bytes_bits: u8,
    pub coded_bytes_bits: u8,
}

/// A parsed frame header with its derived extents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Unknown field, zero in known-good files.
    pub variable0: u32,
    pub width: u32,
    pub height: u32,
    pub xoffset: i32,
    pub yoffset: i32,
    /// Bytes of per-frame optional data, stored after the frame headers.
    pub optional_bytes: u32,
    /// Declared coded size of the frame.
    pub coded_bytes: u32,
    /// Whether the frame's rows run bottom-up.
    pub bottom_up: bool,
    /// The frame's bounding box in the direction's coordinate space.
    pub extents: Extents,
}

/// One decoded direction: header, union extents and all decoded frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Direction {
    pub header: DirectionHeader,
    /// Union of all frame extents; the size of the shared decode canvas.
    pub extents: Extents,
    pub frames: Vec<DecodedFrame>,
}

/// Maps a compact pixel code to an actual palette index.
///
/// Built from the 256-bit presence bitmap: if the pixel values used in a
/// direction are 0, 31 and 42, then code 0 yields 0, code 1 yields 31 and
/// code 2 yields 42.
#[derive(Debug, Clone)]
pub(crate) struct PixelValueTable {
    pub(crate) values: Vec<u8>,
}

impl PixelValueTable {
    /// Bit-width of a literal pixel code; 0 when a single value (or none)
    /// leaves nothing to choose.
    pub(crate) fn code_width(&self) -> u32 {
        match self.values.len() {
            0 | 1 => 0,
            n => 32 - (n as u32 - 1).leading_zeros(),
        }
    }
}

/// The five sub-bitstreams of a direction, as windows over its backing
/// buffer. Absent streams are zero-length windows.
pub(crate) struct SubStreams<'a> {
    pub(crate) equal_cells: BitReader<'a>,
    pub(crate) pixel_mask: BitReader<'a>,
    pub(crate) encoding_type: BitReader<'a>,
    pub(crate) raw_codes: BitReader<'a>,
    pub(crate) pixel_codes: BitReader<'a>,
}

/// Decode one direction from its byte range.
///
/// Directions are mutually independent: callers may run this concurrently
/// over disjoint ranges of one immutable file buffer.
pub fn decode_direction(data: &[u8], frames_per_direction: u32) -> Result<Direction> {
    let mut reader = BitReader::new(data);

    let header = parse_direction_header(&mut reader)?;
    let frame_headers = parse_frame_headers(&mut reader, &header, frames_per_direction)?;
    skip_optional_data(&mut reader, &frame_headers)?;

    let extents = union_extents(&frame_headers);
    let area = (extents.width() as usize).checked_mul(extents.height() as usize);
    if !area.is_some_and(|area| area <= MAX_CANVAS_AREA) {
        bail!(FormatError::CanvasTooLarge);
    }
    debug!(
        "direction: {} frames, {}x{} canvas",
        frame_headers.len(),
        extents.width(),
        extents.height()
    );

    let sizes = read_stream_sizes(&mut reader, &header)?;
    let table = parse_pixel_value_table(&mut reader)?;
    let streams = layout_sub_streams(&reader, &header, &sizes)?;

    let mut canvas = Canvas::new(extents.width(), extents.height());
    let mut cell_decoder = CellDecoder::new(streams, table, &header);

    let mut frames = Vec::with_capacity(frame_headers.len());
    for (index, frame_header) in frame_headers.iter().enumerate() {
        cell_decoder.decode_frame(index, &mut canvas)?;
        frames.push(assemble_frame(&canvas, &extents, frame_header));
    }

    Ok(Direction {
        header,
        extents,
        frames,
    })
}

/// Parse the fixed-width direction header fields. These define the
/// per-frame field widths, so they are not themselves width-coded.
fn parse_direction_header(reader: &mut BitReader<'_>) -> Result<DirectionHeader> {
    let header = DirectionHeader {
        outsize_coded: reader.read_unsigned(32),
        compress_color_encoding: reader.read_bool(),
        compress_equal_cells: reader.read_bool(),
        variable0_bits: reader.read_unsigned(4) as u8,
        width_bits: reader.read_unsigned(4) as u8,
        height_bits: reader.read_unsigned(4) as u8,
        xoffset_bits: reader.read_unsigned(4) as u8,
        yoffset_bits: reader.read_unsigned(4) as u8,
        optional_bytes_bits: reader.read_unsigned(4) as u8,
        coded_bytes_bits: reader.read_unsigned(4) as u8,
    };

    if !reader.good() {
        bail!(BoundsError::BitOverrun);
    }

    Ok(header)
}

fn parse_frame_headers(
    reader: &mut BitReader<'_>,
    header: &DirectionHeader,
    frames_per_direction: u32,
) -> Result<Vec<FrameHeader>> {
    let mut frames = Vec::with_capacity(frames_per_direction as usize);

    for _ in 0..frames_per_direction {
        let variable0 = reader.read_coded_unsigned(header.variable0_bits);
        let width = reader.read_coded_unsigned(header.width_bits);
        let height = reader.read_coded_unsigned(header.height_bits);
        let xoffset = reader.read_coded_signed(header.xoffset_bits);
        let yoffset = reader.read_coded_signed(header.yoffset_bits);
        let optional_bytes = reader.read_coded_unsigned(header.optional_bytes_bits);
        let coded_bytes = reader.read_coded_unsigned(header.coded_bytes_bits);
        let bottom_up = reader.read_bool();

        if width >= FRAME_DIMENSION_BOUND || height >= FRAME_DIMENSION_BOUND {
            bail!(FormatError::FrameTooLarge);
        }

        let extents = frame_extents(width, height, xoffset, yoffset, bottom_up)
            .ok_or(FormatError::FrameTooLarge)?;

        frames.push(FrameHeader {
            variable0,
            width,
            height,
            xoffset,
            yoffset,
            optional_bytes,
            coded_bytes,
            bottom_up,
            extents,
        });
    }

    if !reader.good() {
        bail!(BoundsError::BitOverrun);
    }
    if frames.iter().any(|frame| frame.variable0 != 0) {
        warn!("nonzero variable0 in frame headers");
    }

    Ok(frames)
}

/// Derive a frame's bounding box from its header fields.
///
/// The vertical extent depends on the row orientation: bottom-up frames
/// grow upward from yoffset, top-down frames end at yoffset (inclusive).
fn frame_extents(
    width: u32,
    height: u32,
    xoffset: i32,
    yoffset: i32,
    bottom_up: bool,
) -> Option<Extents> {
    let x_lower = xoffset;
    let x_upper = xoffset.checked_add(width as i32)?;

    let (y_lower, y_upper) = if bottom_up {
        (yoffset, yoffset.checked_add(height as i32)?)
    } else {
        (
            yoffset.checked_sub(height as i32)?.checked_add(1)?,
            yoffset.checked_add(1)?,
        )
    };

    Some(Extents {
        x_lower,
        x_upper,
        y_lower,
        y_upper,
    })
}

/// Skip the optional-data region.
///
/// This pass is deliberately separate from frame-header parsing: optional
/// bytes are not interleaved with the fixed-width fields.
fn skip_optional_data(reader: &mut BitReader<'_>, frames: &[FrameHeader]) -> Result<()> {
    for frame in frames {
        if frame.optional_bytes != 0 {
            reader.align();
            let bits = frame.optional_bytes as usize * 8;
            if bits > reader.remaining() {
                bail!(FormatError::OptionalDataOverrun);
            }
            reader.skip(bits);
        }
    }

    if !reader.good() {
        bail!(FormatError::OptionalDataOverrun);
    }

    Ok(())
}

fn union_extents(frames: &[FrameHeader]) -> Extents {
    let mut iter = frames.iter();
    let Some(first) = iter.next() else {
        return Extents::default();
    };

    let mut extents = first.extents;
    for frame in iter {
        extents.union(&frame.extents);
    }

    extents
}

/// Declared bit sizes of the leading sub-bitstreams.
struct StreamSizes {
    equal_cells: u32,
    pixel_mask: u32,
    encoding_type: u32,
    raw_codes: u32,
}

fn read_stream_sizes(reader: &mut BitReader<'_>, header: &DirectionHeader) -> Result<StreamSizes> {
    let equal_cells = if header.compress_equal_cells {
        reader.read_unsigned(20)
    } else {
        0
    };

    let pixel_mask = reader.read_unsigned(20);

    let (encoding_type, raw_codes) = if header.compress_color_encoding {
        (reader.read_unsigned(20), reader.read_unsigned(20))
    } else {
        (0, 0)
    };

    if !reader.good() {
        bail!(BoundsError::BitOverrun);
    }

    Ok(StreamSizes {
        equal_cells,
        pixel_mask,
        encoding_type,
        raw_codes,
    })
}

/// Build the pixel value table from the 256-bit presence bitmap, scanning
/// bit 0 through 255 and appending each set index in order.
fn parse_pixel_value_table(reader: &mut BitReader<'_>) -> Result<PixelValueTable> {
    let mut values = Vec::new();

    for i in 0..256 {
        if reader.read_bool() {
            values.push(i as u8);
        }
    }

    if !reader.good() {
        bail!(BoundsError::BitOverrun);
    }

    Ok(PixelValueTable { values })
}

/// Lay out the five sub-bitstreams contiguously after the presence bitmap.
///
/// Each leading stream is sized by its 20-bit size field when its governing
/// flag is set, else zero-length; the pixel-codes stream runs to the end of
/// the direction.
fn layout_sub_streams<'a>(
    reader: &BitReader<'a>,
    header: &DirectionHeader,
    sizes: &StreamSizes,
) -> Result<SubStreams<'a>> {
    let mut pos = reader.tell();

    let mut take = |len: u32| -> Result<BitReader<'a>> {
        let window = reader
            .window(pos, len as usize)
            .ok_or(FormatError::StreamOverrun)?;
        pos += len as usize;
        Ok(window)
    };

    let equal_cells = take(if header.compress_equal_cells {
        sizes.equal_cells
    } else {
        0
    })?;
    let pixel_mask = take(sizes.pixel_mask)?;
    let (encoding_type, raw_codes) = if header.compress_color_encoding {
        (take(sizes.encoding_type)?, take(sizes.raw_codes)?)
    } else {
        (take(0)?, take(0)?)
    };

    let pixel_codes = reader
        .window(pos, reader.end() - pos)
        .ok_or(FormatError::StreamOverrun)?;

    Ok(SubStreams {
        equal_cells,
        pixel_mask,
        encoding_type,
        raw_codes,
        pixel_codes,
    })
}
