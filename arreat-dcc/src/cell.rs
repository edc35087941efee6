//! Cell-granularity decoding of a direction's frames.
//!
//! The shared canvas is tiled in raster order by nominal 4x4 cells (edge
//! cells shrink to 1-3 pixels per axis). Frames are decoded in stored
//! order, each as a delta against the canvas left behind by the previous
//! frame: an optional equal-cell bit keeps a whole cell, per-pixel mask
//! bits keep or recode single pixels, and recoded pixels resolve a compact
//! code through the direction's pixel value table.

use crate::direction::{DirectionHeader, PixelValueTable, SubStreams};
use crate::error::{BoundsError, FormatError, Result, bail};

/// Nominal cell edge length in pixels.
const CELL_SIZE: u32 = 4;

/// The shared per-direction decode canvas, holding palette indices.
#[derive(Debug, Clone)]
pub(crate) struct Canvas {
    pub(crate) width: u32,
    pub(crate) height: u32,
    /// Pixel data, one palette index per pixel, row-major order.
    pub(crate) data: Vec<u8>,
}

impl Canvas {
    /// Create a canvas with every pixel unset (palette index 0).
    pub(crate) fn new(width: u32, height: u32) -> Self {
        let data = vec![0; width as usize * height as usize];
        Self {
            width,
            height,
            data,
        }
    }

    #[inline]
    pub(crate) fn get(&self, x: u32, y: u32) -> u8 {
        if x >= self.width || y >= self.height {
            return 0;
        }
        self.data[y as usize * self.width as usize + x as usize]
    }

    #[inline]
    fn set(&mut self, x: u32, y: u32, value: u8) {
        if x >= self.width || y >= self.height {
            return;
        }
        self.data[y as usize * self.width as usize + x as usize] = value;
    }
}

/// Sequentially decodes a direction's frames onto a shared canvas.
///
/// Frame decoding is intrinsically sequential: equal-cell and pixel-mask
/// deltas reference the immediately preceding stored frame, so the canvas
/// is threaded through frame by frame and must not be decoded out of
/// order.
pub(crate) struct CellDecoder<'a> {
    streams: SubStreams<'a>,
    table: PixelValueTable,
    compress_equal_cells: bool,
    compress_color_encoding: bool,
    code_width: u32,
    /// The last emitted code, reused by the "repeat" color encoding flag.
    last_code: u32,
}

impl<'a> CellDecoder<'a> {
    pub(crate) fn new(
        streams: SubStreams<'a>,
        table: PixelValueTable,
        header: &DirectionHeader,
    ) -> Self {
        let code_width = table.code_width();
        Self {
            streams,
            table,
            compress_equal_cells: header.compress_equal_cells,
            compress_color_encoding: header.compress_color_encoding,
            code_width,
            last_code: 0,
        }
    }

    /// Decode one frame's deltas onto the canvas.
    ///
    /// Frame 0 has no previous frame: it consumes no equal-cell bits and
    /// every cell goes through the pixel-mask path, so nothing is copied
    /// forward implicitly.
    pub(crate) fn decode_frame(&mut self, frame_index: usize, canvas: &mut Canvas) -> Result<()> {
        for (y0, cell_height) in cell_spans(canvas.height) {
            for (x0, cell_width) in cell_spans(canvas.width) {
                if self.compress_equal_cells
                    && frame_index > 0
                    && self.streams.equal_cells.read_bool()
                {
                    // The cell is unchanged from the previous frame; the
                    // canvas already holds it, and no mask bits belong to
                    // this cell.
                    continue;
                }

                for y in y0..y0 + cell_height {
                    for x in x0..x0 + cell_width {
                        if !self.streams.pixel_mask.read_bool() {
                            continue;
                        }

                        let code = self.next_code()?;
                        let value = *self
                            .table
                            .values
                            .get(code as usize)
                            .ok_or(FormatError::PixelCodeOutOfRange)?;
                        canvas.set(x, y, value);
                    }
                }
            }
        }

        // Reads past a window yield zeroes and latch; surface them here so
        // a truncated stream fails the direction instead of fabricating
        // pixels.
        if !self.streams_good() {
            bail!(BoundsError::BitOverrun);
        }

        Ok(())
    }

    /// Obtain the code for one recoded pixel.
    fn next_code(&mut self) -> Result<u32> {
        if self.table.values.is_empty() {
            bail!(FormatError::NoPixelValues);
        }

        let code = if self.compress_color_encoding {
            if self.streams.encoding_type.read_bool() {
                self.last_code
            } else {
                self.streams.raw_codes.read_unsigned(self.code_width)
            }
        } else {
            self.streams.pixel_codes.read_unsigned(self.code_width)
        };

        self.last_code = code;
        Ok(code)
    }

    fn streams_good(&self) -> bool {
        self.streams.equal_cells.good()
            && self.streams.pixel_mask.good()
            && self.streams.encoding_type.good()
            && self.streams.raw_codes.good()
            && self.streams.pixel_codes.good()
    }
}

/// Raster-order cell spans along one axis: (start, length) pairs with
/// nominal length [`CELL_SIZE`] and a shorter final span at the edge.
fn cell_spans(total: u32) -> impl Iterator<Item = (u32, u32)> {
    (0..total)
        .step_by(CELL_SIZE as usize)
        .map(move |start| (start, (total - start).min(CELL_SIZE)))
}
