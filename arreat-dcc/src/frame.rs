//! Per-frame extraction from the shared direction canvas.
//!
//! This is the only place per-frame pixel buffers are materialized; the
//! cell decoder works purely on the shared canvas, and the canvas itself
//! is never exposed.

use crate::cell::Canvas;
use crate::direction::{Extents, FrameHeader};

/// One decoded frame: its header and a palette-index pixel buffer.
///
/// The buffer holds `width * height` palette indices in the frame's
/// declared row order: top row first for top-down frames, bottom row first
/// when [`FrameHeader::bottom_up`] is set. The extents stay available
/// through the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFrame {
    pub header: FrameHeader,
    pub width: u32,
    pub height: u32,
    /// Palette indices, row-major in the frame's declared row order.
    pub data: Vec<u8>,
}

/// Crop the canvas sub-rectangle matching one frame's extents.
///
/// Cells outside the frame's own extents were still decoded (the canvas is
/// shared across the direction); they are simply excluded here.
pub(crate) fn assemble_frame(
    canvas: &Canvas,
    dir_extents: &Extents,
    header: &FrameHeader,
) -> DecodedFrame {
    let width = header.extents.width();
    let height = header.extents.height();

    let mut data = vec![0; width as usize * height as usize];

    for row in 0..height {
        // Frame extents lie within the direction extents, so the canvas
        // coordinates below cannot go negative.
        let canvas_y = if header.bottom_up {
            header.extents.y_upper - 1 - row as i32
        } else {
            header.extents.y_lower + row as i32
        };
        let y = (canvas_y - dir_extents.y_lower) as u32;

        for col in 0..width {
            let x = (header.extents.x_lower + col as i32 - dir_extents.x_lower) as u32;
            data[row as usize * width as usize + col as usize] = canvas.get(x, y);
        }
    }

    DecodedFrame {
        header: *header,
        width,
        height,
        data,
    }
}
