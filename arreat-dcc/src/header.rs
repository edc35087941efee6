//! Fixed file header and direction offset table parsing.
//!
//! The fixed header is plain little-endian bytes, not bit-packed:
//! signature (4B), version (1B), direction count (1B), frames per
//! direction (4B), reserved (3B, must be zero), tag (4B), final size (4B).
//! It is followed by one 4-byte little-endian start offset per direction;
//! the table is terminated by the file size.

use crate::error::{FormatError, Result, bail};

/// Size of the fixed header in bytes, up to but excluding the offset table.
pub(crate) const FIXED_HEADER_SIZE: usize = 21;

/// The most frames a direction may declare. The three reserved bytes after
/// the frame count double as padding for this bound.
pub(crate) const MAX_FRAMES_PER_DIRECTION: u32 = 255;

/// The parsed fixed file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    /// File signature; stored as-is, not validated.
    pub signature: [u8; 4],
    /// Format version; stored as-is, not validated.
    pub version: u8,
    /// Number of directions in the file. At least 1.
    pub directions: u8,
    /// Number of frames in every direction. At most 255.
    pub frames_per_direction: u32,
    /// Opaque tag copied from the file.
    pub tag: u32,
    /// Declared size of the equivalent uncompressed sprite.
    pub final_size: u32,
}

/// Parse the fixed file header from the first [`FIXED_HEADER_SIZE`] bytes.
pub(crate) fn parse_file_header(data: &[u8]) -> Result<FileHeader> {
    if data.len() < FIXED_HEADER_SIZE {
        bail!(FormatError::Truncated);
    }

    let header = FileHeader {
        signature: data[0..4].try_into().unwrap(),
        version: data[4],
        directions: data[5],
        frames_per_direction: u32::from_le_bytes(data[6..10].try_into().unwrap()),
        tag: u32::from_le_bytes(data[13..17].try_into().unwrap()),
        final_size: u32::from_le_bytes(data[17..21].try_into().unwrap()),
    };

    if data[10..13] != [0, 0, 0] {
        bail!(FormatError::ReservedBytes);
    }
    if header.directions == 0 {
        bail!(FormatError::NoDirections);
    }
    if header.frames_per_direction > MAX_FRAMES_PER_DIRECTION {
        bail!(FormatError::TooManyFrames);
    }

    Ok(header)
}

/// Parse the direction offset table.
///
/// `data` must hold exactly `directions` little-endian 4-byte offsets. The
/// returned table has one extra entry equal to the file size, so that
/// `offsets[i + 1] - offsets[i]` is the byte size of direction `i`.
pub(crate) fn parse_offset_table(
    data: &[u8],
    directions: u8,
    file_size: u32,
) -> Result<Vec<u32>> {
    debug_assert_eq!(data.len(), directions as usize * 4);

    let mut offsets = Vec::with_capacity(directions as usize + 1);
    for chunk in data.chunks_exact(4) {
        offsets.push(u32::from_le_bytes(chunk.try_into().unwrap()));
    }
    offsets.push(file_size);

    if offsets.windows(2).any(|pair| pair[0] > pair[1]) {
        bail!(FormatError::OffsetsNotSorted);
    }

    Ok(offsets)
}
