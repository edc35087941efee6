//! End-to-end decoding tests over synthetic DCC files.

use std::io::Cursor;

use arreat_dcc::{BoundsError, Dcc, DecodeError, FormatError, StateError, decode_direction};

/// LSB-first bit writer for assembling synthetic bitstreams.
struct BitWriter {
    data: Vec<u8>,
    bit_len: usize,
}

impl BitWriter {
    fn new() -> Self {
        Self {
            data: Vec::new(),
            bit_len: 0,
        }
    }

    fn push_bit(&mut self, bit: bool) {
        if self.bit_len % 8 == 0 {
            self.data.push(0);
        }
        if bit {
            *self.data.last_mut().unwrap() |= 1 << (self.bit_len % 8);
        }
        self.bit_len += 1;
    }

    fn push(&mut self, value: u32, width: u32) {
        for i in 0..width {
            self.push_bit((value >> i) & 1 != 0);
        }
    }

    fn finish(self) -> Vec<u8> {
        self.data
    }
}

const FIXED_HEADER_SIZE: usize = 21;

/// Assemble a whole file from per-direction payloads.
fn build_file(frames_per_direction: u32, directions: &[Vec<u8>]) -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(b"\x74DCC");
    data.push(6); // version
    data.push(directions.len() as u8);
    data.extend_from_slice(&frames_per_direction.to_le_bytes());
    data.extend_from_slice(&[0, 0, 0]); // reserved
    data.extend_from_slice(&7_u32.to_le_bytes()); // tag
    data.extend_from_slice(&0_u32.to_le_bytes()); // final size

    let mut offset = (FIXED_HEADER_SIZE + 4 * directions.len()) as u32;
    for direction in directions {
        data.extend_from_slice(&offset.to_le_bytes());
        offset += direction.len() as u32;
    }
    for direction in directions {
        data.extend_from_slice(direction);
    }

    data
}

/// A direction of 2x2 top-down frames. Frame 0 recodes all four pixels
/// with `codes` into the table built from `values`; every later frame is
/// an equal-cell copy of it.
fn build_direction(frame_count: u32, values: &[u8], codes: &[u32; 4]) -> Vec<u8> {
    let code_width = match values.len() {
        0 | 1 => 0,
        n => 32 - (n as u32 - 1).leading_zeros(),
    };

    let mut writer = BitWriter::new();
    writer.push(0, 32); // outsize_coded
    writer.push_bit(false); // compress_color_encoding
    writer.push_bit(true); // compress_equal_cells
    writer.push(0, 4); // variable0_bits
    writer.push(2, 4); // width_bits: 2 bits
    writer.push(2, 4); // height_bits: 2 bits
    writer.push(0, 4); // xoffset_bits
    writer.push(0, 4); // yoffset_bits
    writer.push(0, 4); // optional_bytes_bits
    writer.push(0, 4); // coded_bytes_bits

    for _ in 0..frame_count {
        writer.push(2, 2); // width
        writer.push(2, 2); // height
        writer.push_bit(false); // top-down
    }

    writer.push(frame_count - 1, 20); // equal-cells bits: one per later frame
    writer.push(4, 20); // pixel-mask bits: frame 0 only

    for i in 0..256_u32 {
        writer.push_bit(values.contains(&(i as u8)));
    }

    for _ in 1..frame_count {
        writer.push_bit(true); // equal cell
    }
    for _ in 0..4 {
        writer.push_bit(true); // mask: recode everything in frame 0
    }
    for &code in codes {
        writer.push(code, code_width);
    }

    writer.finish()
}

#[test]
fn decodes_a_two_direction_file() {
    let dir0 = build_direction(2, &[0, 31, 42], &[0, 1, 2, 2]);
    let dir1 = build_direction(2, &[10, 20], &[1, 0, 0, 1]);
    let file = build_file(2, &[dir0, dir1]);

    let mut dcc = Dcc::new(Cursor::new(file));
    dcc.decode().unwrap();

    let header = dcc.header().unwrap();
    assert_eq!(header.directions, 2);
    assert_eq!(header.frames_per_direction, 2);
    assert_eq!(dcc.direction_count().unwrap(), 2);

    let direction = dcc.read_direction(0).unwrap();
    assert_eq!(direction.extents.width(), 2);
    assert_eq!(direction.extents.height(), 2);
    assert_eq!(direction.frames.len(), 2);
    assert_eq!(direction.frames[0].data, vec![0, 31, 42, 42]);
    // Frame 1 is an equal-cell copy of frame 0.
    assert_eq!(direction.frames[1].data, direction.frames[0].data);

    let direction = dcc.read_direction(1).unwrap();
    assert_eq!(direction.frames[0].data, vec![20, 10, 10, 20]);
}

#[test]
fn direction_sizes_partition_the_file() {
    let dir0 = build_direction(1, &[1], &[0, 0, 0, 0]);
    let dir1 = build_direction(1, &[1, 2, 3], &[0, 1, 2, 0]);
    let dir2 = build_direction(1, &[200], &[0, 0, 0, 0]);
    let file = build_file(1, &[dir0, dir1, dir2]);
    let file_size = file.len();

    let mut dcc = Dcc::new(Cursor::new(file));
    dcc.decode().unwrap();

    let mut total = FIXED_HEADER_SIZE + 4 * 3;
    for i in 0..3 {
        total += dcc.direction_size(i).unwrap() as usize;
    }
    assert_eq!(total, file_size);
}

#[test]
fn decoding_is_pure() {
    let dir = build_direction(2, &[3, 7, 11, 19], &[3, 2, 1, 0]);
    let file = build_file(2, &[dir]);

    let mut first = Dcc::new(Cursor::new(file.clone()));
    first.decode().unwrap();
    let mut second = Dcc::new(Cursor::new(file));
    second.decode().unwrap();

    let a = first.read_direction(0).unwrap();
    let b = second.read_direction(0).unwrap();
    for (left, right) in a.frames.iter().zip(&b.frames) {
        assert_eq!(left.data, right.data);
    }

    // Reading the same direction again also yields the same pixels.
    let c = first.read_direction(0).unwrap();
    assert_eq!(a.frames[1].data, c.frames[1].data);
}

#[test]
fn contract_violations_are_state_errors() {
    let file = build_file(1, &[build_direction(1, &[1], &[0, 0, 0, 0])]);
    let mut dcc = Dcc::new(Cursor::new(file));

    assert_eq!(
        dcc.header().unwrap_err(),
        DecodeError::State(StateError::NotDecoded)
    );
    assert_eq!(
        dcc.read_direction(0).unwrap_err(),
        DecodeError::State(StateError::NotDecoded)
    );

    dcc.decode().unwrap();
    assert_eq!(
        dcc.decode().unwrap_err(),
        DecodeError::State(StateError::AlreadyDecoded)
    );
    assert_eq!(
        dcc.direction_size(1).unwrap_err(),
        DecodeError::State(StateError::DirectionOutOfRange)
    );
}

#[test]
fn decreasing_offsets_fail_the_decode() {
    let dir0 = build_direction(1, &[1], &[0, 0, 0, 0]);
    let dir1 = build_direction(1, &[1], &[0, 0, 0, 0]);
    let mut file = build_file(1, &[dir0, dir1]);

    // Swap the two offsets so the table decreases.
    let first: [u8; 4] = file[21..25].try_into().unwrap();
    let second: [u8; 4] = file[25..29].try_into().unwrap();
    file[21..25].copy_from_slice(&second);
    file[25..29].copy_from_slice(&first);

    let mut dcc = Dcc::new(Cursor::new(file));
    assert_eq!(
        dcc.decode().unwrap_err(),
        DecodeError::Format(FormatError::OffsetsNotSorted)
    );
}

#[test]
fn a_bad_direction_leaves_other_directions_usable() {
    let dir0 = build_direction(1, &[1, 2], &[1, 0, 0, 1]);
    // Direction 1 is cut short mid-bitmap.
    let mut dir1 = build_direction(1, &[1, 2], &[1, 0, 0, 1]);
    dir1.truncate(dir1.len() - 16);
    let file = build_file(1, &[dir0, dir1]);

    let mut dcc = Dcc::new(Cursor::new(file));
    dcc.decode().unwrap();

    let good = dcc.read_direction(0).unwrap();
    assert_eq!(good.frames[0].data, vec![2, 1, 1, 2]);

    assert!(matches!(
        dcc.read_direction(1).unwrap_err(),
        DecodeError::Bounds(BoundsError::BitOverrun) | DecodeError::Format(_)
    ));

    // Direction 0 is still decodable after the failure.
    let again = dcc.read_direction(0).unwrap();
    assert_eq!(again.frames[0].data, good.frames[0].data);
}

#[test]
fn truncated_files_are_format_errors() {
    let file = build_file(1, &[build_direction(1, &[1], &[0, 0, 0, 0])]);

    // Shorter than the fixed header.
    let mut dcc = Dcc::new(Cursor::new(file[..10].to_vec()));
    assert_eq!(
        dcc.decode().unwrap_err(),
        DecodeError::Format(FormatError::Truncated)
    );

    // Header present but the offset table is cut off.
    let mut dcc = Dcc::new(Cursor::new(file[..FIXED_HEADER_SIZE + 2].to_vec()));
    assert_eq!(
        dcc.decode().unwrap_err(),
        DecodeError::Format(FormatError::Truncated)
    );
}

#[test]
fn extreme_frame_offsets_fail_instead_of_allocating() {
    // Two 1x1 frames at opposite corners of the 32-bit offset space: each
    // header is valid on its own, but the union canvas would be around
    // 2^32 pixels per axis. The decode must surface a format error, not
    // attempt the allocation.
    let mut writer = BitWriter::new();
    writer.push(0, 32); // outsize_coded
    writer.push_bit(false); // compress_color_encoding
    writer.push_bit(false); // compress_equal_cells
    writer.push(0, 4); // variable0_bits
    writer.push(1, 4); // width_bits: 1 bit
    writer.push(1, 4); // height_bits: 1 bit
    writer.push(15, 4); // xoffset_bits: 32 bits
    writer.push(15, 4); // yoffset_bits: 32 bits
    writer.push(0, 4); // optional_bytes_bits
    writer.push(0, 4); // coded_bytes_bits
    for offset in [i32::MIN, i32::MAX - 1] {
        writer.push(1, 1); // width
        writer.push(1, 1); // height
        writer.push(offset as u32, 32); // xoffset
        writer.push(offset as u32, 32); // yoffset
        writer.push_bit(true);
    }
    let dir = writer.finish();

    assert_eq!(
        decode_direction(&dir, 2),
        Err(DecodeError::Format(FormatError::CanvasTooLarge))
    );

    // The same direction embedded in a whole file fails the same way and
    // leaves the decoder usable.
    let file = build_file(2, &[dir]);
    let mut dcc = Dcc::new(Cursor::new(file));
    dcc.decode().unwrap();
    assert_eq!(
        dcc.read_direction(0).unwrap_err(),
        DecodeError::Format(FormatError::CanvasTooLarge)
    );
    assert_eq!(dcc.direction_count().unwrap(), 1);
}

#[test]
fn decode_direction_is_usable_standalone() {
    // The per-direction entry point works over a bare byte range, which
    // is what concurrent per-direction decoding builds on.
    let dir = build_direction(2, &[0, 31, 42], &[0, 1, 2, 2]);
    let direction = decode_direction(&dir, 2).unwrap();
    assert_eq!(direction.frames[0].data, vec![0, 31, 42, 42]);
}
