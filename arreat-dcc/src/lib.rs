/*!
A memory-safe, pure-Rust decoder for the DCC sprite animation format.

DCC stores one animated sprite as a set of *directions* (facings), each an
ordered sequence of palette-indexed *frames*. Frames within a direction are
delta-encoded against the previous frame at the granularity of small cells,
with per-pixel change masks and a compact per-direction pixel code table,
all packed into bit-level sub-streams. This crate decodes that format into
plain `width * height` palette-index buffers; mapping those indices through
a 256-entry RGB palette is the consumer's job.

# Example
```rust,no_run
use arreat_dcc::Dcc;

let mut dcc = Dcc::open("sprite.dcc").unwrap();
dcc.decode().unwrap();

let direction = dcc.read_direction(0).unwrap();
println!("{} frames", direction.frames.len());
```

Directions are mutually independent: once the file bytes are in memory,
[`decode_direction`] can run concurrently over disjoint ranges of one
immutable buffer. Frames within a direction are intrinsically sequential
and are always decoded in stored order.

# Safety
This crate forbids unsafe code via a crate-level attribute.
*/

#![forbid(unsafe_code)]
#![allow(missing_docs)]

mod cell;
mod direction;
mod error;
mod frame;
mod header;
mod reader;

pub use direction::{Direction, DirectionHeader, Extents, FrameHeader, decode_direction};
pub use error::{BoundsError, DecodeError, FormatError, IoError, Result, StateError};
pub use frame::DecodedFrame;
pub use header::FileHeader;

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use log::debug;

use crate::error::bail;
use crate::header::{FIXED_HEADER_SIZE, parse_file_header, parse_offset_table};

/// A DCC decoder over a byte source.
///
/// The source only needs to satisfy [`Read`] + [`Seek`]; files and
/// in-memory buffers (via [`std::io::Cursor`]) both qualify. Construction
/// is cheap: nothing is read until [`Dcc::decode`] parses the fixed header
/// and direction offset table, after which directions can be read
/// individually.
#[derive(Debug)]
pub struct Dcc<R> {
    source: R,
    parsed: Option<Parsed>,
}

#[derive(Debug)]
struct Parsed {
    header: FileHeader,
    /// `directions + 1` offsets, terminated by the file size.
    offsets: Vec<u32>,
}

impl Dcc<BufReader<File>> {
    /// Create a decoder reading from the file at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: Read + Seek> Dcc<R> {
    /// Create a decoder over an arbitrary byte source.
    pub fn new(source: R) -> Self {
        Self {
            source,
            parsed: None,
        }
    }

    /// Parse the fixed file header and the direction offset table.
    ///
    /// Must succeed before any other accessor is used; calling it a second
    /// time on the same instance is a contract violation reported as
    /// [`StateError::AlreadyDecoded`].
    pub fn decode(&mut self) -> Result<()> {
        if self.parsed.is_some() {
            bail!(StateError::AlreadyDecoded);
        }

        let size = self.source.seek(SeekFrom::End(0))?;
        // The offset table cannot address anything bigger.
        if size > u32::MAX as u64 {
            bail!(FormatError::FileTooLarge);
        }
        if (size as usize) < FIXED_HEADER_SIZE {
            bail!(FormatError::Truncated);
        }

        self.source.seek(SeekFrom::Start(0))?;
        let mut head = [0; FIXED_HEADER_SIZE];
        self.source.read_exact(&mut head)?;
        let header = parse_file_header(&head)?;

        let table_size = header.directions as usize * 4;
        if (size as usize) < FIXED_HEADER_SIZE + table_size {
            bail!(FormatError::Truncated);
        }
        let mut table = vec![0; table_size];
        self.source.read_exact(&mut table)?;
        let offsets = parse_offset_table(&table, header.directions, size as u32)?;

        debug!(
            "decoded header: {} directions, {} frames each, final size {}",
            header.directions, header.frames_per_direction, header.final_size
        );

        self.parsed = Some(Parsed { header, offsets });
        Ok(())
    }

    /// The parsed file header.
    pub fn header(&self) -> Result<&FileHeader> {
        Ok(&self.parsed()?.header)
    }

    /// Number of directions in the file.
    pub fn direction_count(&self) -> Result<u32> {
        Ok(self.parsed()?.header.directions as u32)
    }

    /// Number of frames in every direction.
    pub fn frames_per_direction(&self) -> Result<u32> {
        Ok(self.parsed()?.header.frames_per_direction)
    }

    /// Byte size of direction `index`.
    pub fn direction_size(&self, index: u32) -> Result<u32> {
        let parsed = self.parsed()?;
        if index >= parsed.header.directions as u32 {
            bail!(StateError::DirectionOutOfRange);
        }

        let index = index as usize;
        Ok(parsed.offsets[index + 1] - parsed.offsets[index])
    }

    /// Read and decode direction `index`.
    ///
    /// The direction's byte range is materialized in memory before any
    /// bit-level read begins. A failure here is scoped to this direction:
    /// previously decoded directions remain valid.
    pub fn read_direction(&mut self, index: u32) -> Result<Direction> {
        let parsed = self.parsed()?;
        if index >= parsed.header.directions as u32 {
            bail!(StateError::DirectionOutOfRange);
        }

        let start = parsed.offsets[index as usize];
        let size = parsed.offsets[index as usize + 1] - start;
        let frames_per_direction = parsed.header.frames_per_direction;

        self.source.seek(SeekFrom::Start(start as u64))?;
        let mut buffer = vec![0; size as usize];
        self.source.read_exact(&mut buffer)?;

        decode_direction(&buffer, frames_per_direction)
    }

    fn parsed(&self) -> Result<&Parsed> {
        self.parsed
            .as_ref()
            .ok_or(DecodeError::State(StateError::NotDecoded))
    }
}
