//! Error types for DCC decoding.

use core::fmt;

/// The main error type for DCC decoding operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// The underlying byte source failed.
    Io(IoError),
    /// The data does not form a valid DCC file.
    Format(FormatError),
    /// A bit cursor ran past the end of its buffer.
    Bounds(BoundsError),
    /// The decoder was used outside its contract.
    State(StateError),
}

/// Errors raised by the underlying byte source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoError {
    /// Reading or seeking the source failed.
    Source(std::io::ErrorKind),
}

/// Errors related to the file and direction structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatError {
    /// The source is shorter than the fixed header and offset table.
    Truncated,
    /// The header declares zero directions.
    NoDirections,
    /// The header declares more than 255 frames per direction.
    TooManyFrames,
    /// The reserved header bytes are not zero.
    ReservedBytes,
    /// The file is too large for the 32-bit offset table.
    FileTooLarge,
    /// The direction offset table is not non-decreasing.
    OffsetsNotSorted,
    /// A frame width or height exceeds the sanity bound.
    FrameTooLarge,
    /// The union of the frame extents exceeds the canvas area bound.
    CanvasTooLarge,
    /// A frame's optional data runs past the end of its direction.
    OptionalDataOverrun,
    /// A declared sub-bitstream length runs past the end of its direction.
    StreamOverrun,
    /// A pixel is recoded but the pixel value table is empty.
    NoPixelValues,
    /// A pixel code is outside the pixel value table.
    PixelCodeOutOfRange,
}

/// Errors related to bit-level reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundsError {
    /// A sub-bitstream was exhausted mid-decode.
    BitOverrun,
}

/// Programmer-contract violations, distinct from data errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateError {
    /// `decode` was called on an already-decoded instance.
    AlreadyDecoded,
    /// The decoder was queried before a successful `decode`.
    NotDecoded,
    /// A direction index is outside the decoded direction count.
    DirectionOutOfRange,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "{e}"),
            Self::Format(e) => write!(f, "{e}"),
            Self::Bounds(e) => write!(f, "{e}"),
            Self::State(e) => write!(f, "{e}"),
        }
    }
}

impl fmt::Display for IoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Source(kind) => write!(f, "byte source failed: {kind}"),
        }
    }
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truncated => write!(f, "source shorter than the declared structure"),
            Self::NoDirections => write!(f, "header declares zero directions"),
            Self::TooManyFrames => write!(f, "more than 255 frames per direction"),
            Self::ReservedBytes => write!(f, "reserved header bytes must be zero"),
            Self::FileTooLarge => write!(f, "file too large for 32-bit offsets"),
            Self::OffsetsNotSorted => write!(f, "direction offsets are not non-decreasing"),
            Self::FrameTooLarge => write!(f, "frame dimension exceeds sanity bound"),
            Self::CanvasTooLarge => write!(f, "direction canvas exceeds the area bound"),
            Self::OptionalDataOverrun => write!(f, "optional frame data runs past the direction"),
            Self::StreamOverrun => write!(f, "sub-bitstream runs past the direction"),
            Self::NoPixelValues => write!(f, "pixel recoded with an empty pixel value table"),
            Self::PixelCodeOutOfRange => write!(f, "pixel code outside the pixel value table"),
        }
    }
}

impl fmt::Display for BoundsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BitOverrun => write!(f, "bit cursor ran past the end of the buffer"),
        }
    }
}

impl fmt::Display for StateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyDecoded => write!(f, "decode called twice on one instance"),
            Self::NotDecoded => write!(f, "decoder queried before a successful decode"),
            Self::DirectionOutOfRange => write!(f, "direction index out of range"),
        }
    }
}

impl core::error::Error for DecodeError {}
impl core::error::Error for IoError {}
impl core::error::Error for FormatError {}
impl core::error::Error for BoundsError {}
impl core::error::Error for StateError {}

impl From<IoError> for DecodeError {
    fn from(e: IoError) -> Self {
        Self::Io(e)
    }
}

impl From<FormatError> for DecodeError {
    fn from(e: FormatError) -> Self {
        Self::Format(e)
    }
}

impl From<BoundsError> for DecodeError {
    fn from(e: BoundsError) -> Self {
        Self::Bounds(e)
    }
}

impl From<StateError> for DecodeError {
    fn from(e: StateError) -> Self {
        Self::State(e)
    }
}

impl From<std::io::Error> for DecodeError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(IoError::Source(e.kind()))
    }
}

/// Result type for DCC decoding operations.
pub type Result<T> = core::result::Result<T, DecodeError>;

macro_rules! bail {
    ($err:expr) => {
        return Err($err.into())
    };
}

pub(crate) use bail;
