//! Error types for the bitstream library.

use std::fmt;

/// Errors that can occur while preparing a stream for the hardware decoder.
///
/// Variants map to specific failure modes across the crate:
///
/// - **Configuration record**: [`ConfigTooShort`](Self::ConfigTooShort),
///   [`ReservedLengthSize`](Self::ReservedLengthSize),
///   [`TruncatedConfig`](Self::TruncatedConfig). The stream has no usable
///   AVCC conversion.
/// - **Access unit**: [`TruncatedLengthPrefix`](Self::TruncatedLengthPrefix),
///   [`NalOverrun`](Self::NalOverrun). Only the current unit is lost.
/// - **Stream open**: [`ExtradataTooShort`](Self::ExtradataTooShort),
///   [`Unsupported`](Self::Unsupported),
///   [`SoftwareDecodingRequested`](Self::SoftwareDecodingRequested).
/// - **Resources**: [`SlotOutOfRange`](Self::SlotOutOfRange),
///   [`MemoryTableFull`](Self::MemoryTableFull),
///   [`BufferOverrun`](Self::BufferOverrun).
#[derive(Debug, thiserror::Error)]
pub enum BitstreamError {
    /// The AVC decoder configuration record is shorter than its fixed header.
    #[error("configuration record too short: {len} bytes")]
    ConfigTooShort { len: usize },

    /// `lengthSizeMinusOne` encodes a 3-byte NAL length prefix, which H.264 forbids.
    #[error("reserved NAL length size (3 bytes)")]
    ReservedLengthSize,

    /// A count or parameter set in the configuration record runs past its end.
    #[error("truncated configuration record: {kind}")]
    TruncatedConfig { kind: ConfigErrorKind },

    /// Fewer than `length_size` bytes remain where a NAL length prefix was expected.
    #[error("truncated NAL length prefix at offset {offset}")]
    TruncatedLengthPrefix { offset: usize },

    /// A NAL unit declares more bytes than the access unit holds.
    #[error("NAL unit at offset {offset} declares {declared} bytes, {remaining} remaining")]
    NalOverrun {
        offset: usize,
        declared: usize,
        remaining: usize,
    },

    /// Codec extradata is missing or too small to describe the stream.
    #[error("extradata too short: {len} bytes (need {min})")]
    ExtradataTooShort { len: usize, min: usize },

    /// The hardware decoder cannot handle this codec or codec tag.
    #[error("unsupported stream: {0}")]
    Unsupported(String),

    /// The stream hints ask for software decoding.
    #[error("software decoding requested")]
    SoftwareDecodingRequested,

    /// Output slot index beyond the slot table.
    #[error("output slot {index} out of range (capacity {capacity})")]
    SlotOutOfRange { index: usize, capacity: usize },

    /// The decoder memory table already holds the maximum number of blocks.
    #[error("decoder memory table full ({capacity} blocks)")]
    MemoryTableFull { capacity: usize },

    /// A buffer offset would leave the described region.
    #[error("offset {offset} outside buffer of {size} bytes")]
    BufferOverrun { offset: usize, size: usize },
}

/// Which part of the configuration record was cut short.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigErrorKind {
    /// The SPS or PPS count byte is missing.
    MissingCount(ParameterSetKind),
    /// The 2-byte size field of a parameter set is cut short.
    SizeField(ParameterSetKind, usize),
    /// The parameter set payload is shorter than its declared size.
    Payload(ParameterSetKind, usize),
}

/// Sequence or picture parameter set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterSetKind {
    Sps,
    Pps,
}

impl fmt::Display for ParameterSetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sps => write!(f, "SPS"),
            Self::Pps => write!(f, "PPS"),
        }
    }
}

impl fmt::Display for ConfigErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingCount(kind) => write!(f, "missing {kind} count"),
            Self::SizeField(kind, index) => write!(f, "{kind} #{index} size field cut short"),
            Self::Payload(kind, index) => write!(f, "{kind} #{index} payload cut short"),
        }
    }
}

/// Convenience alias for `Result<T, BitstreamError>`.
pub type Result<T> = std::result::Result<T, BitstreamError>;
