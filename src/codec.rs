//! Hardware decoder format selection.
//!
//! The demuxer describes a stream by a codec id and, for MPEG-4 Part 2,
//! a FourCC tag naming the encoder family. The VPU wants one concrete
//! bitstream format; this module maps one onto the other and refuses
//! anything the hardware path cannot decode.

use std::fmt;

use crate::error::{BitstreamError, Result};

/// Codec id reported by the demuxer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecId {
    Mpeg2,
    H263,
    H264,
    Vc1,
    Vp8,
    Mpeg4,
    Mjpeg,
    Other(u32),
}

/// Bitstream format understood by the hardware decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderFormat {
    Mpeg2,
    H263,
    Avc,
    Vc1Ap,
    Vp8,
    Divx4,
    Divx56,
    Xvid,
}

/// Build a little-endian FourCC tag, first character in the low byte.
pub const fn fourcc(tag: &[u8; 4]) -> u32 {
    (tag[0] as u32) | (tag[1] as u32) << 8 | (tag[2] as u32) << 16 | (tag[3] as u32) << 24
}

/// Render a FourCC tag when all four bytes are alphanumeric.
pub fn fourcc_to_string(tag: u32) -> Option<String> {
    let bytes = tag.to_le_bytes();
    bytes
        .iter()
        .all(u8::is_ascii_alphanumeric)
        .then(|| bytes.iter().map(|&b| b as char).collect())
}

const DIVX: u32 = fourcc(b"DIVX");
const DX50: u32 = fourcc(b"DX50");
const DIV5: u32 = fourcc(b"DIV5");
const XVID: u32 = fourcc(b"XVID");
const MP4V: u32 = fourcc(b"MP4V");
const PMP4: u32 = fourcc(b"PMP4");
const FMP4: u32 = fourcc(b"FMP4");

impl DecoderFormat {
    /// Pick the decoder format for a stream.
    ///
    /// `codec_tag` only matters for [`CodecId::Mpeg4`].
    pub fn select(codec: CodecId, codec_tag: u32) -> Result<Self> {
        let format = match codec {
            CodecId::Mpeg2 => Self::Mpeg2,
            CodecId::H263 => Self::H263,
            CodecId::H264 => Self::Avc,
            CodecId::Vc1 => Self::Vc1Ap,
            CodecId::Vp8 => Self::Vp8,
            CodecId::Mpeg4 => match codec_tag {
                DIVX => Self::Divx4,
                DX50 | DIV5 => Self::Divx56,
                XVID | MP4V | PMP4 | FMP4 => Self::Xvid,
                other => {
                    let tag = fourcc_to_string(other).unwrap_or_else(|| format!("{other:#010x}"));
                    return Err(BitstreamError::Unsupported(format!(
                        "MPEG-4 codec tag {tag}"
                    )));
                }
            },
            // Needs explicit frame geometry and chroma layout at open time.
            CodecId::Mjpeg => {
                return Err(BitstreamError::Unsupported("MJPEG".to_string()));
            }
            CodecId::Other(id) => {
                return Err(BitstreamError::Unsupported(format!("codec id {id}")));
            }
        };

        tracing::debug!(?codec, format = %format, "decoder format selected");
        Ok(format)
    }

    /// Name reported for the decoder instance.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Mpeg2 => "vpu-mpeg2",
            Self::H263 => "vpu-h263",
            Self::Avc => "vpu-h264",
            Self::Vc1Ap => "vpu-vc1",
            Self::Vp8 => "vpu-vp8",
            Self::Divx4 => "vpu-divx4",
            Self::Divx56 => "vpu-divx5",
            Self::Xvid => "vpu-xvid",
        }
    }

    /// Whether access units may need AVCC → Annex B conversion.
    pub fn needs_bitstream_filter(&self) -> bool {
        matches!(self, Self::Avc)
    }
}

impl fmt::Display for DecoderFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
