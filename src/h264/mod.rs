//! H.264 bitstream reformatting.
//!
//! Containers in the MP4 family store H.264 in **AVCC** form: each NAL unit
//! is preceded by a big-endian length field of 1, 2 or 4 bytes, and the
//! SPS/PPS live out of band in the `avcC` decoder configuration record.
//! Hardware decoders usually want **Annex B** instead: NAL units delimited
//! by start codes, with the parameter sets in band ahead of each IDR picture.
//!
//! ```text
//! AVCC:    [len][NAL][len][NAL]...
//! Annex B: 00 00 00 01 [SPS] 00 00 00 01 [PPS] 00 00 00 01 [IDR] 00 00 01 [NAL]...
//! ```
//!
//! | Step | Module | Entry point |
//! |------|--------|-------------|
//! | classify NAL headers | [`nal`] | [`NalUnitType::from_header`] |
//! | parse `avcC` once per stream | [`config`] | [`AvcDecoderConfig::parse`] |
//! | convert each access unit | [`convert`] | [`ConversionContext::convert`] |

pub mod config;
pub mod convert;
pub mod nal;

pub use config::{AvcDecoderConfig, LengthSize};
pub use convert::{ConversionContext, append_nal};
pub use nal::{NalUnitType, START_CODE_3, START_CODE_4};
