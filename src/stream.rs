//! Per-stream input filter in front of the hardware decoder.
//!
//! [`StreamFilter::open`] inspects the demuxer's stream hints once: it picks
//! the [`DecoderFormat`] and, for H.264, decides whether access units arrive
//! in AVCC form (extradata is an `avcC` record, version byte `1`) and must be
//! rewritten to Annex B, or are already Annex B and pass through untouched.
//!
//! [`StreamFilter::filter`] is then called for every demuxed packet. A packet
//! that cannot be converted is dropped rather than handed to the decoder.

use std::borrow::Cow;

use crate::codec::{CodecId, DecoderFormat, fourcc_to_string};
use crate::error::{BitstreamError, Result};
use crate::h264::ConversionContext;

/// `configurationVersion` of an `avcC` record.
const AVCC_VERSION: u8 = 1;

/// Stream filter configuration.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Shortest H.264 extradata accepted at open time. Anything shorter is
    /// neither a usable `avcC` record nor in-band parameter sets.
    pub min_extradata_len: usize,
    /// Re-arm parameter-set injection after every non-IDR slice so the next
    /// IDR picture carries SPS/PPS again. When `false`, only the first IDR
    /// picture (and the first one after [`StreamFilter::reset`]) gets them.
    pub rearm_on_non_idr: bool,
    /// Hex-dump the extradata at `debug` level on open.
    pub log_extradata: bool,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            min_extradata_len: 7,
            rearm_on_non_idr: true,
            log_extradata: false,
        }
    }
}

/// What the demuxer knows about a stream at open time.
#[derive(Debug, Clone, Copy)]
pub struct StreamHints<'a> {
    pub codec: CodecId,
    /// FourCC codec tag, little-endian (see [`crate::codec::fourcc`]).
    pub codec_tag: u32,
    /// Codec private data from the container.
    pub extradata: &'a [u8],
    /// The player asked for software decoding.
    pub software: bool,
}

impl<'a> StreamHints<'a> {
    pub fn new(codec: CodecId, extradata: &'a [u8]) -> Self {
        Self {
            codec,
            codec_tag: 0,
            extradata,
            software: false,
        }
    }
}

/// Access-unit framing of the stream.
#[derive(Debug)]
pub enum Framing {
    /// Packets go to the decoder as-is.
    Passthrough,
    /// Packets are AVCC and get rewritten to Annex B.
    Avcc(ConversionContext),
}

/// Packet counters, for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterStats {
    pub converted: u64,
    pub passed_through: u64,
    pub dropped: u64,
}

/// Input filter for one elementary stream.
#[derive(Debug)]
pub struct StreamFilter {
    format: DecoderFormat,
    framing: Framing,
    stats: FilterStats,
}

impl StreamFilter {
    /// Open a stream for hardware decoding.
    ///
    /// Fails when software decoding was requested, the codec is not handled
    /// by the hardware, or H.264 extradata is missing or shorter than
    /// [`StreamConfig::min_extradata_len`]. An `avcC` record that cannot be
    /// parsed does not fail the open: conversion is disabled and packets pass
    /// through.
    pub fn open(hints: &StreamHints<'_>, config: &StreamConfig) -> Result<Self> {
        if hints.software {
            tracing::info!("software decoding requested, skipping hardware decoder");
            return Err(BitstreamError::SoftwareDecodingRequested);
        }

        let tag = fourcc_to_string(hints.codec_tag);
        tracing::debug!(
            codec = ?hints.codec,
            tag = tag.as_deref().unwrap_or("-"),
            extradata_len = hints.extradata.len(),
            "opening stream"
        );
        if config.log_extradata && !hints.extradata.is_empty() {
            tracing::debug!(extradata = %hex(hints.extradata), "stream extradata");
        }

        let format = DecoderFormat::select(hints.codec, hints.codec_tag)?;

        let framing = if format.needs_bitstream_filter() {
            Self::h264_framing(hints.extradata, config)?
        } else {
            Framing::Passthrough
        };

        tracing::info!(
            format = %format,
            converting = matches!(framing, Framing::Avcc(_)),
            "stream opened"
        );

        Ok(Self {
            format,
            framing,
            stats: FilterStats::default(),
        })
    }

    fn h264_framing(extradata: &[u8], config: &StreamConfig) -> Result<Framing> {
        if extradata.len() < config.min_extradata_len {
            tracing::info!(
                len = extradata.len(),
                min = config.min_extradata_len,
                "avcC data too small or missing"
            );
            return Err(BitstreamError::ExtradataTooShort {
                len: extradata.len(),
                min: config.min_extradata_len,
            });
        }

        if extradata.first() != Some(&AVCC_VERSION) {
            // Annex B extradata: parameter sets travel in band already.
            return Ok(Framing::Passthrough);
        }

        match ConversionContext::from_avcc(extradata) {
            Ok(ctx) => Ok(Framing::Avcc(ctx.with_rearm_on_non_idr(config.rearm_on_non_idr))),
            Err(e) => {
                tracing::warn!(error = %e, "avcC record unusable, passing packets through");
                Ok(Framing::Passthrough)
            }
        }
    }

    pub fn format(&self) -> DecoderFormat {
        self.format
    }

    pub fn framing(&self) -> &Framing {
        &self.framing
    }

    /// Whether packets are rewritten from AVCC to Annex B.
    pub fn is_converting(&self) -> bool {
        matches!(self.framing, Framing::Avcc(_))
    }

    pub fn stats(&self) -> FilterStats {
        self.stats
    }

    /// Prepare one demuxed packet for the decoder.
    ///
    /// Returns `None` for an empty packet or one that failed conversion;
    /// the caller skips it and continues with the next packet.
    pub fn filter<'a>(&mut self, packet: &'a [u8]) -> Option<Cow<'a, [u8]>> {
        if packet.is_empty() {
            return None;
        }

        match &mut self.framing {
            Framing::Passthrough => {
                self.stats.passed_through += 1;
                Some(Cow::Borrowed(packet))
            }
            Framing::Avcc(ctx) => match ctx.convert(packet) {
                Ok(converted) => {
                    self.stats.converted += 1;
                    Some(Cow::Owned(converted))
                }
                Err(e) => {
                    self.stats.dropped += 1;
                    tracing::error!(
                        error = %e,
                        packet_len = packet.len(),
                        dropped = self.stats.dropped,
                        "bitstream convert error, dropping access unit"
                    );
                    None
                }
            },
        }
    }

    /// Forget decoder-side state after a flush or seek: the next IDR picture
    /// gets the parameter sets again.
    pub fn reset(&mut self) {
        if let Framing::Avcc(ctx) = &mut self.framing {
            ctx.rearm();
            tracing::debug!("parameter-set injection re-armed");
        }
    }
}

fn hex(data: &[u8]) -> String {
    data.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::fourcc;

    const AVCC: [u8; 19] = [
        0x01, 0x42, 0x00, 0x1e, 0xff, 0xe1, // header, one SPS
        0x00, 0x04, 0x67, 0x42, 0x00, 0x1e, // SPS
        0x01, // one PPS
        0x00, 0x04, 0x68, 0xce, 0x38, 0x80, // PPS
    ];

    fn h264_filter(extradata: &[u8], config: &StreamConfig) -> Result<StreamFilter> {
        StreamFilter::open(&StreamHints::new(CodecId::H264, extradata), config)
    }

    #[test]
    fn default_config() {
        let config = StreamConfig::default();
        assert_eq!(config.min_extradata_len, 7);
        assert!(config.rearm_on_non_idr);
        assert!(!config.log_extradata);
    }

    #[test]
    fn avcc_extradata_enables_conversion() {
        let filter = h264_filter(&AVCC, &StreamConfig::default()).unwrap();
        assert!(filter.is_converting());
        assert_eq!(filter.format(), DecoderFormat::Avc);
    }

    #[test]
    fn annex_b_extradata_passes_through() {
        let extradata = [0x00, 0x00, 0x00, 0x01, 0x67, 0x42, 0x00, 0x1e];
        let mut filter = h264_filter(&extradata, &StreamConfig::default()).unwrap();
        assert!(!filter.is_converting());

        let packet = [0x00, 0x00, 0x00, 0x01, 0x65, 0x88];
        let out = filter.filter(&packet).unwrap();
        assert!(matches!(out, Cow::Borrowed(_)));
        assert_eq!(&*out, &packet[..]);
        assert_eq!(filter.stats().passed_through, 1);
    }

    #[test]
    fn short_extradata_rejected() {
        let err = h264_filter(&AVCC[..6], &StreamConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            BitstreamError::ExtradataTooShort { len: 6, min: 7 }
        ));
        assert!(h264_filter(&[], &StreamConfig::default()).is_err());
    }

    #[test]
    fn empty_extradata_without_minimum_passes_through() {
        let config = StreamConfig {
            min_extradata_len: 0,
            ..StreamConfig::default()
        };
        let filter = h264_filter(&[], &config).unwrap();
        assert!(!filter.is_converting());
        assert_eq!(filter.format(), DecoderFormat::Avc);
    }

    #[test]
    fn broken_avcc_falls_back_to_passthrough() {
        let mut extradata = AVCC;
        extradata[4] = 0xfe; // 3-byte length size
        let filter = h264_filter(&extradata, &StreamConfig::default()).unwrap();
        assert!(!filter.is_converting());
    }

    #[test]
    fn software_request_rejected() {
        let mut hints = StreamHints::new(CodecId::H264, &AVCC);
        hints.software = true;
        assert!(matches!(
            StreamFilter::open(&hints, &StreamConfig::default()),
            Err(BitstreamError::SoftwareDecodingRequested)
        ));
    }

    #[test]
    fn non_h264_codecs_pass_through() {
        let mut hints = StreamHints::new(CodecId::Mpeg4, &[]);
        hints.codec_tag = fourcc(b"XVID");
        let filter = StreamFilter::open(&hints, &StreamConfig::default()).unwrap();
        assert_eq!(filter.format(), DecoderFormat::Xvid);
        assert!(!filter.is_converting());
    }

    #[test]
    fn empty_packet_is_skipped() {
        let mut filter = h264_filter(&AVCC, &StreamConfig::default()).unwrap();
        assert!(filter.filter(&[]).is_none());
        assert_eq!(filter.stats(), FilterStats::default());
    }

    #[test]
    fn bad_packet_dropped_and_counted() {
        let mut filter = h264_filter(&AVCC, &StreamConfig::default()).unwrap();
        assert!(filter.filter(&[0x00, 0x00, 0x00, 0x10, 0x65]).is_none());
        assert_eq!(filter.stats().dropped, 1);

        let out = filter.filter(&[0x00, 0x00, 0x00, 0x01, 0x41]).unwrap();
        assert_eq!(&*out, &[0x00, 0x00, 0x00, 0x01, 0x41][..]);
        assert_eq!(filter.stats().converted, 1);
    }

    #[test]
    fn rearm_setting_reaches_context() {
        let config = StreamConfig {
            rearm_on_non_idr: false,
            ..StreamConfig::default()
        };
        let mut filter = h264_filter(&AVCC, &config).unwrap();
        filter.filter(&[0x00, 0x00, 0x00, 0x01, 0x65]).unwrap();
        filter.filter(&[0x00, 0x00, 0x00, 0x01, 0x41]).unwrap();

        let Framing::Avcc(ctx) = filter.framing() else {
            panic!("expected AVCC framing");
        };
        assert!(!ctx.first_idr());

        filter.reset();
        let Framing::Avcc(ctx) = filter.framing() else {
            panic!("expected AVCC framing");
        };
        assert!(ctx.first_idr());
    }

    #[test]
    fn hex_dump() {
        assert_eq!(hex(&[0x01, 0xab, 0x00]), "01ab00");
    }
}
