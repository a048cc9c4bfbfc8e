use super::config::{AvcDecoderConfig, LengthSize};
use super::nal::{NalUnitType, START_CODE_3, START_CODE_4};
use crate::error::{BitstreamError, Result};

/// Per-stream AVCC → Annex B conversion state.
///
/// Built once from the stream's `avcC` record, then fed every access unit
/// in decode order. The only state that changes between calls is the
/// `first_idr` flag, which decides whether the next IDR slice gets the
/// parameter sets injected in front of it.
#[derive(Debug, Clone)]
pub struct ConversionContext {
    length_size: LengthSize,
    first_idr: bool,
    sps_pps: Vec<u8>,
    rearm_on_non_idr: bool,
}

impl ConversionContext {
    /// Parse `avcC` extradata and flatten its parameter sets.
    ///
    /// Fails on a record shorter than 6 bytes, a reserved 3-byte length
    /// size, or a parameter set that runs past the end of the record. A
    /// failure means the stream has no AVCC conversion available.
    pub fn from_avcc(extradata: &[u8]) -> Result<Self> {
        let config = AvcDecoderConfig::parse(extradata)?;
        Ok(Self::from_config(&config))
    }

    pub fn from_config(config: &AvcDecoderConfig) -> Self {
        let sps_pps = config.annex_b_parameter_sets();

        tracing::debug!(
            length_size = config.length_size.bytes(),
            sps = config.sps.len(),
            pps = config.pps.len(),
            parameter_set_bytes = sps_pps.len(),
            "AVCC conversion context created"
        );

        Self {
            length_size: config.length_size,
            first_idr: true,
            sps_pps,
            rearm_on_non_idr: true,
        }
    }

    /// Whether a non-IDR slice re-arms parameter-set injection for the next
    /// IDR slice. Enabled by default.
    pub fn with_rearm_on_non_idr(mut self, enabled: bool) -> Self {
        self.rearm_on_non_idr = enabled;
        self
    }

    pub fn length_size(&self) -> LengthSize {
        self.length_size
    }

    /// `true` while the next IDR slice still needs the parameter sets.
    pub fn first_idr(&self) -> bool {
        self.first_idr
    }

    /// Flattened Annex B parameter sets injected ahead of IDR slices.
    pub fn parameter_sets(&self) -> &[u8] {
        &self.sps_pps
    }

    /// Inject the parameter sets again before the next IDR slice, e.g.
    /// after the decoder has been flushed.
    pub fn rearm(&mut self) {
        self.first_idr = true;
    }

    /// Convert one AVCC access unit into a new Annex B buffer.
    ///
    /// Each length prefix becomes a start code (4 bytes for the first entry
    /// of the buffer, 3 bytes after that). The parameter sets go in front of
    /// the first IDR slice while `first_idr` is set.
    ///
    /// On error nothing is returned and `first_idr` is left as it was before
    /// the call; the caller should drop the unit and carry on with the next.
    pub fn convert(&mut self, access_unit: &[u8]) -> Result<Vec<u8>> {
        let first_idr = self.first_idr;
        let result = self.convert_units(access_unit);
        if result.is_err() {
            self.first_idr = first_idr;
        }
        result
    }

    fn convert_units(&mut self, access_unit: &[u8]) -> Result<Vec<u8>> {
        let prefix_len = self.length_size.bytes();
        let mut out = Vec::with_capacity(access_unit.len() + self.sps_pps.len() + 16);
        let mut pos = 0usize;
        let mut nal_count = 0usize;

        loop {
            if access_unit.len() - pos < prefix_len {
                return Err(BitstreamError::TruncatedLengthPrefix { offset: pos });
            }
            let nal_size = self.length_size.read(&access_unit[pos..]);
            let nal_start = pos + prefix_len;

            let remaining = access_unit.len() - nal_start;
            if nal_size > remaining {
                return Err(BitstreamError::NalOverrun {
                    offset: pos,
                    declared: nal_size,
                    remaining,
                });
            }

            let nal = &access_unit[nal_start..nal_start + nal_size];
            let unit_type = nal
                .first()
                .map_or(NalUnitType::Unspecified, |&header| {
                    NalUnitType::from_header(header)
                });

            if self.first_idr && unit_type.is_idr() {
                append_nal(&mut out, Some(self.sps_pps.as_slice()), nal);
                self.first_idr = false;
            } else {
                append_nal(&mut out, None, nal);
                if self.rearm_on_non_idr
                    && !self.first_idr
                    && unit_type == NalUnitType::NonIdrSlice
                {
                    self.first_idr = true;
                }
            }

            nal_count += 1;
            pos = nal_start + nal_size;
            if pos >= access_unit.len() {
                break;
            }
        }

        tracing::trace!(
            nal_count,
            in_bytes = access_unit.len(),
            out_bytes = out.len(),
            first_idr = self.first_idr,
            "access unit converted"
        );

        Ok(out)
    }
}

/// Append one entry to a growing Annex B buffer.
///
/// The first entry of an empty buffer gets `00 00 00 01`, later entries
/// `00 00 01`. `parameter_sets`, when given, is copied as-is ahead of the
/// NAL's start code; the start code width is decided before it is written.
pub fn append_nal(out: &mut Vec<u8>, parameter_sets: Option<&[u8]>, nal: &[u8]) {
    let start_code: &[u8] = if out.is_empty() {
        &START_CODE_4
    } else {
        &START_CODE_3
    };
    let parameter_sets = parameter_sets.unwrap_or_default();

    out.reserve(parameter_sets.len() + start_code.len() + nal.len());
    out.extend_from_slice(parameter_sets);
    out.extend_from_slice(start_code);
    out.extend_from_slice(nal);
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPS: [u8; 4] = [0x67, 0x42, 0x00, 0x1e];
    const PPS: [u8; 3] = [0x68, 0xce, 0x38];
    const IDR: [u8; 5] = [0x65, 0x88, 0x84, 0x00, 0x33];
    const SLICE: [u8; 3] = [0x41, 0x9a, 0x02];
    const SEI: [u8; 2] = [0x06, 0x05];

    fn avcc_config(length_byte: u8) -> Vec<u8> {
        let mut out = vec![0x01, 0x42, 0x00, 0x1e, length_byte, 0xe1];
        out.extend_from_slice(&(SPS.len() as u16).to_be_bytes());
        out.extend_from_slice(&SPS);
        out.push(1);
        out.extend_from_slice(&(PPS.len() as u16).to_be_bytes());
        out.extend_from_slice(&PPS);
        out
    }

    fn avcc_unit(length_size: usize, nals: &[&[u8]]) -> Vec<u8> {
        let mut out = Vec::new();
        for nal in nals {
            let len = (nal.len() as u32).to_be_bytes();
            out.extend_from_slice(&len[4 - length_size..]);
            out.extend_from_slice(nal);
        }
        out
    }

    fn context() -> ConversionContext {
        ConversionContext::from_avcc(&avcc_config(0xff)).unwrap()
    }

    fn parameter_sets() -> Vec<u8> {
        [&START_CODE_4[..], &SPS[..], &START_CODE_4[..], &PPS[..]].concat()
    }

    #[test]
    fn init_sets_first_idr_and_blob() {
        let ctx = context();
        assert!(ctx.first_idr());
        assert_eq!(ctx.length_size(), LengthSize::Four);
        assert_eq!(ctx.parameter_sets(), parameter_sets().as_slice());
        assert_eq!(ctx.parameter_sets().len(), (4 + SPS.len()) + (4 + PPS.len()));
    }

    #[test]
    fn init_rejects_short_config() {
        assert!(matches!(
            ConversionContext::from_avcc(&[0x01, 0x42, 0x00]),
            Err(BitstreamError::ConfigTooShort { len: 3 })
        ));
        assert!(ConversionContext::from_avcc(&[]).is_err());
    }

    #[test]
    fn init_rejects_three_byte_length() {
        assert!(matches!(
            ConversionContext::from_avcc(&avcc_config(0xfe)),
            Err(BitstreamError::ReservedLengthSize)
        ));
    }

    #[test]
    fn idr_gets_parameter_sets() {
        let mut ctx = context();
        let out = ctx.convert(&avcc_unit(4, &[&IDR[..]])).unwrap();

        let expected = [parameter_sets().as_slice(), &START_CODE_4[..], &IDR[..]].concat();
        assert_eq!(out, expected);
        assert_eq!(out.len(), 4 + SPS.len() + 4 + PPS.len() + 4 + IDR.len());
        assert!(out.starts_with(&START_CODE_4));
        assert!(!ctx.first_idr());
    }

    #[test]
    fn later_nals_use_three_byte_start_code() {
        let mut ctx = context();
        let out = ctx.convert(&avcc_unit(4, &[&IDR[..], &IDR[..]])).unwrap();

        // Only the first IDR slice of the picture carries the parameter sets.
        let expected = [
            parameter_sets().as_slice(),
            &START_CODE_4[..],
            &IDR[..],
            &START_CODE_3[..],
            &IDR[..],
        ]
        .concat();
        assert_eq!(out, expected);
    }

    #[test]
    fn parameter_sets_follow_leading_sei() {
        let mut ctx = context();
        let out = ctx.convert(&avcc_unit(4, &[&SEI[..], &IDR[..]])).unwrap();

        let expected = [
            &START_CODE_4[..],
            &SEI[..],
            parameter_sets().as_slice(),
            &START_CODE_3[..],
            &IDR[..],
        ]
        .concat();
        assert_eq!(out, expected);
    }

    #[test]
    fn non_idr_after_idr_has_no_parameter_sets() {
        let mut ctx = context();
        ctx.convert(&avcc_unit(4, &[&IDR[..]])).unwrap();

        let out = ctx.convert(&avcc_unit(4, &[&SLICE[..]])).unwrap();
        assert_eq!(out, [&START_CODE_4[..], &SLICE[..]].concat());
        // The non-IDR slice re-arms injection for the next IDR.
        assert!(ctx.first_idr());

        let out = ctx.convert(&avcc_unit(4, &[&IDR[..]])).unwrap();
        assert!(out.starts_with(&parameter_sets()));
    }

    #[test]
    fn slice_inside_unit_rearms_for_later_idr() {
        let mut ctx = context();
        let out = ctx.convert(&avcc_unit(4, &[&IDR[..], &SLICE[..], &IDR[..]])).unwrap();

        // The slice re-arms mid-unit, so the second IDR gets SPS/PPS again,
        // written ahead of its 3-byte start code.
        let expected = [
            parameter_sets().as_slice(),
            &START_CODE_4[..],
            &IDR[..],
            &START_CODE_3[..],
            &SLICE[..],
            parameter_sets().as_slice(),
            &START_CODE_3[..],
            &IDR[..],
        ]
        .concat();
        assert_eq!(out, expected);
        assert!(!ctx.first_idr());
    }

    #[test]
    fn rearm_heuristic_can_be_disabled() {
        let mut ctx = context().with_rearm_on_non_idr(false);
        ctx.convert(&avcc_unit(4, &[&IDR[..]])).unwrap();
        ctx.convert(&avcc_unit(4, &[&SLICE[..]])).unwrap();
        assert!(!ctx.first_idr());

        let out = ctx.convert(&avcc_unit(4, &[&IDR[..]])).unwrap();
        assert_eq!(out, [&START_CODE_4[..], &IDR[..]].concat());

        ctx.rearm();
        let out = ctx.convert(&avcc_unit(4, &[&IDR[..]])).unwrap();
        assert!(out.starts_with(&parameter_sets()));
    }

    #[test]
    fn non_idr_before_any_idr_passes_through() {
        let mut ctx = context();
        let out = ctx.convert(&avcc_unit(4, &[&SLICE[..]])).unwrap();
        assert_eq!(out, [&START_CODE_4[..], &SLICE[..]].concat());
        assert!(ctx.first_idr());
    }

    #[test]
    fn one_and_two_byte_prefixes() {
        let mut ctx = ConversionContext::from_avcc(&avcc_config(0xfc)).unwrap();
        let out = ctx.convert(&avcc_unit(1, &[&SLICE[..], &SEI[..]])).unwrap();
        assert_eq!(
            out,
            [&START_CODE_4[..], &SLICE[..], &START_CODE_3[..], &SEI[..]].concat()
        );

        let mut ctx = ConversionContext::from_avcc(&avcc_config(0xfd)).unwrap();
        let out = ctx.convert(&avcc_unit(2, &[&IDR[..]])).unwrap();
        assert_eq!(out.len(), parameter_sets().len() + 4 + IDR.len());
    }

    #[test]
    fn nal_overrun_fails() {
        let mut ctx = context();
        let mut unit = avcc_unit(4, &[&SLICE[..]]);
        unit[3] = 0x40;
        let err = ctx.convert(&unit).unwrap_err();
        assert!(matches!(
            err,
            BitstreamError::NalOverrun {
                offset: 0,
                declared: 0x40,
                remaining: 3
            }
        ));
    }

    #[test]
    fn truncated_prefix_fails() {
        let mut ctx = context();
        let mut unit = avcc_unit(4, &[&SLICE[..]]);
        unit.extend_from_slice(&[0x00, 0x00]);
        assert!(matches!(
            ctx.convert(&unit),
            Err(BitstreamError::TruncatedLengthPrefix { offset: 7 })
        ));
    }

    #[test]
    fn empty_unit_fails() {
        let mut ctx = context();
        assert!(matches!(
            ctx.convert(&[]),
            Err(BitstreamError::TruncatedLengthPrefix { offset: 0 })
        ));
    }

    #[test]
    fn failure_keeps_first_idr() {
        let mut ctx = context();
        // IDR converts fine, then the trailing NAL overruns.
        let mut unit = avcc_unit(4, &[&IDR[..]]);
        unit.extend_from_slice(&[0x00, 0x00, 0x00, 0x09, 0x41]);
        assert!(ctx.convert(&unit).is_err());
        assert!(ctx.first_idr());
    }

    #[test]
    fn zero_length_nal() {
        let mut ctx = context();
        let out = ctx.convert(&avcc_unit(4, &[&[0u8; 0][..], &SLICE[..]])).unwrap();
        assert_eq!(
            out,
            [&START_CODE_4[..], &START_CODE_3[..], &SLICE[..]].concat()
        );
    }

    #[test]
    fn append_nal_start_codes() {
        let mut out = Vec::new();
        append_nal(&mut out, None, &[0xaa]);
        append_nal(&mut out, Some(&[0xee, 0xff][..]), &[0xbb]);
        assert_eq!(out, vec![0, 0, 0, 1, 0xaa, 0xee, 0xff, 0, 0, 1, 0xbb]);
    }
}
