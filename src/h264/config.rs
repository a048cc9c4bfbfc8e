use base64::prelude::{BASE64_STANDARD, Engine as _};

use super::nal::START_CODE_4;
use crate::error::{BitstreamError, ConfigErrorKind, ParameterSetKind, Result};

/// Size of the big-endian length prefix in front of every AVCC NAL unit.
///
/// Encoded as `lengthSizeMinusOne` in the low 2 bits of byte 4 of the
/// configuration record. A 3-byte prefix is reserved and has no variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthSize {
    One,
    Two,
    Four,
}

impl LengthSize {
    /// Decode from the `lengthSizeMinusOne` byte (upper 6 bits are reserved
    /// and ignored).
    pub fn from_config_byte(byte: u8) -> Result<Self> {
        match byte & 0x03 {
            0 => Ok(Self::One),
            1 => Ok(Self::Two),
            3 => Ok(Self::Four),
            _ => Err(BitstreamError::ReservedLengthSize),
        }
    }

    /// Prefix width in bytes.
    pub fn bytes(self) -> usize {
        match self {
            Self::One => 1,
            Self::Two => 2,
            Self::Four => 4,
        }
    }

    /// Read a big-endian NAL size from the start of `prefix`.
    ///
    /// # Panics
    ///
    /// Panics if `prefix` is shorter than [`bytes`](Self::bytes).
    pub fn read(self, prefix: &[u8]) -> usize {
        prefix[..self.bytes()]
            .iter()
            .fold(0usize, |acc, &b| (acc << 8) | b as usize)
    }
}

/// Parsed `AVCDecoderConfigurationRecord` (ISO/IEC 14496-15 §5.3.3.1).
///
/// ```text
/// byte 0     configurationVersion (1)
/// byte 1     AVCProfileIndication
/// byte 2     profile_compatibility
/// byte 3     AVCLevelIndication
/// byte 4     111111xx   lengthSizeMinusOne
/// byte 5     111xxxxx   numOfSequenceParameterSets
///            { u16 size, size bytes } * numOfSequenceParameterSets
///            u8 numOfPictureParameterSets
///            { u16 size, size bytes } * numOfPictureParameterSets
/// ```
///
/// The version byte is recorded but not validated here; [`crate::stream`]
/// decides whether the extradata is AVCC at all.
#[derive(Debug, Clone)]
pub struct AvcDecoderConfig {
    pub version: u8,
    pub profile_idc: u8,
    pub profile_compatibility: u8,
    pub level_idc: u8,
    pub length_size: LengthSize,
    /// SPS payloads in record order, without size fields.
    pub sps: Vec<Vec<u8>>,
    /// PPS payloads in record order, without size fields.
    pub pps: Vec<Vec<u8>>,
}

impl AvcDecoderConfig {
    /// Fixed header plus the SPS count byte.
    pub const MIN_LEN: usize = 6;

    /// Parse a configuration record.
    ///
    /// A record with no SPS is accepted: the byte after the zero SPS count
    /// is then the PPS count.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < Self::MIN_LEN {
            return Err(BitstreamError::ConfigTooShort { len: data.len() });
        }

        let length_size = LengthSize::from_config_byte(data[4])?;

        let sps_count = (data[5] & 0x1f) as usize;
        let mut pos = Self::MIN_LEN;
        let sps = read_parameter_sets(data, &mut pos, sps_count, ParameterSetKind::Sps)?;

        let pps_count = *data
            .get(pos)
            .ok_or(BitstreamError::TruncatedConfig {
                kind: ConfigErrorKind::MissingCount(ParameterSetKind::Pps),
            })? as usize;
        pos += 1;
        let pps = read_parameter_sets(data, &mut pos, pps_count, ParameterSetKind::Pps)?;

        if pos < data.len() {
            // High-profile records may append chroma/bit-depth fields and SPS extensions.
            tracing::trace!(trailing = data.len() - pos, "ignoring avcC trailing bytes");
        }

        Ok(Self {
            version: data[0],
            profile_idc: data[1],
            profile_compatibility: data[2],
            level_idc: data[3],
            length_size,
            sps,
            pps,
        })
    }

    /// All SPS then all PPS, each behind a 4-byte start code, as one buffer.
    ///
    /// Its length is the sum of `4 + len` over every parameter set.
    pub fn annex_b_parameter_sets(&self) -> Vec<u8> {
        let total: usize = self
            .sps
            .iter()
            .chain(&self.pps)
            .map(|set| START_CODE_4.len() + set.len())
            .sum();

        let mut out = Vec::with_capacity(total);
        for set in self.sps.iter().chain(&self.pps) {
            out.extend_from_slice(&START_CODE_4);
            out.extend_from_slice(set);
        }
        out
    }

    /// `profile-level-id` for an SDP fmtp line (RFC 6184 §8.1).
    pub fn profile_level_id(&self) -> String {
        format!(
            "{:02x}{:02x}{:02x}",
            self.profile_idc, self.profile_compatibility, self.level_idc
        )
    }

    /// `sprop-parameter-sets` for an SDP fmtp line (RFC 6184 §8.1):
    /// base64 of every SPS then every PPS, comma separated.
    ///
    /// `None` when the record carries no parameter sets.
    pub fn sprop_parameter_sets(&self) -> Option<String> {
        if self.sps.is_empty() && self.pps.is_empty() {
            return None;
        }
        let encoded: Vec<String> = self
            .sps
            .iter()
            .chain(&self.pps)
            .map(|set| BASE64_STANDARD.encode(set))
            .collect();
        Some(encoded.join(","))
    }
}

fn read_parameter_sets(
    data: &[u8],
    pos: &mut usize,
    count: usize,
    kind: ParameterSetKind,
) -> Result<Vec<Vec<u8>>> {
    let mut sets = Vec::with_capacity(count);

    for index in 0..count {
        let size_field = data
            .get(*pos..*pos + 2)
            .ok_or(BitstreamError::TruncatedConfig {
                kind: ConfigErrorKind::SizeField(kind, index),
            })?;
        let size = u16::from_be_bytes([size_field[0], size_field[1]]) as usize;
        *pos += 2;

        let payload = data
            .get(*pos..*pos + size)
            .ok_or(BitstreamError::TruncatedConfig {
                kind: ConfigErrorKind::Payload(kind, index),
            })?;
        sets.push(payload.to_vec());
        *pos += size;
    }

    Ok(sets)
}
