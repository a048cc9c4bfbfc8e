use std::fmt;

/// 4-byte Annex B start code, used for the first NAL of a buffer and for
/// every injected parameter set.
pub const START_CODE_4: [u8; 4] = [0, 0, 0, 1];

/// 3-byte Annex B start code, used for every later NAL of a buffer.
pub const START_CODE_3: [u8; 3] = [0, 0, 1];

/// H.264 NAL unit type (ITU-T H.264 Table 7-1).
///
/// The type lives in the low 5 bits of the one-byte NAL header:
///
/// ```text
/// +---+-------+-----------+
/// | F |  NRI  |   Type    |
/// +---+-------+-----------+
///   1     2         5
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NalUnitType {
    Unspecified,
    /// Coded slice of a non-IDR picture.
    NonIdrSlice,
    SliceDataA,
    SliceDataB,
    SliceDataC,
    /// Coded slice of an IDR picture.
    IdrSlice,
    Sei,
    Sps,
    Pps,
    AccessUnitDelimiter,
    EndOfSequence,
    EndOfStream,
    FillerData,
    SpsExtension,
    PrefixNal,
    SubsetSps,
    AuxiliarySlice,
    SliceExtension,
    /// Reserved or unspecified type id (16–18, 21–31).
    Other(u8),
}

impl NalUnitType {
    /// Classify a NAL from its header byte.
    pub fn from_header(header: u8) -> Self {
        Self::from_type_id(header & 0x1f)
    }

    pub fn from_type_id(type_id: u8) -> Self {
        match type_id {
            0 => Self::Unspecified,
            1 => Self::NonIdrSlice,
            2 => Self::SliceDataA,
            3 => Self::SliceDataB,
            4 => Self::SliceDataC,
            5 => Self::IdrSlice,
            6 => Self::Sei,
            7 => Self::Sps,
            8 => Self::Pps,
            9 => Self::AccessUnitDelimiter,
            10 => Self::EndOfSequence,
            11 => Self::EndOfStream,
            12 => Self::FillerData,
            13 => Self::SpsExtension,
            14 => Self::PrefixNal,
            15 => Self::SubsetSps,
            19 => Self::AuxiliarySlice,
            20 => Self::SliceExtension,
            other => Self::Other(other),
        }
    }

    pub fn type_id(&self) -> u8 {
        match self {
            Self::Unspecified => 0,
            Self::NonIdrSlice => 1,
            Self::SliceDataA => 2,
            Self::SliceDataB => 3,
            Self::SliceDataC => 4,
            Self::IdrSlice => 5,
            Self::Sei => 6,
            Self::Sps => 7,
            Self::Pps => 8,
            Self::AccessUnitDelimiter => 9,
            Self::EndOfSequence => 10,
            Self::EndOfStream => 11,
            Self::FillerData => 12,
            Self::SpsExtension => 13,
            Self::PrefixNal => 14,
            Self::SubsetSps => 15,
            Self::AuxiliarySlice => 19,
            Self::SliceExtension => 20,
            Self::Other(id) => *id,
        }
    }

    /// Whether the NAL carries coded picture data (types 1–5).
    pub fn is_vcl(&self) -> bool {
        matches!(
            self,
            Self::NonIdrSlice
                | Self::SliceDataA
                | Self::SliceDataB
                | Self::SliceDataC
                | Self::IdrSlice
        )
    }

    pub fn is_idr(&self) -> bool {
        matches!(self, Self::IdrSlice)
    }

    pub fn is_parameter_set(&self) -> bool {
        matches!(self, Self::Sps | Self::Pps)
    }
}

impl fmt::Display for NalUnitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unspecified => write!(f, "Unspecified"),
            Self::NonIdrSlice => write!(f, "Slice"),
            Self::SliceDataA => write!(f, "SliceDPA"),
            Self::SliceDataB => write!(f, "SliceDPB"),
            Self::SliceDataC => write!(f, "SliceDPC"),
            Self::IdrSlice => write!(f, "IDR"),
            Self::Sei => write!(f, "SEI"),
            Self::Sps => write!(f, "SPS"),
            Self::Pps => write!(f, "PPS"),
            Self::AccessUnitDelimiter => write!(f, "AUD"),
            Self::EndOfSequence => write!(f, "EndOfSeq"),
            Self::EndOfStream => write!(f, "EndOfStream"),
            Self::FillerData => write!(f, "Filler"),
            Self::SpsExtension => write!(f, "SPSExt"),
            Self::PrefixNal => write!(f, "Prefix"),
            Self::SubsetSps => write!(f, "SubsetSPS"),
            Self::AuxiliarySlice => write!(f, "AuxSlice"),
            Self::SliceExtension => write!(f, "SliceExt"),
            Self::Other(id) => write!(f, "Other({id})"),
        }
    }
}
