//! Domain types for the nalu stream inspector.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// NAL framing
// ---------------------------------------------------------------------------

/// `nal_unit_type` from the low five bits of the NAL header byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NalType {
    Unspecified,
    NonIdrSlice,
    PartitionA,
    PartitionB,
    PartitionC,
    IdrSlice,
    Sei,
    Sps,
    Pps,
    AccessUnitDelimiter,
    EndOfSequence,
    EndOfStream,
    Filler,
    SpsExtension,
    Prefix,
    SubsetSps,
    AuxiliarySlice,
    SliceExtension,
    /// Reserved or unspecified codes not listed above.
    Other(u8),
}

impl NalType {
    pub fn from_code(code: u8) -> Self {
        match code & 0x1F {
            0 => NalType::Unspecified,
            1 => NalType::NonIdrSlice,
            2 => NalType::PartitionA,
            3 => NalType::PartitionB,
            4 => NalType::PartitionC,
            5 => NalType::IdrSlice,
            6 => NalType::Sei,
            7 => NalType::Sps,
            8 => NalType::Pps,
            9 => NalType::AccessUnitDelimiter,
            10 => NalType::EndOfSequence,
            11 => NalType::EndOfStream,
            12 => NalType::Filler,
            13 => NalType::SpsExtension,
            14 => NalType::Prefix,
            15 => NalType::SubsetSps,
            19 => NalType::AuxiliarySlice,
            20 => NalType::SliceExtension,
            other => NalType::Other(other),
        }
    }

    pub fn code(self) -> u8 {
        match self {
            NalType::Unspecified => 0,
            NalType::NonIdrSlice => 1,
            NalType::PartitionA => 2,
            NalType::PartitionB => 3,
            NalType::PartitionC => 4,
            NalType::IdrSlice => 5,
            NalType::Sei => 6,
            NalType::Sps => 7,
            NalType::Pps => 8,
            NalType::AccessUnitDelimiter => 9,
            NalType::EndOfSequence => 10,
            NalType::EndOfStream => 11,
            NalType::Filler => 12,
            NalType::SpsExtension => 13,
            NalType::Prefix => 14,
            NalType::SubsetSps => 15,
            NalType::AuxiliarySlice => 19,
            NalType::SliceExtension => 20,
            NalType::Other(code) => code,
        }
    }

    /// Coded slice of a picture (IDR or not).
    #[inline]
    pub fn is_slice(self) -> bool {
        matches!(self, NalType::NonIdrSlice | NalType::IdrSlice)
    }

    pub fn label(self) -> &'static str {
        match self {
            NalType::Unspecified => "unspecified",
            NalType::NonIdrSlice => "non-IDR slice",
            NalType::PartitionA => "partition A",
            NalType::PartitionB => "partition B",
            NalType::PartitionC => "partition C",
            NalType::IdrSlice => "IDR slice",
            NalType::Sei => "SEI",
            NalType::Sps => "SPS",
            NalType::Pps => "PPS",
            NalType::AccessUnitDelimiter => "AUD",
            NalType::EndOfSequence => "end of sequence",
            NalType::EndOfStream => "end of stream",
            NalType::Filler => "filler",
            NalType::SpsExtension => "SPS extension",
            NalType::Prefix => "prefix",
            NalType::SubsetSps => "subset SPS",
            NalType::AuxiliarySlice => "auxiliary slice",
            NalType::SliceExtension => "slice extension",
            NalType::Other(_) => "reserved",
        }
    }
}

/// Decoded NAL header byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NalHeader {
    pub forbidden_zero_bit: bool,
    pub nal_ref_idc: u8,
    pub nal_type: NalType,
}

impl NalHeader {
    #[inline]
    pub fn parse(byte: u8) -> Self {
        Self {
            forbidden_zero_bit: byte & 0x80 != 0,
            nal_ref_idc: (byte >> 5) & 0x03,
            nal_type: NalType::from_code(byte),
        }
    }
}

/// One NAL unit borrowed from an Annex B buffer.
///
/// `data` starts at the header byte and excludes the start code and any
/// trailing zero bytes. It is never empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NalUnit<'a> {
    /// Byte offset of the header byte in the source buffer.
    pub offset: usize,
    /// 3 or 4.
    pub start_code_len: u8,
    pub data: &'a [u8],
}

impl<'a> NalUnit<'a> {
    #[inline]
    pub fn header(&self) -> NalHeader {
        NalHeader::parse(self.data[0])
    }

    #[inline]
    pub fn nal_type(&self) -> NalType {
        NalType::from_code(self.data[0])
    }

    /// Bytes after the header byte (still escaped).
    #[inline]
    pub fn payload(&self) -> &'a [u8] {
        &self.data[1..]
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Hex of the first `n` bytes, for log lines.
    pub fn preview_hex(&self, n: usize) -> String {
        hex::encode(&self.data[..n.min(self.data.len())])
    }
}

// ---------------------------------------------------------------------------
// Sequence parameter set
// ---------------------------------------------------------------------------

/// Chroma sampling from `chroma_format_idc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChromaFormat {
    Monochrome,
    Yuv420,
    Yuv422,
    Yuv444,
}

impl ChromaFormat {
    pub fn from_idc(idc: u32) -> Option<Self> {
        match idc {
            0 => Some(ChromaFormat::Monochrome),
            1 => Some(ChromaFormat::Yuv420),
            2 => Some(ChromaFormat::Yuv422),
            3 => Some(ChromaFormat::Yuv444),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ChromaFormat::Monochrome => "4:0:0",
            ChromaFormat::Yuv420 => "4:2:0",
            ChromaFormat::Yuv422 => "4:2:2",
            ChromaFormat::Yuv444 => "4:4:4",
        }
    }

    /// `(SubWidthC, SubHeightC)`; `None` for monochrome.
    fn subsampling(self) -> Option<(u64, u64)> {
        match self {
            ChromaFormat::Monochrome => None,
            ChromaFormat::Yuv420 => Some((2, 2)),
            ChromaFormat::Yuv422 => Some((2, 1)),
            ChromaFormat::Yuv444 => Some((1, 1)),
        }
    }
}

/// Picture order count mode with its mode-specific fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PicOrderCnt {
    Type0 {
        log2_max_pic_order_cnt_lsb_minus4: u32,
    },
    Type1 {
        delta_pic_order_always_zero_flag: bool,
        offset_for_non_ref_pic: i32,
        offset_for_top_to_bottom_field: i32,
        offset_for_ref_frame: SmallVec<[i32; 8]>,
    },
    Type2,
}

impl PicOrderCnt {
    pub fn type_id(&self) -> u32 {
        match self {
            PicOrderCnt::Type0 { .. } => 0,
            PicOrderCnt::Type1 { .. } => 1,
            PicOrderCnt::Type2 => 2,
        }
    }
}

/// Crop offsets in crop units (not pixels).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameCrop {
    pub left: u32,
    pub right: u32,
    pub top: u32,
    pub bottom: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColourDescription {
    pub colour_primaries: u8,
    pub transfer_characteristics: u8,
    pub matrix_coefficients: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoSignal {
    pub video_format: u8,
    pub video_full_range_flag: bool,
    pub colour: Option<ColourDescription>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingInfo {
    pub num_units_in_tick: u32,
    pub time_scale: u32,
    pub fixed_frame_rate_flag: bool,
}

/// Leading part of `vui_parameters()`; HRD and bitstream restriction are not parsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vui {
    pub aspect_ratio_idc: Option<u8>,
    /// Only set when `aspect_ratio_idc == 255` (Extended_SAR).
    pub sar: Option<(u16, u16)>,
    pub overscan_appropriate_flag: Option<bool>,
    pub video_signal: Option<VideoSignal>,
    /// `(top_field, bottom_field)` chroma sample location types.
    pub chroma_sample_loc: Option<(u32, u32)>,
    pub timing: Option<TimingInfo>,
}

/// Parsed `seq_parameter_set_data()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sps {
    pub profile_idc: u8,
    /// constraint_set0..5 flags (MSB first) followed by `reserved_zero_2bits`.
    pub constraint_flags: u8,
    pub level_idc: u8,
    pub seq_parameter_set_id: u32,

    pub chroma_format_idc: u32,
    pub separate_colour_plane_flag: bool,
    pub bit_depth_luma_minus8: u32,
    pub bit_depth_chroma_minus8: u32,
    pub qpprime_y_zero_transform_bypass_flag: bool,
    pub seq_scaling_matrix_present_flag: bool,
    /// One entry per scaling list (8, or 12 for 4:4:4) when the matrix is present.
    pub seq_scaling_list_present: SmallVec<[bool; 12]>,

    pub log2_max_frame_num_minus4: u32,
    pub pic_order_cnt: PicOrderCnt,
    pub max_num_ref_frames: u32,
    pub gaps_in_frame_num_value_allowed_flag: bool,
    pub pic_width_in_mbs_minus1: u32,
    pub pic_height_in_map_units_minus1: u32,
    pub frame_mbs_only_flag: bool,
    pub mb_adaptive_frame_field_flag: bool,
    pub direct_8x8_inference_flag: bool,
    pub frame_cropping: Option<FrameCrop>,
    pub vui_parameters_present_flag: bool,
    pub vui: Option<Vui>,
}

impl Sps {
    /// `constraint_set{n}_flag` for n in 0..=5.
    #[inline]
    pub fn constraint_set(&self, n: u8) -> bool {
        n < 6 && self.constraint_flags & (0x80 >> n) != 0
    }

    pub fn reserved_zero_2bits(&self) -> u8 {
        self.constraint_flags & 0x03
    }

    pub fn chroma_format(&self) -> Option<ChromaFormat> {
        ChromaFormat::from_idc(self.chroma_format_idc)
    }

    /// `ChromaArrayType`: 0 when colour planes are coded separately.
    pub fn chroma_array_type(&self) -> u32 {
        if self.separate_colour_plane_flag {
            0
        } else {
            self.chroma_format_idc
        }
    }

    pub fn bit_depth_luma(&self) -> u32 {
        self.bit_depth_luma_minus8.saturating_add(8)
    }

    pub fn bit_depth_chroma(&self) -> u32 {
        self.bit_depth_chroma_minus8.saturating_add(8)
    }

    pub fn max_frame_num(&self) -> u64 {
        1u64 << self.log2_max_frame_num_minus4.saturating_add(4).min(63)
    }

    /// `(CropUnitX, CropUnitY)`.
    fn crop_units(&self) -> (u64, u64) {
        let field_factor = if self.frame_mbs_only_flag { 1 } else { 2 };
        let sub = ChromaFormat::from_idc(self.chroma_array_type()).and_then(|c| c.subsampling());
        match sub {
            Some((sub_w, sub_h)) => (sub_w, sub_h * field_factor),
            None => (1, field_factor),
        }
    }

    /// Luma width in pixels after cropping.
    pub fn width(&self) -> u64 {
        let coded = (self.pic_width_in_mbs_minus1 as u64 + 1) * 16;
        match self.frame_cropping {
            Some(crop) => {
                let (unit_x, _) = self.crop_units();
                coded.saturating_sub(unit_x * (crop.left as u64 + crop.right as u64))
            }
            None => coded,
        }
    }

    /// Luma height in pixels after cropping.
    pub fn height(&self) -> u64 {
        let field_factor = if self.frame_mbs_only_flag { 1 } else { 2 };
        let coded = field_factor * (self.pic_height_in_map_units_minus1 as u64 + 1) * 16;
        match self.frame_cropping {
            Some(crop) => {
                let (_, unit_y) = self.crop_units();
                coded.saturating_sub(unit_y * (crop.top as u64 + crop.bottom as u64))
            }
            None => coded,
        }
    }

    /// Frames per second from VUI timing, when signalled.
    pub fn frame_rate(&self) -> Option<f64> {
        let timing = self.vui.as_ref()?.timing?;
        if timing.num_units_in_tick == 0 {
            return None;
        }
        Some(timing.time_scale as f64 / (2.0 * timing.num_units_in_tick as f64))
    }

    /// Display form of the level, e.g. `"3.1"`, `"4"`, `"1b"`.
    pub fn level(&self) -> String {
        let baseline_family = matches!(self.profile_idc, 66 | 77 | 88);
        if self.level_idc == 9 || (self.level_idc == 11 && baseline_family && self.constraint_set(3)) {
            return "1b".to_string();
        }
        match self.level_idc % 10 {
            0 => format!("{}", self.level_idc / 10),
            minor => format!("{}.{}", self.level_idc / 10, minor),
        }
    }
}

// ---------------------------------------------------------------------------
// Stream summary
// ---------------------------------------------------------------------------

/// A parsed SPS and where it sits in the stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpsRecord {
    pub offset: usize,
    pub sps: Sps,
}

/// Everything one inspection run learned about a stream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamSummary {
    pub total_bytes: usize,
    pub nal_count: usize,
    /// Keyed by `nal_unit_type` code.
    pub nal_type_counts: BTreeMap<u8, usize>,
    pub sps: Vec<SpsRecord>,
    /// Pictures per GOP, in stream order.
    pub gop_lengths: Vec<u32>,
    /// Non-IDR pictures seen before the first IDR.
    pub leading_pictures: u32,
    /// Bytes before the first start code.
    pub leading_garbage: usize,
}

impl StreamSummary {
    pub fn count(&self, nal_type: NalType) -> usize {
        self.nal_type_counts
            .get(&nal_type.code())
            .copied()
            .unwrap_or(0)
    }

    pub fn max_gop(&self) -> Option<u32> {
        self.gop_lengths.iter().copied().max()
    }

    pub fn mean_gop(&self) -> Option<f64> {
        if self.gop_lengths.is_empty() {
            return None;
        }
        let total: u64 = self.gop_lengths.iter().map(|&g| g as u64).sum();
        Some(total as f64 / self.gop_lengths.len() as f64)
    }

    pub fn is_empty(&self) -> bool {
        self.nal_count == 0
    }
}
