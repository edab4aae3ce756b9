//! Sequence parameter set parser.
//!
//! Walks `seq_parameter_set_data()` field by field. Scaling lists are
//! consumed (so later fields line up) but not stored; the VUI is read up
//! to and including `timing_info`.

use crate::bitreader::{to_rbsp, BitReader};
use nalu_core::error::{NaluError, NaluResult};
use nalu_core::types::{
    ColourDescription, FrameCrop, NalType, NalUnit, PicOrderCnt, Sps, SpsRecord, TimingInfo,
    VideoSignal, Vui,
};
use nalu_provider::profiles;
use smallvec::SmallVec;

const MAX_SPS_ID: u32 = 31;
const MAX_BIT_DEPTH_MINUS8: u32 = 6;
const MAX_LOG2_MINUS4: u32 = 12;
const MAX_POC_CYCLE: u32 = 255;
const EXTENDED_SAR: u8 = 255;

/// Parses an SPS NAL unit (header byte included).
pub fn parse_sps_unit(unit: &NalUnit<'_>) -> NaluResult<Sps> {
    if unit.nal_type() != NalType::Sps {
        return Err(NaluError::InvalidInput(format!(
            "expected SPS, got nal_unit_type {} at offset {}",
            unit.nal_type().code(),
            unit.offset
        )));
    }
    parse_sps(unit.payload()).map_err(|e| match e {
        NaluError::Bitstream(msg) => {
            NaluError::Bitstream(format!("SPS at offset {}: {msg}", unit.offset))
        }
        other => other,
    })
}

/// Parses a batch of SPS units in parallel. The first failure aborts the batch.
pub fn parse_sps_batch(units: &[NalUnit<'_>]) -> NaluResult<Vec<SpsRecord>> {
    use rayon::prelude::*;

    let results: Vec<NaluResult<SpsRecord>> = units
        .par_iter()
        .map(|unit| {
            parse_sps_unit(unit).map(|sps| SpsRecord {
                offset: unit.offset,
                sps,
            })
        })
        .collect();

    let mut records = Vec::with_capacity(results.len());
    for r in results {
        records.push(r?);
    }
    Ok(records)
}

/// Parses an SPS payload (the bytes after the NAL header, still escaped).
pub fn parse_sps(payload: &[u8]) -> NaluResult<Sps> {
    let rbsp = to_rbsp(payload);
    let mut r = BitReader::new(&rbsp);

    let profile_idc = r.read_u8()?;
    let constraint_flags = r.read_u8()?;
    let level_idc = r.read_u8()?;

    let seq_parameter_set_id = r.read_ue()?;
    if seq_parameter_set_id > MAX_SPS_ID {
        return Err(NaluError::Bitstream(format!(
            "seq_parameter_set_id {seq_parameter_set_id} out of range"
        )));
    }

    // Inferred when the high-profile fields are absent.
    let mut chroma_format_idc = 1;
    let mut separate_colour_plane_flag = false;
    let mut bit_depth_luma_minus8 = 0;
    let mut bit_depth_chroma_minus8 = 0;
    let mut qpprime_y_zero_transform_bypass_flag = false;
    let mut seq_scaling_matrix_present_flag = false;
    let mut seq_scaling_list_present = SmallVec::new();

    if profiles::has_chroma_info(profile_idc) {
        chroma_format_idc = r.read_ue()?;
        if chroma_format_idc > 3 {
            return Err(NaluError::Bitstream(format!(
                "chroma_format_idc {chroma_format_idc} out of range"
            )));
        }
        if chroma_format_idc == 3 {
            separate_colour_plane_flag = r.read_flag()?;
        }
        bit_depth_luma_minus8 = read_bounded(&mut r, "bit_depth_luma_minus8", MAX_BIT_DEPTH_MINUS8)?;
        bit_depth_chroma_minus8 =
            read_bounded(&mut r, "bit_depth_chroma_minus8", MAX_BIT_DEPTH_MINUS8)?;
        qpprime_y_zero_transform_bypass_flag = r.read_flag()?;

        seq_scaling_matrix_present_flag = r.read_flag()?;
        if seq_scaling_matrix_present_flag {
            let lists = if chroma_format_idc != 3 { 8 } else { 12 };
            for i in 0..lists {
                let present = r.read_flag()?;
                if present {
                    skip_scaling_list(&mut r, if i < 6 { 16 } else { 64 })?;
                }
                seq_scaling_list_present.push(present);
            }
        }
    }

    let log2_max_frame_num_minus4 =
        read_bounded(&mut r, "log2_max_frame_num_minus4", MAX_LOG2_MINUS4)?;
    let pic_order_cnt = match r.read_ue()? {
        0 => PicOrderCnt::Type0 {
            log2_max_pic_order_cnt_lsb_minus4: read_bounded(
                &mut r,
                "log2_max_pic_order_cnt_lsb_minus4",
                MAX_LOG2_MINUS4,
            )?,
        },
        1 => {
            let delta_pic_order_always_zero_flag = r.read_flag()?;
            let offset_for_non_ref_pic = r.read_se()?;
            let offset_for_top_to_bottom_field = r.read_se()?;
            let cycle = r.read_ue()?;
            if cycle > MAX_POC_CYCLE {
                return Err(NaluError::Bitstream(format!(
                    "num_ref_frames_in_pic_order_cnt_cycle {cycle} out of range"
                )));
            }
            let mut offset_for_ref_frame = SmallVec::with_capacity(cycle as usize);
            for _ in 0..cycle {
                offset_for_ref_frame.push(r.read_se()?);
            }
            PicOrderCnt::Type1 {
                delta_pic_order_always_zero_flag,
                offset_for_non_ref_pic,
                offset_for_top_to_bottom_field,
                offset_for_ref_frame,
            }
        }
        2 => PicOrderCnt::Type2,
        other => {
            return Err(NaluError::Bitstream(format!(
                "pic_order_cnt_type {other} out of range"
            )))
        }
    };

    let max_num_ref_frames = r.read_ue()?;
    let gaps_in_frame_num_value_allowed_flag = r.read_flag()?;
    let pic_width_in_mbs_minus1 = r.read_ue()?;
    let pic_height_in_map_units_minus1 = r.read_ue()?;

    let frame_mbs_only_flag = r.read_flag()?;
    let mb_adaptive_frame_field_flag = if frame_mbs_only_flag {
        false
    } else {
        r.read_flag()?
    };
    let direct_8x8_inference_flag = r.read_flag()?;

    let frame_cropping = if r.read_flag()? {
        Some(FrameCrop {
            left: r.read_ue()?,
            right: r.read_ue()?,
            top: r.read_ue()?,
            bottom: r.read_ue()?,
        })
    } else {
        None
    };

    let vui_parameters_present_flag = r.read_flag()?;
    let vui = if vui_parameters_present_flag {
        Some(parse_vui_prefix(&mut r)?)
    } else {
        None
    };

    Ok(Sps {
        profile_idc,
        constraint_flags,
        level_idc,
        seq_parameter_set_id,
        chroma_format_idc,
        separate_colour_plane_flag,
        bit_depth_luma_minus8,
        bit_depth_chroma_minus8,
        qpprime_y_zero_transform_bypass_flag,
        seq_scaling_matrix_present_flag,
        seq_scaling_list_present,
        log2_max_frame_num_minus4,
        pic_order_cnt,
        max_num_ref_frames,
        gaps_in_frame_num_value_allowed_flag,
        pic_width_in_mbs_minus1,
        pic_height_in_map_units_minus1,
        frame_mbs_only_flag,
        mb_adaptive_frame_field_flag,
        direct_8x8_inference_flag,
        frame_cropping,
        vui_parameters_present_flag,
        vui,
    })
}

/// `ue(v)` that must not exceed `max`.
fn read_bounded(r: &mut BitReader<'_>, field: &str, max: u32) -> NaluResult<u32> {
    let value = r.read_ue()?;
    if value > max {
        return Err(NaluError::Bitstream(format!(
            "{field} {value} out of range 0..={max}"
        )));
    }
    Ok(value)
}

/// Consumes one delta-coded `scaling_list()` of `size` entries.
fn skip_scaling_list(r: &mut BitReader<'_>, size: usize) -> NaluResult<()> {
    let mut last_scale: i32 = 8;
    let mut next_scale: i32 = 8;
    for _ in 0..size {
        if next_scale != 0 {
            let delta = r.read_se()?;
            if !(-128..=127).contains(&delta) {
                return Err(NaluError::Bitstream(format!(
                    "delta_scale {delta} out of range"
                )));
            }
            next_scale = (last_scale + delta + 256) % 256;
        }
        if next_scale != 0 {
            last_scale = next_scale;
        }
    }
    Ok(())
}

fn parse_vui_prefix(r: &mut BitReader<'_>) -> NaluResult<Vui> {
    let mut vui = Vui::default();

    if r.read_flag()? {
        let idc = r.read_u8()?;
        vui.aspect_ratio_idc = Some(idc);
        if idc == EXTENDED_SAR {
            let sar_width = r.read_bits(16)? as u16;
            let sar_height = r.read_bits(16)? as u16;
            vui.sar = Some((sar_width, sar_height));
        }
    }

    if r.read_flag()? {
        vui.overscan_appropriate_flag = Some(r.read_flag()?);
    }

    if r.read_flag()? {
        let video_format = r.read_bits(3)? as u8;
        let video_full_range_flag = r.read_flag()?;
        let colour = if r.read_flag()? {
            Some(ColourDescription {
                colour_primaries: r.read_u8()?,
                transfer_characteristics: r.read_u8()?,
                matrix_coefficients: r.read_u8()?,
            })
        } else {
            None
        };
        vui.video_signal = Some(VideoSignal {
            video_format,
            video_full_range_flag,
            colour,
        });
    }

    if r.read_flag()? {
        vui.chroma_sample_loc = Some((r.read_ue()?, r.read_ue()?));
    }

    if r.read_flag()? {
        vui.timing = Some(TimingInfo {
            num_units_in_tick: r.read_bits(32)?,
            time_scale: r.read_bits(32)?,
            fixed_frame_rate_flag: r.read_flag()?,
        });
    }

    Ok(vui)
}
