//! Row export for inspection reports.
//!
//! Three row schemas:
//! - [`StreamSummaryRow`]: one per inspected asset
//! - [`NalTypeRow`]: one per NAL unit type present in the stream
//! - [`SpsRow`]: one per sequence parameter set, denormalized
//!
//! Rows are written as newline-delimited JSON by [`json_stream::JsonStreamSink`].

pub mod json_stream;

use crate::reporter::Report;
use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};

// ---------------------------------------------------------------------------
// Serializable row types
// ---------------------------------------------------------------------------

/// One row per inspected asset.
#[derive(Debug, Clone, Serialize)]
pub struct StreamSummaryRow {
    pub asset: String,
    pub total_bytes: u64,
    pub nal_count: u64,
    pub sps_count: u32,
    pub gop_count: u32,
    pub mean_gop: Option<f64>,
    pub max_gop: Option<u32>,
    pub leading_pictures: u32,
    pub leading_garbage: u64,
    pub total_time_ms: u64,
    pub created_at_ms: u64,
}

/// One row per NAL unit type seen in the stream.
#[derive(Debug, Clone, Serialize)]
pub struct NalTypeRow {
    pub asset: String,
    pub nal_unit_type: u8,
    pub label: String,
    pub count: u64,
    /// count / nal_count, rounded to 4 decimals.
    pub share: f64,
    pub created_at_ms: u64,
}

/// One row per SPS.
#[derive(Debug, Clone, Serialize)]
pub struct SpsRow {
    pub asset: String,
    pub offset: u64,
    pub sps_id: u32,
    pub profile_idc: u8,
    pub profile: String,
    pub level: String,
    pub width: u64,
    pub height: u64,
    pub chroma_format: String,
    pub bit_depth_luma: u32,
    pub bit_depth_chroma: u32,
    pub poc_type: u32,
    pub max_num_ref_frames: u32,
    pub frame_rate: Option<f64>,
    pub created_at_ms: u64,
}

// ---------------------------------------------------------------------------
// Builder: Report → Rows
// ---------------------------------------------------------------------------

impl Report {
    /// Flatten the report into sink-ready rows.
    pub fn to_rows(&self) -> (StreamSummaryRow, Vec<NalTypeRow>, Vec<SpsRow>) {
        let now = now_ms();

        let summary = StreamSummaryRow {
            asset: self.asset.clone(),
            total_bytes: self.total_bytes as u64,
            nal_count: self.nal_count as u64,
            sps_count: self.streams.len() as u32,
            gop_count: self.gop_count as u32,
            mean_gop: self.mean_gop,
            max_gop: self.max_gop,
            leading_pictures: self.leading_pictures,
            leading_garbage: self.leading_garbage as u64,
            total_time_ms: self.total_time.as_millis() as u64,
            created_at_ms: now,
        };

        let nal_types = self
            .nal_types
            .iter()
            .map(|t| {
                let share = if self.nal_count == 0 {
                    0.0
                } else {
                    t.count as f64 / self.nal_count as f64
                };
                NalTypeRow {
                    asset: self.asset.clone(),
                    nal_unit_type: t.nal_type.code(),
                    label: t.nal_type.label().to_string(),
                    count: t.count as u64,
                    share: (share * 10_000.0).round() / 10_000.0,
                    created_at_ms: now,
                }
            })
            .collect();

        let sps = self
            .streams
            .iter()
            .map(|s| SpsRow {
                asset: self.asset.clone(),
                offset: s.offset as u64,
                sps_id: s.sps_id,
                profile_idc: s.profile_idc,
                profile: s.profile.clone(),
                level: s.level.clone(),
                width: s.width,
                height: s.height,
                chroma_format: s.chroma.to_string(),
                bit_depth_luma: s.bit_depth_luma,
                bit_depth_chroma: s.bit_depth_chroma,
                poc_type: s.poc_type,
                max_num_ref_frames: s.ref_frames,
                frame_rate: s.frame_rate,
                created_at_ms: now,
            })
            .collect();

        (summary, nal_types, sps)
    }
}

/// Milliseconds since the Unix epoch; 0 if the clock is before it.
fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::StreamInspector;
    use std::time::Duration;

    #[test]
    fn flattens_report() {
        let stream = [
            0x00, 0x00, 0x00, 0x01, 0x67, 0x42, 0xC0, 0x1E, 0xDA, 0x02, 0x80, 0xF6, 0x40, //
            0x00, 0x00, 0x01, 0x65, 0x88, 0x84, //
            0x00, 0x00, 0x01, 0x41, 0x9A, 0x02, //
            0x00, 0x00, 0x01, 0x41, 0x9A, 0x04,
        ];
        let summary = StreamInspector::inspect_bytes(&stream).unwrap();
        let report = Report::build("output", &summary, Duration::from_millis(12));
        let (row, types, sps) = report.to_rows();

        assert_eq!(row.asset, "output");
        assert_eq!(row.nal_count, 4);
        assert_eq!(row.sps_count, 1);
        assert_eq!(row.total_time_ms, 12);
        assert_eq!(row.mean_gop, Some(3.0));

        assert_eq!(types.len(), 3);
        assert_eq!(types[0].nal_unit_type, 1);
        assert_eq!(types[0].share, 0.5);
        let total: u64 = types.iter().map(|t| t.count).sum();
        assert_eq!(total, 4);

        assert_eq!(sps.len(), 1);
        assert_eq!(sps[0].offset, 4);
        assert_eq!(sps[0].chroma_format, "4:2:0");
        assert_eq!(sps[0].created_at_ms, row.created_at_ms);
    }
}
