//! Human-readable inspection report.
//!
//! Takes a [`StreamSummary`] and produces a report with profile names,
//! a NAL type histogram, per-SPS stream parameters and GOP statistics.

use nalu_core::{NalType, StreamSummary};
use nalu_provider::profiles;
use std::time::Duration;

/// Report produced from one inspection run.
#[derive(Debug)]
pub struct Report {
    pub asset: String,
    pub total_bytes: usize,
    pub nal_count: usize,
    pub leading_garbage: usize,
    /// Sorted by count descending, then by type code.
    pub nal_types: Vec<NalTypeCount>,
    pub streams: Vec<StreamParams>,
    pub gop_count: usize,
    pub mean_gop: Option<f64>,
    pub max_gop: Option<u32>,
    pub leading_pictures: u32,
    pub total_time: Duration,
}

#[derive(Debug, Clone)]
pub struct NalTypeCount {
    pub nal_type: NalType,
    pub count: usize,
}

/// Parameters of one SPS, ready for display.
#[derive(Debug, Clone)]
pub struct StreamParams {
    pub offset: usize,
    pub sps_id: u32,
    pub profile_idc: u8,
    pub profile: String,
    pub level: String,
    pub width: u64,
    pub height: u64,
    pub chroma: &'static str,
    pub bit_depth_luma: u32,
    pub bit_depth_chroma: u32,
    pub poc_type: u32,
    pub ref_frames: u32,
    pub frame_rate: Option<f64>,
}

impl Report {
    pub fn build(asset: &str, summary: &StreamSummary, total_time: Duration) -> Self {
        let mut nal_types: Vec<NalTypeCount> = summary
            .nal_type_counts
            .iter()
            .map(|(&code, &count)| NalTypeCount {
                nal_type: NalType::from_code(code),
                count,
            })
            .collect();
        nal_types.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then(a.nal_type.code().cmp(&b.nal_type.code()))
        });

        let streams = summary
            .sps
            .iter()
            .map(|record| {
                let sps = &record.sps;
                StreamParams {
                    offset: record.offset,
                    sps_id: sps.seq_parameter_set_id,
                    profile_idc: sps.profile_idc,
                    profile: profiles::describe(sps.profile_idc, sps.constraint_flags),
                    level: sps.level(),
                    width: sps.width(),
                    height: sps.height(),
                    chroma: sps.chroma_format().map_or("unknown", |c| c.label()),
                    bit_depth_luma: sps.bit_depth_luma(),
                    bit_depth_chroma: sps.bit_depth_chroma(),
                    poc_type: sps.pic_order_cnt.type_id(),
                    ref_frames: sps.max_num_ref_frames,
                    frame_rate: sps.frame_rate(),
                }
            })
            .collect();

        Report {
            asset: asset.to_string(),
            total_bytes: summary.total_bytes,
            nal_count: summary.nal_count,
            leading_garbage: summary.leading_garbage,
            nal_types,
            streams,
            gop_count: summary.gop_lengths.len(),
            mean_gop: summary.mean_gop(),
            max_gop: summary.max_gop(),
            leading_pictures: summary.leading_pictures,
            total_time,
        }
    }

    /// Render the report as a boxed text block.
    pub fn render(&self) -> String {
        let mut out = String::new();

        out.push('\n');
        out.push_str("╔══════════════════════════════════════════════════════════════╗\n");
        out.push_str("║                   NALU INSPECTION REPORT                     ║\n");
        out.push_str("╠══════════════════════════════════════════════════════════════╣\n");
        out.push_str(&row("Asset:", &self.asset));
        out.push_str(&row("Bytes:", &self.total_bytes.to_string()));
        out.push_str(&row("NAL units:", &self.nal_count.to_string()));
        if self.leading_garbage > 0 {
            out.push_str(&row("Leading garbage:", &format!("{} bytes", self.leading_garbage)));
        }
        out.push_str(&row("GOPs:", &self.gop_count.to_string()));
        out.push_str(&row(
            "Mean GOP:",
            &self.mean_gop.map_or("-".into(), |g| format!("{g:.2}")),
        ));
        out.push_str(&row(
            "Max GOP:",
            &self.max_gop.map_or("-".into(), |g| g.to_string()),
        ));
        if self.leading_pictures > 0 {
            out.push_str(&row("Pre-IDR pictures:", &self.leading_pictures.to_string()));
        }
        out.push_str(&row("Total time:", &format!("{:?}", self.total_time)));
        out.push_str("╠══════════════════════════════════════════════════════════════╣\n");

        if self.nal_count == 0 {
            out.push_str("║  No NAL units found.                                         ║\n");
            out.push_str("╚══════════════════════════════════════════════════════════════╝\n");
            return out;
        }

        out.push_str("║  NAL UNIT TYPES                                              ║\n");
        out.push_str("╠══════════════════════════════════════════════════════════════╣\n");
        for t in &self.nal_types {
            let share = t.count as f64 * 100.0 / self.nal_count as f64;
            out.push_str(&row(
                &format!("{:>2} {}", t.nal_type.code(), t.nal_type.label()),
                &format!("{} ({share:.1}%)", t.count),
            ));
        }

        out.push_str("╠══════════════════════════════════════════════════════════════╣\n");
        if self.streams.is_empty() {
            out.push_str("║  No sequence parameter sets.                                 ║\n");
        } else {
            out.push_str("║  SEQUENCE PARAMETER SETS                                     ║\n");
            out.push_str("╠══════════════════════════════════════════════════════════════╣\n");
            for (i, s) in self.streams.iter().enumerate() {
                out.push_str("║                                                              ║\n");
                out.push_str(&line(&format!(
                    "  {}. SPS #{} at byte {}",
                    i + 1,
                    s.sps_id,
                    s.offset
                )));
                out.push_str(&line(&format!(
                    "     {} @ L{} | {}x{} | {} {}-bit",
                    s.profile, s.level, s.width, s.height, s.chroma, s.bit_depth_luma
                )));
                out.push_str(&line(&format!(
                    "     POC type {} | refs {} | fps {}",
                    s.poc_type,
                    s.ref_frames,
                    s.frame_rate.map_or("-".into(), |f| format!("{f:.3}"))
                )));
            }
        }

        out.push_str("╚══════════════════════════════════════════════════════════════╝\n");
        out
    }
}

/// Columns between the two vertical borders.
const INNER_WIDTH: usize = 62;

fn row(label: &str, value: &str) -> String {
    line(&format!("  {label:<20}{value:>39} "))
}

/// One bordered line; text past the box width is cut.
fn line(text: &str) -> String {
    let text: String = text.chars().take(INNER_WIDTH).collect();
    format!("║{text:<INNER_WIDTH$}║\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::StreamInspector;

    const STREAM: &[u8] = &[
        0x00, 0x00, 0x00, 0x01, 0x67, 0x42, 0xC0, 0x1E, 0xDA, 0x02, 0x80, 0xF6, 0x40, //
        0x00, 0x00, 0x01, 0x65, 0x88, 0x84, //
        0x00, 0x00, 0x01, 0x41, 0x9A, 0x02, //
        0x00, 0x00, 0x01, 0x41, 0x9A, 0x04,
    ];

    #[test]
    fn builds_from_summary() {
        let summary = StreamInspector::inspect_bytes(STREAM).unwrap();
        let report = Report::build("output", &summary, Duration::from_millis(3));

        assert_eq!(report.nal_count, 4);
        assert_eq!(report.nal_types[0].nal_type, NalType::NonIdrSlice);
        assert_eq!(report.nal_types[0].count, 2);
        // Equal counts fall back to type code order.
        assert_eq!(report.nal_types[1].nal_type, NalType::IdrSlice);
        assert_eq!(report.nal_types[2].nal_type, NalType::Sps);
        assert_eq!(report.gop_count, 1);
        assert_eq!(report.max_gop, Some(3));

        let s = &report.streams[0];
        assert_eq!(s.profile, "Constrained Baseline");
        assert_eq!(s.level, "3");
        assert_eq!((s.width, s.height), (640, 480));
        assert_eq!(s.chroma, "4:2:0");
    }

    #[test]
    fn renders_sections() {
        let summary = StreamInspector::inspect_bytes(STREAM).unwrap();
        let text = Report::build("output", &summary, Duration::ZERO).render();

        assert!(text.contains("NALU INSPECTION REPORT"));
        assert!(text.contains("output"));
        assert!(text.contains("NAL UNIT TYPES"));
        assert!(text.contains("640x480"));
        assert!(text.contains("Constrained Baseline"));
    }

    #[test]
    fn every_line_is_boxed() {
        let summary = StreamInspector::inspect_bytes(STREAM).unwrap();
        let mut report = Report::build("output", &summary, Duration::from_millis(7));
        report.streams[0].profile = "A profile name long enough to run past the box edge".into();

        for text in report.render().lines().filter(|l| !l.is_empty()) {
            assert_eq!(text.chars().count(), INNER_WIDTH + 2, "{text}");
            let last = text.chars().last().unwrap();
            assert!(matches!(last, '║' | '╗' | '╣' | '╝'), "{text}");
        }
    }

    #[test]
    fn renders_empty_stream() {
        let text = Report::build("empty", &StreamSummary::default(), Duration::ZERO).render();
        assert!(text.contains("No NAL units found."));
        assert!(!text.contains("NAL UNIT TYPES"));
    }
}
