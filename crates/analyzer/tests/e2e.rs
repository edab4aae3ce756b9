//! End-to-end: resource dir on disk → bootstrap → inspector → report → NDJSON.

use nalu_analyzer::sink::json_stream::JsonStreamSink;
use nalu_analyzer::{launch, Report, StreamInspector};
use nalu_core::{NalType, NaluError};
use nalu_provider::{AssetProvider, AssetRef, RawResourceProvider, ResourceId};
use std::time::Duration;
use tempfile::TempDir;

const SPS_HIGH_1080P: [u8; 23] = [
    0x67, 0x64, 0x00, 0x28, 0xAC, 0xD9, 0x40, 0x78, 0x02, 0x27, 0xE5, 0x84, 0x00, 0x00, 0x03,
    0x00, 0x04, 0x00, 0x00, 0x03, 0x00, 0xCA, 0x10,
];
const PPS: [u8; 4] = [0x68, 0xEB, 0xE3, 0xCB];
const AUD: [u8; 2] = [0x09, 0xF0];

/// Two GOPs of 4 and 3 pictures; every picture after the first is split
/// into two slices.
fn encoded_stream() -> Vec<u8> {
    let mut out = Vec::new();
    let mut nal = |start_code: &[u8], body: &[u8]| {
        out.extend_from_slice(start_code);
        out.extend_from_slice(body);
    };

    nal(&[0, 0, 0, 1], &AUD);
    nal(&[0, 0, 0, 1], &SPS_HIGH_1080P);
    nal(&[0, 0, 0, 1], &PPS);
    nal(&[0, 0, 1], &[0x65, 0x88, 0x84, 0x00, 0x33]);
    for gop_len in [4, 3] {
        if gop_len == 3 {
            nal(&[0, 0, 0, 1], &AUD);
            nal(&[0, 0, 1], &[0x65, 0x88, 0x80, 0x21]);
        }
        for _ in 1..gop_len {
            // first_mb_in_slice 0, then 2 (ue "011").
            nal(&[0, 0, 1], &[0x41, 0x9A, 0x10, 0x77]);
            nal(&[0, 0, 1], &[0x41, 0x66, 0x20, 0x55]);
        }
    }
    out
}

#[tokio::test]
async fn inspects_bundled_resource() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("output.h264"), encoded_stream()).unwrap();
    std::fs::write(dir.path().join("intro.h264"), [0u8, 0, 1, 0x09, 0xF0]).unwrap();
    std::fs::write(dir.path().join(".hidden"), b"skip me").unwrap();

    let provider = RawResourceProvider::open(dir.path()).unwrap();
    assert_eq!(provider.table().len(), 2);

    // Ids follow sorted names: intro, output.
    let output_id = ResourceId(0x7f0f_0001);
    assert_eq!(provider.table().by_name("output").unwrap().id, output_id);

    let handle = launch(&provider, &AssetRef::Id(output_id), None, StreamInspector::new).unwrap();
    assert_eq!(handle.asset(), "output");
    let summary = handle.join().await.unwrap();

    assert_eq!(summary.total_bytes, encoded_stream().len());
    assert_eq!(summary.count(NalType::AccessUnitDelimiter), 2);
    assert_eq!(summary.count(NalType::IdrSlice), 2);
    assert_eq!(summary.count(NalType::NonIdrSlice), 10);
    assert_eq!(summary.gop_lengths, [4, 3]);
    assert_eq!(summary.leading_pictures, 0);

    assert_eq!(summary.sps.len(), 1);
    let sps = &summary.sps[0].sps;
    assert_eq!((sps.width(), sps.height()), (1920, 1080));
    assert_eq!(sps.frame_rate(), Some(25.0));

    let report = Report::build("output", &summary, Duration::from_millis(1));
    assert!(report.render().contains("1920x1080"));

    let (row, types, sps_rows) = report.to_rows();
    let mut buf = Vec::new();
    let mut sink = JsonStreamSink::new(&mut buf);
    sink.write_summary(&row).unwrap();
    sink.write_nal_types(&types).unwrap();
    sink.write_sps(&sps_rows).unwrap();
    let written = sink.finish().unwrap();

    assert_eq!(written, 1 + types.len() + 1);
    let text = String::from_utf8(buf).unwrap();
    let last: serde_json::Value = serde_json::from_str(text.lines().last().unwrap()).unwrap();
    assert_eq!(last["profile"], "High");
    assert_eq!(last["level"], "4");
}

#[tokio::test]
async fn unknown_asset_fails_before_start() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("output.h264"), encoded_stream()).unwrap();
    let provider = RawResourceProvider::open(dir.path()).unwrap();

    let result = launch(
        &provider,
        &AssetRef::Name("missing".into()),
        None,
        StreamInspector::new,
    );
    assert!(matches!(result, Err(NaluError::Asset(_))));
}
