//! Decoder-driver capability and the stream inspector that implements it.
//!
//! A driver is built from an [`AssetStream`] and started once. The
//! inspector reads the whole stream on tokio's blocking pool, walks its
//! NAL units, parses every SPS and tracks GOP lengths.

use crate::annexb::AnnexBNalIter;
use crate::gop::GopTracker;
use crate::sps::parse_sps_batch;
use nalu_core::error::{NaluError, NaluResult};
use nalu_core::{NalType, SpsRecord, StreamSummary};
use nalu_provider::{profiles, AssetStream};
use std::io::{ErrorKind, Read};
use std::time::Instant;
use tokio::task::JoinHandle;

/// Read granularity for asset streams.
const READ_CHUNK: usize = 1024;

/// Streams are buffered whole before scanning.
pub const MAX_STREAM_BYTES: u64 = 512 * 1024 * 1024;

/// Something that consumes an opened stream once started.
pub trait DecoderDriver {
    type Handle;

    /// Starts the driver. Takes no arguments beyond the driver itself.
    fn start(self) -> NaluResult<Self::Handle>;
}

/// Driver that inspects an H.264 Annex B stream.
#[derive(Debug)]
pub struct StreamInspector {
    stream: AssetStream,
}

impl StreamInspector {
    pub fn new(stream: AssetStream) -> NaluResult<Self> {
        if let Some(len) = stream.len_hint() {
            if len > MAX_STREAM_BYTES {
                return Err(NaluError::InvalidInput(format!(
                    "asset {} is {len} bytes, limit is {MAX_STREAM_BYTES}",
                    stream.name()
                )));
            }
        }
        Ok(Self { stream })
    }

    /// Runs the inspection on the current thread.
    pub fn run(self) -> NaluResult<StreamSummary> {
        let t0 = Instant::now();
        let mut stream = self.stream;
        let asset = stream.name().to_string();

        let data = read_all(&mut stream)?;
        drop(stream);

        let summary = Self::inspect_bytes(&data)?;
        tracing::info!(
            asset = %asset,
            bytes = summary.total_bytes,
            nals = summary.nal_count,
            sps = summary.sps.len(),
            gops = summary.gop_lengths.len(),
            elapsed_ms = t0.elapsed().as_millis(),
            "inspection complete"
        );
        Ok(summary)
    }

    /// Inspects an in-memory Annex B buffer.
    pub fn inspect_bytes(data: &[u8]) -> NaluResult<StreamSummary> {
        if data.is_empty() {
            tracing::warn!("stream is empty, nothing to inspect");
            return Ok(StreamSummary::default());
        }

        let units = AnnexBNalIter::new(data);
        let leading_garbage = units.leading_garbage();
        if leading_garbage > 0 {
            tracing::warn!(bytes = leading_garbage, "skipped data before first start code");
        }

        let mut summary = StreamSummary {
            total_bytes: data.len(),
            leading_garbage,
            ..StreamSummary::default()
        };
        let mut gop = GopTracker::new();
        let mut sps_units = Vec::new();

        for unit in units {
            let header = unit.header();
            summary.nal_count += 1;
            *summary
                .nal_type_counts
                .entry(header.nal_type.code())
                .or_default() += 1;

            if header.forbidden_zero_bit {
                tracing::warn!(offset = unit.offset, "forbidden_zero_bit set");
            }

            match header.nal_type {
                NalType::NonIdrSlice | NalType::IdrSlice => gop.observe(&unit),
                NalType::Sps => sps_units.push(unit),
                NalType::Pps => {
                    tracing::trace!(offset = unit.offset, head = %unit.preview_hex(4), "pps")
                }
                _ => {}
            }
        }

        summary.sps = parse_sps_batch(&sps_units)?;
        let (gop_lengths, leading_pictures) = gop.finish();
        summary.gop_lengths = gop_lengths;
        summary.leading_pictures = leading_pictures;

        for record in &summary.sps {
            log_sps(record);
        }

        Ok(summary)
    }
}

impl DecoderDriver for StreamInspector {
    type Handle = DriverHandle;

    /// Hands the run to the blocking pool and returns immediately.
    fn start(self) -> NaluResult<DriverHandle> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| NaluError::Internal(format!("no async runtime to start inspector: {e}")))?;

        let asset = self.stream.name().to_string();
        tracing::info!(asset = %asset, "starting inspector");

        let task = runtime.spawn_blocking(move || self.run());
        Ok(DriverHandle { asset, task })
    }
}

/// Running inspection. Dropping the handle detaches the worker.
#[derive(Debug)]
pub struct DriverHandle {
    asset: String,
    task: JoinHandle<NaluResult<StreamSummary>>,
}

impl DriverHandle {
    pub fn asset(&self) -> &str {
        &self.asset
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for the worker and returns its summary.
    pub async fn join(self) -> NaluResult<StreamSummary> {
        self.task
            .await
            .map_err(|e| NaluError::Internal(format!("inspector for {} failed: {e}", self.asset)))?
    }
}

fn read_all(stream: &mut AssetStream) -> NaluResult<Vec<u8>> {
    let capacity = stream.len_hint().unwrap_or(0).min(MAX_STREAM_BYTES) as usize;
    let mut data = Vec::with_capacity(capacity);
    let mut chunk = [0u8; READ_CHUNK];

    loop {
        let n = match stream.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        data.extend_from_slice(&chunk[..n]);
        if data.len() as u64 > MAX_STREAM_BYTES {
            return Err(NaluError::InvalidInput(format!(
                "asset {} exceeds {MAX_STREAM_BYTES} bytes",
                stream.name()
            )));
        }
    }

    tracing::debug!(asset = %stream.name(), bytes = data.len(), "stream read");
    Ok(data)
}

fn log_sps(record: &SpsRecord) {
    let sps = &record.sps;
    tracing::info!(
        offset = record.offset,
        sps_id = sps.seq_parameter_set_id,
        profile = %profiles::describe(sps.profile_idc, sps.constraint_flags),
        level = %sps.level(),
        width = sps.width(),
        height = sps.height(),
        chroma = sps.chroma_format().map_or("?", |c| c.label()),
        bit_depth = sps.bit_depth_luma(),
        poc_type = sps.pic_order_cnt.type_id(),
        ref_frames = sps.max_num_ref_frames,
        fps = ?sps.frame_rate(),
        "sps"
    );
    tracing::debug!(?sps, "sps fields");
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalu_provider::ResourceId;
    use std::io::Cursor;

    // SPS (baseline 640x480), PPS, IDR, P, P, IDR, P.
    const STREAM: &[u8] = &[
        0x00, 0x00, 0x00, 0x01, 0x67, 0x42, 0xC0, 0x1E, 0xDA, 0x02, 0x80, 0xF6, 0x40, //
        0x00, 0x00, 0x00, 0x01, 0x68, 0xCE, 0x3C, 0x80, //
        0x00, 0x00, 0x01, 0x65, 0x88, 0x84, //
        0x00, 0x00, 0x01, 0x41, 0x9A, 0x02, //
        0x00, 0x00, 0x01, 0x41, 0x9A, 0x04, //
        0x00, 0x00, 0x01, 0x65, 0x88, 0x80, //
        0x00, 0x00, 0x01, 0x41, 0x9A, 0x06,
    ];

    fn stream(bytes: &'static [u8]) -> AssetStream {
        AssetStream::new(
            ResourceId(0x7f0f_0000),
            "output",
            Some(bytes.len() as u64),
            Box::new(Cursor::new(bytes)),
        )
    }

    #[test]
    fn inspects_small_stream() {
        let summary = StreamInspector::inspect_bytes(STREAM).unwrap();
        assert_eq!(summary.total_bytes, STREAM.len());
        assert_eq!(summary.nal_count, 7);
        assert_eq!(summary.count(NalType::Sps), 1);
        assert_eq!(summary.count(NalType::Pps), 1);
        assert_eq!(summary.count(NalType::IdrSlice), 2);
        assert_eq!(summary.count(NalType::NonIdrSlice), 3);
        assert_eq!(summary.gop_lengths, [3, 2]);
        assert_eq!(summary.sps.len(), 1);
        assert_eq!(summary.sps[0].offset, 4);
        assert_eq!(summary.sps[0].sps.width(), 640);
    }

    #[test]
    fn empty_stream_gives_empty_summary() {
        let summary = StreamInspector::inspect_bytes(&[]).unwrap();
        assert!(summary.is_empty());
        assert_eq!(summary, StreamSummary::default());
    }

    #[test]
    fn corrupt_sps_fails_the_run() {
        let data = [0x00, 0x00, 0x01, 0x67, 0x42, 0xC0];
        assert!(matches!(
            StreamInspector::inspect_bytes(&data),
            Err(NaluError::Bitstream(_))
        ));
    }

    #[test]
    fn overflowing_bit_depth_fails_the_run() {
        // High profile SPS with bit_depth_luma_minus8 = 2^32 - 2.
        let data = [
            0x00, 0x00, 0x00, 0x01, 0x67, 0x64, 0x00, 0x1E, 0xA0, 0x00, 0x00, 0x03, 0x00, 0x1F,
            0xFF, 0xFF, 0xFF, 0xF2, 0xD0, 0x28, 0x3F, 0x20,
        ];
        match StreamInspector::inspect_bytes(&data) {
            Err(NaluError::Bitstream(msg)) => assert!(msg.contains("bit_depth_luma_minus8"), "{msg}"),
            other => panic!("expected bitstream error, got {other:?}"),
        }
    }

    #[test]
    fn run_reads_stream_in_chunks() {
        let mut big = Vec::with_capacity(5000);
        big.extend_from_slice(STREAM);
        // Pad with filler NAL bytes so the read loop needs several chunks.
        big.extend_from_slice(&[0x00, 0x00, 0x01, 0x0C]);
        big.extend(std::iter::repeat(0xFF).take(4000));
        let bytes: &'static [u8] = Box::leak(big.into_boxed_slice());

        let summary = StreamInspector::new(stream(bytes)).unwrap().run().unwrap();
        assert_eq!(summary.total_bytes, bytes.len());
        assert_eq!(summary.count(NalType::Filler), 1);
    }

    #[test]
    fn oversized_hint_is_rejected() {
        let s = AssetStream::new(
            ResourceId(0x7f0f_0000),
            "huge",
            Some(MAX_STREAM_BYTES + 1),
            Box::new(Cursor::new(Vec::<u8>::new())),
        );
        assert!(matches!(
            StreamInspector::new(s),
            Err(NaluError::InvalidInput(_))
        ));
    }

    #[test]
    fn start_without_runtime_is_an_error() {
        let inspector = StreamInspector::new(stream(STREAM)).unwrap();
        assert!(matches!(inspector.start(), Err(NaluError::Internal(_))));
    }

    #[tokio::test]
    async fn start_then_join() {
        let handle = StreamInspector::new(stream(STREAM)).unwrap().start().unwrap();
        assert_eq!(handle.asset(), "output");
        let summary = handle.join().await.unwrap();
        assert_eq!(summary.nal_count, 7);
    }
}
