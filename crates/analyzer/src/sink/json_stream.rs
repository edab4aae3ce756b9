//! NDJSON (newline-delimited JSON) stream sink.
//!
//! Each row is serialized directly to the buffered writer without an
//! intermediate `String`.
//!
//! ```ignore
//! let (summary, types, sps) = report.to_rows();
//! let mut sink = JsonStreamSink::stdout();
//! sink.write_summary(&summary)?;
//! sink.write_nal_types(&types)?;
//! sink.write_sps(&sps)?;
//! sink.finish()?;
//! ```

use super::{NalTypeRow, SpsRow, StreamSummaryRow};
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// NDJSON writer over any `Write`, buffered in 64 KiB batches.
pub struct JsonStreamSink<W: Write> {
    writer: BufWriter<W>,
    rows_written: usize,
}

impl JsonStreamSink<io::Stdout> {
    /// Write NDJSON to stdout.
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl JsonStreamSink<File> {
    /// Write NDJSON to a file, truncating it if it exists.
    pub fn create(path: &Path) -> io::Result<Self> {
        Ok(Self::new(File::create(path)?))
    }
}

impl<W: Write> JsonStreamSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::with_capacity(64 * 1024, writer),
            rows_written: 0,
        }
    }

    pub fn write_summary(&mut self, row: &StreamSummaryRow) -> io::Result<()> {
        self.write_row(row)
    }

    pub fn write_nal_types(&mut self, rows: &[NalTypeRow]) -> io::Result<()> {
        rows.iter().try_for_each(|row| self.write_row(row))
    }

    pub fn write_sps(&mut self, rows: &[SpsRow]) -> io::Result<()> {
        rows.iter().try_for_each(|row| self.write_row(row))
    }

    /// Flush and return how many rows were written.
    pub fn finish(mut self) -> io::Result<usize> {
        self.writer.flush()?;
        Ok(self.rows_written)
    }

    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    fn write_row<T: Serialize>(&mut self, row: &T) -> io::Result<()> {
        serde_json::to_writer(&mut self.writer, row).map_err(io::Error::other)?;
        self.writer.write_all(b"\n")?;
        self.rows_written += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary_row() -> StreamSummaryRow {
        StreamSummaryRow {
            asset: "output".into(),
            total_bytes: 1_048_576,
            nal_count: 310,
            sps_count: 1,
            gop_count: 10,
            mean_gop: Some(30.0),
            max_gop: Some(30),
            leading_pictures: 0,
            leading_garbage: 0,
            total_time_ms: 4,
            created_at_ms: 1_760_000_000_000,
        }
    }

    #[test]
    fn writes_one_line_per_row() {
        let mut buf = Vec::new();
        let mut sink = JsonStreamSink::new(&mut buf);

        let types = vec![
            NalTypeRow {
                asset: "output".into(),
                nal_unit_type: 1,
                label: "non-IDR slice".into(),
                count: 290,
                share: 0.9355,
                created_at_ms: 1_760_000_000_000,
            },
            NalTypeRow {
                asset: "output".into(),
                nal_unit_type: 5,
                label: "IDR slice".into(),
                count: 10,
                share: 0.0323,
                created_at_ms: 1_760_000_000_000,
            },
        ];

        sink.write_summary(&summary_row()).unwrap();
        sink.write_nal_types(&types).unwrap();
        sink.write_sps(&[]).unwrap();
        assert_eq!(sink.rows_written(), 3);
        let n = sink.finish().unwrap();
        assert_eq!(n, 3);

        let output = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = output.trim_end().split('\n').collect();
        assert_eq!(lines.len(), 3);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["asset"], "output");
        assert_eq!(first["max_gop"], 30);
        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["nal_unit_type"], 1);
    }

    #[test]
    fn file_sink_replaces_previous_run() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let path = file.path();

        for rows in [3, 1] {
            let mut sink = JsonStreamSink::create(path).unwrap();
            for _ in 0..rows {
                sink.write_summary(&summary_row()).unwrap();
            }
            sink.finish().unwrap();
        }

        let contents = std::fs::read_to_string(path).unwrap();
        assert_eq!(contents.lines().count(), 1);
    }
}
