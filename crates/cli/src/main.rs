//! CLI for the nalu H.264 stream inspector.
//!
//! Pipeline: resource table -> open raw asset -> inspector -> report / sink.

use clap::{Parser, Subcommand};
use nalu_analyzer::sink::json_stream::JsonStreamSink;
use nalu_analyzer::{launch, Report, StreamInspector};
use nalu_core::NaluError;
use nalu_provider::{AssetProvider, AssetRef, RawResourceProvider};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(name = "nalu", version, about = "H.264 Annex B stream inspector")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Open a bundled raw resource and inspect it.
    Run {
        /// Directory holding the raw resources.
        #[arg(long, env = "NALU_RES_DIR", default_value = "res/raw")]
        res_dir: PathBuf,

        /// Resource name (file stem) or generated id such as 0x7f0f0000.
        #[arg(short, long, env = "NALU_ASSET", default_value = "output")]
        asset: AssetRef,

        /// Print the stream summary as JSON instead of the report.
        #[arg(long, default_value_t = false, conflicts_with = "sink")]
        json: bool,

        /// Sink output: "ndjson" writes NDJSON to stdout,
        /// "ndjson:/path/to/file" writes to file.
        #[arg(long)]
        sink: Option<SinkTarget>,
    },
    /// List the generated resource table.
    Assets {
        #[arg(long, env = "NALU_RES_DIR", default_value = "res/raw")]
        res_dir: PathBuf,

        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

#[derive(Debug, Clone)]
enum SinkTarget {
    Stdout,
    File(PathBuf),
}

impl FromStr for SinkTarget {
    type Err = NaluError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "ndjson" {
            return Ok(SinkTarget::Stdout);
        }
        match s.strip_prefix("ndjson:") {
            Some(path) if !path.is_empty() => Ok(SinkTarget::File(PathBuf::from(path))),
            _ => Err(NaluError::InvalidInput(format!(
                "unknown sink {s}, use 'ndjson' or 'ndjson:/path'"
            ))),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            res_dir,
            asset,
            json,
            sink,
        } => {
            let t0 = Instant::now();
            tracing::info!(res_dir = %res_dir.display(), asset = %asset, "starting inspection");

            // 1. Resource table.
            let provider = RawResourceProvider::open(&res_dir)?;

            // 2. Bootstrap: resolve, open, construct, start.
            let handle = launch(&provider, &asset, None, StreamInspector::new)?;
            let asset_name = handle.asset().to_string();

            // 3. Wait for the worker so the process outlives the run.
            let summary = handle.join().await?;
            let t_total = t0.elapsed();

            tracing::info!(
                nals = summary.nal_count,
                gops = summary.gop_lengths.len(),
                elapsed_ms = t_total.as_millis(),
                "run complete"
            );

            // 4. Report.
            let report = Report::build(&asset_name, &summary, t_total);

            // 5. Output.
            if let Some(target) = sink {
                let (row, types, sps) = report.to_rows();
                let n = match &target {
                    SinkTarget::Stdout => {
                        let mut s = JsonStreamSink::stdout();
                        s.write_summary(&row)?;
                        s.write_nal_types(&types)?;
                        s.write_sps(&sps)?;
                        s.finish()?
                    }
                    SinkTarget::File(path) => {
                        let mut s = JsonStreamSink::create(path)?;
                        s.write_summary(&row)?;
                        s.write_nal_types(&types)?;
                        s.write_sps(&sps)?;
                        s.finish()?
                    }
                };
                tracing::info!(rows = n, target = ?target, "ndjson sink written");

                eprint!("{}", report.render());
            } else if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print!("{}", report.render());
            }
        }
        Commands::Assets { res_dir, json } => {
            let provider = RawResourceProvider::open(&res_dir)?;
            let entries: Vec<_> = provider.table().iter().collect();

            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else if entries.is_empty() {
                println!("no raw resources in {}", res_dir.display());
            } else {
                for e in entries {
                    println!("{}  {:<24} {:>12} bytes  {}", e.id, e.name, e.size, e.file_name);
                }
            }
        }
    }

    Ok(())
}
