//! H.264 stream inspection: Annex B scanning, SPS parsing, GOP tracking,
//! the launch bootstrap, report generation, and data sinks.

pub mod annexb;
pub mod bitreader;
pub mod bootstrap;
pub mod driver;
pub mod gop;
pub mod reporter;
pub mod sink;
pub mod sps;

pub use annexb::{find_start_code, AnnexBNalIter, StartCode};
pub use bootstrap::{launch, LaunchState};
pub use driver::{DecoderDriver, DriverHandle, StreamInspector};
pub use gop::GopTracker;
pub use reporter::Report;
pub use sps::{parse_sps, parse_sps_batch, parse_sps_unit};
