//! Domain models, shared types, and error definitions.
//!
//! Foundation crate -- no async or I/O dependencies.

pub mod error;
pub mod types;

pub use error::{NaluError, NaluResult};
pub use types::{
    ChromaFormat, ColourDescription, FrameCrop, NalHeader, NalType, NalUnit, PicOrderCnt, Sps,
    SpsRecord, StreamSummary, TimingInfo, VideoSignal, Vui,
};
