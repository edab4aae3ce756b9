//! GOP length tracking.
//!
//! A GOP is an IDR picture plus the non-IDR pictures that follow it up to
//! the next IDR. Pictures are counted on their first slice
//! (`first_mb_in_slice == 0`), so multi-slice pictures count once.

use crate::bitreader::{to_rbsp, BitReader};
use nalu_core::error::NaluResult;
use nalu_core::{NalType, NalUnit};

/// `first_mb_in_slice` is the first syntax element of the slice header;
/// a handful of bytes always covers it.
const SLICE_HEADER_PREFIX: usize = 8;

/// Reads `first_mb_in_slice` from a slice NAL unit.
pub fn first_mb_in_slice(unit: &NalUnit<'_>) -> NaluResult<u32> {
    let payload = unit.payload();
    let prefix = &payload[..payload.len().min(SLICE_HEADER_PREFIX)];
    let rbsp = to_rbsp(prefix);
    BitReader::new(&rbsp).read_ue()
}

#[derive(Debug, Default)]
pub struct GopTracker {
    current: Option<u32>,
    lengths: Vec<u32>,
    leading_pictures: u32,
}

impl GopTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one NAL unit; non-slice units are ignored.
    pub fn observe(&mut self, unit: &NalUnit<'_>) {
        let nal_type = unit.nal_type();
        if !nal_type.is_slice() {
            return;
        }

        let new_picture = match first_mb_in_slice(unit) {
            Ok(first_mb) => first_mb == 0,
            Err(e) => {
                tracing::warn!(
                    offset = unit.offset,
                    error = %e,
                    "unreadable slice header, counting as new picture"
                );
                true
            }
        };
        if !new_picture {
            return;
        }

        if nal_type == NalType::IdrSlice {
            if let Some(len) = self.current.replace(1) {
                tracing::debug!(gop_length = len, "gop closed");
                self.lengths.push(len);
            }
            return;
        }

        match self.current.as_mut() {
            Some(len) => *len += 1,
            None => self.leading_pictures += 1,
        }
    }

    /// Closes the open GOP and returns `(gop_lengths, leading_pictures)`.
    pub fn finish(mut self) -> (Vec<u32>, u32) {
        if let Some(len) = self.current.take() {
            self.lengths.push(len);
        }
        (self.lengths, self.leading_pictures)
    }
}
