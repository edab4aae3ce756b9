//! Annex B start code scanning.
//!
//! NAL units are delimited by `00 00 01` or `00 00 00 01`. The iterator
//! yields every unit including the last one, which ends at end of data.

use nalu_core::NalUnit;

/// A start code found in a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartCode {
    pub pos: usize,
    /// 3 or 4.
    pub len: u8,
}

impl StartCode {
    /// First byte after the start code.
    #[inline]
    pub fn end(&self) -> usize {
        self.pos + self.len as usize
    }
}

/// Finds the next start code at or after `from`.
///
/// At each position the 3-byte form is tried before the 4-byte form.
pub fn find_start_code(data: &[u8], from: usize) -> Option<StartCode> {
    let mut i = from;
    while i + 3 <= data.len() {
        if data[i] == 0 && data[i + 1] == 0 {
            if data[i + 2] == 1 {
                return Some(StartCode { pos: i, len: 3 });
            }
            if data[i + 2] == 0 && i + 3 < data.len() && data[i + 3] == 1 {
                return Some(StartCode { pos: i, len: 4 });
            }
        }
        i += 1;
    }
    None
}

/// Iterator over the NAL units of an Annex B buffer.
pub struct AnnexBNalIter<'a> {
    data: &'a [u8],
    /// Start code preceding the next unit, `None` once exhausted.
    next: Option<StartCode>,
    leading_garbage: usize,
}

impl<'a> AnnexBNalIter<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        let next = find_start_code(data, 0);
        let leading_garbage = next.map_or(data.len(), |sc| sc.pos);
        Self {
            data,
            next,
            leading_garbage,
        }
    }

    /// Bytes before the first start code (the whole buffer if there is none).
    pub fn leading_garbage(&self) -> usize {
        self.leading_garbage
    }
}

impl<'a> Iterator for AnnexBNalIter<'a> {
    type Item = NalUnit<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let current = self.next?;
            let start = current.end();
            self.next = find_start_code(self.data, start);

            let mut end = self.next.map_or(self.data.len(), |sc| sc.pos);
            while end > start && self.data[end - 1] == 0 {
                end -= 1;
            }

            if end > start {
                return Some(NalUnit {
                    offset: start,
                    start_code_len: current.len,
                    data: &self.data[start..end],
                });
            }
        }
    }
}
