//! MSB-first bit reader over an RBSP with Exp-Golomb decoding.
//!
//! Every read is bounds-checked and fails with [`NaluError::Bitstream`]
//! instead of panicking on truncated input.

use nalu_core::error::{NaluError, NaluResult};
use std::borrow::Cow;

/// Removes emulation-prevention bytes (`00 00 03` → `00 00`).
///
/// Borrows the input when nothing needs removing.
pub fn to_rbsp(payload: &[u8]) -> Cow<'_, [u8]> {
    let needs_unescape = payload
        .windows(3)
        .any(|w| w[0] == 0 && w[1] == 0 && w[2] == 3);
    if !needs_unescape {
        return Cow::Borrowed(payload);
    }

    let mut out = Vec::with_capacity(payload.len());
    let mut zeros = 0usize;
    for &b in payload {
        if zeros >= 2 && b == 3 {
            zeros = 0;
            continue;
        }
        zeros = if b == 0 { zeros + 1 } else { 0 };
        out.push(b);
    }
    Cow::Owned(out)
}

pub struct BitReader<'a> {
    data: &'a [u8],
    /// Absolute bit position from the start of `data`.
    pos: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn bits_left(&self) -> usize {
        self.data.len() * 8 - self.pos
    }

    pub fn skip_bits(&mut self, n: usize) -> NaluResult<()> {
        self.ensure(n)?;
        self.pos += n;
        Ok(())
    }

    /// `u(n)` for `n <= 32`.
    pub fn read_bits(&mut self, n: u32) -> NaluResult<u32> {
        if n > 32 {
            return Err(NaluError::InvalidInput(format!("cannot read {n} bits at once")));
        }
        self.ensure(n as usize)?;

        let mut value: u64 = 0;
        for _ in 0..n {
            let byte = self.data[self.pos / 8];
            let bit = (byte >> (7 - self.pos % 8)) & 0x01;
            value = (value << 1) | bit as u64;
            self.pos += 1;
        }
        Ok(value as u32)
    }

    #[inline]
    pub fn read_flag(&mut self) -> NaluResult<bool> {
        Ok(self.read_bits(1)? == 1)
    }

    pub fn read_u8(&mut self) -> NaluResult<u8> {
        Ok(self.read_bits(8)? as u8)
    }

    /// `ue(v)`: unsigned Exp-Golomb.
    pub fn read_ue(&mut self) -> NaluResult<u32> {
        let mut leading_zeros = 0u32;
        while !self.read_flag()? {
            leading_zeros += 1;
            if leading_zeros > 31 {
                return Err(NaluError::Bitstream(format!(
                    "exp-golomb prefix exceeds 31 zero bits at bit {}",
                    self.pos
                )));
            }
        }
        let suffix = self.read_bits(leading_zeros)? as u64;
        Ok(((1u64 << leading_zeros) - 1 + suffix) as u32)
    }

    /// `se(v)`: signed Exp-Golomb, k → (−1)^(k+1) · ⌈k/2⌉.
    pub fn read_se(&mut self) -> NaluResult<i32> {
        let k = self.read_ue()? as i64;
        let value = if k % 2 == 1 { (k + 1) / 2 } else { -(k / 2) };
        Ok(value as i32)
    }

    fn ensure(&self, n: usize) -> NaluResult<()> {
        if n > self.bits_left() {
            return Err(NaluError::Bitstream(format!(
                "read of {n} bits at bit {} overruns {} byte payload",
                self.pos,
                self.data.len()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_width_reads() {
        let mut r = BitReader::new(&[0b1010_1100, 0xFF]);
        assert_eq!(r.read_bits(1).unwrap(), 1);
        assert_eq!(r.read_bits(3).unwrap(), 0b010);
        assert_eq!(r.read_bits(8).unwrap(), 0b1100_1111);
        assert_eq!(r.bits_left(), 4);
        assert_eq!(r.read_bits(0).unwrap(), 0);
        assert!(r.read_bits(5).is_err());
        // A failed read does not move the cursor.
        assert_eq!(r.read_bits(4).unwrap(), 0xF);
    }

    #[test]
    fn read_32_bits() {
        let mut r = BitReader::new(&[0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(r.read_bits(32).unwrap(), 0xDEAD_BEEF);
        assert!(r.read_bits(33).is_err());
    }

    #[test]
    fn unsigned_exp_golomb() {
        // 1 | 010 | 011 | 00100 | 00101 | 0001000
        // codes 0, 1, 2, 3, 4, 7
        let mut r = BitReader::new(&[0b1010_0110, 0b0100_0010, 0b1000_1000]);
        let values: Vec<u32> = (0..6).map(|_| r.read_ue().unwrap()).collect();
        assert_eq!(values, [0, 1, 2, 3, 4, 7]);
    }

    #[test]
    fn signed_exp_golomb() {
        // k = 0, 1, 2, 3, 4 → 0, 1, -1, 2, -2
        let mut r = BitReader::new(&[0b1010_0110, 0b0100_0010, 0b1000_0000]);
        let values: Vec<i32> = (0..5).map(|_| r.read_se().unwrap()).collect();
        assert_eq!(values, [0, 1, -1, 2, -2]);
    }

    #[test]
    fn largest_ue_and_overlong_prefix() {
        // 31 zeros, a one, then 31 ones: 2^32 - 2.
        let mut bytes = [0u8; 8];
        bytes[3] = 0b0000_0001;
        for b in bytes.iter_mut().skip(4) {
            *b = 0xFF;
        }
        let mut r = BitReader::new(&bytes);
        assert_eq!(r.read_ue().unwrap(), u32::MAX - 1);

        let mut r = BitReader::new(&[0u8; 5]);
        assert!(matches!(r.read_ue(), Err(NaluError::Bitstream(_))));
    }

    #[test]
    fn truncated_exp_golomb_fails() {
        let mut r = BitReader::new(&[0b0000_0001]);
        assert!(r.read_ue().is_err());
    }

    #[test]
    fn rbsp_unescape() {
        let plain = [0x64, 0x00, 0x1F, 0xAC];
        assert!(matches!(to_rbsp(&plain), Cow::Borrowed(_)));

        let escaped = [0x00, 0x00, 0x03, 0x01, 0x00, 0x00, 0x03, 0x00, 0x00, 0x03];
        assert_eq!(
            to_rbsp(&escaped).as_ref(),
            &[0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00]
        );
    }
}
