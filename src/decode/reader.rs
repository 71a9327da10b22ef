use crate::foundation::error::{PsdError, PsdResult};

/// Big-endian cursor over an immutable byte slice.
///
/// Every read is bounds-checked and fails with [`PsdError::TruncatedInput`]; a failed
/// read leaves the cursor where it was. Offsets reported in errors are absolute within
/// the buffer the top-level reader was created over, including for sub-readers.
#[derive(Clone, Debug)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
    base: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            base: 0,
        }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    /// Absolute offset of the cursor within the original buffer.
    pub fn absolute_position(&self) -> usize {
        self.base + self.pos
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    pub fn seek(&mut self, pos: usize) -> PsdResult<()> {
        if pos > self.data.len() {
            return Err(self.truncated(pos.saturating_sub(self.pos)));
        }
        self.pos = pos;
        Ok(())
    }

    pub fn skip(&mut self, n: usize) -> PsdResult<()> {
        self.ensure(n)?;
        self.pos += n;
        Ok(())
    }

    /// Skip a length given as `u64`, which may not fit `usize` on 32-bit targets.
    pub fn skip_u64(&mut self, n: u64) -> PsdResult<()> {
        let n = usize::try_from(n).map_err(|_| self.truncated(usize::MAX))?;
        self.skip(n)
    }

    pub fn read_bytes(&mut self, n: usize) -> PsdResult<&'a [u8]> {
        self.ensure(n)?;
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    pub fn read_array<const N: usize>(&mut self) -> PsdResult<[u8; N]> {
        let bytes = self.read_bytes(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> PsdResult<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_u16(&mut self) -> PsdResult<u16> {
        Ok(u16::from_be_bytes(self.read_array()?))
    }

    pub fn read_i16(&mut self) -> PsdResult<i16> {
        Ok(i16::from_be_bytes(self.read_array()?))
    }

    pub fn read_u32(&mut self) -> PsdResult<u32> {
        Ok(u32::from_be_bytes(self.read_array()?))
    }

    pub fn read_i32(&mut self) -> PsdResult<i32> {
        Ok(i32::from_be_bytes(self.read_array()?))
    }

    pub fn read_u64(&mut self) -> PsdResult<u64> {
        Ok(u64::from_be_bytes(self.read_array()?))
    }

    pub fn read_i64(&mut self) -> PsdResult<i64> {
        Ok(i64::from_be_bytes(self.read_array()?))
    }

    pub fn read_f64(&mut self) -> PsdResult<f64> {
        Ok(f64::from_be_bytes(self.read_array()?))
    }

    /// Four-byte signature or key such as `8BIM` or `lsct`.
    pub fn read_signature(&mut self) -> PsdResult<[u8; 4]> {
        self.read_array()
    }

    /// `n` raw bytes decoded lossily as text, trailing NULs removed.
    pub fn read_fixed_string(&mut self, n: usize) -> PsdResult<String> {
        let bytes = self.read_bytes(n)?;
        Ok(String::from_utf8_lossy(bytes)
            .trim_end_matches('\0')
            .to_string())
    }

    /// Length-prefixed byte string. The total size including the length byte is
    /// padded up to a multiple of `pad` (1 for none).
    pub fn read_pascal_string(&mut self, pad: usize) -> PsdResult<String> {
        let start = self.pos;
        let len = usize::from(self.read_u8()?);
        let name = self.read_bytes(len).inspect_err(|_| self.pos = start)?;
        let name = latin1_to_string(name);
        let pad = pad.max(1);
        let consumed = 1 + len;
        let padded = consumed.div_ceil(pad) * pad;
        if let Err(e) = self.skip(padded - consumed) {
            self.pos = start;
            return Err(e);
        }
        Ok(name)
    }

    /// `u32` count of UTF-16 code units followed by the big-endian units.
    pub fn read_unicode_string(&mut self) -> PsdResult<String> {
        let start = self.pos;
        let count = self.read_u32()? as usize;
        let bytes = match count.checked_mul(2) {
            Some(n) => self.read_bytes(n).inspect_err(|_| self.pos = start)?,
            None => {
                self.pos = start;
                return Err(self.truncated(usize::MAX));
            }
        };
        let units: Vec<u16> = bytes
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        Ok(String::from_utf16_lossy(&units)
            .trim_end_matches('\0')
            .to_string())
    }

    /// Section length: `u32` in PSD files, `u64` in PSB files.
    pub fn read_length(&mut self, wide: bool) -> PsdResult<u64> {
        if wide {
            self.read_u64()
        } else {
            Ok(u64::from(self.read_u32()?))
        }
    }

    /// Split off the next `len` bytes as an independent reader and advance past them.
    pub fn sub_reader(&mut self, len: u64) -> PsdResult<ByteReader<'a>> {
        let n = usize::try_from(len).map_err(|_| self.truncated(usize::MAX))?;
        let base = self.absolute_position();
        let data = self.read_bytes(n)?;
        Ok(ByteReader { data, pos: 0, base })
    }

    /// Everything from the cursor to the end, without advancing.
    pub fn rest(&self) -> &'a [u8] {
        &self.data[self.pos.min(self.data.len())..]
    }

    fn ensure(&self, n: usize) -> PsdResult<()> {
        if n > self.remaining() {
            return Err(self.truncated(n));
        }
        Ok(())
    }

    fn truncated(&self, requested: usize) -> PsdError {
        PsdError::TruncatedInput {
            offset: self.absolute_position(),
            requested,
            available: self.remaining(),
        }
    }
}

fn latin1_to_string(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| char::from(b)).collect(),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/decode/reader.rs"]
mod tests;
