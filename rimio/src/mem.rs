// SPDX-License-Identifier: MIT

use crate::{RimIO, RimIOError, RimIOGeometry, RimIOResult};

/// In-memory implementation of `RimIO`.
///
/// Useful for tests and virtual disks. A logical block size can be attached
/// to make the buffer behave like a block device during GPT probing.
#[derive(Debug)]
pub struct MemRimIO<'a> {
    buffer: &'a mut [u8],
    block_size: Option<u64>,
}

impl<'a> MemRimIO<'a> {
    #[inline]
    pub fn new(buffer: &'a mut [u8]) -> Self {
        Self {
            buffer,
            block_size: None,
        }
    }

    /// Same as [`MemRimIO::new`], but reports `block_size` as the device logical block size.
    #[inline]
    pub fn new_block_device(buffer: &'a mut [u8], block_size: u64) -> Self {
        Self {
            buffer,
            block_size: Some(block_size),
        }
    }

    #[inline]
    fn check_bounds(&self, abs_off: u64, len: usize) -> RimIOResult {
        let end = abs_off
            .checked_add(len as u64)
            .ok_or(RimIOError::OutOfBounds)?;
        if end > self.buffer.len() as u64 {
            return Err(RimIOError::OutOfBounds);
        }
        Ok(())
    }
}

impl<'a> RimIO for MemRimIO<'a> {
    #[inline(always)]
    fn write_at(&mut self, offset: u64, data: &[u8]) -> RimIOResult {
        self.check_bounds(offset, data.len())?;
        let dst = &mut self.buffer[offset as usize..offset as usize + data.len()];
        dst.copy_from_slice(data);
        Ok(())
    }

    #[inline(always)]
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> RimIOResult {
        self.check_bounds(offset, buf.len())?;
        let src = &self.buffer[offset as usize..offset as usize + buf.len()];
        buf.copy_from_slice(src);
        Ok(())
    }

    #[inline]
    fn flush(&mut self) -> RimIOResult {
        Ok(())
    }
}

impl<'a> RimIOGeometry for MemRimIO<'a> {
    fn size(&mut self) -> RimIOResult<u64> {
        Ok(self.buffer.len() as u64)
    }

    fn logical_block_size(&self) -> RimIOResult<Option<u64>> {
        Ok(self.block_size)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::prelude::*;

    #[test]
    fn test_rw() {
        let mut buf = [0u8; 256];
        let mut io = MemRimIO::new(&mut buf);
        io.write_at(10, &[1, 2, 3, 4]).unwrap();

        let mut output = [0u8; 4];
        io.read_at(10, &mut output).unwrap();
        assert_eq!(output, [1, 2, 3, 4]);
    }

    #[test]
    fn test_out_of_bounds() {
        let mut buf = [0u8; 256];
        let mut io = MemRimIO::new(&mut buf);
        assert_eq!(io.size().unwrap(), 256);

        let mut out = [0u8; 8];
        assert!(matches!(io.read_at(252, &mut out), Err(RimIOError::OutOfBounds)));
        assert!(io.write_at(u64::MAX, &out).is_err());
    }

    #[test]
    fn test_block_device_geometry() {
        let mut buf = [0u8; 8192];
        let io = MemRimIO::new_block_device(&mut buf, 4096);
        assert_eq!(io.logical_block_size().unwrap(), Some(4096));
    }

    #[test]
    fn test_chunked_rw() {
        let mut buf = [0u8; 64];
        let mut io = MemRimIO::new(&mut buf);

        let input = [0xAB; 17];
        let mut output = [0u8; 17];

        io.write_in_chunks(5, &input, 8).unwrap();
        io.read_in_chunks(5, &mut output, 8).unwrap();

        assert_eq!(input, output);
    }

    #[test]
    fn test_zero_fill() {
        let mut buf = [0xFF; 64];
        let mut io = MemRimIO::new(&mut buf);

        io.zero_fill(10, 8).unwrap();

        let mut output = [0xAA; 8];
        io.read_at(10, &mut output).unwrap();
        assert_eq!(output, [0u8; 8]);
    }
}
