// SPDX-License-Identifier: MIT

//! LBA-addressed helpers over `RimIO`, so table code never multiplies by the block size.

use rimio::BLOCK_BUF_SIZE;
use rimio::errors::RimIOError;
use rimio::prelude::*;

use crate::log_verbose;

#[inline]
pub(crate) fn lba_offset(lba: u64, block_size: u64) -> RimIOResult<u64> {
    lba.checked_mul(block_size)
        .ok_or(RimIOError::Other("lba_offset overflow"))
}

pub trait RimIOLbaExt: RimIO {
    /// Reads `len` bytes starting at `lba`.
    fn read_vec_at_lba(&mut self, lba: u64, block_size: u64, len: usize) -> RimIOResult<Vec<u8>> {
        let off = lba_offset(lba, block_size)?;
        let mut buf = vec![0u8; len];
        self.read_in_chunks(off, &mut buf, BLOCK_BUF_SIZE)?;
        Ok(buf)
    }

    /// Writes one named metadata region, logging where it lands.
    fn write_region(&mut self, what: &str, lba: u64, block_size: u64, data: &[u8]) -> RimIOResult {
        let off = lba_offset(lba, block_size)?;
        log_verbose!("Writing {what} in LBA {lba} (offset {off})");
        self.write_in_chunks(off, data, BLOCK_BUF_SIZE)
    }

    #[inline]
    fn read_struct_lba<T>(&mut self, lba: u64, block_size: u64) -> RimIOResult<T>
    where
        T: zerocopy::FromBytes + zerocopy::KnownLayout + zerocopy::Immutable,
    {
        let off = lba_offset(lba, block_size)?;
        self.read_struct::<T>(off)
    }
}

impl<T: RimIO + ?Sized> RimIOLbaExt for T {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regions_are_lba_addressed() {
        let mut buf = vec![0u8; 4096];
        let mut io = MemRimIO::new(&mut buf);
        io.write_region("test", 2, 512, b"EFI PART").unwrap();
        let back = io.read_vec_at_lba(2, 512, 8).unwrap();
        assert_eq!(&back, b"EFI PART");
        let sig: [u8; 8] = io.read_struct_lba(1, 1024).unwrap();
        assert_eq!(&sig, b"EFI PART");
    }

    #[test]
    fn offset_overflow_is_reported() {
        assert!(lba_offset(u64::MAX, 512).is_err());
    }
}
