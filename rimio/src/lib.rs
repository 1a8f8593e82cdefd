// SPDX-License-Identifier: MIT

// Core modules
pub mod errors;

// Backend modules
#[cfg(feature = "mem")]
mod mem;

mod std;

// Prelude re-exports (central entrypoint)
pub mod prelude {
    pub use super::RimIO;
    pub use super::RimIOExt;
    pub use super::RimIOGeometry;
    pub use super::RimIOStructExt;
    pub use super::errors::*;

    #[cfg(feature = "mem")]
    pub use super::mem::MemRimIO;

    pub use super::std::StdRimIO;
}

// Internal use
use errors::*;

// Constants

/// Maximum size of internal scratch buffer (used for chunked ops and struct reads).
/// 4 KiB = typical page size and the largest logical block size we handle.
pub const BLOCK_BUF_SIZE: usize = 4096;

// Traits

/// Byte-source abstraction trait.
///
/// Allows read/write/flush at arbitrary offsets.
/// Implementations may target RAM, regular files or block devices.
pub trait RimIO {
    /// Writes `data` at `offset` (absolute).
    fn write_at(&mut self, offset: u64, data: &[u8]) -> RimIOResult;

    /// Reads `buf.len()` bytes into `buf` from `offset` (absolute).
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> RimIOResult;

    /// Flushes any buffered data (may be a no-op).
    fn flush(&mut self) -> RimIOResult;
}

/// Extension helpers for RimIO.
///
/// - chunked reads/writes
/// - zero fill
pub trait RimIOExt: RimIO {
    /// Reads `buf.len()` bytes from `offset` in chunks of `chunk_size` or less.
    #[inline(always)]
    fn read_in_chunks(&mut self, offset: u64, buf: &mut [u8], chunk_size: usize) -> RimIOResult {
        let mut remaining = buf.len();
        let mut off = offset;
        let mut pos = 0;

        while remaining > 0 {
            let to_read = remaining.min(chunk_size);
            self.read_at(off, &mut buf[pos..pos + to_read])?;
            off += to_read as u64;
            pos += to_read;
            remaining -= to_read;
        }

        Ok(())
    }

    /// Writes `buf.len()` bytes at `offset` in chunks of `chunk_size` or less.
    #[inline(always)]
    fn write_in_chunks(&mut self, offset: u64, buf: &[u8], chunk_size: usize) -> RimIOResult {
        let mut remaining = buf.len();
        let mut off = offset;
        let mut pos = 0;

        while remaining > 0 {
            let to_write = remaining.min(chunk_size);
            self.write_at(off, &buf[pos..pos + to_write])?;
            off += to_write as u64;
            pos += to_write;
            remaining -= to_write;
        }

        Ok(())
    }

    /// Fills a region with zeroes.
    ///
    /// Used to wipe stale metadata (old GPT headers at other block sizes, etc.).
    #[inline(always)]
    fn zero_fill(&mut self, offset: u64, len: u64) -> RimIOResult {
        const ZERO_BUF: [u8; BLOCK_BUF_SIZE] = [0u8; BLOCK_BUF_SIZE];
        let mut remaining = len;
        let mut off = offset;
        while remaining > 0 {
            let chunk = remaining.min(ZERO_BUF.len() as u64) as usize;
            self.write_at(off, &ZERO_BUF[..chunk])?;
            off += chunk as u64;
            remaining -= chunk as u64;
        }
        Ok(())
    }
}

impl<T: RimIO + ?Sized> RimIOExt for T {}

/// Read-only geometry of the backing object.
pub trait RimIOGeometry: RimIO {
    /// Total size in bytes (for block devices, the device size).
    fn size(&mut self) -> RimIOResult<u64>;

    /// Logical block size reported by the device, or `None` for plain images.
    fn logical_block_size(&self) -> RimIOResult<Option<u64>> {
        Ok(None)
    }
}

/// Extension trait for reading and writing structs using zerocopy.
///
/// Provides helpers to read a struct from a given offset and write a struct at a given offset.
/// Requires the struct to implement zerocopy traits for safe conversion.
pub trait RimIOStructExt: RimIO {
    /// Reads a struct of type `T` from the given offset.
    fn read_struct<T: zerocopy::FromBytes + zerocopy::KnownLayout + zerocopy::Immutable>(
        &mut self,
        offset: u64,
    ) -> RimIOResult<T> {
        let size = core::mem::size_of::<T>();
        if size > BLOCK_BUF_SIZE {
            return Err(RimIOError::Invalid("read_struct: type too large"));
        }
        let mut buf = [0u8; BLOCK_BUF_SIZE];
        self.read_at(offset, &mut buf[..size])?;
        T::read_from_bytes(&buf[..size]).map_err(|_| RimIOError::Other("read_struct failed"))
    }

    /// Writes a struct of type `T` at the given offset.
    fn write_struct<T: zerocopy::IntoBytes + zerocopy::KnownLayout + zerocopy::Immutable>(
        &mut self,
        offset: u64,
        val: &T,
    ) -> RimIOResult {
        let bytes = val.as_bytes();
        self.write_at(offset, bytes)
    }
}

impl<T: RimIO + ?Sized> RimIOStructExt for T {}
