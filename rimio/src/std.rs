// SPDX-License-Identifier: MIT

use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};

use crate::{RimIO, RimIOError, RimIOGeometry, RimIOResult};

/// `RimIO` over anything seekable (image files, block devices, cursors).
#[derive(Debug)]
pub struct StdRimIO<'a, T: Read + Write + Seek> {
    io: &'a mut T,
}

impl<'a, T: Read + Write + Seek> StdRimIO<'a, T> {
    #[inline]
    pub fn new(io: &'a mut T) -> Self {
        Self { io }
    }

    #[inline]
    pub fn get_mut(&mut self) -> &mut T {
        self.io
    }
}

impl<'a, T: Read + Write + Seek> RimIO for StdRimIO<'a, T> {
    fn write_at(&mut self, offset: u64, data: &[u8]) -> RimIOResult {
        self.io.seek(SeekFrom::Start(offset))?;
        self.io.write_all(data)?;
        Ok(())
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> RimIOResult {
        self.io.seek(SeekFrom::Start(offset))?;
        self.io.read_exact(buf)?;
        Ok(())
    }

    fn flush(&mut self) -> RimIOResult {
        self.io.flush()?;
        Ok(())
    }
}

impl<'a> RimIOGeometry for StdRimIO<'a, File> {
    fn size(&mut self) -> RimIOResult<u64> {
        let meta = self.io.metadata()?;
        if meta.is_file() {
            return Ok(meta.len());
        }
        // Block devices report a zero length in their metadata.
        let end = self.io.seek(SeekFrom::End(0))?;
        self.io.seek(SeekFrom::Start(0))?;
        Ok(end)
    }

    fn logical_block_size(&self) -> RimIOResult<Option<u64>> {
        if !file_is_block_device(self.io)? {
            return Ok(None);
        }
        blksszget(self.io).map(Some)
    }
}

#[cfg(unix)]
fn file_is_block_device(file: &File) -> RimIOResult<bool> {
    use std::os::unix::fs::FileTypeExt;
    Ok(file.metadata()?.file_type().is_block_device())
}

#[cfg(not(unix))]
fn file_is_block_device(_file: &File) -> RimIOResult<bool> {
    Ok(false)
}

#[cfg(target_os = "linux")]
mod ioctl {
    use std::os::raw::c_int;
    nix::ioctl_read_bad!(blksszget, nix::request_code_none!(0x12, 104), c_int);
}

/// Logical sector size of a block device (BLKSSZGET).
#[cfg(target_os = "linux")]
fn blksszget(file: &File) -> RimIOResult<u64> {
    use std::os::raw::c_int;
    use std::os::unix::io::AsRawFd;

    let mut size: c_int = 0;
    unsafe { ioctl::blksszget(file.as_raw_fd(), &mut size) }
        .map_err(|e| RimIOError::Io(std::io::Error::from(e)))?;
    match u64::try_from(size) {
        Ok(sz) if sz > 0 => Ok(sz),
        _ => Err(RimIOError::Invalid("device reported an invalid logical block size")),
    }
}

#[cfg(not(target_os = "linux"))]
fn blksszget(_file: &File) -> RimIOResult<u64> {
    Err(RimIOError::Unsupported)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::prelude::*;
    use tempfile::tempfile;

    #[test]
    fn test_rw() {
        let mut file = tempfile().unwrap();
        let mut io = StdRimIO::new(&mut file);
        io.write_at(10, &[1, 2, 3, 4]).unwrap();

        let mut output = [0u8; 4];
        io.read_at(10, &mut output).unwrap();
        assert_eq!(output, [1, 2, 3, 4]);
    }

    #[test]
    fn test_read_past_end_is_out_of_bounds() {
        let mut file = tempfile().unwrap();
        file.set_len(16).unwrap();
        let mut io = StdRimIO::new(&mut file);

        let mut buf = [0u8; 8];
        assert!(matches!(io.read_at(12, &mut buf), Err(RimIOError::OutOfBounds)));
    }

    #[test]
    fn test_geometry_of_plain_file() {
        let mut file = tempfile().unwrap();
        file.set_len(512 * 100).unwrap();
        let mut io = StdRimIO::new(&mut file);

        assert_eq!(io.size().unwrap(), 512 * 100);
        assert_eq!(io.logical_block_size().unwrap(), None);
    }

    #[test]
    fn test_zero_fill() {
        let mut file = tempfile().unwrap();
        let mut io = StdRimIO::new(&mut file);

        io.write_at(42, &[0xFF; 8]).unwrap();
        io.zero_fill(42, 8).unwrap();

        let mut buf = [0xAA; 8];
        io.read_at(42, &mut buf).unwrap();

        assert_eq!(buf, [0u8; 8]);
    }
}
