//! Little-endian fixed-width I/O primitives and streaming xxHash64 (C1).
//!
//! All multi-byte fields in the archive are little-endian.
//! [`HashingWriter`] lets the archive writer hash bytes "as they go to the
//! sink" so the global checksum equals the hash of the whole emitted byte
//! range except the footer, without a second pass over
//! the file.

use std::io::{self, Read, Write};

use xxhash_rust::xxh64::{xxh64, Xxh64};

use crate::error::{FqzError, Result};

/// Seed used for every xxHash64 computation in this format. Fixed at 0 so the
/// same bytes always hash identically across runs.
pub const XXH64_SEED: u64 = 0;

/// One-shot xxHash64 over a byte slice.
pub fn hash64(bytes: &[u8]) -> u64 {
    xxh64(bytes, XXH64_SEED)
}

/// Read exactly `N` bytes or return a short-read I/O error with context.
pub fn read_exact_at<R: Read>(r: &mut R, buf: &mut [u8], ctx: &str) -> Result<()> {
    r.read_exact(buf).map_err(|e| {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            FqzError::Format(format!("short read while reading {ctx}: {e}"))
        } else {
            FqzError::io(e)
        }
    })
}

pub fn read_u8<R: Read>(r: &mut R) -> Result<u8> {
    let mut b = [0u8; 1];
    read_exact_at(r, &mut b, "u8")?;
    Ok(b[0])
}

pub fn read_u16<R: Read>(r: &mut R) -> Result<u16> {
    let mut b = [0u8; 2];
    read_exact_at(r, &mut b, "u16")?;
    Ok(u16::from_le_bytes(b))
}

pub fn read_u32<R: Read>(r: &mut R) -> Result<u32> {
    let mut b = [0u8; 4];
    read_exact_at(r, &mut b, "u32")?;
    Ok(u32::from_le_bytes(b))
}

pub fn read_u64<R: Read>(r: &mut R) -> Result<u64> {
    let mut b = [0u8; 8];
    read_exact_at(r, &mut b, "u64")?;
    Ok(u64::from_le_bytes(b))
}

pub fn write_u8<W: Write>(w: &mut W, v: u8) -> Result<()> {
    w.write_all(&[v]).map_err(FqzError::io)
}

pub fn write_u16<W: Write>(w: &mut W, v: u16) -> Result<()> {
    w.write_all(&v.to_le_bytes()).map_err(FqzError::io)
}

pub fn write_u32<W: Write>(w: &mut W, v: u32) -> Result<()> {
    w.write_all(&v.to_le_bytes()).map_err(FqzError::io)
}

pub fn write_u64<W: Write>(w: &mut W, v: u64) -> Result<()> {
    w.write_all(&v.to_le_bytes()).map_err(FqzError::io)
}

/// Wraps any `Write` and incrementally hashes every byte that passes through
/// it with xxHash64, so the running digest can be finalized without
/// re-reading the file. Used by the archive writer to compute `globalChecksum`
/// in a single forward pass.
pub struct HashingWriter<W> {
    inner: W,
    hasher: Xxh64,
    bytes_written: u64,
}

impl<W: Write> HashingWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, hasher: Xxh64::new(XXH64_SEED), bytes_written: 0 }
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Finalized digest of every byte written through this wrapper so far.
    pub fn digest(&self) -> u64 {
        self.hasher.digest()
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.inner
    }
}

impl<W: Write> Write for HashingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        self.bytes_written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashing_writer_matches_one_shot_hash() {
        let data = b"the quick brown fox jumps over the lazy dog";
        let mut buf = Vec::new();
        {
            let mut hw = HashingWriter::new(&mut buf);
            hw.write_all(&data[..10]).unwrap();
            hw.write_all(&data[10..]).unwrap();
            assert_eq!(hw.digest(), hash64(data));
            assert_eq!(hw.bytes_written(), data.len() as u64);
        }
        assert_eq!(buf, data);
    }

    #[test]
    fn le_roundtrip() {
        let mut buf = Vec::new();
        write_u32(&mut buf, 0xDEAD_BEEF).unwrap();
        write_u64(&mut buf, 0x0123_4567_89AB_CDEF).unwrap();
        let mut cur = std::io::Cursor::new(buf);
        assert_eq!(read_u32(&mut cur).unwrap(), 0xDEAD_BEEF);
        assert_eq!(read_u64(&mut cur).unwrap(), 0x0123_4567_89AB_CDEF);
    }
}
