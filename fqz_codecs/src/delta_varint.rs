//! Delta + zigzag + varint codec for the per-record length stream. Read
//! lengths are usually close to a run's modal length, so small signed
//! deltas pack into one or two varint bytes instead of a flat 4.
//! Generalizes the zigzag-varint scheme `fqz_core::reorder` uses for the
//! reorder map to a second stream that has the same "mostly-small-delta"
//! shape.

use fqz_core::codec::{Codec, CodecOutput};
use fqz_core::error::{FqzError, Result};
use fqz_core::format::{CodecFamily, CodecTag};

pub struct DeltaVarintCodec;

fn zigzag_encode(v: i64) -> u64 {
    ((v << 1) ^ (v >> 63)) as u64
}

fn zigzag_decode(v: u64) -> i64 {
    ((v >> 1) as i64) ^ -((v & 1) as i64)
}

fn write_varint(buf: &mut Vec<u8>, mut v: u64) {
    loop {
        let byte = (v & 0x7F) as u8;
        v >>= 7;
        if v == 0 {
            buf.push(byte);
            break;
        }
        buf.push(byte | 0x80);
    }
}

fn read_varint(buf: &[u8], cursor: &mut usize) -> Result<u64> {
    let mut result = 0u64;
    let mut shift = 0u32;
    loop {
        let byte = *buf.get(*cursor).ok_or_else(|| FqzError::Format("truncated varint".into()))?;
        *cursor += 1;
        result |= ((byte & 0x7F) as u64) << shift;
        if byte & 0x80 == 0 {
            break;
        }
        shift += 7;
        if shift >= 64 {
            return Err(FqzError::Format("varint too long".into()));
        }
    }
    Ok(result)
}

impl Codec for DeltaVarintCodec {
    fn tag(&self) -> CodecTag {
        CodecTag::new(CodecFamily::DeltaVarint, 0)
    }

    fn name(&self) -> &'static str {
        "delta-varint"
    }

    /// `raw` must be a run of little-endian `u32` lengths, as the block
    /// assembler lays out the aux-lengths stream.
    fn encode(&self, raw: &[u8]) -> Result<CodecOutput> {
        if raw.len() % 4 != 0 {
            return Err(FqzError::Format("delta-varint input is not a whole number of u32s".into()));
        }
        let mut buf = Vec::with_capacity(raw.len() / 2);
        let mut prev: i64 = 0;
        for chunk in raw.chunks_exact(4) {
            let v = u32::from_le_bytes(chunk.try_into().unwrap()) as i64;
            write_varint(&mut buf, zigzag_encode(v - prev));
            prev = v;
        }
        Ok(CodecOutput { compressed: buf, sidecar: Vec::new(), uncompressed_len: raw.len() })
    }

    fn decode(&self, compressed: &[u8], _sidecar: &[u8], uncompressed_len: usize) -> Result<Vec<u8>> {
        let count = uncompressed_len / 4;
        let mut out = Vec::with_capacity(uncompressed_len);
        let mut cursor = 0usize;
        let mut prev: i64 = 0;
        for _ in 0..count {
            let raw_zz = read_varint(compressed, &mut cursor)?;
            prev += zigzag_decode(raw_zz);
            out.extend_from_slice(&(prev as u32).to_le_bytes());
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lengths_to_bytes(lengths: &[u32]) -> Vec<u8> {
        lengths.iter().flat_map(|l| l.to_le_bytes()).collect()
    }

    #[test]
    fn roundtrip() {
        let c = DeltaVarintCodec;
        let lengths = [150u32, 151, 149, 150, 300, 150];
        let raw = lengths_to_bytes(&lengths);
        let out = c.encode(&raw).unwrap();
        let back = c.decode(&out.compressed, &out.sidecar, raw.len()).unwrap();
        assert_eq!(back, raw);
    }
}
