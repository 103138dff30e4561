//! Byte-wise delta filter followed by raw LZMA. An alternative to
//! [`crate::delta_zstd::DeltaZstdCodec`] when the caller prefers LZMA's
//! better ratio at worse speed.

use std::io::Cursor;

use fqz_core::codec::{Codec, CodecOutput};
use fqz_core::error::{FqzError, Result};
use fqz_core::format::{CodecFamily, CodecTag};

pub struct DeltaLzmaCodec;

fn delta_encode(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len());
    let mut prev = 0u8;
    for &b in raw {
        out.push(b.wrapping_sub(prev));
        prev = b;
    }
    out
}

fn delta_decode(deltas: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(deltas.len());
    let mut prev = 0u8;
    for &d in deltas {
        prev = prev.wrapping_add(d);
        out.push(prev);
    }
    out
}

impl Codec for DeltaLzmaCodec {
    fn tag(&self) -> CodecTag {
        CodecTag::new(CodecFamily::DeltaLzma, 0)
    }

    fn name(&self) -> &'static str {
        "delta-lzma"
    }

    fn encode(&self, raw: &[u8]) -> Result<CodecOutput> {
        let deltas = delta_encode(raw);
        let mut compressed = Vec::new();
        lzma_rs::lzma_compress(&mut Cursor::new(&deltas), &mut compressed)
            .map_err(|e| FqzError::Format(format!("lzma compress failed: {e}")))?;
        Ok(CodecOutput { compressed, sidecar: Vec::new(), uncompressed_len: raw.len() })
    }

    fn decode(&self, compressed: &[u8], _sidecar: &[u8], _uncompressed_len: usize) -> Result<Vec<u8>> {
        let mut deltas = Vec::new();
        lzma_rs::lzma_decompress(&mut Cursor::new(compressed), &mut deltas)
            .map_err(|e| FqzError::Format(format!("lzma decompress failed: {e}")))?;
        Ok(delta_decode(&deltas))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let c = DeltaLzmaCodec;
        let data: Vec<u8> = (0..200).map(|i| (b'!' + (i % 40) as u8)).collect();
        let out = c.encode(&data).unwrap();
        let back = c.decode(&out.compressed, &out.sidecar, data.len()).unwrap();
        assert_eq!(back, data);
    }
}
