//! Byte-wise delta filter followed by zstd. Well suited to quality strings,
//! whose adjacent values are usually close together: the delta transform
//! turns that closeness into long runs of small or zero bytes before
//! handing the stream to a general-purpose compressor.

use fqz_core::codec::{Codec, CodecOutput};
use fqz_core::error::{FqzError, Result};
use fqz_core::format::{CodecFamily, CodecTag};

const LEVEL: i32 = 9;

pub struct DeltaZstdCodec;

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

impl Codec for DeltaZstdCodec {
    fn tag(&self) -> CodecTag {
        CodecTag::new(CodecFamily::DeltaZstd, 0)
    }

    fn name(&self) -> &'static str {
        "delta-zstd"
    }

    fn encode(&self, raw: &[u8]) -> Result<CodecOutput> {
        let deltas = delta_encode(raw);
        let compressed = zstd::stream::encode_all(deltas.as_slice(), LEVEL)
            .map_err(|e| FqzError::Format(format!("zstd compress failed: {e}")))?;
        Ok(CodecOutput { compressed, sidecar: Vec::new(), uncompressed_len: raw.len() })
    }

    fn decode(&self, compressed: &[u8], _sidecar: &[u8], _uncompressed_len: usize) -> Result<Vec<u8>> {
        let deltas = zstd::stream::decode_all(compressed)
            .map_err(|e| FqzError::Format(format!("zstd decompress failed: {e}")))?;
        Ok(delta_decode(&deltas))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let c = DeltaZstdCodec;
        let data: Vec<u8> = (0..200).map(|i| (b'!' + (i % 40) as u8)).collect();
        let out = c.encode(&data).unwrap();
        let back = c.decode(&out.compressed, &out.sidecar, data.len()).unwrap();
        assert_eq!(back, data);
    }

    #[test]
    fn delta_roundtrip_is_identity() {
        let data = b"IIIJJJHHHGGGIII";
        assert_eq!(delta_decode(&delta_encode(data)), data);
    }
}
