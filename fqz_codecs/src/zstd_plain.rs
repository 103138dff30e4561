//! Plain zstd over a whole stream, no domain-specific transform first.

use fqz_core::codec::{Codec, CodecOutput};
use fqz_core::error::{FqzError, Result};
use fqz_core::format::{CodecFamily, CodecTag};

const DEFAULT_LEVEL: i32 = 9;

pub struct ZstdPlainCodec {
    level: i32,
}

impl ZstdPlainCodec {
    pub fn new() -> Self {
        Self { level: DEFAULT_LEVEL }
    }

    pub fn with_level(level: i32) -> Self {
        Self { level }
    }
}

impl Default for ZstdPlainCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Codec for ZstdPlainCodec {
    fn tag(&self) -> CodecTag {
        CodecTag::new(CodecFamily::ZstdPlain, 0)
    }

    fn name(&self) -> &'static str {
        "zstd-plain"
    }

    fn encode(&self, raw: &[u8]) -> Result<CodecOutput> {
        let compressed = zstd::stream::encode_all(raw, self.level)
            .map_err(|e| FqzError::Format(format!("zstd compress failed: {e}")))?;
        Ok(CodecOutput { compressed, sidecar: Vec::new(), uncompressed_len: raw.len() })
    }

    fn decode(&self, compressed: &[u8], _sidecar: &[u8], _uncompressed_len: usize) -> Result<Vec<u8>> {
        zstd::stream::decode_all(compressed).map_err(|e| FqzError::Format(format!("zstd decompress failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let c = ZstdPlainCodec::new();
        let data = b"ACGTACGTACGTACGTACGTACGTNNNNNNNNN".repeat(50);
        let out = c.encode(&data).unwrap();
        assert!(out.compressed.len() < data.len());
        let back = c.decode(&out.compressed, &out.sidecar, data.len()).unwrap();
        assert_eq!(back, data);
    }
}
