//! The identity codec: stores a stream uncompressed. Useful as a baseline,
//! as a fallback when compression would expand tiny streams, and as the
//! tag written for an omitted aux-length stream.

use fqz_core::codec::{Codec, CodecOutput};
use fqz_core::error::Result;
use fqz_core::format::{CodecFamily, CodecTag};

pub struct RawCodec;

impl Codec for RawCodec {
    fn tag(&self) -> CodecTag {
        CodecTag::new(CodecFamily::Raw, 0)
    }

    fn name(&self) -> &'static str {
        "raw"
    }

    fn encode(&self, raw: &[u8]) -> Result<CodecOutput> {
        Ok(CodecOutput { compressed: raw.to_vec(), sidecar: Vec::new(), uncompressed_len: raw.len() })
    }

    fn decode(&self, compressed: &[u8], _sidecar: &[u8], _uncompressed_len: usize) -> Result<Vec<u8>> {
        Ok(compressed.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let c = RawCodec;
        let data = b"ACGTACGTNN";
        let out = c.encode(data).unwrap();
        assert_eq!(out.compressed, data);
        let back = c.decode(&out.compressed, &out.sidecar, data.len()).unwrap();
        assert_eq!(back, data);
    }
}
