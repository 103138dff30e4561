//! Simplified stand-in for the statistical context-model (SCM) quality
//! codec. Applies a move-to-front transform — values
//! seen recently move to the front of a working alphabet, so a quality
//! stream with locally-stable runs turns into mostly small indices — then
//! zstd, the same "cheap reversible transform, then general compressor"
//! shape used by [`crate::delta_zstd`] and [`crate::abc`].

use fqz_core::codec::{Codec, CodecOutput};
use fqz_core::error::{FqzError, Result};
use fqz_core::format::{CodecFamily, CodecTag};

const LEVEL: i32 = 9;

fn mtf_encode(raw: &[u8]) -> Vec<u8> {
    let mut alphabet: Vec<u8> = (0..=255u8).collect();
    let mut out = Vec::with_capacity(raw.len());
    for &b in raw {
        let pos = alphabet.iter().position(|&x| x == b).expect("alphabet covers all byte values");
        out.push(pos as u8);
        alphabet.remove(pos);
        alphabet.insert(0, b);
    }
    out
}

fn mtf_decode(encoded: &[u8]) -> Vec<u8> {
    let mut alphabet: Vec<u8> = (0..=255u8).collect();
    let mut out = Vec::with_capacity(encoded.len());
    for &pos in encoded {
        let b = alphabet[pos as usize];
        out.push(b);
        alphabet.remove(pos as usize);
        alphabet.insert(0, b);
    }
    out
}

pub struct ScmOrder1Codec;

impl Codec for ScmOrder1Codec {
    fn tag(&self) -> CodecTag {
        CodecTag::new(CodecFamily::ScmOrder1, 1)
    }

    fn name(&self) -> &'static str {
        "scm-order1"
    }

    fn encode(&self, raw: &[u8]) -> Result<CodecOutput> {
        let transformed = mtf_encode(raw);
        let compressed = zstd::stream::encode_all(transformed.as_slice(), LEVEL)
            .map_err(|e| FqzError::Format(format!("zstd compress failed: {e}")))?;
        Ok(CodecOutput { compressed, sidecar: Vec::new(), uncompressed_len: raw.len() })
    }

    fn decode(&self, compressed: &[u8], _sidecar: &[u8], _uncompressed_len: usize) -> Result<Vec<u8>> {
        let transformed = zstd::stream::decode_all(compressed)
            .map_err(|e| FqzError::Format(format!("zstd decompress failed: {e}")))?;
        Ok(mtf_decode(&transformed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mtf_roundtrip_is_identity() {
        let data = b"IIIJJJHHHIIIGGGIIIJJJ";
        assert_eq!(mtf_decode(&mtf_encode(data)), data);
    }

    #[test]
    fn codec_roundtrip() {
        let c = ScmOrder1Codec;
        let data = b"IIIIJJJJHHHHIIIIGGGGIIIIJJJJ".repeat(20);
        let out = c.encode(&data).unwrap();
        let back = c.decode(&out.compressed, &out.sidecar, data.len()).unwrap();
        assert_eq!(back, data);
    }
}
