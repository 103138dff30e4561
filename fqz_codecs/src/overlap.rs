//! Simplified stand-in for the overlap-aware sequence codec. Approximates
//! its benefit with zstd tuned for a long match window, so repeated
//! substrings from overlapping reads anywhere earlier in the stream — not
//! just the previous few KB — can still be found.

use fqz_core::codec::{Codec, CodecOutput};
use fqz_core::error::{FqzError, Result};
use fqz_core::format::{CodecFamily, CodecTag};
use zstd::stream::raw::{CParameter, DParameter};
use zstd::stream::{Decoder, Encoder};

const LEVEL: i32 = 15;
/// 2^27 = 128 MiB match window, comfortably larger than a typical FASTQ
/// chunk so overlaps anywhere in the chunk are still in range.
const WINDOW_LOG: i32 = 27;

pub struct OverlapV1Codec;

impl Codec for OverlapV1Codec {
    fn tag(&self) -> CodecTag {
        CodecTag::new(CodecFamily::OverlapV1, 1)
    }

    fn name(&self) -> &'static str {
        "overlap-v1"
    }

    fn encode(&self, raw: &[u8]) -> Result<CodecOutput> {
        let mut encoder = Encoder::new(Vec::new(), LEVEL)
            .map_err(|e| FqzError::Format(format!("zstd encoder init failed: {e}")))?;
        encoder
            .set_parameter(CParameter::WindowLog(WINDOW_LOG as u32))
            .map_err(|e| FqzError::Format(format!("zstd window-log param failed: {e}")))?;
        std::io::Write::write_all(&mut encoder, raw).map_err(FqzError::io)?;
        let compressed = encoder.finish().map_err(FqzError::io)?;
        Ok(CodecOutput { compressed, sidecar: Vec::new(), uncompressed_len: raw.len() })
    }

    fn decode(&self, compressed: &[u8], _sidecar: &[u8], _uncompressed_len: usize) -> Result<Vec<u8>> {
        let mut decoder =
            Decoder::new(compressed).map_err(|e| FqzError::Format(format!("zstd decoder init failed: {e}")))?;
        decoder
            .set_parameter(DParameter::WindowLogMax(WINDOW_LOG as u32))
            .map_err(|e| FqzError::Format(format!("zstd window-log param failed: {e}")))?;
        let mut out = Vec::new();
        std::io::Read::read_to_end(&mut decoder, &mut out).map_err(FqzError::io)?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_with_repeated_overlaps() {
        let c = OverlapV1Codec;
        let read = b"ACGTTGCATTAGCATTACGGGATCCATGGCTAGCATGCATCG";
        let mut data = Vec::new();
        for _ in 0..100 {
            data.extend_from_slice(read);
        }
        let out = c.encode(&data).unwrap();
        assert!(out.compressed.len() < data.len());
        let back = c.decode(&out.compressed, &out.sidecar, data.len()).unwrap();
        assert_eq!(back, data);
    }
}
