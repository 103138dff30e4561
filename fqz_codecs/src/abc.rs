//! Simplified stand-in for the ABC-family sequence codec. Implements the
//! `Codec` contract with a 2-bit base packing plus an exception sidecar for
//! non-ACGT symbols (N, IUPAC ambiguity codes), then zstd over the packed
//! bytes — the same "domain transform, then general compressor" shape as
//! [`crate::delta_zstd`], applied to bases instead of quality deltas.

use fqz_core::codec::{Codec, CodecOutput};
use fqz_core::error::{FqzError, Result};
use fqz_core::format::{CodecFamily, CodecTag};

const LEVEL: i32 = 9;

pub struct AbcV1Codec;

fn base_to_bits(b: u8) -> u8 {
    match b {
        b'A' => 0b00,
        b'C' => 0b01,
        b'G' => 0b10,
        b'T' => 0b11,
        _ => 0b00,
    }
}

fn bits_to_base(bits: u8) -> u8 {
    match bits & 0b11 {
        0b00 => b'A',
        0b01 => b'C',
        0b10 => b'G',
        _ => b'T',
    }
}

impl Codec for AbcV1Codec {
    fn tag(&self) -> CodecTag {
        CodecTag::new(CodecFamily::AbcV1, 1)
    }

    fn name(&self) -> &'static str {
        "abc-v1"
    }

    fn encode(&self, raw: &[u8]) -> Result<CodecOutput> {
        let mut packed = vec![0u8; raw.len().div_ceil(4)];
        // Exceptions sidecar: varint-prefixed count, then (u32 position, u8
        // original byte) pairs for every base that isn't plain ACGT.
        let mut exceptions = Vec::new();
        let mut exception_count: u32 = 0;

        for (i, &b) in raw.iter().enumerate() {
            let byte_idx = i / 4;
            let bit_off = (i % 4) * 2;
            packed[byte_idx] |= base_to_bits(b) << bit_off;
            if !matches!(b, b'A' | b'C' | b'G' | b'T') {
                exceptions.extend_from_slice(&(i as u32).to_le_bytes());
                exceptions.push(b);
                exception_count += 1;
            }
        }

        let mut sidecar = Vec::with_capacity(4 + exceptions.len());
        sidecar.extend_from_slice(&exception_count.to_le_bytes());
        sidecar.extend_from_slice(&exceptions);

        let compressed = zstd::stream::encode_all(packed.as_slice(), LEVEL)
            .map_err(|e| FqzError::Format(format!("zstd compress failed: {e}")))?;
        Ok(CodecOutput { compressed, sidecar, uncompressed_len: raw.len() })
    }

    fn decode(&self, compressed: &[u8], sidecar: &[u8], uncompressed_len: usize) -> Result<Vec<u8>> {
        let packed = zstd::stream::decode_all(compressed)
            .map_err(|e| FqzError::Format(format!("zstd decompress failed: {e}")))?;

        let mut out = Vec::with_capacity(uncompressed_len);
        for i in 0..uncompressed_len {
            let byte_idx = i / 4;
            let bit_off = (i % 4) * 2;
            let byte = *packed
                .get(byte_idx)
                .ok_or_else(|| FqzError::Format("abc-v1 packed stream truncated".into()))?;
            out.push(bits_to_base((byte >> bit_off) & 0b11));
        }

        if sidecar.len() < 4 {
            return Err(FqzError::Format("abc-v1 sidecar truncated".into()));
        }
        let count = u32::from_le_bytes(sidecar[0..4].try_into().unwrap());
        let mut cursor = 4usize;
        for _ in 0..count {
            let entry = sidecar
                .get(cursor..cursor + 5)
                .ok_or_else(|| FqzError::Format("abc-v1 sidecar exception truncated".into()))?;
            let pos = u32::from_le_bytes(entry[0..4].try_into().unwrap()) as usize;
            let original = entry[4];
            if let Some(slot) = out.get_mut(pos) {
                *slot = original;
            }
            cursor += 5;
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_plain_acgt() {
        let c = AbcV1Codec;
        let data = b"ACGTACGTACGTTTTTGGGGCCCCAAAA".repeat(10);
        let out = c.encode(&data).unwrap();
        let back = c.decode(&out.compressed, &out.sidecar, data.len()).unwrap();
        assert_eq!(back, data);
    }

    #[test]
    fn roundtrip_with_ambiguity_codes() {
        let c = AbcV1Codec;
        let data = b"ACGTNACGTNNNNRYKMACGT".to_vec();
        let out = c.encode(&data).unwrap();
        let back = c.decode(&out.compressed, &out.sidecar, data.len()).unwrap();
        assert_eq!(back, data);
    }
}
