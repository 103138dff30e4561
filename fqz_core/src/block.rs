//! Record/Chunk/Block data model and the block assembler.

use crate::byteio::hash64;
use crate::codec::{Codec, CodecOutput, StreamRole};
use crate::error::{FqzError, Result};
use crate::format::{BlockHeader, CodecTag, BLOCK_HEADER_SIZE};

/// One FASTQ read: id line, sequence, and quality string, each a raw byte
/// string (not assumed UTF-8).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub id: Vec<u8>,
    pub sequence: Vec<u8>,
    pub quality: Vec<u8>,
}

impl Record {
    pub fn new(id: impl Into<Vec<u8>>, sequence: impl Into<Vec<u8>>, quality: impl Into<Vec<u8>>) -> Self {
        Self { id: id.into(), sequence: sequence.into(), quality: quality.into() }
    }
}

/// A contiguous run of records destined for one block. The unit of work
/// handed to a pipeline worker.
#[derive(Debug, Clone, Default)]
pub struct Chunk {
    pub records: Vec<Record>,
    /// 1-based archive-wide id of `records[0]`, stable regardless of any
    /// later reordering.
    pub archive_id_start: u64,
}

impl Chunk {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// If every record in the chunk has the same sequence/quality length,
    /// return it — lets the assembler omit the per-record length stream.
    pub fn uniform_length(&self) -> Option<u32> {
        let first = self.records.first()?.sequence.len();
        if self.records.iter().all(|r| r.sequence.len() == first && r.quality.len() == first) {
            u32::try_from(first).ok()
        } else {
            None
        }
    }
}

/// The four independently-codec'd streams a block is split into, plus the
/// framing needed to decode it.
pub struct EncodedBlock {
    pub header: BlockHeader,
    /// Stream payloads in offsets/sizes order: ids, sequence, quality, aux.
    pub payload: Vec<u8>,
    /// Sidecar bytes per stream, concatenated in the same order, needed by
    /// some codecs to recover framing.
    pub sidecars: [Vec<u8>; 4],
}

const ROLE_ORDER: [StreamRole; 4] =
    [StreamRole::Ids, StreamRole::Sequence, StreamRole::Quality, StreamRole::AuxLengths];

/// Bitmask of which of the four streams a caller wants decoded. Lets
/// header-only/id-only scans skip decompressing sequence and quality
/// entirely, per the random-access reader's selective-decode contract.
#[derive(Debug, Clone, Copy)]
pub struct StreamSelector {
    pub ids: bool,
    pub sequence: bool,
    pub quality: bool,
}

impl StreamSelector {
    pub fn all() -> Self {
        Self { ids: true, sequence: true, quality: true }
    }

    pub fn ids_only() -> Self {
        Self { ids: true, sequence: false, quality: false }
    }

    /// Whether the auxiliary length stream must be decoded to make sense of
    /// the streams this selector does want: lengths are only needed to slice
    /// variable-length sequence/quality data.
    fn needs_aux(&self, uniform_length: bool) -> bool {
        !uniform_length && (self.sequence || self.quality)
    }
}

/// Packs a chunk of records into four raw byte streams, then hands each to
/// its assigned codec and lays out the result as one block.
pub struct BlockAssembler;

impl BlockAssembler {
    /// `codecs[i]` is the codec for `ROLE_ORDER[i]`.
    pub fn assemble(
        block_id: u32,
        chunk: &Chunk,
        codecs: [&dyn Codec; 4],
    ) -> Result<EncodedBlock> {
        let record_count = u32::try_from(chunk.len())
            .map_err(|_| FqzError::Format("chunk too large for u32 record_count".into()))?;
        let uniform_length = chunk.uniform_length();

        let mut ids_raw = Vec::new();
        let mut seq_raw = Vec::new();
        let mut qual_raw = Vec::new();
        let mut aux_raw = Vec::new();

        for r in &chunk.records {
            ids_raw.extend_from_slice(&(r.id.len() as u32).to_le_bytes());
            ids_raw.extend_from_slice(&r.id);
            seq_raw.extend_from_slice(&r.sequence);
            qual_raw.extend_from_slice(&r.quality);
            if uniform_length.is_none() {
                aux_raw.extend_from_slice(&(r.sequence.len() as u32).to_le_bytes());
            }
        }

        let raws = [ids_raw, seq_raw, qual_raw, aux_raw];
        let mut outputs: [CodecOutput; 4] = Default::default();
        let mut payload = Vec::new();
        let mut offsets = [0u64; 4];
        let mut sizes = [0u64; 4];
        let mut sidecars: [Vec<u8>; 4] = Default::default();
        let mut codec_tags = [0u8; 4];

        for (i, raw) in raws.iter().enumerate() {
            // Per the Open Question decision in DESIGN.md: a uniform-length
            // block's omitted aux stream is tagged Raw with zero length,
            // rather than whatever codec was assigned, since an empty
            // stream trivially round-trips through any codec but Raw makes
            // the omission explicit on inspection.
            let (out, tag) = if i == 3 && uniform_length.is_some() {
                (CodecOutput::default(), CodecTag::raw(0))
            } else {
                (codecs[i].encode(raw)?, codecs[i].tag())
            };
            codec_tags[i] = tag.pack();
            offsets[i] = payload.len() as u64;
            sizes[i] = out.compressed.len() as u64;
            payload.extend_from_slice(&out.compressed);
            sidecars[i] = out.sidecar.clone();
            outputs[i] = out;
        }

        // Hashed over the raw, uncompressed stream concatenation so the
        // checksum verifies the actual record data rather than whatever a
        // given codec happens to produce — swapping codecs must not change
        // payload_xxh64 for the same records.
        let payload_xxh64 = {
            let mut buf = Vec::with_capacity(raws.iter().map(|r| r.len()).sum());
            for raw in &raws {
                buf.extend_from_slice(raw);
            }
            hash64(&buf)
        };
        let compressed_size = BLOCK_HEADER_SIZE + payload.len() as u64;

        let header = BlockHeader {
            block_id,
            checksum_type: 0,
            codec: codec_tags,
            payload_xxh64,
            record_count,
            uniform_length: uniform_length.unwrap_or(0),
            compressed_size,
            offsets,
            sizes,
        };

        Ok(EncodedBlock { header, payload, sidecars })
    }

    /// Inverse of `assemble`: decodes the streams `selector` asks for and
    /// reconstitutes `Record`s in block-local order. Streams left out of
    /// `selector` are never decompressed; their fields come back empty.
    ///
    /// The payload checksum can only be verified when every stream is
    /// decoded — a partial selection skips it, matching how the reader's
    /// own per-block verify pass always requests `StreamSelector::all()`.
    pub fn disassemble(
        header: &BlockHeader,
        payload: &[u8],
        sidecars: &[Vec<u8>; 4],
        codecs: [&dyn Codec; 4],
        selector: StreamSelector,
    ) -> Result<Vec<Record>> {
        let uniform_length = if header.uniform_length > 0 { Some(header.uniform_length) } else { None };
        let wants = [
            selector.ids,
            selector.sequence,
            selector.quality,
            selector.needs_aux(uniform_length.is_some()),
        ];
        let mut streams: [Vec<u8>; 4] = Default::default();

        for (i, stream) in streams.iter_mut().enumerate() {
            if !wants[i] || (i == 3 && uniform_length.is_some()) {
                continue;
            }
            let start = header.offsets[i] as usize;
            let end = start + header.sizes[i] as usize;
            let slice = payload.get(start..end).ok_or_else(|| {
                FqzError::Format(format!("block {} stream {i} out of bounds", header.block_id))
            })?;
            let tag = CodecTag::unpack(header.codec[i]);
            let codec = codecs[i];
            if codec.tag() != tag {
                return Err(FqzError::UnsupportedCodec { family: tag.family, version: tag.version });
            }
            *stream = codec.decode(slice, &sidecars[i], 0)?;
        }

        if wants.iter().all(|w| *w) {
            // Checksum covers the decoded raw streams, matching how
            // `assemble` computes it — this verifies the record data the
            // codecs produced, not merely that the compressed bytes are
            // self-consistent.
            let actual = {
                let mut buf = Vec::with_capacity(streams.iter().map(|s| s.len()).sum());
                for s in &streams {
                    buf.extend_from_slice(s);
                }
                hash64(&buf)
            };
            if actual != header.payload_xxh64 {
                return Err(FqzError::Checksum {
                    block_id: Some(header.block_id),
                    expected: header.payload_xxh64,
                    actual,
                });
            }
        }

        let [ids_raw, seq_raw, qual_raw, aux_raw] = streams;

        let mut records = Vec::with_capacity(header.record_count as usize);
        let mut ids_cursor = 0usize;
        let mut seq_cursor = 0usize;
        let mut qual_cursor = 0usize;
        let mut aux_cursor = 0usize;

        for _ in 0..header.record_count {
            let id = if selector.ids {
                let id_len = read_u32_at(&ids_raw, &mut ids_cursor)? as usize;
                let id = ids_raw
                    .get(ids_cursor..ids_cursor + id_len)
                    .ok_or_else(|| FqzError::Format("id stream truncated".into()))?
                    .to_vec();
                ids_cursor += id_len;
                id
            } else {
                Vec::new()
            };

            let rec_len = if let Some(u) = uniform_length {
                u as usize
            } else if selector.sequence || selector.quality {
                read_u32_at(&aux_raw, &mut aux_cursor)? as usize
            } else {
                0
            };

            let sequence = if selector.sequence {
                let s = seq_raw
                    .get(seq_cursor..seq_cursor + rec_len)
                    .ok_or_else(|| FqzError::Format("sequence stream truncated".into()))?
                    .to_vec();
                seq_cursor += rec_len;
                s
            } else {
                Vec::new()
            };

            let quality = if selector.quality {
                let q = qual_raw
                    .get(qual_cursor..qual_cursor + rec_len)
                    .ok_or_else(|| FqzError::Format("quality stream truncated".into()))?
                    .to_vec();
                qual_cursor += rec_len;
                q
            } else {
                Vec::new()
            };

            records.push(Record { id, sequence, quality });
        }

        Ok(records)
    }
}

fn read_u32_at(buf: &[u8], cursor: &mut usize) -> Result<u32> {
    let bytes = buf
        .get(*cursor..*cursor + 4)
        .ok_or_else(|| FqzError::Format("length-prefixed stream truncated".into()))?;
    let v = u32::from_le_bytes(bytes.try_into().unwrap());
    *cursor += 4;
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::CodecFamily;

    struct Passthrough;
    impl Codec for Passthrough {
        fn tag(&self) -> CodecTag {
            CodecTag::raw(0)
        }
        fn name(&self) -> &'static str {
            "passthrough"
        }
        fn encode(&self, raw: &[u8]) -> Result<CodecOutput> {
            Ok(CodecOutput { compressed: raw.to_vec(), sidecar: Vec::new(), uncompressed_len: raw.len() })
        }
        fn decode(&self, compressed: &[u8], _sidecar: &[u8], _len: usize) -> Result<Vec<u8>> {
            Ok(compressed.to_vec())
        }
    }

    #[test]
    fn assemble_disassemble_roundtrip_variable_length() {
        let chunk = Chunk {
            records: vec![
                Record::new(b"r1".to_vec(), b"ACGT".to_vec(), b"IIII".to_vec()),
                Record::new(b"r2".to_vec(), b"ACG".to_vec(), b"III".to_vec()),
            ],
            archive_id_start: 1,
        };
        let pt = Passthrough;
        let codecs: [&dyn Codec; 4] = [&pt, &pt, &pt, &pt];
        let encoded = BlockAssembler::assemble(0, &chunk, codecs).unwrap();
        assert_eq!(encoded.header.uniform_length, 0);

        let decoded =
            BlockAssembler::disassemble(&encoded.header, &encoded.payload, &encoded.sidecars, codecs, StreamSelector::all())
                .unwrap();
        assert_eq!(decoded, chunk.records);
    }

    #[test]
    fn assemble_disassemble_roundtrip_uniform_length() {
        let chunk = Chunk {
            records: vec![
                Record::new(b"r1".to_vec(), b"ACGT".to_vec(), b"IIII".to_vec()),
                Record::new(b"r2".to_vec(), b"TTTT".to_vec(), b"JJJJ".to_vec()),
            ],
            archive_id_start: 1,
        };
        let pt = Passthrough;
        let codecs: [&dyn Codec; 4] = [&pt, &pt, &pt, &pt];
        let encoded = BlockAssembler::assemble(0, &chunk, codecs).unwrap();
        assert_eq!(encoded.header.uniform_length, 4);
        assert_eq!(encoded.header.sizes[3], 0);

        let decoded =
            BlockAssembler::disassemble(&encoded.header, &encoded.payload, &encoded.sidecars, codecs, StreamSelector::all())
                .unwrap();
        assert_eq!(decoded, chunk.records);
    }

    #[test]
    fn checksum_mismatch_detected() {
        let chunk = Chunk {
            records: vec![Record::new(b"r1".to_vec(), b"ACGT".to_vec(), b"IIII".to_vec())],
            archive_id_start: 1,
        };
        let pt = Passthrough;
        let codecs: [&dyn Codec; 4] = [&pt, &pt, &pt, &pt];
        let mut encoded = BlockAssembler::assemble(0, &chunk, codecs).unwrap();
        encoded.header.payload_xxh64 ^= 1;
        let err =
            BlockAssembler::disassemble(&encoded.header, &encoded.payload, &encoded.sidecars, codecs, StreamSelector::all())
                .unwrap_err();
        assert!(matches!(err, FqzError::Checksum { .. }));
    }
}
