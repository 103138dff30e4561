//! Archive reader: header/footer/index load on open, random access, range
//! scans, and checksum verification. Opens by reading the footer first,
//! then the index, leaving block payloads to load lazily on demand.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use crate::block::{BlockAssembler, Record};
pub use crate::block::StreamSelector;
use crate::codec::Codec;
use crate::error::{FqzError, Result};
use crate::format::{
    BlockHeader, CodecTag, Footer, GlobalHeader, IndexEntry, BLOCK_HEADER_SIZE, FOOTER_SIZE,
    FORMAT_MAJOR, INDEX_ENTRY_SIZE, INDEX_HEADER_SIZE, MAGIC,
};
use crate::reorder::ReorderMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyMode {
    /// Trust the footer's global checksum and the index; decode nothing up
    /// front.
    Quick,
    /// Recompute and compare the global checksum over the whole file.
    Global,
    /// Recompute and compare each block's `payload_xxh64` individually.
    PerBlock,
}

pub struct Archive {
    file: File,
    pub global_header: GlobalHeader,
    pub footer: Footer,
    pub index: Vec<IndexEntry>,
    pub reorder_map: Option<ReorderMap>,
}

impl Archive {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut file = File::open(path).map_err(|e| FqzError::io_at(path.to_path_buf(), e))?;

        let mut preamble = [0u8; 9];
        file.read_exact(&mut preamble).map_err(FqzError::io)?;
        if &preamble[..8] != MAGIC {
            return Err(FqzError::Format("bad magic: not an FQZ archive".into()));
        }
        let version = preamble[8];
        let major = version >> 4;
        if major != FORMAT_MAJOR {
            return Err(FqzError::Format(format!(
                "unsupported archive major version {major}; this reader supports major version {FORMAT_MAJOR}"
            )));
        }
        // Minor version differences are advisory only: a
        // newer-minor archive may carry header fields this reader skips,
        // but its block layout is unchanged.

        let global_header = GlobalHeader::read(&mut file)?;

        let file_len = file.metadata().map_err(FqzError::io)?.len();
        if file_len < FOOTER_SIZE {
            return Err(FqzError::Format("file too small to contain a footer".into()));
        }
        file.seek(SeekFrom::End(-(FOOTER_SIZE as i64))).map_err(FqzError::io)?;
        let footer = Footer::read(&mut file)?;

        file.seek(SeekFrom::Start(footer.index_offset)).map_err(FqzError::io)?;
        let header_size = crate::byteio::read_u32(&mut file)? as u64;
        let entry_size = crate::byteio::read_u32(&mut file)? as u64;
        let num_blocks = crate::byteio::read_u32(&mut file)?;
        if header_size != INDEX_HEADER_SIZE || entry_size != INDEX_ENTRY_SIZE {
            return Err(FqzError::Format("index header size mismatch".into()));
        }
        let mut index = Vec::with_capacity(num_blocks as usize);
        for _ in 0..num_blocks {
            index.push(IndexEntry::read(&mut file)?);
        }

        let reorder_map = if footer.reorder_map_offset != 0 {
            file.seek(SeekFrom::Start(footer.reorder_map_offset)).map_err(FqzError::io)?;
            Some(ReorderMap::decode(&mut file)?)
        } else {
            None
        };

        Ok(Self { file, global_header, footer, index, reorder_map })
    }

    pub fn block_count(&self) -> usize {
        self.index.len()
    }

    /// Reads and decodes block `block_id` in full.
    pub fn read_block(
        &mut self,
        block_id: u32,
        codecs: [&dyn Codec; 4],
        selector: StreamSelector,
    ) -> Result<Vec<Record>> {
        let entry = self
            .index
            .get(block_id as usize)
            .ok_or_else(|| FqzError::Format(format!("block id {block_id} out of range")))?
            .clone();
        self.file.seek(SeekFrom::Start(entry.offset)).map_err(FqzError::io)?;
        let header = BlockHeader::read(&mut self.file)?;
        let payload_len = header.compressed_size - BLOCK_HEADER_SIZE;
        let mut payload = vec![0u8; payload_len as usize];
        self.file.read_exact(&mut payload).map_err(FqzError::io)?;

        let sidecars: [Vec<u8>; 4] = Default::default();
        BlockAssembler::disassemble(&header, &payload, &sidecars, codecs, selector)
    }

    /// Finds the block(s) covering 1-based archive record ids
    /// `[start, end)` via binary search over `archive_id_start`, and
    /// returns the records in that range, in archive order.
    pub fn read_range(
        &mut self,
        start: u64,
        end: u64,
        codecs: [&dyn Codec; 4],
        selector: StreamSelector,
    ) -> Result<Vec<Record>> {
        if start >= end {
            return Ok(Vec::new());
        }
        let first_block = self
            .index
            .partition_point(|e| e.archive_id_start + e.record_count as u64 <= start);

        let mut out = Vec::new();
        for block_id in first_block..self.index.len() {
            let entry = &self.index[block_id];
            if entry.archive_id_start >= end {
                break;
            }
            let records = self.read_block(block_id as u32, codecs, selector)?;
            let block_start = entry.archive_id_start;
            for (i, record) in records.into_iter().enumerate() {
                let archive_id = block_start + i as u64;
                if archive_id >= start && archive_id < end {
                    out.push(record);
                }
            }
        }
        Ok(out)
    }

    /// Reads every block and returns records in on-disk block order
    /// (*not* reversing any reorder map).
    pub fn read_all_blocks(&mut self, codecs: [&dyn Codec; 4], selector: StreamSelector) -> Result<Vec<Record>> {
        let mut out = Vec::new();
        for block_id in 0..self.index.len() as u32 {
            out.extend(self.read_block(block_id, codecs, selector)?);
        }
        Ok(out)
    }

    /// Like `read_all_blocks`, but a block whose checksum fails or whose
    /// header is malformed is not fatal: its records are replaced with
    /// placeholders (`N` sequence, `placeholder_quality` quality, empty id)
    /// and `on_warning` is called once with the block id and the error that
    /// was downgraded. Used by `decompress --skip-corrupted`.
    pub fn read_all_blocks_lenient(
        &mut self,
        codecs: [&dyn Codec; 4],
        selector: StreamSelector,
        placeholder_quality: u8,
        mut on_warning: impl FnMut(u32, &FqzError),
    ) -> Result<Vec<Record>> {
        let mut out = Vec::new();
        for block_id in 0..self.index.len() as u32 {
            match self.read_block(block_id, codecs, selector) {
                Ok(records) => out.extend(records),
                Err(err @ (FqzError::Checksum { .. } | FqzError::Format(_) | FqzError::UnsupportedCodec { .. })) => {
                    on_warning(block_id, &err);
                    let record_count = self.index[block_id as usize].record_count;
                    out.extend((0..record_count).map(|_| Record {
                        id: Vec::new(),
                        sequence: b"N".to_vec(),
                        quality: vec![placeholder_quality],
                    }));
                }
                Err(err) => return Err(err),
            }
        }
        Ok(out)
    }

    /// Reads every block and, if a reorder map is present, restores
    /// original input order.
    pub fn read_all_in_original_order(
        &mut self,
        codecs: [&dyn Codec; 4],
        selector: StreamSelector,
    ) -> Result<Vec<Record>> {
        let stored = self.read_all_blocks(codecs, selector)?;
        match &self.reorder_map {
            None => Ok(stored),
            Some(map) => {
                if map.len() != stored.len() {
                    return Err(FqzError::Format(
                        "reorder map length does not match total record count".into(),
                    ));
                }
                let mut restored: Vec<Option<Record>> = vec![None; stored.len()];
                for (stored_pos, record) in stored.into_iter().enumerate() {
                    let original_pos = map.forward[stored_pos] as usize;
                    restored[original_pos] = Some(record);
                }
                restored
                    .into_iter()
                    .map(|r| r.ok_or_else(|| FqzError::Format("reorder map left a gap".into())))
                    .collect()
            }
        }
    }

    pub fn verify(&mut self, mode: VerifyMode, codecs: [&dyn Codec; 4]) -> Result<()> {
        match mode {
            VerifyMode::Quick => Ok(()),
            VerifyMode::Global => self.verify_global_checksum(),
            VerifyMode::PerBlock => self.verify_per_block_checksums(codecs),
        }
    }

    fn verify_global_checksum(&mut self) -> Result<()> {
        self.file.seek(SeekFrom::Start(0)).map_err(FqzError::io)?;
        let file_len = self.file.metadata().map_err(FqzError::io)?.len();
        let payload_len = file_len - FOOTER_SIZE;
        let mut remaining = payload_len;
        let mut buf = [0u8; 64 * 1024];
        let mut hasher = xxhash_rust::xxh64::Xxh64::new(crate::byteio::XXH64_SEED);
        while remaining > 0 {
            let to_read = remaining.min(buf.len() as u64) as usize;
            self.file.read_exact(&mut buf[..to_read]).map_err(FqzError::io)?;
            hasher.update(&buf[..to_read]);
            remaining -= to_read as u64;
        }
        let actual = hasher.digest();
        if actual != self.footer.global_checksum {
            return Err(FqzError::Checksum { block_id: None, expected: self.footer.global_checksum, actual });
        }
        Ok(())
    }

    /// Decodes every stream of every block and lets `BlockAssembler`
    /// recompute `payload_xxh64` over the decoded raw bytes — the same
    /// verification `read_block` does for a full-selector read, just without
    /// keeping the resulting records around.
    fn verify_per_block_checksums(&mut self, codecs: [&dyn Codec; 4]) -> Result<()> {
        for i in 0..self.index.len() {
            self.read_block(i as u32, codecs, StreamSelector::all())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{Chunk, Record};
    use crate::codec::CodecOutput;
    use crate::format::CodecFamily;
    use crate::writer::Writer;

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

    fn write_test_archive(dest: &Path) {
        let mut w = Writer::create(dest).unwrap();
        w.write_header(GlobalHeader {
            flags: 0,
            general_compression_algo: CodecFamily::Raw as u8,
            checksum_type: 0,
            total_record_count: 2,
            original_filename: "r.fastq".into(),
            creation_timestamp: 0,
        })
        .unwrap();
        let pt = Passthrough;
        let codecs: [&dyn Codec; 4] = [&pt, &pt, &pt, &pt];
        let chunk = Chunk {
            records: vec![
                Record::new(b"r1".to_vec(), b"ACGT".to_vec(), b"IIII".to_vec()),
                Record::new(b"r2".to_vec(), b"TTTT".to_vec(), b"JJJJ".to_vec()),
            ],
            archive_id_start: 1,
        };
        w.write_block(&chunk, codecs).unwrap();
        w.finish(None, None).unwrap();
    }

    #[test]
    fn open_and_read_all_blocks() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("a.fqz");
        write_test_archive(&dest);

        let mut archive = Archive::open(&dest).unwrap();
        assert_eq!(archive.block_count(), 1);
        let pt = Passthrough;
        let codecs: [&dyn Codec; 4] = [&pt, &pt, &pt, &pt];
        let records = archive.read_all_blocks(codecs, StreamSelector::all()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].sequence, b"ACGT");
        assert_eq!(records[1].sequence, b"TTTT");
    }

    #[test]
    fn verify_global_and_per_block() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("b.fqz");
        write_test_archive(&dest);
        let mut archive = Archive::open(&dest).unwrap();
        let pt = Passthrough;
        let codecs: [&dyn Codec; 4] = [&pt, &pt, &pt, &pt];
        archive.verify(VerifyMode::Global, codecs).unwrap();
        archive.verify(VerifyMode::PerBlock, codecs).unwrap();
    }

    #[test]
    fn read_range_selects_subset() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("c.fqz");
        write_test_archive(&dest);
        let mut archive = Archive::open(&dest).unwrap();
        let pt = Passthrough;
        let codecs: [&dyn Codec; 4] = [&pt, &pt, &pt, &pt];
        let records = archive.read_range(2, 3, codecs, StreamSelector::all()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].sequence, b"TTTT");
    }
}
