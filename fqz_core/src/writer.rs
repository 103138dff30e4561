//! Archive writer: header → blocks → optional reorder map → index → footer,
//! written atomically via a temp file + rename, driven through an explicit
//! state machine with signal-safe cleanup on cancellation.

use std::fs::File;
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use xxhash_rust::xxh64::Xxh64;

use crate::block::{BlockAssembler, Chunk};
use crate::byteio::{HashingWriter, XXH64_SEED};
use crate::codec::Codec;
use crate::error::{FqzError, Result};
use crate::format::{Footer, GlobalHeader, IndexEntry, FORMAT_MAJOR, FORMAT_MINOR, MAGIC};
use crate::reorder::ReorderMap;
use crate::signal::TempFileGuard;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriterState {
    Fresh,
    HeaderWritten,
    WritingBlocks,
    ReorderMapWritten,
    Finalized,
    Aborted,
}

/// Streams an archive to a temp file, then atomically renames it into place
/// on `finish()`. Any error (including a caller dropping the writer without
/// calling `finish`) leaves the destination untouched.
pub struct Writer {
    state: WriterState,
    dest_path: PathBuf,
    temp_path: PathBuf,
    guard: TempFileGuard,
    out: HashingWriter<BufWriter<File>>,
    index: Vec<IndexEntry>,
    next_block_id: u32,
    next_archive_id: u64,
    total_record_count: u64,
    /// Byte offset of the `total_record_count` field within the file, so
    /// `finish` can patch it once the true count is known — a FASTQ source
    /// isn't pre-scanned, so this isn't known when the header is first
    /// written.
    total_record_count_offset: Option<u64>,
}

impl Writer {
    pub fn create(dest_path: impl AsRef<Path>) -> Result<Self> {
        let dest_path = dest_path.as_ref().to_path_buf();
        let temp_path = sibling_temp_path(&dest_path);
        let file = File::create(&temp_path).map_err(|e| FqzError::io_at(temp_path.clone(), e))?;
        let guard = TempFileGuard::new(temp_path.clone());
        Ok(Self {
            state: WriterState::Fresh,
            dest_path,
            temp_path,
            guard,
            out: HashingWriter::new(BufWriter::new(file)),
            index: Vec::new(),
            next_block_id: 0,
            next_archive_id: 1,
            total_record_count: 0,
            total_record_count_offset: None,
        })
    }

    /// Writes the magic, version byte, and global header. Must be called
    /// exactly once before any `write_block`.
    pub fn write_header(&mut self, mut header: GlobalHeader) -> Result<()> {
        if self.state != WriterState::Fresh {
            return Err(FqzError::InvalidState("write_header called out of order".into()));
        }
        self.out.write_all(MAGIC).map_err(FqzError::io)?;
        self.out
            .write_all(&[(FORMAT_MAJOR << 4) | FORMAT_MINOR])
            .map_err(FqzError::io)?;
        self.total_record_count = header.total_record_count;
        // header layout: header_size(4) + flags(8) + algo(1) + checksum_type(1)
        // precede total_record_count, per GlobalHeader::write.
        self.total_record_count_offset = Some(self.out.bytes_written() + 4 + 8 + 1 + 1);
        header.write(&mut self.out)?;
        self.state = WriterState::HeaderWritten;
        Ok(())
    }

    /// Encodes `chunk` into one block and appends it, recording an index
    /// entry for random access.
    pub fn write_block(&mut self, chunk: &Chunk, codecs: [&dyn Codec; 4]) -> Result<()> {
        if self.state != WriterState::HeaderWritten && self.state != WriterState::WritingBlocks {
            return Err(FqzError::InvalidState("write_block called before header or after finish".into()));
        }
        if crate::signal::is_cancelled() {
            return Err(FqzError::Cancelled);
        }

        let block_id = self.next_block_id;
        self.next_block_id += 1;
        let encoded = BlockAssembler::assemble(block_id, chunk, codecs)?;

        let offset = self.out.bytes_written();
        encoded.header.write(&mut self.out)?;
        self.out.write_all(&encoded.payload).map_err(FqzError::io)?;

        self.index.push(IndexEntry {
            offset,
            compressed_size: encoded.header.compressed_size,
            archive_id_start: chunk.archive_id_start,
            record_count: encoded.header.record_count,
        });
        self.next_archive_id = chunk.archive_id_start + chunk.len() as u64;
        self.state = WriterState::WritingBlocks;
        Ok(())
    }

    /// Appends a pre-encoded block produced off-thread by a pipeline worker.
    /// The caller is responsible for handing blocks to this method strictly
    /// in output order.
    pub fn write_encoded_block(
        &mut self,
        header: &crate::format::BlockHeader,
        payload: &[u8],
        archive_id_start: u64,
    ) -> Result<()> {
        if self.state != WriterState::HeaderWritten && self.state != WriterState::WritingBlocks {
            return Err(FqzError::InvalidState("write_encoded_block called before header or after finish".into()));
        }
        let offset = self.out.bytes_written();
        header.write(&mut self.out)?;
        self.out.write_all(payload).map_err(FqzError::io)?;
        self.index.push(IndexEntry {
            offset,
            compressed_size: header.compressed_size,
            archive_id_start,
            record_count: header.record_count,
        });
        self.state = WriterState::WritingBlocks;
        Ok(())
    }

    /// Writes the reorder map, if this archive needs one (only when input
    /// records were reshuffled before blocking, e.g. by a length-class
    /// sort).
    pub fn write_reorder_map(&mut self, map: &ReorderMap) -> Result<u64> {
        if self.state != WriterState::WritingBlocks {
            return Err(FqzError::InvalidState("write_reorder_map called out of order".into()));
        }
        map.validate()?;
        let offset = self.out.bytes_written();
        map.encode(&mut self.out)?;
        self.state = WriterState::ReorderMapWritten;
        Ok(offset)
    }

    /// Writes the block index and footer, flushes, computes the global
    /// checksum, then atomically renames the temp file into place.
    ///
    /// `total_record_count`, if given, patches the header field written as
    /// a placeholder by `write_header` — needed when the caller (e.g. a
    /// FASTQ source read lazily through the pipeline) only learns the true
    /// count once every chunk has been read.
    pub fn finish(mut self, reorder_map_offset: Option<u64>, total_record_count: Option<u64>) -> Result<()> {
        if self.state != WriterState::WritingBlocks && self.state != WriterState::ReorderMapWritten {
            return Err(FqzError::InvalidState("finish called before any block was written".into()));
        }

        let index_offset = self.out.bytes_written();
        crate::byteio::write_u32(&mut self.out, crate::format::INDEX_HEADER_SIZE as u32)?;
        crate::byteio::write_u32(&mut self.out, crate::format::INDEX_ENTRY_SIZE as u32)?;
        crate::byteio::write_u32(&mut self.out, self.index.len() as u32)?;
        for entry in &self.index {
            entry.write(&mut self.out)?;
        }
        let pre_footer_end = self.out.bytes_written();
        self.out.flush().map_err(FqzError::io)?;

        // Patching the header after the fact means the incremental digest
        // no longer matches the file's final bytes, so the checksum is
        // recomputed here with one forward read pass instead of trusted
        // from `HashingWriter::digest()`.
        let file = self.out.get_mut().get_mut();
        if let (Some(total), Some(offset)) = (total_record_count, self.total_record_count_offset) {
            file.seek(SeekFrom::Start(offset)).map_err(FqzError::io)?;
            file.write_all(&total.to_le_bytes()).map_err(FqzError::io)?;
            self.total_record_count = total;
        }

        file.seek(SeekFrom::Start(0)).map_err(FqzError::io)?;
        let mut hasher = Xxh64::new(XXH64_SEED);
        let mut buf = [0u8; 64 * 1024];
        let mut remaining = pre_footer_end;
        while remaining > 0 {
            let to_read = remaining.min(buf.len() as u64) as usize;
            file.read_exact(&mut buf[..to_read]).map_err(FqzError::io)?;
            hasher.update(&buf[..to_read]);
            remaining -= to_read as u64;
        }
        let global_checksum = hasher.digest();
        file.seek(SeekFrom::Start(pre_footer_end)).map_err(FqzError::io)?;

        let footer = Footer {
            index_offset,
            reorder_map_offset: reorder_map_offset.unwrap_or(0),
            global_checksum,
        };
        footer.write(&mut self.out)?;

        self.out.get_mut().flush().map_err(FqzError::io)?;
        self.out.into_inner().into_inner().map_err(|e| FqzError::io(e.into_error()))?;

        std::fs::rename(&self.temp_path, &self.dest_path)
            .map_err(|e| FqzError::io_at(self.dest_path.clone(), e))?;
        self.guard.disarm();
        self.state = WriterState::Finalized;
        Ok(())
    }

    /// Explicitly discard this archive: the temp file is removed and
    /// nothing is renamed into place. Equivalent to dropping the writer,
    /// spelled out for callers that want to record why.
    pub fn abort(mut self) {
        self.state = WriterState::Aborted;
        let _ = std::fs::remove_file(&self.temp_path);
        self.guard.disarm();
    }

    pub fn total_record_count(&self) -> u64 {
        self.total_record_count
    }

    pub fn next_archive_id(&self) -> u64 {
        self.next_archive_id
    }
}

fn sibling_temp_path(dest: &Path) -> PathBuf {
    let file_name = dest.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    let temp_name = format!(".{file_name}.fqz-tmp-{}", std::process::id());
    match dest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.join(temp_name),
        _ => PathBuf::from(temp_name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Record;
    use crate::codec::CodecOutput;
    use crate::format::CodecTag;

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
    fn write_header_then_block_then_finish() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.fqz");
        let mut w = Writer::create(&dest).unwrap();
        w.write_header(GlobalHeader {
            flags: 0,
            general_compression_algo: 0,
            checksum_type: 0,
            total_record_count: 1,
            original_filename: "r.fastq".into(),
            creation_timestamp: 0,
        })
        .unwrap();

        let chunk = Chunk {
            records: vec![Record::new(b"r1".to_vec(), b"ACGT".to_vec(), b"IIII".to_vec())],
            archive_id_start: 1,
        };
        let pt = Passthrough;
        let codecs: [&dyn Codec; 4] = [&pt, &pt, &pt, &pt];
        w.write_block(&chunk, codecs).unwrap();
        w.finish(None, None).unwrap();

        assert!(dest.exists());
        let bytes = std::fs::read(&dest).unwrap();
        assert_eq!(&bytes[..8], MAGIC);
    }

    #[test]
    fn abort_leaves_no_destination_file() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("aborted.fqz");
        let mut w = Writer::create(&dest).unwrap();
        w.write_header(GlobalHeader {
            flags: 0,
            general_compression_algo: 0,
            checksum_type: 0,
            total_record_count: 0,
            original_filename: String::new(),
            creation_timestamp: 0,
        })
        .unwrap();
        w.abort();
        assert!(!dest.exists());
    }
}
