//! On-disk FQZ1 layout: magic/version, global header, block header, block
//! index, reorder map header, and footer.

use std::io::{Read, Write};

use crate::byteio::{read_u16, read_u32, read_u64, read_u8, write_u16, write_u32, write_u64, write_u8};
use crate::error::{FqzError, Result};

/// 8-byte magic. Chosen in the PNG/FLAC tradition of a non-ASCII-safe
/// sentinel (`\r\n` + a C1 control byte) so that a text-mode copy or
/// line-ending translation of the archive is detectable immediately.
pub const MAGIC: &[u8; 8] = b"FQZ1\r\n\x1a\n";

/// Format major/minor this implementation writes.
pub const FORMAT_MAJOR: u8 = 1;
pub const FORMAT_MINOR: u8 = 0;

/// `magic[8] + version[1]`.
pub const PREAMBLE_SIZE: u64 = 9;

/// Fixed 32-byte footer.
pub const FOOTER_SIZE: u64 = 32;

/// Fixed-size prefix of a block header, before the payload.
///
/// `headerSize:u32 + blockId:u32 + checksumType:u8 + codec[4]:u8x4 +
///  reserved:(u8+u16) + payload_xxh64:u64 + record_count:u32 +
///  uniform_length:u32 + compressed_size:u64 + offsets[4]:u64x4 + sizes[4]:u64x4`
pub const BLOCK_HEADER_SIZE: u64 = 4 + 4 + 1 + 4 + 1 + 2 + 8 + 4 + 4 + 8 + 32 + 32;

/// `offset:u64 + compressed_size:u64 + archive_id_start:u64 + record_count:u32`.
pub const INDEX_ENTRY_SIZE: u64 = 8 + 8 + 8 + 4;

/// `headerSize:u32 + entrySize:u32 + numBlocks:u32`.
pub const INDEX_HEADER_SIZE: u64 = 4 + 4 + 4;

/// `version:u16 + reserved:u16 + totalReads:u64 + forwardMapSize:u64 + reverseMapSize:u64`.
pub const REORDER_HEADER_SIZE: u64 = 2 + 2 + 8 + 8 + 8;

pub const DEFAULT_BLOCK_RECORDS: u32 = 100_000;

// ── Global header flags ─────────────────────────────────────

pub const FLAG_IS_PAIRED_END: u64 = 1 << 0;
pub const FLAG_PRESERVE_ORIGINAL_ORDER: u64 = 1 << 1;
pub const FLAG_QUALITY_MODE_SHIFT: u64 = 3;
pub const FLAG_QUALITY_MODE_MASK: u64 = 0b11 << FLAG_QUALITY_MODE_SHIFT;
pub const FLAG_ID_MODE_SHIFT: u64 = 5;
pub const FLAG_ID_MODE_MASK: u64 = 0b11 << FLAG_ID_MODE_SHIFT;
pub const FLAG_HAS_REORDER_MAP: u64 = 1 << 7;
pub const FLAG_PE_LAYOUT_SHIFT: u64 = 8;
pub const FLAG_PE_LAYOUT_MASK: u64 = 0b11 << FLAG_PE_LAYOUT_SHIFT;
pub const FLAG_READ_LENGTH_CLASS_SHIFT: u64 = 10;
pub const FLAG_READ_LENGTH_CLASS_MASK: u64 = 0b11 << FLAG_READ_LENGTH_CLASS_SHIFT;
pub const FLAG_STREAMING_MODE: u64 = 1 << 12;

/// Bits not named above. Must be zero on write; ignored on read.
pub const FLAG_RESERVED_MASK: u64 = !(FLAG_IS_PAIRED_END
    | FLAG_PRESERVE_ORIGINAL_ORDER
    | FLAG_QUALITY_MODE_MASK
    | FLAG_ID_MODE_MASK
    | FLAG_HAS_REORDER_MAP
    | FLAG_PE_LAYOUT_MASK
    | FLAG_READ_LENGTH_CLASS_MASK
    | FLAG_STREAMING_MODE);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum QualityMode {
    Lossless = 0,
    Illumina8 = 1,
    Qvz = 2,
    Discard = 3,
}

impl QualityMode {
    pub fn from_bits(bits: u64) -> Self {
        match (bits & FLAG_QUALITY_MODE_MASK) >> FLAG_QUALITY_MODE_SHIFT {
            0 => QualityMode::Lossless,
            1 => QualityMode::Illumina8,
            2 => QualityMode::Qvz,
            _ => QualityMode::Discard,
        }
    }
    pub fn to_bits(self) -> u64 {
        (self as u64) << FLAG_QUALITY_MODE_SHIFT
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum IdMode {
    Exact = 0,
    Tokenize = 1,
    Discard = 2,
}

impl IdMode {
    pub fn from_bits(bits: u64) -> Self {
        match (bits & FLAG_ID_MODE_MASK) >> FLAG_ID_MODE_SHIFT {
            0 => IdMode::Exact,
            1 => IdMode::Tokenize,
            _ => IdMode::Discard,
        }
    }
    pub fn to_bits(self) -> u64 {
        (self as u64) << FLAG_ID_MODE_SHIFT
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PeLayout {
    Interleaved = 0,
    Consecutive = 1,
}

impl PeLayout {
    pub fn from_bits(bits: u64) -> Self {
        match (bits & FLAG_PE_LAYOUT_MASK) >> FLAG_PE_LAYOUT_SHIFT {
            0 => PeLayout::Interleaved,
            _ => PeLayout::Consecutive,
        }
    }
    pub fn to_bits(self) -> u64 {
        (self as u64) << FLAG_PE_LAYOUT_SHIFT
    }
}

/// Read-length class, decided by the global analysis phase or by options;
/// fixes the default sequence-stream codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ReadLengthClass {
    Short = 0,
    Medium = 1,
    Long = 2,
}

impl ReadLengthClass {
    pub fn from_bits(bits: u64) -> Self {
        match (bits & FLAG_READ_LENGTH_CLASS_MASK) >> FLAG_READ_LENGTH_CLASS_SHIFT {
            0 => ReadLengthClass::Short,
            1 => ReadLengthClass::Medium,
            _ => ReadLengthClass::Long,
        }
    }
    pub fn to_bits(self) -> u64 {
        (self as u64) << FLAG_READ_LENGTH_CLASS_SHIFT
    }

    /// Classify a sequence length against fixed length bands. Short reads
    /// top out at a conventional short-read-sequencer length; anything past
    /// the legacy 2-bit packing limit (511bp) is Long. These cut points are
    /// configuration, not contract, and may be overridden by CLI options.
    pub fn classify(len: usize) -> Self {
        const SHORT_MAX: usize = 300;
        const MEDIUM_MAX: usize = 511;
        if len <= SHORT_MAX {
            ReadLengthClass::Short
        } else if len <= MEDIUM_MAX {
            ReadLengthClass::Medium
        } else {
            ReadLengthClass::Long
        }
    }
}

// ── Codec family ────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CodecFamily {
    Raw = 0x0,
    AbcV1 = 0x1,
    ScmV1 = 0x2,
    DeltaLzma = 0x3,
    DeltaZstd = 0x4,
    DeltaVarint = 0x5,
    OverlapV1 = 0x6,
    ZstdPlain = 0x7,
    ScmOrder1 = 0x8,
    External = 0x9,
    Reserved = 0xA,
}

impl CodecFamily {
    pub fn from_u8(v: u8) -> Option<Self> {
        Some(match v {
            0x0 => CodecFamily::Raw,
            0x1 => CodecFamily::AbcV1,
            0x2 => CodecFamily::ScmV1,
            0x3 => CodecFamily::DeltaLzma,
            0x4 => CodecFamily::DeltaZstd,
            0x5 => CodecFamily::DeltaVarint,
            0x6 => CodecFamily::OverlapV1,
            0x7 => CodecFamily::ZstdPlain,
            0x8 => CodecFamily::ScmOrder1,
            0x9 => CodecFamily::External,
            0xA => CodecFamily::Reserved,
            _ => return None,
        })
    }
}

/// A codec tag: high nibble family, low nibble version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CodecTag {
    pub family: u8,
    pub version: u8,
}

impl CodecTag {
    pub fn new(family: CodecFamily, version: u8) -> Self {
        debug_assert!(version <= 0xF);
        Self { family: family as u8, version: version & 0xF }
    }

    pub fn raw(version: u8) -> Self {
        Self::new(CodecFamily::Raw, version)
    }

    pub fn pack(self) -> u8 {
        ((self.family & 0xF) << 4) | (self.version & 0xF)
    }

    pub fn unpack(byte: u8) -> Self {
        Self { family: (byte >> 4) & 0xF, version: byte & 0xF }
    }

    pub fn family(self) -> Option<CodecFamily> {
        CodecFamily::from_u8(self.family)
    }
}

// ── Global header ────────────────────────────────────

#[derive(Debug, Clone)]
pub struct GlobalHeader {
    pub flags: u64,
    /// Informational: the codec family most block streams use by default.
    /// Block-level codec choice is always authoritative; this is a display
    /// hint only.
    pub general_compression_algo: u8,
    /// Only 0 (xxh64) is defined.
    pub checksum_type: u8,
    pub total_record_count: u64,
    pub original_filename: String,
    pub creation_timestamp: u64,
}

impl GlobalHeader {
    pub fn has_flag(&self, flag: u64) -> bool {
        self.flags & flag != 0
    }

    pub fn write<W: Write>(&self, w: &mut W) -> Result<()> {
        let filename_bytes = self.original_filename.as_bytes();
        let body_len = 8 /*flags*/ + 1 /*algo*/ + 1 /*checksum*/ + 8 /*count*/
            + 2 /*filename len*/ + filename_bytes.len() as u64 + 8 /*timestamp*/;
        let header_size = 4 /*header_size field itself*/ + body_len;

        write_u32(w, header_size as u32)?;
        write_u64(w, self.flags & !FLAG_RESERVED_MASK)?;
        write_u8(w, self.general_compression_algo)?;
        write_u8(w, self.checksum_type)?;
        write_u64(w, self.total_record_count)?;
        write_u16(w, filename_bytes.len() as u16)?;
        w.write_all(filename_bytes).map_err(FqzError::io)?;
        write_u64(w, self.creation_timestamp)?;
        Ok(())
    }

    pub fn read<R: Read>(r: &mut R) -> Result<Self> {
        let header_size = read_u32(r)? as u64;
        let flags = read_u64(r)?;
        let general_compression_algo = read_u8(r)?;
        let checksum_type = read_u8(r)?;
        let total_record_count = read_u64(r)?;
        let filename_len = read_u16(r)? as usize;
        let mut filename_buf = vec![0u8; filename_len];
        r.read_exact(&mut filename_buf).map_err(FqzError::io)?;
        let original_filename = String::from_utf8_lossy(&filename_buf).into_owned();
        let creation_timestamp = read_u64(r)?;

        let consumed = 4 + 8 + 1 + 1 + 8 + 2 + filename_len as u64 + 8;
        if consumed < header_size {
            // Forward-compatible: skip fields this reader doesn't know about.
            let mut skip = vec![0u8; (header_size - consumed) as usize];
            r.read_exact(&mut skip).map_err(FqzError::io)?;
        } else if consumed > header_size {
            return Err(FqzError::Format(format!(
                "global header declared {header_size} bytes but at least {consumed} were read"
            )));
        }

        Ok(Self {
            flags: flags & !FLAG_RESERVED_MASK,
            general_compression_algo,
            checksum_type,
            total_record_count,
            original_filename,
            creation_timestamp,
        })
    }
}

// ── Block header ────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct BlockHeader {
    pub block_id: u32,
    pub checksum_type: u8,
    pub codec: [u8; 4],
    pub payload_xxh64: u64,
    pub record_count: u32,
    pub uniform_length: u32,
    pub compressed_size: u64,
    pub offsets: [u64; 4],
    pub sizes: [u64; 4],
}

impl BlockHeader {
    pub fn write<W: Write>(&self, w: &mut W) -> Result<()> {
        write_u32(w, BLOCK_HEADER_SIZE as u32)?;
        write_u32(w, self.block_id)?;
        write_u8(w, self.checksum_type)?;
        w.write_all(&self.codec).map_err(FqzError::io)?;
        write_u8(w, 0)?; // reserved u8
        write_u16(w, 0)?; // reserved u16
        write_u64(w, self.payload_xxh64)?;
        write_u32(w, self.record_count)?;
        write_u32(w, self.uniform_length)?;
        write_u64(w, self.compressed_size)?;
        for o in self.offsets {
            write_u64(w, o)?;
        }
        for s in self.sizes {
            write_u64(w, s)?;
        }
        Ok(())
    }

    pub fn read<R: Read>(r: &mut R) -> Result<Self> {
        let header_size = read_u32(r)? as u64;
        if header_size != BLOCK_HEADER_SIZE {
            return Err(FqzError::Format(format!(
                "block header size {header_size} does not match expected {BLOCK_HEADER_SIZE}"
            )));
        }
        let block_id = read_u32(r)?;
        let checksum_type = read_u8(r)?;
        let mut codec = [0u8; 4];
        r.read_exact(&mut codec).map_err(FqzError::io)?;
        let _reserved_u8 = read_u8(r)?;
        let _reserved_u16 = read_u16(r)?;
        let payload_xxh64 = read_u64(r)?;
        let record_count = read_u32(r)?;
        let uniform_length = read_u32(r)?;
        let compressed_size = read_u64(r)?;
        let mut offsets = [0u64; 4];
        for o in &mut offsets {
            *o = read_u64(r)?;
        }
        let mut sizes = [0u64; 4];
        for s in &mut sizes {
            *s = read_u64(r)?;
        }
        Ok(Self {
            block_id,
            checksum_type,
            codec,
            payload_xxh64,
            record_count,
            uniform_length,
            compressed_size,
            offsets,
            sizes,
        })
    }
}

// ── Block index ──────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct IndexEntry {
    pub offset: u64,
    pub compressed_size: u64,
    pub archive_id_start: u64,
    pub record_count: u32,
}

impl IndexEntry {
    pub fn write<W: Write>(&self, w: &mut W) -> Result<()> {
        write_u64(w, self.offset)?;
        write_u64(w, self.compressed_size)?;
        write_u64(w, self.archive_id_start)?;
        write_u32(w, self.record_count)?;
        Ok(())
    }

    pub fn read<R: Read>(r: &mut R) -> Result<Self> {
        Ok(Self {
            offset: read_u64(r)?,
            compressed_size: read_u64(r)?,
            archive_id_start: read_u64(r)?,
            record_count: read_u32(r)?,
        })
    }

    /// Whether 1-based archive record `r` falls in this block's range.
    pub fn contains(&self, archive_record_id: u64) -> bool {
        archive_record_id >= self.archive_id_start
            && archive_record_id < self.archive_id_start + self.record_count as u64
    }
}

// ── Footer ──────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Footer {
    pub index_offset: u64,
    pub reorder_map_offset: u64,
    pub global_checksum: u64,
}

impl Footer {
    pub fn write<W: Write>(&self, w: &mut W) -> Result<()> {
        write_u64(w, self.index_offset)?;
        write_u64(w, self.reorder_map_offset)?;
        write_u64(w, self.global_checksum)?;
        w.write_all(MAGIC).map_err(FqzError::io)?;
        Ok(())
    }

    pub fn read<R: Read>(r: &mut R) -> Result<Self> {
        let index_offset = read_u64(r)?;
        let reorder_map_offset = read_u64(r)?;
        let global_checksum = read_u64(r)?;
        let mut trailing_magic = [0u8; 8];
        r.read_exact(&mut trailing_magic).map_err(FqzError::io)?;
        if &trailing_magic != MAGIC {
            return Err(FqzError::Format("footer trailing magic mismatch".into()));
        }
        Ok(Self { index_offset, reorder_map_offset, global_checksum })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_header_roundtrip() {
        let h = GlobalHeader {
            flags: FLAG_IS_PAIRED_END | QualityMode::Illumina8.to_bits(),
            general_compression_algo: CodecFamily::ZstdPlain as u8,
            checksum_type: 0,
            total_record_count: 42,
            original_filename: "reads.fastq".into(),
            creation_timestamp: 1_700_000_000,
        };
        let mut buf = Vec::new();
        h.write(&mut buf).unwrap();
        let mut cur = std::io::Cursor::new(buf);
        let h2 = GlobalHeader::read(&mut cur).unwrap();
        assert_eq!(h2.total_record_count, 42);
        assert_eq!(h2.original_filename, "reads.fastq");
        assert!(h2.has_flag(FLAG_IS_PAIRED_END));
        assert_eq!(QualityMode::from_bits(h2.flags), QualityMode::Illumina8);
    }

    #[test]
    fn block_header_roundtrip() {
        let h = BlockHeader {
            block_id: 7,
            checksum_type: 0,
            codec: [0, 1, 2, 5],
            payload_xxh64: 0xAABB,
            record_count: 100,
            uniform_length: 150,
            compressed_size: 1000,
            offsets: [0, 10, 20, 30],
            sizes: [10, 10, 10, 10],
        };
        let mut buf = Vec::new();
        h.write(&mut buf).unwrap();
        assert_eq!(buf.len() as u64, BLOCK_HEADER_SIZE);
        let mut cur = std::io::Cursor::new(buf);
        let h2 = BlockHeader::read(&mut cur).unwrap();
        assert_eq!(h2.block_id, 7);
        assert_eq!(h2.codec, [0, 1, 2, 5]);
        assert_eq!(h2.offsets, [0, 10, 20, 30]);
    }

    #[test]
    fn codec_tag_pack_unpack() {
        let t = CodecTag::new(CodecFamily::ScmOrder1, 3);
        let byte = t.pack();
        let t2 = CodecTag::unpack(byte);
        assert_eq!(t2.family(), Some(CodecFamily::ScmOrder1));
        assert_eq!(t2.version, 3);
    }

    #[test]
    fn footer_roundtrip() {
        let f = Footer { index_offset: 123, reorder_map_offset: 0, global_checksum: 0xDEAD };
        let mut buf = Vec::new();
        f.write(&mut buf).unwrap();
        assert_eq!(buf.len() as u64, FOOTER_SIZE);
        let mut cur = std::io::Cursor::new(buf);
        let f2 = Footer::read(&mut cur).unwrap();
        assert_eq!(f2.index_offset, 123);
        assert_eq!(f2.global_checksum, 0xDEAD);
    }
}
