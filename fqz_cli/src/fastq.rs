//! FASTQ input parsing on top of `needletail::parse_fastx_file`/
//! `parse_fastx_stdin`, exposed as a chunked iterator the pipeline can pull
//! from lazily rather than loading the whole file into memory up front.

use std::path::Path;

use fqz_core::error::{FqzError, Result};
use fqz_core::format::PeLayout;
use fqz_core::Record;
use needletail::parse_fastx_file;
use needletail::parse_fastx_stdin;
use needletail::parser::FastxReader;

/// Pulls `Record`s off a FASTQ source (file path, or stdin when
/// `path == "-"`) in fixed-size chunks for the pipeline's S1 stage.
pub struct FastqChunkReader {
    inner: Box<dyn FastxReader>,
    chunk_size: usize,
    next_archive_id: u64,
}

impl FastqChunkReader {
    pub fn open(path: &str, chunk_size: usize) -> Result<Self> {
        let inner: Box<dyn FastxReader> = if path == "-" {
            parse_fastx_stdin().map_err(|e| FqzError::Format(format!("failed to read FASTQ from stdin: {e}")))?
        } else {
            parse_fastx_file(Path::new(path))
                .map_err(|e| FqzError::Format(format!("failed to open FASTQ file {path}: {e}")))?
        };
        Ok(Self { inner, chunk_size, next_archive_id: 1 })
    }

    fn next_record(&mut self) -> Result<Option<Record>> {
        match self.inner.next() {
            Some(rec) => {
                let rec = rec.map_err(|e| FqzError::Format(format!("malformed FASTQ record: {e}")))?;
                let quality = rec
                    .qual()
                    .ok_or_else(|| FqzError::Format("FASTQ record is missing a quality string".into()))?
                    .to_vec();
                Ok(Some(Record::new(rec.id().to_vec(), rec.seq().into_owned(), quality)))
            }
            None => Ok(None),
        }
    }

    /// Reads up to `chunk_size` records, in FASTQ file order. Returns
    /// `None` once the input is exhausted, and an error if a record is
    /// missing a quality string (not true FASTQ).
    pub fn next_chunk(&mut self) -> Result<Option<fqz_core::Chunk>> {
        let mut records = Vec::with_capacity(self.chunk_size);
        while records.len() < self.chunk_size {
            match self.next_record()? {
                Some(rec) => records.push(rec),
                None => break,
            }
        }
        if records.is_empty() {
            return Ok(None);
        }
        let archive_id_start = self.next_archive_id;
        self.next_archive_id += records.len() as u64;
        Ok(Some(fqz_core::Chunk { records, archive_id_start }))
    }
}

/// Combines two FASTQ sources (R1/R2 of a paired-end run) into one record
/// stream, laid out per `PeLayout`: `Interleaved` alternates r1/r2 within
/// each chunk, `Consecutive` drains every R1 record before starting on R2.
pub struct PairedFastqChunkReader {
    r1: FastqChunkReader,
    r2: FastqChunkReader,
    chunk_size: usize,
    layout: PeLayout,
    next_archive_id: u64,
    /// Only meaningful for `Consecutive`: once R1 is exhausted, switch to
    /// draining R2 for the rest of the run.
    r1_exhausted: bool,
}

impl PairedFastqChunkReader {
    pub fn open(r1_path: &str, r2_path: &str, chunk_size: usize, layout: PeLayout) -> Result<Self> {
        Ok(Self {
            r1: FastqChunkReader::open(r1_path, chunk_size)?,
            r2: FastqChunkReader::open(r2_path, chunk_size)?,
            chunk_size,
            layout,
            next_archive_id: 1,
            r1_exhausted: false,
        })
    }

    pub fn next_chunk(&mut self) -> Result<Option<fqz_core::Chunk>> {
        let records = match self.layout {
            PeLayout::Interleaved => self.next_interleaved()?,
            PeLayout::Consecutive => self.next_consecutive()?,
        };
        if records.is_empty() {
            return Ok(None);
        }
        let archive_id_start = self.next_archive_id;
        self.next_archive_id += records.len() as u64;
        Ok(Some(fqz_core::Chunk { records, archive_id_start }))
    }

    fn next_interleaved(&mut self) -> Result<Vec<Record>> {
        let mut records = Vec::with_capacity(self.chunk_size);
        while records.len() < self.chunk_size {
            match (self.r1.next_record()?, self.r2.next_record()?) {
                (Some(a), Some(b)) => {
                    records.push(a);
                    records.push(b);
                }
                (None, None) => break,
                _ => {
                    return Err(FqzError::Format(
                        "paired-end inputs have different record counts".into(),
                    ))
                }
            }
        }
        Ok(records)
    }

    fn next_consecutive(&mut self) -> Result<Vec<Record>> {
        let mut records = Vec::with_capacity(self.chunk_size);
        if !self.r1_exhausted {
            while records.len() < self.chunk_size {
                match self.r1.next_record()? {
                    Some(r) => records.push(r),
                    None => {
                        self.r1_exhausted = true;
                        break;
                    }
                }
            }
            if !records.is_empty() {
                return Ok(records);
            }
        }
        while records.len() < self.chunk_size {
            match self.r2.next_record()? {
                Some(r) => records.push(r),
                None => break,
            }
        }
        Ok(records)
    }
}

/// Writes decoded records back out as FASTQ text, in the order given.
pub fn write_fastq<W: std::io::Write>(w: &mut W, records: &[Record]) -> Result<()> {
    for r in records {
        w.write_all(b"@").map_err(FqzError::io)?;
        w.write_all(&r.id).map_err(FqzError::io)?;
        w.write_all(b"\n").map_err(FqzError::io)?;
        w.write_all(&r.sequence).map_err(FqzError::io)?;
        w.write_all(b"\n+\n").map_err(FqzError::io)?;
        w.write_all(&r.quality).map_err(FqzError::io)?;
        w.write_all(b"\n").map_err(FqzError::io)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_fastq_roundtrip_format() {
        let records = vec![Record::new(b"r1".to_vec(), b"ACGT".to_vec(), b"IIII".to_vec())];
        let mut buf = Vec::new();
        write_fastq(&mut buf, &records).unwrap();
        assert_eq!(buf, b"@r1\nACGT\n+\nIIII\n");
    }
}
