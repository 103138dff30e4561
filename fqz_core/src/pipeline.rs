//! Three-stage ordered pipeline: serial reader (S1) → parallel worker pool
//! (S2) → serial ordered writer (S3), with bounded in-flight backpressure
//! and cooperative cancellation.
//!
//! Chunks are pulled from the source in batches; each batch is encoded with
//! a `rayon` parallel iterator, which preserves input order in its output
//! `Vec`, so no out-of-order reassembly buffer is needed within a batch.
//! Each batch is flushed to the writer before the next is read: read N,
//! encode N in parallel, write N in order. The batch size doubles as the
//! bound on in-flight chunks.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use rayon::prelude::*;

use crate::block::{BlockAssembler, Chunk, EncodedBlock};
use crate::codec::Codec;
use crate::error::{FqzError, Result};

/// Progress counters updated as batches complete, read by a periodic
/// caller-supplied callback.
#[derive(Default)]
pub struct Progress {
    pub chunks_read: AtomicU64,
    pub blocks_encoded: AtomicU64,
    pub bytes_in: AtomicU64,
}

impl Progress {
    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            chunks_read: self.chunks_read.load(Ordering::Relaxed),
            blocks_encoded: self.blocks_encoded.load(Ordering::Relaxed),
            bytes_in: self.bytes_in.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ProgressSnapshot {
    pub chunks_read: u64,
    pub blocks_encoded: u64,
    pub bytes_in: u64,
}

/// How often the progress callback may be invoked, at most.
const PROGRESS_INTERVAL: Duration = Duration::from_millis(500);

/// Default number of chunks encoded concurrently — also the bound on how
/// many chunks may be buffered in memory between S1 and S3 at once.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 8;

/// Runs the compress-side pipeline: pulls chunks from `next_chunk` in
/// batches of `max_in_flight`, encodes each batch in parallel on a
/// dedicated rayon pool, then delivers encoded blocks to `on_block`
/// strictly in input order before reading the next batch.
pub struct Pipeline {
    pool: rayon::ThreadPool,
    max_in_flight: usize,
}

impl Pipeline {
    pub fn new(num_threads: usize, max_in_flight: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads.max(1))
            .build()
            .map_err(|e| FqzError::InvalidState(format!("failed to build worker pool: {e}")))?;
        Ok(Self { pool, max_in_flight: max_in_flight.max(1) })
    }

    /// `next_chunk`, `on_progress`, and `on_block` all run on the calling
    /// thread (S1/S3); only block assembly (S2) runs on the pool.
    /// `block_id` assigned to each block is its position in read order,
    /// starting at `first_block_id`.
    pub fn run(
        &self,
        mut next_chunk: impl FnMut() -> Result<Option<Chunk>>,
        codecs: [&(dyn Codec + Sync); 4],
        first_block_id: u32,
        progress: &Progress,
        mut on_progress: impl FnMut(ProgressSnapshot),
        mut on_block: impl FnMut(EncodedBlock, &Chunk) -> Result<()>,
    ) -> Result<()> {
        let mut next_block_id = first_block_id;
        let mut last_progress = Instant::now();

        loop {
            if crate::signal::is_cancelled() {
                return Err(FqzError::Cancelled);
            }

            let mut batch = Vec::with_capacity(self.max_in_flight);
            for _ in 0..self.max_in_flight {
                match next_chunk()? {
                    Some(chunk) => batch.push(chunk),
                    None => break,
                }
            }
            if batch.is_empty() {
                break;
            }

            progress.chunks_read.fetch_add(batch.len() as u64, Ordering::Relaxed);
            progress.bytes_in.fetch_add(
                batch.iter().flat_map(|c| c.records.iter()).map(|r| r.sequence.len() as u64).sum(),
                Ordering::Relaxed,
            );

            let encoded_batch: Vec<Result<EncodedBlock>> = self.pool.install(|| {
                batch
                    .par_iter()
                    .enumerate()
                    .map(|(i, chunk)| {
                        BlockAssembler::assemble(next_block_id + i as u32, chunk, codecs)
                    })
                    .collect()
            });

            next_block_id += batch.len() as u32;

            for (chunk, encoded) in batch.into_iter().zip(encoded_batch.into_iter()) {
                let encoded = encoded?;
                progress.blocks_encoded.fetch_add(1, Ordering::Relaxed);
                on_block(encoded, &chunk)?;
            }

            if last_progress.elapsed() >= PROGRESS_INTERVAL {
                on_progress(progress.snapshot());
                last_progress = Instant::now();
            }
        }

        on_progress(progress.snapshot());
        Ok(())
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
    fn pipeline_preserves_chunk_order() {
        let pipeline = Pipeline::new(4, 3).unwrap();
        let pt = Passthrough;
        let codecs: [&(dyn Codec + Sync); 4] = [&pt, &pt, &pt, &pt];
        let progress = Progress::default();

        let total_chunks = 20u64;
        let mut next_id = 0u64;
        let mut produced = Vec::new();

        pipeline
            .run(
                || {
                    if next_id >= total_chunks {
                        return Ok(None);
                    }
                    let chunk = Chunk {
                        records: vec![Record::new(
                            format!("r{next_id}").into_bytes(),
                            b"ACGT".to_vec(),
                            b"IIII".to_vec(),
                        )],
                        archive_id_start: next_id + 1,
                    };
                    next_id += 1;
                    Ok(Some(chunk))
                },
                codecs,
                0,
                &progress,
                |_| {},
                |encoded, chunk| {
                    produced.push((encoded.header.block_id, chunk.archive_id_start));
                    Ok(())
                },
            )
            .unwrap();

        assert_eq!(produced.len(), total_chunks as usize);
        for (i, (block_id, archive_id_start)) in produced.iter().enumerate() {
            assert_eq!(*block_id, i as u32);
            assert_eq!(*archive_id_start, i as u64 + 1);
        }
    }

    #[test]
    fn propagates_first_error() {
        struct Failing;
        impl Codec for Failing {
            fn tag(&self) -> CodecTag {
                CodecTag::raw(1)
            }
            fn name(&self) -> &'static str {
                "failing"
            }
            fn encode(&self, _raw: &[u8]) -> Result<CodecOutput> {
                Err(FqzError::Format("boom".into()))
            }
            fn decode(&self, _c: &[u8], _s: &[u8], _l: usize) -> Result<Vec<u8>> {
                unreachable!()
            }
        }

        let pipeline = Pipeline::new(2, 2).unwrap();
        let pt = Passthrough;
        let failing = Failing;
        let codecs: [&(dyn Codec + Sync); 4] = [&failing, &pt, &pt, &pt];
        let progress = Progress::default();
        let mut emitted = 0u64;

        let result = pipeline.run(
            || {
                emitted += 1;
                if emitted > 5 {
                    return Ok(None);
                }
                Ok(Some(Chunk {
                    records: vec![Record::new(b"r".to_vec(), b"ACGT".to_vec(), b"IIII".to_vec())],
                    archive_id_start: emitted,
                }))
            },
            codecs,
            0,
            &progress,
            |_| {},
            |_, _| Ok(()),
        );

        assert!(result.is_err());
    }
}
