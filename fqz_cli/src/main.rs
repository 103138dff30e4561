//! CLI for compressing, inspecting, and randomly accessing FQZ1 FASTQ
//! archives: compress, decompress, info, verify, and bench subcommands.

mod fastq;

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context};
use chrono::Utc;
use clap::{Parser, Subcommand};
use fqz_codecs::{default_aux_lengths_codec, default_ids_codec, default_quality_codec, full_registry};
use fqz_core::codec::Codec;
use fqz_core::error::FqzError;
use fqz_core::format::{
    CodecTag, GlobalHeader, IdMode, PeLayout, QualityMode, ReadLengthClass, FLAG_HAS_REORDER_MAP,
    FLAG_IS_PAIRED_END, FLAG_PRESERVE_ORIGINAL_ORDER, FLAG_STREAMING_MODE,
};
use fqz_core::pipeline::{Pipeline, Progress, DEFAULT_MAX_IN_FLIGHT};
use fqz_core::reader::{Archive, StreamSelector, VerifyMode};
use fqz_core::reorder::ReorderMap;
use fqz_core::writer::Writer;
use fqz_core::Record;

/// Bytes of bookkeeping overhead budgeted per in-memory record when
/// `--memory-limit` caps the chunk size.
const PER_RECORD_OVERHEAD_BYTES: u64 = 50;

#[derive(Parser)]
#[command(name = "fqz", version, about = "FASTQ-aware compression archive")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compress a FASTQ file (or stdin, with `-`) into an FQZ1 archive.
    Compress {
        #[arg(short, long)]
        input: String,
        #[arg(short, long)]
        output: PathBuf,
        #[arg(short = 'l', long, default_value_t = 6, value_parser = clap::value_parser!(u8).range(1..=9))]
        level: u8,
        #[arg(long, default_value_t = num_cpus())]
        threads: usize,
        #[arg(long, default_value_t = fqz_core::format::DEFAULT_BLOCK_RECORDS as usize)]
        chunk_size: usize,
        #[arg(long, default_value_t = DEFAULT_MAX_IN_FLIGHT)]
        max_in_flight: usize,
        /// Cap chunk size so roughly this many megabytes of records are held
        /// in memory at once (see the per-record overhead budget).
        #[arg(long)]
        memory_limit: Option<u64>,
        #[arg(long, value_enum, default_value = "none")]
        lossy_quality: LossyQualityArg,
        #[arg(long, value_enum, default_value = "exact")]
        id_mode: IdModeArg,
        /// Sort records by sequence length before blocking, recording a
        /// reorder map so original order can be restored on decompress.
        #[arg(long, overrides_with = "no_reorder")]
        reorder: bool,
        #[arg(long, overrides_with = "reorder")]
        no_reorder: bool,
        /// Preserve strict input order and skip the reorder-map pass
        /// entirely; mutually exclusive with `--reorder`.
        #[arg(long)]
        streaming: bool,
        #[arg(long, value_enum, default_value = "interleaved")]
        pe_layout: PeLayoutArg,
        /// Second FASTQ file of a paired-end run (R2); pairs with `--input`
        /// as R1.
        #[arg(short = '2', long = "second-input")]
        second_input: Option<String>,
        /// Overwrite an existing output file.
        #[arg(short, long)]
        force: bool,
    },
    /// Decompress an FQZ1 archive back to FASTQ.
    Decompress {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// 1-based inclusive:exclusive archive record range, e.g. `10:20`.
        #[arg(long)]
        range: Option<String>,
        /// Restore original input order using the embedded reorder map.
        #[arg(long)]
        original_order: bool,
        /// Decode only id streams, skipping sequence/quality/aux payloads.
        #[arg(long)]
        header_only: bool,
        /// Downgrade a corrupted block's checksum/format error into a
        /// warning, substituting placeholder records instead of failing.
        #[arg(long)]
        skip_corrupted: bool,
        /// Split paired-end output into `<output>_R1`/`<output>_R2` files
        /// per the archive's stored PE layout. Requires `--output`.
        #[arg(long)]
        split_pe: bool,
    },
    /// Print archive metadata.
    Info {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(long)]
        json: bool,
        #[arg(long)]
        blocks: bool,
    },
    /// Verify archive integrity.
    Verify {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(long, value_enum, default_value = "global")]
        mode: VerifyModeArg,
        /// Shorthand for `--mode quick`.
        #[arg(long)]
        quick: bool,
    },
    /// Measure compression throughput and ratio without writing output.
    Bench {
        #[arg(short, long)]
        input: String,
        #[arg(long, default_value_t = num_cpus())]
        threads: usize,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum VerifyModeArg {
    Quick,
    Global,
    PerBlock,
}

impl From<VerifyModeArg> for VerifyMode {
    fn from(v: VerifyModeArg) -> Self {
        match v {
            VerifyModeArg::Quick => VerifyMode::Quick,
            VerifyModeArg::Global => VerifyMode::Global,
            VerifyModeArg::PerBlock => VerifyMode::PerBlock,
        }
    }
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum LossyQualityArg {
    None,
    Illumina8,
    Qvz,
    Discard,
}

impl From<LossyQualityArg> for QualityMode {
    fn from(v: LossyQualityArg) -> Self {
        match v {
            LossyQualityArg::None => QualityMode::Lossless,
            LossyQualityArg::Illumina8 => QualityMode::Illumina8,
            LossyQualityArg::Qvz => QualityMode::Qvz,
            LossyQualityArg::Discard => QualityMode::Discard,
        }
    }
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum IdModeArg {
    Exact,
    Tokenize,
    Discard,
}

impl From<IdModeArg> for IdMode {
    fn from(v: IdModeArg) -> Self {
        match v {
            IdModeArg::Exact => IdMode::Exact,
            IdModeArg::Tokenize => IdMode::Tokenize,
            IdModeArg::Discard => IdMode::Discard,
        }
    }
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum PeLayoutArg {
    Interleaved,
    Consecutive,
}

impl From<PeLayoutArg> for PeLayout {
    fn from(v: PeLayoutArg) -> Self {
        match v {
            PeLayoutArg::Interleaved => PeLayout::Interleaved,
            PeLayoutArg::Consecutive => PeLayout::Consecutive,
        }
    }
}

fn num_cpus() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

fn human_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.2} {}", UNITS[unit])
    }
}

/// Illumina's published 8-level quality binning: each Phred score collapses
/// to one of 8 representative values, roughly evenly spaced across the
/// typical 0-41 range used by Illumina 1.8+ basecallers.
fn quantize_illumina8(ascii_qual: u8) -> u8 {
    let q = ascii_qual.saturating_sub(33);
    let binned = match q {
        0..=2 => 2,
        3..=14 => 11,
        15..=19 => 16,
        20..=24 => 21,
        25..=29 => 26,
        30..=34 => 31,
        35..=39 => 36,
        _ => 41,
    };
    binned + 33
}

/// `Qvz` is treated as a second name for the same bin table: a real
/// context-adaptive quantizer is out of scope here, but the flag still
/// produces a genuinely lossy, genuinely decodable archive.
fn apply_quality_mode(records: &mut [Record], mode: QualityMode) {
    match mode {
        QualityMode::Lossless => {}
        QualityMode::Illumina8 | QualityMode::Qvz => {
            for r in records.iter_mut() {
                for q in r.quality.iter_mut() {
                    *q = quantize_illumina8(*q);
                }
            }
        }
        QualityMode::Discard => {
            for r in records.iter_mut() {
                for q in r.quality.iter_mut() {
                    *q = b'I'; // fixed Q40, keeps stream length intact
                }
            }
        }
    }
}

/// `Tokenize` only changes which ids codec later reads favor; the id text
/// itself is carried through unchanged, so only `Discard` mutates records
/// here.
fn apply_id_mode(records: &mut [Record], mode: IdMode) {
    if let IdMode::Discard = mode {
        for r in records.iter_mut() {
            r.id.clear();
        }
    }
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("fqz: error: {err:#}");
        let exit_code = err
            .downcast_ref::<FqzError>()
            .map(|e| e.exit_code())
            .unwrap_or(fqz_core::error::EXIT_USAGE);
        std::process::exit(exit_code);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Compress {
            input,
            output,
            level,
            threads,
            chunk_size,
            max_in_flight,
            memory_limit,
            lossy_quality,
            id_mode,
            reorder,
            no_reorder,
            streaming,
            pe_layout,
            second_input,
            force,
        } => {
            if reorder && streaming {
                bail!(FqzError::Usage("--reorder and --streaming are mutually exclusive".into()));
            }
            let reorder = reorder && !no_reorder;
            let opts = CompressOptions {
                input,
                output,
                level,
                threads,
                chunk_size,
                max_in_flight,
                memory_limit,
                quality_mode: lossy_quality.into(),
                id_mode: id_mode.into(),
                reorder,
                streaming,
                pe_layout: pe_layout.into(),
                second_input,
                force,
            };
            cmd_compress(opts)
        }
        Command::Decompress { input, output, range, original_order, header_only, skip_corrupted, split_pe } => {
            cmd_decompress(DecompressOptions {
                input,
                output,
                range,
                original_order,
                header_only,
                skip_corrupted,
                split_pe,
            })
        }
        Command::Info { input, json, blocks } => cmd_info(&input, json, blocks),
        Command::Verify { input, mode, quick } => {
            let mode = if quick { VerifyMode::Quick } else { mode.into() };
            cmd_verify(&input, mode)
        }
        Command::Bench { input, threads } => cmd_bench(&input, threads),
    }
}

fn codecs_for_class<'a>(
    registry: &'a fqz_core::codec::CodecRegistry,
    class: ReadLengthClass,
) -> anyhow::Result<[&'a dyn Codec; 4]> {
    let ids = registry.get(default_ids_codec())?;
    let seq = registry.get(fqz_codecs::default_sequence_codec(class))?;
    let qual = registry.get(default_quality_codec())?;
    let aux = registry.get(default_aux_lengths_codec())?;
    Ok([ids, seq, qual, aux])
}

/// Builds the default registry with every `ZstdPlain`-tagged entry replaced
/// by one running at `level`, so `-l/--level` reaches every stream that
/// defaults to plain zstd without needing a level field in the tag itself.
fn registry_at_level(level: i32) -> fqz_core::codec::CodecRegistry {
    let mut reg = full_registry();
    reg.register(Box::new(fqz_codecs::zstd_plain::ZstdPlainCodec::with_level(level)));
    reg
}

/// Unifies single-end and paired-end FASTQ sources behind one `next_chunk`.
enum Source {
    Single(fastq::FastqChunkReader),
    Paired(fastq::PairedFastqChunkReader),
}

impl Source {
    fn next_chunk(&mut self) -> fqz_core::error::Result<Option<fqz_core::Chunk>> {
        match self {
            Source::Single(s) => s.next_chunk(),
            Source::Paired(s) => s.next_chunk(),
        }
    }
}

struct CompressOptions {
    input: String,
    output: PathBuf,
    level: u8,
    threads: usize,
    chunk_size: usize,
    max_in_flight: usize,
    memory_limit: Option<u64>,
    quality_mode: QualityMode,
    id_mode: IdMode,
    reorder: bool,
    streaming: bool,
    pe_layout: PeLayout,
    second_input: Option<String>,
    force: bool,
}

fn cmd_compress(opts: CompressOptions) -> anyhow::Result<()> {
    let started = Instant::now();

    if !opts.force && opts.output.exists() {
        bail!(FqzError::Usage(format!(
            "{} already exists; pass --force to overwrite",
            opts.output.display()
        )));
    }

    let chunk_size = match opts.memory_limit {
        Some(mb) => {
            let cap = (mb.max(1) * 1024 * 1024 / PER_RECORD_OVERHEAD_BYTES).max(1) as usize;
            opts.chunk_size.min(cap)
        }
        None => opts.chunk_size,
    };

    let mut source = match &opts.second_input {
        Some(r2) => Source::Paired(
            fastq::PairedFastqChunkReader::open(&opts.input, r2, chunk_size, opts.pe_layout)
                .with_context(|| format!("opening paired FASTQ input {} / {r2}", opts.input))?,
        ),
        None => Source::Single(
            fastq::FastqChunkReader::open(&opts.input, chunk_size)
                .with_context(|| format!("opening FASTQ input {}", opts.input))?,
        ),
    };

    let registry = registry_at_level(opts.level as i32);
    // The read-length class is decided once, from the first chunk, and used
    // for the whole archive: re-deciding per chunk would make block codec
    // choice depend on chunk boundaries, which isn't contractually
    // meaningful.
    let mut first_chunk = source.next_chunk()?;
    if let Some(chunk) = first_chunk.as_mut() {
        apply_quality_mode(&mut chunk.records, opts.quality_mode);
        apply_id_mode(&mut chunk.records, opts.id_mode);
    }
    let class = first_chunk
        .as_ref()
        .and_then(|c| c.records.first())
        .map(|r| ReadLengthClass::classify(r.sequence.len()))
        .unwrap_or(ReadLengthClass::Medium);
    let codecs = codecs_for_class(&registry, class)?;

    let mut writer = Writer::create(&opts.output).with_context(|| format!("creating {}", opts.output.display()))?;
    let original_filename = if opts.input == "-" {
        String::new()
    } else {
        PathBuf::from(&opts.input).file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
    };

    let mut flags = opts.quality_mode.to_bits() | opts.id_mode.to_bits() | class.to_bits();
    if opts.second_input.is_some() {
        flags |= FLAG_IS_PAIRED_END | opts.pe_layout.to_bits();
    }
    if opts.reorder {
        flags |= FLAG_HAS_REORDER_MAP;
    }
    if opts.streaming {
        flags |= FLAG_STREAMING_MODE | FLAG_PRESERVE_ORIGINAL_ORDER;
    }

    writer.write_header(GlobalHeader {
        flags,
        general_compression_algo: CodecTag::new(fqz_core::format::CodecFamily::ZstdPlain, 0).pack(),
        checksum_type: 0,
        total_record_count: 0, // placeholder, patched in by Writer::finish once the source is drained
        original_filename,
        creation_timestamp: Utc::now().timestamp() as u64,
    })?;

    let pipeline = Pipeline::new(opts.threads, opts.max_in_flight)?;
    let progress = Progress::default();
    let mut total_records = 0u64;

    let total_records = if opts.reorder {
        run_reordered(&pipeline, &mut source, first_chunk, chunk_size, codecs, &progress, &mut writer)?
    } else {
        pipeline.run(
            || {
                if let Some(mut chunk) = first_chunk.take() {
                    apply_quality_mode(&mut chunk.records, opts.quality_mode);
                    apply_id_mode(&mut chunk.records, opts.id_mode);
                    return Ok(Some(chunk));
                }
                let chunk = source.next_chunk()?;
                Ok(chunk.map(|mut chunk| {
                    apply_quality_mode(&mut chunk.records, opts.quality_mode);
                    apply_id_mode(&mut chunk.records, opts.id_mode);
                    chunk
                }))
            },
            codecs,
            0,
            &progress,
            |snapshot| {
                eprintln!(
                    "fqz: compressed {} chunks, {} blocks, {} read",
                    snapshot.chunks_read,
                    snapshot.blocks_encoded,
                    human_bytes(snapshot.bytes_in)
                );
            },
            |encoded, chunk| {
                total_records += chunk.len() as u64;
                writer.write_encoded_block(&encoded.header, &encoded.payload, chunk.archive_id_start)
            },
        )?;
        total_records
    };

    writer.finish(None, Some(total_records))?;
    let elapsed = started.elapsed();
    let output_size = std::fs::metadata(&opts.output)?.len();
    eprintln!(
        "fqz: wrote {} ({} records) to {} in {:.2}s",
        human_bytes(output_size),
        total_records,
        opts.output.display(),
        elapsed.as_secs_f64()
    );
    Ok(())
}

/// Drains the whole source into memory, sorts by sequence length so similar
/// reads land in the same block, then feeds the sorted records through the
/// pipeline and appends a reorder map recovering the original order.
fn run_reordered(
    pipeline: &Pipeline,
    source: &mut Source,
    first_chunk: Option<fqz_core::Chunk>,
    chunk_size: usize,
    codecs: [&dyn Codec; 4],
    progress: &Progress,
    writer: &mut Writer,
) -> anyhow::Result<u64> {
    let mut all_records = Vec::new();
    if let Some(chunk) = first_chunk {
        all_records.extend(chunk.records);
    }
    while let Some(chunk) = source.next_chunk()? {
        all_records.extend(chunk.records);
    }

    let mut order: Vec<usize> = (0..all_records.len()).collect();
    order.sort_by_key(|&i| all_records[i].sequence.len());

    let mut reverse = vec![0u64; all_records.len()];
    for (sorted_pos, &orig_idx) in order.iter().enumerate() {
        reverse[orig_idx] = sorted_pos as u64;
    }
    let sorted_records: Vec<Record> = {
        let mut slots: Vec<Option<Record>> = all_records.into_iter().map(Some).collect();
        order.iter().map(|&i| slots[i].take().expect("each index visited once")).collect()
    };

    let mut chunks: std::collections::VecDeque<fqz_core::Chunk> = sorted_records
        .chunks(chunk_size.max(1))
        .enumerate()
        .map(|(i, recs)| fqz_core::Chunk { records: recs.to_vec(), archive_id_start: (i * chunk_size.max(1)) as u64 + 1 })
        .collect();

    let mut total_records = 0u64;
    let mut wrote_any_block = false;
    pipeline.run(
        || Ok(chunks.pop_front()),
        codecs,
        0,
        progress,
        |snapshot| {
            eprintln!(
                "fqz: compressed {} chunks, {} blocks, {} read",
                snapshot.chunks_read,
                snapshot.blocks_encoded,
                human_bytes(snapshot.bytes_in)
            );
        },
        |encoded, chunk| {
            total_records += chunk.len() as u64;
            wrote_any_block = true;
            writer.write_encoded_block(&encoded.header, &encoded.payload, chunk.archive_id_start)
        },
    )?;

    if wrote_any_block {
        let map = ReorderMap::from_reverse(reverse)?;
        writer.write_reorder_map(&map)?;
    }
    Ok(total_records)
}

fn parse_range(s: &str) -> anyhow::Result<(u64, u64)> {
    let (start, end) = s.split_once(':').ok_or_else(|| anyhow::anyhow!("range must be START:END"))?;
    Ok((start.parse()?, end.parse()?))
}

struct DecompressOptions {
    input: PathBuf,
    output: Option<PathBuf>,
    range: Option<String>,
    original_order: bool,
    header_only: bool,
    skip_corrupted: bool,
    split_pe: bool,
}

fn cmd_decompress(opts: DecompressOptions) -> anyhow::Result<()> {
    if opts.split_pe && opts.output.is_none() {
        bail!(FqzError::Usage("--split-pe requires --output (stdout can't hold two files)".into()));
    }

    let mut archive = Archive::open(&opts.input).with_context(|| format!("opening {}", opts.input.display()))?;
    let registry = full_registry();
    let class = ReadLengthClass::Medium; // stream codec choice is read from each block's own tag, not re-derived
    let codecs = codecs_for_class(&registry, class)?;
    let selector = if opts.header_only { StreamSelector::ids_only() } else { StreamSelector::all() };

    let records = if opts.skip_corrupted {
        archive.read_all_blocks_lenient(codecs, selector, b'#', |block_id, err| {
            eprintln!("fqz: warning: block {block_id} corrupted, substituting placeholder records: {err}");
        })?
    } else if let Some(range) = &opts.range {
        let (start, end) = parse_range(range)?;
        archive.read_range(start, end, codecs, selector)?
    } else if opts.original_order || archive.global_header.has_flag(FLAG_PRESERVE_ORIGINAL_ORDER) {
        archive.read_all_in_original_order(codecs, selector)?
    } else {
        archive.read_all_blocks(codecs, selector)?
    };

    if opts.split_pe {
        let layout = PeLayout::from_bits(archive.global_header.flags);
        let (r1, r2) = split_paired(&records, layout);
        let base = opts.output.as_ref().expect("checked above");
        write_fastq_file(&suffixed_path(base, "_R1"), &r1)?;
        write_fastq_file(&suffixed_path(base, "_R2"), &r2)?;
        return Ok(());
    }

    let mut out: Box<dyn Write> = match &opts.output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(BufWriter::new(io::stdout())),
    };
    fastq::write_fastq(&mut out, &records)?;
    out.flush()?;
    Ok(())
}

fn split_paired(records: &[Record], layout: PeLayout) -> (Vec<Record>, Vec<Record>) {
    match layout {
        PeLayout::Interleaved => {
            let mut r1 = Vec::with_capacity(records.len() / 2 + 1);
            let mut r2 = Vec::with_capacity(records.len() / 2 + 1);
            for (i, r) in records.iter().enumerate() {
                if i % 2 == 0 {
                    r1.push(r.clone());
                } else {
                    r2.push(r.clone());
                }
            }
            (r1, r2)
        }
        PeLayout::Consecutive => {
            let half = records.len() / 2;
            (records[..half].to_vec(), records[half..].to_vec())
        }
    }
}

fn suffixed_path(base: &std::path::Path, suffix: &str) -> PathBuf {
    let stem = base.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    let ext = base.extension().map(|e| e.to_string_lossy().into_owned());
    let file_name = match ext {
        Some(ext) => format!("{stem}{suffix}.{ext}"),
        None => format!("{stem}{suffix}"),
    };
    base.with_file_name(file_name)
}

fn write_fastq_file(path: &std::path::Path, records: &[Record]) -> anyhow::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    fastq::write_fastq(&mut out, records)?;
    out.flush()?;
    Ok(())
}

#[derive(serde::Serialize)]
struct InfoJson {
    format_version: String,
    total_record_count: u64,
    block_count: usize,
    original_filename: String,
    creation_timestamp: u64,
    has_reorder_map: bool,
}

fn cmd_info(input: &PathBuf, json: bool, blocks: bool) -> anyhow::Result<()> {
    let archive = Archive::open(input).with_context(|| format!("opening {}", input.display()))?;

    if json {
        let info = InfoJson {
            format_version: "1.0".into(),
            total_record_count: archive.global_header.total_record_count,
            block_count: archive.block_count(),
            original_filename: archive.global_header.original_filename.clone(),
            creation_timestamp: archive.global_header.creation_timestamp,
            has_reorder_map: archive.reorder_map.is_some(),
        };
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    println!("archive: {}", input.display());
    println!("  original filename : {}", archive.global_header.original_filename);
    println!("  blocks            : {}", archive.block_count());
    println!("  reorder map       : {}", archive.reorder_map.is_some());
    let file_size = std::fs::metadata(input)?.len();
    println!("  file size         : {}", human_bytes(file_size));

    if blocks {
        for (i, entry) in archive.index.iter().enumerate() {
            println!(
                "  block {i:>6}: offset={:<12} records={:<8} archive_id_start={}",
                entry.offset, entry.record_count, entry.archive_id_start
            );
        }
    }
    Ok(())
}

fn cmd_verify(input: &PathBuf, mode: VerifyMode) -> anyhow::Result<()> {
    let mut archive = Archive::open(input).with_context(|| format!("opening {}", input.display()))?;
    let registry = full_registry();
    let codecs = codecs_for_class(&registry, ReadLengthClass::Medium)?;
    archive.verify(mode, codecs)?;
    println!("fqz: {} OK", input.display());
    Ok(())
}

fn cmd_bench(input: &str, threads: usize) -> anyhow::Result<()> {
    let started = Instant::now();
    let mut source = fastq::FastqChunkReader::open(input, fqz_core::format::DEFAULT_BLOCK_RECORDS as usize)?;
    let registry = full_registry();

    let first_chunk = source.next_chunk()?;
    let class = first_chunk
        .as_ref()
        .and_then(|c| c.records.first())
        .map(|r| ReadLengthClass::classify(r.sequence.len()))
        .unwrap_or(ReadLengthClass::Medium);
    let codecs = codecs_for_class(&registry, class)?;

    let pipeline = Pipeline::new(threads, DEFAULT_MAX_IN_FLIGHT)?;
    let progress = Progress::default();
    let mut first_chunk = first_chunk;
    let mut raw_bytes = 0u64;
    let mut compressed_bytes = 0u64;

    pipeline.run(
        || {
            if let Some(chunk) = first_chunk.take() {
                return Ok(Some(chunk));
            }
            source.next_chunk()
        },
        codecs,
        0,
        &progress,
        |_| {},
        |encoded, chunk| {
            raw_bytes += chunk.records.iter().map(|r| (r.sequence.len() + r.quality.len()) as u64).sum::<u64>();
            compressed_bytes += encoded.payload.len() as u64;
            Ok(())
        },
    )?;

    let elapsed = started.elapsed().as_secs_f64();
    if raw_bytes == 0 {
        bail!("input contained no records");
    }
    let ratio = raw_bytes as f64 / compressed_bytes.max(1) as f64;
    let throughput = human_bytes((raw_bytes as f64 / elapsed.max(1e-9)) as u64);
    println!(
        "read-length class : {class:?}\nraw bytes         : {}\ncompressed bytes  : {}\nratio             : {ratio:.2}x\nelapsed           : {elapsed:.2}s\nthroughput        : {throughput}/s",
        human_bytes(raw_bytes),
        human_bytes(compressed_bytes),
    );
    Ok(())
}
