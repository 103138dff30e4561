//! End-to-end tests exercising the real bundled codecs (not the in-module
//! passthrough stand-ins used by unit tests): full compress/decompress
//! round trips, random access, reorder-map restoration, and tamper
//! detection.

use fqz_codecs::{default_aux_lengths_codec, default_ids_codec, default_quality_codec, full_registry};
use fqz_core::block::{Chunk, Record};
use fqz_core::codec::Codec;
use fqz_core::format::{CodecFamily, CodecTag, GlobalHeader, ReadLengthClass};
use fqz_core::reader::{Archive, StreamSelector, VerifyMode};
use fqz_core::reorder::ReorderMap;
use fqz_core::writer::Writer;

fn sample_records(n: usize) -> Vec<Record> {
    (0..n)
        .map(|i| {
            Record::new(
                format!("read_{i}").into_bytes(),
                b"ACGTACGTNNACGTACGT".to_vec(),
                b"IIIIIIIIIIIIIIIIII".to_vec(),
            )
        })
        .collect()
}

fn codecs_for(registry: &fqz_core::codec::CodecRegistry, class: ReadLengthClass) -> [&dyn Codec; 4] {
    [
        registry.get(default_ids_codec()).unwrap(),
        registry.get(fqz_codecs::default_sequence_codec(class)).unwrap(),
        registry.get(default_quality_codec()).unwrap(),
        registry.get(default_aux_lengths_codec()).unwrap(),
    ]
}

#[test]
fn compress_then_decompress_roundtrips_exactly() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("roundtrip.fqz");
    let registry = full_registry();
    let codecs = codecs_for(&registry, ReadLengthClass::Short);

    let records = sample_records(250);
    let mut writer = Writer::create(&dest).unwrap();
    writer
        .write_header(GlobalHeader {
            flags: 0,
            general_compression_algo: CodecFamily::ZstdPlain as u8,
            checksum_type: 0,
            total_record_count: records.len() as u64,
            original_filename: "sample.fastq".into(),
            creation_timestamp: 1_700_000_000,
        })
        .unwrap();

    for chunk in records.chunks(50) {
        let archive_id_start = (writer.next_archive_id()).max(1);
        writer
            .write_block(
                &Chunk { records: chunk.to_vec(), archive_id_start },
                codecs,
            )
            .unwrap();
    }
    writer.finish(None, Some(records.len() as u64)).unwrap();

    let mut archive = Archive::open(&dest).unwrap();
    assert_eq!(archive.global_header.total_record_count, records.len() as u64);
    assert_eq!(archive.block_count(), 5);

    let decoded = archive.read_all_blocks(codecs, StreamSelector::all()).unwrap();
    assert_eq!(decoded, records);

    archive.verify(VerifyMode::Global, codecs).unwrap();
    archive.verify(VerifyMode::PerBlock, codecs).unwrap();
}

#[test]
fn random_access_read_block_matches_full_decode() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("random_access.fqz");
    let registry = full_registry();
    let codecs = codecs_for(&registry, ReadLengthClass::Short);

    let records = sample_records(120);
    let mut writer = Writer::create(&dest).unwrap();
    writer
        .write_header(GlobalHeader {
            flags: 0,
            general_compression_algo: 0,
            checksum_type: 0,
            total_record_count: records.len() as u64,
            original_filename: String::new(),
            creation_timestamp: 0,
        })
        .unwrap();
    for chunk in records.chunks(40) {
        let archive_id_start = writer.next_archive_id().max(1);
        writer.write_block(&Chunk { records: chunk.to_vec(), archive_id_start }, codecs).unwrap();
    }
    writer.finish(None, Some(records.len() as u64)).unwrap();

    let mut archive = Archive::open(&dest).unwrap();
    let full = archive.read_all_blocks(codecs, StreamSelector::all()).unwrap();
    let ranged = archive.read_range(41, 81, codecs, StreamSelector::all()).unwrap();
    assert_eq!(ranged, full[40..80]);
}

#[test]
fn reorder_map_restores_original_order() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("reordered.fqz");
    let registry = full_registry();
    let codecs = codecs_for(&registry, ReadLengthClass::Short);

    // Sort by length-descending before writing (a plausible reason to
    // shuffle), then remember where each original record landed.
    let original: Vec<Record> = sample_records(10);
    let mut stored_order: Vec<usize> = (0..original.len()).collect();
    stored_order.sort_by_key(|&i| std::cmp::Reverse(original[i].id.clone()));
    let stored_records: Vec<Record> = stored_order.iter().map(|&i| original[i].clone()).collect();

    // reverse[original_index] = stored_position
    let mut reverse = vec![0u64; original.len()];
    for (stored_pos, &orig_idx) in stored_order.iter().enumerate() {
        reverse[orig_idx] = stored_pos as u64;
    }
    let map = ReorderMap::from_reverse(reverse).unwrap();

    let mut writer = Writer::create(&dest).unwrap();
    writer
        .write_header(GlobalHeader {
            flags: fqz_core::format::FLAG_PRESERVE_ORIGINAL_ORDER,
            general_compression_algo: 0,
            checksum_type: 0,
            total_record_count: original.len() as u64,
            original_filename: String::new(),
            creation_timestamp: 0,
        })
        .unwrap();
    writer.write_block(&Chunk { records: stored_records, archive_id_start: 1 }, codecs).unwrap();
    let map_offset = writer.write_reorder_map(&map).unwrap();
    writer.finish(Some(map_offset), Some(original.len() as u64)).unwrap();

    let mut archive = Archive::open(&dest).unwrap();
    assert!(archive.reorder_map.is_some());
    let restored = archive.read_all_in_original_order(codecs, StreamSelector::all()).unwrap();
    assert_eq!(restored, original);
}

#[test]
fn tampered_block_fails_per_block_verify() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("tampered.fqz");
    let registry = full_registry();
    let codecs = codecs_for(&registry, ReadLengthClass::Short);

    let records = sample_records(30);
    let mut writer = Writer::create(&dest).unwrap();
    writer
        .write_header(GlobalHeader {
            flags: 0,
            general_compression_algo: 0,
            checksum_type: 0,
            total_record_count: records.len() as u64,
            original_filename: String::new(),
            creation_timestamp: 0,
        })
        .unwrap();
    writer.write_block(&Chunk { records: records.clone(), archive_id_start: 1 }, codecs).unwrap();
    writer.finish(None, Some(records.len() as u64)).unwrap();

    // Flip a byte well past the header/footer into the block payload region.
    let mut bytes = std::fs::read(&dest).unwrap();
    let mid = bytes.len() / 2;
    bytes[mid] ^= 0xFF;
    std::fs::write(&dest, &bytes).unwrap();

    let mut archive = Archive::open(&dest).unwrap();
    let err = archive.verify(VerifyMode::PerBlock, codecs).unwrap_err();
    assert!(matches!(err, fqz_core::error::FqzError::Checksum { .. }));
}
