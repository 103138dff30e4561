//! Bundled stream codecs for FQZ1 and the registry that wires them up by
//! `CodecTag`. Each stream role (ids/sequence/quality/aux-lengths) picks
//! its own default codec rather than sharing one codec list.

pub mod abc;
pub mod delta_lzma;
pub mod delta_varint;
pub mod delta_zstd;
pub mod overlap;
pub mod raw;
pub mod scm;
pub mod zstd_plain;

use fqz_core::codec::CodecRegistry;
use fqz_core::format::ReadLengthClass;

/// Builds a registry containing every codec this crate ships. Used by both
/// the writer (to pick defaults) and the reader (to resolve whatever tag a
/// block actually carries, regardless of what the writer's defaults were).
pub fn full_registry() -> CodecRegistry {
    let mut reg = CodecRegistry::new();
    reg.register(Box::new(raw::RawCodec));
    reg.register(Box::new(zstd_plain::ZstdPlainCodec::new()));
    reg.register(Box::new(delta_zstd::DeltaZstdCodec));
    reg.register(Box::new(delta_lzma::DeltaLzmaCodec));
    reg.register(Box::new(delta_varint::DeltaVarintCodec));
    reg.register(Box::new(abc::AbcV1Codec));
    reg.register(Box::new(overlap::OverlapV1Codec));
    reg.register(Box::new(scm::ScmOrder1Codec));
    reg
}

/// Default codec tag for the sequence stream, chosen from the read-length
/// class: short reads go to the bit-packing codec, long reads (where
/// overlaps between reads in a chunk are more likely) to the overlap-aware
/// codec, medium reads split the difference with plain zstd.
pub fn default_sequence_codec(class: ReadLengthClass) -> fqz_core::format::CodecTag {
    use fqz_core::format::{CodecFamily, CodecTag};
    match class {
        ReadLengthClass::Short => CodecTag::new(CodecFamily::AbcV1, 1),
        ReadLengthClass::Medium => CodecTag::new(CodecFamily::ZstdPlain, 0),
        ReadLengthClass::Long => CodecTag::new(CodecFamily::OverlapV1, 1),
    }
}

/// Default codec tag for the quality stream: the context-model stand-in
/// unless the caller asked for quality to be discarded, in which case the
/// aux-lengths default (raw) effectively makes the stream empty upstream
/// of codec selection.
pub fn default_quality_codec() -> fqz_core::format::CodecTag {
    use fqz_core::format::{CodecFamily, CodecTag};
    CodecTag::new(CodecFamily::ScmOrder1, 1)
}

pub fn default_ids_codec() -> fqz_core::format::CodecTag {
    use fqz_core::format::{CodecFamily, CodecTag};
    CodecTag::new(CodecFamily::ZstdPlain, 0)
}

pub fn default_aux_lengths_codec() -> fqz_core::format::CodecTag {
    use fqz_core::format::{CodecFamily, CodecTag};
    CodecTag::new(CodecFamily::DeltaVarint, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_contains_all_defaults() {
        let reg = full_registry();
        assert!(reg.contains(default_sequence_codec(ReadLengthClass::Short)));
        assert!(reg.contains(default_sequence_codec(ReadLengthClass::Medium)));
        assert!(reg.contains(default_sequence_codec(ReadLengthClass::Long)));
        assert!(reg.contains(default_quality_codec()));
        assert!(reg.contains(default_ids_codec()));
        assert!(reg.contains(default_aux_lengths_codec()));
    }
}
