//! The `Codec` trait and tag-keyed registry. Each stream role (ids,
//! sequence, quality, auxiliary lengths) gets its own registry slot, keyed
//! by a family/version `CodecTag` rather than a single flat byte id.

use std::collections::HashMap;
use std::fmt;

use crate::error::{FqzError, Result};
use crate::format::CodecTag;

/// Which record field a stream holds. A block has one stream per role, each
/// independently tagged and compressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamRole {
    Ids,
    Sequence,
    Quality,
    AuxLengths,
}

impl fmt::Display for StreamRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StreamRole::Ids => "ids",
            StreamRole::Sequence => "sequence",
            StreamRole::Quality => "quality",
            StreamRole::AuxLengths => "aux_lengths",
        };
        f.write_str(s)
    }
}

/// A codec must be stateless across calls: each `encode`/`decode` call is
/// handed a fresh byte slice and must not depend on any previous call. This
/// is what makes block encode/decode safely parallelizable and what makes
/// random-access decode of a single block correct without replaying its
/// neighbors.
pub trait Codec: Send + Sync {
    fn tag(&self) -> CodecTag;
    fn name(&self) -> &'static str;

    /// Compress one stream's raw bytes. `sidecar` is out-of-band metadata
    /// written alongside the block (e.g. per-record lengths) the codec
    /// needs to reconstruct framing that `decode` alone can't infer.
    fn encode(&self, raw: &[u8]) -> Result<CodecOutput>;

    /// Inverse of `encode`. Must reproduce `raw` byte-for-byte.
    fn decode(&self, compressed: &[u8], sidecar: &[u8], uncompressed_len: usize) -> Result<Vec<u8>>;
}

#[derive(Debug, Clone, Default)]
pub struct CodecOutput {
    pub compressed: Vec<u8>,
    pub sidecar: Vec<u8>,
    pub uncompressed_len: usize,
}

/// Maps a `CodecTag` to its implementation. One registry is built per
/// process and shared (read-only) across pipeline workers.
pub struct CodecRegistry {
    codecs: HashMap<CodecTag, Box<dyn Codec>>,
}

impl CodecRegistry {
    pub fn new() -> Self {
        Self { codecs: HashMap::new() }
    }

    pub fn register(&mut self, codec: Box<dyn Codec>) {
        self.codecs.insert(codec.tag(), codec);
    }

    pub fn get(&self, tag: CodecTag) -> Result<&dyn Codec> {
        self.codecs
            .get(&tag)
            .map(|b| b.as_ref())
            .ok_or(FqzError::UnsupportedCodec { family: tag.family, version: tag.version })
    }

    pub fn contains(&self, tag: CodecTag) -> bool {
        self.codecs.contains_key(&tag)
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::CodecFamily;

    struct Echo;
    impl Codec for Echo {
        fn tag(&self) -> CodecTag {
            CodecTag::new(CodecFamily::Raw, 0)
        }
        fn name(&self) -> &'static str {
            "echo"
        }
        fn encode(&self, raw: &[u8]) -> Result<CodecOutput> {
            Ok(CodecOutput { compressed: raw.to_vec(), sidecar: Vec::new(), uncompressed_len: raw.len() })
        }
        fn decode(&self, compressed: &[u8], _sidecar: &[u8], _len: usize) -> Result<Vec<u8>> {
            Ok(compressed.to_vec())
        }
    }

    #[test]
    fn registry_lookup_and_miss() {
        let mut reg = CodecRegistry::new();
        reg.register(Box::new(Echo));
        let tag = CodecTag::new(CodecFamily::Raw, 0);
        assert!(reg.contains(tag));
        assert_eq!(reg.get(tag).unwrap().name(), "echo");

        let missing = CodecTag::new(CodecFamily::AbcV1, 9);
        let err = reg.get(missing).unwrap_err();
        assert!(matches!(err, FqzError::UnsupportedCodec { .. }));
    }
}
