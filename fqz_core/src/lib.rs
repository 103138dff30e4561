//! Core FQZ1 archive format: byte-order I/O, the on-disk layout, the codec
//! trait and registry, block assembly, the archive writer/reader, the
//! reorder map, and the compression pipeline engine.
//!
//! Concrete stream codecs live in the sibling `fqz_codecs` crate; the CLI
//! lives in `fqz_cli`.

pub mod block;
pub mod byteio;
pub mod codec;
pub mod error;
pub mod format;
pub mod pipeline;
pub mod reader;
pub mod reorder;
pub mod signal;
pub mod writer;

pub use block::{Chunk, EncodedBlock, Record};
pub use codec::{Codec, CodecOutput, CodecRegistry, StreamRole};
pub use error::{FqzError, Result};
pub use format::{CodecFamily, CodecTag, GlobalHeader, IdMode, PeLayout, QualityMode, ReadLengthClass};
pub use reader::{Archive, StreamSelector, VerifyMode};
pub use reorder::ReorderMap;
pub use writer::Writer;
