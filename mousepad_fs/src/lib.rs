//! # mousepad_fs - Text file codec for the mousepad editor
//!
//! Turns files on disk into `\n`-normalized Unicode text and back, keeping
//! track of what is needed to write the file the way it was found.
//!
//! Modules:
//! - `bom` for BOM detection and writing (UTF-7/8/16/32)
//! - `encoding` for the charset registry and conversions
//! - `file` for loading, saving, line endings, change tokens and [`FileState`]
//! - `history` for remembering per-file encodings
//! - `open` for the decode-retry state machine

mod bom;
mod encoding;
mod error;
pub mod file;
pub mod history;
pub mod open;

pub use bom::{BomDetectionResult, bom_encoding, detect_bom, write_bom};
pub use encoding::{Encoding, EncodingGroup, Repaired, decode, decode_repairing, encode};
pub use error::{CodecError, CodecResult};
pub use file::{
    AcceptBom, BomDecider, ChangeToken, EncodedDocument, FileState, LineEnding, LoadOptions, LoadResult,
    LocationKind, SaveOptions, SaveResult, decode_document, denormalize_on_save, detect_line_ending,
    encode_document, find_line_ending, load, load_with, normalize_on_load, save,
};
pub use history::{HistoryEntry, HistoryError, HistoryResult, HistoryStore, JsonHistory, MemoryHistory, resolve_encoding};
pub use open::{EncodingChoice, EncodingChooser, FallbackChooser, OpenFlow, OpenState};
