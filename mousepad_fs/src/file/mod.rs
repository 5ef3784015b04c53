//! File operations for loading and saving with proper encoding handling.
//!
//! This module provides:
//! - Whole-file loading with BOM handling and charset decoding
//! - EOL detection and normalization
//! - Atomic saving with transcoding and backups
//! - Change tokens for external-modification checks
//! - Per-document [`FileState`]

pub mod eol;
pub mod identity;
pub mod load;
pub mod save;
pub mod state;

pub use eol::{LineEnding, ParseLineEndingError, denormalize_on_save, detect_line_ending, find_line_ending, normalize_on_load};
pub use identity::ChangeToken;
pub use load::{AcceptBom, BomDecider, LoadOptions, LoadResult, decode_document, load, load_with};
pub use save::{EncodedDocument, SaveOptions, SaveResult, encode_document, save};
pub use state::{FileState, LocationKind};
