//! Opening a file with user-driven retries.
//!
//! When a file cannot be decoded with the resolved encoding, the application
//! asks the user for another one and tries again. [`OpenFlow`] models that
//! loop as an explicit state machine so a UI can drive it one step at a time
//! and a CLI can simply [`OpenFlow::run`] it.

use std::collections::VecDeque;
use std::mem;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::encoding::Encoding;
use crate::error::{CodecError, CodecResult};
use crate::file::{BomDecider, LoadOptions, LoadResult, load_with};

/// Attempts allowed before giving up with the last error.
pub const DEFAULT_MAX_ATTEMPTS: usize = 16;

/// Answer to a failed decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodingChoice {
    /// Try again with this encoding
    Retry(Encoding),
    /// Load as UTF-8 with invalid sequences replaced
    Repair,
    Abort,
}

/// Asked what to do when the file does not decode.
pub trait EncodingChooser {
    fn choose(&mut self, path: &Path, failed: Encoding, error: &CodecError) -> EncodingChoice;
}

impl<F> EncodingChooser for F
where
    F: FnMut(&Path, Encoding, &CodecError) -> EncodingChoice,
{
    fn choose(&mut self, path: &Path, failed: Encoding, error: &CodecError) -> EncodingChoice {
        self(path, failed, error)
    }
}

/// Non-interactive chooser that walks a list of candidate encodings.
///
/// Invalid UTF-8 is repaired first when `repair` is set.
#[derive(Debug, Clone, Default)]
pub struct FallbackChooser {
    candidates: VecDeque<Encoding>,
    repair: bool,
}

impl FallbackChooser {
    pub fn new<I: IntoIterator<Item = Encoding>>(candidates: I) -> Self {
        FallbackChooser {
            candidates: candidates.into_iter().collect(),
            repair: false,
        }
    }

    pub fn with_repair(mut self, repair: bool) -> Self {
        self.repair = repair;
        self
    }
}

impl EncodingChooser for FallbackChooser {
    fn choose(&mut self, _path: &Path, failed: Encoding, error: &CodecError) -> EncodingChoice {
        if self.repair && matches!(error, CodecError::EncodingNotValid { .. }) {
            return EncodingChoice::Repair;
        }
        while let Some(candidate) = self.candidates.pop_front() {
            if candidate != failed && candidate.is_supported() {
                return EncodingChoice::Retry(candidate);
            }
        }
        EncodingChoice::Abort
    }
}

#[derive(Debug, Default)]
pub enum OpenState {
    #[default]
    Initial,
    AwaitingEncodingChoice {
        encoding: Encoding,
        error: CodecError,
    },
    Retrying {
        encoding: Encoding,
        make_valid: bool,
    },
    Done(LoadResult),
    Failed(CodecError),
}

impl OpenState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done(_) | Self::Failed(_))
    }
}

/// Load attempts against one path until it decodes or the chooser gives up.
#[derive(Debug)]
pub struct OpenFlow {
    path: PathBuf,
    options: LoadOptions,
    state: OpenState,
    attempts: usize,
    max_attempts: usize,
}

impl OpenFlow {
    pub fn new<P: Into<PathBuf>>(path: P, options: LoadOptions) -> Self {
        OpenFlow {
            path: path.into(),
            options,
            state: OpenState::Initial,
            attempts: 0,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn state(&self) -> &OpenState {
        &self.state
    }

    pub fn attempts(&self) -> usize {
        self.attempts
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Advance one transition. Terminal states stay put.
    ///
    /// `decider` is only asked on the first attempt. An encoding picked after
    /// a failure is loaded as chosen; a BOM for another charset stays in the text.
    pub fn step(&mut self, decider: &mut dyn BomDecider, chooser: &mut dyn EncodingChooser) -> &OpenState {
        self.state = match mem::take(&mut self.state) {
            OpenState::Initial => self.attempt(self.options.encoding, self.options.make_valid, decider),
            OpenState::Retrying { encoding, make_valid } => {
                self.attempt(encoding, make_valid, &mut keep_requested)
            }
            OpenState::AwaitingEncodingChoice { encoding, error } => self.resolve_choice(encoding, error, chooser),
            terminal => terminal,
        };
        &self.state
    }

    /// Step until the flow finishes.
    pub fn run(mut self, decider: &mut dyn BomDecider, chooser: &mut dyn EncodingChooser) -> CodecResult<LoadResult> {
        loop {
            self.step(decider, chooser);
            match mem::take(&mut self.state) {
                OpenState::Done(result) => return Ok(result),
                OpenState::Failed(error) => return Err(error),
                pending => self.state = pending,
            }
        }
    }

    fn attempt(&mut self, encoding: Encoding, make_valid: bool, decider: &mut dyn BomDecider) -> OpenState {
        self.attempts += 1;
        let options = LoadOptions {
            encoding,
            make_valid,
            ..self.options.clone()
        };
        debug!(path = %self.path.display(), %encoding, make_valid, attempt = self.attempts, "opening file");

        let mut honoured = None;
        let loaded = {
            let mut recording = |requested: Encoding, bom: Encoding| {
                let honour = decider.honour_bom(requested, bom);
                if honour {
                    honoured = Some(bom);
                }
                honour
            };
            load_with(&self.path, &options, &mut recording)
        };

        match loaded {
            Ok(result) => OpenState::Done(result),
            Err(error) if error.is_encoding_problem() => OpenState::AwaitingEncodingChoice {
                encoding: honoured.unwrap_or(encoding),
                error,
            },
            Err(error) => OpenState::Failed(error),
        }
    }

    fn resolve_choice(&mut self, encoding: Encoding, error: CodecError, chooser: &mut dyn EncodingChooser) -> OpenState {
        if self.attempts >= self.max_attempts {
            debug!(attempts = self.attempts, "giving up on encoding retries");
            return OpenState::Failed(error);
        }

        match chooser.choose(&self.path, encoding, &error) {
            EncodingChoice::Retry(next) => OpenState::Retrying {
                encoding: next,
                make_valid: false,
            },
            // only invalid UTF-8 can be repaired
            EncodingChoice::Repair if matches!(error, CodecError::EncodingNotValid { .. }) => OpenState::Retrying {
                encoding,
                make_valid: true,
            },
            EncodingChoice::Repair | EncodingChoice::Abort => OpenState::Failed(error),
        }
    }
}

fn keep_requested(_requested: Encoding, _bom: Encoding) -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::AcceptBom;
    use std::fs;
    use tempfile::tempdir;

    fn never_asked(_: &Path, _: Encoding, _: &CodecError) -> EncodingChoice {
        panic!("chooser should not be consulted")
    }

    #[test]
    fn test_clean_file_opens_in_one_attempt() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ok.txt");
        fs::write(&path, "fine").unwrap();

        let mut flow = OpenFlow::new(&path, LoadOptions::default());
        let state = flow.step(&mut AcceptBom, &mut never_asked);
        assert!(matches!(state, OpenState::Done(result) if result.text == "fine"));
        assert_eq!(flow.attempts(), 1);
    }

    #[test]
    fn test_retry_with_chosen_encoding() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("latin1.txt");
        fs::write(&path, b"caf\xE9").unwrap();

        let mut flow = OpenFlow::new(&path, LoadOptions::default());
        let mut chooser = FallbackChooser::new([Encoding::Iso8859_15]);

        assert!(matches!(
            flow.step(&mut AcceptBom, &mut chooser),
            OpenState::AwaitingEncodingChoice {
                encoding: Encoding::Utf8,
                error: CodecError::EncodingNotValid { valid_up_to: 3 },
            }
        ));
        assert!(matches!(
            flow.step(&mut AcceptBom, &mut chooser),
            OpenState::Retrying {
                encoding: Encoding::Iso8859_15,
                make_valid: false,
            }
        ));
        let state = flow.step(&mut AcceptBom, &mut chooser);
        assert!(matches!(state, OpenState::Done(result) if result.text == "café"));
        assert_eq!(flow.attempts(), 2);
    }

    #[test]
    fn test_repair_invalid_utf8() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.txt");
        fs::write(&path, b"a\xFFb").unwrap();

        let mut chooser = FallbackChooser::default().with_repair(true);
        let result = OpenFlow::new(&path, LoadOptions::default())
            .run(&mut AcceptBom, &mut chooser)
            .unwrap();
        assert_eq!(result.text, "a\u{FFFD}b");
        assert_eq!(result.first_invalid, Some(1));
    }

    #[test]
    fn test_repair_does_not_apply_to_other_charsets() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ascii.txt");
        fs::write(&path, b"\xE9").unwrap();

        let mut chooser = |_: &Path, _: Encoding, _: &CodecError| EncodingChoice::Repair;
        let err = OpenFlow::new(&path, LoadOptions::with_encoding(Encoding::Ascii))
            .run(&mut AcceptBom, &mut chooser)
            .unwrap_err();
        assert!(matches!(err, CodecError::ConvertingFailed { .. }));
    }

    #[test]
    fn test_abort_keeps_the_decode_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.txt");
        fs::write(&path, b"\xC3").unwrap();

        let err = OpenFlow::new(&path, LoadOptions::default())
            .run(&mut AcceptBom, &mut FallbackChooser::default())
            .unwrap_err();
        assert!(matches!(err, CodecError::EncodingNotValid { valid_up_to: 0 }));
    }

    #[test]
    fn test_io_error_fails_without_asking() {
        let dir = tempdir().unwrap();
        let mut flow = OpenFlow::new(dir.path().join("missing.txt"), LoadOptions::default());
        let state = flow.step(&mut AcceptBom, &mut never_asked);
        assert!(matches!(state, OpenState::Failed(CodecError::ReadingFailed { .. })));

        // terminal states are sticky
        assert!(flow.step(&mut AcceptBom, &mut never_asked).is_terminal());
        assert_eq!(flow.attempts(), 1);
    }

    #[test]
    fn test_fallback_is_not_overridden_by_bom() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("not_utf16.txt");
        fs::write(&path, [0xFF, 0xFE, b'A']).unwrap();

        let mut flow = OpenFlow::new(&path, LoadOptions::default());
        let mut chooser = FallbackChooser::new([Encoding::Iso8859_1]);

        // the BOM chose UTF-16LE, so that is what failed
        assert!(matches!(
            flow.step(&mut AcceptBom, &mut chooser),
            OpenState::AwaitingEncodingChoice {
                encoding: Encoding::Utf16Le,
                error: CodecError::ConvertingFailed { .. },
            }
        ));
        let result = flow.run(&mut AcceptBom, &mut chooser).unwrap();
        assert_eq!(result.text, "ÿþA");
        assert_eq!(result.encoding, Encoding::Iso8859_1);
        assert_eq!(result.bom_length, 0);
        assert!(!result.write_bom);
    }

    #[test]
    fn test_fallback_skips_the_encoding_the_bom_chose() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("odd.txt");
        fs::write(&path, [0xFF, 0xFE, b'A']).unwrap();

        let mut offered = Vec::new();
        let mut chooser = |_: &Path, failed: Encoding, _: &CodecError| {
            offered.push(failed);
            EncodingChoice::Abort
        };
        let err = OpenFlow::new(&path, LoadOptions::default())
            .run(&mut AcceptBom, &mut chooser)
            .unwrap_err();
        assert!(matches!(err, CodecError::ConvertingFailed { charset: "UTF-16LE", .. }));
        assert_eq!(offered, [Encoding::Utf16Le]);

        // UTF-16LE is the one that failed, so it is passed over
        let mut fallback = FallbackChooser::new([Encoding::Utf16Le, Encoding::Windows1252]);
        let result = OpenFlow::new(&path, LoadOptions::default())
            .run(&mut AcceptBom, &mut fallback)
            .unwrap();
        assert_eq!(result.encoding, Encoding::Windows1252);
    }

    #[test]
    fn test_attempts_are_bounded() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stubborn.txt");
        fs::write(&path, b"\xFF").unwrap();

        let mut asked = 0;
        let mut chooser = |_: &Path, _: Encoding, _: &CodecError| {
            asked += 1;
            EncodingChoice::Retry(Encoding::Utf8)
        };
        let err = OpenFlow::new(&path, LoadOptions::default())
            .with_max_attempts(3)
            .run(&mut AcceptBom, &mut chooser)
            .unwrap_err();
        assert!(matches!(err, CodecError::EncodingNotValid { .. }));
        assert_eq!(asked, 2);
    }
}
