//! Subcommand implementations.
//!
//! Each command plays the part of the editor around the codec: it resolves
//! the encoding, drives the open flow, and records the outcome in history.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result, bail};
use mousepad_config::{Config, ConfigLoader, LineEndingSetting, resolve_history_path};
use mousepad_fs::{
    Encoding, EncodingGroup, FallbackChooser, FileState, HistoryEntry, HistoryStore, JsonHistory,
    LineEnding, LoadOptions, LoadResult, LocationKind, MemoryHistory, OpenFlow, SaveOptions, resolve_encoding,
    write_bom,
};
use tracing::{debug, warn};

use crate::cli::{ConvertArgs, OpenArgs};

/// Settings and collaborators shared by every command
pub struct Session {
    config: Config,
    default_encoding: Encoding,
    history: Box<dyn HistoryStore>,
}

impl Session {
    pub fn start(config_path: Option<&Path>) -> Result<Self> {
        let mut loader = ConfigLoader::new();
        if let Some(path) = config_path {
            loader = loader.with_explicit(path);
        }
        let (config, source) = loader.load().context("failed to load configuration")?;
        if let Some(source) = &source {
            debug!(path = %source.display(), "configuration loaded");
        }
        Ok(Self::with_config(config))
    }

    pub fn with_config(config: Config) -> Self {
        let default_encoding = match parse_encoding(&config.encoding.default) {
            Ok(encoding) => encoding,
            Err(err) => {
                warn!(error = %err, "falling back to UTF-8 as default encoding");
                Encoding::Utf8
            }
        };

        let history: Box<dyn HistoryStore> = match resolve_history_path(&config) {
            Some(path) if config.history.enabled && config.encoding.remember => {
                Box::new(JsonHistory::open_or_reset(path, config.history.max_entries))
            }
            _ => Box::new(MemoryHistory::with_capacity(config.history.max_entries)),
        };

        Session {
            config,
            default_encoding,
            history,
        }
    }

    fn default_line_ending(&self) -> LineEnding {
        match self.config.line_ending.default {
            LineEndingSetting::Platform => LineEnding::platform_default(),
            LineEndingSetting::Unix => LineEnding::Unix,
            LineEndingSetting::Dos => LineEnding::Dos,
            LineEndingSetting::Mac => LineEnding::Mac,
        }
    }

    /// Open `path` the way the editor would, retrying with `--fallback` encodings.
    pub fn open(&self, path: &Path, args: &OpenArgs) -> Result<(FileState, LoadResult)> {
        let explicit = args.encoding.as_deref().map(parse_encoding).transpose()?;
        let encoding = resolve_encoding(explicit, Some(self.history.as_ref()), Some(path), self.default_encoding);

        let options = LoadOptions {
            encoding,
            must_exist: true,
            ignore_bom: args.ignore_bom,
            make_valid: args.make_valid,
            line_ending: self.default_line_ending(),
        };
        let fallbacks = args
            .fallback
            .iter()
            .map(|name| parse_encoding(name))
            .collect::<Result<Vec<_>>>()?;

        // an explicit --encoding outranks the BOM; anything else yields to it
        let mut decider = |requested: Encoding, bom: Encoding| {
            if explicit.is_some() {
                warn!(%requested, %bom, "ignoring byte order mark in favour of --encoding");
                false
            } else {
                true
            }
        };
        let loaded = OpenFlow::new(path, options)
            .run(&mut decider, &mut FallbackChooser::new(fallbacks))
            .with_context(|| format!("failed to open {}", path.display()))?;

        let mut state = FileState::for_location(path);
        state.apply_load(&loaded);
        Ok((state, loaded))
    }

    /// Remember how `state` was read or written. Failures are only logged.
    fn remember(&mut self, state: &FileState) {
        let Some(path) = state.location() else {
            return;
        };
        let entry = HistoryEntry::new(path, state.encoding).with_line_ending(state.line_ending);
        if let Err(err) = self.history.record(entry) {
            warn!(error = %err, "failed to update encoding history");
        }
    }

    pub fn inspect(&mut self, path: &Path, args: &OpenArgs, out: &mut dyn Write) -> Result<()> {
        let (state, loaded) = self.open(path, args)?;
        write_report(out, path, &state, &loaded)?;
        self.remember(&state);
        Ok(())
    }

    pub fn convert(&mut self, args: &ConvertArgs, out: &mut dyn Write) -> Result<()> {
        let (mut state, loaded) = self.open(&args.file, &args.open)?;

        if let Some(name) = &args.to_encoding {
            state.encoding = parse_encoding(name)?;
        }
        if let Some(line_ending) = args.to_line_ending {
            state.line_ending = line_ending.into();
        }
        if let Some(bom) = args.bom_choice() {
            state.write_bom = bom;
        }

        if let Some(output) = &args.output {
            if output.exists() && !args.force {
                bail!("{} already exists, use --force to overwrite", output.display());
            }
            state.set_location(output, LocationKind::Virtual);
        }

        let options = SaveOptions {
            forced: args.force,
            backup: args.backup || self.config.save.make_backup,
            backup_suffix: self.config.save.backup_suffix.clone(),
            ensure_trailing_newline: self.config.save.add_last_end_of_line,
            ..SaveOptions::default()
        };
        let target = state
            .location()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| args.file.clone());
        let saved = state
            .save(&loaded.text, &options)
            .with_context(|| format!("failed to write {}", target.display()))?;

        // charsets without a BOM ignore the request
        let wrote_bom = state.write_bom && write_bom(saved.encoding).is_some();
        writeln!(
            out,
            "{}: wrote {} bytes as {} ({}{})",
            saved.path.display(),
            saved.bytes_written,
            saved.encoding,
            state.line_ending.name(),
            if wrote_bom { ", BOM" } else { "" },
        )?;
        if let Some(backup) = &saved.backup_path {
            writeln!(out, "backup: {}", backup.display())?;
        }
        self.remember(&state);
        Ok(())
    }
}

/// Parse a charset name, rejecting encodings we cannot convert.
fn parse_encoding(name: &str) -> Result<Encoding> {
    let encoding: Encoding = name.parse()?;
    if !encoding.is_supported() {
        bail!("no converter available for {encoding}");
    }
    Ok(encoding)
}

fn write_report(out: &mut dyn Write, path: &Path, state: &FileState, loaded: &LoadResult) -> Result<()> {
    writeln!(out, "file:         {}", path.display())?;
    writeln!(out, "encoding:     {} ({})", state.encoding, state.encoding.label())?;
    writeln!(out, "line ending:  {}", state.line_ending)?;
    if loaded.bom_length > 0 {
        writeln!(out, "bom:          {} bytes", loaded.bom_length)?;
    } else {
        writeln!(out, "bom:          none")?;
    }
    writeln!(out, "lines:        {}", loaded.text.lines().count())?;
    writeln!(out, "characters:   {}", loaded.text.chars().count())?;
    if let Some(offset) = loaded.first_invalid {
        writeln!(out, "repaired at:  byte {offset}")?;
    }
    if state.is_read_only() {
        writeln!(out, "read-only:    yes")?;
    }
    if let Some(token) = state.change_token() {
        writeln!(out, "etag:         {}", token.etag())?;
    }
    Ok(())
}

/// Print the encoding menu, one group per block.
pub fn list_encodings(all: bool, out: &mut dyn Write) -> Result<()> {
    let mut current: Option<EncodingGroup> = None;
    for &encoding in Encoding::ALL {
        if !all && !encoding.is_supported() {
            continue;
        }
        if current != Some(encoding.group()) {
            if current.is_some() {
                writeln!(out)?;
            }
            writeln!(out, "{}", encoding.group().title())?;
            current = Some(encoding.group());
        }
        let marker = if encoding.is_supported() { "" } else { "  (unsupported)" };
        writeln!(out, "  {:<16} {}{}", encoding.charset(), encoding.label(), marker)?;
    }
    Ok(())
}
