use std::borrow::Cow;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::SubtitleError;

// @module: Subtitle units, SRT ingestion and export

// @const: Strict SRT block (id, time range, text)
static SRT_BLOCK_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(\d+)\n(\d{2}:\d{2}:\d{2}[,.]\d{3})\s*-->\s*(\d{2}:\d{2}:\d{2}[,.]\d{3})\n([\s\S]*)$",
    )
    .expect("valid SRT block regex")
});

// @const: Time range anywhere in a line, used by the tolerant fallback
static TIME_RANGE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{2}:\d{2}:\d{2}[,.]\d{3})\s*-->\s*(\d{2}:\d{2}:\d{2}[,.]\d{3})")
        .expect("valid time range regex")
});

// @const: Blank-line block separator
static BLOCK_SEPARATOR_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n\n+").expect("valid block separator regex"));

// @const: Line break runs spanning a blank line, collapsed on export
static BLANK_LINE_RUN_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\r\n]\s*[\r\n]").expect("valid blank line regex"));

/// Translation state of a unit.
///
/// Moves only forward: `Pending -> Claimed -> Completed | Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitState {
    Pending,
    Claimed,
    Completed,
    Failed,
}

impl UnitState {
    // @returns: Whether the unit has reached a final state
    pub fn is_finished(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for UnitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Pending => "pending",
            Self::Claimed => "processing",
            Self::Completed => "completed",
            Self::Failed => "error",
        };
        f.write_str(label)
    }
}

// @struct: One translatable subtitle record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    // @field: Sequence number from the source document
    pub id: u64,

    // @field: Start marker, kept verbatim
    pub start: String,

    // @field: End marker, kept verbatim
    pub end: String,

    // @field: Original text
    pub source_text: String,

    // @field: Translation, only set on completion
    pub translated_text: String,

    state: UnitState,

    // @field: Display name of the lane that claimed this unit
    assigned_lane: Option<String>,
}

impl Unit {
    /// Creates a pending unit
    pub fn new(id: u64, start: impl Into<String>, end: impl Into<String>, source_text: impl Into<String>) -> Self {
        Self {
            id,
            start: start.into(),
            end: end.into(),
            source_text: source_text.into(),
            translated_text: String::new(),
            state: UnitState::Pending,
            assigned_lane: None,
        }
    }

    pub fn state(&self) -> UnitState {
        self.state
    }

    pub fn assigned_lane(&self) -> Option<&str> {
        self.assigned_lane.as_deref()
    }

    /// Marks the unit as claimed by `lane`
    pub fn claim(&mut self, lane: &str) -> Result<(), SubtitleError> {
        self.transition(UnitState::Pending, UnitState::Claimed)?;
        self.assigned_lane = Some(lane.to_string());
        Ok(())
    }

    /// Stores the translation and marks the unit completed
    pub fn complete(&mut self, translated_text: impl Into<String>) -> Result<(), SubtitleError> {
        self.transition(UnitState::Claimed, UnitState::Completed)?;
        self.translated_text = translated_text.into();
        Ok(())
    }

    /// Marks the unit failed; its translation stays empty
    pub fn fail(&mut self) -> Result<(), SubtitleError> {
        self.transition(UnitState::Claimed, UnitState::Failed)
    }

    fn transition(&mut self, expected: UnitState, to: UnitState) -> Result<(), SubtitleError> {
        if self.state != expected {
            return Err(SubtitleError::InvalidTransition {
                id: self.id,
                from: self.state,
                to,
            });
        }
        self.state = to;
        Ok(())
    }

    /// Text written on export: the translation when it has content, else the source.
    /// Blank lines inside the text are collapsed so the body cannot end its block early.
    pub fn export_text(&self) -> Cow<'_, str> {
        let translated = self.translated_text.trim();
        let text = if translated.is_empty() {
            self.source_text.trim()
        } else {
            translated
        };
        BLANK_LINE_RUN_REGEX.replace_all(text, "\n")
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}", self.id)?;
        writeln!(f, "{} --> {}", self.start, self.end)?;
        writeln!(f, "{}", self.export_text())
    }
}

/// Parses SRT content into pending units.
///
/// Blocks are separated by blank lines. A block that does not match the
/// strict layout is retried with a tolerant reading (id on line one, a time
/// range somewhere on line two, text after). Anything else is dropped.
pub fn parse_srt(content: &str) -> Vec<Unit> {
    let normalized = content.replace("\r\n", "\n").replace('\r', "\n");

    let mut units = Vec::new();
    let mut skipped = 0usize;

    for block in BLOCK_SEPARATOR_REGEX.split(&normalized) {
        let trimmed = block.trim();
        if trimmed.is_empty() {
            continue;
        }

        match parse_block(trimmed) {
            Some(unit) => units.push(unit),
            None => {
                skipped += 1;
                debug!("Skipping unparsable subtitle block: {:?}", truncate(trimmed, 40));
            }
        }
    }

    if skipped > 0 {
        warn!("Skipped {} malformed subtitle block(s)", skipped);
    }

    units
}

fn parse_block(block: &str) -> Option<Unit> {
    if let Some(caps) = SRT_BLOCK_REGEX.captures(block) {
        let id = caps[1].parse().ok()?;
        return Some(Unit::new(id, &caps[2], &caps[3], caps[4].trim()));
    }

    // Tolerant fallback for messy separators
    let lines: Vec<&str> = block.split('\n').collect();
    if lines.len() < 3 {
        return None;
    }
    let id = lines[0].trim().parse().ok()?;
    let caps = TIME_RANGE_REGEX.captures(lines[1])?;
    Some(Unit::new(id, &caps[1], &caps[2], lines[2..].join("\n")))
}

/// Serializes units in order; blocks are separated by a blank line
pub fn generate_srt(units: &[Unit]) -> String {
    units
        .iter()
        .map(|unit| unit.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// A loaded subtitle document
#[derive(Debug, Clone)]
pub struct SubtitleCollection {
    /// Source filename
    pub source_file: PathBuf,

    /// Units in document order
    pub units: Vec<Unit>,
}

impl SubtitleCollection {
    pub fn new(source_file: PathBuf, units: Vec<Unit>) -> Self {
        Self { source_file, units }
    }

    /// Reads and parses an SRT file
    pub fn read_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path)
            .with_context(|| format!("Failed to read subtitle file: {}", path.display()))?;
        let content = String::from_utf8_lossy(&bytes);
        // Byte order marks show up in files saved by common editors
        let content = content.trim_start_matches('\u{feff}');

        Ok(Self::new(path.to_path_buf(), parse_srt(content)))
    }

    /// Writes the units as SRT, creating parent directories when needed
    pub fn write_to_srt<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        write_srt_file(path, &self.units)
    }
}

/// Writes units as an SRT file
pub fn write_srt_file<P: AsRef<Path>>(path: P, units: &[Unit]) -> Result<()> {
    let path = path.as_ref();

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    fs::write(path, generate_srt(units))
        .with_context(|| format!("Failed to write subtitle file: {}", path.display()))?;

    Ok(())
}
