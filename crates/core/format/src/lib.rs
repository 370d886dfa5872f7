//! Unified format traits for divisi.
//!
//! This crate defines the abstractions the score loaders and writers
//! implement:
//!
//! - [`Format`] — metadata about a file format (id, name, extensions, content detection)
//! - [`Importer`] — parse input bytes into the internal [`Score`] model
//! - [`Exporter`] — serialize a [`Score`] into the format's text form
//! - [`FormatError`] — unified error type wrapping format-specific errors
//! - [`FormatRegistry`] — runtime registry for discovering and dispatching formats
//! - [`musescore`] — subprocess bridge to an external notation editor for
//!   formats divisi cannot read natively
//!
//! Input is `&[u8]` rather than `&str` because two supported containers
//! (compressed MusicXML and MuseScore archives) are binary.

pub mod musescore;

use thiserror::Error;

pub use divisi_model::Score;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Unified error type for format operations.
///
/// Wraps format-specific errors into broad categories so that callers
/// (CLI, etc.) can handle them uniformly.
#[derive(Debug, Error)]
pub enum FormatError {
    /// Error parsing the input into the internal model.
    #[error("parse error: {0}")]
    Parse(Box<dyn std::error::Error + Send + Sync>),

    /// Error serializing the internal model to output.
    #[error("serialization error: {0}")]
    Serialize(Box<dyn std::error::Error + Send + Sync>),

    /// An external conversion tool failed.
    #[error("notation tool '{tool}' failed: {message}")]
    Tool {
        /// The tool binary that was invoked.
        tool: String,
        /// What went wrong (exit status, stderr excerpt, …).
        message: String,
    },

    /// No registered format matches the given extension or content.
    #[error("unknown format: {0}")]
    UnknownFormat(String),

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl FormatError {
    /// Wrap a format-specific parse error.
    pub fn parse(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Parse(Box::new(err))
    }

    /// Wrap a format-specific serialization error.
    pub fn serialize(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Serialize(Box::new(err))
    }

    /// Create an external-tool error.
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }
}

/// Result type alias for format operations.
pub type FormatResult<T> = Result<T, FormatError>;

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Describes a music notation file format.
///
/// Every format handler implements this trait to provide metadata used
/// for format detection and user-facing messages.
pub trait Format: Send + Sync {
    /// Unique short identifier (e.g. `"musicxml"`, `"musescore"`).
    fn id(&self) -> &'static str;

    /// Human-readable display name (e.g. `"MusicXML"`).
    fn name(&self) -> &'static str;

    /// File extensions associated with this format, **without** the leading dot.
    ///
    /// The first extension is considered the "primary" one.
    fn extensions(&self) -> &'static [&'static str];

    /// Attempt to detect this format from file content.
    ///
    /// Implementations should only inspect a small prefix (or, for zip
    /// containers, the entry names) — the method may be called on very
    /// large files. Return `true` if the content is likely in this format.
    fn detect(&self, content: &[u8]) -> bool;
}

/// Import from a file format into the internal score model.
///
/// The full pipeline (container unpacking, external conversion where
/// needed, and parsing) is encapsulated behind this single method.
pub trait Importer: Format {
    /// Parse `input` into a [`Score`].
    fn import(&self, input: &[u8]) -> FormatResult<Score>;
}

/// Export from the internal score model to a file format.
pub trait Exporter: Format {
    /// Convert `score` to the format's string representation.
    fn export(&self, score: &Score) -> FormatResult<String>;
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Runtime registry of available format handlers.
///
/// The registry allows callers to discover importers and exporters by
/// file extension or content detection, without hard-coding format
/// knowledge.
pub struct FormatRegistry {
    importers: Vec<Box<dyn Importer>>,
    exporters: Vec<Box<dyn Exporter>>,
}

impl FormatRegistry {
    /// Create a new, empty registry.
    pub fn new() -> Self {
        Self {
            importers: Vec::new(),
            exporters: Vec::new(),
        }
    }

    /// Register a format importer.
    pub fn register_importer(&mut self, importer: Box<dyn Importer>) {
        self.importers.push(importer);
    }

    /// Register a format exporter.
    pub fn register_exporter(&mut self, exporter: Box<dyn Exporter>) {
        self.exporters.push(exporter);
    }

    /// Find an importer by file extension, with optional content-based fallback.
    ///
    /// 1. Counts importers whose [`Format::extensions`] match `ext`
    ///    (case-insensitive).
    /// 2. If exactly one matches, confirms via [`Format::detect`] when
    ///    content is available, falling back to any importer whose content
    ///    detection succeeds.
    /// 3. If multiple match, content detection disambiguates.
    /// 4. If no extension matches, pure content detection decides.
    pub fn find_importer(&self, ext: &str, content: Option<&[u8]>) -> Option<&dyn Importer> {
        #[allow(clippy::borrowed_box)]
        let matches_ext =
            |imp: &Box<dyn Importer>| imp.extensions().iter().any(|e| e.eq_ignore_ascii_case(ext));

        let ext_match_count = self.importers.iter().filter(|imp| matches_ext(imp)).count();

        if ext_match_count == 1 {
            let ext_match = self.importers.iter().find(|imp| matches_ext(imp)).unwrap();

            if let Some(content) = content {
                // Extension match confirms via content — return it.
                if ext_match.detect(content) {
                    return Some(ext_match.as_ref());
                }
                // Extension-matched format doesn't recognise the content;
                // another format might (e.g. an .xml file holding something
                // else entirely).
                if let Some(content_match) = self.importers.iter().find(|imp| imp.detect(content)) {
                    return Some(content_match.as_ref());
                }
            }

            // No content or no content match — trust the extension.
            return Some(ext_match.as_ref());
        }

        // Multiple extension matches — use content to disambiguate.
        if let Some(content) = content {
            if ext_match_count > 1
                && let Some(imp) = self
                    .importers
                    .iter()
                    .filter(|imp| matches_ext(imp))
                    .find(|imp| imp.detect(content))
            {
                return Some(imp.as_ref());
            }
            // Fall back to any importer that detects the content.
            return self
                .importers
                .iter()
                .find(|imp| imp.detect(content))
                .map(|imp| imp.as_ref());
        }

        // No content provided — return first extension match (if any).
        self.importers
            .iter()
            .find(|imp| matches_ext(imp))
            .map(|imp| imp.as_ref())
    }

    /// Find an exporter by file extension (case-insensitive).
    pub fn find_exporter(&self, ext: &str) -> Option<&dyn Exporter> {
        self.exporters
            .iter()
            .find(|exp| exp.extensions().iter().any(|e| e.eq_ignore_ascii_case(ext)))
            .map(|exp| exp.as_ref())
    }

    /// Iterate over all registered importers.
    pub fn importers(&self) -> impl Iterator<Item = &dyn Importer> {
        self.importers.iter().map(|imp| imp.as_ref())
    }

    /// Iterate over all registered exporters.
    pub fn exporters(&self) -> impl Iterator<Item = &dyn Exporter> {
        self.exporters.iter().map(|exp| exp.as_ref())
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
