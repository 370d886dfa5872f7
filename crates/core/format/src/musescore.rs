//! Subprocess bridge to an external notation editor.
//!
//! MuseScore archives (`.mscz`) are not parsed natively; they are converted
//! to MusicXML by shelling out to a notation tool, contract
//! `<tool> -o <out.xml> <in.mscz>` with a non-zero exit treated as a fatal
//! load error. Conversion happens inside a temporary directory that is
//! removed afterwards; the temporary path must never leak into score
//! metadata (titles fall back to the *original* input's base name, which
//! the caller records separately).

use std::path::PathBuf;
use std::process::Command;

use tracing::debug;

use crate::{FormatError, FormatResult};

/// Environment variable overriding the notation tool binary.
pub const TOOL_ENV_VAR: &str = "DIVISI_MSCORE";

/// Default notation tool binary name.
pub const DEFAULT_TOOL: &str = "mscore";

/// Bridge to the external notation tool.
#[derive(Debug, Clone)]
pub struct MuseScoreBridge {
    tool: PathBuf,
}

impl MuseScoreBridge {
    /// Create a bridge invoking the given tool binary.
    pub fn new(tool: impl Into<PathBuf>) -> Self {
        Self { tool: tool.into() }
    }

    /// Create a bridge from the `DIVISI_MSCORE` environment variable,
    /// falling back to `mscore` on the search path.
    pub fn from_env() -> Self {
        let tool = std::env::var_os(TOOL_ENV_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_TOOL));
        Self { tool }
    }

    /// The tool binary this bridge invokes.
    pub fn tool(&self) -> &std::path::Path {
        &self.tool
    }

    /// Convert a MuseScore archive to MusicXML text.
    ///
    /// The archive bytes are written to a scratch file, the tool is invoked
    /// with `-o <out>.musicxml`, and the produced MusicXML is read back.
    pub fn convert_to_musicxml(&self, input: &[u8]) -> FormatResult<String> {
        let tool_name = self.tool.display().to_string();
        let dir = tempfile::tempdir()?;
        let in_path = dir.path().join("score.mscz");
        let out_path = dir.path().join("score.musicxml");
        std::fs::write(&in_path, input)?;

        debug!(tool = %tool_name, "converting MuseScore archive to MusicXML");
        let output = Command::new(&self.tool)
            .arg("-o")
            .arg(&out_path)
            .arg(&in_path)
            .output()
            .map_err(|err| {
                FormatError::tool(&tool_name, format!("could not be invoked: {err}"))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(FormatError::tool(
                &tool_name,
                format!("{}: {}", output.status, stderr.trim()),
            ));
        }

        let xml = std::fs::read_to_string(&out_path).map_err(|err| {
            FormatError::tool(
                &tool_name,
                format!("reported success but produced no readable output: {err}"),
            )
        })?;
        Ok(xml)
    }
}

impl Default for MuseScoreBridge {
    fn default() -> Self {
        Self::from_env()
    }
}
