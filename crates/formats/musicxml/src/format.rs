//! [`Format`] implementations: native MusicXML and the MuseScore bridge.

use divisi_format::musescore::MuseScoreBridge;
use divisi_format::{Exporter, Format, FormatError, FormatResult, Importer, Score};

use crate::export::write_musicxml;
use crate::import::parse_musicxml;
use crate::mxl::{is_zip, read_mxl, zip_entry_names};

/// Sniff window for plain-text detection.
const DETECT_WINDOW: usize = 4096;

/// MusicXML, plain (`.musicxml`, `.xml`) or compressed (`.mxl`).
pub struct MusicXmlFormat;

impl Format for MusicXmlFormat {
    fn id(&self) -> &'static str {
        "musicxml"
    }

    fn name(&self) -> &'static str {
        "MusicXML"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["musicxml", "xml", "mxl"]
    }

    fn detect(&self, content: &[u8]) -> bool {
        if is_zip(content) {
            // A compressed score carries its root document in the archive;
            // MuseScore archives carry .mscx instead.
            let names = zip_entry_names(content);
            return names.iter().any(|n| {
                !n.starts_with("META-INF/") && (n.ends_with(".musicxml") || n.ends_with(".xml"))
            }) && !names.iter().any(|n| n.ends_with(".mscx"));
        }
        let window = &content[..content.len().min(DETECT_WINDOW)];
        let text = String::from_utf8_lossy(window);
        text.contains("<score-partwise") || text.contains("<score-timewise")
    }
}

impl Importer for MusicXmlFormat {
    fn import(&self, input: &[u8]) -> FormatResult<Score> {
        let text = if is_zip(input) {
            read_mxl(input).map_err(FormatError::parse)?
        } else {
            std::str::from_utf8(input)
                .map_err(|err| {
                    FormatError::parse(crate::error::MusicXmlError::xml(format!(
                        "input is not UTF-8: {err}"
                    )))
                })?
                .to_string()
        };
        parse_musicxml(&text).map_err(FormatError::parse)
    }
}

impl Exporter for MusicXmlFormat {
    fn export(&self, score: &Score) -> FormatResult<String> {
        write_musicxml(score).map_err(FormatError::serialize)
    }
}

/// MuseScore archives (`.mscz`), converted through the external notation
/// tool and then parsed as MusicXML.
pub struct MuseScoreFormat {
    bridge: MuseScoreBridge,
}

impl MuseScoreFormat {
    /// Create with an explicit bridge (tool path already resolved).
    pub fn new(bridge: MuseScoreBridge) -> Self {
        Self { bridge }
    }

    /// Create with the tool taken from the environment.
    pub fn from_env() -> Self {
        Self::new(MuseScoreBridge::from_env())
    }
}

impl Format for MuseScoreFormat {
    fn id(&self) -> &'static str {
        "musescore"
    }

    fn name(&self) -> &'static str {
        "MuseScore"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["mscz"]
    }

    fn detect(&self, content: &[u8]) -> bool {
        is_zip(content) && zip_entry_names(content).iter().any(|n| n.ends_with(".mscx"))
    }
}

impl Importer for MuseScoreFormat {
    fn import(&self, input: &[u8]) -> FormatResult<Score> {
        let xml = self.bridge.convert_to_musicxml(input)?;
        parse_musicxml(&xml).map_err(FormatError::parse)
    }
}
