//! Compressed MusicXML (`.mxl`) container handling.
//!
//! An `.mxl` file is a zip archive whose `META-INF/container.xml` names the
//! root score file. Archives without a container manifest fall back to the
//! first plausible XML entry.

use std::io::{Cursor, Read};

use quick_xml::Reader;
use quick_xml::events::Event;
use tracing::debug;

use crate::error::{MusicXmlError, MusicXmlResult};

/// Zip local-file-header magic.
pub(crate) fn is_zip(bytes: &[u8]) -> bool {
    bytes.starts_with(b"PK\x03\x04")
}

/// Entry names of a zip archive; empty if the bytes are not a readable zip.
pub(crate) fn zip_entry_names(bytes: &[u8]) -> Vec<String> {
    let Ok(archive) = zip::ZipArchive::new(Cursor::new(bytes)) else {
        return Vec::new();
    };
    archive.file_names().map(str::to_string).collect()
}

/// Extract the root MusicXML document from an `.mxl` container.
pub fn read_mxl(bytes: &[u8]) -> MusicXmlResult<String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|err| MusicXmlError::invalid_container(err.to_string()))?;

    let root_path = container_root_path(&mut archive)?.or_else(|| {
        archive
            .file_names()
            .find(|name| {
                !name.starts_with("META-INF/")
                    && (name.ends_with(".musicxml") || name.ends_with(".xml"))
            })
            .map(str::to_string)
    });

    let Some(root_path) = root_path else {
        return Err(MusicXmlError::invalid_container(
            "no root MusicXML entry found",
        ));
    };
    debug!(root = %root_path, "reading MusicXML from container");

    let mut file = archive
        .by_name(&root_path)
        .map_err(|err| MusicXmlError::invalid_container(err.to_string()))?;
    let mut content = String::new();
    file.read_to_string(&mut content)?;
    Ok(content)
}

/// The `full-path` of the first rootfile in `META-INF/container.xml`.
fn container_root_path(
    archive: &mut zip::ZipArchive<Cursor<&[u8]>>,
) -> MusicXmlResult<Option<String>> {
    let mut manifest = String::new();
    match archive.by_name("META-INF/container.xml") {
        Ok(mut file) => {
            file.read_to_string(&mut manifest)?;
        }
        Err(_) => return Ok(None),
    }

    let mut reader = Reader::from_str(&manifest);
    reader.config_mut().trim_text(true);
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.name().as_ref() == b"rootfile" => {
                for attr in e.attributes() {
                    let attr = attr?;
                    if attr.key.as_ref() == b"full-path" {
                        return Ok(Some(attr.unescape_value()?.into_owned()));
                    }
                }
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
    }
}
