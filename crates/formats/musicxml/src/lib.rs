//! MusicXML parsing and serialization for divisi.
//!
//! The crate reads score-partwise MusicXML documents (plain or inside an
//! `.mxl` zip container) into the [`divisi_model`] types and writes them
//! back out. MuseScore archives are supported through
//! [`MuseScoreFormat`], which shells out to an external notation tool for
//! the `.mscz` → MusicXML step before parsing.
//!
//! # Example
//!
//! ```
//! use divisi_musicxml::{parse_musicxml, write_musicxml};
//!
//! let xml = r#"<score-partwise version="4.0">
//!   <part-list><score-part id="P1"><part-name>Voice</part-name></score-part></part-list>
//!   <part id="P1">
//!     <measure number="1">
//!       <attributes><divisions>1</divisions></attributes>
//!       <note><pitch><step>C</step><octave>4</octave></pitch>
//!             <duration>4</duration><voice>1</voice></note>
//!     </measure>
//!   </part>
//! </score-partwise>"#;
//!
//! let score = parse_musicxml(xml).unwrap();
//! assert_eq!(score.parts.len(), 1);
//! let out = write_musicxml(&score).unwrap();
//! assert!(out.contains("<step>C</step>"));
//! ```

pub mod error;
pub mod export;
pub mod format;
pub mod import;
pub mod mxl;

pub use error::{MusicXmlError, MusicXmlResult};
pub use export::write_musicxml;
pub use format::{MuseScoreFormat, MusicXmlFormat};
pub use import::parse_musicxml;
pub use mxl::read_mxl;
