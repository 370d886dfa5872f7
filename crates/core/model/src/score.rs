//! Score containers and measure-level marks.
//!
//! A [`Score`] owns an ordered list of [`Part`]s plus the score-level spanner
//! collection. Each [`Part`] is a staff: a sequence of [`Measure`]s, each
//! holding polyphonic [`Voice`]s and non-voice marks (clefs, signatures,
//! dynamics, tempo, rehearsal and layout marks).

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::note::{NoteId, VoiceEvent};
use crate::rhythm::Beats;
use crate::spanner::{Spanner, SpannerId};

// ============================================================================
// Measure-level marks
// ============================================================================

/// A clef, named by engraving convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Clef {
    /// G clef on line 2.
    Treble,
    /// G clef on line 2, sounding an octave lower than written.
    TrebleDown8,
    /// F clef on line 4.
    Bass,
    /// C clef on line 3.
    Alto,
    /// C clef on line 4.
    Tenor,
    /// Anything else, kept verbatim for round-tripping.
    Other {
        sign: char,
        line: u8,
        octave_change: i8,
    },
}

impl std::fmt::Display for Clef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Treble => write!(f, "treble"),
            Self::TrebleDown8 => write!(f, "treble-8vb"),
            Self::Bass => write!(f, "bass"),
            Self::Alto => write!(f, "alto"),
            Self::Tenor => write!(f, "tenor"),
            Self::Other {
                sign,
                line,
                octave_change,
            } => write!(f, "{sign}{line}/{octave_change}"),
        }
    }
}

/// A time signature, e.g. 4/4 or 6/8.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeSignature {
    pub beats: u8,
    pub beat_type: u8,
}

impl TimeSignature {
    pub fn new(beats: u8, beat_type: u8) -> Self {
        Self { beats, beat_type }
    }

    /// Full measure length in quarter notes.
    pub fn measure_beats(&self) -> Beats {
        Beats::new(4 * i32::from(self.beats), i32::from(self.beat_type))
    }
}

/// A key signature as a count of sharps (positive) or flats (negative).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeySignature {
    pub fifths: i8,
}

/// Vertical placement of a mark relative to its staff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    Above,
    Below,
}

/// A dynamic mark (`p`, `f`, `mp`, …) at a measure offset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dynamic {
    /// The mark text, e.g. `"p"`, `"ff"`, `"sfz"`.
    pub value: String,
    pub offset: Beats,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placement: Option<Placement>,
    /// Staff number within the source part, 1-based.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staff: Option<u8>,
}

impl Dynamic {
    pub fn new(value: impl Into<String>, offset: Beats) -> Self {
        Self {
            value: value.into(),
            offset,
            placement: None,
            staff: None,
        }
    }
}

/// A metronome or textual tempo indication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TempoMark {
    pub offset: Beats,
    /// Beat unit of a metronome mark, e.g. `"quarter"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beat_unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_minute: Option<u32>,
    /// Textual indication, e.g. `"Andante"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// A rehearsal mark at the start of a measure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RehearsalMark {
    pub text: String,
}

/// What a layout break separates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BreakKind {
    System,
    Page,
}

/// An explicit system or page break at the start of a measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutBreak {
    pub kind: BreakKind,
}

/// A non-voice element attached to a measure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MeasureElement {
    Clef { clef: Clef, offset: Beats },
    Time(TimeSignature),
    Key(KeySignature),
    Dynamic(Dynamic),
    Tempo(TempoMark),
    Rehearsal(RehearsalMark),
    Break(LayoutBreak),
}

impl MeasureElement {
    /// The element's offset within the measure, where it has one.
    ///
    /// Signatures, rehearsal marks, and breaks sit at the measure start.
    pub fn offset(&self) -> Beats {
        match self {
            Self::Clef { offset, .. } => *offset,
            Self::Dynamic(d) => d.offset,
            Self::Tempo(t) => t.offset,
            Self::Time(_) | Self::Key(_) | Self::Rehearsal(_) | Self::Break(_) => {
                crate::rhythm::zero()
            }
        }
    }
}

// ============================================================================
// Containers
// ============================================================================

/// A polyphonic stream within a measure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Voice {
    /// Voice id as it appears in the source, e.g. `"1"`, `"5"`.
    pub id: String,
    /// Events in time order.
    pub events: Vec<VoiceEvent>,
}

impl Voice {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            events: Vec::new(),
        }
    }
}

/// An indexed, time-bounded container of voices and measure-level marks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measure {
    /// Measure number from the source, 1-based.
    pub number: u32,
    pub voices: Vec<Voice>,
    pub elements: Vec<MeasureElement>,
}

impl Measure {
    pub fn new(number: u32) -> Self {
        Self {
            number,
            voices: Vec::new(),
            elements: Vec::new(),
        }
    }

    /// Look up a voice by id.
    pub fn voice(&self, id: &str) -> Option<&Voice> {
        self.voices.iter().find(|v| v.id == id)
    }

    /// Look up a voice by id, mutably.
    pub fn voice_mut(&mut self, id: &str) -> Option<&mut Voice> {
        self.voices.iter_mut().find(|v| v.id == id)
    }

    /// Whether any voice holds at least one timed event.
    pub fn has_timed_content(&self) -> bool {
        self.voices.iter().any(|v| !v.events.is_empty())
    }

    /// The time signature stated in this measure, if any.
    pub fn time_signature(&self) -> Option<TimeSignature> {
        self.elements.iter().find_map(|e| match e {
            MeasureElement::Time(ts) => Some(*ts),
            _ => None,
        })
    }

    /// Dynamics attached to this measure.
    pub fn dynamics(&self) -> impl Iterator<Item = &Dynamic> {
        self.elements.iter().filter_map(|e| match e {
            MeasureElement::Dynamic(d) => Some(d),
            _ => None,
        })
    }
}

/// A staff-level container: name, predominant clef, measures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    /// Part id from the source, e.g. `"P1"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clef: Option<Clef>,
    pub measures: Vec<Measure>,
}

impl Part {
    pub fn new() -> Self {
        Self {
            id: None,
            name: None,
            clef: None,
            measures: Vec::new(),
        }
    }

    /// Look up a measure by number.
    pub fn measure(&self, number: u32) -> Option<&Measure> {
        self.measures.iter().find(|m| m.number == number)
    }

    /// Look up a measure by number, mutably.
    pub fn measure_mut(&mut self, number: u32) -> Option<&mut Measure> {
        self.measures.iter_mut().find(|m| m.number == number)
    }
}

impl Default for Part {
    fn default() -> Self {
        Self::new()
    }
}

/// Work-level metadata.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScoreMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub movement_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub composer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lyricist: Option<String>,
    /// Base name of the file the score was loaded from, without extension.
    ///
    /// Set by the loader from the path the *user* named, never from an
    /// intermediate conversion artifact, so it is safe as a title fallback.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_basename: Option<String>,
}

impl ScoreMetadata {
    /// The work title, falling back to the source file's base name.
    pub fn title_or_basename(&self) -> Option<&str> {
        self.work_title
            .as_deref()
            .filter(|t| !t.is_empty())
            .or(self.source_basename.as_deref())
    }
}

/// Location of one note within a score, as resolved by [`Score::locate_note`].
#[derive(Debug, Clone, PartialEq)]
pub struct NotePosition {
    pub part_index: usize,
    pub measure_number: u32,
    pub voice_id: String,
    pub offset: Beats,
    pub duration: Beats,
}

/// The root container: metadata, parts, and the spanner collection.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Score {
    #[serde(default)]
    pub metadata: ScoreMetadata,
    pub parts: Vec<Part>,
    /// Spanners referencing notes by identity. See [`crate::spanner`].
    #[serde(default)]
    pub spanners: Vec<Spanner>,
}

impl Score {
    pub fn new() -> Self {
        Self::default()
    }

    /// Iterate all voice events in document order (part, measure, voice).
    pub fn events(&self) -> impl Iterator<Item = &VoiceEvent> {
        self.parts
            .iter()
            .flat_map(|p| p.measures.iter())
            .flat_map(|m| m.voices.iter())
            .flat_map(|v| v.events.iter())
    }

    /// The set of note ids present in the score.
    pub fn note_ids(&self) -> HashSet<NoteId> {
        self.events().filter_map(|e| e.note_id()).collect()
    }

    /// Whether a note with the given id exists anywhere in the score.
    pub fn contains_note(&self, id: NoteId) -> bool {
        self.events().any(|e| e.note_id() == Some(id))
    }

    /// Resolve a note id to its position.
    pub fn locate_note(&self, id: NoteId) -> Option<NotePosition> {
        for (part_index, part) in self.parts.iter().enumerate() {
            for measure in &part.measures {
                for voice in &measure.voices {
                    for event in &voice.events {
                        if event.note_id() == Some(id) {
                            return Some(NotePosition {
                                part_index,
                                measure_number: measure.number,
                                voice_id: voice.id.clone(),
                                offset: event.offset(),
                                duration: event.duration(),
                            });
                        }
                    }
                }
            }
        }
        None
    }

    /// Drop spanners with any endpoint that no longer resolves to a note.
    ///
    /// Returns the number of spanners removed. This is the reference-repair
    /// sweep run after voice removal and again after spanner unification.
    pub fn retain_valid_spanners(&mut self) -> usize {
        let ids = self.note_ids();
        let before = self.spanners.len();
        self.spanners
            .retain(|s| !s.notes.is_empty() && s.notes.iter().all(|n| ids.contains(n)));
        before - self.spanners.len()
    }

    /// An unused spanner id.
    pub fn next_spanner_id(&self) -> SpannerId {
        let max = self.spanners.iter().map(|s| s.id.raw()).max();
        SpannerId::new(max.map_or(0, |m| m + 1))
    }

    /// An unused note id, for programmatic construction.
    pub fn next_note_id(&self) -> NoteId {
        let max = self.events().filter_map(|e| e.note_id()).map(NoteId::raw).max();
        NoteId::new(max.map_or(0, |m| m + 1))
    }
}
