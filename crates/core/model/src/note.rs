//! Timed voice content: notes, chords, rests, and lyric attachments.

use derive_more::Display;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::pitch::Pitch;
use crate::rhythm::Beats;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Stable identity of a note or chord within one score.
///
/// Spanners reference their endpoints through `NoteId`. Ids are allocated by
/// the importer (or explicitly by test builders), are unique within a score,
/// and survive `Clone` of the containing [`crate::Score`] unchanged.
#[derive(
    Debug, Display, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[display("n{_0}")]
pub struct NoteId(u32);

impl NoteId {
    /// Wrap a raw id value.
    pub fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// The raw id value.
    pub fn raw(self) -> u32 {
        self.0
    }
}

// ---------------------------------------------------------------------------
// Lyrics
// ---------------------------------------------------------------------------

/// Position of a syllable within its word.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Syllabic {
    /// A complete word.
    #[display("single")]
    Single,
    /// First syllable of a word.
    #[display("begin")]
    Begin,
    /// Interior syllable.
    #[display("middle")]
    Middle,
    /// Last syllable of a word.
    #[display("end")]
    End,
}

impl Syllabic {
    /// Parse the MusicXML `syllabic` value.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "single" => Some(Self::Single),
            "begin" => Some(Self::Begin),
            "middle" => Some(Self::Middle),
            "end" => Some(Self::End),
            _ => None,
        }
    }
}

/// A syllable of sung text attached to a note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lyric {
    pub text: String,
    pub syllabic: Syllabic,
    /// Verse line, 1-based. Almost always 1 in choral sources.
    pub line: u8,
}

impl Lyric {
    /// Create a lyric on verse line 1.
    pub fn new(text: impl Into<String>, syllabic: Syllabic) -> Self {
        Self {
            text: text.into(),
            syllabic,
            line: 1,
        }
    }

    /// Create a lyric on an explicit verse line.
    pub fn on_line(text: impl Into<String>, syllabic: Syllabic, line: u8) -> Self {
        Self {
            text: text.into(),
            syllabic,
            line,
        }
    }
}

// ---------------------------------------------------------------------------
// Timed events
// ---------------------------------------------------------------------------

/// A single pitched note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub pitch: Pitch,
    /// Quarter-note position within the measure.
    pub offset: Beats,
    pub duration: Beats,
    #[serde(default, skip_serializing_if = "SmallVec::is_empty")]
    pub lyrics: SmallVec<[Lyric; 1]>,
    /// Grace notes carry no duration of their own and are excluded from
    /// lyric and spanner candidacy.
    #[serde(default)]
    pub grace: bool,
}

impl Note {
    pub fn new(id: NoteId, pitch: Pitch, offset: Beats, duration: Beats) -> Self {
        Self {
            id,
            pitch,
            offset,
            duration,
            lyrics: SmallVec::new(),
            grace: false,
        }
    }
}

/// Multiple simultaneous pitches sharing one stem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chord {
    pub id: NoteId,
    pub pitches: SmallVec<[Pitch; 4]>,
    pub offset: Beats,
    pub duration: Beats,
    #[serde(default, skip_serializing_if = "SmallVec::is_empty")]
    pub lyrics: SmallVec<[Lyric; 1]>,
    #[serde(default)]
    pub grace: bool,
}

/// A silence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rest {
    pub offset: Beats,
    pub duration: Beats,
    /// A rest notated as filling its whole measure.
    #[serde(default)]
    pub whole_measure: bool,
}

impl Rest {
    pub fn new(offset: Beats, duration: Beats) -> Self {
        Self {
            offset,
            duration,
            whole_measure: false,
        }
    }

    /// A rest spanning a full measure at offset 0.
    pub fn whole_measure(duration: Beats) -> Self {
        Self {
            offset: crate::rhythm::zero(),
            duration,
            whole_measure: true,
        }
    }
}

/// One element of a voice's event stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum VoiceEvent {
    Note(Note),
    Chord(Chord),
    Rest(Rest),
}

impl VoiceEvent {
    /// Quarter-note position within the measure.
    pub fn offset(&self) -> Beats {
        match self {
            Self::Note(n) => n.offset,
            Self::Chord(c) => c.offset,
            Self::Rest(r) => r.offset,
        }
    }

    pub fn duration(&self) -> Beats {
        match self {
            Self::Note(n) => n.duration,
            Self::Chord(c) => c.duration,
            Self::Rest(r) => r.duration,
        }
    }

    /// The identity of a note or chord; rests have none.
    pub fn note_id(&self) -> Option<NoteId> {
        match self {
            Self::Note(n) => Some(n.id),
            Self::Chord(c) => Some(c.id),
            Self::Rest(_) => None,
        }
    }

    pub fn is_grace(&self) -> bool {
        match self {
            Self::Note(n) => n.grace,
            Self::Chord(c) => c.grace,
            Self::Rest(_) => false,
        }
    }

    /// Lyrics attached to a note or chord; empty for rests.
    pub fn lyrics(&self) -> &[Lyric] {
        match self {
            Self::Note(n) => &n.lyrics,
            Self::Chord(c) => &c.lyrics,
            Self::Rest(_) => &[],
        }
    }

    /// Append a lyric to a note or chord. No-op on rests.
    pub fn push_lyric(&mut self, lyric: Lyric) {
        match self {
            Self::Note(n) => n.lyrics.push(lyric),
            Self::Chord(c) => c.lyrics.push(lyric),
            Self::Rest(_) => {}
        }
    }
}
