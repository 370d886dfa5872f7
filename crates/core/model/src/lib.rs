//! Musical object model for divisi.
//!
//! This crate contains the in-memory representation of a score that the
//! splitting pipeline operates on. The model is deliberately small: it covers
//! the entities a closed-score SATB source actually uses (parts, measures,
//! voices, notes, chords, rests, lyrics, spanners, dynamics, tempo and layout
//! marks) rather than the full breadth of MusicXML.
//!
//! # Module Organization
//!
//! - `rhythm` - Rational time: offsets and durations in quarter-note units
//! - `pitch` - Diatonic steps and pitches
//! - `note` - Timed voice content: notes, chords, rests, lyrics
//! - `spanner` - Note-connecting elements: slurs, ties, wedges, lines
//! - `score` - Containers: score, part, measure, voice, measure-level marks
//!
//! # Identity and deep copy
//!
//! Spanners reference the notes they connect by [`NoteId`]. Ids are unique
//! within one score and are preserved by `Clone`, so cloning a [`Score`]
//! yields an isolated copy whose spanner references resolve against its own
//! notes. Mutating one copy can never affect another.

pub mod note;
pub mod pitch;
pub mod rhythm;
pub mod score;
pub mod spanner;

pub use note::{Chord, Lyric, Note, NoteId, Rest, Syllabic, VoiceEvent};
pub use pitch::{Pitch, Step};
pub use rhythm::{Beats, beats, whole_beats, zero};
pub use score::{
    BreakKind, Clef, Dynamic, KeySignature, LayoutBreak, Measure, MeasureElement, NotePosition,
    Part, Placement, RehearsalMark, Score, ScoreMetadata, TempoMark, TimeSignature, Voice,
};
pub use spanner::{Spanner, SpannerId, SpannerKind};
