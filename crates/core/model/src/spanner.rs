//! Note-connecting elements: slurs, ties, wedges, and untyped lines.
//!
//! Spanners live in the score-level collection ([`crate::Score::spanners`]),
//! not inside measures, and reference the notes they connect by [`NoteId`].
//! Slurs record every note under the slur in order, so "strictly in the
//! middle of a slur" is answerable without a time scan; other kinds usually
//! carry just their two endpoints.

use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::note::NoteId;

/// Stable identity of a spanner within one score.
#[derive(
    Debug, Display, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[display("sp{_0}")]
pub struct SpannerId(u32);

impl SpannerId {
    pub fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u32 {
        self.0
    }
}

/// The kind of connection a spanner draws.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpannerKind {
    /// Legato phrasing across multiple notes.
    #[display("slur")]
    Slur,
    /// Two notes of the same pitch joined into one sustained sound.
    #[display("tie")]
    Tie,
    /// Crescendo hairpin.
    #[display("crescendo")]
    Crescendo,
    /// Diminuendo hairpin.
    #[display("diminuendo")]
    Diminuendo,
    /// Untyped line (bracket, glissando-like line, …).
    #[display("line")]
    Line,
}

impl SpannerKind {
    /// Crescendo or diminuendo.
    pub fn is_wedge(self) -> bool {
        matches!(self, Self::Crescendo | Self::Diminuendo)
    }
}

/// A spanner: an ordered list of notes connected by one graphical element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spanner {
    pub id: SpannerId,
    pub kind: SpannerKind,
    /// The connected notes in time order. The first and last entries are the
    /// visual endpoints.
    pub notes: Vec<NoteId>,
}

impl Spanner {
    pub fn new(id: SpannerId, kind: SpannerKind, notes: Vec<NoteId>) -> Self {
        Self { id, kind, notes }
    }

    /// The starting note, if the spanner has any.
    pub fn first(&self) -> Option<NoteId> {
        self.notes.first().copied()
    }

    /// The ending note, if the spanner has any.
    pub fn last(&self) -> Option<NoteId> {
        self.notes.last().copied()
    }

    /// Whether `id` lies strictly between the first and last connected note.
    pub fn is_interior(&self, id: NoteId) -> bool {
        if self.notes.len() < 3 {
            return false;
        }
        self.notes[1..self.notes.len() - 1].contains(&id)
    }
}
