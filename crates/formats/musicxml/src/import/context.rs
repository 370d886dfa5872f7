//! Parse-time state: divisions, cursor, id allocation, pending spanners.
//!
//! Slurs, ties, and wedges arrive in MusicXML as start/stop pairs on
//! separate elements, so the parser tracks unmatched starts here and
//! resolves them when the matching stop appears. Unresolved starts at end
//! of document are reported with a warning and dropped.

use divisi_model::{Beats, NoteId, Pitch, Spanner, SpannerId, SpannerKind, beats};
use tracing::warn;

/// A slur that has started but not yet stopped.
///
/// Every note sounded in the same part and voice while the slur is open is
/// recorded, so the model knows the slur's interior notes, not just its
/// endpoints.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PendingSlur {
    /// MusicXML slur number, scoping concurrent slurs within a part.
    pub number: u8,
    /// Source part index (document order, before staff splitting).
    pub source_part: usize,
    /// Voice id of the starting note.
    pub voice: String,
    /// Notes under the slur so far, in time order.
    pub notes: Vec<NoteId>,
}

/// A tie start awaiting its stop.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PendingTie {
    pub source_part: usize,
    pub voice: String,
    pub pitch: Pitch,
    pub note: NoteId,
}

/// A wedge (crescendo/diminuendo) start awaiting its stop.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PendingWedge {
    /// MusicXML wedge number.
    pub number: u8,
    pub kind: SpannerKind,
    pub source_part: usize,
    /// Staff the wedge direction referenced, 1-based.
    pub staff: u8,
    /// Voice the direction referenced, if any.
    pub voice: Option<String>,
    pub start_measure: u32,
    pub start_offset: Beats,
}

/// A fully delimited wedge whose endpoint notes are resolved after the
/// whole document has been parsed.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct WedgeIntent {
    pub kind: SpannerKind,
    pub source_part: usize,
    pub staff: u8,
    pub voice: Option<String>,
    pub start_measure: u32,
    pub start_offset: Beats,
    pub end_measure: u32,
    pub end_offset: Beats,
}

/// Mutable state carried through a parse.
pub(crate) struct ParseContext {
    /// MusicXML divisions per quarter note, per the current part.
    pub divisions: i32,
    /// Position within the current measure, in divisions.
    pub cursor: i32,
    /// Current source part (document order).
    pub source_part: usize,
    /// Current measure number.
    pub measure_number: u32,
    next_note_id: u32,
    next_spanner_id: u32,
    /// Completed spanners, in completion order.
    pub spanners: Vec<Spanner>,
    pub pending_slurs: Vec<PendingSlur>,
    pub pending_ties: Vec<PendingTie>,
    pub pending_wedges: Vec<PendingWedge>,
    pub wedge_intents: Vec<WedgeIntent>,
}

impl ParseContext {
    pub fn new() -> Self {
        Self {
            divisions: 1,
            cursor: 0,
            source_part: 0,
            measure_number: 0,
            next_note_id: 0,
            next_spanner_id: 0,
            spanners: Vec::new(),
            pending_slurs: Vec::new(),
            pending_ties: Vec::new(),
            pending_wedges: Vec::new(),
            wedge_intents: Vec::new(),
        }
    }

    /// Allocate a fresh note id.
    pub fn alloc_note_id(&mut self) -> NoteId {
        let id = NoteId::new(self.next_note_id);
        self.next_note_id += 1;
        id
    }

    /// Allocate a fresh spanner id.
    pub fn alloc_spanner_id(&mut self) -> SpannerId {
        let id = SpannerId::new(self.next_spanner_id);
        self.next_spanner_id += 1;
        id
    }

    /// Convert a division count into quarter-note beats.
    pub fn beats_of(&self, divisions: i32) -> Beats {
        beats(divisions, self.divisions.max(1))
    }

    /// The cursor position in beats.
    pub fn cursor_beats(&self) -> Beats {
        self.beats_of(self.cursor)
    }

    // -- slurs ------------------------------------------------------------

    /// Open a slur starting on `note`.
    pub fn start_slur(&mut self, number: u8, voice: &str, note: NoteId) {
        self.pending_slurs.push(PendingSlur {
            number,
            source_part: self.source_part,
            voice: voice.to_string(),
            notes: vec![note],
        });
    }

    /// Record `note` as under every open slur of this part and voice.
    pub fn extend_open_slurs(&mut self, voice: &str, note: NoteId) {
        for slur in self
            .pending_slurs
            .iter_mut()
            .filter(|s| s.source_part == self.source_part && s.voice == voice)
        {
            slur.notes.push(note);
        }
    }

    /// Close the slur with the given number, ending on `note`.
    ///
    /// The stop note is appended if the open-slur extension did not already
    /// record it (cross-voice slurs). Unmatched stops are ignored with a
    /// warning.
    pub fn stop_slur(&mut self, number: u8, note: NoteId) {
        let position = self
            .pending_slurs
            .iter()
            .position(|s| s.source_part == self.source_part && s.number == number);
        let Some(position) = position else {
            warn!(number, "slur stop without matching start; ignoring");
            return;
        };
        let mut slur = self.pending_slurs.remove(position);
        if slur.notes.last() != Some(&note) {
            slur.notes.push(note);
        }
        let id = self.alloc_spanner_id();
        self.spanners
            .push(Spanner::new(id, SpannerKind::Slur, slur.notes));
    }

    // -- ties -------------------------------------------------------------

    /// Open a tie starting on `note`.
    pub fn start_tie(&mut self, voice: &str, pitch: Pitch, note: NoteId) {
        self.pending_ties.push(PendingTie {
            source_part: self.source_part,
            voice: voice.to_string(),
            pitch,
            note,
        });
    }

    /// Close a tie ending on `note`, matching by part, voice, and pitch.
    pub fn stop_tie(&mut self, voice: &str, pitch: Pitch, note: NoteId) {
        let position = self.pending_ties.iter().position(|t| {
            t.source_part == self.source_part && t.voice == voice && t.pitch == pitch
        });
        let Some(position) = position else {
            warn!(%pitch, "tie stop without matching start; ignoring");
            return;
        };
        let start = self.pending_ties.remove(position);
        let id = self.alloc_spanner_id();
        self.spanners
            .push(Spanner::new(id, SpannerKind::Tie, vec![start.note, note]));
    }

    // -- wedges -----------------------------------------------------------

    /// Open a wedge at the current position.
    pub fn start_wedge(
        &mut self,
        number: u8,
        kind: SpannerKind,
        staff: u8,
        voice: Option<String>,
        offset: Beats,
    ) {
        self.pending_wedges.push(PendingWedge {
            number,
            kind,
            source_part: self.source_part,
            staff,
            voice,
            start_measure: self.measure_number,
            start_offset: offset,
        });
    }

    /// Close the wedge with the given number at the current position.
    pub fn stop_wedge(&mut self, number: u8, end_offset: Beats) {
        let position = self
            .pending_wedges
            .iter()
            .position(|w| w.source_part == self.source_part && w.number == number);
        let Some(position) = position else {
            warn!(number, "wedge stop without matching start; ignoring");
            return;
        };
        let wedge = self.pending_wedges.remove(position);
        self.wedge_intents.push(WedgeIntent {
            kind: wedge.kind,
            source_part: wedge.source_part,
            staff: wedge.staff,
            voice: wedge.voice,
            start_measure: wedge.start_measure,
            start_offset: wedge.start_offset,
            end_measure: self.measure_number,
            end_offset,
        });
    }

    /// Warn about anything still pending at end of document.
    pub fn finish(&mut self) {
        for slur in self.pending_slurs.drain(..) {
            warn!(number = slur.number, "slur never stopped; dropping");
        }
        for tie in self.pending_ties.drain(..) {
            warn!(pitch = %tie.pitch, "tie never stopped; dropping");
        }
        for wedge in self.pending_wedges.drain(..) {
            warn!(number = wedge.number, "wedge never stopped; dropping");
        }
    }
}
