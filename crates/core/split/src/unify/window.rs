//! Time-window candidate selection.
//!
//! Shared by lyric propagation and spanner endpoint location. Earlier
//! iterations matched on exact offset + exact duration and dropped lyrics
//! whenever voices held different rhythmic values under the same word; the
//! half-open window `[start, end)` fixes that.

use divisi_model::{Beats, NoteId, Score};

/// A note or chord selected within a time window.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct WindowCandidate {
    pub voice_index: usize,
    pub event_index: usize,
    pub id: NoteId,
    pub offset: Beats,
    pub duration: Beats,
    pub has_lyric: bool,
}

/// Select exactly one candidate note in `measure_number` of `score` whose
/// offset lies in `[window_start, window_end)`.
///
/// Rests and grace notes are never candidates. With `skip_slur_interior`
/// set, notes strictly in the middle of a slur are ineligible as well
/// (lyrics must not attach to a slur's interior).
///
/// Selection among eligible candidates is total-ordered: longest duration
/// first, then earliest offset, then order of appearance. The result is
/// deterministic for a fixed score.
pub(crate) fn select_in_window(
    score: &Score,
    measure_number: u32,
    window_start: Beats,
    window_end: Beats,
    skip_slur_interior: bool,
) -> Option<WindowCandidate> {
    let part = score.parts.first()?;
    let measure = part.measure(measure_number)?;

    let mut candidates: Vec<WindowCandidate> = Vec::new();
    for (voice_index, voice) in measure.voices.iter().enumerate() {
        for (event_index, event) in voice.events.iter().enumerate() {
            let Some(id) = event.note_id() else { continue };
            if event.is_grace() {
                continue;
            }
            let offset = event.offset();
            if offset < window_start || offset >= window_end {
                continue;
            }
            if skip_slur_interior
                && score
                    .spanners
                    .iter()
                    .any(|s| s.kind == divisi_model::SpannerKind::Slur && s.is_interior(id))
            {
                continue;
            }
            candidates.push(WindowCandidate {
                voice_index,
                event_index,
                id,
                offset,
                duration: event.duration(),
                has_lyric: !event.lyrics().is_empty(),
            });
        }
    }

    candidates.sort_by(|a, b| {
        b.duration
            .cmp(&a.duration)
            .then(a.offset.cmp(&b.offset))
            .then((a.voice_index, a.event_index).cmp(&(b.voice_index, b.event_index)))
    });
    candidates.into_iter().next()
}
