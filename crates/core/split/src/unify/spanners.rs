//! Spanner unification.
//!
//! Slurs, ties, and wedges whose endpoints live in one voice stay in that
//! voice; the only cross-score copying is for system-wide wedges:
//!
//! - a Crescendo/Diminuendo present in Soprano with no same-kind wedge at an
//!   overlapping time range in any other voice is copied to Alto, Tenor,
//!   and Bass;
//! - identical wedges in Soprano *and* Bass (same kind, same range), with
//!   Alto and Tenor free, are copied to Alto and Tenor.
//!
//! Copies locate their endpoints by the same time-window selection lyrics
//! use (without the slur-interior filter; a wedge may end under a slur).
//! A copy with no locatable endpoint is skipped, never fatal. Ties are
//! never created and never touched. A reference-repair sweep runs at the
//! end: spanners with an endpoint that resolves to no note are dropped.

use divisi_model::{Beats, Score, Spanner, SpannerKind};
use tracing::{debug, warn};

use crate::error::SplitError;
use crate::unify::window::select_in_window;

/// A wedge's extent, resolved from its endpoint notes.
#[derive(Debug, Clone, PartialEq)]
struct WedgeSpan {
    kind: SpannerKind,
    /// (measure, offset) of the first endpoint note.
    start: (u32, Beats),
    /// End of the first endpoint's time window.
    start_window_end: Beats,
    /// (measure, offset) of the last endpoint note.
    end: (u32, Beats),
    /// End of the last endpoint's time window; also the end of the wedge's
    /// sounding range.
    end_window_end: Beats,
}

impl WedgeSpan {
    fn range_end(&self) -> (u32, Beats) {
        (self.end.0, self.end_window_end)
    }

    fn overlaps(&self, other: &WedgeSpan) -> bool {
        self.start < other.range_end() && other.start < self.range_end()
    }

    fn same_range(&self, other: &WedgeSpan) -> bool {
        self.start == other.start && self.end == other.end
    }
}

fn kind_rank(kind: SpannerKind) -> u8 {
    match kind {
        SpannerKind::Crescendo => 0,
        SpannerKind::Diminuendo => 1,
        _ => 2,
    }
}

fn collect_wedges(score: &Score) -> Vec<WedgeSpan> {
    let mut spans: Vec<WedgeSpan> = score
        .spanners
        .iter()
        .filter(|s| s.kind.is_wedge())
        .filter_map(|s| {
            let first = score.locate_note(s.first()?)?;
            let last = score.locate_note(s.last()?)?;
            Some(WedgeSpan {
                kind: s.kind,
                start: (first.measure_number, first.offset),
                start_window_end: first.offset + first.duration,
                end: (last.measure_number, last.offset),
                end_window_end: last.offset + last.duration,
            })
        })
        .collect();
    spans.sort_by(|a, b| {
        (a.start, a.end, kind_rank(a.kind)).cmp(&(b.start, b.end, kind_rank(b.kind)))
    });
    spans
}

fn has_overlap(existing: &[WedgeSpan], added: &[WedgeSpan], wedge: &WedgeSpan) -> bool {
    existing
        .iter()
        .chain(added.iter())
        .any(|w| w.kind == wedge.kind && w.overlaps(wedge))
}

/// Copy system-wide wedges and repair spanner references.
pub(crate) fn unify_spanners(scores: &mut [Score; 4]) -> Result<(), SplitError> {
    let spans: [Vec<WedgeSpan>; 4] = std::array::from_fn(|i| collect_wedges(&scores[i]));
    let mut added: [Vec<WedgeSpan>; 4] = Default::default();
    let mut copied = 0usize;

    let soprano_wedges = spans[0].clone();
    for wedge in &soprano_wedges {
        let covered: [bool; 4] =
            std::array::from_fn(|i| has_overlap(&spans[i], &added[i], wedge));

        let targets: &[usize] = if !covered[1] && !covered[2] && !covered[3] {
            &[1, 2, 3]
        } else if !covered[1]
            && !covered[2]
            && spans[3]
                .iter()
                .any(|w| w.kind == wedge.kind && w.same_range(wedge))
        {
            &[1, 2]
        } else {
            &[]
        };

        for &target in targets {
            let start = select_in_window(
                &scores[target],
                wedge.start.0,
                wedge.start.1,
                wedge.start_window_end,
                false,
            );
            let end = select_in_window(
                &scores[target],
                wedge.end.0,
                wedge.end.1,
                wedge.end_window_end,
                false,
            );
            let (Some(start), Some(end)) = (start, end) else {
                warn!(
                    kind = %wedge.kind,
                    measure = wedge.start.0,
                    target,
                    "no endpoint note for wedge copy; skipping"
                );
                continue;
            };
            if start.id == end.id {
                warn!(
                    kind = %wedge.kind,
                    measure = wedge.start.0,
                    target,
                    "wedge copy would collapse to a single note; skipping"
                );
                continue;
            }
            let id = scores[target].next_spanner_id();
            scores[target]
                .spanners
                .push(Spanner::new(id, wedge.kind, vec![start.id, end.id]));
            added[target].push(WedgeSpan {
                kind: wedge.kind,
                start: (wedge.start.0, start.offset),
                start_window_end: start.offset + start.duration,
                end: (wedge.end.0, end.offset),
                end_window_end: end.offset + end.duration,
            });
            copied += 1;
        }
    }

    for score in scores.iter_mut() {
        let removed = score.retain_valid_spanners();
        if removed > 0 {
            warn!(removed, "dropped spanners with unresolved endpoints");
        }
    }

    debug!(copied, "spanner unification complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::derived_score;
    use divisi_model::{NoteId, beats};

    /// Two measures of four quarters each, per voice.
    fn quarters(voice: &str, base: u32) -> Score {
        let m: Vec<(Beats, Beats, &str)> = (0..4)
            .map(|i| (beats(i, 1), beats(1, 1), "C4"))
            .collect();
        derived_score(voice, base, &[&m, &m])
    }

    fn add_wedge(score: &mut Score, kind: SpannerKind, from: NoteId, to: NoteId) {
        let id = score.next_spanner_id();
        score.spanners.push(Spanner::new(id, kind, vec![from, to]));
    }

    fn kind_count(score: &Score, kind: SpannerKind) -> usize {
        score.spanners.iter().filter(|s| s.kind == kind).count()
    }

    #[test]
    fn soprano_crescendo_propagates_to_all() {
        let mut scores = [
            quarters("1", 0),
            quarters("2", 100),
            quarters("5", 200),
            quarters("6", 300),
        ];
        // Measure 2 beat 1 through measure 2 beat 3 (ids 4..8 are measure 2).
        add_wedge(
            &mut scores[0],
            SpannerKind::Crescendo,
            NoteId::new(4),
            NoteId::new(6),
        );

        unify_spanners(&mut scores).unwrap();

        for (i, score) in scores.iter().enumerate() {
            assert_eq!(kind_count(score, SpannerKind::Crescendo), 1, "score {i}");
            let wedge = score
                .spanners
                .iter()
                .find(|s| s.kind == SpannerKind::Crescendo)
                .unwrap();
            let start = score.locate_note(wedge.first().unwrap()).unwrap();
            let end = score.locate_note(wedge.last().unwrap()).unwrap();
            assert_eq!((start.measure_number, start.offset), (2, beats(0, 1)));
            assert_eq!((end.measure_number, end.offset), (2, beats(2, 1)));
        }
    }

    #[test]
    fn soprano_and_bass_pair_fills_inner_voices_once() {
        let mut scores = [
            quarters("1", 0),
            quarters("2", 100),
            quarters("5", 200),
            quarters("6", 300),
        ];
        add_wedge(
            &mut scores[0],
            SpannerKind::Diminuendo,
            NoteId::new(0),
            NoteId::new(2),
        );
        add_wedge(
            &mut scores[3],
            SpannerKind::Diminuendo,
            NoteId::new(300),
            NoteId::new(302),
        );

        unify_spanners(&mut scores).unwrap();

        for score in &scores {
            assert_eq!(kind_count(score, SpannerKind::Diminuendo), 1);
        }
    }

    #[test]
    fn overlapping_wedge_elsewhere_blocks_copying() {
        let mut scores = [
            quarters("1", 0),
            quarters("2", 100),
            quarters("5", 200),
            quarters("6", 300),
        ];
        add_wedge(
            &mut scores[0],
            SpannerKind::Crescendo,
            NoteId::new(0),
            NoteId::new(3),
        );
        // Tenor has its own crescendo over beats 2-4 of measure 1.
        add_wedge(
            &mut scores[2],
            SpannerKind::Crescendo,
            NoteId::new(201),
            NoteId::new(203),
        );

        unify_spanners(&mut scores).unwrap();

        assert_eq!(kind_count(&scores[0], SpannerKind::Crescendo), 1);
        assert_eq!(kind_count(&scores[1], SpannerKind::Crescendo), 0);
        assert_eq!(kind_count(&scores[2], SpannerKind::Crescendo), 1);
        assert_eq!(kind_count(&scores[3], SpannerKind::Crescendo), 0);
    }

    #[test]
    fn different_kind_does_not_block() {
        let mut scores = [
            quarters("1", 0),
            quarters("2", 100),
            quarters("5", 200),
            quarters("6", 300),
        ];
        add_wedge(
            &mut scores[0],
            SpannerKind::Crescendo,
            NoteId::new(0),
            NoteId::new(2),
        );
        add_wedge(
            &mut scores[2],
            SpannerKind::Diminuendo,
            NoteId::new(200),
            NoteId::new(202),
        );

        unify_spanners(&mut scores).unwrap();

        for score in &scores {
            assert_eq!(kind_count(score, SpannerKind::Crescendo), 1);
        }
    }

    #[test]
    fn slurs_and_ties_are_left_alone() {
        let mut scores = [
            quarters("1", 0),
            quarters("2", 100),
            quarters("5", 200),
            quarters("6", 300),
        ];
        add_wedge(&mut scores[0], SpannerKind::Crescendo, NoteId::new(0), NoteId::new(2));
        let id = scores[0].next_spanner_id();
        scores[0].spanners.push(Spanner::new(
            id,
            SpannerKind::Slur,
            vec![NoteId::new(0), NoteId::new(1)],
        ));
        let id = scores[0].next_spanner_id();
        scores[0].spanners.push(Spanner::new(
            id,
            SpannerKind::Tie,
            vec![NoteId::new(3), NoteId::new(4)],
        ));

        unify_spanners(&mut scores).unwrap();

        assert_eq!(kind_count(&scores[0], SpannerKind::Slur), 1);
        assert_eq!(kind_count(&scores[0], SpannerKind::Tie), 1);
        assert_eq!(kind_count(&scores[1], SpannerKind::Slur), 0);
        assert_eq!(kind_count(&scores[1], SpannerKind::Tie), 0);
    }

    #[test]
    fn orphaned_spanners_are_swept() {
        let mut scores = [
            quarters("1", 0),
            quarters("2", 100),
            quarters("5", 200),
            quarters("6", 300),
        ];
        let id = scores[1].next_spanner_id();
        scores[1].spanners.push(Spanner::new(
            id,
            SpannerKind::Slur,
            vec![NoteId::new(100), NoteId::new(999)],
        ));

        unify_spanners(&mut scores).unwrap();

        assert!(scores[1].spanners.is_empty());
    }
}
