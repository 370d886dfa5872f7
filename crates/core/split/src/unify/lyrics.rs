//! Lyrics unification by deterministic time-window matching.
//!
//! Every note carrying a lyric is a source. For each of the other three
//! derived scores, candidate notes are those in the same measure whose
//! offsets fall inside `[source.offset, source.offset + source.duration)`;
//! grace notes and slur-interior notes are ineligible. Exactly one candidate
//! per target voice is selected (longest duration, then earliest offset,
//! then order of appearance), and it receives the source's lyrics verbatim
//! unless it already carries lyrics of its own.
//!
//! Sources are snapshotted before any insertion, so copied lyrics never
//! become sources themselves and the result is independent of processing
//! order beyond the documented one.

use divisi_model::{Beats, Lyric, Score};
use tracing::debug;

use crate::error::SplitError;
use crate::unify::window::select_in_window;

struct LyricSource {
    score_index: usize,
    measure_number: u32,
    offset: Beats,
    duration: Beats,
    lyrics: Vec<Lyric>,
}

/// Propagate lyrics across the four derived scores.
pub(crate) fn unify_lyrics(scores: &mut [Score; 4]) -> Result<(), SplitError> {
    let mut sources: Vec<LyricSource> = Vec::new();
    for (score_index, score) in scores.iter().enumerate() {
        for measure in &score.parts[0].measures {
            for voice in &measure.voices {
                for event in &voice.events {
                    if event.is_grace() || event.lyrics().is_empty() {
                        continue;
                    }
                    sources.push(LyricSource {
                        score_index,
                        measure_number: measure.number,
                        offset: event.offset(),
                        duration: event.duration(),
                        lyrics: event.lyrics().to_vec(),
                    });
                }
            }
        }
    }

    // Ascending measure, ascending offset; Soprano-before-Bass on ties, so
    // the top voice's text wins a contested target.
    sources.sort_by(|a, b| {
        (a.measure_number, a.offset, a.score_index).cmp(&(
            b.measure_number,
            b.offset,
            b.score_index,
        ))
    });

    let mut copied = 0usize;

    for source in &sources {
        let window_end = source.offset + source.duration;
        for target in 0..4 {
            if target == source.score_index {
                continue;
            }
            let Some(candidate) = select_in_window(
                &scores[target],
                source.measure_number,
                source.offset,
                window_end,
                true,
            ) else {
                continue;
            };
            // Existing lyrics are never overwritten; a candidate that
            // already sings its own text is simply left alone.
            if candidate.has_lyric {
                continue;
            }
            let measure = scores[target].parts[0]
                .measure_mut(source.measure_number)
                .ok_or_else(|| {
                    SplitError::unification(
                        "lyrics",
                        format!("measure {} vanished mid-pass", source.measure_number),
                    )
                })?;
            let event =
                &mut measure.voices[candidate.voice_index].events[candidate.event_index];
            for lyric in &source.lyrics {
                event.push_lyric(lyric.clone());
            }
            copied += 1;
        }
    }

    debug!(sources = sources.len(), copied, "lyrics unification complete");
    Ok(())
}
