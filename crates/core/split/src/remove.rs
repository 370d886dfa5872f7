//! Stage 3: voice removal.
//!
//! Takes one derived score and the location of the voice to *keep*, and
//! prunes every measure down to that voice. Measure-level elements other
//! than voices (signatures, dynamics, tempo, rehearsal and layout marks)
//! stay untouched; the part that does not contain the kept voice is emptied
//! of voice content but retained until simplification.
//!
//! Removal destroys the endpoint notes of spanners belonging to other
//! voices. Dangling spanners are swept immediately afterwards by
//! [`divisi_model::Score::retain_valid_spanners`]; the pipeline logs the
//! count.

use divisi_model::{Rest, Score, TimeSignature, Voice, VoiceEvent};
use tracing::debug;

use crate::error::SplitError;
use crate::mapping::VoiceLocation;

/// Prune `score` so that only the voice at `location` remains.
///
/// In the part at `location.part_index`, every measure keeps exactly the
/// target voice; a measure left without timed content receives a voice with
/// a single whole-measure rest so measure timing is preserved. In all other
/// parts, voice content is cleared.
///
/// Fails if a measure holds voices but not the target one, which means the
/// identifier's invariant was violated between stages.
pub fn retain_voice(score: &mut Score, location: &VoiceLocation) -> Result<(), SplitError> {
    for (part_index, part) in score.parts.iter_mut().enumerate() {
        // Running time signature, for sizing inserted whole-measure rests.
        let mut current_time = TimeSignature::new(4, 4);

        for measure in &mut part.measures {
            if let Some(ts) = measure.time_signature() {
                current_time = ts;
            }

            if part_index != location.part_index {
                measure.voices.clear();
                continue;
            }

            if !measure.voices.is_empty() && measure.voice(&location.voice_id).is_none() {
                let present: Vec<String> =
                    measure.voices.iter().map(|v| v.id.clone()).collect();
                return Err(SplitError::voice_removal(
                    measure.number,
                    format!(
                        "voice \"{}\" not found among {present:?}",
                        location.voice_id
                    ),
                ));
            }

            measure.voices.retain(|v| v.id == location.voice_id);

            if !measure.has_timed_content() {
                let mut voice = Voice::new(location.voice_id.clone());
                voice
                    .events
                    .push(VoiceEvent::Rest(Rest::whole_measure(
                        current_time.measure_beats(),
                    )));
                measure.voices = vec![voice];
            }
        }
    }

    debug!(
        voice = %location.voice_id,
        part = location.part_index,
        "voice removal complete"
    );
    Ok(())
}
