//! Output validation.
//!
//! Optional final pass (on by default) verifying the structural invariants
//! the pipeline promises: one part per output, one voice per measure, note
//! timing preserved byte-identically from the input, and no spanner left
//! referencing a nonexistent note. Violations are reported as processing
//! errors naming the measure.

use divisi_model::{Score, VoiceEvent};

use crate::error::SplitError;
use crate::mapping::{VoiceMapping, VoiceName};

/// Verify the four derived scores against the input.
///
/// `outputs` are in S/A/T/B order, matching [`VoiceName::ALL`].
pub fn validate_outputs(
    input: &Score,
    mapping: &VoiceMapping,
    outputs: &[Score; 4],
) -> Result<(), SplitError> {
    for (index, name) in VoiceName::ALL.into_iter().enumerate() {
        let output = &outputs[index];
        let location = mapping.get(name);

        if output.parts.len() != 1 {
            return Err(SplitError::processing(
                "validate",
                format!("{name} output has {} parts; expected 1", output.parts.len()),
            ));
        }
        let part = &output.parts[0];

        for measure in &part.measures {
            if measure.voices.len() != 1 {
                return Err(SplitError::processing(
                    "validate",
                    format!(
                        "{name} output measure {} has {} voices; expected 1",
                        measure.number,
                        measure.voices.len()
                    ),
                ));
            }
        }

        // Every input note of this voice must survive with identical
        // measure, offset, duration, and pitch content.
        let input_part = &input.parts[location.part_index];
        for input_measure in &input_part.measures {
            let Some(input_voice) = input_measure.voice(&location.voice_id) else {
                continue;
            };
            for event in &input_voice.events {
                let preserved = match event {
                    VoiceEvent::Rest(_) => true,
                    VoiceEvent::Note(_) | VoiceEvent::Chord(_) => part
                        .measure(input_measure.number)
                        .map(|m| &m.voices[0])
                        .is_some_and(|voice| {
                            voice.events.iter().any(|candidate| {
                                events_match(candidate, event)
                            })
                        }),
                };
                if !preserved {
                    return Err(SplitError::processing(
                        "validate",
                        format!(
                            "{name} output lost or moved a note in measure {} at offset {}",
                            input_measure.number,
                            event.offset()
                        ),
                    ));
                }
            }
        }

        let ids = output.note_ids();
        for spanner in &output.spanners {
            if !spanner.notes.iter().all(|n| ids.contains(n)) {
                return Err(SplitError::processing(
                    "validate",
                    format!(
                        "{name} output spanner {} references a missing note",
                        spanner.id
                    ),
                ));
            }
        }
    }
    Ok(())
}

/// Timing and pitch equality, ignoring lyrics (the unifier may add those).
fn events_match(candidate: &VoiceEvent, original: &VoiceEvent) -> bool {
    if candidate.offset() != original.offset() || candidate.duration() != original.duration() {
        return false;
    }
    match (candidate, original) {
        (VoiceEvent::Note(a), VoiceEvent::Note(b)) => a.id == b.id && a.pitch == b.pitch,
        (VoiceEvent::Chord(a), VoiceEvent::Chord(b)) => a.id == b.id && a.pitches == b.pitches,
        _ => false,
    }
}
