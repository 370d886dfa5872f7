//! Stage 1: voice identification.
//!
//! The identifier applies the canonical closed-score mapping directly and
//! verifies the input actually has that shape. There is no heuristic
//! fallback and no confidence score: empirical fallbacks have a history of
//! silently masking upstream export bugs, so any deviation is fatal.

use std::collections::BTreeSet;

use divisi_model::Score;

use crate::error::SplitError;
use crate::mapping::VoiceMapping;

/// Locate the four SATB voices within the input score.
///
/// Requirements checked, in order:
/// 1. The score is non-empty (has at least one measure with timed content).
/// 2. The score has exactly two parts.
/// 3. No voice id occurs in both parts.
/// 4. Part 0 carries voices "1" and "2", and part 1 carries voices "5" and
///    "6", in every measure that has timed content.
///
/// Returns the canonical [`VoiceMapping`] on success.
pub fn identify_voices(score: &Score) -> Result<VoiceMapping, SplitError> {
    if score.parts.is_empty() || score.events().next().is_none() {
        return Err(SplitError::invalid_score(
            "score contains no parts or no timed content",
        ));
    }

    if score.parts.len() != 2 {
        return Err(SplitError::voice_detection(
            "exactly 2 parts (closed-score SATB)",
            format!("{} part(s)", score.parts.len()),
        ));
    }

    let ids_per_part: Vec<BTreeSet<&str>> = score
        .parts
        .iter()
        .map(|part| {
            part.measures
                .iter()
                .flat_map(|m| m.voices.iter())
                .map(|v| v.id.as_str())
                .collect()
        })
        .collect();

    let shared: Vec<&str> = ids_per_part[0]
        .intersection(&ids_per_part[1])
        .copied()
        .collect();
    if !shared.is_empty() {
        return Err(SplitError::voice_detection(
            "distinct voice ids per part",
            format!("id(s) {shared:?} present in both parts"),
        ));
    }

    let mapping = VoiceMapping::canonical();

    for (name, location) in mapping.iter() {
        let part = &score.parts[location.part_index];
        for measure in &part.measures {
            if !measure.has_timed_content() {
                continue;
            }
            if measure.voice(&location.voice_id).is_none() {
                let present: Vec<&str> = measure.voices.iter().map(|v| v.id.as_str()).collect();
                return Err(SplitError::voice_detection(
                    format!(
                        "voice \"{}\" ({name}) in part {} of every non-empty measure",
                        location.voice_id, location.part_index
                    ),
                    format!(
                        "measure {} contains voice(s) {present:?}",
                        measure.number
                    ),
                ));
            }
        }
    }

    Ok(mapping)
}
