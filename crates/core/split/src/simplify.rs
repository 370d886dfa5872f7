//! Stage 4: staff simplification.
//!
//! Collapses a voice-pruned score down to a single part with the clef and
//! metadata of its vocal part. Layout marks are deliberately left in place;
//! stage 5 unifies them across the four outputs.

use divisi_model::Score;
use tracing::debug;

use crate::error::SplitError;
use crate::mapping::{VoiceLocation, VoiceName};

/// Reduce `score` to the single part holding the kept voice and label it.
///
/// - The part at `location.part_index` is kept; all others are discarded.
/// - The part receives the vocal part's name and expected clef. The clef is
///   set through the part's clef property; measure elements are untouched.
/// - Work and movement title both become `<title> (<VoiceName>)`, where
///   `<title>` is the original work title or, when unset, the base name of
///   the input file recorded by the loader. Intermediate conversion
///   filenames never reach here.
pub fn simplify_staff(
    score: &mut Score,
    name: VoiceName,
    location: &VoiceLocation,
) -> Result<(), SplitError> {
    if location.part_index >= score.parts.len() {
        return Err(SplitError::processing(
            "simplify",
            format!(
                "part index {} out of range ({} parts)",
                location.part_index,
                score.parts.len()
            ),
        ));
    }

    let mut parts = std::mem::take(&mut score.parts);
    let mut part = parts.swap_remove(location.part_index);
    part.name = Some(name.to_string());
    part.clef = Some(location.expected_clef);
    score.parts = vec![part];

    let base = score
        .metadata
        .title_or_basename()
        .unwrap_or("Untitled")
        .to_string();
    let title = format!("{base} ({name})");
    score.metadata.work_title = Some(title.clone());
    score.metadata.movement_title = Some(title);

    debug!(part = %name, "staff simplification complete");
    Ok(())
}
