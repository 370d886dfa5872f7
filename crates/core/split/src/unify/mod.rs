//! Stage 5: contextual unification.
//!
//! After voice removal each derived score carries only its own voice's notes
//! plus whatever measure-level and spanner elements happened to ride along.
//! Closed-score engraving places system-wide markings on one voice
//! (typically Soprano), so the four outputs must be reconciled to look like
//! freestanding, correctly-marked parts.
//!
//! Four sub-policies run in a fixed order — dynamics, lyrics, spanners,
//! layout/tempo — because later policies read the state left by earlier
//! ones. The unifier may add elements (dynamics at an offset, lyrics on an
//! existing note, spanner copies, layout marks) but never moves or removes
//! a preexisting timed element.

mod dynamics;
mod layout;
mod lyrics;
mod spanners;
mod window;

use divisi_model::Score;

use crate::error::SplitError;
use crate::options::SplitOptions;

/// Apply the unification sub-policies to the four derived scores, in S/A/T/B
/// order, honoring the per-policy switches in `options`.
pub fn unify(scores: &mut [Score; 4], options: &SplitOptions) -> Result<(), SplitError> {
    for (index, score) in scores.iter().enumerate() {
        if score.parts.len() != 1 {
            return Err(SplitError::processing(
                "unify",
                format!(
                    "derived score {index} has {} parts; expected exactly 1 after simplification",
                    score.parts.len()
                ),
            ));
        }
    }

    if options.apply_dynamics_unification {
        dynamics::unify_dynamics(scores)?;
    }
    if options.apply_lyrics_unification {
        lyrics::unify_lyrics(scores)?;
    }
    if options.apply_spanner_unification {
        spanners::unify_spanners(scores)?;
    }
    if options.apply_layout_unification {
        layout::unify_layout(scores)?;
    }
    Ok(())
}
