//! Pipeline configuration.

use serde::{Deserialize, Serialize};

/// Options controlling which unification policies run and whether the
/// outputs are validated.
///
/// Every field defaults to `true`; a default `SplitOptions` runs the full
/// pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitOptions {
    /// Redistribute dynamic marks across the four derived scores.
    pub apply_dynamics_unification: bool,
    /// Propagate lyrics by time-window matching.
    pub apply_lyrics_unification: bool,
    /// Copy system-wide wedges and repair spanner references.
    pub apply_spanner_unification: bool,
    /// Propagate system/page breaks, tempo, and rehearsal marks.
    pub apply_layout_unification: bool,
    /// Verify structural invariants on the outputs after unification.
    pub validate_output: bool,
}

impl Default for SplitOptions {
    fn default() -> Self {
        Self {
            apply_dynamics_unification: true,
            apply_lyrics_unification: true,
            apply_spanner_unification: true,
            apply_layout_unification: true,
            validate_output: true,
        }
    }
}
