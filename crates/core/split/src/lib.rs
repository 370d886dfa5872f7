//! Closed-score SATB splitting pipeline.
//!
//! Transforms one closed-score SATB choral score (two staves, two voices per
//! staff) into four independent single-staff scores, one per vocal part.
//! The pipeline has five stages:
//!
//! 1. [`identify`] - locate S, A, T, B within the input's part/voice grid
//! 2. [`replicate`] - produce four full deep copies of the input
//! 3. [`remove`] - prune each copy to exactly one voice
//! 4. [`simplify`] - collapse each copy to a single staff with clef and
//!    part metadata
//! 5. [`unify`] - redistribute dynamics, lyrics, spanners, and layout/tempo
//!    marks across the four derived scores per choral engraving convention
//!
//! The architecture is copy-and-remove, not extract-and-build: stage 2
//! copies everything, stages 3-4 remove selectively, and anything not
//! explicitly handled is preserved by default.
//!
//! # Example
//!
//! ```
//! use divisi_split::{SplitOptions, split_score};
//!
//! # fn load() -> divisi_model::Score { divisi_model::Score::new() }
//! let input = load();
//! match split_score(&input, &SplitOptions::default()) {
//!     Ok(output) => {
//!         for (name, score) in output.iter() {
//!             println!("{name}: {} measures", score.parts[0].measures.len());
//!         }
//!     }
//!     Err(err) => eprintln!("split failed: {err}"),
//! }
//! ```

pub mod error;
pub mod identify;
pub mod mapping;
pub mod options;
pub mod pipeline;
pub mod remove;
pub mod replicate;
pub mod simplify;
pub mod unify;
pub mod validate;

#[cfg(test)]
mod testutil;

pub use error::SplitError;
pub use identify::identify_voices;
pub use mapping::{VoiceLocation, VoiceMapping, VoiceName};
pub use options::SplitOptions;
pub use pipeline::{SplitOutput, split_score};
