//! Pipeline orchestration.
//!
//! One input score in, four finalized scores out. The stages run strictly
//! in sequence: identify → replicate → (remove, repair, simplify) per voice
//! → unify → validate. All state flows through arguments and return values.

use divisi_model::Score;
use tracing::debug;

use crate::error::SplitError;
use crate::identify::identify_voices;
use crate::mapping::VoiceName;
use crate::options::SplitOptions;
use crate::remove::retain_voice;
use crate::replicate::replicate;
use crate::simplify::simplify_staff;
use crate::unify::unify;
use crate::validate::validate_outputs;

/// The four finalized single-part scores, in S/A/T/B order.
#[derive(Debug, Clone)]
pub struct SplitOutput {
    scores: [Score; 4],
}

impl SplitOutput {
    fn new(scores: [Score; 4]) -> Self {
        Self { scores }
    }

    /// The finalized score for one vocal part.
    pub fn get(&self, name: VoiceName) -> &Score {
        let index = VoiceName::ALL
            .iter()
            .position(|n| *n == name)
            .expect("name in ALL");
        &self.scores[index]
    }

    /// Iterate `(name, score)` pairs in score order.
    pub fn iter(&self) -> impl Iterator<Item = (VoiceName, &Score)> {
        VoiceName::ALL.into_iter().zip(self.scores.iter())
    }

    /// Consume into the underlying array, in S/A/T/B order.
    pub fn into_array(self) -> [Score; 4] {
        self.scores
    }
}

/// Split a closed-score SATB input into four single-staff part scores.
///
/// This is the library's main entry point. The input is never mutated; on
/// error no output is produced at all.
pub fn split_score(input: &Score, options: &SplitOptions) -> Result<SplitOutput, SplitError> {
    let mapping = identify_voices(input)?;
    debug!("voice mapping identified");

    let mut derived = replicate(input);

    for (index, (name, location)) in mapping.iter().enumerate() {
        let score = &mut derived[index];
        retain_voice(score, location)?;
        let removed = score.retain_valid_spanners();
        if removed > 0 {
            debug!(part = %name, removed, "dropped dangling spanners after voice removal");
        }
        simplify_staff(score, name, location)?;
    }

    unify(&mut derived, options)?;

    if options.validate_output {
        validate_outputs(input, &mapping, &derived)?;
    }

    Ok(SplitOutput::new(derived))
}
