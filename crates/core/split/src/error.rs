//! Error types for the splitting pipeline.
//!
//! All errors are fatal: the pipeline terminates without producing partial
//! outputs. Each variant carries enough context to name the stage that fired
//! and, where applicable, the offending measure.

use thiserror::Error;

/// Errors that can occur while splitting a closed score.
#[derive(Debug, Error)]
pub enum SplitError {
    /// The input does not conform to the expected closed-score shape.
    #[error("invalid score: {0}")]
    InvalidScore(String),

    /// The voice identifier could not produce a voice mapping.
    #[error("voice detection failed: expected {expected}, found {actual}")]
    VoiceDetection {
        /// The structure the canonical mapping requires.
        expected: String,
        /// What the input actually contains.
        actual: String,
    },

    /// Voice removal encountered an unexpected structural condition.
    #[error("voice removal failed in measure {measure}: {message}")]
    VoiceRemoval {
        /// Measure number where the condition was observed.
        measure: u32,
        /// Description of the condition.
        message: String,
    },

    /// A unification policy hit a contract violation.
    #[error("{policy} unification failed: {message}")]
    Unification {
        /// Which sub-policy fired (dynamics, lyrics, spanners, layout).
        policy: &'static str,
        /// Description of the violation.
        message: String,
    },

    /// Catch-all for unforeseen structural problems.
    #[error("processing failed at stage {stage}: {message}")]
    Processing {
        /// Pipeline stage name.
        stage: &'static str,
        /// Description of the problem.
        message: String,
    },
}

impl SplitError {
    /// Create an invalid-score error.
    pub fn invalid_score(message: impl Into<String>) -> Self {
        Self::InvalidScore(message.into())
    }

    /// Create a voice-detection error with an expected-vs-actual description.
    pub fn voice_detection(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::VoiceDetection {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create a voice-removal error at a measure.
    pub fn voice_removal(measure: u32, message: impl Into<String>) -> Self {
        Self::VoiceRemoval {
            measure,
            message: message.into(),
        }
    }

    /// Create a unification error for a sub-policy.
    pub fn unification(policy: &'static str, message: impl Into<String>) -> Self {
        Self::Unification {
            policy,
            message: message.into(),
        }
    }

    /// Create a generic processing error for a stage.
    pub fn processing(stage: &'static str, message: impl Into<String>) -> Self {
        Self::Processing {
            stage,
            message: message.into(),
        }
    }
}

/// Result type alias for split operations.
pub type SplitResult<T> = Result<T, SplitError>;
