//! Diatonic steps and pitches.

use derive_more::Display;
use serde::{Deserialize, Serialize};

/// The step in the diatonic scale (C-B).
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Step {
    C,
    D,
    E,
    F,
    G,
    A,
    B,
}

impl Step {
    /// Parse a single step letter, case-insensitively.
    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'C' => Some(Self::C),
            'D' => Some(Self::D),
            'E' => Some(Self::E),
            'F' => Some(Self::F),
            'G' => Some(Self::G),
            'A' => Some(Self::A),
            'B' => Some(Self::B),
            _ => None,
        }
    }
}

/// A notated pitch: step, chromatic alteration, octave.
///
/// Octave 4 starts with middle C. `alter` is in semitones (-1 flat, 1 sharp).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pitch {
    pub step: Step,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alter: Option<i8>,
    pub octave: u8,
}

impl Pitch {
    /// Create a natural pitch.
    pub fn new(step: Step, octave: u8) -> Self {
        Self {
            step,
            alter: None,
            octave,
        }
    }

    /// Create a pitch with chromatic alteration.
    pub fn with_alter(step: Step, alter: i8, octave: u8) -> Self {
        Self {
            step,
            alter: Some(alter),
            octave,
        }
    }
}

impl std::fmt::Display for Pitch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.step)?;
        match self.alter.unwrap_or(0) {
            0 => {}
            a if a > 0 => {
                for _ in 0..a {
                    write!(f, "#")?;
                }
            }
            a => {
                for _ in 0..-a {
                    write!(f, "b")?;
                }
            }
        }
        write!(f, "{}", self.octave)
    }
}
