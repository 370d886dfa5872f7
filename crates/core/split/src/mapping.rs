//! Voice names, locations, and the canonical closed-score mapping.

use derive_more::Display;
use divisi_model::Clef;
use serde::{Deserialize, Serialize};

/// One of the four vocal parts.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoiceName {
    Soprano,
    Alto,
    Tenor,
    Bass,
}

impl VoiceName {
    /// The four parts in score order, top to bottom.
    pub const ALL: [VoiceName; 4] = [Self::Soprano, Self::Alto, Self::Tenor, Self::Bass];

    /// The clef this part receives on its own staff.
    ///
    /// Tenor gets treble-8vb (written an octave above sounding), the modern
    /// SATB engraving convention.
    pub fn expected_clef(self) -> Clef {
        match self {
            Self::Soprano | Self::Alto => Clef::Treble,
            Self::Tenor => Clef::TrebleDown8,
            Self::Bass => Clef::Bass,
        }
    }
}

/// Where one vocal part lives within the input score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceLocation {
    /// Index of the part (staff) in the input score.
    pub part_index: usize,
    /// Voice id within that part.
    pub voice_id: String,
    /// The clef the derived score will carry.
    pub expected_clef: Clef,
}

impl VoiceLocation {
    pub fn new(part_index: usize, voice_id: impl Into<String>, expected_clef: Clef) -> Self {
        Self {
            part_index,
            voice_id: voice_id.into(),
            expected_clef,
        }
    }
}

/// The four voice locations of a closed-score SATB input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceMapping {
    pub soprano: VoiceLocation,
    pub alto: VoiceLocation,
    pub tenor: VoiceLocation,
    pub bass: VoiceLocation,
}

impl VoiceMapping {
    /// The canonical mapping for closed-score SATB sources.
    ///
    /// Voice ids "5"/"6" on the second staff are an empirical fact about the
    /// MusicXML exporter this tool targets; a different upstream exporter
    /// would need different constants.
    pub fn canonical() -> Self {
        Self {
            soprano: VoiceLocation::new(0, "1", VoiceName::Soprano.expected_clef()),
            alto: VoiceLocation::new(0, "2", VoiceName::Alto.expected_clef()),
            tenor: VoiceLocation::new(1, "5", VoiceName::Tenor.expected_clef()),
            bass: VoiceLocation::new(1, "6", VoiceName::Bass.expected_clef()),
        }
    }

    /// Look up a location by voice name.
    pub fn get(&self, name: VoiceName) -> &VoiceLocation {
        match name {
            VoiceName::Soprano => &self.soprano,
            VoiceName::Alto => &self.alto,
            VoiceName::Tenor => &self.tenor,
            VoiceName::Bass => &self.bass,
        }
    }

    /// Iterate the four locations in score order (S, A, T, B).
    pub fn iter(&self) -> impl Iterator<Item = (VoiceName, &VoiceLocation)> {
        VoiceName::ALL.into_iter().map(|name| (name, self.get(name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_mapping_constants() {
        let m = VoiceMapping::canonical();
        assert_eq!(m.soprano.part_index, 0);
        assert_eq!(m.soprano.voice_id, "1");
        assert_eq!(m.alto.voice_id, "2");
        assert_eq!(m.tenor.part_index, 1);
        assert_eq!(m.tenor.voice_id, "5");
        assert_eq!(m.bass.voice_id, "6");
    }

    #[test]
    fn clef_assignment_convention() {
        assert_eq!(VoiceName::Soprano.expected_clef(), Clef::Treble);
        assert_eq!(VoiceName::Alto.expected_clef(), Clef::Treble);
        assert_eq!(VoiceName::Tenor.expected_clef(), Clef::TrebleDown8);
        assert_eq!(VoiceName::Bass.expected_clef(), Clef::Bass);
    }

    #[test]
    fn iteration_is_in_score_order() {
        let m = VoiceMapping::canonical();
        let names: Vec<VoiceName> = m.iter().map(|(n, _)| n).collect();
        assert_eq!(names, VoiceName::ALL);
    }

    #[test]
    fn voice_name_display() {
        assert_eq!(VoiceName::Soprano.to_string(), "Soprano");
        assert_eq!(VoiceName::Bass.to_string(), "Bass");
    }
}
