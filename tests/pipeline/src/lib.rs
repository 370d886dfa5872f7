//! Fixture builders for the end-to-end pipeline tests.
//!
//! [`ClosedScoreBuilder`] assembles canonical closed-score SATB inputs: two
//! parts, voices "1"/"2" on part 0 and "5"/"6" on part 1, 4/4 throughout.

use divisi_model::{
    Beats, Clef, Dynamic, KeySignature, Lyric, Measure, MeasureElement, Note, NoteId, Part,
    Pitch, Rest, Score, Spanner, SpannerKind, Step, Syllabic, TimeSignature, Voice, VoiceEvent,
};

/// The four canonical voice ids, top to bottom.
pub const VOICE_IDS: [&str; 4] = ["1", "2", "5", "6"];

/// Parse a compact pitch spelling like `"C4"`, `"F#3"`, `"Eb2"`.
pub fn pitch(spelling: &str) -> Pitch {
    let mut chars = spelling.chars();
    let step = Step::from_char(chars.next().expect("pitch step")).expect("valid step");
    let rest: String = chars.collect();
    let (alter, octave) = match rest.strip_prefix('#') {
        Some(o) => (Some(1), o),
        None => match rest.strip_prefix('b') {
            Some(o) => (Some(-1), o),
            None => (None, rest.as_str()),
        },
    };
    Pitch {
        step,
        alter,
        octave: octave.parse().expect("octave digit"),
    }
}

/// Which part a canonical voice id lives in.
pub fn part_of_voice(voice_id: &str) -> usize {
    match voice_id {
        "1" | "2" => 0,
        _ => 1,
    }
}

/// Builder for canonical closed-score SATB inputs.
pub struct ClosedScoreBuilder {
    score: Score,
    next_note: u32,
}

impl ClosedScoreBuilder {
    /// An empty closed score with `measures` measures in 4/4. Every measure
    /// contains all four voices (empty until notes are added).
    pub fn new(measures: u32) -> Self {
        let mut score = Score::new();
        score.metadata.work_title = Some("Abendlied".to_string());

        for (part_index, clef) in [(0usize, Clef::Treble), (1usize, Clef::Bass)] {
            let mut part = Part::new();
            part.id = Some(format!("P{}", part_index + 1));
            part.clef = Some(clef);
            for number in 1..=measures {
                let mut measure = Measure::new(number);
                if number == 1 {
                    measure
                        .elements
                        .push(MeasureElement::Time(TimeSignature::new(4, 4)));
                    measure
                        .elements
                        .push(MeasureElement::Key(KeySignature { fifths: 0 }));
                }
                for voice_id in VOICE_IDS
                    .iter()
                    .filter(|id| part_of_voice(id) == part_index)
                {
                    measure.voices.push(Voice::new(*voice_id));
                }
                part.measures.push(measure);
            }
            score.parts.push(part);
        }

        Self {
            score,
            next_note: 0,
        }
    }

    fn voice_mut(&mut self, voice_id: &str, measure: u32) -> &mut Voice {
        let part = part_of_voice(voice_id);
        self.score.parts[part]
            .measure_mut(measure)
            .expect("measure exists")
            .voice_mut(voice_id)
            .expect("voice exists")
    }

    /// Add a note and return its id.
    pub fn note(
        &mut self,
        voice_id: &str,
        measure: u32,
        offset: Beats,
        duration: Beats,
        spelling: &str,
    ) -> NoteId {
        let id = NoteId::new(self.next_note);
        self.next_note += 1;
        let note = Note::new(id, pitch(spelling), offset, duration);
        self.voice_mut(voice_id, measure)
            .events
            .push(VoiceEvent::Note(note));
        id
    }

    /// Add a rest.
    pub fn rest(&mut self, voice_id: &str, measure: u32, offset: Beats, duration: Beats) {
        self.voice_mut(voice_id, measure)
            .events
            .push(VoiceEvent::Rest(Rest::new(offset, duration)));
    }

    /// Fill measures `from..=to` of every voice with a whole note.
    pub fn fill_whole_notes(&mut self, from: u32, to: u32) {
        for measure in from..=to {
            for (voice_id, spelling) in
                [("1", "G4"), ("2", "E4"), ("5", "C4"), ("6", "C3")]
            {
                self.note(
                    voice_id,
                    measure,
                    divisi_model::beats(0, 1),
                    divisi_model::beats(4, 1),
                    spelling,
                );
            }
        }
    }

    /// Attach a lyric to a previously added note.
    pub fn lyric(&mut self, id: NoteId, text: &str, syllabic: Syllabic) {
        for part in &mut self.score.parts {
            for measure in &mut part.measures {
                for voice in &mut measure.voices {
                    for event in &mut voice.events {
                        if event.note_id() == Some(id) {
                            event.push_lyric(Lyric::new(text, syllabic));
                            return;
                        }
                    }
                }
            }
        }
        panic!("note {id} not found");
    }

    /// Add a dynamic mark to one part's measure.
    pub fn dynamic(&mut self, part: usize, measure: u32, offset: Beats, value: &str) {
        self.score.parts[part]
            .measure_mut(measure)
            .expect("measure exists")
            .elements
            .push(MeasureElement::Dynamic(Dynamic::new(value, offset)));
    }

    /// Add a spanner over the given notes.
    pub fn spanner(&mut self, kind: SpannerKind, notes: Vec<NoteId>) {
        let id = self.score.next_spanner_id();
        self.score.spanners.push(Spanner::new(id, kind, notes));
    }

    /// Id of the `index`-th note (rests skipped) in a voice's measure.
    pub fn note_id_of(&self, voice_id: &str, measure: u32, index: usize) -> NoteId {
        let part = part_of_voice(voice_id);
        self.score.parts[part]
            .measure(measure)
            .expect("measure exists")
            .voice(voice_id)
            .expect("voice exists")
            .events
            .iter()
            .filter_map(|e| e.note_id())
            .nth(index)
            .expect("note exists")
    }

    /// Add a measure-level element to one part's measure.
    pub fn element(&mut self, part: usize, measure: u32, element: MeasureElement) {
        self.score.parts[part]
            .measure_mut(measure)
            .expect("measure exists")
            .elements
            .push(element);
    }

    pub fn build(self) -> Score {
        self.score
    }
}
