//! Shared fixtures for the stage tests.

use divisi_model::{
    Beats, Clef, KeySignature, Measure, MeasureElement, Note, NoteId, Part, Pitch, Score, Step,
    TimeSignature, Voice, VoiceEvent, beats,
};

/// Parse a compact pitch spelling like `"C4"`, `"F#3"`, `"Eb2"`.
pub(crate) fn pitch(s: &str) -> Pitch {
    let mut chars = s.chars();
    let step = Step::from_char(chars.next().expect("pitch step")).expect("valid step");
    let rest: String = chars.collect();
    let (alter, octave_str) = match rest.strip_prefix('#') {
        Some(o) => (Some(1), o),
        None => match rest.strip_prefix('b') {
            Some(o) => (Some(-1), o),
            None => (None, rest.as_str()),
        },
    };
    let octave: u8 = octave_str.parse().expect("octave digit");
    Pitch {
        step,
        alter,
        octave,
    }
}

/// A standalone note event with the next free id in `score`.
///
/// Does not insert the event; callers must insert it before allocating again.
pub(crate) fn note_on(score: &mut Score, offset: Beats, duration: Beats, spelling: &str) -> VoiceEvent {
    let id = score.next_note_id();
    VoiceEvent::Note(Note::new(id, pitch(spelling), offset, duration))
}

/// Canonical closed-score SATB fixture: two parts, voices "1"/"2" on part 0
/// and "5"/"6" on part 1, one whole note per voice per measure, 4/4.
pub(crate) fn closed_score(measures: u32) -> Score {
    let mut score = Score::new();
    score.metadata.work_title = Some("Abendlied".to_string());

    let spellings = [("1", "G4"), ("2", "E4"), ("5", "C4"), ("6", "C3")];
    let mut next_id = 0u32;

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
            for (voice_id, spelling) in spellings
                .iter()
                .filter(|(id, _)| part_of(id) == part_index)
            {
                let mut voice = Voice::new(*voice_id);
                voice.events.push(VoiceEvent::Note(Note::new(
                    NoteId::new(next_id),
                    pitch(spelling),
                    beats(0, 1),
                    beats(4, 1),
                )));
                next_id += 1;
                measure.voices.push(voice);
            }
            part.measures.push(measure);
        }
        score.parts.push(part);
    }

    score
}

fn part_of(voice_id: &str) -> usize {
    match voice_id {
        "1" | "2" => 0,
        _ => 1,
    }
}

/// A single-part, single-voice score as produced by stages 3-4: one voice
/// `voice_id` per measure, events supplied per measure as
/// `(offset, duration, spelling)` triples. Ids are `id_base`, `id_base+1`, ….
pub(crate) fn derived_score(
    voice_id: &str,
    id_base: u32,
    measures: &[&[(Beats, Beats, &str)]],
) -> Score {
    let mut score = Score::new();
    let mut part = Part::new();
    part.name = Some("Voice".to_string());
    part.clef = Some(Clef::Treble);
    let mut next_id = id_base;
    for (i, events) in measures.iter().enumerate() {
        let mut measure = Measure::new(i as u32 + 1);
        if i == 0 {
            measure
                .elements
                .push(MeasureElement::Time(TimeSignature::new(4, 4)));
        }
        let mut voice = Voice::new(voice_id);
        for (offset, duration, spelling) in events.iter() {
            voice.events.push(VoiceEvent::Note(Note::new(
                NoteId::new(next_id),
                pitch(spelling),
                *offset,
                *duration,
            )));
            next_id += 1;
        }
        measure.voices.push(voice);
        part.measures.push(measure);
    }
    score.parts.push(part);
    score
}
