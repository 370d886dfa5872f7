//! Universal invariants that must hold on every pipeline run.

use std::collections::HashSet;

use divisi_model::{Score, SpannerKind, Syllabic, VoiceEvent, beats};
use divisi_pipeline_tests::{ClosedScoreBuilder, VOICE_IDS, part_of_voice};
use divisi_split::{SplitOptions, SplitOutput, VoiceMapping, VoiceName, split_score};

/// A reasonably rich closed score: lyrics, dynamics, a slur, a tie, a
/// crescendo, and uneven rhythms.
fn rich_input() -> Score {
    let mut builder = ClosedScoreBuilder::new(4);

    // Measure 1: quarters against a whole note.
    for beat in 0..4 {
        builder.note("1", 1, beats(beat, 1), beats(1, 1), "G4");
    }
    builder.note("2", 1, beats(0, 1), beats(4, 1), "E4");
    builder.note("5", 1, beats(0, 1), beats(2, 1), "C4");
    builder.note("5", 1, beats(2, 1), beats(2, 1), "D4");
    builder.note("6", 1, beats(0, 1), beats(4, 1), "C3");

    // Measure 2: a dotted rhythm in soprano with a two-syllable word.
    let s1 = builder.note("1", 2, beats(0, 1), beats(3, 1), "A4");
    let s2 = builder.note("1", 2, beats(3, 1), beats(1, 1), "B4");
    builder.lyric(s1, "shi", Syllabic::Begin);
    builder.lyric(s2, "ning", Syllabic::End);
    builder.note("2", 2, beats(0, 1), beats(2, 1), "F4");
    builder.note("2", 2, beats(2, 1), beats(2, 1), "G4");
    builder.note("5", 2, beats(0, 1), beats(4, 1), "C4");
    let b1 = builder.note("6", 2, beats(0, 1), beats(4, 1), "F3");

    // Measures 3-4: tied bass, slurred soprano, crescendo, dynamics.
    let s3 = builder.note("1", 3, beats(0, 1), beats(2, 1), "G4");
    let s4 = builder.note("1", 3, beats(2, 1), beats(2, 1), "F4");
    let s5 = builder.note("1", 4, beats(0, 1), beats(4, 1), "E4");
    builder.note("2", 3, beats(0, 1), beats(4, 1), "D4");
    builder.note("2", 4, beats(0, 1), beats(4, 1), "C4");
    builder.note("5", 3, beats(0, 1), beats(4, 1), "B3");
    builder.note("5", 4, beats(0, 1), beats(4, 1), "C4");
    let b2 = builder.note("6", 3, beats(0, 1), beats(4, 1), "F3");
    builder.note("6", 4, beats(0, 1), beats(4, 1), "C3");

    builder.spanner(SpannerKind::Slur, vec![s3, s4, s5]);
    builder.spanner(SpannerKind::Tie, vec![b1, b2]);
    builder.spanner(SpannerKind::Crescendo, vec![s3, s5]);
    builder.dynamic(0, 1, beats(0, 1), "p");
    builder.dynamic(0, 3, beats(0, 1), "f");

    builder.build()
}

fn run(input: &Score) -> SplitOutput {
    split_score(input, &SplitOptions::default()).expect("pipeline succeeds")
}

#[test]
fn one_part_one_voice_per_measure() {
    let output = run(&rich_input());
    for (name, score) in output.iter() {
        assert_eq!(score.parts.len(), 1, "{name}");
        for measure in &score.parts[0].measures {
            assert_eq!(measure.voices.len(), 1, "{name} measure {}", measure.number);
        }
    }
}

#[test]
fn every_input_note_survives_in_its_home_voice() {
    let input = rich_input();
    let output = run(&input);
    let mapping = VoiceMapping::canonical();

    for (index, name) in VoiceName::ALL.into_iter().enumerate() {
        let voice_id = VOICE_IDS[index];
        let location = mapping.get(name);
        let out = output.get(name);
        for measure in &input.parts[location.part_index].measures {
            let Some(voice) = measure.voice(voice_id) else {
                continue;
            };
            for event in &voice.events {
                let VoiceEvent::Note(note) = event else { continue };
                let out_measure = out.parts[0].measure(measure.number).unwrap();
                let found = out_measure.voices[0].events.iter().any(|e| match e {
                    VoiceEvent::Note(n) => {
                        n.pitch == note.pitch
                            && n.offset == note.offset
                            && n.duration == note.duration
                    }
                    _ => false,
                });
                assert!(
                    found,
                    "{name}: note {} lost from measure {}",
                    note.pitch, measure.number
                );
            }
        }
    }
}

#[test]
fn input_lyrics_survive_in_their_home_voice() {
    let input = rich_input();
    let output = run(&input);

    for part_index in 0..2 {
        for measure in &input.parts[part_index].measures {
            for voice in &measure.voices {
                for event in &voice.events {
                    for lyric in event.lyrics() {
                        let voice_index = VOICE_IDS
                            .iter()
                            .position(|id| *id == voice.id)
                            .unwrap();
                        let name = VoiceName::ALL[voice_index];
                        let out = output.get(name);
                        let out_measure = out.parts[0].measure(measure.number).unwrap();
                        let found = out_measure.voices[0].events.iter().any(|e| {
                            e.offset() == event.offset()
                                && e.lyrics().iter().any(|l| {
                                    l.text == lyric.text && l.syllabic == lyric.syllabic
                                })
                        });
                        assert!(found, "{name}: lyric {:?} lost", lyric.text);
                    }
                }
            }
        }
    }
}

#[test]
fn no_duplicate_dynamics_at_one_position() {
    let output = run(&rich_input());
    for (name, score) in output.iter() {
        for measure in &score.parts[0].measures {
            let mut seen = HashSet::new();
            for dynamic in measure.dynamics() {
                assert!(
                    seen.insert(dynamic.offset),
                    "{name}: duplicate dynamic at measure {} offset {}",
                    measure.number,
                    dynamic.offset
                );
            }
        }
    }
}

#[test]
fn no_spanner_references_a_missing_note() {
    let output = run(&rich_input());
    for (name, score) in output.iter() {
        let ids = score.note_ids();
        for spanner in &score.spanners {
            assert!(
                spanner.notes.iter().all(|n| ids.contains(n)),
                "{name}: spanner {} dangles",
                spanner.id
            );
        }
    }
}

#[test]
fn unifier_never_moves_preexisting_content() {
    let input = rich_input();
    let mapping = VoiceMapping::canonical();

    // Compare against a run with all unification disabled: the timed
    // skeleton (offsets and durations per voice) must be identical.
    let bare = split_score(
        &input,
        &SplitOptions {
            apply_dynamics_unification: false,
            apply_lyrics_unification: false,
            apply_spanner_unification: false,
            apply_layout_unification: false,
            validate_output: true,
        },
    )
    .unwrap();
    let full = run(&input);

    for name in VoiceName::ALL {
        let location = mapping.get(name);
        assert_eq!(location.part_index, part_of_voice(&location.voice_id));
        let bare_score = bare.get(name);
        let full_score = full.get(name);
        for measure in &bare_score.parts[0].measures {
            let full_measure = full_score.parts[0].measure(measure.number).unwrap();
            let skeleton = |m: &divisi_model::Measure| {
                m.voices[0]
                    .events
                    .iter()
                    .map(|e| (e.offset(), e.duration()))
                    .collect::<Vec<_>>()
            };
            assert_eq!(skeleton(measure), skeleton(full_measure), "{name}");
        }
    }
}

#[test]
fn per_voice_slurs_and_ties_are_conserved() {
    let input = rich_input();
    let output = run(&input);

    // The input has one soprano slur and one bass tie; they must appear
    // exactly once, in the right outputs, and nowhere else.
    let count = |score: &Score, kind: SpannerKind| {
        score.spanners.iter().filter(|s| s.kind == kind).count()
    };

    assert_eq!(count(output.get(VoiceName::Soprano), SpannerKind::Slur), 1);
    assert_eq!(count(output.get(VoiceName::Alto), SpannerKind::Slur), 0);
    assert_eq!(count(output.get(VoiceName::Tenor), SpannerKind::Slur), 0);
    assert_eq!(count(output.get(VoiceName::Bass), SpannerKind::Slur), 0);

    assert_eq!(count(output.get(VoiceName::Bass), SpannerKind::Tie), 1);
    assert_eq!(count(output.get(VoiceName::Soprano), SpannerKind::Tie), 0);
}

#[test]
fn stages_preserve_musical_content_of_a_lone_voice() {
    // Stages 3-5 applied to content that is already a single voice leave
    // its notes, rhythms, and spanners untouched (the trivial case).
    let input = rich_input();
    let output = run(&input);
    let soprano = output.get(VoiceName::Soprano).clone();

    // Feeding a derived score through removal and unification again (as a
    // degenerate "already split" input) must not change its content.
    let mut again = [
        soprano.clone(),
        soprano.clone(),
        soprano.clone(),
        soprano.clone(),
    ];
    divisi_split::unify::unify(&mut again, &SplitOptions::default()).unwrap();
    assert_eq!(again[0], soprano);
}
