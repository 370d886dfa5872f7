//! End-to-end scenarios over the full splitting pipeline.

use divisi_model::{BreakKind, LayoutBreak, MeasureElement, Score, SpannerKind, Syllabic, beats};
use divisi_pipeline_tests::ClosedScoreBuilder;
use divisi_split::{SplitOptions, SplitOutput, VoiceName, split_score};

fn run(score: &Score) -> SplitOutput {
    split_score(score, &SplitOptions::default()).expect("pipeline succeeds")
}

fn lyric_at(output: &SplitOutput, name: VoiceName, measure: u32, event: usize) -> Vec<String> {
    output.get(name).parts[0]
        .measure(measure)
        .unwrap()
        .voices[0]
        .events[event]
        .lyrics()
        .iter()
        .map(|l| l.text.clone())
        .collect()
}

#[test]
fn canonical_four_way_propagation() {
    // Measure 1 beat 1: Soprano quarter G4 with "Sun"; the others have
    // bare quarters at the same offset.
    let mut builder = ClosedScoreBuilder::new(1);
    let soprano = builder.note("1", 1, beats(0, 1), beats(1, 1), "G4");
    builder.note("2", 1, beats(0, 1), beats(1, 1), "E4");
    builder.note("5", 1, beats(0, 1), beats(1, 1), "C4");
    builder.note("6", 1, beats(0, 1), beats(1, 1), "C3");
    for voice in ["1", "2", "5", "6"] {
        builder.rest(voice, 1, beats(1, 1), beats(3, 1));
    }
    builder.lyric(soprano, "Sun", Syllabic::Single);

    let output = run(&builder.build());

    for name in VoiceName::ALL {
        let events = &output.get(name).parts[0].measure(1).unwrap().voices[0].events;
        assert_eq!(events[0].offset(), beats(0, 1), "{name}");
        assert_eq!(events[0].duration(), beats(1, 1), "{name}");
        let lyrics = events[0].lyrics();
        assert_eq!(lyrics.len(), 1, "{name}");
        assert_eq!(lyrics[0].text, "Sun");
        assert_eq!(lyrics[0].syllabic, Syllabic::Single);
        assert_eq!(lyrics[0].line, 1);
    }
}

#[test]
fn time_window_mismatch_still_matches() {
    // Measure 29: Soprano dotted half under "far"; Alto half, Tenor
    // quarter, Bass half, all at offset 0. Exact-duration matching would
    // drop every copy; the time window must not.
    let mut builder = ClosedScoreBuilder::new(29);
    builder.fill_whole_notes(1, 28);
    let soprano = builder.note("1", 29, beats(0, 1), beats(3, 1), "A4");
    builder.rest("1", 29, beats(3, 1), beats(1, 1));
    builder.note("2", 29, beats(0, 1), beats(2, 1), "F4");
    builder.rest("2", 29, beats(2, 1), beats(2, 1));
    builder.note("5", 29, beats(0, 1), beats(1, 1), "C4");
    builder.rest("5", 29, beats(1, 1), beats(3, 1));
    builder.note("6", 29, beats(0, 1), beats(2, 1), "F3");
    builder.rest("6", 29, beats(2, 1), beats(2, 1));
    builder.lyric(soprano, "far", Syllabic::Single);

    let output = run(&builder.build());

    for name in VoiceName::ALL {
        assert_eq!(
            lyric_at(&output, name, 29, 0),
            vec!["far".to_string()],
            "{name}"
        );
    }
}

#[test]
fn voice_specific_lyrics_are_preserved() {
    // Bass sings "sleep" while Soprano sings "rest" at the same positions
    // in measures 16-18; neither may be overwritten.
    let mut builder = ClosedScoreBuilder::new(18);
    builder.fill_whole_notes(1, 15);
    for measure in 16..=18 {
        let soprano = builder.note("1", measure, beats(0, 1), beats(4, 1), "G4");
        builder.note("2", measure, beats(0, 1), beats(4, 1), "E4");
        builder.note("5", measure, beats(0, 1), beats(4, 1), "C4");
        let bass = builder.note("6", measure, beats(0, 1), beats(4, 1), "C3");
        builder.lyric(soprano, "rest", Syllabic::Single);
        builder.lyric(bass, "sleep", Syllabic::Single);
    }

    let output = run(&builder.build());

    for measure in 16..=18 {
        assert_eq!(
            lyric_at(&output, VoiceName::Soprano, measure, 0),
            vec!["rest".to_string()]
        );
        assert_eq!(
            lyric_at(&output, VoiceName::Bass, measure, 0),
            vec!["sleep".to_string()]
        );
    }
}

#[test]
fn system_wide_crescendo_propagates() {
    // One crescendo in Soprano from measure 10 beat 1 to measure 11 beat 3;
    // no other wedges anywhere.
    let mut builder = ClosedScoreBuilder::new(11);
    builder.fill_whole_notes(1, 9);
    let mut quarter_row = |measure: u32| {
        for (voice, spelling) in [("1", "G4"), ("2", "E4"), ("5", "C4"), ("6", "C3")] {
            for beat in 0..4 {
                builder.note(voice, measure, beats(beat, 1), beats(1, 1), spelling);
            }
        }
    };
    quarter_row(10);
    quarter_row(11);

    let start = builder.note_id_of("1", 10, 0);
    let end = builder.note_id_of("1", 11, 2);
    builder.spanner(SpannerKind::Crescendo, vec![start, end]);

    let output = run(&builder.build());

    for name in VoiceName::ALL {
        let score = output.get(name);
        let wedges: Vec<_> = score
            .spanners
            .iter()
            .filter(|s| s.kind == SpannerKind::Crescendo)
            .collect();
        assert_eq!(wedges.len(), 1, "{name}");
        let start = score.locate_note(wedges[0].first().unwrap()).unwrap();
        let end = score.locate_note(wedges[0].last().unwrap()).unwrap();
        assert_eq!(start.measure_number, 10, "{name}");
        assert_eq!(start.offset, beats(0, 1), "{name}");
        assert_eq!(end.measure_number, 11, "{name}");
        assert_eq!(end.offset, beats(2, 1), "{name}");
    }
}

#[test]
fn soprano_and_bass_wedges_fill_inner_voices_only() {
    let mut builder = ClosedScoreBuilder::new(2);
    builder.fill_whole_notes(1, 2);
    let s_start = builder.note_id_of("1", 1, 0);
    let s_end = builder.note_id_of("1", 2, 0);
    let b_start = builder.note_id_of("6", 1, 0);
    let b_end = builder.note_id_of("6", 2, 0);
    builder.spanner(SpannerKind::Diminuendo, vec![s_start, s_end]);
    builder.spanner(SpannerKind::Diminuendo, vec![b_start, b_end]);

    let output = run(&builder.build());

    for name in VoiceName::ALL {
        let count = output
            .get(name)
            .spanners
            .iter()
            .filter(|s| s.kind == SpannerKind::Diminuendo)
            .count();
        assert_eq!(count, 1, "{name}");
    }
}

#[test]
fn slur_middle_candidate_is_skipped() {
    // Soprano's "light" sits on beat 2. The Tenor note at beat 2 is the
    // middle of a three-note slur and must stay bare; Alto and Bass
    // receive the lyric.
    let mut builder = ClosedScoreBuilder::new(1);
    builder.note("1", 1, beats(0, 1), beats(1, 1), "G4");
    let soprano = builder.note("1", 1, beats(1, 1), beats(1, 1), "A4");
    builder.rest("1", 1, beats(2, 1), beats(2, 1));
    builder.note("2", 1, beats(0, 1), beats(1, 1), "E4");
    builder.note("2", 1, beats(1, 1), beats(1, 1), "F4");
    builder.rest("2", 1, beats(2, 1), beats(2, 1));
    let t1 = builder.note("5", 1, beats(0, 1), beats(1, 1), "C4");
    let t2 = builder.note("5", 1, beats(1, 1), beats(1, 1), "D4");
    let t3 = builder.note("5", 1, beats(2, 1), beats(1, 1), "E4");
    builder.rest("5", 1, beats(3, 1), beats(1, 1));
    builder.note("6", 1, beats(0, 1), beats(1, 1), "C3");
    builder.note("6", 1, beats(1, 1), beats(1, 1), "D3");
    builder.rest("6", 1, beats(2, 1), beats(2, 1));
    builder.lyric(soprano, "light", Syllabic::Single);
    builder.spanner(SpannerKind::Slur, vec![t1, t2, t3]);

    let output = run(&builder.build());

    assert_eq!(
        lyric_at(&output, VoiceName::Alto, 1, 1),
        vec!["light".to_string()]
    );
    assert_eq!(
        lyric_at(&output, VoiceName::Bass, 1, 1),
        vec!["light".to_string()]
    );
    // Tenor's mid-slur note receives nothing.
    assert!(lyric_at(&output, VoiceName::Tenor, 1, 1).is_empty());
}

#[test]
fn system_break_reaches_every_output() {
    let mut builder = ClosedScoreBuilder::new(12);
    builder.fill_whole_notes(1, 12);
    builder.element(
        0,
        12,
        MeasureElement::Break(LayoutBreak {
            kind: BreakKind::System,
        }),
    );

    let output = run(&builder.build());

    for name in VoiceName::ALL {
        let measure = output.get(name).parts[0].measure(12).unwrap();
        let breaks = measure
            .elements
            .iter()
            .filter(|e| matches!(e, MeasureElement::Break(_)))
            .count();
        assert_eq!(breaks, 1, "{name}");
        let measure_11 = output.get(name).parts[0].measure(11).unwrap();
        assert!(
            !measure_11
                .elements
                .iter()
                .any(|e| matches!(e, MeasureElement::Break(_))),
            "{name}"
        );
    }
}
