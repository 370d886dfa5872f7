//! From MusicXML text to four part files on disk.

use divisi_format::Exporter;
use divisi_musicxml::{MusicXmlFormat, parse_musicxml};
use divisi_split::{SplitOptions, VoiceName, split_score};

/// A minimal closed score: one MusicXML part, two staves, one measure.
const INPUT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<score-partwise version="4.0">
  <work><work-title>Kleines Lied</work-title></work>
  <part-list><score-part id="P1"><part-name>Chor</part-name></score-part></part-list>
  <part id="P1">
    <measure number="1">
      <attributes>
        <divisions>1</divisions>
        <key><fifths>0</fifths></key>
        <time><beats>4</beats><beat-type>4</beat-type></time>
        <staves>2</staves>
        <clef number="1"><sign>G</sign><line>2</line></clef>
        <clef number="2"><sign>F</sign><line>4</line></clef>
      </attributes>
      <note>
        <pitch><step>G</step><octave>4</octave></pitch>
        <duration>4</duration><voice>1</voice><type>whole</type><staff>1</staff>
        <lyric number="1"><syllabic>single</syllabic><text>Sun</text></lyric>
      </note>
      <backup><duration>4</duration></backup>
      <note><pitch><step>E</step><octave>4</octave></pitch><duration>4</duration><voice>2</voice><type>whole</type><staff>1</staff></note>
      <backup><duration>4</duration></backup>
      <note><pitch><step>C</step><octave>4</octave></pitch><duration>4</duration><voice>5</voice><type>whole</type><staff>2</staff></note>
      <backup><duration>4</duration></backup>
      <note><pitch><step>C</step><octave>3</octave></pitch><duration>4</duration><voice>6</voice><type>whole</type><staff>2</staff></note>
    </measure>
  </part>
</score-partwise>"#;

#[test]
fn four_files_with_voice_suffixes_and_titles() {
    let mut score = parse_musicxml(INPUT).unwrap();
    score.metadata.source_basename = Some("kleines-lied".to_string());

    let output = split_score(&score, &SplitOptions::default()).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let exporter = MusicXmlFormat;
    for (name, part_score) in output.iter() {
        let xml = exporter.export(part_score).unwrap();
        let path = dir.path().join(format!("kleines-lied-{name}.musicxml"));
        std::fs::write(&path, xml).unwrap();
    }

    for name in ["Soprano", "Alto", "Tenor", "Bass"] {
        let path = dir.path().join(format!("kleines-lied-{name}.musicxml"));
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(
            content.contains(&format!("<work-title>Kleines Lied ({name})</work-title>")),
            "{name}: work title missing"
        );
        assert!(
            content.contains(&format!(
                "<movement-title>Kleines Lied ({name})</movement-title>"
            )),
            "{name}: movement title missing"
        );
        // Every part sings "Sun" after unification.
        assert!(content.contains("<text>Sun</text>"), "{name}: lyric missing");
    }

    // Tenor is written an octave higher than sounding.
    let tenor = std::fs::read_to_string(dir.path().join("kleines-lied-Tenor.musicxml")).unwrap();
    assert!(tenor.contains("<clef-octave-change>-1</clef-octave-change>"));

    // Bass keeps the F clef.
    let bass = std::fs::read_to_string(dir.path().join("kleines-lied-Bass.musicxml")).unwrap();
    assert!(bass.contains("<sign>F</sign>"));
}

#[test]
fn title_falls_back_to_basename_when_unset() {
    let stripped = INPUT.replace("<work><work-title>Kleines Lied</work-title></work>", "");
    let mut score = parse_musicxml(&stripped).unwrap();
    score.metadata.source_basename = Some("kleines-lied".to_string());

    let output = split_score(&score, &SplitOptions::default()).unwrap();
    assert_eq!(
        output
            .get(VoiceName::Alto)
            .metadata
            .work_title
            .as_deref(),
        Some("kleines-lied (Alto)")
    );
}
