//! Serialization of the internal model to MusicXML (score-partwise).
//!
//! Divisions are computed per score as the least common multiple of every
//! rational offset and duration denominator, so all timing values serialize
//! to exact integers. Slur and tied notations are reconstructed from the
//! score-level spanner collection; wedges become paired `<wedge>` direction
//! elements around their endpoint notes.

use std::collections::{HashMap, HashSet};

use divisi_model::{
    Beats, Clef, Dynamic, Measure, MeasureElement, NoteId, Part, Pitch, Score, SpannerId,
    SpannerKind, TempoMark, Voice, VoiceEvent, zero,
};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use tracing::debug;

use crate::error::{MusicXmlError, MusicXmlResult};

type XmlWriter<'w> = Writer<&'w mut Vec<u8>>;

/// Serialize a score to MusicXML text.
pub fn write_musicxml(score: &Score) -> MusicXmlResult<String> {
    let divisions = compute_divisions(score);
    let mut buffer = Vec::new();
    let mut writer = Writer::new_with_indent(&mut buffer, b' ', 2);

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    writer.write_event(Event::DocType(BytesText::from_escaped(
        r#"score-partwise PUBLIC "-//Recordare//DTD MusicXML 4.0 Partwise//EN" "http://www.musicxml.org/dtds/partwise.dtd""#,
    )))?;

    let root = BytesStart::new("score-partwise").with_attributes([("version", "4.0")]);
    writer.write_event(Event::Start(root))?;

    write_header(&mut writer, score)?;
    write_part_list(&mut writer, score)?;
    for (index, part) in score.parts.iter().enumerate() {
        write_part(&mut writer, score, part, index, divisions)?;
    }

    writer.write_event(Event::End(BytesEnd::new("score-partwise")))?;
    debug!(divisions, "MusicXML export complete");

    String::from_utf8(buffer)
        .map_err(|err| MusicXmlError::xml(format!("exported non-UTF-8 output: {err}")))
}

// ---------------------------------------------------------------------------
// Header and part-list
// ---------------------------------------------------------------------------

fn write_header(w: &mut XmlWriter<'_>, score: &Score) -> MusicXmlResult<()> {
    if let Some(title) = &score.metadata.work_title {
        w.write_event(Event::Start(BytesStart::new("work")))?;
        text_element(w, "work-title", title)?;
        w.write_event(Event::End(BytesEnd::new("work")))?;
    }
    if let Some(title) = &score.metadata.movement_title {
        text_element(w, "movement-title", title)?;
    }

    w.write_event(Event::Start(BytesStart::new("identification")))?;
    if let Some(composer) = &score.metadata.composer {
        let start =
            BytesStart::new("creator").with_attributes([("type", "composer")]);
        w.write_event(Event::Start(start))?;
        w.write_event(Event::Text(BytesText::new(composer)))?;
        w.write_event(Event::End(BytesEnd::new("creator")))?;
    }
    if let Some(lyricist) = &score.metadata.lyricist {
        let start =
            BytesStart::new("creator").with_attributes([("type", "lyricist")]);
        w.write_event(Event::Start(start))?;
        w.write_event(Event::Text(BytesText::new(lyricist)))?;
        w.write_event(Event::End(BytesEnd::new("creator")))?;
    }
    w.write_event(Event::Start(BytesStart::new("encoding")))?;
    text_element(w, "software", "divisi")?;
    w.write_event(Event::End(BytesEnd::new("encoding")))?;
    w.write_event(Event::End(BytesEnd::new("identification")))?;
    Ok(())
}

fn part_id(part: &Part, index: usize) -> String {
    part.id.clone().unwrap_or_else(|| format!("P{}", index + 1))
}

fn write_part_list(w: &mut XmlWriter<'_>, score: &Score) -> MusicXmlResult<()> {
    w.write_event(Event::Start(BytesStart::new("part-list")))?;
    for (index, part) in score.parts.iter().enumerate() {
        let id = part_id(part, index);
        let start = BytesStart::new("score-part").with_attributes([("id", id.as_str())]);
        w.write_event(Event::Start(start))?;
        text_element(w, "part-name", part.name.as_deref().unwrap_or(""))?;
        w.write_event(Event::End(BytesEnd::new("score-part")))?;
    }
    w.write_event(Event::End(BytesEnd::new("part-list")))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Parts and measures
// ---------------------------------------------------------------------------

fn write_part(
    w: &mut XmlWriter<'_>,
    score: &Score,
    part: &Part,
    index: usize,
    divisions: i32,
) -> MusicXmlResult<()> {
    let id = part_id(part, index);
    let start = BytesStart::new("part").with_attributes([("id", id.as_str())]);
    w.write_event(Event::Start(start))?;

    let mut spanners = SpannerNotations::for_part(score, part);
    for (measure_index, measure) in part.measures.iter().enumerate() {
        write_measure(
            w,
            part,
            measure,
            measure_index == 0,
            divisions,
            &mut spanners,
        )?;
    }

    w.write_event(Event::End(BytesEnd::new("part")))?;
    Ok(())
}

fn write_measure(
    w: &mut XmlWriter<'_>,
    part: &Part,
    measure: &Measure,
    is_first: bool,
    divisions: i32,
    spanners: &mut SpannerNotations,
) -> MusicXmlResult<()> {
    let number = measure.number.to_string();
    let start = BytesStart::new("measure").with_attributes([("number", number.as_str())]);
    w.write_event(Event::Start(start))?;

    // <print> breaks come first.
    for element in &measure.elements {
        if let MeasureElement::Break(layout_break) = element {
            let attr = match layout_break.kind {
                divisi_model::BreakKind::System => ("new-system", "yes"),
                divisi_model::BreakKind::Page => ("new-page", "yes"),
            };
            let print = BytesStart::new("print").with_attributes([attr]);
            w.write_event(Event::Empty(print))?;
        }
    }

    write_attributes(w, part, measure, is_first, divisions)?;

    // Dynamics, tempo, and rehearsal marks interleave with the first
    // voice's notes by offset.
    let mut directions: Vec<(Beats, &MeasureElement)> = measure
        .elements
        .iter()
        .filter(|e| {
            matches!(
                e,
                MeasureElement::Dynamic(_)
                    | MeasureElement::Tempo(_)
                    | MeasureElement::Rehearsal(_)
            )
        })
        .map(|e| (e.offset(), e))
        .collect();
    directions.sort_by_key(|(offset, _)| *offset);
    let mut next_direction = 0usize;

    for (voice_index, voice) in measure.voices.iter().enumerate() {
        if voice_index > 0 {
            // Return to the measure start for the next voice.
            let cursor = voice_end(&measure.voices[voice_index - 1]);
            if cursor > zero() {
                w.write_event(Event::Start(BytesStart::new("backup")))?;
                text_element(w, "duration", &div_string(cursor, divisions))?;
                w.write_event(Event::End(BytesEnd::new("backup")))?;
            }
        }

        let mut cursor = zero();
        for event in &voice.events {
            if voice_index == 0 {
                while next_direction < directions.len()
                    && directions[next_direction].0 <= event.offset()
                {
                    write_direction(w, directions[next_direction].1)?;
                    next_direction += 1;
                }
            }
            if event.offset() > cursor {
                let gap = event.offset() - cursor;
                w.write_event(Event::Start(BytesStart::new("forward")))?;
                text_element(w, "duration", &div_string(gap, divisions))?;
                w.write_event(Event::End(BytesEnd::new("forward")))?;
                cursor = event.offset();
            }
            if let Some(id) = event.note_id() {
                spanners.write_wedge_starts(w, id)?;
            }
            write_event(w, event, &voice.id, divisions, spanners)?;
            if !event.is_grace() {
                cursor += event.duration();
            }
            if let Some(id) = event.note_id() {
                spanners.write_wedge_stops(w, id)?;
            }
        }
    }

    // Any directions past the last note.
    while next_direction < directions.len() {
        write_direction(w, directions[next_direction].1)?;
        next_direction += 1;
    }

    w.write_event(Event::End(BytesEnd::new("measure")))?;
    Ok(())
}

/// Final cursor position of a voice, in beats.
fn voice_end(voice: &Voice) -> Beats {
    voice
        .events
        .iter()
        .filter(|e| !e.is_grace())
        .map(|e| e.offset() + e.duration())
        .max()
        .unwrap_or_else(zero)
}

fn write_attributes(
    w: &mut XmlWriter<'_>,
    part: &Part,
    measure: &Measure,
    is_first: bool,
    divisions: i32,
) -> MusicXmlResult<()> {
    let key = measure.elements.iter().find_map(|e| match e {
        MeasureElement::Key(k) => Some(*k),
        _ => None,
    });
    let time = measure.time_signature();
    let clef_changes: Vec<&Clef> = measure
        .elements
        .iter()
        .filter_map(|e| match e {
            MeasureElement::Clef { clef, .. } => Some(clef),
            _ => None,
        })
        .collect();

    let initial_clef = if is_first { part.clef.as_ref() } else { None };
    if !is_first && key.is_none() && time.is_none() && clef_changes.is_empty() {
        return Ok(());
    }

    w.write_event(Event::Start(BytesStart::new("attributes")))?;
    if is_first {
        text_element(w, "divisions", &divisions.to_string())?;
    }
    if let Some(key) = key {
        w.write_event(Event::Start(BytesStart::new("key")))?;
        text_element(w, "fifths", &key.fifths.to_string())?;
        w.write_event(Event::End(BytesEnd::new("key")))?;
    }
    if let Some(time) = time {
        w.write_event(Event::Start(BytesStart::new("time")))?;
        text_element(w, "beats", &time.beats.to_string())?;
        text_element(w, "beat-type", &time.beat_type.to_string())?;
        w.write_event(Event::End(BytesEnd::new("time")))?;
    }
    for clef in initial_clef.into_iter().chain(clef_changes) {
        write_clef(w, clef)?;
    }
    w.write_event(Event::End(BytesEnd::new("attributes")))?;
    Ok(())
}

fn write_clef(w: &mut XmlWriter<'_>, clef: &Clef) -> MusicXmlResult<()> {
    let (sign, line, octave_change) = match clef {
        Clef::Treble => ('G', 2, 0),
        Clef::TrebleDown8 => ('G', 2, -1),
        Clef::Bass => ('F', 4, 0),
        Clef::Alto => ('C', 3, 0),
        Clef::Tenor => ('C', 4, 0),
        Clef::Other {
            sign,
            line,
            octave_change,
        } => (*sign, *line, *octave_change),
    };
    w.write_event(Event::Start(BytesStart::new("clef")))?;
    text_element(w, "sign", &sign.to_string())?;
    if line > 0 {
        text_element(w, "line", &line.to_string())?;
    }
    if octave_change != 0 {
        text_element(w, "clef-octave-change", &octave_change.to_string())?;
    }
    w.write_event(Event::End(BytesEnd::new("clef")))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Directions
// ---------------------------------------------------------------------------

/// Dynamic marks with a dedicated MusicXML element name.
const KNOWN_DYNAMICS: &[&str] = &[
    "p", "pp", "ppp", "pppp", "ppppp", "pppppp", "f", "ff", "fff", "ffff", "fffff", "ffffff",
    "mp", "mf", "sf", "sfp", "sfpp", "fp", "rf", "rfz", "sfz", "sffz", "fz", "n", "pf", "sfzp",
];

fn write_direction(w: &mut XmlWriter<'_>, element: &MeasureElement) -> MusicXmlResult<()> {
    match element {
        MeasureElement::Dynamic(dynamic) => write_dynamic(w, dynamic),
        MeasureElement::Tempo(tempo) => write_tempo(w, tempo),
        MeasureElement::Rehearsal(mark) => {
            let start =
                BytesStart::new("direction").with_attributes([("placement", "above")]);
            w.write_event(Event::Start(start))?;
            w.write_event(Event::Start(BytesStart::new("direction-type")))?;
            text_element(w, "rehearsal", &mark.text)?;
            w.write_event(Event::End(BytesEnd::new("direction-type")))?;
            w.write_event(Event::End(BytesEnd::new("direction")))?;
            Ok(())
        }
        _ => Ok(()),
    }
}

fn write_dynamic(w: &mut XmlWriter<'_>, dynamic: &Dynamic) -> MusicXmlResult<()> {
    let mut start = BytesStart::new("direction");
    match dynamic.placement {
        Some(divisi_model::Placement::Above) => start.push_attribute(("placement", "above")),
        Some(divisi_model::Placement::Below) => start.push_attribute(("placement", "below")),
        None => {}
    }
    w.write_event(Event::Start(start))?;
    w.write_event(Event::Start(BytesStart::new("direction-type")))?;
    w.write_event(Event::Start(BytesStart::new("dynamics")))?;
    if KNOWN_DYNAMICS.contains(&dynamic.value.as_str()) {
        w.write_event(Event::Empty(BytesStart::new(dynamic.value.as_str())))?;
    } else {
        text_element(w, "other-dynamics", &dynamic.value)?;
    }
    w.write_event(Event::End(BytesEnd::new("dynamics")))?;
    w.write_event(Event::End(BytesEnd::new("direction-type")))?;
    w.write_event(Event::End(BytesEnd::new("direction")))?;
    Ok(())
}

fn write_tempo(w: &mut XmlWriter<'_>, tempo: &TempoMark) -> MusicXmlResult<()> {
    let start = BytesStart::new("direction").with_attributes([("placement", "above")]);
    w.write_event(Event::Start(start))?;
    let has_metronome = tempo.beat_unit.is_some() && tempo.per_minute.is_some();
    if has_metronome || tempo.text.is_some() {
        w.write_event(Event::Start(BytesStart::new("direction-type")))?;
        if let Some(text) = &tempo.text {
            text_element(w, "words", text)?;
        }
        if has_metronome {
            w.write_event(Event::Start(BytesStart::new("metronome")))?;
            text_element(w, "beat-unit", tempo.beat_unit.as_deref().unwrap_or("quarter"))?;
            text_element(
                w,
                "per-minute",
                &tempo.per_minute.unwrap_or_default().to_string(),
            )?;
            w.write_event(Event::End(BytesEnd::new("metronome")))?;
        }
        w.write_event(Event::End(BytesEnd::new("direction-type")))?;
    }
    if let Some(per_minute) = tempo.per_minute {
        let tempo_attr = per_minute.to_string();
        let sound = BytesStart::new("sound").with_attributes([("tempo", tempo_attr.as_str())]);
        w.write_event(Event::Empty(sound))?;
    }
    w.write_event(Event::End(BytesEnd::new("direction")))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Notes
// ---------------------------------------------------------------------------

fn write_event(
    w: &mut XmlWriter<'_>,
    event: &VoiceEvent,
    voice_id: &str,
    divisions: i32,
    spanners: &mut SpannerNotations,
) -> MusicXmlResult<()> {
    match event {
        VoiceEvent::Rest(rest) => {
            w.write_event(Event::Start(BytesStart::new("note")))?;
            if rest.whole_measure {
                let el = BytesStart::new("rest").with_attributes([("measure", "yes")]);
                w.write_event(Event::Empty(el))?;
            } else {
                w.write_event(Event::Empty(BytesStart::new("rest")))?;
            }
            text_element(w, "duration", &div_string(rest.duration, divisions))?;
            text_element(w, "voice", voice_id)?;
            if !rest.whole_measure
                && let Some((name, dots)) = note_type(rest.duration)
            {
                text_element(w, "type", name)?;
                for _ in 0..dots {
                    w.write_event(Event::Empty(BytesStart::new("dot")))?;
                }
            }
            w.write_event(Event::End(BytesEnd::new("note")))?;
        }
        VoiceEvent::Note(note) => {
            write_pitched_note(
                w,
                note.id,
                &note.pitch,
                note.offset,
                note.duration,
                note.grace,
                false,
                voice_id,
                &note.lyrics,
                divisions,
                spanners,
            )?;
        }
        VoiceEvent::Chord(chord) => {
            for (index, pitch) in chord.pitches.iter().enumerate() {
                let lyrics: &[divisi_model::Lyric] =
                    if index == 0 { &chord.lyrics } else { &[] };
                write_pitched_note(
                    w,
                    chord.id,
                    pitch,
                    chord.offset,
                    chord.duration,
                    chord.grace,
                    index > 0,
                    voice_id,
                    lyrics,
                    divisions,
                    spanners,
                )?;
            }
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn write_pitched_note(
    w: &mut XmlWriter<'_>,
    id: NoteId,
    pitch: &Pitch,
    _offset: Beats,
    duration: Beats,
    grace: bool,
    chord_member: bool,
    voice_id: &str,
    lyrics: &[divisi_model::Lyric],
    divisions: i32,
    spanners: &mut SpannerNotations,
) -> MusicXmlResult<()> {
    w.write_event(Event::Start(BytesStart::new("note")))?;
    if grace {
        w.write_event(Event::Empty(BytesStart::new("grace")))?;
    }
    if chord_member {
        w.write_event(Event::Empty(BytesStart::new("chord")))?;
    }

    w.write_event(Event::Start(BytesStart::new("pitch")))?;
    text_element(w, "step", &pitch.step.to_string())?;
    if let Some(alter) = pitch.alter {
        text_element(w, "alter", &alter.to_string())?;
    }
    text_element(w, "octave", &pitch.octave.to_string())?;
    w.write_event(Event::End(BytesEnd::new("pitch")))?;

    if !grace {
        text_element(w, "duration", &div_string(duration, divisions))?;
    }

    // Tie sound elements precede <voice>.
    let tie_stop = !chord_member && spanners.tie_stops.contains(&id);
    let tie_start = !chord_member && spanners.tie_starts.contains(&id);
    if tie_stop {
        let el = BytesStart::new("tie").with_attributes([("type", "stop")]);
        w.write_event(Event::Empty(el))?;
    }
    if tie_start {
        let el = BytesStart::new("tie").with_attributes([("type", "start")]);
        w.write_event(Event::Empty(el))?;
    }

    text_element(w, "voice", voice_id)?;
    if !grace
        && let Some((name, dots)) = note_type(duration)
    {
        text_element(w, "type", name)?;
        for _ in 0..dots {
            w.write_event(Event::Empty(BytesStart::new("dot")))?;
        }
    }

    spanners.write_notations(w, id, tie_start, tie_stop, chord_member)?;

    for lyric in lyrics {
        let line = lyric.line.to_string();
        let start = BytesStart::new("lyric").with_attributes([("number", line.as_str())]);
        w.write_event(Event::Start(start))?;
        text_element(w, "syllabic", &lyric.syllabic.to_string())?;
        text_element(w, "text", &lyric.text)?;
        w.write_event(Event::End(BytesEnd::new("lyric")))?;
    }

    w.write_event(Event::End(BytesEnd::new("note")))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Spanner notation bookkeeping
// ---------------------------------------------------------------------------

/// Per-part lookup tables mapping endpoint notes to the spanners that start
/// or stop on them, plus MusicXML number allocation.
struct SpannerNotations {
    tie_starts: HashSet<NoteId>,
    tie_stops: HashSet<NoteId>,
    slur_starts: HashMap<NoteId, Vec<SpannerId>>,
    slur_stops: HashMap<NoteId, Vec<SpannerId>>,
    wedge_starts: HashMap<NoteId, Vec<(SpannerId, SpannerKind)>>,
    wedge_stops: HashMap<NoteId, Vec<SpannerId>>,
    slur_numbers: NumberPool,
    wedge_numbers: NumberPool,
}

impl SpannerNotations {
    fn for_part(score: &Score, part: &Part) -> Self {
        let part_notes: HashSet<NoteId> = part
            .measures
            .iter()
            .flat_map(|m| m.voices.iter())
            .flat_map(|v| v.events.iter())
            .filter_map(|e| e.note_id())
            .collect();

        let mut this = Self {
            tie_starts: HashSet::new(),
            tie_stops: HashSet::new(),
            slur_starts: HashMap::new(),
            slur_stops: HashMap::new(),
            wedge_starts: HashMap::new(),
            wedge_stops: HashMap::new(),
            slur_numbers: NumberPool::new(),
            wedge_numbers: NumberPool::new(),
        };

        for spanner in &score.spanners {
            let (Some(first), Some(last)) = (spanner.first(), spanner.last()) else {
                continue;
            };
            if !part_notes.contains(&first) || !part_notes.contains(&last) {
                continue;
            }
            match spanner.kind {
                SpannerKind::Tie => {
                    this.tie_starts.insert(first);
                    this.tie_stops.insert(last);
                }
                SpannerKind::Slur | SpannerKind::Line => {
                    this.slur_starts.entry(first).or_default().push(spanner.id);
                    this.slur_stops.entry(last).or_default().push(spanner.id);
                }
                SpannerKind::Crescendo | SpannerKind::Diminuendo => {
                    this.wedge_starts
                        .entry(first)
                        .or_default()
                        .push((spanner.id, spanner.kind));
                    this.wedge_stops.entry(last).or_default().push(spanner.id);
                }
            }
        }
        this
    }

    fn write_wedge_starts(&mut self, w: &mut XmlWriter<'_>, id: NoteId) -> MusicXmlResult<()> {
        let Some(starts) = self.wedge_starts.get(&id).cloned() else {
            return Ok(());
        };
        for (spanner_id, kind) in starts {
            let number = self.wedge_numbers.acquire(spanner_id);
            let kind_name = match kind {
                SpannerKind::Diminuendo => "diminuendo",
                _ => "crescendo",
            };
            write_wedge_direction(w, kind_name, number)?;
        }
        Ok(())
    }

    fn write_wedge_stops(&mut self, w: &mut XmlWriter<'_>, id: NoteId) -> MusicXmlResult<()> {
        let Some(stops) = self.wedge_stops.get(&id).cloned() else {
            return Ok(());
        };
        for spanner_id in stops {
            let number = self.wedge_numbers.release(spanner_id);
            write_wedge_direction(w, "stop", number)?;
        }
        Ok(())
    }

    fn write_notations(
        &mut self,
        w: &mut XmlWriter<'_>,
        id: NoteId,
        tie_start: bool,
        tie_stop: bool,
        chord_member: bool,
    ) -> MusicXmlResult<()> {
        if chord_member {
            return Ok(());
        }
        let slur_stops = self.slur_stops.get(&id).cloned().unwrap_or_default();
        let slur_starts = self.slur_starts.get(&id).cloned().unwrap_or_default();
        if !tie_start && !tie_stop && slur_starts.is_empty() && slur_stops.is_empty() {
            return Ok(());
        }

        w.write_event(Event::Start(BytesStart::new("notations")))?;
        if tie_stop {
            let el = BytesStart::new("tied").with_attributes([("type", "stop")]);
            w.write_event(Event::Empty(el))?;
        }
        if tie_start {
            let el = BytesStart::new("tied").with_attributes([("type", "start")]);
            w.write_event(Event::Empty(el))?;
        }
        for spanner_id in slur_stops {
            let number = self.slur_numbers.release(spanner_id).to_string();
            let el = BytesStart::new("slur")
                .with_attributes([("type", "stop"), ("number", number.as_str())]);
            w.write_event(Event::Empty(el))?;
        }
        for spanner_id in slur_starts {
            let number = self.slur_numbers.acquire(spanner_id).to_string();
            let el = BytesStart::new("slur")
                .with_attributes([("type", "start"), ("number", number.as_str())]);
            w.write_event(Event::Empty(el))?;
        }
        w.write_event(Event::End(BytesEnd::new("notations")))?;
        Ok(())
    }
}

fn write_wedge_direction(
    w: &mut XmlWriter<'_>,
    kind: &str,
    number: u8,
) -> MusicXmlResult<()> {
    let start = BytesStart::new("direction").with_attributes([("placement", "below")]);
    w.write_event(Event::Start(start))?;
    w.write_event(Event::Start(BytesStart::new("direction-type")))?;
    let number = number.to_string();
    let wedge = BytesStart::new("wedge")
        .with_attributes([("type", kind), ("number", number.as_str())]);
    w.write_event(Event::Empty(wedge))?;
    w.write_event(Event::End(BytesEnd::new("direction-type")))?;
    w.write_event(Event::End(BytesEnd::new("direction")))?;
    Ok(())
}

/// Smallest-free-number allocator for concurrent slur/wedge numbering.
struct NumberPool {
    active: HashMap<SpannerId, u8>,
    used: [bool; 16],
}

impl NumberPool {
    fn new() -> Self {
        Self {
            active: HashMap::new(),
            used: [false; 16],
        }
    }

    fn acquire(&mut self, id: SpannerId) -> u8 {
        let slot = self.used.iter().position(|u| !u).unwrap_or(0);
        self.used[slot] = true;
        let number = slot as u8 + 1;
        self.active.insert(id, number);
        number
    }

    fn release(&mut self, id: SpannerId) -> u8 {
        match self.active.remove(&id) {
            Some(number) => {
                self.used[usize::from(number) - 1] = false;
                number
            }
            // Stop without a start in this part; fall back to number 1.
            None => 1,
        }
    }
}

// ---------------------------------------------------------------------------
// Timing helpers
// ---------------------------------------------------------------------------

fn gcd(a: i32, b: i32) -> i32 {
    if b == 0 { a.abs().max(1) } else { gcd(b, a % b) }
}

fn lcm(a: i32, b: i32) -> i32 {
    (a / gcd(a, b)).saturating_mul(b).abs().max(1)
}

/// Least common multiple of every timing denominator in the score.
fn compute_divisions(score: &Score) -> i32 {
    let mut divisions = 1i32;
    for part in &score.parts {
        for measure in &part.measures {
            for element in &measure.elements {
                divisions = lcm(divisions, *element.offset().denom());
            }
            for voice in &measure.voices {
                for event in &voice.events {
                    divisions = lcm(divisions, *event.offset().denom());
                    divisions = lcm(divisions, *event.duration().denom());
                }
            }
        }
    }
    divisions
}

/// Serialize a beat quantity as an exact division count.
fn div_string(beats: Beats, divisions: i32) -> String {
    (beats * divisions).to_integer().to_string()
}

/// Map a duration to a MusicXML note type and dot count.
fn note_type(duration: Beats) -> Option<(&'static str, u8)> {
    let bases: [(&'static str, Beats); 9] = [
        ("breve", divisi_model::beats(8, 1)),
        ("whole", divisi_model::beats(4, 1)),
        ("half", divisi_model::beats(2, 1)),
        ("quarter", divisi_model::beats(1, 1)),
        ("eighth", divisi_model::beats(1, 2)),
        ("16th", divisi_model::beats(1, 4)),
        ("32nd", divisi_model::beats(1, 8)),
        ("64th", divisi_model::beats(1, 16)),
        ("128th", divisi_model::beats(1, 32)),
    ];
    for (name, base) in bases {
        if duration == base {
            return Some((name, 0));
        }
        if duration == base * 3 / 2 {
            return Some((name, 1));
        }
        if duration == base * 7 / 4 {
            return Some((name, 2));
        }
    }
    None
}

fn text_element(w: &mut XmlWriter<'_>, name: &str, text: &str) -> MusicXmlResult<()> {
    w.write_event(Event::Start(BytesStart::new(name)))?;
    w.write_event(Event::Text(BytesText::new(text)))?;
    w.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}
