//! `<note>` parsing: pitch, rests, chords, lyrics, ties, slurs.

use divisi_model::{Chord, Lyric, Note, Pitch, Rest, Step, Syllabic, Voice, VoiceEvent, zero};
use quick_xml::events::{BytesStart, Event};
use tracing::warn;

use super::{MeasureSet, Parser, PrevNote};
use crate::error::{MusicXmlError, MusicXmlResult};

/// Everything collected from one `<note>` element before model assembly.
#[derive(Default)]
struct NoteFields {
    grace: bool,
    chord: bool,
    rest: bool,
    whole_measure_rest: bool,
    pitch: Option<Pitch>,
    duration: i32,
    voice: Option<String>,
    staff: u8,
    lyrics: Vec<Lyric>,
    tie_start: bool,
    tie_stop: bool,
    slur_starts: Vec<u8>,
    slur_stops: Vec<u8>,
}

impl<'a> Parser<'a> {
    pub(super) fn parse_note(&mut self, set: &mut MeasureSet) -> MusicXmlResult<()> {
        let fields = self.collect_note_fields()?;
        let location = format!("note in measure {}", self.ctx.measure_number);

        let voice = fields.voice.clone().unwrap_or_else(|| "1".to_string());
        let staff = fields.staff.max(1);
        let duration = if fields.grace {
            zero()
        } else {
            self.ctx.beats_of(fields.duration)
        };

        if fields.rest {
            let offset = self.ctx.cursor_beats();
            let rest = Rest {
                offset,
                duration,
                whole_measure: fields.whole_measure_rest,
            };
            voice_of(set, staff, &voice).events.push(VoiceEvent::Rest(rest));
            if !fields.grace {
                self.ctx.cursor += fields.duration;
            }
            self.prev_note = None;
            return Ok(());
        }

        let pitch = fields
            .pitch
            .ok_or_else(|| MusicXmlError::missing_required("element", "pitch", &location))?;

        if fields.chord {
            return self.merge_chord_note(set, pitch, fields, location);
        }

        let id = self.ctx.alloc_note_id();
        let offset = self.ctx.cursor_beats();
        let mut note = Note::new(id, pitch, offset, duration);
        note.grace = fields.grace;
        note.lyrics = fields.lyrics.into_iter().collect();
        voice_of(set, staff, &voice).events.push(VoiceEvent::Note(note));

        // Spanner bookkeeping. Open slurs of this voice pick the note up as
        // an interior member before any stop/start on the note itself.
        if !fields.grace {
            self.ctx.extend_open_slurs(&voice, id);
        }
        for number in fields.slur_stops {
            self.ctx.stop_slur(number, id);
        }
        for number in fields.slur_starts {
            self.ctx.start_slur(number, &voice, id);
        }
        if fields.tie_stop {
            self.ctx.stop_tie(&voice, pitch, id);
        }
        if fields.tie_start {
            self.ctx.start_tie(&voice, pitch, id);
        }

        self.prev_note = Some(PrevNote {
            staff,
            voice,
            offset,
        });
        if !fields.grace {
            self.ctx.cursor += fields.duration;
        }
        Ok(())
    }

    /// Fold a `<chord/>`-flagged note into the event that opened the chord.
    fn merge_chord_note(
        &mut self,
        set: &mut MeasureSet,
        pitch: Pitch,
        fields: NoteFields,
        location: String,
    ) -> MusicXmlResult<()> {
        let Some(prev) = self.prev_note.take() else {
            return Err(MusicXmlError::invalid_structure(
                "chord note without a preceding note",
                location,
            ));
        };

        let events = &mut voice_of(set, prev.staff, &prev.voice).events;
        let mut merged = match events.pop() {
            Some(VoiceEvent::Note(note)) => Chord {
                id: note.id,
                pitches: [note.pitch, pitch].into_iter().collect(),
                offset: note.offset,
                duration: note.duration,
                lyrics: note.lyrics,
                grace: note.grace,
            },
            Some(VoiceEvent::Chord(mut chord)) => {
                chord.pitches.push(pitch);
                chord
            }
            _ => {
                return Err(MusicXmlError::invalid_structure(
                    "chord note follows a rest",
                    location,
                ));
            }
        };
        for lyric in fields.lyrics {
            merged.lyrics.push(lyric);
        }
        let id = merged.id;
        events.push(VoiceEvent::Chord(merged));

        // Tie flags on a chord member use the member's pitch and the
        // chord's event id.
        if fields.tie_stop {
            self.ctx.stop_tie(&prev.voice, pitch, id);
        }
        if fields.tie_start {
            self.ctx.start_tie(&prev.voice, pitch, id);
        }
        self.prev_note = Some(prev);
        Ok(())
    }

    fn collect_note_fields(&mut self) -> MusicXmlResult<NoteFields> {
        let mut fields = NoteFields {
            staff: 1,
            ..NoteFields::default()
        };
        loop {
            match self.reader.read_event()? {
                Event::Start(e) => match e.name().as_ref() {
                    b"pitch" => fields.pitch = Some(self.parse_pitch(&e)?),
                    b"rest" => {
                        fields.rest = true;
                        fields.whole_measure_rest =
                            self.attr(&e, b"measure")?.as_deref() == Some("yes");
                        self.skip(&e)?;
                    }
                    b"duration" => {
                        let text = self.read_text(&e)?;
                        fields.duration = self.parse_int(&text, "duration")?;
                    }
                    b"voice" => fields.voice = Some(self.read_text(&e)?),
                    b"staff" => {
                        let text = self.read_text(&e)?;
                        fields.staff = self.parse_int(&text, "staff")?.max(1) as u8;
                    }
                    b"grace" => {
                        fields.grace = true;
                        self.skip(&e)?;
                    }
                    b"tie" => {
                        self.note_tie_attr(&e, &mut fields)?;
                        self.skip(&e)?;
                    }
                    b"lyric" => {
                        if let Some(lyric) = self.parse_lyric(&e)? {
                            fields.lyrics.push(lyric);
                        }
                    }
                    b"notations" => self.parse_notations(&mut fields)?,
                    _ => self.skip(&e)?,
                },
                Event::Empty(e) => match e.name().as_ref() {
                    b"chord" => fields.chord = true,
                    b"grace" => fields.grace = true,
                    b"rest" => {
                        fields.rest = true;
                        fields.whole_measure_rest =
                            self.attr(&e, b"measure")?.as_deref() == Some("yes");
                    }
                    b"tie" => self.note_tie_attr(&e, &mut fields)?,
                    _ => {}
                },
                Event::End(e) if e.name().as_ref() == b"note" => break,
                Event::Eof => return Err(self.unexpected_eof("note")),
                _ => {}
            }
        }
        Ok(fields)
    }

    fn note_tie_attr(
        &self,
        e: &BytesStart<'_>,
        fields: &mut NoteFields,
    ) -> MusicXmlResult<()> {
        match self.attr(e, b"type")?.as_deref() {
            Some("start") => fields.tie_start = true,
            Some("stop") => fields.tie_stop = true,
            other => warn!(kind = ?other, "tie without start/stop type; ignoring"),
        }
        Ok(())
    }

    fn parse_pitch(&mut self, start: &BytesStart<'_>) -> MusicXmlResult<Pitch> {
        let location = format!("pitch in measure {}", self.ctx.measure_number);
        let mut step = None;
        let mut alter = None;
        let mut octave = None;
        loop {
            match self.reader.read_event()? {
                Event::Start(e) => match e.name().as_ref() {
                    b"step" => {
                        let text = self.read_text(&e)?;
                        step = text.chars().next().and_then(Step::from_char);
                        if step.is_none() {
                            return Err(MusicXmlError::invalid_value("step", text, location));
                        }
                    }
                    b"alter" => {
                        let text = self.read_text(&e)?;
                        // Microtonal alterations round to semitones.
                        let value = text.trim().parse::<f32>().map_err(|_| {
                            MusicXmlError::invalid_value("alter", &text, &location)
                        })?;
                        alter = Some(value.round() as i8);
                    }
                    b"octave" => {
                        let text = self.read_text(&e)?;
                        octave = Some(self.parse_int(&text, "octave")? as u8);
                    }
                    _ => self.skip(&e)?,
                },
                Event::End(e) if e.name() == start.name() => break,
                Event::Eof => return Err(self.unexpected_eof("pitch")),
                _ => {}
            }
        }
        let step = step
            .ok_or_else(|| MusicXmlError::missing_required("element", "step", &location))?;
        let octave = octave
            .ok_or_else(|| MusicXmlError::missing_required("element", "octave", location))?;
        Ok(Pitch {
            step,
            alter: alter.filter(|a| *a != 0),
            octave,
        })
    }

    fn parse_lyric(&mut self, start: &BytesStart<'_>) -> MusicXmlResult<Option<Lyric>> {
        let line = self
            .attr(start, b"number")?
            .and_then(|n| n.parse::<u8>().ok())
            .unwrap_or(1);
        let mut syllabic = Syllabic::Single;
        let mut text = String::new();
        loop {
            match self.reader.read_event()? {
                Event::Start(e) => match e.name().as_ref() {
                    b"syllabic" => {
                        let value = self.read_text(&e)?;
                        syllabic = Syllabic::parse(&value).ok_or_else(|| {
                            MusicXmlError::invalid_value(
                                "syllabic",
                                value,
                                format!("lyric in measure {}", self.ctx.measure_number),
                            )
                        })?;
                    }
                    b"text" => text.push_str(&self.read_text(&e)?),
                    // Elided syllables collapse into one lyric text.
                    b"elision" => {
                        let elision = self.read_text(&e)?;
                        text.push_str(if elision.is_empty() { " " } else { &elision });
                    }
                    _ => self.skip(&e)?,
                },
                Event::End(e) if e.name() == start.name() => break,
                Event::Eof => return Err(self.unexpected_eof("lyric")),
                _ => {}
            }
        }
        if text.is_empty() {
            return Ok(None);
        }
        Ok(Some(Lyric::on_line(text, syllabic, line)))
    }

    fn parse_notations(&mut self, fields: &mut NoteFields) -> MusicXmlResult<()> {
        loop {
            match self.reader.read_event()? {
                Event::Start(e) => {
                    if matches!(e.name().as_ref(), b"slur" | b"tied") {
                        self.notation_spanner(&e, fields)?;
                    }
                    self.skip(&e)?;
                }
                Event::Empty(e) => {
                    if matches!(e.name().as_ref(), b"slur" | b"tied") {
                        self.notation_spanner(&e, fields)?;
                    }
                }
                Event::End(e) if e.name().as_ref() == b"notations" => return Ok(()),
                Event::Eof => return Err(self.unexpected_eof("notations")),
                _ => {}
            }
        }
    }

    fn notation_spanner(
        &self,
        e: &BytesStart<'_>,
        fields: &mut NoteFields,
    ) -> MusicXmlResult<()> {
        let is_slur = e.name().as_ref() == b"slur";
        let kind = self.attr(e, b"type")?;
        let number = self
            .attr(e, b"number")?
            .and_then(|n| n.parse::<u8>().ok())
            .unwrap_or(1);
        match (is_slur, kind.as_deref()) {
            (true, Some("start")) => fields.slur_starts.push(number),
            (true, Some("stop")) => fields.slur_stops.push(number),
            (true, _) => {} // "continue" needs no bookkeeping
            // <tied> duplicates <tie>; flags are idempotent, so a note
            // carrying both is not double-counted.
            (false, Some("start")) => fields.tie_start = true,
            (false, Some("stop")) => fields.tie_stop = true,
            (false, _) => {}
        }
        Ok(())
    }
}

/// Find or create the voice `id` in the measure for `staff`.
fn voice_of<'m>(set: &'m mut MeasureSet, staff: u8, id: &str) -> &'m mut Voice {
    let measure = set.at(staff);
    if let Some(index) = measure.voices.iter().position(|v| v.id == id) {
        &mut measure.voices[index]
    } else {
        measure.voices.push(Voice::new(id));
        measure.voices.last_mut().expect("just pushed")
    }
}
