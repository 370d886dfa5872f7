//! `<attributes>` parsing: divisions, key, time, staves, clefs.

use divisi_model::{Clef, KeySignature, MeasureElement, TimeSignature};
use quick_xml::events::{BytesStart, Event};

use super::{MeasureSet, Parser, PartBuilder};
use crate::error::{MusicXmlError, MusicXmlResult};

impl<'a> Parser<'a> {
    pub(super) fn parse_attributes(
        &mut self,
        set: &mut MeasureSet,
        builder: &mut PartBuilder,
    ) -> MusicXmlResult<()> {
        loop {
            match self.reader.read_event()? {
                Event::Start(e) => match e.name().as_ref() {
                    b"divisions" => {
                        let text = self.read_text(&e)?;
                        let divisions = self.parse_int(&text, "divisions")?;
                        if divisions <= 0 {
                            return Err(MusicXmlError::invalid_value(
                                "divisions",
                                text,
                                format!("measure {}", self.ctx.measure_number),
                            ));
                        }
                        self.ctx.divisions = divisions;
                    }
                    b"key" => {
                        let fifths = self.parse_key(&e)?;
                        set.broadcast(MeasureElement::Key(KeySignature { fifths }));
                    }
                    b"time" => {
                        let time = self.parse_time(&e)?;
                        set.broadcast(MeasureElement::Time(time));
                    }
                    b"staves" => {
                        let text = self.read_text(&e)?;
                        let staves = self.parse_int(&text, "staves")?.max(1) as usize;
                        self.staves = staves;
                        builder.ensure_staves(staves);
                        set.at(staves as u8);
                    }
                    b"clef" => self.parse_clef(&e, set, builder)?,
                    _ => self.skip(&e)?,
                },
                Event::End(e) if e.name().as_ref() == b"attributes" => return Ok(()),
                Event::Eof => return Err(self.unexpected_eof("attributes")),
                _ => {}
            }
        }
    }

    fn parse_key(&mut self, start: &BytesStart<'_>) -> MusicXmlResult<i8> {
        let mut fifths = 0i8;
        loop {
            match self.reader.read_event()? {
                Event::Start(e) => {
                    if e.name().as_ref() == b"fifths" {
                        let text = self.read_text(&e)?;
                        fifths = self.parse_int(&text, "fifths")? as i8;
                    } else {
                        self.skip(&e)?;
                    }
                }
                Event::End(e) if e.name() == start.name() => return Ok(fifths),
                Event::Eof => return Err(self.unexpected_eof("key")),
                _ => {}
            }
        }
    }

    fn parse_time(&mut self, start: &BytesStart<'_>) -> MusicXmlResult<TimeSignature> {
        let mut beats = None;
        let mut beat_type = None;
        loop {
            match self.reader.read_event()? {
                Event::Start(e) => match e.name().as_ref() {
                    b"beats" => {
                        let text = self.read_text(&e)?;
                        beats = Some(self.parse_int(&text, "beats")? as u8);
                    }
                    b"beat-type" => {
                        let text = self.read_text(&e)?;
                        beat_type = Some(self.parse_int(&text, "beat-type")? as u8);
                    }
                    _ => self.skip(&e)?,
                },
                Event::End(e) if e.name() == start.name() => break,
                Event::Eof => return Err(self.unexpected_eof("time")),
                _ => {}
            }
        }
        let location = format!("measure {}", self.ctx.measure_number);
        let beats = beats
            .ok_or_else(|| MusicXmlError::missing_required("element", "beats", &location))?;
        let beat_type = beat_type
            .ok_or_else(|| MusicXmlError::missing_required("element", "beat-type", location))?;
        Ok(TimeSignature::new(beats, beat_type))
    }

    fn parse_clef(
        &mut self,
        start: &BytesStart<'_>,
        set: &mut MeasureSet,
        builder: &mut PartBuilder,
    ) -> MusicXmlResult<()> {
        let staff = self
            .attr(start, b"number")?
            .and_then(|n| n.parse::<u8>().ok())
            .unwrap_or(1);

        let mut sign = 'G';
        let mut line = 0u8;
        let mut octave_change = 0i8;
        loop {
            match self.reader.read_event()? {
                Event::Start(e) => match e.name().as_ref() {
                    b"sign" => {
                        let text = self.read_text(&e)?;
                        sign = text.chars().next().unwrap_or('G');
                    }
                    b"line" => {
                        let text = self.read_text(&e)?;
                        line = self.parse_int(&text, "clef line")? as u8;
                    }
                    b"clef-octave-change" => {
                        let text = self.read_text(&e)?;
                        octave_change = self.parse_int(&text, "clef-octave-change")? as i8;
                    }
                    _ => self.skip(&e)?,
                },
                Event::End(e) if e.name() == start.name() => break,
                Event::Eof => return Err(self.unexpected_eof("clef")),
                _ => {}
            }
        }

        let clef = clef_from_parts(sign, line, octave_change);
        let index = usize::from(staff.max(1)) - 1;
        builder.ensure_staves(usize::from(staff.max(1)));

        // The clef at the very start of a part becomes the part's
        // predominant clef; anything later is a mid-score clef change.
        if builder.measure_numbers.is_empty()
            && self.ctx.cursor == 0
            && builder.initial_clefs[index].is_none()
        {
            builder.initial_clefs[index] = Some(clef);
        } else {
            let offset = self.ctx.cursor_beats();
            set.at(staff)
                .elements
                .push(MeasureElement::Clef { clef, offset });
        }
        Ok(())
    }
}

/// Map MusicXML sign/line/octave-change to a named clef.
fn clef_from_parts(sign: char, line: u8, octave_change: i8) -> Clef {
    match (sign, line, octave_change) {
        ('G', 2, 0) | ('G', 0, 0) => Clef::Treble,
        ('G', 2, -1) | ('G', 0, -1) => Clef::TrebleDown8,
        ('F', 4, 0) | ('F', 0, 0) => Clef::Bass,
        ('C', 3, 0) => Clef::Alto,
        ('C', 4, 0) => Clef::Tenor,
        _ => Clef::Other {
            sign,
            line,
            octave_change,
        },
    }
}
