//! `<direction>` parsing: dynamics, wedges, metronome/tempo, rehearsal.

use divisi_model::{Dynamic, MeasureElement, Placement, RehearsalMark, SpannerKind, TempoMark};
use quick_xml::events::{BytesStart, Event};
use tracing::debug;

use super::{MeasureSet, Parser};
use crate::error::MusicXmlResult;

/// One wedge reference inside a direction.
struct WedgeRef {
    kind: Option<SpannerKind>,
    number: u8,
    stop: bool,
}

#[derive(Default)]
struct DirectionFields {
    dynamics: Vec<String>,
    wedges: Vec<WedgeRef>,
    metronome: Option<(Option<String>, Option<u32>)>,
    rehearsal: Option<String>,
    words: Vec<String>,
    sound_tempo: Option<u32>,
    offset_divisions: i32,
    staff: u8,
    voice: Option<String>,
}

impl<'a> Parser<'a> {
    pub(super) fn parse_direction(
        &mut self,
        start: &BytesStart<'_>,
        set: &mut MeasureSet,
    ) -> MusicXmlResult<()> {
        let placement = match self.attr(start, b"placement")?.as_deref() {
            Some("above") => Some(Placement::Above),
            Some("below") => Some(Placement::Below),
            _ => None,
        };

        let mut fields = DirectionFields {
            staff: 1,
            ..DirectionFields::default()
        };

        loop {
            match self.reader.read_event()? {
                Event::Start(e) => match e.name().as_ref() {
                    b"direction-type" => self.parse_direction_type(&mut fields)?,
                    b"offset" => {
                        let text = self.read_text(&e)?;
                        fields.offset_divisions = self.parse_int(&text, "offset")?;
                    }
                    b"staff" => {
                        let text = self.read_text(&e)?;
                        fields.staff = self.parse_int(&text, "staff")?.max(1) as u8;
                    }
                    b"voice" => fields.voice = Some(self.read_text(&e)?),
                    b"sound" => {
                        self.direction_sound(&e, &mut fields)?;
                        self.skip(&e)?;
                    }
                    _ => self.skip(&e)?,
                },
                Event::Empty(e) if e.name().as_ref() == b"sound" => {
                    self.direction_sound(&e, &mut fields)?;
                }
                Event::End(e) if e.name() == start.name() => break,
                Event::Eof => return Err(self.unexpected_eof("direction")),
                _ => {}
            }
        }

        // Negative offsets cannot reach before the barline.
        let position = (self.ctx.cursor + fields.offset_divisions).max(0);
        let offset = self.ctx.beats_of(position);
        let staff = fields.staff;

        for value in fields.dynamics {
            set.at(staff).elements.push(MeasureElement::Dynamic(Dynamic {
                value,
                offset,
                placement,
                staff: None,
            }));
        }

        for wedge in fields.wedges {
            if wedge.stop {
                self.ctx.stop_wedge(wedge.number, offset);
            } else if let Some(kind) = wedge.kind {
                self.ctx
                    .start_wedge(wedge.number, kind, staff, fields.voice.clone(), offset);
            }
        }

        if let Some((beat_unit, per_minute)) = fields.metronome {
            set.at(staff).elements.push(MeasureElement::Tempo(TempoMark {
                offset,
                beat_unit,
                per_minute,
                text: None,
            }));
        } else if let Some(tempo) = fields.sound_tempo {
            set.at(staff).elements.push(MeasureElement::Tempo(TempoMark {
                offset,
                beat_unit: None,
                per_minute: Some(tempo),
                text: None,
            }));
        }

        if let Some(text) = fields.rehearsal {
            set.at(staff)
                .elements
                .push(MeasureElement::Rehearsal(RehearsalMark { text }));
        }

        for text in fields.words {
            debug!(text, "dropping free-text direction");
        }

        Ok(())
    }

    fn parse_direction_type(&mut self, fields: &mut DirectionFields) -> MusicXmlResult<()> {
        loop {
            match self.reader.read_event()? {
                Event::Start(e) => match e.name().as_ref() {
                    b"dynamics" => self.parse_dynamics(&mut fields.dynamics)?,
                    b"wedge" => {
                        let wedge = self.wedge_ref(&e)?;
                        fields.wedges.push(wedge);
                        self.skip(&e)?;
                    }
                    b"metronome" => fields.metronome = Some(self.parse_metronome(&e)?),
                    b"rehearsal" => fields.rehearsal = Some(self.read_text(&e)?),
                    b"words" => fields.words.push(self.read_text(&e)?),
                    _ => self.skip(&e)?,
                },
                Event::Empty(e) => {
                    if e.name().as_ref() == b"wedge" {
                        let wedge = self.wedge_ref(&e)?;
                        fields.wedges.push(wedge);
                    }
                }
                Event::End(e) if e.name().as_ref() == b"direction-type" => return Ok(()),
                Event::Eof => return Err(self.unexpected_eof("direction-type")),
                _ => {}
            }
        }
    }

    /// `<dynamics>` children are empty elements named after the mark
    /// (`<f/>`, `<p/>`, `<sfz/>`); `<other-dynamics>` carries text.
    fn parse_dynamics(&mut self, out: &mut Vec<String>) -> MusicXmlResult<()> {
        loop {
            match self.reader.read_event()? {
                Event::Empty(e) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    out.push(name);
                }
                Event::Start(e) => {
                    if e.name().as_ref() == b"other-dynamics" {
                        let text = self.read_text(&e)?;
                        if !text.is_empty() {
                            out.push(text);
                        }
                    } else {
                        let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                        out.push(name);
                        self.skip(&e)?;
                    }
                }
                Event::End(e) if e.name().as_ref() == b"dynamics" => return Ok(()),
                Event::Eof => return Err(self.unexpected_eof("dynamics")),
                _ => {}
            }
        }
    }

    fn wedge_ref(&self, e: &BytesStart<'_>) -> MusicXmlResult<WedgeRef> {
        let kind = match self.attr(e, b"type")?.as_deref() {
            Some("crescendo") => Some(SpannerKind::Crescendo),
            Some("diminuendo") => Some(SpannerKind::Diminuendo),
            _ => None,
        };
        let stop = self.attr(e, b"type")?.as_deref() == Some("stop");
        let number = self
            .attr(e, b"number")?
            .and_then(|n| n.parse::<u8>().ok())
            .unwrap_or(1);
        Ok(WedgeRef { kind, number, stop })
    }

    fn parse_metronome(
        &mut self,
        start: &BytesStart<'_>,
    ) -> MusicXmlResult<(Option<String>, Option<u32>)> {
        let mut beat_unit = None;
        let mut per_minute = None;
        loop {
            match self.reader.read_event()? {
                Event::Start(e) => match e.name().as_ref() {
                    b"beat-unit" => beat_unit = Some(self.read_text(&e)?),
                    b"per-minute" => {
                        let text = self.read_text(&e)?;
                        per_minute = text.parse::<f32>().ok().map(|v| v.round() as u32);
                    }
                    _ => self.skip(&e)?,
                },
                Event::End(e) if e.name() == start.name() => {
                    return Ok((beat_unit, per_minute));
                }
                Event::Eof => return Err(self.unexpected_eof("metronome")),
                _ => {}
            }
        }
    }

    fn direction_sound(
        &self,
        e: &BytesStart<'_>,
        fields: &mut DirectionFields,
    ) -> MusicXmlResult<()> {
        if let Some(tempo) = self.attr(e, b"tempo")? {
            fields.sound_tempo = tempo.parse::<f32>().ok().map(|t| t.round() as u32);
        }
        Ok(())
    }
}
