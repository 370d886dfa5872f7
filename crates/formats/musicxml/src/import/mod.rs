//! MusicXML (score-partwise) parsing into the internal model.
//!
//! The parser walks the document with a streaming `quick-xml` reader and
//! maintains a [`context::ParseContext`] for divisions, the measure cursor,
//! id allocation, and pending slur/tie/wedge starts.
//!
//! # Staff splitting
//!
//! Closed-score sources typically hold two staves in a single MusicXML
//! part, with notes routed by `<staff>` and the second staff's voices
//! numbered "5"/"6". Each staff becomes its own [`Part`] in the model, with
//! voice ids kept verbatim — this is what produces the canonical
//! part 0 / voices "1","2" and part 1 / voices "5","6" layout of a closed
//! SATB score. Sources that already use one part per staff pass through
//! unchanged.

pub(crate) mod context;

mod attributes;
mod direction;
mod note;

use divisi_model::{Beats, Clef, Measure, MeasureElement, NoteId, Part, Score, Spanner};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use tracing::{debug, warn};

use crate::error::{MusicXmlError, MusicXmlResult};
use context::ParseContext;

/// Parse a MusicXML score-partwise document.
pub fn parse_musicxml(input: &str) -> MusicXmlResult<Score> {
    Parser::new(input).parse()
}

// ---------------------------------------------------------------------------
// Measure assembly
// ---------------------------------------------------------------------------

/// One measure per staff of the current source part, filled as the measure's
/// children are parsed.
struct MeasureSet {
    number: u32,
    measures: Vec<Measure>,
}

impl MeasureSet {
    fn new(number: u32, staves: usize) -> Self {
        Self {
            number,
            measures: (0..staves.max(1)).map(|_| Measure::new(number)).collect(),
        }
    }

    /// The measure for a 1-based staff number, growing on demand.
    fn at(&mut self, staff: u8) -> &mut Measure {
        let index = usize::from(staff.max(1)) - 1;
        while self.measures.len() <= index {
            self.measures.push(Measure::new(self.number));
        }
        &mut self.measures[index]
    }

    /// Push an element onto every staff's measure.
    fn broadcast(&mut self, element: MeasureElement) {
        for measure in &mut self.measures {
            measure.elements.push(element.clone());
        }
    }
}

/// Accumulates the per-staff parts of one source part.
struct PartBuilder {
    staff_parts: Vec<Part>,
    initial_clefs: Vec<Option<Clef>>,
    measure_numbers: Vec<u32>,
    /// Declared staff count (`<staves>`), grown lazily.
    staves: usize,
}

impl PartBuilder {
    fn new() -> Self {
        Self {
            staff_parts: vec![Part::new()],
            initial_clefs: vec![None],
            measure_numbers: Vec::new(),
            staves: 1,
        }
    }

    fn ensure_staves(&mut self, staves: usize) {
        self.staves = self.staves.max(staves);
        while self.staff_parts.len() < self.staves {
            let mut part = Part::new();
            // Backfill measures for staves declared after the first measure
            // (unusual, but keeps all staff parts aligned).
            for number in &self.measure_numbers {
                part.measures.push(Measure::new(*number));
            }
            self.staff_parts.push(part);
            self.initial_clefs.push(None);
        }
    }

    fn push_measures(&mut self, mut set: MeasureSet) {
        self.ensure_staves(set.measures.len());
        while set.measures.len() < self.staff_parts.len() {
            set.measures.push(Measure::new(set.number));
        }
        for (part, measure) in self.staff_parts.iter_mut().zip(set.measures) {
            part.measures.push(measure);
        }
        self.measure_numbers.push(set.number);
    }
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Position of the note a following `<chord/>` note merges into.
struct PrevNote {
    staff: u8,
    voice: String,
    offset: Beats,
}

pub(crate) struct Parser<'a> {
    reader: Reader<&'a [u8]>,
    ctx: ParseContext,
    score: Score,
    /// `(id, name)` pairs from the part-list, in document order.
    part_names: Vec<(String, Option<String>)>,
    /// `(source part, staff)` → model part index.
    part_map: Vec<((usize, u8), usize)>,
    /// Note a `<chord/>` child refers back to, within the current measure.
    prev_note: Option<PrevNote>,
    /// Staff count of the current source part.
    staves: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        let mut reader = Reader::from_str(input);
        reader.config_mut().trim_text(true);
        Self {
            reader,
            ctx: ParseContext::new(),
            score: Score::new(),
            part_names: Vec::new(),
            part_map: Vec::new(),
            prev_note: None,
            staves: 1,
        }
    }

    fn parse(mut self) -> MusicXmlResult<Score> {
        let mut source_part = 0usize;
        loop {
            match self.reader.read_event()? {
                Event::Start(e) => match e.name().as_ref() {
                    b"score-partwise" => {}
                    b"score-timewise" => {
                        return Err(MusicXmlError::invalid_structure(
                            "score-timewise documents are not supported",
                            "document root",
                        ));
                    }
                    b"work" => self.parse_work()?,
                    b"movement-title" => {
                        let title = self.read_text(&e)?;
                        self.score.metadata.movement_title = Some(title);
                    }
                    b"identification" => self.parse_identification()?,
                    b"part-list" => self.parse_part_list()?,
                    b"part" => {
                        let id = self.attr(&e, b"id")?;
                        self.ctx.source_part = source_part;
                        self.parse_part(id)?;
                        source_part += 1;
                    }
                    _ => self.skip(&e)?,
                },
                Event::Eof => break,
                _ => {}
            }
        }

        if self.score.parts.is_empty() {
            return Err(MusicXmlError::invalid_structure(
                "document contains no parts",
                "score-partwise",
            ));
        }

        self.ctx.finish();
        self.resolve_wedge_intents();
        self.score.spanners = std::mem::take(&mut self.ctx.spanners);
        debug!(
            parts = self.score.parts.len(),
            spanners = self.score.spanners.len(),
            "MusicXML import complete"
        );
        Ok(self.score)
    }

    // -- header ----------------------------------------------------------

    fn parse_work(&mut self) -> MusicXmlResult<()> {
        loop {
            match self.reader.read_event()? {
                Event::Start(e) => match e.name().as_ref() {
                    b"work-title" => {
                        let title = self.read_text(&e)?;
                        self.score.metadata.work_title = Some(title);
                    }
                    _ => self.skip(&e)?,
                },
                Event::End(e) if e.name().as_ref() == b"work" => return Ok(()),
                Event::Eof => return Err(self.unexpected_eof("work")),
                _ => {}
            }
        }
    }

    fn parse_identification(&mut self) -> MusicXmlResult<()> {
        loop {
            match self.reader.read_event()? {
                Event::Start(e) => match e.name().as_ref() {
                    b"creator" => {
                        let kind = self.attr(&e, b"type")?;
                        let text = self.read_text(&e)?;
                        match kind.as_deref() {
                            Some("composer") => self.score.metadata.composer = Some(text),
                            Some("lyricist") | Some("poet") => {
                                self.score.metadata.lyricist = Some(text);
                            }
                            _ => {}
                        }
                    }
                    _ => self.skip(&e)?,
                },
                Event::End(e) if e.name().as_ref() == b"identification" => return Ok(()),
                Event::Eof => return Err(self.unexpected_eof("identification")),
                _ => {}
            }
        }
    }

    fn parse_part_list(&mut self) -> MusicXmlResult<()> {
        loop {
            match self.reader.read_event()? {
                Event::Start(e) => match e.name().as_ref() {
                    b"score-part" => {
                        let id = self.attr(&e, b"id")?.ok_or_else(|| {
                            MusicXmlError::missing_required("attribute", "id", "score-part")
                        })?;
                        let mut name = None;
                        loop {
                            match self.reader.read_event()? {
                                Event::Start(child) => match child.name().as_ref() {
                                    b"part-name" => name = Some(self.read_text(&child)?),
                                    _ => self.skip(&child)?,
                                },
                                Event::End(end) if end.name().as_ref() == b"score-part" => break,
                                Event::Eof => return Err(self.unexpected_eof("score-part")),
                                _ => {}
                            }
                        }
                        self.part_names.push((id, name));
                    }
                    _ => self.skip(&e)?,
                },
                Event::Empty(e) => {
                    if e.name().as_ref() == b"score-part"
                        && let Some(id) = self.attr(&e, b"id")?
                    {
                        self.part_names.push((id, None));
                    }
                }
                Event::End(e) if e.name().as_ref() == b"part-list" => return Ok(()),
                Event::Eof => return Err(self.unexpected_eof("part-list")),
                _ => {}
            }
        }
    }

    // -- parts and measures ------------------------------------------------

    fn parse_part(&mut self, id: Option<String>) -> MusicXmlResult<()> {
        let mut builder = PartBuilder::new();
        self.staves = 1;

        loop {
            match self.reader.read_event()? {
                Event::Start(e) => match e.name().as_ref() {
                    b"measure" => self.parse_measure(&e, &mut builder)?,
                    _ => self.skip(&e)?,
                },
                Event::End(e) if e.name().as_ref() == b"part" => break,
                Event::Eof => return Err(self.unexpected_eof("part")),
                _ => {}
            }
        }

        // Assemble one model part per staff.
        let source_part = self.ctx.source_part;
        let name = id
            .as_ref()
            .and_then(|id| {
                self.part_names
                    .iter()
                    .find(|(candidate, _)| candidate == id)
            })
            .and_then(|(_, name)| name.clone());
        let base = self.score.parts.len();
        let staff_count = builder.staff_parts.len();
        for (index, mut part) in builder.staff_parts.into_iter().enumerate() {
            let staff = index as u8 + 1;
            part.id = id.as_ref().map(|id| {
                if index == 0 {
                    id.clone()
                } else {
                    format!("{id}-staff{staff}")
                }
            });
            part.name = name.clone();
            part.clef = builder.initial_clefs[index];
            self.part_map.push(((source_part, staff), base + index));
            self.score.parts.push(part);
        }
        debug!(source_part, staff_count, "source part assembled");
        Ok(())
    }

    fn parse_measure(
        &mut self,
        start: &BytesStart<'_>,
        builder: &mut PartBuilder,
    ) -> MusicXmlResult<()> {
        let number = match self.attr(start, b"number")? {
            Some(text) => text
                .parse::<u32>()
                .unwrap_or_else(|_| builder.measure_numbers.last().map_or(1, |n| n + 1)),
            None => builder.measure_numbers.last().map_or(1, |n| n + 1),
        };
        self.ctx.measure_number = number;
        self.ctx.cursor = 0;
        self.prev_note = None;

        let mut set = MeasureSet::new(number, self.staves);

        loop {
            match self.reader.read_event()? {
                Event::Start(e) => match e.name().as_ref() {
                    b"attributes" => self.parse_attributes(&mut set, builder)?,
                    b"note" => self.parse_note(&mut set)?,
                    b"backup" => {
                        let duration = self.parse_duration_child(b"backup")?;
                        self.ctx.cursor -= duration;
                    }
                    b"forward" => {
                        let duration = self.parse_duration_child(b"forward")?;
                        self.ctx.cursor += duration;
                    }
                    b"direction" => self.parse_direction(&e, &mut set)?,
                    b"print" => {
                        self.parse_print(&e, &mut set)?;
                        self.reader.read_to_end(e.name())?;
                    }
                    b"sound" => {
                        self.parse_measure_sound(&e, &mut set)?;
                        self.reader.read_to_end(e.name())?;
                    }
                    _ => self.skip(&e)?,
                },
                Event::Empty(e) => match e.name().as_ref() {
                    b"print" => self.parse_print(&e, &mut set)?,
                    b"sound" => self.parse_measure_sound(&e, &mut set)?,
                    _ => {}
                },
                Event::End(e) if e.name().as_ref() == b"measure" => break,
                Event::Eof => return Err(self.unexpected_eof("measure")),
                _ => {}
            }
        }

        builder.push_measures(set);
        Ok(())
    }

    fn parse_print(&mut self, e: &BytesStart<'_>, set: &mut MeasureSet) -> MusicXmlResult<()> {
        use divisi_model::{BreakKind, LayoutBreak};
        if self.attr(e, b"new-system")?.as_deref() == Some("yes") {
            set.at(1).elements.push(MeasureElement::Break(LayoutBreak {
                kind: BreakKind::System,
            }));
        }
        if self.attr(e, b"new-page")?.as_deref() == Some("yes") {
            set.at(1).elements.push(MeasureElement::Break(LayoutBreak {
                kind: BreakKind::Page,
            }));
        }
        Ok(())
    }

    /// A `<sound tempo="…">` appearing directly in a measure.
    fn parse_measure_sound(
        &mut self,
        e: &BytesStart<'_>,
        set: &mut MeasureSet,
    ) -> MusicXmlResult<()> {
        use divisi_model::TempoMark;
        if let Some(tempo) = self.attr(e, b"tempo")? {
            let per_minute = tempo.parse::<f32>().ok().map(|t| t.round() as u32);
            if per_minute.is_some() {
                let offset = self.ctx.cursor_beats();
                set.at(1).elements.push(MeasureElement::Tempo(TempoMark {
                    offset,
                    beat_unit: None,
                    per_minute,
                    text: None,
                }));
            }
        }
        Ok(())
    }

    /// Read the `<duration>` child of `<backup>`/`<forward>`.
    fn parse_duration_child(&mut self, parent: &'static [u8]) -> MusicXmlResult<i32> {
        let mut duration = None;
        loop {
            match self.reader.read_event()? {
                Event::Start(e) => {
                    if e.name().as_ref() == b"duration" {
                        let text = self.read_text(&e)?;
                        duration = Some(self.parse_int(&text, "duration")?);
                    } else {
                        self.skip(&e)?;
                    }
                }
                Event::End(e) if e.name().as_ref() == parent => break,
                Event::Eof => return Err(self.unexpected_eof("backup/forward")),
                _ => {}
            }
        }
        duration.ok_or_else(|| {
            MusicXmlError::missing_required(
                "element",
                "duration",
                format!("measure {}", self.ctx.measure_number),
            )
        })
    }

    // -- wedge resolution --------------------------------------------------

    fn model_part_index(&self, source_part: usize, staff: u8) -> Option<usize> {
        self.part_map
            .iter()
            .find(|((part, s), _)| *part == source_part && *s == staff)
            .map(|(_, index)| *index)
    }

    /// Resolve delimited wedges to endpoint notes in the assembled parts.
    ///
    /// The start endpoint is the first note at or after the wedge's opening
    /// position; the end endpoint is the last note at or before its closing
    /// position. Candidates are ordered by (offset, voice order, event
    /// order), restricted to the direction's voice when it named one.
    fn resolve_wedge_intents(&mut self) {
        let intents = std::mem::take(&mut self.ctx.wedge_intents);
        for intent in intents {
            let Some(part_index) = self.model_part_index(intent.source_part, intent.staff)
            else {
                warn!(staff = intent.staff, "wedge on unknown staff; dropping");
                continue;
            };
            let part = &self.score.parts[part_index];
            let start = wedge_endpoint(
                part,
                intent.start_measure,
                intent.voice.as_deref(),
                |offset| offset >= intent.start_offset,
                false,
            );
            let end = wedge_endpoint(
                part,
                intent.end_measure,
                intent.voice.as_deref(),
                |offset| offset <= intent.end_offset,
                true,
            );
            match (start, end) {
                (Some(start), Some(end)) if start != end => {
                    let id = self.ctx.alloc_spanner_id();
                    self.ctx
                        .spanners
                        .push(Spanner::new(id, intent.kind, vec![start, end]));
                }
                _ => {
                    warn!(
                        measure = intent.start_measure,
                        "wedge with no usable endpoint notes; dropping"
                    );
                }
            }
        }
    }

    // -- low-level helpers -------------------------------------------------

    pub(crate) fn attr(
        &self,
        e: &BytesStart<'_>,
        name: &[u8],
    ) -> MusicXmlResult<Option<String>> {
        for attr in e.attributes() {
            let attr = attr?;
            if attr.key.as_ref() == name {
                return Ok(Some(attr.unescape_value()?.into_owned()));
            }
        }
        Ok(None)
    }

    /// Read the text content of the element whose start tag was just seen.
    pub(crate) fn read_text(&mut self, e: &BytesStart<'_>) -> MusicXmlResult<String> {
        let text = self.reader.read_text(e.name())?;
        Ok(text.trim().to_string())
    }

    /// Skip the element whose start tag was just seen, including children.
    pub(crate) fn skip(&mut self, e: &BytesStart<'_>) -> MusicXmlResult<()> {
        self.reader.read_to_end(e.name())?;
        Ok(())
    }

    pub(crate) fn parse_int(&self, text: &str, kind: &str) -> MusicXmlResult<i32> {
        text.trim().parse::<i32>().map_err(|_| {
            MusicXmlError::invalid_value(
                kind,
                text,
                format!("measure {}", self.ctx.measure_number),
            )
        })
    }

    pub(crate) fn unexpected_eof(&self, location: &str) -> MusicXmlError {
        MusicXmlError::invalid_structure("unexpected end of document", location)
    }
}

/// Pick a wedge endpoint note in one measure of a part.
///
/// `pick_last` selects the latest matching position instead of the earliest.
fn wedge_endpoint(
    part: &Part,
    measure_number: u32,
    voice: Option<&str>,
    in_range: impl Fn(Beats) -> bool,
    pick_last: bool,
) -> Option<NoteId> {
    let measure = part.measure(measure_number)?;
    let mut candidates: Vec<(Beats, usize, usize, NoteId)> = Vec::new();
    for (voice_index, v) in measure.voices.iter().enumerate() {
        if voice.is_some_and(|wanted| wanted != v.id) {
            continue;
        }
        for (event_index, event) in v.events.iter().enumerate() {
            let Some(id) = event.note_id() else { continue };
            if event.is_grace() || !in_range(event.offset()) {
                continue;
            }
            candidates.push((event.offset(), voice_index, event_index, id));
        }
    }
    candidates.sort();
    if pick_last {
        // Latest offset; first voice wins a tie.
        let last_offset = candidates.last()?.0;
        candidates
            .iter()
            .find(|(offset, ..)| *offset == last_offset)
            .map(|(.., id)| *id)
    } else {
        candidates.first().map(|(.., id)| *id)
    }
}
