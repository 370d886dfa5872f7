//! Layout and tempo unification.
//!
//! System breaks, page breaks, tempo marks, and rehearsal marks have no note
//! endpoints, so propagation is a measure-indexed insertion: any such mark
//! present in one derived score is copied to the same measure of the other
//! three, with duplicate suppression by exact equality.

use std::collections::BTreeSet;

use divisi_model::{MeasureElement, Score};
use tracing::debug;

use crate::error::SplitError;

fn is_layout_mark(element: &MeasureElement) -> bool {
    matches!(
        element,
        MeasureElement::Break(_) | MeasureElement::Tempo(_) | MeasureElement::Rehearsal(_)
    )
}

/// Propagate layout and tempo marks across the four derived scores.
pub(crate) fn unify_layout(scores: &mut [Score; 4]) -> Result<(), SplitError> {
    let measure_numbers: BTreeSet<u32> = scores
        .iter()
        .flat_map(|s| s.parts[0].measures.iter().map(|m| m.number))
        .collect();

    let mut inserted = 0usize;

    for number in measure_numbers {
        // Distinct marks in this measure, in score order then element order.
        let mut marks: Vec<MeasureElement> = Vec::new();
        for score in scores.iter() {
            if let Some(measure) = score.parts[0].measure(number) {
                for element in measure.elements.iter().filter(|e| is_layout_mark(e)) {
                    if !marks.contains(element) {
                        marks.push(element.clone());
                    }
                }
            }
        }

        for mark in marks {
            for score in scores.iter_mut() {
                let Some(measure) = score.parts[0].measure_mut(number) else {
                    continue;
                };
                if !measure.elements.contains(&mark) {
                    measure.elements.push(mark.clone());
                    inserted += 1;
                }
            }
        }
    }

    debug!(inserted, "layout unification complete");
    Ok(())
}
