//! Dynamics unification.
//!
//! Engravers of closed scores commonly write a dynamic once, on the Soprano
//! line, and mean it for everyone. The rules, applied per (measure, offset):
//!
//! - system-wide: an identical mark in two or more derived scores is copied
//!   to the ones that lack it;
//! - soprano-lead: a mark in Soprano alone, with no other voice marked at
//!   that position, is copied to Alto, Tenor, and Bass;
//! - voice-specific: differing marks at the same position are all
//!   preserved, and a voice that already carries any dynamic at the
//!   position is never touched.
//!
//! Offsets are exact rationals, so position comparison needs no tolerance.

use std::collections::BTreeSet;

use divisi_model::{Beats, Dynamic, MeasureElement, Score};
use indexmap::IndexMap;
use tracing::debug;

use crate::error::SplitError;

/// Apply the dynamics rules across the four derived scores.
pub(crate) fn unify_dynamics(scores: &mut [Score; 4]) -> Result<(), SplitError> {
    let measure_numbers: BTreeSet<u32> = scores
        .iter()
        .flat_map(|s| s.parts[0].measures.iter().map(|m| m.number))
        .collect();

    let mut inserted = 0usize;

    for number in measure_numbers {
        // Group carriers per (offset, mark). IndexMap keeps discovery order;
        // the explicit sort below fixes the processing order regardless.
        let mut groups: IndexMap<(Beats, String), [bool; 4]> = IndexMap::new();
        for (index, score) in scores.iter().enumerate() {
            if let Some(measure) = score.parts[0].measure(number) {
                for dynamic in measure.dynamics() {
                    groups
                        .entry((dynamic.offset, dynamic.value.clone()))
                        .or_default()[index] = true;
                }
            }
        }

        let mut positions: Vec<(Beats, String)> = groups.keys().cloned().collect();
        positions.sort();

        for key in positions {
            let carriers = groups[&key];
            let carrier_count = carriers.iter().filter(|c| **c).count();

            let targets: Vec<usize> = if carrier_count >= 2 {
                (0..4).filter(|i| !carriers[*i]).collect()
            } else if carriers[0] {
                // Soprano only. Propagation requires that no other voice
                // carries any dynamic at this position, identical or not.
                if (1..4).any(|i| has_dynamic_at(&scores[i], number, key.0)) {
                    Vec::new()
                } else {
                    vec![1, 2, 3]
                }
            } else {
                // A single non-Soprano carrier is voice-specific.
                Vec::new()
            };

            if targets.is_empty() {
                continue;
            }

            let source_index = (0..4).find(|i| carriers[*i]).expect("carrier exists");
            let prototype = find_dynamic(&scores[source_index], number, key.0, &key.1)
                .cloned()
                .ok_or_else(|| {
                    SplitError::unification(
                        "dynamics",
                        format!("carrier dynamic vanished in measure {number}"),
                    )
                })?;

            for target in targets {
                // Duplicate suppression, re-checked against live state so a
                // mark inserted for an earlier position never stacks.
                if has_dynamic_at(&scores[target], number, key.0) {
                    continue;
                }
                let mut copy = prototype.clone();
                copy.staff = None;
                if let Some(measure) = scores[target].parts[0].measure_mut(number) {
                    measure.elements.push(MeasureElement::Dynamic(copy));
                    inserted += 1;
                }
            }
        }
    }

    debug!(inserted, "dynamics unification complete");
    Ok(())
}

fn has_dynamic_at(score: &Score, measure_number: u32, offset: Beats) -> bool {
    score.parts[0]
        .measure(measure_number)
        .is_some_and(|m| m.dynamics().any(|d| d.offset == offset))
}

fn find_dynamic<'a>(
    score: &'a Score,
    measure_number: u32,
    offset: Beats,
    value: &str,
) -> Option<&'a Dynamic> {
    score.parts[0]
        .measure(measure_number)?
        .dynamics()
        .find(|d| d.offset == offset && d.value == value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::derived_score;
    use divisi_model::beats;
    use pretty_assertions::assert_eq;

    fn four_voices() -> [Score; 4] {
        let make = |voice: &str, base: u32| {
            derived_score(voice, base, &[&[(beats(0, 1), beats(4, 1), "C4")]])
        };
        [make("1", 0), make("2", 10), make("5", 20), make("6", 30)]
    }

    fn add_dynamic(score: &mut Score, measure: u32, offset: divisi_model::Beats, value: &str) {
        score.parts[0]
            .measure_mut(measure)
            .unwrap()
            .elements
            .push(MeasureElement::Dynamic(Dynamic::new(value, offset)));
    }

    fn dynamics_of(score: &Score, measure: u32) -> Vec<(divisi_model::Beats, String)> {
        score.parts[0]
            .measure(measure)
            .unwrap()
            .dynamics()
            .map(|d| (d.offset, d.value.clone()))
            .collect()
    }

    #[test]
    fn soprano_only_mark_propagates_to_all() {
        let mut scores = four_voices();
        add_dynamic(&mut scores[0], 1, beats(0, 1), "f");
        unify_dynamics(&mut scores).unwrap();
        for score in &scores {
            assert_eq!(dynamics_of(score, 1), vec![(beats(0, 1), "f".to_string())]);
        }
    }

    #[test]
    fn identical_marks_in_two_voices_fill_the_rest() {
        let mut scores = four_voices();
        // Soprano and Bass carry p; Alto and Tenor get it.
        add_dynamic(&mut scores[0], 1, beats(2, 1), "p");
        add_dynamic(&mut scores[3], 1, beats(2, 1), "p");
        unify_dynamics(&mut scores).unwrap();
        for score in &scores {
            assert_eq!(dynamics_of(score, 1), vec![(beats(2, 1), "p".to_string())]);
        }
    }

    #[test]
    fn alto_tenor_pair_propagates_too() {
        let mut scores = four_voices();
        add_dynamic(&mut scores[1], 1, beats(0, 1), "mp");
        add_dynamic(&mut scores[2], 1, beats(0, 1), "mp");
        unify_dynamics(&mut scores).unwrap();
        for score in &scores {
            assert_eq!(dynamics_of(score, 1), vec![(beats(0, 1), "mp".to_string())]);
        }
    }

    #[test]
    fn voice_specific_marks_are_preserved_not_overridden() {
        let mut scores = four_voices();
        add_dynamic(&mut scores[0], 1, beats(0, 1), "f");
        add_dynamic(&mut scores[3], 1, beats(0, 1), "p");
        unify_dynamics(&mut scores).unwrap();

        // Soprano keeps f, Bass keeps p; neither gains the other's mark.
        assert_eq!(dynamics_of(&scores[0], 1), vec![(beats(0, 1), "f".to_string())]);
        assert_eq!(dynamics_of(&scores[3], 1), vec![(beats(0, 1), "p".to_string())]);
        // Alto and Tenor are not filled: no rule covers a contested position.
        assert!(dynamics_of(&scores[1], 1).is_empty());
        assert!(dynamics_of(&scores[2], 1).is_empty());
    }

    #[test]
    fn tenor_only_mark_stays_voice_specific() {
        let mut scores = four_voices();
        add_dynamic(&mut scores[2], 1, beats(0, 1), "mf");
        unify_dynamics(&mut scores).unwrap();
        assert!(dynamics_of(&scores[0], 1).is_empty());
        assert!(dynamics_of(&scores[1], 1).is_empty());
        assert_eq!(dynamics_of(&scores[2], 1).len(), 1);
        assert!(dynamics_of(&scores[3], 1).is_empty());
    }

    #[test]
    fn duplicate_insertion_is_suppressed() {
        let mut scores = four_voices();
        add_dynamic(&mut scores[0], 1, beats(0, 1), "f");
        add_dynamic(&mut scores[1], 1, beats(0, 1), "f");
        add_dynamic(&mut scores[2], 1, beats(0, 1), "f");
        unify_dynamics(&mut scores).unwrap();
        unify_dynamics(&mut scores).unwrap();
        for score in &scores {
            assert_eq!(dynamics_of(score, 1).len(), 1);
        }
    }
}
