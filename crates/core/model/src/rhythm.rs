//! Rational time arithmetic.
//!
//! Offsets and durations are measured in quarter notes from the start of the
//! containing measure, as exact rationals. Rational arithmetic gives a total
//! order and makes position comparison exact, so duplicate suppression in the
//! unifier never needs an epsilon.

use num_rational::Rational32;

/// Position or duration in quarter-note units.
pub type Beats = Rational32;

/// Shorthand constructor for a rational quarter-note value.
///
/// Panics if `den` is zero, like [`Rational32::new`].
pub fn beats(num: i32, den: i32) -> Beats {
    Rational32::new(num, den)
}

/// Zero beats.
pub fn zero() -> Beats {
    Rational32::new(0, 1)
}

/// Convert a whole number of quarter notes.
pub fn whole_beats(num: i32) -> Beats {
    Rational32::from_integer(num)
}
