//! Conversion between linear amplitude and decibels.

use libm::{log10f, powf};

/// Levels at or below this are treated as silence.
pub const MINUS_INFINITY_DB: f32 = -200.0;

// 10^(MINUS_INFINITY_DB / 20)
const MINUS_INFINITY_AMPLITUDE: f32 = 1.0e-10;

/// Convert linear amplitude to decibels.
///
/// The amplitude is floored at [`MINUS_INFINITY_DB`] before the logarithm,
/// near-zero input never produces `-inf` or NaN.
pub fn amplitude_to_decibels(amplitude: f32) -> f32 {
    20.0 * log10f(f32::max(amplitude, MINUS_INFINITY_AMPLITUDE))
}

/// Convert decibels to linear amplitude.
pub fn decibels_to_amplitude(decibels: f32) -> f32 {
    powf(10.0, decibels * 0.05)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unity_amplitude_is_zero_decibels() {
        assert_relative_eq!(amplitude_to_decibels(1.0), 0.0);
    }

    #[test]
    fn tenth_of_amplitude_is_minus_twenty_decibels() {
        assert_relative_eq!(amplitude_to_decibels(0.1), -20.0);
    }

    #[test]
    fn zero_amplitude_is_floored_at_minus_infinity() {
        assert_relative_eq!(amplitude_to_decibels(0.0), MINUS_INFINITY_DB);
    }

    #[test]
    fn negative_amplitude_is_floored_at_minus_infinity() {
        assert_relative_eq!(amplitude_to_decibels(-1.0), MINUS_INFINITY_DB);
    }

    #[test]
    fn decibels_map_back_to_amplitude() {
        assert_relative_eq!(decibels_to_amplitude(0.0), 1.0);
        assert_relative_eq!(decibels_to_amplitude(-20.0), 0.1);
        assert_relative_eq!(decibels_to_amplitude(6.0), 1.995_262_3, max_relative = 1e-5);
    }

    #[test]
    fn conversion_round_trips_within_audible_range() {
        for level in [-60.0, -20.0, -6.0, 0.0] {
            assert_relative_eq!(
                amplitude_to_decibels(decibels_to_amplitude(level)),
                level,
                epsilon = 1e-4
            );
        }
    }
}
