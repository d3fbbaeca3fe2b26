//! Review progression ladder
//!
//! Maps a card's stored interval length onto a fixed ladder of day
//! thresholds. The resulting step index only drives progress display;
//! the actual next interval is chosen by the caller.

/// Review ladder in days, ascending. Index 0..8.
pub const LADDER_DAYS: [i64; 9] = [1, 3, 7, 14, 30, 60, 120, 240, 365];

/// Map a card's current interval (in days) to a step index on the ladder.
///
/// Having just completed the interval at rung `i`, the card advances to
/// rung `i + 1`, capped at the last rung. An interval that matches no
/// rung exactly is treated as a brand-new card (step 0), never snapped
/// to the nearest rung. `None` and negative inputs clamp to 0.
pub fn step_from_interval(interval_days: Option<i64>) -> usize {
    let interval = interval_days.unwrap_or(0).max(0);

    for (idx, days) in LADDER_DAYS.iter().enumerate() {
        if interval == *days {
            return (idx + 1).min(LADDER_DAYS.len() - 1);
        }
    }

    0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ladder_values_advance_one_rung() {
        for (idx, days) in LADDER_DAYS.iter().enumerate() {
            let expected = (idx + 1).min(LADDER_DAYS.len() - 1);
            assert_eq!(step_from_interval(Some(*days)), expected);
        }
    }

    #[test]
    fn test_last_rung_caps() {
        assert_eq!(step_from_interval(Some(365)), 8);
    }

    #[test]
    fn test_non_ladder_intervals_are_step_zero() {
        assert_eq!(step_from_interval(Some(2)), 0);
        assert_eq!(step_from_interval(Some(5)), 0);
        assert_eq!(step_from_interval(Some(1000)), 0);
    }

    #[test]
    fn test_missing_and_negative_clamp_to_zero() {
        assert_eq!(step_from_interval(None), 0);
        assert_eq!(step_from_interval(Some(0)), 0);
        assert_eq!(step_from_interval(Some(-5)), 0);
    }
}
