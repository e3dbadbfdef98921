use {
    serde::{Deserialize, Serialize},
    strum_macros::{Display, EnumIter},
};

use super::chandelier::StopLines;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumIter,
)]
pub enum Direction {
    Up,
    Down,
    #[default]
    Unknown,
}

/// Per-series trend state machine.
///
/// `direction` moves every candle; `last_emitted` moves only when a flip
/// is actually reported. Keeping them separate is what guarantees a
/// direction that already alerted cannot retrigger until it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendState {
    direction: Direction,
    last_emitted: Direction,
    /// Policy switch: does the first direction established out of warm-up
    /// itself count as a flip worth alerting?
    alert_on_first: bool,
}

impl TrendState {
    pub fn new(alert_on_first: bool) -> Self {
        TrendState {
            direction: Direction::Unknown,
            last_emitted: Direction::Unknown,
            alert_on_first,
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Evaluate the transition rule for one candle against the *previous*
    /// candle's stop lines. Returns the new direction iff it should be
    /// reported.
    pub fn evaluate(&mut self, close: f64, prev_stops: StopLines) -> Option<Direction> {
        let next = if close > prev_stops.short_stop {
            Direction::Up
        } else if close < prev_stops.long_stop {
            Direction::Down
        } else {
            self.direction
        };
        self.direction = next;

        if next == Direction::Unknown || next == self.last_emitted {
            return None;
        }
        let first_defined = self.last_emitted == Direction::Unknown;
        self.last_emitted = next;
        if first_defined && !self.alert_on_first {
            return None;
        }
        Some(next)
    }

    /// Absorb the current direction without reporting it. Used after a
    /// history replay so the bootstrap direction never alerts.
    pub fn mark_emitted(&mut self) {
        self.last_emitted = self.direction;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Stops pinned so that close > 20 flips Up, close < 10 flips Down,
    // anything between carries the prior direction.
    fn stops() -> StopLines {
        StopLines {
            long_stop: 10.0,
            short_stop: 20.0,
        }
    }

    fn drive(trend: &mut TrendState, closes: &[f64]) -> Vec<Direction> {
        closes
            .iter()
            .filter_map(|c| trend.evaluate(*c, stops()))
            .collect()
    }

    #[test]
    fn first_defined_direction_is_silent_by_default() {
        let mut trend = TrendState::new(false);
        assert_eq!(drive(&mut trend, &[25.0]), vec![]);
        assert_eq!(trend.direction(), Direction::Up);
        // But the next genuine reversal reports
        assert_eq!(drive(&mut trend, &[5.0]), vec![Direction::Down]);
    }

    #[test]
    fn first_defined_direction_reports_when_policy_enabled() {
        let mut trend = TrendState::new(true);
        assert_eq!(drive(&mut trend, &[25.0]), vec![Direction::Up]);
    }

    #[test]
    fn stable_direction_never_repeats() {
        let mut trend = TrendState::new(true);
        let events = drive(&mut trend, &[25.0, 26.0, 30.0, 21.0, 28.0]);
        assert_eq!(events, vec![Direction::Up]);
    }

    #[test]
    fn in_band_close_carries_prior_direction() {
        let mut trend = TrendState::new(true);
        drive(&mut trend, &[25.0]);
        assert_eq!(drive(&mut trend, &[15.0, 12.0, 18.0]), vec![]);
        assert_eq!(trend.direction(), Direction::Up);
    }

    #[test]
    fn oscillation_reports_every_actual_change() {
        let mut trend = TrendState::new(true);
        let events = drive(&mut trend, &[25.0, 5.0, 25.0, 5.0]);
        assert_eq!(
            events,
            vec![
                Direction::Up,
                Direction::Down,
                Direction::Up,
                Direction::Down
            ]
        );
    }

    #[test]
    fn dedup_count_matches_direction_change_count() {
        // D_i sequence: U U D D U D with silent first policy
        let closes = [25.0, 26.0, 5.0, 4.0, 25.0, 5.0];
        let mut trend = TrendState::new(false);
        let events = drive(&mut trend, &closes);
        // Changes after the first defined direction: U->D, D->U, U->D
        assert_eq!(events.len(), 3);
    }

    #[test]
    fn mark_emitted_absorbs_replayed_direction() {
        let mut trend = TrendState::new(true);
        trend.evaluate(25.0, stops());
        trend.mark_emitted();
        // Same direction after the mark: nothing to report
        assert_eq!(trend.evaluate(26.0, stops()), None);
        // A reversal still reports exactly once
        assert_eq!(trend.evaluate(5.0, stops()), Some(Direction::Down));
    }
}
