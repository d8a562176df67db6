use std::time::Instant;

use serde::{Deserialize, Serialize};

use super::{args, complete, report_transition, EvalContext, Predicate, PredicateError};
use crate::core::calendar::{format_clock, parse_tick_of_day, ticks_until};
use crate::core::types::Tri;

/// Opens the door between two times of day
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Tick of day at which the door opens
    pub open_tick: u64,
    /// Tick of day at which the door closes
    pub close_tick: u64,
    /// Report the state on every evaluation instead of only on changes
    pub force: bool,
    #[serde(skip)]
    last: Option<bool>,
    #[serde(skip)]
    cached: Option<(Instant, Tri)>,
}

impl TimeWindow {
    pub fn new(open_tick: u64, close_tick: u64, force: bool) -> Self {
        Self {
            open_tick,
            close_tick,
            force,
            last: None,
            cached: None,
        }
    }

    /// Desired state at `full_time`, as a transition report
    pub fn should_be_open(&mut self, full_time: u64) -> Tri {
        let open_in = ticks_until(full_time, self.open_tick);
        let close_in = ticks_until(full_time, self.close_tick);
        // Inside the window the close point comes before the next open point
        let want = open_in > close_in;
        report_transition(&mut self.last, want, self.force)
    }

    pub(super) fn is_open(&mut self, ctx: &EvalContext<'_>) -> Tri {
        let ttl = ctx.services.config.predicate_cache_ttl();
        if let Some((at, result)) = self.cached {
            if ctx.now.saturating_duration_since(at) < ttl {
                return result;
            }
        }

        let Some(climate) = ctx.services.integrations.climate else {
            return Tri::Abstain;
        };
        let Some(full_time) = climate.full_time(ctx.door.world) else {
            return Tri::Abstain;
        };

        let result = self.should_be_open(full_time);
        self.cached = Some((ctx.now, result));
        result
    }

    pub(super) fn reset(&mut self) {
        self.last = None;
        self.cached = None;
    }

    pub(super) fn describe(&self) -> String {
        format!(
            "open {} to {}{}",
            format_clock(self.open_tick),
            format_clock(self.close_tick),
            if self.force { " (forced)" } else { "" }
        )
    }
}

pub(super) fn from_args(args: &[&str]) -> Result<Predicate, PredicateError> {
    let open = args::required(args, 0, "open time")?;
    let open_tick = parse_tick_of_day(open).ok_or_else(|| PredicateError::InvalidArgument {
        name: "open time",
        value: open.to_string(),
    })?;

    let close = args::required(args, 1, "close time")?;
    let close_tick = parse_tick_of_day(close).ok_or_else(|| PredicateError::InvalidArgument {
        name: "close time",
        value: close.to_string(),
    })?;

    let force = args::flag(args, 2, "force")?;
    Ok(Predicate::Time(TimeWindow::new(open_tick, close_tick, force)))
}

pub(super) fn completions(args: &[&str]) -> Vec<String> {
    match complete::current(args) {
        (0, _) => complete::hint("open tick or HH:MM"),
        (1, _) => complete::hint("close tick or HH:MM"),
        (2, current) => complete::flag(current, "force"),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_reports_transitions_only() {
        // Open from tick 1000 to 13000
        let mut window = TimeWindow::new(1_000, 13_000, false);
        assert_eq!(window.should_be_open(2_000), Tri::True);
        assert_eq!(window.should_be_open(5_000), Tri::Abstain);
        assert_eq!(window.should_be_open(14_000), Tri::False);
        assert_eq!(window.should_be_open(20_000), Tri::Abstain);
        assert_eq!(window.should_be_open(24_000 + 1_500), Tri::True);
    }

    #[test]
    fn test_forced_window_always_reports() {
        let mut window = TimeWindow::new(1_000, 13_000, true);
        assert_eq!(window.should_be_open(2_000), Tri::True);
        assert_eq!(window.should_be_open(3_000), Tri::True);
    }

    #[test]
    fn test_window_across_midnight() {
        // 18:00 to 06:00
        let mut window = TimeWindow::new(12_000, 0, true);
        assert_eq!(window.should_be_open(18_000), Tri::True);
        assert_eq!(window.should_be_open(6_000), Tri::False);
    }

    #[test]
    fn test_from_args_accepts_clock_strings() {
        let predicate = from_args(&["07:00", "19:00", "true"]).unwrap();
        match predicate {
            Predicate::Time(window) => {
                assert_eq!(window.open_tick, 1_000);
                assert_eq!(window.close_tick, 13_000);
                assert!(window.force);
            }
            other => panic!("unexpected predicate {:?}", other),
        }
    }

    #[test]
    fn test_from_args_rejects_garbage() {
        assert_eq!(
            from_args(&["1000"]).unwrap_err(),
            PredicateError::MissingArgument("close time")
        );
        assert!(from_args(&["dawn", "1000"]).is_err());
        assert!(from_args(&["1000", "30000"]).is_err());
    }

    #[test]
    fn test_completions() {
        assert_eq!(completions(&[""]), vec!["<open tick or HH:MM>"]);
        assert_eq!(completions(&["1", "2", "t"]), vec!["true"]);
        assert!(completions(&["1", "2", "true", "x"]).is_empty());
    }
}
