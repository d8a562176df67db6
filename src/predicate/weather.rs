use std::time::Instant;

use serde::{Deserialize, Serialize};

use super::{args, complete, report_transition, EvalContext, Predicate, PredicateError};
use crate::core::types::Tri;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeatherKind {
    Clear,
    Downfall,
}

impl WeatherKind {
    pub fn parse(s: &str) -> Option<Self> {
        if s.eq_ignore_ascii_case("clear") {
            Some(WeatherKind::Clear)
        } else if s.eq_ignore_ascii_case("downfall") {
            Some(WeatherKind::Downfall)
        } else {
            None
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            WeatherKind::Clear => "clear",
            WeatherKind::Downfall => "downfall",
        }
    }
}

/// Opens the door while the weather at its position matches
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherGate {
    pub weather: WeatherKind,
    pub force: bool,
    #[serde(skip)]
    last: Option<bool>,
    #[serde(skip)]
    cached: Option<(Instant, Tri)>,
}

impl WeatherGate {
    pub fn new(weather: WeatherKind, force: bool) -> Self {
        Self {
            weather,
            force,
            last: None,
            cached: None,
        }
    }

    pub fn should_be_open(&mut self, downfall: bool) -> Tri {
        let want = match self.weather {
            WeatherKind::Downfall => downfall,
            WeatherKind::Clear => !downfall,
        };
        report_transition(&mut self.last, want, self.force)
    }

    pub(super) fn is_open(&mut self, ctx: &EvalContext<'_>) -> Tri {
        let ttl = ctx.services.config.predicate_cache_ttl();
        if let Some((at, result)) = self.cached {
            if ctx.now.saturating_duration_since(at) < ttl {
                return result;
            }
        }

        let Some(downfall) = ctx
            .services
            .integrations
            .climate
            .and_then(|climate| climate.is_downfall(ctx.door.world, ctx.door.position))
        else {
            return Tri::Abstain;
        };

        let result = self.should_be_open(downfall);
        self.cached = Some((ctx.now, result));
        result
    }

    pub(super) fn reset(&mut self) {
        self.last = None;
        self.cached = None;
    }

    pub(super) fn describe(&self) -> String {
        format!(
            "open on {} weather{}",
            self.weather.name(),
            if self.force { " (forced)" } else { "" }
        )
    }
}

pub(super) fn from_args(args: &[&str]) -> Result<Predicate, PredicateError> {
    let raw = args::required(args, 0, "weather")?;
    let weather = WeatherKind::parse(raw).ok_or_else(|| PredicateError::InvalidArgument {
        name: "weather",
        value: raw.to_string(),
    })?;
    let force = args::flag(args, 1, "force")?;
    Ok(Predicate::Weather(WeatherGate::new(weather, force)))
}

pub(super) fn completions(args: &[&str]) -> Vec<String> {
    match complete::current(args) {
        (0, current) => complete::options(current, &["clear", "downfall"]),
        (1, current) => complete::flag(current, "force"),
        _ => Vec::new(),
    }
}
