//! Model, solve and server configuration.

use crate::error::{ModelError, SolveError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What to do with a course whose permitted rooms are all too small.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OverflowPolicy {
    /// The course has no usable room; building the model fails.
    #[default]
    Reject,
    /// Open an overflow room of unlimited capacity that any number of
    /// sessions may share.
    TemporaryRoom,
}

/// Knobs that shape the generated constraint set and objective.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModelOptions {
    /// Per-subject, per-day ceiling unless the subject declares its own.
    pub daily_cap: u32,
    /// Magnitude of the objective penalty per day used beyond the minimum.
    pub day_penalty: f64,
    /// Choose rooms as well as slots. Ignored when the catalog has no rooms.
    pub assign_rooms: bool,
    /// Only use rooms whose capacity covers the class headcount.
    pub capacity_aware: bool,
    pub overflow: OverflowPolicy,
    pub overflow_room: String,
    /// Require each course's slots on a day to form one unbroken run.
    pub contiguity: bool,
    /// Keep a teacher bound to several courses from teaching two at once.
    pub teacher_overlap: bool,
}

impl Default for ModelOptions {
    fn default() -> Self {
        Self {
            daily_cap: 2,
            day_penalty: 5.0,
            assign_rooms: true,
            capacity_aware: false,
            overflow: OverflowPolicy::Reject,
            overflow_room: "temporary".to_string(),
            contiguity: true,
            teacher_overlap: true,
        }
    }
}

impl ModelOptions {
    pub fn with_daily_cap(mut self, cap: u32) -> Self {
        self.daily_cap = cap;
        self
    }

    pub fn with_day_penalty(mut self, penalty: f64) -> Self {
        self.day_penalty = penalty;
        self
    }

    pub fn with_rooms(mut self, assign_rooms: bool) -> Self {
        self.assign_rooms = assign_rooms;
        self
    }

    pub fn with_capacity_check(mut self, overflow: OverflowPolicy) -> Self {
        self.capacity_aware = true;
        self.overflow = overflow;
        self
    }

    pub fn with_contiguity(mut self, contiguity: bool) -> Self {
        self.contiguity = contiguity;
        self
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        if self.daily_cap == 0 {
            return Err(ModelError::InvalidOptions(
                "daily_cap must be at least 1".to_string(),
            ));
        }
        if !self.day_penalty.is_finite() || self.day_penalty < 0.0 {
            return Err(ModelError::InvalidOptions(format!(
                "day_penalty must be a finite magnitude >= 0, got {}",
                self.day_penalty
            )));
        }
        if self.overflow == OverflowPolicy::TemporaryRoom && self.overflow_room.is_empty() {
            return Err(ModelError::InvalidOptions(
                "overflow_room needs a name".to_string(),
            ));
        }
        Ok(())
    }
}

/// Which backend runs the search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Engine {
    /// MILP first, native search if the MILP backend breaks down.
    #[default]
    Auto,
    Milp,
    Search,
}

/// Limits and reproducibility settings for one solve.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SolveOptions {
    /// Wall-clock budget in seconds. `None` runs to completion.
    pub time_limit_secs: Option<f64>,
    /// Stop once (bound - found) / max(|found|, 1) is within this ratio.
    pub gap_tolerance: f64,
    /// Seed for tie-breaking between equally good candidates.
    pub seed: Option<u64>,
    pub engine: Engine,
}

impl SolveOptions {
    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit_secs = Some(limit.as_secs_f64());
        self
    }

    pub fn with_gap_tolerance(mut self, gap: f64) -> Self {
        self.gap_tolerance = gap;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_engine(mut self, engine: Engine) -> Self {
        self.engine = engine;
        self
    }

    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit_secs.map(Duration::from_secs_f64)
    }

    pub fn validate(&self) -> Result<(), SolveError> {
        if let Some(secs) = self.time_limit_secs {
            if !secs.is_finite() || secs < 0.0 {
                return Err(SolveError::InvalidOptions(format!(
                    "time limit must be a non-negative number of seconds, got {secs}"
                )));
            }
        }
        if !self.gap_tolerance.is_finite() || self.gap_tolerance < 0.0 {
            return Err(SolveError::InvalidOptions(format!(
                "gap tolerance must be >= 0, got {}",
                self.gap_tolerance
            )));
        }
        Ok(())
    }
}

/// Settings of the HTTP front-end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_addr: String,
}

impl ServerConfig {
    pub const BIND_ADDR_VAR: &'static str = "TIMETABLE_BIND_ADDR";

    pub fn from_env() -> Self {
        let bind_addr =
            std::env::var(Self::BIND_ADDR_VAR).unwrap_or_else(|_| "127.0.0.1:8080".to_string());
        Self { bind_addr }
    }
}
