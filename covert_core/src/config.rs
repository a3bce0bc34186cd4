//! Simulation parameters and the `key=value` configuration format.
//!
//! The file format is one parameter per line, either `key=value` or
//! `key value`. Blank lines and `#` comments are skipped, unknown keys are
//! ignored and values that do not parse keep their built-in default.
//! Durations are given in seconds and may be fractional.

use crate::error::ConfigError;
use rand::Rng;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Inclusive range of activity durations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DurationRange {
    pub min: Duration,
    pub max: Duration,
}

impl DurationRange {
    pub fn new(min: Duration, max: Duration) -> Self {
        Self { min, max }
    }

    pub fn from_secs(min: u64, max: u64) -> Self {
        Self::new(Duration::from_secs(min), Duration::from_secs(max))
    }

    /// Draws a duration uniformly from the range.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        if self.max <= self.min {
            return self.min;
        }
        rng.gen_range(self.min..=self.max)
    }
}

/// Every tunable of a simulation run.
#[derive(Debug, Clone, PartialEq)]
pub struct SimParams {
    // Populations
    /// Target size of the agency
    pub agency_members: u32,
    pub group_creation_interval: Duration,
    pub group_size_min: u32,
    pub group_size_max: u32,
    /// Percent (0-100) of new groups that are military
    pub military_group_percentage: u32,
    /// Percent (0-100) of new groups seeded with a spy
    pub spy_infiltration_percent: f64,

    // Targeting
    /// Base per-iteration targeting probability of a resistance member
    pub target_probability: f64,
    pub military_target_bonus: f64,
    /// Added probability per second of accumulated spy time
    pub spy_time_target_factor: f64,
    /// Scale applied to an agency member's `time_in_service / agency_time_limit`
    pub agency_target_scale: f64,
    /// Chance that an injury is light (recoverable)
    pub light_injury_probability: f64,
    pub recovery_light: Duration,

    // Activities
    pub member_activity: DurationRange,
    pub spy_activity: DurationRange,
    pub agency_activity: DurationRange,

    // Counter-intelligence
    pub suspicion_threshold: f64,
    pub arrest_release_threshold: f64,
    pub arrest_imprison_threshold: f64,

    // Termination
    pub max_killed: i64,
    pub max_injured: i64,
    pub agency_time_limit: Duration,

    // Cadences
    pub civilian_interval: Duration,
    pub replenish_interval: Duration,
    pub agency_monitor_interval: Duration,
    pub watchdog_interval: Duration,

    // Capacities
    pub max_groups: usize,
    pub max_suspects: usize,
    pub max_spies: usize,
    pub max_agency_positions: usize,
    pub max_caught_resistance: usize,
    pub max_caught_agency: usize,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            agency_members: 5,
            group_creation_interval: Duration::from_secs(10),
            group_size_min: 3,
            group_size_max: 8,
            military_group_percentage: 30,
            spy_infiltration_percent: 40.0,

            target_probability: 0.05,
            military_target_bonus: 0.05,
            spy_time_target_factor: 0.01,
            agency_target_scale: 0.1,
            light_injury_probability: 0.7,
            recovery_light: Duration::from_secs(5),

            member_activity: DurationRange::from_secs(4, 6),
            spy_activity: DurationRange::from_secs(2, 4),
            agency_activity: DurationRange::from_secs(6, 8),

            suspicion_threshold: 0.02,
            arrest_release_threshold: 0.01,
            arrest_imprison_threshold: 0.04,

            max_killed: 20,
            max_injured: 15,
            agency_time_limit: Duration::from_secs(120),

            civilian_interval: Duration::from_secs(5),
            replenish_interval: Duration::from_secs(2),
            agency_monitor_interval: Duration::from_secs(5),
            watchdog_interval: Duration::from_secs(1),

            max_groups: 1000,
            max_suspects: 100,
            max_spies: 100,
            max_agency_positions: 100,
            max_caught_resistance: 1000,
            max_caught_agency: 100,
        }
    }
}

impl SimParams {
    /// Loads parameters from `path` on top of `self`.
    ///
    /// A missing file keeps the current values. Any other I/O failure is an
    /// error.
    pub fn load_file(mut self, path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(text) => {
                let applied = self.apply_text(&text);
                info!("Loaded {} parameters from {}", applied, path.display());
                Ok(self)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Config {} not found, using built-in defaults", path.display());
                Ok(self)
            }
            Err(source) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Applies every recognized `key=value` / `key value` line in `text`.
    ///
    /// Returns the number of parameters that were set.
    pub fn apply_text(&mut self, text: &str) -> usize {
        let mut applied = 0;
        for (lineno, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = split_pair(line) else {
                debug!(line = lineno + 1, "Skipping malformed config line");
                continue;
            };
            match self.set(key, value) {
                Ok(true) => applied += 1,
                Ok(false) => debug!(key, "Ignoring unknown config key"),
                Err(reason) => warn!(key, value, "Keeping default: {}", reason),
            }
        }
        applied
    }

    /// Sets one parameter. `Ok(false)` means the key is unknown.
    pub fn set(&mut self, key: &str, value: &str) -> Result<bool, String> {
        match key {
            "agency_members" => self.agency_members = parse(value)?,
            "group_creation_interval" => self.group_creation_interval = secs(value)?,
            "group_size_min" => self.group_size_min = parse(value)?,
            "group_size_max" => self.group_size_max = parse(value)?,
            "military_group_percentage" => self.military_group_percentage = parse(value)?,
            "spy_infiltration_probability" => self.spy_infiltration_percent = parse(value)?,
            "target_probability" => self.target_probability = parse(value)?,
            "military_target_bonus" => self.military_target_bonus = parse(value)?,
            "spy_time_target_factor" => self.spy_time_target_factor = parse(value)?,
            "agency_target_scale" => self.agency_target_scale = parse(value)?,
            "light_injury_probability" => self.light_injury_probability = parse(value)?,
            "recovery_light" => self.recovery_light = secs(value)?,
            "member_activity_min" => self.member_activity.min = secs(value)?,
            "member_activity_max" => self.member_activity.max = secs(value)?,
            "spy_activity_min" => self.spy_activity.min = secs(value)?,
            "spy_activity_max" => self.spy_activity.max = secs(value)?,
            "agency_activity_min" => self.agency_activity.min = secs(value)?,
            "agency_activity_max" => self.agency_activity.max = secs(value)?,
            "suspicion_threshold" => self.suspicion_threshold = parse(value)?,
            "arrest_release_threshold" => self.arrest_release_threshold = parse(value)?,
            "arrest_imprison_threshold" => self.arrest_imprison_threshold = parse(value)?,
            "max_killed" => self.max_killed = parse(value)?,
            "max_injured" => self.max_injured = parse(value)?,
            "agency_time_limit" => self.agency_time_limit = secs(value)?,
            "civilian_interval" => self.civilian_interval = secs(value)?,
            "replenish_interval" => self.replenish_interval = secs(value)?,
            "agency_monitor_interval" => self.agency_monitor_interval = secs(value)?,
            "watchdog_interval" => self.watchdog_interval = secs(value)?,
            "max_groups" => self.max_groups = parse(value)?,
            "max_suspects" => self.max_suspects = parse(value)?,
            "max_spies" => self.max_spies = parse(value)?,
            "max_agency_positions" => self.max_agency_positions = parse(value)?,
            "max_caught_resistance" => self.max_caught_resistance = parse(value)?,
            "max_caught_agency" => self.max_caught_agency = parse(value)?,
            _ => return Ok(false),
        }
        Ok(true)
    }

    /// Rejects parameter sets that cannot drive a simulation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if self.group_size_min == 0 || self.group_size_min > self.group_size_max {
            return invalid(format!(
                "group size range {}..={} is empty",
                self.group_size_min, self.group_size_max
            ));
        }
        // Member ids keep the group in the thousands digit
        if self.group_size_max >= 999 {
            return invalid(format!("group_size_max {} must be below 999", self.group_size_max));
        }
        if self.military_group_percentage > 100 {
            return invalid(format!(
                "military_group_percentage {} exceeds 100",
                self.military_group_percentage
            ));
        }
        if !(0.0..=100.0).contains(&self.spy_infiltration_percent) {
            return invalid(format!(
                "spy_infiltration_probability {} is not a percentage",
                self.spy_infiltration_percent
            ));
        }
        for (name, p) in [
            ("target_probability", self.target_probability),
            ("light_injury_probability", self.light_injury_probability),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return invalid(format!("{} {} is not a probability", name, p));
            }
        }
        if self.agency_time_limit.is_zero() {
            return invalid("agency_time_limit must be positive".to_string());
        }
        if self.arrest_release_threshold > self.arrest_imprison_threshold {
            return invalid(format!(
                "arrest_release_threshold {} exceeds arrest_imprison_threshold {}",
                self.arrest_release_threshold, self.arrest_imprison_threshold
            ));
        }
        for (name, range) in [
            ("member_activity", self.member_activity),
            ("spy_activity", self.spy_activity),
            ("agency_activity", self.agency_activity),
        ] {
            if range.min > range.max {
                return invalid(format!("{} min exceeds max", name));
            }
        }
        for (name, interval) in [
            ("group_creation_interval", self.group_creation_interval),
            ("replenish_interval", self.replenish_interval),
            ("agency_monitor_interval", self.agency_monitor_interval),
            ("watchdog_interval", self.watchdog_interval),
            ("civilian_interval", self.civilian_interval),
        ] {
            if interval.is_zero() {
                return invalid(format!("{} must be positive", name));
            }
        }
        Ok(())
    }
}

fn split_pair(line: &str) -> Option<(&str, &str)> {
    let (key, value) = match line.split_once('=') {
        Some(pair) => pair,
        None => line.split_once(char::is_whitespace)?,
    };
    let (key, value) = (key.trim(), value.trim());
    if key.is_empty() || value.is_empty() {
        return None;
    }
    Some((key, value))
}

fn parse<T: std::str::FromStr>(value: &str) -> Result<T, String> {
    value
        .parse()
        .map_err(|_| format!("cannot parse '{}'", value))
}

fn secs(value: &str) -> Result<Duration, String> {
    let seconds: f64 = parse(value)?;
    Duration::try_from_secs_f64(seconds).map_err(|e| format!("bad duration '{}': {}", value, e))
}
