//! Parameter presets.
//!
//! A preset adjusts the built-in defaults; the config file is applied on top
//! of it, so file values always win.

use covert_core::config::DurationRange;
use covert_core::SimParams;
use std::time::Duration;

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioId {
    /// Built-in defaults, untouched
    Baseline,

    /// Large, aggressive agency; the resistance should hit its loss limits
    Crackdown,

    /// Most groups carry a spy and the pipeline is trigger-happy
    Infiltration,

    /// Militant resistance and a fragile agency
    Insurgency,

    /// Short limits and fast activities for quick smoke runs
    Skirmish,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::Baseline,
            ScenarioId::Crackdown,
            ScenarioId::Infiltration,
            ScenarioId::Insurgency,
            ScenarioId::Skirmish,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::Baseline => "baseline",
            ScenarioId::Crackdown => "crackdown",
            ScenarioId::Infiltration => "infiltration",
            ScenarioId::Insurgency => "insurgency",
            ScenarioId::Skirmish => "skirmish",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::Baseline => "Default parameters",
            ScenarioId::Crackdown => "12 agents, doubled targeting, low kill limit",
            ScenarioId::Infiltration => "90% spy infiltration, low suspicion thresholds",
            ScenarioId::Insurgency => "80% military groups, agents wear out fast",
            ScenarioId::Skirmish => "1-2s activities, 30s agency limit, small loss limits",
        }
    }

    /// Applies the preset to `params`.
    pub fn apply(&self, params: &mut SimParams) {
        match self {
            ScenarioId::Baseline => {}
            ScenarioId::Crackdown => {
                params.agency_members = 12;
                params.target_probability *= 2.0;
                params.military_target_bonus *= 2.0;
                params.max_killed = 10;
            }
            ScenarioId::Infiltration => {
                params.spy_infiltration_percent = 90.0;
                params.suspicion_threshold = 0.005;
                params.arrest_imprison_threshold = 0.02;
                params.group_creation_interval = Duration::from_secs(5);
            }
            ScenarioId::Insurgency => {
                params.military_group_percentage = 80;
                params.agency_target_scale = 0.5;
                params.agency_time_limit = Duration::from_secs(60);
                params.max_killed = 50;
                params.max_injured = 40;
            }
            ScenarioId::Skirmish => {
                params.group_creation_interval = Duration::from_secs(2);
                params.member_activity = DurationRange::from_secs(1, 2);
                params.spy_activity = DurationRange::from_secs(1, 2);
                params.agency_activity = DurationRange::from_secs(1, 2);
                params.recovery_light = Duration::from_secs(2);
                params.agency_time_limit = Duration::from_secs(30);
                params.max_killed = 5;
                params.max_injured = 5;
            }
        }
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ScenarioId::all()
            .into_iter()
            .find(|id| id.name() == s.to_lowercase())
            .ok_or_else(|| format!("Unknown scenario: {}", s))
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for id in ScenarioId::all() {
            assert_eq!(id.name().parse::<ScenarioId>(), Ok(id));
        }
        assert!("nope".parse::<ScenarioId>().is_err());
    }

    #[test]
    fn test_every_preset_validates() {
        for id in ScenarioId::all() {
            let mut params = SimParams::default();
            id.apply(&mut params);
            assert!(params.validate().is_ok(), "{} is invalid", id);
        }
    }

    #[test]
    fn test_baseline_is_default() {
        let mut params = SimParams::default();
        ScenarioId::Baseline.apply(&mut params);
        assert_eq!(params, SimParams::default());
    }
}
