//! TOML-based scenario configuration and preset definitions.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use chrono::Weekday;
use serde::Deserialize;

use crate::devices::{ApplianceModel, LoadComponent};
use crate::error::ConfigError;
use crate::io::export::{EVENTS_FILE, series_file_name};
use crate::sim::bitmap::{WeekdayRanges, time_range_bitmap};
use crate::sim::noise::BackgroundNoise;
use crate::sim::state_machine::State;
use crate::sim::types::TOTAL;

/// Range spec covering a whole day.
pub const ALL_DAY: &str = "00:00-24:00";

/// Top-level scenario configuration parsed from TOML.
///
/// Load from TOML with [`ScenarioConfig::from_toml_file`] or use one of the
/// built-in [`ScenarioConfig::PRESETS`].
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Horizon, seed, and post-processing.
    #[serde(default)]
    pub general: GeneralConfig,
    /// Appliance types with their candidate definitions.
    #[serde(default)]
    pub appliances: Vec<ApplianceConfig>,
    /// Activity state machines.
    #[serde(default)]
    pub activities: Vec<ActivityConfig>,
    /// Household members and the activities they perform.
    #[serde(default)]
    pub users: Vec<UserConfig>,
}

/// Horizon, seed, and post-processing parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneralConfig {
    /// Scenario label.
    pub name: String,
    /// Number of days to synthesize (must be > 0).
    pub days: usize,
    /// Master random seed.
    pub seed: u64,
    /// Weekday of day 0 (`"monday"`, `"tue"`, ...); drawn at random when absent.
    pub start_weekday: Option<String>,
    /// Draw a fresh appliance definition before every activity walk.
    pub vary_appliances: bool,
    /// Background noise on the total: `"none"`, `"G<watts>"`, or `"C<watts>"`.
    pub noise: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            name: "household".to_string(),
            days: 1,
            seed: 42,
            start_weekday: None,
            vary_appliances: false,
            noise: "none".to_string(),
        }
    }
}

impl GeneralConfig {
    /// Parsed start weekday, if one is configured.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for a name that is not a weekday.
    pub fn start_weekday(&self) -> Result<Option<Weekday>, ConfigError> {
        self.start_weekday
            .as_deref()
            .map(|raw| {
                raw.parse::<Weekday>()
                    .map_err(|_| ConfigError::invalid("general.start_weekday", format!("\"{raw}\" is not a weekday")))
            })
            .transpose()
    }

    /// Parsed background noise.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for a malformed noise spec.
    pub fn noise(&self) -> Result<BackgroundNoise, ConfigError> {
        self.noise.parse()
    }
}

/// One appliance type and its directory of candidate definitions.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApplianceConfig {
    #[serde(rename = "type")]
    pub appliance_type: String,
    pub models: Vec<ModelConfig>,
}

/// One candidate definition of an appliance.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelConfig {
    pub name: String,
    /// Device type the definition was recorded from; only checked for consistency.
    #[serde(rename = "type", default)]
    pub declared_type: Option<String>,
    /// Usual operation length in seconds.
    pub duration: usize,
    #[serde(default)]
    pub loads: Vec<LoadConfig>,
}

impl ModelConfig {
    /// Builds the immutable appliance definition.
    pub fn to_model(&self) -> ApplianceModel {
        ApplianceModel::new(
            &self.name,
            self.duration,
            self.loads.iter().map(LoadConfig::to_component).collect(),
        )
    }
}

fn unit_stretch() -> f32 {
    1.0
}

/// One load-model component, tagged by `kind`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LoadConfig {
    OnOff {
        fraction: f64,
        power: f32,
    },
    Linear {
        fraction: f64,
        start: f32,
        end: f32,
    },
    Decay {
        fraction: f64,
        base: f32,
        delta: f32,
        rate: f32,
    },
    Growth {
        fraction: f64,
        base: f32,
        scale: f32,
        #[serde(default = "unit_stretch")]
        stretch: f32,
    },
    Noise {
        fraction: f64,
        low: f32,
        mean: f32,
        stdev: f32,
        high: f32,
    },
}

impl LoadConfig {
    pub fn to_component(&self) -> LoadComponent {
        match *self {
            Self::OnOff { fraction, power } => LoadComponent::OnOff { fraction, power },
            Self::Linear { fraction, start, end } => LoadComponent::Linear { fraction, start, end },
            Self::Decay {
                fraction,
                base,
                delta,
                rate,
            } => LoadComponent::Decay {
                fraction,
                base,
                delta,
                rate,
            },
            Self::Growth {
                fraction,
                base,
                scale,
                stretch,
            } => LoadComponent::Growth {
                fraction,
                base,
                scale,
                stretch,
            },
            Self::Noise {
                fraction,
                low,
                mean,
                stdev,
                high,
            } => LoadComponent::Noise {
                fraction,
                low,
                mean,
                stdev,
                high,
            },
        }
    }

    /// Checks the component parameters, appending violations to `errors`.
    fn validate(&self, field: &str, errors: &mut Vec<ConfigError>) {
        let fraction = self.to_component().fraction();
        if !fraction.is_finite() || fraction < 0.0 {
            errors.push(ConfigError::invalid(format!("{field}.fraction"), "must be >= 0"));
        }

        let finite = |values: &[f32]| values.iter().all(|v| v.is_finite());
        match *self {
            Self::OnOff { power, .. } if !power.is_finite() => {
                errors.push(ConfigError::invalid(format!("{field}.power"), "must be finite"));
            }
            Self::Linear { start, end, .. } if !finite(&[start, end]) => {
                errors.push(ConfigError::invalid(field, "start and end must be finite"));
            }
            Self::Decay {
                base, delta, rate, ..
            } if !finite(&[base, delta, rate]) => {
                errors.push(ConfigError::invalid(field, "base, delta and rate must be finite"));
            }
            Self::Growth {
                base,
                scale,
                stretch,
                ..
            } => {
                if !finite(&[base, scale]) {
                    errors.push(ConfigError::invalid(field, "base and scale must be finite"));
                }
                if !(stretch.is_finite() && stretch > 0.0) {
                    errors.push(ConfigError::invalid(format!("{field}.stretch"), "must be > 0"));
                }
            }
            Self::Noise {
                low,
                mean,
                stdev,
                high,
                ..
            } => {
                if !finite(&[low, mean, stdev, high]) {
                    errors.push(ConfigError::invalid(field, "low, mean, stdev and high must be finite"));
                } else {
                    if low > high {
                        errors.push(ConfigError::invalid(format!("{field}.low"), "must be <= high"));
                    }
                    if stdev < 0.0 {
                        errors.push(ConfigError::invalid(format!("{field}.stdev"), "must be >= 0"));
                    }
                }
            }
            _ => {}
        }
    }
}

/// One activity state machine.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActivityConfig {
    pub name: String,
    /// Appliance types; appliance id `k` in a state row refers to `devices[k - 1]`.
    #[serde(default)]
    pub devices: Vec<String>,
    /// Rows `name, min, max, requires_user, must_complete, appliance_id, p, succ_a, succ_b`.
    pub states: Vec<String>,
}

/// A household member.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserConfig {
    pub name: String,
    /// Weekday name to range spec; absent means present all day, every day.
    #[serde(default)]
    pub presence: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub activities: Vec<UserActivityConfig>,
}

/// An activity as performed by one user.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserActivityConfig {
    /// Name of an `[[activities]]` entry.
    pub activity: String,
    /// Expected instances per day.
    pub daily_runs: f64,
    /// Weekday name to legal-time range spec; absent means any time.
    #[serde(default)]
    pub times: Option<BTreeMap<String, String>>,
}

/// Builds weekday ranges from an optional map, defaulting to all day.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] for a key that is not a weekday.
pub fn weekday_ranges(
    map: Option<&BTreeMap<String, String>>,
    field: &str,
) -> Result<WeekdayRanges, ConfigError> {
    match map {
        Some(map) => WeekdayRanges::from_map(map, field),
        None => Ok(WeekdayRanges::every_day(ALL_DAY)),
    }
}

/// Validates every range spec of an optional weekday map.
fn validate_ranges(
    map: Option<&BTreeMap<String, String>>,
    field: &str,
    errors: &mut Vec<ConfigError>,
) {
    if let Err(e) = weekday_ranges(map, field) {
        errors.push(e);
    }
    for (day, spec) in map.into_iter().flatten() {
        if let Err(source) = time_range_bitmap(spec) {
            errors.push(ConfigError::TimeRange {
                field: format!("{field}.{day}"),
                source,
            });
        }
    }
}

impl ScenarioConfig {
    /// Available preset names.
    pub const PRESETS: &[&str] = &["demo", "flatshare"];

    /// Loads a scenario from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        let source = match name {
            "demo" => include_str!("../scenarios/demo.toml"),
            "flatshare" => include_str!("../scenarios/flatshare.toml"),
            _ => {
                return Err(ConfigError::UnknownPreset {
                    name: name.to_string(),
                    available: Self::PRESETS.join(", "),
                });
            }
        };
        Self::from_toml_str(source)
    }

    /// Parses a scenario from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a scenario from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let g = &self.general;

        if g.days == 0 {
            errors.push(ConfigError::invalid("general.days", "must be > 0"));
        }
        if let Err(e) = g.start_weekday() {
            errors.push(e);
        }
        if let Err(e) = g.noise() {
            errors.push(e);
        }

        let mut appliance_types = BTreeSet::new();
        for (i, a) in self.appliances.iter().enumerate() {
            let field = format!("appliances[{i}]");
            if !appliance_types.insert(a.appliance_type.as_str()) {
                errors.push(ConfigError::invalid(
                    format!("{field}.type"),
                    format!("duplicate appliance type \"{}\"", a.appliance_type),
                ));
            }
            if a.models.is_empty() {
                errors.push(ConfigError::invalid(format!("{field}.models"), "must not be empty"));
            }
            for (j, m) in a.models.iter().enumerate() {
                for (k, load) in m.loads.iter().enumerate() {
                    load.validate(&format!("{field}.models[{j}].loads[{k}]"), &mut errors);
                }
            }
        }

        let mut activity_names = BTreeSet::new();
        for (i, act) in self.activities.iter().enumerate() {
            let field = format!("activities[{i}]");
            if !activity_names.insert(act.name.as_str()) {
                errors.push(ConfigError::invalid(
                    format!("{field}.name"),
                    format!("duplicate activity \"{}\"", act.name),
                ));
            }
            for device in &act.devices {
                if !appliance_types.contains(device.as_str()) {
                    errors.push(ConfigError::invalid(
                        format!("{field}.devices"),
                        format!("no appliance definition for type \"{device}\""),
                    ));
                }
            }
            for (j, row) in act.states.iter().enumerate() {
                if let Err(source) = State::parse(j, row) {
                    errors.push(ConfigError::State {
                        activity: act.name.clone(),
                        source,
                    });
                }
            }
        }

        for (i, u) in self.users.iter().enumerate() {
            let field = format!("users[{i}]");
            validate_ranges(u.presence.as_ref(), &format!("{field}.presence"), &mut errors);
            for (j, ua) in u.activities.iter().enumerate() {
                let field = format!("{field}.activities[{j}]");
                if !activity_names.contains(ua.activity.as_str()) {
                    errors.push(ConfigError::invalid(
                        format!("{field}.activity"),
                        format!("unknown activity \"{}\"", ua.activity),
                    ));
                }
                if !ua.daily_runs.is_finite() || ua.daily_runs < 0.0 {
                    errors.push(ConfigError::invalid(format!("{field}.daily_runs"), "must be >= 0"));
                }
                validate_ranges(ua.times.as_ref(), &format!("{field}.times"), &mut errors);
            }
        }

        self.validate_array_names(&mut errors);
        errors
    }

    /// Checks that every appliance, activity and user array gets its own
    /// output file, distinct from the total and the event log.
    ///
    /// Same-kind duplicates of appliances and activities are reported by
    /// [`ScenarioConfig::validate`] itself.
    fn validate_array_names(&self, errors: &mut Vec<ConfigError>) {
        let reserved = [series_file_name(TOTAL), EVENTS_FILE.to_string()];
        let appliances = self.appliances.iter().enumerate().map(|(i, a)| {
            (format!("appliances[{i}].type"), "appliance", a.appliance_type.as_str())
        });
        let activities = self
            .activities
            .iter()
            .enumerate()
            .map(|(i, a)| (format!("activities[{i}].name"), "activity", a.name.as_str()));
        let users = self
            .users
            .iter()
            .enumerate()
            .map(|(i, u)| (format!("users[{i}].name"), "user", u.name.as_str()));

        let mut owners: BTreeMap<String, (&str, &str)> = BTreeMap::new();
        for (field, kind, name) in appliances.chain(activities).chain(users) {
            let file = series_file_name(name);
            if reserved.contains(&file) {
                errors.push(ConfigError::invalid(
                    field,
                    format!("\"{name}\" is reserved for {file}"),
                ));
                continue;
            }
            match owners.get(&file) {
                Some(&(owner_kind, owner))
                    if owner_kind == kind && owner == name && kind != "user" => {}
                Some(&(owner_kind, owner)) => errors.push(ConfigError::invalid(
                    field,
                    format!("{kind} \"{name}\" collides with {owner_kind} \"{owner}\" in {file}"),
                )),
                None => {
                    owners.insert(file, (kind, name));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[general]
days = 2
seed = 7
start_weekday = "sunday"
noise = "C15"

[[appliances]]
type = "kettle"

[[appliances.models]]
name = "kettle_basic"
duration = 120

[[appliances.models.loads]]
kind = "on_off"
fraction = 1.0
power = 2000.0

[[activities]]
name = "tea"
devices = ["kettle"]
states = [
    "fill, 20, 40, true, true, 0, 1.0, 1, 1",
    "boil, 0, 0, false, true, 1, 1.0, 2, 2",
]

[[users]]
name = "alice"
presence = { monday = "07:00-22:00", sunday = "09:00-23:00" }

[[users.activities]]
activity = "tea"
daily_runs = 1.5
times = { monday = "07:00-09:00" }
"#;

    #[test]
    fn minimal_toml_parses() {
        let cfg = ScenarioConfig::from_toml_str(MINIMAL).unwrap();
        assert_eq!(cfg.general.days, 2);
        assert_eq!(cfg.general.start_weekday().unwrap(), Some(Weekday::Sun));
        assert_eq!(
            cfg.general.noise().unwrap(),
            BackgroundNoise::Constant { amplitude: 15.0 }
        );
        assert_eq!(cfg.appliances[0].models[0].loads.len(), 1);
        assert_eq!(cfg.users[0].activities[0].daily_runs, 1.5);
        assert!(cfg.validate().is_empty(), "{:?}", cfg.validate());
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let cfg = ScenarioConfig::from_toml_str("[general]\nseed = 99\n").unwrap();
        assert_eq!(cfg.general.seed, 99);
        assert_eq!(cfg.general.days, 1);
        assert_eq!(cfg.general.start_weekday().unwrap(), None);
        assert!(!cfg.general.vary_appliances);
        assert!(cfg.users.is_empty());
    }

    #[test]
    fn unknown_field_is_rejected() {
        let result = ScenarioConfig::from_toml_str("[general]\nbogus_field = true\n");
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn load_kinds_deserialize() {
        let toml = r#"
[[appliances]]
type = "fridge"

[[appliances.models]]
name = "fridge_a"
type = "fridge"
duration = 900
loads = [
    { kind = "decay", fraction = 0.1, base = 80.0, delta = 300.0, rate = 0.2 },
    { kind = "growth", fraction = 0.2, base = 60.0, scale = 5.0 },
    { kind = "linear", fraction = 0.2, start = 60.0, end = 90.0 },
    { kind = "noise", fraction = 0.5, low = 70.0, mean = 85.0, stdev = 5.0, high = 100.0 },
]
"#;
        let cfg = ScenarioConfig::from_toml_str(toml).unwrap();
        let model = cfg.appliances[0].models[0].to_model();
        assert_eq!(model.usual_duration, 900);
        assert_eq!(model.components.len(), 4);
        assert_eq!(
            model.components[1],
            LoadComponent::Growth {
                fraction: 0.2,
                base: 60.0,
                scale: 5.0,
                stretch: 1.0
            }
        );
        assert_eq!(cfg.appliances[0].models[0].declared_type.as_deref(), Some("fridge"));
    }

    #[test]
    fn validation_catches_zero_days() {
        let mut cfg = ScenarioConfig::from_toml_str(MINIMAL).unwrap();
        cfg.general.days = 0;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field() == Some("general.days")));
    }

    #[test]
    fn activity_named_like_its_appliance_is_rejected() {
        let mut cfg = ScenarioConfig::from_toml_str(MINIMAL).unwrap();
        cfg.activities[0].name = "kettle".to_string();
        cfg.users[0].activities[0].activity = "kettle".to_string();
        let errors = cfg.validate();
        assert_eq!(errors.len(), 1, "{errors:?}");
        assert_eq!(errors[0].field(), Some("activities[0].name"));
    }

    #[test]
    fn user_names_must_not_collide() {
        for name in ["tea", "kettle"] {
            let mut cfg = ScenarioConfig::from_toml_str(MINIMAL).unwrap();
            cfg.users[0].name = name.to_string();
            let errors = cfg.validate();
            assert!(errors.iter().any(|e| e.field() == Some("users[0].name")), "{name}");
        }

        let mut cfg = ScenarioConfig::from_toml_str(MINIMAL).unwrap();
        cfg.users.push(cfg.users[0].clone());
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field() == Some("users[1].name")));
    }

    #[test]
    fn reserved_array_names_are_rejected() {
        let mut cfg = ScenarioConfig::from_toml_str(MINIMAL).unwrap();
        cfg.users[0].name = "total".to_string();
        cfg.appliances[0].appliance_type = "events".to_string();
        cfg.activities[0].devices = vec!["events".to_string()];
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field() == Some("users[0].name")));
        assert!(errors.iter().any(|e| e.field() == Some("appliances[0].type")));
    }

    #[test]
    fn names_sharing_an_output_file_are_rejected() {
        let mut cfg = ScenarioConfig::from_toml_str(MINIMAL).unwrap();
        cfg.users[0].name = "t e a".to_string();
        cfg.activities[0].name = "t_e_a".to_string();
        cfg.users[0].activities[0].activity = "t_e_a".to_string();
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field() == Some("users[0].name")), "{errors:?}");
    }

    #[test]
    fn validation_catches_bad_references() {
        let mut cfg = ScenarioConfig::from_toml_str(MINIMAL).unwrap();
        cfg.activities[0].devices.push("toaster".to_string());
        cfg.users[0].activities[0].activity = "coffee".to_string();
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field() == Some("activities[0].devices")));
        assert!(errors
            .iter()
            .any(|e| e.field() == Some("users[0].activities[0].activity")));
    }

    #[test]
    fn validation_catches_bad_rows_and_ranges() {
        let mut cfg = ScenarioConfig::from_toml_str(MINIMAL).unwrap();
        cfg.activities[0].states.push("broken, 1".to_string());
        cfg.users[0]
            .presence
            .as_mut()
            .unwrap()
            .insert("friday".to_string(), "noon-ish".to_string());
        cfg.users[0]
            .presence
            .as_mut()
            .unwrap()
            .insert("caturday".to_string(), "10:00-11:00".to_string());
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| matches!(e, ConfigError::State { .. })));
        assert!(errors
            .iter()
            .any(|e| e.field() == Some("users[0].presence.friday")));
        assert!(errors
            .iter()
            .any(|e| e.field() == Some("users[0].presence.caturday")));
    }

    #[test]
    fn validation_catches_bad_components() {
        let mut cfg = ScenarioConfig::from_toml_str(MINIMAL).unwrap();
        cfg.appliances[0].models[0].loads = vec![
            LoadConfig::Noise {
                fraction: 0.5,
                low: 10.0,
                mean: 5.0,
                stdev: -1.0,
                high: 0.0,
            },
            LoadConfig::Growth {
                fraction: -0.1,
                base: 0.0,
                scale: 1.0,
                stretch: 0.0,
            },
        ];
        let errors = cfg.validate();
        let fields: Vec<_> = errors.iter().filter_map(|e| e.field()).collect();
        assert!(fields.contains(&"appliances[0].models[0].loads[0].low"));
        assert!(fields.contains(&"appliances[0].models[0].loads[0].stdev"));
        assert!(fields.contains(&"appliances[0].models[0].loads[1].fraction"));
        assert!(fields.contains(&"appliances[0].models[0].loads[1].stretch"));
    }

    #[test]
    fn validation_catches_bad_general_fields() {
        let mut cfg = ScenarioConfig::from_toml_str(MINIMAL).unwrap();
        cfg.general.start_weekday = Some("someday".to_string());
        cfg.general.noise = "loud".to_string();
        cfg.users[0].activities[0].daily_runs = -1.0;
        let fields: Vec<_> = cfg
            .validate()
            .iter()
            .filter_map(|e| e.field().map(str::to_string))
            .collect();
        assert!(fields.contains(&"general.start_weekday".to_string()));
        assert!(fields.contains(&"general.noise".to_string()));
        assert!(fields.contains(&"users[0].activities[0].daily_runs".to_string()));
    }

    #[test]
    fn missing_ranges_default_to_all_day() {
        let ranges = weekday_ranges(None, "users[0].presence").unwrap();
        assert_eq!(ranges.get(Weekday::Wed), Some(ALL_DAY));
    }

    #[test]
    fn from_preset_unknown() {
        let err = ScenarioConfig::from_preset("nonexistent").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownPreset { .. }));
        assert!(err.to_string().contains("demo"));
    }

    #[test]
    fn all_presets_are_valid() {
        for name in ScenarioConfig::PRESETS {
            let cfg = ScenarioConfig::from_preset(name);
            assert!(cfg.is_ok(), "preset \"{name}\" should load: {:?}", cfg.err());
            let errors = cfg.as_ref().map(|c| c.validate()).unwrap_or_default();
            assert!(
                errors.is_empty(),
                "preset \"{name}\" should be valid: {errors:?}"
            );
        }
    }
}
