//! Synthesis engine that builds appliances and users from a scenario and runs them.

use std::collections::BTreeMap;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{info, warn};

use super::bitmap::weekly_bitmap;
use super::noise::BackgroundNoise;
use super::scheduler::{ActivityScheduler, SchedulingStats};
use super::state_machine::ActivityDefinition;
use super::types::{Horizon, TOTAL, Trace, WEEKDAYS};
use super::user::User;
use crate::config::{ScenarioConfig, weekday_ranges};
use crate::devices::Appliance;
use crate::devices::appliance::check_declared_type;
use crate::error::ConfigError;

/// Synthesis engine owning the appliances, users, and generator of one run.
///
/// Built with [`Engine::from_config`]; [`Engine::run`] consumes it, since
/// synthesis commits windows into the users' calendars.
pub struct Engine {
    horizon: Horizon,
    seed: u64,
    vary: bool,
    noise: BackgroundNoise,
    rng: StdRng,
    appliances: BTreeMap<String, Arc<Appliance>>,
    users: Vec<User>,
}

impl Engine {
    /// Builds an engine from a scenario.
    ///
    /// Seeds the generator, resolves the start weekday (drawn when not
    /// configured), draws each appliance's initial definition, decodes every
    /// activity, builds the presence and time-of-run calendars, and binds
    /// appliances to the activities that need them.
    ///
    /// # Errors
    ///
    /// Returns the first configuration problem found, including a required
    /// appliance type that has no definition.
    pub fn from_config(config: &ScenarioConfig) -> Result<Self, ConfigError> {
        if let Some(error) = config.validate().into_iter().next() {
            return Err(error);
        }

        let general = &config.general;
        let mut rng = StdRng::seed_from_u64(general.seed);
        let start_weekday = match general.start_weekday()? {
            Some(day) => day,
            None => WEEKDAYS[rng.random_range(0..=6)],
        };
        let horizon = Horizon::new(general.days, start_weekday);

        let mut appliances = BTreeMap::new();
        for (i, a) in config.appliances.iter().enumerate() {
            let models = a
                .models
                .iter()
                .map(|m| {
                    check_declared_type(&a.appliance_type, &m.name, m.declared_type.as_deref());
                    m.to_model()
                })
                .collect();
            let appliance = Appliance::new(&a.appliance_type, models, &mut rng)
                .ok_or_else(|| ConfigError::invalid(format!("appliances[{i}].models"), "must not be empty"))?;
            info!(
                appliance = %a.appliance_type,
                candidates = appliance.candidates().len(),
                initial = %appliance.initial_model().name,
                "appliance loaded"
            );
            appliances.insert(a.appliance_type.clone(), Arc::new(appliance));
        }

        let mut definitions = BTreeMap::new();
        for act in &config.activities {
            let definition = ActivityDefinition::parse(&act.name, act.devices.clone(), &act.states)
                .map_err(|source| ConfigError::State {
                    activity: act.name.clone(),
                    source,
                })?;
            definitions.insert(act.name.as_str(), definition);
        }

        let mut users = Vec::with_capacity(config.users.len());
        for (i, u) in config.users.iter().enumerate() {
            let field = format!("users[{i}].presence");
            let presence = weekly_bitmap(
                &weekday_ranges(u.presence.as_ref(), &field)?,
                horizon.days,
                start_weekday,
            )
            .map_err(|source| ConfigError::TimeRange { field, source })?;

            let mut user = User::new(&u.name, presence);
            for (j, ua) in u.activities.iter().enumerate() {
                let field = format!("users[{i}].activities[{j}]");
                let definition = definitions.get(ua.activity.as_str()).cloned().ok_or_else(|| {
                    ConfigError::invalid(format!("{field}.activity"), format!("unknown activity \"{}\"", ua.activity))
                })?;
                let field = format!("{field}.times");
                let time_of_run = weekly_bitmap(
                    &weekday_ranges(ua.times.as_ref(), &field)?,
                    horizon.days,
                    start_weekday,
                )
                .map_err(|source| ConfigError::TimeRange { field, source })?;
                user.add_activity(ActivityScheduler::new(definition, ua.daily_runs, time_of_run));
            }

            let required = user.required_appliances();
            if required.is_empty() {
                warn!(user = %u.name, "user does not operate any appliances");
            }
            for appliance_type in required {
                let appliance = appliances.get(&appliance_type).ok_or_else(|| {
                    ConfigError::invalid(
                        format!("users[{i}]"),
                        format!("cannot bind appliance type \"{appliance_type}\": no definition available"),
                    )
                })?;
                user.bind_appliance(appliance)
                    .map_err(|e| ConfigError::invalid(format!("users[{i}]"), e.to_string()))?;
            }
            users.push(user);
        }

        Ok(Self {
            horizon,
            seed: general.seed,
            vary: general.vary_appliances,
            noise: general.noise()?,
            rng,
            appliances,
            users,
        })
    }

    pub fn horizon(&self) -> Horizon {
        self.horizon
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn noise(&self) -> BackgroundNoise {
        self.noise
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn appliances(&self) -> &BTreeMap<String, Arc<Appliance>> {
        &self.appliances
    }

    /// Synthesizes every user in configuration order and returns the trace.
    ///
    /// Every defined appliance gets a power array even if it never ran.
    /// Background noise is applied to `"total"` last.
    pub fn run(mut self) -> Trace {
        info!(
            horizon = %self.horizon,
            users = self.users.len(),
            seed = self.seed,
            "synthesis started"
        );

        let mut trace = Trace::new(self.horizon);
        let mut stats = SchedulingStats::default();
        for user in &mut self.users {
            let user_stats = user.synthesize(&mut trace, self.vary, &mut self.rng);
            info!(
                user = user.name(),
                scheduled = user_stats.scheduled,
                failed = user_stats.failed,
                "user synthesized"
            );
            stats += user_stats;
        }

        for appliance_type in self.appliances.keys() {
            trace.ensure_series(appliance_type);
        }
        if let Some(total) = trace.series_mut(TOTAL) {
            self.noise.apply(total, &mut self.rng);
        }

        info!(
            scheduled = stats.scheduled,
            failed = stats.failed,
            events = trace.events().len(),
            "synthesis finished"
        );
        trace
    }
}
