//! Household members: presence calendar plus the activities they perform.

use std::collections::BTreeSet;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing::info;

use super::bitmap::Bitmap;
use super::scheduler::{ActivityScheduler, SchedulingStats};
use super::types::Trace;
use crate::devices::Appliance;
use crate::error::BindError;

/// A user with a presence bitmap and a set of scheduled activities.
///
/// The user owns its presence bitmap; activity schedulers only clear the
/// user-busy parts of committed instances in it.
#[derive(Debug, Clone)]
pub struct User {
    name: String,
    presence: Bitmap,
    activities: Vec<ActivityScheduler>,
}

impl User {
    pub fn new(name: &str, presence: Bitmap) -> Self {
        Self {
            name: name.to_string(),
            presence,
            activities: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Seconds at which the user is still free.
    pub fn presence(&self) -> &Bitmap {
        &self.presence
    }

    pub fn add_activity(&mut self, activity: ActivityScheduler) {
        self.activities.push(activity);
    }

    pub fn activities(&self) -> &[ActivityScheduler] {
        &self.activities
    }

    /// Appliance types needed by any of the user's activities.
    pub fn required_appliances(&self) -> BTreeSet<String> {
        self.activities
            .iter()
            .flat_map(|a| a.activity().unique_appliances())
            .map(str::to_string)
            .collect()
    }

    /// Binds `appliance` to every activity that needs its type.
    ///
    /// # Returns
    ///
    /// Number of activities the appliance was bound to.
    ///
    /// # Errors
    ///
    /// Returns [`BindError::AlreadyBound`] if an activity already has an
    /// appliance of that type.
    pub fn bind_appliance(&mut self, appliance: &Arc<Appliance>) -> Result<usize, BindError> {
        let mut bound = 0;
        for scheduler in &mut self.activities {
            let activity = scheduler.activity_mut();
            if activity
                .unique_appliances()
                .contains(appliance.appliance_type())
            {
                activity.bind(Arc::clone(appliance))?;
                bound += 1;
            }
        }
        Ok(bound)
    }

    /// Synthesizes all activities of the user over the trace horizon.
    ///
    /// Activities are processed in a random order so long-running ones are
    /// not always squeezed out by the ones listed first.
    pub fn synthesize(&mut self, trace: &mut Trace, vary: bool, rng: &mut StdRng) -> SchedulingStats {
        trace.ensure_series(&self.name);

        let mut order: Vec<usize> = (0..self.activities.len()).collect();
        order.shuffle(rng);

        let mut stats = SchedulingStats::default();
        let count = order.len();
        for (i, idx) in order.into_iter().enumerate() {
            let scheduler = &mut self.activities[idx];
            info!(
                user = %self.name,
                activity = scheduler.activity().name(),
                index = i + 1,
                of = count,
                days = trace.horizon().days,
                "generating load signatures"
            );
            stats += scheduler.synthesize(&self.name, &mut self.presence, trace, vary, rng);
        }
        stats
    }
}
