//! Per-day placement of activity instances.
//!
//! Each [`ActivityScheduler`] owns the time-of-run bitmap of one activity of
//! one user. Per simulated day it draws how many instances to attempt, asks
//! the state machine for a concrete plan, searches a free window, commits
//! it, and renders the planned appliance operations into the [`Trace`].

use std::ops::{Range, RangeInclusive};

use rand::Rng;
use rand::rngs::StdRng;
use tracing::{debug, info, warn};

use super::bitmap::Bitmap;
use super::event::{Event, Transition};
use super::state_machine::{ActivityDefinition, ActivityPlan};
use super::types::{TOTAL, Trace};
use crate::devices::ModelSelection;

/// Random start offsets probed before falling back to a full scan.
const RANDOM_PROBES: usize = 10;

/// Number of instances to attempt on one day.
///
/// Rates of one or more are dithered: `round(rate + U(-0.5, 0.5))`. Lower
/// rates give one instance with probability `rate`, else none.
///
/// # Examples
///
/// ```
/// use nilm_tracegen::sim::scheduler::daily_repetitions;
/// use rand::SeedableRng;
/// use rand::rngs::StdRng;
///
/// let mut rng = StdRng::seed_from_u64(1);
/// assert_eq!(daily_repetitions(0.0, &mut rng), 0);
/// assert!((2..=3).contains(&daily_repetitions(2.5, &mut rng)));
/// ```
pub fn daily_repetitions(rate: f64, rng: &mut StdRng) -> usize {
    if rate >= 1.0 {
        (rate + rng.random::<f64>() - 0.5).round().max(0.0) as usize
    } else if rng.random::<f64>() > rate {
        0
    } else {
        1
    }
}

/// Placement outcome counters for one activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulingStats {
    /// Instances committed to the calendar.
    pub scheduled: usize,
    /// Attempts that found no plan or no window.
    pub failed: usize,
}

impl std::ops::AddAssign for SchedulingStats {
    fn add_assign(&mut self, other: Self) {
        self.scheduled += other.scheduled;
        self.failed += other.failed;
    }
}

/// Inclusive range of legal window starts for a `len`-second window inside
/// `availability`, bounded by its first and last free second.
fn start_range(availability: &Bitmap, len: usize) -> Option<RangeInclusive<usize>> {
    let earliest = availability.earliest()?;
    let latest = availability.latest()?;
    let last_start = (latest + 1).checked_sub(len)?;
    (earliest <= last_start).then_some(earliest..=last_start)
}

/// Searches a fully free `len`-second window with its start in `starts`.
///
/// Tries a handful of uniform random starts first, then scans left to right.
fn find_window(
    availability: &Bitmap,
    starts: RangeInclusive<usize>,
    len: usize,
    rng: &mut StdRng,
) -> Option<usize> {
    for _ in 0..RANDOM_PROBES {
        let start = rng.random_range(starts.clone());
        if availability.all_set(start..start + len) {
            return Some(start);
        }
    }
    availability.first_run(starts, len)
}

/// Scheduler for one activity of one user.
#[derive(Debug, Clone)]
pub struct ActivityScheduler {
    activity: ActivityDefinition,
    daily_runs: f64,
    /// Seconds at which a new instance may still run; committed windows are
    /// cleared so instances of the same activity never overlap.
    time_of_run: Bitmap,
    selection: ModelSelection,
    stats: SchedulingStats,
}

impl ActivityScheduler {
    /// Creates a scheduler.
    ///
    /// # Arguments
    ///
    /// * `activity` - Activity definition, ideally with all appliances bound
    /// * `daily_runs` - Expected number of instances per day
    /// * `time_of_run` - Horizon-long bitmap of legal start-to-end seconds
    pub fn new(activity: ActivityDefinition, daily_runs: f64, time_of_run: Bitmap) -> Self {
        Self {
            activity,
            daily_runs,
            time_of_run,
            selection: ModelSelection::new(),
            stats: SchedulingStats::default(),
        }
    }

    pub fn activity(&self) -> &ActivityDefinition {
        &self.activity
    }

    /// Mutable access to the definition, for binding appliances.
    pub fn activity_mut(&mut self) -> &mut ActivityDefinition {
        &mut self.activity
    }

    pub fn daily_runs(&self) -> f64 {
        self.daily_runs
    }

    /// Remaining legal time of run.
    pub fn time_of_run(&self) -> &Bitmap {
        &self.time_of_run
    }

    /// Totals over every [`ActivityScheduler::synthesize`] call so far.
    pub fn stats(&self) -> SchedulingStats {
        self.stats
    }

    /// Places instances of the activity on every day of the trace horizon.
    ///
    /// # Arguments
    ///
    /// * `user` - Name of the power array receiving the user's share
    /// * `presence` - The user's live availability; user-busy sub-ranges of
    ///   committed instances are cleared in it
    /// * `trace` - Output arrays, events, and appliance busy bitmaps
    /// * `vary` - Redraw appliance definitions before each interpretation
    /// * `rng` - Shared generator
    ///
    /// # Returns
    ///
    /// Counters for this call.
    pub fn synthesize(
        &mut self,
        user: &str,
        presence: &mut Bitmap,
        trace: &mut Trace,
        vary: bool,
        rng: &mut StdRng,
    ) -> SchedulingStats {
        let name = self.activity.name().to_string();
        let mut stats = SchedulingStats::default();

        let missing = self.activity.missing_bindings();
        if !missing.is_empty() {
            warn!(
                activity = %name,
                ?missing,
                "unsatisfied appliance bindings, activity will not be synthesized"
            );
            return stats;
        }
        trace.ensure_series(&name);

        let horizon = trace.horizon();
        for day in 0..horizon.days {
            let reps = daily_repetitions(self.daily_runs, rng);
            debug!(activity = %name, day, reps, "attempting instances");

            let day_range = horizon.day_range(day);
            let mut placed = 0;
            for attempt in 0..reps {
                let Some(plan) = self.activity.interpret(&mut self.selection, vary, rng) else {
                    warn!(activity = %name, day, "could not find a suitable schedule");
                    stats.failed += reps - attempt;
                    break;
                };

                let allowed = self.time_of_run.slice(day_range.clone());
                let availability = if plan.requires_user() {
                    &allowed & &presence.slice(day_range.clone())
                } else {
                    allowed
                };

                let len = plan.duration.max(1);
                let Some(starts) = start_range(&availability, len) else {
                    debug!(activity = %name, day, duration = plan.duration, "no time slot left today");
                    if self.time_of_run.slice(day_range.clone()).count_ones() > 0 {
                        stats.failed += 1;
                    }
                    break;
                };
                let Some(relative) = find_window(&availability, starts, len, rng) else {
                    debug!(activity = %name, day, duration = plan.duration, "no free window found");
                    stats.failed += 1;
                    break;
                };

                let start = day_range.start + relative;
                self.commit(start, &plan, presence);
                emit(&name, user, start, &plan, trace, rng);
                debug!(activity = %name, day, offset = start, duration = plan.duration, "instance scheduled");
                placed += 1;
            }

            stats.scheduled += placed;
        }

        if stats.scheduled == 0 && stats.failed > 0 {
            warn!(
                activity = %name,
                failed = stats.failed,
                "could not fit any instance"
            );
        } else {
            info!(
                activity = %name,
                scheduled = stats.scheduled,
                failed = stats.failed,
                "activity synthesized"
            );
        }

        self.stats += stats;
        stats
    }

    /// Marks a placed instance busy: the whole window in the time of run,
    /// only the user-busy sub-range in the user's presence.
    fn commit(&mut self, start: usize, plan: &ActivityPlan, presence: &mut Bitmap) {
        self.time_of_run.set_range(start..start + plan.duration, false);
        if let Some(Range { start: from, end: to }) = plan.user_busy() {
            presence.set_range(start + from..start + to, false);
        }
    }
}

/// Renders the operations of a placed instance and logs its events.
///
/// ACTIVITY END is the latest appliance OFF; without operations it is the
/// last second of the window.
fn emit(
    activity: &str,
    user: &str,
    start: usize,
    plan: &ActivityPlan,
    trace: &mut Trace,
    rng: &mut StdRng,
) {
    let last = trace.horizon().len() - 1;
    trace.push_event(Event::activity(start, activity, Transition::Start));

    let mut end: Option<usize> = None;
    for op in &plan.operations {
        let appliance = op.appliance.appliance_type();
        let on = start + op.offset;
        let off = (on + op.duration - 1).min(last);

        trace.push_event(Event::device(on, appliance, Transition::On));
        let samples = op.model.render(op.duration, rng);
        for series in [appliance, activity, user, TOTAL] {
            trace.accumulate(series, on, &samples);
        }
        trace.mark_appliance_busy(appliance, on..on + op.duration);
        trace.push_event(Event::device(off, appliance, Transition::Off));

        end = Some(end.map_or(off, |e| e.max(off)));
    }

    let end = end.unwrap_or_else(|| (start + plan.duration.saturating_sub(1)).min(last));
    trace.push_event(Event::activity(end, activity, Transition::End));
}
