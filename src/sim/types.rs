//! Core simulation types: horizon, named power arrays, and the output trace.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;

use chrono::Weekday;

use super::bitmap::Bitmap;
use super::event::Event;

/// Seconds in one simulated day; the trace resolution is one sample per second.
pub const SECS_PER_DAY: usize = 86_400;

/// Name of the aggregate power array every synthesis run populates.
pub const TOTAL: &str = "total";

/// Weekdays indexed by `num_days_from_monday`.
pub const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Returns the weekday `days` days after `start`.
pub fn weekday_after(start: Weekday, days: usize) -> Weekday {
    WEEKDAYS[(start.num_days_from_monday() as usize + days) % 7]
}

/// Named per-second power arrays (activity, appliance, user, and `"total"`).
///
/// Ordered so that iteration, and therefore export, is deterministic.
pub type PowerMap = BTreeMap<String, Vec<f32>>;

/// Simulated span: a number of whole days starting on a given weekday.
///
/// # Examples
///
/// ```
/// use chrono::Weekday;
/// use nilm_tracegen::sim::types::Horizon;
///
/// let horizon = Horizon::new(2, Weekday::Sat);
/// assert_eq!(horizon.len(), 172_800);
/// assert_eq!(horizon.weekday_of(1), Weekday::Sun);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Horizon {
    /// Number of simulated days.
    pub days: usize,
    /// Weekday of day 0.
    pub start_weekday: Weekday,
}

impl Horizon {
    /// Creates a new horizon.
    ///
    /// # Panics
    ///
    /// Panics if `days` is zero.
    pub fn new(days: usize, start_weekday: Weekday) -> Self {
        assert!(days > 0, "days must be > 0");
        Self {
            days,
            start_weekday,
        }
    }

    /// Total number of one-second samples.
    pub fn len(&self) -> usize {
        self.days * SECS_PER_DAY
    }

    /// Always `false`; a horizon spans at least one day.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Sample range covered by day `day`.
    pub fn day_range(&self, day: usize) -> Range<usize> {
        day * SECS_PER_DAY..(day + 1) * SECS_PER_DAY
    }

    /// Weekday of day `day`.
    pub fn weekday_of(&self, day: usize) -> Weekday {
        weekday_after(self.start_weekday, day)
    }
}

/// Output of a synthesis run: named power arrays, the event log, and
/// per-appliance busy bitmaps.
///
/// Power arrays only ever grow by addition; nothing here resets them.
#[derive(Debug, Clone)]
pub struct Trace {
    horizon: Horizon,
    powers: PowerMap,
    events: Vec<Event>,
    appliance_busy: BTreeMap<String, Bitmap>,
}

impl Trace {
    /// Creates an empty trace with a zeroed `"total"` array.
    pub fn new(horizon: Horizon) -> Self {
        let mut powers = PowerMap::new();
        powers.insert(TOTAL.to_string(), vec![0.0; horizon.len()]);
        Self {
            horizon,
            powers,
            events: Vec::new(),
            appliance_busy: BTreeMap::new(),
        }
    }

    /// The horizon all arrays span.
    pub fn horizon(&self) -> Horizon {
        self.horizon
    }

    /// Makes sure a zeroed array called `name` exists.
    pub fn ensure_series(&mut self, name: &str) {
        let len = self.horizon.len();
        self.powers
            .entry(name.to_string())
            .or_insert_with(|| vec![0.0; len]);
    }

    /// Adds `samples` into array `name` starting at `offset`.
    ///
    /// Creates the array on first use. Samples beyond the horizon are dropped.
    pub fn accumulate(&mut self, name: &str, offset: usize, samples: &[f32]) {
        self.ensure_series(name);
        let Some(series) = self.powers.get_mut(name) else {
            return;
        };
        if offset >= series.len() {
            return;
        }
        for (slot, sample) in series[offset..].iter_mut().zip(samples) {
            *slot += sample;
        }
    }

    /// Marks `range` of appliance `appliance` as busy.
    pub fn mark_appliance_busy(&mut self, appliance: &str, range: Range<usize>) {
        let len = self.horizon.len();
        self.appliance_busy
            .entry(appliance.to_string())
            .or_insert_with(|| Bitmap::new(len, false))
            .set_range(range, true);
    }

    /// Appends an event to the log.
    pub fn push_event(&mut self, event: Event) {
        self.events.push(event);
    }

    /// Returns the array called `name`, if any contribution was made to it.
    pub fn series(&self, name: &str) -> Option<&[f32]> {
        self.powers.get(name).map(Vec::as_slice)
    }

    /// Mutable access to a named array (used for post-processing such as noise).
    pub fn series_mut(&mut self, name: &str) -> Option<&mut [f32]> {
        self.powers.get_mut(name).map(Vec::as_mut_slice)
    }

    /// All named power arrays.
    pub fn powers(&self) -> &PowerMap {
        &self.powers
    }

    /// Event log in emission order.
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Busy bitmap of an appliance type, if it ever ran.
    pub fn appliance_busy(&self, appliance: &str) -> Option<&Bitmap> {
        self.appliance_busy.get(appliance)
    }

    /// Splits the trace into its power arrays and event log.
    pub fn into_parts(self) -> (PowerMap, Vec<Event>) {
        (self.powers, self.events)
    }
}

impl fmt::Display for Horizon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} day{} from {}",
            self.days,
            if self.days == 1 { "" } else { "s" },
            self.start_weekday
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn horizon_basic() {
        let h = Horizon::new(3, Weekday::Fri);
        assert_eq!(h.len(), 3 * SECS_PER_DAY);
        assert_eq!(h.day_range(1), SECS_PER_DAY..2 * SECS_PER_DAY);
        assert_eq!(h.weekday_of(0), Weekday::Fri);
        assert_eq!(h.weekday_of(2), Weekday::Sun);
        assert_eq!(h.weekday_of(3), Weekday::Mon);
    }

    #[test]
    #[should_panic]
    fn horizon_zero_days_panics() {
        Horizon::new(0, Weekday::Mon);
    }

    #[test]
    fn new_trace_has_zeroed_total() {
        let trace = Trace::new(Horizon::new(1, Weekday::Mon));
        let total = trace.series(TOTAL).unwrap();
        assert_eq!(total.len(), SECS_PER_DAY);
        assert!(total.iter().all(|&w| w == 0.0));
    }

    #[test]
    fn accumulate_adds_and_clips_at_horizon_end() {
        let mut trace = Trace::new(Horizon::new(1, Weekday::Mon));
        trace.accumulate("kettle", 10, &[1.0, 2.0]);
        trace.accumulate("kettle", 11, &[3.0]);
        trace.accumulate("kettle", SECS_PER_DAY - 1, &[5.0, 5.0, 5.0]);

        let kettle = trace.series("kettle").unwrap();
        assert_eq!(kettle[10], 1.0);
        assert_eq!(kettle[11], 5.0);
        assert_eq!(kettle[SECS_PER_DAY - 1], 5.0);
        assert_eq!(kettle.len(), SECS_PER_DAY);
    }

    #[test]
    fn busy_marks_only_requested_range() {
        let mut trace = Trace::new(Horizon::new(1, Weekday::Mon));
        trace.mark_appliance_busy("toaster", 100..110);
        let busy = trace.appliance_busy("toaster").unwrap();
        assert_eq!(busy.count_ones(), 10);
        assert!(busy.all_set(100..110));
        assert!(trace.appliance_busy("kettle").is_none());
    }
}
