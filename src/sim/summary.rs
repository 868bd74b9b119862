//! Post-hoc summary of a synthesized trace.

use std::collections::BTreeMap;
use std::fmt;

use chrono::Weekday;

use super::event::{Event, EventKind, Transition, sort_chronologically};
use super::noise::BackgroundNoise;
use super::types::{TOTAL, Trace};

/// Aggregate figures derived from a complete synthesis run.
///
/// Computed from the event log and the `"total"` array, so it always agrees
/// with what gets exported.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceSummary {
    pub days: usize,
    pub first_weekday: Weekday,
    /// Appliance types with at least one operation.
    pub active_devices: usize,
    /// Appliance operations across all types.
    pub operations: usize,
    /// Operations per appliance type, including types that never ran.
    pub runs: BTreeMap<String, usize>,
    /// Largest number of appliances switched on at the same time.
    pub max_concurrency: usize,
    /// Energy of the `"total"` array (kWh).
    pub total_energy_kwh: f64,
    pub seed: u64,
    pub noise: BackgroundNoise,
}

impl TraceSummary {
    /// Summarizes `trace`.
    ///
    /// # Arguments
    ///
    /// * `trace` - Synthesized trace
    /// * `appliances` - Every defined appliance type
    /// * `seed` - Seed the run used
    /// * `noise` - Background noise applied to the total
    pub fn from_trace<'a>(
        trace: &Trace,
        appliances: impl IntoIterator<Item = &'a str>,
        seed: u64,
        noise: BackgroundNoise,
    ) -> Self {
        let mut runs: BTreeMap<String, usize> =
            appliances.into_iter().map(|a| (a.to_string(), 0)).collect();

        let mut device_events: Vec<Event> = trace
            .events()
            .iter()
            .filter(|e| e.kind == EventKind::Device)
            .cloned()
            .collect();
        sort_chronologically(&mut device_events);

        let mut concurrency = 0_usize;
        let mut max_concurrency = 0;
        for e in &device_events {
            match e.transition {
                Transition::On => {
                    *runs.entry(e.name.clone()).or_default() += 1;
                    concurrency += 1;
                    max_concurrency = max_concurrency.max(concurrency);
                }
                Transition::Off => concurrency = concurrency.saturating_sub(1),
                _ => {}
            }
        }

        let total_energy_kwh = trace
            .series(TOTAL)
            .map(|s| s.iter().map(|&w| f64::from(w)).sum::<f64>() / 3_600_000.0)
            .unwrap_or(0.0);

        let horizon = trace.horizon();
        Self {
            days: horizon.days,
            first_weekday: horizon.start_weekday,
            active_devices: runs.values().filter(|&&n| n > 0).count(),
            operations: runs.values().sum(),
            runs,
            max_concurrency,
            total_energy_kwh,
            seed,
            noise,
        }
    }
}

impl fmt::Display for TraceSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Trace Summary ---")?;
        writeln!(f, "Trace duration (days):   {}", self.days)?;
        writeln!(f, "First weekday:           {}", self.first_weekday)?;
        writeln!(f, "Active devices:          {}", self.active_devices)?;
        writeln!(f, "Appliance operations:    {}", self.operations)?;
        for (appliance, runs) in &self.runs {
            writeln!(f, "  {appliance:<20} {runs} runs")?;
        }
        writeln!(f, "Max. concurrency:        {}", self.max_concurrency)?;
        writeln!(f, "Total energy:            {:.2} kWh", self.total_energy_kwh)?;
        writeln!(f, "Random seed:             {}", self.seed)?;
        write!(f, "Added noise:             {}", self.noise)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::types::Horizon;

    fn trace() -> Trace {
        let mut trace = Trace::new(Horizon::new(1, Weekday::Wed));
        for (on, off, name) in [(10, 19, "kettle"), (15, 40, "toaster"), (19, 30, "kettle"), (50, 60, "lamp")] {
            trace.push_event(Event::device(on, name, Transition::On));
            trace.push_event(Event::device(off, name, Transition::Off));
        }
        trace.push_event(Event::activity(10, "breakfast", Transition::Start));
        trace.push_event(Event::activity(40, "breakfast", Transition::End));
        trace.accumulate(TOTAL, 0, &[3_600_000.0]);
        trace
    }

    #[test]
    fn counts_runs_and_concurrency() {
        let summary = TraceSummary::from_trace(
            &trace(),
            ["kettle", "toaster", "lamp", "oven"],
            42,
            BackgroundNoise::None,
        );
        assert_eq!(summary.operations, 4);
        assert_eq!(summary.active_devices, 3);
        assert_eq!(summary.runs["kettle"], 2);
        assert_eq!(summary.runs["oven"], 0);
        // At t=19 the second kettle run switches on before the first one is
        // logged off, so three appliances overlap momentarily.
        assert_eq!(summary.max_concurrency, 3);
        assert!((summary.total_energy_kwh - 1.0).abs() < 1e-9);
    }

    #[test]
    fn display_lists_every_appliance() {
        let summary = TraceSummary::from_trace(&trace(), ["kettle", "oven"], 7, BackgroundNoise::Constant { amplitude: 20.0 });
        let text = summary.to_string();
        assert!(text.contains("Wed"));
        assert!(text.contains("oven"));
        assert!(text.contains("C20"));
        assert!(text.contains("Random seed:             7"));
    }
}
