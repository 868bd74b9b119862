//! Probabilistic activity state machines.
//!
//! An activity is a list of states. The walk starts at state 0, and each
//! state picks one of two successors by a Bernoulli draw. Any successor index
//! past the last state ends the walk. States may run an appliance; the walk
//! produces one concrete [`ActivityPlan`] of appliance operations.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::{Range, RangeInclusive};
use std::sync::Arc;

use rand::Rng;
use rand::rngs::StdRng;
use tracing::{debug, warn};

use crate::devices::{Appliance, ApplianceModel, ModelSelection};
use crate::error::{BindError, StateParseError};

/// Number of comma-separated fields in a state row.
pub const STATE_FIELDS: usize = 9;

/// Walks longer than this are treated as malformed (the graph never exits).
const MAX_TRANSITIONS: usize = 10_000;

/// Fallback state duration, and the gap left after an unattended appliance start.
const SHORT_PAUSE_SECS: RangeInclusive<usize> = 5..=10;

/// One decoded state row:
/// `name, min, max, requires_user, must_complete, appliance_id, p, succ_a, succ_b`.
#[derive(Debug, Clone, PartialEq)]
pub struct State {
    pub name: String,
    pub min_duration: usize,
    pub max_duration: usize,
    /// The user is occupied while this state runs.
    pub requires_user: bool,
    /// The walk waits for the appliance to finish before moving on.
    pub must_complete: bool,
    /// 1-based index into the activity's device list; `None` for id 0.
    pub appliance: Option<usize>,
    /// Probability of moving to `next_a` rather than `next_b`.
    pub probability: f64,
    pub next_a: usize,
    pub next_b: usize,
}

impl State {
    /// Parses a state row, checking field count and every field type.
    ///
    /// # Errors
    ///
    /// Returns a [`StateParseError`] naming the first offending field.
    ///
    /// # Examples
    ///
    /// ```
    /// use nilm_tracegen::sim::state_machine::State;
    ///
    /// let state = State::parse(0, "boil, 0, 0, false, true, 1, 1.0, 1, 1").unwrap();
    /// assert_eq!(state.appliance, Some(1));
    /// assert!(state.must_complete);
    /// ```
    pub fn parse(index: usize, row: &str) -> Result<Self, StateParseError> {
        let fields: Vec<&str> = row.split(',').map(str::trim).collect();
        if fields.len() != STATE_FIELDS {
            return Err(StateParseError::FieldCount {
                index,
                expected: STATE_FIELDS,
                found: fields.len(),
            });
        }

        let invalid = |field: &'static str, value: &str| StateParseError::InvalidField {
            index,
            field,
            value: value.to_string(),
        };
        let int = |field: &'static str, value: &str| -> Result<usize, StateParseError> {
            value.parse().map_err(|_| invalid(field, value))
        };
        let flag = |field: &'static str, value: &str| -> Result<bool, StateParseError> {
            match value.to_ascii_lowercase().as_str() {
                "true" => Ok(true),
                "false" => Ok(false),
                _ => Err(invalid(field, value)),
            }
        };

        if fields[0].is_empty() {
            return Err(invalid("name", fields[0]));
        }
        let probability: f64 = fields[6]
            .parse()
            .ok()
            .filter(|p: &f64| p.is_finite())
            .ok_or_else(|| invalid("probability", fields[6]))?;
        let appliance = int("appliance id", fields[5])?;

        Ok(Self {
            name: fields[0].to_string(),
            min_duration: int("min duration", fields[1])?,
            max_duration: int("max duration", fields[2])?,
            requires_user: flag("requires_user", fields[3])?,
            must_complete: flag("must_complete", fields[4])?,
            appliance: (appliance != 0).then_some(appliance),
            probability,
            next_a: int("successor a", fields[7])?,
            next_b: int("successor b", fields[8])?,
        })
    }
}

/// One appliance invocation inside a plan, relative to the activity start.
#[derive(Debug, Clone)]
pub struct ScheduledOperation {
    pub offset: usize,
    pub appliance: Arc<Appliance>,
    /// Definition active when the operation was planned.
    pub model: Arc<ApplianceModel>,
    pub duration: usize,
}

/// Result of one walk through an activity state machine.
#[derive(Debug, Clone)]
pub struct ActivityPlan {
    /// Final cursor position. Appliances left running unattended may
    /// outlast it.
    pub duration: usize,
    /// Operations in the order their states were visited.
    pub operations: Vec<ScheduledOperation>,
    /// Offset at which the first user-involving state began.
    pub user_busy_start: Option<usize>,
    /// Cursor after the last user-involving state.
    pub user_busy_end: usize,
}

impl ActivityPlan {
    /// Whether any state needed the user.
    pub fn requires_user(&self) -> bool {
        self.user_busy_start.is_some()
    }

    /// Offsets (relative to the activity start) during which the user is busy.
    pub fn user_busy(&self) -> Option<Range<usize>> {
        self.user_busy_start
            .map(|start| start..self.user_busy_end.max(start))
    }
}

/// A named activity: its states, the appliance types it needs, and the
/// appliances bound to those types.
#[derive(Debug, Clone)]
pub struct ActivityDefinition {
    name: String,
    states: Vec<State>,
    devices: Vec<String>,
    bindings: BTreeMap<String, Option<Arc<Appliance>>>,
}

impl ActivityDefinition {
    /// Creates an activity from already decoded states.
    ///
    /// `devices` lists the appliance types; appliance id `k` in a state
    /// refers to `devices[k - 1]`.
    pub fn new(name: &str, devices: Vec<String>, states: Vec<State>) -> Self {
        let bindings = devices.iter().map(|d| (d.clone(), None)).collect();
        Self {
            name: name.to_string(),
            states,
            devices,
            bindings,
        }
    }

    /// Creates an activity by parsing textual state rows.
    ///
    /// # Errors
    ///
    /// Fails on the first row that does not decode.
    pub fn parse<S: AsRef<str>>(
        name: &str,
        devices: Vec<String>,
        rows: &[S],
    ) -> Result<Self, StateParseError> {
        let states = rows
            .iter()
            .enumerate()
            .map(|(i, row)| State::parse(i, row.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(name, devices, states))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn states(&self) -> &[State] {
        &self.states
    }

    /// Required appliance types, duplicates included.
    pub fn required_appliances(&self) -> &[String] {
        &self.devices
    }

    /// Required appliance types without duplicates.
    pub fn unique_appliances(&self) -> BTreeSet<&str> {
        self.devices.iter().map(String::as_str).collect()
    }

    /// Binds an appliance to the type it implements. Each type binds once.
    ///
    /// # Errors
    ///
    /// Returns a [`BindError`] if the type is not required or already bound.
    pub fn bind(&mut self, appliance: Arc<Appliance>) -> Result<(), BindError> {
        let Some(slot) = self.bindings.get_mut(appliance.appliance_type()) else {
            return Err(BindError::NotRequired {
                activity: self.name.clone(),
                appliance: appliance.appliance_type().to_string(),
            });
        };
        if slot.is_some() {
            return Err(BindError::AlreadyBound {
                activity: self.name.clone(),
                appliance: appliance.appliance_type().to_string(),
            });
        }
        *slot = Some(appliance);
        debug!(
            activity = %self.name,
            bound = self.bindings.values().filter(|b| b.is_some()).count(),
            required = self.bindings.len(),
            "appliance bound"
        );
        Ok(())
    }

    /// Required types that have no appliance bound yet.
    pub fn missing_bindings(&self) -> Vec<&str> {
        self.bindings
            .iter()
            .filter(|(_, b)| b.is_none())
            .map(|(t, _)| t.as_str())
            .collect()
    }

    /// Appliance bound to 1-based device slot `slot`, if any.
    fn appliance_at(&self, slot: usize) -> Option<Arc<Appliance>> {
        let appliance_type = self.devices.get(slot.checked_sub(1)?)?;
        self.bindings.get(appliance_type)?.clone()
    }

    /// Walks the state machine once and returns the resulting plan.
    ///
    /// With `vary` set, every bound appliance draws a fresh definition into
    /// `selection` first. Returns `None` (after logging a warning) when the
    /// walk hits a state whose appliance cannot be resolved, or never exits.
    pub fn interpret(
        &self,
        selection: &mut ModelSelection,
        vary: bool,
        rng: &mut StdRng,
    ) -> Option<ActivityPlan> {
        if vary {
            for appliance in self.bindings.values().flatten() {
                selection.redraw(appliance, rng);
            }
        }

        let mut cursor = 0;
        let mut operations = Vec::new();
        let mut user_busy_start = None;
        let mut user_busy_end = 0;
        let mut current = 0;
        let mut transitions = 0;

        while current < self.states.len() {
            transitions += 1;
            if transitions > MAX_TRANSITIONS {
                warn!(
                    activity = %self.name,
                    "state machine does not terminate, skipping activity"
                );
                return None;
            }

            let state = &self.states[current];
            let appliance = match state.appliance {
                None => None,
                Some(slot) => match self.appliance_at(slot) {
                    Some(appliance) => Some(appliance),
                    None => {
                        warn!(
                            activity = %self.name,
                            state = %state.name,
                            slot,
                            "state refers to an unknown or unbound appliance, skipping activity"
                        );
                        return None;
                    }
                },
            };

            if user_busy_start.is_none() && state.requires_user {
                user_busy_start = Some(cursor);
            }

            let duration = match (state.min_duration, state.max_duration, &appliance) {
                (0, 0, None) => {
                    warn!(
                        activity = %self.name,
                        state = %state.name,
                        "state has no duration, assuming 5-10 seconds"
                    );
                    rng.random_range(SHORT_PAUSE_SECS)
                }
                (0, 0, Some(appliance)) => selection.current(appliance).usual_duration,
                (lo, hi, _) => rng.random_range(lo.min(hi)..=lo.max(hi)),
            };

            debug!(
                activity = %self.name,
                state = %state.name,
                index = current,
                appliance = appliance.as_ref().map_or("none", |a| a.appliance_type()),
                duration,
                offset = cursor,
                user = state.requires_user,
                "state"
            );

            match appliance {
                Some(appliance) => {
                    if duration > 0 {
                        operations.push(ScheduledOperation {
                            offset: cursor,
                            model: selection.current(&appliance),
                            appliance,
                            duration,
                        });
                    }
                    cursor += if state.must_complete {
                        duration
                    } else {
                        rng.random_range(SHORT_PAUSE_SECS)
                    };
                }
                None => cursor += duration,
            }

            if state.requires_user {
                user_busy_end = cursor;
            }

            current = if rng.random::<f64>() < state.probability {
                state.next_a
            } else {
                state.next_b
            };
        }

        Some(ActivityPlan {
            duration: cursor,
            operations,
            user_busy_start,
            user_busy_end,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::LoadComponent;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(11)
    }

    fn kettle(rng: &mut StdRng) -> Arc<Appliance> {
        let model = ApplianceModel::new(
            "kettle_a",
            120,
            vec![LoadComponent::OnOff {
                fraction: 1.0,
                power: 2_000.0,
            }],
        );
        Arc::new(Appliance::new("kettle", vec![model], rng).unwrap())
    }

    fn activity(rows: &[&str]) -> ActivityDefinition {
        ActivityDefinition::parse("tea", vec!["kettle".to_string()], rows).unwrap()
    }

    #[test]
    fn parse_full_row() {
        let s = State::parse(3, " fill , 10, 20, TRUE, false, 0, 0.25, 4, 7 ").unwrap();
        assert_eq!(s.name, "fill");
        assert_eq!((s.min_duration, s.max_duration), (10, 20));
        assert!(s.requires_user);
        assert!(!s.must_complete);
        assert_eq!(s.appliance, None);
        assert_eq!(s.probability, 0.25);
        assert_eq!((s.next_a, s.next_b), (4, 7));
    }

    #[test]
    fn parse_rejects_wrong_field_count() {
        let err = State::parse(2, "a, 1, 2, true").unwrap_err();
        assert_eq!(
            err,
            StateParseError::FieldCount {
                index: 2,
                expected: STATE_FIELDS,
                found: 4
            }
        );
    }

    #[test]
    fn parse_rejects_bad_fields() {
        assert!(matches!(
            State::parse(0, "a, x, 2, true, true, 0, 1.0, 1, 1"),
            Err(StateParseError::InvalidField { field: "min duration", .. })
        ));
        assert!(matches!(
            State::parse(0, "a, 1, 2, yes, true, 0, 1.0, 1, 1"),
            Err(StateParseError::InvalidField { field: "requires_user", .. })
        ));
        assert!(matches!(
            State::parse(0, "a, 1, 2, true, true, 0, nan, 1, 1"),
            Err(StateParseError::InvalidField { field: "probability", .. })
        ));
        assert!(matches!(
            State::parse(0, "a, 1, 2, true, true, -1, 1.0, 1, 1"),
            Err(StateParseError::InvalidField { field: "appliance id", .. })
        ));
    }

    #[test]
    fn probability_one_always_takes_successor_a() {
        let act = activity(&[
            "start, 1, 1, false, true, 0, 1.0, 1, 2",
            "a, 10, 10, false, true, 0, 1.0, 3, 3",
            "b, 20, 20, false, true, 0, 1.0, 3, 3",
        ]);
        let mut r = rng();
        let mut sel = ModelSelection::new();
        for _ in 0..200 {
            assert_eq!(act.interpret(&mut sel, false, &mut r).unwrap().duration, 11);
        }
    }

    #[test]
    fn probability_zero_always_takes_successor_b() {
        let act = activity(&[
            "start, 1, 1, false, true, 0, 0.0, 1, 2",
            "a, 10, 10, false, true, 0, 1.0, 3, 3",
            "b, 20, 20, false, true, 0, 1.0, 3, 3",
        ]);
        let mut r = rng();
        let mut sel = ModelSelection::new();
        for _ in 0..200 {
            assert_eq!(act.interpret(&mut sel, false, &mut r).unwrap().duration, 21);
        }
    }

    #[test]
    fn zero_duration_without_appliance_defaults_to_short_pause() {
        let act = activity(&["idle, 0, 0, false, true, 0, 1.0, 1, 1"]);
        let mut r = rng();
        let mut sel = ModelSelection::new();
        for _ in 0..50 {
            let plan = act.interpret(&mut sel, false, &mut r).unwrap();
            assert!(SHORT_PAUSE_SECS.contains(&plan.duration));
            assert!(plan.operations.is_empty());
        }
    }

    #[test]
    fn swapped_bounds_still_sample_in_range() {
        let act = activity(&["wait, 30, 10, false, true, 0, 1.0, 1, 1"]);
        let mut r = rng();
        let mut sel = ModelSelection::new();
        for _ in 0..50 {
            let d = act.interpret(&mut sel, false, &mut r).unwrap().duration;
            assert!((10..=30).contains(&d));
        }
    }

    #[test]
    fn zero_duration_with_appliance_uses_usual_duration() {
        let mut r = rng();
        let mut act = activity(&["boil, 0, 0, false, true, 1, 1.0, 1, 1"]);
        act.bind(kettle(&mut r)).unwrap();

        let plan = act.interpret(&mut ModelSelection::new(), false, &mut r).unwrap();
        assert_eq!(plan.duration, 120);
        assert_eq!(plan.operations.len(), 1);
        assert_eq!(plan.operations[0].offset, 0);
        assert_eq!(plan.operations[0].duration, 120);
        assert_eq!(plan.operations[0].appliance.appliance_type(), "kettle");
    }

    #[test]
    fn unattended_appliance_only_advances_by_jitter() {
        let mut r = rng();
        let mut act = activity(&[
            "start, 0, 0, false, false, 1, 1.0, 1, 1",
            "leave, 60, 60, false, true, 0, 1.0, 2, 2",
        ]);
        act.bind(kettle(&mut r)).unwrap();

        let plan = act.interpret(&mut ModelSelection::new(), false, &mut r).unwrap();
        let op = &plan.operations[0];
        assert_eq!(op.duration, 120);
        let jitter = plan.duration - 60;
        assert!(SHORT_PAUSE_SECS.contains(&jitter));
        assert!(plan.duration < op.duration + 60);
    }

    #[test]
    fn user_bounds_cover_user_states_only() {
        let mut r = rng();
        let mut act = activity(&[
            "prep, 5, 5, false, true, 0, 1.0, 1, 1",
            "fill, 30, 30, true, true, 0, 1.0, 2, 2",
            "boil, 100, 100, false, true, 1, 1.0, 3, 3",
            "pour, 20, 20, true, true, 0, 1.0, 4, 4",
            "sip, 50, 50, false, true, 0, 1.0, 5, 5",
        ]);
        act.bind(kettle(&mut r)).unwrap();

        let plan = act.interpret(&mut ModelSelection::new(), false, &mut r).unwrap();
        assert_eq!(plan.duration, 205);
        assert_eq!(plan.user_busy_start, Some(5));
        assert_eq!(plan.user_busy_end, 155);
        assert_eq!(plan.user_busy(), Some(5..155));
        assert_eq!(plan.operations[0].offset, 35);
        assert!(plan.requires_user());
    }

    #[test]
    fn no_user_states_means_no_user_bounds() {
        let act = activity(&["auto, 10, 10, false, true, 0, 1.0, 1, 1"]);
        let plan = act
            .interpret(&mut ModelSelection::new(), false, &mut rng())
            .unwrap();
        assert!(!plan.requires_user());
        assert_eq!(plan.user_busy(), None);
    }

    #[test]
    fn unbound_appliance_aborts_walk() {
        let act = activity(&["boil, 10, 10, false, true, 1, 1.0, 1, 1"]);
        assert!(act
            .interpret(&mut ModelSelection::new(), false, &mut rng())
            .is_none());
    }

    #[test]
    fn unknown_device_slot_aborts_walk() {
        let mut r = rng();
        let mut act = activity(&["boil, 10, 10, false, true, 2, 1.0, 1, 1"]);
        act.bind(kettle(&mut r)).unwrap();
        assert!(act.interpret(&mut ModelSelection::new(), false, &mut r).is_none());
    }

    #[test]
    fn endless_loop_aborts_walk() {
        let act = activity(&["spin, 1, 1, false, true, 0, 1.0, 0, 0"]);
        assert!(act
            .interpret(&mut ModelSelection::new(), false, &mut rng())
            .is_none());
    }

    #[test]
    fn binding_rules() {
        let mut r = rng();
        let mut act = ActivityDefinition::parse(
            "breakfast",
            vec!["kettle".into(), "toaster".into(), "kettle".into()],
            &["a, 1, 1, false, true, 0, 1.0, 1, 1"],
        )
        .unwrap();
        assert_eq!(act.required_appliances().len(), 3);
        assert_eq!(
            act.unique_appliances().into_iter().collect::<Vec<_>>(),
            vec!["kettle", "toaster"]
        );
        assert_eq!(act.missing_bindings(), vec!["kettle", "toaster"]);

        let k = kettle(&mut r);
        act.bind(Arc::clone(&k)).unwrap();
        assert!(matches!(act.bind(k), Err(BindError::AlreadyBound { .. })));
        assert_eq!(act.missing_bindings(), vec!["toaster"]);

        let fridge = Arc::new(
            Appliance::new(
                "fridge",
                vec![ApplianceModel::new("f", 10, Vec::new())],
                &mut r,
            )
            .unwrap(),
        );
        assert!(matches!(act.bind(fridge), Err(BindError::NotRequired { .. })));
    }

    #[test]
    fn vary_redraws_models_and_fixed_keeps_the_last_one() {
        let mut r = rng();
        let models = [("kettle_quick", 10), ("kettle_slow", 20)].map(|(name, secs)| {
            ApplianceModel::new(
                name,
                secs,
                vec![LoadComponent::OnOff {
                    fraction: 1.0,
                    power: 2_000.0,
                }],
            )
        });
        let kettle = Arc::new(Appliance::new("kettle", models.to_vec(), &mut r).unwrap());
        let mut act = activity(&["boil, 0, 0, false, true, 1, 1.0, 1, 1"]);
        act.bind(kettle).unwrap();

        let mut selection = ModelSelection::new();
        let mut varied = BTreeSet::new();
        let mut last = 0;
        for _ in 0..50 {
            let plan = act.interpret(&mut selection, true, &mut r).unwrap();
            assert_eq!(plan.operations[0].model.usual_duration, plan.duration);
            varied.insert(plan.duration);
            last = plan.duration;
        }
        assert_eq!(varied, BTreeSet::from([10, 20]));

        for _ in 0..20 {
            let plan = act.interpret(&mut selection, false, &mut r).unwrap();
            assert_eq!(plan.duration, last);
            assert_eq!(plan.operations[0].duration, last);
        }
    }
}
