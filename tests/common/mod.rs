//! Shared test fixtures for integration tests.

#![allow(dead_code)]

use nilm_tracegen::config::ScenarioConfig;
use nilm_tracegen::sim::engine::Engine;
use nilm_tracegen::sim::event::{Event, EventKind, Transition};
use nilm_tracegen::sim::types::Trace;

/// Single user reading under a 60 W lamp for 10 s, once a day, any time.
pub const LAMP_SCENARIO: &str = r#"
[general]
name = "lamp"
days = 1
seed = 42
start_weekday = "monday"

[[appliances]]
type = "lamp"

[[appliances.models]]
name = "lamp_60w"
duration = 10
loads = [{ kind = "on_off", fraction = 1.0, power = 60.0 }]

[[activities]]
name = "reading"
devices = ["lamp"]
states = ["light, 0, 0, false, true, 1, 1.0, 1, 1"]

[[users]]
name = "alice"

[[users.activities]]
activity = "reading"
daily_runs = 1.0
"#;

/// Loads a built-in preset, panicking with context on failure.
pub fn preset(name: &str) -> ScenarioConfig {
    ScenarioConfig::from_preset(name).unwrap_or_else(|e| panic!("preset {name}: {e}"))
}

/// Parses an inline scenario, panicking with context on failure.
pub fn scenario(toml: &str) -> ScenarioConfig {
    ScenarioConfig::from_toml_str(toml).unwrap_or_else(|e| panic!("scenario: {e}"))
}

/// Builds an engine and runs it to completion.
pub fn run(config: &ScenarioConfig) -> Trace {
    Engine::from_config(config)
        .unwrap_or_else(|e| panic!("engine: {e}"))
        .run()
}

/// One placed activity instance with the device events logged inside it.
#[derive(Debug, Clone)]
pub struct Instance {
    pub activity: String,
    pub start: usize,
    pub end: usize,
    pub devices: Vec<Event>,
}

/// Splits an event log (in emission order) into activity instances.
///
/// Relies on the scheduler logging START, the device ON/OFF pairs, then END
/// for each instance before moving on.
pub fn instances(events: &[Event]) -> Vec<Instance> {
    let mut out = Vec::new();
    let mut open: Option<Instance> = None;
    for e in events {
        match (e.kind, e.transition) {
            (EventKind::Activity, Transition::Start) => {
                assert!(open.is_none(), "nested activity start: {e}");
                open = Some(Instance {
                    activity: e.name.clone(),
                    start: e.offset,
                    end: e.offset,
                    devices: Vec::new(),
                });
            }
            (EventKind::Activity, Transition::End) => {
                let mut inst = open.take().unwrap_or_else(|| panic!("END without START: {e}"));
                assert_eq!(inst.activity, e.name);
                inst.end = e.offset;
                out.push(inst);
            }
            (EventKind::Device, _) => {
                open.as_mut()
                    .unwrap_or_else(|| panic!("device event outside an activity: {e}"))
                    .devices
                    .push(e.clone());
            }
            other => panic!("unexpected event kind {other:?}"),
        }
    }
    assert!(open.is_none(), "unterminated activity");
    out
}
