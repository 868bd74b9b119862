//! Activity and appliance transition events.

use std::cmp::Ordering;
use std::fmt;

/// Source of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Activity,
    Device,
}

impl EventKind {
    /// Short label used in the textual event log.
    pub fn label(self) -> &'static str {
        match self {
            Self::Activity => "ACT",
            Self::Device => "DEV",
        }
    }
}

/// What happened at the event offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    Start,
    End,
    On,
    Off,
}

impl Transition {
    pub fn label(self) -> &'static str {
        match self {
            Self::Start => "START",
            Self::End => "END",
            Self::On => "ON",
            Self::Off => "OFF",
        }
    }
}

/// A timestamped activity or appliance transition.
///
/// Renders as `offset;ACT|DEV;name;START|END|ON|OFF`.
///
/// # Examples
///
/// ```
/// use nilm_tracegen::sim::event::{Event, Transition};
///
/// let event = Event::device(42, "kettle", Transition::On);
/// assert_eq!(event.to_string(), "42;DEV;kettle;ON");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Event {
    /// Seconds since the horizon start.
    pub offset: usize,
    pub kind: EventKind,
    /// Activity name or appliance type.
    pub name: String,
    pub transition: Transition,
}

impl Event {
    pub fn activity(offset: usize, name: &str, transition: Transition) -> Self {
        Self {
            offset,
            kind: EventKind::Activity,
            name: name.to_string(),
            transition,
        }
    }

    pub fn device(offset: usize, name: &str, transition: Transition) -> Self {
        Self {
            offset,
            kind: EventKind::Device,
            name: name.to_string(),
            transition,
        }
    }

    /// Chronological order. At equal offsets transitions sort by descending
    /// label, so ON precedes OFF.
    pub fn chronological(a: &Self, b: &Self) -> Ordering {
        a.offset
            .cmp(&b.offset)
            .then_with(|| b.transition.label().cmp(a.transition.label()))
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{};{};{};{}",
            self.offset,
            self.kind.label(),
            self.name,
            self.transition.label()
        )
    }
}

/// Sorts events chronologically in place (see [`Event::chronological`]).
pub fn sort_chronologically(events: &mut [Event]) {
    events.sort_by(Event::chronological);
}
