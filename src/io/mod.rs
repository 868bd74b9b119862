//! Trace output writers.

/// CSV export of power arrays and the event log.
pub mod export;
