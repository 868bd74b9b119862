/// Per-second boolean time vectors and weekday range specs.
pub mod bitmap;
pub mod engine;
/// Activity and appliance transition events.
pub mod event;
pub mod noise;
/// Per-day activity placement.
pub mod scheduler;
pub mod state_machine;
pub mod summary;
pub mod types;
pub mod user;
