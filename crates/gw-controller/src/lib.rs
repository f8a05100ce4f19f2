//! Device synchronization controller
//!
//! The controller is the single consumer of bus traffic. It drives the
//! catalog protocol on `command/<ns>`, moves property values between
//! virtual devices and the bus, translates real devices' native payloads
//! through their bindings, and schedules every write and publish with
//! restartable timers.
//!
//! Timers never fire on their own: callers ask for [`Controller::next_deadline`]
//! and call [`Controller::poll_timers`], which [`Controller::run`] does in a
//! `select!` loop alongside the bus event channel.

mod commands;
mod controller;
mod inbound;
mod subscriptions;
mod topics;

pub use controller::{Controller, ControllerSettings, Exit, Outcome, UPDATE_PROPERTIES_DELAY};
pub use subscriptions::{Subscriptions, SUBSCRIBE_JITTER};
pub use topics::{Route, Topics};
