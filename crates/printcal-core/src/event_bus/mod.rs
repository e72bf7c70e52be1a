//! # Event Bus Module
//!
//! Fans decoded printer output out to any number of observers.
//!
//! ## Overview
//!
//! Three independent channels carry the client's output:
//! - **log**: raw serial traffic and read-error notices
//! - **telemetry**: hotend/bed temperature samples
//! - **bed-level**: bed-leveling session progress and outcome
//!
//! Listeners are appended to a channel and never removed. Emission takes a
//! snapshot of the listener list under the channel lock and delivers outside
//! it, in registration order, on the emitting thread.
//!
//! ## Usage
//!
//! ```rust
//! use printcal_core::event_bus::{EventBroadcaster, TelemetrySample};
//!
//! let events = EventBroadcaster::new();
//! events.log.register(|text: &String| print!("{}", text));
//! events.telemetry.register(|sample: &TelemetrySample| {
//!     if let Some(hotend) = &sample.hotend {
//!         println!("hotend {} / {}", hotend.current, hotend.target);
//!     }
//! });
//!
//! events.log.emit(&"ok\n".to_string());
//! ```

mod bus;
mod events;

pub use bus::*;
pub use events::*;
