//! Event bus for the Avalon pipeline kernel.
//!
//! Host adapters emit lifecycle events (scene opened, saved, task changed)
//! and pipeline code reacts to them without either side holding the other's
//! callback lists.
//!
//! ```
//! use avalon_events::EventBus;
//! use serde_json::json;
//!
//! let bus = EventBus::new();
//! let token = bus.on("taskChanged", |args| {
//!     assert_eq!(args["AVALON_TASK"], "model");
//!     Ok(())
//! }).unwrap();
//! let report = bus.emit("taskChanged", &json!({"AVALON_TASK": "model"}));
//! assert_eq!(report.invoked, 1);
//! assert!(bus.off(&token));
//! ```
//!
//! # Delivery rules
//!
//! - Emission is synchronous; each callback runs to completion in
//!   subscription order.
//! - The subscriber list is snapshotted when `emit` starts. Subscriptions
//!   added or removed by a callback take effect from the next `emit`.
//! - A callback that returns an error or panics is logged and skipped; the
//!   remaining callbacks still run and `emit` never fails.
//! - Subscriptions stay until their [`Subscription`] token is passed to
//!   [`EventBus::off`]. Callers own unsubscription.

pub mod bus;
pub mod error;

pub use bus::{Callback, EmitReport, EventBus, Subscription};
pub use error::{EventError, EventResult};

/// Emitted by the kernel after the current task changes.
pub const TASK_CHANGED: &str = "taskChanged";

/// Emitted by host adapters once the host finished starting up.
pub const INIT: &str = "init";

/// Emitted by host adapters for a new, open or saved scene.
pub const NEW: &str = "new";
pub const OPEN: &str = "open";
pub const SAVE: &str = "save";

/// Prefix of events emitted before an action.
pub const BEFORE_PREFIX: &str = "before_";

/// Prefix of events emitted after an action.
pub const AFTER_PREFIX: &str = "after_";
