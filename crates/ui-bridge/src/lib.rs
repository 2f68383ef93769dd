//! Device bridge seam for devflow
//!
//! The automation engine only talks to a device through [`UiDevice`]:
//! single-snapshot queries, taps, text entry and the window size. The
//! transport behind it (debug bridge, accessibility service, ...) is out
//! of scope for this workspace; [`ScriptedDevice`] is an in-memory UI tree
//! driven by YAML scenarios and is used for rehearsals and tests.

pub mod device;
pub mod errors;
pub mod provider;
pub mod scripted;

pub use device::{ElementInfo, UiDevice};
pub use errors::BridgeError;
pub use provider::{DeviceProvider, ScenarioProvider};
pub use scripted::{DeviceEvent, Effect, ElementSpec, Reaction, Scenario, ScriptedDevice, Trigger};
