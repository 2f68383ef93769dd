#![allow(dead_code)]

use std::sync::Arc;

use action_flow::{EngineConfig, FlowEngine};
use ui_bridge::{ElementSpec, Scenario, ScriptedDevice};

pub const APP: &str = "com.pure.indosat.care:id/";

pub fn app_id(name: &str) -> String {
    format!("{APP}{name}")
}

/// Element keyed by its resource name.
pub fn app_element(name: &str) -> ElementSpec {
    ElementSpec::new(name).with_id(app_id(name))
}

pub fn engine_for(scenario: Scenario) -> (Arc<ScriptedDevice>, FlowEngine) {
    let device = Arc::new(ScriptedDevice::from_scenario(scenario).unwrap());
    let engine = FlowEngine::new(device.clone(), Arc::new(EngineConfig::default())).unwrap();
    (device, engine)
}
