//! Scripted in-memory device used for rehearsals and tests
//!
//! A [`Scenario`] declares the elements of a screen and how the UI reacts
//! when it is touched. Interactions that match no reaction simply do
//! nothing, which is exactly how a flaky host app behaves when a tap
//! fails to register.

use std::path::Path;

use async_trait::async_trait;
use devflow_core_types::{Bounds, DeviceSerial, Point, Query, WindowSize};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::device::{ElementInfo, UiDevice};
use crate::errors::BridgeError;

fn default_true() -> bool {
    true
}

/// Static description of one element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementSpec {
    /// Scenario-local key referenced by reactions
    pub key: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,

    #[serde(default)]
    pub text: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    #[serde(default)]
    pub bounds: Bounds,

    #[serde(default = "default_true")]
    pub visible: bool,

    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_true")]
    pub clickable: bool,
}

impl ElementSpec {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            resource_id: None,
            text: String::new(),
            class_name: None,
            path: None,
            bounds: Bounds::default(),
            visible: true,
            enabled: true,
            clickable: true,
        }
    }

    pub fn with_id(mut self, resource_id: impl Into<String>) -> Self {
        self.resource_id = Some(resource_id.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_class(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = Some(class_name.into());
        self
    }

    pub fn with_bounds(mut self, bounds: Bounds) -> Self {
        self.bounds = bounds;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn not_clickable(mut self) -> Self {
        self.clickable = false;
        self
    }

    fn matches(&self, query: &Query, text: &str) -> bool {
        match query {
            Query::ResourceId(id) => self.resource_id.as_deref() == Some(id.as_str()),
            Query::XPath(path) => self.path.as_deref() == Some(path.as_str()),
            Query::Text(expected) => text == expected,
            // Case-folded, like a forgiving textContains
            Query::TextContains(needle) => text.to_lowercase().contains(&needle.to_lowercase()),
            Query::ClassName(class) => self.class_name.as_deref() == Some(class.as_str()),
        }
    }
}

/// What sets a reaction off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    /// The element was tapped through a selector
    Tap(String),

    /// A raw coordinate tap landed inside the region
    TapAt(Bounds),

    /// Any text was written to the element
    TextSet(String),

    /// The element's text became exactly `value`
    TextEquals { target: String, value: String },

    /// The element's text became `value` one keystroke at a time,
    /// starting from a cleared field
    Typed { target: String, value: String },
}

/// A change applied to the UI tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Effect {
    Show(String),
    Hide(String),
    Enable(String),
    Disable(String),
    SetText { target: String, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
    pub on: Trigger,

    #[serde(default)]
    pub effects: Vec<Effect>,

    /// Fire at most once
    #[serde(default)]
    pub once: bool,
}

impl Reaction {
    pub fn new(on: Trigger, effects: Vec<Effect>) -> Self {
        Self {
            on,
            effects,
            once: false,
        }
    }

    pub fn once(mut self) -> Self {
        self.once = true;
        self
    }
}

/// Full description of a scripted device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    pub serial: String,

    #[serde(default)]
    pub window: WindowSize,

    #[serde(default)]
    pub elements: Vec<ElementSpec>,

    #[serde(default)]
    pub reactions: Vec<Reaction>,
}

impl Scenario {
    pub fn new(serial: impl Into<String>) -> Self {
        Self {
            serial: serial.into(),
            window: WindowSize::default(),
            elements: Vec::new(),
            reactions: Vec::new(),
        }
    }

    pub fn with_element(mut self, element: ElementSpec) -> Self {
        self.elements.push(element);
        self
    }

    pub fn with_reaction(mut self, reaction: Reaction) -> Self {
        self.reactions.push(reaction);
        self
    }

    pub fn from_yaml(raw: &str) -> Result<Self, BridgeError> {
        serde_yaml::from_str(raw).map_err(|err| BridgeError::Scenario(err.to_string()))
    }

    pub async fn load(path: &Path) -> Result<Self, BridgeError> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|err| BridgeError::Scenario(format!("{}: {}", path.display(), err)))?;
        Self::from_yaml(&raw)
    }

    fn validate(&self) -> Result<(), BridgeError> {
        let mut seen = std::collections::HashSet::new();
        for element in &self.elements {
            if !seen.insert(element.key.as_str()) {
                return Err(BridgeError::Scenario(format!(
                    "duplicate element key '{}'",
                    element.key
                )));
            }
        }

        let check = |key: &str| {
            if seen.contains(key) {
                Ok(())
            } else {
                Err(BridgeError::Scenario(format!(
                    "reaction references unknown element '{}'",
                    key
                )))
            }
        };

        for reaction in &self.reactions {
            match &reaction.on {
                Trigger::Tap(key) | Trigger::TextSet(key) => check(key)?,
                Trigger::TextEquals { target, .. } | Trigger::Typed { target, .. } => {
                    check(target)?
                }
                Trigger::TapAt(_) => {}
            }
            for effect in &reaction.effects {
                match effect {
                    Effect::Show(key)
                    | Effect::Hide(key)
                    | Effect::Enable(key)
                    | Effect::Disable(key) => check(key)?,
                    Effect::SetText { target, .. } => check(target)?,
                }
            }
        }
        Ok(())
    }
}

/// Interaction recorded by a [`ScriptedDevice`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    TapElement { key: String },
    TapAt { point: Point },
    SetText { key: String, value: String },
}

#[derive(Debug)]
struct ElementState {
    spec: ElementSpec,
    text: String,
    visible: bool,
    enabled: bool,
    keyed_from_empty: bool,
}

impl ElementState {
    fn info(&self) -> ElementInfo {
        ElementInfo {
            resource_id: self.spec.resource_id.clone(),
            text: self.text.clone(),
            class_name: self.spec.class_name.clone(),
            path: self.spec.path.clone(),
            enabled: self.enabled,
            clickable: self.spec.clickable,
            bounds: self.spec.bounds,
        }
    }
}

#[derive(Debug)]
struct DeviceState {
    elements: Vec<ElementState>,
    reactions: Vec<(Reaction, bool)>,
    events: Vec<DeviceEvent>,
    connected: bool,
}

impl DeviceState {
    fn find(&self, query: &Query) -> Option<usize> {
        self.elements
            .iter()
            .position(|el| el.visible && el.spec.matches(query, &el.text))
    }

    fn index_of(&self, key: &str) -> Option<usize> {
        self.elements.iter().position(|el| el.spec.key == key)
    }

    fn apply(&mut self, effect: &Effect) {
        let key = match effect {
            Effect::Show(key) | Effect::Hide(key) | Effect::Enable(key) | Effect::Disable(key) => {
                key
            }
            Effect::SetText { target, .. } => target,
        };
        let Some(idx) = self.index_of(key) else {
            warn!(element = %key, "effect targets unknown element; ignoring");
            return;
        };
        let element = &mut self.elements[idx];
        match effect {
            Effect::Show(_) => element.visible = true,
            Effect::Hide(_) => element.visible = false,
            Effect::Enable(_) => element.enabled = true,
            Effect::Disable(_) => element.enabled = false,
            Effect::SetText { value, .. } => {
                element.text = value.clone();
                element.keyed_from_empty = false;
            }
        }
        trace!(?effect, "applied scenario effect");
    }

    fn fire(&mut self, matches: impl Fn(&Trigger) -> bool) {
        let mut pending = Vec::new();
        for (reaction, fired) in self.reactions.iter_mut() {
            if reaction.once && *fired {
                continue;
            }
            if matches(&reaction.on) {
                *fired = true;
                pending.extend(reaction.effects.iter().cloned());
            }
        }
        for effect in &pending {
            self.apply(effect);
        }
    }
}

/// In-memory device whose UI follows a [`Scenario`].
pub struct ScriptedDevice {
    serial: DeviceSerial,
    window: WindowSize,
    state: Mutex<DeviceState>,
}

impl ScriptedDevice {
    pub fn from_scenario(scenario: Scenario) -> Result<Self, BridgeError> {
        scenario.validate()?;
        let elements = scenario
            .elements
            .into_iter()
            .map(|spec| ElementState {
                text: spec.text.clone(),
                visible: spec.visible,
                enabled: spec.enabled,
                keyed_from_empty: false,
                spec,
            })
            .collect();
        let reactions = scenario.reactions.into_iter().map(|r| (r, false)).collect();

        Ok(Self {
            serial: DeviceSerial::new(scenario.serial),
            window: scenario.window,
            state: Mutex::new(DeviceState {
                elements,
                reactions,
                events: Vec::new(),
                connected: true,
            }),
        })
    }

    /// Simulate loss of the device session; every later call fails.
    pub fn disconnect(&self) {
        self.state.lock().connected = false;
    }

    /// Apply an effect directly, outside any reaction.
    pub fn apply(&self, effect: Effect) {
        self.state.lock().apply(&effect);
    }

    pub fn events(&self) -> Vec<DeviceEvent> {
        self.state.lock().events.clone()
    }

    /// Number of selector taps that landed on `key`.
    pub fn tap_count(&self, key: &str) -> usize {
        self.state
            .lock()
            .events
            .iter()
            .filter(|event| matches!(event, DeviceEvent::TapElement { key: k } if k == key))
            .count()
    }

    /// Every value written to `key`, oldest first.
    pub fn text_history(&self, key: &str) -> Vec<String> {
        self.state
            .lock()
            .events
            .iter()
            .filter_map(|event| match event {
                DeviceEvent::SetText { key: k, value } if k == key => Some(value.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn text_of(&self, key: &str) -> Option<String> {
        let state = self.state.lock();
        state.index_of(key).map(|idx| state.elements[idx].text.clone())
    }

    pub fn is_visible(&self, key: &str) -> bool {
        let state = self.state.lock();
        state
            .index_of(key)
            .map(|idx| state.elements[idx].visible)
            .unwrap_or(false)
    }

    fn ensure_connected(&self, state: &DeviceState) -> Result<(), BridgeError> {
        if state.connected {
            Ok(())
        } else {
            Err(BridgeError::SessionLost(self.serial.to_string()))
        }
    }
}

#[async_trait]
impl UiDevice for ScriptedDevice {
    fn serial(&self) -> &DeviceSerial {
        &self.serial
    }

    async fn query(&self, query: &Query) -> Result<Option<ElementInfo>, BridgeError> {
        let state = self.state.lock();
        self.ensure_connected(&state)?;
        Ok(state.find(query).map(|idx| state.elements[idx].info()))
    }

    async fn tap_element(&self, query: &Query) -> Result<bool, BridgeError> {
        let mut state = self.state.lock();
        self.ensure_connected(&state)?;

        let Some(idx) = state.find(query) else {
            debug!(serial = %self.serial, %query, "tap target not present");
            return Ok(false);
        };
        let key = state.elements[idx].spec.key.clone();
        state.events.push(DeviceEvent::TapElement { key: key.clone() });
        state.fire(|trigger| matches!(trigger, Trigger::Tap(k) if *k == key));
        Ok(true)
    }

    async fn tap_at(&self, point: Point) -> Result<(), BridgeError> {
        let mut state = self.state.lock();
        self.ensure_connected(&state)?;

        state.events.push(DeviceEvent::TapAt { point });
        state.fire(|trigger| matches!(trigger, Trigger::TapAt(region) if region.contains(point)));
        Ok(())
    }

    async fn set_text(&self, query: &Query, text: &str) -> Result<bool, BridgeError> {
        let mut state = self.state.lock();
        self.ensure_connected(&state)?;

        let Some(idx) = state.find(query) else {
            return Ok(false);
        };

        let element = &mut state.elements[idx];
        let previous_len = element.text.chars().count();
        element.keyed_from_empty = if text.is_empty() {
            true
        } else {
            element.keyed_from_empty
                && text.chars().count() == previous_len + 1
                && text.starts_with(element.text.as_str())
        };
        element.text = text.to_string();
        let keyed = element.keyed_from_empty;
        let key = element.spec.key.clone();

        state.events.push(DeviceEvent::SetText {
            key: key.clone(),
            value: text.to_string(),
        });
        state.fire(|trigger| match trigger {
            Trigger::TextSet(k) => *k == key,
            Trigger::TextEquals { target, value } => *target == key && value == text,
            Trigger::Typed { target, value } => keyed && *target == key && value == text,
            _ => false,
        });
        Ok(true)
    }

    async fn window_size(&self) -> Result<WindowSize, BridgeError> {
        let state = self.state.lock();
        self.ensure_connected(&state)?;
        Ok(self.window)
    }
}
