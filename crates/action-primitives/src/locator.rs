//! Element location against live UI snapshots

use std::sync::Arc;
use std::time::Duration;

use devflow_core_types::{Bounds, DeviceSerial, Point, Selector, WindowSize};
use tracing::{debug, trace};
use ui_bridge::UiDevice;

use crate::errors::ActionError;
use crate::types::ElementHandle;
use crate::waiting::{Deadline, DEFAULT_POLL_INTERVAL};

/// Finds elements on one device and performs primitive actions on them.
///
/// Nothing is cached: each call takes a fresh snapshot through the bridge.
/// An absent element is reported as `Ok(false)`/`Ok(None)` or
/// [`ActionError::NotFound`]; only bridge failures surface as other errors.
#[derive(Clone)]
pub struct ElementLocator {
    device: Arc<dyn UiDevice>,
    poll_interval: Duration,
}

impl ElementLocator {
    pub fn new(device: Arc<dyn UiDevice>) -> Self {
        Self {
            device,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn serial(&self) -> &DeviceSerial {
        self.device.serial()
    }

    pub fn device(&self) -> &Arc<dyn UiDevice> {
        &self.device
    }

    /// Resolve a selector in the current snapshot.
    ///
    /// Queries are evaluated in priority order (identifier, path, text) and
    /// the first match wins.
    pub async fn resolve(&self, selector: &Selector) -> Result<Option<ElementHandle>, ActionError> {
        let queries = selector.queries();
        if queries.is_empty() {
            return Err(ActionError::InvalidSelector(selector.to_string()));
        }

        for query in queries {
            if let Some(info) = self.device.query(&query).await? {
                trace!(serial = %self.serial(), %query, "selector resolved");
                return Ok(Some(ElementHandle { query, info }));
            }
        }
        Ok(None)
    }

    /// Single snapshot existence check.
    pub async fn exists(&self, selector: &Selector) -> Result<bool, ActionError> {
        Ok(self.resolve(selector).await?.is_some())
    }

    /// Poll until the element exists; false once `timeout` elapses.
    pub async fn wait_for(&self, selector: &Selector, timeout: Duration) -> Result<bool, ActionError> {
        let deadline = Deadline::after(timeout, self.poll_interval);
        loop {
            if self.exists(selector).await? {
                return Ok(true);
            }
            if !deadline.tick().await {
                debug!(
                    serial = %self.serial(),
                    selector = %selector,
                    timeout_ms = timeout.as_millis() as u64,
                    "Element did not appear before timeout"
                );
                return Ok(false);
            }
        }
    }

    /// Poll until the element is absent; false once `timeout` elapses.
    pub async fn wait_gone(&self, selector: &Selector, timeout: Duration) -> Result<bool, ActionError> {
        let deadline = Deadline::after(timeout, self.poll_interval);
        loop {
            if !self.exists(selector).await? {
                return Ok(true);
            }
            if !deadline.tick().await {
                return Ok(false);
            }
        }
    }

    pub async fn click(&self, selector: &Selector) -> Result<(), ActionError> {
        let handle = self.require(selector).await?;
        // The element may vanish between resolve and tap
        if self.device.tap_element(&handle.query).await? {
            debug!(serial = %self.serial(), selector = %selector, "Tapped element");
            Ok(())
        } else {
            Err(ActionError::NotFound(selector.to_string()))
        }
    }

    pub async fn set_text(&self, selector: &Selector, text: &str) -> Result<(), ActionError> {
        let handle = self.require(selector).await?;
        if self.device.set_text(&handle.query, text).await? {
            trace!(serial = %self.serial(), selector = %selector, len = text.len(), "Set text");
            Ok(())
        } else {
            Err(ActionError::NotFound(selector.to_string()))
        }
    }

    pub async fn read_text(&self, selector: &Selector) -> Result<String, ActionError> {
        Ok(self.require(selector).await?.info.text)
    }

    /// True only when the element is present and enabled.
    pub async fn is_enabled(&self, selector: &Selector) -> Result<bool, ActionError> {
        Ok(self
            .resolve(selector)
            .await?
            .map(|handle| handle.is_enabled())
            .unwrap_or(false))
    }

    pub async fn bounds(&self, selector: &Selector) -> Result<Bounds, ActionError> {
        Ok(self.require(selector).await?.bounds())
    }

    pub async fn tap_at(&self, point: Point) -> Result<(), ActionError> {
        debug!(serial = %self.serial(), %point, "Tapping screen position");
        self.device.tap_at(point).await?;
        Ok(())
    }

    pub async fn window_size(&self) -> Result<WindowSize, ActionError> {
        Ok(self.device.window_size().await?)
    }

    /// Give the host UI time to react to the previous action.
    pub async fn settle(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }

    async fn require(&self, selector: &Selector) -> Result<ElementHandle, ActionError> {
        self.resolve(selector)
            .await?
            .ok_or_else(|| ActionError::NotFound(selector.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;
    use ui_bridge::{BridgeError, Effect, ElementSpec, Reaction, Scenario, ScriptedDevice, Trigger};

    fn device() -> Arc<ScriptedDevice> {
        let scenario = Scenario::new("emulator-5554")
            .with_element(
                ElementSpec::new("title")
                    .with_id("app:id/title")
                    .with_text("Login"),
            )
            .with_element(
                ElementSpec::new("continue")
                    .with_text("Continue")
                    .with_bounds(Bounds::new(0, 1000, 1080, 1100))
                    .disabled(),
            )
            .with_element(ElementSpec::new("toast").with_text("Saved").hidden())
            .with_reaction(Reaction::new(
                Trigger::Tap("title".into()),
                vec![Effect::Show("toast".into())],
            ));
        Arc::new(ScriptedDevice::from_scenario(scenario).unwrap())
    }

    #[tokio::test]
    async fn missing_elements_are_not_found_without_raising() {
        let locator = ElementLocator::new(device());
        let ghost = Selector::id("app:id/ghost");

        assert!(!locator.exists(&ghost).await.unwrap());
        assert!(locator.click(&ghost).await.unwrap_err().is_not_found());
        assert!(locator.set_text(&ghost, "x").await.unwrap_err().is_not_found());
        assert!(locator.read_text(&ghost).await.unwrap_err().is_not_found());
        assert!(!locator.is_enabled(&ghost).await.unwrap());
    }

    #[tokio::test]
    async fn resolution_falls_back_from_identifier_to_text() {
        let locator = ElementLocator::new(device());
        let selector = Selector::id("app:id/btnContinue").with_text("Continue");

        let handle = locator.resolve(&selector).await.unwrap().unwrap();
        assert_eq!(handle.text(), "Continue");
        assert!(!handle.is_enabled());
        assert_eq!(handle.center(), Point::new(540, 1050));
    }

    #[tokio::test]
    async fn empty_selector_is_rejected() {
        let locator = ElementLocator::new(device());
        let err = locator.exists(&Selector::default()).await.unwrap_err();
        assert!(matches!(err, ActionError::InvalidSelector(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn wait_for_returns_false_at_the_deadline() {
        let locator = ElementLocator::new(device());
        let start = Instant::now();

        let found = locator
            .wait_for(&Selector::text("Saved"), Duration::from_secs(2))
            .await
            .unwrap();

        assert!(!found);
        assert_eq!(start.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn wait_for_sees_element_appear() {
        let dev = device();
        let locator = ElementLocator::new(dev.clone());

        let background = dev.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(900)).await;
            background.apply(Effect::Show("toast".into()));
        });

        let start = Instant::now();
        assert!(locator
            .wait_for(&Selector::text("Saved"), Duration::from_secs(5))
            .await
            .unwrap());
        assert_eq!(start.elapsed(), Duration::from_millis(1200));
    }

    #[tokio::test(start_paused = true)]
    async fn wait_gone_tracks_disappearance() {
        let dev = device();
        let locator = ElementLocator::new(dev.clone());
        let title = Selector::id("app:id/title");

        let start = Instant::now();
        assert!(!locator.wait_gone(&title, Duration::from_secs(1)).await.unwrap());
        assert_eq!(start.elapsed(), Duration::from_secs(1));

        let background = dev.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            background.apply(Effect::Hide("title".into()));
        });

        let start = Instant::now();
        assert!(locator.wait_gone(&title, Duration::from_secs(5)).await.unwrap());
        assert_eq!(start.elapsed(), Duration::from_millis(800));
    }

    #[tokio::test]
    async fn click_fires_device_reactions() {
        let dev = device();
        let locator = ElementLocator::new(dev.clone());

        locator.click(&Selector::id("app:id/title")).await.unwrap();
        assert!(locator.exists(&Selector::text("Saved")).await.unwrap());
        assert_eq!(dev.tap_count("title"), 1);
    }

    #[tokio::test]
    async fn bridge_failures_propagate() {
        let dev = device();
        let locator = ElementLocator::new(dev.clone());
        dev.disconnect();

        let err = locator.exists(&Selector::id("app:id/title")).await.unwrap_err();
        assert!(matches!(err, ActionError::Bridge(BridgeError::SessionLost(_))));
        assert_eq!(err.severity(), 3);
    }
}
