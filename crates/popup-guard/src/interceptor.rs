//! Overlay detection and dismissal

use std::sync::Arc;
use std::time::Duration;

use action_primitives::{ActionError, ElementLocator};
use devflow_core_types::{Point, Selector};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::catalog::{PopupCatalog, PopupDefinition, PopupKind};

/// Tactic that made an overlay go away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DismissTactic {
    CloseSelector,
    CloseCenter,
    DefaultPosition,
    TutorialSkip,
    TutorialNext,
    SkipAll,
}

impl DismissTactic {
    pub fn name(&self) -> &'static str {
        match self {
            DismissTactic::CloseSelector => "close-selector",
            DismissTactic::CloseCenter => "close-center",
            DismissTactic::DefaultPosition => "default-position",
            DismissTactic::TutorialSkip => "tutorial-skip",
            DismissTactic::TutorialNext => "tutorial-next",
            DismissTactic::SkipAll => "skip-all",
        }
    }
}

/// Interceptor tuning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopupSettings {
    /// Pause after each tactic before re-checking the container
    pub settle_ms: u64,

    /// Default tap lands this far from the right edge
    pub default_tap_right_inset: i32,

    /// Default tap vertical position
    pub default_tap_y: i32,
}

impl Default for PopupSettings {
    fn default() -> Self {
        Self {
            settle_ms: 500,
            default_tap_right_inset: 50, // close affordances sit top-right
            default_tap_y: 100,
        }
    }
}

/// Detects and dismisses known overlays on one device.
pub struct PopupInterceptor {
    locator: ElementLocator,
    catalog: Arc<PopupCatalog>,
    settings: PopupSettings,
}

impl PopupInterceptor {
    pub fn new(locator: ElementLocator, catalog: Arc<PopupCatalog>) -> Self {
        Self {
            locator,
            catalog,
            settings: PopupSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: PopupSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn catalog(&self) -> &PopupCatalog {
        &self.catalog
    }

    /// Dismiss a visible overlay.
    ///
    /// With a name, only that overlay is considered (unknown names fall back
    /// to a full scan). Without one, the first visible overlay in priority
    /// order is dismissed. Returns true when nothing was visible or the
    /// overlay went away; false when an overlay stayed up. Only bridge
    /// failures are returned as errors.
    pub async fn handle(&self, popup: Option<&str>) -> Result<bool, ActionError> {
        let target = match self.scope(popup) {
            Some(definition) => self
                .visible(definition)
                .await?
                .then_some(definition),
            None => self.first_visible().await?,
        };

        let Some(definition) = target else {
            debug!(serial = %self.locator.serial(), "No popup visible");
            return Ok(true);
        };

        Ok(self.dismiss(definition).await?.is_some())
    }

    /// Pure detection, no taps.
    pub async fn is_visible(&self, popup: Option<&str>) -> Result<bool, ActionError> {
        match self.scope(popup) {
            Some(definition) => self.visible(definition).await,
            None => Ok(self.first_visible().await?.is_some()),
        }
    }

    /// Keep dismissing overlays until none is visible; returns how many went away.
    ///
    /// Stops early when an overlay refuses to leave.
    pub async fn clear_all(&self, max_rounds: usize) -> Result<usize, ActionError> {
        let mut dismissed = 0;
        for _ in 0..max_rounds {
            let Some(definition) = self.first_visible().await? else {
                break;
            };
            if self.dismiss(definition).await?.is_none() {
                break;
            }
            dismissed += 1;
        }
        Ok(dismissed)
    }

    /// Run the dismissal tactics for one overlay.
    pub async fn dismiss(
        &self,
        definition: &PopupDefinition,
    ) -> Result<Option<DismissTactic>, ActionError> {
        let serial = self.locator.serial().clone();
        info!(%serial, popup = %definition.name, "Popup detected; dismissing");

        let tactic = match &definition.kind {
            PopupKind::Generic => self.dismiss_generic(definition).await?,
            PopupKind::Tutorial {
                next,
                skip_all,
                max_next_steps,
            } => {
                self.dismiss_tutorial(definition, next, skip_all, *max_next_steps)
                    .await?
            }
        };

        match tactic {
            Some(tactic) => info!(
                %serial,
                popup = %definition.name,
                tactic = tactic.name(),
                "Popup dismissed"
            ),
            None => warn!(
                %serial,
                popup = %definition.name,
                "Popup could not be dismissed; continuing"
            ),
        }
        Ok(tactic)
    }

    fn scope(&self, popup: Option<&str>) -> Option<&PopupDefinition> {
        let name = popup?;
        let definition = self.catalog.get(name);
        if definition.is_none() {
            warn!(
                serial = %self.locator.serial(),
                popup = name,
                "Unknown popup name; scanning the whole catalog"
            );
        }
        definition
    }

    async fn visible(&self, definition: &PopupDefinition) -> Result<bool, ActionError> {
        self.locator.exists(&definition.container).await
    }

    async fn first_visible(&self) -> Result<Option<&PopupDefinition>, ActionError> {
        for definition in self.catalog.iter() {
            if self.visible(definition).await? {
                return Ok(Some(definition));
            }
        }
        Ok(None)
    }

    /// Give the container up to one settle period to disappear.
    async fn gone(&self, definition: &PopupDefinition) -> Result<bool, ActionError> {
        self.locator
            .wait_gone(
                &definition.container,
                Duration::from_millis(self.settings.settle_ms),
            )
            .await
    }

    async fn default_position(&self) -> Result<Point, ActionError> {
        let window = self.locator.window_size().await?;
        Ok(Point::new(
            window.width - self.settings.default_tap_right_inset,
            self.settings.default_tap_y,
        ))
    }

    async fn tap_if_present(&self, selector: &Selector) -> Result<bool, ActionError> {
        match self.locator.click(selector).await {
            Ok(()) => Ok(true),
            Err(err) if err.is_not_found() => Ok(false),
            Err(err) => Err(err),
        }
    }

    async fn dismiss_generic(
        &self,
        definition: &PopupDefinition,
    ) -> Result<Option<DismissTactic>, ActionError> {
        let serial = self.locator.serial();

        // 1. Tap the close control by selector
        let mut close = None;
        for selector in definition.dismissal_selectors() {
            if let Some(handle) = self.locator.resolve(selector).await? {
                close = Some((selector, handle.center()));
                break;
            }
        }

        if let Some((selector, center)) = close {
            debug!(%serial, popup = %definition.name, close = %selector, "Tapping close control");
            self.tap_if_present(selector).await?;
            if self.gone(definition).await? {
                return Ok(Some(DismissTactic::CloseSelector));
            }

            // 2. The tap did not register; hit the control's center directly
            debug!(%serial, popup = %definition.name, %center, "Tapping close control center");
            self.locator.tap_at(center).await?;
            if self.gone(definition).await? {
                return Ok(Some(DismissTactic::CloseCenter));
            }
        } else {
            debug!(%serial, popup = %definition.name, "No close control found");
        }

        // 3. Last resort
        let point = self.default_position().await?;
        debug!(%serial, popup = %definition.name, %point, "Tapping default position");
        self.locator.tap_at(point).await?;
        if self.gone(definition).await? {
            return Ok(Some(DismissTactic::DefaultPosition));
        }

        Ok(None)
    }

    async fn clickable(&self, selector: &Selector) -> Result<bool, ActionError> {
        Ok(self
            .locator
            .resolve(selector)
            .await?
            .map(|handle| handle.is_clickable())
            .unwrap_or(false))
    }

    async fn dismiss_tutorial(
        &self,
        definition: &PopupDefinition,
        next: &Selector,
        skip_all: &Selector,
        max_next_steps: u32,
    ) -> Result<Option<DismissTactic>, ActionError> {
        let serial = self.locator.serial();
        let skip = &definition.dismiss;

        // 1. Skip straight away when offered
        if self.clickable(skip).await? {
            self.tap_if_present(skip).await?;
            if self.gone(definition).await? {
                return Ok(Some(DismissTactic::TutorialSkip));
            }
        }

        // 2. Page through, looking for Skip after every step
        for step in 1..=max_next_steps {
            if !self.clickable(next).await? {
                break;
            }
            debug!(%serial, popup = %definition.name, step, "Tapping tutorial next");
            self.tap_if_present(next).await?;
            if self.gone(definition).await? {
                return Ok(Some(DismissTactic::TutorialNext));
            }
            if self.clickable(skip).await? {
                self.tap_if_present(skip).await?;
                if self.gone(definition).await? {
                    return Ok(Some(DismissTactic::TutorialSkip));
                }
            }
        }

        // 3. Skip All text control
        if self.tap_if_present(skip_all).await? && self.gone(definition).await? {
            return Ok(Some(DismissTactic::SkipAll));
        }

        // 4. Same last resort as any other overlay
        let point = self.default_position().await?;
        self.locator.tap_at(point).await?;
        if self.gone(definition).await? {
            return Ok(Some(DismissTactic::DefaultPosition));
        }

        Ok(None)
    }
}
