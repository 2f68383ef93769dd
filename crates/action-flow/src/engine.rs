//! Flow engine: one instance per device session

use std::sync::Arc;
use std::time::Duration;

use action_input::InputStrategyResolver;
use action_primitives::{ActionError, Deadline, ElementHandle, ElementLocator};
use devflow_core_types::{DeviceSerial, Selector};
use parking_lot::Mutex;
use popup_guard::{PopupCatalog, PopupInterceptor};
use tracing::{debug, info};
use ui_bridge::UiDevice;

use crate::classify::{classify_with, MessageClassification};
use crate::config::{ms, EngineConfig};
use crate::errors::FlowError;
use crate::types::FlowContext;

/// Drives the login and OTP flows on one device.
///
/// All collaborators are built once from the configuration at construction.
/// Flows run strictly sequentially; a caller that wants a flow-level time
/// budget wraps the call in `tokio::time::timeout` and drops it.
pub struct FlowEngine {
    pub(crate) config: Arc<EngineConfig>,
    pub(crate) locator: ElementLocator,
    pub(crate) input: InputStrategyResolver,
    pub(crate) popups: PopupInterceptor,
    last_context: Mutex<Option<FlowContext>>,
}

impl FlowEngine {
    pub fn new(device: Arc<dyn UiDevice>, config: Arc<EngineConfig>) -> Result<Self, FlowError> {
        config.validate()?;
        let catalog = config.popup_catalog()?;
        Ok(Self::with_catalog(device, config, catalog))
    }

    /// Build an engine around an already validated, shared popup catalog.
    pub fn with_catalog(
        device: Arc<dyn UiDevice>,
        config: Arc<EngineConfig>,
        catalog: Arc<PopupCatalog>,
    ) -> Self {
        let locator = ElementLocator::new(device).with_poll_interval(ms(config.poll_interval_ms));
        let input = InputStrategyResolver::new(locator.clone(), config.input.clone());
        let popups = PopupInterceptor::new(locator.clone(), catalog)
            .with_settings(config.popup_settings.clone());

        Self {
            config,
            locator,
            input,
            popups,
            last_context: Mutex::new(None),
        }
    }

    pub fn serial(&self) -> &DeviceSerial {
        self.locator.serial()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn popups(&self) -> &PopupInterceptor {
        &self.popups
    }

    /// Context of the most recently finished flow.
    pub fn last_context(&self) -> Option<FlowContext> {
        self.last_context.lock().clone()
    }

    pub(crate) fn store_context(&self, mut ctx: FlowContext, outcome: &Result<bool, FlowError>) {
        ctx.finish(matches!(outcome, Ok(true)));
        info!(
            serial = %ctx.serial,
            run_id = %ctx.run_id,
            flow = %ctx.flow,
            success = ctx.success.unwrap_or(false),
            submissions = ctx.submissions,
            resend_count = ctx.resend_count,
            step_failures = ctx.step_failures,
            latency_ms = ctx.latency_ms().unwrap_or(0),
            "Flow finished"
        );
        *self.last_context.lock() = Some(ctx);
    }

    /// Opportunistic popup sweep; never fails the flow on its own.
    pub(crate) async fn sweep_popups(&self) -> Result<(), FlowError> {
        let dismissed = self.popups.clear_all(self.config.timings.popup_rounds).await?;
        if dismissed > 0 {
            debug!(serial = %self.serial(), dismissed, "Cleared popups");
        }
        Ok(())
    }

    /// First of `candidates` present in the current snapshot.
    pub(crate) async fn resolve_first<'a>(
        &self,
        candidates: &'a [Selector],
    ) -> Result<Option<(&'a Selector, ElementHandle)>, ActionError> {
        for selector in candidates {
            if let Some(handle) = self.locator.resolve(selector).await? {
                return Ok(Some((selector, handle)));
            }
        }
        Ok(None)
    }

    pub(crate) async fn any_exists(&self, candidates: &[Selector]) -> Result<bool, ActionError> {
        Ok(self.resolve_first(candidates).await?.is_some())
    }

    /// Poll until any of `candidates` appears.
    pub(crate) async fn wait_for_any(
        &self,
        candidates: &[Selector],
        timeout: Duration,
    ) -> Result<bool, ActionError> {
        let deadline = Deadline::after(timeout, ms(self.config.timings.checkpoint_poll_ms));
        loop {
            if self.any_exists(candidates).await? {
                return Ok(true);
            }
            if !deadline.tick().await {
                return Ok(false);
            }
        }
    }

    /// Classify whatever the OTP message area currently shows.
    pub(crate) async fn classify_screen(&self) -> Result<MessageClassification, ActionError> {
        let otp = &self.config.otp;
        if let Some(handle) = self.locator.resolve(&otp.message).await? {
            let classification = classify_with(&self.config.message_patterns, handle.text());
            if classification != MessageClassification::None {
                debug!(
                    serial = %self.serial(),
                    message = handle.text(),
                    %classification,
                    "Classified message"
                );
                return Ok(classification);
            }
        }

        if self.locator.exists(&otp.verifying_marker).await? {
            return Ok(MessageClassification::Success);
        }
        Ok(MessageClassification::None)
    }
}
