//! Login flow
//!
//! `AppOpen -> AccountTabSelected -> PhoneEntered -> ContinuePressed ->
//! LoginVerified`. Any checkpoint that does not hold ends the flow with
//! `false`; retries live inside the input resolver and popup interceptor.

use action_input::InputTarget;
use action_primitives::Deadline;
use tokio::time::Instant;
use tracing::{info, info_span, warn, Instrument};

use crate::config::ms;
use crate::engine::FlowEngine;
use crate::errors::FlowError;
use crate::types::{FlowContext, LoginState};

/// How one poll of the post-Continue screen turned out.
enum LoginCheck {
    Verified(&'static str),
    Rejected(&'static str),
    Pending,
}

impl FlowEngine {
    /// Log in with `phone_number`; true once the OTP page or home screen shows.
    pub async fn run_login_flow(&self, phone_number: &str) -> Result<bool, FlowError> {
        let mut ctx = FlowContext::new(self.serial().clone(), "login", 0);
        let span = info_span!(
            "login_flow",
            serial = %ctx.serial,
            run_id = %ctx.run_id
        );

        let outcome = self.login(&mut ctx, phone_number).instrument(span).await;
        if matches!(outcome, Ok(false)) {
            ctx.enter(LoginState::Failed);
        }
        self.store_context(ctx, &outcome);
        outcome
    }

    async fn login(&self, ctx: &mut FlowContext, phone_number: &str) -> Result<bool, FlowError> {
        let selectors = &self.config.login;
        let timings = &self.config.timings;

        // 1. App must be in the foreground
        if !self.locator.exists(&selectors.root).await? {
            warn!(root = %selectors.root, "App root not present; is the app foregrounded?");
            return Ok(false);
        }
        ctx.enter(LoginState::AppOpen);

        // 2. Best-effort popup sweep
        self.sweep_popups().await?;

        // 3. Open the account tab and wait for the login form
        if let Err(err) = self.locator.click(&selectors.account_tab).await {
            if !err.is_not_found() {
                return Err(err.into());
            }
            warn!(tab = %selectors.account_tab, "Account tab not found");
            return Ok(false);
        }
        if !self
            .locator
            .wait_for(&selectors.login_container, ms(timings.login_container_timeout_ms))
            .await?
        {
            warn!("Login form did not appear");
            return Ok(false);
        }
        ctx.enter(LoginState::AccountTabSelected);

        // 4. Enter the phone number, validated by Continue becoming enabled
        let target = InputTarget::field(selectors.phone_field.clone())
            .with_focus(selectors.phone_container.clone());
        let entry = self
            .input
            .input(&target, phone_number, Some(&selectors.continue_button))
            .await?;
        if !entry.success {
            ctx.step_failures += 1;
            warn!("Phone number was not accepted by any input strategy");
            return Ok(false);
        }
        info!(strategy = ?entry.strategy, "Phone number entered");
        ctx.enter(LoginState::PhoneEntered);

        // 5. Continue, only when present and enabled
        if !self.locator.is_enabled(&selectors.continue_button).await? {
            warn!("Continue button missing or disabled");
            return Ok(false);
        }
        match self.locator.click(&selectors.continue_button).await {
            Ok(()) => {}
            Err(err) if err.is_not_found() => {
                warn!("Continue button vanished before the tap");
                return Ok(false);
            }
            Err(err) => return Err(err.into()),
        }
        ctx.enter(LoginState::ContinuePressed);

        // 6. Wait for the OTP page or home screen
        if self.verify_login().await? {
            ctx.enter(LoginState::LoginVerified);
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn verify_login(&self) -> Result<bool, FlowError> {
        let timings = &self.config.timings;
        let started = Instant::now();
        let deadline = Deadline::after(
            ms(timings.login_verify_timeout_ms),
            ms(timings.checkpoint_poll_ms),
        );

        loop {
            match self.check_login_screen(started).await? {
                LoginCheck::Verified(marker) => {
                    info!(marker, "Login verified");
                    return Ok(true);
                }
                LoginCheck::Rejected(reason) => {
                    warn!(reason, "Login rejected");
                    return Ok(false);
                }
                LoginCheck::Pending => {}
            }

            if !deadline.tick().await {
                warn!(
                    timeout_ms = timings.login_verify_timeout_ms,
                    "Neither OTP page nor home screen appeared"
                );
                return Ok(false);
            }
        }
    }

    async fn check_login_screen(&self, started: Instant) -> Result<LoginCheck, FlowError> {
        let selectors = &self.config.login;

        if self.any_exists(&selectors.otp_markers).await? {
            return Ok(LoginCheck::Verified("otp-page"));
        }
        if self.any_exists(&selectors.home_markers).await? {
            return Ok(LoginCheck::Verified("home"));
        }
        if self.locator.exists(&selectors.error_banner).await? {
            return Ok(LoginCheck::Rejected("error banner shown"));
        }

        let grace = ms(self.config.timings.login_stuck_grace_ms);
        if started.elapsed() >= grace
            && self.locator.is_enabled(&selectors.continue_button).await?
        {
            return Ok(LoginCheck::Rejected("still on login screen"));
        }

        Ok(LoginCheck::Pending)
    }
}
