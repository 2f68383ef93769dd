//! OTP flow
//!
//! A bounded loop over `CountdownChecked -> (ResendAttempted)? ->
//! CodeEntered -> VerifySubmitted -> Classified -> HomeVerified`. The loop
//! allows `max_resend + 1` submissions in total; every resend tap consumes
//! one unit of budget whether or not the countdown confirmed it.

use action_input::InputTarget;
use action_primitives::{CountdownTimer, CountdownValue, Deadline};
use devflow_core_types::Selector;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::classify::MessageClassification;
use crate::config::ms;
use crate::engine::FlowEngine;
use crate::errors::FlowError;
use crate::types::{FlowContext, OtpState, ResendOutcome};

/// Result of the final home-screen poll.
enum HomeCheck {
    Home,
    Rejected(MessageClassification),
    TimedOut,
}

impl FlowEngine {
    /// Submit `otp_code`, resending at most `max_resend` times.
    ///
    /// True once a home or dashboard marker shows.
    pub async fn run_otp_flow(&self, otp_code: &str, max_resend: u32) -> Result<bool, FlowError> {
        let mut ctx = FlowContext::new(self.serial().clone(), "otp", max_resend);
        let span = info_span!(
            "otp_flow",
            serial = %ctx.serial,
            run_id = %ctx.run_id,
            max_resend
        );

        let outcome = self.otp(&mut ctx, otp_code).instrument(span).await;
        if matches!(outcome, Ok(false)) {
            ctx.enter(OtpState::Failed);
        }
        self.store_context(ctx, &outcome);
        outcome
    }

    async fn otp(&self, ctx: &mut FlowContext, otp_code: &str) -> Result<bool, FlowError> {
        let otp = &self.config.otp;
        let timings = &self.config.timings;

        // 1. Make sure the OTP page is up
        self.sweep_popups().await?;
        if !self
            .wait_for_any(&otp.page_markers, ms(timings.otp_page_timeout_ms))
            .await?
        {
            warn!("OTP page did not appear");
            return Ok(false);
        }
        if let Some(msisdn) = self.locator.resolve(&otp.msisdn).await? {
            info!(msisdn = msisdn.text(), "OTP page open");
        }
        ctx.enter(OtpState::OtpPageVerified);

        let verify_candidates = otp.verify_candidates();
        let code_target = InputTarget::field(otp.otp_field.clone());

        while ctx.submissions < ctx.max_submissions() {
            // 2. Resend when the countdown is over
            let countdown = CountdownTimer::read(&self.locator, &otp.countdown).await?;
            ctx.enter(OtpState::CountdownChecked);
            debug!(%countdown, resend_count = ctx.resend_count, "Countdown checked");

            if (countdown.is_zero() || countdown.is_unknown()) && ctx.resend_budget_left() {
                let outcome = self.try_resend(ctx, false).await?;
                if outcome.tapped() {
                    self.locator.settle(ms(timings.resend_settle_ms)).await;
                    continue;
                }
            }

            // 3. Enter the code; the Verify button is checked on its own
            let entry = self.input.input(&code_target, otp_code, None).await?;
            if !entry.success {
                ctx.step_failures += 1;
                ctx.submissions += 1;
                warn!(attempt = ctx.submissions, "OTP code could not be entered");
                continue;
            }
            ctx.enter(OtpState::CodeEntered);

            // 4. Verify, only when present and enabled
            let submitted = self.submit_code(&verify_candidates).await?;
            ctx.submissions += 1;
            if !submitted {
                ctx.step_failures += 1;
                continue;
            }
            ctx.enter(OtpState::VerifySubmitted);
            self.locator.settle(ms(timings.verify_response_ms)).await;

            // 5. Classify the response
            let classification = self.classify_screen().await?;
            ctx.last_classification = Some(classification);
            ctx.enter(OtpState::Classified);
            info!(
                %classification,
                attempt = ctx.submissions,
                "OTP submission classified"
            );

            if classification.is_rejection() {
                if !ctx.resend_budget_left() {
                    warn!(%classification, "OTP rejected and resend budget exhausted");
                    return Ok(false);
                }
                let outcome = self.try_resend(ctx, true).await?;
                if !outcome.tapped() {
                    warn!(%classification, "OTP rejected and no resend possible");
                    return Ok(false);
                }
                self.locator.settle(ms(timings.resend_settle_ms)).await;
                continue;
            }

            if classification == MessageClassification::Success {
                self.wait_for_redirect().await?;
            }

            // 6. Confirm the home screen
            match self.wait_for_home().await? {
                HomeCheck::Home => {
                    ctx.enter(OtpState::HomeVerified);
                    info!(attempt = ctx.submissions, "Home screen reached");
                    return Ok(true);
                }
                HomeCheck::Rejected(classification) => {
                    ctx.last_classification = Some(classification);
                    warn!(%classification, "Rejected while waiting for home screen");
                    return Ok(false);
                }
                HomeCheck::TimedOut => {
                    ctx.step_failures += 1;
                    warn!(
                        timeout_ms = timings.home_timeout_ms,
                        attempt = ctx.submissions,
                        "Home screen did not appear"
                    );
                }
            }
        }

        warn!(
            submissions = ctx.submissions,
            resend_count = ctx.resend_count,
            "OTP attempts exhausted"
        );
        Ok(false)
    }

    /// Tap the resend control if the countdown allows it.
    ///
    /// An unreadable countdown never allows a tap. With `wait_for_running`
    /// a short running countdown is waited out first. The outcome is
    /// recorded on `ctx`.
    async fn try_resend(
        &self,
        ctx: &mut FlowContext,
        wait_for_running: bool,
    ) -> Result<ResendOutcome, FlowError> {
        let outcome = self.resend(wait_for_running).await?;
        ctx.record_resend(outcome);
        if outcome.tapped() {
            ctx.enter(OtpState::ResendAttempted);
        }
        info!(
            ?outcome,
            resend_count = ctx.resend_count,
            max_resend = ctx.max_resend,
            "Resend attempt"
        );
        Ok(outcome)
    }

    async fn resend(&self, wait_for_running: bool) -> Result<ResendOutcome, FlowError> {
        let otp = &self.config.otp;
        let timings = &self.config.timings;

        // 1. Countdown must read zero
        let before = match CountdownTimer::read(&self.locator, &otp.countdown).await? {
            CountdownValue::Unknown => {
                warn!("Countdown unreadable; not assuming resend is allowed");
                return Ok(ResendOutcome::Refused);
            }
            value if value.is_zero() => value,
            CountdownValue::Remaining(remaining) => {
                if !wait_for_running || remaining > ms(timings.max_countdown_wait_ms) {
                    debug!(countdown = %CountdownValue::Remaining(remaining), "Countdown still running");
                    return Ok(ResendOutcome::Refused);
                }
                info!(
                    wait_ms = remaining.as_millis() as u64,
                    "Waiting out countdown before resend"
                );
                self.locator
                    .settle(remaining.saturating_add(ms(timings.countdown_margin_ms)))
                    .await;

                let reread = CountdownTimer::read(&self.locator, &otp.countdown).await?;
                if !reread.is_zero() {
                    warn!(countdown = %reread, "Countdown did not reach zero");
                    return Ok(ResendOutcome::Refused);
                }
                reread
            }
        };

        // 2. Resolve the control by identifier, then by text
        let candidates = otp.resend_candidates();
        let Some((selector, handle)) = self.resolve_first(&candidates).await? else {
            warn!("Resend control not found");
            return Ok(ResendOutcome::Refused);
        };
        if !handle.is_enabled() {
            warn!(control = %selector, "Resend control disabled");
            return Ok(ResendOutcome::Refused);
        }

        match self.locator.click(selector).await {
            Ok(()) => {}
            Err(err) if err.is_not_found() => return Ok(ResendOutcome::Refused),
            Err(err) => return Err(err.into()),
        }

        // 3. A restarted countdown confirms the resend
        self.locator.settle(ms(timings.resend_confirm_ms)).await;
        let after = CountdownTimer::read(&self.locator, &otp.countdown).await?;
        if after != before && !after.is_zero() && !after.is_unknown() {
            Ok(ResendOutcome::Confirmed)
        } else {
            warn!(%before, %after, "Resend tapped but countdown did not restart");
            Ok(ResendOutcome::Unconfirmed)
        }
    }

    async fn submit_code(&self, candidates: &[Selector]) -> Result<bool, FlowError> {
        let Some((selector, handle)) = self.resolve_first(candidates).await? else {
            warn!("Verify button not found");
            return Ok(false);
        };
        if !handle.is_enabled() {
            warn!(button = %selector, "Verify button disabled");
            return Ok(false);
        }

        match self.locator.click(selector).await {
            Ok(()) => Ok(true),
            Err(err) if err.is_not_found() => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    /// Sit out the post-verification redirect timer, if one is showing.
    async fn wait_for_redirect(&self) -> Result<(), FlowError> {
        let otp = &self.config.otp;
        let timings = &self.config.timings;

        if !self.locator.exists(&otp.redirect_timer).await? {
            return Ok(());
        }

        let timer = CountdownTimer::read(&self.locator, &otp.redirect_timer).await?;
        let wait = match timer.remaining() {
            Some(remaining) => remaining
                .saturating_add(ms(timings.redirect_margin_ms))
                .min(ms(timings.max_countdown_wait_ms)),
            None => ms(timings.redirect_fallback_ms),
        };
        info!(%timer, wait_ms = wait.as_millis() as u64, "Waiting for redirect");
        self.locator.settle(wait).await;
        Ok(())
    }

    async fn wait_for_home(&self) -> Result<HomeCheck, FlowError> {
        let timings = &self.config.timings;
        let deadline = Deadline::after(ms(timings.home_timeout_ms), ms(timings.checkpoint_poll_ms));

        loop {
            if self.any_exists(&self.config.otp.home_markers).await? {
                return Ok(HomeCheck::Home);
            }
            let classification = self.classify_screen().await?;
            if classification.is_rejection() {
                return Ok(HomeCheck::Rejected(classification));
            }
            if !deadline.tick().await {
                return Ok(HomeCheck::TimedOut);
            }
        }
    }
}
