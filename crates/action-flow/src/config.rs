//! Engine configuration
//!
//! Selector catalogs, popup catalog, timings and the resend budget. All of
//! it is static data supplied at construction; nothing is discovered at
//! runtime. Every field has a default matching the host app, so an empty
//! YAML document is a valid configuration.

use std::sync::Arc;
use std::time::Duration;

use action_input::InputTimings;
use devflow_core_types::Selector;
use popup_guard::{PopupCatalog, PopupDefinition, PopupSettings};
use serde::{Deserialize, Serialize};

use crate::classify::{builtin_patterns, MessagePattern};
use crate::errors::FlowError;

const APP_ID_PREFIX: &str = "com.pure.indosat.care:id/";

fn app_id(name: &str) -> Selector {
    Selector::id(format!("{APP_ID_PREFIX}{name}")).with_label(name)
}

/// Selectors for the login screens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginSelectors {
    /// Present whenever the app is in the foreground
    pub root: Selector,
    pub account_tab: Selector,
    pub login_container: Selector,
    /// Tapped to focus the phone field
    pub phone_container: Selector,
    pub phone_field: Selector,
    pub continue_button: Selector,
    /// Any of these means the OTP page opened
    pub otp_markers: Vec<Selector>,
    pub home_markers: Vec<Selector>,
    pub error_banner: Selector,
}

impl Default for LoginSelectors {
    fn default() -> Self {
        Self {
            root: app_id("action_bar_root"),
            account_tab: app_id("navigation_account"),
            login_container: app_id("clLogin"),
            phone_container: app_id("tilMobileNumber"),
            phone_field: Selector::class("android.widget.EditText").with_label("phone field"),
            continue_button: app_id("btnContinue"),
            otp_markers: vec![app_id("tvLoginVerification"), app_id("etOtpView")],
            home_markers: vec![app_id("home")],
            error_banner: Selector::text_contains("invalid").with_label("invalid banner"),
        }
    }
}

/// Selectors for the OTP verification screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OtpSelectors {
    /// Any of these means the OTP page is showing
    pub page_markers: Vec<Selector>,
    pub sent_notice: Selector,
    pub msisdn: Selector,
    pub otp_field: Selector,
    pub verify_button: Selector,
    /// Visible labels tried when the verify identifier is absent
    pub verify_texts: Vec<String>,
    pub countdown: Selector,
    pub resend_button: Selector,
    /// Visible labels tried when the resend identifier is absent
    pub resend_texts: Vec<String>,
    pub message: Selector,
    /// "Verifying your number" screen shown while the app completes login
    pub verifying_marker: Selector,
    pub redirect_timer: Selector,
    pub home_markers: Vec<Selector>,
}

impl Default for OtpSelectors {
    fn default() -> Self {
        Self {
            page_markers: vec![app_id("tvLoginVerification"), app_id("etOtpView")],
            sent_notice: app_id("tvOtpSentContent"),
            msisdn: app_id("tvMSISDN"),
            otp_field: app_id("etOtpView"),
            verify_button: app_id("btnVerify"),
            verify_texts: vec!["Verify".into(), "Verifikasi".into()],
            countdown: app_id("tvCountdown"),
            resend_button: app_id("tvResendOTP"),
            resend_texts: vec![
                "Resend OTP".into(),
                "Kirim Ulang OTP".into(),
                "Resend".into(),
                "Kirim Ulang".into(),
            ],
            message: app_id("tvMessage"),
            verifying_marker: app_id("tvVerifyingYourNumber"),
            redirect_timer: app_id("tvTimer"),
            home_markers: vec![app_id("home"), app_id("dashBoardView")],
        }
    }
}

impl OtpSelectors {
    /// Verify button by identifier first, then by visible text
    pub fn verify_candidates(&self) -> Vec<Selector> {
        with_text_fallbacks(&self.verify_button, &self.verify_texts)
    }

    /// Resend control by identifier first, then by visible text
    pub fn resend_candidates(&self) -> Vec<Selector> {
        with_text_fallbacks(&self.resend_button, &self.resend_texts)
    }
}

fn with_text_fallbacks(primary: &Selector, texts: &[String]) -> Vec<Selector> {
    std::iter::once(primary.clone())
        .chain(texts.iter().map(|text| Selector::text(text.clone())))
        .collect()
}

/// Flow timings in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowTimings {
    /// Interval of the flow-level checkpoint polls
    pub checkpoint_poll_ms: u64,
    pub login_container_timeout_ms: u64,
    pub login_verify_timeout_ms: u64,
    /// "Still on the login screen" only counts as failure after this long
    pub login_stuck_grace_ms: u64,
    pub otp_page_timeout_ms: u64,
    pub verify_response_ms: u64,
    pub resend_confirm_ms: u64,
    pub resend_settle_ms: u64,
    /// Longest running countdown the engine waits out before resending
    pub max_countdown_wait_ms: u64,
    pub countdown_margin_ms: u64,
    pub redirect_margin_ms: u64,
    pub redirect_fallback_ms: u64,
    pub home_timeout_ms: u64,
    pub popup_rounds: usize,
}

impl Default for FlowTimings {
    fn default() -> Self {
        Self {
            checkpoint_poll_ms: 1000,
            login_container_timeout_ms: 5000,
            login_verify_timeout_ms: 15_000,
            login_stuck_grace_ms: 3000,
            otp_page_timeout_ms: 10_000,
            verify_response_ms: 2000,
            resend_confirm_ms: 2000,
            resend_settle_ms: 5000,
            max_countdown_wait_ms: 90_000,
            countdown_margin_ms: 1000,
            redirect_margin_ms: 2000,
            redirect_fallback_ms: 5000, // when the redirect timer is unreadable
            home_timeout_ms: 20_000,
            popup_rounds: 3,
        }
    }
}

pub(crate) fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}

/// Everything a [`crate::FlowEngine`] needs besides the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub login: LoginSelectors,
    pub otp: OtpSelectors,

    /// Overrides the built-in popup catalog when set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub popups: Option<Vec<PopupDefinition>>,

    pub popup_settings: PopupSettings,
    pub input: InputTimings,
    pub timings: FlowTimings,
    pub message_patterns: Vec<MessagePattern>,

    /// Resend budget used when the caller does not pass one
    pub max_resend: u32,

    /// Locator poll interval
    pub poll_interval_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            login: LoginSelectors::default(),
            otp: OtpSelectors::default(),
            popups: None,
            popup_settings: PopupSettings::default(),
            input: InputTimings::default(),
            timings: FlowTimings::default(),
            message_patterns: builtin_patterns(),
            max_resend: 1,
            poll_interval_ms: 400,
        }
    }
}

impl EngineConfig {
    /// Popup catalog for this configuration.
    pub fn popup_catalog(&self) -> Result<Arc<PopupCatalog>, FlowError> {
        match &self.popups {
            Some(definitions) => Ok(Arc::new(PopupCatalog::new(definitions.clone())?)),
            None => Ok(PopupCatalog::shared_builtin()),
        }
    }

    /// Check every selector and the popup catalog.
    pub fn validate(&self) -> Result<(), FlowError> {
        let login = &self.login;
        let otp = &self.otp;

        let mut named: Vec<(&str, &Selector)> = vec![
            ("login.root", &login.root),
            ("login.account_tab", &login.account_tab),
            ("login.login_container", &login.login_container),
            ("login.phone_container", &login.phone_container),
            ("login.phone_field", &login.phone_field),
            ("login.continue_button", &login.continue_button),
            ("login.error_banner", &login.error_banner),
            ("otp.sent_notice", &otp.sent_notice),
            ("otp.msisdn", &otp.msisdn),
            ("otp.otp_field", &otp.otp_field),
            ("otp.verify_button", &otp.verify_button),
            ("otp.countdown", &otp.countdown),
            ("otp.resend_button", &otp.resend_button),
            ("otp.message", &otp.message),
            ("otp.verifying_marker", &otp.verifying_marker),
            ("otp.redirect_timer", &otp.redirect_timer),
        ];
        named.extend(login.otp_markers.iter().map(|s| ("login.otp_markers", s)));
        named.extend(login.home_markers.iter().map(|s| ("login.home_markers", s)));
        named.extend(otp.page_markers.iter().map(|s| ("otp.page_markers", s)));
        named.extend(otp.home_markers.iter().map(|s| ("otp.home_markers", s)));

        for (name, selector) in named {
            selector
                .validate()
                .map_err(|err| FlowError::InvalidConfig(format!("{name}: {err}")))?;
        }

        for (name, list) in [
            ("login.otp_markers", &login.otp_markers),
            ("login.home_markers", &login.home_markers),
            ("otp.page_markers", &otp.page_markers),
            ("otp.home_markers", &otp.home_markers),
        ] {
            if list.is_empty() {
                return Err(FlowError::InvalidConfig(format!("{name} is empty")));
            }
        }

        if self.poll_interval_ms == 0 || self.timings.checkpoint_poll_ms == 0 {
            return Err(FlowError::InvalidConfig(
                "poll intervals must be positive".to_string(),
            ));
        }

        self.popup_catalog()?;
        Ok(())
    }
}
