mod common;

use std::time::Duration;

use action_flow::{MessageClassification, OtpState, ResendOutcome};
use common::{app_element, engine_for};
use tokio::time::Instant;
use ui_bridge::{Effect, ElementSpec, Reaction, Scenario, Trigger};

const CODE: &str = "123456";

fn set_text(target: &str, value: &str) -> Effect {
    Effect::SetText {
        target: target.into(),
        value: value.into(),
    }
}

/// OTP page; `countdown` of None leaves the countdown element out entirely.
fn otp_scenario(countdown: Option<&str>) -> Scenario {
    let mut scenario = Scenario::new("emulator-5556")
        .with_element(app_element("tvLoginVerification"))
        .with_element(app_element("tvMSISDN").with_text("+62 812-3456-7890"))
        .with_element(app_element("etOtpView").with_class("android.widget.EditText"))
        .with_element(app_element("btnVerify").with_text("Verify"))
        .with_element(app_element("tvResendOTP").with_text("Resend OTP"))
        .with_element(app_element("tvMessage"))
        .with_element(app_element("tvVerifyingYourNumber").hidden())
        .with_element(app_element("tvTimer").hidden())
        .with_element(app_element("dashBoardView").hidden());

    if let Some(text) = countdown {
        scenario = scenario.with_element(app_element("tvCountdown").with_text(text));
    }
    scenario
}

fn on_tap(scenario: Scenario, key: &str, effects: Vec<Effect>) -> Scenario {
    scenario.with_reaction(Reaction::new(Trigger::Tap(key.into()), effects))
}

fn accepted() -> Vec<Effect> {
    vec![
        Effect::Show("tvVerifyingYourNumber".into()),
        Effect::Show("dashBoardView".into()),
    ]
}

#[tokio::test(start_paused = true)]
async fn two_invalid_codes_exhaust_single_resend() {
    let scenario = otp_scenario(Some("04:59"));
    let scenario = on_tap(
        scenario,
        "btnVerify",
        vec![
            set_text("tvMessage", "Invalid OTP code"),
            set_text("tvCountdown", "00:00"),
        ],
    );
    let scenario = on_tap(
        scenario,
        "tvResendOTP",
        vec![
            set_text("tvCountdown", "05:00"),
            set_text("tvMessage", "OTP successfully sent"),
        ],
    );
    let (device, engine) = engine_for(scenario);

    assert!(!engine.run_otp_flow(CODE, 1).await.unwrap());

    assert_eq!(device.tap_count("btnVerify"), 2);
    assert_eq!(device.tap_count("tvResendOTP"), 1);
    let ctx = engine.last_context().unwrap();
    assert_eq!(ctx.submissions, 2);
    assert_eq!(ctx.resend_count, 1);
    assert_eq!(ctx.resend_outcomes, vec![ResendOutcome::Confirmed]);
    assert_eq!(ctx.last_classification, Some(MessageClassification::Invalid));
    assert!(!ctx.visited(OtpState::HomeVerified));
}

#[tokio::test(start_paused = true)]
async fn unknown_countdown_blocks_resend() {
    let scenario = on_tap(otp_scenario(None), "btnVerify", accepted());
    let (device, engine) = engine_for(scenario);

    assert!(engine.run_otp_flow(CODE, 1).await.unwrap());

    assert_eq!(device.tap_count("tvResendOTP"), 0);
    assert_eq!(device.tap_count("btnVerify"), 1);
    let ctx = engine.last_context().unwrap();
    assert_eq!(ctx.resend_count, 0);
    assert_eq!(ctx.resend_outcomes, vec![ResendOutcome::Refused]);
    assert_eq!(ctx.last_classification, Some(MessageClassification::Success));
}

#[tokio::test(start_paused = true)]
async fn elapsed_countdown_permits_resend() {
    let scenario = on_tap(otp_scenario(Some("00:00")), "btnVerify", accepted());
    let scenario = on_tap(
        scenario,
        "tvResendOTP",
        vec![set_text("tvCountdown", "04:59")],
    );
    let (device, engine) = engine_for(scenario);

    assert!(engine.run_otp_flow(CODE, 1).await.unwrap());

    assert_eq!(device.tap_count("tvResendOTP"), 1);
    let ctx = engine.last_context().unwrap();
    assert_eq!(ctx.resend_count, 1);
    assert_eq!(ctx.submissions, 1);
    assert!(ctx.visited(OtpState::ResendAttempted));
    assert!(ctx.visited(OtpState::HomeVerified));
}

#[tokio::test(start_paused = true)]
async fn unconfirmed_resend_still_consumes_budget() {
    // Resend tap leaves the countdown at zero
    let scenario = on_tap(otp_scenario(Some("00:00")), "btnVerify", accepted());
    let scenario = on_tap(scenario, "tvResendOTP", Vec::new());
    let (device, engine) = engine_for(scenario);

    assert!(engine.run_otp_flow(CODE, 1).await.unwrap());

    assert_eq!(device.tap_count("tvResendOTP"), 1);
    let ctx = engine.last_context().unwrap();
    assert_eq!(ctx.resend_outcomes, vec![ResendOutcome::Unconfirmed]);
    assert!(!ctx.resend_budget_left());
}

#[tokio::test(start_paused = true)]
async fn rejection_with_running_countdown_is_terminal() {
    let scenario = on_tap(
        otp_scenario(Some("04:59")),
        "btnVerify",
        vec![set_text("tvMessage", "Kode OTP telah kadaluarsa")],
    );
    let (device, engine) = engine_for(scenario);

    assert!(!engine.run_otp_flow(CODE, 2).await.unwrap());

    assert_eq!(device.tap_count("tvResendOTP"), 0);
    let ctx = engine.last_context().unwrap();
    assert_eq!(ctx.submissions, 1);
    assert_eq!(ctx.last_classification, Some(MessageClassification::Expired));
}

#[tokio::test(start_paused = true)]
async fn success_waits_out_redirect_timer() {
    let scenario = on_tap(
        otp_scenario(Some("04:59")),
        "btnVerify",
        vec![
            set_text("tvMessage", "Verification Complete"),
            set_text("tvTimer", "00:03"),
            Effect::Show("tvTimer".into()),
            Effect::Show("dashBoardView".into()),
        ],
    );
    let (_device, engine) = engine_for(scenario);

    let started = Instant::now();
    assert!(engine.run_otp_flow(CODE, 1).await.unwrap());

    // verify response + 3s timer + 2s margin
    assert!(started.elapsed() >= Duration::from_secs(7));
}

#[tokio::test(start_paused = true)]
async fn oversized_redirect_timer_is_capped() {
    let scenario = on_tap(
        otp_scenario(Some("04:59")),
        "btnVerify",
        vec![
            set_text("tvMessage", "Verification Complete"),
            set_text("tvTimer", "18446744073709551615"),
            Effect::Show("tvTimer".into()),
            Effect::Show("dashBoardView".into()),
        ],
    );
    let (_device, engine) = engine_for(scenario);

    let started = Instant::now();
    assert!(engine.run_otp_flow(CODE, 1).await.unwrap());

    // capped at max_countdown_wait (90s)
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(90));
    assert!(elapsed < Duration::from_secs(120));
}

#[tokio::test(start_paused = true)]
async fn rejection_waits_out_short_countdown_before_resend() {
    let scenario = on_tap(
        otp_scenario(Some("00:30")),
        "btnVerify",
        vec![set_text("tvMessage", "Invalid OTP code")],
    );
    let scenario = on_tap(
        scenario,
        "tvResendOTP",
        vec![set_text("tvCountdown", "05:00")],
    );
    let (device, engine) = engine_for(scenario);

    let ticker = device.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(20)).await;
        ticker.apply(set_text("tvCountdown", "00:00"));
    });

    let started = Instant::now();
    assert!(!engine.run_otp_flow(CODE, 1).await.unwrap());

    assert!(started.elapsed() >= Duration::from_secs(31));
    assert_eq!(device.tap_count("tvResendOTP"), 1);
    assert_eq!(device.tap_count("btnVerify"), 2);
    let ctx = engine.last_context().unwrap();
    assert_eq!(ctx.resend_outcomes, vec![ResendOutcome::Confirmed]);
    assert_eq!(ctx.submissions, 2);
    assert_eq!(ctx.last_classification, Some(MessageClassification::Invalid));
}

#[tokio::test(start_paused = true)]
async fn verify_found_by_visible_text() {
    let scenario = Scenario::new("emulator-5558")
        .with_element(app_element("etOtpView").with_class("android.widget.EditText"))
        .with_element(app_element("tvCountdown").with_text("01:00"))
        .with_element(ElementSpec::new("verify").with_text("Verifikasi"))
        .with_element(app_element("home").hidden())
        .with_reaction(Reaction::new(
            Trigger::Tap("verify".into()),
            vec![Effect::Show("home".into())],
        ));
    let (device, engine) = engine_for(scenario);

    assert!(engine.run_otp_flow(CODE, 0).await.unwrap());
    assert_eq!(device.tap_count("verify"), 1);
}

#[tokio::test(start_paused = true)]
async fn disabled_verify_counts_as_attempt() {
    let mut scenario = otp_scenario(Some("04:59"));
    for element in scenario.elements.iter_mut() {
        if element.key == "btnVerify" {
            element.enabled = false;
        }
    }
    let (device, engine) = engine_for(scenario);

    assert!(!engine.run_otp_flow(CODE, 1).await.unwrap());

    assert_eq!(device.tap_count("btnVerify"), 0);
    let ctx = engine.last_context().unwrap();
    assert_eq!(ctx.submissions, 2);
    assert_eq!(ctx.step_failures, 2);
}

#[tokio::test(start_paused = true)]
async fn missing_home_screen_times_out() {
    let scenario = on_tap(
        otp_scenario(Some("04:59")),
        "btnVerify",
        vec![set_text("tvMessage", "OTP berhasil dikirim")],
    );
    let (_device, engine) = engine_for(scenario);

    let started = Instant::now();
    assert!(!engine.run_otp_flow(CODE, 0).await.unwrap());

    assert!(started.elapsed() >= Duration::from_secs(20));
    let ctx = engine.last_context().unwrap();
    assert_eq!(ctx.last_classification, Some(MessageClassification::Sent));
    assert_eq!(ctx.step_failures, 1);
}

#[tokio::test(start_paused = true)]
async fn missing_otp_page_fails() {
    let (device, engine) = engine_for(Scenario::new("emulator-5560"));

    let started = Instant::now();
    assert!(!engine.run_otp_flow(CODE, 1).await.unwrap());

    assert!(started.elapsed() >= Duration::from_secs(10));
    assert!(device.events().is_empty());
}

#[tokio::test(start_paused = true)]
async fn lost_session_is_an_error() {
    let (device, engine) = engine_for(otp_scenario(Some("00:00")));
    device.disconnect();

    let err = engine.run_otp_flow(CODE, 1).await.unwrap_err();
    assert!(err.is_session_lost());
}
