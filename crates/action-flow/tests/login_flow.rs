mod common;

use std::time::Duration;

use action_flow::{FlowState, LoginState};
use common::{app_element, engine_for};
use tokio::time::Instant;
use ui_bridge::{Effect, ElementSpec, Reaction, Scenario, Trigger};

const PHONE: &str = "081234567890";

/// Home screen with a login form behind the account tab.
fn login_scenario(on_continue: Vec<Effect>) -> Scenario {
    Scenario::new("emulator-5554")
        .with_element(app_element("action_bar_root"))
        .with_element(app_element("navigation_account"))
        .with_element(app_element("clLogin").hidden())
        .with_element(app_element("tilMobileNumber").hidden())
        .with_element(
            ElementSpec::new("phone")
                .with_class("android.widget.EditText")
                .hidden(),
        )
        .with_element(app_element("btnContinue").hidden().disabled())
        .with_element(app_element("tvLoginVerification").hidden())
        .with_element(
            ElementSpec::new("banner")
                .with_text("Invalid phone number")
                .hidden(),
        )
        .with_reaction(Reaction::new(
            Trigger::Tap("navigation_account".into()),
            vec![
                Effect::Show("clLogin".into()),
                Effect::Show("tilMobileNumber".into()),
                Effect::Show("phone".into()),
                Effect::Show("btnContinue".into()),
            ],
        ))
        .with_reaction(Reaction::new(
            Trigger::TextEquals {
                target: "phone".into(),
                value: PHONE.into(),
            },
            vec![Effect::Enable("btnContinue".into())],
        ))
        .with_reaction(Reaction::new(Trigger::Tap("btnContinue".into()), on_continue))
}

#[tokio::test(start_paused = true)]
async fn login_reaches_otp_page() {
    let (device, engine) = engine_for(login_scenario(vec![
        Effect::Hide("clLogin".into()),
        Effect::Show("tvLoginVerification".into()),
    ]));

    assert!(engine.run_login_flow(PHONE).await.unwrap());

    assert_eq!(device.tap_count("navigation_account"), 1);
    assert_eq!(device.tap_count("btnContinue"), 1);
    assert_eq!(device.text_history("phone"), vec![PHONE.to_string()]);

    let ctx = engine.last_context().unwrap();
    assert_eq!(ctx.success, Some(true));
    assert_eq!(
        ctx.states,
        vec![
            FlowState::Login(LoginState::AppOpen),
            FlowState::Login(LoginState::AccountTabSelected),
            FlowState::Login(LoginState::PhoneEntered),
            FlowState::Login(LoginState::ContinuePressed),
            FlowState::Login(LoginState::LoginVerified),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn invalid_banner_fails_without_waiting_out_timeout() {
    let (device, engine) = engine_for(login_scenario(vec![Effect::Show("banner".into())]));

    let started = Instant::now();
    assert!(!engine.run_login_flow(PHONE).await.unwrap());

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(device.tap_count("btnContinue"), 1);
    let ctx = engine.last_context().unwrap();
    assert!(ctx.visited(LoginState::ContinuePressed));
    assert!(!ctx.visited(LoginState::LoginVerified));
    assert_eq!(ctx.last_state(), Some(FlowState::Login(LoginState::Failed)));
}

#[tokio::test(start_paused = true)]
async fn unresponsive_continue_fails_after_grace() {
    let (_device, engine) = engine_for(login_scenario(Vec::new()));

    let started = Instant::now();
    assert!(!engine.run_login_flow(PHONE).await.unwrap());

    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(3));
    assert!(elapsed < Duration::from_secs(15));
}

#[tokio::test(start_paused = true)]
async fn missing_app_root_fails_fast() {
    let scenario = Scenario::new("emulator-5554").with_element(app_element("navigation_account"));
    let (device, engine) = engine_for(scenario);

    assert!(!engine.run_login_flow(PHONE).await.unwrap());
    assert!(device.events().is_empty());
}

#[tokio::test(start_paused = true)]
async fn continue_never_enabled_fails_phone_entry() {
    let scenario = login_scenario(vec![Effect::Show("tvLoginVerification".into())]);
    let (device, engine) = engine_for(scenario);

    assert!(!engine.run_login_flow("0000").await.unwrap());

    // Direct, edit-last-character, then one write per prefix after a clear
    assert_eq!(device.text_history("phone").len(), 1 + 2 + 1 + 4);
    assert_eq!(device.tap_count("btnContinue"), 0);
    let ctx = engine.last_context().unwrap();
    assert_eq!(ctx.step_failures, 1);
    assert!(!ctx.visited(LoginState::PhoneEntered));
}

#[tokio::test(start_paused = true)]
async fn lost_session_is_an_error() {
    let (device, engine) = engine_for(login_scenario(Vec::new()));
    device.disconnect();

    let err = engine.run_login_flow(PHONE).await.unwrap_err();
    assert!(err.is_session_lost());
    assert_eq!(engine.last_context().unwrap().success, Some(false));
}
