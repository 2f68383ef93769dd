use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use action_flow::{EngineConfig, FlowEngine};
use anyhow::{bail, Context, Result};
use clap::Args;
use popup_guard::PopupCatalog;
use tracing::{error, warn};
use ui_bridge::{ScriptedDevice, UiDevice};

use crate::cli::context::CliContext;
use crate::cli::output::print_structured;
use crate::rehearsal::{rehearse, Rehearsal, RehearsalPlan, RehearsalReport};

#[derive(Args, Clone, Debug)]
pub struct RehearseArgs {
    /// Rehearsal file: scripted device plus plan
    #[arg(short, long, value_name = "FILE")]
    pub scenario: PathBuf,

    /// Phone number for the login flow (overrides the plan)
    #[arg(long)]
    pub phone: Option<String>,

    /// OTP code to submit (overrides the plan)
    #[arg(long)]
    pub otp: Option<String>,

    /// Resend budget for the OTP flow
    #[arg(long)]
    pub max_resend: Option<u32>,

    /// Time budget for the whole rehearsal
    #[arg(long, default_value_t = 300)]
    pub timeout_secs: u64,
}

pub async fn cmd_rehearse(args: RehearseArgs, ctx: &CliContext) -> Result<()> {
    let mut rehearsal = Rehearsal::load(&args.scenario).await?;

    let plan = &mut rehearsal.plan;
    if args.phone.is_some() {
        plan.phone = args.phone;
    }
    if args.otp.is_some() {
        plan.otp = args.otp;
    }
    if args.max_resend.is_some() {
        plan.max_resend = args.max_resend;
    }
    if plan.is_empty() {
        bail!(
            "{} has nothing to rehearse; add a plan or pass --phone/--otp",
            args.scenario.display()
        );
    }

    ctx.config().validate().context("Invalid engine configuration")?;
    let catalog = ctx.config().popup_catalog()?;
    let device: Arc<dyn UiDevice> = Arc::new(ScriptedDevice::from_scenario(rehearsal.device)?);

    let report = run_device(
        device,
        ctx.shared_config(),
        catalog,
        rehearsal.plan,
        Duration::from_secs(args.timeout_secs),
    )
    .await;

    if !print_structured(ctx.output(), &report)? {
        print_report(&report);
    }

    if !report.success {
        bail!("Rehearsal on {} failed", report.serial);
    }
    Ok(())
}

/// Run one device under a time budget; never fails, the report says how it went.
pub(crate) async fn run_device(
    device: Arc<dyn UiDevice>,
    config: Arc<EngineConfig>,
    catalog: Arc<PopupCatalog>,
    plan: RehearsalPlan,
    budget: Duration,
) -> RehearsalReport {
    let engine = FlowEngine::with_catalog(device, config, catalog);
    let serial = engine.serial().clone();
    let mut report = RehearsalReport::new(serial.clone());

    match tokio::time::timeout(budget, rehearse(&engine, &plan, &mut report)).await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => {
            error!(%serial, severity = err.severity(), "Rehearsal aborted: {}", err);
            report.fail(err.to_string());
        }
        Err(_) => {
            warn!(%serial, budget_secs = budget.as_secs(), "Rehearsal timed out");
            report.fail(format!("timed out after {}s", budget.as_secs()));
        }
    }
    report
}

pub(crate) fn print_report(report: &RehearsalReport) {
    let verdict = if report.success { "PASS" } else { "FAIL" };
    println!("Device {}: {}", report.serial, verdict);

    for phase in &report.phases {
        let status = if phase.success { "ok" } else { "failed" };
        match &phase.context {
            Some(ctx) => {
                let states: Vec<String> = ctx.states.iter().map(|s| s.to_string()).collect();
                println!(
                    "  {:<6} {:<7} {}ms  submissions={} resends={} step_failures={}",
                    format!("{:?}", phase.phase).to_lowercase(),
                    status,
                    ctx.latency_ms().unwrap_or(0),
                    ctx.submissions,
                    ctx.resend_count,
                    ctx.step_failures,
                );
                if let Some(classification) = ctx.last_classification {
                    println!("         last message: {}", classification);
                }
                println!("         states: {}", states.join(" -> "));
            }
            None => println!("  {:?} {}", phase.phase, status),
        }
    }

    if let Some(error) = &report.error {
        println!("  error: {}", error);
    }
}
