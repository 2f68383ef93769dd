use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use clap::Args;
use serde::Serialize;
use tokio::fs;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};
use ui_bridge::{DeviceProvider, ScenarioProvider, ScriptedDevice};

use crate::cli::context::CliContext;
use crate::cli::output::print_structured;
use crate::cli::rehearse::{print_report, run_device};
use crate::rehearsal::{Rehearsal, RehearsalPlan, RehearsalReport};

#[derive(Args, Clone, Debug)]
pub struct BatchArgs {
    /// Directory of rehearsal files, one device per file
    #[arg(short, long, value_name = "DIR")]
    pub dir: PathBuf,

    /// Time budget per device
    #[arg(long, default_value_t = 300)]
    pub timeout_secs: u64,

    /// Devices rehearsed at the same time
    #[arg(long, default_value_t = 4)]
    pub parallel: usize,
}

#[derive(Debug, Serialize)]
struct BatchSummary {
    devices: usize,
    passed: usize,
    failed: usize,
    reports: Vec<RehearsalReport>,
}

pub async fn cmd_batch(args: BatchArgs, ctx: &CliContext) -> Result<()> {
    ctx.config().validate().context("Invalid engine configuration")?;
    let catalog = ctx.config().popup_catalog()?;

    let (provider, plans) = load_devices(&args.dir).await?;
    if provider.is_empty() {
        bail!("No rehearsal files found in {}", args.dir.display());
    }

    let budget = Duration::from_secs(args.timeout_secs);
    let limit = Arc::new(Semaphore::new(args.parallel.max(1)));
    let mut join_set = JoinSet::new();

    for serial in provider.list_devices().await? {
        let device = provider.open(&serial).await?;
        let plan = plans.get(serial.as_str()).cloned().unwrap_or_default();
        let config = ctx.shared_config();
        let catalog = Arc::clone(&catalog);
        let pool = Arc::clone(&limit);

        join_set.spawn(async move {
            let _permit = pool
                .acquire_owned()
                .await
                .map_err(|err| anyhow!("Batch cancelled: {}", err))?;
            Ok::<_, anyhow::Error>(run_device(device, config, catalog, plan, budget).await)
        });
    }

    let mut reports = Vec::new();
    while let Some(result) = join_set.join_next().await {
        match result {
            Ok(Ok(report)) => reports.push(report),
            Ok(Err(err)) => warn!("Device task failed: {}", err),
            Err(join_err) => warn!("Device task panicked: {}", join_err),
        }
    }
    reports.sort_by(|a, b| a.serial.as_str().cmp(b.serial.as_str()));

    let passed = reports.iter().filter(|r| r.success).count();
    let summary = BatchSummary {
        devices: provider.len(),
        passed,
        failed: provider.len() - passed,
        reports,
    };
    info!(
        devices = summary.devices,
        passed = summary.passed,
        failed = summary.failed,
        "Batch finished"
    );

    if !print_structured(ctx.output(), &summary)? {
        for report in &summary.reports {
            print_report(report);
        }
        println!(
            "{} device(s): {} passed, {} failed",
            summary.devices, summary.passed, summary.failed
        );
    }

    if summary.failed > 0 {
        bail!("{} of {} device(s) failed", summary.failed, summary.devices);
    }
    Ok(())
}

/// Load every `*.yaml`/`*.yml` rehearsal in `dir`; later duplicates of a
/// serial are skipped.
async fn load_devices(dir: &Path) -> Result<(ScenarioProvider, HashMap<String, RehearsalPlan>)> {
    let provider = ScenarioProvider::new();
    let mut plans = HashMap::new();

    let mut entries = fs::read_dir(dir)
        .await
        .with_context(|| format!("reading {}", dir.display()))?;
    let mut paths = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_yaml = matches!(
            path.extension().and_then(|ext| ext.to_str()),
            Some("yaml") | Some("yml")
        );
        if is_yaml {
            paths.push(path);
        }
    }
    paths.sort();

    for path in paths {
        let rehearsal = Rehearsal::load(&path).await?;
        let serial = rehearsal.device.serial.clone();
        if plans.contains_key(&serial) {
            warn!(%serial, path = %path.display(), "Duplicate device serial; skipping file");
            continue;
        }
        if rehearsal.plan.is_empty() {
            warn!(%serial, path = %path.display(), "Rehearsal has no plan");
        }

        provider.insert(ScriptedDevice::from_scenario(rehearsal.device)?);
        plans.insert(serial, rehearsal.plan);
    }

    info!(devices = provider.len(), dir = %dir.display(), "Loaded rehearsal devices");
    Ok((provider, plans))
}
