//! Rehearsal files
//!
//! A rehearsal is a scripted device scenario plus the flows to drive on
//! it. The scenario keys sit at the top level of the file; the flows go
//! under `plan`.

use std::path::{Path, PathBuf};

use action_flow::{FlowContext, FlowEngine, FlowError, FlowStep};
use devflow_core_types::DeviceSerial;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use ui_bridge::{BridgeError, Scenario};

#[derive(Debug, Error)]
pub enum RehearsalError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid rehearsal file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

/// Flows to run, in order: steps, login, OTP.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RehearsalPlan {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub otp: Option<String>,

    /// Falls back to the engine configuration when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_resend: Option<u32>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<FlowStep>,
}

impl RehearsalPlan {
    pub fn is_empty(&self) -> bool {
        self.phone.is_none() && self.otp.is_none() && self.steps.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rehearsal {
    #[serde(flatten)]
    pub device: Scenario,

    #[serde(default)]
    pub plan: RehearsalPlan,
}

impl Rehearsal {
    pub fn from_yaml(raw: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(raw)
    }

    pub async fn load(path: &Path) -> Result<Self, RehearsalError> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| RehearsalError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_yaml(&raw).map_err(|err| RehearsalError::Parse {
            path: path.to_path_buf(),
            message: err.to_string(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Steps,
    Login,
    Otp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseReport {
    pub phase: Phase,
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<FlowContext>,
}

/// Outcome of one rehearsal on one device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RehearsalReport {
    pub serial: DeviceSerial,
    pub success: bool,
    pub phases: Vec<PhaseReport>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RehearsalReport {
    pub fn new(serial: DeviceSerial) -> Self {
        Self {
            serial,
            success: false,
            phases: Vec::new(),
            error: None,
        }
    }

    fn record(&mut self, phase: Phase, success: bool, context: Option<FlowContext>) {
        self.phases.push(PhaseReport {
            phase,
            success,
            context,
        });
        self.success = self.phases.iter().all(|p| p.success);
    }

    /// Mark the rehearsal as aborted by `error`.
    pub fn fail(&mut self, error: impl Into<String>) {
        self.success = false;
        self.error = Some(error.into());
    }
}

/// Run every flow of `plan` on `engine`, stopping at the first failure.
pub async fn rehearse(
    engine: &FlowEngine,
    plan: &RehearsalPlan,
    report: &mut RehearsalReport,
) -> Result<(), FlowError> {
    let serial = engine.serial().clone();

    // 1. Free-form steps
    if !plan.steps.is_empty() {
        let ok = engine.run_steps(&plan.steps).await?;
        report.record(Phase::Steps, ok, engine.last_context());
        if !ok {
            warn!(%serial, "Step sequence failed");
            return Ok(());
        }
    }

    // 2. Login
    if let Some(phone) = &plan.phone {
        let ok = engine.run_login_flow(phone).await?;
        report.record(Phase::Login, ok, engine.last_context());
        if !ok {
            warn!(%serial, "Login flow failed");
            return Ok(());
        }
    }

    // 3. OTP
    if let Some(code) = &plan.otp {
        let max_resend = plan.max_resend.unwrap_or(engine.config().max_resend);
        let ok = engine.run_otp_flow(code, max_resend).await?;
        report.record(Phase::Otp, ok, engine.last_context());
        if !ok {
            warn!(%serial, "OTP flow failed");
            return Ok(());
        }
    }

    info!(%serial, phases = report.phases.len(), "Rehearsal finished");
    Ok(())
}
