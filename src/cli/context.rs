use std::path::{Path, PathBuf};
use std::sync::Arc;

use action_flow::EngineConfig;

use super::output::OutputFormat;

pub struct CliContext {
    config: Arc<EngineConfig>,
    config_path: PathBuf,
    output: OutputFormat,
}

impl CliContext {
    pub fn new(config: EngineConfig, config_path: PathBuf, output: OutputFormat) -> Self {
        Self {
            config: Arc::new(config),
            config_path,
            output,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        self.config.as_ref()
    }

    /// Shared handle for engines that outlive the borrow
    pub fn shared_config(&self) -> Arc<EngineConfig> {
        Arc::clone(&self.config)
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn output(&self) -> OutputFormat {
        self.output
    }
}
