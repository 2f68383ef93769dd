pub mod app;
pub mod batch;
pub mod commands;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod env;
pub mod output;
pub mod popups;
pub mod rehearse;
pub mod runtime;

pub use batch::{cmd_batch, BatchArgs};
pub use config::{cmd_config, ConfigArgs};
pub use popups::{cmd_popups, PopupsArgs};
pub use rehearse::{cmd_rehearse, RehearseArgs};
