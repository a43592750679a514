pub mod config;
pub mod dispatch;
pub mod error;
pub mod logging;
pub mod policy;
pub mod provider;
pub mod sweep;

pub use config::Config;
pub use dispatch::{Outcome, RetentionEvent, Trigger, dispatch};
pub use error::RetentionError;
pub use logging::set_up_logger;
pub use policy::{Action, decide};
pub use provider::{CloudWatchLogs, LogGroupPage, LogGroupProvider, LogGroupRecord};
pub use sweep::{SweepReport, sweep};

pub const APP_NAME: &str = "log_retention_default";
