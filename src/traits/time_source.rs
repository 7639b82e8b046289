use chrono::{DateTime, Local};

use crate::error::TimeError;

/// Wall-clock provider for the clock renderer
pub trait TimeSource: Send + Sync {
    fn now(&self) -> Result<DateTime<Local>, TimeError>;

    /// Short name for logs
    fn name(&self) -> &str {
        "time source"
    }
}
