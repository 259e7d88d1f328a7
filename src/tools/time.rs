//! Current time lookup

use async_trait::async_trait;
use chrono::{DateTime, Local, TimeZone};

use super::Tool;
use crate::Result;

/// Reports the local time and date
#[derive(Debug, Clone, Copy, Default)]
pub struct CurrentTime;

impl CurrentTime {
    /// Format a timestamp the way it is read back to the user
    #[must_use]
    pub fn describe<Tz: TimeZone>(now: &DateTime<Tz>) -> String
    where
        Tz::Offset: std::fmt::Display,
    {
        now.format("%-I:%M %p on %A, %B %-d, %Y").to_string()
    }
}

#[async_trait]
impl Tool for CurrentTime {
    fn name(&self) -> &'static str {
        "get_time"
    }

    fn description(&self) -> &'static str {
        "Get the current local time and date"
    }

    async fn call(&self, _arguments: serde_json::Value) -> Result<String> {
        Ok(Self::describe(&Local::now()))
    }
}
