//! # Recurrence Specifications
//!
//! How often a scheduled job re-submits its inner invocation: an initial
//! delay, an interval between runs, and either a fixed run count or
//! repeat-forever.

use serde::{Deserialize, Serialize};

/// How many times a job runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Repeat {
    /// Re-submit on every tick the interval elapses, indefinitely.
    Forever,
    /// Run exactly this many times, then retire.
    Times(u32),
}

/// A job's recurrence: start delay, interval, and repetition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recurrence {
    /// Seconds before the first run.
    #[serde(default)]
    pub start_delay_secs: i64,
    /// Seconds between runs.
    pub interval_secs: i64,
    /// How many runs.
    pub repeat: Repeat,
}

impl Recurrence {
    /// Run once after a delay.
    pub fn once_after(start_delay_secs: i64) -> Self {
        Self {
            start_delay_secs,
            interval_secs: 0,
            repeat: Repeat::Times(1),
        }
    }

    /// Run forever at an interval, starting one interval from now.
    pub fn every(interval_secs: i64) -> Self {
        Self {
            start_delay_secs: interval_secs,
            interval_secs,
            repeat: Repeat::Forever,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serde_shapes() {
        let json = r#"{"start_delay_secs": 5, "interval_secs": 60, "repeat": "forever"}"#;
        let recurrence: Recurrence = serde_json::from_str(json).unwrap();
        assert_eq!(recurrence.repeat, Repeat::Forever);

        let json = r#"{"interval_secs": 60, "repeat": {"times": 3}}"#;
        let recurrence: Recurrence = serde_json::from_str(json).unwrap();
        assert_eq!(recurrence.start_delay_secs, 0);
        assert_eq!(recurrence.repeat, Repeat::Times(3));
    }
}
