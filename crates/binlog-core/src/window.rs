//! Position and time window bounds, and the stop policy built on them.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::types::StreamPosition;

/// Start/stop bounds of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WindowBounds {
    pub start_position: Option<StreamPosition>,
    pub end_position: Option<StreamPosition>,
    /// Mutation events older than this are skipped.
    pub start_time: Option<DateTime<Utc>>,
    /// Wall-clock time after which the run stops.
    pub stop_time: Option<DateTime<Utc>>,
    /// Keep polling an idle stream instead of treating idle as end of log.
    pub stop_never: bool,
}

/// Why the controller stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The next position went past the configured end bound.
    EndPosition(StreamPosition),
    /// The wall clock passed the configured stop time.
    StopTime(DateTime<Utc>),
    /// The stream went idle and no stop condition keeps the run alive.
    EndOfLog,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::EndPosition(pos) => write!(f, "passed end position (next: {pos})"),
            StopReason::StopTime(t) => write!(f, "passed stop time {t}"),
            StopReason::EndOfLog => write!(f, "reached end of log"),
        }
    }
}

impl WindowBounds {
    /// Stop decision after an idle poll.
    pub fn idle_stop(&self, now: DateTime<Utc>) -> Option<StopReason> {
        match self.stop_time {
            Some(stop_time) if now > stop_time => Some(StopReason::StopTime(stop_time)),
            Some(_) => None,
            None if !self.stop_never => Some(StopReason::EndOfLog),
            None => None,
        }
    }

    /// Stop decision from the wall clock alone.
    pub fn time_exceeded(&self, now: DateTime<Utc>) -> Option<StopReason> {
        self.stop_time
            .filter(|stop_time| now > *stop_time)
            .map(StopReason::StopTime)
    }

    /// True when `next` lies strictly beyond the end bound.
    pub fn past_end(&self, next: &StreamPosition) -> bool {
        self.end_position.as_ref().is_some_and(|end| next > end)
    }

    /// True when an event at `timestamp` precedes the start time.
    pub fn before_start(&self, timestamp: DateTime<Utc>) -> bool {
        self.start_time.is_some_and(|start| timestamp < start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_idle_without_stop_conditions_is_end_of_log() {
        let window = WindowBounds::default();
        assert_eq!(window.idle_stop(noon()), Some(StopReason::EndOfLog));
    }

    #[test]
    fn test_idle_with_stop_never_keeps_polling() {
        let window = WindowBounds {
            stop_never: true,
            ..Default::default()
        };
        assert_eq!(window.idle_stop(noon()), None);
    }

    #[test]
    fn test_idle_before_stop_time_keeps_polling() {
        let window = WindowBounds {
            stop_time: Some(noon() + Duration::minutes(5)),
            ..Default::default()
        };
        assert_eq!(window.idle_stop(noon()), None);
    }

    #[test]
    fn test_idle_after_stop_time_stops() {
        let stop = noon() - Duration::seconds(1);
        let window = WindowBounds {
            stop_time: Some(stop),
            stop_never: true,
            ..Default::default()
        };
        assert_eq!(window.idle_stop(noon()), Some(StopReason::StopTime(stop)));
        assert_eq!(window.time_exceeded(noon()), Some(StopReason::StopTime(stop)));
    }

    #[test]
    fn test_stop_time_is_exclusive() {
        let window = WindowBounds {
            stop_time: Some(noon()),
            ..Default::default()
        };
        assert_eq!(window.time_exceeded(noon()), None);
    }

    #[test]
    fn test_past_end_is_strict() {
        let window = WindowBounds {
            end_position: Some(StreamPosition::new("mysql-bin.000002", 500)),
            ..Default::default()
        };

        assert!(!window.past_end(&StreamPosition::new("mysql-bin.000002", 500)));
        assert!(!window.past_end(&StreamPosition::new("mysql-bin.000001", 9000)));
        assert!(window.past_end(&StreamPosition::new("mysql-bin.000002", 501)));
        assert!(window.past_end(&StreamPosition::new("mysql-bin.000003", 4)));
    }

    #[test]
    fn test_no_end_bound_never_past_end() {
        let window = WindowBounds::default();
        assert!(!window.past_end(&StreamPosition::new("mysql-bin.999999", u32::MAX)));
    }

    #[test]
    fn test_before_start() {
        let window = WindowBounds {
            start_time: Some(noon()),
            ..Default::default()
        };
        assert!(window.before_start(noon() - Duration::seconds(1)));
        assert!(!window.before_start(noon()));
        assert!(!WindowBounds::default().before_start(noon()));
    }
}
