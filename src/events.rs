//! Event Timing Resolver: named interval durations from checkpoint events.
//!
//! The vehicle traverses five hills in sequence; each interval is defined
//! by two (kind, tag) anchors and is reported only when both anchors occur
//! exactly once in the run's event set. Zero or multiple occurrences leave
//! the interval unset. Negative durations are passed through untouched;
//! timestamp consistency is the caller's data-quality concern.

use serde::{Deserialize, Serialize};

use crate::types::{Event, EventKind};

/// The single occurrence of an event matching `pred`, or `None` when the
/// set holds zero or more than one match.
pub fn exactly_one<'a, P>(events: &'a [Event], pred: P) -> Option<&'a Event>
where
    P: Fn(&Event) -> bool,
{
    let mut it = events.iter().filter(|e| pred(e));
    match (it.next(), it.next()) {
        (Some(event), None) => Some(event),
        _ => None,
    }
}

/// Timestamp of the single event with this kind and tag, if unambiguous.
pub fn single_timestamp(events: &[Event], kind: EventKind, tag: Option<&str>) -> Option<i64> {
    exactly_one(events, |e| e.kind == kind && e.tag.as_deref() == tag).map(|e| e.timestamp_ms)
}

fn hill_start(events: &[Event], number: u8) -> Option<i64> {
    let tag = number.to_string();
    single_timestamp(events, EventKind::HillStart, Some(&tag))
}

/// Signed millisecond durations between checkpoint anchors. Every field is
/// optional: an unset field means "not computable from this event set".
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventIntervals {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hill1: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hill2: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub freeroll: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hill3: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hill4: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hill5: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course_total: Option<i64>,
}

impl EventIntervals {
    /// Hill traversal time by hill number (1..=5), for tabular export.
    pub fn hill_time(&self, number: u8) -> Option<i64> {
        match number {
            1 => self.hill1,
            2 => self.hill2,
            3 => self.hill3,
            4 => self.hill4,
            5 => self.hill5,
            _ => None,
        }
    }
}

/// Resolve all named intervals for one run's event set.
pub fn resolve_event_intervals(events: &[Event]) -> EventIntervals {
    let roll_start = single_timestamp(events, EventKind::RollStart, None);
    let freeroll_start = single_timestamp(events, EventKind::FreerollStart, None);
    let roll_end = single_timestamp(events, EventKind::RollEnd, None);
    let hills: Vec<Option<i64>> = (1..=5).map(|n| hill_start(events, n)).collect();

    let diff = |end: Option<i64>, start: Option<i64>| Some(end? - start?);

    EventIntervals {
        hill1: diff(hills[1], hills[0]),
        hill2: diff(freeroll_start, hills[1]),
        freeroll: diff(hills[2], freeroll_start),
        hill3: diff(hills[3], hills[2]),
        hill4: diff(hills[4], hills[3]),
        hill5: diff(roll_end, hills[4]),
        course_total: diff(roll_end, roll_start),
    }
}
