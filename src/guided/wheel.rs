//! The six-step change process ("wheel") specialization.
//!
//! Six ordered spokes plus a recurring rim check-in. The rim becomes
//! reachable only once all six spokes are filled and the user has explicitly
//! promoted the session past ready; check-ins then recur on a plain
//! day-interval schedule with no calendar-aware adjustment.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub const SPOKE_COUNT: usize = 6;

/// Default days between rim check-ins.
pub const DEFAULT_RIM_INTERVAL_DAYS: i64 = 14;

/// Wheel-specific state carried alongside a change-process session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WheelState {
    /// Monotonic count of completed rim check-ins.
    pub rim_count: u32,
    pub next_rim_date: Option<NaiveDate>,
    /// Set only by explicit user promotion, never automatically.
    pub ready: bool,
}

impl WheelState {
    pub fn new() -> Self {
        Self {
            rim_count: 0,
            next_rim_date: None,
            ready: false,
        }
    }

    /// Whether the recurring check-in sub-process is reachable.
    pub fn rim_open(&self, all_spokes_filled: bool) -> bool {
        self.ready && all_spokes_filled
    }

    /// Record one completed check-in and schedule the next.
    pub fn record_checkin(&mut self, checkin_date: NaiveDate, interval_days: i64) {
        self.rim_count += 1;
        self.next_rim_date = Some(next_rim_date(checkin_date, interval_days));
    }
}

impl Default for WheelState {
    fn default() -> Self {
        Self::new()
    }
}

pub fn spoke_key(n: usize) -> String {
    format!("spoke_{}", n)
}

/// All six spoke slots are non-empty.
pub fn all_spokes_filled(step_data: &BTreeMap<String, Value>) -> bool {
    (1..=SPOKE_COUNT).all(|n| step_data.contains_key(&spoke_key(n)))
}

/// Plain forward date arithmetic; month-end and DST concerns are
/// intentionally out of scope.
pub fn next_rim_date(checkin_date: NaiveDate, interval_days: i64) -> NaiveDate {
    checkin_date + Duration::days(interval_days)
}
