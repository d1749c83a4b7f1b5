//! Interval statistics for periodic events (one mark per rendered block).

use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Summary of the intervals seen since the last read.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PeriodStats {
    pub min_ms: f64,
    pub max_ms: f64,
    pub avg_ms: f64,
    pub count: u32,
}

#[derive(Default)]
struct PeriodState {
    last: Option<Instant>,
    min: Option<Duration>,
    max: Duration,
    total: Duration,
    count: u32,
}

/// Records the time between successive [`PeriodTimer::mark`] calls.
#[derive(Default)]
pub struct PeriodTimer {
    state: Mutex<PeriodState>,
}

impl PeriodTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an event now.
    pub fn mark(&self) {
        self.mark_at(Instant::now());
    }

    /// Record an event at a given instant. The first mark only sets the
    /// reference point.
    pub fn mark_at(&self, now: Instant) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(last) = state.last {
            let period = now.saturating_duration_since(last);
            state.min = Some(state.min.map_or(period, |m| m.min(period)));
            state.max = state.max.max(period);
            state.total += period;
            state.count += 1;
        }
        state.last = Some(now);
    }

    /// Return the statistics gathered so far and start a fresh window.
    /// The last mark is kept so the next interval is still measured.
    pub fn take_stats(&self) -> PeriodStats {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let stats = if state.count == 0 {
            PeriodStats::default()
        } else {
            PeriodStats {
                min_ms: as_ms(state.min.unwrap_or_default()),
                max_ms: as_ms(state.max),
                avg_ms: as_ms(state.total) / state.count as f64,
                count: state.count,
            }
        };
        *state = PeriodState {
            last: state.last,
            ..PeriodState::default()
        };
        stats
    }
}

fn as_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}
