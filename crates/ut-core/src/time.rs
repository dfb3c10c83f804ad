//! Simulation time model.
//!
//! # Design
//!
//! The host drives the traffic system with variable physics steps (`dt`
//! seconds).  Population management runs on a slower fixed cadence: a
//! *control tick* fires every `control_interval_secs` of accumulated time.
//! `SimClock` tracks both the elapsed seconds and the integer `Tick` count of
//! control ticks fired so far.

use std::fmt;

// ── Tick ──────────────────────────────────────────────────────────────────────

/// Count of control ticks fired since the clock started.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tick(pub u64);

impl Tick {
    pub const ZERO: Tick = Tick(0);

    #[inline]
    pub fn next(self) -> Tick {
        Tick(self.0 + 1)
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

// ── SimClock ──────────────────────────────────────────────────────────────────

/// Accumulates physics time and reports when a control tick is due.
#[derive(Clone, Debug)]
pub struct SimClock {
    /// Seconds between control ticks.  Default: 2.
    pub control_interval_secs: f32,
    /// Control ticks fired so far.
    pub current_tick: Tick,
    elapsed_secs: f64,
    since_control: f32,
}

impl SimClock {
    pub fn new(control_interval_secs: f32) -> Self {
        Self {
            control_interval_secs,
            current_tick: Tick::ZERO,
            elapsed_secs: 0.0,
            since_control: 0.0,
        }
    }

    /// Add `dt` seconds of physics time.
    ///
    /// Returns `true` when a control tick fires during this step.  At most one
    /// control tick fires per call; a long step does not queue a backlog.
    pub fn advance(&mut self, dt: f32) -> bool {
        let dt = dt.max(0.0);
        self.elapsed_secs += dt as f64;
        self.since_control += dt;
        if self.since_control >= self.control_interval_secs {
            self.since_control = 0.0;
            self.current_tick = self.current_tick.next();
            true
        } else {
            false
        }
    }

    /// Physics seconds accumulated since the clock started.
    #[inline]
    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed_secs
    }
}

impl fmt::Display for SimClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:.1} s)", self.current_tick, self.elapsed_secs)
    }
}
