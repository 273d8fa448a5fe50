//! # Launch Gate Module
//!
//! The state machine separating "armed but on the pad" from "in flight".
//!
//! Pre-launch telemetry must report calibrated noise around rest rather
//! than extrapolating the trajectory formulas to negative time, so elapsed
//! flight time is gated in one place and the trajectory model stays pure.
//! The launch-trigger handler and the query handler run on independent
//! contexts; the single mutable field lives behind a mutex so both observe
//! a consistent snapshot.

use std::sync::{Mutex, PoisonError};
use std::time::Instant;

/// Irreversible Unarmed -> Armed(t0) launch state.
///
/// Owned by the request server and shared by reference with the
/// launch-trigger handler; there is no disarm for the process lifetime.
#[derive(Debug, Default)]
pub struct LaunchGate {
    armed_at: Mutex<Option<Instant>>,
}

impl LaunchGate {
    /// New gate in the Unarmed state
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the gate at `now`.
    ///
    /// The first call records `now` as the launch instant and returns
    /// true. Every later call is a no-op returning false; t0 is never
    /// reset.
    pub fn arm(&self, now: Instant) -> bool {
        let mut armed_at = self.lock();
        if armed_at.is_some() {
            return false;
        }
        *armed_at = Some(now);
        true
    }

    /// Whether the gate has been armed
    pub fn is_armed(&self) -> bool {
        self.lock().is_some()
    }

    /// Elapsed flight time at `now`, in seconds.
    ///
    /// Returns 0.0 while Unarmed. Once Armed, returns `now - t0`,
    /// saturating at zero for clock instants that predate t0.
    pub fn elapsed(&self, now: Instant) -> f64 {
        match *self.lock() {
            Some(t0) => now.saturating_duration_since(t0).as_secs_f64(),
            None => 0.0,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Instant>> {
        self.armed_at.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_unarmed_elapsed_is_zero_for_any_now() {
        let gate = LaunchGate::new();
        assert!(!gate.is_armed());

        assert_eq!(gate.elapsed(Instant::now()), 0.0);
        assert_eq!(gate.elapsed(Instant::now() + Duration::from_secs(3600)), 0.0);
    }

    #[test]
    fn test_elapsed_measures_from_the_arm_instant() {
        let gate = LaunchGate::new();
        let t0 = Instant::now();

        assert!(gate.arm(t0));
        assert!(gate.is_armed());

        let elapsed = gate.elapsed(t0 + Duration::from_millis(2540));
        assert!((elapsed - 2.54).abs() < 1e-9);
    }

    #[test]
    fn test_second_arm_does_not_reset_t0() {
        let gate = LaunchGate::new();
        let t0 = Instant::now();

        assert!(gate.arm(t0));
        assert!(!gate.arm(t0 + Duration::from_secs(5)));

        // Elapsed still measured from the first arm
        let elapsed = gate.elapsed(t0 + Duration::from_secs(10));
        assert!((elapsed - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_elapsed_saturates_before_t0() {
        let gate = LaunchGate::new();
        let t0 = Instant::now() + Duration::from_secs(10);

        gate.arm(t0);
        assert_eq!(gate.elapsed(Instant::now()), 0.0);
    }

    #[test]
    fn test_concurrent_arms_transition_exactly_once() {
        let gate = Arc::new(LaunchGate::new());
        let now = Instant::now();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let gate = Arc::clone(&gate);
                std::thread::spawn(move || gate.arm(now + Duration::from_millis(i)))
            })
            .collect();

        let transitions = handles
            .into_iter()
            .map(|h| h.join())
            .filter(|r| matches!(r, Ok(true)))
            .count();
        assert_eq!(transitions, 1);
        assert!(gate.is_armed());
    }
}
