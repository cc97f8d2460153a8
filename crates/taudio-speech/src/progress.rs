//! Simulated progress for phases with no real progress signal.
//!
//! The remote extraction/synthesis calls report nothing until they resolve,
//! so each phase runs a local ticker that walks the document's progress from
//! a phase floor toward a cap strictly below 100. The phase's real
//! completion signal snaps the value to 100; the next phase resets it to its
//! own floor.
//!
//! Two guarantees matter here:
//!
//! 1. The ticker is cancelled on **every** exit path from a phase — success,
//!    failure, fallback — because dropping the [`ProgressTicker`] guard
//!    aborts its task.
//! 2. Each tick captures the phase it was started for and writes through a
//!    replace-by-id update, so even a tick that races a transition can never
//!    touch a later phase's progress.

use std::sync::Arc;
use std::time::Duration;

use taudio_core::DocumentRegistry;
use taudio_core::domain::document::{DocumentId, DocumentStatus};

/// Progress bounds for one phase, in percent.
#[derive(Debug, Clone, Copy)]
pub struct PhaseBounds {
    /// Value the phase starts at.
    pub floor: f32,

    /// Highest value the simulation may reach; always below 100.
    pub cap: f32,
}

/// Estimates phase progress from elapsed time, bounded to `[floor, cap]`.
///
/// Implementations must be monotonic in `elapsed` — tests assert that
/// progress never moves backwards within a phase.
pub trait ProgressEstimator: Send + Sync {
    fn estimate(&self, elapsed: Duration, bounds: PhaseBounds) -> f32;
}

/// Default estimator: a linear ramp that covers the floor→cap span over
/// [`ramp`](Self::ramp), then holds at the cap.
#[derive(Debug, Clone)]
pub struct LinearRamp {
    /// Time to travel from floor to cap.
    pub ramp: Duration,
}

impl Default for LinearRamp {
    fn default() -> Self {
        Self {
            ramp: Duration::from_secs(20),
        }
    }
}

impl ProgressEstimator for LinearRamp {
    fn estimate(&self, elapsed: Duration, bounds: PhaseBounds) -> f32 {
        if bounds.cap <= bounds.floor {
            return bounds.floor;
        }
        let fraction = (elapsed.as_secs_f32() / self.ramp.as_secs_f32()).min(1.0);
        (bounds.cap - bounds.floor).mul_add(fraction, bounds.floor)
    }
}

/// Guard for a running phase ticker.
///
/// Dropping the guard aborts the tick task — this is how every exit path
/// from a phase cancels the simulation without bookkeeping at each site.
pub struct ProgressTicker {
    handle: tokio::task::JoinHandle<()>,
}

impl ProgressTicker {
    /// Start ticking progress for `id` while it remains in `phase`.
    #[must_use]
    pub fn start(
        registry: Arc<DocumentRegistry>,
        id: DocumentId,
        phase: DocumentStatus,
        bounds: PhaseBounds,
        estimator: Arc<dyn ProgressEstimator>,
        interval: Duration,
    ) -> Self {
        let handle = tokio::spawn(async move {
            let started = tokio::time::Instant::now();
            let mut ticks = tokio::time::interval(interval);
            ticks.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            ticks.tick().await; // the interval's immediate first tick

            loop {
                ticks.tick().await;
                let value = estimator.estimate(started.elapsed(), bounds);

                let result = registry
                    .update(id, move |doc| {
                        if doc.status == phase && value > doc.progress {
                            doc.progress = value;
                        }
                    })
                    .await;

                match result {
                    Ok(Some(_)) => {}
                    // Document deleted mid-phase; nothing left to animate.
                    Ok(None) => break,
                    Err(e) => {
                        tracing::debug!(id, error = %e, "progress tick could not be persisted");
                    }
                }
            }
        });

        Self { handle }
    }
}

impl Drop for ProgressTicker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOUNDS: PhaseBounds = PhaseBounds {
        floor: 10.0,
        cap: 97.0,
    };

    #[test]
    fn ramp_starts_at_the_floor() {
        let ramp = LinearRamp::default();
        let v = ramp.estimate(Duration::ZERO, BOUNDS);
        assert!((v - 10.0).abs() < f32::EPSILON);
    }

    #[test]
    fn ramp_is_monotonic_and_capped() {
        let ramp = LinearRamp {
            ramp: Duration::from_secs(10),
        };
        let mut previous = f32::MIN;
        for secs in 0..30 {
            let v = ramp.estimate(Duration::from_secs(secs), BOUNDS);
            assert!(v >= previous);
            assert!(v <= BOUNDS.cap);
            previous = v;
        }
        assert!((ramp.estimate(Duration::from_secs(30), BOUNDS) - BOUNDS.cap).abs() < f32::EPSILON);
    }

    #[test]
    fn degenerate_bounds_hold_at_the_floor() {
        let ramp = LinearRamp::default();
        let bounds = PhaseBounds {
            floor: 50.0,
            cap: 50.0,
        };
        assert!((ramp.estimate(Duration::from_secs(60), bounds) - 50.0).abs() < f32::EPSILON);
    }
}
