//! Heavy-decode gating and two-phase progress blending.
//!
//! When the heavy decoder engages, transfer progress fills `[0, 50]` and the
//! decode phase fills `[50, 100]` through synthetic ticks. Otherwise transfer
//! maps straight onto `[0, 100]`. Everything below completion is capped at 99
//! so that 100 is reported once, when the session is done.

use std::time::Duration;

use tokio::task::JoinHandle;

/// Default size above which the heavy decoder engages: 100 MiB.
pub const DEFAULT_HEAVY_THRESHOLD: u64 = 100 * 1024 * 1024;

/// Share of the progress bar given to transfer when decoding is engaged.
const ENGAGED_TRANSFER_SHARE: f32 = 50.0;

/// Highest value reported before completion.
const PRE_COMPLETE_CAP: u8 = 99;

/// Whether a file of `file_size` bytes needs the heavy decoder.
///
/// Strictly greater: a file exactly at the threshold is decoded normally.
pub fn should_engage(file_size: u64, threshold: u64) -> bool {
    file_size > threshold
}

/// Monotonic progress for one load session.
///
/// Every method returns `Some(value)` only when the reported value actually
/// moves forward, so callers can forward it without further filtering.
#[derive(Debug)]
pub struct ProgressTracker {
    engaged: bool,
    reported: u8,
    completed: bool,
}

impl ProgressTracker {
    /// Start at zero. `engaged` selects the two-phase blend.
    pub fn new(engaged: bool) -> Self {
        Self {
            engaged,
            reported: 0,
            completed: false,
        }
    }

    /// Last reported value.
    pub fn current(&self) -> u8 {
        self.reported
    }

    /// Whether 100 has been reported.
    pub fn is_complete(&self) -> bool {
        self.completed
    }

    fn advance(&mut self, value: u8) -> Option<u8> {
        if self.completed {
            return None;
        }
        let value = value.min(PRE_COMPLETE_CAP);
        if value > self.reported {
            self.reported = value;
            Some(value)
        } else {
            None
        }
    }

    /// Report transfer progress as a fraction in `[0, 1]`.
    pub fn transfer(&mut self, fraction: f32) -> Option<u8> {
        let fraction = if fraction.is_nan() {
            0.0
        } else {
            fraction.clamp(0.0, 1.0)
        };
        let span = if self.engaged {
            ENGAGED_TRANSFER_SHARE
        } else {
            100.0
        };
        self.advance((fraction * span).floor() as u8)
    }

    /// Transfer finished. With the blend engaged this lands exactly on 50.
    pub fn transfer_complete(&mut self) -> Option<u8> {
        self.transfer(1.0)
    }

    /// One synthetic decode tick of `step` points. Ignored unless engaged
    /// and the transfer phase is over.
    pub fn tick(&mut self, step: u8) -> Option<u8> {
        if !self.engaged || f32::from(self.reported) < ENGAGED_TRANSFER_SHARE {
            return None;
        }
        self.advance(self.reported.saturating_add(step))
    }

    /// Finish the session. Returns `Some(100)` the first time only.
    pub fn complete(&mut self) -> Option<u8> {
        if self.completed {
            return None;
        }
        self.completed = true;
        self.reported = 100;
        Some(100)
    }
}

/// Periodic task driving synthetic decode progress.
///
/// The task stops when the callback returns `false` and is aborted when the
/// ticker is dropped, so it never outlives the session that owns it.
pub struct DecodeTicker {
    handle: JoinHandle<()>,
}

impl DecodeTicker {
    /// Call `on_tick` every `period` until it returns `false`.
    pub fn spawn<F>(period: Duration, mut on_tick: F) -> Self
    where
        F: FnMut() -> bool + Send + 'static,
    {
        let period = period.max(Duration::from_millis(1));
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // The first tick completes immediately.
            interval.tick().await;
            loop {
                interval.tick().await;
                if !on_tick() {
                    break;
                }
            }
        });
        Self { handle }
    }

    /// Whether the task has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for DecodeTicker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
