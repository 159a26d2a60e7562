//! Load session bookkeeping: tokens, phases, caller hooks and outcomes.

use std::sync::Arc;

use tokio::sync::{oneshot, watch};

use crate::builder::Asset;
use crate::error::LoadError;

/// Identifies one load attempt. Later attempts always carry larger tokens.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionToken(pub(crate) u64);

impl SessionToken {
    /// Raw token value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Controller lifecycle phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadPhase {
    /// Nothing loading.
    Idle,
    /// Transferring and decoding the file.
    Loading,
    /// Heavy decode of a large payload.
    Decoding,
    /// Building the detail tiers.
    Building,
    /// Replacing duplicate meshes with instances.
    Instancing,
    /// The last load finished.
    Ready,
    /// The last load failed. Followed by `Idle`.
    Error,
    /// An in-flight load was replaced by a newer one.
    Superseded,
}

impl LoadPhase {
    /// Whether a session is mid-pipeline.
    pub fn is_in_flight(self) -> bool {
        matches!(
            self,
            Self::Loading | Self::Decoding | Self::Building | Self::Instancing
        )
    }
}

/// Observable controller phase backed by a [`watch`] channel.
pub struct LoadStateWatch {
    tx: watch::Sender<LoadPhase>,
    rx: watch::Receiver<LoadPhase>,
}

impl Default for LoadStateWatch {
    fn default() -> Self {
        Self::new()
    }
}

impl LoadStateWatch {
    /// Create a watch initialized to [`LoadPhase::Idle`].
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(LoadPhase::Idle);
        Self { tx, rx }
    }

    /// Set the phase, notifying all subscribers.
    pub fn set(&self, phase: LoadPhase) {
        let _ = self.tx.send(phase);
    }

    /// Return a new subscriber receiver.
    pub fn subscribe(&self) -> watch::Receiver<LoadPhase> {
        self.rx.clone()
    }

    /// Current phase without blocking.
    pub fn current(&self) -> LoadPhase {
        *self.rx.borrow()
    }
}

type ProgressFn = Box<dyn Fn(u8) + Send + Sync>;
type HookFn = Box<dyn Fn() + Send + Sync>;
type HeavyFn = Box<dyn Fn(bool) + Send + Sync>;

/// Caller hooks for one load.
///
/// Hooks run synchronously on pipeline threads and must not call back into
/// the controller.
#[derive(Default)]
pub struct LoadCallbacks {
    on_progress: Option<ProgressFn>,
    on_load_start: Option<HookFn>,
    on_load_end: Option<HookFn>,
    on_heavy_decode: Option<HeavyFn>,
}

impl LoadCallbacks {
    /// No hooks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Progress in percent, monotonic, 100 reported once.
    pub fn on_progress(mut self, f: impl Fn(u8) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Box::new(f));
        self
    }

    /// Called once the load is accepted.
    pub fn on_load_start(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_load_start = Some(Box::new(f));
        self
    }

    /// Called exactly once per accepted load, whatever the outcome.
    pub fn on_load_end(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_load_end = Some(Box::new(f));
        self
    }

    /// Called when heavy decoding engages or ends.
    pub fn on_heavy_decode(mut self, f: impl Fn(bool) + Send + Sync + 'static) -> Self {
        self.on_heavy_decode = Some(Box::new(f));
        self
    }

    pub(crate) fn progress(&self, value: u8) {
        if let Some(f) = &self.on_progress {
            f(value);
        }
    }

    pub(crate) fn load_start(&self) {
        if let Some(f) = &self.on_load_start {
            f();
        }
    }

    pub(crate) fn heavy_decode(&self, engaged: bool) {
        if let Some(f) = &self.on_heavy_decode {
            f(engaged);
        }
    }
}

/// Fires `on_load_end` when dropped, so it runs once even if the pipeline
/// task is aborted.
pub(crate) struct LoadEndGuard(pub(crate) Arc<LoadCallbacks>);

impl Drop for LoadEndGuard {
    fn drop(&mut self) {
        if let Some(f) = &self.0.on_load_end {
            f();
        }
    }
}

/// What a finished load produced.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AssetSummary {
    /// Roots and switch distances.
    pub asset: Asset,
    /// Mesh nodes under the high-detail root after instancing.
    pub meshes: usize,
    /// Instance nodes under the high-detail root.
    pub instances: usize,
    /// Mesh nodes under the low-detail root.
    pub low_meshes: usize,
    /// Duplicate groups replaced by instances.
    pub instance_groups: usize,
    /// Duplicate groups left alone for lack of geometry or material.
    pub skipped_groups: usize,
}

/// How a load attempt ended.
#[derive(Debug)]
pub enum LoadOutcome {
    /// The asset is in the scene.
    Ready(AssetSummary),
    /// The load failed and its partial state was removed.
    Failed(LoadError),
    /// A newer load replaced this one.
    Superseded,
}

/// Handle to an accepted load.
///
/// Dropping it does not cancel the load.
#[derive(Debug)]
pub struct LoadHandle {
    token: SessionToken,
    outcome: oneshot::Receiver<LoadOutcome>,
}

impl LoadHandle {
    pub(crate) fn new(token: SessionToken, outcome: oneshot::Receiver<LoadOutcome>) -> Self {
        Self { token, outcome }
    }

    /// Token of this attempt.
    pub fn token(&self) -> SessionToken {
        self.token
    }

    /// Wait for the attempt to end.
    pub async fn outcome(self) -> LoadOutcome {
        // A pipeline that vanished without reporting was torn down with its runtime.
        self.outcome.await.unwrap_or(LoadOutcome::Superseded)
    }
}
