//! Load orchestration: teardown, decode, merge, build, instance.
//!
//! One session is active at a time. Starting a load bumps the session token
//! before touching the scene; every later step of the pipeline re-checks its
//! token under the token lock and becomes a no-op once a newer load exists.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard};
use std::time::Duration;

use photon_config::{Config, LoaderConfig};
use photon_lod::{DetailTier, LodSelector};
use photon_scene::{LodVisibility, NodeHandle, Scene, SceneError};

use crate::builder::{Asset, HIGH_ROOT, LOW_ROOT, ModelBuilder, import_decoded};
use crate::chunk::split_chunks;
use crate::decoders::BuiltinDecoder;
use crate::error::{DecodeError, LoadError};
use crate::format::{AssetFormat, Decoded, DecodedScene, EmbeddedPayload, FormatDecoder};
use crate::gate::{DecodeTicker, ProgressTracker, should_engage};
use crate::heavy::{HeavyDecoder, Lz4HeavyDecoder};
use crate::instancing::{INSTANCE_SUFFIX, MeshDescriptor, apply_instancing, detect_instances};
use crate::session::{
    AssetSummary, LoadCallbacks, LoadEndGuard, LoadHandle, LoadOutcome, LoadPhase,
    LoadStateWatch, SessionToken,
};

/// File bytes handed to [`AssetLoadController::load`].
#[derive(Clone, Debug)]
pub struct RawAsset {
    /// File contents.
    pub bytes: Vec<u8>,
    /// File extension, with or without the leading dot.
    pub extension: String,
    /// Size of the source file in bytes.
    pub size: u64,
}

impl RawAsset {
    /// Wrap in-memory bytes.
    pub fn new(bytes: Vec<u8>, extension: impl Into<String>) -> Self {
        Self {
            size: bytes.len() as u64,
            bytes,
            extension: extension.into(),
        }
    }

    /// Read a file, taking the format from its extension.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self::new(bytes, extension))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

/// Why a session stopped early.
enum Abort {
    Superseded,
    Failed(LoadError),
}

impl From<LoadError> for Abort {
    fn from(e: LoadError) -> Self {
        Self::Failed(e)
    }
}

impl From<DecodeError> for Abort {
    fn from(e: DecodeError) -> Self {
        Self::Failed(e.into())
    }
}

impl From<SceneError> for Abort {
    fn from(e: SceneError) -> Self {
        Self::Failed(e.into())
    }
}

impl From<photon_config::ConfigError> for Abort {
    fn from(e: photon_config::ConfigError) -> Self {
        Self::Failed(e.into())
    }
}

fn worker_error(e: tokio::task::JoinError) -> Abort {
    Abort::Failed(DecodeError::Worker(e.to_string()).into())
}

/// Scene plus the asset currently shown in it.
struct Stage {
    scene: Scene,
    asset: Option<Asset>,
    lod_override: Option<DetailTier>,
}

/// State of one accepted load.
struct Session {
    token: SessionToken,
    format: AssetFormat,
    engaged: bool,
    callbacks: Arc<LoadCallbacks>,
    progress: Mutex<ProgressTracker>,
}

struct Inner {
    loader: LoaderConfig,
    builder: ModelBuilder,
    selector: LodSelector,
    decoder: Arc<dyn FormatDecoder>,
    heavy: Arc<dyn HeavyDecoder>,
    current: RwLock<u64>,
    stage: Mutex<Stage>,
    state: LoadStateWatch,
}

/// Loads asset files into a scene, one session at a time.
///
/// Cloning yields another handle to the same controller.
#[derive(Clone)]
pub struct AssetLoadController {
    inner: Arc<Inner>,
}

impl AssetLoadController {
    /// Controller with the built-in decoders.
    pub fn new(config: &Config) -> Result<Self, LoadError> {
        Self::with_decoders(
            config,
            Arc::new(BuiltinDecoder),
            Arc::new(Lz4HeavyDecoder),
        )
    }

    /// Controller with custom format and heavy decoders.
    pub fn with_decoders(
        config: &Config,
        decoder: Arc<dyn FormatDecoder>,
        heavy: Arc<dyn HeavyDecoder>,
    ) -> Result<Self, LoadError> {
        config.validate()?;
        let builder = ModelBuilder::from_config(&config.lod)?;
        Ok(Self {
            inner: Arc::new(Inner {
                loader: config.loader.clone(),
                selector: LodSelector::new(builder.distances()),
                builder,
                decoder,
                heavy,
                current: RwLock::new(0),
                stage: Mutex::new(Stage {
                    scene: Scene::new(),
                    asset: None,
                    lod_override: None,
                }),
                state: LoadStateWatch::new(),
            }),
        })
    }

    /// Start loading `asset`.
    ///
    /// Format validation happens here: an unsupported extension is rejected
    /// before anything is torn down and no hook runs. Otherwise any earlier
    /// session is invalidated, the previous asset is disposed, and the
    /// pipeline continues on the current Tokio runtime.
    pub fn load(&self, asset: RawAsset, callbacks: LoadCallbacks) -> Result<LoadHandle, LoadError> {
        let format = AssetFormat::from_extension(&asset.extension)
            .ok_or_else(|| LoadError::UnsupportedFormat(asset.extension.clone()))?;
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| LoadError::NoRuntime)?;

        let token = self.inner.invalidate();
        let removed = self.inner.clear_stage();
        tracing::info!(
            session = %token,
            %format,
            size = asset.size,
            removed,
            "load started"
        );

        self.inner.state.set(LoadPhase::Loading);
        let engaged = should_engage(asset.size, self.inner.loader.heavy_decode_threshold_bytes);
        if engaged {
            self.inner.heavy.configure(&self.inner.loader.heavy_decoder);
            tracing::info!(session = %token, "heavy decode engaged");
        }
        let callbacks = Arc::new(callbacks);
        callbacks.heavy_decode(engaged);
        callbacks.load_start();

        let session = Arc::new(Session {
            token,
            format,
            engaged,
            callbacks,
            progress: Mutex::new(ProgressTracker::new(engaged)),
        });
        let (tx, rx) = tokio::sync::oneshot::channel();
        let inner = Arc::clone(&self.inner);
        runtime.spawn(async move {
            let end = LoadEndGuard(Arc::clone(&session.callbacks));
            let outcome = inner.run(&session, asset.bytes).await;
            drop(end);
            let _ = tx.send(outcome);
        });

        Ok(LoadHandle::new(token, rx))
    }

    /// Dispose everything loaded and invalidate any in-flight session.
    pub fn teardown(&self) -> usize {
        let token = self.inner.invalidate();
        let removed = self.inner.clear_stage();
        self.inner.state.set(LoadPhase::Idle);
        tracing::info!(session = %token, removed, "teardown");
        removed
    }

    /// Show one tier regardless of camera distance, until
    /// [`resume_automatic_lod`](Self::resume_automatic_lod).
    ///
    /// Returns `false` when no asset is loaded.
    pub fn set_active_lod(&self, tier: DetailTier) -> bool {
        let mut stage = lock(&self.inner.stage);
        let Some(asset) = stage.asset else {
            return false;
        };
        stage.lod_override = Some(tier);
        let high = tier.shows_high_detail();
        let result = stage
            .scene
            .set_enabled(asset.high, high)
            .and_then(|()| stage.scene.set_enabled(asset.low, !high));
        if let Err(e) = result {
            tracing::warn!(error = %e, "failed to switch detail tier");
            return false;
        }
        tracing::debug!(?tier, "detail tier forced");
        true
    }

    /// Return to distance-based switching.
    pub fn resume_automatic_lod(&self) {
        lock(&self.inner.stage).lod_override = None;
    }

    /// Tier forced by [`set_active_lod`](Self::set_active_lod), if any.
    pub fn lod_override(&self) -> Option<DetailTier> {
        lock(&self.inner.stage).lod_override
    }

    /// Apply distance-based switching for a camera `distance` away.
    ///
    /// Returns the tier now shown, or `None` with no asset or while a tier
    /// is forced.
    pub fn update_lod(&self, distance: f32) -> Option<DetailTier> {
        let mut stage = lock(&self.inner.stage);
        if stage.lod_override.is_some() {
            return None;
        }
        let asset = stage.asset?;
        match stage.scene.evaluate_lod(asset.high, distance) {
            Ok(LodVisibility::Fallback(_)) => Some(DetailTier::Low),
            Ok(LodVisibility::Base) => Some(self.inner.selector.select_tier(distance)),
            Err(e) => {
                tracing::warn!(error = %e, "LOD evaluation failed");
                None
            }
        }
    }

    /// Current phase.
    pub fn state(&self) -> LoadPhase {
        self.inner.state.current()
    }

    /// Subscribe to phase changes.
    pub fn subscribe(&self) -> tokio::sync::watch::Receiver<LoadPhase> {
        self.inner.state.subscribe()
    }

    /// The asset shown, if a load completed.
    pub fn asset(&self) -> Option<Asset> {
        lock(&self.inner.stage).asset
    }

    /// Token of the newest session.
    pub fn current_token(&self) -> SessionToken {
        SessionToken(*read(&self.inner.current))
    }

    /// Read the scene.
    pub fn inspect<R>(&self, f: impl FnOnce(&Scene) -> R) -> R {
        f(&lock(&self.inner.stage).scene)
    }
}

impl Inner {
    /// Start a new session, invalidating all earlier ones.
    fn invalidate(&self) -> SessionToken {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *current += 1;
        if self.state.current().is_in_flight() {
            self.state.set(LoadPhase::Superseded);
            tracing::info!(session = *current - 1, "load superseded");
        }
        SessionToken(*current)
    }

    fn is_current(&self, token: SessionToken) -> bool {
        *read(&self.current) == token.0
    }

    fn ensure_current(&self, token: SessionToken) -> Result<(), Abort> {
        if self.is_current(token) {
            Ok(())
        } else {
            Err(Abort::Superseded)
        }
    }

    /// Remove every loaded node, staging buffer and unused resource.
    fn clear_stage(&self) -> usize {
        let mut stage = lock(&self.stage);
        stage.asset = None;
        stage.lod_override = None;
        teardown_scene(&mut stage.scene)
    }

    /// Run `f` if `token` is current, keeping it current until `f` returns.
    fn guarded<R>(&self, token: SessionToken, f: impl FnOnce() -> R) -> Result<R, Abort> {
        let current = read(&self.current);
        if *current != token.0 {
            return Err(Abort::Superseded);
        }
        Ok(f())
    }

    /// Run `f` on the stage if `token` is still current.
    ///
    /// Nodes created inside `f` are tagged with the session.
    fn with_stage<R>(
        &self,
        token: SessionToken,
        f: impl FnOnce(&mut Stage) -> R,
    ) -> Result<R, Abort> {
        self.guarded(token, || {
            let mut stage = lock(&self.stage);
            stage.scene.set_origin_tag(Some(token.0));
            let result = f(&mut stage);
            stage.scene.set_origin_tag(None);
            result
        })
    }

    fn with_scene<R>(
        &self,
        token: SessionToken,
        f: impl FnOnce(&mut Scene) -> Result<R, SceneError>,
    ) -> Result<R, Abort> {
        Ok(self.with_stage(token, |stage| f(&mut stage.scene))??)
    }

    fn enter(&self, token: SessionToken, phase: LoadPhase) -> Result<(), Abort> {
        self.guarded(token, || {
            self.state.set(phase);
            tracing::debug!(session = %token, ?phase, "phase");
        })
    }

    /// Advance the session's progress and forward any new value.
    fn report(&self, session: &Session, step: impl FnOnce(&mut ProgressTracker) -> Option<u8>) {
        let _ = self.guarded(session.token, || advance(session, step));
    }

    async fn run(self: &Arc<Self>, session: &Arc<Session>, bytes: Vec<u8>) -> LoadOutcome {
        let token = session.token;
        match self.pipeline(session, bytes).await {
            Ok(summary) => {
                tracing::info!(
                    session = %token,
                    meshes = summary.meshes,
                    instances = summary.instances,
                    low = summary.low_meshes,
                    "load ready"
                );
                LoadOutcome::Ready(summary)
            }
            Err(Abort::Superseded) => {
                tracing::debug!(session = %token, "stale session stopped");
                LoadOutcome::Superseded
            }
            Err(Abort::Failed(error)) => {
                tracing::error!(session = %token, %error, "load failed");
                let _ = self.guarded(token, || {
                    let removed = {
                        let mut stage = lock(&self.stage);
                        stage.asset = None;
                        teardown_scene(&mut stage.scene)
                    };
                    tracing::debug!(session = %token, removed, "partial load removed");
                    end_heavy_decode(session);
                    self.state.set(LoadPhase::Error);
                    self.state.set(LoadPhase::Idle);
                });
                LoadOutcome::Failed(error)
            }
        }
    }

    async fn pipeline(
        self: &Arc<Self>,
        session: &Arc<Session>,
        bytes: Vec<u8>,
    ) -> Result<AssetSummary, Abort> {
        let token = session.token;

        let decoded = {
            let inner = Arc::clone(self);
            let reporter = Arc::clone(session);
            let decoder = Arc::clone(&self.decoder);
            let format = session.format;
            tokio::task::spawn_blocking(move || {
                decoder.decode(&bytes, format, &mut |fraction| {
                    inner.report(&reporter, |p| p.transfer(fraction));
                })
            })
            .await
            .map_err(worker_error)??
        };
        self.ensure_current(token)?;
        self.report(session, ProgressTracker::transfer_complete);

        let ticker = if session.engaged {
            self.enter(token, LoadPhase::Decoding)?;
            let inner = Arc::clone(self);
            let ticking = Arc::clone(session);
            let step = self.loader.decode_tick_step;
            Some(DecodeTicker::spawn(
                Duration::from_millis(self.loader.decode_tick_ms),
                move || {
                    inner.report(&ticking, |p| p.tick(step));
                    inner.is_current(ticking.token)
                },
            ))
        } else {
            None
        };

        let decoded = match decoded {
            Decoded::Scene(scene) => scene,
            Decoded::Embedded(payload) => self.merge_payload(session, payload).await?,
        };
        let imported = self.with_scene(token, |scene| import_decoded(scene, decoded))?;

        self.enter(token, LoadPhase::Building)?;
        let asset = self.with_scene(token, |scene| {
            self.builder.build(scene, &imported, session.format.class())
        })?;

        self.enter(token, LoadPhase::Instancing)?;
        let report = self.with_scene(token, |scene| {
            let meshes: Vec<MeshDescriptor> = scene
                .child_meshes(asset.high)
                .into_iter()
                .filter_map(|node| MeshDescriptor::from_node(scene, node))
                .collect();
            let detection = detect_instances(&meshes);
            apply_instancing(scene, &detection.groups)
        })?;

        drop(ticker);
        self.guarded(token, || {
            let summary = {
                let mut stage = lock(&self.stage);
                stage.asset = Some(asset);
                summarize(&stage.scene, asset, report.groups, report.skipped)
            };
            end_heavy_decode(session);
            self.state.set(LoadPhase::Ready);
            advance(session, ProgressTracker::complete);
            summary
        })
    }

    /// Heavy-decode if engaged, then merge the payload chunk by chunk into a
    /// staging buffer of the declared length and assemble it.
    ///
    /// A payload longer than declared fails the merge; a shorter one fails
    /// assembly.
    async fn merge_payload(
        self: &Arc<Self>,
        session: &Session,
        payload: EmbeddedPayload,
    ) -> Result<DecodedScene, Abort> {
        let token = session.token;
        let EmbeddedPayload { bytes, assembler } = payload;
        let expected = assembler.expected_len();

        let bytes = if session.engaged {
            let heavy = Arc::clone(&self.heavy);
            tokio::task::spawn_blocking(move || heavy.decode_payload(&bytes, expected))
                .await
                .map_err(worker_error)??
        } else {
            bytes
        };
        self.ensure_current(token)?;

        let chunks = split_chunks(&bytes, self.loader.chunk_size_bytes)?;
        let buffer = self.with_stage(token, |stage| {
            stage
                .scene
                .create_buffer(format!("payload{token}"), expected)
        })?;
        for (index, chunk) in chunks.iter().enumerate() {
            self.with_scene(token, |scene| scene.append_buffer(buffer, chunk))
                .map_err(|abort| match abort {
                    Abort::Failed(LoadError::Scene(source)) => {
                        Abort::Failed(DecodeError::Merge { index, source }.into())
                    }
                    other => other,
                })?;
            tokio::task::yield_now().await;
        }
        tracing::debug!(session = %token, chunks = chunks.len(), bytes = bytes.len(), "payload merged");

        let merged = self
            .with_stage(token, |stage| stage.scene.release_buffer(buffer))?
            .unwrap_or_default();
        let scene = tokio::task::spawn_blocking(move || assembler.assemble(&merged))
            .await
            .map_err(worker_error)??;
        Ok(scene)
    }
}

/// Forward a progress step. Callers hold the session's token current.
fn advance(session: &Session, step: impl FnOnce(&mut ProgressTracker) -> Option<u8>) {
    let value = step(&mut lock(&session.progress));
    if let Some(value) = value {
        session.callbacks.progress(value);
    }
}

/// Callers hold the session's token current.
fn end_heavy_decode(session: &Session) {
    if session.engaged {
        session.callbacks.heavy_decode(false);
    }
}

/// Dispose loaded roots, leftover instances and nodes of earlier sessions.
fn teardown_scene(scene: &mut Scene) -> usize {
    let mut removed = 0;
    for name in [HIGH_ROOT, LOW_ROOT] {
        while let Some(root) = scene.find_by_name(name) {
            match scene.dispose(root) {
                Ok(count) => removed += count,
                Err(_) => break,
            }
        }
    }
    removed += scene.dispose_where(|n| n.name().ends_with(INSTANCE_SUFFIX) || n.origin().is_some());
    scene.release_all_buffers();
    scene.purge_unused();
    removed
}

fn count_children(scene: &Scene, root: NodeHandle, instances: bool) -> usize {
    scene
        .descendants(root)
        .into_iter()
        .filter(|&h| {
            scene
                .node(h)
                .is_some_and(|n| if instances { n.is_instance() } else { n.is_mesh() })
        })
        .count()
}

fn summarize(scene: &Scene, asset: Asset, groups: usize, skipped: usize) -> AssetSummary {
    AssetSummary {
        asset,
        meshes: count_children(scene, asset.high, false),
        instances: count_children(scene, asset.high, true),
        low_meshes: count_children(scene, asset.low, false),
        instance_groups: groups,
        skipped_groups: skipped,
    }
}
