//! Masking control plane: swaps snapshots and keeps the rule artifact in step.

use arc_swap::ArcSwap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::artifact::{RuleArtifact, SyncReport};
use crate::config::{validate_paths, ProxyConfig, ValidationError};
use crate::masking::paths::{PathConfig, RawPaths};
use crate::masking::snapshot::MaskSnapshot;

/// Owner of the live masking snapshot.
///
/// Readers call [`snapshot`](Self::snapshot) once per request. Writers
/// (hot reload, admin saves) build a complete new snapshot, swap it in, then
/// regenerate the rule artifact. Writers in this process are serialized by
/// the artifact lock; writers in other processes are not (see `artifact::sync`).
pub struct MaskControl {
    current: ArcSwap<MaskSnapshot>,
    generation: AtomicU64,
    artifact: Mutex<Option<RuleArtifact>>,
    remove_on_shutdown: AtomicBool,
}

impl MaskControl {
    pub fn new(config: &ProxyConfig) -> Self {
        Self {
            current: ArcSwap::from_pointee(MaskSnapshot::from_config(config, 1)),
            generation: AtomicU64::new(1),
            artifact: Mutex::new(artifact_from_config(config)),
            remove_on_shutdown: AtomicBool::new(config.artifact.remove_on_shutdown),
        }
    }

    /// Current snapshot. Hold on to it for the whole request.
    pub fn snapshot(&self) -> Arc<MaskSnapshot> {
        self.current.load_full()
    }

    pub fn artifact(&self) -> Option<RuleArtifact> {
        self.artifact
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether the live configuration asks for the block to be stripped on exit.
    pub fn remove_on_shutdown(&self) -> bool {
        self.remove_on_shutdown.load(Ordering::SeqCst)
    }

    /// Write the current snapshot's block to the artifact (activation).
    pub fn activate(&self) -> Option<SyncReport> {
        let artifact = self.artifact.lock().unwrap_or_else(PoisonError::into_inner);
        let snapshot = self.snapshot();
        artifact
            .as_ref()
            .and_then(|a| a.sync_or_warn(snapshot.paths(), snapshot.layout()))
    }

    /// Strip the block from the artifact (deactivation).
    pub fn deactivate(&self) -> Option<SyncReport> {
        let artifact = self.artifact.lock().unwrap_or_else(PoisonError::into_inner);
        artifact.as_ref().and_then(|a| a.teardown_or_warn())
    }

    /// Apply a freshly loaded configuration file.
    pub fn reload(&self, config: &ProxyConfig) -> Arc<MaskSnapshot> {
        let mut artifact = self.artifact.lock().unwrap_or_else(PoisonError::into_inner);

        let next = Arc::new(MaskSnapshot::from_config(config, self.next_generation()));
        self.current.store(Arc::clone(&next));

        let configured = artifact_from_config(config);
        if let Some(old) = artifact.as_ref().filter(|old| configured.as_ref() != Some(*old)) {
            tracing::info!(path = %old.path().display(), "Rule artifact location changed, removing old block");
            old.teardown_or_warn();
        }
        *artifact = configured;
        self.remove_on_shutdown
            .store(config.artifact.remove_on_shutdown, Ordering::SeqCst);
        if let Some(a) = artifact.as_ref() {
            a.sync_or_warn(next.paths(), next.layout());
        }

        tracing::info!(generation = next.generation(), "Masking configuration reloaded");
        next
    }

    /// Settings-save entry point: re-sanitize raw segments, reject collisions,
    /// swap the snapshot and regenerate the artifact.
    pub fn save_paths(&self, raw: &RawPaths) -> Result<Arc<MaskSnapshot>, Vec<ValidationError>> {
        let artifact = self.artifact.lock().unwrap_or_else(PoisonError::into_inner);
        let current = self.snapshot();

        let paths = PathConfig::sanitize(raw, current.policy());
        validate_paths(&paths, current.layout())?;

        if &paths == current.paths() {
            return Ok(current);
        }

        let next = Arc::new(current.with_paths(paths, self.next_generation()));
        self.current.store(Arc::clone(&next));

        if let Some(a) = artifact.as_ref() {
            a.sync_or_warn(next.paths(), next.layout());
        }

        tracing::info!(generation = next.generation(), paths = ?next.paths(), "Path masks saved");
        Ok(next)
    }

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }
}

fn artifact_from_config(config: &ProxyConfig) -> Option<RuleArtifact> {
    config
        .artifact
        .path
        .as_ref()
        .map(|path| RuleArtifact::new(path, config.artifact.marker.clone()))
}
