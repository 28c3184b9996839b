//! Per-user editing sessions with linear undo/reset history.
//!
//! A [`Session`] holds the uploaded image (`original`), the current result
//! (`working`) and a stack of earlier working images. Mutations push the
//! current working image before replacing it; `undo` pops it back and
//! `reset` returns to the original with an empty history.
//!
//! [`SessionStore`] resolves ids through a [`SessionStorage`] backend and
//! locks one session at a time. Parameters are validated and results
//! computed before anything is committed, so a failed request never leaves a
//! session half-updated.

mod storage;

pub use storage::{InMemoryStorage, SessionHandle, SessionStorage};

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;
use std::sync::{MutexGuard, PoisonError};
use std::time::Instant;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::filters::enhance::EqualizeMode;
use crate::image::Image;
use crate::ops::{Analysis, AnalysisOutput, Mutation, MutationOutput};

/// Opaque session identifier (UUIDv4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        SessionId(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Uuid::parse_str(s).map(SessionId)
    }
}

impl From<Uuid> for SessionId {
    fn from(uuid: Uuid) -> Self {
        SessionId(uuid)
    }
}

// ============================================================================
// Session
// ============================================================================

/// One uploaded image and its edit history.
///
/// `original`, `working` and every history entry share the same height,
/// width and channel count.
pub struct Session {
    id: SessionId,
    original: Image,
    working: Image,
    history: VecDeque<Image>,
    history_limit: Option<usize>,
    rng: StdRng,
}

impl Session {
    pub fn new(id: SessionId, image: Image, history_limit: Option<usize>, rng: StdRng) -> Self {
        Session {
            id,
            original: image.clone(),
            working: image,
            history: VecDeque::new(),
            history_limit,
            rng,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn original(&self) -> &Image {
        &self.original
    }

    pub fn working(&self) -> &Image {
        &self.working
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Validate, compute and commit `mutation` against the working image.
    pub fn apply(&mut self, mutation: &Mutation, mode: EqualizeMode) -> Result<MutationOutput> {
        mutation.validate()?;
        let output = mutation.apply(&self.working, &mut self.rng, mode)?;
        self.commit(output.image.clone());
        Ok(output)
    }

    /// Push the current working image and install `image`.
    fn commit(&mut self, image: Image) {
        let previous = std::mem::replace(&mut self.working, image);
        self.history.push_back(previous);
        if let Some(limit) = self.history_limit {
            while self.history.len() > limit {
                self.history.pop_front();
            }
        }
    }

    /// Restore the most recent history entry.
    pub fn undo(&mut self) -> Result<&Image> {
        let previous = self
            .history
            .pop_back()
            .ok_or(EngineError::EmptyHistory(self.id))?;
        self.working = previous;
        Ok(&self.working)
    }

    /// Drop all history and return to the original image.
    pub fn reset(&mut self) -> &Image {
        self.history.clear();
        self.working = self.original.clone();
        &self.working
    }
}

/// Copy of a session's images at one point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub id: SessionId,
    pub original: Image,
    pub working: Image,
    pub history_depth: usize,
}

// ============================================================================
// Store
// ============================================================================

/// Session registry and the entry point for every session operation.
pub struct SessionStore<S: SessionStorage = InMemoryStorage> {
    storage: S,
    config: EngineConfig,
}

impl SessionStore<InMemoryStorage> {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_storage(InMemoryStorage::new(), config)
    }
}

impl Default for SessionStore<InMemoryStorage> {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl<S: SessionStorage> SessionStore<S> {
    pub fn with_storage(storage: S, config: EngineConfig) -> Self {
        SessionStore { storage, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Open a session on a freshly uploaded image.
    pub fn create(&self, image: Image) -> SessionId {
        let id = SessionId::new();
        let rng = match self.config.noise_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let (height, width, channels) = image.dim();
        self.storage
            .insert(Session::new(id, image, self.config.history_limit, rng));
        info!(session = %id, height, width, channels, "Session created");
        id
    }

    fn lock(&self, id: &SessionId) -> Result<SessionHandle> {
        self.storage.get(id).ok_or_else(|| {
            debug!(session = %id, "Unknown session");
            EngineError::NotFound(*id)
        })
    }

    pub fn snapshot(&self, id: &SessionId) -> Result<SessionSnapshot> {
        let handle = self.lock(id)?;
        let session = guard(&handle);
        Ok(SessionSnapshot {
            id: *id,
            original: session.original().clone(),
            working: session.working().clone(),
            history_depth: session.history_len(),
        })
    }

    pub fn working(&self, id: &SessionId) -> Result<Image> {
        let handle = self.lock(id)?;
        let image = guard(&handle).working().clone();
        Ok(image)
    }

    /// Apply a mutation and commit its result as the new working image.
    pub fn mutate(&self, id: &SessionId, mutation: &Mutation) -> Result<MutationOutput> {
        if let Err(e) = mutation.validate() {
            warn!(session = %id, operation = mutation.name(), error = %e, "Rejected mutation");
            return Err(e);
        }
        let handle = self.lock(id)?;
        let mut session = guard(&handle);

        let start = Instant::now();
        let output = session.apply(mutation, self.config.equalization)?;
        info!(
            session = %id,
            operation = mutation.name(),
            history_depth = session.history_len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Mutation committed"
        );
        Ok(output)
    }

    /// Run an analysis on the working image; the session is not modified.
    pub fn analyze(&self, id: &SessionId, analysis: &Analysis) -> Result<AnalysisOutput> {
        if let Err(e) = analysis.validate() {
            warn!(session = %id, operation = analysis.name(), error = %e, "Rejected analysis");
            return Err(e);
        }
        let working = self.working(id)?;
        let output = analysis.apply(&working)?;
        debug!(session = %id, operation = analysis.name(), "Analysis complete");
        Ok(output)
    }

    pub fn undo(&self, id: &SessionId) -> Result<Image> {
        let handle = self.lock(id)?;
        let mut session = guard(&handle);
        let image = session.undo()?.clone();
        info!(session = %id, history_depth = session.history_len(), "Undo");
        Ok(image)
    }

    pub fn reset(&self, id: &SessionId) -> Result<Image> {
        let handle = self.lock(id)?;
        let mut session = guard(&handle);
        let image = session.reset().clone();
        info!(session = %id, "Reset to original");
        Ok(image)
    }

    /// Forget a session.
    pub fn remove(&self, id: &SessionId) -> Result<()> {
        if !self.storage.remove(id) {
            return Err(EngineError::NotFound(*id));
        }
        info!(session = %id, "Session removed");
        Ok(())
    }
}

/// Lock a session, recovering the data if a previous holder panicked.
fn guard(handle: &SessionHandle) -> MutexGuard<'_, Session> {
    handle.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::edge::EdgeOperator;
    use crate::filters::enhance::Enhancement;
    use crate::filters::histogram::HistogramKind;
    use crate::filters::noise::Noise;
    use crate::filters::spatial::SpatialFilter;
    use ndarray::Array3;
    use std::sync::Arc;
    use std::thread;

    fn image() -> Image {
        Image::new(Array3::from_shape_fn((10, 12, 3), |(y, x, c)| {
            (y * 17 + x * 13 + c * 50) as u8
        }))
        .unwrap()
    }

    fn seeded() -> SessionStore {
        SessionStore::new(EngineConfig {
            noise_seed: Some(7),
            ..EngineConfig::default()
        })
    }

    fn noise() -> Mutation {
        Mutation::Noise(Noise::Gaussian {
            mean: 0.0,
            sigma: 30.0,
        })
    }

    fn median() -> Mutation {
        Mutation::Filter(SpatialFilter::Median { kernel_size: 3 })
    }

    #[test]
    fn test_session_id_parse_and_display() {
        let id = SessionId::new();
        let parsed: SessionId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
        assert!("not-a-uuid".parse::<SessionId>().is_err());
    }

    #[test]
    fn test_create_starts_clean() {
        let store = seeded();
        let id = store.create(image());
        let snap = store.snapshot(&id).unwrap();
        assert_eq!(snap.original, image());
        assert_eq!(snap.working, image());
        assert_eq!(snap.history_depth, 0);
    }

    #[test]
    fn test_undo_walks_back_to_start() {
        let store = seeded();
        let id = store.create(image());
        let ops = [noise(), median(), Mutation::Enhance(Enhancement::Equalization)];
        for op in &ops {
            store.mutate(&id, op).unwrap();
        }
        assert_eq!(store.snapshot(&id).unwrap().history_depth, 3);

        for _ in &ops {
            store.undo(&id).unwrap();
        }
        assert_eq!(store.working(&id).unwrap(), image());
        assert!(matches!(store.undo(&id), Err(EngineError::EmptyHistory(_))));
    }

    #[test]
    fn test_undo_restores_previous_working() {
        let store = seeded();
        let id = store.create(image());
        store.mutate(&id, &noise()).unwrap();
        let after_noise = store.working(&id).unwrap();
        store.mutate(&id, &median()).unwrap();
        assert_eq!(store.undo(&id).unwrap(), after_noise);
    }

    #[test]
    fn test_reset_clears_history() {
        let store = seeded();
        let id = store.create(image());
        store.mutate(&id, &noise()).unwrap();
        store.mutate(&id, &median()).unwrap();

        assert_eq!(store.reset(&id).unwrap(), image());
        assert_eq!(store.snapshot(&id).unwrap().history_depth, 0);
        assert!(matches!(store.undo(&id), Err(EngineError::EmptyHistory(_))));
    }

    #[test]
    fn test_invalid_mutation_leaves_session_untouched() {
        let store = seeded();
        let id = store.create(image());
        store.mutate(&id, &median()).unwrap();
        let before = store.snapshot(&id).unwrap();

        let bad = Mutation::Filter(SpatialFilter::Average { kernel_size: 4 });
        assert!(matches!(store.mutate(&id, &bad), Err(EngineError::Validation(_))));
        assert_eq!(store.snapshot(&id).unwrap(), before);
    }

    #[test]
    fn test_extreme_parameters_rejected_without_poisoning() {
        let store = seeded();
        let id = store.create(image());
        store.mutate(&id, &median()).unwrap();
        let before = store.snapshot(&id).unwrap();

        let wide = Mutation::Noise(Noise::Uniform {
            low: -1e308,
            high: 1e308,
        });
        assert!(matches!(store.mutate(&id, &wide), Err(EngineError::Validation(_))));

        let huge = Mutation::Filter(SpatialFilter::Average {
            kernel_size: (1usize << 32) + 1,
        });
        assert!(matches!(store.mutate(&id, &huge), Err(EngineError::Validation(_))));

        assert_eq!(store.snapshot(&id).unwrap(), before);
        store.mutate(&id, &noise()).unwrap();
        assert_eq!(store.snapshot(&id).unwrap().history_depth, 2);
    }

    #[test]
    fn test_analysis_does_not_touch_session() {
        let store = seeded();
        let id = store.create(image());
        store.mutate(&id, &noise()).unwrap();
        let before = store.snapshot(&id).unwrap();

        store
            .analyze(&id, &Analysis::Edges(EdgeOperator::Sobel))
            .unwrap();
        store
            .analyze(
                &id,
                &Analysis::Histogram {
                    kind: HistogramKind::Rgb,
                },
            )
            .unwrap();
        let canny = Analysis::Edges(EdgeOperator::Canny {
            threshold1: 50.0,
            threshold2: 150.0,
        });
        store.analyze(&id, &canny).unwrap();

        assert_eq!(store.snapshot(&id).unwrap(), before);
    }

    #[test]
    fn test_unknown_session() {
        let store = seeded();
        let id = SessionId::new();
        assert!(matches!(store.working(&id), Err(EngineError::NotFound(_))));
        assert!(matches!(store.mutate(&id, &median()), Err(EngineError::NotFound(_))));
        assert!(matches!(store.undo(&id), Err(EngineError::NotFound(_))));
        assert!(matches!(store.reset(&id), Err(EngineError::NotFound(_))));
        assert!(matches!(store.remove(&id), Err(EngineError::NotFound(_))));
    }

    #[test]
    fn test_remove() {
        let store = seeded();
        let id = store.create(image());
        assert_eq!(store.len(), 1);
        store.remove(&id).unwrap();
        assert!(store.is_empty());
        assert!(matches!(store.snapshot(&id), Err(EngineError::NotFound(_))));
    }

    #[test]
    fn test_history_limit_drops_oldest() {
        let store = SessionStore::new(EngineConfig {
            history_limit: Some(2),
            noise_seed: Some(1),
            ..EngineConfig::default()
        });
        let id = store.create(image());
        for _ in 0..4 {
            store.mutate(&id, &noise()).unwrap();
        }
        assert_eq!(store.snapshot(&id).unwrap().history_depth, 2);
        store.undo(&id).unwrap();
        store.undo(&id).unwrap();
        assert!(matches!(store.undo(&id), Err(EngineError::EmptyHistory(_))));
        assert_ne!(store.working(&id).unwrap(), image());
    }

    #[test]
    fn test_seeded_sessions_reproduce_noise() {
        let store = seeded();
        let a = store.create(image());
        let b = store.create(image());
        let out_a = store.mutate(&a, &noise()).unwrap();
        let out_b = store.mutate(&b, &noise()).unwrap();
        assert_eq!(out_a.image, out_b.image);
    }

    #[test]
    fn test_concurrent_mutations_on_one_session() {
        let store = Arc::new(seeded());
        let id = store.create(image());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for _ in 0..5 {
                        store.mutate(&id, &noise()).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.snapshot(&id).unwrap().history_depth, 40);
        for _ in 0..40 {
            store.undo(&id).unwrap();
        }
        assert_eq!(store.working(&id).unwrap(), image());
    }

    #[test]
    fn test_independent_sessions_in_parallel() {
        let store = Arc::new(seeded());
        let ids: Vec<SessionId> = (0..4).map(|_| store.create(image())).collect();

        let handles: Vec<_> = ids
            .iter()
            .map(|&id| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    store.mutate(&id, &median()).unwrap();
                    store.undo(&id).unwrap()
                })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), image());
        }
    }
}
