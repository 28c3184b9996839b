//! Request/response front door over the session store.
//!
//! One [`Request`] names an operation and, where needed, a session id and
//! parameters; [`Engine::handle`] resolves it and returns a [`Response`]
//! with the status message an editing surface shows its user. Hybrid
//! composition bypasses sessions entirely.

use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::error::Result;
use crate::filters::hybrid::{compose, HybridParams, HybridResult};
use crate::image::Image;
use crate::ops::{Analysis, AnalysisOutput, Artifact, Mutation};
use crate::session::{InMemoryStorage, SessionId, SessionStorage, SessionStore};

#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Upload {
        image: Image,
    },
    Mutate {
        session: SessionId,
        mutation: Mutation,
    },
    Analyze {
        session: SessionId,
        analysis: Analysis,
    },
    Undo {
        session: SessionId,
    },
    Reset {
        session: SessionId,
    },
    Remove {
        session: SessionId,
    },
    Hybrid {
        image1: Image,
        image2: Image,
        params: HybridParams,
    },
}

impl Request {
    pub fn name(&self) -> &'static str {
        match self {
            Request::Upload { .. } => "upload",
            Request::Mutate { mutation, .. } => mutation.name(),
            Request::Analyze { analysis, .. } => analysis.name(),
            Request::Undo { .. } => "undo",
            Request::Reset { .. } => "reset",
            Request::Remove { .. } => "remove",
            Request::Hybrid { .. } => "hybrid",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// New session with both of its images
    Created {
        session: SessionId,
        original: Image,
        working: Image,
        message: String,
    },
    /// New working image after a mutation, undo or reset
    Image {
        session: SessionId,
        image: Image,
        artifact: Option<Artifact>,
        message: String,
    },
    Analysis {
        session: SessionId,
        output: AnalysisOutput,
        message: String,
    },
    Removed {
        session: SessionId,
        message: String,
    },
    Hybrid {
        result: HybridResult,
        message: String,
    },
}

impl Response {
    pub fn message(&self) -> &str {
        match self {
            Response::Created { message, .. }
            | Response::Image { message, .. }
            | Response::Analysis { message, .. }
            | Response::Removed { message, .. }
            | Response::Hybrid { message, .. } => message,
        }
    }
}

/// Processing engine: a session store plus the stateless hybrid composer.
pub struct Engine<S: SessionStorage = InMemoryStorage> {
    store: SessionStore<S>,
}

impl Engine<InMemoryStorage> {
    pub fn new(config: EngineConfig) -> Self {
        Engine {
            store: SessionStore::new(config),
        }
    }
}

impl Default for Engine<InMemoryStorage> {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl<S: SessionStorage> Engine<S> {
    pub fn with_store(store: SessionStore<S>) -> Self {
        Engine { store }
    }

    pub fn store(&self) -> &SessionStore<S> {
        &self.store
    }

    /// Dispatch one request.
    pub fn handle(&self, request: Request) -> Result<Response> {
        let name = request.name();
        debug!(operation = name, "Handling request");
        let result = self.dispatch(request);
        if let Err(e) = &result {
            if e.is_validation_class() {
                warn!(operation = name, error = %e, "Request rejected");
            } else {
                debug!(operation = name, error = %e, "Request failed");
            }
        }
        result
    }

    fn dispatch(&self, request: Request) -> Result<Response> {
        match request {
            Request::Upload { image } => {
                let session = self.store.create(image);
                let snapshot = self.store.snapshot(&session)?;
                Ok(Response::Created {
                    session,
                    original: snapshot.original,
                    working: snapshot.working,
                    message: "Image uploaded successfully".to_string(),
                })
            }
            Request::Mutate { session, mutation } => {
                let output = self.store.mutate(&session, &mutation)?;
                Ok(Response::Image {
                    session,
                    image: output.image,
                    artifact: output.artifact,
                    message: mutation.describe(),
                })
            }
            Request::Analyze { session, analysis } => {
                let output = self.store.analyze(&session, &analysis)?;
                Ok(Response::Analysis {
                    session,
                    output,
                    message: analysis.describe(),
                })
            }
            Request::Undo { session } => Ok(Response::Image {
                session,
                image: self.store.undo(&session)?,
                artifact: None,
                message: "Undo successful".to_string(),
            }),
            Request::Reset { session } => Ok(Response::Image {
                session,
                image: self.store.reset(&session)?,
                artifact: None,
                message: "Reset to original".to_string(),
            }),
            Request::Remove { session } => {
                self.store.remove(&session)?;
                Ok(Response::Removed {
                    session,
                    message: "Session removed".to_string(),
                })
            }
            Request::Hybrid {
                image1,
                image2,
                params,
            } => Ok(Response::Hybrid {
                result: self.hybrid(&image1, &image2, params)?,
                message: "Hybrid image created successfully".to_string(),
            }),
        }
    }

    /// Stateless hybrid composition using the configured high-band offset.
    pub fn hybrid(&self, image1: &Image, image2: &Image, params: HybridParams) -> Result<HybridResult> {
        compose(image1, image2, params, self.store.config().high_band_offset)
    }
}
