use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::gemini::{AestheticModel, GeminiError};
use crate::models::UserProfile;
use crate::session::{GenerationState, Session, SessionStore};

/// The only failure text users ever see; the underlying error is logged.
pub const FAILURE_MESSAGE: &str = "Failed to curate portfolio. Please check your API key or try again.";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PipelineError {
    #[error("session {0} not found")]
    SessionNotFound(Uuid),
    #[error("a generation cycle is already running for this session")]
    CycleInFlight,
}

/// Everything a cycle needs once the session lock is released.
#[derive(Debug, Clone)]
pub struct CycleTicket {
    pub session_id: Uuid,
    pub epoch: u64,
    profile: UserProfile,
}

/// Result of [`Pipeline::start`].
#[derive(Debug)]
pub struct Started {
    /// Session as it stood right after the transition.
    pub session: Session,
    /// `None` when the cycle ended immediately (no credential configured).
    pub ticket: Option<CycleTicket>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Completed,
    Failed,
    /// A reset or newer trigger superseded this cycle; its results were dropped.
    Stale,
}

/// Drives sessions through Idle → Analyzing → GeneratingImages → Complete | Error.
#[derive(Clone)]
pub struct Pipeline {
    store: SessionStore,
    model: Arc<dyn AestheticModel>,
}

impl Pipeline {
    pub fn new(store: SessionStore, model: Arc<dyn AestheticModel>) -> Self {
        Self { store, model }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Moves the session into `Analyzing` (or straight to `Error` without a
    /// credential) and hands back the ticket for [`Pipeline::run`].
    ///
    /// Rejects re-entry while a cycle is in flight.
    pub fn start(&self, id: Uuid) -> Result<Started, PipelineError> {
        let credential = self.model.ensure_credential();

        self.store
            .with_session(id, |session| {
                if session.state.is_in_flight() {
                    warn!(session = %id, state = session.state.label(), "⚠️ Generation already in flight");
                    return Err(PipelineError::CycleInFlight);
                }
                session.epoch += 1;
                session.touch();

                let ticket = match &credential {
                    Ok(()) => {
                        session.state = GenerationState::Analyzing;
                        Some(CycleTicket {
                            session_id: id,
                            epoch: session.epoch,
                            profile: session.profile.clone(),
                        })
                    }
                    Err(e) => {
                        error!(session = %id, kind = e.kind(), error = %e, "❌ Cannot start generation");
                        session.state = GenerationState::Error { message: FAILURE_MESSAGE.to_string() };
                        None
                    }
                };
                info!(session = %id, epoch = session.epoch, state = session.state.label(), "🚀 Generation triggered");
                Ok(Started { session: session.clone(), ticket })
            })
            .ok_or(PipelineError::SessionNotFound(id))?
    }

    /// Runs both provider steps in order, writing each transition back to the session.
    pub async fn run(&self, ticket: CycleTicket) -> CycleOutcome {
        let span = info_span!("cycle", session = %ticket.session_id, epoch = ticket.epoch);
        self.run_steps(ticket).instrument(span).await
    }

    async fn run_steps(&self, ticket: CycleTicket) -> CycleOutcome {
        let CycleTicket { session_id, epoch, profile } = ticket;

        let direction = match self.model.request_portfolio_plan(&profile).await {
            Ok(direction) => direction,
            Err(e) => {
                error!(kind = e.kind(), error = %e, "❌ Portfolio plan failed");
                let failed = GenerationState::Error { message: FAILURE_MESSAGE.to_string() };
                return if self.apply(session_id, epoch, failed) { CycleOutcome::Failed } else { CycleOutcome::Stale };
            }
        };

        info!(title = %direction.title, slides = direction.slides.len(), "🎨 Direction ready, generating mood image");
        let analyzing_done = GenerationState::GeneratingImages { direction: direction.clone() };
        if !self.apply(session_id, epoch, analyzing_done) {
            return CycleOutcome::Stale;
        }

        let mood_image = match self.model.request_mood_image(&direction).await {
            Ok(image) => image,
            Err(e @ GeminiError::MissingCredential) => {
                error!(kind = e.kind(), error = %e, "❌ Mood image has no credential");
                let failed = GenerationState::Error { message: FAILURE_MESSAGE.to_string() };
                return if self.apply(session_id, epoch, failed) { CycleOutcome::Failed } else { CycleOutcome::Stale };
            }
            Err(e) => {
                warn!(kind = e.kind(), error = %e, "⚠️ Mood image failed, continuing without it");
                None
            }
        };

        let has_image = mood_image.is_some();
        if !self.apply(session_id, epoch, GenerationState::Complete { direction, mood_image }) {
            return CycleOutcome::Stale;
        }
        info!(has_image, "✅ Generation complete");
        CycleOutcome::Completed
    }

    /// `start` plus a spawned `run`. Returns the session right after the trigger.
    pub fn trigger(&self, id: Uuid) -> Result<Session, PipelineError> {
        let Started { session, ticket } = self.start(id)?;
        if let Some(ticket) = ticket {
            let pipeline = self.clone();
            tokio::spawn(async move {
                pipeline.run(ticket).await;
            });
        }
        Ok(session)
    }

    /// Returns the session to `Idle` and invalidates any cycle still running.
    pub fn reset(&self, id: Uuid) -> Result<Session, PipelineError> {
        self.store
            .with_session(id, |session| {
                session.epoch += 1;
                session.state = GenerationState::Idle;
                session.touch();
                info!(session = %id, epoch = session.epoch, "↩️ Session reset");
                session.clone()
            })
            .ok_or(PipelineError::SessionNotFound(id))
    }

    /// Writes `next` only if the session still exists and is on `epoch`.
    fn apply(&self, id: Uuid, epoch: u64, next: GenerationState) -> bool {
        self.store
            .with_session(id, |session| {
                if session.epoch != epoch {
                    debug!(current = session.epoch, stale = epoch, next = next.label(), "Discarding stale result");
                    return false;
                }
                session.state = next;
                session.touch();
                true
            })
            .unwrap_or(false)
    }
}
