//! Verification service.
//!
//! Requests are handled concurrently. Each segment replay runs on a tokio
//! blocking thread, and a semaphore caps how many run at once. Holding a
//! session's lock for the whole job serializes submissions per session.

use std::sync::Arc;

use sim_core::config::{SimConfig, SIM_VERSION};
use sim_core::segment::{
    SegmentResponse, SegmentSubmission, SegmentVerifier, SecretAuditSelector,
};
use tokio::sync::Semaphore;

use crate::config::ServerConfig;
use crate::error::{Result, ServerError};
use crate::protocol::{Request, Response};
use crate::store::SessionStore;

/// Shared verification service.
#[derive(Debug, Clone)]
pub struct VerificationService {
    verifier: Arc<SegmentVerifier<SecretAuditSelector>>,
    store: Arc<SessionStore>,
    permits: Arc<Semaphore>,
}

impl VerificationService {
    /// Build a service from validated settings.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::InvalidConfig`] if the settings are invalid.
    pub fn new(config: &ServerConfig) -> Result<Self> {
        config.validate()?;
        let selector = SecretAuditSelector::new(
            config.audit_secret.as_bytes().to_vec(),
            config.audit_ticks_per_segment,
        );
        Ok(Self {
            verifier: Arc::new(
                SegmentVerifier::new(selector).with_tick_cap(config.segment_tick_cap),
            ),
            store: Arc::new(SessionStore::new()),
            permits: Arc::new(Semaphore::new(config.workers)),
        })
    }

    /// Greeting sent before the first request.
    #[must_use]
    pub fn ready() -> Response {
        Response::Ready {
            sim_version: SIM_VERSION.to_string(),
        }
    }

    /// Open sessions.
    #[must_use]
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Handle one request. Failures become [`Response::Error`].
    pub async fn handle(&self, request: Request) -> Response {
        let cmd = request.name();
        let result = match request {
            Request::OpenSession {
                session_id,
                seed,
                config,
            } => self.open_session(session_id, seed, &config),
            Request::SubmitSegment {
                session_id,
                submission,
            } => self.submit_segment(session_id, submission).await,
            Request::CloseSession { session_id } => self.close_session(session_id).await,
            Request::Status => Ok(Response::Status {
                sessions: self.store.len(),
                idle_workers: self.permits.available_permits(),
            }),
        };
        result.unwrap_or_else(|e| {
            tracing::warn!(cmd, error = %e, "Request failed");
            Response::error(&e, Some(cmd))
        })
    }

    /// Parse and handle one protocol line.
    pub async fn handle_line(&self, line: &str) -> Response {
        match Request::parse(line) {
            Ok(request) => self.handle(request).await,
            Err(e) => {
                tracing::warn!(error = %e, "Unparseable request line");
                Response::error(&e, None)
            }
        }
    }

    fn open_session(&self, session_id: String, seed: u32, config: &SimConfig) -> Result<Response> {
        self.store.open(&session_id, seed, config)?;
        tracing::info!(session = %session_id, seed, "Session opened");
        Ok(Response::SessionOpened { session_id })
    }

    async fn close_session(&self, session_id: String) -> Result<Response> {
        let handle = self.store.close(&session_id)?;
        let segments_accepted = handle.lock().await.segments_accepted;
        tracing::info!(session = %session_id, segments_accepted, "Session closed");
        Ok(Response::SessionClosed {
            session_id,
            segments_accepted,
        })
    }

    async fn submit_segment(
        &self,
        session_id: String,
        submission: SegmentSubmission,
    ) -> Result<Response> {
        let handle = self.store.get(&session_id)?;
        let mut record = handle.lock().await;
        let session = record.session()?;
        let segment_index = submission.segment_index;

        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| ServerError::WorkerFailed(e.to_string()))?;
        let verifier = Arc::clone(&self.verifier);
        let outcome = tokio::task::spawn_blocking(move || verifier.verify(&session, &submission))
            .await
            .map_err(|e| ServerError::WorkerFailed(e.to_string()))?;

        let response = match outcome {
            Ok(verified) => {
                record.accept(&verified.session)?;
                tracing::info!(
                    session = %session_id,
                    segment = segment_index,
                    end_tick = verified.end_tick,
                    "Segment accepted"
                );
                SegmentResponse::accepted()
            }
            Err(rejection) => {
                record.reject();
                tracing::warn!(
                    session = %session_id,
                    segment = segment_index,
                    code = ?rejection.code,
                    tick = ?rejection.tick,
                    detail = %rejection.detail,
                    "Segment rejected"
                );
                SegmentResponse::rejected(rejection.code)
            }
        };

        Ok(Response::Verdict {
            session_id,
            segment_index,
            response,
        })
    }
}
