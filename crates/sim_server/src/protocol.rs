//! JSON-lines protocol for the verification server.
//!
//! One JSON object per line on stdin, one reply per line on stdout. Logs go
//! to stderr.
//!
//! ```text
//! <- {"type":"ready","sim_version":"sim-core/0.1.0"}
//! -> {"cmd":"open_session","session_id":"a1","seed":42}
//! <- {"type":"session_opened","session_id":"a1"}
//! -> {"cmd":"submit_segment","session_id":"a1","submission":{"segmentIndex":0,...}}
//! <- {"type":"verdict","session_id":"a1","segment_index":0,"accepted":true}
//! ```
//!
//! Replies to different sessions may arrive out of request order; every
//! reply names its session.

use serde::{Deserialize, Serialize};
use sim_core::config::SimConfig;
use sim_core::segment::{SegmentResponse, SegmentSubmission};

use crate::error::ServerError;

// ============================================================================
// Requests (client -> server)
// ============================================================================

/// Request from a game backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Request {
    /// Start tracking a session. The loadout defaults to the standard one.
    OpenSession {
        /// Caller-chosen session id.
        session_id: String,
        /// Session seed.
        seed: u32,
        /// Starting loadout.
        #[serde(default)]
        config: SimConfig,
    },
    /// Verify the next segment of a session.
    SubmitSegment {
        /// Session id.
        session_id: String,
        /// Client submission in the segment wire format.
        submission: SegmentSubmission,
    },
    /// Stop tracking a session.
    CloseSession {
        /// Session id.
        session_id: String,
    },
    /// Report server counters.
    Status,
}

impl Request {
    /// Parse one request line.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::MalformedRequest`] if the line is not a request.
    pub fn parse(line: &str) -> Result<Self, ServerError> {
        Ok(serde_json::from_str(line)?)
    }

    /// Name of the command, for logs and error replies.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::OpenSession { .. } => "open_session",
            Self::SubmitSegment { .. } => "submit_segment",
            Self::CloseSession { .. } => "close_session",
            Self::Status => "status",
        }
    }

    /// Session the request belongs to, if any.
    #[must_use]
    pub fn session_id(&self) -> Option<&str> {
        match self {
            Self::OpenSession { session_id, .. }
            | Self::SubmitSegment { session_id, .. }
            | Self::CloseSession { session_id } => Some(session_id),
            Self::Status => None,
        }
    }
}

// ============================================================================
// Responses (server -> client)
// ============================================================================

/// Reply to a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Server is ready to accept requests.
    Ready {
        /// Engine build used for replays.
        sim_version: String,
    },
    /// Session opened.
    SessionOpened {
        /// Session id.
        session_id: String,
    },
    /// Segment verdict.
    Verdict {
        /// Session id.
        session_id: String,
        /// Segment the verdict is for.
        segment_index: u32,
        /// `{accepted, rejectionReason?}`.
        #[serde(flatten)]
        response: SegmentResponse,
    },
    /// Session closed.
    SessionClosed {
        /// Session id.
        session_id: String,
        /// Segments accepted over the session's lifetime.
        segments_accepted: u32,
    },
    /// Server counters.
    Status {
        /// Open sessions.
        sessions: usize,
        /// Verification workers currently free.
        idle_workers: usize,
    },
    /// The request could not be acted on.
    Error {
        /// Human-readable message.
        message: String,
        /// Command that failed, when it could be parsed.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cmd: Option<String>,
    },
}

impl Response {
    /// Error reply for a failed command.
    #[must_use]
    pub fn error(err: &ServerError, cmd: Option<&str>) -> Self {
        Self::Error {
            message: err.to_string(),
            cmd: cmd.map(str::to_string),
        }
    }

    /// Encode as a single line (no trailing newline).
    #[must_use]
    pub fn to_line(&self) -> String {
        // Every variant holds only strings, integers and unit enums.
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"type":"error","message":"failed to encode reply: {e}"}}"#)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim_core::segment::RejectionCode;

    #[test]
    fn test_open_session_defaults_config() {
        let request = Request::parse(r#"{"cmd":"open_session","session_id":"s1","seed":7}"#).unwrap();
        assert_eq!(
            request,
            Request::OpenSession {
                session_id: "s1".into(),
                seed: 7,
                config: SimConfig::default(),
            }
        );
        assert_eq!(request.name(), "open_session");
        assert_eq!(request.session_id(), Some("s1"));
    }

    #[test]
    fn test_status_request() {
        assert_eq!(Request::parse(r#"{"cmd":"status"}"#).unwrap(), Request::Status);
        assert_eq!(Request::Status.session_id(), None);
    }

    #[test]
    fn test_garbage_is_malformed() {
        assert!(matches!(
            Request::parse("not json"),
            Err(ServerError::MalformedRequest(_))
        ));
        assert!(Request::parse(r#"{"cmd":"launch_missiles"}"#).is_err());
    }

    #[test]
    fn test_verdict_flattens_response() {
        let accepted = Response::Verdict {
            session_id: "s1".into(),
            segment_index: 0,
            response: SegmentResponse::accepted(),
        };
        assert_eq!(
            accepted.to_line(),
            r#"{"type":"verdict","session_id":"s1","segment_index":0,"accepted":true}"#
        );

        let rejected = Response::Verdict {
            session_id: "s1".into(),
            segment_index: 2,
            response: SegmentResponse::rejected(RejectionCode::AuditTickMissing),
        };
        assert_eq!(
            rejected.to_line(),
            r#"{"type":"verdict","session_id":"s1","segment_index":2,"accepted":false,"rejectionReason":"AUDIT_TICK_MISSING"}"#
        );
    }

    #[test]
    fn test_error_reply() {
        let err = ServerError::UnknownSession("ghost".into());
        let line = Response::error(&err, Some("close_session")).to_line();
        assert_eq!(
            line,
            r#"{"type":"error","message":"Unknown session: ghost","cmd":"close_session"}"#
        );
    }
}
