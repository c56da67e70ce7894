//! Local verification of recorded sessions.
//!
//! Runs the same verifier the server uses. The client cannot know the
//! server's audit secret, so locally every grid checkpoint is audited.

use serde::{Deserialize, Serialize};
use sim_core::segment::{
    AuditTickSelector, RejectionCode, SegmentResponse, SegmentVerifier, VerifierSession,
};

use crate::error::{HeadlessError, Result};
use crate::runner::SessionRecording;

/// Audits every grid tick the replay produced.
#[derive(Debug, Clone, Copy, Default)]
pub struct FullAudit;

impl AuditTickSelector for FullAudit {
    fn audit_ticks(&self, _segment_index: u32, grid_ticks: &[u64]) -> Vec<u64> {
        grid_ticks.to_vec()
    }
}

/// Verdict for one segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentReport {
    /// Segment index.
    pub index: u32,
    /// Server-style response.
    #[serde(flatten)]
    pub response: SegmentResponse,
    /// Tick the problem was found at.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tick: Option<u64>,
    /// Last tick of the segment, when accepted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_tick: Option<u64>,
}

/// Verify every segment in order, stopping at the first rejection.
///
/// # Errors
///
/// Returns an error if the recording's loadout is invalid.
pub fn verify_recording(recording: &SessionRecording) -> Result<Vec<SegmentReport>> {
    let verifier = SegmentVerifier::new(FullAudit);
    let mut session = VerifierSession::new(recording.seed, &recording.config)?;
    let mut reports = Vec::with_capacity(recording.submissions.len());

    for submission in &recording.submissions {
        match verifier.verify(&session, submission) {
            Ok(verified) => {
                reports.push(SegmentReport {
                    index: verified.index,
                    response: SegmentResponse::accepted(),
                    tick: None,
                    end_tick: Some(verified.end_tick),
                });
                session = verified.session;
            }
            Err(rejection) => {
                tracing::warn!(
                    index = submission.segment_index,
                    code = ?rejection.code,
                    detail = %rejection.detail,
                    "Segment rejected"
                );
                reports.push(SegmentReport {
                    index: submission.segment_index,
                    response: SegmentResponse::rejected(rejection.code),
                    tick: rejection.tick,
                    end_tick: None,
                });
                break;
            }
        }
    }
    Ok(reports)
}

/// Like [`verify_recording`], but any rejection is an error.
///
/// # Errors
///
/// Returns [`HeadlessError::Rejected`] for the first rejected segment.
pub fn require_valid(recording: &SessionRecording) -> Result<usize> {
    let verifier = SegmentVerifier::new(FullAudit);
    let mut session = VerifierSession::new(recording.seed, &recording.config)?;
    for submission in &recording.submissions {
        session = verifier
            .verify(&session, submission)
            .map_err(|rejection| HeadlessError::Rejected {
                index: submission.segment_index,
                rejection,
            })?
            .session;
    }
    Ok(recording.submissions.len())
}

/// First rejection code in a report list, if any.
#[must_use]
pub fn first_rejection(reports: &[SegmentReport]) -> Option<RejectionCode> {
    reports.iter().find_map(|r| r.response.rejection_reason)
}
