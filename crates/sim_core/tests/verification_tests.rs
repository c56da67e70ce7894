//! Segment verification tests.
//!
//! Sessions are recorded client-side with [`SegmentRecorder`], sent
//! through the JSON wire format, and checked by a [`SegmentVerifier`].

use sim_core::config::SimConfig;
use sim_core::segment::{
    RejectionCode, Segment, SegmentRecorder, SegmentResponse, SegmentSubmission,
    SegmentVerifier, SecretAuditSelector, VerifierSession,
};
use sim_test_utils::fixtures::{default_config, scripted_events};

fn verifier() -> SegmentVerifier<SecretAuditSelector> {
    SegmentVerifier::new(SecretAuditSelector::new("integration-secret", 4))
}

fn recorder_with_script(seed: u32, config: &SimConfig) -> SegmentRecorder {
    let mut recorder = SegmentRecorder::new(seed, config).unwrap();
    for event in scripted_events() {
        recorder.submit(event.event, event.tick).unwrap();
    }
    recorder
}

fn first_segment(seed: u32) -> Segment {
    recorder_with_script(seed, &default_config())
        .finish_segment()
        .unwrap()
}

/// Send a submission through JSON text and back.
fn over_the_wire(submission: &SegmentSubmission) -> SegmentSubmission {
    let text = serde_json::to_string(submission).unwrap();
    serde_json::from_str(&text).unwrap()
}

// =============================================================================
// Acceptance
// =============================================================================

#[test]
fn test_recorded_session_verifies_segment_by_segment() {
    let config = default_config();
    let mut recorder = recorder_with_script(61, &config);
    let mut session = VerifierSession::new(61, &config).unwrap();
    let verifier = verifier();

    for expected_index in 0..3 {
        let Some(segment) = recorder.finish_segment() else {
            break;
        };
        assert_eq!(segment.index, expected_index);
        let submission = over_the_wire(&segment.to_submission().unwrap());
        let verified = verifier.verify(&session, &submission).unwrap();
        assert_eq!(verified.final_hash, segment.final_hash);
        assert_eq!(verified.start_tick, segment.start_tick);
        session = verified.session;
    }
    assert!(session.next_index >= 1);
}

#[test]
fn test_verification_is_idempotent() {
    let config = default_config();
    let session = VerifierSession::new(19, &config).unwrap();
    let submission = first_segment(19).to_submission().unwrap();
    let verifier = verifier();

    let first = verifier.verify(&session, &submission).unwrap();
    let second = verifier.verify(&session, &submission).unwrap();
    assert_eq!(first.final_hash, second.final_hash);
    assert_eq!(first.end_tick, second.end_tick);
    assert_eq!(first.session, second.session);
}

#[test]
fn test_session_persists_between_segments() {
    let config = default_config();
    let mut recorder = recorder_with_script(73, &config);
    let verifier = verifier();

    let first = recorder.finish_segment().unwrap();
    let session = VerifierSession::new(73, &config).unwrap();
    let verified = verifier
        .verify(&session, &first.to_submission().unwrap())
        .unwrap();

    let stored = verified.session.to_bytes().unwrap();
    let restored = VerifierSession::from_bytes(&stored).unwrap();

    let second = recorder.finish_segment().unwrap();
    let verified = verifier
        .verify(&restored, &second.to_submission().unwrap())
        .unwrap();
    assert_eq!(verified.index, 1);
}

// =============================================================================
// Rejection
// =============================================================================

#[test]
fn test_out_of_order_events_rejected() {
    let mut submission = first_segment(4).to_submission().unwrap();
    let last = submission.events.len() - 1;
    submission.events.swap(0, last);
    let session = VerifierSession::new(4, &default_config()).unwrap();

    let rejection = verifier().verify(&session, &submission).unwrap_err();
    assert_eq!(rejection.code, RejectionCode::TicksNotMonotonic);
}

#[test]
fn test_event_before_segment_start_rejected() {
    let config = default_config();
    let mut recorder = recorder_with_script(6, &config);
    let first = recorder.finish_segment().unwrap();
    let verified = verifier()
        .verify(
            &VerifierSession::new(6, &config).unwrap(),
            &first.to_submission().unwrap(),
        )
        .unwrap();

    let mut second = recorder.finish_segment().unwrap().to_submission().unwrap();
    let mut stale = first.to_submission().unwrap().events[0].clone();
    stale.tick = 0;
    second.events.insert(0, stale);

    let rejection = verifier()
        .verify(&verified.session, &second)
        .unwrap_err();
    assert_eq!(rejection.code, RejectionCode::TicksNotMonotonic);
}

#[test]
fn test_each_tampered_checkpoint_caught_at_its_tick() {
    let original = first_segment(21).to_submission().unwrap();
    let session = VerifierSession::new(21, &default_config()).unwrap();
    let verifier = verifier();

    for index in [0, original.checkpoints.len() / 2, original.checkpoints.len() - 2] {
        let mut submission = original.clone();
        submission.checkpoints[index].hash = submission.checkpoints[index].hash.wrapping_add(1);
        let rejection = verifier.verify(&session, &submission).unwrap_err();
        assert_eq!(rejection.code, RejectionCode::CheckpointMismatch);
        assert_eq!(rejection.tick, Some(submission.checkpoints[index].tick));
    }
}

#[test]
fn test_rejection_response_json() {
    let mut submission = first_segment(2).to_submission().unwrap();
    submission.sim_version = "sim-core/9.9.9".into();
    let session = VerifierSession::new(2, &default_config()).unwrap();
    let rejection = verifier().verify(&session, &submission).unwrap_err();

    let response = SegmentResponse::rejected(rejection.code);
    assert_eq!(
        serde_json::to_string(&response).unwrap(),
        r#"{"accepted":false,"rejectionReason":"SIM_VERSION_MISMATCH"}"#
    );
}
