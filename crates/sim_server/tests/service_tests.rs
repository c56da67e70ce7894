//! End-to-end tests for the verification service.
//!
//! Segments are recorded with the client-side recorder and pushed through
//! the JSON-lines protocol.

use sim_core::segment::{RejectionCode, SegmentRecorder, SegmentResponse};
use sim_server::{Dispatcher, Request, Response, ServerConfig, VerificationService};
use tokio::sync::mpsc;
use sim_test_utils::fixtures::{default_config, scripted_events};

fn service() -> VerificationService {
    VerificationService::new(&ServerConfig {
        audit_secret: "integration".into(),
        workers: 2,
        ..ServerConfig::default()
    })
    .unwrap()
}

fn recorder(seed: u32) -> SegmentRecorder {
    let mut recorder = SegmentRecorder::new(seed, &default_config()).unwrap();
    for event in scripted_events() {
        recorder.submit(event.event, event.tick).unwrap();
    }
    recorder
}

fn submit_line(session_id: &str, recorder: &mut SegmentRecorder) -> String {
    let submission = recorder.finish_segment().unwrap().to_submission().unwrap();
    serde_json::to_string(&Request::SubmitSegment {
        session_id: session_id.into(),
        submission,
    })
    .unwrap()
}

async fn open(service: &VerificationService, session_id: &str, seed: u32) {
    let line = format!(r#"{{"cmd":"open_session","session_id":"{session_id}","seed":{seed}}}"#);
    assert_eq!(
        service.handle_line(&line).await,
        Response::SessionOpened {
            session_id: session_id.into()
        }
    );
}

fn verdict(response: &Response) -> (u32, SegmentResponse) {
    match response {
        Response::Verdict {
            segment_index,
            response,
            ..
        } => (*segment_index, *response),
        other => panic!("expected verdict, got {other:?}"),
    }
}

#[tokio::test]
async fn test_honest_session_is_accepted_segment_by_segment() {
    let service = service();
    open(&service, "honest", 42).await;
    let mut client = recorder(42);

    for index in 0..2 {
        let reply = service.handle_line(&submit_line("honest", &mut client)).await;
        assert_eq!(verdict(&reply), (index, SegmentResponse::accepted()));
    }

    let closed = service
        .handle_line(r#"{"cmd":"close_session","session_id":"honest"}"#)
        .await;
    assert_eq!(
        closed,
        Response::SessionClosed {
            session_id: "honest".into(),
            segments_accepted: 2,
        }
    );
}

#[tokio::test]
async fn test_resubmitting_a_segment_is_rejected() {
    let service = service();
    open(&service, "replayed", 7).await;
    let mut client = recorder(7);
    let line = submit_line("replayed", &mut client);

    assert!(verdict(&service.handle_line(&line).await).1.accepted);
    let (_, second) = verdict(&service.handle_line(&line).await);
    assert_eq!(second, SegmentResponse::rejected(RejectionCode::TicksNotMonotonic));
}

#[tokio::test]
async fn test_rejection_keeps_resume_point() {
    let service = service();
    open(&service, "tamper", 11).await;
    let mut client = recorder(11);

    let mut submission = client.finish_segment().unwrap().to_submission().unwrap();
    let honest = submission.clone();
    submission.final_hash = "deadbeef".into();
    let tampered = Request::SubmitSegment {
        session_id: "tamper".into(),
        submission,
    };
    let (_, rejected) = verdict(&service.handle(tampered).await);
    assert_eq!(rejected, SegmentResponse::rejected(RejectionCode::FinalHashMismatch));

    let retry = Request::SubmitSegment {
        session_id: "tamper".into(),
        submission: honest,
    };
    assert!(verdict(&service.handle(retry).await).1.accepted);
}

#[tokio::test]
async fn test_wrong_engine_build_rejected() {
    let service = service();
    open(&service, "old-client", 3).await;
    let mut client = recorder(3);
    let mut submission = client.finish_segment().unwrap().to_submission().unwrap();
    submission.sim_version = "sim-core/0.0.1".into();

    let reply = service
        .handle(Request::SubmitSegment {
            session_id: "old-client".into(),
            submission,
        })
        .await;
    assert_eq!(
        verdict(&reply).1,
        SegmentResponse::rejected(RejectionCode::SimVersionMismatch)
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_sessions_verify_concurrently() {
    let service = service();
    let mut lines = Vec::new();
    for seed in 1..=4u32 {
        let id = format!("s{seed}");
        open(&service, &id, seed).await;
        lines.push(submit_line(&id, &mut recorder(seed)));
    }

    let jobs: Vec<_> = lines
        .into_iter()
        .map(|line| {
            let service = service.clone();
            tokio::spawn(async move { service.handle_line(&line).await })
        })
        .collect();
    for job in jobs {
        assert!(verdict(&job.await.unwrap()).1.accepted);
    }
    assert_eq!(service.store().len(), 4);
}

#[tokio::test]
async fn test_duplicate_session_id_is_an_error() {
    let service = service();
    open(&service, "dup", 1).await;
    let reply = service
        .handle_line(r#"{"cmd":"open_session","session_id":"dup","seed":2}"#)
        .await;
    assert!(matches!(reply, Response::Error { .. }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_pipelined_requests_keep_session_order() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut dispatcher = Dispatcher::new(service(), tx);
    let mut client = recorder(21);
    let mut other = recorder(22);

    dispatcher.dispatch_line(r#"{"cmd":"open_session","session_id":"p","seed":21}"#);
    dispatcher.dispatch_line(r#"{"cmd":"open_session","session_id":"q","seed":22}"#);
    dispatcher.dispatch_line(&submit_line("p", &mut client));
    dispatcher.dispatch_line(&submit_line("q", &mut other));
    dispatcher.dispatch_line(&submit_line("p", &mut client));
    dispatcher.dispatch_line(r#"{"cmd":"close_session","session_id":"p"}"#);
    dispatcher.shutdown().await;

    let mut replies = Vec::new();
    while let Some(reply) = rx.recv().await {
        replies.push(reply);
    }
    let session_p: Vec<_> = replies
        .iter()
        .filter(|reply| match reply {
            Response::SessionOpened { session_id }
            | Response::Verdict { session_id, .. }
            | Response::SessionClosed { session_id, .. } => session_id == "p",
            _ => false,
        })
        .collect();

    assert_eq!(session_p.len(), 4);
    assert!(matches!(session_p[0], Response::SessionOpened { .. }));
    assert_eq!(verdict(session_p[1]), (0, SegmentResponse::accepted()));
    assert_eq!(verdict(session_p[2]), (1, SegmentResponse::accepted()));
    assert_eq!(
        *session_p[3],
        Response::SessionClosed {
            session_id: "p".into(),
            segments_accepted: 2,
        }
    );
    assert!(replies
        .iter()
        .all(|reply| !matches!(reply, Response::Error { .. })));
}
