//! Request dispatch for the JSON-lines front end.
//!
//! Every session gets a lane: an ordered queue drained by one task, so a
//! session's requests are handled in arrival order while different
//! sessions verify in parallel. Requests that name no session run on
//! their own task.

use std::collections::HashMap;

use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::error::ServerError;
use crate::protocol::{Request, Response};
use crate::service::VerificationService;

/// Routes request lines to per-session lanes and collects the replies.
#[derive(Debug)]
pub struct Dispatcher {
    service: VerificationService,
    replies: mpsc::UnboundedSender<Response>,
    lanes: HashMap<String, mpsc::UnboundedSender<Request>>,
    tasks: JoinSet<()>,
}

impl Dispatcher {
    /// Dispatcher writing every reply to `replies`.
    #[must_use]
    pub fn new(service: VerificationService, replies: mpsc::UnboundedSender<Response>) -> Self {
        Self {
            service,
            replies,
            lanes: HashMap::new(),
            tasks: JoinSet::new(),
        }
    }

    /// Open session lanes.
    #[must_use]
    pub fn lane_count(&self) -> usize {
        self.lanes.len()
    }

    /// Queue one protocol line.
    pub fn dispatch_line(&mut self, line: &str) {
        self.reap();
        match Request::parse(line) {
            Ok(request) => self.dispatch(request),
            Err(e) => {
                tracing::warn!(error = %e, "Unparseable request line");
                send_reply(&self.replies, Response::error(&e, None));
            }
        }
    }

    /// Queue one request behind earlier requests for the same session.
    pub fn dispatch(&mut self, request: Request) {
        let Some(session_id) = request.session_id().map(str::to_owned) else {
            let service = self.service.clone();
            let replies = self.replies.clone();
            self.tasks.spawn(async move {
                send_reply(&replies, service.handle(request).await);
            });
            return;
        };

        let closing = matches!(request, Request::CloseSession { .. });
        let lane = self
            .lanes
            .entry(session_id.clone())
            .or_insert_with(|| spawn_lane(&mut self.tasks, &self.service, &self.replies));
        if let Err(e) = lane.send(request) {
            tracing::error!(session = %session_id, cmd = e.0.name(), "Session lane closed");
            let err = ServerError::WorkerFailed(format!("session lane closed: {session_id}"));
            send_reply(&self.replies, Response::error(&err, Some(e.0.name())));
        }
        if closing {
            // The lane drains what it already holds, then ends.
            self.lanes.remove(&session_id);
        }
    }

    /// Wait for every queued request to be answered.
    pub async fn shutdown(mut self) {
        self.lanes.clear();
        while let Some(done) = self.tasks.join_next().await {
            if let Err(e) = done {
                tracing::error!(error = %e, "Request task failed");
            }
        }
    }

    fn reap(&mut self) {
        while let Some(done) = self.tasks.try_join_next() {
            if let Err(e) = done {
                tracing::error!(error = %e, "Request task failed");
            }
        }
    }
}

fn spawn_lane(
    tasks: &mut JoinSet<()>,
    service: &VerificationService,
    replies: &mpsc::UnboundedSender<Response>,
) -> mpsc::UnboundedSender<Request> {
    let (tx, mut rx) = mpsc::unbounded_channel::<Request>();
    let service = service.clone();
    let replies = replies.clone();
    tasks.spawn(async move {
        while let Some(request) = rx.recv().await {
            send_reply(&replies, service.handle(request).await);
        }
    });
    tx
}

fn send_reply(replies: &mpsc::UnboundedSender<Response>, response: Response) {
    if let Err(e) = replies.send(response) {
        tracing::warn!(reply = ?e.0, "Reply dropped, output closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;

    fn dispatcher() -> (Dispatcher, mpsc::UnboundedReceiver<Response>) {
        let service = VerificationService::new(&ServerConfig::default()).unwrap();
        let (tx, rx) = mpsc::unbounded_channel();
        (Dispatcher::new(service, tx), rx)
    }

    async fn drain(mut rx: mpsc::UnboundedReceiver<Response>) -> Vec<Response> {
        let mut out = Vec::new();
        while let Some(reply) = rx.recv().await {
            out.push(reply);
        }
        out
    }

    #[tokio::test]
    async fn test_open_then_close_in_order() {
        let (mut dispatcher, rx) = dispatcher();
        dispatcher.dispatch_line(r#"{"cmd":"open_session","session_id":"a","seed":1}"#);
        dispatcher.dispatch_line(r#"{"cmd":"close_session","session_id":"a"}"#);
        assert_eq!(dispatcher.lane_count(), 0);
        dispatcher.shutdown().await;

        assert_eq!(
            drain(rx).await,
            vec![
                Response::SessionOpened {
                    session_id: "a".into()
                },
                Response::SessionClosed {
                    session_id: "a".into(),
                    segments_accepted: 0,
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_bad_line_answered_without_lane() {
        let (mut dispatcher, rx) = dispatcher();
        dispatcher.dispatch_line("not json");
        dispatcher.dispatch_line(r#"{"cmd":"status"}"#);
        assert_eq!(dispatcher.lane_count(), 0);
        dispatcher.shutdown().await;

        let replies = drain(rx).await;
        assert_eq!(replies.len(), 2);
        assert!(matches!(replies[0], Response::Error { cmd: None, .. }));
        assert!(matches!(replies[1], Response::Status { .. }));
    }

    #[tokio::test]
    async fn test_closed_output_does_not_panic() {
        let (mut dispatcher, rx) = dispatcher();
        drop(rx);
        dispatcher.dispatch_line(r#"{"cmd":"open_session","session_id":"a","seed":1}"#);
        dispatcher.shutdown().await;
    }
}
