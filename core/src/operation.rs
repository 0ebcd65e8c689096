//! The per-request state machine. One [`Operation`] owns one [`HttpRequest`]
//! and at most one [`HttpResponse`]; every transition is funneled through
//! [`Operation::transition`], which is the single place the permitted-from
//! table of the transition contract is enforced.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::{Duration, Instant};

use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::Span;
use uuid::Uuid;

use crate::errors::Error;
use crate::http::{HttpRequest, HttpResponse};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationState {
    Queued,
    Reading,
    Processing,
    Writing,
    Completed,
    Aborted,
    Timeout,
}

impl OperationState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OperationState::Completed | OperationState::Aborted | OperationState::Timeout
        )
    }
}

/// Observable lifecycle events. Subscribers register via
/// [`Operation::subscribe`] and receive a best-effort broadcast; a lagging
/// subscriber misses old events rather than stalling the operation.
/// `finished` is additionally surfaced as an awaitable future via
/// [`Operation::await_finished`], since the pipeline and transport both
/// need to block on it rather than just observe it.
#[derive(Debug, Clone)]
pub enum OperationEvent {
    Changed { previous: OperationState },
    Started,
    Finished,
    Response,
    Error(Error),
}

struct Inner {
    state: OperationState,
    response: Option<Arc<HttpResponse>>,
    error: Option<Error>,
    started_at: Instant,
    duration: Option<Duration>,
    timeout_handle: Option<JoinHandle<()>>,
    finished_waiters: VecDeque<oneshot::Sender<()>>,
}

pub struct Operation {
    id: Uuid,
    request: HttpRequest,
    cancellation: CancellationToken,
    span: Span,
    inner: StdMutex<Inner>,
    events: broadcast::Sender<OperationEvent>,
}

const EVENT_CHANNEL_CAPACITY: usize = 64;

impl Operation {
    pub fn new(request: HttpRequest) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let span = tracing::info_span!("operation", id = %request.id, method = %request.method);
        Arc::new(Operation {
            id: request.id,
            request,
            cancellation: CancellationToken::new(),
            span,
            inner: StdMutex::new(Inner {
                state: OperationState::Queued,
                response: None,
                error: None,
                started_at: Instant::now(),
                duration: None,
                timeout_handle: None,
                finished_waiters: VecDeque::new(),
            }),
            events,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn request(&self) -> &HttpRequest {
        &self.request
    }

    pub fn state(&self) -> OperationState {
        self.inner.lock().unwrap().state
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn duration(&self) -> Option<Duration> {
        self.inner.lock().unwrap().duration
    }

    pub fn response(&self) -> Option<Arc<HttpResponse>> {
        self.inner.lock().unwrap().response.clone()
    }

    pub fn error(&self) -> Option<Error> {
        self.inner.lock().unwrap().error.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OperationEvent> {
        self.events.subscribe()
    }

    /// Resolves once the operation reaches a terminal state; resolves
    /// immediately if it already has.
    pub async fn await_finished(&self) {
        let rx = {
            let mut inner = self.inner.lock().unwrap();
            if inner.state.is_terminal() {
                return;
            }
            let (tx, rx) = oneshot::channel();
            inner.finished_waiters.push_back(tx);
            rx
        };
        let _ = rx.await;
    }

    /// Arm (or re-arm) the total-deadline timer: if no terminal state is
    /// reached within `duration`, the operation fails with
    /// [`Error::timeout`]. Requires an owned `Arc` since the timer task
    /// outlives this call and must hold its own reference.
    pub fn arm_timeout(self: &Arc<Self>, duration: Duration) {
        let op = Arc::clone(self);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            op.fail(Some(Error::timeout()));
        });
        let mut inner = self.inner.lock().unwrap();
        if let Some(old) = inner.timeout_handle.replace(handle) {
            old.abort();
        }
    }

    /// QUEUED → READING. If the request has no body, advance straight to
    /// PROCESSING; otherwise arm a one-shot hook that calls
    /// [`Self::mark_body_drained`] once whatever ends up reading the
    /// request body (a handler, or the pipeline's own post-handler drain)
    /// runs it to completion.
    pub fn dequeue(self: &Arc<Self>) -> bool {
        if !self.transition(OperationState::Reading) {
            return false;
        }
        match self.request.body.as_ref() {
            None => {
                self.transition(OperationState::Processing);
            }
            Some(_) => self.arm_body_drained_hook(),
        }
        true
    }

    /// Spawn the task `dequeue` arms when the request carries a body:
    /// waits for that body's stream to be fully consumed, then advances
    /// READING → PROCESSING. A no-op if the operation has already left
    /// READING by some other path (e.g. failed/timed out while still
    /// waiting on the body).
    fn arm_body_drained_hook(self: &Arc<Self>) {
        let op = Arc::clone(self);
        tokio::spawn(async move {
            // `dequeue` only calls this when `request.body` is `Some`.
            op.request.body.as_ref().unwrap().wait_consumed().await;
            op.mark_body_drained();
        });
    }

    /// Called by whatever consumed the request body stream to completion;
    /// advances READING → PROCESSING. Exposed directly so a caller that
    /// already knows it just drained the body (e.g. the HANDLER stage)
    /// doesn't need to wait a task-spawn round-trip for the hook armed by
    /// [`Self::dequeue`] to catch up; idempotent alongside it since a
    /// second call once already in PROCESSING is just a rejected
    /// transition.
    pub fn mark_body_drained(&self) -> bool {
        self.transition(OperationState::Processing)
    }

    /// Called by the transport once it has finished streaming a bound
    /// response's body to the wire; advances WRITING → COMPLETED. A
    /// response with no body never needs this — [`Self::complete`] already
    /// advances straight to COMPLETED for that case.
    pub fn mark_response_drained(&self) -> bool {
        self.transition(OperationState::Completed)
    }

    /// Bind `response` (rejecting a second call) and advance to WRITING,
    /// then straight to COMPLETED if the response carries no body.
    pub fn complete(&self, response: HttpResponse) -> bool {
        let has_body = response.body.is_some();
        let previous = {
            let mut inner = self.inner.lock().unwrap();
            if inner.response.is_some() {
                return false;
            }
            if !Self::permitted(OperationState::Writing, inner.state) {
                return false;
            }
            let previous = inner.state;
            inner.response = Some(Arc::new(response));
            inner.state = OperationState::Writing;
            previous
        };
        let _ = self.events.send(OperationEvent::Response);
        self.emit_changed(previous);
        if !has_body {
            self.transition(OperationState::Completed);
        }
        true
    }

    /// `cause` of kind TIMEOUT targets TIMEOUT; anything else (including
    /// no cause) targets ABORTED. Rejected outright once WRITING has
    /// started, per the no-tearing-a-partial-response rule.
    pub fn fail(&self, cause: Option<Error>) -> bool {
        let target = match &cause {
            Some(Error::Timeout { .. }) => OperationState::Timeout,
            _ => OperationState::Aborted,
        };
        let previous = {
            let mut inner = self.inner.lock().unwrap();
            if !Self::permitted(target, inner.state) {
                return false;
            }
            let previous = inner.state;
            inner.state = target;
            inner.duration = Some(inner.started_at.elapsed());
            inner.error = cause.clone();
            previous
        };
        self.cancel_timer();
        if let Some(cause) = cause {
            let _ = self.events.send(OperationEvent::Error(cause));
        }
        self.cancellation.cancel();
        self.emit_changed(previous);
        self.emit_finished();
        true
    }

    fn permitted(target: OperationState, current: OperationState) -> bool {
        use OperationState::*;
        match target {
            Reading => current == Queued,
            Processing => current == Reading,
            Writing => current == Processing,
            Completed => !current.is_terminal(),
            Aborted => !current.is_terminal() && current != Writing,
            Timeout => !current.is_terminal() && current != Writing,
            Queued => false,
        }
    }

    /// The generic transition mechanism shared by every move except
    /// `complete`'s response-binding step, which must be atomic with its
    /// own distinct precondition.
    fn transition(&self, target: OperationState) -> bool {
        let previous = {
            let mut inner = self.inner.lock().unwrap();
            if !Self::permitted(target, inner.state) {
                return false;
            }
            let previous = inner.state;
            inner.state = target;
            if target.is_terminal() {
                inner.duration = Some(inner.started_at.elapsed());
            }
            previous
        };
        if target.is_terminal() {
            self.cancel_timer();
        }
        self.emit_changed(previous);
        if target == OperationState::Reading {
            let _ = self.events.send(OperationEvent::Started);
        }
        if target.is_terminal() {
            self.emit_finished();
        }
        true
    }

    fn emit_changed(&self, previous: OperationState) {
        let _ = self.events.send(OperationEvent::Changed { previous });
    }

    fn emit_finished(&self) {
        let _ = self.events.send(OperationEvent::Finished);
        let mut inner = self.inner.lock().unwrap();
        for waiter in inner.finished_waiters.drain(..) {
            let _ = waiter.send(());
        }
    }

    fn cancel_timer(&self) {
        if let Some(handle) = self.inner.lock().unwrap().timeout_handle.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{Headers, HttpVersion, Method};

    fn request_without_body() -> HttpRequest {
        HttpRequest::new(
            Uuid::new_v4(),
            Method::Get,
            "/hello",
            Headers::new(),
            HttpVersion::Http2,
            None,
        )
    }

    fn request_with_body() -> HttpRequest {
        let body = crate::http::HttpBody::from_bytes(crate::http::MediaType::json(), "[{\"hello\":\"world\"}]");
        HttpRequest::new(
            Uuid::new_v4(),
            Method::Post,
            "/upload",
            Headers::new(),
            HttpVersion::Http2,
            Some(body),
        )
    }

    #[tokio::test]
    async fn happy_path_without_body_reaches_processing_in_one_dequeue() {
        let op = Operation::new(request_without_body());
        assert!(op.dequeue());
        assert_eq!(op.state(), OperationState::Processing);
    }

    #[tokio::test]
    async fn dequeue_with_body_stays_in_reading_until_the_body_is_drained() {
        let op = Operation::new(request_with_body());
        assert!(op.dequeue());
        assert_eq!(op.state(), OperationState::Reading);

        op.request().body.as_ref().unwrap().drain().await;
        // The hook runs on its own spawned task; give it a turn.
        tokio::time::timeout(Duration::from_millis(100), async {
            while op.state() != OperationState::Processing {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("dequeue's body-drained hook should advance to PROCESSING");
    }

    #[tokio::test]
    async fn mark_body_drained_advances_a_body_bearing_operation_to_processing() {
        let op = Operation::new(request_with_body());
        op.dequeue();
        assert_eq!(op.state(), OperationState::Reading);
        assert!(op.mark_body_drained());
        assert_eq!(op.state(), OperationState::Processing);
    }

    #[tokio::test]
    async fn body_bearing_request_reaches_completed_after_drain_and_complete() {
        // Mirrors the literal scenario: POST /upload with a JSON body,
        // handler responds 202; the response must still bind once the
        // body has been drained (regression test for the hang where
        // COMPLETE's `operation.complete` was rejected because the
        // operation was stuck in READING).
        let op = Operation::new(request_with_body());
        op.dequeue();
        op.request().body.as_ref().unwrap().drain().await;
        op.mark_body_drained();
        assert_eq!(op.state(), OperationState::Processing);

        let response = HttpResponse::new(crate::http::StatusCode(202));
        assert!(op.complete(response));
        assert_eq!(op.state(), OperationState::Completed);
    }

    #[tokio::test]
    async fn complete_without_body_goes_straight_to_completed() {
        let op = Operation::new(request_without_body());
        op.dequeue();
        let response = HttpResponse::new(crate::http::StatusCode::OK);
        assert!(op.complete(response));
        assert_eq!(op.state(), OperationState::Completed);
        assert!(op.duration().is_some());
    }

    #[tokio::test]
    async fn second_complete_call_is_rejected() {
        let op = Operation::new(request_without_body());
        op.dequeue();
        assert!(op.complete(HttpResponse::new(crate::http::StatusCode::OK)));
        assert!(!op.complete(HttpResponse::new(crate::http::StatusCode::OK)));
    }

    #[tokio::test]
    async fn fail_is_rejected_once_writing_has_started() {
        let op = Operation::new(request_without_body());
        op.dequeue();
        let body = crate::http::HttpBody::from_bytes(crate::http::MediaType::json(), "{}");
        op.complete(HttpResponse::new(crate::http::StatusCode::OK).with_body(body));
        assert_eq!(op.state(), OperationState::Writing);
        assert!(!op.fail(None));
        assert_eq!(op.state(), OperationState::Writing);
    }

    #[tokio::test]
    async fn response_with_body_completes_only_after_drained() {
        let op = Operation::new(request_without_body());
        op.dequeue();
        let body = crate::http::HttpBody::from_bytes(crate::http::MediaType::json(), "{}");
        op.complete(HttpResponse::new(crate::http::StatusCode::OK).with_body(body));
        assert_eq!(op.state(), OperationState::Writing);
        assert!(op.mark_response_drained());
        assert_eq!(op.state(), OperationState::Completed);
    }

    #[tokio::test]
    async fn fail_with_timeout_cause_targets_timeout_state() {
        let op = Operation::new(request_without_body());
        op.dequeue();
        assert!(op.fail(Some(Error::timeout())));
        assert_eq!(op.state(), OperationState::Timeout);
        assert!(matches!(op.error(), Some(Error::Timeout { .. })));
    }

    #[tokio::test]
    async fn invalid_transition_is_a_no_op() {
        let op = Operation::new(request_without_body());
        // Still QUEUED: PROCESSING is not reachable directly.
        assert!(!op.mark_body_drained());
        assert_eq!(op.state(), OperationState::Queued);
    }

    #[tokio::test]
    async fn await_finished_resolves_after_terminal_transition() {
        let op = Operation::new(request_without_body());
        op.dequeue();
        let waiter = tokio::spawn({
            let op = Arc::clone(&op);
            async move {
                op.await_finished().await;
            }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!waiter.is_finished());
        op.fail(None);
        tokio::time::timeout(Duration::from_millis(100), waiter)
            .await
            .expect("await_finished should resolve promptly")
            .unwrap();
    }

    #[tokio::test]
    async fn timeout_timer_fires_fail_after_duration_elapses() {
        let op = Operation::new(request_without_body());
        op.dequeue();
        op.arm_timeout(Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(op.state(), OperationState::Timeout);
    }

    #[tokio::test]
    async fn started_event_fires_exactly_once_on_leaving_queued() {
        let op = Operation::new(request_without_body());
        let mut rx = op.subscribe();
        op.dequeue();
        let mut started_count = 0;
        while let Ok(event) = rx.try_recv() {
            if matches!(event, OperationEvent::Started) {
                started_count += 1;
            }
        }
        assert_eq!(started_count, 1);
    }
}
