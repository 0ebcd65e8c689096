//! The client-side mirror of [`pel_core::OperationState`] (§4.7): an
//! outbound request moves `QUEUED → WRITING → PROCESSING → READING →
//! COMPLETED`, with ABORTED/TIMEOUT as the terminal failure states. Unlike
//! the server-side machine, there is no separate transport to hand a bound
//! response to — the same call that drives the transition also carries the
//! response value out, so this type stays internal to [`crate::submit`].

use std::sync::Mutex as StdMutex;

use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientOperationState {
    Queued,
    Writing,
    Processing,
    Reading,
    Completed,
    Aborted,
    Timeout,
}

impl ClientOperationState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ClientOperationState::Completed | ClientOperationState::Aborted | ClientOperationState::Timeout
        )
    }
}

pub(crate) struct ClientOperation {
    id: Uuid,
    state: StdMutex<ClientOperationState>,
}

impl ClientOperation {
    pub(crate) fn new(id: Uuid) -> Self {
        ClientOperation { id, state: StdMutex::new(ClientOperationState::Queued) }
    }

    pub(crate) fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> ClientOperationState {
        *self.state.lock().unwrap()
    }

    /// Drive a forward (non-failure) transition. No-op (returns `false`) if
    /// `target` isn't reachable from the current state.
    pub(crate) fn advance(&self, target: ClientOperationState) -> bool {
        use ClientOperationState::*;
        let mut state = self.state.lock().unwrap();
        let permitted = matches!(
            (*state, target),
            (Queued, Writing) | (Writing, Processing) | (Processing, Reading) | (Reading, Completed)
        );
        if !permitted {
            return false;
        }
        tracing::debug!(request_id = %self.id, from = ?*state, to = ?target, "client operation transition");
        *state = target;
        true
    }

    /// A failure cuts the operation short from wherever it is. Timeout
    /// while still QUEUED (the request was never sent) targets TIMEOUT
    /// directly, matching the server-side convention that an expired timer
    /// names itself; once a write, send, or read is in flight there's
    /// in-progress work to tear down, so a timeout there — like an explicit
    /// abort — surfaces as ABORTED instead.
    pub(crate) fn fail(&self, timed_out: bool) -> ClientOperationState {
        let mut state = self.state.lock().unwrap();
        if state.is_terminal() {
            return *state;
        }
        let target = if timed_out && *state == ClientOperationState::Queued {
            ClientOperationState::Timeout
        } else {
            ClientOperationState::Aborted
        };
        tracing::debug!(request_id = %self.id, from = ?*state, to = ?target, "client operation failed");
        *state = target;
        target
    }
}
