//! Client-side operation mirror (§4.7): wraps an outbound [`RawTransport`]
//! send in the same kind of state machine [`pel_core::Operation`] drives
//! server-side, so a caller observes the same three failure shapes
//! (ABORTED, TIMEOUT, UNKNOWN) regardless of which side of the wire it's
//! on. Grounded in `fusillade::request::transitions::Request<Processing>::
//! complete`'s spawn-a-task-and-await-a-channel shape, adapted to a single
//! `submit` call rather than a persisted, resumable request record (there
//! is no storage layer to persist against here — the whole point of the
//! client side is that it's transient).

mod operation;
mod transport;

pub use operation::ClientOperationState;
pub use transport::RawTransport;

use std::time::Duration;

use pel_core::errors::Error;
use pel_core::http::{HttpRequest, HttpResponse};

use operation::ClientOperation;

/// Send `request` over `transport`, enforcing `timeout` as the total
/// deadline from submission to response. Mirrors spec.md §4.7's
/// `submit(request, timeout)`.
///
/// - `Ok(response)` once the transport returns a response within the
///   deadline.
/// - `Err(Error::Timeout)` if `timeout` elapses before the request is even
///   sent.
/// - `Err(Error::Aborted)` if `timeout` elapses after sending has started,
///   or `transport.send` itself fails.
#[tracing::instrument(skip(transport, request), fields(request_id = %request.id, method = %request.method))]
pub async fn submit<T: RawTransport>(
    transport: &T,
    request: HttpRequest,
    timeout: Duration,
) -> Result<HttpResponse, Error> {
    let op = ClientOperation::new(request.id);

    let send = async {
        op.advance(ClientOperationState::Writing);
        op.advance(ClientOperationState::Processing);
        let result = transport.send(request).await;
        op.advance(ClientOperationState::Reading);
        result
    };

    match tokio::time::timeout(timeout, send).await {
        Ok(Ok(response)) => {
            op.advance(ClientOperationState::Completed);
            Ok(response)
        }
        Ok(Err(err)) => {
            op.fail(false);
            Err(err)
        }
        Err(_) => {
            let state = op.fail(true);
            tracing::warn!(request_id = %op.id(), ?state, "client submit timed out");
            Err(match state {
                ClientOperationState::Timeout => Error::timeout(),
                _ => Error::aborted("request timed out in flight"),
            })
        }
    }
}
