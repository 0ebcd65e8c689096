use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::stream::BoxStream;
use futures::{Stream, StreamExt};
use tokio::sync::{Mutex as AsyncMutex, Notify};

use super::media_type::MediaType;

/// A chunk of body data, or an I/O-level failure while streaming it.
pub type BodyChunk = Result<Bytes, std::io::Error>;
pub type BodyStream = BoxStream<'static, BodyChunk>;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BodyError {
    #[error("body stream has already been consumed")]
    AlreadyConsumed,
}

/// The "has this body's stream run out yet" signal, shared between the
/// [`HttpBody`] and the [`NotifyOnEnd`] wrapper around whatever stream it
/// hands out. A plain `Notify` would lose the event if `wait_consumed` is
/// called after the stream already ended (no waiter registered yet to
/// wake); the flag makes that race safe to check-then-await.
#[derive(Default)]
struct ConsumedSignal {
    done: AtomicBool,
    notify: Notify,
}

impl ConsumedSignal {
    fn mark_done(&self) {
        self.done.store(true, Ordering::Release);
        self.notify.notify_waiters();
    }

    async fn wait(&self) {
        if self.done.load(Ordering::Acquire) {
            return;
        }
        let notified = self.notify.notified();
        if self.done.load(Ordering::Acquire) {
            return;
        }
        notified.await;
    }
}

/// A request or response body: a declared media type plus a lazy,
/// single-consumer byte stream.
///
/// The stream can only be taken (or drained) once; a second attempt is a
/// programmer error surfaced as [`BodyError::AlreadyConsumed`] rather than
/// a panic, since pipeline stages run as ordinary fallible transforms.
pub struct HttpBody {
    media_type: MediaType,
    stream: AsyncMutex<Option<BodyStream>>,
    /// Fired once the stream taken via [`Self::take_stream`] runs out,
    /// regardless of who's reading it (`collect`, `drain`, or a handler
    /// consuming it directly) — the signal `Operation::dequeue`'s
    /// one-shot hook waits on to advance READING -> PROCESSING.
    consumed: Arc<ConsumedSignal>,
}

impl HttpBody {
    pub fn new(media_type: MediaType, stream: BodyStream) -> Self {
        Self {
            media_type,
            stream: AsyncMutex::new(Some(stream)),
            consumed: Arc::new(ConsumedSignal::default()),
        }
    }

    /// Wrap a single, already-available chunk as a one-shot body.
    pub fn from_bytes(media_type: MediaType, bytes: impl Into<Bytes>) -> Self {
        let bytes = bytes.into();
        let stream = futures::stream::once(async move { Ok(bytes) }).boxed();
        Self::new(media_type, stream)
    }

    pub fn media_type(&self) -> &MediaType {
        &self.media_type
    }

    /// Take ownership of the underlying stream for manual consumption.
    /// Returns [`BodyError::AlreadyConsumed`] if called more than once.
    /// The returned stream notifies [`Self::wait_consumed`]'s waiters once
    /// it yields its last item, however far the caller reads into it.
    pub async fn take_stream(&self) -> Result<BodyStream, BodyError> {
        let inner = self.stream.lock().await.take().ok_or(BodyError::AlreadyConsumed)?;
        Ok(NotifyOnEnd { inner, signal: self.consumed.clone() }.boxed())
    }

    /// Resolves once the body's stream has been taken and run to
    /// completion by whichever consumer ended up reading it.
    pub async fn wait_consumed(&self) {
        self.consumed.wait().await
    }

    /// Consume the entire stream and return the concatenated bytes. Used
    /// when a handler wants the whole body materialized (e.g. JSON).
    pub async fn collect(&self) -> Result<Bytes, BodyError> {
        let mut stream = self.take_stream().await?;
        let mut buf = Vec::new();
        while let Some(chunk) = stream.next().await {
            match chunk {
                Ok(bytes) => buf.extend_from_slice(&bytes),
                Err(_) => break,
            }
        }
        Ok(Bytes::from(buf))
    }

    /// Drain the stream without retaining its contents, e.g. to release
    /// the transport's underlying connection when a handler never reads
    /// the body. A no-op if already consumed.
    pub async fn drain(&self) {
        if let Ok(mut stream) = self.take_stream().await {
            while stream.next().await.is_some() {}
        }
    }
}

/// Wraps the stream handed out by [`HttpBody::take_stream`] so that, no
/// matter how far the caller actually reads (full drain, partial read then
/// drop, or a break on a mid-stream error), the `consumed` signal fires
/// exactly once the wrapper itself goes away — `Drop` is what makes this
/// reliable; relying only on observing `Poll::Ready(None)` would miss the
/// partial-read and error-abort cases.
struct NotifyOnEnd {
    inner: BodyStream,
    signal: Arc<ConsumedSignal>,
}

impl Stream for NotifyOnEnd {
    type Item = BodyChunk;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}

impl Drop for NotifyOnEnd {
    fn drop(&mut self) {
        self.signal.mark_done();
    }
}
