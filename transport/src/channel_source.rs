//! An [`OperationSource`] backed by a plain `mpsc` channel: the simplest
//! possible `{readable, transform chain, writable}` triple's `readable`
//! half (§4.4). Any wire-level accept loop (the TCP adapter in
//! [`crate::tcp`], or a test harness) pushes operations through the
//! [`ChannelSourceHandle`] it gets back from [`channel_source`]; closing
//! (dropping) every handle makes `recv` return `None`, tearing the source
//! down the way §4.4 describes.

use std::sync::Arc;

use async_trait::async_trait;
use pel_core::Operation;
use pel_pipeline::OperationSource;
use tokio::sync::mpsc;

pub struct ChannelSource {
    name: String,
    receiver: mpsc::Receiver<Arc<Operation>>,
}

#[async_trait]
impl OperationSource for ChannelSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn recv(&mut self) -> Option<Arc<Operation>> {
        self.receiver.recv().await
    }
}

/// The writable half: clone freely, one per connection/producer.
#[derive(Clone)]
pub struct ChannelSourceHandle(mpsc::Sender<Arc<Operation>>);

impl ChannelSourceHandle {
    pub async fn push(&self, operation: Arc<Operation>) -> Result<(), Arc<Operation>> {
        self.0.send(operation).await.map_err(|e| e.0)
    }
}

/// Build a source/handle pair with the given buffer depth (§6's per-source
/// `highWaterMark`): once the buffer is full, [`ChannelSourceHandle::push`]
/// suspends, which is how backpressure reaches whatever is producing
/// operations (the accept loop stops accepting new connections).
pub fn channel_source(name: impl Into<String>, high_water_mark: usize) -> (ChannelSource, ChannelSourceHandle) {
    let (tx, rx) = mpsc::channel(high_water_mark.max(1));
    (ChannelSource { name: name.into(), receiver: rx }, ChannelSourceHandle(tx))
}
