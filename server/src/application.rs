//! Binary wiring (§4.10): `Application` owns the pipeline and the transport
//! adapter feeding it, and drives the accept-loop/shutdown/drain sequence
//! `dwctl::Application::serve` follows — race the listener against a
//! shutdown future, then stop accepting, then drain in-flight operations
//! before returning.

use std::sync::Arc;

use pel_pipeline::Pipeline;
use pel_router::Router;
use pel_transport::{channel_source, ReadyFlag, TcpAdapter};

use crate::config::Config;

pub struct Application {
    config: Config,
    pipeline: Arc<Pipeline>,
    adapter: Arc<TcpAdapter>,
    ready: ReadyFlag,
}

impl Application {
    /// Assemble the pipeline (router + load-shedder config from `config`)
    /// and wire a [`TcpAdapter`] to it over a channel source. Returns once
    /// the source is attached; nothing is listening on the network yet —
    /// that starts in [`Self::serve`].
    pub async fn new(config: Config, router: Router) -> anyhow::Result<Self> {
        let pipeline = Pipeline::builder().router(router).load_shedder(config.load_shedder.clone()).build();

        let high_water_mark = config.source.high_water_mark.unwrap_or(1024);
        let (source, handle) = channel_source("tcp", high_water_mark);
        pipeline.add_source(source).await;

        let ready = ReadyFlag::new();
        let adapter = Arc::new(TcpAdapter::new(handle, ready.clone(), config.request_timeout));

        Ok(Application { config, pipeline, adapter, ready })
    }

    pub fn pipeline(&self) -> &Arc<Pipeline> {
        &self.pipeline
    }

    pub fn ready_flag(&self) -> ReadyFlag {
        self.ready.clone()
    }

    /// Bind the configured address and accept connections until `shutdown`
    /// resolves, then stop the pipeline (resume if paused, wait for every
    /// in-flight operation to reach a terminal state) before returning.
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let addr: std::net::SocketAddr = self.config.bind_address().parse()?;
        tracing::info!(%addr, "pel-server listening");
        self.ready.set_ready(true);

        let adapter = Arc::clone(&self.adapter);
        let accept = tokio::spawn(async move { adapter.serve(addr).await });

        tokio::select! {
            result = accept => {
                self.ready.set_ready(false);
                match result {
                    Ok(Ok(())) => {}
                    Ok(Err(err)) => return Err(err.into()),
                    Err(err) => return Err(err.into()),
                }
            }
            _ = shutdown => {
                tracing::info!("shutdown signal received, draining in-flight operations");
                self.ready.set_ready(false);
            }
        }

        self.pipeline.stop().await;
        Ok(())
    }
}
