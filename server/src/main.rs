//! Parses CLI args, loads config, initializes telemetry, builds the
//! `Application`, and serves until Ctrl+C — the same ordering
//! `dwctl`'s quick-start doc example follows.
//!
//! The router registered here is intentionally minimal: this binary is the
//! reference wiring for the framework, not a product. Embedders build their
//! own router and call [`pel_server::Application::new`] directly.

use clap::Parser;
use pel_core::http::{HttpResponse, StatusCode};
use pel_router::Router;
use pel_server::{Application, Args, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = Config::load(&args)?;

    if args.validate {
        println!("configuration OK");
        return Ok(());
    }

    pel_server::telemetry::init_telemetry(config.enable_otel_export)?;

    let mut builder = Router::builder();
    builder
        .add_handler("/", None, std::sync::Arc::new(|_op| Box::pin(async { Ok(HttpResponse::new(StatusCode::OK)) })))
        .expect("root route registration cannot conflict in a fresh router");
    let router = builder.build();

    let app = Application::new(config, router).await?;

    app.serve(async {
        tokio::signal::ctrl_c().await.expect("failed to listen for ctrl_c");
    })
    .await?;

    Ok(())
}
