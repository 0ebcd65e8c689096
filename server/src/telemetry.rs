//! Telemetry initialization (§4.9): a `tracing-subscriber` formatting layer
//! plus `EnvFilter`, the same baseline `dwctl::telemetry::init_telemetry`
//! configures before it layers OpenTelemetry on top. No OTLP exporter is
//! implemented here — that's wire-protocol-adjacent infrastructure out of
//! this crate's scope — but `enable_otel_export` is kept as a parameter so
//! the config surface doesn't need to change if one is added later.

use tracing_subscriber::EnvFilter;

pub fn init_telemetry(enable_otel_export: bool) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt().with_env_filter(env_filter).try_init().map_err(|err| anyhow::anyhow!(err))?;

    if enable_otel_export {
        tracing::warn!("enable_otel_export is set but no OTLP exporter is built into this binary; continuing with console logging only");
    }

    Ok(())
}
