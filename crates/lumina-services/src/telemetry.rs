use tracing_subscriber::{
    fmt::format::Format, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

/// Initialize tracing with a compact console format. The filter comes from
/// `RUST_LOG` when set.
pub fn init_telemetry() -> Result<(), Box<dyn std::error::Error>> {
    let console_fmt = tracing_subscriber::fmt::layer().event_format(
        Format::default()
            .compact()
            .with_target(false)
            .without_time(),
    );
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "lumina=debug".into()))
        .with(console_fmt)
        .try_init()?;
    Ok(())
}
