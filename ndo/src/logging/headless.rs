use super::Frontend;
use anyhow::Result;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
    fmt::{format::FmtSpan, Layer as FmtLayer},
    layer::SubscriberExt as _,
    EnvFilter, Registry,
};

/// Logs to stderr, keeping stdout for the outcome document.
pub(crate) struct HeadlessLogger {}

impl Frontend for HeadlessLogger {
    fn set_up(&mut self, options: &super::Options) -> Result<()> {
        let level = if options.verbose {
            LevelFilter::TRACE
        } else {
            LevelFilter::INFO
        };
        // RUST_LOG refines the default, e.g. RUST_LOG=ndo_core=debug
        let filter = EnvFilter::builder()
            .with_default_directive(level.into())
            .from_env_lossy();

        let span_events = if options.verbose {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        };

        let fmt_layer = FmtLayer::new()
            .with_writer(std::io::stderr)
            .with_span_events(span_events)
            .with_ansi(options.color);
        let subscriber = Registry::default().with(filter).with(fmt_layer);

        tracing::subscriber::set_global_default(subscriber)
            .map_err(|e| anyhow::anyhow!("failed to set up tracing: {}", e))?;

        Ok(())
    }

    fn tear_down(&mut self) -> Result<()> {
        Ok(())
    }
}
