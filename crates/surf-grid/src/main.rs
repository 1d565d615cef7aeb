use anyhow::{Context, Result};
use std::path::PathBuf;
use surf_grid::app::{load_config, run_detection};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

fn main() -> Result<()> {
    let config: PathBuf = std::env::args()
        .nth(1)
        .context("usage: surf-grid <config.json>")?
        .into();

    let cfg = load_config(&config)?;
    init_tracing(cfg.log_level.as_deref())?;

    let dump = run_detection(cfg)?;
    println!(
        "Detected {} keypoints in {}x{} image",
        dump.keypoints.len(),
        dump.width,
        dump.height
    );
    Ok(())
}

/// Config `log_level` wins over `RUST_LOG`; both fall back to `info`.
fn init_tracing(level: Option<&str>) -> Result<()> {
    let filter = match level {
        Some(directives) => EnvFilter::try_new(directives)
            .with_context(|| format!("invalid log_level '{directives}'"))?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(true);
    Registry::default().with(filter).with(fmt_layer).try_init()?;
    Ok(())
}
