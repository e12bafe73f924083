// ABOUTME: Tracing subscriber setup for the chainer binary.
// ABOUTME: Diagnostics go to stderr so they never mix with the progress table on stdout.

use anyhow::Context as _;

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "warn";

/// Installs the global subscriber. `verbose` raises the default level.
pub fn init(verbose: bool) -> anyhow::Result<()> {
    let default = if verbose { "serial_chainer=debug,chainer=debug" } else { DEFAULT_FILTER };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(default))
        .context("build log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow::anyhow!("initialize tracing subscriber: {err}"))?;

    Ok(())
}
