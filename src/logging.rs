use anyhow::Context as _;
use tracing_subscriber::EnvFilter;

/// Used when `RUST_LOG` is unset: our own events at info, dependencies at warn.
const DEFAULT_DIRECTIVES: &str = "warn,sitecatalog=info";

/// Builds the filter from `directives`, falling back to [`DEFAULT_DIRECTIVES`]
/// when they are absent or blank.
pub fn filter(directives: Option<&str>) -> anyhow::Result<EnvFilter> {
    let directives = directives
        .map(str::trim)
        .filter(|directives| !directives.is_empty())
        .unwrap_or(DEFAULT_DIRECTIVES);
    EnvFilter::try_new(directives)
        .with_context(|| format!("parse log directives {directives:?}"))
}

/// Logs go to stderr so stdout stays a clean stream of JSON lines.
pub fn init() -> anyhow::Result<()> {
    let from_env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = filter(from_env.as_deref()).context("build log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow::anyhow!("initialize tracing subscriber: {err}"))?;

    Ok(())
}
