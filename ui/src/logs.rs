//! Browser console logging.

use tracing_subscriber::{EnvFilter, prelude::*, util::TryInitError};
use tracing_web::MakeWebConsoleWriter;

/// Directives used unless the build sets `CAMPUZBUZZ_LOG`.
const DEFAULT_DIRECTIVES: &str = "warn,ui=debug,client=debug,payloads=info";

/// Route `tracing` output to the browser console. There is no process
/// environment in the browser, so the filter is fixed when the app is built.
pub fn init_logging() -> Result<(), TryInitError> {
    let directives =
        option_env!("CAMPUZBUZZ_LOG").unwrap_or(DEFAULT_DIRECTIVES);
    let env_filter = EnvFilter::try_new(directives)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));

    // Browsers have no std::time and render ANSI colours inconsistently.
    let console = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .without_time()
        .with_target(true)
        .with_writer(MakeWebConsoleWriter::new().with_pretty_level())
        .with_level(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console)
        .try_init()?;
    tracing::debug!(directives, "console logging ready");
    Ok(())
}
