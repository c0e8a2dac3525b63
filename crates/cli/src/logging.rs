//! Logging setup for the CLI
//!
//! `RUST_LOG` takes precedence, then the filter from the config file or
//! `--verbose`, then `warn`. Logs go to stderr so stdout stays clean for
//! manifest output.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub fn init_logging(filter: Option<&str>) {
    let env_filter = match (std::env::var("RUST_LOG"), filter) {
        (Ok(_), _) => EnvFilter::from_default_env(),
        (Err(_), Some(f)) => EnvFilter::new(f),
        (Err(_), None) => EnvFilter::new("warn"),
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_ansi(std::env::var("NO_COLOR").is_err()),
        )
        .with(env_filter)
        .init();
}
