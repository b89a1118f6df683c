//! Log output for runner binaries.
//!
//! Logs go to stderr so they never interleave with the test tree on stdout.
//! `RUST_LOG` wins over the level picked from the run configuration.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::RunConfig;

fn default_level(config: &RunConfig) -> &'static str {
    if config.verbose {
        "giwt=debug"
    } else {
        "giwt=warn"
    }
}

/// Installs the global subscriber; later calls are no-ops.
pub fn init(config: &RunConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level(config)));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(true)
        .without_time();

    if tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .is_err()
    {
        tracing::debug!("a global subscriber is already installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_raises_the_default_level() {
        let verbose = RunConfig {
            verbose: true,
            ..RunConfig::default()
        };
        assert_eq!(default_level(&verbose), "giwt=debug");
        assert_eq!(default_level(&RunConfig::default()), "giwt=warn");
    }

    #[test]
    fn init_twice_does_not_panic() {
        init(&RunConfig::default());
        init(&RunConfig::default());
    }
}
