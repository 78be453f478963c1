//! Tracing setup for the CLI.
//!
//! Log lines go to stderr so that `--json` output on stdout stays parseable
//! when piped. Only this crate's events are shown unless `RUST_LOG` says
//! otherwise; set `RUST_LOG=deploychart=debug,reqwest=debug` to see the
//! HTTP traffic of a chart run as well.

use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// How chatty the CLI is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Errors only.
    Quiet,
    /// Progress of each run: records fetched, devices probed, map written.
    #[default]
    Normal,
    /// Per-device probe results and request details.
    Verbose,
    /// Everything.
    Trace,
}

impl Verbosity {
    /// Verbosity for a `-q` flag and a count of `-v` flags. `-q` wins.
    #[must_use]
    pub fn from_flags(verbose: u8, quiet: bool) -> Self {
        match (quiet, verbose) {
            (true, _) => Self::Quiet,
            (false, 0) => Self::Normal,
            (false, 1) => Self::Verbose,
            (false, _) => Self::Trace,
        }
    }

    /// Most detailed level shown.
    #[must_use]
    pub fn to_level_filter(&self) -> Level {
        match self {
            Self::Quiet => Level::ERROR,
            Self::Normal => Level::INFO,
            Self::Verbose => Level::DEBUG,
            Self::Trace => Level::TRACE,
        }
    }

    fn directives(self) -> String {
        format!("{}={}", env!("CARGO_CRATE_NAME"), self.to_level_filter())
    }
}

/// Install the global subscriber. `RUST_LOG`, when set, replaces the
/// verbosity. Later calls are no-ops.
///
/// ```no_run
/// use deploychart::{init_logging, logging::Verbosity};
///
/// init_logging(Verbosity::from_flags(1, false));
/// ```
pub fn init_logging(verbosity: Verbosity) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.directives()));

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(verbosity != Verbosity::Normal),
        )
        .try_init();
}

/// Warnings and errors only, captured per test.
#[cfg(test)]
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_flags() {
        assert_eq!(Verbosity::from_flags(0, false), Verbosity::Normal);
        assert_eq!(Verbosity::from_flags(1, false), Verbosity::Verbose);
        assert_eq!(Verbosity::from_flags(5, false), Verbosity::Trace);
        assert_eq!(Verbosity::from_flags(2, true), Verbosity::Quiet);
    }

    #[test]
    fn test_directives_name_this_crate() {
        assert_eq!(Verbosity::Normal.directives(), "deploychart=INFO");
        assert_eq!(Verbosity::Quiet.directives(), "deploychart=ERROR");
        assert!(EnvFilter::try_new(Verbosity::Trace.directives()).is_ok());
    }

    #[test]
    fn test_init_logging_twice() {
        init_logging(Verbosity::Verbose);
        init_logging(Verbosity::Quiet);
        init_test_logging();
    }
}
