//! Logging setup for the `sheaf` binary.
//!
//! Library crates only emit `tracing` events; this installs the subscriber.
//!
//! Level precedence: `--verbose` (debug), then `--quiet` (errors only), then
//! `RUST_LOG`, then info for the sheaf crates.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const CRATES: [&str; 5] = ["sheaf", "sheaf_cli", "sheaf_bundler", "sheaf_graph", "sheaf_config"];

/// Filter directives for every sheaf crate at `level`.
pub fn directives(level: &str) -> String {
    CRATES
        .iter()
        .map(|krate| format!("{krate}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Install the global subscriber. Call once, before anything logs.
pub fn init_logger(verbose: bool, quiet: bool, no_color: bool) {
    let filter = if verbose {
        EnvFilter::new(directives("debug"))
    } else if quiet {
        EnvFilter::new(directives("error"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives("info")))
    };

    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_ansi(!no_color && should_use_colors())
        .compact();

    // A second call (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}

/// `NO_COLOR` wins over `FORCE_COLOR`; otherwise ask the terminal.
pub fn should_use_colors() -> bool {
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    if std::env::var_os("FORCE_COLOR").is_some() {
        return true;
    }
    console::Term::stderr().features().colors_supported()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directives_cover_every_crate() {
        let text = directives("debug");
        for krate in CRATES {
            assert!(text.contains(&format!("{krate}=debug")), "{text}");
        }
        assert!(EnvFilter::try_new(text).is_ok());
    }

    #[test]
    fn repeated_init_does_not_panic() {
        init_logger(false, true, true);
        init_logger(true, false, true);
    }
}
