//! Structured logging from the configuration's level list. One explicit
//! subscriber, initialized by the binary; nothing global gets patched.

use tracing_subscriber::EnvFilter;

/// Initialize the process-wide subscriber. The most verbose configured
/// level wins; `RUST_LOG` overrides when set. Calling twice is harmless.
pub fn init(log_levels: &[String]) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(most_verbose(log_levels)));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn most_verbose(levels: &[String]) -> &'static str {
    const ORDER: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
    for candidate in ORDER {
        if levels.iter().any(|level| level.eq_ignore_ascii_case(candidate)) {
            return candidate;
        }
    }
    "info"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn most_verbose_level_wins() {
        assert_eq!(most_verbose(&["error".into(), "debug".into()]), "debug");
        assert_eq!(most_verbose(&["WARN".into()]), "warn");
        assert_eq!(most_verbose(&[]), "info");
    }
}
