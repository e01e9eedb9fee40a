// Tracing subscriber setup
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_FILTER: &str = "darkness_monitor=info,tower_http=debug";

/// Install the global subscriber. `RUST_LOG` overrides the default filter.
pub fn init_logging() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(false))
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_traces_http_requests() {
        let filter = EnvFilter::try_new(DEFAULT_FILTER).unwrap();
        let directives = filter.to_string();
        assert!(directives.contains("darkness_monitor=info"));
        // TraceLayer emits its request/response spans at debug
        assert!(directives.contains("tower_http=debug"));
    }
}
