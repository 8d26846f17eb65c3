use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber. JSON lines unless `log_format` is `pretty`.
/// `RUST_LOG` overrides the default `info` filter.
pub fn init_tracing(log_format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let result = if log_format.eq_ignore_ascii_case("pretty") {
        fmt().with_env_filter(filter).pretty().try_init()
    } else {
        fmt()
            .with_env_filter(filter)
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .with_span_list(true)
            .try_init()
    };

    // already installed (tests, embedding binaries)
    let _ = result;
}
