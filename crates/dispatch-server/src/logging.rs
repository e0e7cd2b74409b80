use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str =
    "dispatch_server=info,dispatch_core=info,dispatch_domains=info,dispatch_agent=info,tower_http=debug";

fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into())
}

/// Install the global subscriber. `format` is `"json"` for one JSON object
/// per line; anything else gives the human-readable formatter.
pub(crate) fn init(format: &str) {
    let builder = tracing_subscriber::fmt().with_env_filter(filter());
    if format.eq_ignore_ascii_case("json") {
        builder.json().init();
    } else {
        builder.init();
    }
}
