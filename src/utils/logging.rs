use tracing_subscriber::EnvFilter;

/// Build the filter used when `RUST_LOG` is not set
pub fn default_filter(level: &str) -> String {
    format!("yt_audio_converter={level},convert_cli={level},rocket=warn")
}

/// Install the global tracing subscriber. Repeated calls are no-ops.
pub fn init_tracing(level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter(level)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter() {
        assert_eq!(
            default_filter("debug"),
            "yt_audio_converter=debug,convert_cli=debug,rocket=warn"
        );
        init_tracing("info");
        init_tracing("info");
    }
}
