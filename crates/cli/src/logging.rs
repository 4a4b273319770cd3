use tracing_subscriber::EnvFilter;

/// Filter directive for a `--logging-level` value
pub fn level_directive(level: Option<u8>) -> &'static str {
    match level {
        Some(1) => "debug",
        Some(2) => "warn",
        Some(3) => "error",
        _ => "info",
    }
}

/// Install the stderr subscriber. `RUST_LOG` wins over `level` when set.
/// Calling this twice keeps the first subscriber.
pub fn init(level: Option<u8>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_directive(level)));
    if let Err(e) = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
    {
        tracing::debug!("Logging already initialized: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_directive() {
        assert_eq!(level_directive(None), "info");
        assert_eq!(level_directive(Some(0)), "info");
        assert_eq!(level_directive(Some(1)), "debug");
        assert_eq!(level_directive(Some(2)), "warn");
        assert_eq!(level_directive(Some(3)), "error");
    }

    #[test]
    fn test_init_twice_keeps_first_subscriber() {
        init(Some(1));
        init(Some(3));
        tracing::debug!("still logging");
    }
}
