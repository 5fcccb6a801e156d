/// Logging initialization, called once at the start of `ChatApp::new()`.
///
/// The shells capture stderr during development; tests and desktop builds
/// get the same fmt subscriber. `RUST_LOG` overrides the default filter.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chirp_core=debug,info".into()),
        )
        .try_init();
}
