use env_logger::Env;

pub mod config;
pub mod filter;
pub mod render;
pub mod sampler;
pub mod stats;

/// Initializes the global logger.
///
/// Call this first!
///
/// The samples are written to stdout and the logs to stderr. The default level is `warn`,
/// use the `RUST_LOG` environment variable to see more.
pub fn init_logger() {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

    // Print a warning if we are running in debug mode.
    #[cfg(debug_assertions)]
    {
        log::warn!("DEBUG assertions are enabled, this build of iocost-monitor is fine for debugging, but not for production.");
    }
}
