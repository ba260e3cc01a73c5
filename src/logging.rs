use log::LevelFilter;

/// Environment variable holding the log filter.
pub const LOG_ENV: &str = "PTE_DECODE_LOG";

/// Install an `env_logger` filtered by `PTE_DECODE_LOG`.
///
/// Defaults to errors only, with info messages from this crate. Calling it
/// twice is harmless.
pub fn init_logging() {
    let _ = env_logger::Builder::default()
        .filter_level(LevelFilter::Error)
        .parse_env(env_logger::Env::default().filter_or(LOG_ENV, "error,pte_decode=info"))
        .try_init();
}
