//! Logger setup for binaries
//!
//! The library only emits through the `log` facade; installing a logger is
//! left to the executable.

use log::LevelFilter;

/// Install `env_logger` at `info`, overridable through `RUST_LOG`
pub fn init() {
    init_with_level(LevelFilter::Info);
}

/// Install `env_logger` with a custom default level
///
/// `RUST_LOG`, when set, takes precedence over `level`. Calling this twice
/// is harmless; the second call is ignored.
pub fn init_with_level(level: LevelFilter) {
    let env = env_logger::Env::default().default_filter_or(level.as_str());
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp_millis()
        .try_init();
}
