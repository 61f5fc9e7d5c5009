//! Logging setup and helpers.
//!
//! The crate logs through the `log` facade; binaries and tests can call
//! `init_logger` to route output through `env_logger`.

/// Initialize the global logger from the `RUST_LOG` environment variable
///
/// Safe to call more than once; repeated initialization is ignored.
pub fn init_logger() {
    let _ = env_logger::Builder::from_default_env()
        .format_timestamp_millis()
        .try_init();
}

/// Log a batch-level summary after a pipeline run
pub fn log_batch_summary(stage: &str, total: usize, kept: usize) {
    let dropped = total - kept;
    if dropped > 0 {
        log::warn!("{stage}: kept {kept}/{total} records ({dropped} dropped)");
    } else {
        log::info!("{stage}: processed {total} records");
    }
}
