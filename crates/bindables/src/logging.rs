#![forbid(unsafe_code)]

//! Logging setup.
//!
//! The crate logs through `tracing` unconditionally:
//!
//! | Level | Event |
//! |-------|-------|
//! | `debug` span `bindable.set` | one per wave (`origin`, `guard`) |
//! | `trace` | each propagation step (`id`, `depth`, `peers`) |
//! | `debug` | dead links pruned during a step |
//! | `warn` | first step of a wave skipped by the depth limit |
//!
//! Applications install their own subscriber. With the `tracing-json`
//! feature, [`init_json_logging`] installs a JSON one filtered by `RUST_LOG`.

/// Install a JSON subscriber honoring `RUST_LOG`.
///
/// Returns `false` if a global subscriber was already set.
#[cfg(feature = "tracing-json")]
pub fn init_json_logging() -> bool {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init()
        .is_ok()
}
