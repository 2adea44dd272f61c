//! Shared setup for the integration tests.

/// Install a test logger at `Trace` so every `trace!`/`debug!` call site is
/// formatted while the tests run. Safe to call from every test.
pub fn setup() {
    let _ = env_logger::builder()
        .is_test(true)
        .filter_level(log::LevelFilter::Trace)
        .try_init();
}
