//! Log macro re-exports and the test logger

pub use log::{debug, error, info, trace, warn};

/// Initialize logging for tests, capturing output through the test harness
pub fn init_for_tests() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug"))
        .is_test(true)
        .try_init();
}
