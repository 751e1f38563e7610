//! Test logging utilities.
//!
//! Library code emits `tracing` events; with the `log` feature enabled they are
//! forwarded to whatever `log` backend is installed, here `env_logger`.

use std::sync::Once;

static INIT: Once = Once::new();

const DEFAULT_FILTER: &str = "fixture_factory_core=warn";

/// Installs `env_logger` for fixture lifecycle output.
///
/// Safe to call from every test; only the first call installs the logger, in
/// test mode so output is captured per test. Without `RUST_LOG` only harness
/// warnings (failed teardowns, interrupted runs) are shown; set
/// `RUST_LOG=fixture_factory_core=debug` for every setup and teardown.
///
/// # Examples
///
/// ```
/// use fixture_factory_core::logging::init_test_logging;
///
/// init_test_logging();
/// init_test_logging();
/// ```
pub fn init_test_logging() {
	INIT.call_once(|| {
		let env = env_logger::Env::default().default_filter_or(DEFAULT_FILTER);
		// Another logger may already be installed by the test binary.
		let _ = env_logger::Builder::from_env(env).is_test(true).try_init();
	});
}
