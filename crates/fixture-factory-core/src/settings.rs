//! Harness configuration.
//!
//! Settings can be built in code, read from `FIXTURE_FACTORY_*` environment
//! variables or loaded from a `.toml` / `.json` file.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Environment variable holding the per-test bound in milliseconds.
pub const ENV_TEST_TIMEOUT_MS: &str = "FIXTURE_FACTORY_TEST_TIMEOUT_MS";
/// Environment variable enabling panic re-raising after teardown.
pub const ENV_RESUME_PANICS: &str = "FIXTURE_FACTORY_RESUME_PANICS";
/// Environment variable enabling `info`-level lifecycle events.
pub const ENV_LOG_LIFECYCLE: &str = "FIXTURE_FACTORY_LOG_LIFECYCLE";

/// Options for running a test through a composition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessSettings {
	/// Bound on setup plus body, in milliseconds. `None` means unbounded.
	pub test_timeout_ms: Option<u64>,
	/// Re-raise a body panic once teardown has finished.
	pub resume_panics: bool,
	/// Emit setup/teardown events at `info` instead of `debug`.
	pub log_lifecycle: bool,
}

impl HarnessSettings {
	/// Default settings: no timeout, panics reported as failures.
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the test bound.
	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.test_timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
		self
	}

	/// Sets whether body panics are re-raised after teardown.
	pub fn with_resume_panics(mut self, resume: bool) -> Self {
		self.resume_panics = resume;
		self
	}

	/// The test bound, if any.
	pub fn timeout(&self) -> Option<Duration> {
		self.test_timeout_ms.map(Duration::from_millis)
	}

	/// Checks the settings for values the harness cannot honour.
	pub fn validate(&self) -> Result<(), SettingsError> {
		if self.test_timeout_ms == Some(0) {
			return Err(SettingsError::ValidationError(
				"test_timeout_ms must be greater than zero".to_string(),
			));
		}
		Ok(())
	}

	/// Reads harness settings from the `FIXTURE_FACTORY_*` variables.
	///
	/// Unset variables keep their defaults. Flags accept `true` or `1`.
	///
	/// # Errors
	///
	/// [`SettingsError::ParseError`] if the timeout is not a number,
	/// [`SettingsError::ValidationError`] if it is zero.
	pub fn from_env() -> Result<Self, SettingsError> {
		let mut settings = Self::default();

		if let Ok(timeout) = std::env::var(ENV_TEST_TIMEOUT_MS) {
			let millis = timeout.trim().parse::<u64>().map_err(|e| {
				SettingsError::ParseError(format!("{ENV_TEST_TIMEOUT_MS}={timeout}: {e}"))
			})?;
			settings.test_timeout_ms = Some(millis);
		}

		if let Ok(resume) = std::env::var(ENV_RESUME_PANICS) {
			settings.resume_panics = parse_flag(&resume);
		}

		if let Ok(log) = std::env::var(ENV_LOG_LIFECYCLE) {
			settings.log_lifecycle = parse_flag(&log);
		}

		settings.validate()?;
		Ok(settings)
	}

	/// Reads harness settings from a `.toml` or `.json` file.
	///
	/// # Errors
	///
	/// [`SettingsError::FileError`] if the file cannot be read,
	/// [`SettingsError::ParseError`] if it is malformed,
	/// [`SettingsError::UnsupportedFormat`] for any other extension and
	/// [`SettingsError::ValidationError`] if the timeout is zero.
	pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, SettingsError> {
		let path = path.into();
		let contents = std::fs::read_to_string(&path).map_err(|e| {
			SettingsError::FileError(format!("cannot read harness settings {}: {e}", path.display()))
		})?;

		let settings: HarnessSettings = match path.extension().and_then(|s| s.to_str()) {
			Some("toml") => toml::from_str(&contents).map_err(|e| {
				SettingsError::ParseError(format!("harness settings {}: {e}", path.display()))
			})?,
			Some("json") => serde_json::from_str(&contents).map_err(|e| {
				SettingsError::ParseError(format!("harness settings {}: {e}", path.display()))
			})?,
			other => {
				return Err(SettingsError::UnsupportedFormat(format!(
					"harness settings {} has extension {:?}; expected toml or json",
					path.display(),
					other.unwrap_or("")
				)));
			}
		};

		settings.validate()?;
		Ok(settings)
	}
}

fn parse_flag(value: &str) -> bool {
	value.eq_ignore_ascii_case("true") || value == "1"
}

/// Settings error
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
	/// The settings file could not be read.
	#[error("File error: {0}")]
	FileError(String),

	/// A value could not be parsed.
	#[error("Parse error: {0}")]
	ParseError(String),

	/// A value was parsed but is not usable.
	#[error("Validation error: {0}")]
	ValidationError(String),

	/// The settings file has an unknown extension.
	#[error("Unsupported format: {0}")]
	UnsupportedFormat(String),
}
