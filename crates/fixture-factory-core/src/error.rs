//! Error types for fixture definition, resolution and lifecycle.
//!
//! Composition-time errors ([`FixtureError::DuplicateFixtureName`],
//! [`FixtureError::DuplicateFieldName`], forward references reported as
//! [`FixtureError::MissingContextField`]) are raised before any test runs.
//! Everything else is raised while a single test executes and is reported to
//! the harness.

use std::time::Duration;

use thiserror::Error;

/// Boxed error produced by collaborator code (constructors, destroy callbacks,
/// test bodies).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while defining, composing or running fixtures.
#[derive(Debug, Error)]
pub enum FixtureError {
	/// A field read a context entry that has not been resolved for this test.
	#[error(
		"Missing context field: {fixture}.{field} requires '{dependency}', which is not resolved yet"
	)]
	MissingContextField {
		/// Fixture whose schema declared the field.
		fixture: String,
		/// Field that performed the read.
		field: String,
		/// Context entry that was not available.
		dependency: String,
	},

	/// Two fixtures were registered under the same name in one composition.
	#[error("Duplicate fixture name: {0}")]
	DuplicateFixtureName(String),

	/// Two fields with the same name were declared for one fixture.
	#[error("Duplicate field name: {fixture}.{field}")]
	DuplicateFieldName {
		/// Fixture being defined.
		fixture: String,
		/// Repeated field name.
		field: String,
	},

	/// The user constructor failed. The fixture counts as never created.
	#[error("Constructor error in fixture '{fixture}': {source}")]
	Constructor {
		/// Fixture whose constructor failed.
		fixture: String,
		/// Original cause.
		#[source]
		source: BoxError,
	},

	/// A destroy callback failed.
	#[error("Teardown error in fixture '{fixture}': {source}")]
	Teardown {
		/// Fixture whose destroy callback failed.
		fixture: String,
		/// Original cause.
		#[source]
		source: BoxError,
	},

	/// A field or override value did not have the declared type.
	#[error("Field type mismatch: {fixture}.{field} is declared as {expected}")]
	FieldType {
		/// Fixture owning the field.
		fixture: String,
		/// Field name.
		field: String,
		/// Declared type name.
		expected: &'static str,
	},

	/// A context entry exists but holds a value of another type.
	#[error("Context type mismatch: '{entry}' is not a {expected}")]
	ContextType {
		/// Context entry name.
		entry: String,
		/// Requested type name.
		expected: &'static str,
	},

	/// A field name was requested or overridden that the schema does not declare.
	#[error("Unknown field: {fixture}.{field}")]
	UnknownField {
		/// Fixture owning the schema.
		fixture: String,
		/// Field name that matched nothing.
		field: String,
	},

	/// A test requested a fixture the composition does not contain.
	#[error("Unknown fixture: {0}")]
	UnknownFixture(String),

	/// A creator handle was used after its test finished tearing down.
	#[error("Ledger for fixture '{0}' is closed")]
	LedgerClosed(String),
}

/// Result type alias for fixture operations.
pub type FixtureResult<T> = Result<T, FixtureError>;

/// Primary reason a test run failed.
#[derive(Debug, Error)]
pub enum FailureCause {
	/// A fixture setup failed; later fixtures and the body never ran.
	#[error("fixture setup failed: {0}")]
	Setup(#[source] FixtureError),

	/// The test body returned an error.
	#[error("test body failed: {0}")]
	Body(#[source] BoxError),

	/// The test body panicked.
	#[error("test body panicked: {0}")]
	Panic(String),

	/// Setup and body together exceeded the configured bound.
	#[error("test exceeded its time limit of {0:?}")]
	Timeout(Duration),
}

/// Turns a caught panic payload into a readable message.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
	if let Some(message) = payload.downcast_ref::<&'static str>() {
		(*message).to_string()
	} else if let Some(message) = payload.downcast_ref::<String>() {
		message.clone()
	} else {
		"<non-string panic payload>".to_string()
	}
}
