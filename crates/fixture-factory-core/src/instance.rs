//! Constructor output and realized fixture instances.

use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;

use crate::error::{BoxError, FixtureError, FixtureResult, panic_message};

/// Zero-argument async cleanup attached to a created value.
pub struct Destroy(Box<dyn FnOnce() -> BoxFuture<'static, Result<(), BoxError>> + Send>);

impl Destroy {
	/// Wraps an async cleanup callback.
	pub fn new<F, Fut, E>(destroy: F) -> Self
	where
		F: FnOnce() -> Fut + Send + 'static,
		Fut: Future<Output = Result<(), E>> + Send + 'static,
		E: Into<BoxError>,
	{
		Self(Box::new(move || {
			async move { destroy().await.map_err(Into::into) }.boxed()
		}))
	}

	async fn run(self) -> Result<(), BoxError> {
		let future = (self.0)();
		match AssertUnwindSafe(future).catch_unwind().await {
			Ok(result) => result,
			Err(payload) => {
				Err(format!("destroy panicked: {}", panic_message(payload.as_ref())).into())
			}
		}
	}
}

impl fmt::Debug for Destroy {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("Destroy(..)")
	}
}

/// What a fixture constructor returns: the value and an optional cleanup.
///
/// # Examples
///
/// ```
/// use fixture_factory_core::{BoxError, Created};
///
/// let created = Created::new(42u32).with_destroy(|| async { Ok::<_, BoxError>(()) });
/// assert!(created.has_destroy());
/// ```
#[derive(Debug)]
pub struct Created<T> {
	value: T,
	destroy: Option<Destroy>,
}

impl<T> Created<T> {
	/// A value with nothing to release.
	pub fn new(value: T) -> Self {
		Self {
			value,
			destroy: None,
		}
	}

	/// Attaches the cleanup run at teardown.
	pub fn with_destroy<F, Fut, E>(mut self, destroy: F) -> Self
	where
		F: FnOnce() -> Fut + Send + 'static,
		Fut: Future<Output = Result<(), E>> + Send + 'static,
		E: Into<BoxError>,
	{
		self.destroy = Some(Destroy::new(destroy));
		self
	}

	/// Returns true if a cleanup is attached.
	pub fn has_destroy(&self) -> bool {
		self.destroy.is_some()
	}

	pub(crate) fn into_instance(self, fixture: Arc<str>) -> FixtureInstance<T> {
		FixtureInstance {
			fixture,
			value: Arc::new(self.value),
			destroy: self.destroy,
		}
	}
}

/// One realized fixture value for one test execution.
///
/// [`FixtureInstance::destroy`] consumes the instance, so a cleanup can run
/// at most once.
pub struct FixtureInstance<T> {
	fixture: Arc<str>,
	value: Arc<T>,
	destroy: Option<Destroy>,
}

impl<T> FixtureInstance<T> {
	/// Name of the fixture that produced this instance.
	pub fn fixture(&self) -> &str {
		&self.fixture
	}

	/// The shared value.
	pub fn value(&self) -> &Arc<T> {
		&self.value
	}

	/// Returns true if the instance has a cleanup to run.
	pub fn has_destroy(&self) -> bool {
		self.destroy.is_some()
	}

	/// Runs the cleanup, if any.
	///
	/// A panicking cleanup is reported like a failing one.
	///
	/// # Errors
	///
	/// [`FixtureError::Teardown`] wrapping the cleanup's failure.
	pub async fn destroy(self) -> FixtureResult<()> {
		let Some(destroy) = self.destroy else {
			return Ok(());
		};
		destroy
			.run()
			.await
			.map_err(|source| FixtureError::Teardown {
				fixture: self.fixture.to_string(),
				source,
			})
	}
}

impl<T: fmt::Debug> fmt::Debug for FixtureInstance<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("FixtureInstance")
			.field("fixture", &self.fixture)
			.field("value", &self.value)
			.field("has_destroy", &self.destroy.is_some())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use std::sync::atomic::{AtomicUsize, Ordering};

	fn instance<T>(created: Created<T>) -> FixtureInstance<T> {
		created.into_instance(Arc::from("Todo"))
	}

	#[rstest]
	#[tokio::test]
	async fn test_destroy_runs_callback() {
		// Arrange
		let calls = Arc::new(AtomicUsize::new(0));
		let counter = calls.clone();
		let todo = instance(Created::new("todo").with_destroy(move || async move {
			counter.fetch_add(1, Ordering::SeqCst);
			Ok::<_, BoxError>(())
		}));

		// Act
		let result = todo.destroy().await;

		// Assert
		assert!(result.is_ok());
		assert_eq!(calls.load(Ordering::SeqCst), 1);
	}

	#[rstest]
	#[tokio::test]
	async fn test_destroy_without_callback_is_noop() {
		let todo = instance(Created::new(1u8));

		assert!(!todo.has_destroy());
		assert!(todo.destroy().await.is_ok());
	}

	#[rstest]
	#[tokio::test]
	async fn test_destroy_failure_is_wrapped() {
		let todo = instance(
			Created::new(1u8).with_destroy(|| async { Err::<(), _>("row is locked") }),
		);

		let result = todo.destroy().await;

		match result {
			Err(FixtureError::Teardown { fixture, source }) => {
				assert_eq!(fixture, "Todo");
				assert_eq!(source.to_string(), "row is locked");
			}
			other => panic!("expected teardown error, got {other:?}"),
		}
	}

	#[rstest]
	#[tokio::test]
	async fn test_destroy_panic_is_reported() {
		let todo = instance(Created::new(1u8).with_destroy(|| async {
			if true {
				panic!("boom");
			}
			Ok::<(), BoxError>(())
		}));

		let result = todo.destroy().await;

		assert!(matches!(
			result,
			Err(FixtureError::Teardown { ref source, .. }) if source.to_string() == "destroy panicked: boom"
		));
	}

	#[rstest]
	fn test_value_is_shared() {
		let todo = instance(Created::new(vec![1, 2]));

		let value = todo.value().clone();

		assert!(Arc::ptr_eq(&value, todo.value()));
		assert_eq!(todo.fixture(), "Todo");
	}
}
