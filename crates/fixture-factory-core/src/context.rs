//! Per-test context of resolved fixture values.

use std::any::{Any, type_name};
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::{FixtureError, FixtureResult};

/// Type-erased value stored in a [`TestContext`].
pub type ContextValue = Arc<dyn Any + Send + Sync>;

/// Values resolved so far for the currently running test, keyed by fixture name.
///
/// Entries are kept in insertion order, which for a harness-driven run is the
/// composition's declaration order. Cloning is shallow: the clone shares the
/// same `Arc` values but has its own map, so one test's context never sees
/// entries added to another.
///
/// # Examples
///
/// ```
/// use fixture_factory_core::TestContext;
///
/// let ctx = TestContext::new().with_entry("pool_size", 8usize);
/// assert_eq!(*ctx.require::<usize>("pool_size").unwrap(), 8);
/// assert!(ctx.get::<usize>("missing").is_none());
/// ```
#[derive(Clone, Default)]
pub struct TestContext {
	entries: IndexMap<String, ContextValue>,
}

impl TestContext {
	/// Creates an empty context.
	pub fn new() -> Self {
		Self::default()
	}

	/// Seeds the context with an externally owned value.
	pub fn with_entry<T: Any + Send + Sync>(mut self, name: impl Into<String>, value: T) -> Self {
		self.entries.insert(name.into(), Arc::new(value));
		self
	}

	/// Inserts an already type-erased value, replacing any previous entry.
	pub fn insert_value(&mut self, name: impl Into<String>, value: ContextValue) {
		self.entries.insert(name.into(), value);
	}

	/// Returns the raw entry for `name`.
	pub fn entry(&self, name: &str) -> Option<&ContextValue> {
		self.entries.get(name)
	}

	/// Returns the value stored under `name` if it exists and has type `T`.
	pub fn get<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
		self.entries
			.get(name)
			.and_then(|value| value.clone().downcast::<T>().ok())
	}

	/// Returns the value stored under `name`.
	///
	/// # Errors
	///
	/// [`FixtureError::UnknownFixture`] when no entry exists,
	/// [`FixtureError::ContextType`] when the entry holds another type.
	pub fn require<T: Any + Send + Sync>(&self, name: &str) -> FixtureResult<Arc<T>> {
		let value = self
			.entries
			.get(name)
			.ok_or_else(|| FixtureError::UnknownFixture(name.to_string()))?;
		value
			.clone()
			.downcast::<T>()
			.map_err(|_| FixtureError::ContextType {
				entry: name.to_string(),
				expected: type_name::<T>(),
			})
	}

	/// Returns true if an entry named `name` exists.
	pub fn contains(&self, name: &str) -> bool {
		self.entries.contains_key(name)
	}

	/// Entry names in insertion order.
	pub fn names(&self) -> impl Iterator<Item = &str> {
		self.entries.keys().map(String::as_str)
	}

	/// Number of entries.
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	/// Returns true if the context has no entries.
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}

impl fmt::Debug for TestContext {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("TestContext")
			.field("entries", &self.entries.keys().collect::<Vec<_>>())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_require_returns_seeded_value() {
		// Arrange
		let ctx = TestContext::new().with_entry("db", "sqlite::memory:".to_string());

		// Act
		let db = ctx.require::<String>("db").unwrap();

		// Assert
		assert_eq!(db.as_str(), "sqlite::memory:");
	}

	#[rstest]
	fn test_require_missing_entry() {
		let ctx = TestContext::new();

		let result = ctx.require::<String>("db");

		assert!(matches!(result, Err(FixtureError::UnknownFixture(name)) if name == "db"));
	}

	#[rstest]
	fn test_require_wrong_type() {
		let ctx = TestContext::new().with_entry("db", 1u32);

		let result = ctx.require::<String>("db");

		assert!(matches!(
			result,
			Err(FixtureError::ContextType { entry, .. }) if entry == "db"
		));
		assert!(ctx.get::<String>("db").is_none());
	}

	#[rstest]
	fn test_values_are_shared_by_reference() {
		let mut ctx = TestContext::new();
		let value: Arc<Vec<u8>> = Arc::new(vec![1, 2, 3]);
		ctx.insert_value("bytes", value.clone());

		let read = ctx.require::<Vec<u8>>("bytes").unwrap();

		assert!(Arc::ptr_eq(&read, &value));
	}

	#[rstest]
	fn test_clone_is_isolated() {
		let original = TestContext::new().with_entry("a", 1i32);
		let mut copy = original.clone();
		copy.insert_value("b", Arc::new(2i32));

		assert_eq!(original.len(), 1);
		assert_eq!(copy.names().collect::<Vec<_>>(), vec!["a", "b"]);
	}
}
