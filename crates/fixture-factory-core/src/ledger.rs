//! Per-test record of instances made by a repeatable-creation fixture.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::FixtureError;
use crate::instance::FixtureInstance;

struct LedgerState<T> {
	entries: Vec<FixtureInstance<T>>,
	closed: bool,
}

/// Ordered record of every instance created through one creator during one
/// test.
///
/// Every appended entry is destroyed exactly once by [`Ledger::teardown`], in
/// reverse append order. Teardown closes the ledger; later appends are
/// refused and handed back so the caller can destroy them immediately.
pub struct Ledger<T> {
	fixture: String,
	state: Mutex<LedgerState<T>>,
}

impl<T> Ledger<T> {
	/// Creates an open, empty ledger for `fixture`.
	pub fn new(fixture: impl Into<String>) -> Self {
		Self {
			fixture: fixture.into(),
			state: Mutex::new(LedgerState {
				entries: Vec::new(),
				closed: false,
			}),
		}
	}

	/// Name of the fixture this ledger belongs to.
	pub fn fixture(&self) -> &str {
		&self.fixture
	}

	/// Records an instance and returns its value.
	///
	/// # Errors
	///
	/// Returns the instance back if the ledger is already closed.
	pub fn append(&self, instance: FixtureInstance<T>) -> Result<Arc<T>, FixtureInstance<T>> {
		let mut state = self.state.lock();
		if state.closed {
			return Err(instance);
		}
		let value = instance.value().clone();
		state.entries.push(instance);
		Ok(value)
	}

	/// Returns true once teardown has started.
	pub fn is_closed(&self) -> bool {
		self.state.lock().closed
	}

	/// Values of the live entries, in append order.
	pub fn values(&self) -> Vec<Arc<T>> {
		self.state
			.lock()
			.entries
			.iter()
			.map(|instance| instance.value().clone())
			.collect()
	}

	/// Number of live entries.
	pub fn len(&self) -> usize {
		self.state.lock().entries.len()
	}

	/// Returns true if nothing is recorded.
	pub fn is_empty(&self) -> bool {
		self.state.lock().entries.is_empty()
	}

	/// Closes the ledger and destroys every entry, newest first.
	///
	/// Every entry gets an attempt; failures are collected and returned.
	pub async fn teardown(&self) -> Vec<FixtureError> {
		let entries = {
			let mut state = self.state.lock();
			state.closed = true;
			std::mem::take(&mut state.entries)
		};

		let mut errors = Vec::new();
		for (index, instance) in entries.into_iter().enumerate().rev() {
			tracing::debug!(fixture = %self.fixture, index, "destroying created instance");
			if let Err(error) = instance.destroy().await {
				tracing::warn!(fixture = %self.fixture, index, %error, "created instance teardown failed");
				errors.push(error);
			}
		}
		errors
	}
}

impl<T> fmt::Debug for Ledger<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let state = self.state.lock();
		f.debug_struct("Ledger")
			.field("fixture", &self.fixture)
			.field("entries", &state.entries.len())
			.field("closed", &state.closed)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::BoxError;
	use crate::instance::Created;
	use rstest::rstest;

	type Log = Arc<Mutex<Vec<String>>>;

	fn tracked(label: &str, log: &Log, fail: bool) -> FixtureInstance<String> {
		let log = log.clone();
		let name = label.to_string();
		Created::new(label.to_string())
			.with_destroy(move || async move {
				log.lock().push(name.clone());
				if fail {
					Err::<(), BoxError>(format!("cannot delete {name}").into())
				} else {
					Ok(())
				}
			})
			.into_instance(Arc::from("Document"))
	}

	#[rstest]
	#[tokio::test]
	async fn test_teardown_is_reverse_append_order() {
		// Arrange
		let log: Log = Arc::default();
		let ledger = Ledger::new("Document");
		for label in ["a", "b", "c"] {
			ledger.append(tracked(label, &log, false)).unwrap();
		}

		// Act
		let errors = ledger.teardown().await;

		// Assert
		assert!(errors.is_empty());
		assert_eq!(*log.lock(), vec!["c", "b", "a"]);
		assert!(ledger.is_empty());
		assert!(ledger.is_closed());
	}

	#[rstest]
	#[tokio::test]
	async fn test_teardown_attempts_every_entry() {
		let log: Log = Arc::default();
		let ledger = Ledger::new("Document");
		ledger.append(tracked("a", &log, true)).unwrap();
		ledger.append(tracked("b", &log, false)).unwrap();
		ledger.append(tracked("c", &log, true)).unwrap();

		let errors = ledger.teardown().await;

		assert_eq!(*log.lock(), vec!["c", "b", "a"]);
		assert_eq!(errors.len(), 2);
		assert!(errors.iter().all(|e| matches!(e, FixtureError::Teardown { .. })));
	}

	#[rstest]
	#[tokio::test]
	async fn test_append_after_teardown_is_refused() {
		let log: Log = Arc::default();
		let ledger = Ledger::new("Document");
		ledger.teardown().await;

		let refused = ledger.append(tracked("late", &log, false));

		assert!(refused.is_err());
		assert_eq!(ledger.len(), 0);
	}

	#[rstest]
	#[tokio::test]
	async fn test_empty_ledger_teardown_does_nothing() {
		let ledger: Ledger<String> = Ledger::new("Document");

		assert!(ledger.teardown().await.is_empty());
	}

	#[rstest]
	fn test_values_in_append_order() {
		let log: Log = Arc::default();
		let ledger = Ledger::new("Document");
		ledger.append(tracked("first", &log, false)).unwrap();
		ledger.append(tracked("second", &log, false)).unwrap();

		let values: Vec<String> = ledger.values().iter().map(|v| v.to_string()).collect();

		assert_eq!(values, vec!["first", "second"]);
	}
}
