//! Harness-facing fixture registrations.
//!
//! A registration turns a [`FixtureFactory`] into something the harness can
//! set up before a test body and tear down after it. Two shapes exist:
//!
//! - [`UseValue`]: one instance per test, shared by reference with the body and
//!   with every later fixture.
//! - [`UseCreateValue`]: a [`Creator`] the body calls any number of times;
//!   every created instance is recorded in a [`Ledger`] and destroyed at
//!   teardown.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::context::{ContextValue, TestContext};
use crate::error::{FixtureError, FixtureResult};
use crate::factory::FixtureFactory;
use crate::instance::FixtureInstance;
use crate::ledger::Ledger;
use crate::resolver::Overrides;
use crate::schema::FixtureSchema;

/// How a registration exposes its fixture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixtureMode {
	/// One shared instance per test.
	Single,
	/// A creator that may be called repeatedly.
	Repeatable,
}

/// A fixture the harness can set up for one test.
#[async_trait]
pub trait FixtureProvider: Send + Sync {
	/// Human-readable name of the underlying fixture.
	fn fixture_name(&self) -> &str;

	/// Which shape this registration has.
	fn mode(&self) -> FixtureMode;

	/// Fields of the underlying fixture.
	fn schema(&self) -> &FixtureSchema;

	/// Context entries the fixture's fields read.
	fn dependencies(&self) -> Vec<String> {
		self.schema().dependencies()
	}

	/// Produces the context value for one test and the matching teardown.
	async fn setup(&self, ctx: &TestContext) -> FixtureResult<ActiveFixture>;
}

/// Cleanup half of a set-up fixture.
#[async_trait]
pub trait FixtureTeardown: Send {
	/// Releases everything the setup produced. Returns every failure; never
	/// stops early.
	async fn teardown(&mut self) -> Vec<FixtureError>;
}

/// Result of a successful setup: the context value plus its teardown.
pub struct ActiveFixture {
	value: ContextValue,
	teardown: Box<dyn FixtureTeardown>,
}

impl ActiveFixture {
	/// Pairs a context value with its teardown.
	pub fn new(value: ContextValue, teardown: impl FixtureTeardown + 'static) -> Self {
		Self {
			value,
			teardown: Box::new(teardown),
		}
	}

	/// The value placed into the test context.
	pub fn value(&self) -> &ContextValue {
		&self.value
	}

	/// Splits into the context value and the teardown.
	pub fn into_parts(self) -> (ContextValue, Box<dyn FixtureTeardown>) {
		(self.value, self.teardown)
	}
}

impl fmt::Debug for ActiveFixture {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ActiveFixture").finish_non_exhaustive()
	}
}

/// Single-instance registration, see [`FixtureFactory::use_value`].
pub struct UseValue<T> {
	factory: FixtureFactory<T>,
	overrides: Overrides,
}

impl<T: Any + Send + Sync> UseValue<T> {
	pub(crate) fn new(factory: FixtureFactory<T>, overrides: Overrides) -> Self {
		Self { factory, overrides }
	}
}

struct SingleTeardown<T> {
	instance: Option<FixtureInstance<T>>,
}

#[async_trait]
impl<T: Any + Send + Sync> FixtureTeardown for SingleTeardown<T> {
	async fn teardown(&mut self) -> Vec<FixtureError> {
		let Some(instance) = self.instance.take() else {
			return Vec::new();
		};
		match instance.destroy().await {
			Ok(()) => Vec::new(),
			Err(error) => vec![error],
		}
	}
}

#[async_trait]
impl<T: Any + Send + Sync> FixtureProvider for UseValue<T> {
	fn fixture_name(&self) -> &str {
		self.factory.name()
	}

	fn mode(&self) -> FixtureMode {
		FixtureMode::Single
	}

	fn schema(&self) -> &FixtureSchema {
		self.factory.schema()
	}

	async fn setup(&self, ctx: &TestContext) -> FixtureResult<ActiveFixture> {
		let instance = self.factory.construct(ctx, &self.overrides).await?;
		let value: ContextValue = instance.value().clone();
		Ok(ActiveFixture::new(
			value,
			SingleTeardown {
				instance: Some(instance),
			},
		))
	}
}

impl<T> fmt::Debug for UseValue<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("UseValue")
			.field("factory", &self.factory)
			.field("overrides", &self.overrides)
			.finish()
	}
}

/// Repeatable-creation registration, see [`FixtureFactory::use_create_value`].
pub struct UseCreateValue<T> {
	factory: FixtureFactory<T>,
}

impl<T: Any + Send + Sync> UseCreateValue<T> {
	pub(crate) fn new(factory: FixtureFactory<T>) -> Self {
		Self { factory }
	}
}

impl<T> fmt::Debug for UseCreateValue<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("UseCreateValue")
			.field("factory", &self.factory)
			.finish()
	}
}

struct LedgerTeardown<T> {
	ledger: Arc<Ledger<T>>,
}

#[async_trait]
impl<T: Any + Send + Sync> FixtureTeardown for LedgerTeardown<T> {
	async fn teardown(&mut self) -> Vec<FixtureError> {
		self.ledger.teardown().await
	}
}

#[async_trait]
impl<T: Any + Send + Sync> FixtureProvider for UseCreateValue<T> {
	fn fixture_name(&self) -> &str {
		self.factory.name()
	}

	fn mode(&self) -> FixtureMode {
		FixtureMode::Repeatable
	}

	fn schema(&self) -> &FixtureSchema {
		self.factory.schema()
	}

	async fn setup(&self, ctx: &TestContext) -> FixtureResult<ActiveFixture> {
		let ledger = Arc::new(Ledger::new(self.factory.name()));
		let creator = Creator {
			factory: self.factory.clone(),
			context: ctx.clone(),
			ledger: ledger.clone(),
		};
		Ok(ActiveFixture::new(
			Arc::new(creator),
			LedgerTeardown { ledger },
		))
	}
}

/// Creation function handed to a test by [`UseCreateValue`].
///
/// Read it from the context with `ctx.require::<Creator<T>>(name)`. Each
/// [`Creator::create`] resolves fields against the context as it was when the
/// fixture was set up, applies the overrides to `Default` fields, runs the
/// constructor and records the instance for teardown.
pub struct Creator<T> {
	factory: FixtureFactory<T>,
	context: TestContext,
	ledger: Arc<Ledger<T>>,
}

impl<T> Clone for Creator<T> {
	fn clone(&self) -> Self {
		Self {
			factory: self.factory.clone(),
			context: self.context.clone(),
			ledger: self.ledger.clone(),
		}
	}
}

impl<T: Any + Send + Sync> Creator<T> {
	/// Creates one instance with `overrides` applied.
	///
	/// # Errors
	///
	/// Resolution and constructor errors from
	/// [`FixtureFactory::construct`]. [`FixtureError::LedgerClosed`] if the
	/// test already tore this fixture down; the instance built in that case
	/// is destroyed before returning.
	pub async fn create(&self, overrides: Overrides) -> FixtureResult<Arc<T>> {
		if self.ledger.is_closed() {
			return Err(FixtureError::LedgerClosed(self.ledger.fixture().to_string()));
		}
		let instance = self.factory.construct(&self.context, &overrides).await?;
		match self.ledger.append(instance) {
			Ok(value) => {
				tracing::debug!(
					fixture = self.ledger.fixture(),
					created = self.ledger.len(),
					"instance recorded"
				);
				Ok(value)
			}
			Err(refused) => {
				if let Err(error) = refused.destroy().await {
					tracing::warn!(%error, "failed to destroy instance created after teardown");
				}
				Err(FixtureError::LedgerClosed(self.ledger.fixture().to_string()))
			}
		}
	}

	/// Creates one instance using only defaults.
	pub async fn create_default(&self) -> FixtureResult<Arc<T>> {
		self.create(Overrides::new()).await
	}

	/// Values created so far, in creation order.
	pub fn created(&self) -> Vec<Arc<T>> {
		self.ledger.values()
	}

	/// Number of instances created so far.
	pub fn len(&self) -> usize {
		self.ledger.len()
	}

	/// Returns true if nothing was created yet.
	pub fn is_empty(&self) -> bool {
		self.ledger.is_empty()
	}
}

impl<T> fmt::Debug for Creator<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Creator")
			.field("ledger", &self.ledger)
			.finish()
	}
}
