//! Fixture definitions and the factory builder.
//!
//! ```
//! use fixture_factory_core::{BoxError, Created, Field, create_factory};
//!
//! #[derive(Debug, Clone)]
//! struct Workspace {
//!     public_id: String,
//! }
//!
//! let workspace_factory = create_factory("Workspace")
//!     .field("db_url", Field::<String>::from_context("db"))
//!     .field("public_id", Field::<String>::default_value("test:1".to_string()))
//!     .with_value(|fields| async move {
//!         let public_id = fields.value::<String>("public_id")?;
//!         Ok::<_, BoxError>(
//!             Created::new(Workspace { public_id }).with_destroy(|| async { Ok::<_, BoxError>(()) }),
//!         )
//!     })
//!     .unwrap();
//!
//! assert_eq!(workspace_factory.name(), "Workspace");
//! assert_eq!(workspace_factory.schema().dependencies(), vec!["db"]);
//! ```

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;

use crate::context::TestContext;
use crate::error::{BoxError, FixtureError, FixtureResult, panic_message};
use crate::field::FieldSpec;
use crate::instance::{Created, FixtureInstance};
use crate::provider::{UseCreateValue, UseValue};
use crate::resolver::{Overrides, ResolvedFields, resolve_with_overrides};
use crate::schema::FixtureSchema;

type Constructor<T> =
	Arc<dyn Fn(ResolvedFields) -> BoxFuture<'static, Result<Created<T>, BoxError>> + Send + Sync>;

/// Starts defining a fixture named `name`.
pub fn create_factory(name: impl Into<String>) -> FactoryBuilder {
	FactoryBuilder {
		name: name.into(),
		fields: Vec::new(),
	}
}

/// Collects a fixture's fields until the constructor is supplied.
#[derive(Debug)]
pub struct FactoryBuilder {
	name: String,
	fields: Vec<(String, FieldSpec)>,
}

impl FactoryBuilder {
	/// Declares a field. Declaration order is resolution order.
	pub fn field(mut self, name: impl Into<String>, spec: FieldSpec) -> Self {
		self.fields.push((name.into(), spec));
		self
	}

	/// Supplies the async constructor and finishes the definition.
	///
	/// The constructor receives the resolved fields and returns the value with
	/// an optional cleanup. It must not retry internally.
	///
	/// # Errors
	///
	/// [`FixtureError::DuplicateFieldName`] if a field name was declared twice.
	pub fn with_value<T, F, Fut, E>(self, constructor: F) -> FixtureResult<FixtureFactory<T>>
	where
		T: Any + Send + Sync,
		F: Fn(ResolvedFields) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = Result<Created<T>, E>> + Send + 'static,
		E: Into<BoxError>,
	{
		let schema = FixtureSchema::from_fields(&self.name, self.fields)?;
		let constructor: Constructor<T> = Arc::new(move |fields| {
			constructor(fields).map(|result| result.map_err(Into::into)).boxed()
		});
		Ok(FixtureFactory {
			definition: Arc::new(FixtureDefinition {
				name: Arc::from(self.name),
				schema,
				constructor,
			}),
		})
	}
}

struct FixtureDefinition<T> {
	name: Arc<str>,
	schema: FixtureSchema,
	constructor: Constructor<T>,
}

/// Immutable, cheaply clonable handle over a fixture definition.
///
/// Usually built once per suite and turned into harness registrations with
/// [`FixtureFactory::use_value`] or [`FixtureFactory::use_create_value`].
pub struct FixtureFactory<T> {
	definition: Arc<FixtureDefinition<T>>,
}

impl<T> Clone for FixtureFactory<T> {
	fn clone(&self) -> Self {
		Self {
			definition: self.definition.clone(),
		}
	}
}

impl<T> fmt::Debug for FixtureFactory<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("FixtureFactory")
			.field("name", &self.definition.name)
			.field("schema", &self.definition.schema)
			.finish()
	}
}

impl<T: Any + Send + Sync> FixtureFactory<T> {
	/// Human-readable fixture name.
	pub fn name(&self) -> &str {
		&self.definition.name
	}

	/// The declared fields.
	pub fn schema(&self) -> &FixtureSchema {
		&self.definition.schema
	}

	/// Resolves fields from `ctx` and runs the constructor once.
	///
	/// # Errors
	///
	/// Resolution errors are returned unchanged. A failing or panicking
	/// constructor yields [`FixtureError::Constructor`]; nothing was created in
	/// that case, so there is nothing to tear down.
	pub async fn construct(
		&self,
		ctx: &TestContext,
		overrides: &Overrides,
	) -> FixtureResult<FixtureInstance<T>> {
		let definition = &self.definition;
		let fields = resolve_with_overrides(&definition.name, &definition.schema, ctx, overrides)?;
		let future = (definition.constructor)(fields);
		let created = match AssertUnwindSafe(future).catch_unwind().await {
			Ok(result) => result,
			Err(payload) => Err(format!(
				"constructor panicked: {}",
				panic_message(payload.as_ref())
			)
			.into()),
		}
		.map_err(|source| FixtureError::Constructor {
			fixture: definition.name.to_string(),
			source,
		})?;
		tracing::debug!(fixture = %definition.name, "fixture constructed");
		Ok(created.into_instance(definition.name.clone()))
	}

	/// Registration that creates one shared instance per test.
	pub fn use_value(&self) -> UseValue<T> {
		UseValue::new(self.clone(), Overrides::new())
	}

	/// Like [`FixtureFactory::use_value`], with overrides pinned for the
	/// single instance.
	pub fn use_value_with(&self, overrides: Overrides) -> UseValue<T> {
		UseValue::new(self.clone(), overrides)
	}

	/// Registration that hands the test a [`Creator`](crate::Creator) and
	/// tears down every instance it created.
	pub fn use_create_value(&self) -> UseCreateValue<T> {
		UseCreateValue::new(self.clone())
	}
}
