//! Field resolution.
//!
//! Resolution walks the schema in declaration order and never searches for
//! dependencies: whatever a field reads must already be in the context. This
//! keeps resolution linear in the number of fields and deterministic, and
//! leaves ordering to the composition.

use std::any::{Any, type_name};
use std::sync::Arc;

use indexmap::IndexMap;

use crate::context::TestContext;
use crate::error::{FixtureError, FixtureResult};
use crate::field::{ExtractError, FieldValue, SourceKind};
use crate::schema::FixtureSchema;

/// Per-creation replacement values for `Default` fields.
///
/// # Examples
///
/// ```
/// use fixture_factory_core::Overrides;
///
/// let overrides = Overrides::new().set("public_id", 7i64);
/// assert!(overrides.contains("public_id"));
/// ```
#[derive(Clone, Default)]
pub struct Overrides {
	values: IndexMap<String, FieldValue>,
}

impl Overrides {
	/// Creates an empty override set.
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the override for field `name`.
	pub fn set<T: Any + Send + Sync>(mut self, name: impl Into<String>, value: T) -> Self {
		self.values.insert(name.into(), Arc::new(value));
		self
	}

	/// Returns true if `name` is overridden.
	pub fn contains(&self, name: &str) -> bool {
		self.values.contains_key(name)
	}

	/// Returns true if nothing is overridden.
	pub fn is_empty(&self) -> bool {
		self.values.is_empty()
	}

	fn get(&self, name: &str) -> Option<&FieldValue> {
		self.values.get(name)
	}

	fn names(&self) -> impl Iterator<Item = &str> {
		self.values.keys().map(String::as_str)
	}
}

impl std::fmt::Debug for Overrides {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Overrides")
			.field("fields", &self.values.keys().collect::<Vec<_>>())
			.finish()
	}
}

/// Concrete field values handed to a fixture constructor.
#[derive(Clone)]
pub struct ResolvedFields {
	fixture: String,
	values: IndexMap<String, FieldValue>,
}

impl ResolvedFields {
	/// Name of the fixture these fields were resolved for.
	pub fn fixture(&self) -> &str {
		&self.fixture
	}

	/// Returns the value of field `name` as `T`.
	///
	/// # Errors
	///
	/// [`FixtureError::UnknownField`] when the field was not declared,
	/// [`FixtureError::FieldType`] when it holds another type.
	pub fn get<T: Any + Send + Sync>(&self, name: &str) -> FixtureResult<Arc<T>> {
		let value = self
			.values
			.get(name)
			.ok_or_else(|| FixtureError::UnknownField {
				fixture: self.fixture.clone(),
				field: name.to_string(),
			})?;
		value
			.clone()
			.downcast::<T>()
			.map_err(|_| FixtureError::FieldType {
				fixture: self.fixture.clone(),
				field: name.to_string(),
				expected: type_name::<T>(),
			})
	}

	/// Returns a clone of the value of field `name`.
	pub fn value<T: Any + Send + Sync + Clone>(&self, name: &str) -> FixtureResult<T> {
		self.get::<T>(name).map(|value| (*value).clone())
	}

	/// Field names in resolution order.
	pub fn names(&self) -> impl Iterator<Item = &str> {
		self.values.keys().map(String::as_str)
	}

	/// Number of resolved fields.
	pub fn len(&self) -> usize {
		self.values.len()
	}

	/// Returns true if no fields were resolved.
	pub fn is_empty(&self) -> bool {
		self.values.is_empty()
	}
}

impl std::fmt::Debug for ResolvedFields {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ResolvedFields")
			.field("fixture", &self.fixture)
			.field("fields", &self.values.keys().collect::<Vec<_>>())
			.finish()
	}
}

/// Resolves every field of `schema` against `ctx`.
///
/// # Errors
///
/// [`FixtureError::MissingContextField`] if a field reads an entry that is
/// not in `ctx`, [`FixtureError::ContextType`] if the entry has another type.
pub fn resolve(
	fixture: &str,
	schema: &FixtureSchema,
	ctx: &TestContext,
) -> FixtureResult<ResolvedFields> {
	resolve_with_overrides(fixture, schema, ctx, &Overrides::new())
}

/// Resolves `schema` against `ctx`, replacing `Default` fields named in
/// `overrides`.
///
/// Overrides of `FromContext` fields are ignored.
///
/// # Errors
///
/// Everything [`resolve`] returns, plus [`FixtureError::UnknownField`] for an
/// override naming no field and [`FixtureError::FieldType`] for an override of
/// the wrong type.
pub fn resolve_with_overrides(
	fixture: &str,
	schema: &FixtureSchema,
	ctx: &TestContext,
	overrides: &Overrides,
) -> FixtureResult<ResolvedFields> {
	if let Some(unknown) = overrides.names().find(|name| schema.get(name).is_none()) {
		return Err(FixtureError::UnknownField {
			fixture: fixture.to_string(),
			field: unknown.to_string(),
		});
	}

	let mut values = IndexMap::with_capacity(schema.len());
	for (name, spec) in schema.iter() {
		let value = match (spec.kind(), overrides.get(name)) {
			(SourceKind::Default, Some(value)) => {
				if !spec.accepts(value) {
					return Err(FixtureError::FieldType {
						fixture: fixture.to_string(),
						field: name.to_string(),
						expected: spec.type_name(),
					});
				}
				value.clone()
			}
			(kind, maybe_override) => {
				if kind == SourceKind::FromContext && maybe_override.is_some() {
					tracing::debug!(
						fixture,
						field = name,
						"ignoring override of a context-derived field"
					);
				}
				spec.produce(ctx).map_err(|error| match error {
					ExtractError::Missing(dependency) => FixtureError::MissingContextField {
						fixture: fixture.to_string(),
						field: name.to_string(),
						dependency,
					},
					ExtractError::WrongType { entry, expected } => {
						FixtureError::ContextType { entry, expected }
					}
				})?
			}
		};
		values.insert(name.to_string(), value);
	}

	Ok(ResolvedFields {
		fixture: fixture.to_string(),
		values,
	})
}
