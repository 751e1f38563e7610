//! Declarative field specifications.
//!
//! A fixture declares the inputs its constructor needs as named fields. Every
//! field is either read from the test context (`FromContext`) or produced from
//! a default (`Default`). Only default fields can be overridden per creation.

use std::any::{Any, TypeId, type_name};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::context::TestContext;

/// Type-erased resolved field value.
pub type FieldValue = Arc<dyn Any + Send + Sync>;

type Extractor = Arc<dyn Fn(&TestContext) -> Result<FieldValue, ExtractError> + Send + Sync>;
type DefaultThunk = Arc<dyn Fn() -> FieldValue + Send + Sync>;

/// Where a field's value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
	/// Read from an already resolved context entry. Never overridable.
	FromContext,
	/// Produced from a declared default. Overridable per creation.
	Default,
}

#[derive(Clone)]
enum FieldSource {
	FromContext {
		dependency: String,
		extractor: Extractor,
	},
	Default(DefaultThunk),
}

/// Failure of a context extractor, mapped to a `FixtureError` by the resolver.
#[derive(Debug)]
pub(crate) enum ExtractError {
	Missing(String),
	WrongType {
		entry: String,
		expected: &'static str,
	},
}

/// One declared input of a fixture.
///
/// Built through [`Field`]; the source is a closed two-variant choice so the
/// resolver can tell statically which fields read the context and which can be
/// overridden.
#[derive(Clone)]
pub struct FieldSpec {
	source: FieldSource,
	type_id: TypeId,
	type_name: &'static str,
}

impl FieldSpec {
	/// Source kind of this field.
	pub fn kind(&self) -> SourceKind {
		match self.source {
			FieldSource::FromContext { .. } => SourceKind::FromContext,
			FieldSource::Default(_) => SourceKind::Default,
		}
	}

	/// Context entry this field reads, for `FromContext` fields.
	pub fn dependency(&self) -> Option<&str> {
		match &self.source {
			FieldSource::FromContext { dependency, .. } => Some(dependency),
			FieldSource::Default(_) => None,
		}
	}

	/// Name of the value type this field produces.
	pub fn type_name(&self) -> &'static str {
		self.type_name
	}

	/// Returns true if `value` has the type this field produces.
	pub(crate) fn accepts(&self, value: &FieldValue) -> bool {
		(**value).type_id() == self.type_id
	}

	/// Produces the value: runs the extractor or evaluates the default.
	pub(crate) fn produce(&self, ctx: &TestContext) -> Result<FieldValue, ExtractError> {
		match &self.source {
			FieldSource::FromContext { extractor, .. } => extractor(ctx),
			FieldSource::Default(thunk) => Ok(thunk()),
		}
	}
}

impl fmt::Debug for FieldSpec {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("FieldSpec")
			.field("kind", &self.kind())
			.field("dependency", &self.dependency())
			.field("type", &self.type_name)
			.finish()
	}
}

/// Typed constructors for [`FieldSpec`].
///
/// # Examples
///
/// ```
/// use fixture_factory_core::{Field, SourceKind};
///
/// #[derive(Clone)]
/// struct Workspace {
///     id: String,
/// }
///
/// let workspace_id = Field::<String>::from_context_with("workspace", |ws: &Workspace| ws.id.clone());
/// let public_id = Field::<i64>::default_value(1);
///
/// assert_eq!(workspace_id.kind(), SourceKind::FromContext);
/// assert_eq!(workspace_id.dependency(), Some("workspace"));
/// assert_eq!(public_id.kind(), SourceKind::Default);
/// ```
pub struct Field<T>(PhantomData<fn() -> T>);

impl<T: Any + Send + Sync> Field<T> {
	/// Reads the whole context entry `dependency`, which must hold a `T`.
	///
	/// The resolved value is the same `Arc` the context holds.
	pub fn from_context(dependency: impl Into<String>) -> FieldSpec {
		let dependency = dependency.into();
		let entry = dependency.clone();
		let extractor: Extractor = Arc::new(move |ctx: &TestContext| {
			let value = ctx
				.entry(&entry)
				.ok_or_else(|| ExtractError::Missing(entry.clone()))?;
			if (**value).is::<T>() {
				Ok(value.clone())
			} else {
				Err(ExtractError::WrongType {
					entry: entry.clone(),
					expected: type_name::<T>(),
				})
			}
		});
		Self::spec(FieldSource::FromContext {
			dependency,
			extractor,
		})
	}

	/// Reads the context entry `dependency` as an `S` and projects it to `T`.
	pub fn from_context_with<S, F>(dependency: impl Into<String>, extract: F) -> FieldSpec
	where
		S: Any + Send + Sync,
		F: Fn(&S) -> T + Send + Sync + 'static,
	{
		let dependency = dependency.into();
		let entry = dependency.clone();
		let extractor: Extractor = Arc::new(move |ctx: &TestContext| {
			let value = ctx
				.entry(&entry)
				.ok_or_else(|| ExtractError::Missing(entry.clone()))?;
			let source = value
				.downcast_ref::<S>()
				.ok_or_else(|| ExtractError::WrongType {
					entry: entry.clone(),
					expected: type_name::<S>(),
				})?;
			Ok(Arc::new(extract(source)) as FieldValue)
		});
		Self::spec(FieldSource::FromContext {
			dependency,
			extractor,
		})
	}

	/// Uses a fresh clone of `value` for every resolution.
	pub fn default_value(value: T) -> FieldSpec
	where
		T: Clone,
	{
		Self::spec(FieldSource::Default(Arc::new(move || {
			Arc::new(value.clone()) as FieldValue
		})))
	}

	/// Evaluates `thunk` for every resolution, so no default state is shared
	/// between tests.
	pub fn default_with<F>(thunk: F) -> FieldSpec
	where
		F: Fn() -> T + Send + Sync + 'static,
	{
		Self::spec(FieldSource::Default(Arc::new(move || {
			Arc::new(thunk()) as FieldValue
		})))
	}

	fn spec(source: FieldSource) -> FieldSpec {
		FieldSpec {
			source,
			type_id: TypeId::of::<T>(),
			type_name: type_name::<T>(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use std::sync::atomic::{AtomicUsize, Ordering};

	#[derive(Debug, Clone, PartialEq)]
	struct Workspace {
		id: String,
	}

	#[rstest]
	fn test_from_context_shares_entry() {
		// Arrange
		let mut ctx = TestContext::new();
		let workspace = Arc::new(Workspace {
			id: "ws-1".to_string(),
		});
		ctx.insert_value("workspace", workspace.clone());
		let spec = Field::<Workspace>::from_context("workspace");

		// Act
		let value = spec.produce(&ctx).unwrap();

		// Assert
		let read = value.downcast::<Workspace>().unwrap();
		assert!(Arc::ptr_eq(&read, &workspace));
	}

	#[rstest]
	fn test_from_context_with_projects_value() {
		let ctx = TestContext::new().with_entry(
			"workspace",
			Workspace {
				id: "ws-2".to_string(),
			},
		);
		let spec = Field::<String>::from_context_with("workspace", |ws: &Workspace| ws.id.clone());

		let value = spec.produce(&ctx).unwrap();

		assert_eq!(value.downcast_ref::<String>().unwrap(), "ws-2");
		assert!(spec.accepts(&value));
	}

	#[rstest]
	fn test_from_context_missing_entry() {
		let spec = Field::<Workspace>::from_context("workspace");

		let result = spec.produce(&TestContext::new());

		assert!(matches!(result, Err(ExtractError::Missing(entry)) if entry == "workspace"));
	}

	#[rstest]
	fn test_from_context_wrong_type() {
		let ctx = TestContext::new().with_entry("workspace", 5u8);
		let spec = Field::<String>::from_context_with("workspace", |ws: &Workspace| ws.id.clone());

		let result = spec.produce(&ctx);

		assert!(matches!(result, Err(ExtractError::WrongType { .. })));
	}

	#[rstest]
	fn test_default_with_is_evaluated_per_resolution() {
		let calls = Arc::new(AtomicUsize::new(0));
		let counter = calls.clone();
		let spec = Field::<usize>::default_with(move || counter.fetch_add(1, Ordering::SeqCst));

		let first = spec.produce(&TestContext::new()).unwrap();
		let second = spec.produce(&TestContext::new()).unwrap();

		assert_eq!(*first.downcast_ref::<usize>().unwrap(), 0);
		assert_eq!(*second.downcast_ref::<usize>().unwrap(), 1);
		assert_eq!(spec.kind(), SourceKind::Default);
		assert_eq!(spec.dependency(), None);
	}

	#[rstest]
	fn test_accepts_checks_type() {
		let spec = Field::<i64>::default_value(1);

		assert!(spec.accepts(&(Arc::new(7i64) as FieldValue)));
		assert!(!spec.accepts(&(Arc::new(7i32) as FieldValue)));
	}
}
