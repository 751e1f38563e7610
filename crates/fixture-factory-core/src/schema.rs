//! Ordered field schemas.

use indexmap::IndexMap;

use crate::error::{FixtureError, FixtureResult};
use crate::field::{FieldSpec, SourceKind};

/// Ordered mapping from field name to [`FieldSpec`].
///
/// Declaration order is resolution order. Field names are unique within one
/// schema.
#[derive(Debug, Clone, Default)]
pub struct FixtureSchema {
	fields: IndexMap<String, FieldSpec>,
}

impl FixtureSchema {
	/// Creates an empty schema.
	pub fn new() -> Self {
		Self::default()
	}

	/// Builds a schema for `fixture` from fields in declaration order.
	///
	/// # Errors
	///
	/// [`FixtureError::DuplicateFieldName`] if a name repeats.
	pub fn from_fields<I, N>(fixture: &str, fields: I) -> FixtureResult<Self>
	where
		I: IntoIterator<Item = (N, FieldSpec)>,
		N: Into<String>,
	{
		let mut schema = Self::new();
		for (name, spec) in fields {
			schema.insert(fixture, name, spec)?;
		}
		Ok(schema)
	}

	/// Appends a field.
	///
	/// # Errors
	///
	/// [`FixtureError::DuplicateFieldName`] if `name` is already declared.
	pub fn insert(
		&mut self,
		fixture: &str,
		name: impl Into<String>,
		spec: FieldSpec,
	) -> FixtureResult<()> {
		let name = name.into();
		if self.fields.contains_key(&name) {
			return Err(FixtureError::DuplicateFieldName {
				fixture: fixture.to_string(),
				field: name,
			});
		}
		self.fields.insert(name, spec);
		Ok(())
	}

	/// Looks up a field by name.
	pub fn get(&self, name: &str) -> Option<&FieldSpec> {
		self.fields.get(name)
	}

	/// Iterates fields in declaration order.
	pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldSpec)> {
		self.fields.iter().map(|(name, spec)| (name.as_str(), spec))
	}

	/// Names of the fields that may be overridden.
	pub fn overridable(&self) -> impl Iterator<Item = &str> {
		self.iter()
			.filter(|(_, spec)| spec.kind() == SourceKind::Default)
			.map(|(name, _)| name)
	}

	/// Distinct context entries read by this schema, in field order.
	pub fn dependencies(&self) -> Vec<String> {
		let mut dependencies: Vec<String> = Vec::new();
		for (_, spec) in self.iter() {
			if let Some(dependency) = spec.dependency() {
				if !dependencies.iter().any(|d| d == dependency) {
					dependencies.push(dependency.to_string());
				}
			}
		}
		dependencies
	}

	/// Number of declared fields.
	pub fn len(&self) -> usize {
		self.fields.len()
	}

	/// Returns true if no fields are declared.
	pub fn is_empty(&self) -> bool {
		self.fields.is_empty()
	}
}
