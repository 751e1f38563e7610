//! Ordered fixture compositions.
//!
//! A composition is the list of fixtures a group of tests shares, in
//! declaration order. Declaration order is the only dependency mechanism: a
//! fixture may read any fixture declared before it and nothing declared after
//! it. Both rules are checked when the composition is built, before any test
//! runs.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::error::{FixtureError, FixtureResult};
use crate::provider::FixtureProvider;
use crate::settings::HarnessSettings;

/// One named entry of a composition.
#[derive(Clone)]
pub(crate) struct Registration {
	pub(crate) name: String,
	pub(crate) provider: Arc<dyn FixtureProvider>,
}

/// Collects fixtures for a [`Composition`].
///
/// # Examples
///
/// ```
/// use fixture_factory_core::{BoxError, Composition, Created, Field, create_factory};
///
/// let db = create_factory("Db")
///     .with_value(|_| async { Ok::<_, BoxError>(Created::new("sqlite::memory:".to_string())) })
///     .unwrap();
/// let workspace = create_factory("Workspace")
///     .field("db", Field::<String>::from_context("db"))
///     .with_value(|fields| async move {
///         Ok::<_, BoxError>(Created::new(format!("workspace on {}", fields.value::<String>("db")?)))
///     })
///     .unwrap();
///
/// let composition = Composition::builder()
///     .fixture("db", db.use_value())
///     .fixture("workspace", workspace.use_value())
///     .build()
///     .unwrap();
/// assert_eq!(composition.names().collect::<Vec<_>>(), vec!["db", "workspace"]);
/// ```
#[derive(Default)]
pub struct CompositionBuilder {
	registrations: Vec<Registration>,
	settings: HarnessSettings,
}

impl CompositionBuilder {
	/// Creates an empty builder.
	pub fn new() -> Self {
		Self::default()
	}

	/// Appends a fixture under `name`. Later fixtures may read it by that name.
	pub fn fixture(mut self, name: impl Into<String>, provider: impl FixtureProvider + 'static) -> Self {
		self.registrations.push(Registration {
			name: name.into(),
			provider: Arc::new(provider),
		});
		self
	}

	/// Settings used when running tests through the composition.
	pub fn settings(mut self, settings: HarnessSettings) -> Self {
		self.settings = settings;
		self
	}

	/// Checks and freezes the composition.
	///
	/// # Errors
	///
	/// [`FixtureError::DuplicateFixtureName`] if two fixtures share a name,
	/// [`FixtureError::MissingContextField`] if a fixture reads a fixture
	/// declared after it (or itself).
	pub fn build(self) -> FixtureResult<Composition> {
		let composition = Composition {
			registrations: self.registrations,
			settings: self.settings,
		};
		composition.check()?;
		Ok(composition)
	}
}

impl fmt::Debug for CompositionBuilder {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("CompositionBuilder")
			.field(
				"fixtures",
				&self.registrations.iter().map(|r| r.name.as_str()).collect::<Vec<_>>(),
			)
			.finish()
	}
}

/// Checked, ordered set of fixtures shared by a group of tests.
///
/// Cheap to clone. Tests run through it with [`Composition::run`] or
/// [`Composition::runner`].
#[derive(Clone, Default)]
pub struct Composition {
	pub(crate) registrations: Vec<Registration>,
	pub(crate) settings: HarnessSettings,
}

impl Composition {
	/// Starts a new composition.
	pub fn builder() -> CompositionBuilder {
		CompositionBuilder::new()
	}

	/// Appends every fixture of `other` after the fixtures of `self`.
	///
	/// The settings of `self` are kept.
	///
	/// # Errors
	///
	/// Same checks as [`CompositionBuilder::build`] over the merged list. A
	/// fixture of `self` that read a seeded entry now shadowed by a later
	/// fixture of `other` is reported as a forward reference.
	pub fn extend(mut self, other: Composition) -> FixtureResult<Composition> {
		self.registrations.extend(other.registrations);
		self.check()?;
		Ok(self)
	}

	/// Replaces the harness settings.
	pub fn with_settings(mut self, settings: HarnessSettings) -> Self {
		self.settings = settings;
		self
	}

	/// Current harness settings.
	pub fn settings(&self) -> &HarnessSettings {
		&self.settings
	}

	/// Fixture names in declaration order.
	pub fn names(&self) -> impl Iterator<Item = &str> {
		self.registrations.iter().map(|r| r.name.as_str())
	}

	/// Returns true if a fixture named `name` is composed.
	pub fn contains(&self, name: &str) -> bool {
		self.position(name).is_some()
	}

	/// Number of composed fixtures.
	pub fn len(&self) -> usize {
		self.registrations.len()
	}

	/// Returns true if nothing is composed.
	pub fn is_empty(&self) -> bool {
		self.registrations.is_empty()
	}

	/// Names that a test requesting `requested` sets up, in setup order.
	///
	/// `None` means every fixture. Otherwise the requested fixtures plus every
	/// composed fixture they read, directly or transitively.
	///
	/// # Errors
	///
	/// [`FixtureError::UnknownFixture`] for a requested name not in the
	/// composition.
	pub fn plan<S: AsRef<str>>(&self, requested: Option<&[S]>) -> FixtureResult<Vec<&str>> {
		Ok(self
			.plan_registrations(requested)?
			.into_iter()
			.map(|r| r.name.as_str())
			.collect())
	}

	pub(crate) fn plan_registrations<S: AsRef<str>>(
		&self,
		requested: Option<&[S]>,
	) -> FixtureResult<Vec<&Registration>> {
		let Some(requested) = requested else {
			return Ok(self.registrations.iter().collect());
		};

		let mut needed = vec![false; self.registrations.len()];
		for name in requested {
			let name = name.as_ref();
			let index = self
				.position(name)
				.ok_or_else(|| FixtureError::UnknownFixture(name.to_string()))?;
			needed[index] = true;
		}

		// Dependencies always point backwards, so one reverse sweep closes the set.
		for index in (0..self.registrations.len()).rev() {
			if !needed[index] {
				continue;
			}
			for dependency in self.registrations[index].provider.dependencies() {
				if let Some(position) = self.position(&dependency) {
					needed[position] = true;
				}
			}
		}

		Ok(self
			.registrations
			.iter()
			.zip(needed)
			.filter_map(|(registration, needed)| needed.then_some(registration))
			.collect())
	}

	fn position(&self, name: &str) -> Option<usize> {
		self.registrations.iter().position(|r| r.name == name)
	}

	fn check(&self) -> FixtureResult<()> {
		let mut seen = HashSet::with_capacity(self.registrations.len());
		for registration in &self.registrations {
			if !seen.insert(registration.name.as_str()) {
				return Err(FixtureError::DuplicateFixtureName(registration.name.clone()));
			}
		}

		for (index, registration) in self.registrations.iter().enumerate() {
			let provider = &registration.provider;
			for (field, spec) in provider.schema().iter() {
				let Some(dependency) = spec.dependency() else {
					continue;
				};
				if matches!(self.position(dependency), Some(position) if position >= index) {
					return Err(FixtureError::MissingContextField {
						fixture: provider.fixture_name().to_string(),
						field: field.to_string(),
						dependency: dependency.to_string(),
					});
				}
			}
		}

		tracing::debug!(fixtures = self.registrations.len(), "composition checked");
		Ok(())
	}
}

impl fmt::Debug for Composition {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Composition")
			.field("fixtures", &self.names().collect::<Vec<_>>())
			.field("settings", &self.settings)
			.finish()
	}
}
