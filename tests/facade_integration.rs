//! Facade integration tests
//!
//! The root crate re-exports the core (and, with `mocks`, the collaborator)
//! so suites depend on a single crate.

use fixture_factory::prelude::*;
use rstest::*;

#[rstest]
#[tokio::test]
async fn test_todo_fixture_through_facade() {
	// Arrange
	let todo = create_factory("Todo")
		.field("id", Field::<u32>::default_value(1))
		.field("completed", Field::<bool>::default_value(false))
		.with_value(|fields| async move {
			Ok::<_, BoxError>(Created::new((
				fields.value::<u32>("id")?,
				fields.value::<bool>("completed")?,
			)))
		})
		.unwrap();
	let composition = Composition::builder()
		.fixture("todo", todo.use_value_with(Overrides::new().set("completed", true)))
		.build()
		.unwrap();

	// Act
	let outcome = composition
		.run(|ctx| async move { ctx.require::<(u32, bool)>("todo") })
		.await
		.unwrap();

	// Assert
	assert_eq!(*outcome.value, (1, true));
	assert_eq!(outcome.report.setup, vec!["todo"]);
}

#[cfg(feature = "mocks")]
#[rstest]
#[tokio::test]
async fn test_mock_fixtures_through_facade() {
	use fixture_factory::mocks::fixtures::{use_db, use_workspace};
	use fixture_factory::mocks::{Db, Workspace};

	let composition = Composition::builder()
		.fixture("db", use_db().unwrap())
		.fixture("workspace", use_workspace().unwrap())
		.build()
		.unwrap();

	let outcome = composition
		.run(|ctx| async move {
			let db = ctx.require::<Db>("db")?;
			let workspace = ctx.require::<Workspace>("workspace")?;
			Ok::<_, BoxError>(db.get_next_public_id_for_document(&workspace.id).await?)
		})
		.await
		.unwrap();

	assert_eq!(outcome.value, 1);
}
