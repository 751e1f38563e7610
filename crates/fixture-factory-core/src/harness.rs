//! Reference test harness.
//!
//! Runs one test body against a [`Composition`]: sets up the planned fixtures
//! in declaration order, hands the grown [`TestContext`] to the body, then
//! tears down every fixture whose setup succeeded, in exact reverse order.
//! Teardown runs whatever happened before it: setup failure, body error, body
//! panic or timeout.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use tracing::Instrument;

use crate::composition::Composition;
use crate::context::TestContext;
use crate::error::{BoxError, FailureCause, FixtureError, panic_message};
use crate::provider::FixtureTeardown;
use crate::settings::HarnessSettings;

/// Setup and teardown sequences observed during one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestReport {
	/// Fixtures whose setup succeeded, in setup order.
	pub setup: Vec<String>,
	/// Fixtures whose teardown was attempted, in teardown order.
	pub teardown: Vec<String>,
}

impl TestReport {
	/// Returns true if teardown visited exactly the set-up fixtures in reverse.
	pub fn is_reverse_of_setup(&self) -> bool {
		self.setup.iter().rev().eq(self.teardown.iter())
	}
}

/// A run that passed: the body's value and what the harness did.
#[derive(Debug)]
pub struct TestOutcome<R> {
	/// Value returned by the body.
	pub value: R,
	/// Lifecycle report.
	pub report: TestReport,
}

/// A run that failed.
///
/// `cause` is the primary failure. It is `None` when setup and body succeeded
/// but at least one teardown failed.
#[derive(Debug)]
pub struct TestFailure {
	/// Primary failure, if any.
	pub cause: Option<FailureCause>,
	/// Every teardown failure, in the order they happened.
	pub teardown_errors: Vec<FixtureError>,
	/// Lifecycle report.
	pub report: TestReport,
}

impl fmt::Display for TestFailure {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match &self.cause {
			Some(cause) => write!(f, "{cause}")?,
			None => f.write_str("test passed but teardown failed")?,
		}
		if !self.teardown_errors.is_empty() {
			write!(f, " ({} teardown error(s))", self.teardown_errors.len())?;
		}
		Ok(())
	}
}

impl std::error::Error for TestFailure {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		match &self.cause {
			Some(cause) => Some(cause as &(dyn std::error::Error + 'static)),
			None => self
				.teardown_errors
				.first()
				.map(|error| error as &(dyn std::error::Error + 'static)),
		}
	}
}

/// Configures a single run.
///
/// Obtained from [`Composition::runner`].
#[derive(Debug)]
pub struct TestRunner<'a> {
	composition: &'a Composition,
	requested: Option<Vec<String>>,
	context: TestContext,
}

impl<'a> TestRunner<'a> {
	/// Only set up `names` and the composed fixtures they read.
	pub fn requesting<I, S>(mut self, names: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.requested = Some(names.into_iter().map(Into::into).collect());
		self
	}

	/// Starts from `context` instead of an empty one.
	pub fn with_context(mut self, context: TestContext) -> Self {
		self.context = context;
		self
	}

	/// Adds an externally owned entry to the starting context.
	pub fn seed<T: Any + Send + Sync>(mut self, name: impl Into<String>, value: T) -> Self {
		self.context = self.context.with_entry(name, value);
		self
	}

	/// Runs `body` between setup and teardown.
	///
	/// # Errors
	///
	/// [`TestFailure`] describing the primary failure and every teardown
	/// failure. With [`HarnessSettings::resume_panics`] a body panic is
	/// re-raised after teardown instead.
	pub async fn run<F, Fut, R, E>(self, body: F) -> Result<TestOutcome<R>, TestFailure>
	where
		F: FnOnce(TestContext) -> Fut,
		Fut: Future<Output = Result<R, E>>,
		E: Into<BoxError>,
	{
		let TestRunner {
			composition,
			requested,
			context,
		} = self;
		let plan = match composition.plan_registrations(requested.as_deref()) {
			Ok(plan) => plan,
			Err(error) => {
				return Err(TestFailure {
					cause: Some(FailureCause::Setup(error)),
					teardown_errors: Vec::new(),
					report: TestReport::default(),
				});
			}
		};
		let settings = &composition.settings;
		let span = tracing::debug_span!("fixture_test", fixtures = plan.len());

		async move {
			let mut stack: Vec<(String, Box<dyn FixtureTeardown>)> = Vec::with_capacity(plan.len());
			let mut report = TestReport::default();

			let work = async {
				let mut ctx = context;
				for registration in &plan {
					if ctx.contains(&registration.name) {
						return Err(Interrupted::Cause(FailureCause::Setup(
							FixtureError::DuplicateFixtureName(registration.name.clone()),
						)));
					}
					lifecycle(settings, &registration.name, "setup");
					// Extractors, default thunks and custom providers run inside setup.
					let setup = AssertUnwindSafe(registration.provider.setup(&ctx)).catch_unwind();
					let (value, teardown) = match setup.await {
						Ok(Ok(active)) => active.into_parts(),
						Ok(Err(error)) => return Err(Interrupted::Cause(FailureCause::Setup(error))),
						Err(payload) => {
							return Err(Interrupted::Cause(FailureCause::Setup(
								FixtureError::Constructor {
									fixture: registration.provider.fixture_name().to_string(),
									source: format!("setup panicked: {}", panic_message(payload.as_ref()))
										.into(),
								},
							)));
						}
					};
					ctx.insert_value(registration.name.clone(), value);
					stack.push((registration.name.clone(), teardown));
					report.setup.push(registration.name.clone());
				}

				match AssertUnwindSafe(body(ctx)).catch_unwind().await {
					Ok(Ok(value)) => Ok(value),
					Ok(Err(error)) => Err(Interrupted::Cause(FailureCause::Body(error.into()))),
					Err(payload) => Err(Interrupted::Panic(payload)),
				}
			};

			let primary = match settings.timeout() {
				Some(limit) => match tokio::time::timeout(limit, work).await {
					Ok(result) => result,
					Err(_) => Err(Interrupted::Cause(FailureCause::Timeout(limit))),
				},
				None => work.await,
			};

			if let Err(interrupted) = &primary {
				tracing::warn!(cause = %interrupted, "test interrupted; tearing down");
			}

			let mut teardown_errors = Vec::new();
			while let Some((name, mut teardown)) = stack.pop() {
				lifecycle(settings, &name, "teardown");
				let errors = match AssertUnwindSafe(teardown.teardown()).catch_unwind().await {
					Ok(errors) => errors,
					Err(payload) => vec![FixtureError::Teardown {
						fixture: name.clone(),
						source: format!("teardown panicked: {}", panic_message(payload.as_ref()))
							.into(),
					}],
				};
				for error in &errors {
					tracing::warn!(fixture = %name, %error, "teardown failed");
				}
				teardown_errors.extend(errors);
				report.teardown.push(name);
			}

			let cause = match primary {
				Ok(value) if teardown_errors.is_empty() => {
					return Ok(TestOutcome { value, report });
				}
				Ok(_) => None,
				Err(Interrupted::Cause(cause)) => Some(cause),
				Err(Interrupted::Panic(payload)) => {
					if settings.resume_panics {
						std::panic::resume_unwind(payload);
					}
					Some(FailureCause::Panic(panic_message(payload.as_ref())))
				}
			};
			Err(TestFailure {
				cause,
				teardown_errors,
				report,
			})
		}
		.instrument(span)
		.await
	}
}

enum Interrupted {
	Cause(FailureCause),
	Panic(Box<dyn Any + Send>),
}

impl fmt::Display for Interrupted {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Cause(cause) => write!(f, "{cause}"),
			Self::Panic(payload) => write!(f, "test body panicked: {}", panic_message(payload.as_ref())),
		}
	}
}

fn lifecycle(settings: &HarnessSettings, fixture: &str, phase: &'static str) {
	if settings.log_lifecycle {
		tracing::info!(fixture, phase, "fixture lifecycle");
	} else {
		tracing::debug!(fixture, phase, "fixture lifecycle");
	}
}

impl Composition {
	/// Configures a run with a subset of fixtures or a seeded context.
	pub fn runner(&self) -> TestRunner<'_> {
		TestRunner {
			composition: self,
			requested: None,
			context: TestContext::new(),
		}
	}

	/// Runs `body` with every fixture set up.
	///
	/// Shorthand for `self.runner().run(body)`.
	pub async fn run<F, Fut, R, E>(&self, body: F) -> Result<TestOutcome<R>, TestFailure>
	where
		F: FnOnce(TestContext) -> Fut,
		Fut: Future<Output = Result<R, E>>,
		E: Into<BoxError>,
	{
		self.runner().run(body).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::factory::{FixtureFactory, create_factory};
	use crate::field::Field;
	use crate::instance::Created;
	use crate::provider::Creator;
	use crate::resolver::Overrides;
	use parking_lot::Mutex;
	use rstest::{fixture, rstest};
	use std::sync::Arc;
	use std::time::Duration;

	type Log = Arc<Mutex<Vec<String>>>;

	#[fixture]
	fn log() -> Log {
		Arc::default()
	}

	fn tracked(name: &str, log: &Log, dependency: Option<&str>) -> FixtureFactory<String> {
		let mut builder = create_factory(name);
		if let Some(dependency) = dependency {
			builder = builder.field("parent", Field::<String>::from_context(dependency));
		}
		let log = log.clone();
		let label = name.to_string();
		builder
			.with_value(move |_| {
				let log = log.clone();
				let label = label.clone();
				async move {
					log.lock().push(format!("setup {label}"));
					Ok::<_, BoxError>(Created::new(label.clone()).with_destroy(move || async move {
						log.lock().push(format!("teardown {label}"));
						Ok::<_, BoxError>(())
					}))
				}
			})
			.unwrap()
	}

	fn failing(name: &str) -> FixtureFactory<String> {
		create_factory(name)
			.with_value(|_| async { Err::<Created<String>, _>("insert rejected") })
			.unwrap()
	}

	#[rstest]
	#[tokio::test]
	async fn test_run_sets_up_in_order_and_tears_down_in_reverse(log: Log) {
		// Arrange
		let composition = Composition::builder()
			.fixture("db", tracked("Db", &log, None).use_value())
			.fixture("workspace", tracked("Workspace", &log, Some("db")).use_value())
			.build()
			.unwrap();
		let body_log = log.clone();

		// Act
		let outcome = composition
			.run(|ctx| async move {
				body_log.lock().push("body".to_string());
				ctx.require::<String>("workspace")
			})
			.await
			.unwrap();

		// Assert
		assert_eq!(*outcome.value, "Workspace");
		assert_eq!(
			*log.lock(),
			vec!["setup Db", "setup Workspace", "body", "teardown Workspace", "teardown Db"]
		);
		assert_eq!(outcome.report.setup, vec!["db", "workspace"]);
		assert!(outcome.report.is_reverse_of_setup());
	}

	#[rstest]
	#[tokio::test]
	async fn test_setup_failure_tears_down_earlier_fixtures(log: Log) {
		let composition = Composition::builder()
			.fixture("db", tracked("Db", &log, None).use_value())
			.fixture("workspace", failing("Workspace").use_value())
			.fixture("user", tracked("User", &log, None).use_value())
			.build()
			.unwrap();

		let failure = composition
			.run(|_| async { Ok::<_, BoxError>(()) })
			.await
			.unwrap_err();

		assert!(matches!(
			failure.cause,
			Some(FailureCause::Setup(FixtureError::Constructor { ref fixture, .. })) if fixture == "Workspace"
		));
		assert_eq!(*log.lock(), vec!["setup Db", "teardown Db"]);
		assert_eq!(failure.report.setup, vec!["db"]);
		assert_eq!(failure.report.teardown, vec!["db"]);
	}

	#[rstest]
	#[tokio::test]
	async fn test_setup_panic_tears_down_earlier_fixtures(log: Log) {
		// Arrange
		let workspace = create_factory("Workspace")
			.field(
				"first_byte",
				Field::<u8>::from_context_with("db", |label: &String| label.as_bytes()[99]),
			)
			.with_value(|fields| async move {
				Ok::<_, BoxError>(Created::new(fields.value::<u8>("first_byte")?))
			})
			.unwrap();
		let composition = Composition::builder()
			.fixture("db", tracked("Db", &log, None).use_value())
			.fixture("workspace", workspace.use_value())
			.build()
			.unwrap();

		// Act
		let failure = composition
			.run(|_| async { Ok::<_, BoxError>(()) })
			.await
			.unwrap_err();

		// Assert
		match failure.cause {
			Some(FailureCause::Setup(FixtureError::Constructor { fixture, source })) => {
				assert_eq!(fixture, "Workspace");
				assert!(source.to_string().starts_with("setup panicked"));
			}
			other => panic!("expected setup failure, got {other:?}"),
		}
		assert_eq!(*log.lock(), vec!["setup Db", "teardown Db"]);
		assert_eq!(failure.report.setup, vec!["db"]);
		assert_eq!(failure.report.teardown, vec!["db"]);
	}

	#[rstest]
	#[tokio::test]
	async fn test_setup_timeout_tears_down_completed_setups(log: Log) {
		// Arrange
		let slow = create_factory("Workspace")
			.with_value(|_| async {
				tokio::time::sleep(Duration::from_secs(5)).await;
				Ok::<_, BoxError>(Created::new(()))
			})
			.unwrap();
		let composition = Composition::builder()
			.fixture("db", tracked("Db", &log, None).use_value())
			.fixture("workspace", slow.use_value())
			.settings(HarnessSettings::new().with_timeout(Duration::from_millis(20)))
			.build()
			.unwrap();
		let body_log = log.clone();

		// Act
		let failure = composition
			.run(|_| async move {
				body_log.lock().push("body".to_string());
				Ok::<_, BoxError>(())
			})
			.await
			.unwrap_err();

		// Assert
		assert!(matches!(failure.cause, Some(FailureCause::Timeout(d)) if d == Duration::from_millis(20)));
		assert_eq!(failure.report.setup, vec!["db"]);
		assert_eq!(failure.report.teardown, vec!["db"]);
		assert_eq!(*log.lock(), vec!["setup Db", "teardown Db"]);
	}

	#[rstest]
	#[tokio::test]
	async fn test_body_error_still_tears_down(log: Log) {
		let composition = Composition::builder()
			.fixture("db", tracked("Db", &log, None).use_value())
			.build()
			.unwrap();

		let failure = composition
			.run(|_| async { Err::<(), _>("assertion failed") })
			.await
			.unwrap_err();

		assert!(matches!(failure.cause, Some(FailureCause::Body(ref e)) if e.to_string() == "assertion failed"));
		assert_eq!(*log.lock(), vec!["setup Db", "teardown Db"]);
		assert!(failure.teardown_errors.is_empty());
	}

	#[rstest]
	#[tokio::test]
	async fn test_body_panic_is_caught(log: Log) {
		let composition = Composition::builder()
			.fixture("db", tracked("Db", &log, None).use_value())
			.build()
			.unwrap();

		let failure = composition
			.run(|_| async {
				if true {
					panic!("expected 8, got 7");
				}
				Ok::<_, BoxError>(())
			})
			.await
			.unwrap_err();

		assert!(matches!(failure.cause, Some(FailureCause::Panic(ref m)) if m == "expected 8, got 7"));
		assert_eq!(*log.lock(), vec!["setup Db", "teardown Db"]);
	}

	#[rstest]
	#[tokio::test]
	async fn test_resume_panics_reraises_after_teardown(log: Log) {
		let composition = Composition::builder()
			.fixture("db", tracked("Db", &log, None).use_value())
			.settings(HarnessSettings::new().with_resume_panics(true))
			.build()
			.unwrap();

		let result = AssertUnwindSafe(composition.run(|_| async {
			if true {
				panic!("boom");
			}
			Ok::<_, BoxError>(())
		}))
		.catch_unwind()
		.await;

		assert!(result.is_err());
		assert_eq!(*log.lock(), vec!["setup Db", "teardown Db"]);
	}

	#[rstest]
	#[tokio::test]
	async fn test_timeout_tears_down_completed_setups(log: Log) {
		let composition = Composition::builder()
			.fixture("db", tracked("Db", &log, None).use_value())
			.settings(HarnessSettings::new().with_timeout(Duration::from_millis(20)))
			.build()
			.unwrap();

		let failure = composition
			.run(|_| async {
				tokio::time::sleep(Duration::from_secs(5)).await;
				Ok::<_, BoxError>(())
			})
			.await
			.unwrap_err();

		assert!(matches!(failure.cause, Some(FailureCause::Timeout(d)) if d == Duration::from_millis(20)));
		assert_eq!(*log.lock(), vec!["setup Db", "teardown Db"]);
	}

	#[rstest]
	#[tokio::test]
	async fn test_teardown_failure_alone_fails_the_run() {
		let db = create_factory("Db")
			.with_value(|_| async {
				Ok::<_, BoxError>(
					Created::new(()).with_destroy(|| async { Err::<(), _>("connection reset") }),
				)
			})
			.unwrap();
		let composition = Composition::builder()
			.fixture("db", db.use_value())
			.build()
			.unwrap();

		let failure = composition
			.run(|_| async { Ok::<_, BoxError>(()) })
			.await
			.unwrap_err();

		assert!(failure.cause.is_none());
		assert_eq!(failure.teardown_errors.len(), 1);
		assert_eq!(failure.report.teardown, vec!["db"]);
		assert!(failure.to_string().contains("teardown"));
	}

	#[rstest]
	#[tokio::test]
	async fn test_creator_instances_destroyed_before_dependencies(log: Log) {
		// Arrange
		let document = {
			let log = log.clone();
			create_factory("Document")
				.field("workspace", Field::<String>::from_context("workspace"))
				.field("public_id", Field::<i64>::default_value(1))
				.with_value(move |fields| {
					let log = log.clone();
					async move {
						let public_id = fields.value::<i64>("public_id")?;
						log.lock().push(format!("create document {public_id}"));
						Ok::<_, BoxError>(Created::new(public_id).with_destroy(move || async move {
							log.lock().push(format!("delete document {public_id}"));
							Ok::<_, BoxError>(())
						}))
					}
				})
				.unwrap()
		};
		let composition = Composition::builder()
			.fixture("workspace", tracked("Workspace", &log, None).use_value())
			.fixture("create_document", document.use_create_value())
			.build()
			.unwrap();

		// Act
		composition
			.run(|ctx| async move {
				let create = ctx.require::<Creator<i64>>("create_document")?;
				create.create(Overrides::new().set("public_id", 7i64)).await?;
				create.create_default().await?;
				Ok::<_, BoxError>(())
			})
			.await
			.unwrap();

		// Assert
		assert_eq!(
			*log.lock(),
			vec![
				"setup Workspace",
				"create document 7",
				"create document 1",
				"delete document 1",
				"delete document 7",
				"teardown Workspace",
			]
		);
	}

	#[rstest]
	#[tokio::test]
	async fn test_requested_subset(log: Log) {
		let composition = Composition::builder()
			.fixture("db", tracked("Db", &log, None).use_value())
			.fixture("workspace", tracked("Workspace", &log, Some("db")).use_value())
			.fixture("cache", tracked("Cache", &log, None).use_value())
			.build()
			.unwrap();

		let outcome = composition
			.runner()
			.requesting(["workspace"])
			.run(|ctx| async move { Ok::<_, BoxError>(ctx.contains("cache")) })
			.await
			.unwrap();

		assert!(!outcome.value);
		assert_eq!(outcome.report.setup, vec!["db", "workspace"]);
	}

	#[rstest]
	#[tokio::test]
	async fn test_unknown_request_fails_before_setup(log: Log) {
		let composition = Composition::builder()
			.fixture("db", tracked("Db", &log, None).use_value())
			.build()
			.unwrap();

		let failure = composition
			.runner()
			.requesting(["cache"])
			.run(|_| async { Ok::<_, BoxError>(()) })
			.await
			.unwrap_err();

		assert!(matches!(
			failure.cause,
			Some(FailureCause::Setup(FixtureError::UnknownFixture(ref name))) if name == "cache"
		));
		assert!(log.lock().is_empty());
	}

	#[rstest]
	#[tokio::test]
	async fn test_seeded_context_feeds_fixtures(log: Log) {
		let composition = Composition::builder()
			.fixture("workspace", tracked("Workspace", &log, Some("pool")).use_value())
			.build()
			.unwrap();

		let outcome = composition
			.runner()
			.seed("pool", "postgres://localhost".to_string())
			.run(|ctx| async move { Ok::<_, BoxError>(ctx.names().count()) })
			.await
			.unwrap();

		assert_eq!(outcome.value, 2);
	}

	#[rstest]
	#[tokio::test]
	async fn test_seed_clashing_with_fixture_fails(log: Log) {
		let composition = Composition::builder()
			.fixture("db", tracked("Db", &log, None).use_value())
			.build()
			.unwrap();

		let failure = composition
			.runner()
			.seed("db", 1u8)
			.run(|_| async { Ok::<_, BoxError>(()) })
			.await
			.unwrap_err();

		assert!(matches!(
			failure.cause,
			Some(FailureCause::Setup(FixtureError::DuplicateFixtureName(_)))
		));
		assert!(log.lock().is_empty());
	}

	#[rstest]
	#[tokio::test]
	async fn test_missing_seed_is_reported_at_setup(log: Log) {
		let composition = Composition::builder()
			.fixture("workspace", tracked("Workspace", &log, Some("pool")).use_value())
			.build()
			.unwrap();

		let failure = composition
			.run(|_| async { Ok::<_, BoxError>(()) })
			.await
			.unwrap_err();

		assert!(matches!(
			failure.cause,
			Some(FailureCause::Setup(FixtureError::MissingContextField { ref dependency, .. })) if dependency == "pool"
		));
		assert!(failure.report.setup.is_empty());
	}
}
