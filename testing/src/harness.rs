//! Given-When-Then harness for pipelines.

#![allow(clippy::module_name_repetitions)] // PipelineTest is the natural name

use railyard_core::envelope::{Next, Outcome, Request, Response};
use railyard_runtime::pipeline::Pipeline;

/// Type alias for response assertion functions
type ResponseAssertion = Box<dyn FnOnce(&Response)>;

/// Type alias for continuation assertion functions
type NextAssertion = Box<dyn FnOnce(&Next)>;

/// Fluent API for testing pipelines with Given-When-Then syntax
///
/// # Example
///
/// ```
/// use railyard_core::envelope::{Outcome, Request, Response};
/// use railyard_runtime::adapters::handler_fn;
/// use railyard_runtime::pipeline::Pipeline;
/// use railyard_testing::PipelineTest;
/// use serde_json::json;
///
/// # tokio_test::block_on(async {
/// let pipeline = Pipeline::<()>::builder()
///     .handler(handler_fn("echo", |request: Request, _env: &()| {
///         Box::pin(async move { Outcome::from(Response::json(request.data().clone())) })
///     }))
///     .build()
///     .unwrap();
///
/// PipelineTest::new(pipeline)
///     .with_env(())
///     .when_request(Request::new(json!({"ping": 1}), json!({})))
///     .then_status(200)
///     .then_response(|response| assert_eq!(response.data(), &json!({"ping": 1})))
///     .run()
///     .await;
/// # });
/// ```
pub struct PipelineTest<Env> {
    pipeline: Pipeline<Env>,
    environment: Option<Env>,
    request: Option<Request>,
    response_assertions: Vec<ResponseAssertion>,
    next_assertions: Vec<NextAssertion>,
}

impl<Env: Sync> PipelineTest<Env> {
    /// Create a new pipeline test for `pipeline`
    #[must_use]
    pub const fn new(pipeline: Pipeline<Env>) -> Self {
        Self {
            pipeline,
            environment: None,
            request: None,
            response_assertions: Vec::new(),
            next_assertions: Vec::new(),
        }
    }

    /// Set the environment for the test (Given)
    #[must_use]
    pub fn with_env(mut self, env: Env) -> Self {
        self.environment = Some(env);
        self
    }

    /// Set the request to run (When)
    #[must_use]
    pub fn when_request(mut self, request: Request) -> Self {
        self.request = Some(request);
        self
    }

    /// Expect a response and assert on it (Then)
    #[must_use]
    pub fn then_response<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&Response) + 'static,
    {
        self.response_assertions.push(Box::new(assertion));
        self
    }

    /// Expect a response with this status (Then)
    #[must_use]
    pub fn then_status(self, status: u16) -> Self {
        self.then_response(move |response| assert_eq!(response.status(), status))
    }

    /// Expect the run to fall through and assert on the final `Next` (Then)
    #[must_use]
    pub fn then_next<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&Next) + 'static,
    {
        self.next_assertions.push(Box::new(assertion));
        self
    }

    /// Run the pipeline and execute all assertions
    ///
    /// Returns the environment so callers can inspect side effects.
    ///
    /// # Panics
    ///
    /// Panics if the request or environment is not set, if the outcome kind
    /// does not match the registered assertions, or if any assertion fails.
    #[allow(clippy::panic)] // Test code can panic
    #[allow(clippy::expect_used)] // Test code can use expect
    pub async fn run(self) -> Env {
        let request = self.request.expect("Request must be set with when_request()");
        let env = self
            .environment
            .expect("Environment must be set with with_env()");

        match self.pipeline.run(request, &env).await {
            Outcome::Response(response) => {
                assert!(
                    self.next_assertions.is_empty(),
                    "Expected the pipeline to fall through, got response {response:?}"
                );
                for assertion in self.response_assertions {
                    assertion(&response);
                }
            }
            Outcome::Next(next) => {
                assert!(
                    self.response_assertions.is_empty(),
                    "Expected a response, the pipeline fell through with {next:?}"
                );
                for assertion in self.next_assertions {
                    assertion(&next);
                }
            }
        }
        env
    }
}
