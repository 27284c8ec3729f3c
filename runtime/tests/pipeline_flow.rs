//! End-to-end pipeline behaviour: ordering, short-circuits, postprocessing
//! and the guardian.

#![allow(clippy::unwrap_used)]

use railyard_core::envelope::{Outcome, Request, Response};
use railyard_core::repository::{Readable, ReadOnly, Setter};
use railyard_core::{Entity, EntityId};
use railyard_runtime::adapters::{handler_fn, middleware_fn, postprocessor_fn};
use railyard_runtime::config::PipelineConfig;
use railyard_runtime::guardian::guardian;
use railyard_runtime::pipeline::Pipeline;
use railyard_testing::helpers::init_tracing;
use railyard_testing::{
    Account, InMemoryRepository, PipelineTest, RequireFields, StaticValidator,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct Trace {
    steps: Mutex<Vec<&'static str>>,
    handler_calls: AtomicUsize,
}

impl Trace {
    fn push(&self, step: &'static str) {
        self.steps.lock().unwrap().push(step);
    }

    fn steps(&self) -> Vec<&'static str> {
        self.steps.lock().unwrap().clone()
    }
}

fn step(name: &'static str) -> impl railyard_core::Middleware<Trace> {
    middleware_fn(name, move |request: Request, env: &Trace| {
        Box::pin(async move {
            env.push(name);
            Outcome::next(request)
        })
    })
}

fn answer() -> impl railyard_core::Handler<Trace> {
    handler_fn("answer", |_request: Request, env: &Trace| {
        Box::pin(async move {
            env.push("answer");
            env.handler_calls.fetch_add(1, Ordering::SeqCst);
            Outcome::from(Response::json(json!([])))
        })
    })
}

fn append(label: &'static str) -> impl railyard_core::Postprocessor<Trace> {
    postprocessor_fn(label, move |response: Response, env: &Trace| {
        Box::pin(async move {
            env.push(label);
            let mut items = response.data().as_array().cloned().unwrap_or_default();
            items.push(json!(label));
            response.with_data(Value::Array(items))
        })
    })
}

#[tokio::test]
async fn stages_run_in_declaration_order() {
    init_tracing();
    let pipeline = Pipeline::builder()
        .middleware(step("first"))
        .middleware(step("second"))
        .handler(answer())
        .build()
        .unwrap();

    let env = PipelineTest::new(pipeline)
        .with_env(Trace::default())
        .when_request(Request::empty())
        .then_status(200)
        .run()
        .await;

    assert_eq!(env.steps(), vec!["first", "second", "answer"]);
}

#[tokio::test]
async fn middleware_response_prevents_every_later_stage() {
    let reject = middleware_fn("reject", |_request: Request, env: &Trace| {
        Box::pin(async move {
            env.push("reject");
            Outcome::from(Response::json(json!({"denied": true})).with_status(401))
        })
    });
    let pipeline = Pipeline::builder()
        .middleware(reject)
        .middleware(step("after"))
        .handler(answer())
        .postprocessor(append("A"))
        .build()
        .unwrap();

    let env = PipelineTest::new(pipeline)
        .with_env(Trace::default())
        .when_request(Request::empty())
        .then_status(401)
        .then_response(|response| assert_eq!(response.data(), &json!({"denied": true})))
        .run()
        .await;

    assert_eq!(env.steps(), vec!["reject"]);
    assert_eq!(env.handler_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn postprocessors_compose_in_declaration_order() {
    let pipeline = Pipeline::builder()
        .handler(answer())
        .postprocessor(append("A"))
        .postprocessor(append("B"))
        .build()
        .unwrap();

    let env = PipelineTest::new(pipeline)
        .with_env(Trace::default())
        .when_request(Request::empty())
        .then_response(|response| assert_eq!(response.data(), &json!(["A", "B"])))
        .run()
        .await;

    assert_eq!(env.steps(), vec!["answer", "A", "B"]);
}

#[tokio::test]
async fn slow_stages_are_reported_without_reordering() {
    init_tracing();
    let slow = middleware_fn("slow", |request: Request, env: &Trace| {
        Box::pin(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            env.push("slow");
            Outcome::next(request)
        })
    });
    let pipeline = Pipeline::builder()
        .config(PipelineConfig::default().with_slow_stage_threshold(Duration::from_millis(1)))
        .middleware(slow)
        .middleware(step("fast"))
        .handler(answer())
        .build()
        .unwrap();

    let env = PipelineTest::new(pipeline)
        .with_env(Trace::default())
        .when_request(Request::empty())
        .then_status(200)
        .run()
        .await;

    assert_eq!(env.steps(), vec!["slow", "fast", "answer"]);
}

#[tokio::test]
async fn fall_through_returns_next() {
    let decline = handler_fn("decline", |request: Request, _env: &Trace| {
        Box::pin(async move { Outcome::next(request.with_meta("declined", json!(true))) })
    });
    let pipeline = Pipeline::builder().handler(decline).build().unwrap();

    PipelineTest::new(pipeline)
        .with_env(Trace::default())
        .when_request(Request::empty())
        .then_next(|next| assert_eq!(next.request.meta("declined"), Some(&json!(true))))
        .run()
        .await;
}

struct Env {
    accounts: ReadOnly<Arc<InMemoryRepository<Account>>>,
}

fn lookup() -> impl railyard_core::Handler<Env> {
    handler_fn("lookup", |request: Request, env: &Env| {
        Box::pin(async move {
            let id = EntityId::new(request.data()["id"].as_str().unwrap_or_default());
            let found: Result<Option<Account>, _> = env.accounts.get(&id).await;
            let response = match found {
                Ok(Some(account)) => Response::json(json!({"email": account.email})),
                Ok(None) => Response::json(json!({"error": "not found"})).with_status(404),
                Err(error) => Response::json(json!({"error": error.to_string()})).with_status(500),
            };
            Outcome::from(response)
        })
    })
}

#[tokio::test]
async fn guardian_rejects_before_the_handler_runs() {
    let pipeline = Pipeline::builder()
        .middleware(guardian(StaticValidator::rejecting(["bad"])))
        .handler(lookup())
        .build()
        .unwrap();

    PipelineTest::new(pipeline)
        .with_env(Env {
            accounts: ReadOnly::new(Arc::new(InMemoryRepository::new())),
        })
        .when_request(Request::new(json!({"id": "1"}), json!({})))
        .then_response(|response| {
            assert_eq!(response.data(), &json!({"errors": ["bad"]}));
            assert_eq!(response.metadata(), &json!({"headers": {"status": 400}}));
        })
        .run()
        .await;
}

#[tokio::test]
async fn guardian_admits_valid_requests_to_a_read_only_handler() {
    let accounts = Arc::new(InMemoryRepository::<Account>::new());
    let stored = accounts.set(Account::new("ada@example.com")).await.unwrap();

    let pipeline = Pipeline::builder()
        .middleware(guardian(RequireFields::new(["id"])))
        .handler(lookup())
        .build()
        .unwrap();
    let test = |request: Request| {
        PipelineTest::new(pipeline.clone()).with_env(Env {
            accounts: ReadOnly::new(Arc::clone(&accounts)),
        })
        .when_request(request)
    };

    test(Request::new(json!({"id": stored.id().as_str()}), json!({})))
        .then_status(200)
        .then_response(|response| assert_eq!(response.data()["email"], json!("ada@example.com")))
        .run()
        .await;

    test(Request::new(json!({"id": "missing"}), json!({})))
        .then_status(404)
        .run()
        .await;

    test(Request::empty())
        .then_status(400)
        .then_response(|response| assert_eq!(response.data()["errors"], json!(["id is required"])))
        .run()
        .await;
}
