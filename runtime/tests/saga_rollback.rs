//! Saga rollback across repositories: LIFO order, best-effort compensation
//! and `UnitOfWork::run`.

#![allow(clippy::unwrap_used, clippy::panic)]

use futures::FutureExt;
use railyard_core::repository::{Readable, Remover, RepositoryError, Setter};
use railyard_core::{Entity, EntityId};
use railyard_runtime::saga::{InverseOperation, SagaError, SagaRepository, UnitOfWork};
use railyard_testing::{
    Account, Call, FaultyRepository, InMemoryRepository, Operation, RecordingRepository,
};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

type Recorded = RecordingRepository<InMemoryRepository<Account>>;

fn recorded() -> Arc<Recorded> {
    Arc::new(RecordingRepository::new(InMemoryRepository::new()))
}

#[tokio::test]
async fn rollback_applies_inverses_newest_first() {
    let repo = recorded();
    let y = repo
        .set(Account::new("y@example.com").with_id(EntityId::new("y")))
        .await
        .unwrap();
    repo.reset();

    let saga = UnitOfWork::new();
    let proxy = SagaRepository::new("accounts", Arc::clone(&repo), &saga);
    let x = proxy
        .set(Account::new("x@example.com").with_id(EntityId::new("x")))
        .await
        .unwrap();
    proxy.remove(y.id()).await.unwrap();

    assert_eq!(
        saga.operations()
            .into_iter()
            .map(|op| op.inverse)
            .collect::<Vec<_>>(),
        vec![
            InverseOperation::Remove { id: x.id().clone() },
            InverseOperation::Restore { id: y.id().clone() },
        ]
    );

    repo.reset();
    assert_eq!(saga.rollback().await, Ok(2));

    assert_eq!(
        repo.calls(),
        vec![Call::on(Operation::Set, "y"), Call::on(Operation::Remove, "x")]
    );
    assert_eq!(repo.inner().get(y.id()).await.unwrap(), Some(y));
    assert!(!repo.inner().contains(x.id()));
}

#[tokio::test]
async fn rollback_spans_repositories() {
    let accounts = Arc::new(InMemoryRepository::<Account>::new());
    let archive = Arc::new(InMemoryRepository::<Account>::new());

    let saga = UnitOfWork::new();
    let live = SagaRepository::new("accounts", Arc::clone(&accounts), &saga);
    let archived = SagaRepository::new("archive", Arc::clone(&archive), &saga);

    live.set(Account::new("ada@example.com")).await.unwrap();
    archived.set(Account::new("ada@example.com")).await.unwrap();
    assert_eq!(saga.len(), 2);

    saga.rollback().await.unwrap();
    assert!(accounts.is_empty());
    assert!(archive.is_empty());
}

#[tokio::test]
async fn failed_inverse_does_not_stop_the_others() {
    let inner = InMemoryRepository::<Account>::new();
    let repo = Arc::new(FaultyRepository::new(inner.clone()).failing_on(
        Operation::Remove,
        "x",
        RepositoryError::Unavailable("replica down".into()),
    ));

    let saga = UnitOfWork::new();
    let proxy = SagaRepository::new("accounts", Arc::clone(&repo), &saga);
    proxy
        .set(Account::new("x@example.com").with_id(EntityId::new("x")))
        .await
        .unwrap();
    proxy
        .set(Account::new("z@example.com").with_id(EntityId::new("z")))
        .await
        .unwrap();

    let Err(SagaError::CompensationFailed {
        failures,
        compensated,
    }) = saga.rollback().await
    else {
        panic!("expected a compensation failure");
    };

    assert_eq!(compensated, 1);
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].operation.repository, "accounts");
    assert_eq!(
        failures[0].operation.inverse,
        InverseOperation::Remove {
            id: EntityId::new("x")
        }
    );
    assert_eq!(
        failures[0].error,
        RepositoryError::Unavailable("replica down".into())
    );
    assert!(inner.contains(&EntityId::new("x")));
    assert!(!inner.contains(&EntityId::new("z")));
    assert!(saga.is_empty());
}

#[tokio::test]
async fn failed_restore_is_reported_and_earlier_writes_are_still_undone() {
    let inner = InMemoryRepository::<Account>::new();
    let y = inner
        .set(Account::new("y@example.com").with_id(EntityId::new("y")))
        .await
        .unwrap();
    let repo = Arc::new(FaultyRepository::new(inner.clone()).failing_on(
        Operation::Set,
        "y",
        RepositoryError::Unavailable("primary down".into()),
    ));

    let saga = UnitOfWork::new();
    let proxy = SagaRepository::new("accounts", Arc::clone(&repo), &saga);
    proxy
        .set(Account::new("x@example.com").with_id(EntityId::new("x")))
        .await
        .unwrap();
    proxy.remove(y.id()).await.unwrap();

    let Err(SagaError::CompensationFailed {
        failures,
        compensated,
    }) = saga.rollback().await
    else {
        panic!("expected a compensation failure");
    };

    assert_eq!(compensated, 1);
    assert_eq!(failures.len(), 1);
    assert_eq!(
        failures[0].operation.inverse,
        InverseOperation::Restore { id: y.id().clone() }
    );
    assert_eq!(
        failures[0].error,
        RepositoryError::Unavailable("primary down".into())
    );
    assert!(!inner.contains(&EntityId::new("x")));
    assert!(!inner.contains(y.id()));
}

#[tokio::test]
async fn failed_write_logs_nothing() {
    let repo = Arc::new(
        FaultyRepository::new(InMemoryRepository::<Account>::new())
            .failing(Operation::Set, RepositoryError::Backend("disk full".into())),
    );
    let saga = UnitOfWork::new();
    let proxy = SagaRepository::new("accounts", repo, &saga);

    assert!(proxy.set(Account::new("ada@example.com")).await.is_err());
    assert!(saga.is_empty());
}

#[tokio::test]
async fn run_rolls_back_on_business_failure() {
    let accounts = Arc::new(InMemoryRepository::<Account>::new());

    let aborted = UnitOfWork::run(|saga| {
        let proxy = SagaRepository::new("accounts", Arc::clone(&accounts), &saga);
        async move {
            proxy
                .set(Account::new("ada@example.com"))
                .await
                .map_err(|e| e.to_string())?;
            Err::<(), _>("insufficient funds".to_string())
        }
    })
    .await
    .unwrap_err();

    assert_eq!(aborted.cause, "insufficient funds");
    assert!(aborted.is_fully_compensated());
    assert_eq!(aborted.rollback, Ok(1));
    assert!(accounts.is_empty());
}

#[tokio::test]
async fn run_rolls_back_and_resumes_on_panic() {
    let accounts = Arc::new(InMemoryRepository::<Account>::new());

    let outcome = AssertUnwindSafe(UnitOfWork::run(|saga| {
        let proxy = SagaRepository::new("accounts", Arc::clone(&accounts), &saga);
        async move {
            proxy.set(Account::new("ada@example.com")).await?;
            if proxy.label() == "accounts" {
                panic!("handler bug");
            }
            Ok::<(), RepositoryError>(())
        }
    }))
    .catch_unwind()
    .await;

    assert!(outcome.is_err());
    assert!(accounts.is_empty());
}

#[tokio::test]
async fn run_commits_on_success() {
    let accounts = Arc::new(InMemoryRepository::<Account>::new());

    let stored = UnitOfWork::run(|saga| {
        let proxy = SagaRepository::new("accounts", Arc::clone(&accounts), &saga);
        async move { proxy.set(Account::new("ada@example.com")).await }
    })
    .await
    .unwrap();

    assert!(accounts.contains(stored.id()));
}
