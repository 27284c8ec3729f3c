//! Repository wrappers for observing and breaking a real repository.
//!
//! - [`RecordingRepository`]: logs every call it forwards
//! - [`FaultyRepository`]: fails chosen operations with a configured error

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)]

use railyard_core::batch::{Batch, BatchResult};
use railyard_core::entity::{Entity, EntityId};
use railyard_core::query::Query;
use railyard_core::repository::{
    Batchable, Queryable, Readable, Remover, RepositoryError, RepositoryResult, Setter,
};
use railyard_core::stage::BoxFuture;
use std::sync::{Arc, Mutex};

/// Capability method a call went through.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    /// `Readable::get`
    Get,
    /// `Queryable::query`
    Query,
    /// `Batchable::batch`
    Batch,
    /// `Setter::set`
    Set,
    /// `Remover::remove`
    Remove,
}

/// One forwarded call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Call {
    /// Which method.
    pub operation: Operation,
    /// Identifier involved, when the call names one.
    pub id: Option<EntityId>,
}

impl Call {
    /// Shorthand for a call on `id`.
    pub fn on(operation: Operation, id: impl Into<EntityId>) -> Self {
        Self {
            operation,
            id: Some(id.into()),
        }
    }
}

/// Forwards every call to `R` and records it.
///
/// # Example
///
/// ```
/// use railyard_core::repository::Setter;
/// use railyard_testing::{Account, InMemoryRepository, Operation, RecordingRepository};
///
/// # tokio_test::block_on(async {
/// let repo = RecordingRepository::new(InMemoryRepository::new());
/// repo.set(Account::new("ada@example.com")).await.unwrap();
/// assert_eq!(repo.operations(), vec![Operation::Set]);
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct RecordingRepository<R> {
    inner: R,
    calls: Arc<Mutex<Vec<Call>>>,
}

impl<R> RecordingRepository<R> {
    /// Wrap `inner`.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// The wrapped repository.
    pub const fn inner(&self) -> &R {
        &self.inner
    }

    /// Calls so far, oldest first.
    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Operations so far, oldest first.
    #[must_use]
    pub fn operations(&self) -> Vec<Operation> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|call| call.operation)
            .collect()
    }

    /// Forget recorded calls.
    pub fn reset(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn record(&self, operation: Operation, id: Option<&EntityId>) {
        self.calls.lock().unwrap().push(Call {
            operation,
            id: id.cloned(),
        });
    }
}

impl<E, R: Readable<E>> Readable<E> for RecordingRepository<R> {
    fn get<'a>(&'a self, id: &'a EntityId) -> BoxFuture<'a, RepositoryResult<Option<E>>> {
        self.record(Operation::Get, Some(id));
        self.inner.get(id)
    }
}

impl<E, R: Queryable<E>> Queryable<E> for RecordingRepository<R> {
    fn query(&self, query: Query<E>) -> BoxFuture<'_, RepositoryResult<Vec<E>>> {
        self.record(Operation::Query, None);
        self.inner.query(query)
    }
}

impl<E, R: Batchable<E>> Batchable<E> for RecordingRepository<R> {
    fn batch(&self, batch: Batch<E>) -> BoxFuture<'_, RepositoryResult<BatchResult>> {
        self.record(Operation::Batch, None);
        self.inner.batch(batch)
    }
}

impl<E: Entity, R: Setter<E>> Setter<E> for RecordingRepository<R> {
    fn set(&self, entity: E) -> BoxFuture<'_, RepositoryResult<E>> {
        let id = entity.id();
        self.record(Operation::Set, (!id.is_empty()).then_some(id));
        self.inner.set(entity)
    }
}

impl<E, R: Remover<E>> Remover<E> for RecordingRepository<R> {
    fn remove<'a>(&'a self, id: &'a EntityId) -> BoxFuture<'a, RepositoryResult<Option<E>>> {
        self.record(Operation::Remove, Some(id));
        self.inner.remove(id)
    }
}

#[derive(Debug, Clone)]
struct Fault {
    operation: Operation,
    id: Option<EntityId>,
    error: RepositoryError,
}

/// Forwards calls to `R` unless a configured fault matches.
///
/// Faults are checked before forwarding, so a failed call leaves the
/// wrapped repository untouched.
///
/// # Example
///
/// ```
/// use railyard_core::repository::{RepositoryError, Setter};
/// use railyard_testing::{Account, FaultyRepository, InMemoryRepository, Operation};
///
/// # tokio_test::block_on(async {
/// let repo = FaultyRepository::new(InMemoryRepository::<Account>::new())
///     .failing(Operation::Set, RepositoryError::Unavailable("down".into()));
/// assert!(repo.set(Account::new("ada@example.com")).await.is_err());
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct FaultyRepository<R> {
    inner: R,
    faults: Arc<Mutex<Vec<Fault>>>,
}

impl<R> FaultyRepository<R> {
    /// Wrap `inner` with no faults configured.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            faults: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Fail every call to `operation`.
    #[must_use]
    pub fn failing(self, operation: Operation, error: RepositoryError) -> Self {
        self.inject(operation, None, error);
        self
    }

    /// Fail calls to `operation` that touch `id`.
    #[must_use]
    pub fn failing_on(
        self,
        operation: Operation,
        id: impl Into<EntityId>,
        error: RepositoryError,
    ) -> Self {
        self.inject(operation, Some(id.into()), error);
        self
    }

    /// Add a fault to a repository that is already in use.
    pub fn inject(&self, operation: Operation, id: Option<EntityId>, error: RepositoryError) {
        self.faults.lock().unwrap().push(Fault {
            operation,
            id,
            error,
        });
    }

    /// Remove every fault.
    pub fn heal(&self) {
        self.faults.lock().unwrap().clear();
    }

    /// The wrapped repository.
    pub const fn inner(&self) -> &R {
        &self.inner
    }

    fn check(&self, operation: Operation, id: Option<&EntityId>) -> RepositoryResult<()> {
        let faults = self.faults.lock().unwrap();
        let hit = faults.iter().find(|fault| {
            fault.operation == operation
                && fault
                    .id
                    .as_ref()
                    .is_none_or(|wanted| id.is_some_and(|actual| actual == wanted))
        });
        hit.map_or(Ok(()), |fault| Err(fault.error.clone()))
    }
}

fn failed<'a, T: Send + 'a>(error: RepositoryError) -> BoxFuture<'a, RepositoryResult<T>> {
    Box::pin(async move { Err(error) })
}

impl<E: Send + 'static, R: Readable<E>> Readable<E> for FaultyRepository<R> {
    fn get<'a>(&'a self, id: &'a EntityId) -> BoxFuture<'a, RepositoryResult<Option<E>>> {
        match self.check(Operation::Get, Some(id)) {
            Ok(()) => self.inner.get(id),
            Err(error) => failed(error),
        }
    }
}

impl<E: Send + 'static, R: Queryable<E>> Queryable<E> for FaultyRepository<R> {
    fn query(&self, query: Query<E>) -> BoxFuture<'_, RepositoryResult<Vec<E>>> {
        match self.check(Operation::Query, None) {
            Ok(()) => self.inner.query(query),
            Err(error) => failed(error),
        }
    }
}

impl<E: Entity, R: Batchable<E>> Batchable<E> for FaultyRepository<R> {
    fn batch(&self, batch: Batch<E>) -> BoxFuture<'_, RepositoryResult<BatchResult>> {
        let hit = batch
            .items()
            .iter()
            .map(|item| self.check(Operation::Batch, Some(item.id())))
            .find(Result::is_err)
            .unwrap_or_else(|| self.check(Operation::Batch, None));
        match hit {
            Ok(()) => self.inner.batch(batch),
            Err(error) => failed(error),
        }
    }
}

impl<E: Entity, R: Setter<E>> Setter<E> for FaultyRepository<R> {
    fn set(&self, entity: E) -> BoxFuture<'_, RepositoryResult<E>> {
        let id = entity.id();
        match self.check(Operation::Set, (!id.is_empty()).then_some(id)) {
            Ok(()) => self.inner.set(entity),
            Err(error) => failed(error),
        }
    }
}

impl<E: Send + 'static, R: Remover<E>> Remover<E> for FaultyRepository<R> {
    fn remove<'a>(&'a self, id: &'a EntityId) -> BoxFuture<'a, RepositoryResult<Option<E>>> {
        match self.check(Operation::Remove, Some(id)) {
            Ok(()) => self.inner.remove(id),
            Err(error) => failed(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::Account;
    use crate::repository::InMemoryRepository;

    #[tokio::test]
    async fn test_recording_captures_ids_in_order() {
        let repo = RecordingRepository::new(InMemoryRepository::<Account>::new());
        let stored = repo.set(Account::new("ada@example.com")).await.unwrap();
        repo.remove(stored.id()).await.unwrap();

        assert_eq!(
            repo.calls(),
            vec![
                Call {
                    operation: Operation::Set,
                    id: None
                },
                Call::on(Operation::Remove, stored.id().clone()),
            ]
        );
    }

    #[tokio::test]
    async fn test_fault_on_id_only_hits_that_id() {
        let inner = InMemoryRepository::<Account>::new();
        let repo = FaultyRepository::new(inner.clone()).failing_on(
            Operation::Remove,
            "doomed",
            RepositoryError::Backend("disk full".into()),
        );

        assert_eq!(
            repo.remove(&EntityId::new("doomed")).await,
            Err(RepositoryError::Backend("disk full".into()))
        );
        assert_eq!(repo.remove(&EntityId::new("other")).await, Ok(None));
    }

    #[tokio::test]
    async fn test_failed_call_leaves_inner_untouched() {
        let inner = InMemoryRepository::<Account>::new();
        let repo = FaultyRepository::new(inner.clone())
            .failing(Operation::Batch, RepositoryError::Unavailable("down".into()));

        let result = repo
            .batch(Batch::new().upsert(Account::new("ada@example.com")))
            .await;

        assert!(result.is_err());
        assert!(inner.is_empty());

        repo.heal();
        assert!(repo
            .batch(Batch::new().upsert(Account::new("ada@example.com")))
            .await
            .unwrap()
            .is_successful());
    }
}
