//! Saga / unit of work: compensation-based atomicity across repositories.
//!
//! Repositories are independent stores with no shared transaction. A
//! [`UnitOfWork`] approximates one by logging, for every successful write
//! made through a [`SagaRepository`] proxy, the operation that undoes it.
//! Rolling back replays those inverses newest first. Committing discards
//! them.
//!
//! Rollback is best-effort: every inverse is attempted even when earlier
//! ones fail, and every failure is reported.
//!
//! | Write through the proxy           | Logged inverse              |
//! |-----------------------------------|-----------------------------|
//! | `set(x)`, `x` existed as `old`    | `set(old)`                  |
//! | `set(x)`, `x` was new             | `remove(x.id)`              |
//! | `remove(id)`, removed `old`       | `set(old)`                  |
//! | `remove(id)`, nothing there       | nothing                     |
//! | `batch(items)`                    | one batch restoring every touched id |
//!
//! Reads pass through and are never logged.
//!
//! # Example
//!
//! ```
//! use railyard_runtime::saga::{SagaRepository, UnitOfWork};
//! use railyard_core::repository::Setter;
//! use railyard_testing::{Account, InMemoryRepository};
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let accounts = Arc::new(InMemoryRepository::<Account>::new());
//!
//! let outcome = UnitOfWork::run(|saga| {
//!     let accounts = SagaRepository::new("accounts", Arc::clone(&accounts), &saga);
//!     async move {
//!         accounts.set(Account::new("ada@example.com")).await.map_err(|e| e.to_string())?;
//!         Err::<(), _>("payment declined".to_string())
//!     }
//! })
//! .await;
//!
//! let aborted = outcome.unwrap_err();
//! assert_eq!(aborted.cause, "payment declined");
//! assert!(aborted.rollback.is_ok());
//! assert!(accounts.is_empty());
//! # });
//! ```

use crate::metrics::SagaMetrics;
use futures::FutureExt;
use railyard_core::batch::{Batch, BatchItem};
use railyard_core::entity::{Entity, EntityId};
use railyard_core::query::Query;
use railyard_core::repository::{
    Batchable, Queryable, Readable, Remover, RepositoryError, RepositoryResult, Setter,
};
use railyard_core::stage::BoxFuture;
use railyard_core::BatchResult;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;

type CompensationAction = Box<dyn FnOnce() -> BoxFuture<'static, RepositoryResult<()>> + Send>;

/// What a logged compensation will do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InverseOperation {
    /// Write back the value an identifier held before.
    Restore {
        /// Identifier being restored.
        id: EntityId,
    },
    /// Delete an entity the saga created.
    Remove {
        /// Identifier being removed.
        id: EntityId,
    },
    /// Apply a batch restoring every identifier a batch touched.
    Batch {
        /// Number of items in the compensating batch.
        items: usize,
    },
}

impl fmt::Display for InverseOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Restore { id } => write!(f, "restore {id}"),
            Self::Remove { id } => write!(f, "remove {id}"),
            Self::Batch { items } => write!(f, "batch of {items}"),
        }
    }
}

/// A logged inverse, as reported by [`UnitOfWork::operations`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggedOperation {
    /// Label of the repository the inverse targets.
    pub repository: String,
    /// The inverse itself.
    pub inverse: InverseOperation,
}

struct Compensation {
    operation: LoggedOperation,
    action: CompensationAction,
}

/// One inverse that failed during rollback.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Compensation `{}` on {} failed: {error}", .operation.inverse, .operation.repository)]
pub struct CompensationFailure {
    /// The inverse that failed.
    pub operation: LoggedOperation,
    /// Why it failed.
    pub error: RepositoryError,
}

/// Saga errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SagaError {
    /// At least one inverse failed; the stores may be partially restored.
    #[error("{} compensation(s) failed, {compensated} succeeded", .failures.len())]
    CompensationFailed {
        /// Every failed inverse, in the order they were attempted.
        failures: Vec<CompensationFailure>,
        /// Number of inverses that succeeded.
        compensated: usize,
    },
}

/// A business operation run by [`UnitOfWork::run`] failed and was rolled
/// back.
#[derive(Error, Debug)]
#[error("Operation aborted: {cause}")]
pub struct SagaAborted<E> {
    /// The business failure.
    pub cause: E,
    /// How the rollback went: the number of inverses applied, or every
    /// inverse that failed.
    pub rollback: Result<usize, SagaError>,
}

impl<E> SagaAborted<E> {
    /// Whether every inverse was applied.
    #[must_use]
    pub const fn is_fully_compensated(&self) -> bool {
        self.rollback.is_ok()
    }
}

/// Log of compensating operations for one business operation.
///
/// Cloning yields another handle to the same log, so proxies and the code
/// that created them share it.
#[derive(Clone)]
pub struct UnitOfWork {
    log: Arc<Mutex<Vec<Compensation>>>,
}

impl UnitOfWork {
    /// A unit of work with an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self {
            log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Run `operation` inside a fresh unit of work.
    ///
    /// - `Ok(value)`: the log is committed and `value` returned.
    /// - `Err(cause)`: the log is rolled back and [`SagaAborted`] returned.
    /// - panic: the log is rolled back and the panic resumed.
    ///
    /// # Errors
    ///
    /// [`SagaAborted`] carrying the business failure and the rollback report.
    pub async fn run<F, Fut, T, E>(operation: F) -> Result<T, SagaAborted<E>>
    where
        F: FnOnce(Self) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let saga = Self::new();
        let outcome = AssertUnwindSafe(operation(saga.clone())).catch_unwind().await;

        match outcome {
            Ok(Ok(value)) => {
                saga.commit();
                Ok(value)
            }
            Ok(Err(cause)) => {
                let rollback = saga.rollback().await;
                Err(SagaAborted { cause, rollback })
            }
            Err(panic) => {
                if let Err(error) = saga.rollback().await {
                    tracing::error!(%error, "Rollback after panic was incomplete");
                }
                std::panic::resume_unwind(panic)
            }
        }
    }

    /// Append an inverse to the log.
    ///
    /// Proxies call this after a successful write; custom proxies for other
    /// collaborators can too.
    pub fn record<F, Fut>(&self, repository: impl Into<String>, inverse: InverseOperation, action: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = RepositoryResult<()>> + Send + 'static,
    {
        let operation = LoggedOperation {
            repository: repository.into(),
            inverse,
        };
        tracing::trace!(
            repository = %operation.repository,
            inverse = %operation.inverse,
            "Compensation logged"
        );
        let action: CompensationAction = Box::new(move || action().boxed());
        self.entries().push(Compensation { operation, action });
    }

    /// Number of logged inverses.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    /// Whether nothing has been logged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Logged inverses, oldest first.
    #[must_use]
    pub fn operations(&self) -> Vec<LoggedOperation> {
        self.entries()
            .iter()
            .map(|compensation| compensation.operation.clone())
            .collect()
    }

    /// Discard the log; the writes stand.
    pub fn commit(&self) {
        let discarded = std::mem::take(&mut *self.entries()).len();
        tracing::debug!(operations = discarded, "Saga committed");
    }

    /// Apply every logged inverse, newest first.
    ///
    /// Every inverse is attempted. Returns how many were applied.
    ///
    /// # Errors
    ///
    /// [`SagaError::CompensationFailed`] listing every inverse that failed.
    pub async fn rollback(&self) -> Result<usize, SagaError> {
        let log = std::mem::take(&mut *self.entries());
        tracing::info!(operations = log.len(), "Rolling back saga");

        let mut compensated = 0;
        let mut failures = Vec::new();
        for Compensation { operation, action } in log.into_iter().rev() {
            match action().await {
                Ok(()) => compensated += 1,
                Err(error) => {
                    tracing::error!(
                        repository = %operation.repository,
                        inverse = %operation.inverse,
                        %error,
                        "Compensation failed"
                    );
                    failures.push(CompensationFailure { operation, error });
                }
            }
        }

        SagaMetrics::record_rollback(compensated, failures.len());
        if failures.is_empty() {
            Ok(compensated)
        } else {
            Err(SagaError::CompensationFailed {
                failures,
                compensated,
            })
        }
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, Vec<Compensation>> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for UnitOfWork {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for UnitOfWork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitOfWork")
            .field("operations", &self.operations())
            .finish()
    }
}

/// Repository proxy that logs the inverse of every successful write into a
/// [`UnitOfWork`].
///
/// The proxy exposes the same capabilities as the repository it wraps.
/// Writes need the wrapped repository to offer the capabilities their
/// inverse uses (`Setter + Remover`, plus `Readable` for `set` and `batch`).
pub struct SagaRepository<R> {
    label: String,
    inner: Arc<R>,
    saga: UnitOfWork,
}

impl<R> SagaRepository<R> {
    /// Proxy `repository` under `label`, logging into `saga`.
    pub fn new(label: impl Into<String>, repository: Arc<R>, saga: &UnitOfWork) -> Self {
        Self {
            label: label.into(),
            inner: repository,
            saga: saga.clone(),
        }
    }

    /// Label used in logged operations.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    fn log_restore<E>(&self, id: EntityId, previous: E)
    where
        E: Entity,
        R: Setter<E> + 'static,
    {
        let inner = Arc::clone(&self.inner);
        self.saga
            .record(self.label.clone(), InverseOperation::Restore { id }, move || async move {
                inner.set(previous).await.map(|_| ())
            });
    }

    fn log_removal<E>(&self, id: EntityId)
    where
        E: Entity,
        R: Remover<E> + 'static,
    {
        let inner = Arc::clone(&self.inner);
        let target = id.clone();
        self.saga
            .record(self.label.clone(), InverseOperation::Remove { id }, move || async move {
                inner.remove(&target).await.map(|_| ())
            });
    }
}

impl<R> Clone for SagaRepository<R> {
    fn clone(&self) -> Self {
        Self {
            label: self.label.clone(),
            inner: Arc::clone(&self.inner),
            saga: self.saga.clone(),
        }
    }
}

impl<R> fmt::Debug for SagaRepository<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SagaRepository")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

impl<E, R: Readable<E>> Readable<E> for SagaRepository<R> {
    fn get<'a>(&'a self, id: &'a EntityId) -> BoxFuture<'a, RepositoryResult<Option<E>>> {
        self.inner.get(id)
    }
}

impl<E, R: Queryable<E>> Queryable<E> for SagaRepository<R> {
    fn query(&self, query: Query<E>) -> BoxFuture<'_, RepositoryResult<Vec<E>>> {
        self.inner.query(query)
    }
}

impl<E, R> Setter<E> for SagaRepository<R>
where
    E: Entity,
    R: Readable<E> + Setter<E> + Remover<E> + 'static,
{
    fn set(&self, entity: E) -> BoxFuture<'_, RepositoryResult<E>> {
        Box::pin(async move {
            let previous = if entity.id().is_empty() {
                None
            } else {
                self.inner.get(entity.id()).await?
            };

            let stored = self.inner.set(entity).await?;
            let id = stored.id().clone();
            match previous {
                Some(previous) => self.log_restore(id, previous),
                None => self.log_removal::<E>(id),
            }
            Ok(stored)
        })
    }
}

impl<E, R> Remover<E> for SagaRepository<R>
where
    E: Entity,
    R: Setter<E> + Remover<E> + 'static,
{
    fn remove<'a>(&'a self, id: &'a EntityId) -> BoxFuture<'a, RepositoryResult<Option<E>>> {
        Box::pin(async move {
            let removed = self.inner.remove(id).await?;
            if let Some(entity) = &removed {
                self.log_restore(id.clone(), entity.clone());
            }
            Ok(removed)
        })
    }
}

impl<E, R> Batchable<E> for SagaRepository<R>
where
    E: Entity,
    R: Readable<E> + Batchable<E> + 'static,
{
    fn batch(&self, batch: Batch<E>) -> BoxFuture<'_, RepositoryResult<BatchResult>> {
        Box::pin(async move {
            let items: Vec<BatchItem<E>> = batch
                .into_items()
                .into_iter()
                .map(|item| match item {
                    BatchItem::Upsert(entity) if entity.id().is_empty() => {
                        BatchItem::Upsert(entity.with_id(EntityId::generate()))
                    }
                    other => other,
                })
                .collect();

            let mut captured: Vec<(EntityId, Option<E>)> = Vec::new();
            for item in &items {
                let id = item.id();
                if captured.iter().any(|(seen, _)| seen == id) {
                    continue;
                }
                let previous = self.inner.get(id).await?;
                captured.push((id.clone(), previous));
            }

            let result = self.inner.batch(items.into_iter().collect()).await?;

            let compensation: Batch<E> = captured
                .into_iter()
                .rev()
                .map(|(id, previous)| match previous {
                    Some(entity) => BatchItem::Upsert(entity),
                    None => BatchItem::Remove(id),
                })
                .collect();
            if !result.is_successful() {
                tracing::warn!(
                    repository = %self.label,
                    "Batch reported failure; logging compensation for any applied prefix"
                );
            }

            let inner = Arc::clone(&self.inner);
            self.saga.record(
                self.label.clone(),
                InverseOperation::Batch {
                    items: compensation.len(),
                },
                move || async move {
                    let verdict = inner.batch(compensation).await?;
                    if verdict.is_successful() {
                        Ok(())
                    } else {
                        Err(RepositoryError::Backend(
                            "compensating batch reported failure".to_string(),
                        ))
                    }
                },
            );
            Ok(result)
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use railyard_testing::{Account, InMemoryRepository};

    fn accounts() -> Arc<InMemoryRepository<Account>> {
        Arc::new(InMemoryRepository::new())
    }

    #[tokio::test]
    async fn test_set_of_new_entity_logs_removal() {
        let repo = accounts();
        let saga = UnitOfWork::new();
        let proxy = SagaRepository::new("accounts", Arc::clone(&repo), &saga);

        let stored = proxy.set(Account::new("ada@example.com")).await.unwrap();

        assert_eq!(
            saga.operations(),
            vec![LoggedOperation {
                repository: "accounts".to_string(),
                inverse: InverseOperation::Remove {
                    id: stored.id().clone()
                },
            }]
        );
        assert_eq!(saga.rollback().await, Ok(1));
        assert!(repo.get(stored.id()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_of_existing_entity_restores_previous_value() {
        let repo = accounts();
        let original = repo.set(Account::new("ada@example.com")).await.unwrap();

        let saga = UnitOfWork::new();
        let proxy = SagaRepository::new("accounts", Arc::clone(&repo), &saga);
        proxy
            .set(original.clone().with_email("grace@example.com"))
            .await
            .unwrap();

        saga.rollback().await.unwrap();
        assert_eq!(repo.get(original.id()).await.unwrap(), Some(original));
    }

    #[tokio::test]
    async fn test_removing_missing_id_logs_nothing() {
        let saga = UnitOfWork::new();
        let proxy = SagaRepository::new("accounts", accounts(), &saga);

        let removed = proxy.remove(&EntityId::new("missing")).await.unwrap();

        assert!(removed.is_none());
        assert!(saga.is_empty());
    }

    #[tokio::test]
    async fn test_reads_are_not_logged() {
        let repo = accounts();
        let stored = repo.set(Account::new("ada@example.com")).await.unwrap();
        let saga = UnitOfWork::new();
        let proxy = SagaRepository::new("accounts", repo, &saga);

        proxy.get(stored.id()).await.unwrap();
        proxy.query(Query::new()).await.unwrap();

        assert!(saga.is_empty());
    }

    #[tokio::test]
    async fn test_commit_discards_log_and_keeps_writes() {
        let repo = accounts();
        let saga = UnitOfWork::new();
        let proxy = SagaRepository::new("accounts", Arc::clone(&repo), &saga);
        let stored = proxy.set(Account::new("ada@example.com")).await.unwrap();

        saga.commit();

        assert!(saga.is_empty());
        assert_eq!(saga.rollback().await, Ok(0));
        assert!(repo.get(stored.id()).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_batch_compensation_restores_every_touched_id() {
        let repo = accounts();
        let existing = repo.set(Account::new("ada@example.com")).await.unwrap();
        let doomed = repo.set(Account::new("grace@example.com")).await.unwrap();

        let saga = UnitOfWork::new();
        let proxy = SagaRepository::new("accounts", Arc::clone(&repo), &saga);
        let batch = Batch::new()
            .upsert(existing.clone().with_email("ada@lovelace.dev"))
            .upsert(Account::new("new@example.com"))
            .remove(doomed.id().clone());
        assert!(proxy.batch(batch).await.unwrap().is_successful());
        assert_eq!(repo.len(), 2);

        assert_eq!(
            saga.operations()[0].inverse,
            InverseOperation::Batch { items: 3 }
        );
        saga.rollback().await.unwrap();

        assert_eq!(repo.len(), 2);
        assert_eq!(repo.get(existing.id()).await.unwrap(), Some(existing));
        assert_eq!(repo.get(doomed.id()).await.unwrap(), Some(doomed));
    }
}
