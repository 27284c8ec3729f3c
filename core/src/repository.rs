//! Capability-based repository contracts.
//!
//! Instead of one fat repository interface, each operation is its own
//! capability trait:
//!
//! | Capability       | Operation                          |
//! |------------------|------------------------------------|
//! | [`Readable`]     | `get(id) → Option<E>`              |
//! | [`Queryable`]    | `query(Query<E>) → Vec<E>`         |
//! | [`Batchable`]    | `batch(Batch<E>) → BatchResult`    |
//! | [`Setter`]       | `set(E) → E` (upsert)              |
//! | [`Remover`]      | `remove(id) → Option<E>`           |
//!
//! Modes are structural combinations, blanket-implemented for anything
//! that has the parts: [`ReadOnlyRepository`], [`MutableRepository`],
//! [`Repository`]. A consumer declares the narrowest mode it needs.
//!
//! [`ReadOnly`] goes further and *removes* capabilities: wrapping a full
//! repository yields a value that only implements `Readable + Queryable`,
//! so a handler whose environment holds a `ReadOnly<_>` cannot mutate even
//! though the underlying store could.
//!
//! ```compile_fail
//! use railyard_core::repository::{ReadOnly, Repository, Setter};
//!
//! fn requires_setter<E, R: Setter<E>>(_: &R) {}
//!
//! fn demo<E, R: Repository<E>>(repository: R) {
//!     let read_only = ReadOnly::new(repository);
//!     requires_setter::<E, _>(&read_only); // ReadOnly<R> is not a Setter
//! }
//! ```
//!
//! ```
//! use railyard_core::repository::{ReadOnly, ReadOnlyRepository, Repository};
//!
//! fn requires_reads<E, R: ReadOnlyRepository<E>>(_: &R) {}
//!
//! fn demo<E, R: Repository<E>>(repository: R) {
//!     let read_only = ReadOnly::new(repository);
//!     requires_reads::<E, _>(&read_only);
//! }
//! ```
//!
//! # Errors
//!
//! Capability methods fail only on infrastructure problems
//! ([`RepositoryError`]). "Not found" is `Ok(None)` and an empty query
//! result is `Ok(vec![])`; deciding whether either is a business failure is
//! the handler's job.
//!
//! # Dyn Compatibility
//!
//! Methods return [`BoxFuture`] so capabilities can be held as
//! `Arc<dyn Readable<E>>` inside environments.

use crate::batch::{Batch, BatchResult};
use crate::entity::EntityId;
use crate::query::{Query, QueryError};
use crate::stage::BoxFuture;
use std::sync::Arc;
use thiserror::Error;

/// Infrastructure failures of a repository.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// The backing store failed.
    #[error("Backend error: {0}")]
    Backend(String),

    /// A record could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The store cannot evaluate this operator.
    #[error("Unsupported query operator: {0}")]
    UnsupportedOperator(String),

    /// The query was malformed.
    #[error("Invalid query: {0}")]
    InvalidQuery(#[from] QueryError),

    /// A concurrent writer won.
    #[error("Write conflict on {0}")]
    Conflict(EntityId),

    /// The store is unreachable.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Result alias for repository operations.
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Fetch one entity by identifier.
pub trait Readable<E>: Send + Sync {
    /// `Ok(None)` when no entity has this identifier.
    ///
    /// # Errors
    ///
    /// Infrastructure failures only.
    fn get<'a>(&'a self, id: &'a EntityId) -> BoxFuture<'a, RepositoryResult<Option<E>>>;
}

/// Evaluate a [`Query`].
pub trait Queryable<E>: Send + Sync {
    /// Matching entities; empty when nothing matches.
    ///
    /// # Errors
    ///
    /// Infrastructure failures, or an operator the store cannot evaluate.
    fn query(&self, query: Query<E>) -> BoxFuture<'_, RepositoryResult<Vec<E>>>;
}

/// Apply an ordered [`Batch`].
pub trait Batchable<E>: Send + Sync {
    /// One verdict for the whole batch.
    ///
    /// # Errors
    ///
    /// Infrastructure failures. A store that rejects the batch for its own
    /// reasons reports `BatchStatus::Failed` instead.
    fn batch(&self, batch: Batch<E>) -> BoxFuture<'_, RepositoryResult<BatchResult>>;
}

/// Upsert one entity.
pub trait Setter<E>: Send + Sync {
    /// Store `entity`, assigning an identifier if it has none, and return
    /// the persisted value.
    ///
    /// # Errors
    ///
    /// Infrastructure failures.
    fn set(&self, entity: E) -> BoxFuture<'_, RepositoryResult<E>>;
}

/// Delete one entity by identifier.
pub trait Remover<E>: Send + Sync {
    /// The removed entity, or `None` when nothing had this identifier.
    ///
    /// # Errors
    ///
    /// Infrastructure failures.
    fn remove<'a>(&'a self, id: &'a EntityId) -> BoxFuture<'a, RepositoryResult<Option<E>>>;
}

/// Read-only mode: exactly `Readable + Queryable`.
pub trait ReadOnlyRepository<E>: Readable<E> + Queryable<E> {}

impl<E, T> ReadOnlyRepository<E> for T where T: Readable<E> + Queryable<E> + ?Sized {}

/// Mutation mode: `Setter + Remover + Batchable`.
pub trait MutableRepository<E>: Setter<E> + Remover<E> + Batchable<E> {}

impl<E, T> MutableRepository<E> for T where T: Setter<E> + Remover<E> + Batchable<E> + ?Sized {}

/// Every capability.
pub trait Repository<E>: ReadOnlyRepository<E> + MutableRepository<E> {}

impl<E, T> Repository<E> for T where T: ReadOnlyRepository<E> + MutableRepository<E> + ?Sized {}

/// Capability-stripping wrapper exposing only `Readable + Queryable`.
///
/// The wrapped repository cannot be recovered from the wrapper.
#[derive(Clone, Debug)]
pub struct ReadOnly<R> {
    inner: R,
}

impl<R> ReadOnly<R> {
    /// Restrict `repository` to reads.
    #[must_use]
    pub const fn new(repository: R) -> Self {
        Self { inner: repository }
    }
}

impl<E, R: Readable<E>> Readable<E> for ReadOnly<R> {
    fn get<'a>(&'a self, id: &'a EntityId) -> BoxFuture<'a, RepositoryResult<Option<E>>> {
        self.inner.get(id)
    }
}

impl<E, R: Queryable<E>> Queryable<E> for ReadOnly<R> {
    fn query(&self, query: Query<E>) -> BoxFuture<'_, RepositoryResult<Vec<E>>> {
        self.inner.query(query)
    }
}

impl<E, R: Readable<E> + ?Sized> Readable<E> for Arc<R> {
    fn get<'a>(&'a self, id: &'a EntityId) -> BoxFuture<'a, RepositoryResult<Option<E>>> {
        (**self).get(id)
    }
}

impl<E, R: Queryable<E> + ?Sized> Queryable<E> for Arc<R> {
    fn query(&self, query: Query<E>) -> BoxFuture<'_, RepositoryResult<Vec<E>>> {
        (**self).query(query)
    }
}

impl<E, R: Batchable<E> + ?Sized> Batchable<E> for Arc<R> {
    fn batch(&self, batch: Batch<E>) -> BoxFuture<'_, RepositoryResult<BatchResult>> {
        (**self).batch(batch)
    }
}

impl<E, R: Setter<E> + ?Sized> Setter<E> for Arc<R> {
    fn set(&self, entity: E) -> BoxFuture<'_, RepositoryResult<E>> {
        (**self).set(entity)
    }
}

impl<E, R: Remover<E> + ?Sized> Remover<E> for Arc<R> {
    fn remove<'a>(&'a self, id: &'a EntityId) -> BoxFuture<'a, RepositoryResult<Option<E>>> {
        (**self).remove(id)
    }
}
