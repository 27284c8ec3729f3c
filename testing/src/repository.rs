//! In-memory repository for fast, deterministic tests.
//!
//! Implements every capability. Entities are kept in identifier order and
//! stored exactly as given, apart from identifier assignment on first
//! `set`. Batches apply atomically: either every item lands or none does.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Lock poisoning only follows a panicking test

use crate::evaluate;
use railyard_core::batch::{Batch, BatchItem, BatchResult};
use railyard_core::entity::{Entity, EntityId};
use railyard_core::environment::{Clock, SystemClock};
use railyard_core::query::Query;
use railyard_core::repository::{
    Batchable, Queryable, Readable, Remover, RepositoryResult, Setter,
};
use railyard_core::stage::BoxFuture;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, RwLock};

/// `BTreeMap`-backed repository.
///
/// Clones share storage.
///
/// # Example
///
/// ```
/// use railyard_core::query::Query;
/// use railyard_core::repository::{Queryable, Setter};
/// use railyard_testing::{Account, InMemoryRepository};
///
/// # tokio_test::block_on(async {
/// let accounts = InMemoryRepository::new();
/// accounts.set(Account::new("ada@example.com")).await.unwrap();
/// accounts.set(Account::new("grace@example.com").with_active(false)).await.unwrap();
///
/// let query = Query::<Account>::new().filter("active", "eq", true).unwrap();
/// let active = accounts.query(query).await.unwrap();
/// assert_eq!(active.len(), 1);
/// # });
/// ```
pub struct InMemoryRepository<E> {
    entities: Arc<RwLock<BTreeMap<EntityId, E>>>,
    clock: Arc<dyn Clock>,
}

impl<E: Entity> InMemoryRepository<E> {
    /// An empty repository stamping batch verdicts with the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entities: Arc::new(RwLock::new(BTreeMap::new())),
            clock: Arc::new(SystemClock),
        }
    }

    /// Use `clock` for batch verdict timestamps.
    #[must_use]
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// A repository pre-populated with `entities` (identifiers assigned
    /// where missing).
    #[must_use]
    pub fn seeded(entities: impl IntoIterator<Item = E>) -> Self {
        let repository = Self::new();
        {
            let mut map = repository.entities.write().unwrap();
            for entity in entities {
                let entity = assign_id(entity);
                map.insert(entity.id().clone(), entity);
            }
        }
        repository
    }

    /// Number of stored entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.read().unwrap().len()
    }

    /// Whether nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.read().unwrap().is_empty()
    }

    /// Whether `id` is stored.
    #[must_use]
    pub fn contains(&self, id: &EntityId) -> bool {
        self.entities.read().unwrap().contains_key(id)
    }

    /// Every stored entity, in identifier order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<E> {
        self.entities.read().unwrap().values().cloned().collect()
    }

    /// Remove everything (for test isolation).
    pub fn clear(&self) {
        self.entities.write().unwrap().clear();
    }
}

fn assign_id<E: Entity>(entity: E) -> E {
    if entity.id().is_empty() {
        entity.with_id(EntityId::generate())
    } else {
        entity
    }
}

impl<E: Entity> Default for InMemoryRepository<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for InMemoryRepository<E> {
    fn clone(&self) -> Self {
        Self {
            entities: Arc::clone(&self.entities),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<E> fmt::Debug for InMemoryRepository<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryRepository")
            .field("len", &self.entities.read().unwrap().len())
            .finish_non_exhaustive()
    }
}

impl<E: Entity> Readable<E> for InMemoryRepository<E> {
    fn get<'a>(&'a self, id: &'a EntityId) -> BoxFuture<'a, RepositoryResult<Option<E>>> {
        let found = self.entities.read().unwrap().get(id).cloned();
        Box::pin(async move { Ok(found) })
    }
}

impl<E: Entity> Queryable<E> for InMemoryRepository<E> {
    fn query(&self, query: Query<E>) -> BoxFuture<'_, RepositoryResult<Vec<E>>> {
        let result = evaluate::apply(&query, self.snapshot());
        Box::pin(async move { result })
    }
}

impl<E: Entity> Setter<E> for InMemoryRepository<E> {
    fn set(&self, entity: E) -> BoxFuture<'_, RepositoryResult<E>> {
        let entity = assign_id(entity);
        self.entities
            .write()
            .unwrap()
            .insert(entity.id().clone(), entity.clone());
        Box::pin(async move { Ok(entity) })
    }
}

impl<E: Entity> Remover<E> for InMemoryRepository<E> {
    fn remove<'a>(&'a self, id: &'a EntityId) -> BoxFuture<'a, RepositoryResult<Option<E>>> {
        let removed = self.entities.write().unwrap().remove(id);
        Box::pin(async move { Ok(removed) })
    }
}

impl<E: Entity> Batchable<E> for InMemoryRepository<E> {
    fn batch(&self, batch: Batch<E>) -> BoxFuture<'_, RepositoryResult<BatchResult>> {
        {
            let mut map = self.entities.write().unwrap();
            let mut staged = map.clone();
            for item in batch.into_items() {
                match item {
                    BatchItem::Upsert(entity) => {
                        let entity = assign_id(entity);
                        staged.insert(entity.id().clone(), entity);
                    }
                    BatchItem::Remove(id) => {
                        staged.remove(&id);
                    }
                }
            }
            *map = staged;
        }
        let verdict = BatchResult::successful(self.clock.now());
        Box::pin(async move { Ok(verdict) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::Account;
    use crate::mocks::test_clock;
    use railyard_core::query::Direction;
    use serde_json::json;

    fn seeded() -> InMemoryRepository<Account> {
        InMemoryRepository::seeded([
            Account::new("ada@example.com")
                .with_id(EntityId::new("1"))
                .with_balance(300),
            Account::new("grace@example.com")
                .with_id(EntityId::new("2"))
                .with_balance(100),
            Account::new("linus@example.com")
                .with_id(EntityId::new("3"))
                .with_balance(200)
                .with_active(false),
        ])
    }

    #[tokio::test]
    async fn test_set_assigns_identifier() {
        let repo = InMemoryRepository::new();
        let stored = repo.set(Account::new("ada@example.com")).await.unwrap();

        assert!(!stored.id().is_empty());
        assert_eq!(repo.get(stored.id()).await.unwrap(), Some(stored));
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let repo = InMemoryRepository::<Account>::new();
        assert_eq!(repo.get(&EntityId::new("nope")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_remove_returns_removed_entity() {
        let repo = seeded();
        let removed = repo.remove(&EntityId::new("2")).await.unwrap();

        assert_eq!(removed.map(|a| a.email), Some("grace@example.com".to_string()));
        assert_eq!(repo.remove(&EntityId::new("2")).await.unwrap(), None);
        assert_eq!(repo.len(), 2);
    }

    #[tokio::test]
    async fn test_query_with_no_match_is_empty_not_error() {
        let repo = seeded();
        let query = Query::<Account>::new()
            .filter("email", "eq", "nobody@example.com")
            .unwrap();
        assert!(repo.query(query).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_query_sorts_and_pages() {
        let repo = seeded();
        let query = Query::<Account>::new()
            .order_by("balance", Direction::Descending)
            .unwrap()
            .with_offset(1)
            .with_limit(1);

        let page = repo.query(query).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].balance, 200);
    }

    #[tokio::test]
    async fn test_conjunctive_clauses() {
        let repo = seeded();
        let query = Query::<Account>::new()
            .filter("id", "in", json!(["1", "2", "3"]))
            .unwrap()
            .filter("active", "eq", true)
            .unwrap();

        let ids: Vec<String> = repo
            .query(query)
            .await
            .unwrap()
            .iter()
            .map(|a| a.id().to_string())
            .collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[tokio::test]
    async fn test_batch_applies_in_order_and_stamps_clock() {
        let repo = seeded().with_clock(test_clock());
        let batch = Batch::new()
            .upsert(Account::new("new@example.com").with_id(EntityId::new("4")))
            .remove(EntityId::new("4"))
            .remove(EntityId::new("1"));

        let verdict = repo.batch(batch).await.unwrap();

        assert!(verdict.is_successful());
        assert_eq!(verdict.time, test_clock().now());
        assert!(!repo.contains(&EntityId::new("4")));
        assert!(!repo.contains(&EntityId::new("1")));
        assert_eq!(repo.len(), 2);
    }

    #[test]
    fn test_clones_share_storage() {
        let repo = seeded();
        let other = repo.clone();
        other.clear();
        assert!(repo.is_empty());
    }
}
