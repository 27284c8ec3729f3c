//! Ordered write batches.

use crate::entity::{Entity, EntityId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One write in a [`Batch`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "item", rename_all = "lowercase")]
pub enum BatchItem<E> {
    /// Insert or replace an entity.
    Upsert(E),
    /// Delete by identifier.
    Remove(EntityId),
}

impl<E: Entity> BatchItem<E> {
    /// Identifier the item touches (empty for an upsert of a new entity).
    #[must_use]
    pub fn id(&self) -> &EntityId {
        match self {
            Self::Upsert(entity) => entity.id(),
            Self::Remove(id) => id,
        }
    }
}

/// Ordered sequence of writes. Order is significant: stores apply items in
/// sequence or atomically, per their own guarantees.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Batch<E> {
    items: Vec<BatchItem<E>>,
}

impl<E> Batch<E> {
    /// An empty batch.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Append an upsert.
    #[must_use]
    pub fn upsert(mut self, entity: E) -> Self {
        self.items.push(BatchItem::Upsert(entity));
        self
    }

    /// Append a removal.
    #[must_use]
    pub fn remove(mut self, id: impl Into<EntityId>) -> Self {
        self.items.push(BatchItem::Remove(id.into()));
        self
    }

    /// Append an arbitrary item.
    #[must_use]
    pub fn push(mut self, item: BatchItem<E>) -> Self {
        self.items.push(item);
        self
    }

    /// Items in application order.
    #[must_use]
    pub fn items(&self) -> &[BatchItem<E>] {
        &self.items
    }

    /// Consume into the item list.
    #[must_use]
    pub fn into_items(self) -> Vec<BatchItem<E>> {
        self.items
    }

    /// Number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the batch has no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<E> Default for Batch<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> FromIterator<BatchItem<E>> for Batch<E> {
    fn from_iter<I: IntoIterator<Item = BatchItem<E>>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

/// Verdict for a whole batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    /// Every item was applied.
    Successful,
    /// The store rejected the batch. Whether a prefix was applied depends
    /// on the store.
    Failed,
}

/// Single verdict for a batch, not per item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    /// Outcome.
    pub status: BatchStatus,
    /// When the store finished with the batch.
    pub time: DateTime<Utc>,
}

impl BatchResult {
    /// A successful verdict at `time`.
    #[must_use]
    pub const fn successful(time: DateTime<Utc>) -> Self {
        Self {
            status: BatchStatus::Successful,
            time,
        }
    }

    /// A failed verdict at `time`.
    #[must_use]
    pub const fn failed(time: DateTime<Utc>) -> Self {
        Self {
            status: BatchStatus::Failed,
            time,
        }
    }

    /// Whether the batch succeeded.
    #[must_use]
    pub fn is_successful(&self) -> bool {
        self.status == BatchStatus::Successful
    }
}
