//! Domain entities and their identity header.
//!
//! Every persisted record carries an [`EntityHeader`]: identifier, resource
//! tag, schema version and timestamps. Headers are values. The tag and
//! version are set once by the constructor and have no setters; the only
//! transitions are [`EntityHeader::persisted`] (assign an identifier) and
//! [`EntityHeader::touched`] (bump `updated_at`), both of which return a new
//! header.
//!
//! Entity kinds that evolve over time load their stored documents through a
//! closed enum with one variant per schema version, discriminated on
//! `version`, so consumers match exhaustively instead of probing fields at
//! runtime. Older variants upgrade into the current shape with
//! [`EntityHeader::upgraded`].
//!
//! # Example
//!
//! ```
//! use railyard_core::entity::{Entity, EntityHeader, EntityId, SchemaVersion};
//! use chrono::Utc;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Clone, Debug, Serialize, Deserialize)]
//! struct Lead {
//!     #[serde(flatten)]
//!     header: EntityHeader,
//!     email: String,
//! }
//!
//! impl Entity for Lead {
//!     const TAG: &'static str = "urn:railyard:lead";
//!     const ATTRIBUTES: &'static [&'static str] = &["email"];
//!
//!     fn header(&self) -> &EntityHeader {
//!         &self.header
//!     }
//!
//!     fn with_header(self, header: EntityHeader) -> Self {
//!         Self { header, ..self }
//!     }
//! }
//!
//! let lead = Lead {
//!     header: EntityHeader::new(Lead::TAG, SchemaVersion::new(1), Utc::now()),
//!     email: "ada@example.com".into(),
//! };
//! assert!(lead.id().is_empty());
//!
//! let stored = lead.with_id(EntityId::new("lead-1"));
//! assert_eq!(stored.id().as_str(), "lead-1");
//! assert_eq!(stored.header().tag().as_str(), "urn:railyard:lead");
//! ```

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Cow;
use std::fmt;

/// Attributes every entity exposes through its header.
pub const HEADER_ATTRIBUTES: &[&str] = &["id", "tag", "version", "created_at", "updated_at"];

/// Identifier of a persisted entity.
///
/// Empty until the entity is first written by a repository.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Create an identifier from trusted input.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The empty identifier of a not-yet-persisted entity.
    #[must_use]
    pub const fn empty() -> Self {
        Self(String::new())
    }

    /// Generate a fresh random identifier (UUID v4).
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Whether this identifier has been assigned yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow as `&str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Unwrap into the inner `String`.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Resource-kind discriminator, a URI-like tag such as `urn:railyard:account`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceTag(Cow<'static, str>);

impl ResourceTag {
    /// Tag from a static string (usually [`Entity::TAG`]).
    #[must_use]
    pub const fn from_static(tag: &'static str) -> Self {
        Self(Cow::Borrowed(tag))
    }

    /// Borrow as `&str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Schema version of an entity's stored shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaVersion(u32);

impl SchemaVersion {
    /// Create a schema version.
    #[must_use]
    pub const fn new(version: u32) -> Self {
        Self(version)
    }

    /// The numeric version.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Identity and bookkeeping fields shared by every entity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityHeader {
    id: EntityId,
    tag: ResourceTag,
    version: SchemaVersion,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl EntityHeader {
    /// Header for a brand-new, not-yet-persisted entity.
    #[must_use]
    pub const fn new(tag: &'static str, version: SchemaVersion, now: DateTime<Utc>) -> Self {
        Self {
            id: EntityId::empty(),
            tag: ResourceTag::from_static(tag),
            version,
            created_at: now,
            updated_at: now,
        }
    }

    /// The identifier (empty before first persistence).
    #[must_use]
    pub const fn id(&self) -> &EntityId {
        &self.id
    }

    /// The resource tag.
    #[must_use]
    pub const fn tag(&self) -> &ResourceTag {
        &self.tag
    }

    /// The schema version.
    #[must_use]
    pub const fn version(&self) -> SchemaVersion {
        self.version
    }

    /// Creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Last update timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Whether an identifier has been assigned.
    #[must_use]
    pub fn is_persisted(&self) -> bool {
        !self.id.is_empty()
    }

    /// Same header with `id` assigned.
    #[must_use]
    pub fn persisted(self, id: EntityId) -> Self {
        Self { id, ..self }
    }

    /// Same header with `updated_at` moved to `now`.
    #[must_use]
    pub fn touched(self, now: DateTime<Utc>) -> Self {
        Self {
            updated_at: now,
            ..self
        }
    }

    /// Same record re-shaped under schema `version`.
    ///
    /// Used when a stored document of an older version is upgraded to the
    /// current shape. A header never moves to an older version.
    #[must_use]
    pub fn upgraded(self, version: SchemaVersion) -> Self {
        Self {
            version: self.version.max(version),
            ..self
        }
    }
}

/// A domain record a repository can store.
///
/// Implementors expose their [`EntityHeader`] and declare which attributes
/// may appear in a [`Query`](crate::query::Query). Header attributes
/// ([`HEADER_ATTRIBUTES`]) are always queryable.
pub trait Entity: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Resource tag shared by every instance of this kind.
    const TAG: &'static str;

    /// Domain attributes that queries may reference.
    const ATTRIBUTES: &'static [&'static str];

    /// The identity header.
    fn header(&self) -> &EntityHeader;

    /// The same entity carrying a different header.
    #[must_use]
    fn with_header(self, header: EntityHeader) -> Self;

    /// Shorthand for `self.header().id()`.
    fn id(&self) -> &EntityId {
        self.header().id()
    }

    /// The same entity with its identifier assigned.
    #[must_use]
    fn with_id(self, id: EntityId) -> Self {
        let header = self.header().clone().persisted(id);
        self.with_header(header)
    }

    /// Whether `property` is a header attribute or one of [`Entity::ATTRIBUTES`].
    fn declares(property: &str) -> bool {
        HEADER_ATTRIBUTES.contains(&property) || Self::ATTRIBUTES.contains(&property)
    }

    /// JSON value of a declared attribute, used by stores that evaluate
    /// queries in process.
    ///
    /// The default reads header attributes from the header and everything
    /// else from the entity's top-level serialized fields.
    fn attribute(&self, property: &str) -> Option<Value> {
        let header = self.header();
        match property {
            "id" => Some(Value::String(header.id().as_str().to_string())),
            "tag" => Some(Value::String(header.tag().as_str().to_string())),
            "version" => Some(Value::from(header.version().get())),
            "created_at" => serde_json::to_value(header.created_at()).ok(),
            "updated_at" => serde_json::to_value(header.updated_at()).ok(),
            _ => match serde_json::to_value(self) {
                Ok(Value::Object(mut fields)) => fields.remove(property),
                _ => None,
            },
        }
    }
}
