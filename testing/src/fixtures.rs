//! Sample entities for tests and documentation.

use crate::mocks::test_clock;
use railyard_core::entity::{Entity, EntityHeader, SchemaVersion};
use railyard_core::environment::Clock;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// First schema version of [`Account`].
pub const ACCOUNT_V1: SchemaVersion = SchemaVersion::new(1);

/// Current schema version of [`Account`].
pub const ACCOUNT_VERSION: SchemaVersion = SchemaVersion::new(2);

/// A customer account, in its current (version 2) shape.
///
/// Stored documents of any version load through [`AccountDocument`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Account {
    #[serde(flatten)]
    header: EntityHeader,
    /// Contact address.
    pub email: String,
    /// Whether the account may sign in.
    pub active: bool,
    /// Balance in cents.
    pub balance: i64,
    /// Free-form labels.
    pub tags: Vec<String>,
    /// Subscription plan, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<String>,
}

/// A version 1 account: the address lived under `mail`, and there were no
/// tags or activation flag.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AccountV1 {
    /// Header as stored, carrying version 1.
    #[serde(flatten)]
    pub header: EntityHeader,
    /// Contact address.
    pub mail: String,
    /// Balance in cents.
    pub balance: i64,
    /// Subscription plan, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<String>,
}

/// A stored account document, one variant per schema version.
///
/// Deserialization dispatches on the document's `version`; an unknown
/// version is an error rather than a best guess.
///
/// # Examples
///
/// ```
/// use railyard_testing::fixtures::{AccountDocument, ACCOUNT_VERSION};
/// use railyard_core::Entity;
/// use serde_json::json;
///
/// let stored = json!({
///     "id": "a-1", "tag": "account", "version": 1,
///     "created_at": "2025-01-01T00:00:00Z", "updated_at": "2025-01-01T00:00:00Z",
///     "mail": "ada@example.com", "balance": 250
/// });
/// let document: AccountDocument = serde_json::from_value(stored).unwrap();
/// let account = document.upgrade();
/// assert_eq!(account.email, "ada@example.com");
/// assert_eq!(account.header().version(), ACCOUNT_VERSION);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub enum AccountDocument {
    /// Version 1 shape.
    V1(AccountV1),
    /// Version 2 shape (current).
    V2(Account),
}

impl AccountDocument {
    /// The schema version this document was stored under.
    #[must_use]
    pub const fn version(&self) -> SchemaVersion {
        match self {
            Self::V1(_) => ACCOUNT_V1,
            Self::V2(_) => ACCOUNT_VERSION,
        }
    }

    /// Bring the document to the current [`Account`] shape.
    ///
    /// Version 1 accounts become active with no tags.
    #[must_use]
    pub fn upgrade(self) -> Account {
        match self {
            Self::V1(v1) => Account {
                header: v1.header.upgraded(ACCOUNT_VERSION),
                email: v1.mail,
                active: true,
                balance: v1.balance,
                tags: Vec::new(),
                plan: v1.plan,
            },
            Self::V2(account) => account,
        }
    }
}

impl From<AccountDocument> for Account {
    fn from(document: AccountDocument) -> Self {
        document.upgrade()
    }
}

impl<'de> Deserialize<'de> for AccountDocument {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let document = Value::deserialize(deserializer)?;
        let version = document
            .get("version")
            .and_then(Value::as_u64)
            .ok_or_else(|| de::Error::missing_field("version"))?;

        match version {
            1 => serde_json::from_value(document)
                .map(Self::V1)
                .map_err(de::Error::custom),
            2 => serde_json::from_value(document)
                .map(Self::V2)
                .map_err(de::Error::custom),
            other => Err(de::Error::custom(format!(
                "unknown account schema version {other}"
            ))),
        }
    }
}

impl Account {
    /// A new, unsaved, active account created at the test clock's time.
    #[must_use]
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            header: EntityHeader::new(Self::TAG, ACCOUNT_VERSION, test_clock().now()),
            email: email.into(),
            active: true,
            balance: 0,
            tags: Vec::new(),
            plan: None,
        }
    }

    /// The same account with a different address.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = email.into();
        self
    }

    /// The same account, (de)activated.
    #[must_use]
    pub const fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// The same account with a different balance.
    #[must_use]
    pub const fn with_balance(mut self, balance: i64) -> Self {
        self.balance = balance;
        self
    }

    /// The same account with these tags.
    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// The same account on `plan`.
    #[must_use]
    pub fn with_plan(mut self, plan: impl Into<String>) -> Self {
        self.plan = Some(plan.into());
        self
    }
}

impl Entity for Account {
    const TAG: &'static str = "account";
    const ATTRIBUTES: &'static [&'static str] = &["email", "active", "balance", "tags", "plan"];

    fn header(&self) -> &EntityHeader {
        &self.header
    }

    fn with_header(self, header: EntityHeader) -> Self {
        Self { header, ..self }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn stored(version: u64, fields: &Value) -> Value {
        let mut document = json!({
            "id": "a-1",
            "tag": "account",
            "version": version,
            "created_at": "2025-01-01T00:00:00Z",
            "updated_at": "2025-01-02T00:00:00Z",
        });
        for (key, value) in fields.as_object().unwrap() {
            document[key] = value.clone();
        }
        document
    }

    fn address(document: &AccountDocument) -> &str {
        match document {
            AccountDocument::V1(v1) => &v1.mail,
            AccountDocument::V2(account) => &account.email,
        }
    }

    #[test]
    fn test_version_one_document_upgrades() {
        let document: AccountDocument = serde_json::from_value(stored(
            1,
            &json!({"mail": "ada@example.com", "balance": 250, "plan": "pro"}),
        ))
        .unwrap();
        assert_eq!(document.version(), ACCOUNT_V1);
        assert_eq!(address(&document), "ada@example.com");

        let account = Account::from(document);
        assert_eq!(account.id().as_str(), "a-1");
        assert_eq!(account.header().version(), ACCOUNT_VERSION);
        assert_eq!(account.email, "ada@example.com");
        assert!(account.active);
        assert!(account.tags.is_empty());
        assert_eq!(account.balance, 250);
        assert_eq!(account.plan.as_deref(), Some("pro"));
        assert_eq!(account.header().updated_at().to_rfc3339(), "2025-01-02T00:00:00+00:00");
    }

    #[test]
    fn test_current_document_loads_unchanged() {
        let account = Account::new("ada@example.com").with_tags(["beta"]);
        let document: AccountDocument =
            serde_json::from_value(serde_json::to_value(&account).unwrap()).unwrap();
        assert_eq!(document.version(), ACCOUNT_VERSION);
        assert_eq!(address(&document), "ada@example.com");
        assert_eq!(document.upgrade(), account);
    }

    #[test]
    fn test_unknown_version_is_rejected() {
        let err = serde_json::from_value::<AccountDocument>(stored(
            3,
            &json!({"email": "ada@example.com"}),
        ))
        .unwrap_err();
        assert!(err.to_string().contains("unknown account schema version 3"));
    }

    #[test]
    fn test_version_one_shape_is_not_an_account() {
        let legacy = stored(1, &json!({"mail": "ada@example.com", "balance": 0}));
        assert!(serde_json::from_value::<Account>(legacy).is_err());
    }

    #[test]
    fn test_declared_attributes() {
        assert!(Account::declares("email"));
        assert!(Account::declares("id"));
        assert!(!Account::declares("password"));
    }
}
