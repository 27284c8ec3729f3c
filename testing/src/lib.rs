//! # Railyard Testing
//!
//! Testing utilities and helpers for Railyard services.
//!
//! This crate provides:
//! - An in-memory repository implementing every capability
//! - Recording and fault-injecting repository wrappers
//! - Mock implementations of environment traits and validators
//! - Deterministic provider collaborators (signer, text generator, transcoder)
//! - A Given-When-Then harness for pipelines
//! - Property-based testing strategies
//!
//! ## Example
//!
//! ```
//! use railyard_core::repository::{Readable, Setter};
//! use railyard_core::Entity;
//! use railyard_testing::{Account, InMemoryRepository};
//!
//! # tokio_test::block_on(async {
//! let accounts = InMemoryRepository::new();
//! let stored = accounts.set(Account::new("ada@example.com")).await.unwrap();
//! assert_eq!(accounts.get(stored.id()).await.unwrap(), Some(stored));
//! # });
//! ```

use chrono::{DateTime, Utc};
use railyard_core::environment::Clock;

pub mod doubles;
pub mod evaluate;
pub mod fixtures;
pub mod harness;
pub mod providers;
pub mod repository;

/// Mock implementations of environment traits and collaborators.
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use railyard_core::either::Either;
    use railyard_core::envelope::Request;
    use railyard_core::stage::BoxFuture;
    use railyard_core::validation::{ValidationFailure, Validator};
    use serde_json::Value;

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use railyard_testing::mocks::FixedClock;
    /// use railyard_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::from_timestamp(1_735_689_600, 0).unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
        )
    }

    /// Validator with a fixed verdict.
    #[derive(Debug, Clone)]
    pub enum StaticValidator {
        /// Pass every request through unchanged.
        Accept,
        /// Reject every request with this failure.
        Reject(ValidationFailure),
    }

    impl StaticValidator {
        /// A validator rejecting every request with `errors`.
        #[must_use]
        pub fn rejecting<I, V>(errors: I) -> Self
        where
            I: IntoIterator<Item = V>,
            V: Into<Value>,
        {
            Self::Reject(ValidationFailure::new(errors))
        }
    }

    impl Validator for StaticValidator {
        fn validate(&self, request: Request) -> BoxFuture<'_, Either<ValidationFailure, Request>> {
            let verdict = match self {
                Self::Accept => Either::Right(request),
                Self::Reject(failure) => Either::Left(failure.clone()),
            };
            Box::pin(async move { verdict })
        }
    }

    /// Validator requiring top-level fields in the request data.
    ///
    /// Reports one `"<field> is required"` error per missing field.
    #[derive(Debug, Clone)]
    pub struct RequireFields {
        fields: Vec<String>,
    }

    impl RequireFields {
        /// Require each of `fields`.
        #[must_use]
        pub fn new<I, S>(fields: I) -> Self
        where
            I: IntoIterator<Item = S>,
            S: Into<String>,
        {
            Self {
                fields: fields.into_iter().map(Into::into).collect(),
            }
        }
    }

    impl Validator for RequireFields {
        fn validate(&self, request: Request) -> BoxFuture<'_, Either<ValidationFailure, Request>> {
            let missing: Vec<String> = self
                .fields
                .iter()
                .filter(|field| request.data().get(field.as_str()).is_none_or(Value::is_null))
                .map(|field| format!("{field} is required"))
                .collect();
            let verdict = if missing.is_empty() {
                Either::Right(request)
            } else {
                Either::Left(ValidationFailure::new(missing))
            };
            Box::pin(async move { verdict })
        }
    }
}

/// Test helpers and utilities.
pub mod helpers {
    /// Install a `tracing` subscriber that writes through the test harness.
    ///
    /// Safe to call from every test; only the first call installs.
    pub fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
            )
            .with_test_writer()
            .try_init();
    }
}

/// Property-based testing utilities using proptest.
pub mod properties {
    use crate::fixtures::Account;
    use proptest::prelude::*;
    use railyard_core::entity::{Entity, EntityId};

    /// Strategy producing persisted accounts with small, colliding values so
    /// filters have something to match.
    pub fn arb_account() -> impl Strategy<Value = Account> {
        (1u32..50, "[a-c]{1,3}", any::<bool>(), -5i64..5).prop_map(|(id, user, active, balance)| {
            Account::new(format!("{user}@example.com"))
                .with_id(EntityId::new(id.to_string()))
                .with_active(active)
                .with_balance(balance)
        })
    }

    /// Strategy producing up to `max` accounts with distinct identifiers.
    pub fn arb_accounts(max: usize) -> impl Strategy<Value = Vec<Account>> {
        prop::collection::vec(arb_account(), 0..=max).prop_map(|mut accounts| {
            accounts.sort_by(|a, b| a.id().cmp(b.id()));
            accounts.dedup_by(|a, b| a.id() == b.id());
            accounts
        })
    }
}

// Re-export commonly used items
pub use doubles::{Call, FaultyRepository, Operation, RecordingRepository};
pub use fixtures::{Account, AccountDocument, AccountV1};
pub use harness::PipelineTest;
pub use mocks::{FixedClock, RequireFields, StaticValidator, test_clock};
pub use providers::{CannedGenerator, PassthroughTranscoder, ProviderOutage, StaticSigner};
pub use repository::InMemoryRepository;
