//! Two-branch result algebra.
//!
//! [`Either`] is the channel for *expected* failures: validation errors,
//! not-found decisions, business-rule violations. `Left` carries the failure,
//! `Right` carries the success. There is no implicit unwrapping; callers
//! branch with `match` or one of the combinators below.
//!
//! Infrastructure faults do not travel through `Either`. They are ordinary
//! `Err` values (see [`crate::repository::RepositoryError`]) or panics.
//!
//! # Example
//!
//! ```
//! use railyard_core::either::Either;
//!
//! fn parse_age(raw: &str) -> Either<String, u8> {
//!     match raw.parse::<u8>() {
//!         Ok(age) => Either::Right(age),
//!         Err(_) => Either::Left(format!("not an age: {raw}")),
//!     }
//! }
//!
//! let adult = parse_age("42").map(|age| age >= 18);
//! assert_eq!(adult, Either::Right(true));
//! assert!(parse_age("old").is_left());
//! ```

use serde::{Deserialize, Serialize};

/// A value that is exactly one of `Left(L)` (failure) or `Right(R)` (success).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Either<L, R> {
    /// The failure branch.
    Left(L),
    /// The success branch.
    Right(R),
}

impl<L, R> Either<L, R> {
    /// Returns `true` for `Left`.
    #[must_use]
    pub const fn is_left(&self) -> bool {
        matches!(self, Self::Left(_))
    }

    /// Returns `true` for `Right`.
    #[must_use]
    pub const fn is_right(&self) -> bool {
        matches!(self, Self::Right(_))
    }

    /// Converts `&Either<L, R>` into `Either<&L, &R>`.
    #[must_use]
    pub const fn as_ref(&self) -> Either<&L, &R> {
        match self {
            Self::Left(l) => Either::Left(l),
            Self::Right(r) => Either::Right(r),
        }
    }

    /// The left value, if any.
    #[must_use]
    pub fn left(self) -> Option<L> {
        match self {
            Self::Left(l) => Some(l),
            Self::Right(_) => None,
        }
    }

    /// The right value, if any.
    #[must_use]
    pub fn right(self) -> Option<R> {
        match self {
            Self::Left(_) => None,
            Self::Right(r) => Some(r),
        }
    }

    /// Transforms the success branch, leaving a failure untouched.
    pub fn map<T, F>(self, f: F) -> Either<L, T>
    where
        F: FnOnce(R) -> T,
    {
        match self {
            Self::Left(l) => Either::Left(l),
            Self::Right(r) => Either::Right(f(r)),
        }
    }

    /// Transforms the failure branch, leaving a success untouched.
    pub fn map_left<T, F>(self, f: F) -> Either<T, R>
    where
        F: FnOnce(L) -> T,
    {
        match self {
            Self::Left(l) => Either::Left(f(l)),
            Self::Right(r) => Either::Right(r),
        }
    }

    /// Chains another fallible step onto the success branch.
    ///
    /// The first `Left` wins: `f` never runs on a failure.
    pub fn and_then<T, F>(self, f: F) -> Either<L, T>
    where
        F: FnOnce(R) -> Either<L, T>,
    {
        match self {
            Self::Left(l) => Either::Left(l),
            Self::Right(r) => f(r),
        }
    }

    /// Collapses both branches into a single value.
    pub fn fold<T, FL, FR>(self, on_left: FL, on_right: FR) -> T
    where
        FL: FnOnce(L) -> T,
        FR: FnOnce(R) -> T,
    {
        match self {
            Self::Left(l) => on_left(l),
            Self::Right(r) => on_right(r),
        }
    }

    /// Converts into a `Result`, mapping `Left` to `Err`.
    ///
    /// # Errors
    ///
    /// Returns `Err(l)` when `self` is `Left(l)`.
    pub fn into_result(self) -> Result<R, L> {
        match self {
            Self::Left(l) => Err(l),
            Self::Right(r) => Ok(r),
        }
    }
}

impl<L, R> From<Result<R, L>> for Either<L, R> {
    fn from(result: Result<R, L>) -> Self {
        match result {
            Ok(r) => Self::Right(r),
            Err(l) => Self::Left(l),
        }
    }
}

impl<L: std::fmt::Display, R: std::fmt::Display> std::fmt::Display for Either<L, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Either::Left(l) => write!(f, "{l}"),
            Either::Right(r) => write!(f, "{r}"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn left_is_never_right(value in any::<i64>()) {
            let either: Either<i64, ()> = Either::Left(value);
            prop_assert!(either.is_left());
            prop_assert!(!either.is_right());
        }

        #[test]
        fn right_is_never_left(value in any::<i64>()) {
            let either: Either<(), i64> = Either::Right(value);
            prop_assert!(either.is_right());
            prop_assert!(!either.is_left());
        }
    }

    #[test]
    fn and_then_stops_at_first_left() {
        let mut calls = 0;
        let result: Either<&str, i32> = Either::Left("boom");
        let chained = result.and_then(|v| {
            calls += 1;
            Either::Right(v + 1)
        });
        assert_eq!(chained, Either::Left("boom"));
        assert_eq!(calls, 0);
    }

    #[test]
    fn map_left_only_touches_failures() {
        let failure: Either<&str, i32> = Either::Left("bad");
        assert_eq!(failure.map_left(str::len), Either::Left(3));

        let success: Either<&str, i32> = Either::Right(7);
        assert_eq!(success.map_left(str::len), Either::Right(7));
    }

    #[test]
    fn fold_and_result_conversion() {
        let e: Either<String, u32> = Ok::<u32, String>(5).into();
        assert_eq!(e.clone().fold(|_| 0, |v| v * 2), 10);
        assert_eq!(e.into_result().unwrap(), 5);
    }

    #[test]
    fn serializes_with_kind_tag() {
        let e: Either<String, i32> = Either::Right(1);
        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "right", "value": 1}));
        let back: Either<String, i32> = serde_json::from_value(json).unwrap();
        assert_eq!(back, e);
    }
}
