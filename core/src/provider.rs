//! Provider collaborators consumed by individual handlers.
//!
//! These are narrow async interfaces over external services (token signer,
//! generative-model client, media transcoder). Concrete drivers live outside
//! this workspace; handlers receive them through their environment.

use crate::stage::BoxFuture;
use serde_json::Value;
use thiserror::Error;

/// Failures reported by provider collaborators.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// The token was malformed, expired or signed by someone else.
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    /// The provider rejected the input.
    #[error("Rejected by provider: {0}")]
    Rejected(String),

    /// The provider could not be reached.
    #[error("Provider unavailable: {0}")]
    Unavailable(String),
}

/// Issues and verifies signed tokens.
pub trait Signer: Send + Sync {
    /// Sign `payload` into an opaque token.
    ///
    /// # Errors
    ///
    /// [`ProviderError::Unavailable`] or [`ProviderError::Rejected`].
    fn sign(&self, payload: Value) -> BoxFuture<'_, Result<String, ProviderError>>;

    /// Verify `token` and return its payload.
    ///
    /// # Errors
    ///
    /// [`ProviderError::InvalidToken`] when verification fails.
    fn decode<'a>(&'a self, token: &'a str) -> BoxFuture<'a, Result<Value, ProviderError>>;
}

/// Generates text from a prompt.
pub trait TextGenerator: Send + Sync {
    /// Complete `prompt`.
    ///
    /// # Errors
    ///
    /// Any [`ProviderError`].
    fn generate<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<String, ProviderError>>;
}

/// Converts media between formats.
pub trait MediaTranscoder: Send + Sync {
    /// Transcode `input` into `target_format` (for example `"mp3"`).
    ///
    /// # Errors
    ///
    /// Any [`ProviderError`].
    fn transcode<'a>(
        &'a self,
        input: Vec<u8>,
        target_format: &'a str,
    ) -> BoxFuture<'a, Result<Vec<u8>, ProviderError>>;
}
