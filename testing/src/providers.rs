//! Deterministic stand-ins for provider collaborators.

use railyard_core::provider::{MediaTranscoder, ProviderError, Signer, TextGenerator};
use railyard_core::stage::BoxFuture;
use serde_json::Value;

/// Signer producing `"<key>.<payload json>"` tokens.
///
/// Not a cryptographic signature: decoding only checks the key prefix.
#[derive(Debug, Clone)]
pub struct StaticSigner {
    key: String,
}

impl StaticSigner {
    /// A signer using `key` as its token prefix.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

impl Signer for StaticSigner {
    fn sign(&self, payload: Value) -> BoxFuture<'_, Result<String, ProviderError>> {
        Box::pin(async move { Ok::<_, ProviderError>(format!("{}.{payload}", self.key)) })
    }

    fn decode<'a>(&'a self, token: &'a str) -> BoxFuture<'a, Result<Value, ProviderError>> {
        Box::pin(async move {
            let body = token
                .strip_prefix(self.key.as_str())
                .and_then(|rest| rest.strip_prefix('.'))
                .ok_or_else(|| ProviderError::InvalidToken("unknown signer".to_string()))?;
            serde_json::from_str::<Value>(body)
                .map_err(|e| ProviderError::InvalidToken(e.to_string()))
        })
    }
}

/// Text generator answering every prompt with a fixed reply.
///
/// Empty prompts are rejected.
#[derive(Debug, Clone)]
pub struct CannedGenerator {
    reply: String,
}

impl CannedGenerator {
    /// A generator that always answers `reply`.
    #[must_use]
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
        }
    }
}

impl TextGenerator for CannedGenerator {
    fn generate<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<String, ProviderError>> {
        Box::pin(async move {
            if prompt.trim().is_empty() {
                return Err(ProviderError::Rejected("empty prompt".to_string()));
            }
            Ok::<_, ProviderError>(self.reply.clone())
        })
    }
}

/// Transcoder that returns its input untouched for supported formats.
#[derive(Debug, Clone)]
pub struct PassthroughTranscoder {
    formats: Vec<String>,
}

impl PassthroughTranscoder {
    /// A transcoder accepting `formats` as targets.
    #[must_use]
    pub fn new<I, S>(formats: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            formats: formats.into_iter().map(Into::into).collect(),
        }
    }
}

impl MediaTranscoder for PassthroughTranscoder {
    fn transcode<'a>(
        &'a self,
        input: Vec<u8>,
        target_format: &'a str,
    ) -> BoxFuture<'a, Result<Vec<u8>, ProviderError>> {
        Box::pin(async move {
            if !self.formats.iter().any(|f| f == target_format) {
                return Err(ProviderError::Rejected(format!(
                    "unsupported format {target_format}"
                )));
            }
            Ok::<_, ProviderError>(input)
        })
    }
}

/// Every provider, permanently unreachable.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProviderOutage;

impl ProviderOutage {
    fn down<T>() -> Result<T, ProviderError> {
        Err(ProviderError::Unavailable("provider outage".to_string()))
    }
}

impl Signer for ProviderOutage {
    fn sign(&self, _payload: Value) -> BoxFuture<'_, Result<String, ProviderError>> {
        Box::pin(async { Self::down::<String>() })
    }

    fn decode<'a>(&'a self, _token: &'a str) -> BoxFuture<'a, Result<Value, ProviderError>> {
        Box::pin(async { Self::down::<Value>() })
    }
}

impl TextGenerator for ProviderOutage {
    fn generate<'a>(&'a self, _prompt: &'a str) -> BoxFuture<'a, Result<String, ProviderError>> {
        Box::pin(async { Self::down::<String>() })
    }
}

impl MediaTranscoder for ProviderOutage {
    fn transcode<'a>(
        &'a self,
        _input: Vec<u8>,
        _target_format: &'a str,
    ) -> BoxFuture<'a, Result<Vec<u8>, ProviderError>> {
        Box::pin(async { Self::down::<Vec<u8>>() })
    }
}
