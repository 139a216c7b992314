use llm::error::LLMError;
use thiserror::Error;

/// failures reported by the generation provider.
///
/// string payloads keep the type `Clone` so a single failure can be both
/// logged and forwarded as an event.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("network failure: {0}")]
    Network(String),
    #[error("authentication rejected: {0}")]
    Auth(String),
    #[error("quota or rate limit exceeded: {0}")]
    Quota(String),
    #[error("malformed provider response: {0}")]
    Malformed(String),
    #[error("provider error: {0}")]
    Other(String),
}

impl From<LLMError> for ProviderError {
    fn from(err: LLMError) -> Self {
        let message = err.to_string();
        // quota rejections arrive as plain http/provider errors; sniff the status text.
        let lower = message.to_ascii_lowercase();
        if lower.contains("429") || lower.contains("resource_exhausted") || lower.contains("quota") {
            return Self::Quota(message);
        }
        match err {
            LLMError::HttpError(_) => Self::Network(message),
            LLMError::AuthError(_) => Self::Auth(message),
            LLMError::JsonError(_) => Self::Malformed(message),
            _ => Self::Other(message),
        }
    }
}

/// everything a travel request can fail with.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TravelError {
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("malformed `{function}` invocation: {reason}")]
    MalformedToolInvocation { function: String, reason: String },
    #[error("unknown tool `{0}`")]
    UnknownTool(String),
}
