use thiserror::Error;

/// Errors surfaced by the request pipeline and the typed endpoint wrappers.
///
/// The pipeline never swallows a failure: every outcome of `send` is either
/// the backend's successful response or exactly one of these variants.
#[derive(Debug, Error)]
pub enum ClientError {
    /// No response was received (connect error, timeout, broken transfer).
    /// Propagated immediately; the pipeline never retries these.
    #[error("network failure: {0}")]
    NetworkFailure(#[source] reqwest::Error),

    /// The access credential is invalid or expired and could not be
    /// renewed, either because no refresh credential is stored or because
    /// the renewal exchange itself failed. The caller must run a full
    /// re-authentication flow.
    #[error("authentication expired, login required")]
    AuthExpired,

    /// Any other non-success response, including an authorization failure
    /// on the post-renewal retry. Carries the raw response payload.
    #[error("request failed with status {status}: {payload}")]
    RequestFailed { status: u16, payload: String },

    /// The request could not be assembled (malformed header name or value).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The response body did not decode into the expected shape.
    #[error("invalid response body: {0}")]
    InvalidResponse(String),
}

impl ClientError {
    /// Status code of the failed request, when one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::RequestFailed { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True when the only remedy is a fresh login.
    pub fn requires_login(&self) -> bool {
        matches!(self, ClientError::AuthExpired)
    }
}
