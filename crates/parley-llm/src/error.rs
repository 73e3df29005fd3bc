use thiserror::Error;

/// Errors from the text-generation gateway.
///
/// Timeout and malformed-response are distinct kinds on purpose: the
/// caller surfaces both as a generation failure, but operators need to
/// tell "the model is slow" apart from "the endpoint is speaking a
/// different protocol".
#[derive(Debug, Error)]
pub enum LlmError {
    /// The completion request did not finish within the configured timeout.
    #[error("completion request timed out")]
    Timeout,

    /// Transport-level failure (connection refused, TLS, DNS).
    #[error("completion request failed: {0}")]
    Http(reqwest::Error),

    /// The endpoint answered with a non-success status.
    #[error("completion endpoint returned status {status}: {message}")]
    Status { status: u16, message: String },

    /// The endpoint answered 2xx but the body was not a usable completion.
    #[error("malformed completion response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            LlmError::Timeout
        } else {
            LlmError::Http(e)
        }
    }
}
