//! Gateway error types.

/// Errors from outbound collaborator calls.
///
/// Variants carry the operation name and, where available, the upstream
/// status and body. These details are for logs; the onboarding layer maps
/// every variant to a generic upstream failure before anything reaches an
/// end user.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// HTTP transport error.
    #[error("HTTP error during {operation}: {source}")]
    Http {
        /// Operation name.
        operation: &'static str,
        /// Underlying transport error.
        source: reqwest::Error,
    },

    /// The request timed out.
    #[error("{operation} timed out")]
    Timeout {
        /// Operation name.
        operation: &'static str,
    },

    /// The upstream returned a non-2xx status.
    #[error("{operation} returned {status}: {body}")]
    Api {
        /// Operation name.
        operation: &'static str,
        /// HTTP status code.
        status: u16,
        /// Response body excerpt.
        body: String,
    },

    /// Response deserialization failed.
    #[error("failed to decode {operation} response: {reason}")]
    Deserialization {
        /// Operation name.
        operation: &'static str,
        /// Why decoding failed.
        reason: String,
    },

    /// The referenced upstream object does not exist.
    #[error("{resource} {id} not found")]
    NotFound {
        /// Object kind (session, subscription, customer).
        resource: &'static str,
        /// The id that was looked up.
        id: String,
    },

    /// The upstream refused the request.
    #[error("request rejected: {0}")]
    Rejected(String),

    /// No tokio runtime is available to drive the HTTP call.
    #[error("no async runtime available for HTTP request")]
    NoRuntime,

    /// Adapter misconfiguration.
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

/// Cap on response body text carried into errors.
pub(crate) const BODY_EXCERPT_LEN: usize = 512;

pub(crate) fn excerpt(body: String) -> String {
    if body.len() <= BODY_EXCERPT_LEN {
        return body;
    }
    let mut cut = BODY_EXCERPT_LEN;
    while !body.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}...", &body[..cut])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_display() {
        let err = GatewayError::Api {
            operation: "create_customer",
            status: 402,
            body: "card_declined".into(),
        };
        assert_eq!(err.to_string(), "create_customer returned 402: card_declined");
    }

    #[test]
    fn excerpt_truncates_on_char_boundary() {
        let long = "é".repeat(400);
        let cut = excerpt(long);
        assert!(cut.ends_with("..."));
        assert!(cut.len() <= BODY_EXCERPT_LEN + 3);
        assert_eq!(excerpt("short".into()), "short");
    }
}
