//! Shared error taxonomy for the query pipeline.
//!
//! Every fallible operation behind the gateway reports one of these
//! variants; the REST and JSON-RPC surfaces map them onto their own
//! status codes. An answer with no supporting evidence is not an error,
//! it is a successful [`crate::models::Answer`] with the `no_evidence`
//! flag set.

/// Failure classification shared by retrieval, synthesis, analysis, the
/// tool registry, and both protocol surfaces.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// The caller supplied input that was rejected before any work ran.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A named document does not exist in the corpus.
    #[error("not found: {0}")]
    NotFound(String),

    /// A tool name did not resolve against the registry.
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    /// The request exceeded the configured latency ceiling.
    #[error("request timed out after {0} ms")]
    Timeout(u64),

    /// Unexpected fault. Details are logged server-side, not returned.
    #[error("internal error: {0}")]
    Internal(String),
}

impl QueryError {
    /// Stable machine-readable tag used in REST error bodies.
    ///
    /// Unknown tools and unknown documents share the `not_found` tag;
    /// the JSON-RPC surface is the only place that tells them apart.
    pub fn kind(&self) -> &'static str {
        match self {
            QueryError::InvalidArgument(_) => "invalid_argument",
            QueryError::NotFound(_) | QueryError::UnknownTool(_) => "not_found",
            QueryError::Timeout(_) => "timeout",
            QueryError::Internal(_) => "internal",
        }
    }

    /// Message safe to return to callers. Internal faults are collapsed
    /// to a generic line; everything else is caller-caused and echoed.
    pub fn public_message(&self) -> String {
        match self {
            QueryError::Internal(_) => "internal error".to_string(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_tags() {
        assert_eq!(QueryError::InvalidArgument("x".into()).kind(), "invalid_argument");
        assert_eq!(QueryError::NotFound("x".into()).kind(), "not_found");
        assert_eq!(QueryError::UnknownTool("x".into()).kind(), "not_found");
        assert_eq!(QueryError::Timeout(10).kind(), "timeout");
        assert_eq!(QueryError::Internal("x".into()).kind(), "internal");
    }

    #[test]
    fn test_internal_message_not_leaked() {
        let err = QueryError::Internal("lock poisoned at metrics.rs:42".into());
        assert_eq!(err.public_message(), "internal error");
        let err = QueryError::NotFound("document: bogus".into());
        assert!(err.public_message().contains("bogus"));
    }
}
