//! Resolution errors

use crate::models::ControllerKeyWithApiVersion;

/// Error type returned by the external collaborators (caches, discovery, scale client)
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised while resolving a top-level controller
///
/// Every variant is terminal for the call that produced it. Callers are
/// expected to retry on their next reconcile pass rather than immediately.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The object is absent from its kind's cache (deleted, not yet synced, or wrong kind)
    #[error("{kind} {namespace}/{name} does not exist")]
    NotFound {
        kind: String,
        namespace: String,
        name: String,
    },

    /// The cache itself failed to answer
    #[error("failed to look up {kind} {namespace}/{name} in cache: {source}")]
    CacheLookup {
        kind: String,
        namespace: String,
        name: String,
        #[source]
        source: BoxError,
    },

    /// Malformed apiVersion on the generic path
    #[error("invalid apiVersion {api_version:?}: {reason}")]
    Parse { api_version: String, reason: String },

    /// A cache returned an object of a different kind than the one it is keyed for
    #[error("failed to parse {expected} {namespace}/{name}: cache returned a {found}")]
    UnsupportedKind {
        expected: String,
        found: String,
        namespace: String,
        name: String,
    },

    /// No candidate resource mapping yielded a scale view
    ///
    /// Covers both "the resource has no scale sub-resource" and "we lack RBAC for it".
    #[error("unhandled targetRef {api_version} / {kind} / {name}, last error: {source}")]
    ScaleUnavailable {
        api_version: String,
        kind: String,
        name: String,
        #[source]
        source: BoxError,
    },

    /// The walk reached a key it had already visited
    #[error("cycle detected in ownership chain at {key}")]
    CycleDetected { key: ControllerKeyWithApiVersion },

    /// A mock fetcher was called with an argument it was not set up for
    #[error("unexpected argument {}, expected {}", describe(.actual), describe(.expected))]
    AssertionMismatch {
        expected: Option<ControllerKeyWithApiVersion>,
        actual: Option<ControllerKeyWithApiVersion>,
    },
}

fn describe(key: &Option<ControllerKeyWithApiVersion>) -> String {
    match key {
        Some(key) => key.to_string(),
        None => "<none>".to_string(),
    }
}

/// Result type for resolution operations
pub type FetchResult<T> = Result<T, FetchError>;
