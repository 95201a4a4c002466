//! ownerchain library
//!
//! Resolves the top-level controller of a Kubernetes object by walking its
//! controlling owner references. Used by the `ownerchain` binary and by the
//! integration tests.

pub mod config;
pub mod fetcher;
pub mod kube;
pub mod models;

// Re-export commonly used types for convenience
pub use fetcher::{ControllerFetcher, FetchError, FetchResult, OwnershipWalker};
pub use models::{ControllerKey, ControllerKeyWithApiVersion, WellKnownKind, WellKnownKinds};
