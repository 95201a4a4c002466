//! Model layer
//!
//! Value types shared by the resolvers, the kube-backed collaborators and the CLI.
//!
//! Structure:
//! - `controller_key.rs` - Controller identity keys
//! - `well_known_kind.rs` - The closed set of cache-backed controller kinds
//! - `mod.rs` - Public API re-exports

mod controller_key;
mod well_known_kind;

pub use controller_key::{ControllerKey, ControllerKeyWithApiVersion};
pub use well_known_kind::{WellKnownKind, WellKnownKinds};
