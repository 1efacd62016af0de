//! Router Module Index
//!
//! Routes are segregated by the gate they sit behind. Each router applies its
//! own `route_layer`, so merging them never widens access: a method on a shared
//! path keeps the gate of the router that declared it.
//!
//! Shared paths use one parameter name (`/users/{id}`, `/classes/{id}`); the
//! segment is an email or a UUID depending on the method, as each handler's
//! `AppPath` extractor states.

/// Anonymous, read-only catalog routes plus token issuance and profile upsert.
pub mod public;

/// Routes behind the `require_authenticated` gate.
pub mod authenticated;

/// Routes behind the `require_instructor` gate.
pub mod instructor;

/// Routes behind the `require_admin` gate.
pub mod admin;
