/// Router Module Index
///
/// Splits the routing table by access level. Protection is applied per module
/// through Axum layers so that an endpoint cannot end up outside the chain it
/// belongs to.

/// Rating endpoints, all behind the authentication chain.
pub mod ratings;

/// Unauthenticated endpoints (API description).
pub mod docs;
