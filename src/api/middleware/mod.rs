//! API middleware.
//!
//! Only the audit logger is request-scoped; CORS and cache headers are
//! tower-http layers applied in the router.

pub mod audit;
