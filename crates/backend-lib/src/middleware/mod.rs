// crates/backend-lib/src/middleware/mod.rs

//! Middleware for the `idgate` server.

pub mod require_login;

pub use require_login::require_login;
