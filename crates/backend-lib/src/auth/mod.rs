// ============================
// idgate-backend-lib/src/auth/mod.rs
// ============================
//! Authentication module.

pub mod csrf;
mod service;
pub mod token_generator;

pub use service::{classify, AuthService, FailureCause};
