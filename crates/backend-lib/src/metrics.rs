// ==============
// crates/backend-lib/src/metrics.rs

//! Central place for metric keys
pub const LOGIN_SUCCESS: &str = "auth.login.success";
pub const LOGIN_FAILURE: &str = "auth.login.failure";
pub const DIRECTORY_FAILURE: &str = "auth.directory.failure";
pub const LOGOUT: &str = "auth.logout";
