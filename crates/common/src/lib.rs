// ================
// common/src/lib.rs
// ================
//! Common types shared between the `idgate` backend crates.
//! This module defines the session record stored in the login cookie,
//! the user record returned by the directory, and the user-facing messages.

use serde::{Deserialize, Deserializer, Serialize};

/// Session field holding the signed-in user id
pub const KEY_USER: &str = "user";
/// Session field holding the provider session token
pub const KEY_SID: &str = "sid";
/// Session field flagging an authenticated session
pub const KEY_AUTHENTICATED: &str = "authenticated";
/// Session field holding the "where you are from" redirect target
pub const KEY_WYAF: &str = "wyaf";

/// Messages that may be shown to a user on the login page.
/// Nothing else from an authentication failure ever reaches a response body.
pub mod messages {
    pub const MISSING_USERNAME: &str = "Please provide a username";
    pub const MISSING_PASSWORD: &str = "Please provide a password";
    pub const INVALID_LOGIN: &str = "Invalid login";
    pub const PROVIDER_UNREACHABLE: &str = "Error contacting identity provider";
}

/// Login state of a single browser session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Authenticated,
}

/// Record stored in the session cookie
///
/// Every field is optional on the wire so a cookie written by an older
/// build, or a cookie that was cleared, still decodes.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionRecord {
    /// Signed-in user id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    /// Provider session token, a bearer credential
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
    /// Whether a login was committed to this session
    #[serde(default)]
    pub authenticated: bool,
    /// Destination requested before the login redirect
    #[serde(
        default,
        deserialize_with = "string_or_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub wyaf: Option<String>,
}

impl SessionRecord {
    /// True only when the flag is set and both identity fields are non-empty.
    pub fn is_authenticated(&self) -> bool {
        self.authenticated && non_empty(&self.user) && non_empty(&self.sid)
    }

    pub fn state(&self) -> SessionState {
        if self.is_authenticated() {
            SessionState::Authenticated
        } else {
            SessionState::Anonymous
        }
    }

    /// User id of an authenticated session
    pub fn user_id(&self) -> Option<&str> {
        if self.is_authenticated() {
            self.user.as_deref()
        } else {
            None
        }
    }
}

fn non_empty(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.is_empty())
}

/// Accept any JSON value and keep it only if it is a string.
fn string_or_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => Some(s),
        _ => None,
    })
}

/// User entry as resolved by the directory
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    /// Login name
    pub uid: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
}
