// ============================
// idgate-backend-lib/src/idp/mod.rs
// ============================
//! Identity provider and user directory clients.

pub mod freeipa;

use std::fmt;

use async_trait::async_trait;
use idgate_common::UserRecord;

use crate::error::{DirectoryError, IdpError};

pub use freeipa::{FreeIpa, FreeIpaConnection, FreeIpaDirectory};

/// Opaque session token issued by the identity provider.
///
/// This is a bearer credential: it has no `Display` impl and its `Debug`
/// output is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Raw token, for binding to the session record only
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(<redacted>)")
    }
}

/// Remote service of record for credential verification
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Open a fresh connection. Connections are never shared between attempts.
    async fn connect(&self) -> Result<Box<dyn IdpConnection>, IdpError>;
}

/// A single isolated conversation with the identity provider
#[async_trait]
pub trait IdpConnection: Send {
    /// Submit the user's credentials
    async fn login(&mut self, uid: &str, password: &str) -> Result<(), IdpError>;

    /// Confirm the provider session is usable and return its token
    async fn probe(&mut self) -> Result<SessionToken, IdpError>;
}

/// Resolves user names to user records
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn lookup(&self, uid: &str) -> Result<UserRecord, DirectoryError>;
}
