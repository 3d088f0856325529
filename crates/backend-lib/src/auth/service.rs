// ============================
// idgate-backend-lib/src/auth/service.rs
// ============================
//! Login orchestration against the identity provider.
use std::sync::Arc;

use idgate_common::UserRecord;
use metrics::counter;
use tracing::{debug, error, info, warn};

use crate::error::{AuthError, DirectoryError, IdpError};
use crate::idp::{IdentityProvider, IdpConnection, SessionToken, UserDirectory};
use crate::metrics::{DIRECTORY_FAILURE, LOGIN_FAILURE, LOGIN_SUCCESS};

/// Remote failure that must not be told apart by the caller
#[derive(Debug)]
pub enum FailureCause {
    /// Directory lookup failed, including "no such user"
    Lookup(DirectoryError),
    /// Provider refused the credentials
    LoginRejected(IdpError),
    /// Provider answered with something we could not use
    Protocol(IdpError),
}

/// Collapse a remote failure into `InvalidLogin`, keeping the cause in the log only.
pub fn classify(uid: &str, cause: FailureCause) -> AuthError {
    match &cause {
        FailureCause::Lookup(err) => {
            counter!(DIRECTORY_FAILURE).increment(1);
            error!(uid = %uid, error = %err, "failed to check user");
        },
        FailureCause::LoginRejected(err) => {
            error!(uid = %uid, error = %err, "failed login attempt");
        },
        FailureCause::Protocol(err) => {
            error!(uid = %uid, error = %err, "identity provider protocol error during login");
        },
    }
    AuthError::InvalidLogin
}

impl From<IdpError> for FailureCause {
    fn from(err: IdpError) -> Self {
        match err {
            IdpError::Rejected { .. } => FailureCause::LoginRejected(err),
            other => FailureCause::Protocol(other),
        }
    }
}

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    idp: Arc<dyn IdentityProvider>,
    directory: Option<Arc<dyn UserDirectory>>,
    precheck_user: bool,
}

impl AuthService {
    pub fn new(idp: Arc<dyn IdentityProvider>) -> Self {
        Self {
            idp,
            directory: None,
            precheck_user: false,
        }
    }

    /// Attach a directory for `verify_user_exists`
    pub fn with_directory(mut self, directory: Arc<dyn UserDirectory>) -> Self {
        self.directory = Some(directory);
        self
    }

    /// Run `verify_user_exists` before every login
    pub fn with_precheck(mut self, enabled: bool) -> Self {
        self.precheck_user = enabled;
        self
    }

    /// Resolve `uid` in the directory.
    ///
    /// Every lookup failure reads as `InvalidLogin` so the caller cannot learn
    /// whether an account exists.
    pub async fn verify_user_exists(&self, uid: &str) -> Result<UserRecord, AuthError> {
        if uid.is_empty() {
            return Err(AuthError::MissingUsername);
        }

        let Some(directory) = self.directory.as_ref() else {
            return Err(classify(uid, FailureCause::Lookup(DirectoryError::NotConfigured)));
        };

        directory
            .lookup(uid)
            .await
            .map_err(|err| classify(uid, FailureCause::Lookup(err)))
    }

    /// Verify the credentials with the identity provider and return its session token.
    pub async fn authenticate(&self, uid: &str, password: &str) -> Result<SessionToken, AuthError> {
        require_credentials(uid, password)?;

        let mut conn = self.idp.connect().await.map_err(|err| {
            error!(uid = %uid, error = %err, "failed to open identity provider connection");
            AuthError::ProviderUnreachable
        })?;

        conn.login(uid, password)
            .await
            .map_err(|err| classify(uid, err.into()))?;

        // Credentials were good; a failure from here on is the provider's
        let token = conn.probe().await.map_err(|err| {
            error!(uid = %uid, error = %err, "identity provider probe failed after login");
            AuthError::ProviderUnreachable
        })?;

        if token.is_empty() {
            error!(uid = %uid, "identity provider returned an empty session");
            return Err(AuthError::ProviderUnreachable);
        }

        debug!(uid = %uid, "identity provider session established");
        Ok(token)
    }

    /// Handler entry point: optional directory pre-check, then `authenticate`.
    pub async fn login(&self, uid: &str, password: &str) -> Result<SessionToken, AuthError> {
        let result = async {
            // Blank fields never cost a remote round-trip
            require_credentials(uid, password)?;
            if self.precheck_user {
                self.verify_user_exists(uid).await?;
            }
            self.authenticate(uid, password).await
        }
        .await;

        match &result {
            Ok(_) => {
                counter!(LOGIN_SUCCESS).increment(1);
                info!(uid = %uid, "login succeeded");
            },
            Err(err) => {
                counter!(LOGIN_FAILURE, "kind" => err.kind()).increment(1);
                warn!(uid = %uid, kind = err.kind(), "login failed");
            },
        }
        result
    }
}

fn require_credentials(uid: &str, password: &str) -> Result<(), AuthError> {
    if uid.is_empty() {
        return Err(AuthError::MissingUsername);
    }
    if password.is_empty() {
        return Err(AuthError::MissingPassword);
    }
    Ok(())
}
