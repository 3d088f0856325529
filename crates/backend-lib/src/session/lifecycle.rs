// ============================
// idgate-backend-lib/src/session/lifecycle.rs
// ============================
//! Login and logout transitions of a session record.
use idgate_common::SessionRecord;
use tracing::{debug, warn};

use super::SessionStore;
use crate::error::SessionError;
use crate::idp::SessionToken;

/// Destination when no usable redirect target was stored
pub const SITE_ROOT: &str = "/";

/// Bind a successful login to the session and resolve where to send the user.
///
/// Consumes any stored WYAF target. Targets that are not local paths fall
/// back to [`SITE_ROOT`].
pub fn commit<S>(session: &mut S, uid: &str, token: &SessionToken) -> Result<String, SessionError>
where
    S: SessionStore + ?Sized,
{
    if uid.is_empty() {
        return Err(SessionError::Incomplete("user id"));
    }
    if token.is_empty() {
        return Err(SessionError::Incomplete("provider session"));
    }

    let record = session.record_mut();
    record.user = Some(uid.to_string());
    record.sid = Some(token.expose().to_string());
    record.authenticated = true;

    let location = match record.wyaf.take() {
        Some(target) if is_local_target(&target) => target,
        Some(target) => {
            warn!(uid = %uid, target = %target, "ignoring non-local redirect target");
            SITE_ROOT.to_string()
        },
        None => SITE_ROOT.to_string(),
    };

    session.save()?;
    Ok(location)
}

/// Drop every session field and expire the cookie. Safe to call on any session.
pub fn clear<S>(session: &mut S)
where
    S: SessionStore + ?Sized,
{
    *session.record_mut() = SessionRecord::default();
    session.expire();
    if let Err(err) = session.save() {
        warn!(error = %err, "failed to persist cleared session");
    }
}

/// Remember where an anonymous request was headed so login can send it back.
pub fn remember_target<S>(session: &mut S, target: &str) -> Result<(), SessionError>
where
    S: SessionStore + ?Sized,
{
    if !is_local_target(target) {
        debug!(target = %target, "not remembering non-local target");
        return Ok(());
    }
    session.record_mut().wyaf = Some(target.to_string());
    session.save()
}

/// Only same-site absolute paths are accepted as redirect targets.
///
/// Scheme and authority checks apply to the path; the query and fragment may
/// carry anything printable.
pub fn is_local_target(target: &str) -> bool {
    if target.chars().any(char::is_control) {
        return false;
    }
    let path = target
        .split_once(['?', '#'])
        .map_or(target, |(path, _)| path);

    path.starts_with('/')
        && !path.starts_with("//")
        && !path.contains('\\')
        && !path.contains("://")
}
