use std::collections::HashMap;

use tracing::{info, warn};

use crate::{
    error::ServiceError,
    state::{SharedState, session::SessionId},
};

/// Resolve the identifier with the identity provider and return where to send the browser.
pub async fn begin_login(
    state: &SharedState,
    identifier: &str,
    return_to: String,
) -> Result<String, ServiceError> {
    let identifier = identifier.trim();
    if identifier.is_empty() {
        return Err(ServiceError::InvalidInput(
            "an OpenID identifier is required".into(),
        ));
    }

    match state
        .identity()
        .authenticate(identifier.to_owned(), return_to)
        .await
    {
        Ok(auth_url) => {
            info!(identifier, "redirecting to OpenID provider");
            Ok(auth_url)
        }
        Err(err) => {
            warn!(identifier, error = %err, "OpenID authentication failed");
            Err(err.into())
        }
    }
}

/// Check the provider's assertion and open a session for the verified identity.
pub async fn complete_login(
    state: &SharedState,
    return_to: String,
    params: HashMap<String, String>,
) -> Result<SessionId, ServiceError> {
    let open_id = state
        .identity()
        .verify(return_to, params)
        .await
        .inspect_err(|err| warn!(error = %err, "OpenID verification failed"))?;

    let session_id = state.sessions().create(open_id.clone());
    info!(%open_id, "user logged in");
    Ok(session_id)
}

/// Drop the session, if any. Returns whether one existed.
pub fn logout(state: &SharedState, session_id: Option<SessionId>) -> bool {
    let Some(id) = session_id else {
        return false;
    };
    match state.sessions().remove(id) {
        Some(session) => {
            info!(open_id = %session.open_id, "user logged out");
            true
        }
        None => false,
    }
}

/// OpenID identity attached to the session, if the session is known.
pub fn current_identity(state: &SharedState, session_id: Option<SessionId>) -> Option<String> {
    session_id
        .and_then(|id| state.sessions().get(id))
        .map(|session| session.open_id)
}
