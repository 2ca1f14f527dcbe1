use std::collections::HashMap;

use axum::{
    Form, Router,
    extract::{Query, State, rejection::FormRejection},
    http::{HeaderMap, header},
    response::{Html, IntoResponse, Redirect},
    routing::{get, post},
};
use axum_valid::{Valid, ValidRejection};
use tracing::debug;

use crate::{
    dto::auth::LoginForm,
    error::AppError,
    services::auth_service,
    state::{SharedState, session::SessionId},
    views,
};

const SESSION_COOKIE: &str = "sessionId";
const VERIFY_PATH: &str = "/login/verify/";

/// Login, OpenID return and logout routes.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/login/", get(login_page).post(login))
        .route(VERIFY_PATH, get(verify))
        .route("/logout/", post(logout))
}

/// Session referenced by the request's `sessionId` cookie, if it parses.
pub(crate) fn session_from_headers(headers: &HeaderMap) -> Option<SessionId> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| value.parse().ok())
}

fn session_cookie(id: SessionId) -> String {
    format!("{SESSION_COOKIE}={id}; HttpOnly; Path=/; SameSite=Lax")
}

fn expired_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; HttpOnly; Path=/; SameSite=Lax; Max-Age=0")
}

/// Absolute URL the provider should send the browser back to.
fn return_to(state: &SharedState, headers: &HeaderMap) -> String {
    match state.public_url() {
        Some(base) => format!("{base}{VERIFY_PATH}"),
        None => {
            let host = headers
                .get(header::HOST)
                .and_then(|value| value.to_str().ok())
                .unwrap_or("localhost");
            format!("http://{host}{VERIFY_PATH}")
        }
    }
}

#[utoipa::path(
    get,
    path = "/login/",
    tag = "auth",
    responses((status = 200, description = "Login form", content_type = "text/html", body = String))
)]
/// Show the OpenID login form.
pub async fn login_page() -> Html<String> {
    Html(views::login())
}

#[utoipa::path(
    post,
    path = "/login/",
    tag = "auth",
    request_body(content = LoginForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Redirect to the OpenID provider"),
        (status = 400, description = "No identifier supplied"),
        (status = 401, description = "Provider discovery or authentication failed")
    )
)]
/// Start an OpenID login for the submitted identifier.
pub async fn login(
    State(state): State<SharedState>,
    headers: HeaderMap,
    form: Result<Valid<Form<LoginForm>>, ValidRejection<FormRejection>>,
) -> Result<Redirect, AppError> {
    let Valid(Form(form)) = form?;
    let identifier = form.identifier().unwrap_or_default();
    let auth_url =
        auth_service::begin_login(&state, identifier, return_to(&state, &headers)).await?;
    Ok(Redirect::to(&auth_url))
}

#[utoipa::path(
    get,
    path = "/login/verify/",
    tag = "auth",
    responses((status = 303, description = "Logged in and sent home, or sent back to the login page"))
)]
/// Handle the provider's redirect back to us.
pub async fn verify(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    match auth_service::complete_login(&state, return_to(&state, &headers), params).await {
        Ok(session_id) => (
            [(header::SET_COOKIE, session_cookie(session_id))],
            Redirect::to("/"),
        )
            .into_response(),
        Err(err) => {
            debug!(error = %err, "login not completed");
            Redirect::to("/login/").into_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/logout/",
    tag = "auth",
    responses((status = 303, description = "Session dropped; redirect home"))
)]
/// Forget the session and clear its cookie.
pub async fn logout(State(state): State<SharedState>, headers: HeaderMap) -> impl IntoResponse {
    auth_service::logout(&state, session_from_headers(&headers));
    (
        [(header::SET_COOKIE, expired_session_cookie())],
        Redirect::to("/"),
    )
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn finds_session_among_other_cookies() {
        let id = SessionId::generate();
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("theme=dark; sessionId={id}; lang=en")).unwrap(),
        );
        assert_eq!(session_from_headers(&headers), Some(id));
    }

    #[test]
    fn ignores_missing_or_garbled_session() {
        let mut headers = HeaderMap::new();
        assert_eq!(session_from_headers(&headers), None);
        headers.insert(header::COOKIE, HeaderValue::from_static("sessionId=garbage"));
        assert_eq!(session_from_headers(&headers), None);
    }

    #[test]
    fn session_cookie_is_http_only() {
        let cookie = session_cookie(SessionId::generate());
        assert!(cookie.starts_with("sessionId="));
        assert!(cookie.contains("HttpOnly"));
        assert!(expired_session_cookie().contains("Max-Age=0"));
    }
}
