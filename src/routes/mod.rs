use axum::{
    Router,
    http::{Method, StatusCode, Uri, header},
    response::{IntoResponse, Response},
};

use crate::{error::AppError, state::SharedState};

pub mod auth;
pub mod docs;
pub mod game;
pub mod health;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    let app_router = health::router()
        .merge(game::router())
        .merge(auth::router());

    app_router
        .merge(docs::router())
        .fallback(add_trailing_slash)
        .with_state(state)
}

/// Redirect `GET`/`HEAD` requests for unknown slash-less paths to their slashed form.
async fn add_trailing_slash(method: Method, uri: Uri) -> Response {
    let path = uri.path();
    if (method == Method::GET || method == Method::HEAD) && !path.ends_with('/') {
        let location = match uri.query() {
            Some(query) => format!("{path}/?{query}"),
            None => format!("{path}/"),
        };
        return (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, location)]).into_response();
    }

    AppError::NotFound(format!("no route for {method} {path}")).into_response()
}
