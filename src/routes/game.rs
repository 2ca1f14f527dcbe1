use axum::{
    Form, Router,
    extract::{Path, State, rejection::FormRejection},
    http::{HeaderMap, StatusCode, header},
    response::{Html, IntoResponse, Redirect},
    routing::{get, post},
};
use axum_valid::{Valid, ValidRejection};

use crate::{
    dto::game::{GameView, GuessForm},
    error::{AppError, ServiceError},
    routes::auth::session_from_headers,
    services::{auth_service, game_service},
    state::SharedState,
    views,
};

/// Routes for starting, showing and playing games.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", get(root))
        .route("/game/", get(start_page).post(create_game))
        .route("/game/{id}/", get(show_game))
        .route("/game/{id}/guess/", post(submit_guess))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "game",
    responses((status = 302, description = "Redirect to the start page"))
)]
/// Send visitors to the start page.
pub async fn root() -> impl IntoResponse {
    (StatusCode::FOUND, [(header::LOCATION, "/game/")])
}

#[utoipa::path(
    get,
    path = "/game/",
    tag = "game",
    responses((status = 200, description = "Start page", content_type = "text/html", body = String))
)]
/// Start page showing who is logged in and the "new game" form.
pub async fn start_page(State(state): State<SharedState>, headers: HeaderMap) -> Html<String> {
    let open_id = auth_service::current_identity(&state, session_from_headers(&headers));
    Html(views::home(open_id.as_deref()))
}

#[utoipa::path(
    post,
    path = "/game/",
    tag = "game",
    responses(
        (status = 303, description = "Game created; redirect to its page"),
        (status = 503, description = "No game store available")
    )
)]
/// Create a game and redirect to it.
pub async fn create_game(State(state): State<SharedState>) -> Result<Redirect, AppError> {
    let id = game_service::create_game(&state).await?;
    Ok(Redirect::to(&format!("/game/{id}/")))
}

#[utoipa::path(
    get,
    path = "/game/{id}/",
    tag = "game",
    params(("id" = String, Path, description = "Game identifier")),
    responses(
        (status = 200, description = "In-progress or won page", content_type = "text/html", body = String),
        (status = 404, description = "No such game")
    )
)]
/// Show the guess form, or the summary once the game is won.
pub async fn show_game(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Html<String>, AppError> {
    let view = GameView::from(game_service::get_game(&state, &id).await?);
    let html = if view.state.is_won() {
        views::game_won(&view)
    } else {
        views::game_round(&view)
    };
    Ok(Html(html))
}

#[utoipa::path(
    post,
    path = "/game/{id}/guess/",
    tag = "game",
    params(("id" = String, Path, description = "Game identifier")),
    request_body(content = GuessForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Guess recorded; redirect to the game page"),
        (status = 400, description = "Guess is not a digit between 0 and 9"),
        (status = 404, description = "No such game"),
        (status = 409, description = "Game already won")
    )
)]
/// Record a guess and go back to the game page.
pub async fn submit_guess(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    form: Result<Valid<Form<GuessForm>>, ValidRejection<FormRejection>>,
) -> Result<Redirect, AppError> {
    let Valid(Form(form)) = form?;
    let guess = form.digit().map_err(ServiceError::from)?;
    game_service::apply_guess(&state, &id, guess).await?;
    Ok(Redirect::to(&format!("/game/{id}/")))
}
