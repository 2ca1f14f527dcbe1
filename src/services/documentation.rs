use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the pick-a-number server.
#[openapi(
    paths(
        crate::routes::health::health,
        crate::routes::game::root,
        crate::routes::game::start_page,
        crate::routes::game::create_game,
        crate::routes::game::show_game,
        crate::routes::game::submit_guess,
        crate::routes::auth::login_page,
        crate::routes::auth::login,
        crate::routes::auth::verify,
        crate::routes::auth::logout,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::health::HealthStatus,
            crate::dto::game::GuessForm,
            crate::dto::game::GameView,
            crate::dto::auth::LoginForm,
            crate::state::game::GameState,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "game", description = "Game pages and guesses"),
        (name = "auth", description = "OpenID login and logout"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documents_every_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/health",
            "/",
            "/game/",
            "/game/{id}/",
            "/game/{id}/guess/",
            "/login/",
            "/login/verify/",
            "/logout/",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
