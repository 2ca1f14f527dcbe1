/// OpenID login, session creation and logout.
pub mod auth_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Creating games and applying guesses.
pub mod game_service;
/// Health check service.
pub mod health_service;
/// OpenID 2.0 relying party.
pub mod openid;
/// Connects database backends and toggles degraded mode.
pub mod storage_supervisor;
