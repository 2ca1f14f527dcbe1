use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Report whether the game store is usable, probing it when one is installed.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    match state.game_store().await {
        Some(store) => {
            if let Err(err) = store.health_check().await {
                warn!(error = %err, "storage health check failed");
            }
        }
        None => warn!("no game store installed (degraded mode)"),
    }

    HealthResponse::from(state.is_degraded().await)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        dao::game_store::memory::MemoryGameStore,
        dto::health::HealthStatus,
        services::openid::tests::RejectingProvider,
        state::{AppState, secret::RandomSecret},
    };

    #[tokio::test]
    async fn degraded_until_store_installed() {
        let state = AppState::new(Arc::new(RandomSecret), Arc::new(RejectingProvider), None);
        assert_eq!(health_status(&state).await.status, HealthStatus::Degraded);

        state.set_game_store(Arc::new(MemoryGameStore::new())).await;
        assert_eq!(health_status(&state).await.status, HealthStatus::Ok);
    }
}
