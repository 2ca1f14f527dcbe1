pub mod game;
pub mod secret;
pub mod session;

use std::sync::Arc;

use tokio::sync::{RwLock, watch};

use crate::{
    dao::game_store::GameStore,
    error::ServiceError,
    services::openid::IdentityProvider,
    state::{secret::SecretSource, session::SessionStore},
};

pub type SharedState = Arc<AppState>;

/// Central application state: the installed game store, login sessions and the
/// collaborators handlers need.
pub struct AppState {
    game_store: RwLock<Option<Arc<dyn GameStore>>>,
    sessions: SessionStore,
    secrets: Arc<dyn SecretSource>,
    identity: Arc<dyn IdentityProvider>,
    public_url: Option<String>,
    degraded: watch::Sender<bool>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(
        secrets: Arc<dyn SecretSource>,
        identity: Arc<dyn IdentityProvider>,
        public_url: Option<String>,
    ) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            game_store: RwLock::new(None),
            sessions: SessionStore::new(),
            secrets,
            identity,
            public_url: public_url.map(|url| url.trim_end_matches('/').to_owned()),
            degraded: degraded_tx,
        })
    }

    /// Obtain a handle to the current game store, if one is installed.
    pub async fn game_store(&self) -> Option<Arc<dyn GameStore>> {
        let guard = self.game_store.read().await;
        guard.as_ref().cloned()
    }

    /// Like [`AppState::game_store`] but fails with [`ServiceError::Degraded`] when none is installed.
    pub async fn require_game_store(&self) -> Result<Arc<dyn GameStore>, ServiceError> {
        self.game_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new game store implementation and leave degraded mode.
    pub async fn set_game_store(&self, store: Arc<dyn GameStore>) {
        {
            let mut guard = self.game_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false).await;
    }

    /// Remove the current game store and enter degraded mode.
    pub async fn clear_game_store(&self) {
        {
            let mut guard = self.game_store.write().await;
            guard.take();
        }
        self.update_degraded(true).await;
    }

    /// Current degraded flag.
    pub async fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub async fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                return false;
            }
            *current = value;
            true
        });
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn secrets(&self) -> &dyn SecretSource {
        self.secrets.as_ref()
    }

    pub fn identity(&self) -> Arc<dyn IdentityProvider> {
        Arc::clone(&self.identity)
    }

    /// Externally visible base URL, when configured. Otherwise callers derive it from the request.
    pub fn public_url(&self) -> Option<&str> {
        self.public_url.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dao::game_store::memory::MemoryGameStore, services::openid::tests::RejectingProvider,
        state::secret::RandomSecret,
    };

    fn state() -> SharedState {
        AppState::new(
            Arc::new(RandomSecret),
            Arc::new(RejectingProvider),
            Some("https://game.example/".into()),
        )
    }

    #[tokio::test]
    async fn starts_degraded_until_store_installed() {
        let state = state();
        let mut watcher = state.degraded_watcher();
        assert!(state.is_degraded().await);
        assert!(matches!(
            state.require_game_store().await,
            Err(ServiceError::Degraded)
        ));

        state.set_game_store(Arc::new(MemoryGameStore::new())).await;
        assert!(!state.is_degraded().await);
        assert!(watcher.has_changed().unwrap());
        assert!(!*watcher.borrow_and_update());
        assert!(state.require_game_store().await.is_ok());

        state.clear_game_store().await;
        assert!(state.is_degraded().await);
        assert!(state.game_store().await.is_none());
    }

    #[tokio::test]
    async fn unchanged_flag_is_not_rebroadcast() {
        let state = state();
        let mut watcher = state.degraded_watcher();
        watcher.borrow_and_update();

        state.update_degraded(true).await;
        assert!(!watcher.has_changed().unwrap());
    }

    #[test]
    fn public_url_drops_trailing_slash() {
        assert_eq!(state().public_url(), Some("https://game.example"));
    }
}
