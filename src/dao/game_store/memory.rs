//! In-process game store. Games live as long as the process and are never evicted.

use std::sync::Arc;

use dashmap::DashMap;
use futures::future::BoxFuture;
use tokio::sync::Mutex;
use tracing::debug;

use crate::{
    dao::{
        game_store::{GameStore, GuessApplied},
        models::GameEntity,
        storage::StorageResult,
    },
    state::game::{Digit, GameId},
};

/// [`GameStore`] keeping every game in memory behind its own lock.
///
/// The map is only used to look up a game's handle; the check-then-append of a
/// guess runs under that game's mutex, so games never wait on each other.
#[derive(Clone, Default)]
pub struct MemoryGameStore {
    games: Arc<DashMap<GameId, Arc<Mutex<GameEntity>>>>,
}

impl MemoryGameStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of games currently held.
    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }

    fn handle(&self, id: GameId) -> Option<Arc<Mutex<GameEntity>>> {
        // Clone the handle so the shard guard is released before awaiting the game lock.
        self.games.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    async fn apply(&self, id: GameId, guess: Digit) -> GuessApplied {
        let Some(handle) = self.handle(id) else {
            return GuessApplied::NotFound;
        };

        let mut game = handle.lock().await;
        match game.try_guess(guess) {
            Some(state) => {
                debug!(game_id = %id, %guess, ?state, "guess appended");
                GuessApplied::Accepted(game.clone())
            }
            None => GuessApplied::AlreadyWon,
        }
    }
}

impl GameStore for MemoryGameStore {
    fn insert_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.games.insert(game.id, Arc::new(Mutex::new(game)));
            Ok(())
        })
    }

    fn find_game(&self, id: GameId) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let Some(handle) = store.handle(id) else {
                return Ok(None);
            };
            let game = handle.lock().await;
            Ok(Some(game.clone()))
        })
    }

    fn apply_guess(
        &self,
        id: GameId,
        guess: Digit,
    ) -> BoxFuture<'static, StorageResult<GuessApplied>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.apply(id, guess).await) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::game::GameState;

    fn digit(value: u8) -> Digit {
        Digit::new(value).unwrap()
    }

    async fn store_with_game(secret: u8) -> (MemoryGameStore, GameId) {
        let store = MemoryGameStore::new();
        let id = GameId::generate();
        store
            .insert_game(GameEntity::new(id, digit(secret)))
            .await
            .unwrap();
        (store, id)
    }

    #[tokio::test]
    async fn fresh_game_has_no_guesses() {
        let (store, id) = store_with_game(4).await;
        let game = store.find_game(id).await.unwrap().unwrap();
        assert!(game.guesses.is_empty());
        assert_eq!(game.state(), GameState::InProgress);
    }

    #[tokio::test]
    async fn unknown_game_is_not_found_and_nothing_is_created() {
        let (store, _) = store_with_game(4).await;
        let missing = GameId::generate();

        assert_eq!(
            store.apply_guess(missing, digit(5)).await.unwrap(),
            GuessApplied::NotFound
        );
        assert!(store.find_game(missing).await.unwrap().is_none());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn won_game_rejects_further_guesses() {
        let (store, id) = store_with_game(2).await;
        assert!(matches!(
            store.apply_guess(id, digit(2)).await.unwrap(),
            GuessApplied::Accepted(ref game) if game.state() == GameState::Won
        ));

        for guess in Digit::all() {
            assert_eq!(
                store.apply_guess(id, guess).await.unwrap(),
                GuessApplied::AlreadyWon
            );
        }
        let game = store.find_game(id).await.unwrap().unwrap();
        assert_eq!(game.guesses, vec![digit(2)]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_winning_guesses_apply_once() {
        let (store, id) = store_with_game(7).await;

        let tasks: Vec<_> = (0..64)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.apply_guess(id, digit(7)).await.unwrap() })
            })
            .collect();

        let mut winners = 0;
        let mut already_won = 0;
        for task in tasks {
            match task.await.unwrap() {
                GuessApplied::Accepted(game) => {
                    assert_eq!(game.state(), GameState::Won);
                    winners += 1;
                }
                GuessApplied::AlreadyWon => already_won += 1,
                GuessApplied::NotFound => panic!("game disappeared"),
            }
        }

        assert_eq!(winners, 1);
        assert_eq!(already_won, 63);
        let game = store.find_game(id).await.unwrap().unwrap();
        assert_eq!(game.guesses, vec![digit(7)]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_wrong_guesses_are_all_kept() {
        let (store, id) = store_with_game(9).await;

        let tasks: Vec<_> = (0..9u8)
            .flat_map(|value| std::iter::repeat_n(value, 5))
            .map(|value| {
                let store = store.clone();
                tokio::spawn(async move { store.apply_guess(id, digit(value)).await.unwrap() })
            })
            .collect();
        for task in tasks {
            assert!(matches!(task.await.unwrap(), GuessApplied::Accepted(_)));
        }

        let game = store.find_game(id).await.unwrap().unwrap();
        assert_eq!(game.guesses.len(), 45);
        assert_eq!(game.state(), GameState::InProgress);
    }
}
