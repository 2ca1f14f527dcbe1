use tracing::{debug, info};

use crate::{
    dao::{game_store::GuessApplied, models::GameEntity},
    error::ServiceError,
    state::{
        SharedState,
        game::{Digit, Game, GameId, GameState},
    },
};

/// Start a fresh game with a newly drawn secret.
pub async fn create_game(state: &SharedState) -> Result<GameId, ServiceError> {
    let store = state.require_game_store().await?;

    let id = GameId::generate();
    let secret = state.secrets().draw();
    store.insert_game(GameEntity::new(id, secret)).await?;

    info!(game_id = %id, "game created");
    Ok(id)
}

/// Snapshot of the game addressed by `raw_id`.
///
/// Identifiers that do not parse are reported exactly like unknown games.
pub async fn get_game(state: &SharedState, raw_id: &str) -> Result<Game, ServiceError> {
    let id = parse_id(raw_id)?;
    let store = state.require_game_store().await?;

    store
        .find_game(id)
        .await?
        .map(Game::from)
        .ok_or_else(|| ServiceError::NotFound(raw_id.to_owned()))
}

/// Append an already validated guess to the game addressed by `raw_id`.
pub async fn apply_guess(
    state: &SharedState,
    raw_id: &str,
    guess: Digit,
) -> Result<GameState, ServiceError> {
    let id = parse_id(raw_id)?;
    let store = state.require_game_store().await?;

    match store.apply_guess(id, guess).await? {
        GuessApplied::Accepted(game) => {
            let outcome = game.state();
            if outcome.is_won() {
                info!(game_id = %id, guesses = game.guesses.len(), "game won");
            } else {
                debug!(game_id = %id, %guess, "wrong guess");
            }
            Ok(outcome)
        }
        GuessApplied::AlreadyWon => {
            debug!(game_id = %id, %guess, "guess rejected; game already won");
            Err(ServiceError::AlreadyWon(raw_id.to_owned()))
        }
        GuessApplied::NotFound => Err(ServiceError::NotFound(raw_id.to_owned())),
    }
}

fn parse_id(raw_id: &str) -> Result<GameId, ServiceError> {
    raw_id
        .parse()
        .map_err(|_| ServiceError::NotFound(raw_id.to_owned()))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        dao::game_store::memory::MemoryGameStore,
        services::openid::tests::RejectingProvider,
        state::{AppState, secret::FixedSecret},
    };

    fn digit(value: u8) -> Digit {
        Digit::new(value).unwrap()
    }

    async fn state_with_secret(secret: u8) -> SharedState {
        let state = AppState::new(
            Arc::new(FixedSecret(digit(secret))),
            Arc::new(RejectingProvider),
            None,
        );
        state.set_game_store(Arc::new(MemoryGameStore::new())).await;
        state
    }

    #[tokio::test]
    async fn fresh_game_has_no_guesses() {
        let state = state_with_secret(3).await;
        let id = create_game(&state).await.unwrap();

        let game = get_game(&state, &id.to_string()).await.unwrap();
        assert_eq!(game.id(), id);
        assert!(game.guesses().is_empty());
        assert_eq!(game.current_guess(), None);
        assert_eq!(game.state(), GameState::InProgress);
    }

    #[tokio::test]
    async fn plays_until_the_secret_is_found() {
        let state = state_with_secret(7).await;
        let id = create_game(&state).await.unwrap().to_string();

        assert_eq!(
            apply_guess(&state, &id, digit(3)).await.unwrap(),
            GameState::InProgress
        );
        assert_eq!(
            apply_guess(&state, &id, digit(5)).await.unwrap(),
            GameState::InProgress
        );
        assert_eq!(
            apply_guess(&state, &id, digit(7)).await.unwrap(),
            GameState::Won
        );
        assert!(matches!(
            apply_guess(&state, &id, digit(1)).await,
            Err(ServiceError::AlreadyWon(_))
        ));

        let game = get_game(&state, &id).await.unwrap();
        assert_eq!(game.guesses(), &[digit(3), digit(5), digit(7)]);
        assert_eq!(game.current_guess(), Some(digit(7)));
        assert_eq!(game.state(), GameState::Won);
    }

    #[tokio::test]
    async fn unknown_and_malformed_ids_are_not_found() {
        let state = state_with_secret(0).await;

        assert!(matches!(
            get_game(&state, "nonexistent-id").await,
            Err(ServiceError::NotFound(_))
        ));
        let unknown = GameId::generate().to_string();
        assert!(matches!(
            apply_guess(&state, &unknown, digit(4)).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn degraded_without_store() {
        let state = AppState::new(
            Arc::new(FixedSecret(digit(1))),
            Arc::new(RejectingProvider),
            None,
        );
        assert!(matches!(
            create_game(&state).await,
            Err(ServiceError::Degraded)
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_winning_guesses_win_once() {
        let state = state_with_secret(7).await;
        let id = create_game(&state).await.unwrap().to_string();

        let tasks: Vec<_> = (0..32)
            .map(|_| {
                let state = Arc::clone(&state);
                let id = id.clone();
                tokio::spawn(async move { apply_guess(&state, &id, digit(7)).await })
            })
            .collect();

        let mut won = 0;
        let mut rejected = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(GameState::Won) => won += 1,
                Err(ServiceError::AlreadyWon(_)) => rejected += 1,
                other => panic!("unexpected outcome {other:?}"),
            }
        }
        assert_eq!((won, rejected), (1, 31));

        let game = get_game(&state, &id).await.unwrap();
        assert_eq!(game.guesses(), &[digit(7)]);
    }
}
