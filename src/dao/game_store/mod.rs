#[cfg(feature = "couch-store")]
pub mod couchdb;
pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use crate::dao::models::GameEntity;
use crate::dao::storage::StorageResult;
use crate::state::game::{Digit, GameId};
use futures::future::BoxFuture;

/// What a store reports back after trying to append a guess.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuessApplied {
    /// The guess was appended; carries the game as it is after the append.
    Accepted(GameEntity),
    /// The game was already won, nothing was written.
    AlreadyWon,
    /// No game exists with that identifier.
    NotFound,
}

/// Abstraction over the persistence layer for games.
///
/// `apply_guess` must check "not yet won" and append as one atomic step with
/// respect to every other `apply_guess` on the same game.
pub trait GameStore: Send + Sync {
    fn insert_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<()>>;
    fn find_game(&self, id: GameId) -> BoxFuture<'static, StorageResult<Option<GameEntity>>>;
    fn apply_guess(
        &self,
        id: GameId,
        guess: Digit,
    ) -> BoxFuture<'static, StorageResult<GuessApplied>>;
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
