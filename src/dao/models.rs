use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::state::game::{Digit, GameId, GameState, evaluate};

/// Game record persisted by every storage backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameEntity {
    /// Primary key of the game.
    pub id: GameId,
    /// Number the player has to find. Fixed at creation.
    pub secret: Digit,
    /// Guesses in the order they were accepted. Append-only.
    pub guesses: Vec<Digit>,
    /// Creation timestamp for auditing/debugging.
    pub created_at: SystemTime,
    /// Last time a guess was appended.
    pub updated_at: SystemTime,
}

impl GameEntity {
    /// Fresh game with no guesses.
    pub fn new(id: GameId, secret: Digit) -> Self {
        let now = SystemTime::now();
        Self {
            id,
            secret,
            guesses: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn state(&self) -> GameState {
        GameState::derive(self.secret, &self.guesses)
    }

    /// Append `guess` unless the game is already won.
    ///
    /// Returns the resulting state, or `None` when the game was already won and
    /// nothing changed. Callers must hold whatever exclusivity their backend uses
    /// for this record while calling it.
    pub fn try_guess(&mut self, guess: Digit) -> Option<GameState> {
        if self.state().is_won() {
            return None;
        }
        let (guesses, state) = evaluate(self.secret, &self.guesses, guess);
        self.guesses = guesses;
        self.updated_at = SystemTime::now();
        Some(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn digit(value: u8) -> Digit {
        Digit::new(value).unwrap()
    }

    #[test]
    fn try_guess_stops_after_win() {
        let mut game = GameEntity::new(GameId::generate(), digit(7));
        assert_eq!(game.state(), GameState::InProgress);

        assert_eq!(game.try_guess(digit(3)), Some(GameState::InProgress));
        assert_eq!(game.try_guess(digit(7)), Some(GameState::Won));
        assert_eq!(game.try_guess(digit(1)), None);
        assert_eq!(game.guesses, vec![digit(3), digit(7)]);
    }
}
