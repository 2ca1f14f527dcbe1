use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::{
    dto::{format_system_time, validation::validate_guess},
    state::game::{Digit, Game, GameState, InvalidDigit},
};

/// Form posted from the in-progress game page.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct GuessForm {
    /// Decimal digit between 0 and 9; leading zeros are accepted.
    #[serde(default)]
    pub guess: Option<String>,
}

impl GuessForm {
    /// Parsed guess; a missing field parses like an empty one.
    pub fn digit(&self) -> Result<Digit, InvalidDigit> {
        self.guess.as_deref().unwrap_or_default().parse()
    }
}

impl Validate for GuessForm {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        match self.guess.as_deref() {
            Some(raw) => {
                if let Err(e) = validate_guess(raw) {
                    errors.add("guess", e);
                }
            }
            None => {
                let mut err = ValidationError::new("required");
                err.message = Some("A guess is required".into());
                errors.add("guess", err);
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Everything the game pages show about a game.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GameView {
    pub id: String,
    pub guesses: Vec<u8>,
    pub current_guess: Option<u8>,
    pub guesses_count: usize,
    pub state: GameState,
    /// RFC 3339 creation time.
    pub created_at: String,
}

impl From<Game> for GameView {
    fn from(game: Game) -> Self {
        Self {
            id: game.id().to_string(),
            guesses: game.guesses().iter().map(|d| d.value()).collect(),
            current_guess: game.current_guess().map(Digit::value),
            guesses_count: game.guesses().len(),
            state: game.state(),
            created_at: format_system_time(game.created_at()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{dao::models::GameEntity, state::game::GameId};

    fn form(guess: Option<&str>) -> GuessForm {
        GuessForm {
            guess: guess.map(str::to_owned),
        }
    }

    #[test]
    fn accepts_single_digits_and_leading_zeros() {
        assert!(form(Some("4")).validate().is_ok());
        assert_eq!(form(Some("07")).digit().unwrap().value(), 7);
    }

    #[test]
    fn rejects_missing_and_malformed_guesses() {
        for guess in [None, Some(""), Some("10"), Some("abc"), Some("-3")] {
            let form = form(guess);
            assert!(form.validate().is_err(), "guess {guess:?}");
            assert!(form.digit().is_err());
        }
    }

    #[test]
    fn view_reports_latest_guess_and_count() {
        let mut entity = GameEntity::new(GameId::generate(), Digit::new(7).unwrap());
        entity.try_guess(Digit::new(2).unwrap());
        entity.try_guess(Digit::new(7).unwrap());

        let view = GameView::from(Game::from(entity));
        assert_eq!(view.guesses, vec![2, 7]);
        assert_eq!(view.current_guess, Some(7));
        assert_eq!(view.guesses_count, 2);
        assert_eq!(view.state, GameState::Won);
        assert!(view.created_at.contains('T'));
    }
}
