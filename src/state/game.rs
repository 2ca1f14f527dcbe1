use std::{fmt, str::FromStr, time::SystemTime};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::dao::models::GameEntity;

/// A single decimal digit, the only value a secret or a guess can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Digit(u8);

/// Raised when a value cannot be turned into a [`Digit`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidDigit {
    /// Input was empty or contained something other than ASCII digits.
    #[error("`{0}` is not a non-negative decimal integer")]
    NotDecimal(String),
    /// Input parsed but lies outside 0..=9.
    #[error("{0} is outside the range 0..=9")]
    OutOfRange(u64),
}

impl Digit {
    /// Largest representable digit.
    pub const MAX: u8 = 9;

    /// Build a digit, rejecting anything above [`Digit::MAX`].
    pub fn new(value: u8) -> Result<Self, InvalidDigit> {
        if value > Self::MAX {
            return Err(InvalidDigit::OutOfRange(u64::from(value)));
        }
        Ok(Self(value))
    }

    /// Clamp `value` into range; anything above 9 becomes 9.
    pub fn saturating(value: u8) -> Self {
        Self(value.min(Self::MAX))
    }

    /// Every digit in ascending order.
    pub fn all() -> impl Iterator<Item = Digit> {
        (0..=Self::MAX).map(Digit)
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Digit {
    type Error = InvalidDigit;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<i32> for Digit {
    type Error = InvalidDigit;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .map_err(|_| InvalidDigit::NotDecimal(value.to_string()))
            .and_then(Self::new)
    }
}

impl From<Digit> for u8 {
    fn from(value: Digit) -> Self {
        value.0
    }
}

impl From<Digit> for i32 {
    fn from(value: Digit) -> Self {
        i32::from(value.0)
    }
}

/// Parses form input: one or more ASCII digits whose value is at most 9.
///
/// Leading zeros are accepted (`"07"` is 7); signs, whitespace and decimals are not.
impl FromStr for Digit {
    type Err = InvalidDigit;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(InvalidDigit::NotDecimal(s.to_owned()));
        }

        // Only digits remain, so a parse failure means the value overflowed u64.
        let value = s.parse::<u64>().unwrap_or(u64::MAX);
        u8::try_from(value)
            .map_err(|_| InvalidDigit::OutOfRange(value))
            .and_then(Self::new)
    }
}

impl fmt::Display for Digit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque game identifier, freshly generated for every new game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameId(Uuid);

impl GameId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl FromStr for GameId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.hyphenated().fmt(f)
    }
}

/// Derived status of a game. `Won` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum GameState {
    /// The secret has not been guessed yet.
    InProgress,
    /// The last guess matched the secret.
    Won,
}

impl GameState {
    /// State implied by a secret and the guesses made against it so far.
    pub fn derive(secret: Digit, guesses: &[Digit]) -> Self {
        match guesses.last() {
            Some(last) if *last == secret => GameState::Won,
            _ => GameState::InProgress,
        }
    }

    pub fn is_won(self) -> bool {
        matches!(self, GameState::Won)
    }
}

/// Apply one guess to a guess history.
///
/// Pure: the caller decides whether the game may still accept guesses. The returned
/// history is `guesses` with `guess` appended, and the state is `Won` exactly when
/// `guess` equals `secret`.
pub fn evaluate(secret: Digit, guesses: &[Digit], guess: Digit) -> (Vec<Digit>, GameState) {
    let mut updated = Vec::with_capacity(guesses.len() + 1);
    updated.extend_from_slice(guesses);
    updated.push(guess);

    let state = if guess == secret {
        GameState::Won
    } else {
        GameState::InProgress
    };
    (updated, state)
}

/// Read-only snapshot of a game handed to callers. Never carries the secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Game {
    id: GameId,
    guesses: Vec<Digit>,
    state: GameState,
    created_at: SystemTime,
}

impl Game {
    pub fn id(&self) -> GameId {
        self.id
    }

    pub fn guesses(&self) -> &[Digit] {
        &self.guesses
    }

    /// Most recent guess, if any has been made.
    pub fn current_guess(&self) -> Option<Digit> {
        self.guesses.last().copied()
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }
}

impl From<GameEntity> for Game {
    fn from(entity: GameEntity) -> Self {
        let state = entity.state();
        Self {
            id: entity.id,
            guesses: entity.guesses,
            state,
            created_at: entity.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn digit(value: u8) -> Digit {
        Digit::new(value).unwrap()
    }

    #[test]
    fn wrong_guess_appends_and_stays_in_progress() {
        for secret in Digit::all() {
            for guess in Digit::all().filter(|g| *g != secret) {
                let history = [digit(1), digit(4)];
                let (updated, state) = evaluate(secret, &history, guess);
                assert_eq!(state, GameState::InProgress);
                assert_eq!(updated, vec![digit(1), digit(4), guess]);
            }
        }
    }

    #[test]
    fn matching_guess_wins() {
        for secret in Digit::all() {
            let (updated, state) = evaluate(secret, &[], secret);
            assert_eq!(state, GameState::Won);
            assert_eq!(updated, vec![secret]);
        }
    }

    #[test]
    fn derive_looks_at_last_guess_only() {
        let secret = digit(7);
        assert_eq!(GameState::derive(secret, &[]), GameState::InProgress);
        assert_eq!(GameState::derive(secret, &[digit(7), digit(3)]), GameState::InProgress);
        assert_eq!(GameState::derive(secret, &[digit(3), digit(7)]), GameState::Won);
    }

    #[test]
    fn parses_form_digits() {
        assert_eq!("0".parse::<Digit>(), Ok(digit(0)));
        assert_eq!("9".parse::<Digit>(), Ok(digit(9)));
        assert_eq!("07".parse::<Digit>(), Ok(digit(7)));
    }

    #[test]
    fn rejects_malformed_guesses() {
        for raw in ["", " 3", "3 ", "-1", "+1", "1.0", "a", "٣"] {
            assert!(
                matches!(raw.parse::<Digit>(), Err(InvalidDigit::NotDecimal(_))),
                "expected `{raw}` to be rejected as non-decimal"
            );
        }
    }

    #[test]
    fn rejects_out_of_range_guesses() {
        assert_eq!("10".parse::<Digit>(), Err(InvalidDigit::OutOfRange(10)));
        assert_eq!("255".parse::<Digit>(), Err(InvalidDigit::OutOfRange(255)));
        assert_eq!(
            "99999999999999999999999".parse::<Digit>(),
            Err(InvalidDigit::OutOfRange(u64::MAX))
        );
        assert!(Digit::new(10).is_err());
        assert!(Digit::try_from(-1_i32).is_err());
    }

    #[test]
    fn game_id_round_trips_through_display() {
        let id = GameId::generate();
        assert_eq!(id.to_string().parse::<GameId>().unwrap(), id);
        assert!("nonexistent-id".parse::<GameId>().is_err());
    }
}
