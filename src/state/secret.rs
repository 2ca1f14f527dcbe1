use rand::Rng;

use crate::state::game::Digit;

/// Source of the secret digit assigned to each new game.
pub trait SecretSource: Send + Sync {
    fn draw(&self) -> Digit;
}

/// Uniform draw over 0..=9 from the thread-local RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomSecret;

impl SecretSource for RandomSecret {
    fn draw(&self) -> Digit {
        Digit::saturating(rand::rng().random_range(0..=Digit::MAX))
    }
}

/// Always hands out the same digit. Lets tests and demos predict the answer.
#[derive(Debug, Clone, Copy)]
pub struct FixedSecret(pub Digit);

impl SecretSource for FixedSecret {
    fn draw(&self) -> Digit {
        self.0
    }
}
