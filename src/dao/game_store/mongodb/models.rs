use mongodb::bson::{DateTime, Document, doc};
use serde::{Deserialize, Serialize};

use super::error::MongoDaoError;
use crate::{
    dao::models::GameEntity,
    state::game::{Digit, GameId},
};

/// Shape of a game in the `games` collection.
///
/// `_id` is the hyphenated UUID so ids stay readable in the shell; digits are
/// stored as plain 32-bit integers so the `$expr` guard can compare them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MongoGameDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub secret: i32,
    pub guesses: Vec<i32>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl From<GameEntity> for MongoGameDocument {
    fn from(value: GameEntity) -> Self {
        Self {
            id: value.id.to_string(),
            secret: value.secret.into(),
            guesses: value.guesses.into_iter().map(i32::from).collect(),
            created_at: DateTime::from_system_time(value.created_at),
            updated_at: DateTime::from_system_time(value.updated_at),
        }
    }
}

impl TryFrom<MongoGameDocument> for GameEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoGameDocument) -> Result<Self, Self::Error> {
        let corrupt = |reason: String| MongoDaoError::CorruptDocument {
            id: value.id.clone(),
            reason,
        };

        let id = value
            .id
            .parse::<GameId>()
            .map_err(|err| corrupt(format!("invalid id: {err}")))?;
        let secret =
            Digit::try_from(value.secret).map_err(|err| corrupt(format!("invalid secret: {err}")))?;
        let guesses = value
            .guesses
            .iter()
            .map(|guess| Digit::try_from(*guess))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| corrupt(format!("invalid guess: {err}")))?;

        Ok(Self {
            id,
            secret,
            guesses,
            created_at: value.created_at.to_system_time(),
            updated_at: value.updated_at.to_system_time(),
        })
    }
}

pub fn doc_id(id: GameId) -> Document {
    doc! {"_id": id.to_string()}
}

/// Matches the game only while its last guess differs from the secret.
///
/// `$arrayElemAt` on an empty array yields nothing, which never equals the
/// secret, so a game without guesses matches too.
pub fn in_progress_filter(id: GameId) -> Document {
    doc! {
        "_id": id.to_string(),
        "$expr": {
            "$ne": [
                { "$arrayElemAt": ["$guesses", -1] },
                "$secret",
            ]
        },
    }
}

/// Appends the guess and bumps `updated_at` in the same write.
pub fn push_guess_update(guess: Digit) -> Document {
    doc! {
        "$push": { "guesses": i32::from(guess) },
        "$set": { "updated_at": DateTime::now() },
    }
}
