use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::{
    dao::{game_store::couchdb::error::CouchDaoError, models::GameEntity},
    state::game::{Digit, GameId},
};

pub const GAME_PREFIX: &str = "game::";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchGameDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    #[serde(flatten)]
    pub game: GameBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameBody {
    pub secret: Digit,
    pub guesses: Vec<Digit>,
    pub created_at: SystemTime,
    pub updated_at: SystemTime,
}

impl From<(GameEntity, Option<String>)> for CouchGameDocument {
    fn from((game, rev): (GameEntity, Option<String>)) -> Self {
        Self {
            id: game_doc_id(game.id),
            rev,
            game: GameBody {
                secret: game.secret,
                guesses: game.guesses,
                created_at: game.created_at,
                updated_at: game.updated_at,
            },
        }
    }
}

impl CouchGameDocument {
    /// Split the document into its entity and the revision it was read at.
    pub fn into_entity(self) -> Result<(GameEntity, Option<String>), CouchDaoError> {
        let id = extract_game_id(&self.id)?;
        let entity = GameEntity {
            id,
            secret: self.game.secret,
            guesses: self.game.guesses,
            created_at: self.game.created_at,
            updated_at: self.game.updated_at,
        };
        Ok((entity, self.rev))
    }
}

pub fn game_doc_id(id: GameId) -> String {
    format!("{}{}", GAME_PREFIX, id)
}

pub fn extract_game_id(doc_id: &str) -> Result<GameId, CouchDaoError> {
    let id = doc_id
        .strip_prefix(GAME_PREFIX)
        .ok_or_else(|| CouchDaoError::InvalidDocument {
            doc_id: doc_id.to_string(),
            kind: "missing game prefix".into(),
        })?;

    id.parse::<GameId>()
        .map_err(|err| CouchDaoError::InvalidDocument {
            doc_id: doc_id.to_string(),
            kind: format!("invalid UUID: {err}"),
        })
}
