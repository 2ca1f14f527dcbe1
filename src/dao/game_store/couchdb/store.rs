use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::{Client, Method, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, warn};

use crate::{
    dao::{
        game_store::{GameStore, GuessApplied},
        models::GameEntity,
        storage::StorageResult,
    },
    state::game::{Digit, GameId},
};

use super::{
    config::CouchConfig,
    error::{CouchDaoError, CouchResult},
    models::{CouchGameDocument, game_doc_id},
};

/// Compare-and-swap rounds attempted before a contended guess is reported as a failure.
const MAX_CAS_ATTEMPTS: u32 = 16;

/// CouchDB-backed [`GameStore`].
///
/// CouchDB has no conditional update, so guesses are applied optimistically:
/// read the document with its `_rev`, decide in process, and write back against
/// that revision. A `409 Conflict` means another writer got there first and the
/// round starts over from a fresh read.
#[derive(Clone)]
pub struct CouchGameStore {
    client: Client,
    base_url: Arc<str>,
    database: Arc<str>,
    auth: Option<(Arc<str>, Arc<str>)>,
}

impl CouchGameStore {
    /// Establish a connection to CouchDB and ensure the database exists.
    pub async fn connect(config: CouchConfig) -> CouchResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| CouchDaoError::ClientBuilder { source })?;

        let base_url = Arc::<str>::from(config.base_url.trim_end_matches('/'));
        let database = Arc::<str>::from(config.database);
        let auth = config
            .credentials
            .map(|(u, p)| (Arc::<str>::from(u), Arc::<str>::from(p)));

        let store = Self {
            client,
            base_url,
            database,
            auth,
        };

        store.ensure_database().await?;
        Ok(store)
    }

    fn database_url(&self) -> String {
        format!("{}/{}", self.base_url, self.database)
    }

    fn with_auth(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some((ref user, ref pass)) = self.auth {
            builder.basic_auth(user.as_ref(), Some(pass.as_ref()))
        } else {
            builder
        }
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{}", self.database_url(), path);
        self.with_auth(self.client.request(method, url))
    }

    async fn ensure_database(&self) -> CouchResult<()> {
        let database = self.database.to_string();
        let url = self.database_url();

        let response = self
            .with_auth(self.client.get(&url))
            .send()
            .await
            .map_err(|source| CouchDaoError::DatabaseQuery {
                database: database.clone(),
                source,
            })?;

        match response.status() {
            StatusCode::OK => Ok(()),
            StatusCode::NOT_FOUND => {
                let create = self
                    .with_auth(self.client.put(&url))
                    .send()
                    .await
                    .map_err(|source| CouchDaoError::DatabaseCreate {
                        database: database.clone(),
                        source,
                    })?;
                // 412 means a concurrent instance created it first.
                if create.status().is_success() || create.status() == StatusCode::PRECONDITION_FAILED
                {
                    Ok(())
                } else {
                    Err(CouchDaoError::DatabaseStatus {
                        database,
                        status: create.status(),
                    })
                }
            }
            other => Err(CouchDaoError::DatabaseStatus {
                database,
                status: other,
            }),
        }
    }

    async fn get_document<T>(&self, doc_id: &str) -> CouchResult<Option<T>>
    where
        T: DeserializeOwned,
    {
        let response = self
            .request(Method::GET, doc_id)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: doc_id.to_string(),
                source,
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                response.json::<T>().await.map(Some).map_err(|source| {
                    CouchDaoError::DecodeResponse {
                        path: doc_id.to_string(),
                        source,
                    }
                })
            }
            other => Err(CouchDaoError::RequestStatus {
                path: doc_id.to_string(),
                status: other,
            }),
        }
    }

    /// `PUT` a document. The body must carry the `_rev` being replaced, if any.
    async fn put_document<T>(&self, doc_id: &str, document: &T) -> CouchResult<()>
    where
        T: ?Sized + Serialize,
    {
        let response = self
            .request(Method::PUT, doc_id)
            .json(document)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: doc_id.to_string(),
                source,
            })?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::CONFLICT => Err(CouchDaoError::RevisionConflict {
                path: doc_id.to_string(),
            }),
            other => Err(CouchDaoError::RequestStatus {
                path: doc_id.to_string(),
                status: other,
            }),
        }
    }

    async fn find_game(&self, id: GameId) -> CouchResult<Option<(GameEntity, Option<String>)>> {
        let doc_id = game_doc_id(id);
        self.get_document::<CouchGameDocument>(&doc_id)
            .await?
            .map(CouchGameDocument::into_entity)
            .transpose()
    }

    async fn apply_guess(&self, id: GameId, guess: Digit) -> CouchResult<GuessApplied> {
        let doc_id = game_doc_id(id);

        for attempt in 1..=MAX_CAS_ATTEMPTS {
            let Some((mut game, rev)) = self.find_game(id).await? else {
                return Ok(GuessApplied::NotFound);
            };
            let Some(state) = game.try_guess(guess) else {
                return Ok(GuessApplied::AlreadyWon);
            };

            let document: CouchGameDocument = (game.clone(), rev).into();
            match self.put_document(&doc_id, &document).await {
                Ok(()) => {
                    debug!(game_id = %id, %guess, ?state, attempt, "guess appended");
                    return Ok(GuessApplied::Accepted(game));
                }
                Err(CouchDaoError::RevisionConflict { .. }) => {
                    debug!(game_id = %id, attempt, "revision conflict; re-reading game");
                }
                Err(err) => return Err(err),
            }
        }

        warn!(game_id = %id, attempts = MAX_CAS_ATTEMPTS, "guess lost every revision race");
        Err(CouchDaoError::Contended {
            path: doc_id,
            attempts: MAX_CAS_ATTEMPTS,
        })
    }
}

impl GameStore for CouchGameStore {
    fn insert_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let doc_id = game_doc_id(game.id);
            let document: CouchGameDocument = (game, None).into();
            store
                .put_document(&doc_id, &document)
                .await
                .map_err(Into::into)
        })
    }

    fn find_game(&self, id: GameId) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let found = store.find_game(id).await?;
            Ok(found.map(|(game, _rev)| game))
        })
    }

    fn apply_guess(
        &self,
        id: GameId,
        guess: Digit,
    ) -> BoxFuture<'static, StorageResult<GuessApplied>> {
        let store = self.clone();
        Box::pin(async move { store.apply_guess(id, guess).await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let url = store.database_url();
            let response = store
                .with_auth(store.client.get(&url))
                .send()
                .await
                .map_err(|source| CouchDaoError::RequestSend {
                    path: url.clone(),
                    source,
                })?;

            if response.status().is_success() {
                Ok(())
            } else {
                Err(CouchDaoError::RequestStatus {
                    path: url,
                    status: response.status(),
                }
                .into())
            }
        })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ensure_database().await.map_err(Into::into) })
    }
}
