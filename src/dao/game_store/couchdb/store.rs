use std::{sync::Arc, time::SystemTime};

use futures::future::BoxFuture;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Value, from_value, json};
use tracing::warn;
use uuid::Uuid;

use crate::dao::{
    game_store::GameStore,
    models::{BuzzEntity, GameEntity, GameStateEntity, NewGameRecords, PlayerEntity, TeamEntity},
    storage::{StorageError, StorageResult},
};

use super::{
    config::CouchConfig,
    error::{CouchDaoError, CouchResult},
    models::{
        AllDocsResponse, BulkResult, CodeClaim, CouchDocument, END_SUFFIX, FindResponse,
        RecordKind, child_doc_id, child_prefix, code_doc_id, game_doc_id, state_doc_id,
    },
};

const LOOKUP_INDEX: &str = "kind-id";

/// Game store keeping one CouchDB document per record.
///
/// Teams, players and buzzes are keyed under their game so a session can be
/// listed with a single `_all_docs` range. Join codes are claimed through a
/// dedicated `code::` document: CouchDB refuses to create it twice.
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
            .username
            .zip(config.password)
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

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{}/{}", self.base_url, self.database, path);
        self.authorized(self.client.request(method, url))
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.auth {
            Some((ref user, ref pass)) => builder.basic_auth(user.as_ref(), Some(pass.as_ref())),
            None => builder,
        }
    }

    async fn ensure_database(&self) -> CouchResult<()> {
        let database = self.database.to_string();
        let url = format!("{}/{}", self.base_url, self.database);

        let response = self
            .authorized(self.client.get(&url))
            .send()
            .await
            .map_err(|source| CouchDaoError::DatabaseRequest {
                database: database.clone(),
                action: "query",
                source,
            })?;

        match response.status() {
            StatusCode::OK => {}
            StatusCode::NOT_FOUND => {
                let create = self
                    .authorized(self.client.put(&url))
                    .send()
                    .await
                    .map_err(|source| CouchDaoError::DatabaseRequest {
                        database: database.clone(),
                        action: "create",
                        source,
                    })?;
                if !create.status().is_success() {
                    return Err(CouchDaoError::DatabaseStatus {
                        database,
                        status: create.status(),
                    });
                }
            }
            other => {
                return Err(CouchDaoError::DatabaseStatus {
                    database,
                    status: other,
                });
            }
        }

        self.ensure_lookup_index().await
    }

    async fn send(&self, path: &str, builder: RequestBuilder) -> CouchResult<Response> {
        builder
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: path.to_string(),
                source,
            })
    }

    /// Send a request that must succeed and decode its JSON reply.
    async fn fetch<R>(&self, path: &str, builder: RequestBuilder) -> CouchResult<R>
    where
        R: DeserializeOwned,
    {
        let response = self.send(path, builder).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CouchDaoError::RequestStatus {
                path: path.to_string(),
                status,
            });
        }
        response
            .json::<R>()
            .await
            .map_err(|source| CouchDaoError::DecodeResponse {
                path: path.to_string(),
                source,
            })
    }

    /// Index backing id lookups of teams and players; creating it twice is a no-op.
    async fn ensure_lookup_index(&self) -> CouchResult<()> {
        const INDEX: &str = "_index";
        let body = json!({
            "index": { "fields": ["kind", "id"] },
            "ddoc": LOOKUP_INDEX,
            "name": LOOKUP_INDEX,
            "type": "json",
        });
        self.fetch::<Value>(INDEX, self.request(Method::POST, INDEX).json(&body))
            .await
            .map(drop)
    }

    async fn get_document<T>(&self, doc_id: &str) -> CouchResult<Option<CouchDocument<T>>>
    where
        T: DeserializeOwned,
    {
        let response = self.send(doc_id, self.request(Method::GET, doc_id)).await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => response
                .json::<CouchDocument<T>>()
                .await
                .map(Some)
                .map_err(|source| CouchDaoError::DecodeResponse {
                    path: doc_id.to_string(),
                    source,
                }),
            status => Err(CouchDaoError::RequestStatus {
                path: doc_id.to_string(),
                status,
            }),
        }
    }

    async fn put_document<T>(&self, document: &CouchDocument<T>) -> CouchResult<()>
    where
        T: Serialize,
    {
        let builder = self.request(Method::PUT, &document.id).json(document);
        let response = self.send(&document.id, builder).await?;
        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::CONFLICT => Err(CouchDaoError::Conflict {
                path: document.id.clone(),
            }),
            status => Err(CouchDaoError::RequestStatus {
                path: document.id.clone(),
                status,
            }),
        }
    }

    /// Write `record` under `doc_id`, carrying over the current revision if any.
    async fn upsert<T>(&self, doc_id: String, kind: RecordKind, record: T) -> CouchResult<()>
    where
        T: Serialize,
    {
        let mut document = CouchDocument::new(doc_id, kind, record);
        if let Some(existing) = self.get_document::<Value>(&document.id).await? {
            document.rev = existing.rev;
        }
        self.put_document(&document).await
    }

    /// Send several documents in one `_bulk_docs` request and return the per-document results.
    async fn bulk_write(&self, documents: Vec<Value>) -> CouchResult<Vec<BulkResult>> {
        const BULK_DOCS: &str = "_bulk_docs";
        let builder = self
            .request(Method::POST, BULK_DOCS)
            .json(&json!({ "docs": documents }));
        self.fetch(BULK_DOCS, builder).await
    }

    /// Insert several new documents; any per-document rejection fails the call.
    async fn bulk_insert(&self, documents: Vec<Value>) -> CouchResult<()> {
        let rejected: Vec<String> = self
            .bulk_write(documents)
            .await?
            .into_iter()
            .filter(|result| result.error.is_some())
            .map(|result| result.id)
            .collect();
        if rejected.is_empty() {
            Ok(())
        } else {
            Err(CouchDaoError::BulkRejected { doc_ids: rejected })
        }
    }

    async fn delete_document(&self, doc_id: &str, rev: &str) -> CouchResult<()> {
        let builder = self
            .request(Method::DELETE, doc_id)
            .query(&[("rev", rev)]);
        self.fetch::<Value>(doc_id, builder).await.map(drop)
    }

    /// Undo the half of a buzz commit that CouchDB accepted.
    async fn undo_buzz_commit(
        &self,
        commit: BuzzCommit,
        previous_state: Option<CouchDocument<Value>>,
        state_id: &str,
        buzz_id: &str,
    ) -> CouchResult<()> {
        match (commit, previous_state) {
            (BuzzCommit::RestoreState { rev }, Some(previous)) => {
                let mut restored =
                    CouchDocument::new(state_id.to_string(), RecordKind::State, previous.record);
                restored.rev = Some(rev);
                self.put_document(&restored).await
            }
            (BuzzCommit::RestoreState { rev }, None) => self.delete_document(state_id, &rev).await,
            (BuzzCommit::DropBuzz { rev }, _) => self.delete_document(buzz_id, &rev).await,
            (BuzzCommit::Committed | BuzzCommit::Rejected, _) => Ok(()),
        }
    }

    async fn list_documents<T>(&self, prefix: &str) -> CouchResult<Vec<T>>
    where
        T: DeserializeOwned,
    {
        const ALL_DOCS: &str = "_all_docs";
        let range = [
            ("include_docs", "true".to_string()),
            ("startkey", format!("\"{prefix}\"")),
            ("endkey", format!("\"{prefix}{END_SUFFIX}\"")),
        ];
        let builder = self.request(Method::GET, ALL_DOCS).query(&range);
        let listing: AllDocsResponse = self.fetch(ALL_DOCS, builder).await?;

        listing
            .rows
            .into_iter()
            .filter_map(|row| row.doc)
            .map(|doc| decode_record(ALL_DOCS, doc))
            .collect()
    }

    /// Find the record of `kind` whose own `id` field equals `id`.
    async fn find_by_id<T>(&self, kind: RecordKind, id: Uuid) -> CouchResult<Option<T>>
    where
        T: DeserializeOwned,
    {
        const FIND: &str = "_find";
        let selector = json!({
            "selector": { "kind": kind, "id": id },
            "use_index": LOOKUP_INDEX,
            "limit": 1,
        });
        let builder = self.request(Method::POST, FIND).json(&selector);
        let found: FindResponse = self.fetch(FIND, builder).await?;

        found
            .docs
            .into_iter()
            .next()
            .map(|doc| decode_record(FIND, doc))
            .transpose()
    }

    async fn list_children<T>(
        &self,
        kind: RecordKind,
        game_id: Uuid,
        created_at: impl Fn(&T) -> SystemTime,
    ) -> CouchResult<Vec<T>>
    where
        T: DeserializeOwned,
    {
        let mut records = self
            .list_documents::<T>(&child_prefix(kind, game_id))
            .await?;
        records.sort_by_key(|record| created_at(record));
        Ok(records)
    }
}

fn decode_record<T: DeserializeOwned>(path: &str, doc: Value) -> CouchResult<T> {
    from_value::<CouchDocument<T>>(doc)
        .map(|document| document.record)
        .map_err(|source| CouchDaoError::DeserializeValue {
            path: path.to_string(),
            source,
        })
}

/// Which half of a state + buzz bulk write CouchDB accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
enum BuzzCommit {
    Committed,
    /// Only the state was written, now at `rev`.
    RestoreState { rev: String },
    /// Only the buzz was written, now at `rev`.
    DropBuzz { rev: String },
    Rejected,
}

fn classify_buzz_commit(results: &[BulkResult], state_id: &str, buzz_id: &str) -> BuzzCommit {
    let written = |doc_id: &str| {
        results
            .iter()
            .find(|result| result.id == doc_id && result.error.is_none())
            .and_then(|result| result.rev.clone())
    };
    match (written(state_id), written(buzz_id)) {
        (Some(_), Some(_)) => BuzzCommit::Committed,
        (Some(rev), None) => BuzzCommit::RestoreState { rev },
        (None, Some(rev)) => BuzzCommit::DropBuzz { rev },
        (None, None) => BuzzCommit::Rejected,
    }
}

fn document_value<T: Serialize>(document: CouchDocument<T>) -> CouchResult<Value> {
    serde_json::to_value(&document).map_err(|source| CouchDaoError::SerializeDocument {
        path: document.id.clone(),
        source,
    })
}

impl GameStore for CouchGameStore {
    fn create_game(&self, records: NewGameRecords) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let NewGameRecords { game, teams, state } = records;

            let claim = CouchDocument::new(
                code_doc_id(&game.code),
                RecordKind::Code,
                CodeClaim { game_id: game.id },
            );
            match store.put_document(&claim).await {
                Ok(()) => {}
                Err(CouchDaoError::Conflict { .. }) => {
                    return Err(StorageError::DuplicateCode { code: game.code });
                }
                Err(err) => return Err(err.into()),
            }

            let mut documents = Vec::with_capacity(teams.len() + 2);
            documents.push(document_value(CouchDocument::new(
                state_doc_id(game.id),
                RecordKind::State,
                state,
            ))?);
            for team in teams {
                documents.push(document_value(CouchDocument::new(
                    child_doc_id(RecordKind::Team, game.id, team.id),
                    RecordKind::Team,
                    team,
                ))?);
            }
            // The game document goes last: a session is only visible once complete.
            documents.push(document_value(CouchDocument::new(
                game_doc_id(game.id),
                RecordKind::Game,
                game,
            ))?);

            store.bulk_insert(documents).await.map_err(Into::into)
        })
    }

    fn find_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let doc = store.get_document::<GameEntity>(&game_doc_id(id)).await?;
            Ok(doc.map(|doc| doc.record))
        })
    }

    fn find_game_by_code(
        &self,
        code: String,
    ) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let Some(claim) = store.get_document::<CodeClaim>(&code_doc_id(&code)).await? else {
                return Ok(None);
            };
            let doc = store
                .get_document::<GameEntity>(&game_doc_id(claim.record.game_id))
                .await?;
            if doc.is_none() {
                warn!(code = %code, game_id = %claim.record.game_id, "join code claimed by a missing game");
            }
            Ok(doc.map(|doc| doc.record))
        })
    }

    fn save_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .upsert(game_doc_id(game.id), RecordKind::Game, game)
                .await
                .map_err(Into::into)
        })
    }

    fn list_teams(&self, game_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<TeamEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .list_children(RecordKind::Team, game_id, |team: &TeamEntity| team.created_at)
                .await
                .map_err(Into::into)
        })
    }

    fn find_team(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<TeamEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_by_id(RecordKind::Team, id)
                .await
                .map_err(Into::into)
        })
    }

    fn save_team(&self, team: TeamEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .upsert(
                    child_doc_id(RecordKind::Team, team.game_id, team.id),
                    RecordKind::Team,
                    team,
                )
                .await
                .map_err(Into::into)
        })
    }

    fn list_players(
        &self,
        game_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<PlayerEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .list_children(RecordKind::Player, game_id, |player: &PlayerEntity| {
                    player.created_at
                })
                .await
                .map_err(Into::into)
        })
    }

    fn find_player(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<PlayerEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_by_id(RecordKind::Player, id)
                .await
                .map_err(Into::into)
        })
    }

    fn save_player(&self, player: PlayerEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .upsert(
                    child_doc_id(RecordKind::Player, player.game_id, player.id),
                    RecordKind::Player,
                    player,
                )
                .await
                .map_err(Into::into)
        })
    }

    fn find_game_state(
        &self,
        game_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<GameStateEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let doc = store
                .get_document::<GameStateEntity>(&state_doc_id(game_id))
                .await?;
            Ok(doc.map(|doc| doc.record))
        })
    }

    fn save_game_state(&self, state: GameStateEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .upsert(state_doc_id(state.game_id), RecordKind::State, state)
                .await
                .map_err(Into::into)
        })
    }

    fn record_buzz(
        &self,
        state: GameStateEntity,
        buzz: BuzzEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let state_id = state_doc_id(state.game_id);
            let buzz_id = child_doc_id(RecordKind::Buzz, buzz.game_id, buzz.id);

            let previous = store.get_document::<Value>(&state_id).await?;
            let mut state_doc = CouchDocument::new(state_id.clone(), RecordKind::State, state);
            state_doc.rev = previous.as_ref().and_then(|doc| doc.rev.clone());
            let documents = vec![
                document_value(state_doc)?,
                document_value(CouchDocument::new(buzz_id.clone(), RecordKind::Buzz, buzz))?,
            ];

            let results = store.bulk_write(documents).await?;
            let commit = classify_buzz_commit(&results, &state_id, &buzz_id);
            if commit == BuzzCommit::Committed {
                return Ok(());
            }

            warn!(
                state_id = %state_id,
                buzz_id = %buzz_id,
                outcome = ?commit,
                "buzz commit rejected; rolling back accepted half"
            );
            if let Err(err) = store
                .undo_buzz_commit(commit, previous, &state_id, &buzz_id)
                .await
            {
                warn!(state_id = %state_id, error = %err, "failed to roll back buzz commit");
            }
            Err(CouchDaoError::BulkRejected {
                doc_ids: vec![state_id, buzz_id],
            }
            .into())
        })
    }

    fn list_buzzes(&self, game_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<BuzzEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .list_children(RecordKind::Buzz, game_id, |buzz: &BuzzEntity| buzz.created_at)
                .await
                .map_err(Into::into)
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let url = format!("{}/{}", store.base_url, store.database);
            let probe = store.authorized(store.client.get(&url));
            let status = store.send(&url, probe).await?.status();
            if status.is_success() {
                Ok(())
            } else {
                Err(CouchDaoError::RequestStatus { path: url, status }.into())
            }
        })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ensure_database().await.map_err(Into::into) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accepted(id: &str, rev: &str) -> BulkResult {
        BulkResult {
            id: id.into(),
            rev: Some(rev.into()),
            error: None,
        }
    }

    fn rejected(id: &str) -> BulkResult {
        BulkResult {
            id: id.into(),
            rev: None,
            error: Some("conflict".into()),
        }
    }

    #[test]
    fn both_documents_written_commits() {
        let results = [accepted("state::g", "2-a"), accepted("buzz::g::b", "1-b")];

        assert_eq!(
            classify_buzz_commit(&results, "state::g", "buzz::g::b"),
            BuzzCommit::Committed
        );
    }

    #[test]
    fn rejected_buzz_restores_the_state() {
        let results = [accepted("state::g", "3-c"), rejected("buzz::g::b")];

        assert_eq!(
            classify_buzz_commit(&results, "state::g", "buzz::g::b"),
            BuzzCommit::RestoreState { rev: "3-c".into() }
        );
    }

    #[test]
    fn rejected_state_drops_the_buzz() {
        let results = [rejected("state::g"), accepted("buzz::g::b", "1-b")];

        assert_eq!(
            classify_buzz_commit(&results, "state::g", "buzz::g::b"),
            BuzzCommit::DropBuzz { rev: "1-b".into() }
        );
    }

    #[test]
    fn missing_results_count_as_rejected() {
        assert_eq!(
            classify_buzz_commit(&[], "state::g", "buzz::g::b"),
            BuzzCommit::Rejected
        );
    }

    #[test]
    fn bulk_reply_decodes_revisions_and_errors() {
        let results: Vec<BulkResult> = serde_json::from_value(json!([
            { "ok": true, "id": "state::g", "rev": "4-d" },
            { "id": "buzz::g::b", "error": "conflict", "reason": "Document update conflict." }
        ]))
        .unwrap();

        assert_eq!(
            classify_buzz_commit(&results, "state::g", "buzz::g::b"),
            BuzzCommit::RestoreState { rev: "4-d".into() }
        );
    }
}
