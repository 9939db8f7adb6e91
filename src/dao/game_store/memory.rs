use std::{collections::HashMap, sync::Arc};

use futures::future::BoxFuture;
use indexmap::IndexMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::dao::{
    game_store::GameStore,
    models::{BuzzEntity, GameEntity, GameStateEntity, NewGameRecords, PlayerEntity, TeamEntity},
    storage::{StorageError, StorageResult},
};

#[derive(Default)]
struct MemoryTables {
    games: IndexMap<Uuid, GameEntity>,
    codes: HashMap<String, Uuid>,
    teams: IndexMap<Uuid, TeamEntity>,
    players: IndexMap<Uuid, PlayerEntity>,
    states: HashMap<Uuid, GameStateEntity>,
    buzzes: Vec<BuzzEntity>,
}

/// Process-local store keeping every record behind one async lock.
///
/// Data does not survive a restart. Each operation runs under a single lock
/// acquisition, so multi-record writes are atomic.
#[derive(Clone, Default)]
pub struct MemoryGameStore {
    inner: Arc<RwLock<MemoryTables>>,
}

impl MemoryGameStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl GameStore for MemoryGameStore {
    fn create_game(&self, records: NewGameRecords) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut tables = inner.write().await;
            let NewGameRecords { game, teams, state } = records;
            if tables.codes.contains_key(&game.code) {
                return Err(StorageError::DuplicateCode { code: game.code });
            }
            tables.codes.insert(game.code.clone(), game.id);
            for team in teams {
                tables.teams.insert(team.id, team);
            }
            tables.states.insert(state.game_id, state);
            tables.games.insert(game.id, game);
            Ok(())
        })
    }

    fn find_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.read().await.games.get(&id).cloned()) })
    }

    fn find_game_by_code(
        &self,
        code: String,
    ) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let tables = inner.read().await;
            Ok(tables
                .codes
                .get(&code)
                .and_then(|id| tables.games.get(id))
                .cloned())
        })
    }

    fn save_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            inner.write().await.games.insert(game.id, game);
            Ok(())
        })
    }

    fn list_teams(&self, game_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<TeamEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let tables = inner.read().await;
            Ok(tables
                .teams
                .values()
                .filter(|team| team.game_id == game_id)
                .cloned()
                .collect())
        })
    }

    fn find_team(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<TeamEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.read().await.teams.get(&id).cloned()) })
    }

    fn save_team(&self, team: TeamEntity) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            inner.write().await.teams.insert(team.id, team);
            Ok(())
        })
    }

    fn list_players(
        &self,
        game_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<PlayerEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let tables = inner.read().await;
            Ok(tables
                .players
                .values()
                .filter(|player| player.game_id == game_id)
                .cloned()
                .collect())
        })
    }

    fn find_player(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<PlayerEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.read().await.players.get(&id).cloned()) })
    }

    fn save_player(&self, player: PlayerEntity) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            inner.write().await.players.insert(player.id, player);
            Ok(())
        })
    }

    fn find_game_state(
        &self,
        game_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<GameStateEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.read().await.states.get(&game_id).cloned()) })
    }

    fn save_game_state(&self, state: GameStateEntity) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            inner.write().await.states.insert(state.game_id, state);
            Ok(())
        })
    }

    fn record_buzz(
        &self,
        state: GameStateEntity,
        buzz: BuzzEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut tables = inner.write().await;
            tables.states.insert(state.game_id, state);
            tables.buzzes.push(buzz);
            Ok(())
        })
    }

    fn list_buzzes(&self, game_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<BuzzEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let tables = inner.read().await;
            Ok(tables
                .buzzes
                .iter()
                .filter(|buzz| buzz.game_id == game_id)
                .cloned()
                .collect())
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use super::*;
    use crate::state::{game::GameStatus, round_data::RoundData};

    fn records(code: &str) -> NewGameRecords {
        let now = SystemTime::now();
        let game_id = Uuid::new_v4();
        let team = |name: &str| TeamEntity {
            id: Uuid::new_v4(),
            game_id,
            name: name.into(),
            color: "#fff".into(),
            score: 0,
            created_at: now,
        };
        NewGameRecords {
            game: GameEntity {
                id: game_id,
                code: code.into(),
                status: GameStatus::Waiting,
                current_round: 0,
                current_round_type: None,
                difficulty: None,
                created_at: now,
                updated_at: now,
            },
            teams: vec![team("Red"), team("Blue")],
            state: GameStateEntity::initial(game_id, RoundData::default(), now),
        }
    }

    #[tokio::test]
    async fn create_then_lookup_by_code() {
        let store = MemoryGameStore::new();
        let records = records("PINKSAND");
        let game_id = records.game.id;

        store.create_game(records).await.unwrap();

        let found = store.find_game_by_code("PINKSAND".into()).await.unwrap();
        assert_eq!(found.map(|g| g.id), Some(game_id));
        assert!(store.find_game_state(game_id).await.unwrap().is_some());
        let teams = store.list_teams(game_id).await.unwrap();
        assert_eq!(
            teams.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(),
            vec!["Red", "Blue"]
        );
    }

    #[tokio::test]
    async fn duplicate_code_is_rejected_without_writing() {
        let store = MemoryGameStore::new();
        store.create_game(records("MOONSTAR")).await.unwrap();
        let second = records("MOONSTAR");
        let second_id = second.game.id;

        let err = store.create_game(second).await.unwrap_err();

        assert!(matches!(err, StorageError::DuplicateCode { ref code } if code == "MOONSTAR"));
        assert!(store.find_game(second_id).await.unwrap().is_none());
        assert!(store.list_teams(second_id).await.unwrap().is_empty());
    }
}
