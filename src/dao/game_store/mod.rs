#[cfg(feature = "couch-store")]
pub mod couchdb;
pub mod memory;

use crate::dao::models::{
    BuzzEntity, GameEntity, GameStateEntity, NewGameRecords, PlayerEntity, TeamEntity,
};
use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;
use uuid::Uuid;

/// Abstraction over the persistence layer for game sessions and their records.
///
/// Every call is expected to be read-your-write consistent. Listings are
/// returned in creation order.
pub trait GameStore: Send + Sync {
    /// Insert a new game with its teams and initial state.
    ///
    /// Fails with [`StorageError::DuplicateCode`](crate::dao::storage::StorageError::DuplicateCode)
    /// when the join code is already taken; nothing is written in that case.
    fn create_game(&self, records: NewGameRecords) -> BoxFuture<'static, StorageResult<()>>;
    fn find_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameEntity>>>;
    fn find_game_by_code(
        &self,
        code: String,
    ) -> BoxFuture<'static, StorageResult<Option<GameEntity>>>;
    fn save_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<()>>;
    fn list_teams(&self, game_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<TeamEntity>>>;
    fn find_team(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<TeamEntity>>>;
    fn save_team(&self, team: TeamEntity) -> BoxFuture<'static, StorageResult<()>>;
    fn list_players(&self, game_id: Uuid)
    -> BoxFuture<'static, StorageResult<Vec<PlayerEntity>>>;
    fn find_player(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<PlayerEntity>>>;
    fn save_player(&self, player: PlayerEntity) -> BoxFuture<'static, StorageResult<()>>;
    fn find_game_state(
        &self,
        game_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<GameStateEntity>>>;
    fn save_game_state(&self, state: GameStateEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Persist the state of a won buzz window together with its log entry.
    fn record_buzz(
        &self,
        state: GameStateEntity,
        buzz: BuzzEntity,
    ) -> BoxFuture<'static, StorageResult<()>>;
    fn list_buzzes(&self, game_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<BuzzEntity>>>;
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
