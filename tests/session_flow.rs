use std::{sync::Arc, time::SystemTime};

use futures::future::{BoxFuture, join_all};
use serde_json::{Value, json};
use tokio::sync::mpsc::UnboundedReceiver;
use uuid::Uuid;

use gameshow_back::{
    config::AppConfig,
    dao::{
        game_store::{GameStore, memory::MemoryGameStore},
        models::{GameEntity, GameStateEntity, NewGameRecords},
        question_source::{QuestionSource, QuestionSourceError, QuestionSourceResult},
        storage::StorageError,
    },
    dto::{
        game::{
            CreateGameRequest, GameCreateResponse, HostJoinRequest, PlayerJoinRequest, TeamCreate,
        },
        state::BuzzRequest,
    },
    error::ServiceError,
    services::{
        buzz_service, game_state_service, health_service, player_service, session_service,
        sync_service,
    },
    state::{
        AppState, Listener, SharedState,
        game::{Difficulty, GameStatus, RoundType},
        round_data::RoundData,
    },
};

struct OfflineSource;

impl QuestionSource for OfflineSource {
    fn complete_json(&self, _prompt: String) -> BoxFuture<'static, QuestionSourceResult<Value>> {
        Box::pin(async { Err(QuestionSourceError::MissingApiKey) })
    }
}

async fn app() -> SharedState {
    let state = AppState::new(AppConfig::default(), Arc::new(OfflineSource));
    state
        .install_game_store(Arc::new(MemoryGameStore::new()))
        .await;
    state
}

async fn create(state: &SharedState, teams: &[&str]) -> GameCreateResponse {
    let request = CreateGameRequest {
        teams: teams
            .iter()
            .map(|name| TeamCreate {
                name: (*name).to_string(),
                color: "#ff00aa".into(),
            })
            .collect(),
        difficulty: Difficulty::Medium,
        rounds: vec![RoundType::TriviaBuzz],
        host_pin: None,
    };
    session_service::create_session(state, request).await.unwrap()
}

fn buzz_for(team_id: Uuid) -> BuzzRequest {
    BuzzRequest {
        team_id,
        player_id: None,
        player_name: Some("Alice".into()),
        question_text: Some("Capital of France?".into()),
    }
}

fn next_snapshot(rx: &mut UnboundedReceiver<Arc<str>>) -> Value {
    let payload = rx.try_recv().expect("a snapshot should be queued");
    serde_json::from_str(&payload).unwrap()
}

#[tokio::test]
async fn concurrent_buzzes_have_exactly_one_winner() {
    let state = app().await;
    let created = create(&state, &["Red", "Blue", "Green", "Gold"]).await;
    let game_id = created.game.id;
    buzz_service::enable_buzzing(&state, game_id).await.unwrap();

    let attempts = created.teams.iter().map(|team| {
        let state = state.clone();
        let team_id = team.id;
        tokio::spawn(async move { buzz_service::buzz(&state, game_id, buzz_for(team_id)).await })
    });
    let results: Vec<_> = join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    let winners: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    assert_eq!(winners.len(), 1);
    assert!(
        results
            .iter()
            .filter(|r| r.is_err())
            .all(|r| matches!(r, Err(ServiceError::InvalidState(_))))
    );

    let game_state = game_state_service::get_game_state(&state, game_id)
        .await
        .unwrap();
    assert!(!game_state.can_buzz);
    assert_eq!(game_state.buzzed_team_id, Some(winners[0].team_id));

    let log = session_service::list_buzzes(&state, game_id).await.unwrap();
    assert_eq!(log.len(), 1);
    assert!(log[0].was_first);
}

#[tokio::test]
async fn buzz_window_cycles_through_disable_and_enable() {
    let state = app().await;
    let created = create(&state, &["Red", "Blue"]).await;
    let game_id = created.game.id;
    let (red, blue) = (created.teams[0].id, created.teams[1].id);

    let closed = buzz_service::buzz(&state, game_id, buzz_for(red)).await;
    assert!(matches!(closed, Err(ServiceError::InvalidState(_))));

    buzz_service::enable_buzzing(&state, game_id).await.unwrap();
    buzz_service::buzz(&state, game_id, buzz_for(red)).await.unwrap();
    let retry = buzz_service::buzz(&state, game_id, buzz_for(blue)).await;
    assert!(matches!(retry, Err(ServiceError::InvalidState(_))));

    let disabled = buzz_service::disable_buzzing(&state, game_id).await.unwrap();
    assert!(!disabled.can_buzz);
    assert_eq!(disabled.buzzed_team_id, None);

    let enabled = buzz_service::enable_buzzing(&state, game_id).await.unwrap();
    assert!(enabled.can_buzz);
    assert_eq!(enabled.buzzed_team_id, None);

    let second = buzz_service::buzz(&state, game_id, buzz_for(blue)).await.unwrap();
    assert_eq!(second.team_id, blue);
    assert_eq!(session_service::list_buzzes(&state, game_id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn buzz_from_foreign_team_is_rejected() {
    let state = app().await;
    let first = create(&state, &["Red"]).await;
    let second = create(&state, &["Blue"]).await;
    buzz_service::enable_buzzing(&state, first.game.id).await.unwrap();

    let result = buzz_service::buzz(&state, first.game.id, buzz_for(second.teams[0].id)).await;

    assert!(matches!(result, Err(ServiceError::InvalidInput(_))));
    let game_state = game_state_service::get_game_state(&state, first.game.id)
        .await
        .unwrap();
    assert!(game_state.can_buzz);
}

#[tokio::test]
async fn scores_never_drop_below_zero() {
    let state = app().await;
    let created = create(&state, &["Red"]).await;
    let team_id = created.teams[0].id;

    let team = game_state_service::update_team_score(&state, team_id, 5).await.unwrap();
    assert_eq!(team.score, 5);
    let team = game_state_service::update_team_score(&state, team_id, -20).await.unwrap();
    assert_eq!(team.score, 0);
    game_state_service::update_team_score(&state, team_id, 10).await.unwrap();
    let team = game_state_service::update_team_score(&state, team_id, 10).await.unwrap();
    assert_eq!(team.score, 20);

    let missing = game_state_service::update_team_score(&state, Uuid::new_v4(), 1).await;
    assert!(matches!(missing, Err(ServiceError::NotFound(_))));
}

#[tokio::test]
async fn disconnecting_one_player_leaves_the_others_alone() {
    let state = app().await;
    let created = create(&state, &["Red"]).await;
    let team_id = created.teams[0].id;

    let mut players = Vec::new();
    for name in ["Alice", "Bob"] {
        let joined = session_service::join_session(
            &state,
            &created.game.code.to_lowercase(),
            PlayerJoinRequest {
                player_name: name.into(),
                team_id,
            },
        )
        .await
        .unwrap();
        assert!(joined.connected);
        players.push(joined);
    }

    let status = player_service::disconnect_player(&state, players[0].id)
        .await
        .unwrap();
    assert!(!status.connected);

    let listed = session_service::list_players(&state, created.game.id)
        .await
        .unwrap();
    let by_name = |name: &str| listed.iter().find(|p| p.name == name).unwrap().connected;
    assert!(!by_name("Alice"));
    assert!(by_name("Bob"));

    let status = player_service::reconnect_player(&state, players[0].id)
        .await
        .unwrap();
    assert!(status.connected);
}

#[tokio::test]
async fn listeners_receive_snapshots_in_commit_order() {
    let state = app().await;
    let created = create(&state, &["Red"]).await;
    let game_id = created.game.id;
    let team_id = created.teams[0].id;

    let (listener, mut rx) = Listener::channel();
    sync_service::attach_listener(&state, game_id, &listener)
        .await
        .unwrap();
    assert_eq!(state.listeners().listener_count(game_id), 1);

    let initial = next_snapshot(&mut rx);
    assert_eq!(initial["type"], json!("snapshot"));
    assert_eq!(initial["data"]["game"]["id"], json!(game_id));
    assert_eq!(initial["data"]["teams"][0]["score"], json!(0));

    game_state_service::update_team_score(&state, team_id, 3).await.unwrap();
    buzz_service::enable_buzzing(&state, game_id).await.unwrap();

    let scored = next_snapshot(&mut rx);
    assert_eq!(scored["data"]["teams"][0]["score"], json!(3));
    assert_eq!(scored["data"]["game_state"]["can_buzz"], json!(false));
    let opened = next_snapshot(&mut rx);
    assert_eq!(opened["data"]["game_state"]["can_buzz"], json!(true));
    assert!(rx.try_recv().is_err());

    sync_service::detach_listener(&state, game_id, &listener);
    assert_eq!(state.listeners().listener_count(game_id), 0);
}

#[tokio::test]
async fn failed_mutations_publish_nothing() {
    let state = app().await;
    let created = create(&state, &["Red"]).await;
    let game_id = created.game.id;

    let (listener, mut rx) = Listener::channel();
    sync_service::attach_listener(&state, game_id, &listener)
        .await
        .unwrap();
    next_snapshot(&mut rx);

    let rejected = buzz_service::buzz(&state, game_id, buzz_for(created.teams[0].id)).await;
    assert!(rejected.is_err());
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn attaching_to_unknown_session_fails() {
    let state = app().await;
    let (listener, _rx) = Listener::channel();

    let result = sync_service::attach_listener(&state, Uuid::new_v4(), &listener).await;

    assert!(matches!(result, Err(ServiceError::NotFound(_))));
    assert_eq!(state.listeners().session_count(), 0);
}

#[tokio::test]
async fn join_codes_are_unique_in_the_store() {
    let store = MemoryGameStore::new();
    let now = SystemTime::now();
    let records = |code: &str| {
        let game_id = Uuid::new_v4();
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
            teams: Vec::new(),
            state: GameStateEntity::initial(game_id, RoundData::default(), now),
        }
    };

    let first = records("PINKSAND");
    let first_id = first.game.id;
    store.create_game(first).await.unwrap();
    let duplicate = store.create_game(records("PINKSAND")).await;

    assert!(matches!(duplicate, Err(StorageError::DuplicateCode { .. })));
    let found = store
        .find_game_by_code("PINKSAND".into())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, first_id);
}

#[tokio::test]
async fn mutations_fail_fast_without_storage() {
    let state = AppState::new(AppConfig::default(), Arc::new(OfflineSource));

    let result = buzz_service::enable_buzzing(&state, Uuid::new_v4()).await;

    assert!(matches!(result, Err(ServiceError::Degraded)));
}

#[tokio::test]
async fn gates_are_released_after_mutations() {
    let state = app().await;
    let created = create(&state, &["Red", "Blue"]).await;
    let game_id = created.game.id;

    buzz_service::enable_buzzing(&state, game_id).await.unwrap();
    let _ = buzz_service::buzz(&state, game_id, buzz_for(created.teams[0].id)).await;
    buzz_service::disable_buzzing(&state, game_id).await.unwrap();

    assert_eq!(state.session_gate_count(), 0);
}

#[tokio::test]
async fn health_reports_storage_and_live_sessions() {
    let state = app().await;
    let created = create(&state, &["Red"]).await;
    let (listener, _rx) = Listener::channel();
    sync_service::attach_listener(&state, created.game.id, &listener)
        .await
        .unwrap();

    let health = health_service::health_status(&state).await;

    assert_eq!(health.status, "ok");
    assert_eq!(health.storage, "memory");
    assert_eq!(health.live_sessions, 1);
}

#[tokio::test]
async fn malformed_session_requests_are_rejected_before_any_write() {
    let state = app().await;

    let empty = CreateGameRequest {
        teams: Vec::new(),
        difficulty: Difficulty::Easy,
        rounds: Vec::new(),
        host_pin: Some("1".into()),
    };
    let result = session_service::create_session(&state, empty).await;
    assert!(matches!(result, Err(ServiceError::InvalidInput(_))));
    assert_eq!(state.session_gate_count(), 0);

    let created = create(&state, &["Red"]).await;
    let joined = session_service::join_session(
        &state,
        &created.game.code,
        PlayerJoinRequest {
            player_name: String::new(),
            team_id: created.teams[0].id,
        },
    )
    .await;
    assert!(matches!(joined, Err(ServiceError::InvalidInput(_))));
    assert!(
        session_service::list_players(&state, created.game.id)
            .await
            .unwrap()
            .is_empty()
    );

    let host = session_service::host_join(
        &state,
        &created.game.code,
        HostJoinRequest {
            host_pin: "12".into(),
        },
    )
    .await;
    assert!(matches!(host, Err(ServiceError::InvalidInput(_))));
}
