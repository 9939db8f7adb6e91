use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the gameshow backend.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::health::api_health,
        crate::routes::game::create_game,
        crate::routes::game::get_game,
        crate::routes::game::update_game,
        crate::routes::game::join_game,
        crate::routes::game::get_game_by_code,
        crate::routes::game::host_join,
        crate::routes::game::list_teams,
        crate::routes::game::list_players,
        crate::routes::game::get_game_state,
        crate::routes::game::update_game_state,
        crate::routes::game::list_buzzes,
        crate::routes::game::buzz,
        crate::routes::game::reset_buzz,
        crate::routes::game::enable_buzzing,
        crate::routes::game::disable_buzzing,
        crate::routes::team::update_score,
        crate::routes::player::disconnect_player,
        crate::routes::player::reconnect_player,
        crate::routes::questions::generate_questions,
        crate::routes::questions::regenerate_question,
        crate::routes::sse::session_stream,
        crate::routes::websocket::ws_handler,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::game::CreateGameRequest,
            crate::dto::game::TeamCreate,
            crate::dto::game::GameUpdate,
            crate::dto::game::PlayerJoinRequest,
            crate::dto::game::HostJoinRequest,
            crate::dto::game::GameOut,
            crate::dto::game::TeamOut,
            crate::dto::game::GameCreateResponse,
            crate::dto::game::GameWithTeams,
            crate::dto::game::PlayerOut,
            crate::dto::game::PlayerStatusOut,
            crate::dto::game::BuzzOut,
            crate::dto::state::GameStateOut,
            crate::dto::state::GameStatePatch,
            crate::dto::state::TeamScoreUpdate,
            crate::dto::state::BuzzRequest,
            crate::dto::state::BuzzResponse,
            crate::dto::snapshot::SessionMessage,
            crate::dto::snapshot::SessionSnapshot,
            crate::dto::questions::RoundSettings,
            crate::dto::questions::GenerateQuestionsRequest,
            crate::dto::questions::GeneratedQuestions,
            crate::dto::questions::QuestionOut,
            crate::dto::questions::GuessNumberQuestion,
            crate::dto::questions::Connect4Question,
            crate::dto::questions::RegenerateQuestionRequest,
            crate::dto::questions::RegenerateQuestionResponse,
            crate::state::game::GameStatus,
            crate::state::game::Difficulty,
            crate::state::game::RoundType,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "games", description = "Session lifecycle and joins"),
        (name = "state", description = "Round state and buzz log"),
        (name = "buzz", description = "Buzz-in arbitration"),
        (name = "teams", description = "Team scoring"),
        (name = "players", description = "Player connectivity"),
        (name = "questions", description = "Quiz content generation"),
        (name = "listeners", description = "WebSocket and SSE snapshot streams"),
    )
)]
pub struct ApiDoc;
