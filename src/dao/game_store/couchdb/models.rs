use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

pub const END_SUFFIX: &str = "\u{ffff}";

/// Record families stored in the database, each under its own id prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Game,
    Code,
    Team,
    Player,
    State,
    Buzz,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Game => "game",
            RecordKind::Code => "code",
            RecordKind::Team => "team",
            RecordKind::Player => "player",
            RecordKind::State => "state",
            RecordKind::Buzz => "buzz",
        }
    }
}

/// One CouchDB document wrapping a stored record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchDocument<T> {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", default, skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    pub kind: RecordKind,
    #[serde(flatten)]
    pub record: T,
}

impl<T> CouchDocument<T> {
    pub fn new(id: String, kind: RecordKind, record: T) -> Self {
        Self {
            id,
            rev: None,
            kind,
            record,
        }
    }
}

/// Claim on a join code, pointing at the game that owns it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeClaim {
    pub game_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct AllDocsResponse {
    pub rows: Vec<AllDocsRow>,
}

#[derive(Debug, Deserialize)]
pub struct AllDocsRow {
    #[serde(default)]
    pub doc: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct FindResponse {
    pub docs: Vec<Value>,
}

/// Per-document outcome of a `_bulk_docs` request.
#[derive(Debug, Deserialize)]
pub struct BulkResult {
    pub id: String,
    #[serde(default)]
    pub rev: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

pub fn game_doc_id(id: Uuid) -> String {
    format!("{}::{}", RecordKind::Game.as_str(), id)
}

pub fn code_doc_id(code: &str) -> String {
    format!("{}::{}", RecordKind::Code.as_str(), code)
}

pub fn state_doc_id(game_id: Uuid) -> String {
    format!("{}::{}", RecordKind::State.as_str(), game_id)
}

/// Id of a record owned by `game_id`, listed under [`child_prefix`].
pub fn child_doc_id(kind: RecordKind, game_id: Uuid, id: Uuid) -> String {
    format!("{}{}", child_prefix(kind, game_id), id)
}

pub fn child_prefix(kind: RecordKind, game_id: Uuid) -> String {
    format!("{}::{}::", kind.as_str(), game_id)
}
