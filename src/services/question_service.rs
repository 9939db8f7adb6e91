//! Quiz content generation through the configured [`QuestionSource`].
//!
//! Nothing here touches session state: generated content is handed back to
//! the host, which decides what ends up in `round_data`.

use std::collections::BTreeMap;

use serde::{Deserialize, de::DeserializeOwned};
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::question_source::QuestionSource,
    dto::questions::{
        Connect4Question, GenerateQuestionsRequest, GeneratedQuestions, GuessNumberQuestion,
        QuestionOut, RegenerateQuestionRequest, RegenerateQuestionResponse, RoundSettings,
    },
    error::ServiceError,
    state::{
        SharedState,
        game::{Difficulty, RoundType},
    },
};

const DEFAULT_QUESTION_COUNT: u32 = 10;
const LIGHTNING_QUESTION_COUNT: u32 = 20;
const BLIND_DRAW_WORD_COUNT: u32 = 5;
const BOARD_SIZE: u8 = 4;
const CONNECT4_FOLLOW_UPS: usize = 3;
const CONNECT4_REGENERATE_ATTEMPTS: usize = 3;
const DEFAULT_THEMES: [&str; 4] = ["general", "science", "history", "pop-culture"];
const ROW_DIFFICULTIES: [Difficulty; 4] = [
    Difficulty::Easy,
    Difficulty::Medium,
    Difficulty::MediumHard,
    Difficulty::Hard,
];
const SELF_REFERENCES: [&str; 4] = ["connect 4", "connect-4", "connect four", "four in a row"];

const QUESTION_SCHEMA: &str =
    r#"{"questions":[{"text":"...", "answer":"...", "difficulty":"", "category":""}]}"#;
const CELL_SCHEMA: &str = r#"{"questions":[{"column":0,"row":0,"question":{"text":"...","answer":"...","difficulty":"easy","category":"..."}}]}"#;
const SINGLE_QUESTION_SCHEMA: &str =
    r#"{"question":{"text":"...", "answer":"...", "difficulty":"", "category":""}}"#;

#[derive(Debug, Deserialize)]
struct QuestionList<T> {
    #[serde(default = "Vec::new")]
    questions: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct Single<T> {
    question: T,
}

#[derive(Debug, Deserialize)]
struct RawQuestion {
    text: String,
    answer: Value,
    #[serde(default)]
    difficulty: Option<String>,
    #[serde(default)]
    category: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawGuess {
    question: String,
    answer: Value,
}

#[derive(Debug, Deserialize)]
struct RawCell {
    column: i64,
    row: i64,
    question: RawQuestion,
}

#[derive(Debug, Deserialize)]
struct WordList {
    words: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SingleWord {
    word: String,
}

/// Generate content for every requested round type.
pub async fn generate_questions(
    state: &SharedState,
    request: GenerateQuestionsRequest,
) -> Result<GeneratedQuestions, ServiceError> {
    request.validate()?;
    let source = state.questions();
    generate_with(source.as_ref(), &request.rounds, &request.round_settings).await
}

/// Replace one generated item.
pub async fn regenerate_question(
    state: &SharedState,
    request: RegenerateQuestionRequest,
) -> Result<RegenerateQuestionResponse, ServiceError> {
    request.validate()?;
    let source = state.questions();
    regenerate_with(source.as_ref(), &request).await
}

/// Generate content for `rounds` using `source`.
pub async fn generate_with(
    source: &dyn QuestionSource,
    rounds: &[RoundType],
    settings: &RoundSettings,
) -> Result<GeneratedQuestions, ServiceError> {
    let mut generated = GeneratedQuestions::default();

    if rounds.contains(&RoundType::TriviaBuzz) {
        let count = settings.trivia_buzz_questions.unwrap_or(DEFAULT_QUESTION_COUNT);
        let difficulty = settings.trivia_buzz_difficulty.unwrap_or_default();
        generated.trivia_buzz = Some(
            question_batch(source, "trivia questions", count, difficulty).await?,
        );
    }

    if rounds.contains(&RoundType::Lightning) {
        let difficulty = settings.lightning_difficulty.unwrap_or_default();
        generated.lightning = Some(
            question_batch(source, "lightning round questions", LIGHTNING_QUESTION_COUNT, difficulty)
                .await?,
        );
    }

    if rounds.contains(&RoundType::GuessNumber) {
        let count = settings.guess_number_questions.unwrap_or(DEFAULT_QUESTION_COUNT);
        let prompt = format!(
            r#"Generate estimation questions as JSON with this schema: {{"questions":[{{"question":"...", "answer":123}}]}}. Generate {count} questions. Answers must be numbers."#
        );
        let list: QuestionList<RawGuess> = ask(source, prompt).await?;
        generated.guess_number = Some(
            list.questions
                .into_iter()
                .map(guess_number)
                .collect::<Result<_, _>>()?,
        );
    }

    if rounds.contains(&RoundType::Connect4) {
        generated.connect4 = Some(connect4_board(source, settings).await?);
    }

    if rounds.contains(&RoundType::BlindDraw) {
        let difficulty = settings.blind_draw_difficulty.unwrap_or_default();
        let prompt = format!(
            r#"Generate drawing prompt words as JSON with this schema: {{"words":["word1","word2"]}}. Generate {BLIND_DRAW_WORD_COUNT} words. difficulty='{difficulty}'."#
        );
        let list: WordList = ask(source, prompt).await?;
        generated.blind_draw = Some(list.words);
    }

    info!(rounds = rounds.len(), "questions generated");
    Ok(generated)
}

/// Replace one item of `request.round_type` using `source`.
pub async fn regenerate_with(
    source: &dyn QuestionSource,
    request: &RegenerateQuestionRequest,
) -> Result<RegenerateQuestionResponse, ServiceError> {
    let round_type = request.round_type;
    let difficulty = request.difficulty.unwrap_or_default();
    let mut response = RegenerateQuestionResponse::empty(round_type);

    match round_type {
        RoundType::TriviaBuzz | RoundType::Lightning => {
            let prompt = format!(
                "Generate ONE trivia question as JSON with this schema: {SINGLE_QUESTION_SCHEMA}. difficulty must be '{difficulty}'."
            );
            let single: Single<RawQuestion> = ask(source, prompt).await?;
            response.question = Some(question_out(single.question, difficulty));
        }
        RoundType::GuessNumber => {
            let prompt = r#"Generate ONE estimation question as JSON with this schema: {"question":{"question":"...", "answer":123}}."#.to_string();
            let single: Single<RawGuess> = ask(source, prompt).await?;
            response.guess_number = Some(guess_number(single.question)?);
        }
        RoundType::Connect4 => {
            let category = request.category.as_deref().unwrap_or("general");
            let prompt = format!(
                "Generate ONE trivia question as JSON with this schema: {SINGLE_QUESTION_SCHEMA}. difficulty must be '{difficulty}'. category should be '{category}'. Do NOT ask about the game 'Connect 4' or its rules."
            );
            let mut question = None;
            for _ in 0..CONNECT4_REGENERATE_ATTEMPTS {
                let single: Single<RawQuestion> = ask(source, prompt.clone()).await?;
                if !mentions_connect4(&single.question) {
                    question = Some(question_out(single.question, difficulty));
                    break;
                }
            }
            let question = question.ok_or_else(|| {
                ServiceError::Upstream("LLM returned Connect-4-specific question".into())
            })?;
            response.connect4 = Some(Connect4Question {
                column: request.column.unwrap_or(0),
                row: request.row.unwrap_or(0),
                question,
            });
        }
        RoundType::BlindDraw => {
            let prompt = format!(
                r#"Generate ONE drawing word as JSON with this schema: {{"word":"..."}} difficulty='{difficulty}'."#
            );
            let single: SingleWord = ask(source, prompt).await?;
            response.word = Some(single.word);
        }
        RoundType::QuickBuild | RoundType::DumpCharades => {
            return Err(ServiceError::InvalidInput("Unsupported round type".into()));
        }
    }

    Ok(response)
}

async fn question_batch(
    source: &dyn QuestionSource,
    kind: &str,
    count: u32,
    difficulty: Difficulty,
) -> Result<Vec<QuestionOut>, ServiceError> {
    let prompt = format!(
        "Generate {kind} as JSON with this schema: {QUESTION_SCHEMA}. Generate {count} questions. difficulty must be '{difficulty}'."
    );
    let list: QuestionList<RawQuestion> = ask(source, prompt).await?;
    Ok(list
        .questions
        .into_iter()
        .map(|raw| question_out(raw, difficulty))
        .collect())
}

/// Fill the 4x4 board, re-prompting for cells that came back missing or
/// self-referential.
async fn connect4_board(
    source: &dyn QuestionSource,
    settings: &RoundSettings,
) -> Result<Vec<Connect4Question>, ServiceError> {
    let themes = settings
        .connect4_themes
        .clone()
        .filter(|themes| !themes.is_empty())
        .unwrap_or_else(|| DEFAULT_THEMES.iter().map(|theme| theme.to_string()).collect());
    let themes = serde_json::to_string(&themes)
        .map_err(|err| ServiceError::InvalidInput(format!("invalid themes: {err}")))?;

    let prompt = format!(
        "Generate Connect 4 trivia questions as JSON with this schema: {CELL_SCHEMA}. \
         Generate 16 questions for 4 columns (0-3) and 4 rows (0-3). \
         Difficulty by row: row0=easy,row1=medium,row2=medium-hard,row3=hard. \
         Column themes by index: {themes}. \
         Do NOT ask about the game 'Connect 4' or its rules. \
         All questions must be standard trivia within the provided themes."
    );

    let mut board = BTreeMap::new();
    let list: QuestionList<RawCell> = ask(source, prompt).await?;
    place_cells(&mut board, list.questions);

    let mut follow_ups = 0;
    while board.len() < usize::from(BOARD_SIZE * BOARD_SIZE) && follow_ups < CONNECT4_FOLLOW_UPS {
        let missing = missing_cells(&board)
            .map(|(column, row)| format!("(column {column}, row {row})"))
            .collect::<Vec<_>>()
            .join(", ");
        let prompt = format!(
            "Generate trivia questions as JSON with this schema: {CELL_SCHEMA}. \
             Only generate questions for these positions: {missing}. \
             Do NOT ask about the game 'Connect 4' or its rules. \
             Column themes by index: {themes}."
        );
        let list: QuestionList<RawCell> = ask(source, prompt).await?;
        place_cells(&mut board, list.questions);
        follow_ups += 1;
    }

    if board.len() < usize::from(BOARD_SIZE * BOARD_SIZE) {
        warn!(filled = board.len(), "connect-4 board incomplete");
        return Err(ServiceError::Upstream(
            "Unable to generate non-Connect-4 trivia for all positions".into(),
        ));
    }

    Ok(board.into_values().collect())
}

fn place_cells(board: &mut BTreeMap<(u8, u8), Connect4Question>, cells: Vec<RawCell>) {
    for cell in cells {
        let (Some(column), Some(row)) = (board_index(cell.column), board_index(cell.row)) else {
            continue;
        };
        if mentions_connect4(&cell.question) {
            continue;
        }
        let fallback = ROW_DIFFICULTIES[usize::from(row)];
        board.insert(
            (column, row),
            Connect4Question {
                column,
                row,
                question: question_out(cell.question, fallback),
            },
        );
    }
}

fn missing_cells(
    board: &BTreeMap<(u8, u8), Connect4Question>,
) -> impl Iterator<Item = (u8, u8)> + '_ {
    (0..BOARD_SIZE)
        .flat_map(|column| (0..BOARD_SIZE).map(move |row| (column, row)))
        .filter(|cell| !board.contains_key(cell))
}

fn board_index(value: i64) -> Option<u8> {
    u8::try_from(value).ok().filter(|index| *index < BOARD_SIZE)
}

/// Whether a question is about the connect-4 game itself.
fn mentions_connect4(question: &RawQuestion) -> bool {
    let answer = answer_text(&question.answer);
    let combined = [
        question.text.as_str(),
        answer.as_str(),
        question.category.as_deref().unwrap_or(""),
    ]
    .join(" ")
    .to_lowercase();
    SELF_REFERENCES.iter().any(|phrase| combined.contains(phrase))
}

fn question_out(raw: RawQuestion, fallback: Difficulty) -> QuestionOut {
    let difficulty = raw
        .difficulty
        .and_then(|value| serde_json::from_value(Value::String(value)).ok())
        .unwrap_or(fallback);
    QuestionOut {
        id: Uuid::new_v4().to_string(),
        answer: answer_text(&raw.answer),
        text: raw.text,
        difficulty,
        category: raw.category,
    }
}

fn guess_number(raw: RawGuess) -> Result<GuessNumberQuestion, ServiceError> {
    let answer = match &raw.answer {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|value| value.round() as i64)),
        Value::String(text) => text.trim().replace(',', "").parse().ok(),
        _ => None,
    }
    .ok_or_else(|| {
        ServiceError::Upstream(format!("estimation answer is not a number: {}", raw.answer))
    })?;
    Ok(GuessNumberQuestion {
        question: raw.question,
        answer,
    })
}

fn answer_text(answer: &Value) -> String {
    match answer {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

async fn ask<T: DeserializeOwned>(source: &dyn QuestionSource, prompt: String) -> Result<T, ServiceError> {
    let value = source
        .complete_json(prompt)
        .await
        .inspect_err(|err| warn!(error = %err, "question generation failed"))?;
    serde_json::from_value(value).map_err(|err| {
        warn!(error = %err, "unexpected generated payload shape");
        ServiceError::Upstream(format!("malformed generated content: {err}"))
    })
}

#[cfg(test)]
mod tests {
    use std::{collections::VecDeque, sync::Mutex};

    use futures::future::BoxFuture;
    use serde_json::json;

    use super::*;
    use crate::dao::question_source::{QuestionSourceError, QuestionSourceResult};

    /// Replays canned replies in order and records every prompt.
    #[derive(Default)]
    struct ScriptedSource {
        replies: Mutex<VecDeque<Value>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedSource {
        fn new(replies: impl IntoIterator<Item = Value>) -> Self {
            Self {
                replies: Mutex::new(replies.into_iter().collect()),
                prompts: Mutex::default(),
            }
        }

        fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    impl QuestionSource for ScriptedSource {
        fn complete_json(&self, prompt: String) -> BoxFuture<'static, QuestionSourceResult<Value>> {
            self.prompts.lock().unwrap().push(prompt);
            let reply = self.replies.lock().unwrap().pop_front();
            Box::pin(async move { reply.ok_or(QuestionSourceError::MissingContent) })
        }
    }

    fn cell(column: i64, row: i64, text: &str) -> Value {
        json!({
            "column": column,
            "row": row,
            "question": {"text": text, "answer": "A", "difficulty": "easy", "category": "general"}
        })
    }

    fn full_board(skip: &[(i64, i64)]) -> Value {
        let cells: Vec<Value> = (0..4)
            .flat_map(|c| (0..4).map(move |r| (c, r)))
            .filter(|pos| !skip.contains(pos))
            .map(|(c, r)| cell(c, r, &format!("Question {c}/{r}")))
            .collect();
        json!({"questions": cells})
    }

    #[tokio::test]
    async fn trivia_batch_gets_fresh_ids_and_requested_count() {
        let source = ScriptedSource::new([json!({
            "questions": [
                {"text": "2+2?", "answer": 4, "difficulty": "easy"},
                {"text": "Capital of Peru?", "answer": "Lima", "difficulty": "unknown"}
            ]
        })]);
        let settings = RoundSettings {
            trivia_buzz_questions: Some(2),
            ..Default::default()
        };

        let generated = generate_with(&source, &[RoundType::TriviaBuzz], &settings)
            .await
            .unwrap();

        let questions = generated.trivia_buzz.unwrap();
        assert_eq!(questions.len(), 2);
        assert_ne!(questions[0].id, questions[1].id);
        assert_eq!(questions[0].answer, "4");
        assert_eq!(questions[0].difficulty, Difficulty::Easy);
        assert_eq!(questions[1].difficulty, Difficulty::MediumHard);
        assert!(source.prompts()[0].contains("Generate 2 questions"));
        assert!(generated.lightning.is_none());
    }

    #[tokio::test]
    async fn connect4_board_refills_self_referential_cells() {
        let mut first = full_board(&[(1, 2)]);
        first["questions"]
            .as_array_mut()
            .unwrap()
            .push(cell(1, 2, "How many in a row win Connect Four?"));
        let source = ScriptedSource::new([first, json!({"questions": [cell(1, 2, "Largest ocean?")]})]);

        let board = connect4_board(&source, &RoundSettings::default()).await.unwrap();

        assert_eq!(board.len(), 16);
        assert_eq!((board[0].column, board[0].row), (0, 0));
        assert_eq!((board[15].column, board[15].row), (3, 3));
        let refilled = board.iter().find(|c| (c.column, c.row) == (1, 2)).unwrap();
        assert_eq!(refilled.question.text, "Largest ocean?");
        let prompts = source.prompts();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[1].contains("(column 1, row 2)"));
    }

    #[tokio::test]
    async fn connect4_board_fails_after_follow_ups() {
        let source = ScriptedSource::new([
            full_board(&[(3, 3)]),
            json!({"questions": []}),
            json!({"questions": []}),
            json!({"questions": [cell(3, 3, "Rules of connect 4?")]}),
        ]);

        let err = connect4_board(&source, &RoundSettings::default()).await.unwrap_err();

        assert!(matches!(err, ServiceError::Upstream(_)));
        assert_eq!(source.prompts().len(), 4);
    }

    #[test]
    fn out_of_range_cells_are_ignored() {
        let mut board = BTreeMap::new();
        place_cells(
            &mut board,
            vec![
                serde_json::from_value(cell(4, 0, "x")).unwrap(),
                serde_json::from_value(cell(-1, 0, "y")).unwrap(),
                serde_json::from_value(cell(0, 3, "z")).unwrap(),
            ],
        );
        assert_eq!(board.len(), 1);
        assert!(board.contains_key(&(0, 3)));
    }

    #[tokio::test]
    async fn regenerate_connect4_retries_until_clean() {
        let source = ScriptedSource::new([
            json!({"question": {"text": "Who invented four in a row?", "answer": "x"}}),
            json!({"question": {"text": "Boiling point of water in C?", "answer": 100}}),
        ]);
        let request = RegenerateQuestionRequest {
            round_type: RoundType::Connect4,
            difficulty: Some(Difficulty::Hard),
            category: Some("science".into()),
            column: Some(2),
            row: Some(3),
        };

        let response = regenerate_with(&source, &request).await.unwrap();

        let cell = response.connect4.unwrap();
        assert_eq!((cell.column, cell.row), (2, 3));
        assert_eq!(cell.question.answer, "100");
        assert_eq!(cell.question.difficulty, Difficulty::Hard);
        assert!(source.prompts()[0].contains("category should be 'science'"));
    }

    #[tokio::test]
    async fn regenerate_rejects_unsupported_round_type() {
        let source = ScriptedSource::default();
        let request = RegenerateQuestionRequest {
            round_type: RoundType::QuickBuild,
            difficulty: None,
            category: None,
            column: None,
            row: None,
        };

        let err = regenerate_with(&source, &request).await.unwrap_err();

        assert!(matches!(err, ServiceError::InvalidInput(_)));
        assert!(source.prompts().is_empty());
    }

    #[tokio::test]
    async fn malformed_payload_is_upstream_failure() {
        let source = ScriptedSource::new([json!({"words": "not a list"})]);

        let err = generate_with(&source, &[RoundType::BlindDraw], &RoundSettings::default())
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::Upstream(_)));
    }

    #[tokio::test]
    async fn source_failure_is_upstream_failure() {
        let source = ScriptedSource::default();

        let err = generate_with(&source, &[RoundType::Lightning], &RoundSettings::default())
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::Upstream(_)));
    }

    #[test]
    fn guess_number_accepts_numeric_strings_and_floats() {
        let parsed = guess_number(RawGuess {
            question: "q".into(),
            answer: json!("1,234"),
        })
        .unwrap();
        assert_eq!(parsed.answer, 1234);

        let parsed = guess_number(RawGuess {
            question: "q".into(),
            answer: json!(9.6),
        })
        .unwrap();
        assert_eq!(parsed.answer, 10);

        assert!(guess_number(RawGuess { question: "q".into(), answer: json!("lots") }).is_err());
    }
}
