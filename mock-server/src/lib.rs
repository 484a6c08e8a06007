use std::{collections::BTreeMap, sync::Arc};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Choice {
    pub id: i64,
    pub choice_text: String,
    pub is_correct: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Question {
    pub id: i64,
    pub question_text: String,
    pub choices: Vec<Choice>,
}

/// Body accepted by create and update. Any `id` fields are ignored.
#[derive(Deserialize)]
pub struct ChoiceInput {
    pub choice_text: String,
    pub is_correct: bool,
}

#[derive(Deserialize)]
pub struct QuestionInput {
    pub question_text: String,
    pub choices: Vec<ChoiceInput>,
}

/// Questions keyed by id, with separate id sequences for questions and
/// choices.
#[derive(Default)]
pub struct Registry {
    questions: BTreeMap<i64, Question>,
    last_question_id: i64,
    last_choice_id: i64,
}

impl Registry {
    fn choices(&mut self, input: Vec<ChoiceInput>) -> Vec<Choice> {
        input
            .into_iter()
            .map(|c| {
                self.last_choice_id += 1;
                Choice {
                    id: self.last_choice_id,
                    choice_text: c.choice_text,
                    is_correct: c.is_correct,
                }
            })
            .collect()
    }
}

pub type Db = Arc<RwLock<Registry>>;

type ApiError = (StatusCode, Json<Value>);

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Registry::default()));
    Router::new()
        .route("/questions/", get(list_questions).post(create_question))
        .route(
            "/questions/{id}",
            get(get_question).put(update_question).delete(delete_question),
        )
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn not_found() -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "detail": "Question not found" })),
    )
}

async fn list_questions(State(db): State<Db>) -> Json<Vec<Question>> {
    let registry = db.read().await;
    Json(registry.questions.values().cloned().collect())
}

async fn create_question(State(db): State<Db>, Json(input): Json<QuestionInput>) -> Json<Question> {
    let mut registry = db.write().await;
    registry.last_question_id += 1;
    let id = registry.last_question_id;
    let choices = registry.choices(input.choices);
    let question = Question {
        id,
        question_text: input.question_text,
        choices,
    };
    registry.questions.insert(id, question.clone());
    tracing::info!(id, "question created");
    Json(question)
}

async fn get_question(
    State(db): State<Db>,
    Path(id): Path<i64>,
) -> Result<Json<Question>, ApiError> {
    let registry = db.read().await;
    registry.questions.get(&id).cloned().map(Json).ok_or_else(not_found)
}

/// Replaces the text and every choice; replacement choices get fresh ids.
async fn update_question(
    State(db): State<Db>,
    Path(id): Path<i64>,
    Json(input): Json<QuestionInput>,
) -> Result<Json<Question>, ApiError> {
    let mut registry = db.write().await;
    if !registry.questions.contains_key(&id) {
        return Err(not_found());
    }
    let choices = registry.choices(input.choices);
    let question = Question {
        id,
        question_text: input.question_text,
        choices,
    };
    registry.questions.insert(id, question.clone());
    tracing::info!(id, "question updated");
    Ok(Json(question))
}

async fn delete_question(
    State(db): State<Db>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let mut registry = db.write().await;
    registry.questions.remove(&id).ok_or_else(not_found)?;
    tracing::info!(id, "question deleted");
    Ok(Json(json!({
        "message": format!("Question {id} and its choices were deleted")
    })))
}
