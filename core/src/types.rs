//! Domain types for the question service.
//!
//! # Design
//! The Rust field names are `text` and `is_correct`; serde renames map them
//! onto the service's wire names (`question_text`, `choice_text`). An `id` of
//! zero marks a draft the server has not accepted yet, and a missing `id` on
//! the wire decodes as zero because the service accepts choices without ids;
//! the gateway rejects server replies whose question id is not positive.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Server-assigned question identifier. Zero means "not yet persisted".
pub type QuestionId = i64;

/// One multiple-choice answer belonging to a question.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Choice {
    #[serde(default)]
    pub id: i64,
    #[serde(rename = "choice_text")]
    pub text: String,
    pub is_correct: bool,
}

/// A quiz question with its ordered choices.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Question {
    #[serde(default)]
    pub id: QuestionId,
    #[serde(rename = "question_text")]
    pub text: String,
    pub choices: Vec<Choice>,
}

impl Question {
    /// Start authoring a new draft question.
    pub fn draft(text: impl Into<String>) -> QuestionDraft {
        QuestionDraft::new(text)
    }

    pub fn is_persisted(&self) -> bool {
        self.id > 0
    }

    /// Check that the question can be submitted: at least one choice, and no
    /// two choices sharing an id.
    pub fn validate(&self) -> Result<(), InvalidQuestion> {
        if self.choices.is_empty() {
            return Err(InvalidQuestion::NoChoices);
        }
        let mut seen = HashSet::with_capacity(self.choices.len());
        for choice in &self.choices {
            if !seen.insert(choice.id) {
                return Err(InvalidQuestion::DuplicateChoiceId(choice.id));
            }
        }
        Ok(())
    }
}

/// Reason a question was rejected before encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidQuestion {
    NoChoices,
    DuplicateChoiceId(i64),
}

impl fmt::Display for InvalidQuestion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidQuestion::NoChoices => write!(f, "question has no choices"),
            InvalidQuestion::DuplicateChoiceId(id) => {
                write!(f, "choice id {id} is used more than once")
            }
        }
    }
}

impl std::error::Error for InvalidQuestion {}

/// Builder for draft questions.
///
/// Choice ids are assigned locally in authoring order (`1..=n`), so a draft
/// built here never carries colliding choice ids.
#[derive(Debug, Clone, Default)]
pub struct QuestionDraft {
    text: String,
    choices: Vec<Choice>,
}

impl QuestionDraft {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            choices: Vec::new(),
        }
    }

    pub fn choice(mut self, text: impl Into<String>, is_correct: bool) -> Self {
        let id = self.choices.len() as i64 + 1;
        self.choices.push(Choice {
            id,
            text: text.into(),
            is_correct,
        });
        self
    }

    pub fn build(self) -> Question {
        Question {
            id: 0,
            text: self.text,
            choices: self.choices,
        }
    }
}

impl From<QuestionDraft> for Question {
    fn from(draft: QuestionDraft) -> Self {
        draft.build()
    }
}
