use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::QuestionId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question text cannot be empty")]
    EmptyText,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown answer token: {raw:?}")]
pub struct AnswerParseError {
    pub raw: String,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown question type: {raw:?}")]
pub struct QuestionTypeParseError {
    pub raw: String,
}

//
// ─── ANSWERS ───────────────────────────────────────────────────────────────────
//

/// A single binary answer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Answer {
    Yes,
    No,
    True,
    False,
    Agree,
    Disagree,
}

impl Answer {
    /// Wire token, e.g. `"disagree"`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Answer::Yes => "yes",
            Answer::No => "no",
            Answer::True => "true",
            Answer::False => "false",
            Answer::Agree => "agree",
            Answer::Disagree => "disagree",
        }
    }

    /// Display label, e.g. `"Disagree"`.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Answer::Yes => "Yes",
            Answer::No => "No",
            Answer::True => "True",
            Answer::False => "False",
            Answer::Agree => "Agree",
            Answer::Disagree => "Disagree",
        }
    }

    #[must_use]
    pub fn is_positive(self) -> bool {
        matches!(self, Answer::Yes | Answer::True | Answer::Agree)
    }
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Answer {
    type Err = AnswerParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "yes" => Ok(Answer::Yes),
            "no" => Ok(Answer::No),
            "true" => Ok(Answer::True),
            "false" => Ok(Answer::False),
            "agree" => Ok(Answer::Agree),
            "disagree" => Ok(Answer::Disagree),
            _ => Err(AnswerParseError { raw: s.to_string() }),
        }
    }
}

//
// ─── QUESTION TYPE ─────────────────────────────────────────────────────────────
//

/// Binary answer family of a question; determines the two legal answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionType {
    YesNo,
    TrueFalse,
    AgreeDisagree,
}

impl QuestionType {
    /// The legal answers as `(positive, negative)`.
    #[must_use]
    pub fn options(self) -> (Answer, Answer) {
        match self {
            QuestionType::YesNo => (Answer::Yes, Answer::No),
            QuestionType::TrueFalse => (Answer::True, Answer::False),
            QuestionType::AgreeDisagree => (Answer::Agree, Answer::Disagree),
        }
    }

    #[must_use]
    pub fn accepts(self, answer: Answer) -> bool {
        let (positive, negative) = self.options();
        answer == positive || answer == negative
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            QuestionType::YesNo => "yes-no",
            QuestionType::TrueFalse => "true-false",
            QuestionType::AgreeDisagree => "agree-disagree",
        }
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuestionType {
    type Err = QuestionTypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "yes-no" => Ok(QuestionType::YesNo),
            "true-false" => Ok(QuestionType::TrueFalse),
            "agree-disagree" => Ok(QuestionType::AgreeDisagree),
            _ => Err(QuestionTypeParseError { raw: s.to_string() }),
        }
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A catalog question answered with one of two tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Question {
    id: QuestionId,
    text: String,
    #[serde(rename = "type")]
    kind: QuestionType,
    category: Option<String>,
    required: bool,
    order: i32,
}

impl Question {
    /// Creates a required question.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::EmptyText` if `text` is blank.
    pub fn new(
        id: QuestionId,
        text: impl Into<String>,
        kind: QuestionType,
        category: Option<String>,
        order: i32,
    ) -> Result<Self, QuestionError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(QuestionError::EmptyText);
        }
        let category = category.filter(|c| !c.trim().is_empty());

        Ok(Self {
            id,
            text,
            kind,
            category,
            required: true,
            order,
        })
    }

    /// Marks the question optional. Display-only; submission rules do not change.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn kind(&self) -> QuestionType {
        self.kind
    }

    #[must_use]
    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    #[must_use]
    pub fn required(&self) -> bool {
        self.required
    }

    #[must_use]
    pub fn order(&self) -> i32 {
        self.order
    }

    /// Heading shown above the question, e.g. `"Privacy Question"`.
    #[must_use]
    pub fn category_display(&self) -> String {
        match self.category() {
            Some(category) => format!("{category} Question"),
            None => "General Question".to_string(),
        }
    }
}
