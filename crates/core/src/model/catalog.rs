use std::collections::{HashMap, HashSet};
use thiserror::Error;

use crate::model::ids::QuestionId;
use crate::model::question::{Question, QuestionType};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("duplicate question id {0}")]
    DuplicateId(QuestionId),

    #[error("duplicate question order {0}")]
    DuplicateOrder(i32),
}

/// Read-only, ordered set of questions, seeded once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionCatalog {
    questions: Vec<Question>,
    index: HashMap<QuestionId, usize>,
}

impl QuestionCatalog {
    /// Builds a catalog, sorting questions by `order`.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if two questions share an id or an order.
    pub fn new(mut questions: Vec<Question>) -> Result<Self, CatalogError> {
        let mut orders = HashSet::with_capacity(questions.len());
        for question in &questions {
            if !orders.insert(question.order()) {
                return Err(CatalogError::DuplicateOrder(question.order()));
            }
        }

        questions.sort_by_key(Question::order);

        let mut index = HashMap::with_capacity(questions.len());
        for (pos, question) in questions.iter().enumerate() {
            if index.insert(question.id(), pos).is_some() {
                return Err(CatalogError::DuplicateId(question.id()));
            }
        }

        Ok(Self { questions, index })
    }

    /// The built-in ten-question catalog.
    #[must_use]
    pub fn seeded() -> Self {
        let questions = SEED
            .iter()
            .zip(1_u32..)
            .filter_map(|(&(text, kind, category), id)| {
                let id = QuestionId::new(id).ok()?;
                let order = i32::try_from(id.value()).ok()?;
                Question::new(id, text, kind, Some(category.to_string()), order).ok()
            })
            .collect();
        Self::new(questions).unwrap_or_else(|_| Self::empty())
    }

    #[must_use]
    pub fn empty() -> Self {
        Self {
            questions: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Questions in ascending `order`.
    #[must_use]
    pub fn list(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn get(&self, id: QuestionId) -> Option<&Question> {
        self.index.get(&id).map(|&pos| &self.questions[pos])
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

const SEED: [(&str, QuestionType, &str); 10] = [
    (
        "Is climate change primarily caused by human activities?",
        QuestionType::TrueFalse,
        "Environment",
    ),
    (
        "Should social media platforms have more regulation?",
        QuestionType::YesNo,
        "Technology",
    ),
    (
        "Do you believe artificial intelligence will have a positive impact on society in the next decade?",
        QuestionType::AgreeDisagree,
        "Technology",
    ),
    (
        "Is remote work more productive than office work?",
        QuestionType::TrueFalse,
        "Work",
    ),
    (
        "Should healthcare be free for everyone?",
        QuestionType::YesNo,
        "Healthcare",
    ),
    (
        "Do you agree that renewable energy should be prioritized over fossil fuels?",
        QuestionType::AgreeDisagree,
        "Environment",
    ),
    (
        "Is online education as effective as traditional classroom learning?",
        QuestionType::TrueFalse,
        "Education",
    ),
    (
        "Should there be a universal basic income?",
        QuestionType::YesNo,
        "Economics",
    ),
    (
        "Do you believe that privacy is more important than security?",
        QuestionType::AgreeDisagree,
        "Privacy",
    ),
    (
        "Is genetic engineering in humans ethical?",
        QuestionType::TrueFalse,
        "Ethics",
    ),
];
