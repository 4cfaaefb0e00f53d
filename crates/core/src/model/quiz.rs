use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::certificate::CertificateRef;
use crate::model::ids::{QuestionId, QuizId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizError {
    #[error("passing score must be between 0 and 100, got {0}")]
    InvalidPassingScore(u32),

    #[error("question {0} appears more than once")]
    DuplicateQuestion(QuestionId),
}

//
// ─── QUESTIONS ─────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionType {
    #[serde(alias = "multiple_choice")]
    MultipleChoice,
    #[serde(alias = "true_false")]
    TrueFalse,
    #[serde(alias = "short_answer")]
    ShortAnswer,
    Coding,
}

/// A learner's answer to one question.
///
/// Multiple choice answers are the selected option index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Bool(bool),
    Choice(u32),
    Text(String),
}

impl AnswerValue {
    /// Blank text is treated the same as no answer at all.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        matches!(self, AnswerValue::Text(text) if text.trim().is_empty())
    }
}

/// A question as seen by the client. The answer key never reaches this type.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    #[serde(alias = "_id")]
    id: QuestionId,
    #[serde(alias = "question")]
    text: String,
    #[serde(rename = "type")]
    kind: QuestionType,
    #[serde(default)]
    options: Vec<String>,
    #[serde(default = "default_points")]
    points: u32,
}

fn default_points() -> u32 {
    1
}

impl Question {
    #[must_use]
    pub fn new(id: QuestionId, text: impl Into<String>, kind: QuestionType) -> Self {
        Self {
            id,
            text: text.into(),
            kind,
            options: Vec::new(),
            points: 1,
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: Vec<String>) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn with_points(mut self, points: u32) -> Self {
        self.points = points;
        self
    }

    #[must_use]
    pub fn id(&self) -> &QuestionId {
        &self.id
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
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn points(&self) -> u32 {
        self.points
    }

    /// Whether `answer` has the right shape for this question.
    ///
    /// This is a completeness check only; correctness is decided by the server.
    #[must_use]
    pub fn accepts(&self, answer: &AnswerValue) -> bool {
        match (self.kind, answer) {
            (QuestionType::MultipleChoice, AnswerValue::Choice(index)) => {
                self.options.is_empty() || (*index as usize) < self.options.len()
            }
            (QuestionType::TrueFalse, AnswerValue::Bool(_)) => true,
            (QuestionType::ShortAnswer | QuestionType::Coding, AnswerValue::Text(text)) => {
                !text.trim().is_empty()
            }
            _ => false,
        }
    }
}

//
// ─── QUIZ ──────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "QuizRecord")]
pub struct Quiz {
    id: QuizId,
    title: String,
    questions: Vec<Question>,
    passing_score: u8,
    time_limit_minutes: Option<u32>,
    max_retakes: Option<u32>,
}

impl Quiz {
    /// Creates a quiz.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::InvalidPassingScore` when the score exceeds 100 and
    /// `QuizError::DuplicateQuestion` when a question id repeats.
    pub fn new(
        id: QuizId,
        title: impl Into<String>,
        questions: Vec<Question>,
        passing_score: u32,
    ) -> Result<Self, QuizError> {
        let passing_score =
            u8::try_from(passing_score).map_err(|_| QuizError::InvalidPassingScore(passing_score))?;
        if passing_score > 100 {
            return Err(QuizError::InvalidPassingScore(u32::from(passing_score)));
        }
        for (index, question) in questions.iter().enumerate() {
            if questions[..index].iter().any(|q| q.id == question.id) {
                return Err(QuizError::DuplicateQuestion(question.id.clone()));
            }
        }

        Ok(Self {
            id,
            title: title.into(),
            questions,
            passing_score,
            time_limit_minutes: None,
            max_retakes: None,
        })
    }

    #[must_use]
    pub fn with_time_limit_minutes(mut self, minutes: u32) -> Self {
        self.time_limit_minutes = Some(minutes);
        self
    }

    #[must_use]
    pub fn with_max_retakes(mut self, max: u32) -> Self {
        self.max_retakes = Some(max);
        self
    }

    #[must_use]
    pub fn id(&self) -> &QuizId {
        &self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn passing_score(&self) -> u8 {
        self.passing_score
    }

    #[must_use]
    pub fn time_limit_minutes(&self) -> Option<u32> {
        self.time_limit_minutes
    }

    #[must_use]
    pub fn max_retakes(&self) -> Option<u32> {
        self.max_retakes
    }

    #[must_use]
    pub fn total_points(&self) -> u32 {
        self.questions.iter().map(Question::points).sum()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuizRecord {
    #[serde(alias = "_id")]
    id: QuizId,
    #[serde(default)]
    title: String,
    #[serde(default)]
    questions: Vec<Question>,
    passing_score: u32,
    #[serde(default, alias = "timeLimit")]
    time_limit_minutes: Option<u32>,
    #[serde(default)]
    max_retakes: Option<u32>,
}

impl TryFrom<QuizRecord> for Quiz {
    type Error = QuizError;

    fn try_from(record: QuizRecord) -> Result<Self, Self::Error> {
        let mut quiz = Quiz::new(record.id, record.title, record.questions, record.passing_score)?;
        quiz.time_limit_minutes = record.time_limit_minutes;
        quiz.max_retakes = record.max_retakes;
        Ok(quiz)
    }
}

/// The quiz endpoint returns the quiz either wrapped as `{ quiz: … }` or bare.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum QuizPayload {
    Wrapped { quiz: Quiz },
    Bare(Quiz),
}

impl QuizPayload {
    #[must_use]
    pub fn into_quiz(self) -> Quiz {
        match self {
            QuizPayload::Wrapped { quiz } | QuizPayload::Bare(quiz) => quiz,
        }
    }
}

//
// ─── ANSWER SHEET ──────────────────────────────────────────────────────────────
//

/// One entry of the submission body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedAnswer {
    pub question_id: QuestionId,
    pub answer: AnswerValue,
}

/// Answers collected during one attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnswerSheet {
    answers: BTreeMap<QuestionId, AnswerValue>,
}

impl AnswerSheet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an answer, replacing any previous one. Blank answers clear it.
    pub fn set(&mut self, question: QuestionId, answer: AnswerValue) {
        if answer.is_blank() {
            self.answers.remove(&question);
        } else {
            self.answers.insert(question, answer);
        }
    }

    pub fn clear(&mut self) {
        self.answers.clear();
    }

    #[must_use]
    pub fn get(&self, question: &QuestionId) -> Option<&AnswerValue> {
        self.answers.get(question)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.answers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }

    /// Questions of `quiz` without an acceptable answer, in quiz order.
    #[must_use]
    pub fn missing(&self, quiz: &Quiz) -> Vec<QuestionId> {
        quiz.questions()
            .iter()
            .filter(|q| !self.answers.get(q.id()).is_some_and(|a| q.accepts(a)))
            .map(|q| q.id().clone())
            .collect()
    }

    #[must_use]
    pub fn is_complete(&self, quiz: &Quiz) -> bool {
        self.missing(quiz).is_empty()
    }

    /// Submission body in quiz question order. Answers to unknown questions are dropped.
    #[must_use]
    pub fn to_submission(&self, quiz: &Quiz) -> Vec<SubmittedAnswer> {
        quiz.questions()
            .iter()
            .filter_map(|q| {
                self.answers.get(q.id()).map(|answer| SubmittedAnswer {
                    question_id: q.id().clone(),
                    answer: answer.clone(),
                })
            })
            .collect()
    }
}

//
// ─── SUBMISSION RESULT ─────────────────────────────────────────────────────────
//

/// Per-question feedback from the server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionFeedback {
    pub question_id: QuestionId,
    #[serde(alias = "correct")]
    pub is_correct: bool,
    #[serde(default)]
    pub user_answer: Option<AnswerValue>,
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default)]
    pub points_earned: Option<u32>,
}

/// Authoritative grading result. The client never recomputes any of it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizOutcome {
    pub score: u32,
    pub max_score: u32,
    pub passed: bool,
    #[serde(default)]
    pub attempt_count: u32,
    #[serde(default)]
    pub results: Vec<QuestionFeedback>,
    #[serde(default)]
    pub certificate: Option<CertificateRef>,
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
