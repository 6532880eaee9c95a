use crate::error::{Error, Result};
use crate::models::question::QuestionType;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of a paper. Transitions only move forward:
/// `Open -> SubmittedAutoGrading -> {AwaitingManualReview | Finalized}`,
/// `AwaitingManualReview -> Finalized`. `Finalized` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaperState {
    Open,
    SubmittedAutoGrading,
    AwaitingManualReview,
    Finalized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PassStatus {
    Passed,
    Failed,
}

/// One selectable option as presented to the user. The identifier is opaque
/// and freshly generated per paper; correctness lives only in
/// `PaperItem::correct_option_ids`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChoiceOption {
    pub id: String,
    pub text: String,
}

/// Snapshot of one sampled question inside a paper. Option order is fixed at
/// generation time (shuffled once, then stable).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperItem {
    pub item_id: String,
    pub body: String,
    pub question_type: QuestionType,
    pub points: i32,
    /// Shuffled correct + incorrect options; empty for non-choice items.
    pub options: Vec<ChoiceOption>,
    /// Server-side answer key. Never exposed through client views.
    pub correct_option_ids: Vec<String>,
    /// Accepted answer per blank for fill-in items, in order.
    pub accepted_answers: Vec<String>,
    pub reference_answer: Option<String>,
    pub scoring_criteria: Option<String>,
    // Manual-grading fields, meaningful for subjective items only.
    pub manual_score: Option<Decimal>,
    pub grader_comment: Option<String>,
    pub graded: bool,
}

impl PaperItem {
    pub fn is_subjective(&self) -> bool {
        self.question_type.is_subjective()
    }
}

/// A user's answer to one item. A single string covers single-choice ids and
/// essay text; a list covers multi-choice id sets and fill-in blanks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SubmittedAnswer {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paper {
    pub paper_id: Uuid,
    pub user_uid: String,
    pub difficulty: String,
    pub created_at: DateTime<Utc>,
    pub creation_addr: Option<String>,
    pub items: Vec<PaperItem>,
    /// One slot per item, nullable until answered.
    pub answers: Vec<Option<SubmittedAnswer>>,
    pub state: PaperState,
    /// Objective portion, held between submission and final scoring of a
    /// paper that went to manual review.
    pub objective_score: Option<Decimal>,
    pub score: Option<Decimal>,
    pub score_percentage: Option<Decimal>,
    pub pass_status: Option<PassStatus>,
    pub passcode: Option<String>,
    pub last_update_at: Option<DateTime<Utc>>,
    pub last_update_addr: Option<String>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub submission_addr: Option<String>,
}

impl Paper {
    pub fn subjective_count(&self) -> usize {
        self.items.iter().filter(|i| i.is_subjective()).count()
    }

    /// Ungraded subjective items; zero means the paper can be finalized.
    pub fn pending_manual_count(&self) -> usize {
        self.items
            .iter()
            .filter(|i| i.is_subjective() && !i.graded)
            .count()
    }

    pub fn max_points(&self) -> i64 {
        self.items.iter().map(|i| i.points as i64).sum()
    }

    pub fn find_item_mut(&mut self, item_id: &str) -> Option<&mut PaperItem> {
        self.items.iter_mut().find(|i| i.item_id == item_id)
    }

    /// Structural invariant check, run before any read-modify-write. A
    /// mismatch means the stored record was corrupted, not a caller mistake.
    pub fn check_integrity(&self) -> Result<()> {
        if self.answers.len() != self.items.len() {
            return Err(Error::CorruptState(format!(
                "paper {}: {} answer slots for {} items",
                self.paper_id,
                self.answers.len(),
                self.items.len()
            )));
        }
        Ok(())
    }

    pub fn summary(&self) -> PaperSummary {
        PaperSummary {
            paper_id: self.paper_id,
            user_uid: self.user_uid.clone(),
            difficulty: self.difficulty.clone(),
            state: self.state,
            created_at: self.created_at,
            submitted_at: self.submitted_at,
            subjective_count: self.subjective_count(),
            pending_manual_grading_count: self.pending_manual_count(),
        }
    }
}

// ---- client-facing views -------------------------------------------------

/// Answerable view of one item: body and options only, no correctness data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionView {
    pub item_id: String,
    pub body: String,
    pub question_type: QuestionType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<ChoiceOption>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blank_count: Option<usize>,
}

impl QuestionView {
    pub fn from_item(item: &PaperItem) -> Self {
        Self {
            item_id: item.item_id.clone(),
            body: item.body.clone(),
            question_type: item.question_type,
            options: if item.question_type.has_options() {
                Some(item.options.clone())
            } else {
                None
            },
            blank_count: if item.question_type == QuestionType::FillInBlank {
                Some(item.accepted_answers.len())
            } else {
                None
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamPaper {
    pub paper_id: Uuid,
    pub difficulty: String,
    pub questions: Vec<QuestionView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressAck {
    pub paper_id: Uuid,
    pub last_update_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GradingStatus {
    PendingReview,
    Passed,
    Failed,
}

/// Canonical grading result. Score fields stay `None` until the paper is
/// fully finalized; a pending paper carries only the review count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradingOutcome {
    pub status: GradingStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score_percentage: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passcode: Option<String>,
    pub pending_manual_grading_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperSummary {
    pub paper_id: Uuid,
    pub user_uid: String,
    pub difficulty: String,
    pub state: PaperState,
    pub created_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub subjective_count: usize,
    pub pending_manual_grading_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryItem {
    pub paper_id: Uuid,
    pub difficulty: String,
    pub state: PaperState,
    pub score: Option<Decimal>,
    pub score_percentage: Option<Decimal>,
    pub pass_status: Option<PassStatus>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub pending_manual_grading_count: usize,
}

/// Owner's view of one answered item in a past paper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryQuestionView {
    pub item_id: String,
    pub body: String,
    pub question_type: QuestionType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<ChoiceOption>>,
    pub submitted_answer: Option<SubmittedAnswer>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manual_score: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grader_comment: Option<String>,
    pub graded: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryDetail {
    pub paper_id: Uuid,
    pub user_uid: String,
    pub difficulty: String,
    pub state: PaperState,
    pub questions: Vec<HistoryQuestionView>,
    pub score: Option<Decimal>,
    pub score_percentage: Option<Decimal>,
    pub pass_status: Option<PassStatus>,
    pub passcode: Option<String>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub pending_manual_grading_count: usize,
}

/// What a grader sees for one subjective item awaiting review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectiveItemView {
    pub item_id: String,
    pub body: String,
    pub student_answer: Option<String>,
    pub reference_answer: Option<String>,
    pub scoring_criteria: Option<String>,
    pub max_points: i32,
    pub manual_score: Option<Decimal>,
    pub grader_comment: Option<String>,
    pub graded: bool,
}
