use serde::{Deserialize, Serialize};

/// A question bank entry. Immutable once loaded; owned by the bank store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub body: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    #[serde(default = "default_points")]
    pub points: i32,
    #[serde(flatten)]
    pub details: QuestionDetails,
}

fn default_points() -> i32 {
    1
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    SingleChoice,
    MultiChoice,
    FillInBlank,
    Essay,
}

impl QuestionType {
    /// Subjective items are resolved by a human grader, not the engine.
    pub fn is_subjective(self) -> bool {
        matches!(self, QuestionType::Essay)
    }

    pub fn has_options(self) -> bool {
        matches!(self, QuestionType::SingleChoice | QuestionType::MultiChoice)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QuestionDetails {
    Choice(ChoiceDetails),
    FillInBlank(FillInBlankDetails),
    Essay(EssayDetails),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChoiceDetails {
    pub correct_choices: Vec<String>,
    pub incorrect_choices: Vec<String>,
    /// How many correct options to put on the paper. Single-choice banks
    /// leave this at 1.
    #[serde(default = "default_correct_to_present")]
    pub correct_to_present: usize,
    pub explanation: Option<String>,
}

fn default_correct_to_present() -> usize {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FillInBlankDetails {
    /// Accepted answer per blank, in order.
    pub answers: Vec<String>,
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EssayDetails {
    pub reference_answer: Option<String>,
    pub scoring_criteria: Option<String>,
}

/// Per-bank metadata served by the public difficulty listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankMetadata {
    pub id: String,
    pub name: String,
    pub description: String,
    pub default_questions: usize,
    pub total_questions: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionBank {
    pub metadata: BankMetadata,
    pub questions: Vec<Question>,
}
