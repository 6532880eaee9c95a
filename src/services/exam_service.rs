use crate::config::Config;
use crate::error::{Error, Result};
use crate::models::paper::{
    ChoiceOption, ExamPaper, HistoryDetail, HistoryItem, HistoryQuestionView, Paper, PaperItem,
    PaperState, PaperSummary, ProgressAck, QuestionView, SubmittedAnswer,
};
use crate::models::question::{Question, QuestionDetails, QuestionType};
use crate::models::user::{require_admin, UserTag};
use crate::rate_limit::{LimitedAction, RateLimiter};
use crate::store::{BankStore, PaperStore};
use crate::utils::rng::SharedRng;
use crate::utils::time::Clock;
use crate::utils::token::random_hex_string;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::sync::Arc;
use uuid::Uuid;

/// Paper generation, in-progress answer saving and the read-side surfaces
/// (history for owners, full listing for admins).
#[derive(Clone)]
pub struct ExamService {
    config: Arc<Config>,
    banks: Arc<BankStore>,
    papers: Arc<PaperStore>,
    rng: Arc<SharedRng>,
    clock: Arc<dyn Clock>,
    limiter: Arc<RateLimiter>,
}

impl ExamService {
    pub fn new(
        config: Arc<Config>,
        banks: Arc<BankStore>,
        papers: Arc<PaperStore>,
        rng: Arc<SharedRng>,
        clock: Arc<dyn Clock>,
        limiter: Arc<RateLimiter>,
    ) -> Self {
        Self {
            config,
            banks,
            papers,
            rng,
            clock,
            limiter,
        }
    }

    /// Sample a fresh paper from the named bank. Question order, option
    /// order and option identifiers are all randomized here, once; the
    /// paper the user sees never changes afterwards.
    pub fn generate(
        &self,
        uid: &str,
        tags: &[UserTag],
        difficulty: &str,
        requested_count: Option<usize>,
        remote_addr: Option<&str>,
    ) -> Result<ExamPaper> {
        self.limiter.check(uid, LimitedAction::GetExam, tags)?;

        let bank = self.banks.get(difficulty)?;
        let available = bank.questions.len();
        let count = match requested_count {
            Some(n) => {
                if n < 1 || n > self.config.max_questions_per_paper {
                    return Err(Error::InsufficientQuestions(format!(
                        "requested count {n} is outside 1..={}",
                        self.config.max_questions_per_paper
                    )));
                }
                if n > available {
                    return Err(Error::InsufficientQuestions(format!(
                        "bank '{difficulty}' holds {available} questions, {n} requested"
                    )));
                }
                n
            }
            // Unspecified count falls back to the bank default, clamped to
            // what the bank actually holds.
            None => bank.metadata.default_questions.min(available),
        };
        if count == 0 {
            return Err(Error::InsufficientQuestions(format!(
                "bank '{difficulty}' has no questions to sample"
            )));
        }

        let items = self.rng.with(|rng| {
            let mut sampled: Vec<&Question> = bank.questions.iter().collect();
            sampled.shuffle(rng);
            sampled.truncate(count);
            sampled
                .into_iter()
                .map(|q| self.build_item(rng, q))
                .collect::<Result<Vec<PaperItem>>>()
        })?;

        let now = self.clock.now();
        let paper = Paper {
            paper_id: Uuid::new_v4(),
            user_uid: uid.to_string(),
            difficulty: difficulty.to_string(),
            created_at: now,
            creation_addr: remote_addr.map(str::to_string),
            answers: vec![None; items.len()],
            items,
            state: PaperState::Open,
            objective_score: None,
            score: None,
            score_percentage: None,
            pass_status: None,
            passcode: None,
            last_update_at: None,
            last_update_addr: None,
            submitted_at: None,
            submission_addr: None,
        };

        tracing::info!(
            uid,
            difficulty,
            paper_id = %paper.paper_id,
            questions = paper.items.len(),
            "generated paper"
        );

        let view = ExamPaper {
            paper_id: paper.paper_id,
            difficulty: paper.difficulty.clone(),
            questions: paper.items.iter().map(QuestionView::from_item).collect(),
        };
        self.papers.insert(paper);
        Ok(view)
    }

    fn build_item(&self, rng: &mut StdRng, question: &Question) -> Result<PaperItem> {
        let item_id = random_hex_string(rng, self.config.generated_code_length_bytes);
        let mut item = PaperItem {
            item_id,
            body: question.body.clone(),
            question_type: question.question_type,
            points: question.points,
            options: Vec::new(),
            correct_option_ids: Vec::new(),
            accepted_answers: Vec::new(),
            reference_answer: None,
            scoring_criteria: None,
            manual_score: None,
            grader_comment: None,
            graded: false,
        };

        match (&question.details, question.question_type) {
            (QuestionDetails::Choice(details), kind) if kind.has_options() => {
                let correct_n = if kind == QuestionType::SingleChoice {
                    1
                } else {
                    details.correct_to_present
                };
                let incorrect_n = self.config.num_incorrect_choices_to_select;
                if details.correct_choices.len() < correct_n {
                    return Err(Error::InsufficientOptions(format!(
                        "question needs {correct_n} correct options, bank holds {}",
                        details.correct_choices.len()
                    )));
                }
                if details.incorrect_choices.len() < incorrect_n {
                    return Err(Error::InsufficientOptions(format!(
                        "question needs {incorrect_n} incorrect options, bank holds {}",
                        details.incorrect_choices.len()
                    )));
                }

                let mut options = Vec::with_capacity(correct_n + incorrect_n);
                for text in details.correct_choices.choose_multiple(rng, correct_n) {
                    let id = random_hex_string(rng, self.config.generated_code_length_bytes);
                    item.correct_option_ids.push(id.clone());
                    options.push(ChoiceOption {
                        id,
                        text: text.clone(),
                    });
                }
                for text in details.incorrect_choices.choose_multiple(rng, incorrect_n) {
                    options.push(ChoiceOption {
                        id: random_hex_string(rng, self.config.generated_code_length_bytes),
                        text: text.clone(),
                    });
                }
                options.shuffle(rng);
                item.options = options;
            }
            (QuestionDetails::FillInBlank(details), QuestionType::FillInBlank) => {
                item.accepted_answers = details.answers.clone();
            }
            (QuestionDetails::Essay(details), QuestionType::Essay) => {
                item.reference_answer = details.reference_answer.clone();
                item.scoring_criteria = details.scoring_criteria.clone();
            }
            _ => {
                return Err(Error::CorruptState(format!(
                    "question '{}' has details that do not match its type",
                    question.body
                )));
            }
        }
        Ok(item)
    }

    /// Overwrite the saved answer sheet of an open paper. Idempotent; each
    /// call replaces the previous snapshot wholesale.
    pub async fn save_progress(
        &self,
        uid: &str,
        paper_id: Uuid,
        answers: Vec<Option<SubmittedAnswer>>,
        remote_addr: Option<&str>,
    ) -> Result<ProgressAck> {
        let cell = self.papers.get(paper_id)?;
        let mut paper = cell.lock().await;
        paper.check_integrity()?;
        if paper.user_uid != uid {
            return Err(Error::Forbidden(format!(
                "paper {paper_id} belongs to another user"
            )));
        }
        // Progress saves stop at submission; every later state rejects the
        // same way.
        if paper.state != PaperState::Open {
            return Err(Error::AlreadyFinalized(format!(
                "paper {paper_id} is already submitted"
            )));
        }
        if answers.len() != paper.items.len() {
            return Err(Error::InvalidAnswerLength(format!(
                "expected {} answer slots, got {}",
                paper.items.len(),
                answers.len()
            )));
        }

        let now = self.clock.now();
        paper.answers = answers;
        paper.last_update_at = Some(now);
        paper.last_update_addr = remote_addr.map(str::to_string);
        Ok(ProgressAck {
            paper_id,
            last_update_at: now,
        })
    }

    /// Papers of one user, newest first.
    pub async fn list_history(&self, uid: &str) -> Vec<HistoryItem> {
        let mut papers: Vec<Paper> = self
            .papers
            .snapshot()
            .await
            .into_iter()
            .filter(|p| p.user_uid == uid)
            .collect();
        papers.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        papers
            .into_iter()
            .map(|p| HistoryItem {
                paper_id: p.paper_id,
                difficulty: p.difficulty.clone(),
                state: p.state,
                score: p.score,
                score_percentage: p.score_percentage,
                pass_status: p.pass_status,
                submitted_at: p.submitted_at,
                pending_manual_grading_count: p.pending_manual_count(),
            })
            .collect()
    }

    /// Owner's detailed view of one paper. Reference answers stay hidden
    /// until the paper is finalized.
    pub async fn history_detail(&self, uid: &str, paper_id: Uuid) -> Result<HistoryDetail> {
        let cell = self.papers.get(paper_id)?;
        let paper = cell.lock().await;
        if paper.user_uid != uid {
            return Err(Error::Forbidden(format!(
                "paper {paper_id} belongs to another user"
            )));
        }
        let finalized = paper.state == PaperState::Finalized;
        let questions = paper
            .items
            .iter()
            .zip(paper.answers.iter())
            .map(|(item, answer)| HistoryQuestionView {
                item_id: item.item_id.clone(),
                body: item.body.clone(),
                question_type: item.question_type,
                options: if item.question_type.has_options() {
                    Some(item.options.clone())
                } else {
                    None
                },
                submitted_answer: answer.clone(),
                reference_answer: if finalized {
                    item.reference_answer.clone()
                } else {
                    None
                },
                manual_score: item.manual_score,
                grader_comment: item.grader_comment.clone(),
                graded: item.graded,
            })
            .collect();
        Ok(HistoryDetail {
            paper_id: paper.paper_id,
            user_uid: paper.user_uid.clone(),
            difficulty: paper.difficulty.clone(),
            state: paper.state,
            questions,
            score: paper.score,
            score_percentage: paper.score_percentage,
            pass_status: paper.pass_status,
            passcode: paper.passcode.clone(),
            submitted_at: paper.submitted_at,
            pending_manual_grading_count: paper.pending_manual_count(),
        })
    }

    pub async fn admin_list(
        &self,
        tags: &[UserTag],
        skip: usize,
        limit: Option<usize>,
    ) -> Result<Vec<PaperSummary>> {
        require_admin(tags)?;
        let mut papers = self.papers.snapshot().await;
        papers.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(papers
            .iter()
            .map(Paper::summary)
            .skip(skip)
            .take(limit.unwrap_or(usize::MAX))
            .collect())
    }

    pub async fn admin_detail(&self, tags: &[UserTag], paper_id: Uuid) -> Result<Paper> {
        require_admin(tags)?;
        let cell = self.papers.get(paper_id)?;
        let paper = cell.lock().await;
        Ok(paper.clone())
    }

    pub fn admin_delete(&self, tags: &[UserTag], paper_id: Uuid) -> Result<()> {
        require_admin(tags)?;
        self.papers.remove(paper_id)?;
        tracing::info!(%paper_id, "paper deleted by admin");
        Ok(())
    }
}
