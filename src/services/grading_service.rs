use crate::config::Config;
use crate::error::{Error, Result};
use crate::models::paper::{
    GradingOutcome, GradingStatus, Paper, PaperItem, PaperState, PassStatus, SubmittedAnswer,
};
use crate::models::question::QuestionType;
use crate::store::PaperStore;
use crate::utils::rng::SharedRng;
use crate::utils::time::Clock;
use crate::utils::token::random_hex_string;
use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

/// Two-phase grading: the objective portion is scored synchronously at
/// submission, subjective items park the paper until every one of them has
/// a manual score, at which point the final result is computed.
#[derive(Clone)]
pub struct GradingService {
    config: Arc<Config>,
    papers: Arc<PaperStore>,
    rng: Arc<SharedRng>,
    clock: Arc<dyn Clock>,
}

impl GradingService {
    pub fn new(
        config: Arc<Config>,
        papers: Arc<PaperStore>,
        rng: Arc<SharedRng>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            papers,
            rng,
            clock,
        }
    }

    /// Submit a final answer sheet. On success the paper is either fully
    /// graded or parked for manual review; on any validation error the
    /// paper stays open and untouched.
    pub async fn submit(
        &self,
        uid: &str,
        paper_id: Uuid,
        answers: Vec<Option<SubmittedAnswer>>,
        remote_addr: Option<&str>,
    ) -> Result<GradingOutcome> {
        let cell = self.papers.get(paper_id)?;
        let mut paper = cell.lock().await;
        paper.check_integrity()?;
        if paper.user_uid != uid {
            return Err(Error::Forbidden(format!(
                "paper {paper_id} belongs to another user"
            )));
        }
        match paper.state {
            PaperState::Open => {}
            PaperState::Finalized => {
                return Err(Error::AlreadyGraded(format!(
                    "paper {paper_id} is already graded"
                )))
            }
            _ => {
                return Err(Error::AlreadyFinalized(format!(
                    "paper {paper_id} is already submitted"
                )))
            }
        }
        if answers.len() != paper.items.len() {
            return Err(Error::InvalidAnswerLength(format!(
                "expected {} answer slots, got {}",
                paper.items.len(),
                answers.len()
            )));
        }

        paper.answers = answers;
        paper.submitted_at = Some(self.clock.now());
        paper.submission_addr = remote_addr.map(str::to_string);
        paper.state = PaperState::SubmittedAutoGrading;

        let objective: i64 = paper
            .items
            .iter()
            .zip(paper.answers.iter())
            .filter(|(item, _)| !item.is_subjective())
            .map(|(item, answer)| score_objective_item(item, answer.as_ref()))
            .sum();
        paper.objective_score = Some(Decimal::from(objective));

        let pending = paper.pending_manual_count();
        if pending > 0 {
            paper.state = PaperState::AwaitingManualReview;
            tracing::info!(
                %paper_id,
                uid,
                pending,
                "paper parked for manual review"
            );
            return Ok(GradingOutcome {
                status: GradingStatus::PendingReview,
                score: None,
                score_percentage: None,
                passcode: None,
                pending_manual_grading_count: pending,
            });
        }
        Ok(self.finish_grading(&mut paper))
    }

    /// Complete a paper whose manual reviews have all landed. Must be
    /// called with the paper's cell lock held, so the check and the state
    /// change are one atomic step.
    pub fn finalize_if_ready(&self, paper: &mut Paper) -> Option<GradingOutcome> {
        if paper.state != PaperState::AwaitingManualReview || paper.pending_manual_count() > 0 {
            return None;
        }
        Some(self.finish_grading(paper))
    }

    fn finish_grading(&self, paper: &mut Paper) -> GradingOutcome {
        let objective = paper.objective_score.unwrap_or_default();
        let manual: Decimal = paper
            .items
            .iter()
            .filter(|i| i.is_subjective())
            .filter_map(|i| i.manual_score)
            .sum();
        let total = objective + manual;
        let max = Decimal::from(paper.max_points());
        let percentage = if max > Decimal::ZERO {
            (total / max * Decimal::from(100))
                .round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero)
        } else {
            Decimal::ZERO
        };
        let passed = percentage >= self.config.passing_score_percentage;

        paper.score = Some(total);
        paper.score_percentage = Some(percentage);
        paper.pass_status = Some(if passed {
            PassStatus::Passed
        } else {
            PassStatus::Failed
        });
        if passed {
            paper.passcode = Some(self.issue_passcode());
        }
        paper.state = PaperState::Finalized;

        tracing::info!(
            paper_id = %paper.paper_id,
            uid = %paper.user_uid,
            %total,
            %percentage,
            passed,
            "paper finalized"
        );
        GradingOutcome {
            status: if passed {
                GradingStatus::Passed
            } else {
                GradingStatus::Failed
            },
            score: Some(total),
            score_percentage: Some(percentage),
            passcode: paper.passcode.clone(),
            pending_manual_grading_count: 0,
        }
    }

    /// Generate a passcode no other paper has been issued. Collisions are
    /// resolved by drawing again against the global registry.
    fn issue_passcode(&self) -> String {
        loop {
            let code = self
                .rng
                .with(|rng| random_hex_string(rng, self.config.generated_code_length_bytes));
            if self.papers.register_passcode(&code) {
                return code;
            }
        }
    }
}

fn score_objective_item(item: &PaperItem, answer: Option<&SubmittedAnswer>) -> i64 {
    let Some(answer) = answer else {
        return 0;
    };
    let correct = match (item.question_type, answer) {
        (QuestionType::SingleChoice, SubmittedAnswer::One(chosen)) => {
            item.correct_option_ids.len() == 1 && *chosen == item.correct_option_ids[0]
        }
        (QuestionType::MultiChoice, SubmittedAnswer::Many(chosen)) => {
            let chosen: HashSet<&str> = chosen.iter().map(String::as_str).collect();
            let expected: HashSet<&str> = item.correct_option_ids.iter().map(String::as_str).collect();
            chosen == expected
        }
        (QuestionType::FillInBlank, SubmittedAnswer::Many(blanks)) => {
            blanks.len() == item.accepted_answers.len()
                && blanks
                    .iter()
                    .zip(item.accepted_answers.iter())
                    .all(|(given, expected)| normalize(given) == normalize(expected))
        }
        // Wrong answer shape for the item type scores zero.
        _ => false,
    };
    if correct {
        item.points as i64
    } else {
        0
    }
}

/// Fill-in comparison ignores case and surrounding whitespace.
fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn choice_item(kind: QuestionType, correct_ids: &[&str], points: i32) -> PaperItem {
        PaperItem {
            item_id: "item1".to_string(),
            body: "q".to_string(),
            question_type: kind,
            points,
            options: Vec::new(),
            correct_option_ids: correct_ids.iter().map(|s| s.to_string()).collect(),
            accepted_answers: Vec::new(),
            reference_answer: None,
            scoring_criteria: None,
            manual_score: None,
            grader_comment: None,
            graded: false,
        }
    }

    #[test]
    fn single_choice_scores_on_id_match() {
        let item = choice_item(QuestionType::SingleChoice, &["aa"], 2);
        let right = SubmittedAnswer::One("aa".to_string());
        let wrong = SubmittedAnswer::One("bb".to_string());
        assert_eq!(score_objective_item(&item, Some(&right)), 2);
        assert_eq!(score_objective_item(&item, Some(&wrong)), 0);
        assert_eq!(score_objective_item(&item, None), 0);
    }

    #[test]
    fn multi_choice_requires_the_exact_set() {
        let item = choice_item(QuestionType::MultiChoice, &["a", "b"], 3);
        let exact = SubmittedAnswer::Many(vec!["b".to_string(), "a".to_string()]);
        let subset = SubmittedAnswer::Many(vec!["a".to_string()]);
        let superset =
            SubmittedAnswer::Many(vec!["a".to_string(), "b".to_string(), "c".to_string()]);
        assert_eq!(score_objective_item(&item, Some(&exact)), 3);
        assert_eq!(score_objective_item(&item, Some(&subset)), 0);
        assert_eq!(score_objective_item(&item, Some(&superset)), 0);
    }

    #[test]
    fn fill_in_blank_normalizes_case_and_whitespace() {
        let mut item = choice_item(QuestionType::FillInBlank, &[], 1);
        item.accepted_answers = vec!["Paris".to_string(), "Rome".to_string()];
        let ok = SubmittedAnswer::Many(vec!["  paris ".to_string(), "ROME".to_string()]);
        let bad_order = SubmittedAnswer::Many(vec!["rome".to_string(), "paris".to_string()]);
        let short = SubmittedAnswer::Many(vec!["paris".to_string()]);
        assert_eq!(score_objective_item(&item, Some(&ok)), 1);
        assert_eq!(score_objective_item(&item, Some(&bad_order)), 0);
        assert_eq!(score_objective_item(&item, Some(&short)), 0);
    }

    #[test]
    fn mismatched_answer_shape_scores_zero() {
        let item = choice_item(QuestionType::SingleChoice, &["aa"], 2);
        let many = SubmittedAnswer::Many(vec!["aa".to_string()]);
        assert_eq!(score_objective_item(&item, Some(&many)), 0);
    }
}
