use crate::error::{Error, Result};
use crate::models::paper::{
    GradingOutcome, PaperState, PaperSummary, SubmittedAnswer, SubjectiveItemView,
};
use crate::models::user::{require_grader, UserTag};
use crate::services::grading_service::GradingService;
use crate::store::PaperStore;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Result of scoring one subjective item. When that score was the last one
/// outstanding, the paper finalizes in the same step and `outcome` carries
/// the final result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradeItemAck {
    pub paper_id: Uuid,
    pub item_id: String,
    pub pending_manual_grading_count: usize,
    pub finalized: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<GradingOutcome>,
}

/// Manual-review queue for graders: list parked papers, inspect their
/// subjective items, record scores.
#[derive(Clone)]
pub struct ReviewService {
    papers: Arc<PaperStore>,
    grading: GradingService,
}

impl ReviewService {
    pub fn new(papers: Arc<PaperStore>, grading: GradingService) -> Self {
        Self { papers, grading }
    }

    /// Papers awaiting manual review, oldest submission first.
    pub async fn list_pending(
        &self,
        tags: &[UserTag],
        skip: usize,
        limit: Option<usize>,
    ) -> Result<Vec<PaperSummary>> {
        require_grader(tags)?;
        let mut pending: Vec<PaperSummary> = self
            .papers
            .snapshot()
            .await
            .into_iter()
            .filter(|p| p.state == PaperState::AwaitingManualReview)
            .map(|p| p.summary())
            .collect();
        pending.sort_by(|a, b| a.submitted_at.cmp(&b.submitted_at));
        Ok(paginate(pending, skip, limit))
    }

    /// The subjective items of one parked paper, with the student's essay
    /// text alongside the reference material.
    pub async fn list_subjective_items(
        &self,
        tags: &[UserTag],
        paper_id: Uuid,
    ) -> Result<Vec<SubjectiveItemView>> {
        require_grader(tags)?;
        let cell = self.papers.get(paper_id)?;
        let paper = cell.lock().await;
        paper.check_integrity()?;
        Ok(paper
            .items
            .iter()
            .zip(paper.answers.iter())
            .filter(|(item, _)| item.is_subjective())
            .map(|(item, answer)| SubjectiveItemView {
                item_id: item.item_id.clone(),
                body: item.body.clone(),
                student_answer: match answer {
                    Some(SubmittedAnswer::One(text)) => Some(text.clone()),
                    _ => None,
                },
                reference_answer: item.reference_answer.clone(),
                scoring_criteria: item.scoring_criteria.clone(),
                max_points: item.points,
                manual_score: item.manual_score,
                grader_comment: item.grader_comment.clone(),
                graded: item.graded,
            })
            .collect())
    }

    /// Record a manual score for one subjective item. Re-grading an item on
    /// a still-parked paper overwrites the previous score; once the last
    /// item lands, the paper finalizes atomically under the same lock.
    pub async fn grade_item(
        &self,
        tags: &[UserTag],
        paper_id: Uuid,
        item_id: &str,
        score: Decimal,
        comment: Option<String>,
    ) -> Result<GradeItemAck> {
        require_grader(tags)?;
        let cell = self.papers.get(paper_id)?;
        let mut paper = cell.lock().await;
        paper.check_integrity()?;
        match paper.state {
            PaperState::AwaitingManualReview => {}
            PaperState::Finalized => {
                return Err(Error::AlreadyGraded(format!(
                    "paper {paper_id} is already graded"
                )))
            }
            _ => {
                return Err(Error::Forbidden(format!(
                    "paper {paper_id} has no pending manual review"
                )))
            }
        }

        let item = paper
            .find_item_mut(item_id)
            .filter(|i| i.is_subjective())
            .ok_or_else(|| {
                Error::NotFound(format!(
                    "paper {paper_id} has no subjective item '{item_id}'"
                ))
            })?;
        let max = Decimal::from(item.points);
        if score < Decimal::ZERO || score > max {
            return Err(Error::InvalidScore(format!(
                "score {score} is outside 0..={max}"
            )));
        }
        item.manual_score = Some(score);
        item.grader_comment = comment;
        item.graded = true;

        let pending = paper.pending_manual_count();
        let outcome = self.grading.finalize_if_ready(&mut paper);
        tracing::info!(
            %paper_id,
            item_id,
            %score,
            pending,
            finalized = outcome.is_some(),
            "subjective item graded"
        );
        Ok(GradeItemAck {
            paper_id,
            item_id: item_id.to_string(),
            pending_manual_grading_count: pending,
            finalized: outcome.is_some(),
            outcome,
        })
    }
}

fn paginate<T>(items: Vec<T>, skip: usize, limit: Option<usize>) -> Vec<T> {
    items
        .into_iter()
        .skip(skip)
        .take(limit.unwrap_or(usize::MAX))
        .collect()
}
