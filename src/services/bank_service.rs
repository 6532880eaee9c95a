use crate::error::Result;
use crate::models::question::{BankMetadata, Question};
use crate::models::user::{require_admin, UserTag};
use crate::store::{BankStore, DurableStore};
use std::sync::Arc;

/// Question bank administration. The public listing exposes metadata only;
/// bank contents never leave the server unsampled.
#[derive(Clone)]
pub struct BankService {
    banks: Arc<BankStore>,
    durable: Arc<dyn DurableStore>,
}

impl BankService {
    pub fn new(banks: Arc<BankStore>, durable: Arc<dyn DurableStore>) -> Self {
        Self { banks, durable }
    }

    /// Available difficulties with their sizes and defaults.
    pub fn list_difficulties(&self) -> Vec<BankMetadata> {
        self.banks.list_metadata()
    }

    pub fn add_question(
        &self,
        tags: &[UserTag],
        bank_id: &str,
        question: Question,
    ) -> Result<BankMetadata> {
        require_admin(tags)?;
        let bank = self.banks.add_question(bank_id, question)?;
        self.durable.persist_question_bank(&bank)?;
        tracing::info!(
            bank_id,
            total = bank.metadata.total_questions,
            "question added to bank"
        );
        Ok(bank.metadata)
    }

    pub fn remove_question(
        &self,
        tags: &[UserTag],
        bank_id: &str,
        index: usize,
    ) -> Result<BankMetadata> {
        require_admin(tags)?;
        let bank = self.banks.remove_question(bank_id, index)?;
        self.durable.persist_question_bank(&bank)?;
        tracing::info!(
            bank_id,
            index,
            total = bank.metadata.total_questions,
            "question removed from bank"
        );
        Ok(bank.metadata)
    }
}
