use crate::error::{Error, Result};
use crate::models::question::{BankMetadata, Question, QuestionBank};
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory question bank registry, keyed by bank id (the difficulty
/// label). Mutations keep the metadata question count in step with the
/// question list.
#[derive(Default)]
pub struct BankStore {
    banks: RwLock<HashMap<String, QuestionBank>>,
}

impl BankStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_from(&self, loaded: Vec<QuestionBank>) {
        let mut banks = self.banks.write().expect("bank store lock poisoned");
        banks.clear();
        for bank in loaded {
            banks.insert(bank.metadata.id.clone(), bank);
        }
    }

    pub fn list_metadata(&self) -> Vec<BankMetadata> {
        let banks = self.banks.read().expect("bank store lock poisoned");
        let mut out: Vec<BankMetadata> = banks.values().map(|b| b.metadata.clone()).collect();
        out.sort_by(|a, b| a.id.cmp(&b.id));
        out
    }

    pub fn get(&self, bank_id: &str) -> Result<QuestionBank> {
        let banks = self.banks.read().expect("bank store lock poisoned");
        banks
            .get(bank_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("question bank '{bank_id}' does not exist")))
    }

    /// Append a question and bump the metadata count. Returns the updated
    /// bank so the caller can persist it.
    pub fn add_question(&self, bank_id: &str, question: Question) -> Result<QuestionBank> {
        let mut banks = self.banks.write().expect("bank store lock poisoned");
        let bank = banks
            .get_mut(bank_id)
            .ok_or_else(|| Error::NotFound(format!("question bank '{bank_id}' does not exist")))?;
        bank.questions.push(question);
        bank.metadata.total_questions = bank.questions.len();
        Ok(bank.clone())
    }

    /// Remove the question at `index` and bump the metadata count down.
    pub fn remove_question(&self, bank_id: &str, index: usize) -> Result<QuestionBank> {
        let mut banks = self.banks.write().expect("bank store lock poisoned");
        let bank = banks
            .get_mut(bank_id)
            .ok_or_else(|| Error::NotFound(format!("question bank '{bank_id}' does not exist")))?;
        if index >= bank.questions.len() {
            return Err(Error::NotFound(format!(
                "question bank '{bank_id}' has no question at index {index}"
            )));
        }
        bank.questions.remove(index);
        bank.metadata.total_questions = bank.questions.len();
        Ok(bank.clone())
    }
}
