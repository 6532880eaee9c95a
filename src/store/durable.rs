use crate::error::Result;
use crate::models::paper::Paper;
use crate::models::question::QuestionBank;
use std::collections::HashMap;
use std::sync::Mutex;

/// Durable backing storage for papers and question banks. Implementations
/// take full snapshots; the in-memory stores remain the source of truth
/// while the process is up.
pub trait DurableStore: Send + Sync {
    fn load_papers(&self) -> Result<Vec<Paper>>;
    fn persist_papers(&self, papers: &[Paper]) -> Result<()>;
    fn load_question_banks(&self) -> Result<Vec<QuestionBank>>;
    fn persist_question_bank(&self, bank: &QuestionBank) -> Result<()>;
}

/// Keyspace-per-kind store over an in-process map of JSON blobs. Used in
/// tests and as the default backend when no external storage is wired in.
#[derive(Default)]
pub struct InMemoryDurableStore {
    records: Mutex<HashMap<String, String>>,
}

impl InMemoryDurableStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn bank_key(id: &str) -> String {
        format!("bank:{id}")
    }
}

impl DurableStore for InMemoryDurableStore {
    fn load_papers(&self) -> Result<Vec<Paper>> {
        let records = self.records.lock().expect("durable store lock poisoned");
        match records.get("papers") {
            Some(raw) => Ok(serde_json::from_str(raw)?),
            None => Ok(Vec::new()),
        }
    }

    fn persist_papers(&self, papers: &[Paper]) -> Result<()> {
        let raw = serde_json::to_string(papers)?;
        let mut records = self.records.lock().expect("durable store lock poisoned");
        records.insert("papers".to_string(), raw);
        Ok(())
    }

    fn load_question_banks(&self) -> Result<Vec<QuestionBank>> {
        let records = self.records.lock().expect("durable store lock poisoned");
        let mut banks = Vec::new();
        for (key, raw) in records.iter() {
            if key.starts_with("bank:") {
                banks.push(serde_json::from_str(raw)?);
            }
        }
        Ok(banks)
    }

    fn persist_question_bank(&self, bank: &QuestionBank) -> Result<()> {
        let raw = serde_json::to_string(bank)?;
        let mut records = self.records.lock().expect("durable store lock poisoned");
        records.insert(Self::bank_key(&bank.metadata.id), raw);
        Ok(())
    }
}
