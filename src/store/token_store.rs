use crate::models::user::UserTag;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenRecord {
    pub user_uid: String,
    pub tags: Vec<UserTag>,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Opaque bearer tokens, kept in memory only. Tokens do not survive a
/// restart; users re-authenticate.
#[derive(Default)]
pub struct TokenStore {
    tokens: RwLock<HashMap<String, TokenRecord>>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, token: String, record: TokenRecord) {
        let mut tokens = self.tokens.write().expect("token store lock poisoned");
        tokens.insert(token, record);
    }

    pub fn get(&self, token: &str) -> Option<TokenRecord> {
        let tokens = self.tokens.read().expect("token store lock poisoned");
        tokens.get(token).cloned()
    }

    pub fn remove(&self, token: &str) -> Option<TokenRecord> {
        let mut tokens = self.tokens.write().expect("token store lock poisoned");
        tokens.remove(token)
    }

    /// Swap an old token for a new one under a single write lock, so no
    /// window exists where both or neither is valid.
    pub fn rotate(&self, old_token: &str, new_token: String, record: TokenRecord) -> bool {
        let mut tokens = self.tokens.write().expect("token store lock poisoned");
        if tokens.remove(old_token).is_none() {
            return false;
        }
        tokens.insert(new_token, record);
        true
    }

    /// Drop every token that expired before `now`. Returns how many were
    /// removed.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let mut tokens = self.tokens.write().expect("token store lock poisoned");
        let before = tokens.len();
        tokens.retain(|_, record| record.expires_at >= now);
        before - tokens.len()
    }

    pub fn len(&self) -> usize {
        let tokens = self.tokens.read().expect("token store lock poisoned");
        tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
