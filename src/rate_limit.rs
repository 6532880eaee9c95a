use crate::error::{Error, Result};
use crate::models::user::UserTag;
use crate::utils::time::Clock;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Actions that are throttled independently of each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitedAction {
    GetExam,
    AuthAttempts,
}

/// At most `limit` requests per `window_seconds`, counted from the first
/// request in the window.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LimitRule {
    pub limit: u32,
    pub window_seconds: u64,
}

/// Rules for one user class, one rule per limited action.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ClassRules {
    pub get_exam: LimitRule,
    pub auth_attempts: LimitRule,
}

impl ClassRules {
    fn rule_for(&self, action: LimitedAction) -> LimitRule {
        match action {
            LimitedAction::GetExam => self.get_exam,
            LimitedAction::AuthAttempts => self.auth_attempts,
        }
    }
}

struct WindowState {
    start: DateTime<Utc>,
    count: u32,
}

/// Fixed-window limiter keyed by caller identity and action. Admin callers
/// bypass all limits; callers tagged `limited` get the stricter class.
pub struct RateLimiter {
    default_rules: ClassRules,
    limited_rules: ClassRules,
    clock: Arc<dyn Clock>,
    windows: Mutex<HashMap<(String, LimitedAction), WindowState>>,
}

impl RateLimiter {
    pub fn new(default_rules: ClassRules, limited_rules: ClassRules, clock: Arc<dyn Clock>) -> Self {
        Self {
            default_rules,
            limited_rules,
            clock,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Record one request from `key` and decide whether it may proceed.
    /// `key` is whatever identifies the caller: uid when authenticated,
    /// remote address otherwise.
    pub fn check(&self, key: &str, action: LimitedAction, tags: &[UserTag]) -> Result<()> {
        if tags.contains(&UserTag::Admin) {
            return Ok(());
        }
        let rules = if tags.contains(&UserTag::Limited) {
            self.limited_rules
        } else {
            self.default_rules
        };
        let rule = rules.rule_for(action);
        let now = self.clock.now();

        let mut windows = self.windows.lock().expect("rate limiter lock poisoned");
        let state = windows
            .entry((key.to_string(), action))
            .or_insert(WindowState { start: now, count: 0 });

        if now - state.start >= Duration::seconds(rule.window_seconds as i64) {
            state.start = now;
            state.count = 0;
        }
        if state.count >= rule.limit {
            return Err(Error::RateLimited(format!(
                "limit of {} per {}s exceeded",
                rule.limit, rule.window_seconds
            )));
        }
        state.count = state.count.saturating_add(1);
        Ok(())
    }
}
