use crate::config::Config;
use crate::error::{Error, Result};
use crate::models::user::{UserDirectory, UserTag};
use crate::rate_limit::{LimitedAction, RateLimiter};
use crate::store::{TokenRecord, TokenStore};
use crate::utils::rng::SharedRng;
use crate::utils::time::Clock;
use crate::utils::token::random_hex_string;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Freshly issued bearer token, as returned to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Resolved caller identity for a valid token. Tags come from the user
/// directory at validation time, so tag changes apply immediately.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_uid: String,
    pub tags: Vec<UserTag>,
}

#[derive(Clone)]
pub struct TokenService {
    config: Arc<Config>,
    store: Arc<TokenStore>,
    directory: Arc<dyn UserDirectory>,
    limiter: Arc<RateLimiter>,
    rng: Arc<SharedRng>,
    clock: Arc<dyn Clock>,
}

impl TokenService {
    pub fn new(
        config: Arc<Config>,
        store: Arc<TokenStore>,
        directory: Arc<dyn UserDirectory>,
        limiter: Arc<RateLimiter>,
        rng: Arc<SharedRng>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            store,
            directory,
            limiter,
            rng,
            clock,
        }
    }

    /// Check credentials and issue a token. `remote_key` (remote address or
    /// uid) is what the auth-attempt limiter counts against, so failed
    /// guesses burn the budget too.
    pub fn authenticate(&self, uid: &str, password: &str, remote_key: &str) -> Result<IssuedToken> {
        self.limiter
            .check(remote_key, LimitedAction::AuthAttempts, &[])?;

        let user = self
            .directory
            .get_user(uid)
            .ok_or_else(|| Error::Forbidden("invalid credentials".to_string()))?;
        if user.banned {
            return Err(Error::Forbidden(format!("user {uid} is banned")));
        }
        if !self.directory.verify_password(uid, password) {
            return Err(Error::Forbidden("invalid credentials".to_string()));
        }

        tracing::info!(uid, "issuing access token");
        Ok(self.issue(&user.uid, user.tags))
    }

    fn issue(&self, uid: &str, tags: Vec<UserTag>) -> IssuedToken {
        let token = self
            .rng
            .with(|rng| random_hex_string(rng, self.config.token_length_bytes));
        let now = self.clock.now();
        let expires_at = now + Duration::hours(self.config.token_expiry_hours);
        self.store.insert(
            token.clone(),
            TokenRecord {
                user_uid: uid.to_string(),
                tags,
                issued_at: now,
                expires_at,
            },
        );
        IssuedToken { token, expires_at }
    }

    /// Resolve a token to its owner. Expired tokens are removed on sight;
    /// banned users are rejected even while their token is still live.
    pub fn validate(&self, token: &str) -> Result<AuthContext> {
        let record = self.store.get(token).ok_or(Error::InvalidOrExpired)?;
        if record.expires_at < self.clock.now() {
            self.store.remove(token);
            return Err(Error::InvalidOrExpired);
        }
        let user = self
            .directory
            .get_user(&record.user_uid)
            .ok_or(Error::InvalidOrExpired)?;
        if user.banned {
            return Err(Error::Forbidden(format!(
                "user {} is banned",
                record.user_uid
            )));
        }
        Ok(AuthContext {
            user_uid: user.uid,
            tags: user.tags,
        })
    }

    /// Exchange a valid token for a fresh one. The swap happens under one
    /// write lock, so the old token cannot be refreshed twice.
    pub fn refresh(&self, old_token: &str) -> Result<IssuedToken> {
        let ctx = self.validate(old_token)?;
        let token = self
            .rng
            .with(|rng| random_hex_string(rng, self.config.token_length_bytes));
        let now = self.clock.now();
        let expires_at = now + Duration::hours(self.config.token_expiry_hours);
        let record = TokenRecord {
            user_uid: ctx.user_uid,
            tags: ctx.tags,
            issued_at: now,
            expires_at,
        };
        if !self.store.rotate(old_token, token.clone(), record) {
            return Err(Error::InvalidOrExpired);
        }
        Ok(IssuedToken { token, expires_at })
    }

    pub fn revoke(&self, token: &str) -> Result<()> {
        self.store.remove(token).ok_or(Error::InvalidOrExpired)?;
        Ok(())
    }

    pub fn change_password(&self, uid: &str, old_password: &str, new_password: &str) -> Result<()> {
        if !self.directory.verify_password(uid, old_password) {
            return Err(Error::Forbidden("invalid credentials".to_string()));
        }
        self.directory.set_password(uid, new_password)
    }

    /// Sweep expired tokens. Called periodically by the maintenance loop.
    pub fn cleanup_expired(&self) -> usize {
        let removed = self.store.purge_expired(self.clock.now());
        if removed > 0 {
            tracing::debug!(removed, "purged expired tokens");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::UserEntry;
    use crate::rate_limit::{ClassRules, LimitRule};
    use crate::utils::time::SystemClock;
    use mockall::mock;
    use mockall::predicate::eq;

    mock! {
        pub Directory {}

        impl UserDirectory for Directory {
            fn get_user(&self, uid: &str) -> Option<UserEntry>;
            fn verify_password(&self, uid: &str, password: &str) -> bool;
            fn set_password(&self, uid: &str, new_password: &str) -> Result<()>;
        }
    }

    fn wide_open_rules() -> ClassRules {
        let rule = LimitRule {
            limit: 1000,
            window_seconds: 60,
        };
        ClassRules {
            get_exam: rule,
            auth_attempts: rule,
        }
    }

    fn service(directory: MockDirectory) -> TokenService {
        let config = Arc::new(Config::default());
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        TokenService::new(
            config,
            Arc::new(TokenStore::new()),
            Arc::new(directory),
            Arc::new(RateLimiter::new(
                wide_open_rules(),
                wide_open_rules(),
                Arc::clone(&clock),
            )),
            Arc::new(SharedRng::seeded(7)),
            clock,
        )
    }

    fn plain_user(uid: &str) -> UserEntry {
        UserEntry {
            uid: uid.to_string(),
            tags: vec![UserTag::User],
            banned: false,
        }
    }

    #[test]
    fn authenticate_then_validate_round_trip() {
        let mut directory = MockDirectory::new();
        directory
            .expect_get_user()
            .with(eq("alice"))
            .returning(|uid| Some(plain_user(uid)));
        directory
            .expect_verify_password()
            .with(eq("alice"), eq("hunter2"))
            .returning(|_, _| true);

        let svc = service(directory);
        let issued = svc.authenticate("alice", "hunter2", "10.0.0.1").unwrap();
        let ctx = svc.validate(&issued.token).unwrap();
        assert_eq!(ctx.user_uid, "alice");
        assert_eq!(ctx.tags, vec![UserTag::User]);
    }

    #[test]
    fn wrong_password_is_forbidden() {
        let mut directory = MockDirectory::new();
        directory
            .expect_get_user()
            .returning(|uid| Some(plain_user(uid)));
        directory.expect_verify_password().returning(|_, _| false);

        let svc = service(directory);
        let err = svc.authenticate("alice", "nope", "10.0.0.1").unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));
    }

    #[test]
    fn banned_user_is_rejected_even_with_live_token() {
        let mut directory = MockDirectory::new();
        let banned = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
        let banned_for_lookup = std::sync::Arc::clone(&banned);
        directory.expect_get_user().returning(move |uid| {
            let mut user = plain_user(uid);
            user.banned = banned_for_lookup.load(std::sync::atomic::Ordering::SeqCst);
            Some(user)
        });
        directory.expect_verify_password().returning(|_, _| true);

        let svc = service(directory);
        let issued = svc.authenticate("bob", "pw", "10.0.0.2").unwrap();
        assert!(svc.validate(&issued.token).is_ok());

        banned.store(true, std::sync::atomic::Ordering::SeqCst);
        let err = svc.validate(&issued.token).unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));
    }

    #[test]
    fn refresh_invalidates_the_old_token() {
        let mut directory = MockDirectory::new();
        directory
            .expect_get_user()
            .returning(|uid| Some(plain_user(uid)));
        directory.expect_verify_password().returning(|_, _| true);

        let svc = service(directory);
        let first = svc.authenticate("carol", "pw", "10.0.0.3").unwrap();
        let second = svc.refresh(&first.token).unwrap();
        assert_ne!(first.token, second.token);
        assert!(matches!(
            svc.validate(&first.token),
            Err(Error::InvalidOrExpired)
        ));
        assert!(svc.validate(&second.token).is_ok());
    }

    #[test]
    fn unknown_token_is_invalid() {
        let directory = MockDirectory::new();
        let svc = service(directory);
        assert!(matches!(
            svc.validate("deadbeef"),
            Err(Error::InvalidOrExpired)
        ));
    }
}
