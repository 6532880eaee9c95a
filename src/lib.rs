pub mod config;
pub mod error;
pub mod maintenance;
pub mod models;
pub mod rate_limit;
pub mod services;
pub mod store;
pub mod utils;

use crate::config::Config;
use crate::error::Result;
use crate::models::user::UserDirectory;
use crate::rate_limit::RateLimiter;
use crate::services::{BankService, ExamService, GradingService, ReviewService, TokenService};
use crate::store::{BankStore, DurableStore, PaperStore, TokenStore};
use crate::utils::rng::SharedRng;
use crate::utils::time::Clock;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Everything a frontend needs, wired together. Stores are shared across
/// services; the clock, rng, user directory and durable backend are
/// injectable so tests can run deterministically.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub paper_store: Arc<PaperStore>,
    pub bank_store: Arc<BankStore>,
    pub token_store: Arc<TokenStore>,
    pub durable: Arc<dyn DurableStore>,
    pub rate_limiter: Arc<RateLimiter>,
    pub token_service: TokenService,
    pub exam_service: ExamService,
    pub grading_service: GradingService,
    pub review_service: ReviewService,
    pub bank_service: BankService,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        directory: Arc<dyn UserDirectory>,
        durable: Arc<dyn DurableStore>,
        rng: Arc<SharedRng>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let paper_store = Arc::new(PaperStore::new());
        let bank_store = Arc::new(BankStore::new());
        let token_store = Arc::new(TokenStore::new());
        let rate_limiter = Arc::new(RateLimiter::new(
            config.default_user_limits,
            config.limited_user_limits,
            Arc::clone(&clock),
        ));

        let token_service = TokenService::new(
            Arc::clone(&config),
            Arc::clone(&token_store),
            directory,
            Arc::clone(&rate_limiter),
            Arc::clone(&rng),
            Arc::clone(&clock),
        );
        let exam_service = ExamService::new(
            Arc::clone(&config),
            Arc::clone(&bank_store),
            Arc::clone(&paper_store),
            Arc::clone(&rng),
            Arc::clone(&clock),
            Arc::clone(&rate_limiter),
        );
        let grading_service = GradingService::new(
            Arc::clone(&config),
            Arc::clone(&paper_store),
            Arc::clone(&rng),
            Arc::clone(&clock),
        );
        let review_service = ReviewService::new(Arc::clone(&paper_store), grading_service.clone());
        let bank_service = BankService::new(Arc::clone(&bank_store), Arc::clone(&durable));

        Self {
            config,
            paper_store,
            bank_store,
            token_store,
            durable,
            rate_limiter,
            token_service,
            exam_service,
            grading_service,
            review_service,
            bank_service,
        }
    }

    /// Rehydrate the in-memory stores from durable storage. Called once at
    /// startup, before the first request.
    pub fn load(&self) -> Result<()> {
        let banks = self.durable.load_question_banks()?;
        tracing::info!(banks = banks.len(), "question banks loaded");
        self.bank_store.load_from(banks);

        let papers = self.durable.load_papers()?;
        tracing::info!(papers = papers.len(), "papers loaded");
        self.paper_store.load_from(papers);
        Ok(())
    }

    /// Start the background flush and token sweep loops.
    pub fn spawn_maintenance(&self) -> Vec<JoinHandle<()>> {
        vec![
            maintenance::spawn_flush_task(
                Arc::clone(&self.paper_store),
                Arc::clone(&self.durable),
                self.config.persist_interval_seconds,
            ),
            maintenance::spawn_token_sweep(
                self.token_service.clone(),
                self.config.persist_interval_seconds,
            ),
        ]
    }
}
