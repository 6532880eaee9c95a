use crate::error::{Error, Result};
use crate::rate_limit::{ClassRules, LimitRule};
use dotenvy::dotenv;
use rust_decimal::Decimal;
use std::env;
use std::str::FromStr;

/// Runtime configuration. Built once at startup and handed to services as an
/// `Arc<Config>` so tests can run with distinct settings side by side.
#[derive(Debug, Clone)]
pub struct Config {
    /// Percentage threshold a paper must reach to pass.
    pub passing_score_percentage: Decimal,
    /// Lifetime of an issued access token.
    pub token_expiry_hours: i64,
    /// Byte length of the random access-token value (hex-encoded doubles it).
    pub token_length_bytes: usize,
    /// Byte length for generated option identifiers and passcodes.
    pub generated_code_length_bytes: usize,
    /// How many incorrect options are presented per choice question.
    pub num_incorrect_choices_to_select: usize,
    /// Hard cap on the question count of a single paper.
    pub max_questions_per_paper: usize,
    /// Interval of the write-behind flush and expired-token sweep.
    pub persist_interval_seconds: u64,
    pub default_user_limits: ClassRules,
    pub limited_user_limits: ClassRules,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            passing_score_percentage: Decimal::from(60),
            token_expiry_hours: 24,
            token_length_bytes: 16,
            generated_code_length_bytes: 8,
            num_incorrect_choices_to_select: 3,
            max_questions_per_paper: 200,
            persist_interval_seconds: 60,
            default_user_limits: ClassRules {
                get_exam: LimitRule {
                    limit: 5,
                    window_seconds: 300,
                },
                auth_attempts: LimitRule {
                    limit: 10,
                    window_seconds: 300,
                },
            },
            limited_user_limits: ClassRules {
                get_exam: LimitRule {
                    limit: 1,
                    window_seconds: 600,
                },
                auth_attempts: LimitRule {
                    limit: 3,
                    window_seconds: 600,
                },
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        let base = Config::default();

        Ok(Self {
            passing_score_percentage: get_env_decimal(
                "PASSING_SCORE_PERCENTAGE",
                base.passing_score_percentage,
            )?,
            token_expiry_hours: get_env_parse("TOKEN_EXPIRY_HOURS", base.token_expiry_hours)?,
            token_length_bytes: get_env_parse("TOKEN_LENGTH_BYTES", base.token_length_bytes)?,
            generated_code_length_bytes: get_env_parse(
                "GENERATED_CODE_LENGTH_BYTES",
                base.generated_code_length_bytes,
            )?,
            num_incorrect_choices_to_select: get_env_parse(
                "NUM_INCORRECT_CHOICES",
                base.num_incorrect_choices_to_select,
            )?,
            max_questions_per_paper: get_env_parse(
                "MAX_QUESTIONS_PER_PAPER",
                base.max_questions_per_paper,
            )?,
            persist_interval_seconds: get_env_parse(
                "PERSIST_INTERVAL_SECONDS",
                base.persist_interval_seconds,
            )?,
            default_user_limits: ClassRules {
                get_exam: LimitRule {
                    limit: get_env_parse(
                        "RATE_DEFAULT_GET_EXAM_LIMIT",
                        base.default_user_limits.get_exam.limit,
                    )?,
                    window_seconds: get_env_parse(
                        "RATE_DEFAULT_GET_EXAM_WINDOW",
                        base.default_user_limits.get_exam.window_seconds,
                    )?,
                },
                auth_attempts: LimitRule {
                    limit: get_env_parse(
                        "RATE_DEFAULT_AUTH_LIMIT",
                        base.default_user_limits.auth_attempts.limit,
                    )?,
                    window_seconds: get_env_parse(
                        "RATE_DEFAULT_AUTH_WINDOW",
                        base.default_user_limits.auth_attempts.window_seconds,
                    )?,
                },
            },
            limited_user_limits: ClassRules {
                get_exam: LimitRule {
                    limit: get_env_parse(
                        "RATE_LIMITED_GET_EXAM_LIMIT",
                        base.limited_user_limits.get_exam.limit,
                    )?,
                    window_seconds: get_env_parse(
                        "RATE_LIMITED_GET_EXAM_WINDOW",
                        base.limited_user_limits.get_exam.window_seconds,
                    )?,
                },
                auth_attempts: LimitRule {
                    limit: get_env_parse(
                        "RATE_LIMITED_AUTH_LIMIT",
                        base.limited_user_limits.auth_attempts.limit,
                    )?,
                    window_seconds: get_env_parse(
                        "RATE_LIMITED_AUTH_WINDOW",
                        base.limited_user_limits.auth_attempts.window_seconds,
                    )?,
                },
            },
        })
    }
}

fn get_env_parse<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}

fn get_env_decimal(name: &str, default: Decimal) -> Result<Decimal> {
    match env::var(name) {
        Ok(raw) => Decimal::from_str(&raw)
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}
