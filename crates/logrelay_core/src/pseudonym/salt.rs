// pseudonym/salt.rs: daily salt derivation from the process secret
use chrono::{Local, NaiveDate};
use std::fmt;
use tracing::warn;

use crate::error::{RelayError, Result};

/// Well-known salt used in low-assurance mode when no secret is configured.
pub const FALLBACK_SALT: &str = "fallback-salt";

/// Date bucket plus secret. Rendered as `YYYY-MM-DD-<secret>` when hashed.
#[derive(Clone, PartialEq, Eq)]
pub struct Salt {
    pub date_bucket: NaiveDate,
    secret: String,
}

impl Salt {
    pub fn new(date_bucket: NaiveDate, secret: impl Into<String>) -> Self {
        Self { date_bucket, secret: secret.into() }
    }

    pub fn date_str(&self) -> String {
        self.date_bucket.format("%Y-%m-%d").to_string()
    }

    /// Key material mixed into every token for this day.
    pub fn material(&self) -> String {
        format!("{}-{}", self.date_str(), self.secret)
    }
}

// never print the secret
impl fmt::Debug for Salt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Salt").field("date_bucket", &self.date_str()).field("secret", &"<redacted>").finish()
    }
}

type DateSource = Box<dyn Fn() -> NaiveDate + Send + Sync>;

pub struct SaltProvider {
    secret: String,
    using_fallback: bool,
    today: DateSource,
}

impl SaltProvider {
    /// Uses the local calendar date.
    pub fn new(secret: impl Into<String>) -> Self {
        Self { secret: secret.into(), using_fallback: false, today: Box::new(|| Local::now().date_naive()) }
    }

    /// Resolve the secret according to the assurance mode. In high-assurance
    /// mode a missing or empty secret is fatal.
    pub fn from_secret(secret: Option<&str>, fallback_salt_allowed: bool) -> Result<Self> {
        match secret.filter(|s| !s.is_empty()) {
            Some(s) => Ok(Self::new(s)),
            None if fallback_salt_allowed => {
                warn!(
                    fallback = FALLBACK_SALT,
                    "SALT not set; using well-known fallback salt, tokens are only weakly pseudonymous"
                );
                let mut p = Self::new(FALLBACK_SALT);
                p.using_fallback = true;
                Ok(p)
            }
            None => Err(RelayError::MissingSecret),
        }
    }

    pub fn with_date_source<F>(mut self, today: F) -> Self
    where
        F: Fn() -> NaiveDate + Send + Sync + 'static,
    {
        self.today = Box::new(today);
        self
    }

    /// Recomputed on every call; cheap, and picks up day changes immediately.
    pub fn current_salt(&self) -> Salt {
        self.salt_on((self.today)())
    }

    pub fn salt_on(&self, date: NaiveDate) -> Salt {
        Salt::new(date, self.secret.as_str())
    }

    pub fn using_fallback(&self) -> bool {
        self.using_fallback
    }
}
