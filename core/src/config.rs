//! Client configuration: endpoint, credentials, paging and polling policy.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::{Error, Result};

pub const DEFAULT_BASE_URL: &str = "https://api.moysklad.ru/api/remap/1.2";

/// Largest `limit` the API accepts for list endpoints.
pub const MAX_PAGE_SIZE: u32 = 1000;

/// Credentials attached to every request as an `Authorization` header.
#[derive(Clone)]
pub enum Credentials {
    Token(String),
    Basic { username: String, password: String },
}

impl Credentials {
    pub fn token(token: impl Into<String>) -> Self {
        Credentials::Token(token.into())
    }

    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Credentials::Basic {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn authorization(&self) -> String {
        match self {
            Credentials::Token(token) => format!("Bearer {token}"),
            Credentials::Basic { username, password } => {
                format!("Basic {}", STANDARD.encode(format!("{username}:{password}")))
            }
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::Token(_) => f.write_str("Token(***)"),
            Credentials::Basic { username, .. } => {
                f.debug_struct("Basic").field("username", username).finish_non_exhaustive()
            }
        }
    }
}

/// Delay schedule between async job status checks.
///
/// The first check happens immediately; the wait before each following check
/// starts at `initial_interval` and grows by `multiplier`, capped at
/// `max_interval`.
#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
    pub initial_interval: Duration,
    pub max_interval: Duration,
    pub multiplier: f64,
}

impl PollPolicy {
    pub fn fixed(interval: Duration) -> Self {
        Self {
            initial_interval: interval,
            max_interval: interval,
            multiplier: 1.0,
        }
    }

    /// Delay to wait after `attempt` unsuccessful checks (0-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.max(1.0).powi(attempt.min(64) as i32);
        Duration::try_from_secs_f64(self.initial_interval.as_secs_f64() * factor)
            .unwrap_or(self.max_interval)
            .min(self.max_interval)
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_secs(1),
            max_interval: Duration::from_secs(10),
            multiplier: 1.5,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub credentials: Option<Credentials>,
    pub user_agent: String,
    pub page_size: u32,
    pub poll: PollPolicy,
}

impl ClientConfig {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials: Some(credentials),
            ..Self::default()
        }
    }

    /// Reads `MOYSKLAD_TOKEN` (or `MOYSKLAD_USERNAME` and `MOYSKLAD_PASSWORD`)
    /// plus an optional `MOYSKLAD_BASE_URL`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let credentials = match (
            lookup("MOYSKLAD_TOKEN"),
            lookup("MOYSKLAD_USERNAME"),
            lookup("MOYSKLAD_PASSWORD"),
        ) {
            (Some(token), _, _) if !token.is_empty() => Credentials::Token(token),
            (_, Some(username), Some(password)) => Credentials::Basic { username, password },
            _ => {
                return Err(Error::Config(
                    "set MOYSKLAD_TOKEN or MOYSKLAD_USERNAME and MOYSKLAD_PASSWORD".to_string(),
                ))
            }
        };
        let mut config = Self::new(credentials);
        if let Some(base_url) = lookup("MOYSKLAD_BASE_URL") {
            config = config.with_base_url(&base_url);
        }
        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Page size used when enumerating all rows; clamped to `1..=MAX_PAGE_SIZE`.
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        self
    }

    pub fn with_poll_policy(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            credentials: None,
            user_agent: concat!("moysklad-core/", env!("CARGO_PKG_VERSION")).to_string(),
            page_size: MAX_PAGE_SIZE,
            poll: PollPolicy::default(),
        }
    }
}
