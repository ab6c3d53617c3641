//! Scraping of the seminar listing from the booking site.

mod client;
pub mod parse;

use std::fmt;

use chrono::NaiveDate;
use thiserror::Error;

use crate::db::ScrapedSeminar;
use crate::settings::SourceSettings;

pub use client::{retry_with_backoff, ListingClient, RetryConfig};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::log_info;

pub const EMAIL_ENV: &str = "SCRAPING_EMAIL";
pub const PASSWORD_ENV: &str = "SCRAPING_PASSWORD";

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("{0} is not set")]
    MissingCredentials(&'static str),
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },
    #[error("{url} answered with HTTP {code}")]
    Status { url: String, code: u16 },
    #[error("response from {url} exceeds {limit} bytes")]
    BodyTooLarge { url: String, limit: usize },
    #[error("login was rejected by the booking site")]
    AuthRejected,
    #[error("scrape task failed: {0}")]
    Task(String),
}

impl ScrapeError {
    pub(crate) fn from_ureq(url: &str, err: ureq::Error) -> Self {
        match err {
            ureq::Error::Status(code, _) => ScrapeError::Status {
                url: url.to_string(),
                code,
            },
            ureq::Error::Transport(transport) => ScrapeError::Transport {
                url: url.to_string(),
                message: transport.to_string(),
            },
        }
    }

    /// Worth another attempt: network trouble, throttling or a server error.
    pub fn is_transient(&self) -> bool {
        match self {
            ScrapeError::Transport { .. } => true,
            ScrapeError::Status { code, .. } => *code == 429 || *code >= 500,
            _ => false,
        }
    }
}

/// What a scrape saw on the calendar page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrapeOutcome {
    /// The schedule block was found. Empty means no sessions are listed.
    Listed(Vec<ScrapedSeminar>),
    /// The page did not have the expected layout.
    Unrecognized { reason: String },
}

#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn from_env() -> Result<Self, ScrapeError> {
        let read = |name: &'static str| {
            std::env::var(name)
                .ok()
                .filter(|value| !value.trim().is_empty())
                .ok_or(ScrapeError::MissingCredentials(name))
        };
        Ok(Self {
            email: read(EMAIL_ENV)?,
            password: read(PASSWORD_ENV)?,
        })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Anything that can produce the current listing.
#[allow(async_fn_in_trait)]
pub trait ListingSource {
    async fn fetch(&self, today: NaiveDate) -> Result<ScrapeOutcome, ScrapeError>;
}

/// The live booking site.
pub struct HttpListingSource {
    source: SourceSettings,
    retry: RetryConfig,
    credentials: Credentials,
}

impl HttpListingSource {
    pub fn new(source: SourceSettings, max_attempts: usize, credentials: Credentials) -> Self {
        Self {
            source,
            retry: RetryConfig {
                max_attempts: max_attempts.max(1),
                ..RetryConfig::default()
            },
            credentials,
        }
    }
}

impl ListingSource for HttpListingSource {
    async fn fetch(&self, today: NaiveDate) -> Result<ScrapeOutcome, ScrapeError> {
        let source = self.source.clone();
        let retry = self.retry;
        let credentials = self.credentials.clone();

        let html = tokio::task::spawn_blocking(move || {
            ListingClient::new(source, retry).fetch_calendar(&credentials)
        })
        .await
        .map_err(|err| ScrapeError::Task(err.to_string()))??;

        let outcome = parse::parse_calendar(&html, today);
        match &outcome {
            ScrapeOutcome::Listed(seminars) => log_info!("scraped {} seminars", seminars.len()),
            ScrapeOutcome::Unrecognized { reason } => log_info!("calendar not recognized: {reason}"),
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_debug_hides_password() {
        let credentials = Credentials {
            email: "desk@example.com".into(),
            password: "hunter2".into(),
        };
        let rendered = format!("{credentials:?}");
        assert!(rendered.contains("desk@example.com"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn transient_errors() {
        let status = |code| ScrapeError::Status {
            url: "u".into(),
            code,
        };
        assert!(status(503).is_transient());
        assert!(status(429).is_transient());
        assert!(!status(404).is_transient());
        assert!(!ScrapeError::AuthRejected.is_transient());
        assert!(ScrapeError::Transport {
            url: "u".into(),
            message: "reset".into()
        }
        .is_transient());
    }
}
