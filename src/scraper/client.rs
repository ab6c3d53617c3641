//! HTTP session against the booking site: log in, then fetch the calendar.

use std::io::Read;
use std::time::Duration;

use crate::settings::SourceSettings;

use super::{parse::is_login_page, Credentials, ScrapeError};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const READ_TIMEOUT: Duration = Duration::from_secs(30);
const WRITE_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_REDIRECTS: u32 = 5;
const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
const ACCEPT_LANGUAGE: &str = "ja,en-US;q=0.7,en;q=0.3";

/// Retry settings for network operations with exponential backoff.
#[derive(Clone, Copy, Debug)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first try.
    pub max_attempts: usize,
    /// Base delay used for the exponential backoff.
    pub base_delay: Duration,
    /// Maximum delay allowed between attempts.
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(5),
        }
    }
}

/// Retry an operation with bounded exponential backoff when the predicate allows it.
pub fn retry_with_backoff<T, E, F, R>(
    config: RetryConfig,
    mut action: F,
    mut should_retry: R,
) -> Result<T, E>
where
    F: FnMut() -> Result<T, E>,
    R: FnMut(&E) -> bool,
{
    let mut attempt = 0usize;
    loop {
        attempt += 1;
        match action() {
            Ok(value) => return Ok(value),
            Err(err) => {
                if attempt >= config.max_attempts || !should_retry(&err) {
                    return Err(err);
                }
                std::thread::sleep(backoff_delay(
                    config.base_delay,
                    config.max_delay,
                    attempt,
                ));
            }
        }
    }
}

fn backoff_delay(base: Duration, max: Duration, attempt: usize) -> Duration {
    let exponent = u32::try_from(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
    let factor = 1u32.checked_shl(exponent).unwrap_or(u32::MAX);
    base.checked_mul(factor).unwrap_or(max).min(max)
}

/// Blocking client for one scrape. Each instance carries its own cookie jar,
/// so sessions never leak between passes.
pub struct ListingClient {
    agent: ureq::Agent,
    source: SourceSettings,
    retry: RetryConfig,
}

impl ListingClient {
    pub fn new(source: SourceSettings, retry: RetryConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(CONNECT_TIMEOUT)
            .timeout_read(READ_TIMEOUT)
            .timeout_write(WRITE_TIMEOUT)
            .redirects(MAX_REDIRECTS)
            .user_agent(&source.user_agent)
            .build();
        Self {
            agent,
            source,
            retry,
        }
    }

    /// Log in and return the calendar page HTML.
    pub fn fetch_calendar(&self, credentials: &Credentials) -> Result<String, ScrapeError> {
        // The login page hands out the session cookie the form post needs.
        self.get(&self.source.login_url)?;

        let login_url = self.source.login_url.as_str();
        retry_with_backoff(
            self.retry,
            || {
                let response = self
                    .agent
                    .post(login_url)
                    .set("Accept", ACCEPT_HTML)
                    .set("Accept-Language", ACCEPT_LANGUAGE)
                    .send_form(&[
                        ("MasterCustomerMail", credentials.email.as_str()),
                        ("MasterCustomerPassword", credentials.password.as_str()),
                    ])
                    .map_err(|err| ScrapeError::from_ureq(login_url, err))?;
                read_body_limited(response, login_url, self.source.max_body_bytes)
            },
            ScrapeError::is_transient,
        )?;
        log_info!("login form submitted");

        let html = self.get(&self.source.calendar_url)?;
        if is_login_page(&html) {
            log_warn!("calendar request was answered with the login form");
            return Err(ScrapeError::AuthRejected);
        }
        log_info!("calendar page fetched ({} bytes)", html.len());
        Ok(html)
    }

    fn get(&self, url: &str) -> Result<String, ScrapeError> {
        retry_with_backoff(
            self.retry,
            || {
                let response = self
                    .agent
                    .get(url)
                    .set("Accept", ACCEPT_HTML)
                    .set("Accept-Language", ACCEPT_LANGUAGE)
                    .call()
                    .map_err(|err| ScrapeError::from_ureq(url, err))?;
                read_body_limited(response, url, self.source.max_body_bytes)
            },
            |err| {
                let retry = err.is_transient();
                if retry {
                    log_warn!("retrying {url}: {err}");
                }
                retry
            },
        )
    }
}

/// Read a response body as text, enforcing a maximum byte size.
fn read_body_limited(
    response: ureq::Response,
    url: &str,
    max_bytes: usize,
) -> Result<String, ScrapeError> {
    let too_large = || ScrapeError::BodyTooLarge {
        url: url.to_string(),
        limit: max_bytes,
    };

    let declared = response
        .header("Content-Length")
        .and_then(|length| length.parse::<u64>().ok());
    if declared.is_some_and(|length| length > max_bytes as u64) {
        return Err(too_large());
    }

    let mut bytes = Vec::new();
    response
        .into_reader()
        .take(max_bytes as u64 + 1)
        .read_to_end(&mut bytes)
        .map_err(|err| ScrapeError::Transport {
            url: url.to_string(),
            message: err.to_string(),
        })?;
    if bytes.len() > max_bytes {
        return Err(too_large());
    }
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::sync::mpsc;
    use std::thread;

    use super::*;

    /// Serve `responses` to consecutive connections and report each request.
    fn serve(responses: Vec<String>) -> (String, mpsc::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            for response in responses {
                let Ok((stream, _)) = listener.accept() else {
                    return;
                };
                let mut reader = BufReader::new(stream);
                let mut request = String::new();
                let mut content_length = 0usize;
                loop {
                    let mut line = String::new();
                    if reader.read_line(&mut line).unwrap_or(0) == 0 {
                        break;
                    }
                    if let Some(value) = line.to_ascii_lowercase().strip_prefix("content-length:") {
                        content_length = value.trim().parse().unwrap_or(0);
                    }
                    request.push_str(&line);
                    if line == "\r\n" {
                        break;
                    }
                }
                let mut body = vec![0u8; content_length];
                let _ = reader.read_exact(&mut body);
                request.push_str(&String::from_utf8_lossy(&body));
                let _ = tx.send(request);
                let mut stream = reader.into_inner();
                let _ = stream.write_all(response.as_bytes());
            }
        });
        (format!("http://{addr}"), rx)
    }

    fn ok(body: &str) -> String {
        format!(
            "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        )
    }

    fn source(base: &str, max_body_bytes: usize) -> SourceSettings {
        SourceSettings {
            login_url: format!("{base}/account/login"),
            calendar_url: format!("{base}/event/calendar"),
            user_agent: "seminar-desk-test".into(),
            max_body_bytes,
        }
    }

    fn no_wait(max_attempts: usize) -> RetryConfig {
        RetryConfig {
            max_attempts,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    fn credentials() -> Credentials {
        Credentials {
            email: "desk@example.com".into(),
            password: "secret".into(),
        }
    }

    #[test]
    fn logs_in_then_fetches_calendar() {
        let calendar = r#"<div class="mb30"></div><a>ログアウト</a>"#;
        let (base, requests) = serve(vec![
            ok("<form id=\"LoginForm\"></form>"),
            ok("welcome"),
            ok(calendar),
        ]);
        let client = ListingClient::new(source(&base, 4096), no_wait(1));

        let html = client.fetch_calendar(&credentials()).unwrap();

        assert_eq!(html, calendar);
        let login_get = requests.recv().unwrap();
        assert!(login_get.starts_with("GET /account/login"));
        let login_post = requests.recv().unwrap();
        assert!(login_post.starts_with("POST /account/login"));
        assert!(login_post.contains("MasterCustomerMail=desk%40example.com"));
        assert!(login_post.contains("MasterCustomerPassword=secret"));
        let calendar_get = requests.recv().unwrap();
        assert!(calendar_get.starts_with("GET /event/calendar"));
    }

    #[test]
    fn login_form_on_calendar_means_rejected() {
        let (base, _requests) = serve(vec![
            ok("login"),
            ok("login"),
            ok(r#"<input name="MasterCustomerPassword">"#),
        ]);
        let client = ListingClient::new(source(&base, 4096), no_wait(1));

        let err = client.fetch_calendar(&credentials()).unwrap_err();
        assert!(matches!(err, ScrapeError::AuthRejected));
    }

    #[test]
    fn server_errors_are_retried() {
        let (base, _requests) = serve(vec![
            "HTTP/1.1 503 Service Unavailable\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
                .to_string(),
            ok("login"),
            ok("welcome"),
            ok(r#"<div class="mb30"></div>"#),
        ]);
        let client = ListingClient::new(source(&base, 4096), no_wait(2));

        assert!(client.fetch_calendar(&credentials()).is_ok());
    }

    #[test]
    fn client_errors_are_not_retried() {
        let (base, _requests) = serve(vec![
            "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n".to_string(),
        ]);
        let client = ListingClient::new(source(&base, 4096), no_wait(3));

        let err = client.fetch_calendar(&credentials()).unwrap_err();
        assert!(matches!(err, ScrapeError::Status { code: 404, .. }));
    }

    #[test]
    fn oversized_bodies_are_rejected() {
        let (base, _requests) = serve(vec![ok(&"a".repeat(64))]);
        let client = ListingClient::new(source(&base, 16), no_wait(1));

        let err = client.fetch_calendar(&credentials()).unwrap_err();
        assert!(matches!(err, ScrapeError::BodyTooLarge { limit: 16, .. }));
    }

    #[test]
    fn retry_with_backoff_stops_after_success() {
        let mut attempts = 0usize;
        let result: Result<u32, &'static str> = retry_with_backoff(
            no_wait(4),
            || {
                attempts += 1;
                if attempts < 3 {
                    Err("fail")
                } else {
                    Ok(7)
                }
            },
            |_| true,
        );
        assert_eq!(result, Ok(7));
        assert_eq!(attempts, 3);
    }

    #[test]
    fn backoff_is_capped() {
        let base = Duration::from_millis(100);
        let max = Duration::from_millis(250);
        assert_eq!(backoff_delay(base, max, 1), base);
        assert_eq!(backoff_delay(base, max, 2), Duration::from_millis(200));
        assert_eq!(backoff_delay(base, max, 3), max);
        assert_eq!(backoff_delay(base, max, 64), max);
    }
}
