use std::time::Duration;

use futures_util::StreamExt;
use hoops_logging::{hoops_debug, hoops_warn};
use reqwest::header::CONTENT_TYPE;
use url::Url;

use crate::decode::decode_html;
use crate::{FailureKind, FetchError};

const DEFAULT_USER_AGENT: &str = concat!("hoops-harvester/", env!("CARGO_PKG_VERSION"));

/// Scraping-proxy indirection; the target URL travels as a query parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxySettings {
    pub endpoint: String,
    pub api_key: String,
}

impl ProxySettings {
    pub fn wrap(&self, target: &str) -> Result<Url, url::ParseError> {
        let mut url = Url::parse(&self.endpoint)?;
        url.query_pairs_mut()
            .append_pair("api_key", &self.api_key)
            .append_pair("url", target);
        Ok(url)
    }
}

#[derive(Debug, Clone)]
pub struct FetchSettings {
    /// Pause before every attempt, including the first.
    pub request_delay: Duration,
    pub max_attempts: u32,
    pub backoff_factor: f64,
    pub retry_statuses: Vec<u16>,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub max_bytes: u64,
    pub user_agent: String,
    pub proxy: Option<ProxySettings>,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            request_delay: Duration::from_secs(2),
            max_attempts: 3,
            backoff_factor: 2.0,
            retry_statuses: vec![429, 500, 502, 503, 504],
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            max_bytes: 10 * 1024 * 1024,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            proxy: None,
        }
    }
}

impl FetchSettings {
    /// Wait after failed attempt number `attempt` (1-based): `delay * factor^(attempt-1)`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let secs = self.request_delay.as_secs_f64() * self.backoff_factor.powi(exponent);
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }

    fn is_retryable(&self, kind: &FailureKind) -> bool {
        match kind {
            FailureKind::HttpStatus(code) => self.retry_statuses.contains(code),
            FailureKind::Network | FailureKind::Timeout => true,
            _ => false,
        }
    }
}

#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    /// Returns the decoded HTML of `url`.
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// HTTP fetcher with pacing, bounded retries and exponential backoff.
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    settings: FetchSettings,
    client: reqwest::Client,
}

impl ReqwestFetcher {
    pub fn new(settings: FetchSettings) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .user_agent(settings.user_agent.clone())
            .build()
            .map_err(|err| FetchError::new(FailureKind::Network, err.to_string()).with_cause(err))?;
        Ok(Self { settings, client })
    }

    pub fn settings(&self) -> &FetchSettings {
        &self.settings
    }

    fn request_url(&self, url: &str) -> Result<Url, FetchError> {
        let parsed = Url::parse(url)
            .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))?;
        match &self.settings.proxy {
            Some(proxy) => proxy
                .wrap(parsed.as_str())
                .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string())),
            None => Ok(parsed),
        }
    }

    async fn attempt(&self, target: &Url) -> Result<String, FetchError> {
        let response = self
            .client
            .get(target.clone())
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        if let Some(content_len) = response.content_length() {
            if content_len > self.settings.max_bytes {
                return Err(self.too_large(content_len));
            }
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > self.settings.max_bytes {
                return Err(self.too_large(next_len));
            }
            bytes.extend_from_slice(&chunk);
        }

        Ok(decode_html(&bytes, content_type.as_deref()).html)
    }

    fn too_large(&self, actual: u64) -> FetchError {
        FetchError::new(
            FailureKind::TooLarge {
                max_bytes: self.settings.max_bytes,
                actual: Some(actual),
            },
            "response too large",
        )
    }
}

#[async_trait::async_trait]
impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let target = self.request_url(url)?;
        let max_attempts = self.settings.max_attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=max_attempts {
            tokio::time::sleep(self.settings.request_delay).await;
            let err = match self.attempt(&target).await {
                Ok(html) => {
                    hoops_debug!("Fetched {} on attempt {}", url, attempt);
                    return Ok(html);
                }
                Err(err) => err,
            };

            if !self.settings.is_retryable(&err.kind) {
                return Err(err);
            }
            if attempt < max_attempts {
                let wait = self.settings.backoff_delay(attempt);
                hoops_warn!(
                    "Fetching {} failed ({}); retrying in {:.1}s (attempt {}/{})",
                    url,
                    err,
                    wait.as_secs_f64(),
                    attempt,
                    max_attempts
                );
                tokio::time::sleep(wait).await;
            } else {
                hoops_warn!(
                    "Fetching {} failed ({}) on final attempt {}/{}",
                    url,
                    err,
                    attempt,
                    max_attempts
                );
            }
            last_error = Some(err);
        }

        let exhausted = FetchError::new(
            FailureKind::RetriesExhausted {
                attempts: max_attempts,
            },
            format!("failed to fetch {url} after {max_attempts} attempts"),
        );
        Err(match last_error {
            Some(last) => exhausted.with_cause(last),
            None => exhausted,
        })
    }
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    let kind = if err.is_timeout() {
        FailureKind::Timeout
    } else {
        FailureKind::Network
    };
    FetchError::new(kind, err.to_string()).with_cause(err)
}
