use std::collections::HashSet;
use std::time::Duration;

use futures_util::stream::{self, StreamExt};
use reqwest::{header, Method, StatusCode};
use serde::{Deserialize, Serialize};

use super::extract::{card_urls, result_urls};
use crate::record::AnalysisResult;
use crate::sanitize::redact_url;

pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_CONCURRENCY: usize = 8;

/// A URL that failed its probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidUrl {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationReport {
    pub all_valid: bool,
    pub valid_urls: Vec<String>,
    pub invalid_urls: Vec<InvalidUrl>,
}

impl VerificationReport {
    pub fn total(&self) -> usize {
        self.valid_urls.len() + self.invalid_urls.len()
    }

    fn invalid_set(&self) -> HashSet<&str> {
        self.invalid_urls.iter().map(|u| u.url.as_str()).collect()
    }
}

enum Probe {
    Reachable,
    Status(u16),
    Failed(String),
}

/// Probes URLs found in model output with header-only requests.
#[derive(Clone)]
pub struct LinkVerifier {
    client: reqwest::Client,
    max_concurrency: usize,
}

impl LinkVerifier {
    pub fn new(probe_timeout: Duration, max_concurrency: usize) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(probe_timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .user_agent(concat!("snapcard-link-verifier/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            max_concurrency: max_concurrency.max(1),
        })
    }

    /// Verifies every URL referenced by the result's cards.
    pub async fn verify(&self, result: &AnalysisResult) -> VerificationReport {
        self.verify_urls(result_urls(result)).await
    }

    /// Probes `urls` concurrently. Individual failures never abort the batch;
    /// report order follows input order.
    pub async fn verify_urls(&self, urls: Vec<String>) -> VerificationReport {
        let outcomes: Vec<(String, Probe)> = stream::iter(urls)
            .map(|url| async move {
                let probe = self.probe(&url).await;
                (url, probe)
            })
            .buffered(self.max_concurrency)
            .collect()
            .await;

        let mut report = VerificationReport::default();
        for (url, probe) in outcomes {
            match probe {
                Probe::Reachable => report.valid_urls.push(url),
                Probe::Status(status) => {
                    tracing::debug!(url = %redact_url(&url), status, "Link unreachable");
                    report.invalid_urls.push(InvalidUrl {
                        url,
                        status: Some(status),
                        error: None,
                    });
                }
                Probe::Failed(error) => {
                    tracing::debug!(url = %redact_url(&url), %error, "Link probe failed");
                    report.invalid_urls.push(InvalidUrl {
                        url,
                        status: None,
                        error: Some(error),
                    });
                }
            }
        }
        report.all_valid = report.invalid_urls.is_empty();
        report
    }

    async fn probe(&self, url: &str) -> Probe {
        match self.send(Method::HEAD, url).await {
            Ok(status) if status.is_success() => Probe::Reachable,
            // Some servers refuse HEAD; retry with a one-byte ranged GET.
            Ok(StatusCode::METHOD_NOT_ALLOWED | StatusCode::NOT_IMPLEMENTED) => {
                match self.send(Method::GET, url).await {
                    Ok(status) if status.is_success() => Probe::Reachable,
                    Ok(status) => Probe::Status(status.as_u16()),
                    Err(e) => Probe::Failed(e),
                }
            }
            Ok(status) => Probe::Status(status.as_u16()),
            Err(e) => Probe::Failed(e),
        }
    }

    async fn send(&self, method: Method, url: &str) -> Result<StatusCode, String> {
        let mut request = self.client.request(method.clone(), url);
        if method == Method::GET {
            request = request.header(header::RANGE, "bytes=0-0");
        }
        request
            .send()
            .await
            .map(|response| response.status())
            .map_err(|e| e.without_url().to_string())
    }
}

/// Drops cards that reference any URL the report marks invalid.
///
/// Returns the filtered result and the number of cards removed.
pub fn retain_verified_cards(
    result: AnalysisResult,
    report: &VerificationReport,
) -> (AnalysisResult, usize) {
    let invalid = report.invalid_set();
    let before = result.cards.len();
    let cards: Vec<_> = result
        .cards
        .into_iter()
        .filter(|card| !card_urls(card).iter().any(|u| invalid.contains(u.as_str())))
        .collect();
    let dropped = before - cards.len();
    (AnalysisResult { cards }, dropped)
}
