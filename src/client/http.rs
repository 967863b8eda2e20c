//! HTTP clients for the lookup and scoring services
//!
//! Lookup:  `GET {lookup_url}?q=<query>[&limit=<n>]` → `[Candidate]`
//! Scoring: `GET {scoring_url}/<id>` → `RiskAssessment`
//!
//! No deadline is set unless `request_timeout_secs` is configured.

use async_trait::async_trait;
use reqwest::Client;
use url::Url;

use super::{LookupService, ScoringService};
use crate::config::LookupConfig;
use crate::error::{body_excerpt, ConfigError, ScoreError, SearchError};
use crate::model::{Candidate, RiskAssessment};

fn build_client(config: &LookupConfig) -> Result<Client, ConfigError> {
    let mut builder = Client::builder();
    if let Some(timeout) = config.request_timeout() {
        builder = builder.timeout(timeout);
    }
    builder.build().map_err(ConfigError::Client)
}

fn parse_endpoint(field: &'static str, value: &str) -> Result<Url, ConfigError> {
    Url::parse(value).map_err(|e| ConfigError::Invalid {
        field,
        message: format!("'{value}': {e}"),
    })
}

// =============================================================================
// LOOKUP
// =============================================================================

pub struct HttpLookupClient {
    client: Client,
    endpoint: Url,
    result_limit: Option<usize>,
}

impl HttpLookupClient {
    pub fn new(config: &LookupConfig) -> Result<Self, ConfigError> {
        let endpoint = parse_endpoint("lookup_url", &config.lookup_url)?;
        Ok(Self {
            client: build_client(config)?,
            endpoint,
            result_limit: config.result_limit,
        })
    }

    pub(crate) fn search_url(&self, query: &str) -> Url {
        let mut url = self.endpoint.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("q", query);
            if let Some(limit) = self.result_limit {
                pairs.append_pair("limit", &limit.to_string());
            }
        }
        url
    }
}

#[async_trait]
impl LookupService for HttpLookupClient {
    async fn lookup(&self, query: &str) -> Result<Vec<Candidate>, SearchError> {
        let url = self.search_url(query);
        tracing::debug!(%url, "Issuing lookup request");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(SearchError::Transport)?;

        let status = response.status();
        let body = response.text().await.map_err(SearchError::Transport)?;

        if !status.is_success() {
            return Err(SearchError::Status {
                status: status.as_u16(),
                body: body_excerpt(&body),
            });
        }

        serde_json::from_str(&body).map_err(|e| SearchError::Decode(e.to_string()))
    }
}

// =============================================================================
// SCORING
// =============================================================================

pub struct HttpScoringClient {
    client: Client,
    base: Url,
}

impl HttpScoringClient {
    pub fn new(config: &LookupConfig) -> Result<Self, ConfigError> {
        let base = parse_endpoint("scoring_url", &config.scoring_url)?;
        if base.cannot_be_a_base() {
            return Err(ConfigError::Invalid {
                field: "scoring_url",
                message: format!("'{base}' cannot take path segments"),
            });
        }
        Ok(Self {
            client: build_client(config)?,
            base,
        })
    }

    pub(crate) fn assessment_url(&self, candidate_id: &str) -> Url {
        let mut url = self.base.clone();
        // Checked in `new`: the base accepts path segments
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(candidate_id);
        }
        url
    }
}

#[async_trait]
impl ScoringService for HttpScoringClient {
    async fn assess(&self, candidate_id: &str) -> Result<RiskAssessment, ScoreError> {
        let url = self.assessment_url(candidate_id);
        tracing::debug!(%url, "Issuing scoring request");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(ScoreError::Transport)?;

        let status = response.status();
        let body = response.text().await.map_err(ScoreError::Transport)?;

        if !status.is_success() {
            return Err(ScoreError::Status {
                status: status.as_u16(),
                body: body_excerpt(&body),
            });
        }

        serde_json::from_str(&body).map_err(|e| ScoreError::Decode(e.to_string()))
    }
}
