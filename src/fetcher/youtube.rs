//! YouTube Data API v3 client
//!
//! Implements [`ChannelFetcher`] and [`KeyValidator`] over the `channels.list`
//! and `videos.list` endpoints. API error bodies are parsed for their
//! structured `reason` code and classified through [`QuotaRules`]; the
//! dispatcher never sees a raw HTTP status.

use crate::fetcher::api_config::{
    QuotaRules, API_BASE_URL, CHANNEL_PARTS, HTTP_CONNECT_TIMEOUT_SECS, HTTP_REQUEST_TIMEOUT_SECS,
};
use crate::fetcher::{ChannelFetcher, FetchError, FetchResult, KeyValidator};
use crate::identifier::{ChannelRef, RefKind};
use crate::ChannelInfo;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Well-known channel used for cheap key validation probes
const VALIDATION_PROBE_CHANNEL: &str = "UC_x5XG1OV2P6uZZ5FSM9Ttw";

/// YouTube Data API v3 client
pub struct YoutubeDataApi {
    client: Client,
    base_url: String,
    quota_rules: QuotaRules,
}

impl YoutubeDataApi {
    /// Create a client with default endpoints, timeouts, and quota rules
    pub fn new() -> FetchResult<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(HTTP_CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(HTTP_REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| FetchError::fatal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: API_BASE_URL.to_string(),
            quota_rules: QuotaRules::default(),
        })
    }

    /// Override the base URL (used by tests against local mock servers)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Override the quota classification rules
    pub fn with_quota_rules(mut self, rules: QuotaRules) -> Self {
        self.quota_rules = rules;
        self
    }

    /// Execute a GET request and deserialize a successful response
    async fn get_json<T>(&self, endpoint: &str, params: &[(&str, &str)]) -> FetchResult<T>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!(url = %url, params = params.len(), "API request");

        let response = self
            .client
            .get(&url)
            .query(params)
            .send()
            .await
            .map_err(|e| FetchError::transient(format!("network error: {e}")))?;

        let status = response.status();
        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|e| FetchError::fatal(format!("malformed response: {e}")));
        }

        let body = response.text().await.unwrap_or_default();
        Err(self.classify_error(status.as_u16(), &body))
    }

    /// Classify an error response into a structured [`FetchError`]
    ///
    /// The API's structured `error.errors[].reason` is preferred over the
    /// HTTP status; only when the body carries no reason does the status
    /// alone decide.
    fn classify_error(&self, status: u16, body: &str) -> FetchError {
        let parsed: Option<ApiErrorBody> = serde_json::from_str(body).ok();
        let reason = parsed
            .as_ref()
            .and_then(|b| b.error.errors.first())
            .map(|e| e.reason.as_str());
        let message = parsed
            .as_ref()
            .map(|b| b.error.message.clone())
            .unwrap_or_else(|| format!("HTTP {status}"));

        if self.quota_rules.is_quota_signal(status, reason) {
            warn!(status = status, reason = ?reason, "Quota signal from API");
            return FetchError::quota(message);
        }

        match (status, reason) {
            (_, Some("keyInvalid")) | (401, _) => {
                FetchError::fatal(format!("key rejected: {message}"))
            }
            (400 | 404, _) => FetchError::invalid(message),
            (s, _) if s >= 500 => FetchError::transient(format!("server error {s}: {message}")),
            (403, _) => FetchError::fatal(format!("forbidden: {message}")),
            _ => FetchError::fatal(format!("HTTP {status}: {message}")),
        }
    }

    /// Look up the owning channel ID for a video reference
    async fn resolve_video_channel(&self, video_id: &str, api_key: &str) -> FetchResult<String> {
        let response: VideoListResponse = self
            .get_json(
                "/videos",
                &[("part", "snippet"), ("id", video_id), ("key", api_key)],
            )
            .await?;

        response
            .items
            .into_iter()
            .next()
            .map(|v| v.snippet.channel_id)
            .ok_or_else(|| FetchError::invalid(format!("video not found: {video_id}")))
    }

    async fn fetch_channel(
        &self,
        selector: (&str, &str),
        api_key: &str,
    ) -> FetchResult<ChannelInfo> {
        let (param, value) = selector;
        let response: ChannelListResponse = self
            .get_json(
                "/channels",
                &[("part", CHANNEL_PARTS), (param, value), ("key", api_key)],
            )
            .await?;

        let raw = response
            .items
            .into_iter()
            .next()
            .ok_or_else(|| FetchError::invalid(format!("channel not found: {value}")))?;

        raw.into_channel_info()
    }
}

#[async_trait]
impl ChannelFetcher for YoutubeDataApi {
    async fn fetch(&self, reference: &ChannelRef, api_key: &str) -> FetchResult<ChannelInfo> {
        let selector: (&str, String) = match reference.kind() {
            RefKind::ChannelId => ("id", reference.value().to_string()),
            RefKind::Handle => ("forHandle", reference.value().to_string()),
            RefKind::Username => ("forUsername", reference.value().to_string()),
            RefKind::Video => {
                let channel_id = self
                    .resolve_video_channel(reference.value(), api_key)
                    .await?;
                ("id", channel_id)
            }
        };

        self.fetch_channel((selector.0, &selector.1), api_key).await
    }
}

#[async_trait]
impl KeyValidator for YoutubeDataApi {
    /// Probe the key with a minimal channel lookup
    ///
    /// A key whose quota is already depleted cannot serve this batch and is
    /// reported unusable rather than valid-but-exhausted.
    async fn validate(&self, key: &str) -> Result<bool, String> {
        let result: FetchResult<ProbeListResponse> = self
            .get_json(
                "/channels",
                &[("part", "id"), ("id", VALIDATION_PROBE_CHANNEL), ("key", key)],
            )
            .await;

        match result {
            Ok(response) => {
                debug!(items = response.items.len(), "Validation probe succeeded");
                Ok(true)
            }
            Err(e) => match e.kind {
                crate::fetcher::FetchErrorKind::Transient => Err(e.message),
                _ => Ok(false),
            },
        }
    }
}

/// Structured API error body
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
    #[serde(default)]
    errors: Vec<ApiErrorItem>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorItem {
    reason: String,
}

#[derive(Debug, Deserialize)]
struct ChannelListResponse {
    #[serde(default)]
    items: Vec<RawChannel>,
}

/// Response shape for the `part=id` validation probe. Those responses carry
/// only channel ids, no snippet or statistics, so the full channel shape
/// must not be used here.
#[derive(Debug, Deserialize)]
struct ProbeListResponse {
    #[serde(default)]
    items: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RawChannel {
    id: String,
    snippet: RawSnippet,
    statistics: RawStatistics,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSnippet {
    title: String,
    #[serde(default)]
    description: String,
    custom_url: Option<String>,
    published_at: Option<String>,
    country: Option<String>,
}

/// The API reports all counts as decimal strings
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawStatistics {
    subscriber_count: Option<String>,
    #[serde(default)]
    hidden_subscriber_count: bool,
    video_count: Option<String>,
    view_count: Option<String>,
}

impl RawChannel {
    fn into_channel_info(self) -> FetchResult<ChannelInfo> {
        let subscriber_count = if self.statistics.hidden_subscriber_count {
            None
        } else {
            parse_opt_count(self.statistics.subscriber_count.as_deref(), "subscriberCount")?
        };

        let info = ChannelInfo {
            channel_id: self.id,
            title: self.snippet.title,
            description: self.snippet.description,
            custom_url: self.snippet.custom_url,
            published_at: self.snippet.published_at,
            country: self.snippet.country,
            subscriber_count,
            video_count: parse_opt_count(self.statistics.video_count.as_deref(), "videoCount")?
                .unwrap_or(0),
            view_count: parse_opt_count(self.statistics.view_count.as_deref(), "viewCount")?
                .unwrap_or(0),
        };

        info.validate().map_err(FetchError::fatal)?;
        Ok(info)
    }
}

fn parse_opt_count(raw: Option<&str>, field: &str) -> FetchResult<Option<u64>> {
    match raw {
        None => Ok(None),
        Some(s) => s
            .parse::<u64>()
            .map(Some)
            .map_err(|_| FetchError::fatal(format!("malformed {field}: {s:?}"))),
    }
}

#[derive(Debug, Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<RawVideo>,
}

#[derive(Debug, Deserialize)]
struct RawVideo {
    snippet: RawVideoSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawVideoSnippet {
    channel_id: String,
}
