//! YouTube Data API endpoint constants and quota classification rules

use std::collections::HashSet;

/// Base URL for YouTube Data API v3
pub const API_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";

/// Response parts requested for channel lookups
pub const CHANNEL_PARTS: &str = "snippet,statistics";

/// HTTP connect timeout (seconds) - time to establish TCP connection
pub const HTTP_CONNECT_TIMEOUT_SECS: u64 = 10;

/// HTTP request timeout (seconds) - overall time for the entire request
pub const HTTP_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Classification rules for quota/rate-limit signals
///
/// The API reports quota conditions through an HTTP status plus a structured
/// `error.errors[].reason` code. Which statuses and reasons count as quota
/// exhaustion is a configuration point, not a hardcoded string match: callers
/// integrating a different backend can supply their own rules.
#[derive(Debug, Clone)]
pub struct QuotaRules {
    statuses: HashSet<u16>,
    reasons: HashSet<String>,
}

impl QuotaRules {
    /// Build custom rules from status codes and reason codes
    pub fn new(
        statuses: impl IntoIterator<Item = u16>,
        reasons: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            statuses: statuses.into_iter().collect(),
            reasons: reasons.into_iter().collect(),
        }
    }

    /// Whether a (status, reason) pair signals quota exhaustion
    ///
    /// A matching reason is authoritative on its own; a matching status only
    /// counts when the body carried no structured reason at all.
    pub fn is_quota_signal(&self, status: u16, reason: Option<&str>) -> bool {
        match reason {
            Some(reason) => self.reasons.contains(reason),
            None => self.statuses.contains(&status),
        }
    }
}

impl Default for QuotaRules {
    /// Documented YouTube Data API quota signals: 403/429 with
    /// quota-specific reason codes
    fn default() -> Self {
        Self::new(
            [403u16, 429],
            [
                "quotaExceeded".to_string(),
                "rateLimitExceeded".to_string(),
                "userRateLimitExceeded".to_string(),
                "dailyLimitExceeded".to_string(),
            ],
        )
    }
}
