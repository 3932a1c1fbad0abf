//! Tests for quota signal classification rules

use channel_batch_fetcher::fetcher::api_config::QuotaRules;

#[test]
fn test_default_rules_cover_documented_quota_reasons() {
    let rules = QuotaRules::default();

    for reason in [
        "quotaExceeded",
        "rateLimitExceeded",
        "userRateLimitExceeded",
        "dailyLimitExceeded",
    ] {
        assert!(rules.is_quota_signal(403, Some(reason)), "reason: {reason}");
    }
}

#[test]
fn test_reason_code_overrides_status() {
    let rules = QuotaRules::default();

    // A 403 whose body names a non-quota reason must not be treated as quota
    assert!(!rules.is_quota_signal(403, Some("keyInvalid")));
    assert!(!rules.is_quota_signal(429, Some("forbidden")));

    // A quota reason counts even on an unexpected status
    assert!(rules.is_quota_signal(200, Some("quotaExceeded")));
}

#[test]
fn test_status_fallback_only_without_reason() {
    let rules = QuotaRules::default();

    assert!(rules.is_quota_signal(403, None));
    assert!(rules.is_quota_signal(429, None));
    assert!(!rules.is_quota_signal(500, None));
    assert!(!rules.is_quota_signal(404, None));
}

#[test]
fn test_custom_rules_replace_defaults() {
    let rules = QuotaRules::new([402u16], ["credits_exhausted".to_string()]);

    assert!(rules.is_quota_signal(402, None));
    assert!(rules.is_quota_signal(500, Some("credits_exhausted")));
    assert!(!rules.is_quota_signal(403, None));
    assert!(!rules.is_quota_signal(403, Some("quotaExceeded")));
}
