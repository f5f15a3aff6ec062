use std::time::Duration;

/// Floor applied when a provider has no usable quota, so successive calls
/// never hammer the endpoint back to back.
const MIN_BACKOFF_SECS: f64 = 0.1;

/// Fixed margin on top of the quota-derived delay to absorb clock skew and
/// network jitter between us and the provider's rate accounting.
const SAFETY_MARGIN_SECS: f64 = 0.9;

/// Delay to apply between successive calls to a provider, derived from its
/// calls-per-minute quota. Pure function of configuration; never zero.
pub fn pacing_delay(calls_per_minute: Option<i64>) -> Duration {
    match calls_per_minute {
        Some(quota) if quota > 0 => {
            Duration::from_secs_f64(60.0 / quota as f64 + SAFETY_MARGIN_SECS)
        }
        _ => Duration::from_secs_f64(MIN_BACKOFF_SECS),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positive_quota_gets_spacing_plus_margin() {
        assert_eq!(pacing_delay(Some(60)), Duration::from_secs_f64(1.9));
        assert_eq!(pacing_delay(Some(20)), Duration::from_secs_f64(3.9));
    }

    #[test]
    fn missing_or_bad_quota_falls_back_to_min_backoff() {
        assert_eq!(pacing_delay(None), Duration::from_secs_f64(0.1));
        assert_eq!(pacing_delay(Some(0)), Duration::from_secs_f64(0.1));
        assert_eq!(pacing_delay(Some(-5)), Duration::from_secs_f64(0.1));
    }

    #[test]
    fn delay_is_never_zero() {
        for quota in [None, Some(0), Some(1), Some(100_000)] {
            assert!(pacing_delay(quota) > Duration::ZERO);
        }
    }
}
