//! Retry scheduling.

use chrono::Duration;
use folio_core::config::WebhookConfig;

/// Delay until the next attempt, given the attempt number that just
/// failed (1-based). With a fixed schedule configured, the schedule is
/// consulted by index and its last entry repeats; otherwise the delay is
/// exponential, `base * 2^(attempt-1)`.
pub fn next_delay(config: &WebhookConfig, failed_attempt: i32) -> Duration {
    let failed_attempt = failed_attempt.max(1);

    if let Some(schedule) = &config.retry_schedule_secs {
        if let Some(&secs) = schedule
            .get((failed_attempt - 1) as usize)
            .or_else(|| schedule.last())
        {
            return Duration::seconds(secs.max(0));
        }
    }

    let factor = 2i64.saturating_pow((failed_attempt - 1).min(32) as u32);
    Duration::seconds(config.base_delay_secs.saturating_mul(factor))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> WebhookConfig {
        WebhookConfig::default()
    }

    #[test]
    fn test_exponential_backoff_doubles_per_attempt() {
        let config = config();
        assert_eq!(next_delay(&config, 1), Duration::seconds(60));
        assert_eq!(next_delay(&config, 2), Duration::seconds(120));
        assert_eq!(next_delay(&config, 3), Duration::seconds(240));
    }

    #[test]
    fn test_attempt_below_one_is_clamped() {
        let config = config();
        assert_eq!(next_delay(&config, 0), Duration::seconds(60));
        assert_eq!(next_delay(&config, -5), Duration::seconds(60));
    }

    #[test]
    fn test_fixed_schedule_overrides_exponential() {
        let mut config = config();
        config.retry_schedule_secs = Some(vec![10, 30, 90]);
        assert_eq!(next_delay(&config, 1), Duration::seconds(10));
        assert_eq!(next_delay(&config, 2), Duration::seconds(30));
        assert_eq!(next_delay(&config, 3), Duration::seconds(90));
        // Past the end, the last entry repeats.
        assert_eq!(next_delay(&config, 7), Duration::seconds(90));
    }

    #[test]
    fn test_empty_schedule_falls_back_to_exponential() {
        let mut config = config();
        config.retry_schedule_secs = Some(vec![]);
        assert_eq!(next_delay(&config, 1), Duration::seconds(60));
    }

    #[test]
    fn test_large_attempt_numbers_do_not_overflow() {
        let config = config();
        let delay = next_delay(&config, i32::MAX);
        assert!(delay > Duration::seconds(0));
    }
}
