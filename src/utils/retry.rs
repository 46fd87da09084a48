//! Exponential backoff with jitter, shared by RPC retries and feed reconnects

use rand::Rng;
use std::time::Duration;

use crate::utils::constants::RETRY_JITTER_PERCENT;

/// Delay before retry number `attempt` (1-based): `base * 2^(attempt-1)`,
/// capped at `max_ms`, then jittered by ±`RETRY_JITTER_PERCENT`.
pub fn backoff_delay(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    let exp = attempt.saturating_sub(1).min(16);
    let capped = base_ms.saturating_mul(1_u64 << exp).min(max_ms);

    let jitter_range = (capped * RETRY_JITTER_PERCENT / 100) as i64;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(-jitter_range..=jitter_range)
    } else {
        0
    };

    Duration::from_millis((capped as i64 + jitter).max(base_ms as i64 / 2) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn within(delay: Duration, nominal: u64) -> bool {
        let ms = delay.as_millis() as u64;
        let slack = nominal * RETRY_JITTER_PERCENT / 100;
        ms >= nominal - slack && ms <= nominal + slack
    }

    #[test]
    fn test_backoff_doubles() {
        assert!(within(backoff_delay(1, 1_000, 30_000), 1_000));
        assert!(within(backoff_delay(2, 1_000, 30_000), 2_000));
        assert!(within(backoff_delay(3, 1_000, 30_000), 4_000));
    }

    #[test]
    fn test_backoff_is_capped() {
        for attempt in 6..40 {
            assert!(within(backoff_delay(attempt, 1_000, 30_000), 30_000));
        }
    }
}
