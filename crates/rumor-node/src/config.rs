//! Configuration for gossip retry behavior.

use rand::Rng;
use std::time::Duration;

/// Hard floor on retry delays, regardless of configuration.
///
/// Keeps the retry frequency finite even if a caller configures a zero
/// base interval.
const MIN_RETRY_DELAY: Duration = Duration::from_millis(1);

/// Configuration for gossip dissemination and retry backoff.
#[derive(Debug, Clone)]
pub struct GossipConfig {
    /// Delay before the first retry of an unacknowledged gossip send.
    pub retry_base: Duration,
    /// Cap on the backoff delay between retries.
    pub retry_max: Duration,
    /// Multiplier applied to the delay after each attempt.
    pub backoff_factor: u32,
    /// Fraction of the delay added as random jitter (0.0 disables).
    pub jitter: f64,
}

impl Default for GossipConfig {
    fn default() -> Self {
        Self {
            retry_base: Duration::from_millis(100),
            retry_max: Duration::from_secs(2),
            backoff_factor: 2,
            jitter: 0.2,
        }
    }
}

impl GossipConfig {
    /// Creates a config tuned for lossy networks (tighter retries).
    #[must_use]
    pub fn lossy_network() -> Self {
        Self {
            retry_base: Duration::from_millis(50),
            retry_max: Duration::from_secs(1),
            ..Self::default()
        }
    }

    /// Creates a config tuned for quiet, reliable networks.
    #[must_use]
    pub fn quiet_network() -> Self {
        Self {
            retry_base: Duration::from_millis(500),
            retry_max: Duration::from_secs(5),
            ..Self::default()
        }
    }

    /// Sets the base retry delay.
    #[must_use]
    pub const fn with_retry_base(mut self, base: Duration) -> Self {
        self.retry_base = base;
        self
    }

    /// Sets the backoff cap.
    #[must_use]
    pub const fn with_retry_max(mut self, max: Duration) -> Self {
        self.retry_max = max;
        self
    }

    /// Sets the backoff multiplier.
    #[must_use]
    pub const fn with_backoff_factor(mut self, factor: u32) -> Self {
        self.backoff_factor = factor;
        self
    }

    /// Sets the jitter fraction.
    #[must_use]
    pub const fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter;
        self
    }

    /// Computes the delay before the next retry, given how many attempts
    /// have been made so far (the first send is attempt 1).
    ///
    /// Capped exponential backoff plus jitter, never below
    /// [`MIN_RETRY_DELAY`].
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = self.backoff_factor.max(1);
        let mut delay = self.retry_base;
        // Bounded loop: the cap is reached long before 16 doublings.
        for _ in 1..attempt.min(16) {
            delay = delay.saturating_mul(factor);
            if delay >= self.retry_max {
                break;
            }
        }
        delay = delay.min(self.retry_max);

        if self.jitter > 0.0 {
            let jitter = rand::thread_rng().gen_range(0.0..=self.jitter);
            delay = delay.saturating_add(delay.mul_f64(jitter));
        }

        delay.max(MIN_RETRY_DELAY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========== Preset Tests ==========

    #[test]
    fn default_config() {
        let config = GossipConfig::default();
        assert_eq!(config.retry_base, Duration::from_millis(100));
        assert_eq!(config.retry_max, Duration::from_secs(2));
        assert_eq!(config.backoff_factor, 2);
    }

    #[test]
    fn lossy_network_retries_faster() {
        let config = GossipConfig::lossy_network();
        assert!(config.retry_base < GossipConfig::default().retry_base);
    }

    #[test]
    fn config_builder() {
        let config = GossipConfig::default()
            .with_retry_base(Duration::from_millis(10))
            .with_retry_max(Duration::from_millis(80))
            .with_backoff_factor(3)
            .with_jitter(0.0);

        assert_eq!(config.retry_base, Duration::from_millis(10));
        assert_eq!(config.retry_max, Duration::from_millis(80));
        assert_eq!(config.backoff_factor, 3);
    }

    // ========== Backoff Tests ==========

    #[test]
    fn backoff_grows_then_caps() {
        let config = GossipConfig::default()
            .with_retry_base(Duration::from_millis(10))
            .with_retry_max(Duration::from_millis(50))
            .with_jitter(0.0);

        assert_eq!(config.delay_for_attempt(1), Duration::from_millis(10));
        assert_eq!(config.delay_for_attempt(2), Duration::from_millis(20));
        assert_eq!(config.delay_for_attempt(3), Duration::from_millis(40));
        assert_eq!(config.delay_for_attempt(4), Duration::from_millis(50));
        assert_eq!(config.delay_for_attempt(30), Duration::from_millis(50));
    }

    #[test]
    fn zero_base_still_has_positive_delay() {
        let config = GossipConfig::default()
            .with_retry_base(Duration::ZERO)
            .with_jitter(0.0);

        assert!(config.delay_for_attempt(1) >= MIN_RETRY_DELAY);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn delay_is_bounded(attempt in 1u32..100, base_ms in 0u64..500, max_ms in 1u64..5000) {
                let config = GossipConfig::default()
                    .with_retry_base(Duration::from_millis(base_ms))
                    .with_retry_max(Duration::from_millis(max_ms));

                let delay = config.delay_for_attempt(attempt);
                let cap = Duration::from_millis(max_ms).mul_f64(1.0 + config.jitter);

                prop_assert!(delay >= MIN_RETRY_DELAY);
                prop_assert!(delay <= cap.max(MIN_RETRY_DELAY));
            }
        }
    }
}
