#![forbid(unsafe_code)]

//! Tuning knobs for the timeline engine.
//!
//! Defaults can be overridden from the environment:
//!
//! | Variable                      | Field               |
//! |-------------------------------|---------------------|
//! | `FTUI_TIMELINE_LOOKAHEAD`     | `lookahead`         |
//! | `FTUI_TIMELINE_THROTTLE_MS`   | `throttle_interval` |
//! | `FTUI_TIMELINE_RETRY_MS`      | `retry_backoff`     |
//! | `FTUI_TIMELINE_RETRY_MAX_MS`  | `retry_backoff_max` |
//! | `FTUI_TIMELINE_SEED_BACKWARD` | `seed_backward`     |
//! | `FTUI_TIMELINE_STRICT`        | `strict_indices`    |

use std::time::Duration;

/// Configuration for [`Timeline`](crate::timeline::Timeline).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineConfig {
    /// Early-trigger margin in rows for both edges. Default: 10.
    pub lookahead: usize,

    /// Minimum spacing between scroll evaluations. Default: 100ms.
    pub throttle_interval: Duration,

    /// Delay before a failed edge may be fetched again. Doubles per
    /// consecutive failure. Default: 500ms.
    pub retry_backoff: Duration,

    /// Ceiling for the doubled retry delay. Default: 8s.
    pub retry_backoff_max: Duration,

    /// Issue one backward fetch right after the first successful load.
    /// Default: true.
    pub seed_backward: bool,

    /// Panic on visible-range inconsistencies instead of logging them.
    /// Default: on in debug builds.
    pub strict_indices: bool,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            lookahead: 10,
            throttle_interval: Duration::from_millis(100),
            retry_backoff: Duration::from_millis(500),
            retry_backoff_max: Duration::from_secs(8),
            seed_backward: true,
            strict_indices: cfg!(debug_assertions),
        }
    }
}

#[inline]
fn env_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

impl TimelineConfig {
    /// Defaults overridden by `FTUI_TIMELINE_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable lookup.
    ///
    /// Unparseable values are ignored.
    #[must_use]
    pub fn from_env_with<F>(get_env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(val) = get_env("FTUI_TIMELINE_LOOKAHEAD")
            && let Ok(n) = val.trim().parse()
        {
            config.lookahead = n;
        }
        if let Some(val) = get_env("FTUI_TIMELINE_THROTTLE_MS")
            && let Ok(ms) = val.trim().parse()
        {
            config.throttle_interval = Duration::from_millis(ms);
        }
        if let Some(val) = get_env("FTUI_TIMELINE_RETRY_MS")
            && let Ok(ms) = val.trim().parse()
        {
            config.retry_backoff = Duration::from_millis(ms);
        }
        if let Some(val) = get_env("FTUI_TIMELINE_RETRY_MAX_MS")
            && let Ok(ms) = val.trim().parse()
        {
            config.retry_backoff_max = Duration::from_millis(ms);
        }
        if let Some(val) = get_env("FTUI_TIMELINE_SEED_BACKWARD") {
            config.seed_backward = env_flag(&val);
        }
        if let Some(val) = get_env("FTUI_TIMELINE_STRICT") {
            config.strict_indices = env_flag(&val);
        }
        config
    }

    /// Set the lookahead margin.
    #[must_use]
    pub fn with_lookahead(mut self, rows: usize) -> Self {
        self.lookahead = rows;
        self
    }

    /// Set the throttle interval.
    #[must_use]
    pub fn with_throttle_interval(mut self, interval: Duration) -> Self {
        self.throttle_interval = interval;
        self
    }

    /// Set base and maximum retry backoff.
    #[must_use]
    pub fn with_retry_backoff(mut self, base: Duration, max: Duration) -> Self {
        self.retry_backoff = base;
        self.retry_backoff_max = max.max(base);
        self
    }

    /// Enable or disable the first-load backward seed fetch.
    #[must_use]
    pub fn with_seed_backward(mut self, seed: bool) -> Self {
        self.seed_backward = seed;
        self
    }

    /// Enable or disable strict index checking.
    #[must_use]
    pub fn with_strict_indices(mut self, strict: bool) -> Self {
        self.strict_indices = strict;
        self
    }

    /// Backoff after `failures` consecutive failures (`failures >= 1`).
    #[must_use]
    pub fn backoff_for(&self, failures: u32) -> Duration {
        let shift = failures.saturating_sub(1).min(16);
        self.retry_backoff
            .saturating_mul(1u32 << shift)
            .min(self.retry_backoff_max)
    }
}
