use async_trait::async_trait;
use std::time::Duration;
use tracing::warn;

use crate::config::GitHubConfig;

/// Suspends the calling flow. Abstracted so the guard's pause path can be observed.
#[async_trait]
pub trait Pause: Send + Sync {
    async fn pause(&self, duration: Duration);
}

/// Production pause backed by the tokio timer.
pub struct TokioPause;

#[async_trait]
impl Pause for TokioPause {
    async fn pause(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Flat pause when the remaining API quota drops below a threshold.
/// No retry loop and no backoff curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateGuard {
    pub threshold: u32,
    pub pause: Duration,
}

impl RateGuard {
    pub fn new(threshold: u32, pause: Duration) -> Self {
        Self { threshold, pause }
    }

    pub fn from_config(config: &GitHubConfig) -> Self {
        Self::new(
            config.rate_limit_threshold,
            Duration::from_secs(config.rate_limit_pause_secs),
        )
    }

    pub fn should_pause(&self, remaining: u32) -> bool {
        remaining < self.threshold
    }

    /// Pause once if `remaining` is below the threshold. Returns whether it paused.
    pub async fn check(&self, remaining: u32, pauser: &dyn Pause) -> bool {
        if !self.should_pause(remaining) {
            return false;
        }
        warn!(
            remaining,
            pause_secs = self.pause.as_secs(),
            "nearing GitHub rate limit, waiting before further requests"
        );
        pauser.pause(self.pause).await;
        true
    }
}

impl Default for RateGuard {
    fn default() -> Self {
        Self::new(10, Duration::from_secs(60))
    }
}
