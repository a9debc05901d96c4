//! Per-provider call budgets.
//!
//! YouTube and Gemini have per-minute quotas; every attempt (retries
//! included) waits for a cell before it is sent. Trends and autocomplete are
//! unmetered.

use std::num::NonZeroU32;

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};

use crate::types::SignalSource;

pub(crate) struct ProviderLimits {
    youtube: Option<DefaultDirectRateLimiter>,
    gemini: Option<DefaultDirectRateLimiter>,
}

impl ProviderLimits {
    /// A budget of zero calls per minute disables limiting for that provider.
    pub(crate) fn per_minute(youtube: u32, gemini: u32) -> Self {
        Self {
            youtube: limiter(youtube),
            gemini: limiter(gemini),
        }
    }

    /// Wait until `source` may send another request.
    pub(crate) async fn until_ready(&self, source: SignalSource) {
        let limiter = match source {
            SignalSource::YouTube => self.youtube.as_ref(),
            SignalSource::Gemini => self.gemini.as_ref(),
            SignalSource::Trends | SignalSource::Autocomplete => None,
        };
        let Some(limiter) = limiter else {
            return;
        };
        if limiter.check().is_err() {
            tracing::debug!(source = %source, "provider rate limit reached, waiting");
            limiter.until_ready().await;
        }
    }
}

fn limiter(calls_per_minute: u32) -> Option<DefaultDirectRateLimiter> {
    NonZeroU32::new(calls_per_minute).map(|n| RateLimiter::direct(Quota::per_minute(n)))
}
