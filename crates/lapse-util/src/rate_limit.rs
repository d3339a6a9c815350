//! Rate limiting utilities

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Simple token-bucket rate limiter, one bucket per key
///
/// Chat webhooks throttle per channel, so notification senders key the
/// limiter by channel name.
#[derive(Debug)]
pub struct RateLimiter {
    /// Maximum tokens (requests) per bucket
    max_tokens: u32,
    /// How often tokens are replenished
    refill_interval: Duration,
    buckets: HashMap<String, Bucket>,
}

#[derive(Debug)]
struct Bucket {
    tokens: u32,
    last_refill: Instant,
}

impl RateLimiter {
    /// Create a new rate limiter
    ///
    /// # Arguments
    /// * `max_requests` - Maximum requests allowed per interval
    /// * `interval` - Time interval for the limit
    pub fn new(max_requests: u32, interval: Duration) -> Self {
        Self {
            max_tokens: max_requests,
            refill_interval: interval,
            buckets: HashMap::new(),
        }
    }

    /// Check if a request should be allowed for the given key
    ///
    /// Returns `true` if allowed, `false` if rate limited
    pub fn check(&mut self, key: &str) -> bool {
        self.check_at(key, Instant::now())
    }

    /// How long the caller should wait before `key` has a token again
    pub fn wait_time(&self, key: &str) -> Duration {
        match self.buckets.get(key) {
            Some(bucket) if bucket.tokens == 0 => self
                .refill_interval
                .saturating_sub(bucket.last_refill.elapsed()),
            _ => Duration::ZERO,
        }
    }

    fn check_at(&mut self, key: &str, now: Instant) -> bool {
        let max_tokens = self.max_tokens;
        let bucket = self.buckets.entry(key.to_string()).or_insert(Bucket {
            tokens: max_tokens,
            last_refill: now,
        });

        // Refill tokens if interval has passed
        let elapsed = now.duration_since(bucket.last_refill);
        if elapsed >= self.refill_interval {
            let intervals = (elapsed.as_millis() / self.refill_interval.as_millis().max(1)) as u32;
            bucket.tokens = bucket
                .tokens
                .saturating_add(intervals.saturating_mul(max_tokens))
                .min(max_tokens);
            bucket.last_refill = now;
        }

        if bucket.tokens > 0 {
            bucket.tokens -= 1;
            true
        } else {
            false
        }
    }
}
