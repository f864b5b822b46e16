use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Per-email limiter for reset mails, fixed window keyed on the lowercased
/// address.
pub struct ResetRequestLimiter {
    /// email -> (sent_count, window_start)
    entries: DashMap<String, (u32, Instant)>,
    limit: u32,
    window: Duration,
}

impl ResetRequestLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            limit,
            window,
        }
    }

    /// Three mails per address every 15 minutes.
    pub fn standard() -> Self {
        Self::new(3, Duration::from_secs(15 * 60))
    }

    /// Counts an attempt for `email`. Returns Err with the seconds until the
    /// window resets once the limit is reached.
    pub fn check(&self, email: &str) -> Result<(), u64> {
        self.check_at(email, Instant::now())
    }

    fn check_at(&self, email: &str, now: Instant) -> Result<(), u64> {
        let mut entry = self
            .entries
            .entry(email.to_lowercase())
            .or_insert((0, now));
        let (count, start) = entry.value_mut();

        if now.duration_since(*start) > self.window {
            *count = 1;
            *start = now;
            return Ok(());
        }

        if *count >= self.limit {
            let elapsed = now.duration_since(*start).as_secs();
            return Err(self.window.as_secs().saturating_sub(elapsed));
        }

        *count += 1;
        Ok(())
    }

    /// Remove entries whose window has passed.
    pub fn cleanup(&self) {
        let now = Instant::now();
        self.entries
            .retain(|_, (_, start)| now.duration_since(*start) <= self.window);
    }
}
