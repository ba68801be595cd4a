use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Expired windows are swept once this many keys are tracked.
const PRUNE_ABOVE: usize = 1024;

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    hits: u32,
}

/// Fixed-window counter per key.
#[derive(Debug)]
pub struct RateLimiter {
    window: Duration,
    max_hits: u32,
    prune_above: usize,
    windows: Mutex<HashMap<String, Window>>,
}

impl Default for RateLimiter {
    /// Five attempts per key per minute.
    fn default() -> Self {
        Self::new(Duration::from_secs(60), 5)
    }
}

impl RateLimiter {
    pub fn new(window: Duration, max_hits: u32) -> Self {
        Self {
            window,
            max_hits,
            prune_above: PRUNE_ABOVE,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Count an attempt for `key`. Returns false once the window is full.
    pub fn check(&self, key: &str, now: Instant) -> bool {
        let mut windows = self.windows.lock().unwrap_or_else(PoisonError::into_inner);
        if windows.len() >= self.prune_above && !windows.contains_key(key) {
            let window = self.window;
            windows.retain(|_, w| now.saturating_duration_since(w.started) < window);
        }
        let entry = windows.entry(key.to_string()).or_insert(Window {
            started: now,
            hits: 0,
        });
        if now.saturating_duration_since(entry.started) >= self.window {
            *entry = Window {
                started: now,
                hits: 0,
            };
        }
        if entry.hits >= self.max_hits {
            return false;
        }
        entry.hits += 1;
        true
    }
}
