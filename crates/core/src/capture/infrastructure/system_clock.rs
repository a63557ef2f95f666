use std::time::{Duration, Instant};

use crate::capture::domain::clock::Clock;

/// Wall clock backed by `Instant` and `thread::sleep`.
///
/// Sleep precision is whatever the OS scheduler gives, typically a few
/// milliseconds.
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_is_monotonic() {
        let clock = SystemClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }

    #[test]
    fn test_sleep_until_waits_for_deadline() {
        let clock = SystemClock::new();
        let deadline = clock.now() + Duration::from_millis(20);
        clock.sleep_until(deadline);
        assert!(clock.now() >= deadline);
    }

    #[test]
    fn test_sleep_until_past_deadline_returns_immediately() {
        let clock = SystemClock::new();
        std::thread::sleep(Duration::from_millis(5));
        let before = Instant::now();
        clock.sleep_until(Duration::ZERO);
        assert!(before.elapsed() < Duration::from_millis(50));
    }
}
