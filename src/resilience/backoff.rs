//! Poll delays with exponential growth and jitter.

use std::time::Duration;

use rand::Rng;

/// Calculate exponential backoff delay with jitter.
///
/// `attempt` is 1-based; attempt 0 yields no delay. The result is capped at
/// `max_ms` before up to 10% jitter is added.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }

    let factor = 2u64.saturating_pow(attempt - 1);
    let capped = base_ms.saturating_mul(factor).min(max_ms);

    let jitter_range = capped / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped + jitter)
}

/// Successive delays for polling an ACME order.
///
/// With `base == max` this is the fixed-interval poll ACME servers expect;
/// a larger `max` backs off for slow CAs.
#[derive(Debug, Clone)]
pub struct PollSchedule {
    base_ms: u64,
    max_ms: u64,
    attempt: u32,
}

impl PollSchedule {
    pub fn new(base: Duration, max: Duration) -> Self {
        let base_ms = base.as_millis().max(1) as u64;
        Self {
            base_ms,
            max_ms: (max.as_millis() as u64).max(base_ms),
            attempt: 0,
        }
    }

    /// Delay before the next poll.
    pub fn next_delay(&mut self) -> Duration {
        self.attempt = self.attempt.saturating_add(1);
        calculate_backoff(self.attempt, self.base_ms, self.max_ms)
    }

    /// Number of delays handed out so far.
    pub fn attempts(&self) -> u32 {
        self.attempt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_calculation() {
        assert_eq!(calculate_backoff(0, 100, 2000), Duration::ZERO);

        let b1 = calculate_backoff(1, 100, 2000);
        assert!(b1.as_millis() >= 100 && b1.as_millis() < 110);

        let b2 = calculate_backoff(2, 100, 2000);
        assert!(b2.as_millis() >= 200);

        let capped = calculate_backoff(10, 100, 1000);
        assert!(capped.as_millis() >= 1000 && capped.as_millis() < 1100);
    }

    #[test]
    fn fixed_schedule_stays_near_base() {
        let mut schedule = PollSchedule::new(Duration::from_secs(2), Duration::from_secs(2));
        for _ in 0..5 {
            let d = schedule.next_delay().as_millis();
            assert!((2000..2200).contains(&d), "delay {d}ms out of range");
        }
        assert_eq!(schedule.attempts(), 5);
    }

    #[test]
    fn growing_schedule_is_capped() {
        let mut schedule = PollSchedule::new(Duration::from_millis(500), Duration::from_secs(4));
        let delays: Vec<u128> = (0..6).map(|_| schedule.next_delay().as_millis()).collect();
        assert!(delays[0] >= 500 && delays[0] < 550);
        assert!(delays[2] >= 2000);
        assert!(delays[5] >= 4000 && delays[5] < 4400);
    }

    #[test]
    fn max_below_base_is_raised() {
        let mut schedule = PollSchedule::new(Duration::from_millis(300), Duration::from_millis(10));
        assert!(schedule.next_delay().as_millis() >= 300);
    }
}
