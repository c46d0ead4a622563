use std::time::Duration;
use tokio::time::Instant;

/// Slack subtracted on top of the interval when a baseline is invalidated.
pub const INVALIDATE_SLACK: Duration = Duration::from_secs(1);

/// Reference point from which one interval is measured.
///
/// `DistantPast` always counts as elapsed, which is how a fresh coordinator
/// makes its very first check eligible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Baseline {
    DistantPast,
    At(Instant),
}

impl Baseline {
    pub fn distant_past() -> Self {
        Baseline::DistantPast
    }

    /// Absolute distance between the baseline and `now`.
    ///
    /// A baseline ahead of `now` still yields a positive distance. `None`
    /// means the baseline is in the distant past.
    pub fn elapsed(&self, now: Instant) -> Option<Duration> {
        match self {
            Baseline::DistantPast => None,
            Baseline::At(at) if now >= *at => Some(now.duration_since(*at)),
            Baseline::At(at) => Some(at.duration_since(now)),
        }
    }

    pub fn has_elapsed(&self, interval: Duration, now: Instant) -> bool {
        self.elapsed(now).map_or(true, |elapsed| elapsed > interval)
    }

    pub fn reset(&mut self, now: Instant) {
        *self = Baseline::At(now);
    }

    /// Rewinds the baseline so the next `has_elapsed(interval, ..)` is true.
    pub fn invalidate(&mut self, interval: Duration, now: Instant) {
        *self = interval
            .checked_add(INVALIDATE_SLACK)
            .and_then(|rewind| now.checked_sub(rewind))
            .map_or(Baseline::DistantPast, Baseline::At);
    }
}

impl Default for Baseline {
    fn default() -> Self {
        Self::distant_past()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIVE: Duration = Duration::from_secs(5);

    #[test]
    fn test_distant_past_is_always_elapsed() {
        let baseline = Baseline::distant_past();
        let now = Instant::now();
        assert!(baseline.elapsed(now).is_none());
        assert!(baseline.has_elapsed(Duration::from_secs(86_400), now));
    }

    #[test]
    fn test_reset_starts_counting_from_now() {
        let now = Instant::now();
        let mut baseline = Baseline::distant_past();
        baseline.reset(now);

        assert_eq!(baseline.elapsed(now), Some(Duration::ZERO));
        assert!(!baseline.has_elapsed(FIVE, now + Duration::from_secs(4)));
        assert!(!baseline.has_elapsed(FIVE, now + FIVE));
        assert!(baseline.has_elapsed(FIVE, now + Duration::from_millis(5_001)));
    }

    #[test]
    fn test_future_baseline_uses_absolute_distance() {
        let now = Instant::now();
        let baseline = Baseline::At(now + Duration::from_secs(7));

        assert_eq!(baseline.elapsed(now), Some(Duration::from_secs(7)));
        assert!(baseline.has_elapsed(FIVE, now));
    }

    #[test]
    fn test_invalidate_forces_elapsed() {
        let now = Instant::now() + Duration::from_secs(3_600);
        let mut baseline = Baseline::distant_past();
        baseline.reset(now);
        assert!(!baseline.has_elapsed(FIVE, now));

        baseline.invalidate(FIVE, now);
        assert!(baseline.has_elapsed(FIVE, now));
        assert_eq!(baseline.elapsed(now), Some(FIVE + INVALIDATE_SLACK));
    }

    #[test]
    fn test_invalidate_falls_back_to_distant_past() {
        let now = Instant::now();
        let mut baseline = Baseline::At(now);

        baseline.invalidate(Duration::MAX, now);
        assert_eq!(baseline, Baseline::DistantPast);
    }
}
