use std::time::Duration;

/// First delay after a temporary accept failure.
pub(crate) const ACCEPT_BACKOFF_START: Duration = Duration::from_millis(5);
/// Ceiling for consecutive-failure doubling.
pub(crate) const ACCEPT_BACKOFF_CAP: Duration = Duration::from_secs(1);

/// Exponential backoff for temporary accept failures.
///
/// Starts at 5 ms, doubles on each consecutive failure, caps at 1 s, and
/// resets on the next successful accept.
#[derive(Debug, Default)]
pub(crate) struct AcceptBackoff {
    delay: Option<Duration>,
}

impl AcceptBackoff {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// The delay to sleep before retrying the failed accept.
    pub(crate) fn next(&mut self) -> Duration {
        let delay = match self.delay {
            None => ACCEPT_BACKOFF_START,
            Some(prev) => ACCEPT_BACKOFF_CAP.min(prev * 2),
        };
        self.delay = Some(delay);
        delay
    }

    pub(crate) fn reset(&mut self) {
        self.delay = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_from_five_millis() {
        let mut backoff = AcceptBackoff::new();
        assert_eq!(backoff.next(), Duration::from_millis(5));
        assert_eq!(backoff.next(), Duration::from_millis(10));
        assert_eq!(backoff.next(), Duration::from_millis(20));
        assert_eq!(backoff.next(), Duration::from_millis(40));
    }

    #[test]
    fn caps_at_one_second() {
        let mut backoff = AcceptBackoff::new();
        for _ in 0..16 {
            backoff.next();
        }
        assert_eq!(backoff.next(), Duration::from_secs(1));
    }

    #[test]
    fn reset_restarts_the_sequence() {
        let mut backoff = AcceptBackoff::new();
        backoff.next();
        backoff.next();
        backoff.reset();
        assert_eq!(backoff.next(), Duration::from_millis(5));
    }
}
