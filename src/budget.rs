use std::time::{Duration, Instant};

use crate::diagnostic::{ErrorKind, Fault};
use crate::options::{CancelToken, Options};

/// How often (in cycles) the wall clock is consulted.
const CLOCK_INTERVAL: u64 = 1024;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Exhausted {
    #[error("step limit of {limit} cycles exceeded")]
    StepLimit { limit: u64 },
    #[error("cancelled after {steps} cycles")]
    Cancelled { steps: u64 },
    #[error("timed out after {} ms", .timeout.as_millis())]
    TimedOut { timeout: Duration },
}

impl Fault for Exhausted {
    fn kind(&self) -> ErrorKind {
        match self {
            Exhausted::StepLimit { .. } => ErrorKind::StepLimitExceeded,
            Exhausted::Cancelled { .. } => ErrorKind::Cancelled,
            Exhausted::TimedOut { .. } => ErrorKind::TimedOut,
        }
    }
}

/// Fetch-cycle accounting for one `evaluate` call.
///
/// `tick` runs before every fetch: exactly `max_steps` cycles may execute,
/// the next one fails.
#[derive(Debug)]
pub struct Budget {
    steps: u64,
    max_steps: Option<u64>,
    timeout: Option<Duration>,
    deadline: Option<Instant>,
    cancel: Option<CancelToken>,
}

impl Budget {
    pub fn new(options: &Options, default_max_steps: Option<u64>) -> Self {
        Budget {
            steps: 0,
            max_steps: options.max_steps.or(default_max_steps),
            timeout: options.timeout,
            // A timeout too large to represent leaves the run without a deadline.
            deadline: options.timeout.and_then(|t| Instant::now().checked_add(t)),
            cancel: options.cancel.clone(),
        }
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn tick(&mut self) -> Result<(), Exhausted> {
        if let Some(limit) = self.max_steps {
            if self.steps >= limit {
                return Err(Exhausted::StepLimit { limit });
            }
        }
        if self.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
            return Err(Exhausted::Cancelled { steps: self.steps });
        }
        if self.steps % CLOCK_INTERVAL == 0 {
            if let (Some(deadline), Some(timeout)) = (self.deadline, self.timeout) {
                if Instant::now() >= deadline {
                    return Err(Exhausted::TimedOut { timeout });
                }
            }
        }
        self.steps += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_exactly_the_limit() {
        let mut budget = Budget::new(&Options::new().max_steps(3), None);
        for _ in 0..3 {
            budget.tick().unwrap();
        }
        assert_eq!(budget.tick(), Err(Exhausted::StepLimit { limit: 3 }));
        assert_eq!(budget.steps(), 3);
    }

    #[test]
    fn option_overrides_default_limit() {
        let mut budget = Budget::new(&Options::new().max_steps(1), Some(100));
        budget.tick().unwrap();
        assert!(budget.tick().is_err());
    }

    #[test]
    fn unbounded_without_limit() {
        let mut budget = Budget::new(&Options::new(), None);
        for _ in 0..10_000 {
            budget.tick().unwrap();
        }
    }

    #[test]
    fn cancelled_token_stops_next_tick() {
        let token = CancelToken::new();
        let mut budget = Budget::new(&Options::new().cancel(token.clone()), None);
        budget.tick().unwrap();
        token.cancel();
        assert_eq!(budget.tick(), Err(Exhausted::Cancelled { steps: 1 }));
    }

    #[test]
    fn huge_timeout_means_no_deadline() {
        let mut budget = Budget::new(&Options::new().timeout(Duration::MAX), None);
        for _ in 0..5_000 {
            budget.tick().unwrap();
        }
        assert_eq!(budget.steps(), 5_000);
    }

    #[test]
    fn zero_timeout_fires_on_first_tick() {
        let mut budget = Budget::new(&Options::new().timeout(Duration::ZERO), None);
        let err = budget.tick().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TimedOut);
    }
}
