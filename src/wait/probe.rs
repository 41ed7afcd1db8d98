use std::{thread, time::Duration};

use crate::endpoint::Endpoint;

use super::connector::Connector;

#[derive(Debug, Clone)]
pub struct ProbeRequest {
    pub endpoint: Endpoint,
    /// Maximum number of connection attempts.
    pub budget: u32,
}

impl ProbeRequest {
    pub fn new(endpoint: Endpoint, budget: u32) -> Self {
        Self { endpoint, budget }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub name: String,
    pub reachable: bool,
    pub attempts: u32,
    /// Nominal time spent retrying; connect latency isn't counted.
    pub elapsed: Duration,
}

impl ProbeOutcome {
    #[inline]
    pub fn elapsed_secs(&self) -> u64 {
        self.elapsed.as_secs()
    }
}

/// Attempts to connect once per `interval` until it succeeds or the
/// request's budget runs out.
pub fn probe(request: ProbeRequest, connector: &dyn Connector, interval: Duration) -> ProbeOutcome {
    let ProbeRequest { endpoint, budget } = request;

    log::debug!("Reaching {} within {} attempt(s)", endpoint, budget);

    for attempt in 0..budget {
        match connector.connect(&endpoint) {
            Ok(()) => {
                let elapsed = interval * attempt;
                log::info!(
                    "{} has been reached after {} seconds!",
                    endpoint.name(),
                    elapsed.as_secs()
                );

                return ProbeOutcome {
                    name: endpoint.name().into(),
                    reachable: true,
                    attempts: attempt + 1,
                    elapsed,
                };
            }
            Err(e) if e.is_refusal() => {
                log::debug!("Attempt {} on {} refused: {}", attempt + 1, endpoint, e)
            }
            Err(e) => log::warn!("Attempt {} on {} failed: {}", attempt + 1, endpoint, e),
        }

        thread::sleep(interval);
    }

    ProbeOutcome {
        name: endpoint.name().into(),
        reachable: false,
        attempts: budget,
        elapsed: interval * budget,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::error::WaitError;

    /// Refuses the first `refusals` attempts, then accepts.
    #[derive(Debug)]
    struct Flaky {
        refusals: u32,
        calls: AtomicU32,
    }

    impl Flaky {
        fn new(refusals: u32) -> Self {
            Self {
                refusals,
                calls: AtomicU32::new(0),
            }
        }
    }

    impl Connector for Flaky {
        fn connect(&self, endpoint: &Endpoint) -> Result<(), WaitError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) < self.refusals {
                Err(WaitError::NoAddress(endpoint.host().into()))
            } else {
                Ok(())
            }
        }
    }

    const TICK: Duration = Duration::from_millis(10);

    fn request(budget: u32) -> ProbeRequest {
        ProbeRequest::new(Endpoint::new("svc", "localhost", 9000).unwrap(), budget)
    }

    #[test]
    fn immediate_success_has_zero_elapsed() {
        let outcome = probe(request(5), &Flaky::new(0), TICK);
        assert!(outcome.reachable);
        assert_eq!(outcome.attempts, 1);
        assert_eq!(outcome.elapsed, Duration::ZERO);
        assert_eq!(outcome.name, "svc");
    }

    #[test]
    fn success_after_retries_counts_intervals() {
        let connector = Flaky::new(2);
        let outcome = probe(request(5), &connector, TICK);
        assert!(outcome.reachable);
        assert_eq!(outcome.attempts, 3);
        assert_eq!(outcome.elapsed, TICK * 2);
        assert_eq!(connector.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn exhausted_budget_is_unreachable() {
        let connector = Flaky::new(u32::MAX);
        let outcome = probe(request(4), &connector, TICK);
        assert!(!outcome.reachable);
        assert_eq!(outcome.attempts, 4);
        assert_eq!(outcome.elapsed, TICK * 4);
        assert_eq!(connector.calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn zero_budget_never_attempts() {
        let connector = Flaky::new(0);
        let outcome = probe(request(0), &connector, TICK);
        assert!(!outcome.reachable);
        assert_eq!(outcome.attempts, 0);
        assert_eq!(connector.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn whole_seconds_at_default_cadence() {
        let outcome = ProbeOutcome {
            name: "svc".into(),
            reachable: false,
            attempts: 5,
            elapsed: Duration::from_secs(1) * 5,
        };
        assert_eq!(outcome.elapsed_secs(), 5);
    }
}
