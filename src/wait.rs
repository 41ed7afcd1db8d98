use std::{
    any::Any,
    collections::HashSet,
    panic::{self, AssertUnwindSafe},
    sync::{
        mpsc::{self, RecvTimeoutError},
        Arc,
    },
    time::{Duration, Instant},
};

use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::{endpoint::Endpoint, error::WaitError};

use self::probe::probe;

mod connector;
mod probe;
mod report;

pub use connector::{Connector, TcpConnector};
pub use probe::{ProbeOutcome, ProbeRequest};
pub use report::{EndpointStatus, ReachabilityReport, WaitResult};

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);
pub const DEFAULT_WORKERS: usize = 10;

/// How a probe's attempt budget relates to the global deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BudgetPolicy {
    /// Every probe gets its full budget, whatever is left of the deadline.
    Independent,
    /// A probe only gets the attempts that fit before the deadline,
    /// counted from the moment a worker picks it up.
    #[default]
    ClampToDeadline,
}

#[derive(Debug, Clone)]
pub struct WaitConfig {
    pub host: String,
    /// Global deadline for the whole run.
    pub timeout: Duration,
    /// Attempts per endpoint. Derived from `timeout` when unset.
    pub budget: Option<u32>,
    pub workers: usize,
    pub retry_interval: Duration,
    pub connect_timeout: Duration,
    pub poll_interval: Duration,
    pub budget_policy: BudgetPolicy,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.into(),
            timeout: DEFAULT_TIMEOUT,
            budget: None,
            workers: DEFAULT_WORKERS,
            retry_interval: Duration::from_secs(1),
            connect_timeout: Duration::from_secs(1),
            poll_interval: Duration::from_millis(500),
            budget_policy: BudgetPolicy::default(),
        }
    }
}

impl WaitConfig {
    pub fn validate(&self) -> Result<(), WaitError> {
        if self.timeout.is_zero() {
            return Err(WaitError::InvalidConfig("timeout must be positive"));
        }
        if self.workers == 0 {
            return Err(WaitError::InvalidConfig("at least one worker is required"));
        }
        if self.retry_interval.is_zero() {
            return Err(WaitError::InvalidConfig("retry interval must be positive"));
        }
        if self.poll_interval.is_zero() {
            return Err(WaitError::InvalidConfig("poll interval must be positive"));
        }
        if self.budget == Some(0) {
            return Err(WaitError::InvalidConfig("budget must be at least one attempt"));
        }
        Ok(())
    }

    /// Attempts granted to each probe before any clamping.
    pub fn budget(&self) -> u32 {
        self.budget
            .unwrap_or_else(|| attempts_within(self.timeout, self.retry_interval))
    }
}

/// Number of attempts spaced by `interval` that start inside `window`.
fn attempts_within(window: Duration, interval: Duration) -> u32 {
    if window.is_zero() {
        return 0;
    }
    let attempts = (window.as_secs_f64() / interval.as_secs_f64()).ceil();
    attempts.min(u32::MAX as f64) as u32
}

enum TaskReport {
    Finished(ProbeOutcome),
    Failed { name: String, reason: String },
}

fn panic_reason(payload: Box<dyn Any + Send>) -> String {
    match payload.downcast::<String>() {
        Ok(msg) => *msg,
        Err(payload) => match payload.downcast::<&'static str>() {
            Ok(msg) => (*msg).to_owned(),
            Err(_) => "unknown panic".to_owned(),
        },
    }
}

/// Runs one probe per endpoint on a fixed-size pool and enforces the
/// global deadline. Every run gets a pool of its own, so probes abandoned
/// by an earlier run never hold up a later one.
pub struct Coordinator {
    config: WaitConfig,
    connector: Arc<dyn Connector>,
}

impl Coordinator {
    pub fn new(config: WaitConfig) -> Result<Self, WaitError> {
        let connector = Arc::new(TcpConnector::new(config.connect_timeout));
        Self::with_connector(config, connector)
    }

    pub fn with_connector(
        config: WaitConfig,
        connector: Arc<dyn Connector>,
    ) -> Result<Self, WaitError> {
        config.validate()?;

        Ok(Self { config, connector })
    }

    fn build_pool(&self) -> Result<ThreadPool, WaitError> {
        ThreadPoolBuilder::new()
            .num_threads(self.config.workers)
            .thread_name(|i| format!("portwait-worker-{}", i))
            .build()
            .map_err(WaitError::PoolBuildFailed)
    }

    fn dispatch(
        &self,
        pool: &ThreadPool,
        endpoint: Endpoint,
        start: Instant,
        tx: mpsc::Sender<TaskReport>,
    ) {
        let connector = Arc::clone(&self.connector);
        let budget = self.config.budget();
        let policy = self.config.budget_policy;
        let deadline = self.config.timeout;
        let interval = self.config.retry_interval;

        pool.spawn(move || {
            let budget = match policy {
                BudgetPolicy::Independent => budget,
                BudgetPolicy::ClampToDeadline => {
                    let remaining = deadline.saturating_sub(start.elapsed());
                    budget.min(attempts_within(remaining, interval))
                }
            };

            let name = endpoint.name().to_owned();
            let request = ProbeRequest::new(endpoint, budget);
            let report = match panic::catch_unwind(AssertUnwindSafe(|| {
                probe(request, connector.as_ref(), interval)
            })) {
                Ok(outcome) => TaskReport::Finished(outcome),
                Err(payload) => TaskReport::Failed {
                    name,
                    reason: panic_reason(payload),
                },
            };

            // The coordinator may have stopped listening already.
            let _ = tx.send(report);
        });
    }

    /// Probes every endpoint and returns once all of them are reachable,
    /// every probe has finished, or the global deadline has passed.
    /// Probes still running at the deadline are abandoned.
    pub fn run(&self, endpoints: &[Endpoint]) -> Result<WaitResult, WaitError> {
        if endpoints.is_empty() {
            return Err(WaitError::NoEndpoints);
        }
        let mut seen = HashSet::new();
        if let Some(dup) = endpoints.iter().find(|e| !seen.insert(e.name())) {
            return Err(WaitError::DuplicateEndpoint(dup.name().into()));
        }

        // Dropped on return; abandoned probes finish in the background.
        let pool = self.build_pool()?;

        let start = Instant::now();
        let deadline = self.config.timeout;
        let mut report = ReachabilityReport::new(endpoints);

        let (tx, rx) = mpsc::channel();
        for endpoint in endpoints {
            self.dispatch(&pool, endpoint.clone(), start, tx.clone());
        }
        drop(tx);

        log::debug!(
            "Dispatched {} probe(s) on {} worker(s), deadline {}s",
            endpoints.len(),
            self.config.workers,
            deadline.as_secs()
        );

        while !report.all_reachable() {
            let remaining = deadline.saturating_sub(start.elapsed());
            if remaining.is_zero() {
                log::warn!(
                    "Deadline of {} seconds reached, abandoning outstanding probes",
                    deadline.as_secs()
                );
                break;
            }

            match rx.recv_timeout(self.config.poll_interval.min(remaining)) {
                Ok(TaskReport::Finished(outcome)) => {
                    if outcome.reachable {
                        log::info!(
                            "{} is reachable (attempt {}, {} seconds)",
                            outcome.name,
                            outcome.attempts,
                            outcome.elapsed_secs()
                        );
                    } else {
                        log::info!(
                            "{} is not reachable after {} attempt(s)",
                            outcome.name,
                            outcome.attempts
                        );
                    }
                    report.record(outcome);
                }
                Ok(TaskReport::Failed { name, reason }) => {
                    log::error!("Probe for {} panicked: {}", name, reason);
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    log::debug!("Every probe has finished");
                    break;
                }
            }
        }

        let result = WaitResult::new(report, start.elapsed());
        for status in result.statuses() {
            log::info!("{}", status);
        }

        Ok(result)
    }
}

/// Builds a coordinator for `config` and runs it once.
pub fn wait_for(endpoints: &[Endpoint], config: WaitConfig) -> Result<WaitResult, WaitError> {
    Coordinator::new(config)?.run(endpoints)
}
