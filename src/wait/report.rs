use std::{
    fmt::{self, Display},
    time::Duration,
};

use indexmap::IndexMap;

use crate::{endpoint::Endpoint, error::WaitError};

use super::probe::ProbeOutcome;

/// Latest outcome per requested endpoint, in request order. `None`
/// means the endpoint was never confirmed reachable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReachabilityReport {
    outcomes: IndexMap<String, Option<ProbeOutcome>>,
}

impl ReachabilityReport {
    pub(crate) fn new(endpoints: &[Endpoint]) -> Self {
        Self {
            outcomes: endpoints
                .iter()
                .map(|e| (e.name().to_owned(), None))
                .collect(),
        }
    }

    /// Stores `outcome` unless its endpoint is unknown or already
    /// reachable. Returns whether the report changed.
    pub(crate) fn record(&mut self, outcome: ProbeOutcome) -> bool {
        match self.outcomes.get_mut(&outcome.name) {
            Some(Some(current)) if current.reachable => false,
            Some(slot) => {
                *slot = Some(outcome);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, name: &str) -> Option<&ProbeOutcome> {
        self.outcomes.get(name).and_then(Option::as_ref)
    }

    pub fn is_reachable(&self, name: &str) -> bool {
        self.get(name).map_or(false, |o| o.reachable)
    }

    pub fn all_reachable(&self) -> bool {
        self.outcomes
            .values()
            .all(|o| o.as_ref().map_or(false, |o| o.reachable))
    }

    pub fn unreachable(&self) -> Vec<String> {
        self.outcomes
            .keys()
            .filter(|name| !self.is_reachable(name))
            .cloned()
            .collect()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.outcomes.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// One status per endpoint. Endpoints never confirmed reachable
    /// report the whole run's duration.
    pub fn statuses(&self, total: Duration) -> Vec<EndpointStatus> {
        self.outcomes
            .iter()
            .map(|(name, outcome)| match outcome {
                Some(o) if o.reachable => EndpointStatus::new(name, true, o.elapsed_secs()),
                Some(o) => EndpointStatus::new(name, false, o.elapsed_secs().max(total.as_secs())),
                None => EndpointStatus::new(name, false, total.as_secs()),
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointStatus {
    pub name: String,
    pub reachable: bool,
    pub elapsed_secs: u64,
}

impl EndpointStatus {
    fn new(name: &str, reachable: bool, elapsed_secs: u64) -> Self {
        Self {
            name: name.into(),
            reachable,
            elapsed_secs,
        }
    }
}

impl Display for EndpointStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} reachable after {} seconds",
            self.name,
            if self.reachable { "was" } else { "was not" },
            self.elapsed_secs
        )
    }
}

/// Frozen output of a finished run.
#[derive(Debug, Clone)]
pub struct WaitResult {
    pub report: ReachabilityReport,
    pub elapsed: Duration,
}

impl WaitResult {
    pub(crate) fn new(report: ReachabilityReport, elapsed: Duration) -> Self {
        Self { report, elapsed }
    }

    /// True only if every endpoint was reached before the deadline.
    pub fn is_success(&self) -> bool {
        self.report.all_reachable()
    }

    pub fn statuses(&self) -> Vec<EndpointStatus> {
        self.report.statuses(self.elapsed)
    }

    pub fn into_result(self) -> Result<WaitResult, WaitError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(WaitError::Unreachable(self.report.unreachable()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoints() -> Vec<Endpoint> {
        Endpoint::parse_all(&["web:8080", "db:5432"], "localhost").unwrap()
    }

    fn outcome(name: &str, reachable: bool, secs: u64) -> ProbeOutcome {
        ProbeOutcome {
            name: name.into(),
            reachable,
            attempts: secs as u32 + 1,
            elapsed: Duration::from_secs(secs),
        }
    }

    #[test]
    fn starts_with_every_endpoint_unconfirmed() {
        let report = ReachabilityReport::new(&endpoints());
        assert_eq!(report.len(), 2);
        assert!(!report.is_empty());
        assert!(report.get("web").is_none());
        assert!(!report.all_reachable());
        assert_eq!(report.unreachable(), ["web", "db"]);
    }

    #[test]
    fn reachable_is_terminal() {
        let mut report = ReachabilityReport::new(&endpoints());
        assert!(report.record(outcome("web", true, 2)));
        assert!(!report.record(outcome("web", false, 5)));
        assert!(report.is_reachable("web"));
        assert_eq!(report.get("web").unwrap().elapsed_secs(), 2);
    }

    #[test]
    fn unreachable_can_be_upgraded() {
        let mut report = ReachabilityReport::new(&endpoints());
        assert!(report.record(outcome("db", false, 5)));
        assert!(report.record(outcome("db", true, 1)));
        assert!(report.is_reachable("db"));
    }

    #[test]
    fn unknown_names_do_not_change_the_key_set() {
        let mut report = ReachabilityReport::new(&endpoints());
        assert!(!report.record(outcome("cache", true, 0)));
        assert_eq!(report.names().collect::<Vec<_>>(), ["web", "db"]);
    }

    #[test]
    fn statuses_fill_in_run_duration() {
        let mut report = ReachabilityReport::new(&endpoints());
        report.record(outcome("web", true, 2));
        let result = WaitResult::new(report, Duration::from_millis(5300));

        let lines: Vec<String> = result.statuses().iter().map(ToString::to_string).collect();
        assert_eq!(
            lines,
            [
                "web was reachable after 2 seconds",
                "db was not reachable after 5 seconds"
            ]
        );
        assert!(!result.is_success());
    }

    #[test]
    fn failure_lists_unreachable_endpoints() {
        let mut report = ReachabilityReport::new(&endpoints());
        report.record(outcome("db", true, 0));
        let err = WaitResult::new(report, Duration::from_secs(1))
            .into_result()
            .unwrap_err();
        assert!(matches!(err, WaitError::Unreachable(names) if names == ["web"]));
    }

    #[test]
    fn success_when_all_reachable() {
        let mut report = ReachabilityReport::new(&endpoints());
        report.record(outcome("web", true, 0));
        report.record(outcome("db", true, 1));
        assert!(WaitResult::new(report, Duration::from_secs(1))
            .into_result()
            .is_ok());
    }
}
