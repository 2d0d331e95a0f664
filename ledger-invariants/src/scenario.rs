//! Scenario runner: deterministic replay with invariant checkpoints
//!
//! # State machine
//!
//! ```text
//! Idle ──step──▶ Running { index, total } ──last op──▶ Completed
//! ```
//!
//! Rejected operations do not stop a replay; they are recorded and the next
//! operation runs. Only malformed input (a checkpoint past the end of the
//! operation list) is an error, and it is raised before anything runs.
//!
//! # Scenario files
//!
//! ```toml
//! name = "semantic-state-drift"
//! participants = ["owner", "user1"]
//! checkpoints = [0]
//!
//! [engine]
//! arithmetic = "checked"
//!
//! [initial]
//! aggregate = "1000"
//! [initial.balances]
//! owner = "1000"
//!
//! [[operations]]
//! op = "fee_transfer"
//! from = "owner"
//! to = "user1"
//! amount = "100"
//! fee = "10"
//! mode = "drifting"
//! ```

use crate::{
    checker::{reconcile, InvariantChecker, InvariantReport, ReportReconciliation},
    config::EngineConfig,
    engine::{LedgerEngine, OperationOutcome},
    ledger::Ledger,
    metrics::Metrics,
    operation::Operation,
    types::AccountId,
    Error, Result,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use tracing::{info, warn};

/// Replay progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunnerState {
    /// No operation applied yet
    Idle,
    /// `index` operations applied out of `total`
    Running {
        /// Operations applied so far
        index: usize,
        /// Operations in the scenario
        total: usize,
    },
    /// Every operation applied
    Completed,
}

/// Invariant report taken after the operation at `index`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointReport {
    /// Operation index the check follows
    pub index: usize,
    /// Check result
    #[serde(flatten)]
    pub report: InvariantReport,
}

/// Everything a replay produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioResult {
    /// Ledger after the last operation
    pub final_ledger: Ledger,
    /// One outcome per operation, in order
    pub outcomes: Vec<OperationOutcome>,
    /// Reports at the requested checkpoints, in operation order
    pub checkpoints: Vec<CheckpointReport>,
    /// Report before the first operation
    pub baseline: InvariantReport,
    /// Report after the last operation
    pub final_report: InvariantReport,
    /// Announced versus applied amounts over every outcome
    pub reconciliation: ReportReconciliation,
}

impl ScenarioResult {
    /// Committed operations with their index
    pub fn applied(&self) -> impl Iterator<Item = (usize, &OperationOutcome)> {
        self.outcomes.iter().enumerate().filter(|(_, o)| o.succeeded)
    }

    /// Rejected operations with their index
    pub fn rejected(&self) -> impl Iterator<Item = (usize, &OperationOutcome)> {
        self.outcomes.iter().enumerate().filter(|(_, o)| !o.succeeded)
    }

    /// Checkpoint with the largest drift magnitude (earliest on ties)
    pub fn max_drift(&self) -> Option<&CheckpointReport> {
        self.checkpoints.iter().fold(None, |best, c| match best {
            Some(b) if b.report.drift.magnitude() >= c.report.drift.magnitude() => Some(b),
            _ => Some(c),
        })
    }

    /// Report recorded after operation `index`, if it was a checkpoint
    pub fn checkpoint(&self, index: usize) -> Option<&InvariantReport> {
        self.checkpoints
            .iter()
            .find(|c| c.index == index)
            .map(|c| &c.report)
    }
}

impl fmt::Display for ScenarioResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "baseline: {}", self.baseline)?;
        writeln!(f, "operations:")?;
        for (index, outcome) in self.outcomes.iter().enumerate() {
            write!(f, "  [{}] {} ({})", index, outcome.kind, outcome.mode)?;
            match outcome.failure_reason {
                None => write!(f, " ok aggregate {}", outcome.aggregate_delta)?,
                Some(reason) => write!(f, " REJECTED: {}", reason)?,
            }
            if outcome.is_false_report() || outcome.is_misreported() {
                if let Some(reported) = outcome.reported {
                    write!(f, " announced {}", reported)?;
                }
            }
            for delta in &outcome.balance_deltas {
                write!(f, " {}:{}", delta.account, delta.delta)?;
            }
            writeln!(f)?;
            if let Some(report) = self.checkpoint(index) {
                writeln!(f, "      checkpoint: {}", report)?;
            }
        }
        writeln!(f, "final: {}", self.final_report)?;
        writeln!(f, "reports: {}", self.reconciliation)?;
        writeln!(f, "balances:")?;
        for (account, balance) in self.final_ledger.balances() {
            writeln!(f, "  {} = {}", account, balance)?;
        }
        write!(f, "aggregate = {}", self.final_ledger.get_aggregate())
    }
}

/// Replays operation sequences through a [`LedgerEngine`]
#[derive(Debug, Default)]
pub struct ScenarioRunner {
    engine: LedgerEngine,
    metrics: Option<Metrics>,
}

impl ScenarioRunner {
    /// Create runner around `engine`
    pub fn new(engine: LedgerEngine) -> Self {
        Self {
            engine,
            metrics: None,
        }
    }

    /// Record outcomes and checks into `metrics`
    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Underlying engine
    pub fn engine(&self) -> &LedgerEngine {
        &self.engine
    }

    /// Validate input and prepare a step-wise replay
    pub fn start(
        &self,
        initial: Ledger,
        ops: Vec<Operation>,
        checkpoints: &[usize],
        accounts: Vec<AccountId>,
    ) -> Result<Replay<'_>> {
        self.start_with(&self.engine, initial, ops, checkpoints, accounts)
    }

    fn start_with<'r>(
        &'r self,
        engine: &'r LedgerEngine,
        initial: Ledger,
        ops: Vec<Operation>,
        checkpoints: &[usize],
        accounts: Vec<AccountId>,
    ) -> Result<Replay<'r>> {
        if let Some(bad) = checkpoints.iter().find(|&&c| c >= ops.len()) {
            return Err(Error::Configuration(format!(
                "Checkpoint {} out of range for {} operations",
                bad,
                ops.len()
            )));
        }

        let checker = InvariantChecker::new(accounts);
        let baseline = checker.check(&initial);

        Ok(Replay {
            engine,
            metrics: self.metrics.as_ref(),
            ledger: initial,
            checkpoints: checkpoints.iter().copied().collect(),
            checker,
            state: RunnerState::Idle,
            next: 0,
            outcomes: Vec::with_capacity(ops.len()),
            reports: Vec::new(),
            baseline,
            ops,
        })
    }

    /// Replay `ops` from `initial`, checking the invariant over `accounts`
    /// after every index listed in `checkpoints`
    pub fn run(
        &self,
        initial: Ledger,
        ops: Vec<Operation>,
        checkpoints: &[usize],
        accounts: Vec<AccountId>,
    ) -> Result<ScenarioResult> {
        Ok(self.start(initial, ops, checkpoints, accounts)?.finish())
    }

    /// Replay a scenario document.
    ///
    /// A scenario with an `[engine]` block replays under an engine built from
    /// it (default recipient policy over its deny list). Otherwise the
    /// runner's own engine is used.
    pub fn run_scenario(&self, scenario: &Scenario) -> Result<ScenarioResult> {
        let own_engine = scenario.engine.as_ref().map(LedgerEngine::new);
        let engine = own_engine.as_ref().unwrap_or(&self.engine);

        info!(
            scenario = %scenario.name,
            operations = scenario.operations.len(),
            arithmetic = %engine.arithmetic(),
            scenario_engine = own_engine.is_some(),
            "Starting scenario"
        );

        let result = self
            .start_with(
                engine,
                scenario.initial.clone(),
                scenario.operations.clone(),
                &scenario.checkpoints,
                scenario.resolved_participants(),
            )?
            .finish();

        info!(
            scenario = %scenario.name,
            rejected = result.rejected().count(),
            drift = %result.final_report.drift,
            report_discrepancy = %result.reconciliation.discrepancy,
            "Scenario completed"
        );

        Ok(result)
    }
}

/// In-progress replay owned by one caller
#[derive(Debug)]
pub struct Replay<'r> {
    engine: &'r LedgerEngine,
    metrics: Option<&'r Metrics>,
    ledger: Ledger,
    ops: Vec<Operation>,
    checkpoints: BTreeSet<usize>,
    checker: InvariantChecker,
    state: RunnerState,
    next: usize,
    outcomes: Vec<OperationOutcome>,
    reports: Vec<CheckpointReport>,
    baseline: InvariantReport,
}

impl<'r> Replay<'r> {
    /// Current state
    pub fn state(&self) -> RunnerState {
        self.state
    }

    /// Ledger as of the last applied operation
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Outcomes so far
    pub fn outcomes(&self) -> &[OperationOutcome] {
        &self.outcomes
    }

    /// Apply the next operation. `None` once completed.
    pub fn step(&mut self) -> Option<&OperationOutcome> {
        let total = self.ops.len();
        if self.next >= total {
            self.state = RunnerState::Completed;
            return None;
        }

        let index = self.next;
        let outcome = self.engine.apply(&mut self.ledger, &self.ops[index]);
        if let Some(metrics) = self.metrics {
            metrics.record_operation(outcome.succeeded);
        }
        self.outcomes.push(outcome);
        self.next += 1;

        if self.checkpoints.contains(&index) {
            let report = self.checker.check(&self.ledger);
            if !report.holds {
                warn!(index, drift = %report.drift, "Invariant violated at checkpoint");
            }
            if let Some(metrics) = self.metrics {
                metrics.record_check(&report);
            }
            self.reports.push(CheckpointReport { index, report });
        }

        self.state = if self.next == total {
            RunnerState::Completed
        } else {
            RunnerState::Running {
                index: self.next,
                total,
            }
        };

        self.outcomes.last()
    }

    /// Apply the remaining operations and collect the result
    pub fn finish(mut self) -> ScenarioResult {
        while self.step().is_some() {}

        let final_report = self.checker.check(&self.ledger);
        let reconciliation = reconcile(&self.outcomes);
        if !reconciliation.holds {
            warn!(
                false_reports = reconciliation.false_reports,
                misreported = reconciliation.misreported,
                discrepancy = %reconciliation.discrepancy,
                "Announcements diverge from state"
            );
        }

        ScenarioResult {
            final_ledger: self.ledger,
            outcomes: self.outcomes,
            checkpoints: self.reports,
            baseline: self.baseline,
            final_report,
            reconciliation,
        }
    }
}

/// Self-contained scenario document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name
    pub name: String,

    /// Free-form description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Engine override (arithmetic mode, deny list)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine: Option<EngineConfig>,

    /// Starting ledger
    #[serde(default)]
    pub initial: Ledger,

    /// Accounts summed by the invariant checker; empty means "every account named"
    #[serde(default)]
    pub participants: Vec<AccountId>,

    /// Operations, in replay order
    #[serde(default)]
    pub operations: Vec<Operation>,

    /// Operation indices followed by an invariant check
    #[serde(default)]
    pub checkpoints: Vec<usize>,
}

impl Scenario {
    /// Load from a TOML file
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Scenario(format!("Failed to parse scenario: {}", e)))
    }

    /// Load from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Load by extension (`.json` as JSON, anything else as TOML)
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_file(path),
            _ => Self::from_toml_file(path),
        }
    }

    /// Explicit participants, or every account in the initial ledger and
    /// the operations, in first-seen order
    pub fn resolved_participants(&self) -> Vec<AccountId> {
        if !self.participants.is_empty() {
            return self.participants.clone();
        }

        let mut seen = BTreeSet::new();
        self.initial
            .accounts()
            .cloned()
            .chain(self.operations.iter().flat_map(|op| op.action.accounts()))
            .filter(|a| seen.insert(a.clone()))
            .collect()
    }

    /// Engine for this scenario, falling back to `default`
    pub fn engine_config(&self, default: &EngineConfig) -> EngineConfig {
        self.engine.clone().unwrap_or_else(|| default.clone())
    }
}
