//! Registry simulator
//!
//! Drives random register/unregister/replace sequences (with failing and
//! panicking teardowns, failing initializers) against a [`WidgetRegistry`]
//! and checks the lifecycle invariants after every operation.

use lazyslot_core::{BoxError, Instance, RegistryStats, Teardown, Widget, WidgetRegistry};
use parking_lot::Mutex;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Message carried by injected teardown panics
pub(crate) const SIMULATED_PANIC: &str = "simulated teardown panic";

/// Check if a panic message comes from an injected teardown panic
pub(crate) fn is_simulated_panic(message: &str) -> bool {
    message.contains(SIMULATED_PANIC)
}

/// Simulator configuration
#[derive(Debug, Clone, Serialize)]
pub(crate) struct SimulatorConfig {
    /// Random seed for reproducibility
    pub(crate) seed: u64,
    /// Total operations to execute
    pub(crate) total_operations: u64,
    /// Number of distinct slot keys
    pub(crate) keys: usize,
    /// Probability that an initializer or teardown fails
    pub(crate) fail_rate: f64,
    /// Stop at the first violation
    pub(crate) stop_on_first_violation: bool,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            total_operations: 10_000,
            keys: 4,
            fail_rate: 0.1,
            stop_on_first_violation: true,
        }
    }
}

/// What the initializer hands back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum SimKind {
    Bare,
    Teardown,
    FailingTeardown,
    PanickingTeardown,
    Widget,
}

/// All operations the simulator can generate
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub(crate) enum SimulatedOperation {
    Register {
        key: String,
        kind: SimKind,
        fail_init: bool,
    },
    Unregister {
        key: String,
    },
    Pause {
        key: String,
    },
    Resume {
        key: String,
    },
    Clear,
}

impl SimulatedOperation {
    fn name(&self) -> &'static str {
        match self {
            Self::Register { .. } => "register",
            Self::Unregister { .. } => "unregister",
            Self::Pause { .. } => "pause",
            Self::Resume { .. } => "resume",
            Self::Clear => "clear",
        }
    }
}

/// Types of invariant checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum InvariantCheck {
    TeardownRunsAtMostOnce,
    ReleasedTeardownRan,
    TeardownBeforeReinit,
    FailedInitLeavesSlotEmpty,
    LiveSetMatchesModel,
}

/// A violation detected during simulation
#[derive(Debug, Clone, Serialize)]
pub(crate) struct Violation {
    pub(crate) operation_index: u64,
    pub(crate) operation: SimulatedOperation,
    pub(crate) check: InvariantCheck,
    pub(crate) details: String,
}

/// Statistics collected during simulation
#[derive(Debug, Clone, Default, Serialize)]
pub(crate) struct OperationStats {
    pub(crate) total_operations: u64,
    pub(crate) failed_operations: u64,
    pub(crate) operations_by_type: BTreeMap<String, u64>,
}

impl OperationStats {
    fn record(&mut self, operation: &SimulatedOperation, failed: bool) {
        self.total_operations += 1;
        *self
            .operations_by_type
            .entry(operation.name().to_string())
            .or_insert(0) += 1;
        if failed {
            self.failed_operations += 1;
        }
    }
}

/// Final report from the simulator
#[derive(Debug, Clone, Serialize)]
pub(crate) struct SimulatorReport {
    pub(crate) config: SimulatorConfig,
    pub(crate) stats: OperationStats,
    pub(crate) registry: RegistryStats,
    pub(crate) violations: Vec<Violation>,
    pub(crate) final_live: Vec<String>,
}

impl SimulatorReport {
    /// Check if simulation passed all criteria
    pub(crate) fn passed(&self) -> bool {
        self.violations.is_empty()
    }

    /// Generate a text report
    pub(crate) fn generate_text(&self) -> String {
        let mut report = String::new();

        report.push_str("=== lazyslot Simulator Report ===\n\n");
        report.push_str(&format!("Seed: {}\n", self.config.seed));
        report.push_str(&format!("Keys: {}\n", self.config.keys));
        report.push_str(&format!("Total Operations: {}\n", self.stats.total_operations));
        report.push_str(&format!("Failed Operations: {}\n", self.stats.failed_operations));
        for (name, count) in &self.stats.operations_by_type {
            report.push_str(&format!("  {name}: {count}\n"));
        }
        report.push_str(&format!("Registrations: {}\n", self.registry.registrations));
        report.push_str(&format!("Replacements: {}\n", self.registry.replacements));
        report.push_str(&format!(
            "Teardowns: {} ({} failed)\n",
            self.registry.teardowns, self.registry.teardown_failures
        ));
        report.push_str(&format!("Init Failures: {}\n", self.registry.init_failures));
        report.push_str(&format!("Live At End: {}\n", self.final_live.join(", ")));
        report.push_str(&format!("Violations: {}\n", self.violations.len()));

        if !self.violations.is_empty() {
            report.push_str("\n=== Violations ===\n");
            for (i, v) in self.violations.iter().enumerate() {
                report.push_str(&format!(
                    "{}. #{} {:?} {:?}: {}\n",
                    i + 1,
                    v.operation_index,
                    v.check,
                    v.operation,
                    v.details
                ));
            }
        }

        report.push_str(&format!(
            "\n=== Result: {} ===\n",
            if self.passed() { "PASS" } else { "FAIL" }
        ));

        report
    }
}

/// Registration id -> number of teardown invocations
type Invocations = Arc<Mutex<HashMap<u64, u32>>>;

struct SimWidget {
    id: u64,
    invocations: Invocations,
}

impl Widget for SimWidget {
    fn destroy(self: Box<Self>) -> Result<(), BoxError> {
        *self.invocations.lock().entry(self.id).or_insert(0) += 1;
        Ok(())
    }

    fn pause(&mut self) -> bool {
        true
    }

    fn resume(&mut self) -> bool {
        true
    }
}

fn build_instance(kind: SimKind, id: u64, invocations: &Invocations) -> Instance {
    let counter = Arc::clone(invocations);
    let bump = move || *counter.lock().entry(id).or_insert(0) += 1;
    match kind {
        SimKind::Bare => Instance::Bare,
        SimKind::Teardown => Instance::teardown(bump),
        SimKind::FailingTeardown => Instance::Teardown(Teardown::new(move || {
            bump();
            Err("simulated teardown failure".into())
        })),
        SimKind::PanickingTeardown => Instance::teardown(move || {
            bump();
            panic!("{SIMULATED_PANIC}");
        }),
        SimKind::Widget => Instance::widget(SimWidget {
            id,
            invocations: Arc::clone(invocations),
        }),
    }
}

/// Run the simulator
pub(crate) fn run_simulator(config: SimulatorConfig) -> SimulatorReport {
    let mut registry = WidgetRegistry::new();
    let mut rng = StdRng::seed_from_u64(config.seed);
    let invocations: Invocations = Arc::default();
    let mut stats = OperationStats::default();
    let mut violations = Vec::new();

    // key -> live registration id (None for bare instances)
    let mut model: BTreeMap<String, Option<u64>> = BTreeMap::new();
    let mut released: Vec<u64> = Vec::new();

    for i in 0..config.total_operations {
        let operation = generate_operation(&mut rng, &config);
        let mut found: Vec<(InvariantCheck, String)> = Vec::new();
        let mut failed = false;

        match &operation {
            SimulatedOperation::Register {
                key,
                kind,
                fail_init,
            } => {
                let previous = model.remove(key).flatten();
                if let Some(prev) = previous {
                    released.push(prev);
                }

                let mut prev_count_at_init = None;
                let result = registry.register(key.as_str(), || -> Result<Instance, BoxError> {
                    if let Some(prev) = previous {
                        prev_count_at_init =
                            Some(invocations.lock().get(&prev).copied().unwrap_or(0));
                    }
                    if *fail_init {
                        return Err("simulated init failure".into());
                    }
                    Ok(build_instance(*kind, i, &invocations))
                });

                if let (Some(prev), Some(count)) = (previous, prev_count_at_init) {
                    if count != 1 {
                        found.push((
                            InvariantCheck::TeardownBeforeReinit,
                            format!("registration {prev} torn down {count} times before re-init"),
                        ));
                    }
                }

                match result {
                    Ok(()) => {
                        let tracked = (*kind != SimKind::Bare).then_some(i);
                        model.insert(key.clone(), tracked);
                    }
                    Err(_) => {
                        failed = true;
                        if registry.contains(key) {
                            found.push((
                                InvariantCheck::FailedInitLeavesSlotEmpty,
                                format!("slot '{key}' still live after failed init"),
                            ));
                        }
                    }
                }
            }
            SimulatedOperation::Unregister { key } => {
                let removed = registry.unregister(key);
                let expected = model.remove(key);
                if removed != expected.is_some() {
                    found.push((
                        InvariantCheck::LiveSetMatchesModel,
                        format!("unregister('{key}') returned {removed}"),
                    ));
                }
                if let Some(Some(prev)) = expected {
                    released.push(prev);
                }
            }
            SimulatedOperation::Pause { key } => {
                failed = !registry.pause(key);
            }
            SimulatedOperation::Resume { key } => {
                failed = !registry.resume(key);
            }
            SimulatedOperation::Clear => {
                registry.clear();
                released.extend(model.values().flatten().copied());
                model.clear();
            }
        }

        found.extend(check_invariants(&registry, &model, &released, &invocations));

        let stop = !found.is_empty() && config.stop_on_first_violation;
        for (check, details) in found {
            violations.push(Violation {
                operation_index: i,
                operation: operation.clone(),
                check,
                details,
            });
        }
        stats.record(&operation, failed);
        if stop {
            break;
        }
    }

    SimulatorReport {
        config,
        stats,
        registry: registry.stats(),
        violations,
        final_live: registry.active_keys().into_iter().map(String::from).collect(),
    }
}

fn check_invariants(
    registry: &WidgetRegistry,
    model: &BTreeMap<String, Option<u64>>,
    released: &[u64],
    invocations: &Invocations,
) -> Vec<(InvariantCheck, String)> {
    let mut found = Vec::new();
    let counts = invocations.lock();

    for (id, count) in counts.iter() {
        if *count > 1 {
            found.push((
                InvariantCheck::TeardownRunsAtMostOnce,
                format!("registration {id} torn down {count} times"),
            ));
        }
    }

    for id in released {
        if counts.get(id).copied().unwrap_or(0) != 1 {
            found.push((
                InvariantCheck::ReleasedTeardownRan,
                format!("released registration {id} was not torn down"),
            ));
        }
    }

    let mut live: Vec<&str> = registry.active_keys();
    live.sort_unstable();
    let expected: Vec<&str> = model.keys().map(String::as_str).collect();
    if live != expected {
        found.push((
            InvariantCheck::LiveSetMatchesModel,
            format!("live {live:?}, expected {expected:?}"),
        ));
    }

    found
}

/// Generate a random operation
fn generate_operation(rng: &mut StdRng, config: &SimulatorConfig) -> SimulatedOperation {
    let key = format!("slot-{}", rng.gen_range(0..config.keys.max(1)));

    match rng.gen_range(0..10) {
        0..=4 => {
            let kind = if rng.gen_bool(config.fail_rate) {
                if rng.gen_bool(0.5) {
                    SimKind::FailingTeardown
                } else {
                    SimKind::PanickingTeardown
                }
            } else {
                match rng.gen_range(0..3) {
                    0 => SimKind::Bare,
                    1 => SimKind::Teardown,
                    _ => SimKind::Widget,
                }
            };
            SimulatedOperation::Register {
                key,
                kind,
                fail_init: rng.gen_bool(config.fail_rate),
            }
        }
        5..=7 => SimulatedOperation::Unregister { key },
        8 => {
            if rng.gen_bool(0.5) {
                SimulatedOperation::Pause { key }
            } else {
                SimulatedOperation::Resume { key }
            }
        }
        _ => SimulatedOperation::Clear,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simulator_passes_with_defaults() {
        let report = run_simulator(SimulatorConfig {
            total_operations: 2_000,
            ..Default::default()
        });
        assert!(report.passed(), "{}", report.generate_text());
        assert_eq!(report.stats.total_operations, 2_000);
    }

    #[test]
    fn simulator_is_deterministic() {
        let config = SimulatorConfig {
            seed: 7,
            total_operations: 500,
            ..Default::default()
        };
        let a = run_simulator(config.clone());
        let b = run_simulator(config);
        assert_eq!(a.registry, b.registry);
        assert_eq!(a.final_live, b.final_live);
    }

    #[test]
    fn simulator_without_failures() {
        let report = run_simulator(SimulatorConfig {
            total_operations: 1_000,
            fail_rate: 0.0,
            ..Default::default()
        });
        assert!(report.passed());
        assert_eq!(report.registry.init_failures, 0);
        assert_eq!(report.registry.teardown_failures, 0);
    }

    #[test]
    fn report_serializes_to_json() {
        let report = run_simulator(SimulatorConfig {
            total_operations: 50,
            ..Default::default()
        });
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["config"]["seed"], 42);
        assert!(json["violations"].as_array().unwrap().is_empty());
    }

    #[test]
    fn only_injected_panics_are_simulated() {
        assert!(is_simulated_panic(&format!("panicked at src/simulator.rs: {SIMULATED_PANIC}")));
        assert!(!is_simulated_panic("attempt to add with overflow"));
    }

    #[test]
    fn text_report_mentions_result() {
        let report = run_simulator(SimulatorConfig {
            total_operations: 10,
            ..Default::default()
        });
        assert!(report.generate_text().contains("=== Result: PASS ==="));
    }
}
