//! Scripted visibility scenarios
//!
//! A scenario declares sections and a list of timed visibility events. The
//! runner drives one [`SectionController`] per section against a shared
//! [`WidgetRegistry`], firing debounce timers at their exact due times, and
//! records what happened.

use anyhow::{bail, Context, Result};
use lazyslot_core::{BoxError, Instance, RegistryStats, SlotKey, Widget, WidgetRegistry};
use lazyslot_gate::{GateAction, GateConfig, SectionController};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Latest accepted event or end time (one day)
pub(crate) const MAX_SCENARIO_MS: u64 = 86_400_000;

/// What a section's factory constructs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum WidgetShape {
    /// Nothing to release
    Bare,
    /// Cleanup closure only
    Teardown,
    /// Widget with destroy/pause/resume
    #[default]
    Widget,
}

/// One lazily constructed section
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct SectionSpec {
    pub(crate) key: SlotKey,
    #[serde(default)]
    pub(crate) widget: WidgetShape,
    /// First construction attempt fails
    #[serde(default)]
    pub(crate) fail_first_init: bool,
}

/// Visibility change at a point in time
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct EventSpec {
    pub(crate) at_ms: u64,
    pub(crate) section: String,
    pub(crate) visible: bool,
}

/// Scenario file contents
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Scenario {
    #[serde(default)]
    pub(crate) gate: GateConfig,
    #[serde(default, rename = "section")]
    pub(crate) sections: Vec<SectionSpec>,
    #[serde(default, rename = "event")]
    pub(crate) events: Vec<EventSpec>,
    /// Time at which all sections unmount
    pub(crate) end_ms: Option<u64>,
}

impl Scenario {
    /// Parse a scenario from TOML
    pub(crate) fn from_toml_str(s: &str) -> Result<Self> {
        let scenario: Self = toml::from_str(s).context("invalid scenario")?;
        scenario.gate.validate()?;
        if let Some(end) = scenario.end_ms {
            if end > MAX_SCENARIO_MS {
                bail!("end_ms {end} exceeds {MAX_SCENARIO_MS}");
            }
        }
        for event in &scenario.events {
            if event.at_ms > MAX_SCENARIO_MS {
                bail!("event at {}ms exceeds {MAX_SCENARIO_MS}", event.at_ms);
            }
            if !scenario.sections.iter().any(|spec| spec.key.as_str() == event.section) {
                bail!("event at {}ms targets unknown section '{}'", event.at_ms, event.section);
            }
        }
        Ok(scenario)
    }

    /// Read and parse a scenario file
    pub(crate) fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("in {}", path.display()))
    }

    fn end_ms(&self) -> u64 {
        self.end_ms.unwrap_or_else(|| {
            let last = self.events.iter().map(|e| e.at_ms).max().unwrap_or(0);
            last.saturating_add(self.gate.init_delay_ms)
                .saturating_add(self.gate.pause_delay_ms)
        })
    }
}

/// Something observed while running
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct TimelineEntry {
    pub(crate) at_ms: u64,
    pub(crate) section: String,
    pub(crate) action: String,
}

/// Outcome of a scenario run
#[derive(Debug, Clone, Serialize)]
pub(crate) struct ScenarioReport {
    pub(crate) timeline: Vec<TimelineEntry>,
    /// Slots live just before the final unmount
    pub(crate) live_at_end: Vec<String>,
    /// Slots whose instance was released, in order
    pub(crate) teardowns: Vec<String>,
    pub(crate) registry: RegistryStats,
}

impl ScenarioReport {
    /// Generate a text report
    pub(crate) fn generate_text(&self) -> String {
        let mut out = String::from("=== lazyslot Scenario ===\n\n");
        for entry in &self.timeline {
            out.push_str(&format!(
                "{:>7}ms  {:<16} {}\n",
                entry.at_ms, entry.section, entry.action
            ));
        }
        out.push_str(&format!("\nLive At End: {}\n", self.live_at_end.join(", ")));
        out.push_str(&format!("Teardowns: {}\n", self.teardowns.join(", ")));
        out.push_str(&format!(
            "Registrations: {}  Init Failures: {}\n",
            self.registry.registrations, self.registry.init_failures
        ));
        out
    }
}

type TeardownLog = Arc<Mutex<Vec<String>>>;

struct ScenarioWidget {
    key: String,
    log: TeardownLog,
}

impl Widget for ScenarioWidget {
    fn destroy(self: Box<Self>) -> Result<(), BoxError> {
        self.log.lock().push(self.key);
        Ok(())
    }

    fn pause(&mut self) -> bool {
        true
    }

    fn resume(&mut self) -> bool {
        true
    }
}

fn controller_for(spec: &SectionSpec, config: &GateConfig, log: &TeardownLog) -> SectionController {
    let name = spec.key.to_string();
    let shape = spec.widget;
    let log = Arc::clone(log);
    let mut fail_next = spec.fail_first_init;

    SectionController::new(spec.key.clone(), config.clone(), move || {
        if std::mem::take(&mut fail_next) {
            return Err("simulated construction failure".into());
        }
        let instance = match shape {
            WidgetShape::Bare => Instance::Bare,
            WidgetShape::Teardown => {
                let (log, name) = (Arc::clone(&log), name.clone());
                Instance::teardown(move || log.lock().push(name))
            }
            WidgetShape::Widget => Instance::widget(ScenarioWidget {
                key: name.clone(),
                log: Arc::clone(&log),
            }),
        };
        Ok(instance)
    })
}

struct Runner {
    t0: Instant,
    registry: WidgetRegistry,
    sections: Vec<SectionController>,
    timeline: Vec<TimelineEntry>,
}

impl Runner {
    fn ms_since_start(&self, at: Instant) -> u64 {
        u64::try_from(at.duration_since(self.t0).as_millis()).unwrap_or(u64::MAX)
    }

    fn record(&mut self, at: Instant, index: usize, action: &str) {
        self.timeline.push(TimelineEntry {
            at_ms: self.ms_since_start(at),
            section: self.sections[index].key().to_string(),
            action: action.to_string(),
        });
    }

    fn record_outcome(
        &mut self,
        at: Instant,
        index: usize,
        outcome: Result<Option<GateAction>, lazyslot_gate::GateError>,
    ) {
        match outcome {
            Ok(Some(action)) => self.record(at, index, action_name(action)),
            Ok(None) => {}
            Err(_) => self.record(at, index, "init_failed"),
        }
    }

    /// Fire every timer due at or before `until`, earliest first
    fn advance_to(&mut self, until: Instant) {
        loop {
            let due = self
                .sections
                .iter()
                .enumerate()
                .filter_map(|(i, s)| s.gate().next_deadline().map(|d| (d, i)))
                .filter(|(d, _)| *d <= until)
                .min();
            let Some((at, index)) = due else { break };
            let outcome = self.sections[index].tick(&mut self.registry, at);
            self.record_outcome(at, index, outcome);
        }
    }
}

fn action_name(action: GateAction) -> &'static str {
    match action {
        GateAction::Init => "init",
        GateAction::Pause => "pause",
        GateAction::Resume => "resume",
    }
}

/// Run a scenario to completion
pub(crate) fn run_scenario(scenario: &Scenario) -> ScenarioReport {
    let log = TeardownLog::default();
    let mut runner = Runner {
        t0: Instant::now(),
        registry: WidgetRegistry::new(),
        sections: scenario
            .sections
            .iter()
            .map(|spec| controller_for(spec, &scenario.gate, &log))
            .collect(),
        timeline: Vec::new(),
    };

    let mut events = scenario.events.clone();
    events.sort_by_key(|e| e.at_ms);

    for event in &events {
        let at = runner.t0 + Duration::from_millis(event.at_ms);
        runner.advance_to(at);
        let Some(index) = runner
            .sections
            .iter()
            .position(|s| s.key().as_str() == event.section)
        else {
            tracing::warn!(section = %event.section, "event for unknown section skipped");
            continue;
        };
        let outcome = runner.sections[index].observe(&mut runner.registry, event.visible, at);
        runner.record_outcome(at, index, outcome);
    }

    let end = runner.t0 + Duration::from_millis(scenario.end_ms());
    runner.advance_to(end);

    let live_at_end = runner
        .registry
        .active_keys()
        .into_iter()
        .map(String::from)
        .collect();

    for index in 0..runner.sections.len() {
        if runner.sections[index].unmount(&mut runner.registry) {
            runner.record(end, index, "unmount");
        }
    }

    let teardowns = log.lock().clone();
    ScenarioReport {
        timeline: runner.timeline,
        live_at_end,
        teardowns,
        registry: runner.registry.stats(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn actions(report: &ScenarioReport) -> Vec<(u64, &str, &str)> {
        report
            .timeline
            .iter()
            .map(|e| (e.at_ms, e.section.as_str(), e.action.as_str()))
            .collect()
    }

    const SCROLL: &str = r#"
        [[section]]
        key = "framer3"

        [[section]]
        key = "framer4"
        widget = "teardown"

        [[event]]
        at_ms = 0
        section = "framer3"
        visible = true

        [[event]]
        at_ms = 1000
        section = "framer3"
        visible = false

        [[event]]
        at_ms = 1000
        section = "framer4"
        visible = true

        [[event]]
        at_ms = 1010
        section = "framer4"
        visible = false
    "#;

    #[test]
    fn test_scroll_through_two_sections() {
        let scenario = Scenario::from_toml_str(SCROLL).unwrap();
        let report = run_scenario(&scenario);

        assert_eq!(
            actions(&report),
            vec![
                (50, "framer3", "init"),
                (1800, "framer3", "pause"),
                (1860, "framer3", "unmount"),
            ]
        );
        // framer4 left view before its init delay elapsed
        assert_eq!(report.live_at_end, vec!["framer3"]);
        assert_eq!(report.teardowns, vec!["framer3"]);
    }

    #[test]
    fn test_failed_first_init_retries_on_next_visibility() {
        let scenario = Scenario::from_toml_str(
            r#"
            [gate]
            init_delay_ms = 10
            pause_delay_ms = 100

            [[section]]
            key = "grid"
            fail_first_init = true

            [[event]]
            at_ms = 0
            section = "grid"
            visible = true

            [[event]]
            at_ms = 500
            section = "grid"
            visible = true
            "#,
        )
        .unwrap();
        let report = run_scenario(&scenario);

        assert_eq!(
            actions(&report),
            vec![
                (10, "grid", "init_failed"),
                (510, "grid", "init"),
                (610, "grid", "unmount"),
            ]
        );
        assert_eq!(report.registry.init_failures, 1);
        assert_eq!(report.registry.registrations, 1);
    }

    #[test]
    fn test_quick_return_resumes_immediately() {
        let scenario = Scenario::from_toml_str(
            r#"
            end_ms = 5000

            [[section]]
            key = "hero"

            [[event]]
            at_ms = 0
            section = "hero"
            visible = true

            [[event]]
            at_ms = 100
            section = "hero"
            visible = false

            [[event]]
            at_ms = 300
            section = "hero"
            visible = true

            [[event]]
            at_ms = 2000
            section = "hero"
            visible = false

            [[event]]
            at_ms = 3000
            section = "hero"
            visible = true
            "#,
        )
        .unwrap();
        let report = run_scenario(&scenario);

        assert_eq!(
            actions(&report),
            vec![
                (50, "hero", "init"),
                (2800, "hero", "pause"),
                (3000, "hero", "resume"),
                (5000, "hero", "unmount"),
            ]
        );
    }

    #[test]
    fn test_unknown_section_rejected() {
        let err = Scenario::from_toml_str(
            r#"
            [[event]]
            at_ms = 0
            section = "ghost"
            visible = true
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn test_huge_times_rejected_at_load() {
        let max = i64::MAX;
        let err = Scenario::from_toml_str(&format!(
            r#"
            [gate]
            init_delay_ms = {max}
            pause_delay_ms = {max}

            [[section]]
            key = "grid"

            [[event]]
            at_ms = {max}
            section = "grid"
            visible = true
            "#
        ));
        assert!(err.is_err());

        let err = Scenario::from_toml_str(&format!(
            r#"
            [[section]]
            key = "grid"

            [[event]]
            at_ms = {max}
            section = "grid"
            visible = true
            "#
        ))
        .unwrap_err();
        assert!(err.to_string().contains("exceeds"));

        assert!(Scenario::from_toml_str(&format!("end_ms = {max}\n")).is_err());
    }

    #[test]
    fn test_default_end_saturates() {
        let scenario = Scenario {
            gate: GateConfig::new().with_delays(u64::MAX, u64::MAX),
            sections: Vec::new(),
            events: vec![EventSpec {
                at_ms: u64::MAX,
                section: "grid".to_string(),
                visible: true,
            }],
            end_ms: None,
        };
        assert_eq!(scenario.end_ms(), u64::MAX);
    }

    #[test]
    fn test_invalid_gate_rejected() {
        assert!(Scenario::from_toml_str("[gate]\nthreshold = 1.5\n").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SCROLL.as_bytes()).unwrap();

        let scenario = Scenario::load(file.path()).unwrap();
        assert_eq!(scenario.sections.len(), 2);
        assert_eq!(scenario.events.len(), 4);
        assert_eq!(scenario.end_ms(), 1010 + 50 + 800);
    }

    #[test]
    fn test_report_text_lists_timeline() {
        let report = run_scenario(&Scenario::from_toml_str(SCROLL).unwrap());
        let text = report.generate_text();
        assert!(text.contains("framer3"));
        assert!(text.contains("pause"));
    }
}
