//! The tick loop tying a controller, its world, and an observer together.
//!
//! Each tick runs in a fixed order:
//!
//! 1. Callbacks due from the world (point activations, raycasts) are
//!    queued on the controller.
//! 2. Scheduled operator commands are applied.
//! 3. The route driver moves and queues zone and discharge events.
//! 4. The controller updates.
//! 5. The world advances and material moves.
//! 6. Published state tokens are applied to the observer's mirror.

use std::collections::BTreeMap;
use std::time::Duration;

use loadgate_core::TransferController;
use loadgate_core::config::ControllerConfig;
use loadgate_core::quota::QuotaTable;
use loadgate_core::replication::ReplicaState;
use loadgate_types::{AgentId, LoadingState};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info};

use crate::driver::RouteDriver;
use crate::error::EngineError;
use crate::scenario::{OperatorAction, OperatorStep, Scenario};
use crate::world::{World, WorldTotals};

/// A running scenario.
#[derive(Debug)]
pub struct Simulation {
    controller: TransferController,
    observer: ReplicaState,
    world: World,
    driver: RouteDriver,
    operator: Vec<OperatorStep>,
    tick: u32,
    tick_duration: Duration,
    transitions: BTreeMap<String, u32>,
}

/// What a finished run reports.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Ticks executed.
    pub ticks: u32,
    /// Controller state at the end of the run.
    pub final_state: LoadingState,
    /// State the observer mirrored last.
    pub observed_state: LoadingState,
    /// Entries into each state, keyed by state name.
    pub transitions: BTreeMap<String, u32>,
    /// Stops reached.
    pub stops_reached: usize,
    /// Departures forced by the dwell limit.
    pub forced_departures: u32,
    /// Remaining repetitions per material; absent means unlimited.
    pub repetitions_left: BTreeMap<String, Option<i32>>,
    /// Remaining finite depot stock.
    pub depot_levels: BTreeMap<String, Decimal>,
    /// Material flow counters.
    #[serde(flatten)]
    pub totals: WorldTotals,
}

impl Simulation {
    /// Build a simulation from a configuration and a scenario.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Quota`] if the scenario's quota table is
    /// invalid.
    pub fn new(config: ControllerConfig, scenario: &Scenario) -> Result<Self, EngineError> {
        let agent = AgentId::new();
        let quotas = QuotaTable::new(scenario.quotas.clone())?;
        let world = World::from_scenario(agent, scenario);
        let mut operator = scenario.operator.clone();
        operator.sort_by_key(|step| step.tick);

        Ok(Self {
            controller: TransferController::new(agent, config, quotas),
            observer: ReplicaState::new(),
            world,
            driver: RouteDriver::new(scenario.route.clone(), scenario.travel_ticks),
            operator,
            tick: 0,
            tick_duration: Duration::from_millis(scenario.tick_ms),
            transitions: BTreeMap::new(),
        })
    }

    /// Start automation.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Replication`] if the observer rejects a
    /// published state.
    pub fn start(&mut self) -> Result<(), EngineError> {
        self.controller.on_start(&mut self.world);
        self.replicate()
    }

    /// Run one tick.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Replication`] if the observer rejects a
    /// published state.
    pub fn step(&mut self) -> Result<(), EngineError> {
        for event in self.world.take_callbacks() {
            self.controller.push_event(event);
        }
        self.apply_operator();
        self.driver.step(&mut self.world, &mut self.controller);
        self.controller.on_update(self.tick_duration, &mut self.world);
        self.world.advance();
        self.replicate()?;
        self.tick = self.tick.saturating_add(1);
        Ok(())
    }

    /// Halt automation and report.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Replication`] if the observer rejects the
    /// final state.
    pub fn finish(mut self) -> Result<RunSummary, EngineError> {
        self.controller.on_stop(&mut self.world);
        self.replicate()?;
        info!(ticks = self.tick, state = %self.controller.state(), "Run finished");

        let repetitions_left = self
            .controller
            .quotas()
            .entries()
            .iter()
            .map(|e| (e.material.to_string(), e.repetition_limit))
            .collect();
        Ok(RunSummary {
            ticks: self.tick,
            final_state: self.controller.state(),
            observed_state: self.observer.state(),
            transitions: self.transitions,
            stops_reached: self.driver.waypoint(),
            forced_departures: self.driver.forced_departures(),
            repetitions_left,
            depot_levels: self.world.depot_levels(),
            totals: self.world.totals().clone(),
        })
    }

    /// The controller under test.
    pub const fn controller(&self) -> &TransferController {
        &self.controller
    }

    /// The observer's mirrored state.
    pub const fn observed(&self) -> LoadingState {
        self.observer.state()
    }

    fn apply_operator(&mut self) {
        while let Some(step) = self.operator.first().copied() {
            if step.tick > self.tick {
                break;
            }
            self.operator.remove(0);
            info!(tick = self.tick, action = ?step.action, "Operator command");
            match step.action {
                OperatorAction::ManualOverride => self.controller.on_manual_override(&mut self.world),
                OperatorAction::Continue => self.controller.on_continue(&mut self.world),
                OperatorAction::DriveNow => self.controller.on_drive_now(&mut self.world),
                OperatorAction::Stop => self.controller.on_stop(&mut self.world),
                OperatorAction::Start => self.controller.on_start(&mut self.world),
                OperatorAction::EnableLoading => self.controller.set_loading_enabled(true),
                OperatorAction::DisableLoading => self.controller.set_loading_enabled(false),
                OperatorAction::EnableUnloading => self.controller.set_unloading_enabled(true),
                OperatorAction::DisableUnloading => self.controller.set_unloading_enabled(false),
            }
        }
    }

    fn replicate(&mut self) -> Result<(), EngineError> {
        for token in self.world.take_published() {
            let state = self.observer.apply(&token)?;
            debug!(tick = self.tick, state = %state, "Observer mirrored state");
            let count = self.transitions.entry(token).or_default();
            *count = count.saturating_add(1);
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    const HAUL: &str = r"
seed: 11
travel_ticks: 2
fill_rate: 100
discharge_rate: 250
quotas:
  - material: WHEAT
    max_fill_percent: 90
    repetition_limit: 2
vehicles:
  - name: tractor
  - name: trailer
    parent: tractor
    compartments:
      - capacity: 1000
        supported: [WHEAT]
depots:
  - name: silo
    opens_covers: true
    stock:
      - material: WHEAT
discharge_points:
  - name: mill
route:
  - stop: silo
  - stop: mill
";

    fn run(yaml: &str, ticks: u32) -> RunSummary {
        let scenario = Scenario::parse(yaml).unwrap();
        let mut sim = Simulation::new(ControllerConfig::default(), &scenario).unwrap();
        sim.start().unwrap();
        for _ in 0..ticks {
            sim.step().unwrap();
        }
        sim.finish().unwrap()
    }

    #[test]
    fn haul_loop_respects_ceiling_and_repetitions() {
        let summary = run(HAUL, 200);

        // Two loads of 900 each (90 % ceiling), then the counter is spent.
        assert_eq!(summary.repetitions_left.get("WHEAT"), Some(&Some(0)));
        assert_eq!(summary.totals.loaded.get("WHEAT"), Some(&dec!(1800)));
        assert_eq!(summary.totals.delivered.get("WHEAT"), Some(&dec!(1800)));
        assert_eq!(summary.transitions.get("Loading"), Some(&2));
        assert_eq!(summary.transitions.get("Unloading"), Some(&2));
        assert!(summary.totals.status_shown.contains_key("QUOTA EXHAUSTED"));
        assert!(summary.forced_departures > 0);
        assert_eq!(summary.final_state, LoadingState::Stopped);
        assert_eq!(summary.observed_state, LoadingState::Stopped);
    }

    #[test]
    fn obstructed_discharge_point_is_never_unloaded_into() {
        let yaml = HAUL.replace("  - name: mill", "  - name: mill\n    obstructed: true");
        let summary = run(&yaml, 60);

        assert_eq!(summary.totals.loaded.get("WHEAT"), Some(&dec!(900)));
        assert!(summary.totals.delivered.is_empty());
        assert!(summary.totals.line_of_sight_queries > 0);
        assert_eq!(summary.transitions.get("Unloading"), None);
        assert_eq!(summary.repetitions_left.get("WHEAT"), Some(&Some(1)));
    }

    #[test]
    fn point_depot_is_activated_then_loaded_from() {
        let yaml = r"
travel_ticks: 1
fill_rate: 100
quotas:
  - material: BOARDS
    max_fill_percent: 50
vehicles:
  - name: truck
    compartments:
      - capacity: 1000
        supported: [BOARDS]
depots:
  - name: pallets
    point: true
    stock:
      - material: BOARDS
route:
  - stop: pallets
";
        let summary = run(yaml, 40);

        assert_eq!(summary.totals.loaded.get("BOARDS"), Some(&dec!(500)));
        assert_eq!(summary.transitions.get("Loading"), Some(&1));
        assert!(summary.stops_reached > 1);
    }

    #[test]
    fn operator_override_is_released_once_the_depot_is_left() {
        let yaml = format!("{HAUL}operator:\n  - tick: 3\n    action: manual_override\n");
        let scenario = Scenario::parse(&yaml).unwrap();
        let mut sim = Simulation::new(ControllerConfig::default(), &scenario).unwrap();
        sim.start().unwrap();
        for _ in 0..3 {
            sim.step().unwrap();
        }
        assert_eq!(sim.controller().state(), LoadingState::Loading);

        // The operator takes over and drives out of the silo on the same tick.
        sim.step().unwrap();
        assert_eq!(sim.controller().state(), LoadingState::Idle);
        assert!(!sim.controller().is_target_active());

        let summary = sim.finish().unwrap();
        assert_eq!(summary.transitions.get("ManualOverride"), Some(&1));
        assert_eq!(summary.totals.loaded.get("WHEAT"), Some(&dec!(300)));
        assert_eq!(summary.repetitions_left.get("WHEAT"), Some(&Some(2)));
    }

    #[test]
    fn project_scenario_runs_to_completion() {
        let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("loadgate-scenario.yaml");
        if !path.exists() {
            return;
        }
        let scenario = Scenario::from_file(&path).unwrap();
        let mut sim = Simulation::new(ControllerConfig::default(), &scenario).unwrap();
        sim.start().unwrap();
        for _ in 0..scenario.ticks {
            sim.step().unwrap();
        }
        let summary = sim.finish().unwrap();
        assert_eq!(summary.ticks, scenario.ticks);
        assert_eq!(summary.final_state, summary.observed_state);
        assert!(summary.totals.loaded.contains_key("DIESEL"));
    }

    #[test]
    fn observer_tracks_every_transition() {
        let scenario = Scenario::parse(HAUL).unwrap();
        let mut sim = Simulation::new(ControllerConfig::default(), &scenario).unwrap();
        sim.start().unwrap();
        assert_eq!(sim.observed(), LoadingState::Idle);
        for _ in 0..40 {
            sim.step().unwrap();
            assert_eq!(sim.observed(), sim.controller().state());
        }
    }
}
