//! Scenario input for a headless run, loaded from YAML.
//!
//! A scenario describes one agent's vehicle, the depots and discharge
//! points around it, the route it drives, and how many rival agents drain
//! the same depots. It is demo input for the engine only; the controller
//! itself never reads it.

use std::collections::BTreeSet;
use std::path::Path;

use loadgate_types::{MaterialType, QuotaEntry, ZoneKind};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::error::EngineError;

/// A complete scenario.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Scenario {
    /// RNG seed for the rival agents.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Number of ticks to run.
    #[serde(default = "default_ticks")]
    pub ticks: u32,

    /// Simulated duration of one tick in milliseconds.
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,

    /// Units moved into a compartment per tick while filling.
    #[serde(default = "default_fill_rate")]
    pub fill_rate: Decimal,

    /// Units moved out of a compartment per tick while discharging.
    #[serde(default = "default_discharge_rate")]
    pub discharge_rate: Decimal,

    /// Ticks spent driving between two stops.
    #[serde(default = "default_travel_ticks")]
    pub travel_ticks: u32,

    /// The agent's quota table, in priority order.
    #[serde(default)]
    pub quotas: Vec<QuotaEntry>,

    /// The agent's vehicle and attached implements.
    pub vehicles: Vec<VehicleSpec>,

    /// Material sources.
    #[serde(default)]
    pub depots: Vec<DepotSpec>,

    /// Material destinations.
    #[serde(default)]
    pub discharge_points: Vec<DischargeSpec>,

    /// Competing agents drawing from the same depots.
    #[serde(default)]
    pub rivals: RivalSpec,

    /// Stops visited in order, then repeated.
    pub route: Vec<StopSpec>,

    /// Operator commands issued at fixed ticks.
    #[serde(default)]
    pub operator: Vec<OperatorStep>,
}

/// One vehicle or implement.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VehicleSpec {
    /// Unique name.
    pub name: String,
    /// The vehicle this one is attached to.
    #[serde(default)]
    pub parent: Option<String>,
    /// Fillable compartments, indexed in order.
    #[serde(default)]
    pub compartments: Vec<CompartmentSpec>,
    /// The vehicle carries a node to cast discharge rays from.
    #[serde(default = "default_true")]
    pub discharge_node: bool,
}

/// One compartment's starting state.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CompartmentSpec {
    /// Total capacity.
    pub capacity: Decimal,
    /// Starting level.
    #[serde(default)]
    pub level: Decimal,
    /// Starting material.
    #[serde(default)]
    pub material: Option<MaterialType>,
    /// Accepted materials.
    pub supported: Vec<MaterialType>,
}

/// A material source.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DepotSpec {
    /// Unique name.
    pub name: String,
    /// Zone kind.
    #[serde(default = "default_depot_kind")]
    pub kind: ZoneKind,
    /// Opens compartment covers on entry.
    #[serde(default)]
    pub opens_covers: bool,
    /// A pickup point that must be activated instead of driven into.
    #[serde(default)]
    pub point: bool,
    /// Offered materials.
    pub stock: Vec<StockSpec>,
}

/// One offered material.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StockSpec {
    /// The material.
    pub material: MaterialType,
    /// Starting level; absent means unlimited.
    #[serde(default)]
    pub level: Option<Decimal>,
    /// Units added per tick.
    #[serde(default)]
    pub refill: Decimal,
}

/// A material destination.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DischargeSpec {
    /// Unique name.
    pub name: String,
    /// The line of sight to this point is blocked.
    #[serde(default)]
    pub obstructed: bool,
}

/// Rival agents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RivalSpec {
    /// How many rivals draw from every finite depot.
    #[serde(default)]
    pub count: u32,
    /// Upper bound of one rival's draw per tick.
    #[serde(default)]
    pub max_draw: u32,
}

/// An operator command scheduled for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct OperatorStep {
    /// Tick at which the command is issued.
    pub tick: u32,
    /// The command.
    pub action: OperatorAction,
}

/// Commands an operator can issue to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatorAction {
    /// Take manual control.
    ManualOverride,
    /// Resume after a pause.
    Continue,
    /// Leave the current depot now.
    DriveNow,
    /// Halt automation.
    Stop,
    /// Restart automation.
    Start,
    /// Turn automatic loading on.
    EnableLoading,
    /// Turn automatic loading off.
    DisableLoading,
    /// Turn automatic unloading on.
    EnableUnloading,
    /// Turn automatic unloading off.
    DisableUnloading,
}

/// One stop on the route.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StopSpec {
    /// Name of a depot or discharge point.
    pub stop: String,
    /// Ticks to wait before forcing departure.
    #[serde(default = "default_max_dwell")]
    pub max_dwell: u32,
    /// Route waypoint at which the driver pauses (hold waypoint).
    #[serde(default)]
    pub hold: bool,
}

impl Scenario {
    /// Load a scenario from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Scenario`] if the file cannot be read or
    /// parsed, or if it fails [`validate`](Self::validate).
    pub fn from_file(path: &Path) -> Result<Self, EngineError> {
        let contents = std::fs::read_to_string(path).map_err(|e| EngineError::Scenario {
            message: format!("failed to read {}: {e}", path.display()),
        })?;
        Self::parse(&contents)
    }

    /// Parse a scenario from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Scenario`] if the YAML is invalid or fails
    /// [`validate`](Self::validate).
    pub fn parse(yaml: &str) -> Result<Self, EngineError> {
        let scenario: Self = serde_yml::from_str(yaml).map_err(|e| EngineError::Scenario {
            message: format!("failed to parse scenario YAML: {e}"),
        })?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Check that names are unique and every reference resolves.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Scenario`] describing the first problem.
    pub fn validate(&self) -> Result<(), EngineError> {
        let mut vehicles = BTreeSet::new();
        for vehicle in &self.vehicles {
            if !vehicles.insert(vehicle.name.as_str()) {
                return Err(scenario_error(format!("duplicate vehicle {}", vehicle.name)));
            }
        }
        for vehicle in &self.vehicles {
            let unknown = vehicle
                .parent
                .as_deref()
                .filter(|parent| !vehicles.contains(parent));
            if let Some(parent) = unknown {
                return Err(scenario_error(format!(
                    "vehicle {} is attached to unknown vehicle {parent}",
                    vehicle.name
                )));
            }
        }

        let mut stops = BTreeSet::new();
        let names = self
            .depots
            .iter()
            .map(|d| d.name.as_str())
            .chain(self.discharge_points.iter().map(|d| d.name.as_str()));
        for name in names {
            if !stops.insert(name) {
                return Err(scenario_error(format!("duplicate stop {name}")));
            }
        }
        if let Some(depot) = self.depots.iter().find(|d| d.kind == ZoneKind::Discharge) {
            return Err(scenario_error(format!(
                "depot {} cannot be a discharge zone",
                depot.name
            )));
        }
        if self.route.is_empty() {
            return Err(scenario_error("route is empty".to_owned()));
        }
        for stop in &self.route {
            if !stops.contains(stop.stop.as_str()) {
                return Err(scenario_error(format!("route visits unknown stop {}", stop.stop)));
            }
        }
        Ok(())
    }
}

const fn scenario_error(message: String) -> EngineError {
    EngineError::Scenario { message }
}

const fn default_true() -> bool {
    true
}

const fn default_seed() -> u64 {
    42
}

const fn default_ticks() -> u32 {
    600
}

const fn default_tick_ms() -> u64 {
    100
}

fn default_fill_rate() -> Decimal {
    Decimal::from(25)
}

fn default_discharge_rate() -> Decimal {
    Decimal::from(40)
}

const fn default_travel_ticks() -> u32 {
    10
}

const fn default_depot_kind() -> ZoneKind {
    ZoneKind::Loading
}

const fn default_max_dwell() -> u32 {
    120
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    const MINIMAL: &str = r"
vehicles:
  - name: truck
    compartments:
      - capacity: 1000
        supported: [WHEAT]
depots:
  - name: silo
    stock:
      - material: WHEAT
        level: 2500
route:
  - stop: silo
";

    #[test]
    fn minimal_scenario_uses_defaults() {
        let scenario = Scenario::parse(MINIMAL).unwrap();
        assert_eq!(scenario.seed, 42);
        assert_eq!(scenario.ticks, 600);
        assert_eq!(scenario.fill_rate, dec!(25));
        assert_eq!(scenario.rivals, RivalSpec::default());
        let depot = scenario.depots.first().unwrap();
        assert_eq!(depot.kind, ZoneKind::Loading);
        assert_eq!(depot.stock.first().unwrap().level, Some(dec!(2500)));
        assert_eq!(scenario.route.first().unwrap().max_dwell, 120);
        assert!(scenario.vehicles.first().unwrap().discharge_node);
        assert!(scenario.operator.is_empty());
    }

    #[test]
    fn operator_steps_parse_snake_case() {
        let yaml = format!(
            "{MINIMAL}operator:\n  - tick: 30\n    action: manual_override\n  - tick: 40\n    action: continue\n"
        );
        let scenario = Scenario::parse(&yaml).unwrap();
        assert_eq!(
            scenario.operator,
            vec![
                OperatorStep {
                    tick: 30,
                    action: OperatorAction::ManualOverride,
                },
                OperatorStep {
                    tick: 40,
                    action: OperatorAction::Continue,
                },
            ]
        );
    }

    #[test]
    fn unknown_stop_is_rejected() {
        let yaml = MINIMAL.replace("- stop: silo", "- stop: mill");
        let err = Scenario::parse(&yaml).unwrap_err();
        assert!(err.to_string().contains("unknown stop mill"));
    }

    #[test]
    fn unknown_parent_is_rejected() {
        let yaml = MINIMAL.replace("- name: truck", "- name: truck\n    parent: tractor");
        assert!(Scenario::parse(&yaml).is_err());
    }

    #[test]
    fn quotas_parse_with_entry_defaults() {
        let yaml = format!(
            "{MINIMAL}quotas:\n  - material: WHEAT\n    min_fill_percent: 20\n    repetition_limit: 3\n"
        );
        let scenario = Scenario::parse(&yaml).unwrap();
        let quota = scenario.quotas.first().unwrap();
        assert_eq!(quota.max_fill_percent, dec!(99));
        assert_eq!(quota.min_fill_percent, dec!(20));
        assert_eq!(quota.repetition_limit, Some(3));
    }
}
