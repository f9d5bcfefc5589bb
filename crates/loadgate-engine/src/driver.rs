//! Route driver: moves the agent between the scenario's stops.
//!
//! The driver stands in for the agent's driving controller. It arrives at
//! stops, reports zone overlaps and discharge opportunities to the transfer
//! controller, and departs once the controller lets it drive on. When the
//! controller keeps the agent waiting past a stop's dwell limit, the driver
//! asks it to drive now.

use loadgate_core::{DriveProgress, TransferController};
use loadgate_types::LoadingState;
use tracing::{debug, info};

use crate::scenario::StopSpec;
use crate::world::{StopKind, World};

/// Ticks spent at a stop before the driver considers leaving.
const MIN_DWELL_TICKS: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Leg {
    Travelling { to: usize, remaining: u32 },
    Dwelling { at: usize, ticks: u32, announced: u32 },
}

/// Drives one agent around a looping route.
#[derive(Debug)]
pub struct RouteDriver {
    stops: Vec<StopSpec>,
    travel_ticks: u32,
    leg: Leg,
    waypoint: usize,
    last_hold: Option<usize>,
    last_state: LoadingState,
    forced_departures: u32,
}

impl RouteDriver {
    /// A driver about to arrive at the first stop.
    pub const fn new(stops: Vec<StopSpec>, travel_ticks: u32) -> Self {
        Self {
            stops,
            travel_ticks,
            leg: Leg::Travelling { to: 0, remaining: 0 },
            waypoint: 0,
            last_hold: None,
            last_state: LoadingState::Stopped,
            forced_departures: 0,
        }
    }

    /// Stops reached so far.
    pub const fn waypoint(&self) -> usize {
        self.waypoint
    }

    /// How often the driver had to force departure.
    pub const fn forced_departures(&self) -> u32 {
        self.forced_departures
    }

    /// Advance the driver by one tick. Events are queued on the controller
    /// for its next update.
    pub fn step(&mut self, world: &mut World, controller: &mut TransferController) {
        let state = controller.state();
        match self.leg {
            Leg::Travelling { to, remaining } => {
                if state == LoadingState::Stopped {
                    // Parked until automation restarts.
                } else if remaining == 0 {
                    self.arrive(to, world, controller);
                } else {
                    self.leg = Leg::Travelling {
                        to,
                        remaining: remaining.saturating_sub(1),
                    };
                }
            }
            Leg::Dwelling {
                at,
                ticks,
                announced,
            } => self.dwell(at, ticks.saturating_add(1), announced, world, controller),
        }
        self.last_state = controller.state();
        controller.set_drive_progress(DriveProgress {
            current_waypoint: self.waypoint,
            hold_waypoint: self.last_hold,
            paused: matches!(self.leg, Leg::Dwelling { .. }),
        });
    }

    fn arrive(&mut self, at: usize, world: &mut World, controller: &mut TransferController) {
        let Some(stop) = self.stops.get(at) else {
            return;
        };
        self.waypoint = self.waypoint.saturating_add(1);
        if stop.hold {
            self.last_hold = Some(self.waypoint);
        }
        info!(stop = %stop.stop, waypoint = self.waypoint, "Stop reached");

        for event in world.arrive(&stop.stop) {
            controller.push_event(event);
        }
        if world.stop_kind(&stop.stop) == Some(StopKind::Discharge) {
            for event in world.discharge_offers(&stop.stop, true) {
                controller.push_event(event);
            }
        }
        self.leg = Leg::Dwelling {
            at,
            ticks: 0,
            announced: 0,
        };
    }

    fn dwell(
        &mut self,
        at: usize,
        ticks: u32,
        mut announced: u32,
        world: &mut World,
        controller: &mut TransferController,
    ) {
        let Some(stop) = self.stops.get(at).cloned() else {
            return;
        };
        let state = controller.state();
        let discharging_stop = world.stop_kind(&stop.stop) == Some(StopKind::Discharge);

        if discharging_stop && state == LoadingState::Idle && self.last_state == LoadingState::Unloading {
            for event in world.discharge_offers(&stop.stop, true) {
                controller.push_event(event);
            }
            announced = ticks;
        }

        let settled = ticks.saturating_sub(announced) >= MIN_DWELL_TICKS;
        let leave = match state {
            // The operator drives off by hand.
            LoadingState::ManualOverride => true,
            LoadingState::Stopped => false,
            LoadingState::Idle | LoadingState::Loading | LoadingState::Unloading => {
                ticks >= MIN_DWELL_TICKS
                    && state == LoadingState::Idle
                    && controller.may_drive_on()
                    && (!discharging_stop || settled)
            }
        };

        if leave {
            self.depart(at, &stop, world, controller);
        } else if ticks >= stop.max_dwell && state != LoadingState::Stopped {
            info!(stop = %stop.stop, ticks, state = %state, "Dwell limit reached, driving on");
            controller.on_drive_now(world);
            self.forced_departures = self.forced_departures.saturating_add(1);
            self.depart(at, &stop, world, controller);
        } else {
            self.leg = Leg::Dwelling {
                at,
                ticks,
                announced,
            };
        }
    }

    fn depart(
        &mut self,
        at: usize,
        stop: &StopSpec,
        world: &mut World,
        controller: &mut TransferController,
    ) {
        for event in world.depart(&stop.stop) {
            controller.push_event(event);
        }
        let next = at.saturating_add(1).checked_rem(self.stops.len()).unwrap_or(0);
        debug!(from = %stop.stop, next, "Departing");
        self.leg = Leg::Travelling {
            to: next,
            remaining: self.travel_ticks,
        };
    }
}
