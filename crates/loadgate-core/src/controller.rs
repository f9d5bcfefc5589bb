//! The per-agent loading/unloading state machine.
//!
//! [`TransferController`] owns the agent's [`LoadingState`], its single
//! [`ActiveTarget`], the zone set, and the selection history. The driving
//! controller calls the lifecycle hooks; the collision layer, discharge
//! points, and the raycast system push [`ControllerEvent`]s which are
//! drained at the start of every [`on_update`](TransferController::on_update).
//!
//! Each update runs in a fixed order:
//!
//! 1. Rebuild the compartment tree from the host.
//! 2. Drain queued events (zone changes, discharge notifications,
//!    line-of-sight results).
//! 3. Run the state's tick: discovery and admission when idle, safety
//!    checks and re-admission while loading, the emptiness check while
//!    unloading, the auto-return check under manual override.
//!
//! Every transition is logged and replicated by name exactly once.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use loadgate_types::{
    AgentId, CompartmentSnapshot, DEFAULT_MAX_FILL_PERCENT, EntityId, LoadingState, MaterialType,
    QuotaEntry, RaycastHit, StatusKey, TransferDirection, ZoneId, ZoneKind, ZoneOffer,
};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::admission::{AdmissionContext, AdmissionPass, AlternationPolicy, Candidate};
use crate::compartments::{CompartmentRef, CompartmentTree};
use crate::config::ControllerConfig;
use crate::error::ControllerError;
use crate::events::{ControllerEvent, EventQueue};
use crate::history::SelectionHistory;
use crate::host::{FillUnitHost, Host, ReplicationSink, StatusSurface};
use crate::los::{LineOfSight, LineOfSightTracker};
use crate::quota::{QuotaTable, fuel_quota};
use crate::replication::{StatePublisher, decode_state};
use crate::safety::{self, SafetyVerdict};
use crate::selection::{self, SelectionAction, StopReason};
use crate::target::ActiveTarget;
use crate::zones::{EnterOutcome, LeaveOutcome, ZoneTracker};

/// Which side of the replication boundary a controller lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerRole {
    /// Runs the state machine and publishes state.
    Authoritative,
    /// Mirrors the state published by the authoritative side.
    Replica,
}

/// The driving controller's progress along its route, used by the
/// manual-override auto-return check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriveProgress {
    /// Index of the waypoint the agent is at.
    pub current_waypoint: usize,
    /// The designated hold waypoint, if the route has one.
    pub hold_waypoint: Option<usize>,
    /// Whether the agent is paused.
    pub paused: bool,
}

impl DriveProgress {
    /// Paused with the hold waypoint within `offset` waypoints behind the
    /// current one.
    pub fn paused_near_hold(&self, offset: usize) -> bool {
        let window_start = self.current_waypoint.saturating_sub(offset);
        self.paused
            && self
                .hold_waypoint
                .is_some_and(|hold| hold >= window_start && hold <= self.current_waypoint)
    }
}

/// A discharge opportunity waiting for its line-of-sight result.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingDischarge {
    at: CompartmentRef,
    target: EntityId,
    zone: Option<ZoneId>,
    material: MaterialType,
}

/// Loading/unloading state machine for one agent.
#[derive(Debug)]
pub struct TransferController {
    agent: AgentId,
    role: ControllerRole,
    config: ControllerConfig,
    quotas: QuotaTable,
    state: LoadingState,
    time_in_state: Duration,
    target: Option<ActiveTarget>,
    history: SelectionHistory,
    zones: ZoneTracker,
    events: EventQueue,
    los: LineOfSightTracker,
    pending_discharge: Option<PendingDischarge>,
    open_covers: BTreeMap<ZoneId, BTreeSet<CompartmentRef>>,
    publisher: StatePublisher,
    status: Option<StatusKey>,
    hold_pending: bool,
    drive_now: bool,
    progress: DriveProgress,
}

impl TransferController {
    /// An authoritative controller. Starts `Stopped` until
    /// [`on_start`](Self::on_start).
    pub fn new(agent: AgentId, config: ControllerConfig, quotas: QuotaTable) -> Self {
        let history = SelectionHistory::new(config.loading.history_capacity);
        Self {
            agent,
            role: ControllerRole::Authoritative,
            config,
            quotas,
            state: LoadingState::Stopped,
            time_in_state: Duration::ZERO,
            target: None,
            history,
            zones: ZoneTracker::new(),
            events: EventQueue::new(),
            los: LineOfSightTracker::new(),
            pending_discharge: None,
            open_covers: BTreeMap::new(),
            publisher: StatePublisher::new(),
            status: None,
            hold_pending: false,
            drive_now: false,
            progress: DriveProgress::default(),
        }
    }

    /// A replica that only mirrors replicated state.
    pub fn replica(agent: AgentId, config: ControllerConfig) -> Self {
        Self {
            role: ControllerRole::Replica,
            ..Self::new(agent, config, QuotaTable::empty())
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// The agent this controller belongs to.
    pub const fn agent(&self) -> AgentId {
        self.agent
    }

    /// Authoritative or replica.
    pub const fn role(&self) -> ControllerRole {
        self.role
    }

    /// Current state.
    pub const fn state(&self) -> LoadingState {
        self.state
    }

    /// Time spent in the current state.
    pub const fn time_in_state(&self) -> Duration {
        self.time_in_state
    }

    /// The current binding.
    pub const fn target(&self) -> Option<&ActiveTarget> {
        self.target.as_ref()
    }

    /// Whether a binding exists.
    pub const fn is_target_active(&self) -> bool {
        self.target.is_some()
    }

    /// The quota table, including current repetition counters.
    pub const fn quotas(&self) -> &QuotaTable {
        &self.quotas
    }

    /// Recently started materials.
    pub const fn history(&self) -> &SelectionHistory {
        &self.history
    }

    /// The status currently surfaced.
    pub const fn status(&self) -> Option<StatusKey> {
        self.status
    }

    /// Tracked zones.
    pub const fn zones(&self) -> &ZoneTracker {
        &self.zones
    }

    /// Whether the agent overlaps any zone, and whether one of them is a
    /// pipe zone.
    pub fn is_in_transfer_zone(&self) -> (bool, bool) {
        (self.zones.is_any_zone_active(), self.zones.in_pipe_zone())
    }

    /// Whether the driving controller may move on: nothing is bound and no
    /// hold is pending.
    pub const fn may_drive_on(&self) -> bool {
        self.target.is_none() && !self.hold_pending
    }

    /// Whether the agent is holding at a depot without a binding.
    pub const fn is_hold_pending(&self) -> bool {
        self.hold_pending
    }

    // -----------------------------------------------------------------------
    // Settings
    // -----------------------------------------------------------------------

    /// Enable or disable loading. Disabling clears the selection history; a
    /// running load is stopped on the next update.
    pub fn set_loading_enabled(&mut self, enabled: bool) {
        self.config.loading.enabled = enabled;
        if !enabled {
            self.history.clear();
            debug!(agent = %self.agent, "Loading disabled, selection history cleared");
        }
    }

    /// Enable or disable unloading. A running unload is stopped on the next
    /// update.
    pub fn set_unloading_enabled(&mut self, enabled: bool) {
        self.config.unloading.enabled = enabled;
    }

    /// Report the driving controller's route progress.
    pub fn set_drive_progress(&mut self, progress: DriveProgress) {
        self.progress = progress;
    }

    // -----------------------------------------------------------------------
    // Event intake
    // -----------------------------------------------------------------------

    /// Queue an event for the next update.
    pub fn push_event(&mut self, event: ControllerEvent) {
        self.events.push(event);
    }

    /// Collision callback: a sub-entity entered a zone.
    pub fn on_zone_enter(&mut self, zone: ZoneId, kind: ZoneKind, entity: EntityId, shape: u32) {
        self.push_event(ControllerEvent::ZoneEnter {
            zone,
            kind,
            entity,
            shape,
        });
    }

    /// Collision callback: a sub-entity left a zone.
    pub fn on_zone_leave(&mut self, zone: ZoneId, entity: EntityId, shape: u32) {
        self.push_event(ControllerEvent::ZoneLeave {
            zone,
            entity,
            shape,
        });
    }

    /// Collision callback: a sub-entity is still inside a zone.
    pub fn on_zone_stay(&mut self, zone: ZoneId, kind: ZoneKind, entity: EntityId, shape: u32) {
        self.push_event(ControllerEvent::ZoneStay {
            zone,
            kind,
            entity,
            shape,
        });
    }

    /// Raycast callback.
    pub fn on_raycast(&mut self, hit: RaycastHit) {
        self.push_event(ControllerEvent::Raycast(hit));
    }

    // -----------------------------------------------------------------------
    // Lifecycle hooks
    // -----------------------------------------------------------------------

    /// Begin automation: close every cover still open, clear tracked zones
    /// and become `Idle`.
    pub fn on_start<H: Host + ?Sized>(&mut self, host: &mut H) {
        if self.is_replica("start") {
            return;
        }
        self.halt_transfer(host);
        for at in std::mem::take(&mut self.open_covers).into_values().flatten() {
            host.set_cover_open(at, false);
        }
        self.zones.clear();
        self.events.clear();
        self.reset_discharge_tracking();
        self.hold_pending = false;
        self.drive_now = false;
        self.clear_status(host);
        self.transition(host, LoadingState::Idle, "started");
    }

    /// Halt automation. Any running transfer is cut synchronously. Calling
    /// it again has no further effect.
    pub fn on_stop<H: Host + ?Sized>(&mut self, host: &mut H) {
        if self.is_replica("stop") {
            return;
        }
        self.halt_transfer(host);
        self.reset_discharge_tracking();
        self.hold_pending = false;
        self.transition(host, LoadingState::Stopped, "stopped");
    }

    /// Hand control to the operator while loading or unloading. The
    /// transfer is stopped (and the discharge point reset when unloading)
    /// before the state changes. Ignored in any other state.
    pub fn on_manual_override<H: Host + ?Sized>(&mut self, host: &mut H) {
        if self.is_replica("manual override") {
            return;
        }
        if !self.state.is_transferring() {
            debug!(agent = %self.agent, state = %self.state, "Manual override ignored");
            return;
        }
        if let Some(target) = self.halt_transfer(host) {
            if target.direction == TransferDirection::Unloading {
                host.reset_discharge_point(target.counterpart);
            }
        }
        self.reset_discharge_tracking();
        self.hold_pending = false;
        self.clear_status(host);
        self.transition(host, LoadingState::ManualOverride, "manual override");
    }

    /// Resume after a manual pause.
    pub fn on_continue<H: Host + ?Sized>(&mut self, host: &mut H) {
        if self.is_replica("continue") {
            return;
        }
        self.halt_transfer(host);
        self.hold_pending = false;
        self.clear_status(host);
        if matches!(
            self.state,
            LoadingState::Stopped | LoadingState::Loading | LoadingState::Unloading
        ) {
            self.transition(host, LoadingState::Idle, "continued");
        }
    }

    /// Leave the current depot immediately: stop, remember the source so
    /// discovery skips it, and admit nothing until every zone is left.
    pub fn on_drive_now<H: Host + ?Sized>(&mut self, host: &mut H) {
        if self.is_replica("drive now") {
            return;
        }
        if let Some(target) = self.halt_transfer(host) {
            self.zones.set_last_used_point(Some(target.counterpart));
        }
        self.reset_discharge_tracking();
        self.hold_pending = false;
        self.drive_now = self.zones.is_any_zone_active();
        self.clear_status(host);
        if self.state.is_transferring() {
            self.transition(host, LoadingState::Idle, "drive now");
        }
    }

    /// Per-tick update.
    pub fn on_update<H: Host + ?Sized>(&mut self, dt: Duration, host: &mut H) {
        if self.role == ControllerRole::Replica {
            return;
        }
        self.time_in_state = self.time_in_state.saturating_add(dt);

        let tree = CompartmentTree::build(host.vehicle_tree(self.agent));
        for event in self.events.drain() {
            self.handle_event(event, &tree, host);
        }

        match self.state {
            LoadingState::Stopped => {}
            LoadingState::Idle => self.idle_tick(&tree, host),
            LoadingState::Loading => self.loading_tick(&tree, host),
            LoadingState::Unloading => self.unloading_tick(&tree, host),
            LoadingState::ManualOverride => self.override_tick(host),
        }
    }

    /// Apply a state token received from the authoritative side.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::NotAReplica`] on an authoritative
    /// controller, or [`ControllerError::Replication`] for an unknown token.
    pub fn apply_replicated_token(&mut self, token: &str) -> Result<LoadingState, ControllerError> {
        if self.role == ControllerRole::Authoritative {
            return Err(ControllerError::NotAReplica {
                token: token.to_owned(),
            });
        }
        let state = decode_state(token)?;
        if state != self.state {
            self.state = state;
            self.time_in_state = Duration::ZERO;
        }
        Ok(state)
    }

    // -----------------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------------

    fn handle_event<H: Host + ?Sized>(
        &mut self,
        event: ControllerEvent,
        tree: &CompartmentTree,
        host: &mut H,
    ) {
        match event {
            ControllerEvent::ZoneEnter {
                zone, kind, entity, ..
            } => {
                let outcome = self.zones.on_zone_enter(zone, kind, entity);
                self.after_enter(outcome, zone, entity, tree, host);
            }
            ControllerEvent::ZoneStay {
                zone, kind, entity, ..
            } => {
                let outcome = self.zones.on_zone_stay(zone, kind, entity);
                self.after_enter(outcome, zone, entity, tree, host);
            }
            ControllerEvent::ZoneLeave { zone, entity, .. } => {
                let outcome = self.zones.on_zone_leave(zone, entity);
                self.after_leave(outcome, zone, entity, host);
            }
            ControllerEvent::DischargeStateChanged {
                entity,
                compartment,
                target,
                zone,
                can_discharge,
            } => {
                let at = CompartmentRef {
                    entity,
                    index: compartment,
                };
                if can_discharge {
                    self.discharge_available(at, target, zone, tree, host);
                } else {
                    self.discharge_withdrawn(at, target, host);
                }
            }
            ControllerEvent::Raycast(hit) => self.line_of_sight_resolved(&hit, host),
        }
    }

    fn after_enter<H: Host + ?Sized>(
        &mut self,
        outcome: EnterOutcome,
        zone: ZoneId,
        entity: EntityId,
        tree: &CompartmentTree,
        host: &mut H,
    ) {
        if outcome == EnterOutcome::Duplicate || self.state == LoadingState::Stopped {
            return;
        }
        let Some(offer) = host.zone_offer(zone) else {
            debug!(agent = %self.agent, zone = %zone, "Entered zone has no offer");
            return;
        };
        if !offer.opens_covers {
            return;
        }
        for compartment in tree.compartments_of(entity) {
            if !offer.fits(compartment) {
                continue;
            }
            let at = CompartmentRef {
                entity,
                index: compartment.index,
            };
            if self.open_covers.entry(zone).or_default().insert(at) {
                host.set_cover_open(at, true);
            }
        }
    }

    fn after_leave<H: Host + ?Sized>(
        &mut self,
        outcome: LeaveOutcome,
        zone: ZoneId,
        entity: EntityId,
        host: &mut H,
    ) {
        if outcome == LeaveOutcome::Unknown {
            return;
        }
        if let Some(opened) = self.open_covers.get_mut(&zone) {
            let closing: Vec<CompartmentRef> =
                opened.iter().filter(|at| at.entity == entity).copied().collect();
            for at in closing {
                opened.remove(&at);
                host.set_cover_open(at, false);
            }
        }
        if outcome != LeaveOutcome::ZoneLeft {
            return;
        }
        self.open_covers.remove(&zone);

        if self.target.as_ref().is_some_and(|t| t.belongs_to(zone)) {
            self.halt_transfer(host);
            self.clear_status(host);
            self.transition(host, LoadingState::Idle, "zone left");
        }
        if self
            .pending_discharge
            .as_ref()
            .is_some_and(|p| p.zone == Some(zone))
        {
            self.reset_discharge_tracking();
        }
        if !self.zones.is_any_zone_active() {
            if self.drive_now {
                debug!(agent = %self.agent, "All zones left, admission resumes");
            }
            self.drive_now = false;
        }
    }

    fn discharge_available<H: Host + ?Sized>(
        &mut self,
        at: CompartmentRef,
        target: EntityId,
        zone: Option<ZoneId>,
        tree: &CompartmentTree,
        host: &mut H,
    ) {
        if !self.config.unloading.enabled || self.state != LoadingState::Idle || self.drive_now {
            return;
        }
        let Some(compartment) = tree.get(at) else {
            debug!(agent = %self.agent, entity = %at.entity, "Discharge reported for unknown compartment");
            return;
        };
        let Some(material) = compartment.material.clone() else {
            return;
        };
        if compartment.fill_percent() < self.config.unloading.empty_threshold_percent {
            return;
        }
        if self.los.is_pending_for(at, target) {
            return;
        }
        match host.issue_line_of_sight(at, target) {
            Some(query) => {
                self.los.issued(query, at, target);
                self.pending_discharge = Some(PendingDischarge {
                    at,
                    target,
                    zone,
                    material,
                });
            }
            None => {
                debug!(
                    agent = %self.agent,
                    entity = %at.entity,
                    "Discharge ray node missing, proceeding without line of sight"
                );
                self.begin_unloading(host, at, target, zone, material);
            }
        }
    }

    fn discharge_withdrawn<H: Host + ?Sized>(
        &mut self,
        at: CompartmentRef,
        target: EntityId,
        host: &mut H,
    ) {
        if self
            .pending_discharge
            .as_ref()
            .is_some_and(|p| p.at == at && p.target == target)
        {
            self.reset_discharge_tracking();
        }
        let unloading_here = self.target.as_ref().is_some_and(|t| {
            t.direction == TransferDirection::Unloading && t.at == at && t.counterpart == target
        });
        if unloading_here {
            self.halt_transfer(host);
            self.transition(host, LoadingState::Idle, "discharge no longer possible");
        }
    }

    fn line_of_sight_resolved<H: Host + ?Sized>(&mut self, hit: &RaycastHit, host: &mut H) {
        let Some((from, target, verdict)) = self.los.resolve(hit) else {
            return;
        };
        let Some(pending) = self
            .pending_discharge
            .take_if(|p| p.at == from && p.target == target)
        else {
            return;
        };
        match verdict {
            LineOfSight::Clear if self.state == LoadingState::Idle => {
                self.begin_unloading(host, pending.at, pending.target, pending.zone, pending.material);
            }
            LineOfSight::Obstructed { by } => {
                debug!(agent = %self.agent, target = %target, obstruction = %by, "Discharge obstructed");
            }
            LineOfSight::Clear | LineOfSight::Idle | LineOfSight::Unresolved => {}
        }
    }

    // -----------------------------------------------------------------------
    // State ticks
    // -----------------------------------------------------------------------

    fn idle_tick<H: Host + ?Sized>(&mut self, tree: &CompartmentTree, host: &mut H) {
        if !self.config.loading.enabled || self.drive_now {
            return;
        }
        self.zones.discover(host, self.agent);

        let mut fallback: Option<StatusKey> = None;
        for zone in self.zones.source_zones(None) {
            let Some(offer) = host.zone_offer(zone) else {
                debug!(agent = %self.agent, zone = %zone, "Source zone has no offer");
                continue;
            };
            for (at, compartment) in tree.depth_first() {
                if !self.zones.entities_in(zone).any(|e| e == at.entity) {
                    continue;
                }
                let pass = self.evaluate(compartment, &offer);
                debug!(
                    agent = %self.agent,
                    zone = %zone,
                    entity = %at.entity,
                    compartment = at.index,
                    outcomes = ?pass.outcomes(),
                    "Admission pass"
                );
                match selection::resolve(&pass) {
                    SelectionAction::Start { material } => {
                        self.target = Some(ActiveTarget::loading(
                            at,
                            material.clone(),
                            offer.entity,
                            Some(zone),
                            false,
                        ));
                        self.start_filling(host, material);
                        self.transition(host, LoadingState::Loading, "admitted");
                        return;
                    }
                    SelectionAction::WaitHere { material, status } => {
                        self.target = Some(ActiveTarget::loading(
                            at,
                            material,
                            offer.entity,
                            Some(zone),
                            false,
                        ));
                        self.hold_pending = false;
                        self.surface(host, status);
                        self.transition(host, LoadingState::Loading, "waiting on depot");
                        return;
                    }
                    SelectionAction::Hold { status } => fallback = Some(status),
                    SelectionAction::Stop { .. } | SelectionAction::Nothing => {}
                }
            }
        }

        match fallback {
            Some(status) => {
                self.hold_pending = true;
                self.surface(host, status);
            }
            None => {
                self.hold_pending = false;
                self.clear_status(host);
            }
        }
    }

    fn loading_tick<H: Host + ?Sized>(&mut self, tree: &CompartmentTree, host: &mut H) {
        let Some(target) = self.target.clone() else {
            warn!(agent = %self.agent, "Loading without a target");
            self.transition(host, LoadingState::Idle, "no target");
            return;
        };
        if !self.config.loading.enabled {
            self.halt_transfer(host);
            self.clear_status(host);
            self.transition(host, LoadingState::Idle, "loading disabled");
            return;
        }

        let compartment = tree.get(target.at);
        match safety::check_loading(compartment, self.ceiling_for(&target.material)) {
            SafetyVerdict::Stale => {
                self.drop_stale_target(host);
                return;
            }
            SafetyVerdict::CeilingReached => {
                self.finish_loading(host, StopReason::CapacityReached);
                return;
            }
            SafetyVerdict::Continue | SafetyVerdict::Emptied => {}
        }
        let Some(compartment) = compartment else {
            return;
        };

        let Some(offer) = target.source_zone.and_then(|zone| host.zone_offer(zone)) else {
            debug!(agent = %self.agent, "Loading source no longer reports an offer");
            self.halt_transfer(host);
            self.transition(host, LoadingState::Idle, "source gone");
            return;
        };
        let pass = self.evaluate(compartment, &offer);
        match selection::resolve(&pass) {
            SelectionAction::Start { material } => {
                if target.transferring && material == target.material {
                    return;
                }
                if target.transferring {
                    host.set_filling(target.at, target.counterpart, &target.material, false);
                }
                if let Some(bound) = self.target.as_mut() {
                    bound.material = material.clone();
                    bound.transferring = false;
                }
                self.start_filling(host, material);
            }
            SelectionAction::Stop { reason, .. } => self.finish_loading(host, reason),
            SelectionAction::WaitHere { status, .. } => {
                if target.transferring {
                    host.set_filling(target.at, target.counterpart, &target.material, false);
                    if let Some(bound) = self.target.as_mut() {
                        bound.transferring = false;
                    }
                    info!(agent = %self.agent, material = %target.material, "Filling paused, waiting on depot");
                }
                self.surface(host, status);
            }
            SelectionAction::Hold { status } => {
                self.halt_transfer(host);
                self.hold_pending = true;
                self.surface(host, status);
                self.transition(host, LoadingState::Idle, "admission withdrawn");
            }
            SelectionAction::Nothing => {
                self.halt_transfer(host);
                self.clear_status(host);
                self.transition(host, LoadingState::Idle, "nothing to load");
            }
        }
    }

    fn unloading_tick<H: Host + ?Sized>(&mut self, tree: &CompartmentTree, host: &mut H) {
        let Some(target) = self.target.as_ref() else {
            warn!(agent = %self.agent, "Unloading without a target");
            self.transition(host, LoadingState::Idle, "no target");
            return;
        };
        if !self.config.unloading.enabled {
            self.halt_transfer(host);
            self.transition(host, LoadingState::Idle, "unloading disabled");
            return;
        }
        let threshold = self.config.unloading.empty_threshold_percent;
        match safety::check_unloading(tree.get(target.at), threshold) {
            SafetyVerdict::Stale => self.drop_stale_target(host),
            SafetyVerdict::Emptied => {
                info!(agent = %self.agent, material = %target.material, "Compartment emptied");
                self.halt_transfer(host);
                self.transition(host, LoadingState::Idle, "emptied");
            }
            SafetyVerdict::Continue | SafetyVerdict::CeilingReached => {}
        }
    }

    fn override_tick<H: Host + ?Sized>(&mut self, host: &mut H) {
        if self.zones.is_any_zone_active() {
            return;
        }
        let offset = self.config.manual_override.hold_waypoint_offset;
        if self.progress.paused_near_hold(offset) {
            return;
        }
        self.transition(host, LoadingState::Idle, "override released");
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    /// Run the admission engine for one compartment against one offer.
    ///
    /// Fuel zones use the built-in fuel quota without alternation. Other
    /// zones use the quota table in priority order. Materials the
    /// compartment cannot take, or cannot mix with what it holds, are not
    /// candidates.
    fn evaluate(&self, compartment: &CompartmentSnapshot, offer: &ZoneOffer) -> AdmissionPass {
        let fuel: Vec<QuotaEntry>;
        let (entries, alternation) = if offer.kind == ZoneKind::Fuel {
            fuel = offer
                .levels
                .iter()
                .map(|(material, _)| material)
                .filter(|material| self.config.loading.is_fuel(material))
                .map(|material| fuel_quota(material, self.config.loading.fuel_max_fill_percent))
                .collect();
            (fuel.as_slice(), AlternationPolicy::OFF)
        } else {
            (
                self.quotas.entries(),
                AlternationPolicy {
                    required: self.config.loading.require_alternation,
                    limit: self.config.loading.alternation_limit,
                },
            )
        };

        let ctx = AdmissionContext {
            compartment,
            offered_count: offer.offered_count(),
            history: &self.history,
            alternation,
        };
        let candidates = entries
            .iter()
            .filter(|quota| compartment.supports(&quota.material))
            .filter(|quota| compartment.is_empty() || compartment.holds(&quota.material))
            .filter_map(|quota| {
                offer
                    .level_of(&quota.material)
                    .map(|zone_level| Candidate { quota, zone_level })
            });
        AdmissionPass::run(&ctx, candidates)
    }

    /// Ceiling for a material: its quota entry, the fuel ceiling, or the
    /// default.
    fn ceiling_for(&self, material: &MaterialType) -> Decimal {
        if let Some(entry) = self.quotas.lookup(material) {
            return entry.ceiling();
        }
        if self.config.loading.is_fuel(material) {
            return fuel_quota(material, self.config.loading.fuel_max_fill_percent).ceiling();
        }
        DEFAULT_MAX_FILL_PERCENT
    }

    /// Start filling the bound compartment with `material`.
    fn start_filling<H: FillUnitHost + StatusSurface + ?Sized>(
        &mut self,
        host: &mut H,
        material: MaterialType,
    ) {
        let Some(target) = self.target.as_mut() else {
            return;
        };
        host.set_filling(target.at, target.counterpart, &material, true);
        target.transferring = true;
        info!(
            agent = %self.agent,
            material = %material,
            entity = %target.at.entity,
            compartment = target.at.index,
            "Filling started"
        );
        self.history.record(material);
        self.hold_pending = false;
        self.clear_status(host);
    }

    fn begin_unloading<H: Host + ?Sized>(
        &mut self,
        host: &mut H,
        at: CompartmentRef,
        target: EntityId,
        zone: Option<ZoneId>,
        material: MaterialType,
    ) {
        host.set_discharging(at, target, true);
        info!(agent = %self.agent, material = %material, target = %target, "Discharge started");
        self.target = Some(ActiveTarget::unloading(at, material, target, zone));
        self.hold_pending = false;
        self.clear_status(host);
        self.transition(host, LoadingState::Unloading, "discharge possible");
    }

    /// A load ended normally: count the repetition and go idle.
    fn finish_loading<H: Host + ?Sized>(&mut self, host: &mut H, reason: StopReason) {
        if let Some(target) = self.halt_transfer(host) {
            let remaining = self.quotas.complete_load(&target.material);
            info!(
                agent = %self.agent,
                material = %target.material,
                ?reason,
                ?remaining,
                "Load complete"
            );
        }
        self.hold_pending = false;
        self.clear_status(host);
        self.transition(host, LoadingState::Idle, "load complete");
    }

    /// Take the binding and cut its transfer. Returns the binding.
    fn halt_transfer<H: Host + ?Sized>(&mut self, host: &mut H) -> Option<ActiveTarget> {
        let target = self.target.take()?;
        if target.transferring {
            match target.direction {
                TransferDirection::Loading => {
                    host.set_filling(target.at, target.counterpart, &target.material, false);
                }
                TransferDirection::Unloading => {
                    host.set_discharging(target.at, target.counterpart, false);
                }
            }
            debug!(agent = %self.agent, direction = ?target.direction, "Transfer force-stopped");
        }
        Some(target)
    }

    /// The bound compartment vanished or lost its capacity; drop the
    /// binding without commanding the entity.
    fn drop_stale_target<H: ReplicationSink + StatusSurface + ?Sized>(&mut self, host: &mut H) {
        if let Some(target) = self.target.take() {
            warn!(
                agent = %self.agent,
                entity = %target.at.entity,
                compartment = target.at.index,
                "Stale transfer target cleared"
            );
        }
        self.clear_status(host);
        self.transition(host, LoadingState::Idle, "stale target");
    }

    fn reset_discharge_tracking(&mut self) {
        self.pending_discharge = None;
        self.los.reset();
    }

    fn surface<H: StatusSurface + ?Sized>(&mut self, host: &mut H, status: StatusKey) {
        if self.status == Some(status) {
            return;
        }
        host.show_status(self.agent, status);
        self.status = Some(status);
    }

    fn clear_status<H: StatusSurface + ?Sized>(&mut self, host: &mut H) {
        if self.status.take().is_some() {
            host.clear_status(self.agent);
        }
    }

    fn is_replica(&self, command: &'static str) -> bool {
        if self.role == ControllerRole::Replica {
            debug!(agent = %self.agent, command, "Command ignored on replica");
            return true;
        }
        false
    }

    fn transition<H: ReplicationSink + ?Sized>(
        &mut self,
        host: &mut H,
        to: LoadingState,
        reason: &'static str,
    ) {
        if self.state == to {
            return;
        }
        info!(agent = %self.agent, from = %self.state, to = %to, reason, "Loading state changed");
        self.state = to;
        self.time_in_state = Duration::ZERO;
        self.publisher.publish(host, self.agent, to);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hold_window_looks_back_from_current_waypoint() {
        let progress = DriveProgress {
            current_waypoint: 12,
            hold_waypoint: Some(8),
            paused: true,
        };
        assert!(progress.paused_near_hold(5));
        assert!(!progress.paused_near_hold(3));
        assert!(!DriveProgress { paused: false, ..progress }.paused_near_hold(5));
        assert!(!DriveProgress { hold_waypoint: Some(13), ..progress }.paused_near_hold(5));
        assert!(!DriveProgress { hold_waypoint: None, ..progress }.paused_near_hold(5));
    }

    #[test]
    fn replica_only_mirrors() {
        let mut replica = TransferController::replica(AgentId::new(), ControllerConfig::default());
        assert_eq!(replica.role(), ControllerRole::Replica);
        assert_eq!(replica.apply_replicated_token("Loading"), Ok(LoadingState::Loading));
        assert_eq!(replica.state(), LoadingState::Loading);
        assert!(matches!(
            replica.apply_replicated_token("loading"),
            Err(ControllerError::Replication { .. })
        ));
        assert_eq!(replica.state(), LoadingState::Loading);
    }

    #[test]
    fn authoritative_rejects_replicated_state() {
        let mut controller =
            TransferController::new(AgentId::new(), ControllerConfig::default(), QuotaTable::empty());
        assert_eq!(
            controller.apply_replicated_token("Idle"),
            Err(ControllerError::NotAReplica {
                token: "Idle".to_owned()
            })
        );
        assert_eq!(controller.state(), LoadingState::Stopped);
    }
}
