//! The `TrafficManager` context object and its two loops.
//!
//! # Loops
//!
//! ```text
//! step(dt)
//!   clock due? ── yes ──► refresh_population()
//!   │                       ① origin  - nearest node to the reference pose;
//!   │                                   recompute the volume if it moved
//!   │                       ② cull    - vehicles last seen on a normal node
//!   │                                   outside the volume
//!   │                       ③ spawn   - top up to the origin segment's
//!   │                                   capacity on spawnable nodes
//!   └─► drive every vehicle (ascending AgentId)
//!         pose → Autopilot::advance → apply_command | remove
//! ```

use std::collections::BTreeMap;

use tracing::{debug, info, trace, warn};

use ut_core::{AgentId, AgentRng, NodeId, SegmentId, SimClock, SimRng, TrafficConfig};
use ut_nav::{Autopilot, NavigationController, Placement, TickOutcome, VehiclePose};
use ut_road::RoadNetwork;

use crate::error::SimResult;
use crate::host::{HostProbe, TrafficHost};
use crate::observer::{RemovalReason, TrafficObserver};
use crate::spawn::SpawnVolume;

/// Lane hint that no port has, so spawn lanes are always drawn at random.
const ANY_LANE: i32 = 100;

/// Owns the road network and every navigated vehicle on it.
///
/// Create via [`TrafficManagerBuilder`][crate::TrafficManagerBuilder], call
/// [`begin`](Self::begin) once, then [`step`](Self::step) every physics
/// frame.
pub struct TrafficManager<H: TrafficHost, A: Autopilot = NavigationController> {
    pub config: TrafficConfig,
    pub clock: SimClock,
    network: RoadNetwork,
    host: H,
    volume: SpawnVolume,
    agents: BTreeMap<AgentId, A>,
    rng: SimRng,
    next_agent: u32,
}

impl<H: TrafficHost, A: Autopilot> TrafficManager<H, A> {
    pub(crate) fn new(config: TrafficConfig, network: RoadNetwork, host: H) -> Self {
        Self {
            clock: SimClock::new(config.control_interval_secs),
            rng: SimRng::new(config.seed),
            config,
            network,
            host,
            volume: SpawnVolume::default(),
            agents: BTreeMap::new(),
            next_agent: 0,
        }
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    pub fn network(&self) -> &RoadNetwork {
        &self.network
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn volume(&self) -> &SpawnVolume {
        &self.volume
    }

    pub fn vehicle_count(&self) -> usize {
        self.agents.len()
    }

    pub fn agent(&self, id: AgentId) -> Option<&A> {
        self.agents.get(&id)
    }

    /// Every live vehicle in ascending id order.
    pub fn agents(&self) -> impl Iterator<Item = (AgentId, &A)> + '_ {
        self.agents.iter().map(|(&id, a)| (id, a))
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────

    /// Fill the volume around the reference vehicle for the first time.
    /// Spawns may land right next to it.
    pub fn begin<O: TrafficObserver>(&mut self, observer: &mut O) {
        info!(
            nodes = self.network.node_count(),
            segments = self.network.segment_count(),
            "traffic starting"
        );
        self.refresh_population(true, observer);
    }

    /// Advance by `dt` seconds of physics time.
    pub fn step<O: TrafficObserver>(&mut self, dt: f32, observer: &mut O) {
        if self.clock.advance(dt) {
            self.refresh_population(false, observer);
        }
        self.drive(dt, observer);
    }

    /// Drop every vehicle and swap in a recompiled network, then fill it as
    /// on [`begin`](Self::begin).  Ids of the old network mean nothing in
    /// the new one, so no controller survives.
    pub fn rebuild<O: TrafficObserver>(&mut self, network: RoadNetwork, observer: &mut O) {
        let ids: Vec<AgentId> = self.agents.keys().copied().collect();
        for id in ids {
            self.remove(id, RemovalReason::Rebuild, observer);
        }
        self.network = network;
        self.volume = SpawnVolume::default();
        info!(nodes = self.network.node_count(), "road network replaced");
        self.refresh_population(true, observer);
    }

    // ── Vehicle loop ──────────────────────────────────────────────────────

    fn drive<O: TrafficObserver>(&mut self, dt: f32, observer: &mut O) {
        let mut removed = Vec::new();
        for (&id, agent) in self.agents.iter_mut() {
            let Some(pose) = self.host.pose(id) else {
                removed.push((id, RemovalReason::Vanished));
                continue;
            };
            let mut probe = HostProbe { host: &mut self.host, agent: id };
            match agent.advance(&self.network, dt, &pose, &mut probe) {
                TickOutcome::Drive(command) => self.host.apply_command(id, &command),
                TickOutcome::Terminated => removed.push((id, RemovalReason::PathExhausted)),
            }
        }
        for (id, reason) in removed {
            self.remove(id, reason, observer);
        }
    }

    fn remove<O: TrafficObserver>(&mut self, id: AgentId, reason: RemovalReason, observer: &mut O) {
        if self.agents.remove(&id).is_none() {
            return;
        }
        if reason != RemovalReason::Vanished {
            self.host.destroy_vehicle(id);
        }
        debug!(agent = %id, ?reason, "vehicle removed");
        observer.on_vehicle_removed(id, reason);
    }

    // ── Population control ────────────────────────────────────────────────

    /// Move the volume with the reference vehicle, cull what fell out of it
    /// and spawn up to capacity.
    pub fn refresh_population<O: TrafficObserver>(&mut self, initial: bool, observer: &mut O) {
        let reference = self.host.reference_pose();
        if let Some(origin) = reference.and_then(|p| self.network.nearest_node(p.position)) {
            if origin != self.volume.origin() {
                self.volume = SpawnVolume::compute(&self.network, origin, self.config.spawn.volume_cap);
                debug!(%origin, nodes = self.volume.len(), "spawn volume recomputed");
            }
        }

        let culled = if initial { 0 } else { self.cull(observer) };
        let spawned = self.spawn(initial, reference.as_ref(), observer);

        if culled > 0 || spawned > 0 {
            info!(
                tick = %self.clock.current_tick,
                spawned,
                culled,
                vehicles = self.agents.len(),
                "population refreshed"
            );
        }
        observer.on_control_tick(self.clock.current_tick, self.volume.len(), self.agents.len());
    }

    /// Remove vehicles whose last node is a normal node outside the volume.
    fn cull<O: TrafficObserver>(&mut self, observer: &mut O) -> usize {
        let stale: Vec<AgentId> = self
            .agents
            .iter()
            .filter(|(_, agent)| {
                let node = agent.previous_node();
                self.network.get_node(node).is_some_and(|n| n.is_normal()) && !self.volume.contains(node)
            })
            .map(|(&id, _)| id)
            .collect();
        for &id in &stale {
            self.remove(id, RemovalReason::OutOfVolume, observer);
        }
        stale.len()
    }

    /// Top the population up to the capacity of the origin's segment.
    ///
    /// A rejected draw still uses up an attempt, and each missing vehicle
    /// gets `attempts_per_vehicle` of them, so a volume with nowhere to
    /// spawn cannot stall the tick.
    fn spawn<O: TrafficObserver>(
        &mut self,
        initial: bool,
        reference: Option<&VehiclePose>,
        observer: &mut O,
    ) -> usize {
        let Some(origin) = self.network.get_node(self.volume.origin()) else {
            return 0;
        };
        let spawnable = self.volume.spawnable_nodes(&self.network, &self.config.spawn, initial);
        if spawnable.is_empty() {
            return 0;
        }

        let capacity = self.network.max_vehicles(origin.segment, self.config.spawn.lane_density) as usize;
        let missing = capacity.saturating_sub(self.agents.len());
        let budget = missing * self.config.spawn.attempts_per_vehicle as usize;

        let mut placed = 0;
        let mut spawned = 0;
        for _ in 0..budget {
            if placed >= missing {
                break;
            }
            let Some(&node) = self.rng.choose(&spawnable) else {
                break;
            };
            let segment = self.network.node(node).segment;
            let ports = self.network.entry_ports(segment);
            let Some(&port) = self.rng.choose(&ports) else {
                continue;
            };
            let invert = self.network.node(port).is_terminal();
            if !initial && !self.is_spawnable_at(reference, segment, invert) {
                continue;
            }
            placed += 1;
            match self.spawn_at(node, port, invert, observer) {
                Ok(true) => spawned += 1,
                Ok(false) => {}
                Err(e) => warn!(%node, error = %e, "failed to bind navigation"),
            }
        }
        if placed < missing {
            debug!(missing, placed, "spawn attempts exhausted");
        }
        spawned
    }

    /// `false` when the reference vehicle drives `segment` in the same
    /// direction, where a new vehicle could appear in its path.
    fn is_spawnable_at(&self, reference: Option<&VehiclePose>, segment: SegmentId, invert: bool) -> bool {
        let (Some(pose), Some(node)) = (reference, self.network.get_node(self.volume.origin())) else {
            return true;
        };
        if node.segment != segment {
            return true;
        }
        let reference_invert = node.head_vector(true, 1.0).dot(pose.forward) > 0.0;
        reference_invert != invert
    }

    /// Ask the host for a vehicle at `node` and bind a controller to it.
    ///
    /// `Ok(false)` when the host refuses.  A vehicle the controller cannot
    /// bind to is destroyed again before the error is returned.
    pub(crate) fn spawn_at<O: TrafficObserver>(
        &mut self,
        node: NodeId,
        port: NodeId,
        invert: bool,
        observer: &mut O,
    ) -> SimResult<bool> {
        let lane = self.network.random_right_lane(port, ANY_LANE, self.rng.inner());
        let pose = VehiclePose::new(
            self.network.compute_target(node, lane, invert),
            self.network.node(node).head_vector(invert, 1.0),
            0.0,
        );

        let agent = AgentId(self.next_agent);
        self.next_agent += 1;
        let Some(body) = self.host.spawn_vehicle(agent, node, &pose) else {
            trace!(%agent, %node, "host refused spawn");
            return Ok(false);
        };

        let placement = Placement { node, pose, body };
        let rng = AgentRng::new(self.config.seed, agent);
        match A::bind(agent, &self.network, &self.config.nav, &placement, rng) {
            Ok(controller) => {
                self.agents.insert(agent, controller);
                trace!(%agent, %node, lane, invert, "vehicle spawned");
                observer.on_vehicle_spawned(agent, node);
                Ok(true)
            }
            Err(e) => {
                self.host.destroy_vehicle(agent);
                Err(e.into())
            }
        }
    }
}
