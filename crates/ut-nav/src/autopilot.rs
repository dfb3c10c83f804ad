//! The `Autopilot` capability trait.
//!
//! The traffic manager only ever talks to navigated vehicles through this
//! trait, so the controller type is fixed when the manager is built instead
//! of being discovered per vehicle at run time.

use ut_core::{AgentId, AgentRng, NavConfig, NodeId};
use ut_road::RoadNetwork;

use crate::controller::NavigationController;
use crate::error::NavResult;
use crate::sensor::CollisionProbe;
use crate::vehicle::{Placement, TickOutcome, VehiclePose};

/// A controller that can drive a vehicle on a [`RoadNetwork`].
pub trait Autopilot: Sized {
    /// Attach to a freshly placed vehicle.
    fn bind(
        agent: AgentId,
        net: &RoadNetwork,
        config: &NavConfig,
        placement: &Placement,
        rng: AgentRng,
    ) -> NavResult<Self>;

    /// One control step.  `probe` answers the sensor ray casts.
    fn advance<P: CollisionProbe + ?Sized>(
        &mut self,
        net: &RoadNetwork,
        dt: f32,
        pose: &VehiclePose,
        probe: &mut P,
    ) -> TickOutcome;

    /// Last node the vehicle passed.
    fn previous_node(&self) -> NodeId;

    /// `true` while travelling against the node order of its segment.
    fn is_inverted(&self) -> bool;
}

impl Autopilot for NavigationController {
    fn bind(
        agent: AgentId,
        net: &RoadNetwork,
        config: &NavConfig,
        placement: &Placement,
        rng: AgentRng,
    ) -> NavResult<Self> {
        NavigationController::bind(agent, net, config, placement, rng)
    }

    fn advance<P: CollisionProbe + ?Sized>(
        &mut self,
        net: &RoadNetwork,
        dt: f32,
        pose: &VehiclePose,
        probe: &mut P,
    ) -> TickOutcome {
        NavigationController::advance(self, net, dt, pose, probe)
    }

    fn previous_node(&self) -> NodeId {
        NavigationController::previous_node(self)
    }

    fn is_inverted(&self) -> bool {
        NavigationController::is_inverted(self)
    }
}
