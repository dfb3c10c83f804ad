//! The world the traffic lives in.

use ut_core::{AgentId, NodeId, Vec3};
use ut_nav::{CollisionProbe, DriveCommand, VehicleBody, VehiclePose};

/// Services the traffic manager needs from the host simulation.
///
/// The host owns the vehicle bodies and their physics.  The manager decides
/// where vehicles appear, drives them and tells the host when to remove them.
pub trait TrafficHost {
    /// Pose of the reference vehicle the spawn volume follows, usually the
    /// player.  `None` leaves the volume where it is.
    fn reference_pose(&self) -> Option<VehiclePose>;

    /// Create a vehicle for `agent` at `pose` near `node`.  Returns the body
    /// of the vehicle created, or `None` if the host refused.
    fn spawn_vehicle(&mut self, agent: AgentId, node: NodeId, pose: &VehiclePose) -> Option<VehicleBody>;

    fn destroy_vehicle(&mut self, agent: AgentId);

    /// Current pose of `agent`, `None` once the host has lost it.
    fn pose(&self, agent: AgentId) -> Option<VehiclePose>;

    /// Ray cast on behalf of `agent`, which must not hit itself.  Same
    /// contract as [`CollisionProbe::trace`].
    fn trace(&mut self, agent: AgentId, start: Vec3, end: Vec3) -> Option<f32>;

    fn apply_command(&mut self, agent: AgentId, command: &DriveCommand);
}

/// Routes one agent's sensor rays to the host.
pub struct HostProbe<'a, H: TrafficHost> {
    pub host: &'a mut H,
    pub agent: AgentId,
}

impl<H: TrafficHost> CollisionProbe for HostProbe<'_, H> {
    fn trace(&mut self, start: Vec3, end: Vec3) -> Option<f32> {
        self.host.trace(self.agent, start, end)
    }
}
