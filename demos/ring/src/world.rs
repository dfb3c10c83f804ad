//! Kinematic stand-in for a physics world.
//!
//! Cars are points with a heading and a speed; collision is a circle around
//! every car and around the scripted player.

use std::collections::BTreeMap;

use ut_core::geo::rotate_yaw;
use ut_core::{AgentId, NodeId, Vec3};
use ut_nav::{DriveCommand, VehicleBody, VehiclePose};
use ut_sim::TrafficHost;

use crate::ring;

/// Speed units per second at full throttle.
const ACCELERATION: f32 = 8.0;
/// Fraction of speed lost per second.
const DRAG: f32 = 0.05;
const HAND_BRAKE_DECAY: f32 = 3.0;
/// World units travelled per second per speed unit (km/h to cm/s).
const CM_PER_SPEED_UNIT: f32 = 27.78;
/// Heading change per second at full lock and cruising speed.
const MAX_YAW_RATE_DEG: f32 = 60.0;
const CAR_RADIUS: f32 = 200.0;

struct Car {
    pose: VehiclePose,
    command: DriveCommand,
}

pub struct RingWorld {
    cars: BTreeMap<AgentId, Car>,
    /// Distance of the player along the ring.
    player: f32,
    player_speed: f32,
}

impl RingWorld {
    pub fn new(player_speed: f32) -> Self {
        Self { cars: BTreeMap::new(), player: 0.0, player_speed }
    }

    pub fn car_count(&self) -> usize {
        self.cars.len()
    }

    pub fn mean_speed(&self) -> f32 {
        if self.cars.is_empty() {
            return 0.0;
        }
        self.cars.values().map(|c| c.pose.speed).sum::<f32>() / self.cars.len() as f32
    }

    fn player_pose(&self) -> VehiclePose {
        let (position, forward) = ring::along(self.player);
        VehiclePose::new(position, forward, self.player_speed)
    }

    /// Move every car by its last command, then the player.
    pub fn integrate(&mut self, dt: f32) {
        for car in self.cars.values_mut() {
            let (cmd, pose) = (car.command, &mut car.pose);
            if cmd.hand_brake {
                pose.speed *= (1.0 - HAND_BRAKE_DECAY * dt).max(0.0);
            }
            pose.speed += cmd.throttle * ACCELERATION * dt;
            pose.speed -= pose.speed * DRAG * dt;

            let grip = (pose.speed / 20.0).clamp(-1.0, 1.0);
            pose.forward = rotate_yaw(pose.forward, cmd.steering * MAX_YAW_RATE_DEG * grip * dt).normalize_or_zero();
            pose.position += pose.forward * pose.speed * CM_PER_SPEED_UNIT * dt;
        }
        self.player += self.player_speed * CM_PER_SPEED_UNIT * dt;
    }
}

/// Distance along `start → end` to the first point inside the circle, on
/// the ground plane.
fn ray_circle(start: Vec3, end: Vec3, center: Vec3, radius: f32) -> Option<f32> {
    let flat = |v: Vec3| Vec3::new(v.x, v.y, 0.0);
    let (start, end, center) = (flat(start), flat(end), flat(center));
    let length = start.distance(end);
    if length <= 0.0 {
        return None;
    }
    let dir = (end - start) / length;
    let m = start - center;
    let b = m.dot(dir);
    let c = m.dot(m) - radius * radius;
    if c > 0.0 && b > 0.0 {
        return None;
    }
    let disc = b * b - c;
    if disc < 0.0 {
        return None;
    }
    let t = (-b - disc.sqrt()).max(0.0);
    (t <= length).then_some(t)
}

impl TrafficHost for RingWorld {
    fn reference_pose(&self) -> Option<VehiclePose> {
        Some(self.player_pose())
    }

    fn spawn_vehicle(&mut self, agent: AgentId, _node: NodeId, pose: &VehiclePose) -> Option<VehicleBody> {
        if self.cars.values().any(|c| c.pose.position.distance(pose.position) < 2.0 * CAR_RADIUS) {
            return None;
        }
        self.cars.insert(agent, Car { pose: *pose, command: DriveCommand::default() });
        Some(VehicleBody::default())
    }

    fn destroy_vehicle(&mut self, agent: AgentId) {
        self.cars.remove(&agent);
    }

    fn pose(&self, agent: AgentId) -> Option<VehiclePose> {
        self.cars.get(&agent).map(|c| c.pose)
    }

    fn trace(&mut self, agent: AgentId, start: Vec3, end: Vec3) -> Option<f32> {
        let player = self.player_pose().position;
        self.cars
            .iter()
            .filter(|&(&id, _)| id != agent)
            .map(|(_, c)| c.pose.position)
            .chain(std::iter::once(player))
            .filter_map(|center| ray_circle(start, end, center, CAR_RADIUS))
            .min_by(f32::total_cmp)
    }

    fn apply_command(&mut self, agent: AgentId, command: &DriveCommand) {
        if let Some(car) = self.cars.get_mut(&agent) {
            car.command = *command;
        }
    }
}
