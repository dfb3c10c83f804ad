//! Per-vehicle navigation controller.
//!
//! # Path window
//!
//! The controller never holds a full route.  It keeps a short queue of
//! upcoming nodes, the node it is steering for (`next_node`) and the port
//! that closes the queue (`end_port`).  `end_port` itself is never steered
//! for: once the queue runs low the path continues from its connected
//! partner, either straight along the next segment or through a random turn
//! of the next crossing.
//!
//! # Tick
//!
//! ```text
//! advance()
//!   sweep active sensors
//!   target within radius? ── yes ──► update_path_target()
//!   │                                  ├ ok   → idle command
//!   │                                  └ none → Terminated
//!   blocked ahead on a long stretch? ─► switch_lane() if a side is free
//!   │                                    (previous command is kept)
//!   └─► steering / throttle synthesis
//! ```

use std::collections::VecDeque;
use std::f32::consts::FRAC_PI_2;

use tracing::{debug, trace};

use ut_core::{AgentId, AgentRng, NavConfig, NodeId, Vec3};
use ut_road::{RoadNetwork, TurnKind};

use crate::error::{NavError, NavResult};
use crate::sensor::{CollisionProbe, SensorRig};
use crate::vehicle::{DriveCommand, Placement, TickOutcome, TurnSignal, VehiclePose};

/// Speed magnitude under which the vehicle counts as stationary.
const MOVING_SPEED: f32 = 1.0;
/// Speed over which a collapsed ceiling forces the hand brake.
const BRAKING_SPEED: f32 = 0.2;
/// Reverse speed under which the rear sensor is consulted.
const REVERSING_SPEED: f32 = -2.0;
/// Dead band around the speed ceiling.
const SPEED_TOLERANCE: f32 = 0.2;
const REVERSE_THROTTLE: f32 = -0.5;
const SIDE_AVOID_STEERING: f32 = 0.2;

/// Controller phase.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NavState {
    Cruising,
    /// Steering for a point in the new lane.  Ends when it is reached.
    LaneSwitching,
    Terminated,
}

/// Signed lane position of `pose` relative to the segment of `node`, in
/// lanes from the road axis.  `None` inside a crossing or when the segment's
/// first node has no lane width.
pub fn absolute_lane(net: &RoadNetwork, node: NodeId, pose: &VehiclePose) -> Option<f32> {
    let n = net.get_node(node)?;
    let segment = net.segment(n.segment);
    if segment.has_cross() {
        return None;
    }
    let width = segment.nodes.first().and_then(|&p| net.port(p)).map(|p| p.lane_width)?;
    if width <= 0.0 {
        return None;
    }
    let lane_vec = pose.position - n.nearest_point_on_vectors(pose.position);
    let dist = lane_vec.length();
    let signed = if pose.right().dot(lane_vec) >= 0.0 { dist } else { -dist };
    Some(signed / width - 0.5)
}

// ── NavigationController ──────────────────────────────────────────────────────

/// Drives one vehicle along the road graph.
pub struct NavigationController {
    agent: AgentId,
    config: NavConfig,
    rng: AgentRng,
    sensors: SensorRig,

    state: NavState,
    current_target: Vec3,
    path: VecDeque<NodeId>,
    prev_node: NodeId,
    next_node: NodeId,
    /// First port of the current segment in travel direction.  Bounds lane
    /// changes.
    in_port: NodeId,
    end_port: NodeId,
    lane: i32,
    invert: bool,
    signal: TurnSignal,
    /// Seconds of committed reversing left; negative when not reversing.
    force_backward: f32,
    speed_limit: f32,
    last_command: DriveCommand,
}

impl NavigationController {
    /// Bind a vehicle placed at `placement.node`.
    ///
    /// The lane is the rounded lateral position, the direction follows the
    /// vehicle heading and the path is the rest of the node's segment.  The
    /// first target is the vehicle's own position, so the first tick pulls
    /// the next node from the path.
    pub fn bind(
        agent: AgentId,
        net: &RoadNetwork,
        config: &NavConfig,
        placement: &Placement,
        rng: AgentRng,
    ) -> NavResult<Self> {
        let node = placement.node;
        let start = net.get_node(node).ok_or(NavError::UnknownNode(node))?;
        let pose = &placement.pose;

        let lane = absolute_lane(net, node, pose).map_or(0, |l| l.round() as i32);
        let invert = start.head_vector(true, 1.0).dot(pose.forward) > 0.0;

        let nodes = net.collect_nodes(start.segment, invert);
        let skip = nodes.iter().position(|&n| n == node).ok_or(NavError::NotOnSegment(node))?;
        let in_port = nodes[0];
        let mut path: VecDeque<NodeId> = nodes[skip..].iter().copied().collect();
        let end_port = path.pop_back().unwrap_or(node);

        debug!(%agent, %node, lane, invert, remaining = path.len(), "vehicle bound");
        Ok(Self {
            agent,
            config: config.clone(),
            rng,
            sensors: SensorRig::for_body(&placement.body),
            state: NavState::Cruising,
            current_target: pose.position,
            path,
            prev_node: node,
            next_node: node,
            in_port,
            end_port,
            lane,
            invert,
            signal: TurnSignal::None,
            force_backward: -1.0,
            speed_limit: 1.0,
            last_command: DriveCommand::default(),
        })
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    pub fn agent(&self) -> AgentId {
        self.agent
    }

    pub fn state(&self) -> NavState {
        self.state
    }

    pub fn lane(&self) -> i32 {
        self.lane
    }

    /// `true` while travelling against the segment's node order.
    pub fn is_inverted(&self) -> bool {
        self.invert
    }

    pub fn current_target(&self) -> Vec3 {
        self.current_target
    }

    /// Last node passed.
    pub fn previous_node(&self) -> NodeId {
        self.prev_node
    }

    /// Node currently steered for.
    pub fn next_node(&self) -> NodeId {
        self.next_node
    }

    pub fn end_port(&self) -> NodeId {
        self.end_port
    }

    pub fn path(&self) -> &VecDeque<NodeId> {
        &self.path
    }

    pub fn turn_signal(&self) -> TurnSignal {
        self.signal
    }

    /// Speed factor used by the last synthesized command.
    pub fn speed_limit(&self) -> f32 {
        self.speed_limit
    }

    pub fn sensors(&self) -> &SensorRig {
        &self.sensors
    }

    // ── Tick ──────────────────────────────────────────────────────────────

    /// Run one control step.
    pub fn advance<P: CollisionProbe + ?Sized>(
        &mut self,
        net: &RoadNetwork,
        dt: f32,
        pose: &VehiclePose,
        probe: &mut P,
    ) -> TickOutcome {
        if self.state == NavState::Terminated {
            return TickOutcome::Terminated;
        }
        self.sensors.sweep_active(pose, probe);

        if pose.position.distance(self.current_target) < self.config.target_radius {
            if !self.update_path_target(net, pose, probe) {
                debug!(agent = %self.agent, node = %self.next_node, "path exhausted");
                self.state = NavState::Terminated;
                return TickOutcome::Terminated;
            }
            self.last_command = DriveCommand::idle(self.signal);
            return TickOutcome::Drive(self.last_command);
        }

        if self.try_evasive_lane_change(net, pose, probe) {
            self.last_command.turn_signal = self.signal;
            return TickOutcome::Drive(self.last_command);
        }

        self.last_command = self.synthesize(net, dt, pose, probe);
        TickOutcome::Drive(self.last_command)
    }

    /// Change lane around an obstacle ahead when enough road is left.
    fn try_evasive_lane_change<P: CollisionProbe + ?Sized>(
        &mut self,
        net: &RoadNetwork,
        pose: &VehiclePose,
        probe: &mut P,
    ) -> bool {
        if self.state == NavState::LaneSwitching
            || net.segment_of(self.next_node).has_cross()
            || self.signal != TurnSignal::None
            || !self.sensors.head.is_obstacle_detected()
        {
            return false;
        }
        let remaining = net.node(self.next_node).length_on_segment(!self.invert);
        if remaining <= self.config.lane_change_min_remaining {
            return false;
        }
        let target_lane = if self.can_switch_right(net, pose, probe) {
            self.lane + 1
        } else if self.can_switch_left(net, pose, probe) {
            self.lane - 1
        } else {
            return false;
        };
        let distance = remaining.min(self.sensors.lane.nearest_distance());
        debug!(agent = %self.agent, from = self.lane, to = target_lane, distance, "evasive lane change");
        self.switch_lane(net, pose, target_lane, distance);
        true
    }

    fn synthesize<P: CollisionProbe + ?Sized>(
        &mut self,
        net: &RoadNetwork,
        dt: f32,
        pose: &VehiclePose,
        probe: &mut P,
    ) -> DriveCommand {
        let cfg = &self.config;
        let dir = (self.current_target - pose.position).normalize_or_zero();
        let cos_forward = pose.forward.dot(dir);
        let cos_right = pose.right().dot(dir);

        let mut speed_limit = self.sensors.head.normalized_value();
        if let Some(node) = net.get_node(self.next_node) {
            speed_limit = speed_limit.min(node.speed_limit);
        }
        self.speed_limit = speed_limit;
        let mut max_speed = cfg.max_speed * speed_limit * cos_forward;

        let need_brake = (pose.speed > BRAKING_SPEED && speed_limit < cfg.brake_limit)
            || (pose.speed < REVERSING_SPEED && self.sensors.rear.sweep(pose, probe));

        let steering = if self.sensors.right.is_obstacle_detected() {
            let weight = self.sensors.right.normalized_value();
            max_speed *= 1.0 - weight;
            -SIDE_AVOID_STEERING * weight
        } else if self.sensors.left.is_obstacle_detected() {
            let weight = self.sensors.left.normalized_value();
            max_speed *= 1.0 - weight;
            SIDE_AVOID_STEERING * weight
        } else if pose.speed < -MOVING_SPEED {
            if cos_right < 0.0 { 1.0 } else { -1.0 }
        } else if pose.speed > MOVING_SPEED {
            // 1 when the target is dead right, 0 straight ahead.
            let steering = 1.0 - cos_right.clamp(-1.0, 1.0).acos() / FRAC_PI_2;
            self.sensors.aim_head(steering);
            steering
        } else {
            0.0
        };

        let delta_speed = max_speed - pose.speed;
        let throttle = if self.force_backward >= 0.0 {
            self.force_backward -= dt;
            REVERSE_THROTTLE
        } else if cos_forward < cfg.misalignment_cos {
            self.force_backward = cfg.reverse_commit_secs;
            REVERSE_THROTTLE
        } else if delta_speed > SPEED_TOLERANCE && speed_limit > cfg.brake_limit && !need_brake {
            delta_speed.min(1.0) * cfg.throttle_gain
        } else if delta_speed < -SPEED_TOLERANCE && !need_brake {
            delta_speed.max(-1.0) * cfg.throttle_gain
        } else {
            0.0
        };

        trace!(
            agent = %self.agent,
            throttle,
            steering,
            need_brake,
            speed_limit,
            "drive command"
        );
        DriveCommand { throttle, steering, hand_brake: need_brake, turn_signal: self.signal }
    }

    // ── Path management ───────────────────────────────────────────────────

    /// Move on to the next path node, extending the path past `end_port`
    /// when it runs low.  Returns `false` when the path is exhausted and
    /// `end_port` has no partner.
    pub fn update_path_target<P: CollisionProbe + ?Sized>(
        &mut self,
        net: &RoadNetwork,
        pose: &VehiclePose,
        probe: &mut P,
    ) -> bool {
        let mut next_lane = self.lane;

        if let Some(start) = net.connected_port(self.end_port) {
            let start_port = net.port(start).cloned();
            let current_segment = net.node(self.next_node).segment;

            // Look ahead on straight roads so the queue never drains mid-segment.
            if !net.segment(current_segment).has_cross() {
                let to_end = net.node(self.next_node).length_on_segment(!self.invert);
                if to_end < self.config.lookahead && net.node(self.end_port).segment == current_segment {
                    let before = self.path.len();
                    let kind = net.append_path(start, self.rng.inner(), &mut self.path);
                    if let Some(p) = &start_port {
                        match kind {
                            TurnKind::Left => next_lane = p.min_right,
                            TurnKind::Right => next_lane = p.max_right,
                            TurnKind::None => {}
                        }
                    }
                    if kind != TurnKind::None {
                        self.signal = kind.into();
                    }
                    if self.path.len() > before {
                        self.end_port = self.path.pop_back().unwrap_or(self.end_port);
                    }
                    debug!(agent = %self.agent, port = %start, ?kind, "path extended ahead");
                }
            }

            // Drained, usually right after a crossing.
            if self.path.is_empty() {
                net.append_path(start, self.rng.inner(), &mut self.path);
                if let Some(p) = &start_port {
                    next_lane = match net.turn_kind(self.next_node) {
                        TurnKind::Left => p.min_right,
                        TurnKind::Right => {
                            let old_end = net.port(self.end_port).map_or(p.max_right, |e| e.max_left);
                            old_end.max(p.max_right)
                        }
                        TurnKind::None => net.random_right_lane(start, self.lane, self.rng.inner()),
                    };
                }
                self.signal = TurnSignal::None;
                self.lane = next_lane;
                if let Some(last) = self.path.pop_back() {
                    self.end_port = last;
                }
                debug!(agent = %self.agent, port = %start, lane = self.lane, "path refilled");
            }
        }

        let Some(&head) = self.path.front() else {
            return false;
        };

        self.prev_node = self.next_node;
        let head_node = net.node(head);
        if head_node.is_port() {
            self.invert = head_node.is_terminal();
        }

        if next_lane < self.lane && self.can_switch_left(net, pose, probe) {
            self.switch_lane(net, pose, next_lane, self.config.lane_change_distance);
        } else if next_lane > self.lane && self.can_switch_right(net, pose, probe) {
            self.switch_lane(net, pose, next_lane, self.config.lane_change_distance);
        } else {
            self.path.pop_front();
            self.next_node = head;
            if let Some(&port) = net.collect_ports(head_node.segment, self.invert).first() {
                self.in_port = port;
            }
            self.current_target = net.compute_target(head, self.lane, self.invert);
            self.state = NavState::Cruising;
        }
        true
    }

    /// Steer for a point `forward_distance` ahead along the current segment
    /// in `target_lane`.
    pub fn switch_lane(
        &mut self,
        net: &RoadNetwork,
        pose: &VehiclePose,
        target_lane: i32,
        forward_distance: f32,
    ) {
        let segment_id = net.node(self.next_node).segment;
        let segment = net.segment(segment_id);
        let current = net.length_on_segment_at(segment_id, pose.position, self.invert);
        let target_length = (current + forward_distance).min(segment.length);

        let nodes = net.collect_nodes(segment_id, self.invert);
        if let Some(&first) = nodes.first() {
            self.in_port = first;
        }
        for id in nodes {
            self.prev_node = self.next_node;
            self.next_node = id;
            self.path.retain(|&n| n != id);
            let node_length = net.node(id).length_on_segment(self.invert);
            if node_length > target_length {
                let offset = target_length - node_length;
                self.current_target = net.compute_target(id, target_lane, self.invert)
                    + net.node(self.prev_node).head_vector(self.invert, offset);
                break;
            }
        }

        debug!(agent = %self.agent, from = self.lane, to = target_lane, "switching lane");
        self.lane = target_lane;
        self.state = NavState::LaneSwitching;
    }

    /// `true` if the lane to the left exists at the current entry port and
    /// the lane probe sees it clear well past the obstacle ahead.
    pub fn can_switch_left<P: CollisionProbe + ?Sized>(
        &mut self,
        net: &RoadNetwork,
        pose: &VehiclePose,
        probe: &mut P,
    ) -> bool {
        match net.port(self.in_port) {
            Some(p) if self.lane > p.min_right => self.probe_lane(-self.config.lane_probe_offset, pose, probe),
            _ => false,
        }
    }

    /// Mirror of [`can_switch_left`](Self::can_switch_left).
    pub fn can_switch_right<P: CollisionProbe + ?Sized>(
        &mut self,
        net: &RoadNetwork,
        pose: &VehiclePose,
        probe: &mut P,
    ) -> bool {
        match net.port(self.in_port) {
            Some(p) if self.lane < p.max_right => self.probe_lane(self.config.lane_probe_offset, pose, probe),
            _ => false,
        }
    }

    fn probe_lane<P: CollisionProbe + ?Sized>(&mut self, side: f32, pose: &VehiclePose, probe: &mut P) -> bool {
        self.sensors.lane.spec.offset.y = side;
        self.sensors.lane.sweep(pose, probe);
        self.sensors.lane.nearest_distance()
            > self.sensors.head.nearest_distance() + self.config.lane_change_margin
    }
}
