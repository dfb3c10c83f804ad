//! Turns through a crossing.

use ut_core::geo::{delta_yaw_deg, look_at_yaw_deg};
use ut_core::{NodeId, RoadConfig, TurnId};

use crate::node::{GuideData, Node, NodeKind, TurnKind};
use crate::RoadNetwork;

/// Path from an entry port through the cross node to an exit port of the
/// same segment.
#[derive(Clone, Debug, PartialEq)]
pub struct Turn {
    pub entry: NodeId,
    pub cross: NodeId,
    pub exit: NodeId,
    pub kind: TurnKind,
    /// Curve waypoints between entry and exit, 0 to 2 of them.
    pub guides: Vec<NodeId>,
}

impl Turn {
    /// `[entry, guides…, exit]`.
    pub fn collect_nodes(&self) -> Vec<NodeId> {
        let mut nodes = Vec::with_capacity(self.guides.len() + 2);
        nodes.push(self.entry);
        nodes.extend_from_slice(&self.guides);
        nodes.push(self.exit);
        nodes
    }
}

/// Classify the turn `entry → cross → exit` and add its guide nodes.
///
/// Right turns hug the outermost right lane of the entry and the outermost
/// left lane of the exit; left turns use the innermost lanes.  A guide is
/// placed on each arm that is longer than the curve cap, so only the last
/// `cap` units before and after the corner are cut.
pub(crate) fn build_turn(
    net: &mut RoadNetwork,
    cfg: &RoadConfig,
    entry: NodeId,
    cross: NodeId,
    exit: NodeId,
) -> TurnId {
    let turn_id = TurnId(net.turns.len() as u32);

    let entry_node = net.node(entry);
    let cross_node = net.node(cross);
    let exit_node = net.node(exit);

    let in_yaw = look_at_yaw_deg(entry_node.position, cross_node.position);
    let out_yaw = look_at_yaw_deg(cross_node.position, exit_node.position);
    let angle = delta_yaw_deg(in_yaw, out_yaw);

    let mut turn = Turn { entry, cross, exit, kind: TurnKind::None, guides: Vec::new() };

    let (Some(entry_port), Some(exit_port)) = (entry_node.port(), exit_node.port()) else {
        net.turns.push(turn);
        return turn_id;
    };

    if angle.abs() > cfg.turn_threshold_deg {
        let turn_right = angle > cfg.turn_threshold_deg;
        turn.kind = if turn_right { TurnKind::Right } else { TurnKind::Left };
        let (speed_limit, curve_cap, a_lane, b_lane) = if turn_right {
            (cfg.right_turn_speed_limit, cfg.right_curve_cap, entry_port.max_right, exit_port.max_left)
        } else {
            (cfg.left_turn_speed_limit, cfg.left_curve_cap, entry_port.min_right, exit_port.min_left)
        };
        let a_width = entry_port.lane_width;
        let b_width = exit_port.lane_width;

        let start = net.port_target(entry, a_lane, false);
        let end = net.port_target(exit, b_lane, true);
        let corner = cross_node.position
            + exit_node.head_vector(turn_right, (a_lane as f32 + 0.5) * a_width)
            + entry_node.head_vector(turn_right, (b_lane as f32 + 0.5) * b_width);

        let mut positions = Vec::with_capacity(2);
        if start.distance(end) > cfg.guide_min_span {
            let a_len = start.distance(corner);
            if a_len > curve_cap {
                positions.push(start + entry_node.head_vector(false, a_len - curve_cap));
            }
            let b_len = corner.distance(end);
            if b_len > curve_cap {
                positions.push(end + exit_node.head_vector(false, b_len - curve_cap));
            }
        }

        // Guides sit on lane 0; `compute_target` adds the lane offset back.
        let lane_shift = entry_node.hand_vector(false, -(a_lane as f32) * a_width);
        let (forward, right, segment) = (entry_node.forward, entry_node.right, entry_node.segment);

        for position in positions {
            let id = NodeId(net.nodes.len() as u32);
            let mut guide = Node::new(
                position + lane_shift,
                -1,
                segment,
                NodeKind::Guide(GuideData { turn: turn_id, entry }),
            );
            guide.speed_limit = speed_limit;
            guide.forward = forward;
            guide.backward = -forward;
            guide.right = right;
            guide.left = -right;
            net.nodes.push(guide);
            turn.guides.push(id);
        }
    }

    net.turns.push(turn);
    turn_id
}
