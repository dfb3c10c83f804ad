//! Road segments and the per-segment compile passes.
//!
//! # Compile passes
//!
//! ```text
//! ① link        - forward/backward vectors, link lengths, adjacency
//! ② per kind    - port end vectors, normal bend limits, then crossing turns
//! ③ propagate   - slow nodes lower the limits of their neighbours
//! ④ cumulative  - distance_to_start / distance_to_end
//! ```
//!
//! Turns are built after every port of the segment has its vectors, so the
//! turn geometry never reads a half-compiled port.

use ut_core::geo::{map_range_clamped, right_of};
use ut_core::{NodeId, RoadConfig, SegmentId, Vec3};

use crate::node::{CrossData, Node, NodeKind, PortData};
use crate::record::{NodeRecord, RecordKind};
use crate::turn::build_turn;
use crate::RoadNetwork;

// ── Segment ───────────────────────────────────────────────────────────────────

/// One `break`-terminated run of nodes.
#[derive(Clone, Debug, Default)]
pub struct Segment {
    /// Nodes in record order.
    pub nodes: Vec<NodeId>,
    /// Ports in record order.
    pub ports: Vec<NodeId>,
    pub cross: Option<NodeId>,
    /// Sum of every node's forward link length.
    pub length: f32,
}

impl Segment {
    #[inline]
    pub fn has_cross(&self) -> bool {
        self.cross.is_some()
    }
}

// ── Segment queries ───────────────────────────────────────────────────────────

impl RoadNetwork {
    /// Nodes of `segment` in travel order.
    pub fn collect_nodes(&self, segment: SegmentId, invert: bool) -> Vec<NodeId> {
        let mut nodes = self.segment(segment).nodes.clone();
        if invert {
            nodes.reverse();
        }
        nodes
    }

    /// Ports of `segment` in travel order.
    pub fn collect_ports(&self, segment: SegmentId, invert: bool) -> Vec<NodeId> {
        let mut ports = self.segment(segment).ports.clone();
        if invert {
            ports.reverse();
        }
        ports
    }

    /// Ports of `segment` that have at least one right lane.
    pub fn entry_ports(&self, segment: SegmentId) -> Vec<NodeId> {
        self.segment(segment)
            .ports
            .iter()
            .copied()
            .filter(|&p| self.port(p).is_some_and(|d| d.num_rights > 0))
            .collect()
    }

    /// Distance travelled along `segment` at world `position`, measured from
    /// the start (or the end when `invert`).
    ///
    /// Projects onto the axis of the nearest node: forward first (except at
    /// the last node), backward if the point lies behind (except at the
    /// first node), the node's own distance if both projections are behind.
    pub fn length_on_segment_at(&self, segment: SegmentId, position: Vec3, invert: bool) -> f32 {
        let seg = self.segment(segment);
        let nearest = seg.nodes.iter().copied().min_by(|&a, &b| {
            let da = self.node(a).position.distance_squared(position);
            let db = self.node(b).position.distance_squared(position);
            da.total_cmp(&db)
        });
        let Some(nearest) = nearest else {
            return 0.0;
        };

        let node = self.node(nearest);
        let node_length = node.length_on_segment(false);
        let offset = position - node.position;
        let mut dot = -1.0;
        let mut length = 0.0;
        if seg.nodes.last() != Some(&nearest) {
            dot = offset.dot(node.head_vector(false, 1.0));
            length = node_length + dot;
        }
        if dot < 0.0 && seg.nodes.first() != Some(&nearest) {
            dot = offset.dot(node.head_vector(true, 1.0));
            length = node_length - dot;
        }
        if dot < 0.0 {
            length = node_length;
        }

        if invert { seg.length - length } else { length }
    }

    /// Population target for a segment: `lane_density` vehicles per lane of
    /// its widest port.
    pub fn max_vehicles(&self, segment: SegmentId, lane_density: u32) -> u32 {
        let widest = self
            .segment(segment)
            .ports
            .iter()
            .filter_map(|&p| self.port(p))
            .map(PortData::lane_count)
            .max()
            .unwrap_or(0);
        lane_density.saturating_mul(widest)
    }
}

// ── Compilation ───────────────────────────────────────────────────────────────

/// Add one validated segment to `net` and run every per-segment pass.
pub(crate) fn compile_segment(
    net: &mut RoadNetwork,
    cfg: &RoadConfig,
    records: &[NodeRecord],
) -> SegmentId {
    let seg_id = SegmentId(net.segments.len() as u32);
    let mut segment = Segment::default();

    for rec in records {
        let id = NodeId(net.nodes.len() as u32);
        let kind = match rec.kind {
            RecordKind::Port => {
                segment.ports.push(id);
                NodeKind::Port(PortData::new(rec.lane_width, rec.num_rights, rec.num_lefts))
            }
            RecordKind::Normal => NodeKind::Normal,
            RecordKind::Cross => {
                segment.cross = Some(id);
                NodeKind::Cross(CrossData::default())
            }
        };
        let mut node = Node::new(rec.position, rec.next_index, seg_id, kind);
        if node.is_port() {
            node.speed_limit = cfg.port_speed_limit;
        }
        net.nodes.push(node);
        segment.nodes.push(id);
    }

    link_pass(net, &segment.nodes);
    kind_pass(net, cfg, &segment.nodes);
    segment.length = segment
        .nodes
        .iter()
        .map(|&id| net.node(id).length_forward)
        .sum();

    if let Some(cross) = segment.cross {
        let turns = build_turn_table(net, cfg, cross, &segment.ports);
        if let NodeKind::Cross(data) = &mut net.nodes[cross.index()].kind {
            data.turns = turns;
        }
    }

    propagate_speed_limits(net, cfg, &segment.nodes);
    cumulative_pass(net, &segment.nodes, segment.length);

    net.segments.push(segment);
    seg_id
}

fn link_pass(net: &mut RoadNetwork, ids: &[NodeId]) {
    for &id in ids {
        let next = net.node(id).next_index;
        if next < 0 {
            continue;
        }
        let next_id = ids[next as usize];
        let delta = net.node(next_id).position - net.node(id).position;
        let distance = delta.length();
        let dir = delta.normalize_or_zero();

        let node = &mut net.nodes[id.index()];
        node.forward = dir;
        node.length_forward = distance;
        node.link(next_id, distance);

        let next_node = &mut net.nodes[next_id.index()];
        next_node.backward = -dir;
        next_node.length_backward = distance;
        next_node.link(id, distance);
    }

    for &id in ids {
        let node = &mut net.nodes[id.index()];
        node.right = right_of(node.forward).normalize_or_zero();
        node.left = right_of(node.backward).normalize_or_zero();
    }
}

fn kind_pass(net: &mut RoadNetwork, cfg: &RoadConfig, ids: &[NodeId]) {
    for &id in ids {
        let node = &mut net.nodes[id.index()];
        match node.kind {
            // The outward side of an end port has no link; mirror the inner one.
            NodeKind::Port(_) => {
                if node.is_terminal() {
                    node.forward = -node.backward;
                    node.right = -node.left;
                } else {
                    node.backward = -node.forward;
                    node.left = -node.right;
                }
            }
            NodeKind::Normal => {
                let bend = node.forward.dot(node.backward);
                node.speed_limit = map_range_clamped(bend, cfg.bend_cosines, cfg.bend_limits);
            }
            NodeKind::Cross(_) | NodeKind::Guide(_) => {}
        }
    }
}

fn build_turn_table(
    net: &mut RoadNetwork,
    cfg: &RoadConfig,
    cross: NodeId,
    ports: &[NodeId],
) -> Vec<(NodeId, Vec<ut_core::TurnId>)> {
    let mut table = Vec::new();
    for &entry in ports {
        if net.port(entry).is_none_or(|p| p.num_rights == 0) {
            continue;
        }
        let mut turns = Vec::new();
        for &exit in ports {
            if exit == entry || net.port(exit).is_none_or(|p| p.num_lefts == 0) {
                continue;
            }
            turns.push(build_turn(net, cfg, entry, cross, exit));
        }
        table.push((entry, turns));
    }
    table
}

/// Spread every restriction over `recovery_horizon` in both directions.
///
/// The recovered limit grows by `link_length / horizon * (1 - limit)` per
/// link until it reaches 1; nodes on the way keep the lower of their own
/// limit and the recovered one.
fn propagate_speed_limits(net: &mut RoadNetwork, cfg: &RoadConfig, ids: &[NodeId]) {
    let n = ids.len();
    let inv = 1.0 / cfg.recovery_horizon;

    for i in 0..n {
        let (limit, next) = {
            let node = net.node(ids[i]);
            (node.speed_limit, node.next_index)
        };
        if limit > cfg.restriction_threshold {
            continue;
        }
        let base = 1.0 - limit;

        if next >= 0 {
            let mut cur_limit = limit;
            let mut cur = i;
            let mut k = next as usize;
            while k < n && cur_limit < 1.0 {
                cur_limit += net.node(ids[cur]).length_forward * inv * base;
                cur = k;
                k += 1;
                let node = &mut net.nodes[ids[cur].index()];
                if cur_limit < node.speed_limit {
                    node.speed_limit = cur_limit;
                }
            }
        }

        let mut cur_limit = limit;
        let mut cur = i;
        let mut k = if next < 0 { n as isize } else { next as isize } - 2;
        while k >= 0 && cur_limit < 1.0 {
            cur_limit += net.node(ids[cur]).length_backward * inv * base;
            cur = k as usize;
            k -= 1;
            let node = &mut net.nodes[ids[cur].index()];
            if cur_limit < node.speed_limit {
                node.speed_limit = cur_limit;
            }
        }
    }
}

fn cumulative_pass(net: &mut RoadNetwork, ids: &[NodeId], length: f32) {
    let mut from_start = 0.0;
    for &id in ids {
        let node = &mut net.nodes[id.index()];
        node.distance_to_start = from_start;
        node.distance_to_end = length - from_start;
        from_start += node.length_forward;
    }
}
