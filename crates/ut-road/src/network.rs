//! Compiled road network and its node-level queries.
//!
//! # Data layout
//!
//! Nodes, segments and turns live in three flat arenas indexed by their
//! typed ids.  Cross-references between them (a node's segment, a port's
//! partner, a guide's turn) are ids, never pointers, so the whole graph is
//! dropped and rebuilt in one piece on every compile.
//!
//! # Spatial index
//!
//! An R-tree (via `rstar`) over the XY positions of every record node maps a
//! world position to the nearest node.  Guide nodes are not indexed.

use std::collections::VecDeque;

use rand::Rng;
use rstar::{PointDistance, RTree, RTreeObject, AABB};
use tracing::debug;

use ut_core::{NodeId, RoadConfig, SegmentId, TurnId, Vec3};

use crate::node::{Node, NodeKind, PortData, TurnKind};
use crate::segment::Segment;
use crate::turn::Turn;

// ── R-tree node entry ─────────────────────────────────────────────────────────

#[derive(Clone)]
struct NodeEntry {
    point: [f32; 2], // [x, y]
    z: f32,
    id: NodeId,
}

impl RTreeObject for NodeEntry {
    type Envelope = AABB<[f32; 2]>;
    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point)
    }
}

impl PointDistance for NodeEntry {
    /// Squared distance in the XY plane.
    fn distance_2(&self, point: &[f32; 2]) -> f32 {
        let dx = self.point[0] - point[0];
        let dy = self.point[1] - point[1];
        dx * dx + dy * dy
    }
}

// ── RoadNetwork ───────────────────────────────────────────────────────────────

/// Road graph produced by [`RoadGraphCompiler`](crate::RoadGraphCompiler).
///
/// Read-only once compiled.  Ids from one network are meaningless in another.
pub struct RoadNetwork {
    pub(crate) nodes: Vec<Node>,
    pub(crate) segments: Vec<Segment>,
    pub(crate) turns: Vec<Turn>,
    /// Every port, in compile order.
    pub(crate) ports: Vec<NodeId>,
    pub(crate) floor_tolerance: f32,
    spatial_idx: RTree<NodeEntry>,
}

impl RoadNetwork {
    pub(crate) fn new(floor_tolerance: f32) -> Self {
        Self {
            nodes: Vec::new(),
            segments: Vec::new(),
            turns: Vec::new(),
            ports: Vec::new(),
            floor_tolerance,
            spatial_idx: RTree::new(),
        }
    }

    /// A network with no roads.  Every spatial query returns `None`.
    pub fn empty() -> Self {
        Self::new(RoadConfig::default().floor_tolerance)
    }

    // ── Arena access ──────────────────────────────────────────────────────

    #[inline]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    #[inline]
    pub fn get_node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    #[inline]
    pub fn segment(&self, id: SegmentId) -> &Segment {
        &self.segments[id.index()]
    }

    #[inline]
    pub fn turn(&self, id: TurnId) -> &Turn {
        &self.turns[id.index()]
    }

    /// Segment owning `node`.
    #[inline]
    pub fn segment_of(&self, node: NodeId) -> &Segment {
        self.segment(self.node(node).segment)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    pub fn turn_count(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterator over `(id, node)` pairs, guides included.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> + '_ {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i as u32), n))
    }

    pub fn segment_ids(&self) -> impl Iterator<Item = SegmentId> + '_ {
        (0..self.segments.len()).map(|i| SegmentId(i as u32))
    }

    /// Every port of the network.
    pub fn ports(&self) -> &[NodeId] {
        &self.ports
    }

    // ── Node queries ──────────────────────────────────────────────────────

    #[inline]
    pub fn port(&self, id: NodeId) -> Option<&PortData> {
        self.get_node(id).and_then(Node::port)
    }

    /// Partner port in another segment, if `id` is a connected port.
    #[inline]
    pub fn connected_port(&self, id: NodeId) -> Option<NodeId> {
        self.port(id).and_then(|p| p.connected)
    }

    /// Turn classification of `id`: the owning turn's kind for guide nodes,
    /// `None` for every other node.
    pub fn turn_kind(&self, id: NodeId) -> TurnKind {
        match &self.node(id).kind {
            NodeKind::Guide(g) => self.turn(g.turn).kind,
            _ => TurnKind::None,
        }
    }

    /// Turns usable when entering the crossing `cross` at `port`.
    pub fn turns_from(&self, cross: NodeId, port: NodeId) -> &[TurnId] {
        match &self.node(cross).kind {
            NodeKind::Cross(data) => data.turns_from(port),
            _ => &[],
        }
    }

    /// Lane centre at `port` in the given travel direction.
    pub(crate) fn port_target(&self, port: NodeId, lane: i32, invert: bool) -> Vec3 {
        let node = self.node(port);
        let width = node.port().map_or(0.0, |p| p.lane_width);
        node.position + node.hand_vector(invert, (lane as f32 + 0.5) * width)
    }

    /// World position a vehicle in `lane` should steer for at `id`.
    ///
    /// | Kind   | Target                                                    |
    /// |--------|-----------------------------------------------------------|
    /// | Port   | lane centre using the port's own lane width               |
    /// | Normal | lane centre using the segment's first entry port's width  |
    /// | Cross  | the node position                                         |
    /// | Guide  | `lane` widths to the right of the entry port's heading    |
    pub fn compute_target(&self, id: NodeId, lane: i32, invert: bool) -> Vec3 {
        let node = self.node(id);
        match &node.kind {
            NodeKind::Port(_) => self.port_target(id, lane, invert),
            NodeKind::Normal => {
                let width = self
                    .entry_ports(node.segment)
                    .first()
                    .and_then(|&p| self.port(p))
                    .map_or(0.0, |p| p.lane_width);
                node.position + node.hand_vector(invert, (lane as f32 + 0.5) * width)
            }
            NodeKind::Cross(_) => node.position,
            NodeKind::Guide(g) => {
                let entry = self.node(g.entry);
                let width = entry.port().map_or(0.0, |p| p.lane_width);
                node.position + entry.hand_vector(false, lane as f32 * width)
            }
        }
    }

    // ── Spatial queries ───────────────────────────────────────────────────

    /// Nearest record node to `pos` by XY distance.
    ///
    /// Nodes within the floor tolerance vertically win over closer nodes on
    /// another level; if no node is on the same level the plain XY nearest is
    /// returned.  `None` only for an empty network.
    pub fn nearest_node(&self, pos: Vec3) -> Option<NodeId> {
        let query = [pos.x, pos.y];
        self.spatial_idx
            .nearest_neighbor_iter(&query)
            .find(|e| (e.z - pos.z).abs() < self.floor_tolerance)
            .or_else(|| self.spatial_idx.nearest_neighbor(&query))
            .map(|e| e.id)
    }

    pub(crate) fn build_index(&mut self) {
        let entries: Vec<NodeEntry> = self
            .nodes()
            .filter(|(_, n)| !matches!(n.kind, NodeKind::Guide(_)))
            .map(|(id, n)| NodeEntry { point: [n.position.x, n.position.y], z: n.position.z, id })
            .collect();
        self.spatial_idx = RTree::bulk_load(entries);
    }

    // ── Port operations ───────────────────────────────────────────────────

    /// Append the path that starts at `port` to `path`.
    ///
    /// In a crossing segment a random turn from `port` is taken and its
    /// `[entry, guides…, exit]` nodes are appended; otherwise the whole
    /// segment is appended in the port's travel direction.  Returns the turn
    /// kind taken.  A crossing with no turn from `port` appends nothing.
    pub fn append_path<R: Rng + ?Sized>(
        &self,
        port: NodeId,
        rng: &mut R,
        path: &mut VecDeque<NodeId>,
    ) -> TurnKind {
        let node = self.node(port);
        let segment = self.segment(node.segment);
        match segment.cross {
            Some(cross) => {
                let turns = self.turns_from(cross, port);
                if turns.is_empty() {
                    debug!(%port, "crossing has no turn from this port");
                    return TurnKind::None;
                }
                let turn = self.turn(turns[rng.gen_range(0..turns.len())]);
                path.extend(turn.collect_nodes());
                turn.kind
            }
            None => {
                path.extend(self.collect_nodes(node.segment, node.is_terminal()));
                TurnKind::None
            }
        }
    }

    /// Keep `lane` if it is a right lane of `port`, otherwise pick one at
    /// random.  Ports without right lanes return their `min_right`.
    pub fn random_right_lane<R: Rng + ?Sized>(&self, port: NodeId, lane: i32, rng: &mut R) -> i32 {
        match self.port(port) {
            Some(p) if p.has_right_lane(lane) => lane,
            Some(p) if p.max_right >= p.min_right => rng.gen_range(p.min_right..=p.max_right),
            Some(p) => p.min_right,
            None => lane,
        }
    }

    /// Pair up ports of different segments lying within `distance` of each
    /// other.  Returns `(connections, dead_ends)`.
    ///
    /// Ports are taken in compile order; each one binds to the first
    /// remaining port in range.
    pub(crate) fn connect_ports(&mut self, distance: f32) -> (usize, usize) {
        let mut pending: VecDeque<NodeId> = self.ports.iter().copied().collect();
        let mut connections = 0;
        let mut dead_ends = 0;

        while let Some(a) = pending.pop_front() {
            let (pos, segment) = (self.node(a).position, self.node(a).segment);
            let found = pending.iter().position(|&b| {
                let other = self.node(b);
                other.segment != segment && other.position.distance(pos) < distance
            });
            match found.and_then(|i| pending.remove(i)) {
                Some(b) => {
                    self.connect_pair(a, b);
                    connections += 1;
                }
                None => dead_ends += 1,
            }
        }
        (connections, dead_ends)
    }

    fn connect_pair(&mut self, a: NodeId, b: NodeId) {
        let limit = self.node(a).speed_limit.min(self.node(b).speed_limit);
        for (this, other) in [(a, b), (b, a)] {
            let node = &mut self.nodes[this.index()];
            node.speed_limit = limit;
            if let Some(p) = node.port_mut() {
                p.connected = Some(other);
            }
        }
        self.align_with(a, b);
        self.align_with(b, a);
    }

    /// Overwrite the outward head and hand vectors of `this` with the
    /// matching vectors of its partner.
    fn align_with(&mut self, this: NodeId, other: NodeId) {
        let o = self.node(other);
        let (head, hand) = if o.is_terminal() {
            (o.backward, o.left)
        } else {
            (o.forward, o.right)
        };
        let node = &mut self.nodes[this.index()];
        if node.is_terminal() {
            node.forward = head;
            node.right = hand;
        } else {
            node.backward = head;
            node.left = hand;
        }
    }
}
