//! Road nodes.
//!
//! Every node shares one core struct; the variant-specific payload lives in
//! [`NodeKind`].  Nodes are owned by the [`RoadNetwork`](crate::RoadNetwork)
//! arena and refer to each other by `NodeId` only.

use ut_core::{NodeId, SegmentId, TurnId, Vec3};

// ── TurnKind ──────────────────────────────────────────────────────────────────

/// Classification of a path through a crossing.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TurnKind {
    /// Straight through, or not a turn at all.
    #[default]
    None,
    Left,
    Right,
}

// ── Variant payloads ──────────────────────────────────────────────────────────

/// Segment endpoint carrying lane information.
///
/// Right lanes run in the port's head direction, left lanes against it.
/// Lane indices are signed: with no left lanes the right lanes are centred
/// on the road axis, otherwise they start at 0 next to the axis.
#[derive(Clone, Debug, PartialEq)]
pub struct PortData {
    pub lane_width: f32,
    pub num_rights: u32,
    pub num_lefts: u32,
    pub min_right: i32,
    pub max_right: i32,
    pub min_left: i32,
    pub max_left: i32,
    /// Port of another segment this one is joined to.  Symmetric.
    pub connected: Option<NodeId>,
}

impl PortData {
    pub fn new(lane_width: f32, num_rights: u32, num_lefts: u32) -> Self {
        let rights = i32::try_from(num_rights).unwrap_or(i32::MAX);
        let lefts = i32::try_from(num_lefts).unwrap_or(i32::MAX);
        let min_right = if lefts > 0 { 0 } else { -(rights >> 1) };
        let min_left = if rights > 0 { 0 } else { -(lefts >> 1) };
        Self {
            lane_width,
            num_rights,
            num_lefts,
            min_right,
            max_right: min_right.saturating_add(rights) - 1,
            min_left,
            max_left: min_left.saturating_add(lefts) - 1,
            connected: None,
        }
    }

    /// `true` if `lane` is a valid right-lane index.
    #[inline]
    pub fn has_right_lane(&self, lane: i32) -> bool {
        lane >= self.min_right && lane <= self.max_right
    }

    #[inline]
    pub fn lane_count(&self) -> u32 {
        self.num_rights.saturating_add(self.num_lefts)
    }
}

/// Crossing payload: the turns available from each entry port.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CrossData {
    pub turns: Vec<(NodeId, Vec<TurnId>)>,
}

impl CrossData {
    /// Turns usable when entering the crossing at `port`.
    pub fn turns_from(&self, port: NodeId) -> &[TurnId] {
        self.turns
            .iter()
            .find(|(p, _)| *p == port)
            .map(|(_, t)| t.as_slice())
            .unwrap_or(&[])
    }
}

/// Intermediate waypoint of a curved turn.
#[derive(Clone, Debug, PartialEq)]
pub struct GuideData {
    pub turn: TurnId,
    /// Entry port of the owning turn; lane offsets are measured from it.
    pub entry: NodeId,
}

#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    Port(PortData),
    Normal,
    Cross(CrossData),
    Guide(GuideData),
}

// ── Node ──────────────────────────────────────────────────────────────────────

/// A single road node.
///
/// Direction vectors are unit length once the owning segment is compiled.
/// `forward`/`right` point towards the next node in record order,
/// `backward`/`left` towards the previous one.
#[derive(Clone, Debug)]
pub struct Node {
    pub position: Vec3,
    /// Index of the following node in the segment's record order, or a
    /// negative value for the last node.
    pub next_index: i32,
    /// Fraction of the vehicle's maximum speed allowed here, in `[0, 1]`.
    pub speed_limit: f32,
    pub segment: SegmentId,
    /// Linked nodes and their distance.  Keys are unique.
    pub adjacency: Vec<(NodeId, f32)>,

    pub forward: Vec3,
    pub backward: Vec3,
    pub right: Vec3,
    pub left: Vec3,
    pub length_forward: f32,
    pub length_backward: f32,
    pub distance_to_start: f32,
    pub distance_to_end: f32,

    pub kind: NodeKind,
}

impl Node {
    pub(crate) fn new(position: Vec3, next_index: i32, segment: SegmentId, kind: NodeKind) -> Self {
        Self {
            position,
            next_index,
            speed_limit: 1.0,
            segment,
            adjacency: Vec::new(),
            forward: Vec3::ZERO,
            backward: Vec3::ZERO,
            right: Vec3::ZERO,
            left: Vec3::ZERO,
            length_forward: 0.0,
            length_backward: 0.0,
            distance_to_start: 0.0,
            distance_to_end: 0.0,
            kind,
        }
    }

    // ── Kind helpers ──────────────────────────────────────────────────────

    #[inline]
    pub fn is_port(&self) -> bool {
        matches!(self.kind, NodeKind::Port(_))
    }

    #[inline]
    pub fn is_normal(&self) -> bool {
        matches!(self.kind, NodeKind::Normal)
    }

    #[inline]
    pub fn is_cross(&self) -> bool {
        matches!(self.kind, NodeKind::Cross(_))
    }

    #[inline]
    pub fn port(&self) -> Option<&PortData> {
        match &self.kind {
            NodeKind::Port(p) => Some(p),
            _ => None,
        }
    }

    #[inline]
    pub(crate) fn port_mut(&mut self) -> Option<&mut PortData> {
        match &mut self.kind {
            NodeKind::Port(p) => Some(p),
            _ => None,
        }
    }

    /// `true` for the last node of its segment's record order.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.next_index < 0
    }

    // ── Geometry ──────────────────────────────────────────────────────────

    /// Travel direction, scaled.  `invert` selects the opposite direction.
    #[inline]
    pub fn head_vector(&self, invert: bool, scale: f32) -> Vec3 {
        (if invert { self.backward } else { self.forward }) * scale
    }

    /// Right-hand side of the travel direction, scaled.
    #[inline]
    pub fn hand_vector(&self, invert: bool, scale: f32) -> Vec3 {
        (if invert { self.left } else { self.right }) * scale
    }

    /// Distance from the segment start (or end when `invert`) to this node.
    #[inline]
    pub fn length_on_segment(&self, invert: bool) -> f32 {
        if invert { self.distance_to_end } else { self.distance_to_start }
    }

    /// Length of the link leaving this node in the given direction.
    #[inline]
    pub fn node_length(&self, invert: bool) -> f32 {
        if invert { self.length_backward } else { self.length_forward }
    }

    /// `true` if either end of the segment is closer than `threshold`.
    #[inline]
    pub fn is_near_any_port(&self, threshold: f32) -> bool {
        self.distance_to_start < threshold || self.distance_to_end < threshold
    }

    /// Project `point` onto the road axis through this node: forward first,
    /// backward if the point lies behind.
    pub fn nearest_point_on_vectors(&self, point: Vec3) -> Vec3 {
        let offset = point - self.position;
        let mut dir = self.forward;
        let mut dot = offset.dot(dir);
        if dot < 0.0 {
            dir = self.backward;
            dot = offset.dot(dir);
        }
        self.position + dir * dot
    }

    pub(crate) fn link(&mut self, other: NodeId, distance: f32) {
        if let Some(entry) = self.adjacency.iter_mut().find(|(id, _)| *id == other) {
            entry.1 = distance;
        } else {
            self.adjacency.push((other, distance));
        }
    }
}
