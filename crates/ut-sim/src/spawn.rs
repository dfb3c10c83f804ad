//! Spawn volume: the part of the road graph around the reference vehicle
//! where traffic is kept alive.
//!
//! # Traversal
//!
//! Breadth-first from the origin at distance 0.  Expanding a node of a
//! crossing segment jumps from the crossing to the partners of all its ports
//! at no cost.  Expanding any other node follows its links, replacing a port
//! by its partner, and adds the link length; nodes at or past the cap are not
//! reached.  A node keeps the distance it was first reached with, even if a
//! shorter route turns up later.

use std::collections::VecDeque;

use ut_core::{NodeId, SpawnConfig};
use ut_road::RoadNetwork;

#[cfg(feature = "fx-hash")]
type DistanceMap = rustc_hash::FxHashMap<NodeId, f32>;
#[cfg(not(feature = "fx-hash"))]
type DistanceMap = std::collections::HashMap<NodeId, f32>;

/// Reachable nodes and their accumulated distance from `origin`.
#[derive(Clone, Debug, Default)]
pub struct SpawnVolume {
    origin: NodeId,
    distances: DistanceMap,
    /// Nodes in the order they were reached.
    order: Vec<NodeId>,
}

impl SpawnVolume {
    /// Run the traversal from `origin`.  An origin that is not a node of
    /// `net` gives an empty volume.
    pub fn compute(net: &RoadNetwork, origin: NodeId, cap: f32) -> Self {
        let mut volume = Self { origin, ..Self::default() };
        if net.get_node(origin).is_none() {
            return volume;
        }
        volume.reach(origin, 0.0);

        let mut queue = VecDeque::from([origin]);
        while let Some(id) = queue.pop_front() {
            let base = volume.distance(id).unwrap_or(0.0);
            let node = net.node(id);
            match net.segment(node.segment).cross {
                Some(cross) => {
                    for &(port, _) in &net.node(cross).adjacency {
                        let Some(partner) = net.connected_port(port) else {
                            continue;
                        };
                        if volume.reach(partner, base) {
                            queue.push_back(partner);
                        }
                    }
                }
                None => {
                    for &(next, edge) in &node.adjacency {
                        let next = if net.node(next).is_port() {
                            match net.connected_port(next) {
                                Some(partner) => partner,
                                None => continue,
                            }
                        } else {
                            next
                        };
                        let distance = base + edge;
                        if distance < cap && volume.reach(next, distance) {
                            queue.push_back(next);
                        }
                    }
                }
            }
        }
        volume
    }

    /// Record `id` at `distance` unless it was reached before.
    fn reach(&mut self, id: NodeId, distance: f32) -> bool {
        if self.distances.contains_key(&id) {
            return false;
        }
        self.distances.insert(id, distance);
        self.order.push(id);
        true
    }

    /// Origin node, `NodeId::INVALID` before the first computation.
    #[inline]
    pub fn origin(&self) -> NodeId {
        self.origin
    }

    #[inline]
    pub fn contains(&self, id: NodeId) -> bool {
        self.distances.contains_key(&id)
    }

    #[inline]
    pub fn distance(&self, id: NodeId) -> Option<f32> {
        self.distances.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Reached nodes in traversal order.
    pub fn nodes(&self) -> &[NodeId] {
        &self.order
    }

    /// Normal nodes clear of their segment's ports.  After the initial fill
    /// they must also lie past `near_origin_exclusion`, out of the
    /// reference vehicle's sight.
    pub fn spawnable_nodes(&self, net: &RoadNetwork, cfg: &SpawnConfig, initial: bool) -> Vec<NodeId> {
        self.order
            .iter()
            .copied()
            .filter(|&id| {
                let node = net.node(id);
                node.is_normal()
                    && !node.is_near_any_port(cfg.near_port_exclusion)
                    && (initial || self.distance(id).is_some_and(|d| d > cfg.near_origin_exclusion))
            })
            .collect()
    }
}
