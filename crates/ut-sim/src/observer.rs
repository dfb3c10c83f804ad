//! Traffic observer trait for progress reporting and data collection.

use ut_core::{AgentId, NodeId, Tick};

/// Why a vehicle left the registry.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RemovalReason {
    /// Its last node dropped out of the spawn volume.
    OutOfVolume,
    /// Its controller ran out of road.
    PathExhausted,
    /// The host no longer reports a pose for it.
    Vanished,
    /// The road network was replaced.
    Rebuild,
}

/// Callbacks invoked by [`TrafficManager`][crate::TrafficManager].
///
/// All methods have default no-op implementations so implementors only need
/// to override what they care about.
///
/// # Example: population counter
///
/// ```rust,ignore
/// struct Census { live: usize }
///
/// impl TrafficObserver for Census {
///     fn on_vehicle_spawned(&mut self, _: AgentId, _: NodeId) { self.live += 1; }
///     fn on_vehicle_removed(&mut self, _: AgentId, _: RemovalReason) { self.live -= 1; }
/// }
/// ```
pub trait TrafficObserver {
    /// Called after each population refresh.
    ///
    /// `volume` is the number of nodes in the spawn volume, `vehicles` the
    /// population after spawning.
    fn on_control_tick(&mut self, _tick: Tick, _volume: usize, _vehicles: usize) {}

    /// Called once a spawned vehicle has a bound controller.
    fn on_vehicle_spawned(&mut self, _agent: AgentId, _node: NodeId) {}

    /// Called after a vehicle was dropped from the registry.
    fn on_vehicle_removed(&mut self, _agent: AgentId, _reason: RemovalReason) {}
}

/// A [`TrafficObserver`] that does nothing.
pub struct NoopObserver;

impl TrafficObserver for NoopObserver {}
