//! `ut-sim`: spawn volume and population control for the urban_traffic
//! workspace.
//!
//! # Control loop
//!
//! ```text
//! begin()                     initial fill around the reference vehicle
//! every step(dt):
//!   ① Control tick - every control_interval_secs of physics time:
//!                    recompute the spawn volume when the reference moved
//!                    to a new node, cull vehicles outside it, spawn up to
//!                    capacity.
//!   ② Drive        - each vehicle in ascending AgentId order:
//!                    host pose → Autopilot::advance → host command.
//!                    Vehicles whose path ran out are removed.
//! rebuild(network)            drop everything and refill on a new graph
//! ```
//!
//! # Cargo features
//!
//! | Feature  | Effect                                                  |
//! |----------|---------------------------------------------------------|
//! | `fx-hash`| FxHash instead of SipHash for the spawn-volume map.     |
//! | `serde`  | Propagates serde derives to the `ut-*` dependencies.    |
//!
//! # Quick-start
//!
//! ```rust,ignore
//! use ut_road::RoadGraphCompiler;
//! use ut_sim::{NoopObserver, TrafficManagerBuilder};
//!
//! let mut compiler = RoadGraphCompiler::new(config.road.clone());
//! compiler.read_file(Path::new("roads.csv"))?;
//! let (network, _) = compiler.compile();
//! let mut traffic = TrafficManagerBuilder::new(config, host).network(network).build()?;
//! traffic.begin(&mut NoopObserver);
//! loop {
//!     traffic.step(1.0 / 60.0, &mut NoopObserver);
//! }
//! ```

pub mod builder;
pub mod error;
pub mod host;
pub mod manager;
pub mod observer;
pub mod spawn;

#[cfg(test)]
mod tests;

pub use builder::TrafficManagerBuilder;
pub use error::{SimError, SimResult};
pub use host::{HostProbe, TrafficHost};
pub use manager::TrafficManager;
pub use observer::{NoopObserver, RemovalReason, TrafficObserver};
pub use spawn::SpawnVolume;
