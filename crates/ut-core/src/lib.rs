//! `ut-core`: foundational types for the `urban_traffic` workspace.
//!
//! This crate is a dependency of every other `ut-*` crate.  It has no `ut-*`
//! dependencies and few external ones (`glam`, `rand`, `thiserror`, plus
//! optional `serde`).
//!
//! # What lives here
//!
//! | Module          | Contents                                              |
//! |-----------------|-------------------------------------------------------|
//! | [`ids`]         | `NodeId`, `SegmentId`, `TurnId`, `AgentId`            |
//! | [`geo`]         | `Vec3` re-export, `UP`, range mapping, yaw helpers    |
//! | [`time`]        | `Tick`, `SimClock` (fixed-interval control ticks)     |
//! | [`config`]      | `TrafficConfig` and its `Road`/`Spawn`/`Nav` sections |
//! | [`rng`]         | `AgentRng` (per-agent), `SimRng` (global)             |
//! | [`error`]       | `CoreError`, `CoreResult`                             |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                     |
//! |---------|------------------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to ids and config types.    |

pub mod config;
pub mod error;
pub mod geo;
pub mod ids;
pub mod rng;
pub mod time;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use config::{NavConfig, RoadConfig, SpawnConfig, TrafficConfig};
pub use error::{CoreError, CoreResult};
pub use geo::{UP, Vec3};
pub use ids::{AgentId, NodeId, SegmentId, TurnId};
pub use rng::{AgentRng, SimRng};
pub use time::{SimClock, Tick};
