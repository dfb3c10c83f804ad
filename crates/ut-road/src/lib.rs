//! `ut-road`: road graph model, record compiler, and spatial lookup.
//!
//! # Crate layout
//!
//! | Module       | Contents                                                   |
//! |--------------|------------------------------------------------------------|
//! | [`node`]     | `Node`, `NodeKind`, `PortData`, `CrossData`, `TurnKind`    |
//! | [`segment`]  | `Segment`, per-segment compile passes and queries          |
//! | [`turn`]     | `Turn` and guide-node construction                         |
//! | [`network`]  | `RoadNetwork` arenas, R-tree lookup, port operations       |
//! | [`record`]   | record line format, `NodeRecord`                           |
//! | [`compiler`] | `RoadGraphCompiler`, `CompileReport`                       |
//! | [`error`]    | `RoadError`, `RecordError`, `RoadResult<T>`                |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                       |
//! |---------|--------------------------------------------------------------|
//! | `serde` | Derives `Serialize`/`Deserialize` on `TurnKind` and ids.     |

pub mod compiler;
pub mod error;
pub mod network;
pub mod node;
pub mod record;
pub mod segment;
pub mod turn;


pub use compiler::{CompileReport, RoadGraphCompiler};
pub use error::{RecordError, RecordErrorKind, RoadError, RoadResult};
pub use network::RoadNetwork;
pub use node::{CrossData, GuideData, Node, NodeKind, PortData, TurnKind};
pub use record::{NodeRecord, RecordKind};
pub use segment::Segment;
pub use turn::Turn;
