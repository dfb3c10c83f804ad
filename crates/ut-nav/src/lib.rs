//! `ut-nav`: obstacle sensors and the per-vehicle navigation controller.
//!
//! # Crate layout
//!
//! | Module         | Contents                                                    |
//! |----------------|-------------------------------------------------------------|
//! | [`vehicle`]    | `VehiclePose`, `VehicleBody`, `DriveCommand`, `TickOutcome` |
//! | [`sensor`]     | `CollisionProbe` trait, `Sensor`, `SensorRig`               |
//! | [`controller`] | `NavigationController`, `NavState`                          |
//! | [`autopilot`]  | `Autopilot` capability trait                                |
//! | [`error`]      | `NavError`, `NavResult<T>`                                  |
//!
//! # Design notes
//!
//! A controller owns its sensors, path window and RNG.  The road network is
//! only ever borrowed read-only, and the host world is reached through the
//! `CollisionProbe` passed into each tick, so controllers hold no references
//! and can be stored in any collection.
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                        |
//! |---------|---------------------------------------------------------------|
//! | `serde` | Derives `Serialize`/`Deserialize` on pose and command types.  |

pub mod autopilot;
pub mod controller;
pub mod error;
pub mod sensor;
pub mod vehicle;


pub use autopilot::Autopilot;
pub use controller::{absolute_lane, NavState, NavigationController};
pub use error::{NavError, NavResult};
pub use sensor::{CollisionProbe, OpenRoad, Sensor, SensorRig, SensorSpec};
pub use vehicle::{DriveCommand, Placement, TickOutcome, TurnSignal, VehicleBody, VehiclePose};
