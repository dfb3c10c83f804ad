//! Vehicle-side types exchanged with the host: pose in, command out.

use ut_core::geo::right_of;
use ut_core::{NodeId, Vec3};
use ut_road::TurnKind;

/// Live state of a vehicle as reported by the host each tick.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VehiclePose {
    pub position: Vec3,
    /// Unit heading.  Only its XY part matters for steering.
    pub forward: Vec3,
    /// Signed forward speed; negative while reversing.  Same unit as
    /// `NavConfig::max_speed`.
    pub speed: f32,
}

impl VehiclePose {
    pub fn new(position: Vec3, forward: Vec3, speed: f32) -> Self {
        Self { position, forward, speed }
    }

    #[inline]
    pub fn right(&self) -> Vec3 {
        right_of(self.forward).normalize_or_zero()
    }

    /// Body-frame offset (x forward, y right, z up) to world space.
    #[inline]
    pub fn to_world(&self, local: Vec3) -> Vec3 {
        self.position + self.forward * local.x + self.right() * local.y + Vec3::Z * local.z
    }
}

/// Collision box of a vehicle body, relative to its origin.  Sensor mounts
/// are derived from it.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VehicleBody {
    pub center: Vec3,
    /// Half size along each axis.
    pub extent: Vec3,
}

impl Default for VehicleBody {
    fn default() -> Self {
        Self { center: Vec3::ZERO, extent: Vec3::new(230.0, 95.0, 75.0) }
    }
}

/// Where and how a new vehicle is placed.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Placement {
    /// Graph node the vehicle starts at.
    pub node: NodeId,
    pub pose: VehiclePose,
    pub body: VehicleBody,
}

// ── Commands ──────────────────────────────────────────────────────────────────

/// Turn indicator requested by the controller.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TurnSignal {
    #[default]
    None,
    Left,
    Right,
}

impl From<TurnKind> for TurnSignal {
    fn from(kind: TurnKind) -> Self {
        match kind {
            TurnKind::None => TurnSignal::None,
            TurnKind::Left => TurnSignal::Left,
            TurnKind::Right => TurnSignal::Right,
        }
    }
}

/// Actuator inputs for one tick.
#[derive(Copy, Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DriveCommand {
    /// `[-1, 1]`; negative drives backward.
    pub throttle: f32,
    /// `[-1, 1]`; positive steers right.
    pub steering: f32,
    pub hand_brake: bool,
    pub turn_signal: TurnSignal,
}

impl DriveCommand {
    /// Zero throttle and steering, brake released.
    pub fn idle(turn_signal: TurnSignal) -> Self {
        Self { turn_signal, ..Self::default() }
    }
}

/// Result of one controller tick.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum TickOutcome {
    Drive(DriveCommand),
    /// The path ran out with no successor.  The host removes the vehicle.
    Terminated,
}

impl TickOutcome {
    pub fn command(&self) -> Option<&DriveCommand> {
        match self {
            TickOutcome::Drive(cmd) => Some(cmd),
            TickOutcome::Terminated => None,
        }
    }
}
