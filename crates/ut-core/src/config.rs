//! Traffic configuration.
//!
//! Every tunable of the compiler, the spawn manager and the navigation
//! controller lives here.  `Default` carries the calibrated values the road
//! data and vehicle behavior were tuned against; distances are world units
//! (centimetres), speed limits are fractions of a vehicle's maximum speed.
//!
//! Typically built with `TrafficConfig::default()` and overridden field by
//! field, or deserialized from JSON by the application (feature `serde`).

use crate::{CoreError, CoreResult};

// ── RoadConfig ────────────────────────────────────────────────────────────────

/// Parameters of the road graph compiler.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RoadConfig {
    /// Two ports closer than this are connected across segments.
    pub port_connect_distance: f32,
    /// Distance over which a restricted speed limit recovers to 1.
    pub recovery_horizon: f32,
    /// Nodes at or below this limit restrict their neighbours.
    pub restriction_threshold: f32,
    /// Initial limit of every port.
    pub port_speed_limit: f32,
    /// Cosine of the forward/backward angle mapped onto `bend_limits`.
    pub bend_cosines: (f32, f32),
    /// Speed limits at the two ends of `bend_cosines`.
    pub bend_limits: (f32, f32),
    /// Bearing change above which a turn is classified Left or Right.
    pub turn_threshold_deg: f32,
    /// Maximum arm length kept as a curve in a right turn.
    pub right_curve_cap: f32,
    /// Maximum arm length kept as a curve in a left turn.
    pub left_curve_cap: f32,
    /// Turns whose endpoints are closer than this get no guide nodes.
    pub guide_min_span: f32,
    pub right_turn_speed_limit: f32,
    pub left_turn_speed_limit: f32,
    /// Nearest-node lookups prefer nodes within this vertical distance.
    pub floor_tolerance: f32,
}

impl Default for RoadConfig {
    fn default() -> Self {
        Self {
            port_connect_distance:  100.0,
            recovery_horizon:       4_000.0,
            restriction_threshold:  0.8,
            port_speed_limit:       0.8,
            bend_cosines:           (-0.7071, -1.0),
            bend_limits:            (0.25, 1.0),
            turn_threshold_deg:     30.0,
            right_curve_cap:        500.0,
            left_curve_cap:         1_000.0,
            guide_min_span:         1_000.0,
            right_turn_speed_limit: 0.3,
            left_turn_speed_limit:  0.5,
            floor_tolerance:        500.0,
        }
    }
}

// ── SpawnConfig ───────────────────────────────────────────────────────────────

/// Parameters of the spawn volume and population control.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SpawnConfig {
    /// BFS stops expanding past this accumulated distance.
    pub volume_cap: f32,
    /// Nodes this close to a port of their segment are never spawn points.
    pub near_port_exclusion: f32,
    /// After the initial fill, spawn points must be at least this far from
    /// the origin.
    pub near_origin_exclusion: f32,
    /// Vehicles per lane of the origin segment's widest port.
    pub lane_density: u32,
    /// Spawn attempts per missing vehicle before giving up for this tick.
    pub attempts_per_vehicle: u32,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            volume_cap:            15_000.0,
            near_port_exclusion:   1_000.0,
            near_origin_exclusion: 4_000.0,
            lane_density:          5,
            attempts_per_vehicle:  4,
        }
    }
}

// ── NavConfig ─────────────────────────────────────────────────────────────────

/// Parameters of the per-vehicle navigation controller.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct NavConfig {
    /// Top speed a fully unrestricted road allows.
    pub max_speed: f32,
    /// The current target counts as reached inside this radius.
    pub target_radius: f32,
    /// Lookahead: the next segment is buffered once less than this remains.
    pub lookahead: f32,
    /// No obstacle lane change with less than this left on the segment.
    pub lane_change_min_remaining: f32,
    /// Target-lane clearance must beat head clearance by this much.
    pub lane_change_margin: f32,
    /// Forward distance a planned lane change is spread over.
    pub lane_change_distance: f32,
    /// Lateral offset of the lane probe from the vehicle centre line.
    pub lane_probe_offset: f32,
    /// Seconds of reverse throttle once badly misaligned with the target.
    pub reverse_commit_secs: f32,
    /// Below this cosine to the target the vehicle backs up.
    pub misalignment_cos: f32,
    pub throttle_gain: f32,
    /// Speed-ceiling fraction below which a moving vehicle brakes.
    pub brake_limit: f32,
}

impl Default for NavConfig {
    fn default() -> Self {
        Self {
            max_speed:                 50.0,
            target_radius:             300.0,
            lookahead:                 6_000.0,
            lane_change_min_remaining: 1_400.0,
            lane_change_margin:        400.0,
            lane_change_distance:      3_000.0,
            lane_probe_offset:         500.0,
            reverse_commit_secs:       1.2,
            misalignment_cos:          0.342,
            throttle_gain:             0.68,
            brake_limit:               0.24,
        }
    }
}

// ── TrafficConfig ─────────────────────────────────────────────────────────────

/// Top-level configuration handed to the compiler and the traffic manager.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TrafficConfig {
    pub road: RoadConfig,
    pub spawn: SpawnConfig,
    pub nav: NavConfig,
    /// Seconds between population refreshes.
    pub control_interval_secs: f32,
    /// Master RNG seed.  The same seed always produces identical traffic.
    pub seed: u64,
}

impl Default for TrafficConfig {
    fn default() -> Self {
        Self {
            road: RoadConfig::default(),
            spawn: SpawnConfig::default(),
            nav: NavConfig::default(),
            control_interval_secs: 2.0,
            seed: 0,
        }
    }
}

impl TrafficConfig {
    /// Reject values the compiler or controllers cannot work with.
    pub fn validate(&self) -> CoreResult<()> {
        fn positive(name: &str, v: f32) -> CoreResult<()> {
            if v.is_finite() && v > 0.0 {
                Ok(())
            } else {
                Err(CoreError::Config(format!("{name} must be positive, got {v}")))
            }
        }

        positive("road.port_connect_distance", self.road.port_connect_distance)?;
        positive("road.recovery_horizon", self.road.recovery_horizon)?;
        positive("spawn.volume_cap", self.spawn.volume_cap)?;
        positive("nav.max_speed", self.nav.max_speed)?;
        positive("nav.target_radius", self.nav.target_radius)?;
        positive("nav.lane_change_distance", self.nav.lane_change_distance)?;
        positive("control_interval_secs", self.control_interval_secs)?;

        for (name, v) in [
            ("road.port_speed_limit", self.road.port_speed_limit),
            ("road.restriction_threshold", self.road.restriction_threshold),
            ("road.right_turn_speed_limit", self.road.right_turn_speed_limit),
            ("road.left_turn_speed_limit", self.road.left_turn_speed_limit),
        ] {
            if !(0.0..=1.0).contains(&v) {
                return Err(CoreError::Config(format!("{name} must lie in [0, 1], got {v}")));
            }
        }
        Ok(())
    }
}
