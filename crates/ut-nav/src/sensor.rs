//! Obstacle sensors.
//!
//! A sensor casts a fan of rays from a mount point on the vehicle body and
//! keeps the nearest hit.  Ray casting itself belongs to the host and is
//! reached through [`CollisionProbe`].
//!
//! # Ray fan
//!
//! With `n > 1` rays the starts are spread evenly across `trace_width` on the
//! mount's right axis and the directions evenly across `trace_angle_deg`
//! about the up axis, both centred on the mount heading:
//!
//! ```text
//!            ╲   │   ╱      trace_angle_deg
//!             ╲  │  ╱
//!              ╲ │ ╱
//!        ───────•─•─•─────  trace_width
//!                mount
//! ```

use ut_core::geo::{map_range_clamped, right_of, rotate_yaw};
use ut_core::Vec3;

use crate::vehicle::{VehicleBody, VehiclePose};

/// Host ray cast.
pub trait CollisionProbe {
    /// Distance from `start` to the first blocking hit on `start → end`.
    ///
    /// `None` for no hit.  A failed query must also report `None` so the
    /// vehicle keeps moving instead of freezing its lane.
    fn trace(&mut self, start: Vec3, end: Vec3) -> Option<f32>;
}

/// Probe that never hits anything.
pub struct OpenRoad;

impl CollisionProbe for OpenRoad {
    fn trace(&mut self, _start: Vec3, _end: Vec3) -> Option<f32> {
        None
    }
}

// ── SensorSpec ────────────────────────────────────────────────────────────────

/// Static shape and mount of a sensor.
#[derive(Clone, Debug, PartialEq)]
pub struct SensorSpec {
    pub ray_count: u32,
    pub trace_width: f32,
    pub trace_angle_deg: f32,
    /// `(near, far)`.  Rays are `far` long; `near` maps to the second
    /// component of `normalize_range`.
    pub trace_length: (f32, f32),
    /// Output range of [`Sensor::normalized_value`] for `(near, far)`.
    pub normalize_range: (f32, f32),
    /// Mount point in the body frame (x forward, y right, z up).
    pub offset: Vec3,
    /// Mount heading relative to the body, degrees, positive to the right.
    pub yaw_deg: f32,
}

impl Default for SensorSpec {
    fn default() -> Self {
        Self {
            ray_count: 1,
            trace_width: 0.0,
            trace_angle_deg: 0.0,
            trace_length: (0.0, 1000.0),
            normalize_range: (0.0, 1.0),
            offset: Vec3::ZERO,
            yaw_deg: 0.0,
        }
    }
}

// ── Sensor ────────────────────────────────────────────────────────────────────

/// A sensor and its last reading.
#[derive(Clone, Debug)]
pub struct Sensor {
    pub spec: SensorSpec,
    active: bool,
    detected: bool,
    nearest: f32,
}

impl Sensor {
    pub fn new(spec: SensorSpec) -> Self {
        let nearest = spec.trace_length.1;
        Self { spec, active: true, detected: false, nearest }
    }

    /// A sensor that only fires when swept explicitly.
    pub fn inactive(spec: SensorSpec) -> Self {
        let mut sensor = Self::new(spec);
        sensor.active = false;
        sensor
    }

    /// Fire the full-length fan and store the reading.  Returns whether
    /// anything was hit.
    pub fn sweep<P: CollisionProbe + ?Sized>(&mut self, pose: &VehiclePose, probe: &mut P) -> bool {
        let (detected, nearest) = self.cast(pose, probe, self.spec.trace_length.1);
        self.detected = detected;
        self.nearest = nearest;
        detected
    }

    /// Fire the fan with rays of `length` without touching the stored
    /// reading.  Returns `(detected, nearest)`; `nearest` is `length` when
    /// nothing is hit.
    pub fn cast<P: CollisionProbe + ?Sized>(
        &self,
        pose: &VehiclePose,
        probe: &mut P,
        length: f32,
    ) -> (bool, f32) {
        let spec = &self.spec;
        let n = spec.ray_count.max(1);
        let (mut hit_offset, hit_step, mut angle_offset, angle_step) = if n > 1 {
            let spaces = (n - 1) as f32;
            (
                spec.trace_width * -0.5,
                spec.trace_width / spaces,
                spec.trace_angle_deg * -0.5,
                spec.trace_angle_deg / spaces,
            )
        } else {
            (0.0, 0.0, 0.0, 0.0)
        };

        let origin = pose.to_world(spec.offset);
        let forward = rotate_yaw(pose.forward, spec.yaw_deg).normalize_or_zero();
        let right = right_of(forward).normalize_or_zero();

        let mut detected = false;
        let mut nearest = length;
        for _ in 0..n {
            let start = origin + right * hit_offset;
            let end = start + rotate_yaw(forward, angle_offset) * length;
            hit_offset += hit_step;
            angle_offset += angle_step;
            if let Some(d) = probe.trace(start, end) {
                detected = true;
                nearest = nearest.min(d);
            }
        }
        (detected, nearest)
    }

    #[inline]
    pub fn is_obstacle_detected(&self) -> bool {
        self.detected
    }

    #[inline]
    pub fn nearest_distance(&self) -> f32 {
        self.nearest
    }

    /// Nearest distance mapped from `trace_length` to `normalize_range`,
    /// clamped.
    #[inline]
    pub fn normalized_value(&self) -> f32 {
        map_range_clamped(self.nearest, self.spec.trace_length, self.spec.normalize_range)
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Deactivating clears the reading to "nothing within range".
    pub fn set_active(&mut self, active: bool) {
        if !active {
            self.detected = false;
            self.nearest = self.spec.trace_length.1;
        }
        self.active = active;
    }
}

// ── SensorRig ─────────────────────────────────────────────────────────────────

/// Head fan width when driving straight.
pub const HEAD_TRACE_WIDTH: f32 = 40.0;
/// Head fan angle when driving straight.
pub const HEAD_TRACE_ANGLE: f32 = 10.0;
/// Lateral head shift at full steering lock.
pub const HEAD_AIM_OFFSET: f32 = 80.0;
/// Head yaw at full steering lock.
pub const HEAD_AIM_YAW: f32 = 90.0;

const MOUNT_HEIGHT: f32 = 120.0;

/// The five sensors of a navigated vehicle.
#[derive(Clone, Debug)]
pub struct SensorRig {
    pub head: Sensor,
    /// Fired only while reversing.
    pub rear: Sensor,
    pub left: Sensor,
    pub right: Sensor,
    /// Long probe aimed into an adjacent lane before a lane change.
    pub lane: Sensor,
}

impl SensorRig {
    pub fn for_body(body: &VehicleBody) -> Self {
        let (loc, ext) = (body.center, body.extent);
        let head_mount = Vec3::new(loc.x + ext.x - 65.0, 0.0, MOUNT_HEIGHT);

        let head = Sensor::new(SensorSpec {
            ray_count: 3,
            trace_width: HEAD_TRACE_WIDTH,
            trace_angle_deg: HEAD_TRACE_ANGLE,
            trace_length: (20.0, 1400.0),
            offset: head_mount,
            ..SensorSpec::default()
        });
        let rear = Sensor::inactive(SensorSpec {
            ray_count: 3,
            trace_width: 160.0,
            trace_length: (0.0, 180.0),
            offset: Vec3::new(loc.x - ext.x + 25.0, 0.0, MOUNT_HEIGHT),
            yaw_deg: 180.0,
            ..SensorSpec::default()
        });
        let side = |y: f32, yaw_deg: f32| {
            Sensor::new(SensorSpec {
                ray_count: 2,
                trace_width: 120.0,
                trace_length: (0.0, 100.0),
                normalize_range: (1.0, 0.0),
                offset: Vec3::new(loc.x + ext.x, y, MOUNT_HEIGHT),
                yaw_deg,
                ..SensorSpec::default()
            })
        };
        let lane = Sensor::inactive(SensorSpec {
            trace_length: (0.0, 2000.0),
            offset: head_mount,
            ..SensorSpec::default()
        });

        Self { head, rear, left: side(-ext.y, -90.0), right: side(ext.y, 90.0), lane }
    }

    /// Sweep every active sensor.
    pub fn sweep_active<P: CollisionProbe + ?Sized>(&mut self, pose: &VehiclePose, probe: &mut P) {
        for sensor in [&mut self.head, &mut self.rear, &mut self.left, &mut self.right, &mut self.lane] {
            if sensor.is_active() {
                sensor.sweep(pose, probe);
            }
        }
    }

    /// Narrow and turn the head fan with `steering` in `[-1, 1]`.
    pub fn aim_head(&mut self, steering: f32) {
        let scale = 1.0 - steering.abs();
        let spec = &mut self.head.spec;
        spec.trace_width = scale * HEAD_TRACE_WIDTH;
        spec.trace_angle_deg = scale * HEAD_TRACE_ANGLE;
        spec.offset.y = steering * HEAD_AIM_OFFSET;
        spec.yaw_deg = steering * HEAD_AIM_YAW;
    }
}
