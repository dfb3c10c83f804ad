//! A square ring road, 400 m a side, built in code.

use ut_core::Vec3;
use ut_road::{NodeRecord, RecordError, RoadGraphCompiler};

pub const SIDE: f32 = 40_000.0;
pub const PERIMETER: f32 = 4.0 * SIDE;

/// Ports sit this far from the corner, so neighbouring ends are ~35 apart.
const CORNER_INSET: f32 = 25.0;
const NODE_SPACING: f32 = 5_000.0;
const LANE_WIDTH: f32 = 300.0;
const LANES_EACH_WAY: u32 = 2;

const CORNERS: [Vec3; 4] = [
    Vec3::new(0.0, 0.0, 0.0),
    Vec3::new(SIDE, 0.0, 0.0),
    Vec3::new(SIDE, SIDE, 0.0),
    Vec3::new(0.0, SIDE, 0.0),
];

/// Add the four sides as one segment each.
pub fn push_ring(compiler: &mut RoadGraphCompiler) -> Result<(), RecordError> {
    for (side, &a) in CORNERS.iter().enumerate() {
        let b = CORNERS[(side + 1) % CORNERS.len()];
        let dir = (b - a).normalize();
        let start = a + dir * CORNER_INSET;
        let length = start.distance(b - dir * CORNER_INSET);

        let steps = (length / NODE_SPACING).round() as usize;
        let mut points: Vec<Vec3> = (0..steps).map(|k| start + dir * (k as f32 * NODE_SPACING)).collect();
        points.push(start + dir * length);

        let last = points.len() - 1;
        let records = points
            .iter()
            .enumerate()
            .map(|(i, &p)| {
                let next = if i == last { -1 } else { i as i32 + 1 };
                if i == 0 || i == last {
                    NodeRecord::port(next, p, LANE_WIDTH, LANES_EACH_WAY, LANES_EACH_WAY)
                } else {
                    NodeRecord::normal(next, p)
                }
            })
            .collect();
        compiler.push_segment("ring", side as u64 + 1, records)?;
    }
    Ok(())
}

/// Point and heading `distance` along the ring, counter-clockwise from the
/// first corner.
pub fn along(distance: f32) -> (Vec3, Vec3) {
    let d = distance.rem_euclid(PERIMETER);
    let side = ((d / SIDE) as usize).min(CORNERS.len() - 1);
    let a = CORNERS[side];
    let dir = (CORNERS[(side + 1) % CORNERS.len()] - a).normalize();
    (a + dir * (d - side as f32 * SIDE), dir)
}
