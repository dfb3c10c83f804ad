//! Road record format.
//!
//! # Line format
//!
//! ```text
//! type,nextIndex,x,y,z[,laneWidth,numRights,numLefts]
//! break
//! ```
//!
//! | `type` | Kind   | Fields |
//! |--------|--------|--------|
//! | `1`    | Port   | 8      |
//! | `2`    | Normal | 5      |
//! | `3`    | Cross  | 5      |
//!
//! `nextIndex` is the 0-based index of the following node inside the same
//! segment, negative for the last node.  A `break` line closes a segment.

use csv::StringRecord;

use ut_core::Vec3;

use crate::error::RecordErrorKind;

/// Upper bound on `numRights` / `numLefts` of a port.
pub const MAX_LANES: u32 = i16::MAX as u32;

/// Node kinds that may appear in record data.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RecordKind {
    Port,
    Normal,
    Cross,
}

impl RecordKind {
    fn from_code(code: &str) -> Option<Self> {
        match code.parse::<u8>().ok()? {
            1 => Some(RecordKind::Port),
            2 => Some(RecordKind::Normal),
            3 => Some(RecordKind::Cross),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            RecordKind::Port => "port",
            RecordKind::Normal => "normal",
            RecordKind::Cross => "cross",
        }
    }

    fn field_count(self) -> usize {
        match self {
            RecordKind::Port => 8,
            RecordKind::Normal | RecordKind::Cross => 5,
        }
    }
}

/// One parsed node definition.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeRecord {
    pub kind: RecordKind,
    pub next_index: i32,
    pub position: Vec3,
    /// Port-only fields; zero for other kinds.
    pub lane_width: f32,
    pub num_rights: u32,
    pub num_lefts: u32,
}

impl NodeRecord {
    pub fn port(next_index: i32, position: Vec3, lane_width: f32, num_rights: u32, num_lefts: u32) -> Self {
        Self { kind: RecordKind::Port, next_index, position, lane_width, num_rights, num_lefts }
    }

    pub fn normal(next_index: i32, position: Vec3) -> Self {
        Self::plain(RecordKind::Normal, next_index, position)
    }

    pub fn cross(next_index: i32, position: Vec3) -> Self {
        Self::plain(RecordKind::Cross, next_index, position)
    }

    fn plain(kind: RecordKind, next_index: i32, position: Vec3) -> Self {
        Self { kind, next_index, position, lane_width: 0.0, num_rights: 0, num_lefts: 0 }
    }
}

/// A parsed line.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Line {
    Break,
    Node(NodeRecord),
}

pub(crate) fn parse_line(record: &StringRecord) -> Result<Line, RecordErrorKind> {
    if record.len() == 1 && &record[0] == "break" {
        return Ok(Line::Break);
    }

    let code = record.get(0).unwrap_or_default();
    let kind = RecordKind::from_code(code)
        .ok_or_else(|| RecordErrorKind::UnknownType(code.to_string()))?;
    if record.len() != kind.field_count() {
        return Err(RecordErrorKind::FieldCount {
            kind: kind.name(),
            expected: kind.field_count(),
            found: record.len(),
        });
    }

    let next_index: i32 = field(record, 1)?;
    let position = Vec3::new(real(record, 2)?, real(record, 3)?, real(record, 4)?);
    let node = match kind {
        RecordKind::Port => NodeRecord::port(
            next_index,
            position,
            real(record, 5)?,
            lanes(record, 6)?,
            lanes(record, 7)?,
        ),
        RecordKind::Normal => NodeRecord::normal(next_index, position),
        RecordKind::Cross => NodeRecord::cross(next_index, position),
    };
    Ok(Line::Node(node))
}

fn field<T: std::str::FromStr>(record: &StringRecord, i: usize) -> Result<T, RecordErrorKind> {
    let raw = record.get(i).unwrap_or_default();
    raw.parse().map_err(|_| RecordErrorKind::InvalidNumber { field: i, value: raw.to_string() })
}

/// Like [`field`], but `nan` and infinities are rejected too.
fn real(record: &StringRecord, i: usize) -> Result<f32, RecordErrorKind> {
    let value: f32 = field(record, i)?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(RecordErrorKind::InvalidNumber { field: i, value: record.get(i).unwrap_or_default().to_string() })
    }
}

fn lanes(record: &StringRecord, i: usize) -> Result<u32, RecordErrorKind> {
    let count: u32 = field(record, i)?;
    if count > MAX_LANES {
        return Err(RecordErrorKind::LaneCount { field: i, count });
    }
    Ok(count)
}

/// Structural checks on a complete segment.
pub(crate) fn validate_segment(records: &[NodeRecord]) -> Result<(), RecordErrorKind> {
    let n = records.len();
    if n < 2 {
        return Err(RecordErrorKind::TooShort(n));
    }
    for (i, rec) in records.iter().enumerate() {
        if !rec.position.is_finite() || !rec.lane_width.is_finite() {
            return Err(RecordErrorKind::NonFinite { node: i });
        }
        if rec.num_rights > MAX_LANES {
            return Err(RecordErrorKind::LaneCount { field: 6, count: rec.num_rights });
        }
        if rec.num_lefts > MAX_LANES {
            return Err(RecordErrorKind::LaneCount { field: 7, count: rec.num_lefts });
        }
        if rec.next_index >= 0 && (rec.next_index as usize >= n || rec.next_index as usize == i) {
            return Err(RecordErrorKind::DanglingNext { node: i, next: rec.next_index });
        }
    }
    let crosses = records.iter().filter(|r| r.kind == RecordKind::Cross).count();
    if crosses > 1 {
        return Err(RecordErrorKind::MultipleCross(crosses));
    }
    if crosses == 0 && (records[0].kind != RecordKind::Port || records[n - 1].kind != RecordKind::Port) {
        return Err(RecordErrorKind::Unbounded);
    }
    Ok(())
}
