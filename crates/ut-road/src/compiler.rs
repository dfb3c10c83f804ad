//! Road graph compiler.
//!
//! Collects segments from one or more record sources, then compiles them
//! into a [`RoadNetwork`] in one pass:
//!
//! ```text
//! read_records / read_file / push_segment   (any number of sources)
//!        │  parse, validate, drop bad segments
//!        ▼
//! compile()
//!   ① compile every segment          (see `segment` module)
//!   ② connect ports across segments
//!   ③ bulk-load the nearest-node index
//!        │
//!        ▼
//! (RoadNetwork, CompileReport)
//! ```

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, Trim};
use tracing::{info, warn};

use ut_core::RoadConfig;

use crate::error::{RecordError, RecordErrorKind, RoadResult};
use crate::record::{parse_line, validate_segment, Line, NodeRecord};
use crate::segment::compile_segment;
use crate::RoadNetwork;

// ── CompileReport ─────────────────────────────────────────────────────────────

/// Summary of one compile pass.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CompileReport {
    pub segments: usize,
    /// Record nodes, guides excluded.
    pub nodes: usize,
    pub turns: usize,
    pub connections: usize,
    /// Ports left without a partner.  Not an error: a path simply ends there.
    pub dead_end_ports: usize,
    /// Segments dropped for bad data.
    pub discarded: Vec<RecordError>,
}

impl CompileReport {
    pub fn is_clean(&self) -> bool {
        self.discarded.is_empty()
    }
}

// ── RoadGraphCompiler ─────────────────────────────────────────────────────────

/// Accumulates segments and compiles them into a [`RoadNetwork`].
///
/// # Example
///
/// ```
/// use ut_core::RoadConfig;
/// use ut_road::RoadGraphCompiler;
///
/// let data = "1,1,0,0,0,300,2,2\n2,2,2000,0,0\n1,-1,4000,0,0,300,2,2\nbreak\n";
/// let mut compiler = RoadGraphCompiler::new(RoadConfig::default());
/// compiler.read_records("inline", data.as_bytes()).unwrap();
/// let (net, report) = compiler.compile();
/// assert!(report.is_clean());
/// assert_eq!(net.segment_count(), 1);
/// ```
pub struct RoadGraphCompiler {
    config: RoadConfig,
    segments: Vec<Vec<NodeRecord>>,
    errors: Vec<RecordError>,
}

impl RoadGraphCompiler {
    pub fn new(config: RoadConfig) -> Self {
        Self { config, segments: Vec::new(), errors: Vec::new() }
    }

    /// Read a record file.  The file name is used as the error origin.
    pub fn read_file(&mut self, path: &Path) -> RoadResult<()> {
        let file = File::open(path)?;
        self.read_records(&path.display().to_string(), file)
    }

    /// Read records from any `Read` source.
    ///
    /// Malformed records poison their segment, which is dropped at the next
    /// `break` and reported in the [`CompileReport`].  Only I/O failures are
    /// returned as errors.
    pub fn read_records<R: Read>(&mut self, origin: &str, reader: R) -> RoadResult<()> {
        let mut csv_reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(Trim::All)
            .comment(Some(b'#'))
            .from_reader(reader);

        let mut current: Vec<NodeRecord> = Vec::new();
        let mut poisoned: Option<RecordError> = None;
        let mut last_line = 0;

        for result in csv_reader.records() {
            let record = match result {
                Ok(r) => r,
                Err(e) if e.is_io_error() => return Err(e.into()),
                Err(e) => {
                    let line = e.position().map_or(last_line + 1, |p| p.line());
                    poisoned.get_or_insert_with(|| RecordError {
                        origin: origin.to_string(),
                        line,
                        kind: RecordErrorKind::Malformed(e.to_string()),
                    });
                    continue;
                }
            };
            let line = record.position().map_or(last_line + 1, |p| p.line());
            last_line = line;

            match parse_line(&record) {
                Ok(Line::Node(node)) => current.push(node),
                Ok(Line::Break) => {
                    let records = std::mem::take(&mut current);
                    match poisoned.take() {
                        Some(err) => self.errors.push(err),
                        None => {
                            if let Err(err) = self.push_segment(origin, line, records) {
                                self.errors.push(err);
                            }
                        }
                    }
                }
                Err(kind) => {
                    poisoned.get_or_insert_with(|| RecordError {
                        origin: origin.to_string(),
                        line,
                        kind,
                    });
                }
            }
        }

        let unterminated = !current.is_empty() || poisoned.is_some();
        self.errors.extend(poisoned);
        if unterminated {
            self.errors.push(RecordError {
                origin: origin.to_string(),
                line: last_line,
                kind: RecordErrorKind::Unterminated,
            });
        }
        Ok(())
    }

    /// Add one segment built in code.  `line` is only used for reporting.
    pub fn push_segment(
        &mut self,
        origin: &str,
        line: u64,
        records: Vec<NodeRecord>,
    ) -> Result<(), RecordError> {
        validate_segment(&records).map_err(|kind| RecordError {
            origin: origin.to_string(),
            line,
            kind,
        })?;
        self.segments.push(records);
        Ok(())
    }

    /// Number of valid segments collected so far.
    pub fn pending_segments(&self) -> usize {
        self.segments.len()
    }

    /// Compile everything collected so far.
    pub fn compile(self) -> (RoadNetwork, CompileReport) {
        let mut net = RoadNetwork::new(self.config.floor_tolerance);

        for records in &self.segments {
            let seg = compile_segment(&mut net, &self.config, records);
            let ports = net.segment(seg).ports.clone();
            net.ports.extend(ports);
        }
        let (connections, dead_end_ports) = net.connect_ports(self.config.port_connect_distance);
        net.build_index();

        for err in &self.errors {
            warn!(%err, "discarded road segment");
        }

        let report = CompileReport {
            segments: net.segment_count(),
            nodes: self.segments.iter().map(Vec::len).sum(),
            turns: net.turn_count(),
            connections,
            dead_end_ports,
            discarded: self.errors,
        };
        info!(
            segments = report.segments,
            nodes = report.nodes,
            turns = report.turns,
            connections = report.connections,
            dead_ends = report.dead_end_ports,
            discarded = report.discarded.len(),
            "road network compiled"
        );
        (net, report)
    }

    /// Compile a single in-memory source.
    pub fn compile_str(config: RoadConfig, origin: &str, data: &str) -> (RoadNetwork, CompileReport) {
        let mut compiler = Self::new(config);
        // Reading from a byte slice cannot fail with an I/O error.
        if let Err(e) = compiler.read_records(origin, data.as_bytes()) {
            warn!(%e, origin, "unreadable road source");
        }
        compiler.compile()
    }
}
