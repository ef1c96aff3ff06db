//! STRIDE per-residue assignments.
//!
//! Only `ASG` lines are read. Their whitespace-separated fields are
//!
//! ```text
//!  0    1 2    3    4    5             6         7         8         9        10
//! ASG  THR A  458  453    E        Strand   -123.69    131.11       4.2      ~~~~
//! ASG  SER A  459  454    e        Strand    -66.77    156.86      10.4      2.97
//! ```
//!
//! Field 3 is the PDB residue number and field 4 only enumerates the lines, so numbering
//! always comes from field 3. Fields 7 and 8 are phi and psi. Field 10 is the outlier
//! magnitude appended by the angle-outlier preprocessing (`~~~~` when the residue is not
//! an outlier); files written by plain STRIDE lack it.
use gaingrn_core::{aa3to1, GrnError, Result, SseRecord, SseState};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::debug;

const NO_OUTLIER: &str = "~~~~";

/// A STRIDE reader.
pub struct StrideReader<R> {
    inner: R,
}

impl<R> StrideReader<R> {
    /// Returns a reference to the underlying reader.
    pub fn get_ref(&self) -> &R {
        &self.inner
    }
    /// Returns a mutable reference to the underlying reader.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }
    /// Unwraps and returns the underlying reader.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R> StrideReader<R>
where
    R: BufRead,
{
    /// Creates a STRIDE reader.
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Reads all assignments in residue order.
    ///
    /// Residue numbers absent between the first and last assignment come back as
    /// missing (`X`) records.
    pub fn read_records(&mut self) -> Result<Vec<SseRecord>> {
        let mut assigned: BTreeMap<i32, SseRecord> = BTreeMap::new();
        let mut line = String::new();
        let mut line_number = 0usize;
        loop {
            line.clear();
            if self.inner.read_line(&mut line)? == 0 {
                break;
            }
            line_number += 1;
            if !line.starts_with("ASG") {
                continue;
            }
            let record = parse_asg(&line)
                .map_err(|e| GrnError::parse(format!("STRIDE line {}: {}", line_number, e)))?;
            if assigned.contains_key(&record.residue) {
                return Err(GrnError::parse(format!(
                    "STRIDE line {}: residue {} assigned twice",
                    line_number, record.residue
                )));
            }
            assigned.insert(record.residue, record);
        }

        let (Some(&first), Some(&last)) = (assigned.keys().next(), assigned.keys().next_back())
        else {
            return Err(GrnError::parse("no ASG records found"));
        };
        let records: Vec<SseRecord> = (first..=last)
            .map(|res| assigned.remove(&res).unwrap_or_else(|| SseRecord::missing(res)))
            .collect();
        debug!(
            first,
            last,
            missing = records.iter().filter(|r| r.state == SseState::Missing).count(),
            "read STRIDE assignment"
        );
        Ok(records)
    }
}

fn parse_asg(line: &str) -> std::result::Result<SseRecord, String> {
    let items: Vec<&str> = line.split_whitespace().collect();
    if items.len() < 6 {
        return Err(format!("expected at least 6 fields, found {}", items.len()));
    }
    let residue: i32 = items[3]
        .parse()
        .map_err(|_| format!("bad residue number '{}'", items[3]))?;
    let mut code = items[5].chars();
    let state = match (code.next(), code.next()) {
        (Some(c), None) => c,
        _ => return Err(format!("bad state '{}'", items[5])),
    };
    let mut record = SseRecord::new(residue, aa3to1(items[1]), state);
    if let (Some(phi), Some(psi)) = (items.get(7), items.get(8)) {
        let angle = |value: &str| {
            value
                .parse::<f64>()
                .map_err(|_| format!("bad dihedral '{}'", value))
        };
        record = record.with_angles(angle(*phi)?, angle(*psi)?);
    }
    match items.get(10) {
        Some(&value) if value != NO_OUTLIER => {
            let magnitude: f64 = value
                .parse()
                .map_err(|_| format!("bad outlier magnitude '{}'", value))?;
            Ok(record.with_magnitude(magnitude))
        }
        _ => Ok(record),
    }
}

/// Reads a STRIDE file from disk.
pub fn read_stride<P: AsRef<Path>>(path: P) -> Result<Vec<SseRecord>> {
    let file = File::open(path)?;
    StrideReader::new(BufReader::new(file)).read_records()
}
