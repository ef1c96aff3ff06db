//! GESAMT pairwise superposition.
//!
//! GESAMT is run as `gesamt <template> <query>`, so the template is the FIXED structure and
//! the query the MOVING one. Its report carries the overall RMSD and a residue table:
//!
//! ```text
//!   RMSD             : 0.8734
//!  |    FIXED    |  Dist.(A)  |   MOVING    |
//!  |-------------+------------+-------------|
//!  |H+ A:LEU 110 | <**0.70**> |H+ A:LEU  10 |
//!  |   A:ALA 111 |            |             |
//! ```
//!
//! Rows with a residue on both sides become [`ResiduePair`]s; the others are gaps.
use gaingrn_core::{
    Correspondence, GrnError, ResiduePair, Result, StructureInput, Subdomain, Superposer, Template,
};
use std::collections::HashMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Parses a GESAMT report into a correspondence.
pub fn parse_gesamt(report: &str) -> Result<Correspondence> {
    let rmsd = report
        .lines()
        .map(str::trim)
        .find(|line| line.starts_with("RMSD") || line.starts_with("r.m.s.d"))
        .and_then(|line| line.split_once(':'))
        .ok_or_else(|| GrnError::superposition("GESAMT report has no RMSD line"))?
        .1
        .split_whitespace()
        .next()
        .and_then(|value| value.parse::<f64>().ok())
        .ok_or_else(|| GrnError::parse("unreadable RMSD in GESAMT report"))?;

    let mut lines = report.lines().map(str::trim);
    if !lines.any(|line| line.starts_with('|') && line.contains("FIXED")) {
        return Err(GrnError::superposition("GESAMT report has no alignment table"));
    }

    let mut pairs = Vec::new();
    for line in lines.filter(|line| line.starts_with('|')) {
        let cells: Vec<&str> = line.split('|').collect();
        if cells.len() < 4 || cells[1].starts_with('-') {
            continue;
        }
        let fixed = residue_number(cells[1])?;
        let moving = residue_number(cells[3])?;
        if let (Some(template), Some(query)) = (fixed, moving) {
            pairs.push(ResiduePair::new(query, template, distance(cells[2])));
        }
    }
    debug!(rmsd, aligned = pairs.len(), "parsed GESAMT report");
    Correspondence::new(pairs, rmsd)
}

/// Residue number of a table cell such as `H+ A:ASP 426`; `None` for an empty cell.
fn residue_number(cell: &str) -> Result<Option<i32>> {
    let Some((_, residue)) = cell.split_once(':') else {
        return Ok(None);
    };
    let number = residue
        .split_whitespace()
        .last()
        .map(|token| token.trim_end_matches(|c: char| c.is_ascii_alphabetic()))
        .unwrap_or_default();
    number
        .parse()
        .map(Some)
        .map_err(|_| GrnError::parse(format!("bad residue in GESAMT cell '{}'", cell.trim())))
}

fn distance(cell: &str) -> Option<f64> {
    cell.trim_matches(|c: char| !c.is_ascii_digit()).parse().ok()
}

/// Reads a GESAMT report from disk.
pub fn read_gesamt<P: AsRef<Path>>(path: P) -> Result<Correspondence> {
    parse_gesamt(&fs::read_to_string(path)?)
}

/// Runs the GESAMT binary as a child process with a wall-clock budget.
#[derive(Debug, Clone)]
pub struct GesamtRunner {
    binary: PathBuf,
    timeout: Duration,
    poll_interval: Duration,
}

impl GesamtRunner {
    pub fn new(binary: impl Into<PathBuf>, timeout: Duration) -> Self {
        GesamtRunner {
            binary: binary.into(),
            timeout,
            poll_interval: Duration::from_millis(50),
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Superposes `query` onto `template` and returns the raw report.
    ///
    /// The child is killed once the timeout elapses.
    pub fn run(&self, template: &Path, query: &Path) -> Result<String> {
        let scratch = tempfile::tempdir()?;
        let report_path = scratch.path().join("gesamt.out");
        let report = File::create(&report_path)?;

        let mut child = Command::new(&self.binary)
            .arg(template)
            .arg(query)
            .stdout(report)
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                GrnError::superposition(format!(
                    "failed to execute {}: {}",
                    self.binary.display(),
                    e
                ))
            })?;

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if Instant::now() >= deadline {
                if let Err(e) = child.kill() {
                    warn!(error = %e, "could not kill GESAMT");
                }
                child.wait()?;
                return Err(GrnError::timeout(
                    format!("GESAMT {} vs {}", template.display(), query.display()),
                    self.timeout.as_secs(),
                ));
            }
            thread::sleep(self.poll_interval);
        };
        if !status.success() {
            return Err(GrnError::superposition(format!(
                "GESAMT exited with {} for {} vs {}",
                status,
                template.display(),
                query.display()
            )));
        }
        Ok(fs::read_to_string(&report_path)?)
    }
}

impl Superposer for GesamtRunner {
    fn superpose(
        &self,
        query: &StructureInput,
        template: &Template,
        _subdomain: Subdomain,
    ) -> Result<Correspondence> {
        let query_path = query
            .structure
            .as_deref()
            .ok_or_else(|| {
                GrnError::superposition(format!("{} has no structure file", query.accession))
            })?;
        let template_path = template
            .structure()
            .ok_or_else(|| {
                GrnError::superposition(format!(
                    "template {} has no structure file",
                    template.id()
                ))
            })?;
        self.run(template_path, query_path)
            .and_then(|report| parse_gesamt(&report))
            .map_err(|err| unusable_report(err, &query.accession, template))
    }
}

/// Output that cannot be read or parsed yields no correspondence for this template.
fn unusable_report(err: GrnError, accession: &str, template: &Template) -> GrnError {
    match err {
        GrnError::Io(_) | GrnError::Parse(_) => {
            GrnError::superposition(format!("{} vs {}: {}", accession, template.id(), err))
        }
        other => other,
    }
}

/// Serves GESAMT reports produced earlier, keyed by query accession and template id.
#[derive(Debug, Clone, Default)]
pub struct PrecomputedSuperposer {
    reports: HashMap<(String, String), PathBuf>,
}

impl PrecomputedSuperposer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        accession: impl Into<String>,
        template_id: impl Into<String>,
        report: impl Into<PathBuf>,
    ) {
        self.reports
            .insert((accession.into(), template_id.into()), report.into());
    }

    pub fn with_report(
        mut self,
        accession: impl Into<String>,
        template_id: impl Into<String>,
        report: impl Into<PathBuf>,
    ) -> Self {
        self.insert(accession, template_id, report);
        self
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }
}

impl Superposer for PrecomputedSuperposer {
    fn superpose(
        &self,
        query: &StructureInput,
        template: &Template,
        _subdomain: Subdomain,
    ) -> Result<Correspondence> {
        let key = (query.accession.clone(), template.id().to_string());
        let path = self.reports.get(&key).ok_or_else(|| {
            GrnError::superposition(format!(
                "no GESAMT report for {} vs {}",
                query.accession,
                template.id()
            ))
        })?;
        read_gesamt(path).map_err(|err| unusable_report(err, &query.accession, template))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gaingrn_test_data::TestFile;

    const REPORT: &str = "
 ===== Superposition matrix:

  Q-score          : 0.6123
  RMSD             : 1.2500
  Aligned residues : 3

 .-------------.------------.-------------.
 |    FIXED    |  Dist.(A)  |   MOVING    |
 |-------------+------------+-------------|
 |H+ A:ASP 426 | <**1.07**> |H+ A:ASP  12 |
 |H+ A:LEU 427 | <..2.31..> |H+ A:LEU  13 |
 |   A:GLY 428 |            |             |
 |             |            |   A:SER  14 |
 |S- A:VAL 429 | <**0.51**> |S- A:VAL  15 |
 `-------------'------------'-------------'
";

    #[test]
    fn test_parse_report() {
        let corr = parse_gesamt(REPORT).unwrap();
        assert_eq!(corr.rmsd(), 1.25);
        assert_eq!(corr.len(), 3);
        assert_eq!(corr.template_of(12), Some(426));
        assert_eq!(corr.query_of(429), Some(15));
        assert_eq!(corr.template_of(14), None);
        assert_eq!(corr.distance_at(13), Some(2.31));
    }

    #[test]
    fn test_reports_without_alignment() {
        assert!(matches!(
            parse_gesamt("  Q-score : 0.1\n"),
            Err(GrnError::Superposition(_))
        ));
        assert!(matches!(
            parse_gesamt("  RMSD : 1.0\n no table\n"),
            Err(GrnError::Superposition(_))
        ));
        assert!(parse_gesamt(&REPORT.replace("ASP 426", "ASP 4x6")).is_err());
    }

    #[test]
    fn test_read_fixture() {
        let (path, _tmp) = TestFile::gesamt_b_01().create_temp().unwrap();
        let corr = read_gesamt(&path).unwrap();
        assert_eq!(corr.rmsd(), 1.1023);
        assert_eq!(corr.query_of(270), Some(70));
        assert_eq!(corr.query_of(281), None);
        assert_eq!(corr.query_of(290), None);
        assert_eq!(corr.len(), 40);
    }

    #[cfg(unix)]
    mod runner {
        use super::*;
        use std::os::unix::fs::PermissionsExt;

        fn script(dir: &Path, body: &str) -> PathBuf {
            let path = dir.join("gesamt");
            fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        #[test]
        fn test_runner_reads_stdout() {
            let dir = tempfile::tempdir().unwrap();
            let (report, _tmp) = TestFile::gesamt_a_01().create_temp().unwrap();
            let binary = script(dir.path(), &format!("cat '{}'", report));
            let runner = GesamtRunner::new(binary, Duration::from_secs(10));
            let output = runner.run(Path::new("template.pdb"), Path::new("query.pdb")).unwrap();
            let corr = parse_gesamt(&output).unwrap();
            assert_eq!(corr.template_of(10), Some(110));
        }

        #[test]
        fn test_runner_timeout() {
            let dir = tempfile::tempdir().unwrap();
            let binary = script(dir.path(), "sleep 5");
            let runner = GesamtRunner::new(binary, Duration::from_millis(200))
                .with_poll_interval(Duration::from_millis(10));
            let started = Instant::now();
            let result = runner.run(Path::new("template.pdb"), Path::new("query.pdb"));
            assert!(matches!(result, Err(GrnError::Timeout { .. })));
            assert!(started.elapsed() < Duration::from_secs(4));
        }

        #[test]
        fn test_runner_failure() {
            let dir = tempfile::tempdir().unwrap();
            let binary = script(dir.path(), "exit 3");
            let runner = GesamtRunner::new(binary, Duration::from_secs(10));
            let result = runner.run(Path::new("template.pdb"), Path::new("query.pdb"));
            assert!(matches!(result, Err(GrnError::Superposition(_))));
            let missing = GesamtRunner::new(dir.path().join("absent"), Duration::from_secs(1));
            assert!(missing.run(Path::new("a"), Path::new("b")).is_err());
        }
    }
}
