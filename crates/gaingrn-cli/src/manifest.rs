//! The structure manifest read by `gaingrn index`.
//!
//! ```json
//! {
//!   "structures": [
//!     {
//!       "accession": "query_01",
//!       "receptor": "ADGRL1",
//!       "stride": "stride/query_01.stride",
//!       "structure": "pdb/query_01.pdb",
//!       "boundary": 40,
//!       "alignments": { "TA": "gesamt/query_01_TA.txt" }
//!     }
//!   ]
//! }
//! ```
//!
//! Relative paths are resolved against the manifest's directory.
use anyhow::{bail, Context};
use gaingrn_core::{mark_angle_outliers, IndexerConfig, StructureInput, SubdomainBoundary};
use gaingrn_io::{read_sequence, read_stride, sequence_mismatches, PrecomputedSuperposer};
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
pub struct Manifest {
    pub structures: Vec<ManifestEntry>,
}

#[derive(Debug, Deserialize)]
pub struct ManifestEntry {
    pub accession: String,
    #[serde(default)]
    pub receptor: Option<String>,
    pub stride: PathBuf,
    #[serde(default)]
    pub structure: Option<PathBuf>,
    /// Last residue of subdomain A; detected from the STRIDE signal when absent.
    #[serde(default)]
    pub boundary: Option<i32>,
    /// First residue of the domain; defaults to the first STRIDE residue.
    #[serde(default)]
    pub domain_start: Option<i32>,
    /// Precomputed GESAMT reports keyed by template id.
    #[serde(default)]
    pub alignments: BTreeMap<String, PathBuf>,
}

impl Manifest {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading manifest {}", path.display()))?;
        let mut manifest: Manifest = serde_json::from_str(&text)
            .with_context(|| format!("parsing manifest {}", path.display()))?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        for entry in &mut manifest.structures {
            entry.resolve(base);
        }
        manifest.check_accessions()?;
        Ok(manifest)
    }

    fn check_accessions(&self) -> anyhow::Result<()> {
        let mut seen = HashSet::new();
        for entry in &self.structures {
            if !seen.insert(entry.accession.as_str()) {
                bail!("accession {} listed twice in manifest", entry.accession);
            }
        }
        Ok(())
    }

    /// Builds the indexer inputs in manifest order.
    pub fn inputs(&self, config: &IndexerConfig) -> anyhow::Result<Vec<StructureInput>> {
        self.structures.iter().map(|entry| entry.input(config)).collect()
    }

    /// Superposer serving the manifest's precomputed GESAMT reports.
    pub fn precomputed(&self) -> PrecomputedSuperposer {
        let mut superposer = PrecomputedSuperposer::new();
        for entry in &self.structures {
            for (template_id, report) in &entry.alignments {
                superposer.insert(entry.accession.clone(), template_id.clone(), report.clone());
            }
        }
        superposer
    }
}

impl ManifestEntry {
    fn resolve(&mut self, base: &Path) {
        let join = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        join(&mut self.stride);
        if let Some(structure) = self.structure.as_mut() {
            join(structure);
        }
        self.alignments.values_mut().for_each(join);
    }

    fn input(&self, config: &IndexerConfig) -> anyhow::Result<StructureInput> {
        let mut records = read_stride(&self.stride)
            .with_context(|| format!("reading {}", self.stride.display()))?;
        let detector = config.segment_detector();
        let marked = mark_angle_outliers(&mut records, &detector, &config.angle_references)?;
        let boundary = match (self.boundary, records.first()) {
            (Some(boundary), Some(first)) => Some(SubdomainBoundary {
                domain_start: self.domain_start.unwrap_or(first.residue),
                boundary,
            }),
            _ => None,
        };
        let mut input = StructureInput::from_records(
            self.accession.clone(),
            self.receptor.clone(),
            &records,
            &detector,
            boundary,
        )?;
        debug!(
            accession = %self.accession,
            segments = input.segments.len(),
            angle_outliers = marked,
            "loaded structure"
        );

        if let Some(structure) = &self.structure {
            if structure.exists()
                && structure.extension().is_some_and(|ext| ext == "pdb" || ext == "cif")
            {
                let coordinates = read_sequence(structure, None)?;
                let mismatches = sequence_mismatches(&input.sequence, &coordinates);
                if !mismatches.is_empty() {
                    warn!(
                        accession = %self.accession,
                        mismatches = mismatches.len(),
                        first = ?mismatches[0],
                        "STRIDE and coordinate sequences disagree"
                    );
                }
            }
            input = input.with_structure(structure);
        }
        Ok(input)
    }
}
