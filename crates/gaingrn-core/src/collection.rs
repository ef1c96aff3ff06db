//! Dataset-wide indexing and statistics.
//!
//! [`IndexingCollection::build`] runs an [`Indexer`] per structure on a rayon pool. Results are
//! immutable; occupancy, conservation and loop statistics are folds over them.
use crate::config::IndexerConfig;
use crate::error::{GrnError, Result};
use crate::indexer::{Indexer, IndexingResult, StructureInput, Superposer};
use crate::label::Label;
use crate::reconcile::SplitRule;
use crate::residue::ALPHABET;
use crate::template::{LabelStem, TemplateLibrary};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use tracing::{info, info_span, warn};

/// A structure rejected because its own data was inconsistent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExcludedStructure {
    /// Position in the input list.
    pub index: usize,
    pub accession: String,
    pub reason: String,
}

/// Flanking stems of a loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct LoopKey {
    pub n_flank: LabelStem,
    pub c_flank: LabelStem,
}

impl fmt::Display for LoopKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.n_flank, self.c_flank)
    }
}

#[derive(Debug)]
pub struct IndexingCollection {
    results: Vec<IndexingResult>,
    excluded: Vec<ExcludedStructure>,
    by_accession: HashMap<String, usize>,
    by_receptor: BTreeMap<String, Vec<usize>>,
}

impl IndexingCollection {
    /// Indexes every input on a pool of `config.n_threads` workers.
    ///
    /// Results keep input order. Inconsistent structures are listed in
    /// [`excluded`](Self::excluded);
    /// every other structure yields a result, even when all of its subdomains failed.
    pub fn build(
        inputs: &[StructureInput],
        templates: &TemplateLibrary,
        superposer: &dyn Superposer,
        config: &IndexerConfig,
    ) -> Result<Self> {
        config.validate()?;
        let _span = info_span!("build_collection", structures = inputs.len()).entered();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.n_threads)
            .build()?;
        let indexer = Indexer::new(templates, superposer, config);

        let mut tagged: Vec<(usize, Result<IndexingResult>)> = pool.install(|| {
            inputs
                .par_iter()
                .enumerate()
                .map(|(idx, input)| (idx, indexer.index(input)))
                .collect()
        });
        tagged.sort_by_key(|(idx, _)| *idx);

        let mut results = Vec::with_capacity(inputs.len());
        let mut excluded = Vec::new();
        for (idx, outcome) in tagged {
            match outcome {
                Ok(result) => results.push(result),
                Err(err) => {
                    warn!(accession = %inputs[idx].accession, error = %err, "structure excluded");
                    excluded.push(ExcludedStructure {
                        index: idx,
                        accession: inputs[idx].accession.clone(),
                        reason: err.to_string(),
                    });
                }
            }
        }
        info!(indexed = results.len(), excluded = excluded.len(), "collection built");
        Ok(IndexingCollection::from_parts(results, excluded))
    }

    pub fn from_results(results: Vec<IndexingResult>) -> Self {
        IndexingCollection::from_parts(results, Vec::new())
    }

    fn from_parts(results: Vec<IndexingResult>, excluded: Vec<ExcludedStructure>) -> Self {
        let mut by_accession = HashMap::new();
        let mut by_receptor: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (idx, result) in results.iter().enumerate() {
            by_accession.entry(result.accession().to_string()).or_insert(idx);
            if let Some(receptor) = result.receptor() {
                by_receptor.entry(receptor.to_string()).or_default().push(idx);
            }
        }
        IndexingCollection {
            results,
            excluded,
            by_accession,
            by_receptor,
        }
    }

    pub fn results(&self) -> &[IndexingResult] {
        &self.results
    }

    pub fn iter(&self) -> impl Iterator<Item = &IndexingResult> {
        self.results.iter()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn excluded(&self) -> &[ExcludedStructure] {
        &self.excluded
    }

    pub fn by_accession(&self, accession: &str) -> Option<&IndexingResult> {
        self.by_accession.get(accession).map(|&idx| &self.results[idx])
    }

    pub fn by_receptor(&self, receptor: &str) -> Vec<&IndexingResult> {
        self.by_receptor
            .get(receptor)
            .map(|idxs| idxs.iter().map(|&idx| &self.results[idx]).collect())
            .unwrap_or_default()
    }

    pub fn receptors(&self) -> impl Iterator<Item = &str> {
        self.by_receptor.keys().map(String::as_str)
    }

    /// Number of structures carrying each label.
    fn label_counts(&self) -> BTreeMap<Label, usize> {
        self.results
            .par_iter()
            .fold(BTreeMap::new, |mut counts, result| {
                for (_, label) in result.labelled() {
                    *counts.entry(label).or_insert(0) += 1;
                }
                counts
            })
            .reduce(BTreeMap::new, merge_counts)
    }

    /// Fraction of structures in which `label` is present.
    pub fn occupancy(&self, label: &Label) -> f64 {
        if self.results.is_empty() {
            return 0.0;
        }
        let present = self
            .results
            .iter()
            .filter(|result| result.labelled().any(|(_, l)| l == *label))
            .count();
        present as f64 / self.results.len() as f64
    }

    pub fn occupancy_table(&self) -> BTreeMap<Label, f64> {
        let total = self.results.len().max(1) as f64;
        self.label_counts()
            .into_iter()
            .map(|(label, count)| (label, count as f64 / total))
            .collect()
    }

    /// Amino-acid frequencies at `label` over the structures carrying it.
    pub fn conservation(&self, label: &Label) -> Option<BTreeMap<char, f64>> {
        let codes: Vec<char> = self
            .results
            .iter()
            .filter_map(|result| {
                result
                    .labelled()
                    .find(|(_, l)| l == label)
                    .map(|(res, _)| result.residue_code(res).unwrap_or('X'))
            })
            .collect();
        frequencies(&codes)
    }

    pub fn conservation_table(&self) -> BTreeMap<Label, BTreeMap<char, f64>> {
        let columns: BTreeMap<Label, Vec<char>> = self
            .results
            .par_iter()
            .fold(BTreeMap::new, |mut acc: BTreeMap<Label, Vec<char>>, result| {
                for (res, label) in result.labelled() {
                    acc.entry(label)
                        .or_default()
                        .push(result.residue_code(res).unwrap_or('X'));
                }
                acc
            })
            .reduce(BTreeMap::new, |mut a, b| {
                for (label, mut codes) in b {
                    a.entry(label).or_default().append(&mut codes);
                }
                a
            });
        columns
            .into_iter()
            .filter_map(|(label, codes)| frequencies(&codes).map(|freq| (label, freq)))
            .collect()
    }

    /// Loop lengths grouped by flanking stems.
    pub fn loop_lengths(&self) -> BTreeMap<LoopKey, Vec<usize>> {
        let mut lengths: BTreeMap<LoopKey, Vec<usize>> = BTreeMap::new();
        for result in &self.results {
            for region in result.loops() {
                let key = LoopKey {
                    n_flank: region.n_flank,
                    c_flank: region.c_flank,
                };
                lengths.entry(key).or_default().push(region.len());
            }
        }
        lengths
    }

    /// Number of structures per highest split rule.
    pub fn split_mode_summary(&self) -> BTreeMap<SplitRule, usize> {
        let mut summary = BTreeMap::new();
        for result in &self.results {
            *summary.entry(result.params().split_mode).or_insert(0) += 1;
        }
        summary
    }

    /// One row per structure, one column per label.
    ///
    /// With `unique_sse` repeated occurrences of a stem fill gaps in the primary columns;
    /// without it they get their own `#2` columns.
    pub fn canonical_table(&self, unique_sse: bool, format: CellFormat) -> CanonicalTable {
        let rows: Vec<TableRow> = self
            .results
            .iter()
            .map(|result| {
                let cell = |res: i32| format.cell(result.residue_code(res).unwrap_or('X'), res);
                let mut cells: BTreeMap<ColumnKey, String> = result
                    .labelled()
                    .map(|(res, label)| (ColumnKey::primary(label), cell(res)))
                    .collect();
                for (&res, &label) in result.repeated_labels() {
                    let key = if unique_sse {
                        ColumnKey::primary(label)
                    } else {
                        ColumnKey::repeat(label)
                    };
                    cells.entry(key).or_insert_with(|| cell(res));
                }
                TableRow {
                    accession: result.accession().to_string(),
                    receptor: result.receptor().map(str::to_string),
                    cells,
                }
            })
            .collect();
        let mut columns: Vec<ColumnKey> = rows
            .iter()
            .flat_map(|row| row.cells.keys().copied())
            .collect();
        columns.sort();
        columns.dedup();
        CanonicalTable {
            columns,
            rows,
            format,
            unique_sse,
        }
    }
}

fn merge_counts(
    mut a: BTreeMap<Label, usize>,
    b: BTreeMap<Label, usize>,
) -> BTreeMap<Label, usize> {
    for (label, count) in b {
        *a.entry(label).or_insert(0) += count;
    }
    a
}

fn frequencies(codes: &[char]) -> Option<BTreeMap<char, f64>> {
    if codes.is_empty() {
        return None;
    }
    let mut freq: BTreeMap<char, f64> = BTreeMap::new();
    for code in codes {
        let code = code.to_ascii_uppercase();
        let code = if ALPHABET.contains(&code) { code } else { 'X' };
        *freq.entry(code).or_insert(0.0) += 1.0;
    }
    let total = codes.len() as f64;
    freq.values_mut().for_each(|v| *v /= total);
    Some(freq)
}

/// Content of a table cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CellFormat {
    /// One-letter residue code.
    Residue,
    /// Residue code followed by the residue number, e.g. `L428`.
    Numbered,
}

impl CellFormat {
    fn cell(self, code: char, residue: i32) -> String {
        match self {
            CellFormat::Residue => code.to_string(),
            CellFormat::Numbered => format!("{}{}", code, residue),
        }
    }
}

/// Column of the canonical table: a label and which occurrence of its stem fills it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ColumnKey {
    pub label: Label,
    pub occurrence: u8,
}

impl ColumnKey {
    pub fn primary(label: Label) -> Self {
        ColumnKey { label, occurrence: 1 }
    }

    pub fn repeat(label: Label) -> Self {
        ColumnKey { label, occurrence: 2 }
    }
}

impl fmt::Display for ColumnKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.occurrence > 1 {
            write!(f, "{}#{}", self.label, self.occurrence)
        } else {
            write!(f, "{}", self.label)
        }
    }
}

impl FromStr for ColumnKey {
    type Err = GrnError;

    fn from_str(s: &str) -> Result<Self> {
        match s.split_once('#') {
            Some((label, occurrence)) => Ok(ColumnKey {
                label: label.parse()?,
                occurrence: occurrence
                    .parse()
                    .map_err(|_| GrnError::table(format!("bad column occurrence in '{}'", s)))?,
            }),
            None => Ok(ColumnKey::primary(s.parse()?)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRow {
    pub accession: String,
    pub receptor: Option<String>,
    pub cells: BTreeMap<ColumnKey, String>,
}

/// Tabular export of a collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalTable {
    pub columns: Vec<ColumnKey>,
    pub rows: Vec<TableRow>,
    pub format: CellFormat,
    pub unique_sse: bool,
}

impl CanonicalTable {
    /// Recovers `residue -> label` maps from the primary columns of a numbered table.
    ///
    /// Merged (`unique_sse`) tables are refused: their primary columns may hold residues of
    /// repeated elements, which are not part of the per-residue labels.
    pub fn to_residue_labels(&self) -> Result<Vec<(String, BTreeMap<i32, Label>)>> {
        if self.format != CellFormat::Numbered {
            return Err(GrnError::table("residue numbers are only recorded in numbered tables"));
        }
        if self.unique_sse {
            return Err(GrnError::table(
                "merged tables mix repeated elements into the primary columns",
            ));
        }
        self.rows
            .iter()
            .map(|row| {
                let labels = row
                    .cells
                    .iter()
                    .filter(|(key, _)| key.occurrence == 1)
                    .map(|(key, cell)| parse_numbered(cell).map(|res| (res, key.label)))
                    .collect::<Result<BTreeMap<_, _>>>()?;
                Ok((row.accession.clone(), labels))
            })
            .collect()
    }
}

fn parse_numbered(cell: &str) -> Result<i32> {
    let mut chars = cell.chars();
    chars.next();
    chars
        .as_str()
        .parse()
        .map_err(|_| GrnError::table(format!("cell '{}' carries no residue number", cell)))
}
