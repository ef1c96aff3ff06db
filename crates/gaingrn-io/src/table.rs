//! CSV export and import of collection tables.
//!
//! The canonical table has one row per structure: `accession`, `receptor`, then one column
//! per label (`H3.50`, `S7.49`, `GPS-1`, and `H3.50#2` for repeated occurrences).
use gaingrn_core::{
    CanonicalTable, CellFormat, ColumnKey, GrnError, IndexingCollection, Result, TableRow,
};
use polars::prelude::*;
use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;
use tracing::info;

const ACCESSION: &str = "accession";
const RECEPTOR: &str = "receptor";

fn table_error(e: PolarsError) -> GrnError {
    GrnError::table(e.to_string())
}

/// Lays a canonical table out as a data frame, columns in label order.
pub fn table_frame(table: &CanonicalTable) -> Result<DataFrame> {
    let mut columns = Vec::with_capacity(table.columns.len() + 2);
    columns.push(Column::new(
        ACCESSION.into(),
        table.rows.iter().map(|row| row.accession.clone()).collect::<Vec<_>>(),
    ));
    columns.push(Column::new(
        RECEPTOR.into(),
        table.rows.iter().map(|row| row.receptor.clone()).collect::<Vec<_>>(),
    ));
    for key in &table.columns {
        let cells: Vec<Option<String>> =
            table.rows.iter().map(|row| row.cells.get(key).cloned()).collect();
        columns.push(Column::new(key.to_string().into(), cells));
    }
    DataFrame::new(columns).map_err(table_error)
}

pub fn write_table<P: AsRef<Path>>(table: &CanonicalTable, path: P) -> Result<()> {
    let mut df = table_frame(table)?;
    let mut file = File::create(path.as_ref())?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut df)
        .map_err(table_error)?;
    info!(
        path = %path.as_ref().display(),
        rows = table.rows.len(),
        columns = table.columns.len(),
        "wrote label table"
    );
    Ok(())
}

/// Reads a table written by [`write_table`].
///
/// `format` says how the cells were written. The file does not record whether repeats were
/// merged, so the table is reported without `unique_sse`.
pub fn read_table<P: AsRef<Path>>(path: P, format: CellFormat) -> Result<CanonicalTable> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .try_into_reader_with_file_path(Some(path.as_ref().to_path_buf()))
        .map_err(table_error)?
        .finish()
        .map_err(table_error)?;

    let accessions = string_column(&df, ACCESSION)?;
    let receptors = string_column(&df, RECEPTOR)?;

    let mut columns = Vec::new();
    let mut rows: Vec<TableRow> = accessions
        .into_iter()
        .zip(receptors)
        .map(|(accession, receptor)| {
            Ok(TableRow {
                accession: accession.ok_or_else(|| GrnError::table("row without accession"))?,
                receptor,
                cells: BTreeMap::new(),
            })
        })
        .collect::<Result<_>>()?;

    for name in df.get_column_names() {
        let name = name.as_str();
        if name == ACCESSION || name == RECEPTOR {
            continue;
        }
        let key: ColumnKey = name
            .parse()
            .map_err(|e| GrnError::table(format!("column '{}': {}", name, e)))?;
        for (row, cell) in rows.iter_mut().zip(string_column(&df, name)?) {
            if let Some(cell) = cell {
                row.cells.insert(key, cell);
            }
        }
        columns.push(key);
    }
    columns.sort();
    Ok(CanonicalTable {
        columns,
        rows,
        format,
        unique_sse: false,
    })
}

fn string_column(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let column = df.column(name).map_err(table_error)?;
    let values = column.as_materialized_series().str().map_err(table_error)?;
    Ok(values
        .into_iter()
        .map(|value| value.filter(|v| !v.is_empty()).map(str::to_string))
        .collect())
}

/// Per-label statistics: occupancy and the most frequent residue with its frequency.
pub fn occupancy_frame(collection: &IndexingCollection) -> Result<DataFrame> {
    let occupancy = collection.occupancy_table();
    let conservation = collection.conservation_table();

    let mut labels = Vec::with_capacity(occupancy.len());
    let mut values = Vec::with_capacity(occupancy.len());
    let mut consensus = Vec::with_capacity(occupancy.len());
    let mut frequency = Vec::with_capacity(occupancy.len());
    for (label, value) in &occupancy {
        let top = conservation.get(label).and_then(|freq| {
            freq.iter()
                .fold(None, |best: Option<(char, f64)>, (&code, &f)| match best {
                    Some((_, best_f)) if best_f >= f => best,
                    _ => Some((code, f)),
                })
        });
        labels.push(label.to_string());
        values.push(*value);
        consensus.push(top.map(|(code, _)| code.to_string()));
        frequency.push(top.map(|(_, f)| f));
    }
    DataFrame::new(vec![
        Column::new("label".into(), labels),
        Column::new("occupancy".into(), values),
        Column::new("consensus".into(), consensus),
        Column::new("consensus_frequency".into(), frequency),
    ])
    .map_err(table_error)
}

pub fn write_occupancy<P: AsRef<Path>>(collection: &IndexingCollection, path: P) -> Result<()> {
    let mut df = occupancy_frame(collection)?;
    let mut file = File::create(path.as_ref())?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut df)
        .map_err(table_error)?;
    info!(path = %path.as_ref().display(), labels = df.height(), "wrote occupancy table");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gaingrn_core::{Label, LabelStem};

    fn key(s: &str) -> ColumnKey {
        s.parse().unwrap()
    }

    fn table() -> CanonicalTable {
        let row = |accession: &str, receptor: Option<&str>, cells: &[(&str, &str)]| TableRow {
            accession: accession.to_string(),
            receptor: receptor.map(str::to_string),
            cells: cells.iter().map(|(k, v)| (key(k), v.to_string())).collect(),
        };
        let rows = vec![
            row("Q1", Some("ADGRL1"), &[("H1.50", "L10"), ("S1.50", "V46"), ("GPS-1", "L70")]),
            row("Q2", None, &[("H1.50", "I12"), ("H1.50#2", "A30")]),
        ];
        let mut columns: Vec<ColumnKey> =
            rows.iter().flat_map(|r| r.cells.keys().copied()).collect();
        columns.sort();
        columns.dedup();
        CanonicalTable {
            columns,
            rows,
            format: CellFormat::Numbered,
            unique_sse: false,
        }
    }

    #[test]
    fn test_frame_layout() {
        let df = table_frame(&table()).unwrap();
        assert_eq!(df.height(), 2);
        let names: Vec<String> = df.get_column_names().iter().map(|n| n.to_string()).collect();
        assert_eq!(&names[..2], &["accession".to_string(), "receptor".to_string()]);
        assert!(names.contains(&"H1.50#2".to_string()));
        assert_eq!(names.len(), 6);
    }

    #[test]
    fn test_csv_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.csv");
        let original = table();
        write_table(&original, &path).unwrap();
        let recovered = read_table(&path, CellFormat::Numbered).unwrap();
        assert_eq!(recovered.rows, original.rows);
        assert_eq!(recovered.columns, original.columns);
        assert!(!recovered.unique_sse);

        let labels = recovered.to_residue_labels().unwrap();
        assert_eq!(labels[0].1[&10], Label::generic(LabelStem::helix(1), 50));
        assert_eq!(labels[1].1.len(), 1);
    }

    #[test]
    fn test_bad_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.csv");
        std::fs::write(&path, "accession,receptor,Q9.50\nQ1,,L10\n").unwrap();
        assert!(matches!(read_table(&path, CellFormat::Numbered), Err(GrnError::Table(_))));
    }
}
