use gaingrn_core::{IndexingResult, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Writes one line per residue: one-letter code, residue number, label (blank when unlabelled).
///
/// ```text
/// Q1
/// Sequence length: 80
///
/// L    10    H1.50
/// E    15
/// ```
pub fn write_long<W: Write>(result: &IndexingResult, mut writer: W) -> Result<()> {
    writeln!(writer, "{}", result.accession())?;
    writeln!(writer, "Sequence length: {}", result.sequence().len())?;
    writeln!(writer)?;
    for (&res, &code) in result.sequence() {
        match result.label_of(res) {
            Some(label) => writeln!(writer, "{}  {:>4}  {:>7}", code, res, label.to_string())?,
            None => writeln!(writer, "{}  {:>4}", code, res)?,
        }
    }
    writer.flush()?;
    Ok(())
}

/// Writes `<dir>/<accession>.txt`.
pub fn write_long_file<P: AsRef<Path>>(result: &IndexingResult, dir: P) -> Result<()> {
    let path = dir.as_ref().join(format!("{}.txt", result.accession()));
    write_long(result, BufWriter::new(File::create(path)?))
}
