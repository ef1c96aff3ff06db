use gaingrn_core::{aa3to1, GrnError, Result, Sequence};
use itertools::Itertools;
use std::path::Path;
use tracing::debug;

/// One-letter sequence of a coordinate file, keyed by residue number.
///
/// Reads the chain named `chain`, or the first chain when `None`. Hetero residues are skipped.
pub fn read_sequence<P: AsRef<Path>>(path: P, chain: Option<&str>) -> Result<Sequence> {
    let path = path.as_ref();
    let file_name = path
        .to_str()
        .ok_or_else(|| GrnError::invalid(format!("non UTF-8 path {}", path.display())))?;
    let (pdb, warnings) = pdbtbx::open(file_name).map_err(|errors| {
        GrnError::parse(format!(
            "{}: {}",
            path.display(),
            errors.iter().map(|e| e.to_string()).join("; ")
        ))
    })?;
    debug!(path = %path.display(), warnings = warnings.len(), "opened structure");

    let selected = match chain {
        Some(id) => pdb.chains().find(|c| c.id() == id),
        None => pdb.chains().next(),
    };
    let selected = selected.ok_or_else(|| {
        GrnError::parse(format!(
            "{}: chain {} not found",
            path.display(),
            chain.unwrap_or("(first)")
        ))
    })?;

    Ok(selected
        .residues()
        .filter(|residue| residue.atoms().any(|atom| !atom.hetero()))
        .map(|residue| {
            let code = residue.name().map(aa3to1).unwrap_or('X');
            (residue.serial_number() as i32, code)
        })
        .collect())
}

/// Residues where two sequences disagree, as `(residue, expected, found)`.
///
/// Residues unknown on either side are ignored.
pub fn sequence_mismatches(expected: &Sequence, found: &Sequence) -> Vec<(i32, char, char)> {
    expected
        .iter()
        .filter_map(|(&res, &a)| found.get(&res).map(|&b| (res, a, b)))
        .filter(|&(_, a, b)| a != 'X' && b != 'X' && a != b)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stride::read_stride;
    use gaingrn_test_data::TestFile;

    #[test]
    fn test_read_sequence() {
        let (path, _tmp) = TestFile::pdb_01().create_temp().unwrap();
        let sequence = read_sequence(&path, None).unwrap();
        assert_eq!(sequence.len(), 78);
        assert_eq!(sequence[&1], 'M');
        assert_eq!(sequence[&10], 'L');
        assert_eq!(sequence[&70], 'L');
        assert!(!sequence.contains_key(&39));
        assert!(read_sequence(&path, Some("Z")).is_err());
    }

    #[test]
    fn test_agrees_with_stride() {
        let (pdb, _pdb_tmp) = TestFile::pdb_01().create_temp().unwrap();
        let (stride, _stride_tmp) = TestFile::stride_01().create_temp().unwrap();
        let from_pdb = read_sequence(&pdb, Some("A")).unwrap();
        let from_stride: Sequence = read_stride(&stride)
            .unwrap()
            .into_iter()
            .map(|rec| (rec.residue, rec.res_name))
            .collect();
        assert!(sequence_mismatches(&from_stride, &from_pdb).is_empty());

        let mut mutated = from_pdb.clone();
        mutated.insert(10, 'W');
        assert_eq!(sequence_mismatches(&from_stride, &mutated), vec![(10, 'L', 'W')]);
    }
}
