//! gaingrn-test-data
//!
//! Test files embedded in the crate for use in the gaingrn test suites.
//!
//! The files are represented as `TestFile` objects which package the raw bytes
//! and create temporary files for programs to operate on.
//!
//! All fixtures describe one synthetic GAIN domain, `query_01` (residues 1-80,
//! 39-40 unmodelled), and the two templates it is indexed against:
//! `TA` covers subdomain A at a +100 residue offset, `TB` covers subdomain B at +200.
use std::fs;
use tempfile::{Builder, NamedTempFile};

#[derive(Debug)]
/// Test File
///
/// Example usage:
///
/// ```ignore
/// // returns (filepath, _tempfile_handle).
/// // _handle ensures the tempfile remains in scope
/// use gaingrn_test_data::TestFile;
/// let (stride, _temp) = TestFile::stride_01().create_temp().unwrap();
/// let (templates, _temp) = TestFile::templates_01().create_temp().unwrap();
/// ```
pub struct TestFile {
    filebinary: &'static [u8],
    suffix: &'static str,
}

impl TestFile {
    /// STRIDE assignment of `query_01`, with the appended outlier column.
    /// Residue 12 is a lowercase helix outlier (2.41).
    pub fn stride_01() -> Self {
        Self {
            filebinary: include_bytes!("../data/stride/query_01.stride"),
            suffix: "stride",
        }
    }

    /// GESAMT output, template `TA` fixed and `query_01` moving.
    pub fn gesamt_a_01() -> Self {
        Self {
            filebinary: include_bytes!("../data/gesamt/query_01_TA.txt"),
            suffix: "txt",
        }
    }

    /// GESAMT output, template `TB` fixed and `query_01` moving.
    /// Template residues 281-295 are unaligned.
    pub fn gesamt_b_01() -> Self {
        Self {
            filebinary: include_bytes!("../data/gesamt/query_01_TB.txt"),
            suffix: "txt",
        }
    }

    /// Template library with `TA` and `TB`.
    pub fn templates_01() -> Self {
        Self {
            filebinary: include_bytes!("../data/templates/templates_01.json"),
            suffix: "json",
        }
    }

    /// CA-only coordinates of `query_01`.
    pub fn pdb_01() -> Self {
        Self {
            filebinary: include_bytes!("../data/structures/query_01.pdb"),
            suffix: "pdb",
        }
    }

    pub fn create_temp(&self) -> std::io::Result<(String, NamedTempFile)> {
        let temp = Builder::new()
            .suffix(&format!(".{}", self.suffix))
            .tempfile()?;

        fs::write(&temp, self.filebinary)?;
        let path = temp.path().to_string_lossy().into_owned();

        Ok((path, temp))
    }
}
