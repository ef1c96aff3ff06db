use gaingrn_core::{
    BreakKind, CellFormat, ColumnKey, Correspondence, GrnError, IndexerConfig, IndexingCollection,
    Label, LabelStem, ResiduePair, Result, Segment, Sequence, SplitRule, SseKind, StructureInput,
    Subdomain, SubdomainBoundary, Superposer, Template, TemplateLibrary,
};
use std::collections::BTreeMap;

const TEMPLATES: &str = r#"{
  "templates": [
    {
      "id": "TA",
      "elements": [
        {"label": "H4", "subdomain": "A", "anchor": 110, "start": 104, "end": 116,
         "occupancy": 0.9},
        {"label": "H5", "subdomain": "A", "anchor": 125, "start": 118, "end": 131}
      ]
    },
    {
      "id": "TB",
      "gps_anchor": 262,
      "elements": [
        {"label": "S1", "subdomain": "B", "anchor": 246, "start": 244, "end": 249},
        {"label": "S2", "subdomain": "B", "anchor": 255, "start": 253, "end": 258}
      ]
    }
  ]
}"#;

/// Maps query residue `q` to `q + offset` of the template; subdomain B of the listed
/// accessions times out.
struct MockSuperposer {
    timeouts: Vec<String>,
}

impl Superposer for MockSuperposer {
    fn superpose(
        &self,
        query: &StructureInput,
        template: &Template,
        subdomain: Subdomain,
    ) -> Result<Correspondence> {
        if subdomain == Subdomain::B && self.timeouts.contains(&query.accession) {
            return Err(GrnError::timeout(format!("{} vs {}", query.accession, template.id()), 1));
        }
        let offset = match subdomain {
            Subdomain::A => 100,
            Subdomain::B => 200,
        };
        Correspondence::new(
            query
                .sequence
                .keys()
                .map(|&q| ResiduePair::new(q, q + offset, Some(0.8))),
            1.0,
        )
    }
}

fn structure(accession: &str, receptor: &str, h4_code: char) -> StructureInput {
    let mut sequence: Sequence = (1..=70).map(|r| (r, 'A')).collect();
    sequence.insert(10, h4_code);
    StructureInput {
        accession: accession.to_string(),
        receptor: Some(receptor.to_string()),
        sequence,
        segments: vec![
            Segment::new(SseKind::Helix, 5, 30)
                .unwrap()
                .with_break(17, BreakKind::Coil)
                .unwrap(),
            Segment::new(SseKind::Strand, 44, 49).unwrap(),
            Segment::new(SseKind::Strand, 53, 58).unwrap(),
        ],
        boundary: Some(SubdomainBoundary {
            domain_start: 1,
            boundary: 38,
        }),
        structure: None,
    }
}

fn batch() -> Vec<StructureInput> {
    vec![
        structure("Q1", "ADGRL1", 'L'),
        structure("Q2", "ADGRL1", 'L'),
        structure("Q3", "ADGRE5", 'I'),
        structure("Q4", "ADGRG1", 'L'),
        structure("Q5", "ADGRG1", 'V'),
    ]
}

fn build(inputs: &[StructureInput], timeouts: &[&str], threads: usize) -> IndexingCollection {
    let templates = TemplateLibrary::from_json_str(TEMPLATES).unwrap();
    let superposer = MockSuperposer {
        timeouts: timeouts.iter().map(|s| s.to_string()).collect(),
    };
    let config = IndexerConfig::builder().n_threads(threads).build();
    IndexingCollection::build(inputs, &templates, &superposer, &config).unwrap()
}

fn label(s: &str) -> Label {
    s.parse().unwrap()
}

#[test]
fn test_batch_with_timeout() {
    let collection = build(&batch(), &["Q3"], 3);
    assert_eq!(collection.len(), 5);
    assert!(collection.excluded().is_empty());

    let accessions: Vec<&str> = collection.iter().map(|r| r.accession()).collect();
    assert_eq!(accessions, vec!["Q1", "Q2", "Q3", "Q4", "Q5"]);

    let timed_out = collection.by_accession("Q3").unwrap();
    assert!((40..=70).all(|res| timed_out.label_of(res).is_none()));
    assert_eq!(timed_out.label_of(10), Some(label("H4.50")));
    assert!(!timed_out.params().rmsd.contains_key(&Subdomain::B));

    for other in ["Q1", "Q2", "Q4", "Q5"] {
        let result = collection.by_accession(other).unwrap();
        assert_eq!(result.label_of(46), Some(label("S1.50")));
        assert_eq!(result.params().rmsd.len(), 2);
    }
}

#[test]
fn test_all_failed_structure_is_retained() {
    let templates = TemplateLibrary::from_json_str(TEMPLATES).unwrap();
    struct Failing;
    impl Superposer for Failing {
        fn superpose(
            &self,
            _: &StructureInput,
            template: &Template,
            _: Subdomain,
        ) -> Result<Correspondence> {
            Err(GrnError::superposition(format!("{} did not converge", template.id())))
        }
    }
    let config = IndexerConfig::default();
    let collection = IndexingCollection::build(&batch(), &templates, &Failing, &config).unwrap();
    assert_eq!(collection.len(), 5);
    let first = &collection.results()[0];
    assert!(first.all_failed());
    assert!(first.residue_labels().values().all(Option::is_none));
    assert_eq!(first.unindexed_elements().stems.len(), 4);
}

#[test]
fn test_inconsistent_structure_excluded() {
    let mut inputs = batch();
    inputs[1].boundary = Some(SubdomainBoundary {
        domain_start: 1,
        boundary: 500,
    });
    let collection = build(&inputs, &[], 2);
    assert_eq!(collection.len(), 4);
    assert_eq!(collection.excluded().len(), 1);
    assert_eq!(collection.excluded()[0].accession, "Q2");
    assert_eq!(collection.excluded()[0].index, 1);
}

#[test]
fn test_deterministic_across_thread_counts() {
    let single = build(&batch(), &["Q3"], 1);
    let many = build(&batch(), &["Q3"], 4);
    for (a, b) in single.iter().zip(many.iter()) {
        assert_eq!(a, b);
    }
    assert_eq!(single.split_mode_summary()[&SplitRule::Coil], 5);
}

#[test]
fn test_occupancy_and_conservation() {
    let collection = build(&batch(), &["Q3"], 2);
    assert_eq!(collection.occupancy(&label("H4.50")), 1.0);
    assert_eq!(collection.occupancy(&label("S1.50")), 0.8);
    let table = collection.occupancy_table();
    assert_eq!(table[&label("S2.50")], 0.8);
    assert_eq!(table[&label("GPS-1")], 0.8);

    let conservation = collection.conservation(&label("H4.50")).unwrap();
    assert_eq!(conservation[&'L'], 0.6);
    assert_eq!(conservation[&'I'], 0.2);
    assert_eq!(collection.conservation_table()[&label("H4.50")], conservation);
    assert!(collection.conservation(&label("H9.50")).is_none());

    assert_eq!(collection.by_receptor("ADGRG1").len(), 2);
    assert!(collection.by_receptor("ADGRV1").is_empty());
    assert_eq!(
        collection.receptors().collect::<Vec<_>>(),
        vec!["ADGRE5", "ADGRG1", "ADGRL1"]
    );
}

#[test]
fn test_loop_lengths() {
    let collection = build(&batch(), &[], 2);
    let loops = collection.loop_lengths();
    let key = loops
        .keys()
        .find(|k| k.n_flank == LabelStem::helix(4) && k.c_flank == LabelStem::helix(5))
        .copied()
        .unwrap();
    assert_eq!(key.to_string(), "H4-H5");
    assert_eq!(loops[&key], vec![1; 5]);
}

#[test]
fn test_table_round_trip() {
    let collection = build(&batch(), &["Q3"], 2);
    let table = collection.canonical_table(false, CellFormat::Numbered);
    assert_eq!(table.rows.len(), 5);
    assert!(table.columns.contains(&ColumnKey::primary(label("H5.43"))));

    let recovered: BTreeMap<String, BTreeMap<i32, Label>> =
        table.to_residue_labels().unwrap().into_iter().collect();
    for result in collection.iter() {
        let original: BTreeMap<i32, Label> = result.labelled().collect();
        assert_eq!(recovered[result.accession()], original);
    }

    let merged = collection.canonical_table(true, CellFormat::Numbered);
    assert!(matches!(merged.to_residue_labels(), Err(GrnError::Table(_))));

    let residues = collection.canonical_table(false, CellFormat::Residue);
    assert_eq!(residues.rows[2].cells[&ColumnKey::primary(label("H4.50"))], "I");
    assert!(residues.to_residue_labels().is_err());
}
