use crate::cli::{init_tracing, InspectArgs};
use anyhow::Context;
use gaingrn_core::{
    mark_angle_outliers, BoundaryDetector, IndexerConfig, Sequence, StructureInput, Subdomain,
    SubdomainBoundary,
};
use gaingrn_io::{read_sequence, read_stride, sequence_mismatches};
use std::io::{self, Write};

pub fn execute(args: InspectArgs, debug: bool) -> anyhow::Result<()> {
    let config = match &args.config {
        Some(path) => IndexerConfig::from_json_file(path)?,
        None => IndexerConfig::default(),
    };
    init_tracing(debug || config.debug);

    let mut records = read_stride(&args.stride)
        .with_context(|| format!("reading {}", args.stride.display()))?;
    let detector = config.segment_detector();
    let marked = mark_angle_outliers(&mut records, &detector, &config.angle_references)?;
    let boundary = match (args.boundary, records.first()) {
        (Some(boundary), Some(first)) => Some(SubdomainBoundary {
            domain_start: first.residue,
            boundary,
        }),
        _ => BoundaryDetector::default().detect(&records),
    };
    let name = args.stride.display().to_string();
    let input = StructureInput::from_records(name, None, &records, &detector, boundary)?;

    let mut out = io::stdout().lock();
    writeln!(out, "residues: {}", input.sequence.len())?;
    if !config.angle_references.is_empty() {
        writeln!(out, "angle outliers marked: {}", marked)?;
    }
    match input.boundary {
        Some(b) => writeln!(out, "domain start: {}  boundary: {}", b.domain_start, b.boundary)?,
        None => writeln!(out, "boundary: not found")?,
    }
    for subdomain in [Subdomain::A, Subdomain::B] {
        for segment in input.segments_in(subdomain) {
            let breaks: Vec<String> = segment
                .break_points()
                .map(|(res, kind)| format!("{}:{}", res, kind))
                .collect();
            writeln!(out, "{}\t{}\t{}", subdomain, segment, breaks.join(","))?;
        }
    }

    if let Some(pdb) = &args.pdb {
        let coordinates: Sequence = read_sequence(pdb, None)?;
        let mismatches = sequence_mismatches(&input.sequence, &coordinates);
        writeln!(out, "sequence mismatches: {}", mismatches.len())?;
        for (res, expected, found) in mismatches {
            writeln!(out, "  {}: {} != {}", res, expected, found)?;
        }
    }
    Ok(())
}
