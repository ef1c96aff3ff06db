use crate::cli::{init_tracing, IndexArgs};
use crate::manifest::Manifest;
use anyhow::Context;
use gaingrn_core::{CellFormat, IndexerConfig, IndexingCollection, Superposer, TemplateLibrary};
use gaingrn_io::{write_long_file, write_occupancy, write_table, GesamtRunner};
use std::fs;
use tracing::{info, warn};

pub fn execute(args: IndexArgs, debug: bool) -> anyhow::Result<()> {
    let config = load_config(&args)?;
    init_tracing(debug || config.debug);

    let templates = TemplateLibrary::from_json_file(&args.templates)
        .with_context(|| format!("loading templates {}", args.templates.display()))?;
    let manifest = Manifest::from_file(&args.manifest)?;
    let inputs = manifest.inputs(&config)?;
    info!(
        structures = inputs.len(),
        templates = templates.len(),
        threads = config.n_threads,
        "indexing"
    );

    let superposer: Box<dyn Superposer> = match &args.gesamt {
        Some(binary) => Box::new(GesamtRunner::new(binary, config.timeout())),
        None => Box::new(manifest.precomputed()),
    };
    let collection = IndexingCollection::build(&inputs, &templates, superposer.as_ref(), &config)?;

    for excluded in collection.excluded() {
        warn!(accession = %excluded.accession, reason = %excluded.reason, "structure excluded");
    }
    let failed = collection.iter().filter(|result| result.all_failed()).count();
    if failed > 0 {
        warn!(failed, "structures without any label");
    }
    for (rule, count) in collection.split_mode_summary() {
        info!(rule = %rule, structures = count, "split mode");
    }

    let format = if args.numbered {
        CellFormat::Numbered
    } else {
        CellFormat::Residue
    };
    write_table(&collection.canonical_table(args.unique_sse, format), &args.output)?;
    if let Some(path) = &args.occupancy {
        write_occupancy(&collection, path)?;
    }
    if let Some(dir) = &args.long_dir {
        fs::create_dir_all(dir)?;
        for result in collection.iter() {
            write_long_file(result, dir)?;
        }
    }
    info!(
        indexed = collection.len(),
        receptors = collection.receptors().count(),
        excluded = collection.excluded().len(),
        "done"
    );
    Ok(())
}

fn load_config(args: &IndexArgs) -> anyhow::Result<IndexerConfig> {
    let mut config = match &args.config {
        Some(path) => IndexerConfig::from_json_file(path)
            .with_context(|| format!("loading configuration {}", path.display()))?,
        None => IndexerConfig::default(),
    };
    if let Some(threads) = args.threads {
        config.n_threads = threads;
    }
    if let Some(timeout) = args.timeout {
        config.superposition_timeout_secs = timeout;
    }
    if args.no_gps {
        config.patch_gps = false;
    }
    config.validate()?;
    Ok(config)
}
