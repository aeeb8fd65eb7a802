use crate::cli::AnalyzeArgs;
use crate::config::AnalyzeFileConfig;
use crate::error::{CliError, Result};
use hddrpp::{
    core::io::{pdb::PdbFile, pir::Alignment, rsr::RsrFile, traits::StructureFile},
    workflows::analyze::{self, AnalysisInput},
};
use tracing::info;

pub fn run(args: AnalyzeArgs) -> Result<()> {
    let file_config = AnalyzeFileConfig::from_file(args.config.as_deref())?;
    info!("Merging configuration from file and CLI arguments...");
    let config = file_config.merge_with_cli(&args)?;

    info!("Loading alignment from {:?}", &args.alignment);
    let alignment =
        Alignment::read_from_path(&args.alignment).map_err(|e| CliError::FileParsing {
            path: args.alignment.clone(),
            source: e.into(),
        })?;

    info!("Loading model structure from {:?}", &args.model);
    let model = PdbFile::read_from_path(&args.model).map_err(|e| CliError::FileParsing {
        path: args.model.clone(),
        source: e.into(),
    })?;

    info!("Loading restraint file from {:?}", &args.restraints);
    let restraints =
        RsrFile::read_from_path(&args.restraints).map_err(|e| CliError::FileParsing {
            path: args.restraints.clone(),
            source: e.into(),
        })?;

    let input = AnalysisInput {
        alignment: &alignment,
        sequence: &args.sequence,
        knowns: &args.knowns,
        model: &model,
        restraints: &restraints,
    };

    println!("Starting restraint analysis against the target structure...");
    let tables = analyze::run(&input, &config)?;

    println!("Analysis complete. {} table(s) written:", tables.len());
    for path in &tables {
        println!("  {}", path.display());
    }

    Ok(())
}
