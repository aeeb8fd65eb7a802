use crate::cli::RebuildArgs;
use crate::config::RebuildFileConfig;
use crate::error::Result;
use hddrpp::engine::overrides::apply_custom_restraints;
use tracing::info;

pub fn run(args: RebuildArgs) -> Result<()> {
    let file_config = RebuildFileConfig::from_file(args.config.as_deref())?;
    info!("Merging configuration from file and CLI arguments...");
    let config = file_config.merge_with_cli(&args)?;

    // With -o the input stays untouched and the copy is rewritten.
    let target_path = match &args.output {
        Some(output) => {
            std::fs::copy(&args.restraints, output)?;
            output.clone()
        }
        None => args.restraints.clone(),
    };

    println!(
        "Rewriting group {} restraints from {} table(s)...",
        config.group,
        config.table_paths.len()
    );
    let edited = apply_custom_restraints(&target_path, &config)?;

    println!(
        "✓ {} restraint(s) rewritten in: {}",
        edited,
        target_path.display()
    );

    Ok(())
}
