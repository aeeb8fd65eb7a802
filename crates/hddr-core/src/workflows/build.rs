//! Model-building workflows.
//!
//! Both workflows drive the staged [`ModelBuilder`] pipeline end to end.
//! The table-driven variant rewrites the stock restraints from
//! caller-supplied parameter tables; the target-derived variant first runs
//! the optimal-restraint analysis against the experimentally determined
//! target and feeds the resulting tables straight back into the rebuild,
//! producing a model restrained toward near-ground-truth distances.

use super::analyze::{self, AnalysisInput};
use crate::core::io::pdb::PdbFile;
use crate::core::io::rsr::RsrFile;
use crate::core::io::tables::{ParamTable, TableColumns};
use crate::core::io::traits::StructureFile;
use crate::engine::adapter::ModelingEngine;
use crate::engine::builder::ModelBuilder;
use crate::engine::config::{AnalyzeConfig, CustomRestraintConfig, WeightingScheme};
use crate::core::io::pir::Alignment;
use crate::engine::error::EngineError;
use crate::engine::overrides::merge_tables;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

/// Artifacts of a finished build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOutput {
    /// The optimized model structure.
    pub model_path: PathBuf,
    /// Restraints rewritten between the initial and optimization stages.
    pub edited_restraints: usize,
    /// Analysis tables produced along the way (target-derived builds only).
    pub analysis_tables: Vec<PathBuf>,
}

/// Builds a model with restraints rewritten from existing parameter tables.
#[instrument(skip_all, name = "table_driven_build", fields(sequence = %sequence))]
pub fn run_table_driven<E: ModelingEngine>(
    engine: E,
    alignment: Alignment,
    sequence: &str,
    knowns: &[String],
    config: CustomRestraintConfig,
    work_dir: &Path,
) -> Result<BuildOutput, EngineError> {
    let mut builder = ModelBuilder::new(engine, alignment, sequence, knowns)?;
    builder.set_custom_restraint_options(config)?;
    builder.build_initial_files(work_dir)?;
    let edited_restraints = builder.rebuild_restraints_file()?;
    info!(edited_restraints, "customized stock restraints");
    let model_path = builder.optimize()?;
    Ok(BuildOutput {
        model_path,
        edited_restraints,
        analysis_tables: Vec::new(),
    })
}

/// Builds a model with restraints derived from the target structure.
///
/// After the initial-model stage, the stock restraints are analyzed against
/// the target named in `analyze_config`; the per-template tables are merged
/// under `weighting` and written back into the restraint file before
/// optimization. The restraint locations come from the template distance
/// column, or from the target distance column when the config asks for
/// target distances.
#[instrument(skip_all, name = "target_derived_build", fields(sequence = %sequence))]
pub fn run_target_derived<E: ModelingEngine>(
    engine: E,
    alignment: Alignment,
    sequence: &str,
    knowns: &[String],
    analyze_config: &AnalyzeConfig,
    weighting: WeightingScheme,
    work_dir: &Path,
) -> Result<BuildOutput, EngineError> {
    let mut builder = ModelBuilder::new(engine, alignment, sequence, knowns)?;
    let initial = builder.build_initial_files(work_dir)?.clone();

    let model = PdbFile::read_from_path(&initial.structure_path)?;
    let restraints = RsrFile::read_from_path(&initial.restraints_path)?;
    let input = AnalysisInput {
        alignment: builder.alignment(),
        sequence,
        knowns,
        model: &model,
        restraints: &restraints,
    };
    let analysis_tables = analyze::run(&input, analyze_config)?;

    let location_col = if analyze_config.use_target_distances {
        "GRP_DN"
    } else {
        "GRP_DT"
    };
    let columns = TableColumns {
        atom_i: "MOD_ATOM_INDEX_I".to_string(),
        atom_j: "MOD_ATOM_INDEX_J".to_string(),
        sigma: "GRP_DD".to_string(),
        location: Some(location_col.to_string()),
    };
    let mut tables = Vec::with_capacity(analysis_tables.len());
    for path in &analysis_tables {
        tables.push(ParamTable::load(path, &columns)?);
    }
    let lookup = merge_tables(&tables, weighting);

    let mut file = RsrFile::read_from_path(&initial.restraints_path)?;
    let mut edited_restraints = 0;
    for &group in &analyze_config.groups {
        edited_restraints += file.apply_overrides(group, &lookup, false)?;
    }
    file.write_to_path(&initial.restraints_path)?;
    info!(
        edited_restraints,
        location = location_col,
        "rewrote restraints from the target analysis"
    );

    let model_path = builder.optimize()?;
    Ok(BuildOutput {
        model_path,
        edited_restraints,
        analysis_tables,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::adapter::InitialFiles;
    use crate::engine::config::{AnalyzeConfigBuilder, CustomRestraintConfigBuilder};
    use tempfile::tempdir;

    const ALIGNMENT: &str = "\
>P1;templ_0
structureX:templ_0.pdb:::::::
AGS*
>P1;model_1
sequence:model_1:::::::
AGS*
";

    fn atom_line(
        serial: usize,
        name: &str,
        res: &str,
        chain: char,
        seq: isize,
        x: f64,
    ) -> String {
        format!(
            "ATOM  {serial:>5} {name:<4} {res:<3} {chain}{seq:>4}    {x:>8.3}{:>8.3}{:>8.3}  1.00  0.00",
            0.0, 0.0
        )
    }

    fn pdb_text(residues: &[(&str, f64)], first_id: isize) -> String {
        let mut text = String::new();
        for (idx, (res, x)) in residues.iter().enumerate() {
            text.push_str(&atom_line(idx + 1, "CA", res, 'A', first_id + idx as isize, *x));
            text.push('\n');
        }
        text.push_str("END\n");
        text
    }

    const INITIAL_RSR: &str = "\
MODELLER5 VERSION: MODELLER FORMAT
R    3   1   1   9   2   2   0     1     3       7.0000    0.5000
R    3   1   1   9   2   2   0     1     2       3.0000    0.4000
";

    struct MockEngine;

    impl ModelingEngine for MockEngine {
        fn generate_initial(
            &mut self,
            _alignment: &Alignment,
            sequence: &str,
            _knowns: &[String],
            work_dir: &Path,
        ) -> Result<InitialFiles, EngineError> {
            let structure_path = work_dir.join(format!("{sequence}.ini"));
            let restraints_path = work_dir.join(format!("{sequence}.rsr"));
            std::fs::write(
                &structure_path,
                pdb_text(&[("ALA", 0.0), ("GLY", 3.0), ("SER", 7.0)], 1),
            )?;
            std::fs::write(&restraints_path, INITIAL_RSR)?;
            Ok(InitialFiles {
                structure_path,
                restraints_path,
            })
        }

        fn optimize(&mut self, initial: &InitialFiles) -> Result<PathBuf, EngineError> {
            Ok(initial.structure_path.with_extension("pdb"))
        }
    }

    fn write_inputs(dir: &Path) -> PathBuf {
        std::fs::write(
            dir.join("templ_0.pdb"),
            pdb_text(&[("ALA", 0.0), ("GLY", 3.5), ("SER", 8.0)], 11),
        )
        .unwrap();
        let target = dir.join("target.pdb");
        std::fs::write(
            &target,
            pdb_text(&[("ALA", 0.0), ("GLY", 4.0), ("SER", 9.0)], 1),
        )
        .unwrap();
        target
    }

    #[test]
    fn table_driven_build_rewrites_and_optimizes() {
        let dir = tempdir().unwrap();
        let table_path = dir.path().join("params.csv");
        std::fs::write(
            &table_path,
            "GRP_DD,GRP_DT,MOD_ATOM_INDEX_I,MOD_ATOM_INDEX_J\n0.3,7.2,1,3\n",
        )
        .unwrap();
        let config = CustomRestraintConfigBuilder::new()
            .table_paths(vec![table_path])
            .sigma_col("GRP_DD")
            .location_col("GRP_DT")
            .build()
            .unwrap();

        let output = run_table_driven(
            MockEngine,
            Alignment::parse(ALIGNMENT).unwrap(),
            "model_1",
            &["templ_0".to_string()],
            config,
            dir.path(),
        )
        .unwrap();

        assert_eq!(output.model_path, dir.path().join("model_1.pdb"));
        assert_eq!(output.edited_restraints, 1);
        let text = std::fs::read_to_string(dir.path().join("model_1.rsr")).unwrap();
        assert!(text.contains("7.2000    0.3000"));
        assert!(text.contains("3.0000    0.4000"));
    }

    #[test]
    fn target_derived_build_feeds_analysis_back_into_restraints() {
        let dir = tempdir().unwrap();
        let target = write_inputs(dir.path());
        let analyze_config = AnalyzeConfigBuilder::new()
            .target_path(target)
            .search_dirs(vec![dir.path().to_path_buf()])
            .output_dir(dir.path().to_path_buf())
            .build()
            .unwrap();

        let output = run_target_derived(
            MockEngine,
            Alignment::parse(ALIGNMENT).unwrap(),
            "model_1",
            &["templ_0".to_string()],
            &analyze_config,
            WeightingScheme::Flat,
            dir.path(),
        )
        .unwrap();

        assert_eq!(output.edited_restraints, 2);
        assert_eq!(
            output.analysis_tables,
            vec![dir.path().join("model_1_tar_tem_0.csv")]
        );

        // Pair (1, 3): template distance 8.0 becomes the location, the
        // deviation magnitude 1.0 the sigma.
        let text = std::fs::read_to_string(dir.path().join("model_1.rsr")).unwrap();
        assert!(text.contains("8.0000    1.0000"));
        assert!(text.contains("3.5000    0.5000"));
        assert!(text.starts_with("MODELLER5"));
    }

    #[test]
    fn target_distances_become_locations_when_requested() {
        let dir = tempdir().unwrap();
        let target = write_inputs(dir.path());
        let analyze_config = AnalyzeConfigBuilder::new()
            .target_path(target)
            .use_target_distances(true)
            .search_dirs(vec![dir.path().to_path_buf()])
            .output_dir(dir.path().to_path_buf())
            .build()
            .unwrap();

        run_target_derived(
            MockEngine,
            Alignment::parse(ALIGNMENT).unwrap(),
            "model_1",
            &["templ_0".to_string()],
            &analyze_config,
            WeightingScheme::Flat,
            dir.path(),
        )
        .unwrap();

        let text = std::fs::read_to_string(dir.path().join("model_1.rsr")).unwrap();
        assert!(text.contains("9.0000    1.0000"));
        assert!(text.contains("4.0000    0.5000"));
    }
}
