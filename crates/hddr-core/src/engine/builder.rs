//! Staged build pipeline around the modeling engine.

use super::adapter::{InitialFiles, ModelingEngine};
use super::config::CustomRestraintConfig;
use super::error::EngineError;
use super::overrides::apply_custom_restraints;
use super::templates::resolve_template_file;
use crate::core::io::pdb::PdbFile;
use crate::core::io::pir::Alignment;
use crate::core::io::rsr::RsrFile;
use crate::core::io::traits::StructureFile;
use crate::core::models::ids::ResidueId;
use crate::core::models::structure::Structure;
use crate::core::utils::geometry::atom_distance;
use nalgebra::Point3;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

/// How the stock restraint file is customized between the initial-model and
/// optimization stages.
#[derive(Debug, Clone)]
pub enum RestraintStrategy {
    /// Leave the engine-generated restraints untouched.
    Stock,
    /// Rewrite restraint parameters from per-template tables.
    TableDriven(CustomRestraintConfig),
}

impl RestraintStrategy {
    /// Applies the strategy to the restraint file in place, returning the
    /// number of edited restraints.
    pub fn customize(&self, restraints_path: &Path) -> Result<usize, EngineError> {
        match self {
            Self::Stock => Ok(0),
            Self::TableDriven(config) => apply_custom_restraints(restraints_path, config),
        }
    }
}

/// A lazily loaded template structure plus the model-to-template residue
/// correspondence.
struct TemplateView {
    structure: Structure,
    to_template: HashMap<usize, usize>,
}

/// Drives a comparative-modeling build in stages: initial files, restraint
/// customization, optimization.
///
/// The stages are ordered and single-shot; calling them out of order or
/// twice is a [`EngineError::Usage`] error, so a caller cannot silently
/// optimize against restraints that were never customized. Once the initial
/// files exist, the parsed model and restraint set are queryable through the
/// accessors, which parameter-table authors use to reproduce the engine's
/// default restraint parameters.
pub struct ModelBuilder<E: ModelingEngine> {
    engine: E,
    alignment: Alignment,
    sequence: String,
    knowns: Vec<String>,
    search_dirs: Vec<PathBuf>,
    strategy: Option<RestraintStrategy>,
    initial: Option<InitialFiles>,
    initial_model: Option<Structure>,
    initial_restraints: Option<RsrFile>,
    model_ordinals: HashMap<ResidueId, usize>,
    templates: HashMap<usize, TemplateView>,
}

impl<E: ModelingEngine> ModelBuilder<E> {
    /// Creates a builder for modeling `sequence` on the `knowns` templates.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::DataIncompatibility`] if `sequence` or any of
    /// `knowns` is absent from the alignment, or if `knowns` is empty.
    pub fn new(
        engine: E,
        alignment: Alignment,
        sequence: &str,
        knowns: &[String],
    ) -> Result<Self, EngineError> {
        if knowns.is_empty() {
            return Err(EngineError::DataIncompatibility(
                "at least one template is required".into(),
            ));
        }
        for code in std::iter::once(sequence).chain(knowns.iter().map(String::as_str)) {
            if alignment.get(code).is_none() {
                return Err(EngineError::DataIncompatibility(format!(
                    "'{code}' is not present in the alignment"
                )));
            }
        }
        Ok(Self {
            engine,
            alignment,
            sequence: sequence.to_string(),
            knowns: knowns.to_vec(),
            search_dirs: vec![PathBuf::from(".")],
            strategy: None,
            initial: None,
            initial_model: None,
            initial_restraints: None,
            model_ordinals: HashMap::new(),
            templates: HashMap::new(),
        })
    }

    /// Directories searched for template structure files.
    pub fn set_template_search_dirs(&mut self, dirs: Vec<PathBuf>) {
        self.search_dirs = dirs;
        self.templates.clear();
    }

    /// Chooses the restraint strategy applied between the stages. A builder
    /// starts with none configured; rebuilding without one is a usage error.
    pub fn set_restraint_strategy(&mut self, strategy: RestraintStrategy) {
        self.strategy = Some(strategy);
    }

    /// Configures table-driven restraint customization.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Configuration`] when the table count does not
    /// match the template count, unless the config allows unpaired tables.
    pub fn set_custom_restraint_options(
        &mut self,
        config: CustomRestraintConfig,
    ) -> Result<(), EngineError> {
        if !config.allow_unpaired_tables && config.table_paths.len() != self.knowns.len() {
            return Err(EngineError::Configuration(format!(
                "{} parameter tables supplied for {} templates; one table per template \
                 is required",
                config.table_paths.len(),
                self.knowns.len()
            )));
        }
        self.strategy = Some(RestraintStrategy::TableDriven(config));
        Ok(())
    }

    pub fn alignment(&self) -> &Alignment {
        &self.alignment
    }

    pub fn knowns(&self) -> &[String] {
        &self.knowns
    }

    /// The initial-model files, once built.
    pub fn initial_files(&self) -> Option<&InitialFiles> {
        self.initial.as_ref()
    }

    /// Runs the initial-model stage and parses its artifacts.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Usage`] if the initial files were already
    /// built.
    #[instrument(skip_all, fields(sequence = %self.sequence))]
    pub fn build_initial_files(&mut self, work_dir: &Path) -> Result<&InitialFiles, EngineError> {
        if self.initial.is_some() {
            return Err(EngineError::Usage(
                "initial model files were already generated".into(),
            ));
        }
        let files =
            self.engine
                .generate_initial(&self.alignment, &self.sequence, &self.knowns, work_dir)?;
        info!(
            structure = %files.structure_path.display(),
            restraints = %files.restraints_path.display(),
            "generated initial model files"
        );

        let model = PdbFile::read_from_path(&files.structure_path)?;
        let restraints = RsrFile::read_from_path(&files.restraints_path)?;
        let mut ordinals = HashMap::new();
        for chain in model.chains() {
            for &residue_id in chain.residues() {
                ordinals.insert(residue_id, ordinals.len());
            }
        }
        self.initial_model = Some(model);
        self.initial_restraints = Some(restraints);
        self.model_ordinals = ordinals;
        Ok(self.initial.insert(files))
    }

    fn require_built<T>(&self, value: Option<T>) -> Result<T, EngineError> {
        value.ok_or_else(|| {
            EngineError::Usage("the initial model files have not been generated yet".into())
        })
    }

    /// Atom pairs of the stock distance restraints in `group`, in file order.
    pub fn hddr_pairs(&self, group: u32) -> Result<Vec<(usize, usize)>, EngineError> {
        let restraints = self.require_built(self.initial_restraints.as_ref())?;
        Ok(restraints.group_pairs(group))
    }

    /// Residue number of a model atom, by its serial in the initial files.
    pub fn atom_residue(&self, serial: usize) -> Result<isize, EngineError> {
        let model = self.require_built(self.initial_model.as_ref())?;
        let atom = model.find_atom_by_serial(serial).ok_or_else(|| {
            EngineError::DataIncompatibility(format!(
                "atom serial {serial} is not present in the initial model"
            ))
        })?;
        let residue = model.residue(atom.residue_id).ok_or_else(|| {
            EngineError::DataIncompatibility(format!(
                "atom serial {serial} has no parent residue in the initial model"
            ))
        })?;
        Ok(residue.id)
    }

    /// Name of a model atom, by its serial in the initial files.
    pub fn atom_name(&self, serial: usize) -> Result<&str, EngineError> {
        let model = self.require_built(self.initial_model.as_ref())?;
        model
            .find_atom_by_serial(serial)
            .map(|atom| atom.name.as_str())
            .ok_or_else(|| {
                EngineError::DataIncompatibility(format!(
                    "atom serial {serial} is not present in the initial model"
                ))
            })
    }

    /// Distance between the template atoms equivalent to two model atoms,
    /// or `None` when either residue faces an alignment gap or the template
    /// residue lacks the atom. Templates are loaded and cached on first use.
    pub fn template_distance(
        &mut self,
        serial_i: usize,
        serial_j: usize,
        template_index: usize,
    ) -> Result<Option<f64>, EngineError> {
        if self.initial_model.is_none() {
            return Err(EngineError::Usage(
                "the initial model files have not been generated yet".into(),
            ));
        }
        if template_index >= self.knowns.len() {
            return Err(EngineError::Configuration(format!(
                "template index {template_index} is out of range for {} templates",
                self.knowns.len()
            )));
        }
        if !self.templates.contains_key(&template_index) {
            let view = self.load_template(template_index)?;
            self.templates.insert(template_index, view);
        }
        let Some(view) = self.templates.get(&template_index) else {
            return Ok(None);
        };
        let model = self.require_built(self.initial_model.as_ref())?;

        let template_position = |serial: usize| -> Result<Option<Point3<f64>>, EngineError> {
            let atom = model.find_atom_by_serial(serial).ok_or_else(|| {
                EngineError::DataIncompatibility(format!(
                    "atom serial {serial} is not present in the initial model"
                ))
            })?;
            let Some(&ordinal) = self.model_ordinals.get(&atom.residue_id) else {
                return Ok(None);
            };
            let Some(&template_ordinal) = view.to_template.get(&ordinal) else {
                return Ok(None);
            };
            let Some(residue) = view.structure.residues_in_order().nth(template_ordinal) else {
                return Ok(None);
            };
            let Some(atom_id) = residue.atom_by_name(&atom.name) else {
                return Ok(None);
            };
            Ok(view.structure.atom(atom_id).map(|a| a.position))
        };

        let (Some(a), Some(b)) = (template_position(serial_i)?, template_position(serial_j)?)
        else {
            return Ok(None);
        };
        Ok(Some(atom_distance(&a, &b)))
    }

    fn load_template(&self, template_index: usize) -> Result<TemplateView, EngineError> {
        let code = &self.knowns[template_index];
        let entry = self.alignment.get(code).ok_or_else(|| {
            EngineError::DataIncompatibility(format!(
                "template '{code}' is not present in the alignment"
            ))
        })?;
        let path = resolve_template_file(entry, &self.search_dirs)?;
        let structure = PdbFile::read_from_path(&path)?;
        let to_template = self.alignment.correspondence(&self.sequence, code)?;
        Ok(TemplateView {
            structure,
            to_template,
        })
    }

    /// Rewrites the engine-generated restraint file per the configured
    /// strategy. Returns the number of edited restraints.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Usage`] if the initial files have not been
    /// built yet, or if no restraint strategy was configured beforehand.
    #[instrument(skip_all, fields(sequence = %self.sequence))]
    pub fn rebuild_restraints_file(&mut self) -> Result<usize, EngineError> {
        let initial = self.require_built(self.initial.as_ref())?;
        let strategy = self.strategy.as_ref().ok_or_else(|| {
            EngineError::Usage(
                "no restraint strategy was configured before rebuilding the restraint file"
                    .into(),
            )
        })?;
        let edited = strategy.customize(&initial.restraints_path)?;
        if edited > 0 {
            // The in-memory restraint view must track the rewritten file.
            self.initial_restraints = Some(RsrFile::read_from_path(&initial.restraints_path)?);
        }
        Ok(edited)
    }

    /// Runs the optimization stage, returning the final model path.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Usage`] if the initial files have not been
    /// built yet.
    #[instrument(skip_all, fields(sequence = %self.sequence))]
    pub fn optimize(&mut self) -> Result<PathBuf, EngineError> {
        let initial = self.require_built(self.initial.clone())?;
        let model = self.engine.optimize(&initial)?;
        info!(model = %model.display(), "optimization finished");
        Ok(model)
    }

    /// Runs all stages in order: initial files, restraint customization,
    /// optimization.
    pub fn run(&mut self, work_dir: &Path) -> Result<PathBuf, EngineError> {
        self.build_initial_files(work_dir)?;
        let edited = self.rebuild_restraints_file()?;
        info!(edited, "customized restraints");
        self.optimize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::config::CustomRestraintConfigBuilder;
    use tempfile::tempdir;

    const ALIGNMENT: &str = "\
>P1;templ_0
structureX:templ_0.pdb:::::::
AGS*
>P1;model_1
sequence:model_1:::::::
AGS*
";

    fn atom_line(serial: usize, res: &str, chain: char, seq: isize, x: f64) -> String {
        format!(
            "ATOM  {serial:>5} CA   {res:<3} {chain}{seq:>4}    {x:>8.3}{:>8.3}{:>8.3}  1.00  0.00",
            0.0, 0.0
        )
    }

    fn pdb_text(residues: &[(&str, f64)], first_id: isize) -> String {
        let mut text = String::new();
        for (idx, (res, x)) in residues.iter().enumerate() {
            text.push_str(&atom_line(idx + 1, res, 'A', first_id + idx as isize, *x));
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

    /// Writes canned initial files and records stage calls.
    struct MockEngine {
        initial_calls: usize,
        optimize_calls: usize,
    }

    impl MockEngine {
        fn new() -> Self {
            Self {
                initial_calls: 0,
                optimize_calls: 0,
            }
        }
    }

    impl ModelingEngine for MockEngine {
        fn generate_initial(
            &mut self,
            _alignment: &Alignment,
            sequence: &str,
            _knowns: &[String],
            work_dir: &Path,
        ) -> Result<InitialFiles, EngineError> {
            self.initial_calls += 1;
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
            self.optimize_calls += 1;
            Ok(initial.structure_path.with_extension("pdb"))
        }
    }

    fn builder() -> ModelBuilder<MockEngine> {
        let alignment = Alignment::parse(ALIGNMENT).unwrap();
        ModelBuilder::new(
            MockEngine::new(),
            alignment,
            "model_1",
            &["templ_0".to_string()],
        )
        .unwrap()
    }

    #[test]
    fn unknown_sequence_or_template_is_rejected() {
        let alignment = Alignment::parse(ALIGNMENT).unwrap();
        let result = ModelBuilder::new(
            MockEngine::new(),
            alignment,
            "absent",
            &["templ_0".to_string()],
        );
        assert!(matches!(result, Err(EngineError::DataIncompatibility(_))));
    }

    #[test]
    fn initial_stage_is_single_shot() {
        let dir = tempdir().unwrap();
        let mut b = builder();
        b.build_initial_files(dir.path()).unwrap();
        let err = b.build_initial_files(dir.path()).unwrap_err();
        assert!(matches!(err, EngineError::Usage(_)));
        assert_eq!(b.engine.initial_calls, 1);
    }

    #[test]
    fn accessors_before_initial_are_usage_errors() {
        let mut b = builder();
        assert!(matches!(b.hddr_pairs(9), Err(EngineError::Usage(_))));
        assert!(matches!(b.atom_residue(1), Err(EngineError::Usage(_))));
        assert!(matches!(b.atom_name(1), Err(EngineError::Usage(_))));
        assert!(matches!(
            b.template_distance(1, 3, 0),
            Err(EngineError::Usage(_))
        ));
        assert!(matches!(
            b.rebuild_restraints_file(),
            Err(EngineError::Usage(_))
        ));
    }

    #[test]
    fn accessors_expose_the_parsed_initial_files() {
        let dir = tempdir().unwrap();
        let mut b = builder();
        b.build_initial_files(dir.path()).unwrap();

        assert_eq!(b.hddr_pairs(9).unwrap(), vec![(1, 3), (1, 2)]);
        assert!(b.hddr_pairs(26).unwrap().is_empty());
        assert_eq!(b.atom_residue(1).unwrap(), 1);
        assert_eq!(b.atom_residue(3).unwrap(), 3);
        assert_eq!(b.atom_name(2).unwrap(), "CA");
        assert!(matches!(
            b.atom_residue(99),
            Err(EngineError::DataIncompatibility(_))
        ));
    }

    #[test]
    fn template_distance_maps_through_the_alignment() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("templ_0.pdb"),
            pdb_text(&[("ALA", 0.0), ("GLY", 3.5), ("SER", 8.0)], 11),
        )
        .unwrap();

        let mut b = builder();
        b.set_template_search_dirs(vec![dir.path().to_path_buf()]);
        b.build_initial_files(dir.path()).unwrap();

        assert_eq!(b.template_distance(1, 3, 0).unwrap(), Some(8.0));
        assert_eq!(b.template_distance(1, 2, 0).unwrap(), Some(3.5));
        assert!(matches!(
            b.template_distance(1, 3, 5),
            Err(EngineError::Configuration(_))
        ));
    }

    #[test]
    fn template_distance_is_none_across_gaps() {
        let dir = tempdir().unwrap();
        // Template alignment entry lacks the middle residue.
        let alignment = Alignment::parse(
            ">P1;templ_0\nstructureX:templ_0.pdb:::::::\nA-S*\n\
             >P1;model_1\nsequence:model_1:::::::\nAGS*\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("templ_0.pdb"),
            pdb_text(&[("ALA", 0.0), ("SER", 8.0)], 11),
        )
        .unwrap();

        let mut b = ModelBuilder::new(
            MockEngine::new(),
            alignment,
            "model_1",
            &["templ_0".to_string()],
        )
        .unwrap();
        b.set_template_search_dirs(vec![dir.path().to_path_buf()]);
        b.build_initial_files(dir.path()).unwrap();

        assert_eq!(b.template_distance(1, 2, 0).unwrap(), None);
        assert_eq!(b.template_distance(1, 3, 0).unwrap(), Some(8.0));
    }

    #[test]
    fn table_count_must_match_template_count() {
        let mut b = builder();
        let config = CustomRestraintConfigBuilder::new()
            .table_paths(vec!["a.csv".into(), "b.csv".into()])
            .sigma_col("GRP_DD")
            .build()
            .unwrap();
        let err = b.set_custom_restraint_options(config).unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));

        let relaxed = CustomRestraintConfigBuilder::new()
            .table_paths(vec!["a.csv".into(), "b.csv".into()])
            .sigma_col("GRP_DD")
            .allow_unpaired_tables(true)
            .build()
            .unwrap();
        assert!(b.set_custom_restraint_options(relaxed).is_ok());
    }

    #[test]
    fn full_run_customizes_restraints_between_stages() {
        let dir = tempdir().unwrap();
        let table_path = dir.path().join("params.csv");
        std::fs::write(
            &table_path,
            "GRP_DD,GRP_DT,MOD_ATOM_INDEX_I,MOD_ATOM_INDEX_J\n0.3,7.2,1,3\n",
        )
        .unwrap();

        let mut b = builder();
        let config = CustomRestraintConfigBuilder::new()
            .table_paths(vec![table_path])
            .sigma_col("GRP_DD")
            .location_col("GRP_DT")
            .build()
            .unwrap();
        b.set_custom_restraint_options(config).unwrap();

        let model = b.run(dir.path()).unwrap();
        assert_eq!(model, dir.path().join("model_1.pdb"));
        assert_eq!(b.engine.optimize_calls, 1);

        let rewritten = std::fs::read_to_string(dir.path().join("model_1.rsr")).unwrap();
        assert!(rewritten.contains("7.2000    0.3000"));

        // The in-memory restraint view tracked the rewrite.
        let pairs = b.hddr_pairs(9).unwrap();
        assert_eq!(pairs, vec![(1, 3), (1, 2)]);
    }

    #[test]
    fn stock_strategy_leaves_restraints_untouched() {
        let dir = tempdir().unwrap();
        let mut b = builder();
        b.set_restraint_strategy(RestraintStrategy::Stock);
        b.build_initial_files(dir.path()).unwrap();
        assert_eq!(b.rebuild_restraints_file().unwrap(), 0);
        let text = std::fs::read_to_string(dir.path().join("model_1.rsr")).unwrap();
        assert!(text.contains("7.0000    0.5000"));
    }

    #[test]
    fn rebuild_without_a_configured_strategy_is_a_usage_error() {
        let dir = tempdir().unwrap();
        let mut b = builder();
        b.build_initial_files(dir.path()).unwrap();
        let err = b.rebuild_restraints_file().unwrap_err();
        assert!(matches!(err, EngineError::Usage(_)));
    }

    #[test]
    fn engine_failures_surface_from_optimize() {
        struct BrokenOptimizer;

        impl ModelingEngine for BrokenOptimizer {
            fn generate_initial(
                &mut self,
                _alignment: &Alignment,
                sequence: &str,
                _knowns: &[String],
                work_dir: &Path,
            ) -> Result<InitialFiles, EngineError> {
                let structure_path = work_dir.join(format!("{sequence}.ini"));
                let restraints_path = work_dir.join(format!("{sequence}.rsr"));
                std::fs::write(&structure_path, pdb_text(&[("ALA", 0.0)], 1))?;
                std::fs::write(&restraints_path, "MODELLER5 VERSION: MODELLER FORMAT\n")?;
                Ok(InitialFiles {
                    structure_path,
                    restraints_path,
                })
            }

            fn optimize(&mut self, _initial: &InitialFiles) -> Result<PathBuf, EngineError> {
                Err(EngineError::Modeling {
                    stage: "optimize",
                    message: "molecular dynamics refinement diverged".to_string(),
                })
            }
        }

        let dir = tempdir().unwrap();
        let alignment = Alignment::parse(ALIGNMENT).unwrap();
        let mut b =
            ModelBuilder::new(BrokenOptimizer, alignment, "model_1", &["templ_0".to_string()])
                .unwrap();
        b.build_initial_files(dir.path()).unwrap();
        let err = b.optimize().unwrap_err();
        assert!(matches!(err, EngineError::Modeling { stage: "optimize", .. }));
    }
}
