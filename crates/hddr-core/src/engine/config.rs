use crate::core::io::rsr;
use crate::core::io::tables::TableColumns;
use crate::core::seq::align::GapPenalties;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Unsupported weighting scheme: {0}")]
    UnknownScheme(String),
    #[error("Invalid parameter: {0}")]
    Invalid(String),
}

/// How sigma/location values are combined across multiple templates for one
/// atom pair. Weights always renormalize to 1 over the tables that contain
/// the pair.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum WeightingScheme {
    /// Equal weight for every template containing the pair.
    #[default]
    Flat,
    /// Weight decays exponentially with the template's deviation magnitude,
    /// down-weighting templates inconsistent with the reference distance.
    Reliability { decay: f64 },
}

impl WeightingScheme {
    /// Resolves a scheme by name, as supplied in configuration files or on
    /// the command line. `decay` applies to the `reliability` scheme.
    pub fn from_name(name: &str, decay: f64) -> Result<Self, ConfigError> {
        match name.to_ascii_lowercase().as_str() {
            "flat" => Ok(Self::Flat),
            "reliability" => {
                if decay <= 0.0 {
                    return Err(ConfigError::Invalid(format!(
                        "reliability decay must be positive, got {decay}"
                    )));
                }
                Ok(Self::Reliability { decay })
            }
            other => Err(ConfigError::UnknownScheme(other.to_string())),
        }
    }
}

/// Options of a table-driven restraint rebuild.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomRestraintConfig {
    /// One restraint-parameter table per template.
    pub table_paths: Vec<PathBuf>,
    pub columns: TableColumns,
    /// Restraint group whose parameters are rewritten.
    pub group: u32,
    pub weighting: WeightingScheme,
    /// Remove restraints of `group` whose atom pair is in no table.
    pub drop_unmatched: bool,
    /// Permit a table count that differs from the template count.
    pub allow_unpaired_tables: bool,
}

#[derive(Debug, Default)]
pub struct CustomRestraintConfigBuilder {
    table_paths: Option<Vec<PathBuf>>,
    atom_i_col: Option<String>,
    atom_j_col: Option<String>,
    sigma_col: Option<String>,
    location_col: Option<String>,
    group: Option<u32>,
    weighting: Option<WeightingScheme>,
    drop_unmatched: bool,
    allow_unpaired_tables: bool,
}

impl CustomRestraintConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table_paths(mut self, paths: Vec<PathBuf>) -> Self {
        self.table_paths = Some(paths);
        self
    }
    pub fn atom_i_col(mut self, name: impl Into<String>) -> Self {
        self.atom_i_col = Some(name.into());
        self
    }
    pub fn atom_j_col(mut self, name: impl Into<String>) -> Self {
        self.atom_j_col = Some(name.into());
        self
    }
    pub fn sigma_col(mut self, name: impl Into<String>) -> Self {
        self.sigma_col = Some(name.into());
        self
    }
    pub fn location_col(mut self, name: impl Into<String>) -> Self {
        self.location_col = Some(name.into());
        self
    }
    pub fn group(mut self, group: u32) -> Self {
        self.group = Some(group);
        self
    }
    pub fn weighting(mut self, scheme: WeightingScheme) -> Self {
        self.weighting = Some(scheme);
        self
    }
    pub fn drop_unmatched(mut self, drop: bool) -> Self {
        self.drop_unmatched = drop;
        self
    }
    pub fn allow_unpaired_tables(mut self, allow: bool) -> Self {
        self.allow_unpaired_tables = allow;
        self
    }

    pub fn build(self) -> Result<CustomRestraintConfig, ConfigError> {
        let table_paths = self
            .table_paths
            .ok_or(ConfigError::MissingParameter("table_paths"))?;
        if table_paths.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one parameter table is required".into(),
            ));
        }
        let columns = TableColumns {
            atom_i: self
                .atom_i_col
                .unwrap_or_else(|| "MOD_ATOM_INDEX_I".to_string()),
            atom_j: self
                .atom_j_col
                .unwrap_or_else(|| "MOD_ATOM_INDEX_J".to_string()),
            sigma: self.sigma_col.ok_or(ConfigError::MissingParameter("sigma_col"))?,
            location: self.location_col,
        };
        for (name, value) in [
            ("atom_i_col", Some(&columns.atom_i)),
            ("atom_j_col", Some(&columns.atom_j)),
            ("sigma_col", Some(&columns.sigma)),
            ("location_col", columns.location.as_ref()),
        ] {
            if value.is_some_and(|v| v.trim().is_empty()) {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be a non-empty column name"
                )));
            }
        }
        Ok(CustomRestraintConfig {
            table_paths,
            columns,
            group: self.group.unwrap_or(rsr::CA_CA_GROUP),
            weighting: self.weighting.unwrap_or_default(),
            drop_unmatched: self.drop_unmatched,
            allow_unpaired_tables: self.allow_unpaired_tables,
        })
    }
}

/// Options of an optimal-restraint analysis against a target structure.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzeConfig {
    /// PDB file of the experimentally determined target structure.
    pub target_path: PathBuf,
    /// Chain of the target corresponding to the model; required when the
    /// target file has more than one chain.
    pub target_chain: Option<char>,
    /// Minimum model/target fractional sequence identity.
    pub identity_threshold: f64,
    /// Use target distances as restraint locations (near-ground-truth
    /// variant) instead of template distances.
    pub use_target_distances: bool,
    pub gap_penalties: GapPenalties,
    /// Restraint groups analyzed.
    pub groups: Vec<u32>,
    /// Directories searched for template structure files.
    pub search_dirs: Vec<PathBuf>,
    /// Directory the per-template analysis tables are written to.
    pub output_dir: PathBuf,
}

#[derive(Debug, Default)]
pub struct AnalyzeConfigBuilder {
    target_path: Option<PathBuf>,
    target_chain: Option<char>,
    identity_threshold: Option<f64>,
    use_target_distances: bool,
    gap_penalties: Option<GapPenalties>,
    groups: Option<Vec<u32>>,
    search_dirs: Option<Vec<PathBuf>>,
    output_dir: Option<PathBuf>,
}

impl AnalyzeConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn target_path(mut self, path: PathBuf) -> Self {
        self.target_path = Some(path);
        self
    }
    pub fn target_chain(mut self, chain: char) -> Self {
        self.target_chain = Some(chain);
        self
    }
    pub fn identity_threshold(mut self, threshold: f64) -> Self {
        self.identity_threshold = Some(threshold);
        self
    }
    pub fn use_target_distances(mut self, use_target: bool) -> Self {
        self.use_target_distances = use_target;
        self
    }
    pub fn gap_penalties(mut self, gaps: GapPenalties) -> Self {
        self.gap_penalties = Some(gaps);
        self
    }
    pub fn groups(mut self, groups: Vec<u32>) -> Self {
        self.groups = Some(groups);
        self
    }
    pub fn search_dirs(mut self, dirs: Vec<PathBuf>) -> Self {
        self.search_dirs = Some(dirs);
        self
    }
    pub fn output_dir(mut self, dir: PathBuf) -> Self {
        self.output_dir = Some(dir);
        self
    }

    pub fn build(self) -> Result<AnalyzeConfig, ConfigError> {
        let identity_threshold = self.identity_threshold.unwrap_or(0.99);
        if !(0.0..=1.0).contains(&identity_threshold) {
            return Err(ConfigError::Invalid(format!(
                "identity threshold must be within [0, 1], got {identity_threshold}"
            )));
        }
        Ok(AnalyzeConfig {
            target_path: self
                .target_path
                .ok_or(ConfigError::MissingParameter("target_path"))?,
            target_chain: self.target_chain,
            identity_threshold,
            use_target_distances: self.use_target_distances,
            gap_penalties: self.gap_penalties.unwrap_or_default(),
            groups: self.groups.unwrap_or_else(|| rsr::HDDR_GROUPS.to_vec()),
            search_dirs: self.search_dirs.unwrap_or_else(|| vec![PathBuf::from(".")]),
            output_dir: self.output_dir.unwrap_or_else(|| PathBuf::from(".")),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn custom_config_defaults() {
        let config = CustomRestraintConfigBuilder::new()
            .table_paths(vec![PathBuf::from("t0.csv")])
            .sigma_col("GRP_DD")
            .build()
            .unwrap();
        assert_eq!(config.columns.atom_i, "MOD_ATOM_INDEX_I");
        assert_eq!(config.columns.atom_j, "MOD_ATOM_INDEX_J");
        assert_eq!(config.columns.location, None);
        assert_eq!(config.group, rsr::CA_CA_GROUP);
        assert_eq!(config.weighting, WeightingScheme::Flat);
        assert!(!config.drop_unmatched);
    }

    #[test]
    fn custom_config_requires_sigma_column() {
        let err = CustomRestraintConfigBuilder::new()
            .table_paths(vec![PathBuf::from("t0.csv")])
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::MissingParameter("sigma_col"));
    }

    #[test]
    fn custom_config_rejects_empty_table_list() {
        let err = CustomRestraintConfigBuilder::new()
            .table_paths(vec![])
            .sigma_col("S")
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn custom_config_rejects_empty_column_names() {
        let err = CustomRestraintConfigBuilder::new()
            .table_paths(vec![PathBuf::from("t0.csv")])
            .sigma_col("  ")
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn weighting_scheme_from_name() {
        assert_eq!(
            WeightingScheme::from_name("flat", 0.0).unwrap(),
            WeightingScheme::Flat
        );
        assert_eq!(
            WeightingScheme::from_name("Reliability", 5.0).unwrap(),
            WeightingScheme::Reliability { decay: 5.0 }
        );
        assert!(matches!(
            WeightingScheme::from_name("rosetta", 5.0),
            Err(ConfigError::UnknownScheme(_))
        ));
        assert!(matches!(
            WeightingScheme::from_name("reliability", 0.0),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn analyze_config_defaults() {
        let config = AnalyzeConfigBuilder::new()
            .target_path(PathBuf::from("target.pdb"))
            .build()
            .unwrap();
        assert_eq!(config.identity_threshold, 0.99);
        assert!(!config.use_target_distances);
        assert_eq!(config.gap_penalties, GapPenalties::default());
        assert_eq!(config.groups, rsr::HDDR_GROUPS.to_vec());
        assert_eq!(config.target_chain, None);
    }

    #[test]
    fn analyze_config_requires_target_path() {
        let err = AnalyzeConfigBuilder::new().build().unwrap_err();
        assert_eq!(err, ConfigError::MissingParameter("target_path"));
    }

    #[test]
    fn analyze_config_rejects_out_of_range_threshold() {
        let err = AnalyzeConfigBuilder::new()
            .target_path(PathBuf::from("target.pdb"))
            .identity_threshold(1.5)
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}
