use crate::cli::{AnalyzeArgs, RebuildArgs};
use crate::error::{CliError, Result};
use hddrpp::core::seq::align::GapPenalties;
use hddrpp::engine::config::{
    AnalyzeConfig, AnalyzeConfigBuilder, CustomRestraintConfig, CustomRestraintConfigBuilder,
    WeightingScheme,
};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::debug;

fn read_toml<T: DeserializeOwned + Default>(path: Option<&Path>) -> Result<T> {
    let Some(path) = path else {
        return Ok(T::default());
    };
    debug!("Loading configuration file from {:?}", path);
    let text = std::fs::read_to_string(path)?;
    toml::from_str(&text).map_err(|e| CliError::FileParsing {
        path: path.to_path_buf(),
        source: e.into(),
    })
}

/// File-level settings of the `analyze` command. Every field is optional;
/// CLI arguments win over file values, which win over the built-in defaults.
#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct AnalyzeFileConfig {
    pub target_chain: Option<char>,
    pub identity_threshold: Option<f64>,
    pub gap_open: Option<f64>,
    pub gap_extend: Option<f64>,
    pub groups: Option<Vec<u32>>,
    pub atom_dirs: Option<Vec<PathBuf>>,
    pub output_dir: Option<PathBuf>,
}

impl AnalyzeFileConfig {
    pub fn from_file(path: Option<&Path>) -> Result<Self> {
        read_toml(path)
    }

    pub fn merge_with_cli(self, args: &AnalyzeArgs) -> Result<AnalyzeConfig> {
        let defaults = GapPenalties::default();
        let gaps = GapPenalties {
            open: args.gap_open.or(self.gap_open).unwrap_or(defaults.open),
            extend: args
                .gap_extend
                .or(self.gap_extend)
                .unwrap_or(defaults.extend),
        };

        let mut builder = AnalyzeConfigBuilder::new()
            .target_path(args.target.clone())
            .gap_penalties(gaps);
        if let Some(chain) = args.target_chain.or(self.target_chain) {
            builder = builder.target_chain(chain);
        }
        if let Some(threshold) = args.identity_threshold.or(self.identity_threshold) {
            builder = builder.identity_threshold(threshold);
        }
        let groups = if args.groups.is_empty() {
            self.groups
        } else {
            Some(args.groups.clone())
        };
        if let Some(groups) = groups {
            builder = builder.groups(groups);
        }
        let atom_dirs = if args.atom_dirs.is_empty() {
            self.atom_dirs
        } else {
            Some(args.atom_dirs.clone())
        };
        if let Some(dirs) = atom_dirs {
            builder = builder.search_dirs(dirs);
        }
        if let Some(dir) = args.output_dir.clone().or(self.output_dir) {
            builder = builder.output_dir(dir);
        }

        builder.build().map_err(|e| CliError::Config(e.to_string()))
    }
}

/// File-level settings of the `rebuild` command.
#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct RebuildFileConfig {
    pub sigma_col: Option<String>,
    pub location_col: Option<String>,
    pub atom_i_col: Option<String>,
    pub atom_j_col: Option<String>,
    pub group: Option<u32>,
    pub weighting: Option<String>,
    pub decay: Option<f64>,
    pub drop_unmatched: Option<bool>,
}

impl RebuildFileConfig {
    pub fn from_file(path: Option<&Path>) -> Result<Self> {
        read_toml(path)
    }

    pub fn merge_with_cli(self, args: &RebuildArgs) -> Result<CustomRestraintConfig> {
        let decay = args.decay.or(self.decay).unwrap_or(5.0);
        let weighting = match args.weighting.clone().or(self.weighting) {
            None => WeightingScheme::Flat,
            Some(name) => WeightingScheme::from_name(&name, decay)
                .map_err(|e| CliError::Config(e.to_string()))?,
        };

        let mut builder = CustomRestraintConfigBuilder::new()
            .table_paths(args.tables.clone())
            .weighting(weighting)
            .drop_unmatched(args.drop_unmatched || self.drop_unmatched.unwrap_or(false))
            .allow_unpaired_tables(true);
        if let Some(col) = args.sigma_col.clone().or(self.sigma_col) {
            builder = builder.sigma_col(col);
        }
        if let Some(col) = args.location_col.clone().or(self.location_col) {
            builder = builder.location_col(col);
        }
        if let Some(col) = args.atom_i_col.clone().or(self.atom_i_col) {
            builder = builder.atom_i_col(col);
        }
        if let Some(col) = args.atom_j_col.clone().or(self.atom_j_col) {
            builder = builder.atom_j_col(col);
        }
        if let Some(group) = args.group.or(self.group) {
            builder = builder.group(group);
        }

        builder.build().map_err(|e| CliError::Config(e.to_string()))
    }
}
