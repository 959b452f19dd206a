use std::fs;
use std::path::PathBuf;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::error::AnnotateError;

pub const DEFAULT_CONFIG_FILE: &str = "eclip-annotate.json";
pub const DEFAULT_GENCODE_RELEASE: &str = "29";
pub const DEFAULT_ASSEMBLY: &str = "GRCh38";
pub const DEFAULT_REPLICATES: &str = "1, 2";

/// On-disk configuration. Every field is optional; the defaults reproduce
/// the standard run (GENCODE v29 against dual-replicate GRCh38 eCLIP).
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub data_dir: Option<String>,
    #[serde(default)]
    pub metadata_file: Option<String>,
    #[serde(default)]
    pub gencode_release: Option<String>,
    #[serde(default)]
    pub assembly: Option<String>,
    #[serde(default)]
    pub replicates: Option<String>,
    #[serde(default)]
    pub output_file: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub data_dir: Utf8PathBuf,
    pub metadata_file: Utf8PathBuf,
    pub gencode_release: String,
    pub assembly: String,
    pub replicates: String,
    pub output_file: String,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Resolve the configuration. An explicitly given path must exist; the
    /// default config file is optional and its absence means defaults.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, AnnotateError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Self::resolve_config(Config::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| AnnotateError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| AnnotateError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, AnnotateError> {
        let data_dir =
            Utf8PathBuf::from(config.data_dir.unwrap_or_else(|| "data".to_string()));
        let metadata_file = config
            .metadata_file
            .map(Utf8PathBuf::from)
            .unwrap_or_else(|| data_dir.join("eCLIP").join("metadata.tsv"));
        let gencode_release = config
            .gencode_release
            .unwrap_or_else(|| DEFAULT_GENCODE_RELEASE.to_string());
        let assembly = config
            .assembly
            .unwrap_or_else(|| DEFAULT_ASSEMBLY.to_string());
        let replicates = config
            .replicates
            .unwrap_or_else(|| DEFAULT_REPLICATES.to_string());
        let output_file = config.output_file.unwrap_or_else(|| {
            format!("eCLIP_ENCODE_merged_{assembly}_GENCODEv{gencode_release}.csv.gz")
        });

        Ok(ResolvedConfig {
            data_dir,
            metadata_file,
            gencode_release,
            assembly,
            replicates,
            output_file,
        })
    }
}
