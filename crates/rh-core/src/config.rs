//! Configuration types and parsing for reelhouse.yml

use crate::checksum::compute_checksum;
use crate::error::{CoreError, CoreResult};
use crate::source::SourceId;
use crate::time::YearWindow;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Environment variable overriding `database.path`
pub const DATABASE_ENV_VAR: &str = "REELHOUSE_DB";

/// Main loader configuration from reelhouse.yml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Project name
    pub name: String,

    /// Directory holding the source snapshots
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Destination database
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Directory for the run-state marker and reports
    #[serde(default = "default_target_path")]
    pub target_path: String,

    /// Source file format
    #[serde(default)]
    pub format: FormatConfig,

    /// Per-source file name overrides, relative to `data_dir`
    #[serde(default)]
    pub sources: BTreeMap<SourceId, String>,

    #[serde(default)]
    pub extract: ExtractConfig,

    #[serde(default)]
    pub load: LoadConfig,

    /// How unresolved optional references are treated
    #[serde(default)]
    pub strictness: Strictness,

    /// Rows read per source in test mode
    #[serde(default = "default_test_limit")]
    pub test_limit: u64,

    #[serde(default)]
    pub time: TimeConfig,

    #[serde(default)]
    pub report: ReportConfig,
}

/// Database connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// DuckDB file path, or `:memory:`
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Delimited text format shared by all sources
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FormatConfig {
    #[serde(default = "default_delimiter")]
    pub delimiter: char,

    /// Token standing for a missing value
    #[serde(default = "default_null_token")]
    pub null_token: String,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
            null_token: default_null_token(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExtractConfig {
    /// Rows decoded per chunk
    #[serde(default = "default_chunk_rows")]
    pub chunk_rows: usize,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            chunk_rows: default_chunk_rows(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoadConfig {
    /// Rows per insert transaction
    #[serde(default = "default_batch_rows")]
    pub batch_rows: usize,

    /// Rows between database checkpoints
    #[serde(default = "default_checkpoint_rows")]
    pub checkpoint_rows: u64,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            batch_rows: default_batch_rows(),
            checkpoint_rows: default_checkpoint_rows(),
        }
    }
}

/// Treatment of unresolved optional foreign keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Strictness {
    /// Optional references that do not resolve become NULL
    #[default]
    Lenient,
    /// Every reference is mandatory
    Strict,
}

impl std::fmt::Display for Strictness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strictness::Lenient => write!(f, "lenient"),
            Strictness::Strict => write!(f, "strict"),
        }
    }
}

/// Year window of the time dimension
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimeConfig {
    #[serde(default = "default_min_year")]
    pub min_year: i32,

    #[serde(default = "default_max_year")]
    pub max_year: i32,

    /// Years registered in addition to the window
    #[serde(default)]
    pub extra_years: Vec<i64>,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            min_year: default_min_year(),
            max_year: default_max_year(),
            extra_years: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReportConfig {
    /// Skip records per table logged at warn level
    #[serde(default = "default_sample_skips")]
    pub sample_skips: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            sample_skips: default_sample_skips(),
        }
    }
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_target_path() -> String {
    "target".to_string()
}

fn default_db_path() -> String {
    "warehouse.duckdb".to_string()
}

fn default_delimiter() -> char {
    '\t'
}

fn default_null_token() -> String {
    "\\N".to_string()
}

fn default_chunk_rows() -> usize {
    10_000
}

fn default_batch_rows() -> usize {
    50_000
}

fn default_checkpoint_rows() -> u64 {
    1_000_000
}

fn default_test_limit() -> u64 {
    10_000
}

fn default_min_year() -> i32 {
    1874
}

fn default_max_year() -> i32 {
    2040
}

fn default_sample_skips() -> usize {
    10
}

impl Config {
    /// Load configuration from a file path
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: Config = serde_yaml::from_str(&content)?;
        config.validate()?;
        log::debug!("Loaded config '{}' from {}", config.name, path.display());
        Ok(config)
    }

    /// Load configuration from a project directory
    /// Looks for reelhouse.yml or reelhouse.yaml
    pub fn load_from_dir(dir: &Path) -> CoreResult<Self> {
        if !dir.is_dir() {
            return Err(CoreError::ProjectNotFound {
                path: dir.display().to_string(),
            });
        }

        let yml_path = dir.join("reelhouse.yml");
        let yaml_path = dir.join("reelhouse.yaml");

        if yml_path.exists() {
            Self::load(&yml_path)
        } else if yaml_path.exists() {
            Self::load(&yaml_path)
        } else {
            Err(CoreError::ConfigNotFound {
                path: yml_path.display().to_string(),
            })
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> CoreResult<()> {
        let invalid = |message: String| Err(CoreError::ConfigInvalid { message });

        if self.name.is_empty() {
            return invalid("Project name cannot be empty".to_string());
        }
        if !self.format.delimiter.is_ascii() {
            return invalid(format!(
                "format.delimiter must be a single ASCII character, got '{}'",
                self.format.delimiter
            ));
        }
        if self.format.null_token.contains(self.format.delimiter) {
            return invalid("format.null_token cannot contain the delimiter".to_string());
        }
        if self.extract.chunk_rows == 0 {
            return invalid("extract.chunk_rows must be greater than zero".to_string());
        }
        if self.load.batch_rows == 0 {
            return invalid("load.batch_rows must be greater than zero".to_string());
        }
        if self.load.checkpoint_rows == 0 {
            return invalid("load.checkpoint_rows must be greater than zero".to_string());
        }
        if self.test_limit == 0 {
            return invalid("test_limit must be greater than zero".to_string());
        }
        if self.time.min_year > self.time.max_year {
            return invalid(format!(
                "time.min_year ({}) cannot be after time.max_year ({})",
                self.time.min_year, self.time.max_year
            ));
        }
        for (source, file) in &self.sources {
            if file.trim().is_empty() {
                return invalid(format!("sources.{:?} has an empty file name", source));
            }
        }

        Ok(())
    }

    /// Source delimiter as a byte
    pub fn delimiter_byte(&self) -> u8 {
        // validate() guarantees ASCII
        self.format.delimiter as u8
    }

    /// File name of a source, honoring overrides
    pub fn source_file(&self, source: SourceId) -> &str {
        self.sources
            .get(&source)
            .map(String::as_str)
            .unwrap_or_else(|| source.default_file())
    }

    /// Absolute path of a source relative to a project root
    pub fn source_path(&self, root: &Path, source: SourceId) -> PathBuf {
        self.data_dir_absolute(root).join(self.source_file(source))
    }

    /// Get absolute data directory relative to a project root
    pub fn data_dir_absolute(&self, root: &Path) -> PathBuf {
        root.join(&self.data_dir)
    }

    /// Get absolute target path relative to a project root
    pub fn target_path_absolute(&self, root: &Path) -> PathBuf {
        root.join(&self.target_path)
    }

    /// Location of the run-state marker
    pub fn run_state_path(&self, root: &Path) -> PathBuf {
        self.target_path_absolute(root).join("run_state.json")
    }

    /// Resolve the database path
    ///
    /// Priority: CLI flag > REELHOUSE_DB env var > config. Relative paths are
    /// taken from the project root; `:memory:` is passed through.
    pub fn resolve_database_path(&self, root: &Path, cli_path: Option<&str>) -> String {
        let raw = cli_path
            .map(String::from)
            .or_else(|| std::env::var(DATABASE_ENV_VAR).ok())
            .unwrap_or_else(|| self.database.path.clone());
        if raw == ":memory:" || Path::new(&raw).is_absolute() {
            raw
        } else {
            root.join(raw).display().to_string()
        }
    }

    /// Configured year window of the time dimension
    pub fn year_window(&self) -> YearWindow {
        YearWindow::new(self.time.min_year, self.time.max_year)
    }

    /// Stable hash of the effective configuration, recorded in run state
    pub fn checksum(&self) -> CoreResult<String> {
        let json = serde_json::to_string(self)?;
        Ok(compute_checksum(&json))
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
